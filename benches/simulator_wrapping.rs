use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sbi_input_checks::distributions::{BoxUniform, Distribution};
use sbi_input_checks::{ObservationNormalizer, SimulatorProcessor, Value};

const PARAMETER_DIM: usize = 8;

fn batched_simulator(theta: &Value) -> anyhow::Result<Value> {
    Ok(Value::NdArray(theta.to_f64_array().mapv(|v| v * 2.0 + 1.0)))
}

fn single_theta_simulator(theta: &Value) -> anyhow::Result<Value> {
    anyhow::ensure!(theta.shape().len() == 1, "one parameter vector at a time");
    Ok(Value::NdArray(theta.to_f64_array().mapv(|v| v * 2.0 + 1.0)))
}

fn bench_processed_simulators(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let prior = match BoxUniform::from_bounds(&[0.0; PARAMETER_DIM], &[1.0; PARAMETER_DIM]) {
        Ok(prior) => prior,
        Err(e) => {
            eprintln!("Failed to build prior: {e}");
            return;
        },
    };

    let batched = SimulatorProcessor::process_simulator(batched_simulator, &prior, false, &mut rng);
    let looped = SimulatorProcessor::process_simulator(single_theta_simulator, &prior, false, &mut rng);

    let mut group = c.benchmark_group("processed_simulator");
    for batch_size in [1usize, 16, 256] {
        let Ok(theta) = prior.sample(&[batch_size], &mut rng) else {
            continue;
        };

        group.bench_with_input(BenchmarkId::new("batched", batch_size), &theta, |b, theta| {
            b.iter(|| black_box(batched.simulate_tensor(black_box(theta))))
        });
        group.bench_with_input(BenchmarkId::new("looped", batch_size), &theta, |b, theta| {
            b.iter(|| black_box(looped.simulate_tensor(black_box(theta))))
        });
    }
    group.finish();
}

fn bench_simulator_processing(c: &mut Criterion) {
    let prior = match BoxUniform::from_bounds(&[0.0; PARAMETER_DIM], &[1.0; PARAMETER_DIM]) {
        Ok(prior) => prior,
        Err(e) => {
            eprintln!("Failed to build prior: {e}");
            return;
        },
    };

    c.bench_function("process_simulator_probe", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| {
            black_box(SimulatorProcessor::process_simulator(
                single_theta_simulator,
                &prior,
                false,
                &mut rng,
            ))
        })
    });
}

fn bench_process_x(c: &mut Criterion) {
    let x = Value::Sequence(vec![0.5; 64 * 64]);
    c.bench_function("process_x_flat_image", |b| {
        b.iter(|| black_box(ObservationNormalizer::process_x(black_box(&x), Some(&[64 * 64]))))
    });
}

criterion_group!(
    benches,
    bench_processed_simulators,
    bench_simulator_processing,
    bench_process_x
);
criterion_main!(benches);
