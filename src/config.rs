//! Configuration types for prior processing and training-data placement

use crate::error::{Result, SbiInputError};
use crate::tensor::Device;
use serde::{Deserialize, Serialize};

/// Default number of samples drawn to estimate the moments of a custom prior
pub const DEFAULT_MOMENT_SAMPLES: usize = 1000;

/// Options forwarded to the wrapper that turns a custom prior into a distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomPriorOptions {
    /// Per-parameter lower bound of the support (None = unbounded below)
    pub lower_bound: Option<Vec<f64>>,

    /// Per-parameter upper bound of the support (None = unbounded above)
    pub upper_bound: Option<Vec<f64>>,

    /// Samples drawn to estimate mean and variance when the prior lacks them
    pub moment_samples: usize,
}

impl Default for CustomPriorOptions {
    fn default() -> Self {
        Self {
            lower_bound: None,
            upper_bound: None,
            moment_samples: DEFAULT_MOMENT_SAMPLES,
        }
    }
}

impl CustomPriorOptions {
    /// Create a new options builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sbi_input_checks::CustomPriorOptions;
    ///
    /// let options = CustomPriorOptions::builder()
    ///     .lower_bound(vec![0.0, 0.0])
    ///     .upper_bound(vec![1.0, 2.0])
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(options.moment_samples, 1000);
    /// ```
    #[must_use]
    pub fn builder() -> CustomPriorOptionsBuilder {
        CustomPriorOptionsBuilder::default()
    }

    /// Validate the options
    ///
    /// # Errors
    /// - Bounds of different lengths or empty bounds
    /// - A lower bound that is not strictly below the matching upper bound
    /// - Fewer than two moment samples (the sample variance is undefined)
    pub fn validate(&self) -> Result<()> {
        for (name, bound) in [("lower_bound", &self.lower_bound), ("upper_bound", &self.upper_bound)] {
            if let Some(values) = bound {
                if values.is_empty() {
                    return Err(SbiInputError::invalid_config(format!("{} must not be empty", name)));
                }
                if values.iter().any(|v| v.is_nan()) {
                    return Err(SbiInputError::invalid_config(format!("{} contains NaN", name)));
                }
            }
        }

        if let (Some(lower), Some(upper)) = (&self.lower_bound, &self.upper_bound) {
            if lower.len() != upper.len() {
                return Err(SbiInputError::invalid_config(format!(
                    "lower_bound has {} entries but upper_bound has {}",
                    lower.len(),
                    upper.len()
                )));
            }
            if let Some(i) = lower.iter().zip(upper).position(|(l, u)| l >= u) {
                return Err(SbiInputError::invalid_config(format!(
                    "lower_bound[{}] = {} must be below upper_bound[{}] = {}",
                    i, lower[i], i, upper[i]
                )));
            }
        }

        if self.moment_samples < 2 {
            return Err(SbiInputError::invalid_config(format!(
                "moment_samples must be at least 2, got {}",
                self.moment_samples
            )));
        }

        Ok(())
    }
}

/// Builder for `CustomPriorOptions`
#[derive(Debug, Default)]
pub struct CustomPriorOptionsBuilder {
    options: CustomPriorOptions,
}

impl CustomPriorOptionsBuilder {
    #[must_use]
    pub fn lower_bound(mut self, bound: Vec<f64>) -> Self {
        self.options.lower_bound = Some(bound);
        self
    }

    #[must_use]
    pub fn upper_bound(mut self, bound: Vec<f64>) -> Self {
        self.options.upper_bound = Some(bound);
        self
    }

    /// Set the number of samples used for moment estimation
    #[must_use]
    pub fn moment_samples(mut self, samples: usize) -> Self {
        self.options.moment_samples = samples;
        self
    }

    /// Build and validate the options
    ///
    /// # Errors
    /// - Any failure of [`CustomPriorOptions::validate`]
    pub fn build(self) -> Result<CustomPriorOptions> {
        let options = self.options;
        options.validate()?;
        Ok(options)
    }
}

/// Where training data is stored and where training runs
///
/// Devices are (de)serialized as strings: `"cpu"`, `"cuda"`, `"cuda:1"`, `"mps"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingDevices {
    /// Device holding `(theta, x)`
    pub data_device: Device,

    /// Device the estimator is trained on
    pub training_device: Device,
}

impl TrainingDevices {
    #[must_use]
    pub fn new(data_device: Device, training_device: Device) -> Self {
        Self {
            data_device,
            training_device,
        }
    }

    /// Parse both devices from their string names
    ///
    /// # Errors
    /// - Either name is not a known device
    pub fn validate_pair(data_device: &str, training_device: &str) -> Result<Self> {
        Ok(Self::new(data_device.parse()?, training_device.parse()?))
    }

    /// Whether data must be moved to reach the training device
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.data_device != self.training_device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CustomPriorOptions::default();
        assert!(options.lower_bound.is_none());
        assert!(options.upper_bound.is_none());
        assert_eq!(options.moment_samples, DEFAULT_MOMENT_SAMPLES);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_validation() {
        let options = CustomPriorOptions::builder()
            .lower_bound(vec![0.0])
            .upper_bound(vec![1.0])
            .moment_samples(50)
            .build()
            .unwrap();
        assert_eq!(options.moment_samples, 50);

        // Mismatched lengths
        assert!(CustomPriorOptions::builder()
            .lower_bound(vec![0.0, 0.0])
            .upper_bound(vec![1.0])
            .build()
            .is_err());

        // Inverted bounds
        assert!(CustomPriorOptions::builder()
            .lower_bound(vec![1.0])
            .upper_bound(vec![0.0])
            .build()
            .is_err());

        assert!(CustomPriorOptions::builder().moment_samples(1).build().is_err());
        assert!(CustomPriorOptions::builder().lower_bound(Vec::new()).build().is_err());
    }

    #[test]
    fn test_options_from_json() {
        let options: CustomPriorOptions =
            serde_json::from_str(r#"{"lower_bound": [0.0, -1.0]}"#).unwrap();
        assert_eq!(options.lower_bound, Some(vec![0.0, -1.0]));
        assert_eq!(options.moment_samples, DEFAULT_MOMENT_SAMPLES);
    }

    #[test]
    fn test_training_devices_serde() {
        let devices: TrainingDevices =
            serde_json::from_str(r#"{"data_device": "cpu", "training_device": "cuda:1"}"#).unwrap();
        assert_eq!(devices.data_device, Device::Cpu);
        assert_eq!(devices.training_device, Device::Cuda(1));
        assert!(devices.is_split());

        let json = serde_json::to_string(&devices).unwrap();
        assert!(json.contains("\"cuda:1\""));

        assert!(serde_json::from_str::<TrainingDevices>(r#"{"data_device": "tpu"}"#).is_err());
    }

    #[test]
    fn test_validate_pair() {
        let devices = TrainingDevices::validate_pair("cpu", "cpu").unwrap();
        assert!(!devices.is_split());
        assert!(TrainingDevices::validate_pair("cpu", "quantum").is_err());
    }
}
