//! Tensor and value types shared by priors, simulators and observations
//!
//! `Tensor` is a dynamically shaped `ndarray` buffer tagged with a dtype and a
//! device. `Value` is whatever user code hands back: a tensor, a host
//! `ndarray` array, a bare scalar or a flat sequence of numbers.

use crate::error::{Result, SbiInputError};
use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, Slice};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element type of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// Single-precision float, the dtype every processed prior returns
    F32,
    /// Double-precision float
    F64,
    /// 64-bit signed integer
    I64,
}

impl Default for DType {
    fn default() -> Self {
        Self::F32
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "float32"),
            Self::F64 => write!(f, "float64"),
            Self::I64 => write!(f, "int64"),
        }
    }
}

/// Compute/storage location of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// Host memory
    Cpu,
    /// NVIDIA CUDA device with ordinal
    Cuda(usize),
    /// Apple Metal Performance Shaders device
    Mps,
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
            Self::Mps => write!(f, "mps"),
        }
    }
}

impl FromStr for Device {
    type Err = SbiInputError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "cpu" => Ok(Self::Cpu),
            "mps" => Ok(Self::Mps),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse::<usize>().ok())
                .map(Self::Cuda)
                .ok_or_else(|| {
                    SbiInputError::invalid_config(format!(
                        "Unknown device '{}'. Expected 'cpu', 'mps', 'cuda' or 'cuda:<ordinal>'",
                        s
                    ))
                }),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = SbiInputError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

/// Typed storage behind a tensor
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I64(ArrayD<i64>),
}

macro_rules! map_data {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            TensorData::F32($arr) => TensorData::F32($body),
            TensorData::F64($arr) => TensorData::F64($body),
            TensorData::I64($arr) => TensorData::I64($body),
        }
    };
}

macro_rules! with_data {
    ($data:expr, $arr:ident => $body:expr) => {
        match $data {
            TensorData::F32($arr) => $body,
            TensorData::F64($arr) => $body,
            TensorData::I64($arr) => $body,
        }
    };
}

/// Dynamically shaped numeric buffer with dtype and device
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: TensorData,
    device: Device,
}

impl Tensor {
    /// Create a host tensor from typed storage
    #[must_use]
    pub fn new(data: TensorData) -> Self {
        Self {
            data,
            device: Device::Cpu,
        }
    }

    #[must_use]
    pub fn from_f32(array: ArrayD<f32>) -> Self {
        Self::new(TensorData::F32(array))
    }

    #[must_use]
    pub fn from_f64(array: ArrayD<f64>) -> Self {
        Self::new(TensorData::F64(array))
    }

    #[must_use]
    pub fn from_i64(array: ArrayD<i64>) -> Self {
        Self::new(TensorData::I64(array))
    }

    /// Create a `float32` tensor from a shape and row-major values
    pub fn from_shape_vec(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        Ok(Self::from_f32(ArrayD::from_shape_vec(IxDyn(shape), values)?))
    }

    /// Create a zero-dimensional `float32` tensor
    #[must_use]
    pub fn scalar(value: f32) -> Self {
        Self::from_f32(ArrayD::from_elem(IxDyn(&[]), value))
    }

    /// Create a tensor of zeros
    #[must_use]
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let data = match dtype {
            DType::F32 => TensorData::F32(ArrayD::zeros(IxDyn(shape))),
            DType::F64 => TensorData::F64(ArrayD::zeros(IxDyn(shape))),
            DType::I64 => TensorData::I64(ArrayD::zeros(IxDyn(shape))),
        };
        Self::new(data)
    }

    #[must_use]
    pub fn data(&self) -> &TensorData {
        &self.data
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        with_data!(&self.data, a => a.shape())
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of elements
    #[must_use]
    pub fn numel(&self) -> usize {
        with_data!(&self.data, a => a.len())
    }

    /// Size of the leading (batch) dimension, `None` for zero-dimensional tensors
    #[must_use]
    pub fn batch_size(&self) -> Option<usize> {
        self.shape().first().copied()
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        match &self.data {
            TensorData::F32(_) => DType::F32,
            TensorData::F64(_) => DType::F64,
            TensorData::I64(_) => DType::I64,
        }
    }

    #[must_use]
    pub fn device(&self) -> Device {
        self.device
    }

    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Copy of this tensor placed on `device`
    #[must_use]
    pub fn to_device(&self, device: Device) -> Self {
        self.clone().with_device(device)
    }

    /// Copy of this tensor cast to `dtype`, keeping the device
    #[must_use]
    pub fn to_dtype(&self, dtype: DType) -> Self {
        if self.dtype() == dtype {
            return self.clone();
        }
        let data = match (&self.data, dtype) {
            (TensorData::F32(a), DType::F64) => TensorData::F64(a.mapv(f64::from)),
            (TensorData::F32(a), DType::I64) => TensorData::I64(a.mapv(|v| v as i64)),
            (TensorData::F64(a), DType::F32) => TensorData::F32(a.mapv(|v| v as f32)),
            (TensorData::F64(a), DType::I64) => TensorData::I64(a.mapv(|v| v as i64)),
            (TensorData::I64(a), DType::F32) => TensorData::F32(a.mapv(|v| v as f32)),
            (TensorData::I64(a), DType::F64) => TensorData::F64(a.mapv(|v| v as f64)),
            (data, _) => data.clone(),
        };
        Self {
            data,
            device: self.device,
        }
    }

    /// Host copy of the values as `f64`
    #[must_use]
    pub fn to_f64_array(&self) -> ArrayD<f64> {
        match &self.data {
            TensorData::F32(a) => a.mapv(f64::from),
            TensorData::F64(a) => a.clone(),
            TensorData::I64(a) => a.mapv(|v| v as f64),
        }
    }

    /// Row-major values as `f64`
    #[must_use]
    pub fn to_vec_f64(&self) -> Vec<f64> {
        self.to_f64_array().iter().copied().collect()
    }

    #[must_use]
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match &self.data {
            TensorData::F32(a) => Some(a),
            _ => None,
        }
    }

    /// Insert a dimension of size one at `axis`
    pub fn unsqueeze(&self, axis: usize) -> Result<Self> {
        if axis > self.ndim() {
            return Err(SbiInputError::invalid_value(format!(
                "Cannot unsqueeze axis {} of a tensor with {} dimensions",
                axis,
                self.ndim()
            )));
        }
        Ok(self.map(|data| map_data!(data, a => a.clone().insert_axis(Axis(axis)))))
    }

    /// Remove the trailing dimension if it has size one
    #[must_use]
    pub fn squeeze_last(&self) -> Self {
        match self.shape().last() {
            Some(1) => {
                let last = self.ndim() - 1;
                self.map(|data| map_data!(data, a => a.clone().remove_axis(Axis(last))))
            },
            _ => self.clone(),
        }
    }

    /// View with at least two dimensions; missing leading dimensions are size one
    #[must_use]
    pub fn atleast_2d(&self) -> Self {
        match self.ndim() {
            0 => self.map(|data| {
                map_data!(data, a => a.clone().insert_axis(Axis(0)).insert_axis(Axis(0)))
            }),
            1 => self.map(|data| map_data!(data, a => a.clone().insert_axis(Axis(0)))),
            _ => self.clone(),
        }
    }

    /// Reshape keeping the row-major element order
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        let data = match &self.data {
            TensorData::F32(a) => TensorData::F32(reshape_array(a, shape)?),
            TensorData::F64(a) => TensorData::F64(reshape_array(a, shape)?),
            TensorData::I64(a) => TensorData::I64(reshape_array(a, shape)?),
        };
        Ok(Self {
            data,
            device: self.device,
        })
    }

    /// Slice `len` entries of `axis` starting at `start`, clamped to the axis length
    pub fn narrow(&self, axis: usize, start: usize, len: usize) -> Result<Self> {
        let Some(&dim) = self.shape().get(axis) else {
            return Err(SbiInputError::invalid_value(format!(
                "Cannot slice axis {} of a tensor with {} dimensions",
                axis,
                self.ndim()
            )));
        };
        let begin = start.min(dim);
        let end = start.saturating_add(len).min(dim);
        let slice = Slice::from(begin..end);
        Ok(self.map(|data| map_data!(data, a => a.slice_axis(Axis(axis), slice).to_owned())))
    }

    /// Split along the leading dimension
    pub fn rows(&self) -> Result<Vec<Self>> {
        if self.ndim() == 0 {
            return Err(SbiInputError::invalid_value(
                "Cannot iterate over a zero-dimensional tensor",
            ));
        }
        let rows: Vec<TensorData> = match &self.data {
            TensorData::F32(a) => a.outer_iter().map(|r| TensorData::F32(r.to_owned())).collect(),
            TensorData::F64(a) => a.outer_iter().map(|r| TensorData::F64(r.to_owned())).collect(),
            TensorData::I64(a) => a.outer_iter().map(|r| TensorData::I64(r.to_owned())).collect(),
        };
        Ok(rows
            .into_iter()
            .map(|data| Self {
                data,
                device: self.device,
            })
            .collect())
    }

    /// Stack tensors along a new leading dimension
    ///
    /// All tensors are cast to the dtype of the first one and must share a
    /// device and a shape.
    pub fn stack(tensors: &[Self]) -> Result<Self> {
        let (dtype, device) = Self::common_layout(tensors, "stack")?;
        let cast: Vec<Self> = tensors.iter().map(|t| t.to_dtype(dtype)).collect();
        let data = match dtype {
            DType::F32 => TensorData::F32(ndarray::stack(Axis(0), &f32_views(&cast))?),
            DType::F64 => TensorData::F64(ndarray::stack(Axis(0), &f64_views(&cast))?),
            DType::I64 => TensorData::I64(ndarray::stack(Axis(0), &i64_views(&cast))?),
        };
        Ok(Self { data, device })
    }

    /// Concatenate tensors along an existing `axis`
    pub fn concat(tensors: &[Self], axis: usize) -> Result<Self> {
        let (dtype, device) = Self::common_layout(tensors, "concat")?;
        let cast: Vec<Self> = tensors.iter().map(|t| t.to_dtype(dtype)).collect();
        let data = match dtype {
            DType::F32 => {
                TensorData::F32(ndarray::concatenate(Axis(axis), &f32_views(&cast))?)
            },
            DType::F64 => {
                TensorData::F64(ndarray::concatenate(Axis(axis), &f64_views(&cast))?)
            },
            DType::I64 => {
                TensorData::I64(ndarray::concatenate(Axis(axis), &i64_views(&cast))?)
            },
        };
        Ok(Self { data, device })
    }

    /// Sum over `axis`, removing it
    pub fn sum_axis(&self, axis: usize) -> Result<Self> {
        if axis >= self.ndim() {
            return Err(SbiInputError::invalid_value(format!(
                "Cannot sum axis {} of a tensor with {} dimensions",
                axis,
                self.ndim()
            )));
        }
        Ok(self.map(|data| map_data!(data, a => a.sum_axis(Axis(axis)))))
    }

    /// Per-element finiteness, row-major
    #[must_use]
    pub fn finite_mask(&self) -> Vec<bool> {
        self.to_f64_array().iter().map(|v| v.is_finite()).collect()
    }

    fn map(&self, f: impl FnOnce(&TensorData) -> TensorData) -> Self {
        Self {
            data: f(&self.data),
            device: self.device,
        }
    }

    fn common_layout(tensors: &[Self], operation: &str) -> Result<(DType, Device)> {
        let first = tensors.first().ok_or_else(|| {
            SbiInputError::invalid_value(format!("Cannot {} an empty list of tensors", operation))
        })?;
        if let Some(other) = tensors.iter().find(|t| t.device != first.device) {
            return Err(SbiInputError::invalid_value(format!(
                "Cannot {} tensors on different devices ('{}' and '{}')",
                operation, first.device, other.device
            )));
        }
        Ok((first.dtype(), first.device))
    }
}

fn reshape_array<T: Clone>(array: &ArrayD<T>, shape: &[usize]) -> Result<ArrayD<T>> {
    let values: Vec<T> = array.iter().cloned().collect();
    Ok(ArrayD::from_shape_vec(IxDyn(shape), values)?)
}

fn f32_views(tensors: &[Tensor]) -> Vec<ArrayViewD<'_, f32>> {
    tensors.iter().filter_map(|t| t.as_f32().map(|a| a.view())).collect()
}

fn f64_views(tensors: &[Tensor]) -> Vec<ArrayViewD<'_, f64>> {
    tensors
        .iter()
        .filter_map(|t| match &t.data {
            TensorData::F64(a) => Some(a.view()),
            _ => None,
        })
        .collect()
}

fn i64_views(tensors: &[Tensor]) -> Vec<ArrayViewD<'_, i64>> {
    tensors
        .iter()
        .filter_map(|t| match &t.data {
            TensorData::I64(a) => Some(a.view()),
            _ => None,
        })
        .collect()
}

/// A value returned by or passed to user code
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A tensor
    Tensor(Tensor),
    /// A host `ndarray` array
    NdArray(ArrayD<f64>),
    /// A bare scalar
    Scalar(f64),
    /// A flat sequence of numbers
    Sequence(Vec<f64>),
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Tensor(_) => "Tensor",
            Self::NdArray(_) => "ndarray",
            Self::Scalar(_) => "f64",
            Self::Sequence(_) => "Vec<f64>",
        }
    }

    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Tensor(t) => t.shape().to_vec(),
            Self::NdArray(a) => a.shape().to_vec(),
            Self::Scalar(_) => Vec::new(),
            Self::Sequence(values) => vec![values.len()],
        }
    }

    /// Size of the leading dimension, `None` for scalars
    #[must_use]
    pub fn leading_dim(&self) -> Option<usize> {
        self.shape().first().copied()
    }

    /// Number of scalar elements
    #[must_use]
    pub fn numel(&self) -> usize {
        self.shape().iter().product()
    }

    #[must_use]
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// Convert to a tensor of `dtype`; tensors keep their device, everything
    /// else lands on the host
    #[must_use]
    pub fn to_tensor(&self, dtype: DType) -> Tensor {
        match self {
            Self::Tensor(t) => t.to_dtype(dtype),
            Self::NdArray(a) => Tensor::from_f64(a.clone()).to_dtype(dtype),
            Self::Scalar(v) => Tensor::from_f64(ArrayD::from_elem(IxDyn(&[]), *v)).to_dtype(dtype),
            Self::Sequence(values) => {
                Tensor::from_f64(ndarray::Array1::from(values.clone()).into_dyn()).to_dtype(dtype)
            },
        }
    }

    /// Host copy of the values as `f64`
    #[must_use]
    pub fn to_f64_array(&self) -> ArrayD<f64> {
        self.to_tensor(DType::F64).to_f64_array()
    }
}

impl From<Tensor> for Value {
    fn from(tensor: Tensor) -> Self {
        Self::Tensor(tensor)
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(array: ArrayD<f64>) -> Self {
        Self::NdArray(array)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Self::Sequence(values)
    }
}
