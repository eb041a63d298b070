use {
    candle_core::{
        DType,
        Tensor,
    },
    std::fmt::Display,
};

/// Describes a named tensor by its element type and shape.
///
/// Used for the replay memory layout (where the leading dimension is the
/// capacity) as well as for the observation and action spaces of a game.
///
/// # Example
/// ```
/// use candle_core::DType;
/// use episodic_rl::components::TensorSpec;
///
/// let spec = TensorSpec::new("s1_states", DType::F32, &[200, 84, 84, 1]);
/// assert_eq!(spec.leading_dim(), Some(200));
/// assert_eq!(spec.element_shape(), &[84, 84, 1]);
/// assert_eq!(spec.element_len(), 84 * 84);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSpec {
    name: String,
    dtype: DType,
    shape: Vec<usize>,
}
impl TensorSpec {
    pub fn new(
        name: impl Into<String>,
        dtype: DType,
        shape: &[usize],
    ) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: shape.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The first dimension, i.e. the batch or capacity dimension.
    pub fn leading_dim(&self) -> Option<usize> {
        self.shape.first().copied()
    }

    /// The shape with the leading dimension removed.
    pub fn element_shape(&self) -> &[usize] {
        self.shape.get(1..).unwrap_or(&[])
    }

    /// The number of scalars in one element (without the leading dimension).
    pub fn element_len(&self) -> usize {
        self.element_shape().iter().product()
    }

    /// The same spec with an extra leading dimension of size `n`.
    pub fn with_leading_dim(
        &self,
        n: usize,
    ) -> Self {
        let mut shape = vec![n];
        shape.extend_from_slice(&self.shape);
        Self::new(self.name.clone(), self.dtype, &shape)
    }

    /// Check whether `tensor` has exactly this (full) shape.
    pub fn matches(
        &self,
        tensor: &Tensor,
    ) -> bool {
        tensor.dims() == self.shape.as_slice()
    }
}

impl Display for TensorSpec {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}{:?} ({:?})", self.name, self.shape, self.dtype)
    }
}
