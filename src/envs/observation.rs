use {
    crate::components::TensorSpec,
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::Tensor,
    std::collections::BTreeMap,
};

/// What a game exposes after every step: one or more named tensors.
///
/// A game can render several views of the same moment (the screen, a depth
/// map, an automap, ...) and an agent picks the one it learns from by name.
#[derive(Debug, Clone, Default)]
pub struct Observation {
    buffers: BTreeMap<String, Tensor>,
}
impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// An observation with a single named buffer.
    pub fn single(
        name: impl Into<String>,
        tensor: Tensor,
    ) -> Self {
        Self::new().with(name, tensor)
    }

    pub fn with(
        mut self,
        name: impl Into<String>,
        tensor: Tensor,
    ) -> Self {
        self.buffers.insert(name.into(), tensor);
        self
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Tensor> {
        self.buffers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buffers.keys().map(String::as_str)
    }

    /// Check that every buffer described by `space` is present with its shape.
    pub fn check_structure(
        &self,
        space: &[TensorSpec],
    ) -> Result<()> {
        for spec in space {
            let tensor = self
                .get(spec.name())
                .ok_or_else(|| anyhow!("observation has no `{}` buffer", spec.name()))?;
            if !spec.matches(tensor) {
                Err(anyhow!(
                    "observation buffer `{}` has shape {:?}, expected {:?}",
                    spec.name(),
                    tensor.dims(),
                    spec.shape(),
                ))?
            }
        }
        Ok(())
    }
}
