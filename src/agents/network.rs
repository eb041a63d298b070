use {
    super::{
        DistributionStrategy,
        TrainLoss,
    },
    crate::components::{
        MemoryReader,
        TensorSpec,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
    tracing::debug,
};

/// A trainable function approximator behind a [`QAgent`](super::QAgent).
///
/// The network is handed read-only access to the replay memory at
/// initialization and samples its own training batches from it.
pub trait Network: Send {
    fn init(
        &mut self,
        memory: MemoryReader,
        input_spec: &TensorSpec,
        output_spec: &TensorSpec,
    ) -> Result<()>;

    /// Map a batch of inputs `[n, ..input_shape]` to `[n, ..output_shape]`.
    fn predict(
        &mut self,
        input: &Tensor,
    ) -> Result<Tensor>;

    /// Run a single training iteration, optionally against a target network.
    fn train_batch(
        &mut self,
        episode: usize,
        step: usize,
        target: Option<&Self>,
    ) -> Result<TrainLoss>
    where
        Self: Sized;

    fn weights(&self) -> Result<Vec<Tensor>>;
    fn set_weights(
        &mut self,
        weights: &[Tensor],
    ) -> Result<()>;

    fn distribution_strategy(&self) -> DistributionStrategy;
    fn persist_model(&self) -> Result<()>;
}

/// A network that ignores its input.
///
/// Predictions are uniformly random and so is the loss of every training
/// iteration. Training still samples a batch from the replay memory, which
/// makes it useful to exercise the whole harness without a real model.
pub struct RandomNetwork {
    batch_size: usize,
    rng: StdRng,
    memory: Option<MemoryReader>,
    input_spec: Option<TensorSpec>,
    output_spec: Option<TensorSpec>,
    weights: Vec<Tensor>,
    train_iterations: usize,
}
impl RandomNetwork {
    pub fn new(
        batch_size: usize,
        seed: Option<u64>,
    ) -> Self {
        Self {
            batch_size,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            memory: None,
            input_spec: None,
            output_spec: None,
            weights: Vec::new(),
            train_iterations: 0,
        }
    }

    /// The number of training iterations that sampled a batch.
    pub fn train_iterations(&self) -> usize {
        self.train_iterations
    }

    fn specs(&self) -> Result<(&TensorSpec, &TensorSpec)> {
        match (&self.input_spec, &self.output_spec) {
            (Some(input), Some(output)) => Ok((input, output)),
            _ => Err(anyhow!("Network is not initialized.")),
        }
    }
}

impl Network for RandomNetwork {
    fn init(
        &mut self,
        memory: MemoryReader,
        input_spec: &TensorSpec,
        output_spec: &TensorSpec,
    ) -> Result<()> {
        let weights: Vec<f32> = (0..output_spec.shape().iter().product::<usize>())
            .map(|_| self.rng.gen())
            .collect();
        self.weights = vec![Tensor::from_vec(weights, output_spec.shape(), &Device::Cpu)?];
        self.memory = Some(memory);
        self.input_spec = Some(input_spec.clone());
        self.output_spec = Some(output_spec.clone());
        Ok(())
    }

    fn predict(
        &mut self,
        input: &Tensor,
    ) -> Result<Tensor> {
        let (input_spec, output_spec) = self.specs()?;
        let dims = input.dims();
        if dims.len() != input_spec.shape().len() + 1 || &dims[1..] != input_spec.shape() {
            Err(anyhow!("expected a batch of {input_spec}, got {dims:?}"))?
        }

        let mut shape = vec![dims[0]];
        shape.extend_from_slice(output_spec.shape());
        let values: Vec<f32> = (0..shape.iter().product::<usize>())
            .map(|_| self.rng.gen())
            .collect();
        Ok(Tensor::from_vec(values, shape, input.device())?)
    }

    fn train_batch(
        &mut self,
        episode: usize,
        step: usize,
        target: Option<&Self>,
    ) -> Result<TrainLoss> {
        let memory = self
            .memory
            .as_ref()
            .ok_or_else(|| anyhow!("Network is not initialized."))?;
        if memory.size_for_sampling() >= self.batch_size {
            let batch = memory.sample(self.batch_size, &mut self.rng)?;
            self.train_iterations += 1;
            debug!(
                "episode {episode}, step {step}: sampled {} transitions (target network: {})",
                batch.len(),
                target.is_some(),
            );
        }
        Ok(self.rng.gen_range(0.0..100.0))
    }

    fn weights(&self) -> Result<Vec<Tensor>> {
        Ok(self.weights.clone())
    }

    fn set_weights(
        &mut self,
        weights: &[Tensor],
    ) -> Result<()> {
        self.weights = weights.to_vec();
        Ok(())
    }

    fn distribution_strategy(&self) -> DistributionStrategy {
        DistributionStrategy::SingleDevice
    }

    fn persist_model(&self) -> Result<()> {
        debug!("random network has no model to persist");
        Ok(())
    }
}
