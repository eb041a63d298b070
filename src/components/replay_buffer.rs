use {
    super::TensorSpec,
    crate::error::MemoryError,
    candle_core::{
        DType,
        Device,
        Tensor,
    },
    parking_lot::RwLock,
    rand::{
        seq::index,
        Rng,
    },
    std::sync::Arc,
    tracing::debug,
    uuid::Uuid,
};

pub const S1_BUFFER_NAME: &str = "s1_states";
pub const A_BUFFER_NAME: &str = "action_ids";
pub const S2_BUFFER_NAME: &str = "s2_states";
pub const R_BUFFER_NAME: &str = "rewards";
pub const T_BUFFER_NAME: &str = "terminals";

const NUM_OF_BUFFERS: usize = 5;

/// The id handed out for every stored transition.
pub type TransitionId = Uuid;

/// A replay buffer shared between the driver thread (single writer) and a
/// training worker (reader).
pub type SharedReplayBuffer = Arc<RwLock<ReplayBuffer>>;

/// A batch of transitions, as five aligned tensors.
///
/// # Fields
///
/// * `s1_states` - The originating states, `[n, ..element_shape]`.
/// * `action_ids` - The action indices, `[n]`.
/// * `s2_states` - The transitioned states, `[n, ..element_shape]`.
/// * `rewards` - The rewards, `[n]`.
/// * `terminals` - The terminal flags, `[n]`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub s1_states: Tensor,
    pub action_ids: Tensor,
    pub s2_states: Tensor,
    pub rewards: Tensor,
    pub terminals: Tensor,
}
impl Batch {
    /// The number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.rewards.dims().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A uniform replay buffer for off-policy algorithms.
///
/// The buffer is a ring buffer over five parallel, fixed-length buffers
/// (`s1_states`, `action_ids`, `s2_states`, `rewards` and `terminals`). The
/// write position is `written_count % capacity`, so the oldest transition is
/// always the next one to be overwritten.
///
/// The buffer is not synchronized on its own, wrap it in a
/// [`SharedReplayBuffer`] to share it across threads.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    s1_states: Vec<f32>,
    action_ids: Vec<u32>,
    s2_states: Vec<f32>,
    rewards: Vec<f64>,
    terminals: Vec<u8>,
    transition_ids: Vec<Option<TransitionId>>,

    s1_spec: TensorSpec,
    action_spec: TensorSpec,
    s2_spec: TensorSpec,
    reward_spec: TensorSpec,
    terminal_spec: TensorSpec,

    capacity: usize,
    written_count: usize,
    device: Device,
}

impl ReplayBuffer {
    /// Allocate the five buffers from their specifications.
    ///
    /// Every spec has the shape `[capacity, ..element_shape]` and is matched by
    /// name (see the `*_BUFFER_NAME` constants). Additional specs are ignored.
    ///
    /// States must have a float dtype. They are kept at `f32` precision
    /// whatever the spec says, an `F64` state spec is narrowed on
    /// [`add`](Self::add) and widened again in sampled batches.
    pub fn new(specs: &[TensorSpec]) -> Result<Self, MemoryError> {
        if specs.len() < NUM_OF_BUFFERS {
            return Err(MemoryError::Config(format!(
                "at least {NUM_OF_BUFFERS} buffer(s) must be specified, got {}",
                specs.len(),
            )));
        }

        let find = |name: &str| -> Result<TensorSpec, MemoryError> {
            specs
                .iter()
                .find(|spec| spec.name() == name)
                .cloned()
                .ok_or_else(|| MemoryError::Config(format!("no `{name}` buffer specified")))
        };
        let s1_spec = find(S1_BUFFER_NAME)?;
        let action_spec = find(A_BUFFER_NAME)?;
        let s2_spec = find(S2_BUFFER_NAME)?;
        let reward_spec = find(R_BUFFER_NAME)?;
        let terminal_spec = find(T_BUFFER_NAME)?;

        let capacity = s1_spec
            .leading_dim()
            .ok_or_else(|| MemoryError::Config(format!("`{S1_BUFFER_NAME}` has no capacity dimension")))?;
        if capacity == 0 {
            return Err(MemoryError::Config("capacity must be positive".to_string()));
        }
        for spec in [&action_spec, &s2_spec, &reward_spec, &terminal_spec] {
            if spec.leading_dim() != Some(capacity) {
                return Err(MemoryError::Config(format!(
                    "`{}` has capacity {:?}, expected {capacity}",
                    spec.name(),
                    spec.leading_dim(),
                )));
            }
        }
        for spec in [&action_spec, &reward_spec, &terminal_spec] {
            if spec.element_len() != 1 {
                return Err(MemoryError::Config(format!(
                    "`{}` must hold one scalar per transition, got {:?}",
                    spec.name(),
                    spec.element_shape(),
                )));
            }
        }
        if !action_spec.dtype().is_int() {
            return Err(MemoryError::UnsupportedDType(action_spec.dtype()));
        }
        for spec in [&s1_spec, &s2_spec] {
            if !spec.dtype().is_float() {
                return Err(MemoryError::UnsupportedDType(spec.dtype()));
            }
        }

        debug!(
            "Allocating replay buffer with capacity {capacity}: {s1_spec}, {action_spec}, \
            {s2_spec}, {reward_spec}, {terminal_spec}"
        );

        Ok(Self {
            s1_states: vec![0.0; capacity * s1_spec.element_len()],
            action_ids: vec![0; capacity * action_spec.element_len()],
            s2_states: vec![0.0; capacity * s2_spec.element_len()],
            rewards: vec![0.0; capacity * reward_spec.element_len()],
            terminals: vec![0; capacity * terminal_spec.element_len()],
            transition_ids: vec![None; capacity],
            s1_spec,
            action_spec,
            s2_spec,
            reward_spec,
            terminal_spec,
            capacity,
            written_count: 0,
            device: Device::Cpu,
        })
    }

    /// Wrap the buffer for shared access.
    pub fn into_shared(self) -> SharedReplayBuffer {
        Arc::new(RwLock::new(self))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The total number of transitions ever written (not capped by capacity).
    pub fn count(&self) -> usize {
        self.written_count
    }

    /// The number of slots that contain a written transition.
    pub fn size_for_sampling(&self) -> usize {
        self.written_count.min(self.capacity)
    }

    /// The slot the next [`add`](Self::add) writes to.
    pub fn next_write_index(&self) -> usize {
        self.written_count % self.capacity
    }

    /// The element shape the `s1_states` buffer accepts.
    pub fn state_shape(&self) -> &[usize] {
        self.s1_spec.element_shape()
    }

    /// The id of the transition currently stored in `slot`.
    pub fn transition_id(
        &self,
        slot: usize,
    ) -> Option<TransitionId> {
        self.transition_ids.get(slot).copied().flatten()
    }

    /// Add a transition, overwriting the oldest one when the buffer is full.
    pub fn add(
        &mut self,
        s1_state: &Tensor,
        action_index: usize,
        s2_state: &Tensor,
        reward: f64,
        terminal: bool,
    ) -> Result<TransitionId, MemoryError> {
        check_shape(S1_BUFFER_NAME, &self.s1_spec, s1_state)?;
        check_shape(S2_BUFFER_NAME, &self.s2_spec, s2_state)?;
        let action_id =
            u32::try_from(action_index).map_err(|_| MemoryError::InvalidAction(action_index))?;

        let s1 = s1_state.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
        let s2 = s2_state.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;

        let slot = self.next_write_index();
        let id = Uuid::new_v4();

        write_slot(&mut self.s1_states, slot, &s1);
        write_slot(&mut self.s2_states, slot, &s2);
        self.action_ids[slot] = action_id;
        self.rewards[slot] = reward;
        self.terminals[slot] = terminal as u8;
        self.transition_ids[slot] = Some(id);
        self.written_count += 1;

        Ok(id)
    }

    /// Draw `n` distinct slot indices uniformly at random.
    ///
    /// Indices come from `[0, size_for_sampling)`. While nothing has been
    /// written yet the range is `[0, n)` instead, so the returned slots hold
    /// zeroed, never written data.
    pub fn sample_indices<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<usize>, MemoryError> {
        if n > self.capacity {
            return Err(MemoryError::InsufficientData {
                requested: n,
                available: self.capacity,
            });
        }

        let range = match self.size_for_sampling() {
            0 => n,
            size => size,
        };
        if n > range {
            return Err(MemoryError::InsufficientData {
                requested: n,
                available: range,
            });
        }

        Ok(index::sample(rng, range, n).into_vec())
    }

    /// Sample a batch of `n` distinct transitions uniformly at random.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Batch, MemoryError> {
        let indices = self.sample_indices(n, rng)?;
        self.gather(&indices)
    }

    /// Copy out the full buffers (all `capacity` slots, written or not).
    pub fn get_all(&self) -> Result<Batch, MemoryError> {
        let indices: Vec<usize> = (0..self.capacity).collect();
        self.gather(&indices)
    }

    /// Forget every stored transition.
    ///
    /// Only the write counter is reset, the memory itself is left as is and
    /// gets overwritten by subsequent writes.
    pub fn reset(&mut self) {
        self.written_count = 0;
    }

    fn gather(
        &self,
        indices: &[usize],
    ) -> Result<Batch, MemoryError> {
        Ok(Batch {
            s1_states: self.gather_buffer(&self.s1_states, &self.s1_spec, indices)?,
            action_ids: self.gather_buffer(&self.action_ids, &self.action_spec, indices)?,
            s2_states: self.gather_buffer(&self.s2_states, &self.s2_spec, indices)?,
            rewards: self.gather_buffer(&self.rewards, &self.reward_spec, indices)?,
            terminals: self.gather_buffer(&self.terminals, &self.terminal_spec, indices)?,
        })
    }

    fn gather_buffer<T: candle_core::WithDType>(
        &self,
        buffer: &[T],
        spec: &TensorSpec,
        indices: &[usize],
    ) -> Result<Tensor, MemoryError> {
        let len = spec.element_len();
        let mut data = Vec::with_capacity(indices.len() * len);
        for &i in indices {
            data.extend_from_slice(&buffer[i * len..(i + 1) * len]);
        }

        let mut shape = vec![indices.len()];
        shape.extend_from_slice(spec.element_shape());

        Ok(Tensor::from_vec(data, shape, &self.device)?.to_dtype(spec.dtype())?)
    }
}

fn check_shape(
    buffer: &'static str,
    spec: &TensorSpec,
    tensor: &Tensor,
) -> Result<(), MemoryError> {
    if tensor.dims() != spec.element_shape() {
        return Err(MemoryError::InvalidShape {
            buffer,
            expected: spec.element_shape().to_vec(),
            actual: tensor.dims().to_vec(),
        });
    }
    Ok(())
}

fn write_slot<T: Copy>(
    buffer: &mut [T],
    slot: usize,
    values: &[T],
) {
    let len = values.len();
    buffer[slot * len..(slot + 1) * len].copy_from_slice(values);
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{
            rngs::StdRng,
            SeedableRng,
        },
        std::collections::HashSet,
    };

    fn specs(capacity: usize) -> Vec<TensorSpec> {
        vec![
            TensorSpec::new(S1_BUFFER_NAME, DType::F32, &[capacity, 2]),
            TensorSpec::new(A_BUFFER_NAME, DType::U32, &[capacity]),
            TensorSpec::new(S2_BUFFER_NAME, DType::F32, &[capacity, 2]),
            TensorSpec::new(R_BUFFER_NAME, DType::F64, &[capacity]),
            TensorSpec::new(T_BUFFER_NAME, DType::U8, &[capacity]),
        ]
    }

    fn state(value: f32) -> Tensor {
        Tensor::new(&[value, -value], &Device::Cpu).unwrap()
    }

    fn add_n(
        buffer: &mut ReplayBuffer,
        rewards: &[f64],
    ) {
        for (i, &reward) in rewards.iter().enumerate() {
            buffer
                .add(&state(i as f32), i, &state(i as f32 + 1.0), reward, false)
                .unwrap();
        }
    }

    #[test]
    fn rejects_too_few_specs() {
        let mut specs = specs(4);
        specs.pop();
        assert!(matches!(ReplayBuffer::new(&specs), Err(MemoryError::Config(_))));
    }

    #[test]
    fn rejects_missing_named_spec() {
        let mut specs = specs(4);
        specs[3] = TensorSpec::new("returns", DType::F64, &[4]);
        assert!(matches!(ReplayBuffer::new(&specs), Err(MemoryError::Config(_))));
    }

    #[test]
    fn rejects_mismatched_capacities() {
        let mut specs = specs(4);
        specs[1] = TensorSpec::new(A_BUFFER_NAME, DType::U32, &[5]);
        assert!(matches!(ReplayBuffer::new(&specs), Err(MemoryError::Config(_))));
    }

    #[test]
    fn rejects_integer_states() {
        let mut specs = specs(4);
        specs[2] = TensorSpec::new(S2_BUFFER_NAME, DType::U8, &[4, 2]);
        assert!(matches!(
            ReplayBuffer::new(&specs),
            Err(MemoryError::UnsupportedDType(DType::U8))
        ));
    }

    #[test]
    fn double_precision_states_come_back_as_f64() {
        let mut specs = specs(2);
        specs[0] = TensorSpec::new(S1_BUFFER_NAME, DType::F64, &[2, 2]);
        let mut buffer = ReplayBuffer::new(&specs).unwrap();
        add_n(&mut buffer, &[1.0]);

        let all = buffer.get_all().unwrap();
        assert_eq!(all.s1_states.dtype(), DType::F64);
        assert_eq!(all.s1_states.to_vec2::<f64>().unwrap()[0], vec![0.0, -0.0]);
    }

    #[test]
    fn rejects_action_indices_beyond_u32() {
        let mut buffer = ReplayBuffer::new(&specs(4)).unwrap();
        let index = u32::MAX as usize + 1;
        let result = buffer.add(&state(0.0), index, &state(1.0), 0.0, false);
        assert!(matches!(result, Err(MemoryError::InvalidAction(i)) if i == index));
        assert_eq!(buffer.count(), 0);
    }

    #[test]
    fn rejects_wrong_state_shape() {
        let mut buffer = ReplayBuffer::new(&specs(4)).unwrap();
        let wrong = Tensor::new(&[1f32, 2., 3.], &Device::Cpu).unwrap();
        let result = buffer.add(&wrong, 0, &state(1.0), 1.0, false);
        assert!(matches!(
            result,
            Err(MemoryError::InvalidShape { buffer: S1_BUFFER_NAME, .. })
        ));
        let result = buffer.add(&state(1.0), 0, &wrong, 1.0, false);
        assert!(matches!(
            result,
            Err(MemoryError::InvalidShape { buffer: S2_BUFFER_NAME, .. })
        ));
        assert_eq!(buffer.count(), 0);
    }

    #[test]
    fn keeps_everything_below_capacity() {
        let mut buffer = ReplayBuffer::new(&specs(4)).unwrap();
        add_n(&mut buffer, &[1.0, 2.0, 3.0]);
        assert_eq!(buffer.count(), 3);
        assert_eq!(buffer.size_for_sampling(), 3);

        let all = buffer.get_all().unwrap();
        assert_eq!(all.rewards.to_vec1::<f64>().unwrap(), vec![1.0, 2.0, 3.0, 0.0]);
        assert_eq!(all.action_ids.to_vec1::<u32>().unwrap(), vec![0, 1, 2, 0]);
        assert_eq!(
            all.s2_states.to_vec2::<f32>().unwrap()[2],
            vec![3.0, -3.0],
        );
    }

    #[test]
    fn ring_overwrites_oldest_first() {
        let mut buffer = ReplayBuffer::new(&specs(4)).unwrap();
        add_n(&mut buffer, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let all = buffer.get_all().unwrap();
        assert_eq!(all.rewards.to_vec1::<f64>().unwrap(), vec![5.0, 6.0, 3.0, 4.0]);
        assert_eq!(buffer.count(), 6);
        assert_eq!(buffer.size_for_sampling(), 4);
        assert_eq!(buffer.next_write_index(), 2);
    }

    #[test]
    fn every_transition_gets_a_fresh_id() {
        let mut buffer = ReplayBuffer::new(&specs(4)).unwrap();
        let a = buffer.add(&state(0.0), 0, &state(1.0), 0.0, false).unwrap();
        let b = buffer.add(&state(0.0), 0, &state(1.0), 0.0, true).unwrap();
        assert_ne!(a, b);
        assert_eq!(buffer.transition_id(0), Some(a));
        assert_eq!(buffer.transition_id(1), Some(b));
        assert_eq!(buffer.transition_id(2), None);
        assert_eq!(
            buffer.get_all().unwrap().terminals.to_vec1::<u8>().unwrap(),
            vec![0, 1, 0, 0],
        );
    }

    #[test]
    fn samples_distinct_written_slots() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut buffer = ReplayBuffer::new(&specs(8)).unwrap();
        add_n(&mut buffer, &[1.0; 11]);

        for _ in 0..50 {
            let indices = buffer.sample_indices(8, &mut rng).unwrap();
            assert_eq!(indices.len(), 8);
            let unique: HashSet<_> = indices.iter().collect();
            assert_eq!(unique.len(), 8);
            assert!(indices.iter().all(|&i| i < 8));
        }

        let batch = buffer.sample(5, &mut rng).unwrap();
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.s1_states.dims(), &[5, 2]);
        assert_eq!(batch.terminals.dtype(), DType::U8);
    }

    #[test]
    fn samples_only_from_written_slots() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut buffer = ReplayBuffer::new(&specs(10)).unwrap();
        add_n(&mut buffer, &[1.0, 2.0, 3.0]);

        for _ in 0..20 {
            let indices = buffer.sample_indices(3, &mut rng).unwrap();
            assert!(indices.iter().all(|&i| i < 3));
        }
        assert!(matches!(
            buffer.sample_indices(4, &mut rng),
            Err(MemoryError::InsufficientData { requested: 4, available: 3 }),
        ));
    }

    #[test]
    fn rejects_samples_larger_than_capacity() {
        let mut rng = StdRng::seed_from_u64(0);
        let buffer = ReplayBuffer::new(&specs(4)).unwrap();
        assert!(matches!(
            buffer.sample(5, &mut rng),
            Err(MemoryError::InsufficientData { requested: 5, available: 4 }),
        ));
    }

    #[test]
    fn empty_buffer_samples_from_first_slots() {
        let mut rng = StdRng::seed_from_u64(0);
        let buffer = ReplayBuffer::new(&specs(8)).unwrap();
        let indices = buffer.sample_indices(3, &mut rng).unwrap();
        let unique: HashSet<_> = indices.iter().collect();
        assert_eq!(unique.len(), 3);
        assert!(indices.iter().all(|&i| i < 3));
    }

    #[test]
    fn reset_only_rewinds_the_counter() {
        let mut buffer = ReplayBuffer::new(&specs(4)).unwrap();
        add_n(&mut buffer, &[1.0, 2.0]);
        buffer.reset();
        assert_eq!(buffer.count(), 0);
        assert_eq!(buffer.next_write_index(), 0);

        add_n(&mut buffer, &[9.0]);
        let all = buffer.get_all().unwrap();
        assert_eq!(all.rewards.to_vec1::<f64>().unwrap(), vec![9.0, 2.0, 0.0, 0.0]);
    }
}
