use {
    super::replay_buffer::{
        Batch,
        SharedReplayBuffer,
    },
    crate::error::MemoryError,
    rand::{
        rngs::StdRng,
        Rng,
        SeedableRng,
    },
};

/// Read-only access to a [`SharedReplayBuffer`].
///
/// This is what a training network gets to see of the replay memory. Every
/// call takes the read lock only for as long as it takes to copy the sampled
/// rows out, so the writer on the driver thread is never held up by training.
#[derive(Clone)]
pub struct MemoryReader {
    memory: SharedReplayBuffer,
}
impl MemoryReader {
    pub fn new(memory: SharedReplayBuffer) -> Self {
        Self { memory }
    }

    /// The total number of transitions written so far.
    pub fn count(&self) -> usize {
        self.memory.read().count()
    }

    pub fn capacity(&self) -> usize {
        self.memory.read().capacity()
    }

    pub fn size_for_sampling(&self) -> usize {
        self.memory.read().size_for_sampling()
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Batch, MemoryError> {
        self.memory.read().sample(n, rng)
    }

    /// An endless stream of uniformly sampled batches of `batch_size`.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> Batches {
        Batches {
            reader: self.clone(),
            batch_size,
            rng: StdRng::from_entropy(),
        }
    }

    /// Like [`batches`](Self::batches), but reproducible.
    pub fn seeded_batches(
        &self,
        batch_size: usize,
        seed: u64,
    ) -> Batches {
        Batches {
            reader: self.clone(),
            batch_size,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// Iterator returned by [`MemoryReader::batches`]. It never ends on its own.
pub struct Batches {
    reader: MemoryReader,
    batch_size: usize,
    rng: StdRng,
}
impl Iterator for Batches {
    type Item = Result<Batch, MemoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.reader.sample(self.batch_size, &mut self.rng))
    }
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::components::{
            ReplayBuffer,
            TensorSpec,
        },
        candle_core::{
            DType,
            Device,
            Tensor,
        },
        std::thread,
    };

    fn shared(capacity: usize) -> SharedReplayBuffer {
        ReplayBuffer::new(&[
            TensorSpec::new("s1_states", DType::F32, &[capacity, 1]),
            TensorSpec::new("action_ids", DType::U32, &[capacity]),
            TensorSpec::new("s2_states", DType::F32, &[capacity, 1]),
            TensorSpec::new("rewards", DType::F32, &[capacity]),
            TensorSpec::new("terminals", DType::U8, &[capacity]),
        ])
        .unwrap()
        .into_shared()
    }

    #[test]
    fn batches_follow_the_writer() {
        let memory = shared(16);
        let reader = MemoryReader::new(memory.clone());

        let write = |memory: &SharedReplayBuffer, i: usize| {
            let s = Tensor::new(&[i as f32], &Device::Cpu).unwrap();
            memory.write().add(&s, 0, &s, i as f64, false).unwrap();
        };
        for i in 0..4 {
            write(&memory, i);
        }

        let writer = thread::spawn(move || {
            for i in 4..100 {
                let s = Tensor::new(&[i as f32], &Device::Cpu).unwrap();
                memory.write().add(&s, 0, &s, i as f64, false).unwrap();
            }
        });

        let mut batches = reader.seeded_batches(4, 11);
        for batch in batches.by_ref().take(50) {
            let batch = batch.unwrap();
            assert_eq!(batch.len(), 4);
        }
        writer.join().unwrap();

        assert_eq!(reader.count(), 100);
        assert_eq!(reader.size_for_sampling(), 16);
        let rewards = batches.next().unwrap().unwrap().rewards.to_vec1::<f32>().unwrap();
        assert!(rewards.iter().all(|&r| r >= 84.0));
    }
}
