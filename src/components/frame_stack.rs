use {
    candle_core::{
        DType,
        Device,
        Result,
        Tensor,
    },
    std::collections::VecDeque,
};

/// A rolling window over the last `n` frames.
///
/// Frames are concatenated along their last axis, so `n` frames of shape
/// `[h, w, c]` stack into `[h, w, c * n]`. The window starts out filled with
/// zeroed frames.
pub struct FrameStack {
    frames: VecDeque<Tensor>,
    n: usize,
    frame_shape: Vec<usize>,
}
impl FrameStack {
    pub fn new(
        n: usize,
        frame_shape: &[usize],
        device: &Device,
    ) -> Result<Self> {
        let zeros = Tensor::zeros(frame_shape, DType::F32, device)?;
        Ok(Self {
            frames: (0..n).map(|_| zeros.clone()).collect(),
            n,
            frame_shape: frame_shape.to_vec(),
        })
    }

    /// The shape of a stacked tensor.
    pub fn output_shape(&self) -> Vec<usize> {
        stacked_shape(&self.frame_shape, self.n)
    }

    /// Push `frame` into the window and return the new stack.
    pub fn push(
        &mut self,
        frame: Tensor,
    ) -> Result<Tensor> {
        if self.frames.len() == self.n {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
        self.stacked()
    }

    /// The current stack.
    pub fn stacked(&self) -> Result<Tensor> {
        let frames: Vec<&Tensor> = self.frames.iter().collect();
        Tensor::cat(&frames, self.frame_shape.len().saturating_sub(1))
    }

    /// The stack as it would look after pushing `frame`, leaving the window
    /// untouched.
    pub fn peek_with(
        &self,
        frame: &Tensor,
    ) -> Result<Tensor> {
        let frames: Vec<&Tensor> = self
            .frames
            .iter()
            .skip(1)
            .chain(std::iter::once(frame))
            .collect();
        Tensor::cat(&frames, self.frame_shape.len().saturating_sub(1))
    }
}

/// The shape of `n` stacked frames of `frame_shape`.
pub fn stacked_shape(
    frame_shape: &[usize],
    n: usize,
) -> Vec<usize> {
    let mut shape = frame_shape.to_vec();
    if let Some(last) = shape.last_mut() {
        *last *= n;
    }
    shape
}
