use candle_core::{
    DType,
    Result,
    Tensor,
};

/// Luminance weights of the red, green and blue channels.
const LUMINANCE: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// Rescales and optionally desaturates `[h, w, c]` screen buffers.
///
/// Resizing uses nearest neighbour sampling. Monochrome conversion weights
/// three channel (RGB) screens by luminance and averages any other channel
/// count, leaving a single channel.
///
/// # Example
/// ```
/// use candle_core::{DType, Device, Tensor};
/// use episodic_rl::components::ScreenTransform;
///
/// let transform = ScreenTransform {
///     size: Some([2, 2]),
///     monochrome: true,
/// };
/// assert_eq!(transform.output_shape(&[4, 6, 3]), vec![2, 2, 1]);
///
/// let screen = Tensor::ones((4, 6, 3), DType::F32, &Device::Cpu).unwrap();
/// assert_eq!(transform.apply(&screen).unwrap().dims(), &[2, 2, 1]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenTransform {
    /// Target `[height, width]`, `None` keeps the size of the game's screen.
    pub size: Option<[usize; 2]>,
    pub monochrome: bool,
}
impl ScreenTransform {
    pub fn is_identity(&self) -> bool {
        self.size.is_none() && !self.monochrome
    }

    /// The shape of a transformed `[h, w, c]` screen.
    pub fn output_shape(
        &self,
        screen_shape: &[usize],
    ) -> Vec<usize> {
        let mut shape = screen_shape.to_vec();
        if let [h, w, c] = shape.as_mut_slice() {
            if let Some([height, width]) = self.size {
                *h = height;
                *w = width;
            }
            if self.monochrome {
                *c = 1;
            }
        }
        shape
    }

    /// Transform a `[h, w, c]` screen into an `f32` tensor of
    /// [`ScreenTransform::output_shape`].
    pub fn apply(
        &self,
        screen: &Tensor,
    ) -> Result<Tensor> {
        let mut screen = screen.to_dtype(DType::F32)?;
        if screen.rank() != 3 {
            return Ok(screen);
        }

        if let Some([height, width]) = self.size {
            if screen.dims()[..2] != [height, width] {
                screen = screen
                    .permute((2, 0, 1))?
                    .unsqueeze(0)?
                    .contiguous()?
                    .upsample_nearest2d(height, width)?
                    .squeeze(0)?
                    .permute((1, 2, 0))?
                    .contiguous()?;
            }
        }

        if self.monochrome {
            screen = match screen.dim(2)? {
                3 => {
                    let weights = Tensor::new(&LUMINANCE, screen.device())?;
                    screen.broadcast_mul(&weights)?.sum_keepdim(2)?
                }
                _ => screen.mean_keepdim(2)?,
            };
        }
        Ok(screen)
    }
}
