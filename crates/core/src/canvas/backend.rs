//! Numeric capabilities the canvas pipeline needs from a buffer backend.

use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis, Zip};

use crate::canvas::resample::{self, InterpolationKernel};
use crate::error::{CanvasError, CanvasResult};

/// Allocation, elementwise blending and resampling over image/mask buffers.
///
/// The geometry (planning, padding placement, feather bands) is computed
/// independently of the backend; only pixel work goes through this trait.
pub trait CanvasBackend: Send + Sync {
    fn name(&self) -> &str;

    /// New `[batch, height, width, channels]` buffer with every value set to `fill`.
    fn allocate_image(
        &self,
        batch: usize,
        height: usize,
        width: usize,
        channels: usize,
        fill: f32,
    ) -> Array4<f32>;

    /// New `[batch, height, width]` buffer with every value set to `fill`.
    fn allocate_mask(&self, batch: usize, height: usize, width: usize, fill: f32) -> Array3<f32>;

    /// `image * (1 - mask) + fill * mask`, with `mask` broadcast over channels.
    fn blend_toward_fill(
        &self,
        image: ArrayView4<f32>,
        mask: ArrayView3<f32>,
        fill: f32,
    ) -> CanvasResult<Array4<f32>>;

    fn resample(
        &self,
        image: ArrayView4<f32>,
        width: usize,
        height: usize,
        kernel: InterpolationKernel,
    ) -> CanvasResult<Array4<f32>>;
}

/// ndarray-backed implementation, parallel over the batch axis.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CanvasBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn allocate_image(
        &self,
        batch: usize,
        height: usize,
        width: usize,
        channels: usize,
        fill: f32,
    ) -> Array4<f32> {
        Array4::from_elem((batch, height, width, channels), fill)
    }

    fn allocate_mask(&self, batch: usize, height: usize, width: usize, fill: f32) -> Array3<f32> {
        Array3::from_elem((batch, height, width), fill)
    }

    fn blend_toward_fill(
        &self,
        image: ArrayView4<f32>,
        mask: ArrayView3<f32>,
        fill: f32,
    ) -> CanvasResult<Array4<f32>> {
        let (batch, height, width, channels) = image.dim();
        if mask.dim() != (batch, height, width) {
            return Err(CanvasError::ShapeMismatch {
                expected: vec![batch, height, width],
                actual: mask.shape().to_vec(),
            });
        }

        let mut output = Array4::<f32>::zeros((batch, height, width, channels));
        let mask = mask.insert_axis(Axis(3));
        let mask = mask
            .broadcast((batch, height, width, channels))
            .ok_or_else(|| CanvasError::ShapeMismatch {
                expected: vec![batch, height, width, channels],
                actual: mask.shape().to_vec(),
            })?;

        Zip::from(&mut output)
            .and(&image)
            .and(&mask)
            .par_for_each(|out, &pixel, &weight| {
                let keep = 1.0 - weight;
                *out = (pixel * keep + fill * (1.0 - keep)).clamp(0.0, 1.0);
            });

        Ok(output)
    }

    fn resample(
        &self,
        image: ArrayView4<f32>,
        width: usize,
        height: usize,
        kernel: InterpolationKernel,
    ) -> CanvasResult<Array4<f32>> {
        resample::resample(image, width, height, kernel)
    }
}
