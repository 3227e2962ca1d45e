//! Gradient feathering of the mask seam and the matching image blend.
//!
//! Each padded edge gets a linear ramp of `min(width, pad)` samples laid on
//! the pad pixels touching the fit region, 0 next to the original content and
//! rising toward the canvas border. Vertical bands span the full canvas
//! height and horizontal bands the full width, so they meet at the corners.
//! Edges are conceptually applied in the order left, right, top, bottom with
//! later edges overwriting earlier ones; at a corner the top or bottom ramp
//! therefore wins over the left or right one.

use ndarray::{Array2, Array3, Array4, ArrayView3, ArrayView4, Axis, Zip};

use crate::canvas::backend::CanvasBackend;
use crate::canvas::compose::Padding;
use crate::error::{CanvasError, CanvasResult};

/// `len` evenly spaced samples from 0 to 1 inclusive; `[0.0]` when `len == 1`.
///
/// Computed from both ends toward the middle so the ramp is symmetric.
pub fn linear_ramp(len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = 1.0f32 / (len - 1) as f32;
            let halfway = len / 2;
            (0..len)
                .map(|k| {
                    if k < halfway {
                        step * k as f32
                    } else {
                        1.0 - step * (len - k - 1) as f32
                    }
                })
                .collect()
        }
    }
}

/// One feather band along a single axis.
#[derive(Debug, Clone, PartialEq)]
struct EdgeBand {
    start: usize,
    ramp: Vec<f32>,
    /// Whether values rise with the index (right/bottom edges).
    rising: bool,
}

impl EdgeBand {
    /// Band on the leading side: the `len` indices just before `content_start`.
    fn leading(content_start: usize, width: usize) -> Option<Self> {
        let len = width.min(content_start);
        (len > 0).then(|| Self {
            start: content_start - len,
            ramp: linear_ramp(len),
            rising: false,
        })
    }

    /// Band on the trailing side: the `len` indices starting at `content_end`.
    fn trailing(content_end: usize, pad: usize, width: usize) -> Option<Self> {
        let len = width.min(pad);
        (len > 0).then(|| Self {
            start: content_end,
            ramp: linear_ramp(len),
            rising: true,
        })
    }

    fn value_at(&self, index: usize) -> Option<f32> {
        let len = self.ramp.len();
        if index < self.start || index >= self.start + len {
            return None;
        }
        let offset = index - self.start;
        let k = if self.rising { offset } else { len - 1 - offset };
        Some(self.ramp[k])
    }
}

/// Feather bands for a canvas of `height`x`width` padded by `padding`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatherBands {
    left: Option<EdgeBand>,
    right: Option<EdgeBand>,
    top: Option<EdgeBand>,
    bottom: Option<EdgeBand>,
}

impl FeatherBands {
    pub fn new(padding: &Padding, height: usize, width: usize, feather_width: usize) -> Self {
        if feather_width == 0 {
            return Self::default();
        }
        Self {
            left: EdgeBand::leading(padding.left, feather_width),
            right: EdgeBand::trailing(
                width.saturating_sub(padding.right),
                padding.right,
                feather_width,
            ),
            top: EdgeBand::leading(padding.top, feather_width),
            bottom: EdgeBand::trailing(
                height.saturating_sub(padding.bottom),
                padding.bottom,
                feather_width,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }

    /// Band length actually used on each edge, as `(left, right, top, bottom)`.
    #[cfg(test)]
    fn lengths(&self) -> (usize, usize, usize, usize) {
        let len = |band: &Option<EdgeBand>| band.as_ref().map_or(0, |b| b.ramp.len());
        (
            len(&self.left),
            len(&self.right),
            len(&self.top),
            len(&self.bottom),
        )
    }

    /// Mask value the bands impose at `(y, x)`, if any; later edges take precedence.
    fn value_at(&self, y: usize, x: usize) -> Option<f32> {
        let row = |band: &Option<EdgeBand>| band.as_ref().and_then(|b| b.value_at(y));
        let col = |band: &Option<EdgeBand>| band.as_ref().and_then(|b| b.value_at(x));
        row(&self.bottom)
            .or_else(|| row(&self.top))
            .or_else(|| col(&self.right))
            .or_else(|| col(&self.left))
    }

    /// Per-pixel override plane; `NaN` marks pixels no band touches.
    fn overrides(&self, height: usize, width: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| {
            self.value_at(y, x).unwrap_or(f32::NAN)
        })
    }
}

/// Apply feather ramps to a hard mask, producing a new mask.
///
/// Pixels outside every band keep their value from `mask`.
pub fn feather_mask(mask: ArrayView3<f32>, padding: &Padding, feather_width: usize) -> Array3<f32> {
    let (_, height, width) = mask.dim();
    let bands = FeatherBands::new(padding, height, width, feather_width);
    if bands.is_empty() {
        return mask.to_owned();
    }

    let plane = bands.overrides(height, width);
    let mut output = mask.to_owned();
    for mut item in output.axis_iter_mut(Axis(0)) {
        Zip::from(&mut item).and(&plane).for_each(|value, &band| {
            if !band.is_nan() {
                *value = band;
            }
        });
    }
    output
}

/// Feather the mask seams and blend the image toward `fill` by the final mask.
///
/// A `feather_width` of 0 returns the inputs unchanged.
pub fn feather<B: CanvasBackend + ?Sized>(
    backend: &B,
    image: ArrayView4<f32>,
    mask: ArrayView3<f32>,
    padding: &Padding,
    feather_width: usize,
    fill: f32,
) -> CanvasResult<(Array4<f32>, Array3<f32>)> {
    let (batch, height, width, _) = image.dim();
    if mask.dim() != (batch, height, width) {
        return Err(CanvasError::ShapeMismatch {
            expected: vec![batch, height, width],
            actual: mask.shape().to_vec(),
        });
    }
    if feather_width == 0 {
        return Ok((image.to_owned(), mask.to_owned()));
    }

    let final_mask = feather_mask(mask, padding, feather_width);
    let final_image = backend.blend_toward_fill(image, final_mask.view(), fill)?;
    Ok((final_image, final_mask))
}
