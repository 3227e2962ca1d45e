//! Target sizing: alignment snapping and aspect-preserving fit.

use serde::Serialize;
use tracing::debug;

use crate::canvas::aspect::{self, Resolution};
use crate::error::{CanvasError, CanvasResult};

/// Result of sizing a source image against a ratio token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionPlan {
    /// Canonical resolution after alignment snapping.
    pub target: Resolution,
    /// Size the source is resampled to before padding.
    pub fit: Resolution,
}

impl DimensionPlan {
    pub fn pad_width(&self) -> usize {
        self.target.width - self.fit.width
    }

    pub fn pad_height(&self) -> usize {
        self.target.height - self.fit.height
    }
}

/// Floor `value` to a multiple of `alignment`. Alignments of 0 and 1 are a no-op.
pub fn snap_to_multiple(value: usize, alignment: usize) -> usize {
    if alignment > 1 {
        value - value % alignment
    } else {
        value
    }
}

/// Largest size with the source's aspect ratio that fits inside `target`.
///
/// The width-exact candidate wins whenever its height fits; otherwise the
/// height-exact candidate is used. Rounding is half-to-even.
pub fn fit_within(source_width: usize, source_height: usize, target: Resolution) -> Resolution {
    let source_ratio = source_width as f64 / source_height as f64;
    let width_based_height = (target.width as f64 / source_ratio).round_ties_even() as usize;

    if width_based_height <= target.height {
        Resolution::new(target.width, width_based_height.max(1))
    } else {
        let height_based_width = (target.height as f64 * source_ratio).round_ties_even() as usize;
        Resolution::new(height_based_width.clamp(1, target.width), target.height)
    }
}

/// Resolve the snapped target resolution for `token` and the fit size of a
/// `source_width`x`source_height` image inside it.
pub fn plan_dimensions(
    source_width: usize,
    source_height: usize,
    token: &str,
    alignment: usize,
) -> CanvasResult<DimensionPlan> {
    if source_width == 0 || source_height == 0 {
        return Err(CanvasError::InvalidSourceDimensions {
            width: source_width,
            height: source_height,
        });
    }

    let canonical = aspect::lookup(token);
    let target = Resolution::new(
        snap_to_multiple(canonical.width, alignment),
        snap_to_multiple(canonical.height, alignment),
    );
    if target.width == 0 || target.height == 0 {
        return Err(CanvasError::InvalidSourceDimensions {
            width: target.width,
            height: target.height,
        });
    }

    let fit = fit_within(source_width, source_height, target);
    debug!(
        token,
        alignment,
        source = %Resolution::new(source_width, source_height),
        %target,
        %fit,
        "Planned outpaint canvas dimensions"
    );

    Ok(DimensionPlan { target, fit })
}
