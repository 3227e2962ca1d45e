//! Outpaint canvas preparation.
//!
//! Given an image batch and a target aspect ratio, build a canvas at the
//! ratio's canonical resolution holding the rescaled source, the padding
//! filled with neutral gray, and a mask marking what is left to generate.
//!
//! The pipeline is a pure function of its inputs:
//! [`geometry::plan_dimensions`] → [`resample::resample`] →
//! [`compose::compose`] → [`feather::feather`].

pub mod aspect;
pub mod backend;
pub mod compose;
pub mod feather;
pub mod geometry;
pub mod resample;

use ndarray::{Array3, Array4, ArrayView4};
use serde::Serialize;
use tracing::debug;

pub use aspect::{AspectRatio, Resolution};
pub use backend::{CanvasBackend, CpuBackend};
pub use compose::{Padding, PaddingPolicy};
pub use geometry::DimensionPlan;
pub use resample::InterpolationKernel;

use crate::error::{CanvasError, CanvasResult};

/// Fill value of generated regions, on every channel.
pub const NEUTRAL_FILL: f32 = 0.5;

/// Upper bound for the feathering width.
pub const MAX_RESOLUTION: usize = 8192;

/// Upper bound for the alignment parameter.
pub const MAX_MULTIPLE_OF: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutpaintParams {
    /// Ratio token such as `"16:9"`; unknown tokens fall back to 1024x1024.
    pub target_ratio: String,
    pub padding: PaddingPolicy,
    pub kernel: InterpolationKernel,
    /// Feather band width in pixels; 0 keeps the mask hard.
    pub feathering: usize,
    /// Target dimensions are floored to a multiple of this when > 1.
    pub multiple_of: usize,
}

impl Default for OutpaintParams {
    fn default() -> Self {
        Self {
            target_ratio: AspectRatio::Square.token().to_string(),
            padding: PaddingPolicy::Center,
            kernel: InterpolationKernel::Lanczos,
            feathering: 0,
            multiple_of: 8,
        }
    }
}

/// Summary of the geometry chosen for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CanvasLayout {
    pub plan: DimensionPlan,
    pub padding: Padding,
    pub canvas: Resolution,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutpaintCanvas {
    /// `[batch, height, width, channels]`, values in `[0, 1]`.
    pub image: Array4<f32>,
    /// `[batch, height, width]`; 0 keeps, 1 generates.
    pub mask: Array3<f32>,
    pub layout: CanvasLayout,
}

impl OutpaintCanvas {
    pub fn width(&self) -> usize {
        self.layout.canvas.width
    }

    pub fn height(&self) -> usize {
        self.layout.canvas.height
    }
}

/// Compute only the geometry for a `source_width`x`source_height` image.
pub fn plan_layout(
    source_width: usize,
    source_height: usize,
    params: &OutpaintParams,
) -> CanvasResult<CanvasLayout> {
    let plan = geometry::plan_dimensions(
        source_width,
        source_height,
        &params.target_ratio,
        params.multiple_of,
    )?;
    let padding = compose::compute_padding(plan.fit, plan.target, params.padding);
    Ok(CanvasLayout {
        plan,
        padding,
        canvas: padding.canvas_size(plan.fit),
    })
}

/// Run the full pipeline on the CPU backend.
pub fn prepare_outpaint_canvas(
    image: ArrayView4<f32>,
    params: &OutpaintParams,
) -> CanvasResult<OutpaintCanvas> {
    prepare_outpaint_canvas_with(&CpuBackend, image, params)
}

/// Run the full pipeline on `backend`. `image` is never modified.
pub fn prepare_outpaint_canvas_with<B: CanvasBackend + ?Sized>(
    backend: &B,
    image: ArrayView4<f32>,
    params: &OutpaintParams,
) -> CanvasResult<OutpaintCanvas> {
    let (batch, source_height, source_width, channels) = image.dim();
    if channels == 0 {
        return Err(CanvasError::EmptyChannels);
    }

    let layout = plan_layout(source_width, source_height, params)?;
    let fit = layout.plan.fit;

    let resized = backend.resample(image, fit.width, fit.height, params.kernel)?;
    let composed = compose::compose(
        backend,
        resized.view(),
        layout.plan.target,
        params.padding,
        NEUTRAL_FILL,
    )?;
    let (image, mask) = feather::feather(
        backend,
        composed.image.view(),
        composed.mask.view(),
        &composed.padding,
        params.feathering,
        NEUTRAL_FILL,
    )?;

    debug!(
        backend = backend.name(),
        batch,
        kernel = %params.kernel,
        padding = %params.padding,
        feathering = params.feathering,
        canvas = %layout.canvas,
        left = layout.padding.left,
        right = layout.padding.right,
        top = layout.padding.top,
        bottom = layout.padding.bottom,
        "Prepared outpaint canvas"
    );

    Ok(OutpaintCanvas {
        image,
        mask,
        layout,
    })
}
