//! Padding placement and canvas construction.

use std::fmt;
use std::str::FromStr;

use ndarray::{s, Array3, Array4, ArrayView4};
use serde::Serialize;

use crate::canvas::aspect::Resolution;
use crate::canvas::backend::CanvasBackend;
use crate::error::{CanvasError, CanvasResult};

/// How the gap between the fit size and the target is distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaddingPolicy {
    /// Split evenly; the odd pixel goes to the right/bottom.
    #[default]
    Center,
    /// All padding on the left (landscape/square target) or top (portrait target).
    Leading,
    /// All padding on the right (landscape/square target) or bottom (portrait target).
    Trailing,
}

impl PaddingPolicy {
    pub const ALL: [PaddingPolicy; 3] = [Self::Center, Self::Leading, Self::Trailing];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Leading => "leading",
            Self::Trailing => "trailing",
        }
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|p| p.name().to_string()).collect()
    }
}

impl fmt::Display for PaddingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PaddingPolicy {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" => Ok(Self::Center),
            "leading" | "top/left" => Ok(Self::Leading),
            "trailing" | "bottom/right" => Ok(Self::Trailing),
            _ => Err(CanvasError::UnknownPaddingPolicy(s.to_string())),
        }
    }
}

/// Pixel amounts added on each edge of the fit image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Padding {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

impl Padding {
    pub fn horizontal(&self) -> usize {
        self.left + self.right
    }

    pub fn vertical(&self) -> usize {
        self.top + self.bottom
    }

    pub fn is_empty(&self) -> bool {
        self.horizontal() == 0 && self.vertical() == 0
    }

    /// Canvas size produced by padding an image of size `fit`.
    pub fn canvas_size(&self, fit: Resolution) -> Resolution {
        Resolution::new(fit.width + self.horizontal(), fit.height + self.vertical())
    }
}

/// Distribute `target - fit` onto the four edges.
///
/// For `Leading`/`Trailing` the padded axis is chosen by the target's
/// orientation, not by which axis the fit left short. When the two disagree
/// the short axis gets no padding and the canvas ends up smaller than
/// `target` on that axis.
pub fn compute_padding(fit: Resolution, target: Resolution, policy: PaddingPolicy) -> Padding {
    let pad_width = target.width.saturating_sub(fit.width);
    let pad_height = target.height.saturating_sub(fit.height);
    let is_portrait = target.is_portrait();

    match policy {
        PaddingPolicy::Center => {
            let left = pad_width / 2;
            let top = pad_height / 2;
            Padding {
                left,
                right: pad_width - left,
                top,
                bottom: pad_height - top,
            }
        }
        PaddingPolicy::Leading => Padding {
            left: if is_portrait { 0 } else { pad_width },
            top: if is_portrait { pad_height } else { 0 },
            ..Padding::default()
        },
        PaddingPolicy::Trailing => Padding {
            right: if is_portrait { 0 } else { pad_width },
            bottom: if is_portrait { pad_height } else { 0 },
            ..Padding::default()
        },
    }
}

/// Padded image and hard mask before any feathering.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedCanvas {
    pub image: Array4<f32>,
    pub mask: Array3<f32>,
    pub padding: Padding,
}

/// Place `fit_image` on a canvas padded with `fill`.
///
/// The mask is 0 over the fit region and 1 over the padding.
pub fn compose<B: CanvasBackend + ?Sized>(
    backend: &B,
    fit_image: ArrayView4<f32>,
    target: Resolution,
    policy: PaddingPolicy,
    fill: f32,
) -> CanvasResult<ComposedCanvas> {
    let (_, fit_height, fit_width, _) = fit_image.dim();
    let padding = compute_padding(Resolution::new(fit_width, fit_height), target, policy);
    compose_with_padding(backend, fit_image, padding, fill)
}

/// Same as [`compose`], with the edge amounts already decided.
pub fn compose_with_padding<B: CanvasBackend + ?Sized>(
    backend: &B,
    fit_image: ArrayView4<f32>,
    padding: Padding,
    fill: f32,
) -> CanvasResult<ComposedCanvas> {
    let (batch, fit_height, fit_width, channels) = fit_image.dim();
    if channels == 0 {
        return Err(CanvasError::EmptyChannels);
    }

    let canvas = padding.canvas_size(Resolution::new(fit_width, fit_height));

    let rows = padding.top..padding.top + fit_height;
    let cols = padding.left..padding.left + fit_width;

    let mut image = backend.allocate_image(batch, canvas.height, canvas.width, channels, fill);
    image
        .slice_mut(s![.., rows.clone(), cols.clone(), ..])
        .assign(&fit_image);

    let mut mask = backend.allocate_mask(batch, canvas.height, canvas.width, 1.0);
    mask.slice_mut(s![.., rows, cols]).fill(0.0);

    Ok(ComposedCanvas {
        image,
        mask,
        padding,
    })
}
