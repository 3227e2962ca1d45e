//! Typed failures for the canvas pipeline, prompt parameters and the
//! image-set loader.

use std::path::PathBuf;

use thiserror::Error;

/// Structural failures of the outpaint canvas pipeline.
///
/// Unknown ratio tokens, feather widths wider than the pad and alignment
/// rounding are not errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    #[error("invalid source dimensions {width}x{height}: width and height must be > 0")]
    InvalidSourceDimensions { width: usize, height: usize },

    #[error(
        "unsupported interpolation kernel '{0}', expected one of nearest|bilinear|bicubic|area|lanczos"
    )]
    UnsupportedKernel(String),

    #[error("unknown padding policy '{0}', expected one of center|leading|trailing")]
    UnknownPaddingPolicy(String),

    #[error("image buffer must have at least one channel")]
    EmptyChannels,

    #[error("buffer shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

/// A supplied value rejected by a template parameter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("'{value}' is not a valid choice for '{name}', expected one of {}", choices.join("|"))]
    InvalidChoice {
        name: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("'{name}' expects an integer, got '{value}'")]
    NotAnInteger { name: String, value: String },

    #[error("'{name}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Failures while assembling an image batch from files on disk.
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("no valid images found in {0}")]
    NoImages(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "image {path} is {actual_width}x{actual_height} but the first image is {expected_width}x{expected_height}; \
         select a resize method or use the same size for all images"
    )]
    SizeMismatch {
        path: PathBuf,
        expected_width: usize,
        expected_height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("batch index {index} out of range for batch of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("unknown sort order '{0}', expected one of None|Ascending|Descending")]
    UnknownSortOrder(String),

    #[error("unknown resize method '{0}', expected one of None|Stretch|Crop|Pad")]
    UnknownResizeMethod(String),

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

pub type CanvasResult<T> = std::result::Result<T, CanvasError>;
