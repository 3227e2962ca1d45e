//! Filename-sorted image set loading and PNG export.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{DynamicImage, ExtendedColorType, ImageFormat};
use ndarray::{concatenate, s, Array4, ArrayView3, ArrayView4, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::canvas::compose::{self, Padding};
use crate::canvas::geometry::fit_within;
use crate::canvas::resample::{resample, InterpolationKernel};
use crate::canvas::{CpuBackend, Resolution};
use crate::error::{CanvasError, DatasetError};
use crate::types::ImageBatch;

pub const IMAGE_EXTENSIONS: [&str; 10] = [
    "png", "jpg", "jpeg", "webp", "bmp", "gif", "jpe", "apng", "tif", "tiff",
];

pub fn has_image_extension(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Keep only names with a recognised image extension, in their given order.
pub fn filter_image_files<S: AsRef<str>>(files: &[S]) -> Vec<String> {
    files
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| has_image_extension(name))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    None,
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [Self::None, Self::Ascending, Self::Descending];

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Ascending => "Ascending",
            Self::Descending => "Descending",
        }
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|o| o.name().to_string()).collect()
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortOrder {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DatasetError::UnknownSortOrder(s.to_string()))
    }
}

/// How images whose size differs from the first image are conformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchResizeMethod {
    /// Reject mismatched sizes.
    #[default]
    None,
    /// Resample to the first image's size, ignoring aspect.
    Stretch,
    /// Keep the top-left region, zero-filling where the image is smaller.
    Crop,
    /// Fit inside the first image's size and center on black.
    Pad,
}

impl BatchResizeMethod {
    pub const ALL: [BatchResizeMethod; 4] = [Self::None, Self::Stretch, Self::Crop, Self::Pad];

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Stretch => "Stretch",
            Self::Crop => "Crop",
            Self::Pad => "Pad",
        }
    }

    pub fn names() -> Vec<String> {
        Self::ALL.iter().map(|m| m.name().to_string()).collect()
    }
}

impl fmt::Display for BatchResizeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BatchResizeMethod {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|method| method.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DatasetError::UnknownResizeMethod(s.to_string()))
    }
}

/// One run of a natural sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPart {
    Text(String),
    /// Digit run with leading zeros stripped, compared by numeric value.
    Number(String),
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            (KeyPart::Text(_), KeyPart::Number(_)) => Ordering::Less,
            (KeyPart::Number(_), KeyPart::Text(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split `name` into alternating text and digit runs.
///
/// The key always starts with a (possibly empty) text run, so two keys line
/// up run for run and `img2` sorts before `img10`.
pub fn natural_key(name: &str, case_sensitive: bool) -> Vec<KeyPart> {
    let name = if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    };

    let mut parts = Vec::new();
    let mut text = String::new();
    let mut digits = String::new();
    for ch in name.chars() {
        if ch.is_ascii_digit() {
            if digits.is_empty() {
                parts.push(KeyPart::Text(std::mem::take(&mut text)));
            }
            digits.push(ch);
        } else {
            if !digits.is_empty() {
                parts.push(number_part(&digits));
                digits.clear();
            }
            text.push(ch);
        }
    }
    if digits.is_empty() {
        parts.push(KeyPart::Text(text));
    } else {
        parts.push(number_part(&digits));
        parts.push(KeyPart::Text(String::new()));
    }
    parts
}

fn number_part(digits: &str) -> KeyPart {
    let trimmed = digits.trim_start_matches('0');
    KeyPart::Number(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
}

/// Stable in-place sort of `files` by name.
pub fn sort_filenames(files: &mut [String], order: SortOrder, natural: bool, case_sensitive: bool) {
    let descending = match order {
        SortOrder::None => return,
        SortOrder::Ascending => false,
        SortOrder::Descending => true,
    };

    let directed = |ordering: Ordering| if descending { ordering.reverse() } else { ordering };

    // Comparators are flipped rather than the result reversed so ties keep
    // their input order in both directions.
    if natural {
        files.sort_by(|a, b| {
            directed(natural_key(a, case_sensitive).cmp(&natural_key(b, case_sensitive)))
        });
    } else if case_sensitive {
        files.sort_by(|a, b| directed(a.cmp(b)));
    } else {
        files.sort_by(|a, b| directed(a.to_lowercase().cmp(&b.to_lowercase())));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub sort_order: SortOrder,
    pub natural_sort: bool,
    pub case_sensitive: bool,
    pub resize_method: BatchResizeMethod,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::Ascending,
            natural_sort: true,
            case_sensitive: false,
            resize_method: BatchResizeMethod::None,
        }
    }
}

/// Host-provided decoding of one file into a `[1, height, width, channels]` batch.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<ImageBatch, DatasetError>;
}

/// Decodes files with the `image` crate into RGB.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageDecoder;

impl ImageDecoder for FsImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageBatch, DatasetError> {
        let img = image::open(path).map_err(|source| DatasetError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(dynamic_to_batch(&img))
    }
}

/// Convert a decoded image to a single-image RGB batch in `[0, 1]`.
pub fn dynamic_to_batch(img: &DynamicImage) -> ImageBatch {
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    Array4::from_shape_fn((1, height, width, 3), |(_, y, x, c)| {
        f32::from(rgb.get_pixel(x as u32, y as u32)[c]) / 255.0
    })
}

/// Image file names directly inside `dir`, in byte order.
pub fn list_image_files(dir: &Path) -> Result<Vec<String>, DatasetError> {
    let io_err = |source: std::io::Error| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(filter_image_files(&names))
}

/// Filter, sort, decode and stack `files` (relative to `dir`) into one batch.
///
/// Every image is conformed to the first image's size per
/// `options.resize_method`.
pub fn load_image_set(
    dir: &Path,
    files: &[String],
    options: &LoadOptions,
    decoder: &dyn ImageDecoder,
) -> Result<ImageBatch, DatasetError> {
    let mut names = filter_image_files(files);
    if names.is_empty() {
        return Err(DatasetError::NoImages(dir.to_path_buf()));
    }
    sort_filenames(
        &mut names,
        options.sort_order,
        options.natural_sort,
        options.case_sensitive,
    );

    let paths: Vec<PathBuf> = names.iter().map(|name| dir.join(name)).collect();
    let decoded = paths
        .par_iter()
        .map(|path| decoder.decode(path))
        .collect::<Result<Vec<_>, _>>()?;

    let (_, height, width, channels) = decoded[0].dim();
    let target = Resolution::new(width, height);

    let mut conformed = Vec::with_capacity(decoded.len());
    for (image, path) in decoded.iter().zip(&paths) {
        let (_, h, w, c) = image.dim();
        if c != channels {
            return Err(CanvasError::ShapeMismatch {
                expected: vec![1, h, w, channels],
                actual: image.shape().to_vec(),
            }
            .into());
        }
        if (w, h) == (width, height) {
            conformed.push(image.clone());
            continue;
        }
        debug!(
            path = %path.display(),
            from = %Resolution::new(w, h),
            to = %target,
            method = %options.resize_method,
            "Conforming image size"
        );
        let resized = match options.resize_method {
            BatchResizeMethod::None => {
                return Err(DatasetError::SizeMismatch {
                    path: path.clone(),
                    expected_width: width,
                    expected_height: height,
                    actual_width: w,
                    actual_height: h,
                })
            }
            BatchResizeMethod::Stretch => {
                resample(image.view(), width, height, InterpolationKernel::Lanczos)?
            }
            BatchResizeMethod::Crop => crop_top_left(image.view(), target),
            BatchResizeMethod::Pad => pad_to_fit(image.view(), target)?,
        };
        conformed.push(resized);
    }

    let views: Vec<_> = conformed.iter().map(|image| image.view()).collect();
    let batch = concatenate(Axis(0), &views).map_err(|_| CanvasError::ShapeMismatch {
        expected: vec![conformed.len(), height, width, channels],
        actual: conformed.iter().flat_map(|i| i.shape().to_vec()).collect(),
    })?;

    info!(
        dir = %dir.display(),
        count = names.len(),
        size = %target,
        "Loaded image set"
    );
    Ok(batch)
}

fn crop_top_left(image: ArrayView4<f32>, target: Resolution) -> ImageBatch {
    let (batch, height, width, channels) = image.dim();
    let rows = height.min(target.height);
    let cols = width.min(target.width);
    let mut out = Array4::zeros((batch, target.height, target.width, channels));
    out.slice_mut(s![.., ..rows, ..cols, ..])
        .assign(&image.slice(s![.., ..rows, ..cols, ..]));
    out
}

fn pad_to_fit(image: ArrayView4<f32>, target: Resolution) -> Result<ImageBatch, DatasetError> {
    let (_, height, width, _) = image.dim();
    let fit = fit_within(width, height, target);
    let resized = resample(image, fit.width, fit.height, InterpolationKernel::Lanczos)?;
    let padding = pad_offsets(
        target.width.saturating_sub(fit.width),
        target.height.saturating_sub(fit.height),
    );
    let composed = compose::compose_with_padding(&CpuBackend, resized.view(), padding, 0.0)?;
    Ok(composed.image)
}

/// Leading offset is `pad / 2` rounded half-to-even, so a pad of 3 puts 2
/// pixels before the image and 1 after.
fn pad_offsets(pad_width: usize, pad_height: usize) -> Padding {
    let half = |pad: usize| (pad as f64 * 0.5).round_ties_even() as usize;
    let (left, top) = (half(pad_width), half(pad_height));
    Padding {
        left,
        right: pad_width - left,
        top,
        bottom: pad_height - top,
    }
}

fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn write_png(
    path: &Path,
    data: &[u8],
    width: usize,
    height: usize,
    color: ExtendedColorType,
) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| DatasetError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image::save_buffer_with_format(
        path,
        data,
        width as u32,
        height as u32,
        color,
        ImageFormat::Png,
    )
    .map_err(|source| DatasetError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Write image `index` of `batch` as an 8-bit PNG (1, 3 or 4 channels).
pub fn save_image(batch: ArrayView4<f32>, index: usize, path: &Path) -> Result<(), DatasetError> {
    let (len, height, width, channels) = batch.dim();
    if index >= len {
        return Err(DatasetError::IndexOutOfRange { index, len });
    }
    let color = match channels {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        _ => {
            return Err(CanvasError::ShapeMismatch {
                expected: vec![len, height, width, 3],
                actual: batch.shape().to_vec(),
            }
            .into())
        }
    };
    let data: Vec<u8> = batch.index_axis(Axis(0), index).iter().map(|v| quantize(*v)).collect();
    write_png(path, &data, width, height, color)
}

/// Write mask `index` of `mask` as an 8-bit grayscale PNG.
pub fn save_mask(mask: ArrayView3<f32>, index: usize, path: &Path) -> Result<(), DatasetError> {
    let (len, height, width) = mask.dim();
    if index >= len {
        return Err(DatasetError::IndexOutOfRange { index, len });
    }
    let data: Vec<u8> = mask.index_axis(Axis(0), index).iter().map(|v| quantize(*v)).collect();
    write_png(path, &data, width, height, ExtendedColorType::L8)
}
