//! Model-free appearance descriptor for re-identification.
//!
//! The descriptor is a spatial grid of colour histograms over a fixed-size thumbnail of
//! the detection crop. It is deterministic and cheap enough to run on every detection.

use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array1;

use crate::error::TrackerError;
use crate::tracker::rect::Rect;

/// An L2-normalised appearance vector.
///
/// Construction normalises the input and rejects zero or non-finite vectors, so a stored
/// `Embedding` is always a unit vector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "Vec<f32>", into = "Vec<f32>")
)]
pub struct Embedding(Array1<f32>);

impl Embedding {
    /// Normalise `values`; `None` if the vector is empty, zero or non-finite.
    pub fn new(values: Vec<f32>) -> Option<Self> {
        Self::from_array(Array1::from_vec(values))
    }

    pub fn from_array(mut values: Array1<f32>) -> Option<Self> {
        if values.is_empty() || !values.iter().all(|v| v.is_finite()) {
            return None;
        }
        let norm = values.dot(&values).sqrt();
        if !norm.is_finite() || norm <= 0.0 {
            return None;
        }
        values /= norm;
        Some(Self(values))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_array(&self) -> &Array1<f32> {
        &self.0
    }

    /// Cosine similarity; 0 when the dimensions differ.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        if self.0.len() != other.0.len() {
            return 0.0;
        }
        self.0.dot(&other.0)
    }
}

impl TryFrom<Vec<f32>> for Embedding {
    type Error = TrackerError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
            .ok_or_else(|| TrackerError::invalid("embedding", "zero or non-finite vector"))
    }
}

impl From<Embedding> for Vec<f32> {
    fn from(embedding: Embedding) -> Self {
        embedding.0.to_vec()
    }
}

/// Dot-product similarity between two descriptors.
///
/// Both inputs are expected to be unit vectors, which makes this the cosine similarity.
/// Mismatched lengths yield 0, as does a zero vector on either side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Shape of the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DescriptorConfig {
    /// Side of the square thumbnail the crop is downscaled to.
    pub thumbnail_size: u32,
    /// The thumbnail is split into `grid_size x grid_size` cells.
    pub grid_size: u32,
    pub hue_bins: usize,
    pub saturation_bins: usize,
    pub value_bins: usize,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 32,
            grid_size: 3,
            hue_bins: 8,
            saturation_bins: 2,
            value_bins: 2,
        }
    }
}

impl DescriptorConfig {
    /// Histogram slots per grid cell.
    pub fn slots_per_cell(&self) -> usize {
        self.hue_bins + self.saturation_bins * self.value_bins
    }

    /// Length of the descriptor vector.
    pub fn dimension(&self) -> usize {
        let cells = (self.grid_size * self.grid_size) as usize;
        cells * self.slots_per_cell()
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if self.thumbnail_size == 0 {
            return Err(TrackerError::invalid("descriptor.thumbnail_size", "must be positive"));
        }
        if self.grid_size == 0 || self.grid_size > self.thumbnail_size {
            return Err(TrackerError::invalid(
                "descriptor.grid_size",
                format!("must be in 1..={}", self.thumbnail_size),
            ));
        }
        if self.hue_bins == 0 || self.saturation_bins == 0 || self.value_bins == 0 {
            return Err(TrackerError::invalid("descriptor.bins", "bin counts must be positive"));
        }
        Ok(())
    }
}

/// Computes grid colour-histogram descriptors from image regions.
#[derive(Debug, Clone, Default)]
pub struct AppearanceDescriptor {
    config: DescriptorConfig,
}

impl AppearanceDescriptor {
    pub fn new(config: DescriptorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DescriptorConfig {
        &self.config
    }

    /// Raw descriptor of `bbox` within `image`.
    ///
    /// The box is clamped to the image. An empty crop yields the all-zero vector;
    /// anything else yields a unit vector of length [`DescriptorConfig::dimension`].
    pub fn compute(&self, image: &RgbImage, bbox: &Rect) -> Array1<f32> {
        let cfg = &self.config;
        let dim = cfg.dimension();

        let Some((x, y, w, h)) = clamp_to_image(bbox, image.width(), image.height()) else {
            return Array1::zeros(dim);
        };

        let crop = imageops::crop_imm(image, x, y, w, h).to_image();
        let size = cfg.thumbnail_size;
        let thumb = imageops::resize(&crop, size, size, FilterType::Triangle);

        let grid = cfg.grid_size;
        let slots = cfg.slots_per_cell();
        let mut counts = vec![0u32; dim];

        for (px, py, pixel) in thumb.enumerate_pixels() {
            let cell = ((py * grid / size) * grid + px * grid / size) as usize;
            let (hue, sat, val) = rgb_to_hsv(pixel.0);
            let base = cell * slots;

            counts[base + bin(hue / 360.0, cfg.hue_bins)] += 1;

            let sv = bin(sat, cfg.saturation_bins) * cfg.value_bins + bin(val, cfg.value_bins);
            counts[base + cfg.hue_bins + sv] += 1;
        }

        let mut descriptor: Array1<f32> = counts.into_iter().map(|c| c as f32).collect();
        let norm = descriptor.dot(&descriptor).sqrt();
        if norm > 0.0 {
            descriptor /= norm;
        }
        descriptor
    }

    /// Descriptor as an [`Embedding`]; `None` when the crop was empty.
    pub fn embed(&self, image: &RgbImage, bbox: &Rect) -> Option<Embedding> {
        Embedding::from_array(self.compute(image, bbox))
    }
}

/// Clamp a box to pixel bounds as (x, y, width, height); `None` if nothing is left.
fn clamp_to_image(bbox: &Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if bbox.is_degenerate() {
        return None;
    }
    let [x1, y1, x2, y2] = bbox.to_tlbr();
    let (w, h) = (width as f32, height as f32);

    let left = x1.clamp(0.0, w).floor() as u32;
    let top = y1.clamp(0.0, h).floor() as u32;
    let right = x2.clamp(0.0, w).ceil() as u32;
    let bottom = y2.clamp(0.0, h).ceil() as u32;

    if right <= left || bottom <= top {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

/// Map a value in `[0, 1]` to one of `bins` buckets.
#[inline]
fn bin(value: f32, bins: usize) -> usize {
    ((value * bins as f32) as usize).min(bins - 1)
}

/// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let hue = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / diff).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / diff + 2.0)
    } else {
        60.0 * ((r - g) / diff + 4.0)
    };
    let sat = if max == 0.0 { 0.0 } else { diff / max };

    (hue, sat, max)
}
