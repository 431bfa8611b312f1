//! Frame preprocessing: downscale, grayscale, blur, Otsu binarization.
//!
//! Detection runs on a bounded-size frame: the larger dimension is capped
//! (default 500 px) before any filtering so per-frame cost does not grow with
//! camera resolution. The returned scale factor maps detected coordinates
//! back to the source frame.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::filter::gaussian_blur_f32;

use crate::DetectError;

/// Preprocessing configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PreprocessConfig {
    /// Cap on the larger frame dimension before detection (pixels).
    pub max_dimension: u32,
    /// Gaussian blur sigma applied before binarization.
    pub blur_sigma: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: 500,
            blur_sigma: 1.0,
        }
    }
}

/// A binarized working frame plus the downscale factor that produced it.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    /// Binary single-channel image (255 foreground, 0 background).
    pub binary: GrayImage,
    /// Factor applied to the source dimensions; divide working-frame
    /// coordinates by this to recover source coordinates.
    pub scale: f64,
}

/// Downscale, grayscale, blur, and Otsu-binarize a source frame.
///
/// The threshold level is chosen per frame from the global histogram (Otsu)
/// rather than fixed, since lighting varies across captures. Never upscales.
pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> Result<Preprocessed, DetectError> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(DetectError::InvalidInput("empty source image".into()));
    }

    let gray = image.to_luma8();
    let larger = w.max(h);
    let (gray, scale) = if larger > config.max_dimension {
        let scale = f64::from(config.max_dimension) / f64::from(larger);
        let nw = ((f64::from(w) * scale).round() as u32).max(1);
        let nh = ((f64::from(h) * scale).round() as u32).max(1);
        (imageops::resize(&gray, nw, nh, FilterType::Triangle), scale)
    } else {
        (gray, 1.0)
    };

    let blurred = gaussian_blur_f32(&gray, config.blur_sigma);
    let level = otsu_level(&blurred);
    let binary = threshold(&blurred, level, ThresholdType::Binary);
    Ok(Preprocessed { binary, scale })
}
