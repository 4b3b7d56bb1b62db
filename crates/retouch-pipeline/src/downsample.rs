//! Image downsampling for proxies.
//!
//! Two entry points cover every reduced-resolution copy in the engine:
//! [`scale_by`] shrinks by a fixed factor (the interaction proxy), and
//! [`fit_within`] shrinks so the longest axis fits a bound (the main-view
//! proxy and the analysis-local copy). Both preserve the aspect ratio
//! and never upscale.

use std::fmt;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Resampling filter used when downsampling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest/best for photos.
    Lanczos3,
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            Self::Nearest => image::imageops::FilterType::Nearest,
            Self::Triangle => image::imageops::FilterType::Triangle,
            Self::CatmullRom => image::imageops::FilterType::CatmullRom,
            Self::Gaussian => image::imageops::FilterType::Gaussian,
            Self::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Target size for scaling `(width, height)` by `factor`, at least 1×1.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let scale = |v: u32| ((f64::from(v) * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Shrink `image` by `factor` in `(0, 1)`.
///
/// Factors at or above 1.0 return an unchanged copy.
#[must_use]
pub fn scale_by(image: &DynamicImage, factor: f64, filter: DownsampleFilter) -> DynamicImage {
    if factor >= 1.0 {
        return image.clone();
    }
    let (w, h) = scaled_dimensions(image.width(), image.height(), factor);
    image.resize_exact(w, h, filter.to_image_filter())
}

/// Downsample so the longest axis is at most `max_dimension` pixels.
///
/// Returns the (possibly unchanged) image and the applied scale factor
/// (new width over old width; 1.0 when nothing changed).
#[must_use]
pub fn fit_within(
    image: &DynamicImage,
    max_dimension: u32,
    filter: DownsampleFilter,
) -> (DynamicImage, f64) {
    let (w, h) = (image.width(), image.height());
    let long_axis = w.max(h);

    if long_axis <= max_dimension || w == 0 {
        return (image.clone(), 1.0);
    }

    let resized = image.resize(max_dimension, max_dimension, filter.to_image_filter());
    let factor = f64::from(resized.width()) / f64::from(w);
    (resized, factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            w,
            h,
            image::Rgba([128, 128, 128, 255]),
        ))
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(DownsampleFilter::default(), DownsampleFilter::Triangle);
    }

    #[test]
    fn no_downsample_when_already_small() {
        let (result, factor) = fit_within(&test_image(100, 80), 256, DownsampleFilter::Triangle);
        assert!((factor - 1.0).abs() < f64::EPSILON);
        assert_eq!((result.width(), result.height()), (100, 80));
    }

    #[test]
    fn fit_landscape() {
        let (result, factor) = fit_within(&test_image(1024, 768), 256, DownsampleFilter::Triangle);
        assert_eq!(result.width(), 256);
        // Aspect ratio preserved: 768 * 256 / 1024 = 192
        assert_eq!(result.height(), 192);
        assert!((factor - 0.25).abs() < 1e-9);
    }

    #[test]
    fn fit_portrait() {
        let (result, _) = fit_within(&test_image(600, 1200), 256, DownsampleFilter::Triangle);
        assert_eq!(result.height(), 256);
        assert_eq!(result.width(), 128);
    }

    #[test]
    fn scale_by_half() {
        let result = scale_by(&test_image(200, 100), 0.5, DownsampleFilter::Triangle);
        assert_eq!((result.width(), result.height()), (100, 50));
    }

    #[test]
    fn scale_by_never_collapses_to_zero() {
        let result = scale_by(&test_image(3, 1), 0.2, DownsampleFilter::Nearest);
        assert_eq!((result.width(), result.height()), (1, 1));
    }

    #[test]
    fn scale_by_one_is_a_copy() {
        let img = test_image(31, 17);
        assert_eq!(scale_by(&img, 1.0, DownsampleFilter::Lanczos3), img);
    }
}
