//! Resolution-dependent filters: Gaussian blur and unsharp mask.
//!
//! Both take a `sigma` measured in source pixels. When the engine runs
//! them on a downsampled proxy it passes the proxy's scale factor, and
//! the effective sigma shrinks with it, so a drag on a half-size proxy
//! looks like the full-resolution result scaled down.
//!
//! 8-bit images go through [`imageproc::filter::gaussian_blur_f32`],
//! which works on single-channel `GrayImage`s; colour images are split
//! into channels, blurred independently and reassembled. Deeper images
//! use the `image` crate's own blur.

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::operation::Operation;
use crate::ops::convert_like;
use crate::types::{OperationError, Params};

/// Largest sigma accepted from parameters, in source pixels.
pub const MAX_SIGMA: f64 = 250.0;

/// Apply Gaussian blur to a grayscale image.
///
/// Non-positive sigma values return the image unchanged, since
/// `imageproc`'s underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_gray(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Apply Gaussian blur to an RGBA image by blurring each channel
/// independently.
///
/// The result is equivalent to blurring in colour space, since Gaussian
/// blur is linear and per-channel. Non-positive sigma values return the
/// image unchanged.
#[must_use = "returns the blurred RGBA image"]
pub fn gaussian_blur_rgba(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }

    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 4] =
        std::array::from_fn(|c| imageproc::filter::gaussian_blur_f32(&channels[c], sigma));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            blurred[3].get_pixel(x, y).0[0],
        ])
    })
}

/// Gaussian blur of any supported layout, keeping the colour type.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &DynamicImage, sigma: f32) -> DynamicImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(gaussian_blur_gray(gray, sigma)),
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            let blurred = gaussian_blur_rgba(&image.to_rgba8(), sigma);
            convert_like(DynamicImage::ImageRgba8(blurred), image.color())
        }
        _ => image.blur(sigma),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn scaled_sigma(sigma: f64, scale_factor: f64) -> f32 {
    (sigma * scale_factor) as f32
}

/// Gaussian blur with a radius expressed in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBlur {
    sigma: f64,
}

impl GaussianBlur {
    /// Catalog kind name.
    pub const KIND: &'static str = "gaussian_blur";
    /// Default sigma in source pixels.
    pub const DEFAULT_SIGMA: f64 = 2.0;

    /// Build from a parameter map (`sigma`, `0..=250`).
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] for non-numeric or
    /// out-of-range values.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        Ok(Self {
            sigma: params.float_in("sigma", Self::DEFAULT_SIGMA, 0.0..=MAX_SIGMA)?,
        })
    }

    /// Sigma in source pixels.
    #[must_use]
    pub const fn sigma(self) -> f64 {
        self.sigma
    }
}

impl Operation for GaussianBlur {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new().with("sigma", self.sigma)
    }

    fn apply(
        &self,
        image: &DynamicImage,
        scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        Ok(gaussian_blur(image, scaled_sigma(self.sigma, scale_factor)))
    }

    fn is_resolution_dependent(&self) -> bool {
        true
    }
}

/// Unsharp mask: add back the difference between the image and its
/// blur wherever it exceeds `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnsharpMask {
    sigma: f64,
    threshold: i64,
}

impl UnsharpMask {
    /// Catalog kind name.
    pub const KIND: &'static str = "unsharp_mask";

    /// Build from a parameter map (`sigma` in `0..=250`, `threshold` in
    /// `0..=255`).
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidParameter`] for non-numeric or
    /// out-of-range values.
    pub fn from_params(params: &Params) -> Result<Self, OperationError> {
        let sigma = params.float_in("sigma", 1.0, 0.0..=MAX_SIGMA)?;
        let threshold = params.float_in("threshold", 0.0, 0.0..=255.0)?;
        #[allow(clippy::cast_possible_truncation)]
        let threshold = threshold.round() as i64;
        Ok(Self { sigma, threshold })
    }
}

impl Operation for UnsharpMask {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn params(&self) -> Params {
        Params::new()
            .with("sigma", self.sigma)
            .with("threshold", self.threshold)
    }

    fn apply(
        &self,
        image: &DynamicImage,
        scale_factor: f64,
    ) -> Result<DynamicImage, OperationError> {
        let sigma = scaled_sigma(self.sigma, scale_factor);
        if sigma <= 0.0 {
            return Ok(image.clone());
        }
        #[allow(clippy::cast_possible_truncation)]
        let threshold = self.threshold as i32;
        Ok(image.unsharpen(sigma, threshold))
    }

    fn is_resolution_dependent(&self) -> bool {
        true
    }
}

pub(crate) fn gaussian_blur_factory(params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(GaussianBlur::from_params(params)?))
}

pub(crate) fn unsharp_mask_factory(params: &Params) -> Result<Box<dyn Operation>, OperationError> {
    Ok(Box::new(UnsharpMask::from_params(params)?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(img, gaussian_blur_gray(&img, 0.0));
    }

    #[test]
    fn negative_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(img, gaussian_blur_gray(&img, -1.0));
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur_gray(&sharp_edge_image(), 2.0);
        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];
        assert!(left_of_edge > 0, "expected left of edge > 0, got {left_of_edge}");
        assert!(right_of_edge < 255, "expected right of edge < 255, got {right_of_edge}");
    }

    #[test]
    fn rgba_blur_preserves_dimensions_and_uniform_colour() {
        let img = RgbaImage::from_pixel(17, 31, image::Rgba([100, 150, 200, 255]));
        let blurred = gaussian_blur_rgba(&img, 1.5);
        assert_eq!(blurred.dimensions(), (17, 31));
        for pixel in blurred.pixels() {
            assert_eq!(pixel.0, [100, 150, 200, 255]);
        }
    }

    #[test]
    fn dynamic_blur_keeps_colour_type() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        assert_eq!(gaussian_blur(&img, 1.0).color(), image::ColorType::Rgb8);
    }

    #[test]
    fn effective_sigma_follows_scale_factor() {
        let op = GaussianBlur::from_params(&Params::new().with("sigma", 4.0)).unwrap();
        let img = DynamicImage::ImageLuma8(sharp_edge_image());
        let direct = DynamicImage::ImageLuma8(gaussian_blur_gray(&sharp_edge_image(), 2.0));
        assert_eq!(op.apply(&img, 0.5).unwrap(), direct);
        assert!(op.is_resolution_dependent());
    }

    #[test]
    fn unsharp_zero_sigma_is_identity() {
        let op = UnsharpMask::from_params(&Params::new().with("sigma", 0.0)).unwrap();
        let img = DynamicImage::ImageLuma8(sharp_edge_image());
        assert_eq!(op.apply(&img, 1.0).unwrap(), img);
    }

    #[test]
    fn unsharp_params_round_trip() {
        let params = Params::new().with("sigma", 1.5).with("threshold", 3);
        let op = UnsharpMask::from_params(&params).unwrap();
        assert_eq!(op.params(), params);
    }
}
