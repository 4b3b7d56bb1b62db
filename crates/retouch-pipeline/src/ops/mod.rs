//! Built-in operation kernels.
//!
//! The full editor ships dozens of adjustments; this module carries the
//! small core set the engine itself relies on and tests against. Every
//! kernel borrows its input and returns a new buffer in the same colour
//! type it received, unless its contract says otherwise (threshold
//! always yields 8-bit luma).

pub mod blur;
pub mod grayscale;
pub mod invert;
pub mod saturation;
pub mod threshold;
pub mod tone;

pub use blur::{GaussianBlur, UnsharpMask};
pub use grayscale::Grayscale;
pub use invert::Invert;
pub use saturation::Saturation;
pub use threshold::Threshold;
pub use tone::{BrightnessContrast, Gamma};

use image::{ColorType, DynamicImage, ImageBuffer, Pixel};

use crate::catalog::Catalog;
use crate::types::OperationError;

/// Register every built-in kind.
pub(crate) fn register_builtin(catalog: &mut Catalog) {
    catalog.register(Grayscale::KIND, grayscale::factory);
    catalog.register(Threshold::KIND, threshold::factory);
    catalog.register(Invert::KIND, invert::factory);
    catalog.register(BrightnessContrast::KIND, tone::brightness_contrast_factory);
    catalog.register(Gamma::KIND, tone::gamma_factory);
    catalog.register(Saturation::KIND, saturation::factory);
    catalog.register(GaussianBlur::KIND, blur::gaussian_blur_factory);
    catalog.register(UnsharpMask::KIND, blur::unsharp_mask_factory);
}

/// Convert `image` to `color`, returning it untouched when it already
/// has that layout.
#[must_use]
pub fn convert_like(image: DynamicImage, color: ColorType) -> DynamicImage {
    if image.color() == color {
        return image;
    }
    match color {
        ColorType::L8 => DynamicImage::ImageLuma8(image.to_luma8()),
        ColorType::La8 => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
        ColorType::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
        ColorType::Rgba8 => DynamicImage::ImageRgba8(image.to_rgba8()),
        ColorType::L16 => DynamicImage::ImageLuma16(image.to_luma16()),
        ColorType::La16 => DynamicImage::ImageLumaA16(image.to_luma_alpha16()),
        ColorType::Rgb16 => DynamicImage::ImageRgb16(image.to_rgb16()),
        ColorType::Rgba16 => DynamicImage::ImageRgba16(image.to_rgba16()),
        ColorType::Rgb32F => DynamicImage::ImageRgb32F(image.to_rgb32f()),
        _ => DynamicImage::ImageRgba32F(image.to_rgba32f()),
    }
}

/// Apply a per-sample tone curve to every colour channel, leaving alpha
/// untouched.
///
/// `curve` maps normalized intensity (0.0..=1.0) to normalized
/// intensity. 8-bit images go through a 256-entry lookup table; 16-bit
/// and float images evaluate the curve per sample.
///
/// # Errors
///
/// Returns [`OperationError::UnsupportedImage`] for layouts this helper
/// does not know.
pub(crate) fn map_color_channels(
    kind: &str,
    image: &DynamicImage,
    curve: impl Fn(f32) -> f32,
) -> Result<DynamicImage, OperationError> {
    let lut: [u8; 256] = std::array::from_fn(|i| {
        #[allow(clippy::cast_precision_loss)]
        let v = i as f32 / 255.0;
        unit_to_u8(curve(v))
    });
    let map8 = |v: u8| lut[usize::from(v)];
    let map16 = |v: u16| unit_to_u16(curve(f32::from(v) / 65535.0));
    let map32 = |v: f32| curve(v);

    let mut out = image.clone();
    match &mut out {
        DynamicImage::ImageLuma8(buf) => map_buffer(buf, map8),
        DynamicImage::ImageLumaA8(buf) => map_buffer(buf, map8),
        DynamicImage::ImageRgb8(buf) => map_buffer(buf, map8),
        DynamicImage::ImageRgba8(buf) => map_buffer(buf, map8),
        DynamicImage::ImageLuma16(buf) => map_buffer(buf, map16),
        DynamicImage::ImageLumaA16(buf) => map_buffer(buf, map16),
        DynamicImage::ImageRgb16(buf) => map_buffer(buf, map16),
        DynamicImage::ImageRgba16(buf) => map_buffer(buf, map16),
        DynamicImage::ImageRgb32F(buf) => map_buffer(buf, map32),
        DynamicImage::ImageRgba32F(buf) => map_buffer(buf, map32),
        other => return Err(OperationError::unsupported(kind, other.color())),
    }
    Ok(out)
}

fn map_buffer<P: Pixel>(
    buffer: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    f: impl Fn(P::Subpixel) -> P::Subpixel,
) {
    for pixel in buffer.pixels_mut() {
        pixel.apply_without_alpha(&f);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0).round() as u16
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identity_curve_preserves_8bit_pixels() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_fn(16, 16, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgba([(x * 16) as u8, (y * 16) as u8, 7, 200])
        }));
        let out = map_color_channels("test", &img, |v| v).unwrap();
        assert_eq!(img, out);
    }

    #[test]
    fn curve_leaves_alpha_untouched() {
        let img = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            2,
            2,
            image::Rgba([10, 20, 30, 77]),
        ));
        let out = map_color_channels("test", &img, |_| 1.0).unwrap();
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0, [255, 255, 255, 77]);
    }

    #[test]
    fn curve_handles_16bit() {
        let img = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(
            3,
            3,
            image::Luma([65535u16]),
        ));
        let out = map_color_channels("test", &img, |v| v * 0.5).unwrap();
        assert_eq!(out.color(), ColorType::L16);
        assert_eq!(out.as_luma16().unwrap().get_pixel(0, 0).0[0], 32768);
    }

    #[test]
    fn convert_like_is_identity_for_same_layout() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(4, 3));
        let out = convert_like(img.clone(), ColorType::Rgb8);
        assert_eq!(img, out);
        assert_eq!(
            convert_like(img, ColorType::L16).color(),
            ColorType::L16
        );
    }
}
