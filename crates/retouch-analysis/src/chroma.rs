//! CIE L*a*b* chromaticity samples.
//!
//! Pixels are converted sRGB → linear → XYZ (D65) → Lab, then quantized
//! to the common 8-bit Lab encoding (`L·255/100`, `a+128`, `b+128`) and
//! decoded back, so consumers always see `L ∈ [0, 100]` and
//! `a, b ∈ [-128, 127]` regardless of how the sample was stored.
//!
//! Sampling uses a fixed stride over the pixel list so the point count
//! stays under a cap while still covering the whole image.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Default cap on `(a, b)` samples.
pub const DEFAULT_MAX_POINTS_2D: usize = 10_000;
/// Default cap on `(L, a, b)` samples.
pub const DEFAULT_MAX_POINTS_3D: usize = 5_000;

// D65 reference white.
const WHITE_X: f32 = 0.950_47;
const WHITE_Y: f32 = 1.0;
const WHITE_Z: f32 = 1.088_83;

/// Sampled chromaticity points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromaticity {
    /// `(a*, b*)` pairs.
    pub points_2d: Vec<[f32; 2]>,
    /// `(L*, a*, b*)` triples.
    pub points_3d: Vec<[f32; 3]>,
}

impl Chromaticity {
    /// Sample at most `max_2d` / `max_3d` points from `frame`.
    #[must_use]
    pub fn compute(frame: &Frame, max_2d: usize, max_3d: usize) -> Self {
        let pixels = frame.rgba().as_raw();
        let count = frame.pixel_count();

        let sample = |cap: usize| -> Vec<[f32; 3]> {
            if cap == 0 || count == 0 {
                return Vec::new();
            }
            let stride = count.div_ceil(cap);
            pixels
                .chunks_exact(4)
                .step_by(stride)
                .map(|p| quantized_lab(p[0], p[1], p[2]))
                .collect()
        };

        Self {
            points_2d: sample(max_2d).into_iter().map(|[_, a, b]| [a, b]).collect(),
            points_3d: sample(max_3d),
        }
    }
}

fn srgb_to_linear(value: u8) -> f32 {
    static LUT: OnceLock<[f32; 256]> = OnceLock::new();
    let table = LUT.get_or_init(|| {
        std::array::from_fn(|i| {
            #[allow(clippy::cast_precision_loss)]
            let c = i as f32 / 255.0;
            if c <= 0.040_45 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        })
    });
    table[usize::from(value)]
}

fn lab_f(t: f32) -> f32 {
    const EPSILON: f32 = 216.0 / 24_389.0;
    const KAPPA: f32 = 24_389.0 / 27.0;
    if t > EPSILON {
        t.cbrt()
    } else {
        KAPPA.mul_add(t, 16.0) / 116.0
    }
}

/// Continuous CIE Lab of an sRGB pixel.
#[must_use]
pub fn srgb_to_lab(r: u8, g: u8, b: u8) -> [f32; 3] {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));

    let x = 0.180_437_5f32.mul_add(b, 0.412_456_4f32.mul_add(r, 0.357_576_1 * g));
    let y = 0.072_175_0f32.mul_add(b, 0.212_672_9f32.mul_add(r, 0.715_152_2 * g));
    let z = 0.950_304_1f32.mul_add(b, 0.019_333_9f32.mul_add(r, 0.119_192_0 * g));

    let (fx, fy, fz) = (lab_f(x / WHITE_X), lab_f(y / WHITE_Y), lab_f(z / WHITE_Z));
    [
        116.0f32.mul_add(fy, -16.0),
        500.0 * (fx - fy),
        200.0 * (fy - fz),
    ]
}

/// Lab of an sRGB pixel after a round trip through 8-bit Lab encoding.
#[must_use]
pub fn quantized_lab(r: u8, g: u8, b: u8) -> [f32; 3] {
    let [l, a, b] = srgb_to_lab(r, g, b);
    let l8 = (l * 255.0 / 100.0).round().clamp(0.0, 255.0);
    let a8 = (a + 128.0).round().clamp(0.0, 255.0);
    let b8 = (b + 128.0).round().clamp(0.0, 255.0);
    [l8 * 100.0 / 255.0, a8 - 128.0, b8 - 128.0]
}

#[cfg(test)]
mod tests {
    use image::DynamicImage;

    use super::*;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn white_and_black() {
        let [l, a, b] = srgb_to_lab(255, 255, 255);
        assert!(close(l, 100.0, 0.05) && close(a, 0.0, 0.05) && close(b, 0.0, 0.05));
        let [l, a, b] = srgb_to_lab(0, 0, 0);
        assert!(close(l, 0.0, 0.05) && close(a, 0.0, 0.05) && close(b, 0.0, 0.05));
    }

    #[test]
    fn pure_red_matches_reference() {
        // Reference: L=53.24, a=80.09, b=67.20
        let [l, a, b] = srgb_to_lab(255, 0, 0);
        assert!(close(l, 53.24, 0.1), "{l}");
        assert!(close(a, 80.09, 0.2), "{a}");
        assert!(close(b, 67.20, 0.2), "{b}");
    }

    #[test]
    fn quantized_values_stay_in_range() {
        for (r, g, b) in [(0, 0, 255), (0, 255, 0), (255, 0, 255), (12, 200, 99)] {
            let [l, a, bb] = quantized_lab(r, g, b);
            assert!((0.0..=100.0).contains(&l));
            assert!((-128.0..=127.0).contains(&a));
            assert!((-128.0..=127.0).contains(&bb));
        }
    }

    #[test]
    fn sample_counts_are_capped() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(200, 150, |x, y| {
            image::Rgb([u8::try_from(x % 256).unwrap_or(0), u8::try_from(y % 256).unwrap_or(0), 40])
        }));
        let frame = Frame::prepare(&img, 512);
        let chroma = Chromaticity::compute(&frame, 10_000, 5_000);
        assert!(!chroma.points_2d.is_empty() && chroma.points_2d.len() <= 10_000);
        assert!(!chroma.points_3d.is_empty() && chroma.points_3d.len() <= 5_000);
    }

    #[test]
    fn small_images_are_fully_sampled() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(10, 10));
        let chroma = Chromaticity::compute(&Frame::prepare(&img, 512), 10_000, 5_000);
        assert_eq!(chroma.points_2d.len(), 100);
        assert_eq!(chroma.points_3d.len(), 100);
    }
}
