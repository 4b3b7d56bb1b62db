//! The analysis-local working copy.

use image::{DynamicImage, RgbaImage};
use retouch_pipeline::downsample::{self, DownsampleFilter};

/// A downsampled 8-bit RGBA copy of the image under analysis.
///
/// Every statistic reads this one borrowed buffer, so workers never
/// contend and never see a half-updated image.
#[derive(Debug, Clone)]
pub struct Frame {
    rgba: RgbaImage,
    has_color: bool,
}

impl Frame {
    /// Downsample `image` so its longest axis is at most `max_dimension`
    /// and convert it to 8-bit RGBA.
    #[must_use]
    pub fn prepare(image: &DynamicImage, max_dimension: u32) -> Self {
        let (reduced, _) = downsample::fit_within(image, max_dimension, DownsampleFilter::Triangle);
        Self {
            has_color: image.color().has_color(),
            rgba: reduced.to_rgba8(),
        }
    }

    /// The pixels.
    #[must_use]
    pub const fn rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    /// Whether the source had colour channels. Gray sources report a
    /// single luma channel in histograms and parades.
    #[must_use]
    pub const fn has_color(&self) -> bool {
        self.has_color
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    /// Number of channels statistics are reported for (1 or 3).
    #[must_use]
    pub const fn channel_count(&self) -> usize {
        if self.has_color { 3 } else { 1 }
    }

    /// Total pixel count.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.rgba.pixels().len()
    }
}

/// Rec. 709 luma of an 8-bit RGB triple.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.0722f32.mul_add(f32::from(b), 0.2126f32.mul_add(f32::from(r), 0.7152 * f32::from(g)));
    y.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_bounds_size() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(1000, 250));
        let frame = Frame::prepare(&img, 100);
        assert_eq!(frame.rgba().dimensions(), (100, 25));
        assert!(frame.has_color());
        assert_eq!(frame.channel_count(), 3);
    }

    #[test]
    fn gray_source_has_one_channel() {
        let img = DynamicImage::ImageLuma16(image::ImageBuffer::new(4, 4));
        assert_eq!(Frame::prepare(&img, 512).channel_count(), 1);
    }

    #[test]
    fn luma_of_gray_is_identity() {
        for v in [0, 1, 77, 128, 254, 255] {
            assert_eq!(luma(v, v, v), v);
        }
    }
}
