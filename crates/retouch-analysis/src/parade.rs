//! Parade (per-channel waveform).
//!
//! For each channel and each image column, how many pixels in that
//! column have each 8-bit value. Stored row-major by value, so
//! `density[value * width + x]`.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::histogram::BINS;

/// Column-wise value densities per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parade {
    /// Columns in each density map.
    pub width: u32,
    /// One `BINS × width` map per channel (luma for gray sources).
    pub channels: Vec<Vec<u32>>,
}

impl Parade {
    /// Accumulate densities for every pixel of `frame`.
    #[must_use]
    pub fn compute(frame: &Frame) -> Self {
        let width = frame.width();
        let w = width as usize;
        let mut channels = vec![vec![0u32; BINS * w]; frame.channel_count()];

        for (x, _, pixel) in frame.rgba().enumerate_pixels() {
            let x = x as usize;
            for (map, &value) in channels.iter_mut().zip(&pixel.0) {
                map[usize::from(value) * w + x] += 1;
            }
        }

        Self { width, channels }
    }

    /// Count of pixels in column `x` of `channel` with `value`.
    #[must_use]
    pub fn density(&self, channel: usize, value: u8, x: u32) -> Option<u32> {
        if x >= self.width {
            return None;
        }
        self.channels
            .get(channel)?
            .get(usize::from(value) * self.width as usize + x as usize)
            .copied()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::DynamicImage;

    use super::*;

    #[test]
    fn columns_count_their_pixels() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_fn(3, 5, |x, _| {
            let v = u8::try_from(x * 100).unwrap();
            image::Rgb([v, 255 - v, 7])
        }));
        let parade = Parade::compute(&Frame::prepare(&img, 512));
        assert_eq!(parade.width, 3);
        assert_eq!(parade.channels.len(), 3);
        assert_eq!(parade.channels[0].len(), 256 * 3);
        assert_eq!(parade.density(0, 200, 2), Some(5));
        assert_eq!(parade.density(1, 55, 2), Some(5));
        assert_eq!(parade.density(2, 7, 0), Some(5));
        assert_eq!(parade.density(0, 200, 0), Some(0));
        assert_eq!(parade.density(0, 0, 3), None);
    }

    #[test]
    fn gray_parade_has_one_map() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([128])));
        let parade = Parade::compute(&Frame::prepare(&img, 512));
        assert_eq!(parade.channels.len(), 1);
        assert_eq!(parade.density(0, 128, 1), Some(2));
    }
}
