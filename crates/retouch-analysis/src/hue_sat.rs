//! HSV hue and saturation distributions.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::histogram::BINS;

/// One-degree hue bins.
pub const HUE_BINS: usize = 360;

/// Hue histogram (360 bins) and saturation histogram (256 bins).
///
/// Achromatic pixels (zero saturation) have no defined hue and only
/// count towards saturation bin 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueSaturation {
    /// Counts per degree of hue.
    pub hue: Vec<u32>,
    /// Counts per 8-bit saturation value.
    pub saturation: Vec<u32>,
}

impl HueSaturation {
    /// Accumulate hue and saturation for every pixel of `frame`.
    #[must_use]
    pub fn compute(frame: &Frame) -> Self {
        let mut hue = vec![0u32; HUE_BINS];
        let mut saturation = vec![0u32; BINS];

        for pixel in frame.rgba().pixels() {
            let [r, g, b, _] = pixel.0;
            let (h, s) = hue_saturation(r, g, b);
            saturation[usize::from(s)] += 1;
            if let Some(h) = h {
                hue[h] += 1;
            }
        }

        Self { hue, saturation }
    }

    /// Pixels that contributed a hue.
    #[must_use]
    pub fn chromatic_count(&self) -> u64 {
        self.hue.iter().map(|&c| u64::from(c)).sum()
    }

    /// Most common hue in degrees, `None` if the image is achromatic.
    #[must_use]
    pub fn dominant_hue(&self) -> Option<usize> {
        self.hue
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .max_by_key(|(_, c)| **c)
            .map(|(degree, _)| degree)
    }
}

/// HSV hue bin (degrees, `None` when saturation is zero) and 8-bit
/// saturation of an RGB triple.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::many_single_char_names
)]
pub fn hue_saturation(r: u8, g: u8, b: u8) -> (Option<usize>, u8) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0 {
        return (None, 0);
    }

    // delta >= 1 and max <= 255, so this is at least 1.
    let s = (f32::from(delta) / f32::from(max) * 255.0).round() as u8;

    let d = f32::from(delta);
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let h = if max == r {
        60.0 * ((gf - bf) / d).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((bf - rf) / d + 2.0)
    } else {
        60.0 * ((rf - gf) / d + 4.0)
    };
    let bin = (h.floor() as usize) % HUE_BINS;
    (Some(bin), s)
}
