//! Per-channel and luminance histograms.

use serde::{Deserialize, Serialize};

use crate::frame::{Frame, luma};

/// Bins per histogram (one per 8-bit value).
pub const BINS: usize = 256;

/// 256-bin counts per channel plus luminance.
///
/// Gray sources have one channel (luma); colour sources have R, G, B.
/// Alpha is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    /// Counts per channel, each `BINS` long.
    pub channels: Vec<Vec<u32>>,
    /// Luminance counts, `BINS` long.
    pub luminance: Vec<u32>,
}

impl Histogram {
    /// Count every pixel of `frame`.
    #[must_use]
    pub fn compute(frame: &Frame) -> Self {
        let mut channels = vec![vec![0u32; BINS]; frame.channel_count()];
        let mut luminance = vec![0u32; BINS];

        for pixel in frame.rgba().pixels() {
            let [r, g, b, _] = pixel.0;
            let y = luma(r, g, b);
            luminance[usize::from(y)] += 1;
            channels[0][usize::from(r)] += 1;
            if frame.has_color() {
                channels[1][usize::from(g)] += 1;
                channels[2][usize::from(b)] += 1;
            }
        }

        Self {
            channels,
            luminance,
        }
    }

    /// Number of pixels counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.luminance.iter().map(|&c| u64::from(c)).sum()
    }

    /// Largest bin across all channels, for chart scaling.
    #[must_use]
    pub fn peak(&self) -> u32 {
        self.channels
            .iter()
            .flatten()
            .chain(&self.luminance)
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Mean luminance in `0.0..=255.0`, or `None` for an empty histogram.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_luminance(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let sum: u64 = self
            .luminance
            .iter()
            .zip(0u64..)
            .map(|(&count, value)| u64::from(count) * value)
            .sum();
        Some(sum as f64 / total as f64)
    }
}
