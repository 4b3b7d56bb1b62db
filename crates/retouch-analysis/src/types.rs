//! Analysis kinds, results and errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chroma::Chromaticity;
use crate::histogram::Histogram;
use crate::hue_sat::HueSaturation;
use crate::parade::Parade;

/// One independent statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Per-channel and luminance histograms.
    Histogram,
    /// Per-channel column waveforms.
    Parade,
    /// Hue and saturation distributions.
    HueSaturation,
    /// Lab chromaticity samples.
    Chromaticity,
}

impl AnalysisKind {
    /// Every kind, in bundle order.
    pub const ALL: [Self; 4] = [
        Self::Histogram,
        Self::Parade,
        Self::HueSaturation,
        Self::Chromaticity,
    ];
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Histogram => f.write_str("histogram"),
            Self::Parade => f.write_str("parade"),
            Self::HueSaturation => f.write_str("hue_saturation"),
            Self::Chromaticity => f.write_str("chromaticity"),
        }
    }
}

/// Payload of one analysis kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisResult {
    /// See [`Histogram`].
    Histogram(Histogram),
    /// See [`Parade`].
    Parade(Parade),
    /// See [`HueSaturation`].
    HueSaturation(HueSaturation),
    /// See [`Chromaticity`].
    Chromaticity(Chromaticity),
}

impl AnalysisResult {
    /// Which kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> AnalysisKind {
        match self {
            Self::Histogram(_) => AnalysisKind::Histogram,
            Self::Parade(_) => AnalysisKind::Parade,
            Self::HueSaturation(_) => AnalysisKind::HueSaturation,
            Self::Chromaticity(_) => AnalysisKind::Chromaticity,
        }
    }
}

/// The results of one analysis request, keyed by kind.
///
/// A bundle is built whole and handed over at once; a newer request
/// produces a new bundle rather than updating this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultBundle {
    results: BTreeMap<AnalysisKind, AnalysisResult>,
}

impl ResultBundle {
    /// An empty bundle (no image, or no kinds requested).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            results: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, result: AnalysisResult) {
        self.results.insert(result.kind(), result);
    }

    /// The payload for `kind`.
    #[must_use]
    pub fn get(&self, kind: AnalysisKind) -> Option<&AnalysisResult> {
        self.results.get(&kind)
    }

    /// Kinds present, in [`AnalysisKind`] order.
    pub fn kinds(&self) -> impl Iterator<Item = AnalysisKind> + '_ {
        self.results.keys().copied()
    }

    /// Returns `true` if nothing was computed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of kinds present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// The histogram, if computed.
    #[must_use]
    pub fn histogram(&self) -> Option<&Histogram> {
        match self.get(AnalysisKind::Histogram)? {
            AnalysisResult::Histogram(h) => Some(h),
            _ => None,
        }
    }

    /// The parade, if computed.
    #[must_use]
    pub fn parade(&self) -> Option<&Parade> {
        match self.get(AnalysisKind::Parade)? {
            AnalysisResult::Parade(p) => Some(p),
            _ => None,
        }
    }

    /// The hue/saturation distributions, if computed.
    #[must_use]
    pub fn hue_saturation(&self) -> Option<&HueSaturation> {
        match self.get(AnalysisKind::HueSaturation)? {
            AnalysisResult::HueSaturation(hs) => Some(hs),
            _ => None,
        }
    }

    /// The chromaticity samples, if computed.
    #[must_use]
    pub fn chromaticity(&self) -> Option<&Chromaticity> {
        match self.get(AnalysisKind::Chromaticity)? {
            AnalysisResult::Chromaticity(c) => Some(c),
            _ => None,
        }
    }
}

/// Errors raised by the analysis engine.
///
/// Any error means no bundle was produced; partial results are never
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Configuration values that cannot work.
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be created.
    #[error("failed to build analysis thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// A worker panicked while computing one kind.
    #[error("{kind} worker panicked: {message}")]
    WorkerPanicked {
        /// Kind being computed.
        kind: AnalysisKind,
        /// Panic payload, if it was a string.
        message: String,
    },
}
