//! The analysis engine: fan out independent statistics over a bounded
//! worker pool and join them into one bundle.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use image::DynamicImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chroma::{Chromaticity, DEFAULT_MAX_POINTS_2D, DEFAULT_MAX_POINTS_3D};
use crate::frame::Frame;
use crate::histogram::Histogram;
use crate::hue_sat::HueSaturation;
use crate::parade::Parade;
use crate::types::{AnalysisError, AnalysisKind, AnalysisResult, ResultBundle};

/// Analysis sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Longest axis of the analysis-local copy.
    pub max_dimension: u32,
    /// Worker threads in the pool.
    pub workers: usize,
    /// Cap on `(a, b)` chromaticity samples.
    pub max_points_2d: usize,
    /// Cap on `(L, a, b)` chromaticity samples.
    pub max_points_3d: usize,
}

impl AnalysisConfig {
    /// Default analysis bound.
    pub const DEFAULT_MAX_DIMENSION: u32 = 512;
    /// Default pool size, one per kind.
    pub const DEFAULT_WORKERS: usize = 4;
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            workers: Self::DEFAULT_WORKERS,
            max_points_2d: DEFAULT_MAX_POINTS_2D,
            max_points_3d: DEFAULT_MAX_POINTS_3D,
        }
    }
}

/// Computes [`ResultBundle`]s on a dedicated rayon pool.
pub struct AnalysisEngine {
    config: AnalysisConfig,
    pool: rayon::ThreadPool,
}

impl AnalysisEngine {
    /// Build the engine and its pool.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] for zero workers or a
    /// zero bound, and [`AnalysisError::ThreadPool`] if the pool cannot
    /// be created.
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        if config.workers == 0 {
            return Err(AnalysisError::InvalidConfig(
                "workers must be >= 1".to_owned(),
            ));
        }
        if config.max_dimension == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_dimension must be >= 1".to_owned(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("retouch-analysis-{i}"))
            .build()?;
        Ok(Self { config, pool })
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> AnalysisConfig {
        self.config
    }

    /// Compute every kind.
    ///
    /// # Errors
    ///
    /// See [`analyze_selective`](Self::analyze_selective).
    pub fn analyze(&self, image: Option<&DynamicImage>) -> Result<ResultBundle, AnalysisError> {
        self.analyze_selective(image, &AnalysisKind::ALL)
    }

    /// Compute only `kinds` (duplicates are computed once).
    ///
    /// No image yields an empty bundle. All requested kinds run in
    /// parallel on the pool and the call returns only after every one
    /// finishes.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::WorkerPanicked`] if any kind fails; no
    /// partial bundle is returned.
    pub fn analyze_selective(
        &self,
        image: Option<&DynamicImage>,
        kinds: &[AnalysisKind],
    ) -> Result<ResultBundle, AnalysisError> {
        self.analyze_with(image, kinds, compute)
    }

    /// [`analyze_selective`](Self::analyze_selective) with the per-kind
    /// computation supplied by the caller.
    pub(crate) fn analyze_with(
        &self,
        image: Option<&DynamicImage>,
        kinds: &[AnalysisKind],
        compute: ComputeFn,
    ) -> Result<ResultBundle, AnalysisError> {
        let Some(image) = image else {
            return Ok(ResultBundle::new());
        };
        let mut kinds = kinds.to_vec();
        kinds.sort_unstable();
        kinds.dedup();
        if kinds.is_empty() {
            return Ok(ResultBundle::new());
        }

        let start = Instant::now();
        let frame = Frame::prepare(image, self.config.max_dimension);
        let config = self.config;

        let results: Vec<Result<AnalysisResult, AnalysisError>> = self.pool.install(|| {
            kinds
                .par_iter()
                .map(|&kind| compute_guarded(compute, kind, &frame, config))
                .collect()
        });

        let mut bundle = ResultBundle::new();
        for result in results {
            bundle.insert(result?);
        }

        tracing::debug!(
            kinds = bundle.len(),
            width = frame.rgba().width(),
            height = frame.rgba().height(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "analysis finished"
        );
        Ok(bundle)
    }
}

impl std::fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

pub(crate) type ComputeFn = fn(AnalysisKind, &Frame, AnalysisConfig) -> AnalysisResult;

/// Compute one kind on an already prepared frame.
#[must_use]
pub fn compute(kind: AnalysisKind, frame: &Frame, config: AnalysisConfig) -> AnalysisResult {
    match kind {
        AnalysisKind::Histogram => AnalysisResult::Histogram(Histogram::compute(frame)),
        AnalysisKind::Parade => AnalysisResult::Parade(Parade::compute(frame)),
        AnalysisKind::HueSaturation => AnalysisResult::HueSaturation(HueSaturation::compute(frame)),
        AnalysisKind::Chromaticity => AnalysisResult::Chromaticity(Chromaticity::compute(
            frame,
            config.max_points_2d,
            config.max_points_3d,
        )),
    }
}

fn compute_guarded(
    compute: ComputeFn,
    kind: AnalysisKind,
    frame: &Frame,
    config: AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    catch_unwind(AssertUnwindSafe(|| compute(kind, frame, config))).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        tracing::error!(%kind, %message, "analysis worker panicked");
        AnalysisError::WorkerPanicked { kind, message }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn engine() -> AnalysisEngine {
        AnalysisEngine::new(AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn no_image_is_empty_bundle() {
        let bundle = engine().analyze(None).unwrap();
        assert!(bundle.is_empty());
        assert_eq!(bundle.len(), 0);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let config = AnalysisConfig {
            workers: 0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            AnalysisEngine::new(config),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn selective_dedups_and_limits() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(8, 8));
        let bundle = engine()
            .analyze_selective(
                Some(&img),
                &[AnalysisKind::Parade, AnalysisKind::Parade, AnalysisKind::Histogram],
            )
            .unwrap();
        assert_eq!(
            bundle.kinds().collect::<Vec<_>>(),
            vec![AnalysisKind::Histogram, AnalysisKind::Parade]
        );
        assert!(bundle.hue_saturation().is_none());
    }

    fn parade_panics(kind: AnalysisKind, frame: &Frame, config: AnalysisConfig) -> AnalysisResult {
        if kind == AnalysisKind::Parade {
            panic!("parade exploded");
        }
        compute(kind, frame, config)
    }

    #[test]
    fn one_failing_kind_fails_the_whole_request() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(16, 16));
        let engine = engine();
        let result = engine.analyze_with(Some(&img), &AnalysisKind::ALL, parade_panics);
        match result {
            Err(AnalysisError::WorkerPanicked { kind, message }) => {
                assert_eq!(kind, AnalysisKind::Parade);
                assert_eq!(message, "parade exploded");
            }
            other => panic!("expected WorkerPanicked, got {other:?}"),
        }

        // The pool survives and the next request completes.
        let bundle = engine.analyze(Some(&img)).unwrap();
        assert_eq!(bundle.len(), AnalysisKind::ALL.len());
    }

    #[test]
    fn config_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_dimension, 512);
        assert_eq!(config.workers, 4);
        assert_eq!(config.max_points_2d, 10_000);
        assert_eq!(config.max_points_3d, 5_000);
    }
}
