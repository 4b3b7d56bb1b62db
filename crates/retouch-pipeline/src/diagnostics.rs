//! Render diagnostics: per-stage outcome and timing.
//!
//! Every call to [`render_with_report`](crate::render::render_with_report)
//! collects a [`RenderReport`] alongside the image. Failed stages do not
//! abort a render; they show up here as [`StageOutcome::Failed`] with the
//! error text so callers can surface them instead of silently losing the
//! adjustment.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
pub mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    ///
    /// # Errors
    ///
    /// Propagates the serializer's error.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    ///
    /// # Errors
    ///
    /// Fails for negative, non-finite or unrepresentable values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// What happened to one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The stage produced the next image.
    Applied,
    /// The stage raised an error; the previous image was kept.
    Failed(String),
    /// The stage was not run (a `Reset` preview).
    Skipped,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// Pipeline index, or `None` for the preview stage.
    pub index: Option<usize>,
    /// Operation kind as requested.
    pub kind: String,
    /// Result of running the stage.
    pub outcome: StageOutcome,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl StageReport {
    /// Returns `true` if the stage raised an error.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self.outcome, StageOutcome::Failed(_))
    }
}

/// Diagnostics collected from a single render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderReport {
    /// Size of the image the render started from; `None` when no image
    /// was loaded and the placeholder was returned.
    pub input: Option<Dimensions>,
    /// Size of the rendered image.
    pub output: Dimensions,
    /// Scale factor passed to resolution-dependent operations.
    pub scale_factor: f64,
    /// Committed stages, in pipeline order.
    pub stages: Vec<StageReport>,
    /// The preview stage, if a preview was requested.
    pub preview: Option<StageReport>,
    /// Total wall-clock duration of the render (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RenderReport {
    /// All stages including the preview, in execution order.
    pub fn all_stages(&self) -> impl Iterator<Item = &StageReport> {
        self.stages.iter().chain(self.preview.as_ref())
    }

    /// Number of stages that raised an error.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.all_stages().filter(|s| s.is_failed()).count()
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Render Diagnostics Report\n{}", "=".repeat(60)));
        match self.input {
            Some(input) => lines.push(format!(
                "Image: {input} -> {} ({} pixels), scale factor {:.3}",
                self.output,
                self.output.pixel_count(),
                self.scale_factor,
            )),
            None => lines.push("Image: none (placeholder)".to_owned()),
        }
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<6} {:<24} {:>10} {:>10}  {}",
            "#", "Stage", "Duration", "% Total", "Outcome"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in self.all_stages() {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let index = stage
                .index
                .map_or_else(|| "prev".to_owned(), |i| i.to_string());
            let outcome = match &stage.outcome {
                StageOutcome::Applied => "applied".to_owned(),
                StageOutcome::Failed(reason) => format!("FAILED: {reason}"),
                StageOutcome::Skipped => "skipped".to_owned(),
            };
            lines.push(format!(
                "{index:<6} {:<24} {ms:>8.3}ms {pct:>9.1}%  {outcome}",
                stage.kind
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Stages: {}  |  Failed: {}",
            self.stages.len() + usize::from(self.preview.is_some()),
            self.failed_count(),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stage(index: Option<usize>, kind: &str, outcome: StageOutcome) -> StageReport {
        StageReport {
            index,
            kind: kind.to_owned(),
            outcome,
            duration: Duration::from_millis(5),
        }
    }

    fn sample() -> RenderReport {
        RenderReport {
            input: Some(Dimensions::new(100, 50)),
            output: Dimensions::new(100, 50),
            scale_factor: 1.0,
            stages: vec![
                stage(Some(0), "grayscale", StageOutcome::Applied),
                stage(Some(1), "threshold", StageOutcome::Failed("boom".into())),
            ],
            preview: Some(stage(None, "gamma", StageOutcome::Applied)),
            total_duration: Duration::from_millis(20),
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn failed_count_includes_preview() {
        let mut report = sample();
        assert_eq!(report.failed_count(), 1);
        report.preview = Some(stage(None, "gamma", StageOutcome::Failed("bad".into())));
        assert_eq!(report.failed_count(), 2);
    }

    #[test]
    fn report_produces_nonempty_string() {
        let report = sample().report();
        assert!(report.contains("Render Diagnostics Report"));
        assert!(report.contains("FAILED: boom"));
        assert!(report.contains("prev"));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.02).abs() < 1e-9);
        assert_eq!(json["stages"][0]["outcome"], "applied");
        assert_eq!(json["stages"][1]["outcome"]["failed"], "boom");
    }

    #[test]
    fn deserialize_rejects_negative_duration() {
        let mut json = serde_json::to_value(sample()).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<RenderReport>(json).is_err());
    }
}
