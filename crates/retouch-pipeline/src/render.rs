//! The render engine.
//!
//! Rendering is a pure fold: start from the base image, apply each
//! committed operation in order, then apply the preview overlay (if
//! any). A stage that fails is logged and skipped, keeping the previous
//! stage's image, so one malformed operation cannot take down the view.
//! With no base image the result is a 1×1 transparent placeholder.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::diagnostics::{RenderReport, StageOutcome, StageReport};
use crate::operation::{Operation, effective_scale};
use crate::pipeline::Pipeline;
use crate::types::{Dimensions, OperationError, Params};

/// The image returned when no base image is loaded.
#[must_use]
pub fn placeholder() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::new(1, 1))
}

/// A transient, uncommitted adjustment drawn on top of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Preview {
    /// Show the committed pipeline only.
    Reset,
    /// Apply one extra operation on top of the committed result.
    Apply {
        /// Operation kind.
        kind: String,
        /// Operation parameters.
        #[serde(default)]
        params: Params,
    },
}

impl Preview {
    /// Shorthand for [`Preview::Apply`].
    pub fn apply(kind: impl Into<String>, params: Params) -> Self {
        Self::Apply {
            kind: kind.into(),
            params,
        }
    }

    /// Kind name for reports (`"reset"` for [`Preview::Reset`]).
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Reset => "reset",
            Self::Apply { kind, .. } => kind,
        }
    }
}

/// A rendered image plus what happened on the way.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    /// Final image.
    pub image: DynamicImage,
    /// Per-stage diagnostics.
    pub report: RenderReport,
}

/// Render `base` through `pipeline` and an optional `preview`.
///
/// `scale_factor` is the ratio of `base` to the full-resolution source
/// (1.0 at full resolution) and is forwarded to resolution-dependent
/// operations.
#[must_use]
pub fn render(
    base: Option<&DynamicImage>,
    pipeline: &Pipeline,
    preview: Option<&Preview>,
    catalog: &Catalog,
    scale_factor: f64,
) -> DynamicImage {
    render_with_report(base, pipeline, preview, catalog, scale_factor).image
}

/// [`render`], also returning per-stage diagnostics.
#[must_use]
pub fn render_with_report(
    base: Option<&DynamicImage>,
    pipeline: &Pipeline,
    preview: Option<&Preview>,
    catalog: &Catalog,
    scale_factor: f64,
) -> RenderOutput {
    let start = Instant::now();

    let Some(base) = base else {
        let image = placeholder();
        return RenderOutput {
            report: RenderReport {
                input: None,
                output: Dimensions::of(&image),
                scale_factor,
                stages: Vec::new(),
                preview: None,
                total_duration: start.elapsed(),
            },
            image,
        };
    };

    let mut stages = Vec::with_capacity(pipeline.len());
    let mut current: Option<DynamicImage> = None;

    for (index, operation) in pipeline.iter().enumerate() {
        let input = current.as_ref().unwrap_or(base);
        let (next, stage) = run_stage(Some(index), operation.kind(), input, scale_factor, || {
            Ok(&**operation)
        });
        if let Some(next) = next {
            current = Some(next);
        }
        stages.push(stage);
    }

    let preview_stage = preview.map(|preview| match preview {
        Preview::Reset => StageReport {
            index: None,
            kind: preview.kind().to_owned(),
            outcome: StageOutcome::Skipped,
            duration: Duration::ZERO,
        },
        Preview::Apply { kind, params } => {
            let input = current.as_ref().unwrap_or(base);
            let built = catalog.create(kind, params);
            let (next, stage) = run_stage(None, kind, input, scale_factor, || {
                built.as_ref().map(|op| &**op).map_err(Clone::clone)
            });
            if let Some(next) = next {
                current = Some(next);
            }
            stage
        }
    });

    let image = current.unwrap_or_else(|| base.clone());
    RenderOutput {
        report: RenderReport {
            input: Some(Dimensions::of(base)),
            output: Dimensions::of(&image),
            scale_factor,
            stages,
            preview: preview_stage,
            total_duration: start.elapsed(),
        },
        image,
    }
}

fn run_stage<'a>(
    index: Option<usize>,
    kind: &str,
    input: &DynamicImage,
    scale_factor: f64,
    operation: impl FnOnce() -> Result<&'a dyn Operation, OperationError>,
) -> (Option<DynamicImage>, StageReport) {
    let start = Instant::now();
    let result = operation().and_then(|op| op.apply(input, effective_scale(op, scale_factor)));
    let duration = start.elapsed();

    let (image, outcome) = match result {
        Ok(image) => (Some(image), StageOutcome::Applied),
        Err(err) => {
            match index {
                Some(index) => {
                    tracing::warn!(index, kind, %err, "stage failed; keeping previous image");
                }
                None => tracing::warn!(kind, %err, "preview failed; showing committed result"),
            }
            (None, StageOutcome::Failed(err.to_string()))
        }
    };

    (
        image,
        StageReport {
            index,
            kind: kind.to_owned(),
            outcome,
            duration,
        },
    )
}

/// Everything needed to render off the control thread.
///
/// Cloning a session's state into a snapshot is cheap: the base image is
/// shared and the pipeline shares its immutable operations. Later edits
/// in the session do not affect a snapshot already taken.
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    /// Image to render from, `None` for the placeholder.
    pub base: Option<Arc<DynamicImage>>,
    /// Committed operations at snapshot time.
    pub pipeline: Pipeline,
    /// Active preview at snapshot time.
    pub preview: Option<Preview>,
    /// Ratio of `base` to the full-resolution source.
    pub scale_factor: f64,
    /// Catalog used to build the preview operation.
    pub catalog: Arc<Catalog>,
}

impl RenderSnapshot {
    /// Render the snapshot.
    #[must_use]
    pub fn render(&self) -> DynamicImage {
        self.render_with_report().image
    }

    /// Render the snapshot with diagnostics.
    #[must_use]
    pub fn render_with_report(&self) -> RenderOutput {
        render_with_report(
            self.base.as_deref(),
            &self.pipeline,
            self.preview.as_ref(),
            &self.catalog,
            self.scale_factor,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operation::OperationRef;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(16, 4, |x, _| {
            let v = u8::try_from(x * 16).unwrap();
            image::Rgb([v, v / 2, 255 - v])
        }))
    }

    fn pipeline(catalog: &Catalog, ops: &[(&str, Params)]) -> Pipeline {
        Pipeline::from_operations(
            ops.iter()
                .map(|(kind, params)| catalog.create(kind, params).unwrap())
                .collect(),
        )
    }

    /// Fails for any image; used to exercise the skip path.
    #[derive(Debug)]
    struct Broken;

    impl Operation for Broken {
        fn kind(&self) -> &'static str {
            "broken"
        }
        fn params(&self) -> Params {
            Params::new()
        }
        fn apply(&self, _: &DynamicImage, _: f64) -> Result<DynamicImage, OperationError> {
            Err(OperationError::Failed {
                kind: "broken".into(),
                reason: "always".into(),
            })
        }
    }

    #[test]
    fn no_image_renders_placeholder() {
        let catalog = Catalog::builtin();
        let out = render_with_report(None, &Pipeline::new(), None, &catalog, 1.0);
        assert_eq!((out.image.width(), out.image.height()), (1, 1));
        assert_eq!(out.image.to_rgba8().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert!(out.report.input.is_none());
    }

    #[test]
    fn empty_pipeline_returns_base() {
        let catalog = Catalog::builtin();
        let base = gradient();
        assert_eq!(render(Some(&base), &Pipeline::new(), None, &catalog, 1.0), base);
    }

    #[test]
    fn grayscale_then_threshold_is_binary() {
        let catalog = Catalog::builtin();
        let p = pipeline(
            &catalog,
            &[
                ("grayscale", Params::new()),
                ("threshold", Params::new().with("level", 128)),
            ],
        );
        let out = render(Some(&gradient()), &p, None, &catalog, 1.0);
        assert!(out.to_luma8().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));

        let gray = crate::ops::Grayscale.apply(&gradient(), 1.0).unwrap();
        let expected = crate::ops::Threshold::new(128).apply(&gray, 1.0).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn failing_stage_is_skipped() {
        let catalog = Catalog::builtin();
        let invert = catalog.create("invert", &Params::new()).unwrap();
        let broken: OperationRef = Arc::new(Broken);
        let p = Pipeline::from_operations(vec![broken, invert.clone()]);
        let out = render_with_report(Some(&gradient()), &p, None, &catalog, 1.0);

        let expected = render(
            Some(&gradient()),
            &Pipeline::from_operations(vec![invert]),
            None,
            &catalog,
            1.0,
        );
        assert_eq!(out.image, expected);
        assert_eq!(out.report.failed_count(), 1);
        assert!(out.report.stages[0].is_failed());
    }

    #[test]
    fn preview_applies_on_top() {
        let catalog = Catalog::builtin();
        let p = pipeline(&catalog, &[("grayscale", Params::new())]);
        let preview = Preview::apply("invert", Params::new());
        let out = render(Some(&gradient()), &p, Some(&preview), &catalog, 1.0);
        let mut expected = render(Some(&gradient()), &p, None, &catalog, 1.0);
        expected.invert();
        assert_eq!(out, expected);
    }

    #[test]
    fn reset_preview_is_skipped() {
        let catalog = Catalog::builtin();
        let out = render_with_report(
            Some(&gradient()),
            &Pipeline::new(),
            Some(&Preview::Reset),
            &catalog,
            1.0,
        );
        assert_eq!(out.image, gradient());
        assert_eq!(out.report.preview.unwrap().outcome, StageOutcome::Skipped);
    }

    #[test]
    fn unknown_preview_kind_fails_softly() {
        let catalog = Catalog::builtin();
        let preview = Preview::apply("posterize", Params::new());
        let out = render_with_report(
            Some(&gradient()),
            &Pipeline::new(),
            Some(&preview),
            &catalog,
            1.0,
        );
        assert_eq!(out.image, gradient());
        assert!(out.report.preview.unwrap().is_failed());
    }

    #[test]
    fn preview_serializes_with_mode_tag() {
        let preview = Preview::apply("gamma", Params::new().with("gamma", 2.0));
        let json = serde_json::to_value(preview).unwrap();
        assert_eq!(json["mode"], "apply");
        assert_eq!(json["kind"], "gamma");
        let reset: Preview = serde_json::from_str(r#"{"mode":"reset"}"#).unwrap();
        assert_eq!(reset, Preview::Reset);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_edits() {
        let catalog = Arc::new(Catalog::builtin());
        let base = Arc::new(gradient());
        let mut p = pipeline(&catalog, &[("invert", Params::new())]);
        let snapshot = RenderSnapshot {
            base: Some(Arc::clone(&base)),
            pipeline: p.clone(),
            preview: None,
            scale_factor: 1.0,
            catalog: Arc::clone(&catalog),
        };
        let before = snapshot.render();
        p.push(catalog.create("grayscale", &Params::new()).unwrap());
        assert_eq!(snapshot.render(), before);
    }
}
