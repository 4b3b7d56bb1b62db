//! Edit session: one open image and everything done to it.
//!
//! [`EditSession`] ties the pieces together for a caller that drives the
//! editor from a single control thread: the committed [`History`], the
//! current [`Preview`], the [`ProxyManager`] and an [`EventBus`]. Renders
//! can either run inline ([`render_view`](EditSession::render_view),
//! [`render_export`](EditSession::render_export)) or be handed to a
//! background thread as a [`RenderSnapshot`].

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::events::{EventBus, EventKind};
use crate::history::{Command, History, HistoryConfig};
use crate::pipeline::Pipeline;
use crate::proxy::{ProxyConfig, ProxyManager};
use crate::render::{Preview, RenderOutput, RenderSnapshot};
use crate::types::{OperationError, Params, PipelineError};

/// Configuration for a new session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Proxy sizing.
    pub proxy: ProxyConfig,
    /// Undo limits.
    pub history: HistoryConfig,
}

/// The editing state for one image.
#[derive(Debug)]
pub struct EditSession {
    catalog: Arc<Catalog>,
    history: History,
    preview: Option<Preview>,
    proxy: ProxyManager,
    source_path: Option<String>,
    events: EventBus,
}

impl EditSession {
    /// A session with the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] for an out-of-range
    /// proxy quality.
    pub fn new(config: SessionConfig) -> Result<Self, PipelineError> {
        Self::with_catalog(config, Arc::new(Catalog::builtin()))
    }

    /// A session with a caller-supplied catalog.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] for an out-of-range
    /// proxy quality.
    pub fn with_catalog(
        config: SessionConfig,
        catalog: Arc<Catalog>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            catalog,
            history: History::new(config.history),
            preview: None,
            proxy: ProxyManager::new(config.proxy)?,
            source_path: None,
            events: EventBus::new(),
        })
    }

    /// The operation catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Subscribe and unsubscribe here.
    pub const fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    // --- image ---------------------------------------------------------

    /// Make `image` the source. The pipeline and history are kept; any
    /// preview or drag is dropped, publishing
    /// [`EventKind::PreviewChanged`] if a preview was active.
    pub fn load_image(&mut self, image: DynamicImage, path: Option<String>) {
        tracing::info!(
            width = image.width(),
            height = image.height(),
            path = path.as_deref().unwrap_or("<memory>"),
            "image loaded"
        );
        self.proxy.set_image(Arc::new(image));
        self.source_path = path;
        self.clear_preview();
    }

    /// Forget the source image.
    pub fn unload_image(&mut self) {
        self.proxy.clear_image();
        self.source_path = None;
        self.clear_preview();
    }

    /// The full-resolution source image.
    #[must_use]
    pub fn source(&self) -> Option<&Arc<DynamicImage>> {
        self.proxy.source()
    }

    /// Where the source came from, if it was loaded from a file.
    #[must_use]
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    // --- pipeline ------------------------------------------------------

    /// The committed pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        self.history.pipeline()
    }

    /// The undo/redo state.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Execute `command` as one undoable step.
    ///
    /// Publishes [`EventKind::PipelineChanged`] if anything changed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IndexOutOfRange`] for a bad index; the
    /// session is unchanged.
    pub fn execute(&mut self, command: Command) -> Result<bool, PipelineError> {
        let changed = self.history.execute(command)?;
        if changed {
            self.events.publish(EventKind::PipelineChanged);
        }
        Ok(changed)
    }

    /// Build `kind` from `params` and append it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Operation`] if the catalog cannot build
    /// the operation.
    pub fn add_operation(&mut self, kind: &str, params: &Params) -> Result<(), PipelineError> {
        let operation = self.catalog.create(kind, params)?;
        self.execute(Command::Add(operation))?;
        Ok(())
    }

    /// Undo the last command. Returns `false` if there was none.
    pub fn undo(&mut self) -> bool {
        let changed = self.history.undo();
        if changed {
            self.events.publish(EventKind::PipelineChanged);
        }
        changed
    }

    /// Redo the last undone command. Returns `false` if there was none.
    pub fn redo(&mut self) -> bool {
        let changed = self.history.redo();
        if changed {
            self.events.publish(EventKind::PipelineChanged);
        }
        changed
    }

    /// Replace the pipeline with `pipeline` as one undoable step.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares [`execute`](Self::execute)'s
    /// signature.
    pub fn set_pipeline(&mut self, pipeline: &Pipeline) -> Result<bool, PipelineError> {
        self.execute(Command::Set(pipeline.operations().to_vec()))
    }

    /// Clear the pipeline as one undoable step.
    ///
    /// # Errors
    ///
    /// Never fails in practice; shares [`execute`](Self::execute)'s
    /// signature.
    pub fn clear_pipeline(&mut self) -> Result<bool, PipelineError> {
        self.execute(Command::Clear)
    }

    /// Independent copy of the committed pipeline.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::deep_clone`].
    pub fn clone_pipeline(&self) -> Result<Pipeline, OperationError> {
        self.history.clone_pipeline(&self.catalog)
    }

    /// Parameters of the latest committed operation of `kind`.
    #[must_use]
    pub fn get_operation_params(&self, kind: &str) -> Option<Params> {
        self.history.get_operation_params(kind)
    }

    // --- preview -------------------------------------------------------

    /// The active preview.
    #[must_use]
    pub const fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Show `preview` on top of the committed result. Never touches the
    /// pipeline or history.
    pub fn set_preview(&mut self, preview: Preview) {
        self.preview = Some(preview);
        self.events.publish(EventKind::PreviewChanged);
    }

    /// Remove the preview. Returns `false` if none was set.
    pub fn clear_preview(&mut self) -> bool {
        let had = self.drop_preview();
        if had {
            self.events.publish(EventKind::PreviewChanged);
        }
        had
    }

    /// Alias of [`clear_preview`](Self::clear_preview) for the dialog
    /// "Cancel" path.
    pub fn cancel_preview(&mut self) -> bool {
        self.clear_preview()
    }

    /// Turn the active preview into a committed operation.
    ///
    /// Returns `Ok(false)` if there was nothing to commit (no preview or
    /// a `Reset` preview). On success the preview is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Operation`] if the preview's kind or
    /// parameters do not build; the preview stays in place.
    pub fn commit_preview(&mut self) -> Result<bool, PipelineError> {
        let Some(Preview::Apply { kind, params }) = &self.preview else {
            return Ok(false);
        };
        let operation = self.catalog.create(kind, params)?;
        self.execute(Command::Add(operation))?;
        self.clear_preview();
        Ok(true)
    }

    fn drop_preview(&mut self) -> bool {
        self.preview.take().is_some()
    }

    // --- proxies and rendering -----------------------------------------

    /// The proxy state.
    #[must_use]
    pub const fn proxy(&self) -> &ProxyManager {
        &self.proxy
    }

    /// Begin a drag. Returns `false` if no image is loaded.
    pub fn start_interaction(&mut self) -> bool {
        self.proxy.start_interaction()
    }

    /// End a drag. If one was in progress, returns the full-resolution
    /// render the caller should now show.
    pub fn end_interaction(&mut self) -> Option<DynamicImage> {
        if self.proxy.end_interaction() {
            Some(self.render_export())
        } else {
            None
        }
    }

    /// Change the interaction quality. While dragging, returns the view
    /// re-rendered against the rebuilt proxy.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] unless
    /// `0.1 < quality <= 1.0`.
    pub fn set_quality(&mut self, quality: f64) -> Result<Option<DynamicImage>, PipelineError> {
        if self.proxy.set_quality(quality)? {
            Ok(Some(self.render_view()))
        } else {
            Ok(None)
        }
    }

    /// Render for the screen: interaction proxy while dragging, main-view
    /// proxy otherwise. Pipeline and preview both apply.
    #[must_use]
    pub fn render_view(&self) -> DynamicImage {
        self.run(|| {
            self.proxy
                .render_interactive(self.history.pipeline(), self.preview.as_ref(), &self.catalog)
        })
        .image
    }

    /// Render at full resolution with pipeline and preview.
    #[must_use]
    pub fn render_export(&self) -> DynamicImage {
        self.render_export_with_report().image
    }

    /// [`render_export`](Self::render_export) with diagnostics.
    #[must_use]
    pub fn render_export_with_report(&self) -> RenderOutput {
        self.run(|| {
            self.proxy
                .render_full(self.history.pipeline(), self.preview.as_ref(), &self.catalog)
        })
    }

    /// Full-resolution state for a background render.
    #[must_use]
    pub fn snapshot(&self) -> RenderSnapshot {
        self.snapshot_from(self.proxy.full_base())
    }

    /// On-screen state for a background render.
    #[must_use]
    pub fn view_snapshot(&self) -> RenderSnapshot {
        self.snapshot_from(self.proxy.view_base())
    }

    fn snapshot_from(&self, base: Option<(Arc<DynamicImage>, f64)>) -> RenderSnapshot {
        let (base, scale_factor) = base.map_or((None, 1.0), |(image, scale)| (Some(image), scale));
        RenderSnapshot {
            base,
            pipeline: self.history.pipeline().clone(),
            preview: self.preview.clone(),
            scale_factor,
            catalog: Arc::clone(&self.catalog),
        }
    }

    fn run(&self, render: impl FnOnce() -> RenderOutput) -> RenderOutput {
        self.events.publish(EventKind::ProcessingStarted);
        let output = render();
        tracing::debug!(
            output = %output.report.output,
            stages = output.report.stages.len(),
            failed = output.report.failed_count(),
            elapsed_ms = output.report.total_duration.as_secs_f64() * 1000.0,
            "render finished"
        );
        self.events.publish(EventKind::ProcessingFinished);
        output
    }
}
