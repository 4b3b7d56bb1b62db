//! Proxy workflow: reduced-resolution working copies.
//!
//! Two proxies exist per loaded image. The main-view proxy fits the
//! display bound and is what the idle view renders. The interaction
//! proxy is built when a drag starts, at `quality` times the source
//! size, and every parameter change during the drag renders against it.
//! When the drag ends the proxy is dropped and the caller re-renders at
//! full resolution.
//!
//! ```text
//!   Idle --start_interaction--> Interactive(proxy)
//!    ^                               |
//!    +-------end_interaction---------+
//! ```

use std::sync::Arc;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::downsample::{self, DownsampleFilter};
use crate::pipeline::Pipeline;
use crate::render::{Preview, RenderOutput, render_with_report};
use crate::types::{Dimensions, PipelineError};

/// Proxy sizing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Interaction proxy size relative to the source, in `(0.1, 1.0]`.
    /// At 1.0 the interaction proxy is the source itself.
    pub quality: f64,
    /// Longest axis of the main-view proxy, in pixels.
    pub view_max_dimension: u32,
    /// Resampling filter for both proxies.
    pub filter: DownsampleFilter,
}

impl ProxyConfig {
    /// Default interaction quality.
    pub const DEFAULT_QUALITY: f64 = 0.5;
    /// Default main-view bound.
    pub const DEFAULT_VIEW_MAX_DIMENSION: u32 = 2048;
    /// Default resampling filter.
    pub const DEFAULT_FILTER: DownsampleFilter = DownsampleFilter::Triangle;
    /// Exclusive lower bound for `quality`.
    pub const MIN_QUALITY: f64 = 0.1;

    /// Validate a quality factor.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] unless
    /// `0.1 < quality <= 1.0`.
    pub fn check_quality(quality: f64) -> Result<f64, PipelineError> {
        if quality > Self::MIN_QUALITY && quality <= 1.0 {
            Ok(quality)
        } else {
            Err(PipelineError::InvalidQuality(quality))
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            quality: Self::DEFAULT_QUALITY,
            view_max_dimension: Self::DEFAULT_VIEW_MAX_DIMENSION,
            filter: Self::DEFAULT_FILTER,
        }
    }
}

/// Reduced copy of `image` at `quality`, with its scale factor.
///
/// At quality 1.0 (or above) the copy is full size and the scale factor
/// is exactly 1.0. Otherwise each axis is `max(1, round(dim * quality))`
/// and the scale factor is `quality`.
#[must_use]
pub fn create_proxy(
    image: &DynamicImage,
    quality: f64,
    filter: DownsampleFilter,
) -> (DynamicImage, f64) {
    if quality >= 1.0 {
        return (image.clone(), 1.0);
    }
    (downsample::scale_by(image, quality, filter), quality)
}

/// A working copy and the ratio of its size to the source.
#[derive(Debug, Clone)]
pub struct Proxy {
    image: Arc<DynamicImage>,
    scale_factor: f64,
}

impl Proxy {
    fn new(image: DynamicImage, scale_factor: f64) -> Self {
        Self {
            image: Arc::new(image),
            scale_factor,
        }
    }

    /// The reduced image.
    #[must_use]
    pub const fn image(&self) -> &Arc<DynamicImage> {
        &self.image
    }

    /// Proxy size over source size; 1.0 for a full-size proxy.
    #[must_use]
    pub const fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Pixel size of the proxy.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }
}

/// Whether a drag is in progress.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    /// Not dragging; the view renders from the main-view proxy.
    #[default]
    Idle,
    /// Dragging; renders use this proxy.
    Interactive(Proxy),
}

/// Owns the source image and its proxies.
#[derive(Debug, Clone, Default)]
pub struct ProxyManager {
    config: ProxyConfig,
    source: Option<Arc<DynamicImage>>,
    view: Option<Proxy>,
    state: InteractionState,
}

impl ProxyManager {
    /// Manager with no image loaded.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] if `config.quality` is
    /// out of range.
    pub fn new(config: ProxyConfig) -> Result<Self, PipelineError> {
        ProxyConfig::check_quality(config.quality)?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> ProxyConfig {
        self.config
    }

    /// Interaction quality factor.
    #[must_use]
    pub const fn quality(&self) -> f64 {
        self.config.quality
    }

    /// Load a new source image. Any drag in progress ends, and the
    /// main-view proxy is rebuilt.
    pub fn set_image(&mut self, image: Arc<DynamicImage>) {
        self.state = InteractionState::Idle;
        self.source = Some(image);
        self.rebuild_view();
    }

    /// Drop the source image and every proxy.
    pub fn clear_image(&mut self) {
        self.source = None;
        self.view = None;
        self.state = InteractionState::Idle;
    }

    /// The full-resolution source.
    #[must_use]
    pub const fn source(&self) -> Option<&Arc<DynamicImage>> {
        self.source.as_ref()
    }

    /// Returns `true` if a source image is loaded.
    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.source.is_some()
    }

    /// Current interaction state.
    #[must_use]
    pub const fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Returns `true` while a drag is in progress.
    #[must_use]
    pub const fn is_interactive(&self) -> bool {
        matches!(self.state, InteractionState::Interactive(_))
    }

    /// Scale factor the next interactive render uses: the interaction
    /// proxy's while dragging, otherwise 1.0.
    #[must_use]
    pub const fn scale_factor(&self) -> f64 {
        match &self.state {
            InteractionState::Interactive(proxy) => proxy.scale_factor,
            InteractionState::Idle => 1.0,
        }
    }

    /// The main-view proxy.
    #[must_use]
    pub const fn view_proxy(&self) -> Option<&Proxy> {
        self.view.as_ref()
    }

    /// The interaction proxy, while dragging.
    #[must_use]
    pub const fn interaction_proxy(&self) -> Option<&Proxy> {
        match &self.state {
            InteractionState::Interactive(proxy) => Some(proxy),
            InteractionState::Idle => None,
        }
    }

    /// Enter the interactive state, building the interaction proxy.
    ///
    /// Returns `false` and changes nothing if no image is loaded or a
    /// drag is already in progress.
    pub fn start_interaction(&mut self) -> bool {
        if self.is_interactive() {
            return false;
        }
        let Some(proxy) = self.build_interaction_proxy() else {
            return false;
        };
        tracing::debug!(
            dimensions = %proxy.dimensions(),
            scale_factor = proxy.scale_factor,
            "interaction started"
        );
        self.state = InteractionState::Interactive(proxy);
        true
    }

    /// Leave the interactive state and drop the interaction proxy.
    ///
    /// Returns `true` if a drag was in progress, in which case the caller
    /// should re-render at full resolution.
    pub fn end_interaction(&mut self) -> bool {
        let was_interactive = self.is_interactive();
        self.state = InteractionState::Idle;
        if was_interactive {
            tracing::debug!("interaction ended");
        }
        was_interactive
    }

    /// Change the interaction quality.
    ///
    /// Both proxies are rebuilt. Returns `true` if a drag is in progress,
    /// meaning the caller should re-render.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] unless
    /// `0.1 < quality <= 1.0`; nothing changes in that case.
    pub fn set_quality(&mut self, quality: f64) -> Result<bool, PipelineError> {
        self.set_config(ProxyConfig {
            quality,
            ..self.config
        })
    }

    /// Replace the whole configuration. Same contract as
    /// [`set_quality`](Self::set_quality).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidQuality`] for an out-of-range
    /// quality.
    pub fn set_config(&mut self, config: ProxyConfig) -> Result<bool, PipelineError> {
        ProxyConfig::check_quality(config.quality)?;
        self.config = config;
        self.rebuild_view();
        if self.is_interactive() {
            if let Some(proxy) = self.build_interaction_proxy() {
                self.state = InteractionState::Interactive(proxy);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// The image and scale factor for an on-screen render: the
    /// interaction proxy while dragging, the main-view proxy otherwise.
    #[must_use]
    pub fn view_base(&self) -> Option<(Arc<DynamicImage>, f64)> {
        match &self.state {
            InteractionState::Interactive(proxy) => {
                Some((Arc::clone(&proxy.image), proxy.scale_factor))
            }
            InteractionState::Idle => self
                .view
                .as_ref()
                .map(|proxy| (Arc::clone(&proxy.image), proxy.scale_factor)),
        }
    }

    /// The full-resolution source with scale factor 1.0.
    #[must_use]
    pub fn full_base(&self) -> Option<(Arc<DynamicImage>, f64)> {
        self.source.as_ref().map(|image| (Arc::clone(image), 1.0))
    }

    /// Render for the screen against [`view_base`](Self::view_base).
    #[must_use]
    pub fn render_interactive(
        &self,
        pipeline: &Pipeline,
        preview: Option<&Preview>,
        catalog: &Catalog,
    ) -> RenderOutput {
        let (base, scale_factor) = self
            .view_base()
            .map_or((None, 1.0), |(image, scale)| (Some(image), scale));
        render_with_report(base.as_deref(), pipeline, preview, catalog, scale_factor)
    }

    /// Render the full-resolution source at scale 1.0. Never uses a
    /// proxy.
    #[must_use]
    pub fn render_full(
        &self,
        pipeline: &Pipeline,
        preview: Option<&Preview>,
        catalog: &Catalog,
    ) -> RenderOutput {
        render_with_report(self.source.as_deref(), pipeline, preview, catalog, 1.0)
    }

    fn build_interaction_proxy(&self) -> Option<Proxy> {
        let source = self.source.as_ref()?;
        if self.config.quality >= 1.0 {
            return Some(Proxy {
                image: Arc::clone(source),
                scale_factor: 1.0,
            });
        }
        let (image, scale) = create_proxy(source, self.config.quality, self.config.filter);
        Some(Proxy::new(image, scale))
    }

    fn rebuild_view(&mut self) {
        self.view = self.source.as_ref().map(|source| {
            let (image, scale) =
                downsample::fit_within(source, self.config.view_max_dimension, self.config.filter);
            if scale >= 1.0 {
                Proxy {
                    image: Arc::clone(source),
                    scale_factor: 1.0,
                }
            } else {
                Proxy::new(image, scale)
            }
        });
    }
}
