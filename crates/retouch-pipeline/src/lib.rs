//! retouch-pipeline: non-destructive raster editing core (sans-IO).
//!
//! An edit is an ordered [`Pipeline`] of [`Operation`]s applied to an
//! immutable source image. Every change to the pipeline goes through an
//! undoable [`Command`]; a transient [`Preview`] can be layered on top
//! without touching history. While the user drags a control, renders run
//! against a reduced-resolution proxy and resolution-dependent
//! operations receive the proxy's scale factor so the result looks the
//! same at every size.
//!
//! ```text
//!   source ──► [proxy] ──► op₀ ──► op₁ ──► … ──► opₙ ──► [preview] ──► image
//! ```
//!
//! This crate has **no I/O dependencies**: images come in and go out as
//! in-memory [`DynamicImage`]s. Decoding, encoding, preset files and
//! background threads live in `retouch-io`.

pub mod catalog;
pub mod diagnostics;
pub mod downsample;
pub mod events;
pub mod history;
pub mod operation;
pub mod ops;
pub mod persist;
pub mod pipeline;
pub mod proxy;
pub mod render;
pub mod session;
pub mod types;

pub use catalog::{Catalog, Factory};
pub use diagnostics::{RenderReport, StageOutcome, StageReport};
pub use downsample::DownsampleFilter;
pub use events::{EventBus, EventKind, SubscriptionId};
pub use history::{Command, History, HistoryConfig};
pub use operation::{Operation, OperationRef};
pub use persist::{PipelineRecord, SkippedRecord};
pub use pipeline::Pipeline;
pub use proxy::{InteractionState, ProxyConfig, ProxyManager, create_proxy};
pub use render::{Preview, RenderOutput, RenderSnapshot, placeholder, render, render_with_report};
pub use session::{EditSession, SessionConfig};
pub use types::{Dimensions, DynamicImage, OperationError, ParamValue, Params, PipelineError};
