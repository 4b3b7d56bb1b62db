//! retouch-io: image files, presets and background jobs.
//!
//! Decoding, encoding and full-resolution renders are slow enough that
//! an interactive front end should not run them on its control thread.
//! [`BackgroundWorker`] runs them on a dedicated thread and reports back
//! with generation-stamped [`JobResult`]s so stale completions can be
//! dropped.

pub mod error;
pub mod file;
pub mod preset;
pub mod worker;

pub use error::IoError;
pub use file::{LoadedImage, load_image, save_image};
pub use preset::{load_preset, save_preset};
pub use worker::{BackgroundWorker, Job, JobHandle, JobOutcome, JobResult};
