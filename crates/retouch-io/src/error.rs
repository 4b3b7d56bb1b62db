//! Errors raised while reading and writing files or talking to the
//! background worker.

use std::path::PathBuf;

use retouch_pipeline::PipelineError;

/// Errors from file I/O and the background worker.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// The file could not be opened, read or written.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not a decodable image.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: image::ImageError,
    },

    /// The image could not be encoded in the requested format.
    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        /// Destination file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: image::ImageError,
    },

    /// The extension does not name a supported image format.
    #[error("unsupported image format for {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A preset file is not a list of pipeline records.
    #[error("invalid preset {}: {source}", path.display())]
    Preset {
        /// Preset file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: PipelineError,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn background worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// The worker has been shut down and accepts no more jobs.
    #[error("background worker is not running")]
    WorkerStopped,
}
