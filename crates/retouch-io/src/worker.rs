//! Background worker for loads, full renders and saves.
//!
//! Jobs are queued on an mpsc channel and run one at a time on a
//! dedicated thread. Every submission gets a new generation number;
//! results come back stamped with it so the caller can drop anything
//! older than its latest request with [`BackgroundWorker::is_current`].
//!
//! Cancellation is best-effort: the flag is checked when a job starts,
//! after a load's decode and before a save's encode, not in the middle
//! of a render.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use retouch_pipeline::{RenderOutput, RenderReport, RenderSnapshot};

use crate::error::IoError;
use crate::file::{LoadedImage, load_image, save_image};

/// Work for the background thread.
#[derive(Debug, Clone)]
pub enum Job {
    /// Decode an image file.
    Load {
        /// File to decode.
        path: PathBuf,
    },
    /// Render a snapshot.
    Render {
        /// Frozen session state.
        snapshot: RenderSnapshot,
    },
    /// Render a snapshot and encode the result to a file.
    Save {
        /// Frozen session state.
        snapshot: RenderSnapshot,
        /// Destination, format from the extension.
        path: PathBuf,
    },
}

impl Job {
    /// Short name for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Render { .. } => "render",
            Self::Save { .. } => "save",
        }
    }
}

/// What a finished job produced.
#[derive(Debug)]
pub enum JobOutcome {
    /// The decoded image.
    Loaded(LoadedImage),
    /// The rendered image and its diagnostics.
    Rendered(RenderOutput),
    /// The file was written.
    Saved {
        /// File written.
        path: PathBuf,
        /// Diagnostics of the render that produced it.
        report: RenderReport,
    },
    /// The job saw its cancel flag and stopped.
    Cancelled,
    /// The job failed.
    Failed(IoError),
}

/// A completion, stamped with the generation of its submission.
#[derive(Debug)]
pub struct JobResult {
    /// Generation returned by [`BackgroundWorker::submit`].
    pub generation: u64,
    /// What happened.
    pub outcome: JobOutcome,
}

/// Caller's side of a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    generation: u64,
    cancelled: Arc<AtomicBool>,
}

impl JobHandle {
    /// Generation of this job.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Ask the worker to stop this job at its next check.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

enum Message {
    Run {
        job: Job,
        generation: u64,
        cancelled: Arc<AtomicBool>,
    },
    Exit,
}

/// A single background thread that runs [`Job`]s in submission order.
pub struct BackgroundWorker {
    tx: Option<Sender<Message>>,
    results: Receiver<JobResult>,
    thread: Option<JoinHandle<()>>,
    latest: AtomicU64,
}

impl BackgroundWorker {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Spawn`] if the thread cannot be created.
    pub fn new() -> Result<Self, IoError> {
        let (tx, rx) = mpsc::channel::<Message>();
        let (result_tx, results) = mpsc::channel::<JobResult>();
        let thread = std::thread::Builder::new()
            .name("retouch-io-worker".to_owned())
            .spawn(move || worker_loop(&rx, &result_tx))
            .map_err(IoError::Spawn)?;
        Ok(Self {
            tx: Some(tx),
            results,
            thread: Some(thread),
            latest: AtomicU64::new(0),
        })
    }

    /// Queue `job` and return its handle.
    ///
    /// The new generation supersedes every earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WorkerStopped`] after [`shutdown`](Self::shutdown).
    pub fn submit(&self, job: Job) -> Result<JobHandle, IoError> {
        let tx = self.tx.as_ref().ok_or(IoError::WorkerStopped)?;
        let generation = self.latest.fetch_add(1, Ordering::Relaxed) + 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        tracing::debug!(generation, job = job.label(), "job submitted");
        tx.send(Message::Run {
            job,
            generation,
            cancelled: Arc::clone(&cancelled),
        })
        .map_err(|_| IoError::WorkerStopped)?;
        Ok(JobHandle {
            generation,
            cancelled,
        })
    }

    /// Generation of the most recent submission, `0` before any.
    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::Relaxed)
    }

    /// Returns `true` if `generation` is the most recent submission.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest_generation()
    }

    /// A finished result, if one is waiting.
    #[must_use]
    pub fn try_recv(&self) -> Option<JobResult> {
        match self.results.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next result, or `None` once the worker is gone.
    #[must_use]
    pub fn recv(&self) -> Option<JobResult> {
        self.results.recv().ok()
    }

    /// Block for at most `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<JobResult> {
        match self.results.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns `true` until [`shutdown`](Self::shutdown).
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    /// Finish queued jobs, stop the thread and wait for it.
    ///
    /// Results of jobs that completed are still available through
    /// [`try_recv`](Self::try_recv). Calling this twice is a no-op.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.tx.take() {
            // A send error means the thread is already gone.
            let _ = tx.send(Message::Exit);
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("background worker thread panicked");
        }
    }
}

impl Drop for BackgroundWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BackgroundWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWorker")
            .field("running", &self.is_running())
            .field("latest", &self.latest_generation())
            .finish_non_exhaustive()
    }
}

fn worker_loop(rx: &Receiver<Message>, results: &Sender<JobResult>) {
    while let Ok(message) = rx.recv() {
        let Message::Run {
            job,
            generation,
            cancelled,
        } = message
        else {
            break;
        };

        let label = job.label();
        let start = Instant::now();
        let outcome = run_job(job, || cancelled.load(Ordering::Relaxed));
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            JobOutcome::Failed(err) => {
                tracing::warn!(generation, job = label, elapsed_ms, error = %err, "job failed");
            }
            JobOutcome::Cancelled => {
                tracing::info!(generation, job = label, "job cancelled");
            }
            _ => tracing::info!(generation, job = label, elapsed_ms, "job finished"),
        }

        if results.send(JobResult { generation, outcome }).is_err() {
            // Nobody is listening any more.
            break;
        }
    }
    tracing::debug!("background worker exiting");
}

fn run_job(job: Job, is_cancelled: impl Fn() -> bool) -> JobOutcome {
    if is_cancelled() {
        return JobOutcome::Cancelled;
    }
    match job {
        Job::Load { path } => match load_image(path) {
            Ok(_) if is_cancelled() => JobOutcome::Cancelled,
            Ok(loaded) => JobOutcome::Loaded(loaded),
            Err(err) => JobOutcome::Failed(err),
        },
        Job::Render { snapshot } => JobOutcome::Rendered(snapshot.render_with_report()),
        Job::Save { snapshot, path } => {
            let output = snapshot.render_with_report();
            if is_cancelled() {
                return JobOutcome::Cancelled;
            }
            match save_image(&output.image, &path) {
                Ok(()) => JobOutcome::Saved {
                    path,
                    report: output.report,
                },
                Err(err) => JobOutcome::Failed(err),
            }
        }
    }
}
