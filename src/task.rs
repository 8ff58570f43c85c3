//! Background export.
//!
//! An [`ExportTask`] runs one export on its own thread over an immutable
//! [`SessionSnapshot`]. The session stays editable while the task runs and
//! none of those edits reach the export. Progress comes back over a
//! channel; cancellation is a shared flag checked between images.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use crate::format::{
    ExportError, ExportFormat, ExportOptions, ExportResult, Exporter, FsSink, OutputSink,
};
use crate::session::SessionSnapshot;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress report, sent after each source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    /// Source images finished so far
    pub completed: usize,
    pub total: usize,
    /// File name of the image just finished
    pub image: String,
}

/// Terminal state of an export task.
#[derive(Debug)]
pub enum ExportOutcome {
    /// Every image was processed. Individual items may still have failed.
    Completed(ExportResult),
    /// Stopped by request, with what was done before the stop
    Cancelled(ExportResult),
    /// Rejected configuration or a crashed worker
    Failed(ExportError),
}

/// Handle to an export running on a background thread.
pub struct ExportTask {
    cancel: CancelToken,
    progress_rx: Receiver<ExportProgress>,
    handle: JoinHandle<Result<ExportResult, ExportError>>,
}

impl ExportTask {
    /// Start exporting `snapshot` to the filesystem under `root`.
    pub fn spawn(
        snapshot: Arc<SessionSnapshot>,
        format: ExportFormat,
        root: PathBuf,
        options: ExportOptions,
    ) -> Result<Self, ExportError> {
        Self::spawn_with_sink(snapshot, format, root, options, Arc::new(FsSink))
    }

    /// Start exporting through a custom sink.
    pub fn spawn_with_sink(
        snapshot: Arc<SessionSnapshot>,
        format: ExportFormat,
        root: PathBuf,
        options: ExportOptions,
        sink: Arc<dyn OutputSink>,
    ) -> Result<Self, ExportError> {
        let cancel = CancelToken::new();
        let (progress_tx, progress_rx) = mpsc::channel::<ExportProgress>();

        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("export".to_string())
            .spawn(move || {
                log::info!("Export thread started ({} images)", snapshot.items.len());
                let result = Exporter::new(format, &snapshot.registry)
                    .options(options)
                    .sink(sink.as_ref())
                    .cancel_token(token)
                    .on_progress(|progress| {
                        if progress_tx.send(progress).is_err() {
                            log::debug!("Progress receiver dropped");
                        }
                    })
                    .run(&snapshot.items, &root);
                log::info!("Export thread exiting");
                result
            })
            .map_err(|e| ExportError::Task(format!("Failed to spawn export thread: {}", e)))?;

        Ok(Self {
            cancel,
            progress_rx,
            handle,
        })
    }

    /// Ask the task to stop before its next image.
    pub fn cancel(&self) {
        log::info!("Export cancellation requested");
        self.cancel.cancel();
    }

    /// Token that cancels this task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Next pending progress report, without blocking.
    pub fn try_progress(&self) -> Option<ExportProgress> {
        self.progress_rx.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end.
    pub fn join(self) -> ExportOutcome {
        match self.handle.join() {
            Ok(Ok(result)) => ExportOutcome::Completed(result),
            Ok(Err(ExportError::Cancelled { partial })) => ExportOutcome::Cancelled(*partial),
            Ok(Err(e)) => ExportOutcome::Failed(e),
            Err(_) => {
                log::error!("Export thread panicked");
                ExportOutcome::Failed(ExportError::Task("export thread panicked".to_string()))
            }
        }
    }
}
