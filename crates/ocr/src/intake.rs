use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use suito_core::TraceContext;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Photo extensions the intake folder accepts.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tif", "tiff", "bmp"];

/// One photographed form waiting to be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub source: PathBuf,
    pub recipient_id: String,
    pub trace_id: String,
    pub received_at: DateTime<Utc>,
}

impl TaskRecord {
    /// New task with a fresh trace id, stamped now.
    pub fn new(source: impl Into<PathBuf>, recipient_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            recipient_id: recipient_id.into(),
            trace_id: TraceContext::generate().trace_id,
            received_at: Utc::now(),
        }
    }

    pub fn context(&self) -> TraceContext {
        TraceContext::new(self.trace_id.clone())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Task queue is full")]
    Full,
    #[error("Task queue is closed")]
    Closed,
}

/// Sending half of the bounded task channel. Cheap to clone.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<TaskRecord>,
}

impl TaskQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TaskRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Wait for room in the queue.
    pub async fn enqueue(&self, task: TaskRecord) -> Result<(), QueueError> {
        self.tx.send(task).await.map_err(|_| QueueError::Closed)
    }

    /// Enqueue without waiting; used from the watcher thread.
    pub fn try_enqueue(&self, task: TaskRecord) -> Result<(), QueueError> {
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Spawn a notify watcher on `watch_dir` that turns newly created photos into
/// tasks addressed to `recipient_id`.
/// Returns the watcher; it must be kept alive for watching to continue.
pub fn spawn_intake_watcher(
    watch_dir: &Path,
    recipient_id: String,
    queue: TaskQueue,
) -> notify::Result<impl notify::Watcher> {
    use notify::{EventKind, RecursiveMode, Watcher};

    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        let ev = match event {
            Ok(ev) => ev,
            Err(e) => {
                warn!(error = %e, "intake watcher error");
                return;
            }
        };
        if !matches!(ev.kind, EventKind::Create(_)) {
            return;
        }
        for path in ev.paths {
            if !is_image_path(&path) {
                debug!(path = %path.display(), "ignoring non-image file");
                continue;
            }
            let task = TaskRecord::new(path, recipient_id.clone());
            let trace_id = task.trace_id.clone();
            if let Err(e) = queue.try_enqueue(task) {
                warn!(trace_id = %trace_id, error = %e, "photo dropped from intake");
            }
        }
    })?;

    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}
