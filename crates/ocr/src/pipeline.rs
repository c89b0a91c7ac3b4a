use std::path::PathBuf;

use serde::Serialize;
use suito_core::{FormTitle, LineItem, TraceContext};
use suito_export::{line_items_to_csv, ExportError, CSV_CONTENT_TYPE};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::hash;
use crate::intake::TaskRecord;
use crate::layout::LayoutReconstructor;
use crate::messenger::{MessageError, Messenger};
use crate::preprocess::{sniff_mime, ImageNormalizer};
use crate::recognizer::{DocumentRecognizer, RecognizeError};
use crate::store::{BlobStore, StoreError};

const PROCESSED_FOLDER: &str = "processed";
const REVIEW_FOLDER: &str = "review";
const FAILED_FOLDER: &str = "failed";

const MSG_PHOTO_FAILED: &str =
    "写真の処理に失敗しました。お手数ですが、テレマスにて手入力してください。";
const MSG_RECOGNITION_FAILED: &str =
    "写真の読み取り処理（OCR）中にエラーが発生しました。お手数ですが、テレマスにて手入力してください。";
const MSG_RETAKE: &str = "写真の処理に失敗しました。出納票の写真を正しく撮影して、もう一度アップロードするか、テレマスにて手入力してください。";
const MSG_EXPORT_FAILED: &str =
    "ファイルの作成に失敗しました。お手数ですが、テレマスにて手入力してください。";
const MSG_STORE_FAILED: &str =
    "処理結果を保存する際にエラーが発生しました。お手数ですが、テレマスにて手入力してください。";
const MSG_UNEXPECTED: &str =
    "処理中に予期せぬ問題が発生しました。お手数ですが、テレマスにて手入力してください。";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Task has no recipient")]
    MissingRecipient,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Recognize(#[from] RecognizeError),
    #[error("No title could be read from the form")]
    Unreadable,
    #[error("Title '{0}' is not a known form category")]
    UnknownTitle(String),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] MessageError),
}

impl PipelineError {
    /// Reply sent to the submitter when processing stops at this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Read { .. } => MSG_PHOTO_FAILED,
            PipelineError::Recognize(_) => MSG_RECOGNITION_FAILED,
            PipelineError::Unreadable | PipelineError::UnknownTitle(_) => MSG_RETAKE,
            PipelineError::Export(_) => MSG_EXPORT_FAILED,
            PipelineError::Store(_) => MSG_STORE_FAILED,
            PipelineError::MissingRecipient | PipelineError::Notify(_) => MSG_UNEXPECTED,
        }
    }
}

/// The result of a single form processing run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub trace_id: String,
    pub title: FormTitle,
    pub line_items: Vec<LineItem>,
    pub review_needed: bool,
    /// Key of the exported CSV in the blob store.
    pub csv_key: String,
    /// Reply that was sent to the submitter.
    pub message: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Orchestrates: read → normalize → recognize → reconstruct → export → store → reply.
pub struct FormPipeline<R, B, M> {
    recognizer: R,
    store: B,
    messenger: M,
    layout: LayoutReconstructor,
}

impl<R: DocumentRecognizer, B: BlobStore, M: Messenger> FormPipeline<R, B, M> {
    pub fn new(recognizer: R, store: B, messenger: M, layout: LayoutReconstructor) -> Self {
        Self { recognizer, store, messenger, layout }
    }

    /// Process tasks one at a time until every sender is dropped.
    pub async fn drain(&self, mut rx: mpsc::Receiver<TaskRecord>) -> QueueSummary {
        let mut summary = QueueSummary::default();
        while let Some(task) = rx.recv().await {
            match self.process(&task).await {
                Ok(_) => summary.succeeded += 1,
                Err(_) => summary.failed += 1,
            }
        }
        info!(succeeded = summary.succeeded, failed = summary.failed, "task queue closed");
        summary
    }

    /// Process one photographed form and reply to its submitter.
    /// On failure the submitter receives the message for the failed step.
    pub async fn process(&self, task: &TaskRecord) -> Result<TaskOutcome, PipelineError> {
        let ctx = task.context();
        if task.recipient_id.is_empty() {
            error!(trace_id = %ctx, source = %task.source.display(), "task has no recipient");
            return Err(PipelineError::MissingRecipient);
        }

        info!(trace_id = %ctx, source = %task.source.display(), "processing form");
        match self.run(&ctx, task).await {
            Ok(outcome) => {
                info!(trace_id = %ctx, title = %outcome.title, review_needed = outcome.review_needed, "form processed");
                Ok(outcome)
            }
            Err(e) => {
                error!(trace_id = %ctx, error = %e, "form processing failed");
                if let Err(send_err) =
                    self.messenger.send(&ctx, &task.recipient_id, e.user_message()).await
                {
                    error!(trace_id = %ctx, error = %send_err, "failed to notify user of the failure");
                }
                Err(e)
            }
        }
    }

    async fn run(&self, ctx: &TraceContext, task: &TaskRecord) -> Result<TaskOutcome, PipelineError> {
        let original = tokio::fs::read(&task.source)
            .await
            .map_err(|source| PipelineError::Read { path: task.source.clone(), source })?;
        let hash_hex = hash::to_hex(&hash::sha256_bytes(&original));

        let processed = self.normalize(ctx, &original).await;

        let document = self
            .recognizer
            .recognize(ctx, &processed, sniff_mime(&processed))
            .await?;
        let result = self.layout.reconstruct(&document, ctx);

        let Some(title) = result.title.clone().filter(|t| !t.is_empty()) else {
            self.store_photos(ctx, FAILED_FOLDER, &hash_hex, &original, &processed).await;
            return Err(PipelineError::Unreadable);
        };
        let form_title = result
            .form_title()
            .ok_or_else(|| PipelineError::UnknownTitle(title))?;

        let csv = line_items_to_csv(&result.line_items)?;

        let folder = if result.review_needed { REVIEW_FOLDER } else { PROCESSED_FOLDER };
        let csv_key = hash::blob_key(folder, &hash_hex, ".csv");
        self.store.put(ctx, &csv_key, &csv, CSV_CONTENT_TYPE).await?;
        self.store_photos(ctx, folder, &hash_hex, &original, &processed).await;

        let message = success_message(form_title, result.warning.as_deref());
        self.messenger.send(ctx, &task.recipient_id, &message).await?;

        Ok(TaskOutcome {
            trace_id: ctx.trace_id.clone(),
            title: form_title,
            line_items: result.line_items,
            review_needed: result.review_needed,
            csv_key,
            message,
        })
    }

    /// Normalization is CPU-bound; it runs on the blocking pool.
    async fn normalize(&self, ctx: &TraceContext, original: &[u8]) -> Vec<u8> {
        let data = original.to_vec();
        let job_ctx = ctx.clone();
        match tokio::task::spawn_blocking(move || ImageNormalizer::normalize_bytes(&data, &job_ctx)).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(trace_id = %ctx, error = %e, "normalization task aborted, using original image");
                original.to_vec()
            }
        }
    }

    /// Saving photos is best-effort; failures are logged and swallowed.
    async fn store_photos(
        &self,
        ctx: &TraceContext,
        folder: &str,
        hash_hex: &str,
        original: &[u8],
        processed: &[u8],
    ) {
        let photos = [
            (format!(".{}", extension_of(original)), original),
            (format!("_processed.{}", extension_of(processed)), processed),
        ];
        for (suffix, bytes) in photos {
            let key = hash::blob_key(folder, hash_hex, &suffix);
            if let Err(e) = self.store.put(ctx, &key, bytes, sniff_mime(bytes)).await {
                warn!(trace_id = %ctx, key = %key, error = %e, "failed to store photo");
            }
        }
    }
}

fn success_message(title: FormTitle, warning: Option<&str>) -> String {
    match warning {
        Some(warning) => format!("「{title}」{warning}"),
        None => format!("「{title}」の処理とアップロードが正常に完了しました。"),
    }
}

fn extension_of(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("bin")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
