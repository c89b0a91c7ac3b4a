use anyhow::Context;
use suito_ocr::{
    spawn_intake_watcher, FormPipeline, FsBlobStore, HttpRecognizer, LayoutReconstructor,
    LogMessenger, RowReconciler, TaskQueue,
};
use tracing::info;

mod config;
mod logging;

use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = WorkerConfig::from_args_or_env(std::env::args().nth(1))?;
    logging::init(cfg.log_format);

    let dirs = cfg.resolve_dirs()?;
    std::fs::create_dir_all(&dirs.intake_dir).context("Failed to create intake directory")?;
    std::fs::create_dir_all(&dirs.store_dir).context("Failed to create store directory")?;
    let endpoint = cfg
        .recognizer_url
        .clone()
        .context("recognizer_url is not configured")?;

    // ── Form intake pipeline ──────────────────────────────────────────────────
    // The channel bridges the notify watcher thread and the async processor.
    let (queue, rx) = TaskQueue::new(cfg.queue_capacity);

    let pipeline = FormPipeline::new(
        HttpRecognizer::new(endpoint, cfg.recognizer_api_key.clone()),
        FsBlobStore::new(&dirs.store_dir),
        LogMessenger,
        LayoutReconstructor::new(cfg.title_charsets.clone(), RowReconciler::default()),
    );
    let worker = tokio::spawn(async move { pipeline.drain(rx).await });

    // ── Watch folder ──────────────────────────────────────────────────────────
    // The watcher must be kept alive for as long as photos should be picked up.
    let watcher = spawn_intake_watcher(&dirs.intake_dir, cfg.default_recipient.clone(), queue.clone())
        .context("Failed to start intake folder watcher")?;

    info!(
        intake_dir = %dirs.intake_dir.display(),
        store_dir = %dirs.store_dir.display(),
        "worker started"
    );

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("shutdown requested, finishing queued forms");

    // Closing every sender lets the processor drain and exit.
    drop(watcher);
    drop(queue);
    let summary = worker.await.context("Form processor panicked")?;
    info!(succeeded = summary.succeeded, failed = summary.failed, "worker stopped");
    Ok(())
}
