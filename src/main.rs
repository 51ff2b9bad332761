//! pakload - locale pak extraction and UI resource loading
//!
//! Main entry point for a single process start-up run.
//!
//! # Overview
//!
//! The binary plays the role of the embedding shell. It initializes:
//! - Configuration ([`ConfigManager`]: `pakload.yaml` + `PAKLOAD_*` variables)
//! - Logging infrastructure (file rotation + console output)
//! - Tokio runtime (blocking pool for extraction and resource preloads)
//! - A task loop on the main thread for completion callbacks
//! - The [`ResourceExtractor`] and the [`ResourceManager`]
//!
//! # Execution Flow
//!
//! 1. Load configuration from `<config-dir>/pakload.yaml` (first argument, default `.`)
//! 2. Initialize logging → `<log_dir>/pakload.<date>`
//! 3. Create tokio runtime with 2 worker threads
//! 4. Start extraction on the blocking pool and wait for the completion gate
//! 5. Run queued completion callbacks on the main thread
//! 6. Create the resource manager and preload system resources
//! 7. Log metrics, destroy the manager, shut the runtime down
//!
//! A failed extraction ends the process with a non-zero exit status.

use anyhow::{Context, Result};
use pakload::extraction::open_asset_source;
use pakload::metrics::Metrics;
use pakload::models::{Bitmap, Rect, ResourceType};
use pakload::resources::{NativeBridge, NativeResourceSink, SystemResource};
use pakload::tasks::TaskLoop;
use pakload::{APP_NAME, ConfigManager, ResourceExtractor, ResourceManager, TokioTaskRunner, VERSION};
use std::sync::Arc;

/// Native sink that only logs what it would hand to the compositor.
struct LoggingSink;

impl NativeResourceSink for LoggingSink {
    fn on_resource_ready(
        &self,
        kind: ResourceType,
        id: i32,
        bitmap: &Bitmap,
        padding: Rect,
        aperture: Rect,
    ) {
        tracing::debug!(
            "Resource ready {}:{} ({}x{}, padding={:?}, aperture={:?})",
            kind,
            id,
            bitmap.width(),
            bitmap.height(),
            padding,
            aperture
        );
    }

    fn on_resource_removed(&self, kind: ResourceType, id: i32) {
        tracing::debug!("Resource removed {}:{}", kind, id);
    }
}

fn main() -> Result<()> {
    let config_dir = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let config_manager = ConfigManager::new(&config_dir)?;
    let config = config_manager.load()?;

    let _log_guard = pakload::logging::setup_logging_with_console(
        &config.log_dir,
        APP_NAME,
        config.debug_mode,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("pakload-worker")
        .build()
        .context("Failed to build tokio runtime")?;

    let metrics = Arc::new(Metrics::new());
    let background = Arc::new(TokioTaskRunner::blocking(runtime.handle().clone()));
    let (main_runner, mut main_loop) = TaskLoop::new();

    let assets = open_asset_source(&config)?;
    let extractor = ResourceExtractor::new(
        config.clone(),
        assets,
        background.clone(),
        Arc::new(main_runner),
        Arc::clone(&metrics),
    );

    extractor.add_completion_callback(|outcome| match outcome {
        Ok(report) => tracing::info!(
            "Locale paks ready (fast_path={}, copied={}, deleted={})",
            report.fast_path,
            report.files_copied,
            report.files_deleted
        ),
        Err(failure) => tracing::error!("Locale paks unavailable: {}", failure),
    });
    extractor.start_extracting_resources(config.effective_language());

    let outcome = extractor.wait_for_completion();
    main_loop.run_pending();

    if let Err(failure) = outcome {
        metrics.log_summary();
        runtime.shutdown_timeout(std::time::Duration::from_secs(5));
        return Err(failure.into());
    }

    let bridge = Arc::new(NativeBridge::new());
    let manager = ResourceManager::from_config(
        &config,
        bridge,
        Arc::new(LoggingSink),
        background,
        Arc::clone(&metrics),
    );

    let system_ids: Vec<i32> = SystemResource::ALL.iter().map(|r| r.id()).collect();
    manager.preload_resources(ResourceType::System, &[], &system_ids);
    for &id in &system_ids {
        manager.load_resource(ResourceType::System, id);
    }
    tracing::info!("{} resources loaded", manager.len());

    manager.destroy();
    metrics.log_summary();

    runtime.shutdown_timeout(std::time::Duration::from_secs(5));
    tracing::info!("Shutdown complete");
    Ok(())
}
