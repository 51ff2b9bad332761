use super::{
    AssetSource, CompletionGate, ExtractionError, ExtractionExecutor, ExtractionFailure,
    ExtractionOutcome, ExtractionPlan, ExtractionPlanner, ExtractionReport, LocaleResolver,
};
use crate::metrics::Metrics;
use crate::models::ExtractorConfig;
use crate::tasks::TaskRunner;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

/// Once-per-process locale pak extraction.
///
/// Constructed once by the process entry point and handed to every component
/// that needs the paks; cloning shares the same instance.
///
/// # Lifecycle
///
/// 1. [`start_extracting_resources()`](Self::start_extracting_resources) posts
///    resolve → plan → execute to the background runner (first call only)
/// 2. The job always completes the [`CompletionGate`], on success or failure
/// 3. Callbacks registered through [`add_completion_callback()`](Self::add_completion_callback)
///    run on the callback runner once the gate is done
#[derive(Clone)]
pub struct ResourceExtractor {
    inner: Arc<Inner>,
}

struct Inner {
    config: ExtractorConfig,
    assets: Arc<dyn AssetSource>,
    background: Arc<dyn TaskRunner>,
    gate: CompletionGate,
    started: AtomicBool,
    resolver: LocaleResolver,
    planner: ExtractionPlanner,
    executor: ExtractionExecutor,
}

impl std::fmt::Debug for ResourceExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceExtractor")
            .field("output_dir", &self.inner.executor.output_dir())
            .field("started", &self.inner.started.load(Ordering::SeqCst))
            .field("gate", &self.inner.gate)
            .finish()
    }
}

impl ResourceExtractor {
    /// # Arguments
    /// * `config` - Locale set, packaging kind, version suffix and output location
    /// * `assets` - Packaged asset source
    /// * `background` - Runner for the blocking extraction job
    /// * `callback_runner` - Designated context for completion callbacks
    /// * `metrics` - Shared counters
    pub fn new(
        config: ExtractorConfig,
        assets: Arc<dyn AssetSource>,
        background: Arc<dyn TaskRunner>,
        callback_runner: Arc<dyn TaskRunner>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let resolver = LocaleResolver::new(config.fallback_locale.clone());
        let planner = ExtractionPlanner::new(config.packaging, config.version_suffix.clone());
        let executor = ExtractionExecutor::new(
            config.output_dir(),
            &config.app_data_dir,
            Arc::clone(&metrics),
        );

        Self {
            inner: Arc::new(Inner {
                gate: CompletionGate::new(callback_runner, metrics),
                config,
                assets,
                background,
                started: AtomicBool::new(false),
                resolver,
                planner,
                executor,
            }),
        }
    }

    /// Start extraction for `ui_language` on the background runner.
    ///
    /// Only the first call per instance does anything; extraction cannot be
    /// cancelled once started.
    ///
    /// # Returns
    /// `true` if this call started extraction
    pub fn start_extracting_resources(&self, ui_language: &str) -> bool {
        if !self.try_start() {
            tracing::debug!("Resource extraction already started - ignoring request");
            return false;
        }

        tracing::info!(
            "Starting resource extraction (ui_language={:?}, packaging={:?})",
            ui_language,
            self.inner.config.packaging
        );

        let inner = Arc::clone(&self.inner);
        let ui_language = ui_language.to_string();
        self.inner.background.post(Box::new(move || {
            let outcome = match inner.run(&ui_language) {
                Ok(report) => Ok(report),
                Err(e) => {
                    tracing::error!("Resource extraction failed: {}", e);
                    Err(ExtractionFailure::from(&e))
                }
            };
            inner.gate.complete(outcome);
        }));

        true
    }

    /// Mark extraction as finished without touching disk, for processes that
    /// never read locale paks.
    pub fn set_extraction_not_needed(&self) -> bool {
        if !self.try_start() {
            return false;
        }
        tracing::debug!("Resource extraction not needed for this process");
        self.inner.gate.complete(Ok(ExtractionReport {
            fast_path: true,
            ..ExtractionReport::default()
        }))
    }

    fn try_start(&self) -> bool {
        self.inner
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Resolve and plan without executing.
    pub fn plan_for(&self, ui_language: &str) -> Result<ExtractionPlan, ExtractionError> {
        self.inner.plan(ui_language)
    }

    /// Run `callback` on the callback runner once extraction is done.
    pub fn add_completion_callback<F>(&self, callback: F)
    where
        F: FnOnce(&ExtractionOutcome) + Send + 'static,
    {
        self.inner.gate.register_callback(callback);
    }

    /// Block until extraction is done. See [`CompletionGate::await_completion`].
    pub fn wait_for_completion(&self) -> ExtractionOutcome {
        self.inner.gate.await_completion()
    }

    pub fn completion_receiver(&self) -> oneshot::Receiver<ExtractionOutcome> {
        self.inner.gate.completion_receiver()
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn is_done(&self) -> bool {
        self.inner.gate.is_done()
    }

    pub fn gate(&self) -> &CompletionGate {
        &self.inner.gate
    }

    pub fn output_dir(&self) -> &Utf8Path {
        self.inner.executor.output_dir()
    }

    /// Where the extracted pak for `locale` lives (whether or not it exists yet).
    pub fn locale_pak_path(&self, locale: &str) -> Utf8PathBuf {
        let asset_path = self.inner.planner.asset_path(locale);
        self.output_dir()
            .join(self.inner.planner.output_name(&asset_path))
    }
}

impl Inner {
    fn plan(&self, ui_language: &str) -> Result<ExtractionPlan, ExtractionError> {
        let locales = self.resolver.resolve(
            ui_language,
            &self.config.device_language,
            &self.config.compressed_locales,
        )?;
        Ok(self.planner.plan(&locales, self.assets.as_ref()))
    }

    fn run(&self, ui_language: &str) -> Result<ExtractionReport, ExtractionError> {
        let plan = self.plan(ui_language)?;
        self.executor.execute(&plan, self.assets.as_ref())
    }
}
