//! Locale pak extraction.
//!
//! Pipeline, leaves first:
//!
//! - [`AssetSource`]: the packaged application assets (directory or APK archive)
//! - [`LocaleResolver`]: UI language → packaged locale tags (pure)
//! - [`ExtractionPlanner`]: locale tags → `(asset path, output file name)` pairs
//! - [`ExtractionExecutor`]: makes `<app-data-dir>/paks/` match the plan, with a
//!   no-I/O fast path when everything is already in place
//! - [`CompletionGate`]: one-shot latch that runs registered callbacks when done
//! - [`ResourceExtractor`]: wires the above together and runs them once per process
//!
//! # Output layout
//!
//! ```text
//! <app-data-dir>/
//!   paks/
//!     en-US.pak@<version>
//!     fr.pak@<version>
//!   icudtl.dat          (legacy, deleted on version change)
//!   snapshot_blob.bin   (legacy, deleted on version change)
//! ```

pub mod assets;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod gate;
pub mod locale;
pub mod planner;

pub use assets::{ApkAssetSource, AssetSource, DirectoryAssetSource};
pub use error::ExtractionError;
pub use executor::{ExtractionExecutor, ExtractionReport, LEGACY_DATA_FILES, OutputDirectoryState};
pub use extractor::ResourceExtractor;
pub use gate::{CompletionCallback, CompletionGate, ExtractionFailure, ExtractionOutcome};
pub use locale::LocaleResolver;
pub use planner::{COMPRESSED_LOCALES_DIR, ExtractionPlan, ExtractionPlanner, PlanEntry};

use crate::models::ExtractorConfig;
use std::sync::Arc;

/// Open the asset source named by `config.assets_path`: an archive if it is
/// a file, a directory source otherwise.
pub fn open_asset_source(config: &ExtractorConfig) -> Result<Arc<dyn AssetSource>, ExtractionError> {
    let path = &config.assets_path;
    if path.is_file() {
        tracing::info!("Reading assets from archive {}", path);
        Ok(Arc::new(ApkAssetSource::open(path)?))
    } else {
        tracing::info!("Reading assets from directory {}", path);
        Ok(Arc::new(DirectoryAssetSource::new(path)))
    }
}
