use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort an extraction run.
///
/// Every variant is fatal: the embedding application cannot start its
/// native side without the locale paks, so there is no retry or partial mode.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Fallback locale {locale} is not among the packaged locales")]
    MissingFallbackLocale { locale: String },

    #[error("Failed to create output directory {path}: {source}")]
    OutputDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list output directory {path}: {source}")]
    ListDirectory {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete stale file {path}: {source}")]
    DeleteStale {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Failed to copy asset {asset} to {destination}: {source}")]
    Copy {
        asset: String,
        destination: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open asset archive {path}: {message}")]
    Archive { path: Utf8PathBuf, message: String },

    #[error("Extraction task ended without reporting a result")]
    Abandoned,
}
