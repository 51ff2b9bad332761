// pakload - locale pak extraction and UI resource loading
//
// This is the library crate containing the extraction pipeline, the resource
// manager and the content-capture session tree. The binary crate (main.rs)
// wires them together for a single process run.

pub mod config;
pub mod content_capture;
pub mod extraction;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod resources;
pub mod tasks;

// Re-export commonly used types for convenience
pub use crate::config::ConfigManager;
pub use extraction::{CompletionGate, ExtractionError, ExtractionOutcome, ResourceExtractor};
pub use metrics::Metrics;
pub use models::{ExtractorConfig, LoadedResource, PackagingKind, Rect, ResourceType};
pub use resources::{NativeBridge, NativeResourceSink, ResourceManager};
pub use tasks::{ImmediateTaskRunner, TaskRunner, TokioTaskRunner};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
