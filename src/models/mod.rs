//! Data models shared across the crate.
//!
//! - [`ExtractorConfig`]: Extraction and resource settings loaded from `pakload.yaml`
//! - [`PackagingKind`]: Monolithic APK vs per-language bundle layout
//! - [`LoadedResource`], [`ResourceType`], [`Rect`]: Registry entries of the
//!   [`ResourceManager`](crate::resources::ResourceManager)

pub mod config;
pub mod resource;

pub use config::{DEFAULT_FALLBACK_LOCALE, ExtractorConfig, PackagingKind};
pub use resource::{Bitmap, LoadedResource, Rect, ResourceType};
