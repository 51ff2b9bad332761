//! UI resource loading.
//!
//! A [`ResourceManager`] resolves `(ResourceType, id)` references into bitmaps
//! plus padding and aperture rectangles. Each type has its own loader:
//!
//! | Type | Loader | Source |
//! |------|--------|--------|
//! | `Static` | [`AsyncPreloadResourceLoader`] + [`StaticResourceCreator`] | `<resource_dir>/<id>.png` |
//! | `System` | [`AsyncPreloadResourceLoader`] + [`SystemResourceCreator`] | generated |
//! | `Dynamic` | [`DynamicResourceLoader`] | registered [`DynamicResource`] providers |
//! | `DynamicBitmap` | [`BitmapDynamicResourceLoader`] | bitmaps pushed by callers |
//!
//! Loaders report back through [`ResourceLoadedCallback`] and the manager
//! forwards to native code through a [`NativeBridge`] handle.

pub mod dynamic;
pub mod loader;
pub mod manager;
pub mod native;
pub mod static_loader;
pub mod system;

pub use dynamic::{BitmapDynamicResourceLoader, DynamicResource, DynamicResourceLoader};
pub use loader::{
    AsyncPreloadResourceLoader, ResourceCreator, ResourceLoadedCallback, ResourceLoader,
};
pub use manager::{ResourceEvent, ResourceManager};
pub use native::{NativeBridge, NativeHandle, NativeResourceSink};
pub use static_loader::{StaticResourceCreator, StaticResourceMetadata};
pub use system::{SystemResource, SystemResourceCreator};
