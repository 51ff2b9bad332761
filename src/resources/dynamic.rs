//! Loaders for resources produced at runtime rather than packaged.
//!
//! - [`DynamicResourceLoader`]: pulls bitmaps from registered [`DynamicResource`]
//!   providers when they report themselves dirty
//! - [`BitmapDynamicResourceLoader`]: callers push ready-made bitmaps

use super::{ResourceLoadedCallback, ResourceLoader};
use crate::models::{Bitmap, LoadedResource, Rect, ResourceType};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// A view or texture that can render itself into a bitmap on demand.
pub trait DynamicResource: Send + Sync {
    /// Whether the content changed since the last [`bitmap`](Self::bitmap) call.
    fn is_dirty(&self) -> bool;

    /// Render the current content. `None` means nothing to show right now.
    fn bitmap(&self) -> Option<Bitmap>;

    fn padding(&self) -> Rect {
        Rect::EMPTY
    }

    /// Stretchable region; the whole bitmap when `None`.
    fn aperture(&self) -> Option<Rect> {
        None
    }
}

fn report(
    callback: &Weak<dyn ResourceLoadedCallback>,
    kind: ResourceType,
    id: i32,
    resource: Option<LoadedResource>,
) {
    if let Some(callback) = callback.upgrade() {
        callback.on_resource_loaded(kind, id, resource);
    }
}

fn report_removed(callback: &Weak<dyn ResourceLoadedCallback>, kind: ResourceType, id: i32) {
    if let Some(callback) = callback.upgrade() {
        callback.on_resource_removed(kind, id);
    }
}

/// Loader for [`ResourceType::Dynamic`] resources.
pub struct DynamicResourceLoader {
    callback: Weak<dyn ResourceLoadedCallback>,
    px_to_dp: f32,
    resources: RwLock<HashMap<i32, Arc<dyn DynamicResource>>>,
}

impl DynamicResourceLoader {
    pub fn new(callback: Weak<dyn ResourceLoadedCallback>, px_to_dp: f32) -> Self {
        Self {
            callback,
            px_to_dp,
            resources: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the provider for `id`.
    pub fn register_resource(&self, id: i32, resource: Arc<dyn DynamicResource>) {
        self.resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, resource);
        tracing::debug!("Registered dynamic resource {}", id);
    }

    /// Drop the provider for `id` and notify the manager.
    pub fn unregister_resource(&self, id: i32) {
        let removed = self
            .resources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            report_removed(&self.callback, ResourceType::Dynamic, id);
        }
    }

    pub fn is_registered(&self, id: i32) -> bool {
        self.resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }
}

impl ResourceLoader for DynamicResourceLoader {
    fn kind(&self) -> ResourceType {
        ResourceType::Dynamic
    }

    /// Report the provider's bitmap if it is dirty. Clean providers are left
    /// alone: the registry already holds their last bitmap.
    fn load_resource(&self, id: i32) {
        let provider = self
            .resources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();

        let Some(provider) = provider else {
            tracing::debug!("No dynamic resource registered for id {}", id);
            return;
        };
        if !provider.is_dirty() {
            return;
        }

        let resource = provider.bitmap().map(|bitmap| {
            let mut loaded =
                LoadedResource::from_bitmap(ResourceType::Dynamic, id, bitmap, self.px_to_dp);
            loaded.padding = provider.padding();
            if let Some(aperture) = provider.aperture() {
                loaded.aperture = aperture;
            }
            loaded
        });
        report(&self.callback, ResourceType::Dynamic, id, resource);
    }

    /// Dynamic resources are rendered on demand; there is nothing to preload.
    fn preload_resource(&self, id: i32) {
        tracing::trace!("Ignoring preload of dynamic resource {}", id);
    }
}

/// Loader for [`ResourceType::DynamicBitmap`] resources.
pub struct BitmapDynamicResourceLoader {
    callback: Weak<dyn ResourceLoadedCallback>,
    px_to_dp: f32,
    bitmaps: RwLock<HashMap<i32, Bitmap>>,
}

impl BitmapDynamicResourceLoader {
    pub fn new(callback: Weak<dyn ResourceLoadedCallback>, px_to_dp: f32) -> Self {
        Self {
            callback,
            px_to_dp,
            bitmaps: RwLock::new(HashMap::new()),
        }
    }

    /// Store a new bitmap for `id` and report it right away.
    pub fn notify_resource_changed(&self, id: i32, bitmap: Bitmap) {
        self.bitmaps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&bitmap));
        self.report_bitmap(id, bitmap);
    }

    pub fn remove_resource(&self, id: i32) {
        let removed = self
            .bitmaps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            report_removed(&self.callback, ResourceType::DynamicBitmap, id);
        }
    }

    fn report_bitmap(&self, id: i32, bitmap: Bitmap) {
        let loaded =
            LoadedResource::from_bitmap(ResourceType::DynamicBitmap, id, bitmap, self.px_to_dp);
        report(&self.callback, ResourceType::DynamicBitmap, id, Some(loaded));
    }
}

impl ResourceLoader for BitmapDynamicResourceLoader {
    fn kind(&self) -> ResourceType {
        ResourceType::DynamicBitmap
    }

    fn load_resource(&self, id: i32) {
        let bitmap = self
            .bitmaps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        match bitmap {
            Some(bitmap) => self.report_bitmap(id, bitmap),
            None => tracing::debug!("No bitmap stored for dynamic bitmap resource {}", id),
        }
    }

    fn preload_resource(&self, id: i32) {
        tracing::trace!("Ignoring preload of dynamic bitmap resource {}", id);
    }
}
