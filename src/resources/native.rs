// Native consumer boundary
//
// The native side is represented by a table of sinks owned by `NativeBridge`.
// Managed-side objects keep only a `NativeHandle` (a generational index), so a
// handle that outlives its sink resolves to nothing instead of dangling.

use crate::models::{Bitmap, Rect, ResourceType};
use slotmap::{SlotMap, new_key_type};
use std::sync::{Arc, PoisonError, RwLock};

new_key_type! {
    /// Opaque handle to a native resource consumer.
    pub struct NativeHandle;
}

/// One-way notifications into native code. No return value, no acknowledgment.
pub trait NativeResourceSink: Send + Sync {
    /// A resource finished loading (or reloading).
    fn on_resource_ready(
        &self,
        kind: ResourceType,
        id: i32,
        bitmap: &Bitmap,
        padding: Rect,
        aperture: Rect,
    );

    /// A resource was removed by its loader.
    fn on_resource_removed(&self, _kind: ResourceType, _id: i32) {}
}

/// Table of attached native consumers.
#[derive(Default)]
pub struct NativeBridge {
    sinks: RwLock<SlotMap<NativeHandle, Arc<dyn NativeResourceSink>>>,
}

impl std::fmt::Debug for NativeBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBridge")
            .field("attached", &self.len())
            .finish()
    }
}

impl NativeBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, sink: Arc<dyn NativeResourceSink>) -> NativeHandle {
        let handle = self
            .sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(sink);
        tracing::debug!("Attached native resource sink {:?}", handle);
        handle
    }

    /// Remove a sink. Detaching an unknown or already-detached handle is a no-op.
    ///
    /// # Returns
    /// `true` if the handle was attached
    pub fn detach(&self, handle: NativeHandle) -> bool {
        let removed = self
            .sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle)
            .is_some();
        if removed {
            tracing::debug!("Detached native resource sink {:?}", handle);
        }
        removed
    }

    pub fn get(&self, handle: NativeHandle) -> Option<Arc<dyn NativeResourceSink>> {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
    }

    pub fn is_attached(&self, handle: NativeHandle) -> bool {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
