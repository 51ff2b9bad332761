// Resource manager
//
// Owns one loader per ResourceType, stores every successful load in a registry
// keyed by (kind, id), and forwards each one to the attached native sink.

use super::{
    AsyncPreloadResourceLoader, BitmapDynamicResourceLoader, DynamicResourceLoader,
    NativeBridge, NativeHandle, NativeResourceSink, ResourceLoadedCallback, ResourceLoader,
    StaticResourceCreator, SystemResourceCreator,
};
use crate::metrics::Metrics;
use crate::models::{ExtractorConfig, LoadedResource, ResourceType};
use crate::tasks::TaskRunner;
use camino::Utf8Path;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

/// Events emitted when the registry changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceEvent {
    /// A resource was stored (new or replacing an earlier load)
    Loaded { kind: ResourceType, id: i32 },

    /// A loader stopped providing a resource
    Removed { kind: ResourceType, id: i32 },

    /// The native handle was released and the registry cleared
    Destroyed,
}

/// Central registry of loaded UI resources.
///
/// # Native handle
///
/// The manager attaches its sink to a [`NativeBridge`] on construction and
/// holds only the returned [`NativeHandle`]. [`destroy()`](Self::destroy) moves
/// it from attached to detached, once. While detached, loads still land in the
/// registry but nothing is forwarded to native code. Once `destroy()` returns
/// no sink call is running or will start, so a sink must not call `destroy()`
/// from inside one of its own notifications.
///
/// # Failure reporting
///
/// A load that produces nothing is dropped without an entry or a native
/// notification. Callers that need a time bound must impose their own.
pub struct ResourceManager {
    registry: RwLock<HashMap<(ResourceType, i32), LoadedResource>>,

    bridge: Arc<NativeBridge>,
    handle: NativeHandle,
    attached: AtomicBool,

    /// Held shared while calling the sink, exclusively while detaching
    forwarding: RwLock<()>,

    static_loader: AsyncPreloadResourceLoader<StaticResourceCreator>,
    system_loader: AsyncPreloadResourceLoader<SystemResourceCreator>,
    dynamic_loader: DynamicResourceLoader,
    bitmap_loader: BitmapDynamicResourceLoader,

    metrics: Arc<Metrics>,
    events_tx: broadcast::Sender<ResourceEvent>,
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("handle", &self.handle)
            .field("attached", &self.is_attached())
            .field("resources", &self.len())
            .finish()
    }
}

impl ResourceManager {
    /// Create a manager and attach `sink` to `bridge`.
    ///
    /// # Arguments
    /// * `resource_dir` - Directory holding static `<id>.png` resources
    /// * `px_to_dp` - Scale applied to every loaded bitmap
    /// * `background` - Runner for preloads. Must be a worker pool: a
    ///   synchronous load of an id whose preload is still queued waits for it,
    ///   so a [`TaskLoop`](crate::tasks::TaskLoop) drained by the loading
    ///   thread would never get to run it.
    pub fn new(
        resource_dir: &Utf8Path,
        px_to_dp: f32,
        bridge: Arc<NativeBridge>,
        sink: Arc<dyn NativeResourceSink>,
        background: Arc<dyn TaskRunner>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let handle = bridge.attach(sink);
        let (events_tx, _) = broadcast::channel(100);

        Arc::new_cyclic(|manager: &Weak<ResourceManager>| {
            let callback: Weak<dyn ResourceLoadedCallback> = manager.clone();
            Self {
                registry: RwLock::new(HashMap::new()),
                bridge,
                handle,
                attached: AtomicBool::new(true),
                forwarding: RwLock::new(()),
                static_loader: AsyncPreloadResourceLoader::new(
                    ResourceType::Static,
                    StaticResourceCreator::new(resource_dir, px_to_dp),
                    Arc::clone(&background),
                    callback.clone(),
                ),
                system_loader: AsyncPreloadResourceLoader::new(
                    ResourceType::System,
                    SystemResourceCreator::new(px_to_dp),
                    background,
                    callback.clone(),
                ),
                dynamic_loader: DynamicResourceLoader::new(callback.clone(), px_to_dp),
                bitmap_loader: BitmapDynamicResourceLoader::new(callback, px_to_dp),
                metrics,
                events_tx,
            }
        })
    }

    /// Create a manager using `resource_dir` and `px_to_dp` from the config.
    pub fn from_config(
        config: &ExtractorConfig,
        bridge: Arc<NativeBridge>,
        sink: Arc<dyn NativeResourceSink>,
        background: Arc<dyn TaskRunner>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        Self::new(
            &config.resource_dir,
            config.px_to_dp,
            bridge,
            sink,
            background,
            metrics,
        )
    }

    fn loader(&self, kind: ResourceType) -> &dyn ResourceLoader {
        match kind {
            ResourceType::Static => &self.static_loader,
            ResourceType::System => &self.system_loader,
            ResourceType::Dynamic => &self.dynamic_loader,
            ResourceType::DynamicBitmap => &self.bitmap_loader,
        }
    }

    /// Best-effort background load. Unordered relative to other preloads.
    pub fn preload_resource(&self, kind: ResourceType, id: i32) {
        self.loader(kind).preload_resource(id);
    }

    /// Load `kind:id` on the calling thread. The registry is up to date when
    /// this returns, unless the load produced nothing.
    pub fn load_resource(&self, kind: ResourceType, id: i32) {
        self.loader(kind).load_resource(id);
    }

    /// Native code asked for a resource it needs right now.
    pub fn resource_requested(&self, kind: ResourceType, id: i32) {
        tracing::trace!("Native request for resource {}:{}", kind, id);
        self.load_resource(kind, id);
    }

    /// Load `sync_ids` immediately and queue `async_ids` for background loading.
    pub fn preload_resources(&self, kind: ResourceType, sync_ids: &[i32], async_ids: &[i32]) {
        tracing::debug!(
            "Preloading {} resources: {} sync, {} async",
            kind,
            sync_ids.len(),
            async_ids.len()
        );
        for &id in sync_ids {
            self.load_resource(kind, id);
        }
        for &id in async_ids {
            self.preload_resource(kind, id);
        }
    }

    /// Metadata from the most recent successful load of `kind:id`.
    pub fn get_resource(&self, kind: ResourceType, id: i32) -> Option<LoadedResource> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(kind, id))
            .cloned()
    }

    /// Drop `kind:id` from the registry and tell native code.
    pub fn remove_resource(&self, kind: ResourceType, id: i32) {
        let removed = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(kind, id))
            .is_some();

        if removed {
            self.forward(|sink| sink.on_resource_removed(kind, id));
            let _ = self.events_tx.send(ResourceEvent::Removed { kind, id });
        }
    }

    /// Release the native handle and clear the registry. Later calls do nothing.
    pub fn destroy(&self) {
        let _forwarding = self
            .forwarding
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.attached.swap(false, Ordering::AcqRel) {
            return;
        }

        self.bridge.detach(self.handle);
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        tracing::info!("Resource manager destroyed");
        let _ = self.events_tx.send(ResourceEvent::Destroyed);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Number of resources in the registry
    pub fn len(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dynamic_loader(&self) -> &DynamicResourceLoader {
        &self.dynamic_loader
    }

    pub fn bitmap_dynamic_loader(&self) -> &BitmapDynamicResourceLoader {
        &self.bitmap_loader
    }

    /// Subscribe to registry changes.
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.events_tx.subscribe()
    }

    /// Call `notify` on the sink if still attached. Returns whether it was called.
    fn forward(&self, notify: impl FnOnce(&dyn NativeResourceSink)) -> bool {
        let _forwarding = self
            .forwarding
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.is_attached() {
            return false;
        }
        match self.bridge.get(self.handle) {
            Some(sink) => {
                notify(sink.as_ref());
                true
            }
            None => false,
        }
    }
}

impl ResourceLoadedCallback for ResourceManager {
    fn on_resource_loaded(&self, kind: ResourceType, id: i32, resource: Option<LoadedResource>) {
        let Some(resource) = resource else {
            tracing::debug!("Dropping empty load of resource {}:{}", kind, id);
            self.metrics.record_resource_dropped();
            return;
        };

        let (bitmap, padding, aperture) = (
            Arc::clone(&resource.bitmap),
            resource.padding,
            resource.aperture,
        );
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((kind, id), resource);
        self.metrics.record_resource_loaded();

        let forwarded =
            self.forward(|sink| sink.on_resource_ready(kind, id, &bitmap, padding, aperture));
        if forwarded {
            self.metrics.record_native_notification();
        }

        tracing::trace!(
            "Stored resource {}:{} (forwarded: {})",
            kind,
            id,
            forwarded
        );
        let _ = self.events_tx.send(ResourceEvent::Loaded { kind, id });
    }

    fn on_resource_removed(&self, kind: ResourceType, id: i32) {
        self.remove_resource(kind, id);
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Bitmap, Rect};
    use crate::tasks::{ImmediateTaskRunner, TaskLoop};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        ready: Mutex<Vec<(ResourceType, i32, Rect)>>,
        removed: Mutex<Vec<(ResourceType, i32)>>,
    }

    impl NativeResourceSink for RecordingSink {
        fn on_resource_ready(&self, kind: ResourceType, id: i32, _: &Bitmap, _: Rect, aperture: Rect) {
            self.ready.lock().unwrap().push((kind, id, aperture));
        }

        fn on_resource_removed(&self, kind: ResourceType, id: i32) {
            self.removed.lock().unwrap().push((kind, id));
        }
    }

    fn manager(runner: Arc<dyn TaskRunner>) -> (Arc<ResourceManager>, Arc<RecordingSink>, Arc<NativeBridge>) {
        let sink = Arc::new(RecordingSink::default());
        let bridge = Arc::new(NativeBridge::new());
        let manager = ResourceManager::new(
            Utf8Path::new("does-not-exist"),
            1.0,
            Arc::clone(&bridge),
            sink.clone(),
            runner,
            Arc::new(Metrics::new()),
        );
        (manager, sink, bridge)
    }

    #[test]
    fn test_system_load_is_stored_and_forwarded() {
        let (manager, sink, _bridge) = manager(Arc::new(ImmediateTaskRunner));

        manager.load_resource(ResourceType::System, 2);

        let stored = manager.get_resource(ResourceType::System, 2).unwrap();
        assert_eq!(stored.bitmap.dimensions(), (1, 1));
        assert_eq!(
            *sink.ready.lock().unwrap(),
            vec![(ResourceType::System, 2, Rect::new(0, 0, 1, 1))]
        );
    }

    #[test]
    fn test_missing_static_resource_is_silent() {
        let (manager, sink, _bridge) = manager(Arc::new(ImmediateTaskRunner));

        manager.load_resource(ResourceType::Static, 42);

        assert!(manager.get_resource(ResourceType::Static, 42).is_none());
        assert!(sink.ready.lock().unwrap().is_empty());
        assert_eq!(manager.metrics.snapshot().resources_dropped, 1);
    }

    #[test]
    fn test_preload_runs_on_background_runner() {
        let (runner, mut task_loop) = TaskLoop::new();
        let (manager, _sink, _bridge) = manager(Arc::new(runner));

        manager.preload_resources(ResourceType::System, &[0], &[1, 2]);
        assert!(manager.get_resource(ResourceType::System, 0).is_some());
        assert!(manager.get_resource(ResourceType::System, 1).is_none());

        assert_eq!(task_loop.run_pending(), 2);
        assert_eq!(manager.len(), 3);
    }

    #[test]
    fn test_destroy_detaches_once_and_clears() {
        let (manager, sink, bridge) = manager(Arc::new(ImmediateTaskRunner));
        let mut events = manager.subscribe();

        manager.load_resource(ResourceType::System, 0);
        manager.destroy();
        manager.destroy();

        assert!(!manager.is_attached());
        assert!(!bridge.is_attached(manager.handle()));
        assert!(manager.is_empty());

        manager.load_resource(ResourceType::System, 1);
        assert!(manager.get_resource(ResourceType::System, 1).is_some());
        assert_eq!(sink.ready.lock().unwrap().len(), 1);

        assert_eq!(
            events.try_recv().unwrap(),
            ResourceEvent::Loaded {
                kind: ResourceType::System,
                id: 0
            }
        );
        assert_eq!(events.try_recv().unwrap(), ResourceEvent::Destroyed);
    }

    #[test]
    fn test_bitmap_removal_reaches_native() {
        let (manager, sink, _bridge) = manager(Arc::new(ImmediateTaskRunner));

        manager
            .bitmap_dynamic_loader()
            .notify_resource_changed(9, Arc::new(image::RgbaImage::new(2, 2)));
        assert!(manager.get_resource(ResourceType::DynamicBitmap, 9).is_some());

        manager.bitmap_dynamic_loader().remove_resource(9);
        assert!(manager.get_resource(ResourceType::DynamicBitmap, 9).is_none());
        assert_eq!(
            *sink.removed.lock().unwrap(),
            vec![(ResourceType::DynamicBitmap, 9)]
        );
    }
    /// Sink that stays inside `on_resource_ready` for a while.
    #[derive(Default)]
    struct SlowSink {
        busy: AtomicBool,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl NativeResourceSink for SlowSink {
        fn on_resource_ready(&self, _: ResourceType, _: i32, _: &Bitmap, _: Rect, _: Rect) {
            self.busy.store(true, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(100));
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.busy.store(false, Ordering::SeqCst);
        }

        fn on_resource_removed(&self, _: ResourceType, _: i32) {}
    }

    #[test]
    fn test_destroy_waits_for_in_progress_notification() {
        let sink = Arc::new(SlowSink::default());
        let manager = ResourceManager::new(
            Utf8Path::new("does-not-exist"),
            1.0,
            Arc::new(NativeBridge::new()),
            sink.clone(),
            Arc::new(ImmediateTaskRunner),
            Arc::new(Metrics::new()),
        );

        let loading = {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || manager.load_resource(ResourceType::System, 0))
        };
        while !sink.busy.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }

        manager.destroy();
        assert!(!sink.busy.load(Ordering::SeqCst));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        loading.join().unwrap();
        manager.load_resource(ResourceType::System, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
    }
}
