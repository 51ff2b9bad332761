use crate::models::{LoadedResource, ResourceType};
use crate::tasks::TaskRunner;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};

/// Receiver of loader results, implemented by
/// [`ResourceManager`](super::ResourceManager).
pub trait ResourceLoadedCallback: Send + Sync {
    /// `resource` is `None` when the load produced nothing. That is not an
    /// error: the receiver drops it silently.
    fn on_resource_loaded(&self, kind: ResourceType, id: i32, resource: Option<LoadedResource>);

    /// The loader no longer provides `id`.
    fn on_resource_removed(&self, kind: ResourceType, id: i32);
}

/// Resolves `(kind, id)` references into loaded resources for one
/// [`ResourceType`], reporting results through a [`ResourceLoadedCallback`].
pub trait ResourceLoader: Send + Sync {
    fn kind(&self) -> ResourceType;

    /// Load `id` and report it before returning.
    fn load_resource(&self, id: i32);

    /// Best-effort background load of `id`. No ordering relative to other preloads.
    fn preload_resource(&self, id: i32);
}

/// Produces a resource from its id. May block (file I/O, decoding).
pub trait ResourceCreator: Send + Sync + 'static {
    fn create(&self, id: i32) -> Option<LoadedResource>;
}

/// Result slot shared between a background preload and a synchronous load
/// that takes it over.
struct PendingLoad {
    result: Mutex<Option<Option<LoadedResource>>>,
    ready: Condvar,
}

impl PendingLoad {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    fn fulfill(&self, resource: Option<LoadedResource>) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(resource);
        self.ready.notify_all();
    }

    fn wait(&self) -> Option<LoadedResource> {
        let guard = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        let mut guard = self
            .ready
            .wait_while(guard, |r| r.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.take().flatten()
    }
}

/// Loader that creates resources on a background runner when preloaded and
/// on the calling thread when loaded synchronously.
///
/// Whoever removes an id from the in-flight table reports it, so a
/// synchronous load that overtakes a preload waits for the preload's result
/// instead of creating the resource a second time, and the resource is
/// reported exactly once.
pub struct AsyncPreloadResourceLoader<C: ResourceCreator> {
    kind: ResourceType,
    creator: Arc<C>,
    runner: Arc<dyn TaskRunner>,
    callback: Weak<dyn ResourceLoadedCallback>,
    in_flight: Arc<Mutex<HashMap<i32, Arc<PendingLoad>>>>,
}

impl<C: ResourceCreator> AsyncPreloadResourceLoader<C> {
    pub fn new(
        kind: ResourceType,
        creator: C,
        runner: Arc<dyn TaskRunner>,
        callback: Weak<dyn ResourceLoadedCallback>,
    ) -> Self {
        Self {
            kind,
            creator: Arc::new(creator),
            runner,
            callback,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn creator(&self) -> &C {
        &self.creator
    }

    /// Number of preloads that have not been reported yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn report(
        callback: &Weak<dyn ResourceLoadedCallback>,
        kind: ResourceType,
        id: i32,
        resource: Option<LoadedResource>,
    ) {
        match callback.upgrade() {
            Some(callback) => callback.on_resource_loaded(kind, id, resource),
            None => tracing::debug!("Resource {}:{} loaded after its manager was dropped", kind, id),
        }
    }
}

impl<C: ResourceCreator> ResourceLoader for AsyncPreloadResourceLoader<C> {
    fn kind(&self) -> ResourceType {
        self.kind
    }

    // Waits without a bound for a preload of `id` that is already queued,
    // so the runner must make progress independently of this thread.
    fn load_resource(&self, id: i32) {
        let pending = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        let resource = match pending {
            Some(pending) => {
                tracing::trace!("Waiting for in-flight preload of {}:{}", self.kind, id);
                pending.wait()
            }
            None => self.creator.create(id),
        };

        Self::report(&self.callback, self.kind, id, resource);
    }

    fn preload_resource(&self, id: i32) {
        let pending = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight.contains_key(&id) {
                return;
            }
            let pending = Arc::new(PendingLoad::new());
            in_flight.insert(id, Arc::clone(&pending));
            pending
        };

        let kind = self.kind;
        let creator = Arc::clone(&self.creator);
        let in_flight = Arc::clone(&self.in_flight);
        let callback = self.callback.clone();

        self.runner.post(Box::new(move || {
            let resource = creator.create(id);
            pending.fulfill(resource.clone());

            let still_ours = {
                let mut in_flight = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                match in_flight.get(&id) {
                    Some(current) if Arc::ptr_eq(current, &pending) => {
                        in_flight.remove(&id);
                        true
                    }
                    _ => false,
                }
            };

            // Otherwise a synchronous load took the slot and reports the result itself.
            if still_ours {
                Self::report(&callback, kind, id, resource);
            }
        }));
    }
}
