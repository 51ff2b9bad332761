//! Integration tests for ResourceManager
//!
//! These tests verify:
//! - Successful loads are stored and forwarded to the native sink
//! - Later loads for the same key replace earlier ones (last write wins)
//! - Failed loads leave no entry and send no notification
//! - destroy() is idempotent and stops native forwarding only
//! - Static, system and dynamic loaders all report through the manager

use camino::Utf8PathBuf;
use image::{Rgba, RgbaImage};
use mockall::mock;
use mockall::predicate::{always, eq};
use pakload::metrics::Metrics;
use pakload::models::{Bitmap, Rect, ResourceType};
use pakload::resources::{
    DynamicResource, NativeBridge, NativeResourceSink, ResourceEvent, ResourceManager,
    SystemResource,
};
use pakload::tasks::{ImmediateTaskRunner, TaskLoop, TaskRunner};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

mock! {
    pub Sink {}

    impl NativeResourceSink for Sink {
        fn on_resource_ready(
            &self,
            kind: ResourceType,
            id: i32,
            bitmap: &Bitmap,
            padding: Rect,
            aperture: Rect,
        );
        fn on_resource_removed(&self, kind: ResourceType, id: i32);
    }
}

struct Harness {
    _temp_dir: TempDir,
    resource_dir: Utf8PathBuf,
    bridge: Arc<NativeBridge>,
    metrics: Arc<Metrics>,
}

impl Harness {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let resource_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        Self {
            _temp_dir: temp_dir,
            resource_dir,
            bridge: Arc::new(NativeBridge::new()),
            metrics: Arc::new(Metrics::new()),
        }
    }

    fn manager(&self, sink: MockSink, runner: Arc<dyn TaskRunner>) -> Arc<ResourceManager> {
        ResourceManager::new(
            &self.resource_dir,
            1.0,
            Arc::clone(&self.bridge),
            Arc::new(sink),
            runner,
            Arc::clone(&self.metrics),
        )
    }
}

fn bitmap(width: u32, height: u32) -> Bitmap {
    Arc::new(RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255])))
}

#[test]
fn test_last_write_wins() {
    let harness = Harness::new();
    let mut sink = MockSink::new();
    sink.expect_on_resource_ready()
        .with(eq(ResourceType::DynamicBitmap), eq(3), always(), always(), always())
        .times(2)
        .return_const(());
    let manager = harness.manager(sink, Arc::new(ImmediateTaskRunner));

    let loader = manager.bitmap_dynamic_loader();
    loader.notify_resource_changed(3, bitmap(2, 2));
    loader.notify_resource_changed(3, bitmap(5, 4));

    let stored = manager.get_resource(ResourceType::DynamicBitmap, 3).unwrap();
    assert_eq!(stored.bitmap.dimensions(), (5, 4));
    assert_eq!(stored.aperture, Rect::new(0, 0, 5, 4));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_static_resource_with_metadata() {
    let harness = Harness::new();
    RgbaImage::new(16, 16)
        .save(harness.resource_dir.join("100.png"))
        .unwrap();
    fs::write(
        harness.resource_dir.join("100.yaml"),
        "padding: { left: 2, top: 2, right: 2, bottom: 2 }\naperture: { left: 4, top: 4, right: 12, bottom: 12 }\n",
    )
    .unwrap();

    let mut sink = MockSink::new();
    sink.expect_on_resource_ready()
        .withf(|kind, id, bitmap, padding, aperture| {
            *kind == ResourceType::Static
                && *id == 100
                && bitmap.dimensions() == (16, 16)
                && *padding == Rect::new(2, 2, 2, 2)
                && *aperture == Rect::new(4, 4, 12, 12)
        })
        .times(1)
        .return_const(());
    let manager = harness.manager(sink, Arc::new(ImmediateTaskRunner));

    manager.resource_requested(ResourceType::Static, 100);

    let stored = manager.get_resource(ResourceType::Static, 100).unwrap();
    assert_eq!(stored.padding, Rect::new(2, 2, 2, 2));
}

#[test]
fn test_failed_load_is_silent() {
    let harness = Harness::new();
    let mut sink = MockSink::new();
    sink.expect_on_resource_ready().times(0);
    let manager = harness.manager(sink, Arc::new(ImmediateTaskRunner));

    manager.load_resource(ResourceType::Static, 7);
    manager.load_resource(ResourceType::System, 99);
    manager.load_resource(ResourceType::DynamicBitmap, 1);

    assert!(manager.get_resource(ResourceType::Static, 7).is_none());
    assert!(manager.get_resource(ResourceType::System, 99).is_none());
    assert!(manager.is_empty());
    assert_eq!(harness.metrics.snapshot().resources_dropped, 2);
}

#[test]
fn test_destroy_is_idempotent_and_stops_forwarding() {
    let harness = Harness::new();
    let mut sink = MockSink::new();
    sink.expect_on_resource_ready().times(1).return_const(());
    sink.expect_on_resource_removed().times(0);
    let manager = harness.manager(sink, Arc::new(ImmediateTaskRunner));

    manager.load_resource(ResourceType::System, SystemResource::SolidPixel.id());
    assert!(manager.is_attached());

    manager.destroy();
    manager.destroy();
    assert!(!manager.is_attached());
    assert!(harness.bridge.is_empty());
    assert!(manager.is_empty());

    // Still stored locally, never forwarded.
    manager.load_resource(ResourceType::System, SystemResource::ToolbarShadow.id());
    assert!(manager
        .get_resource(ResourceType::System, SystemResource::ToolbarShadow.id())
        .is_some());
    manager.remove_resource(ResourceType::System, SystemResource::ToolbarShadow.id());
}

#[test]
fn test_destroy_leaves_other_managers_attached() {
    let harness = Harness::new();
    let mut first_sink = MockSink::new();
    first_sink.expect_on_resource_ready().times(0);
    let mut second_sink = MockSink::new();
    second_sink.expect_on_resource_ready().times(1).return_const(());

    let first = harness.manager(first_sink, Arc::new(ImmediateTaskRunner));
    let second = harness.manager(second_sink, Arc::new(ImmediateTaskRunner));
    assert_eq!(harness.bridge.len(), 2);

    first.destroy();
    second.load_resource(ResourceType::System, 0);

    assert!(second.is_attached());
    assert_eq!(harness.bridge.len(), 1);
}

#[test]
fn test_preloads_complete_on_background_runner() {
    let harness = Harness::new();
    let mut sink = MockSink::new();
    sink.expect_on_resource_ready().times(3).return_const(());
    let (runner, mut task_loop) = TaskLoop::new();
    let manager = harness.manager(sink, Arc::new(runner));
    let mut events = manager.subscribe();

    let ids: Vec<i32> = SystemResource::ALL.iter().map(|r| r.id()).collect();
    manager.preload_resources(ResourceType::System, &[], &ids);
    manager.preload_resource(ResourceType::System, ids[0]);
    assert!(manager.is_empty());

    assert_eq!(task_loop.run_pending(), 3);
    assert_eq!(manager.len(), 3);

    let mut loaded = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let ResourceEvent::Loaded { id, .. } = event {
            loaded.push(id);
        }
    }
    loaded.sort();
    assert_eq!(loaded, ids);
}

struct ToolbarTexture {
    dirty: AtomicBool,
}

impl DynamicResource for ToolbarTexture {
    fn is_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    fn bitmap(&self) -> Option<Bitmap> {
        Some(bitmap(8, 2))
    }

    fn padding(&self) -> Rect {
        Rect::new(0, 1, 0, 1)
    }
}

#[test]
fn test_dynamic_provider_reported_when_dirty() {
    let harness = Harness::new();
    let mut sink = MockSink::new();
    sink.expect_on_resource_ready()
        .with(eq(ResourceType::Dynamic), eq(4), always(), eq(Rect::new(0, 1, 0, 1)), always())
        .times(1)
        .return_const(());
    sink.expect_on_resource_removed()
        .with(eq(ResourceType::Dynamic), eq(4))
        .times(1)
        .return_const(());
    let manager = harness.manager(sink, Arc::new(ImmediateTaskRunner));

    let texture = Arc::new(ToolbarTexture {
        dirty: AtomicBool::new(true),
    });
    manager.dynamic_loader().register_resource(4, texture.clone());

    manager.load_resource(ResourceType::Dynamic, 4);
    manager.load_resource(ResourceType::Dynamic, 4);
    assert!(manager.get_resource(ResourceType::Dynamic, 4).is_some());

    manager.dynamic_loader().unregister_resource(4);
    assert!(manager.get_resource(ResourceType::Dynamic, 4).is_none());
}
