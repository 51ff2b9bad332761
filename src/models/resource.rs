use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Decoded pixel data shared between the registry and the native consumer.
pub type Bitmap = Arc<RgbaImage>;

/// Which loader owns a resource id. Ids are only unique within a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Static,
    Dynamic,
    DynamicBitmap,
    System,
}

impl ResourceType {
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Static,
        ResourceType::Dynamic,
        ResourceType::DynamicBitmap,
        ResourceType::System,
    ];

    /// Stable integer used on the native side of the boundary.
    pub fn as_native(self) -> i32 {
        match self {
            ResourceType::Static => 0,
            ResourceType::Dynamic => 1,
            ResourceType::DynamicBitmap => 2,
            ResourceType::System => 3,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Static => "static",
            ResourceType::Dynamic => "dynamic",
            ResourceType::DynamicBitmap => "dynamic-bitmap",
            ResourceType::System => "system",
        };
        f.write_str(name)
    }
}

/// Four-sided rectangle in bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub right: i32,
    #[serde(default)]
    pub bottom: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

/// A resource that finished loading, as stored in the
/// [`ResourceManager`](crate::resources::ResourceManager) registry.
///
/// Entries are keyed by `(kind, id)` and replaced wholesale on reload.
#[derive(Debug, Clone)]
pub struct LoadedResource {
    pub kind: ResourceType,
    pub id: i32,
    pub bitmap: Bitmap,
    pub padding: Rect,
    pub aperture: Rect,
    pub px_to_dp: f32,
}

impl LoadedResource {
    /// Build a resource whose aperture spans the whole bitmap and has no padding.
    pub fn from_bitmap(kind: ResourceType, id: i32, bitmap: Bitmap, px_to_dp: f32) -> Self {
        let aperture = Rect::new(0, 0, bitmap.width() as i32, bitmap.height() as i32);
        Self {
            kind,
            id,
            bitmap,
            padding: Rect::EMPTY,
            aperture,
            px_to_dp,
        }
    }

    pub fn key(&self) -> (ResourceType, i32) {
        (self.kind, self.id)
    }
}
