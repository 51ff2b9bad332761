use super::ResourceCreator;
use crate::models::{LoadedResource, Rect, ResourceType};
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Resources drawn by the platform rather than shipped as bitmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemResource {
    /// Half-ellipse glow shown when scrolling past an edge
    OverscrollGlow,
    /// Soft vertical shadow under toolbars
    ToolbarShadow,
    /// Single opaque white pixel, tinted by the compositor
    SolidPixel,
}

impl SystemResource {
    pub const ALL: [SystemResource; 3] = [
        SystemResource::OverscrollGlow,
        SystemResource::ToolbarShadow,
        SystemResource::SolidPixel,
    ];

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(SystemResource::OverscrollGlow),
            1 => Some(SystemResource::ToolbarShadow),
            2 => Some(SystemResource::SolidPixel),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            SystemResource::OverscrollGlow => 0,
            SystemResource::ToolbarShadow => 1,
            SystemResource::SolidPixel => 2,
        }
    }
}

/// Generates [`SystemResource`] bitmaps, sized in dp and scaled by `px_to_dp`.
#[derive(Debug, Clone)]
pub struct SystemResourceCreator {
    px_to_dp: f32,
}

impl SystemResourceCreator {
    const GLOW_WIDTH_DP: f32 = 128.0;
    const GLOW_HEIGHT_DP: f32 = 64.0;
    const SHADOW_HEIGHT_DP: f32 = 8.0;

    pub fn new(px_to_dp: f32) -> Self {
        Self { px_to_dp }
    }

    fn dp_to_px(&self, dp: f32) -> u32 {
        let scale = if self.px_to_dp > 0.0 { self.px_to_dp } else { 1.0 };
        ((dp / scale).round() as u32).max(1)
    }

    fn overscroll_glow(&self) -> RgbaImage {
        let width = self.dp_to_px(Self::GLOW_WIDTH_DP);
        let height = self.dp_to_px(Self::GLOW_HEIGHT_DP);
        let cx = width as f32 / 2.0;

        RgbaImage::from_fn(width, height, |x, y| {
            let dx = (x as f32 + 0.5 - cx) / cx;
            let dy = (y as f32 + 0.5) / height as f32;
            let distance = (dx * dx + dy * dy).sqrt();
            let alpha = ((1.0 - distance).clamp(0.0, 1.0) * 255.0) as u8;
            Rgba([255, 255, 255, alpha])
        })
    }

    fn toolbar_shadow(&self) -> RgbaImage {
        let height = self.dp_to_px(Self::SHADOW_HEIGHT_DP);
        RgbaImage::from_fn(1, height, |_, y| {
            let alpha = (1.0 - (y as f32 + 0.5) / height as f32) * 64.0;
            Rgba([0, 0, 0, alpha as u8])
        })
    }
}

impl ResourceCreator for SystemResourceCreator {
    fn create(&self, id: i32) -> Option<LoadedResource> {
        let Some(resource) = SystemResource::from_id(id) else {
            tracing::debug!("Unknown system resource id {}", id);
            return None;
        };

        let bitmap = match resource {
            SystemResource::OverscrollGlow => self.overscroll_glow(),
            SystemResource::ToolbarShadow => self.toolbar_shadow(),
            SystemResource::SolidPixel => RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255])),
        };

        let mut loaded =
            LoadedResource::from_bitmap(ResourceType::System, id, Arc::new(bitmap), self.px_to_dp);
        if resource == SystemResource::ToolbarShadow {
            // Only the single column stretches horizontally.
            loaded.aperture = Rect::new(0, 0, 1, loaded.aperture.bottom);
        }
        Some(loaded)
    }
}
