use super::ResourceCreator;
use crate::models::{LoadedResource, Rect, ResourceType};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

/// Optional layout metadata stored next to a static bitmap as `<id>.yaml`.
///
/// ```yaml
/// padding: { left: 4, top: 4, right: 4, bottom: 4 }
/// aperture: { left: 8, top: 8, right: 24, bottom: 24 }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticResourceMetadata {
    #[serde(default)]
    pub padding: Rect,

    /// Stretchable region; the whole bitmap when absent.
    #[serde(default)]
    pub aperture: Option<Rect>,
}

/// Decodes packaged PNG resources: `<resource_dir>/<id>.png`.
#[derive(Debug, Clone)]
pub struct StaticResourceCreator {
    resource_dir: Utf8PathBuf,
    px_to_dp: f32,
}

impl StaticResourceCreator {
    pub fn new<P: AsRef<Utf8Path>>(resource_dir: P, px_to_dp: f32) -> Self {
        Self {
            resource_dir: resource_dir.as_ref().to_path_buf(),
            px_to_dp,
        }
    }

    pub fn bitmap_path(&self, id: i32) -> Utf8PathBuf {
        self.resource_dir.join(format!("{}.png", id))
    }

    pub fn metadata_path(&self, id: i32) -> Utf8PathBuf {
        self.resource_dir.join(format!("{}.yaml", id))
    }

    fn decode(&self, id: i32) -> Result<LoadedResource> {
        let path = self.bitmap_path(id);
        let bitmap = image::open(&path)
            .with_context(|| format!("Failed to decode static resource {}", path))?
            .to_rgba8();

        let metadata = self.load_metadata(id)?;
        let aperture = metadata
            .aperture
            .unwrap_or_else(|| Rect::new(0, 0, bitmap.width() as i32, bitmap.height() as i32));

        Ok(LoadedResource {
            kind: ResourceType::Static,
            id,
            bitmap: Arc::new(bitmap),
            padding: metadata.padding,
            aperture,
            px_to_dp: self.px_to_dp,
        })
    }

    fn load_metadata(&self, id: i32) -> Result<StaticResourceMetadata> {
        let path = self.metadata_path(id);
        if !path.exists() {
            return Ok(StaticResourceMetadata::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read resource metadata: {}", path))?;
        serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse resource metadata: {}", path))
    }
}

impl ResourceCreator for StaticResourceCreator {
    fn create(&self, id: i32) -> Option<LoadedResource> {
        match self.decode(id) {
            Ok(resource) => Some(resource),
            Err(e) => {
                tracing::debug!("Static resource {} unavailable: {:#}", id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn resource_dir() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        (temp, dir)
    }

    #[test]
    fn test_decode_png_with_default_metadata() {
        let (_temp, dir) = resource_dir();
        RgbaImage::from_pixel(6, 3, Rgba([255, 0, 0, 255]))
            .save(dir.join("7.png"))
            .unwrap();

        let creator = StaticResourceCreator::new(&dir, 2.0);
        let resource = creator.create(7).unwrap();

        assert_eq!(resource.kind, ResourceType::Static);
        assert_eq!(resource.bitmap.dimensions(), (6, 3));
        assert_eq!(resource.aperture, Rect::new(0, 0, 6, 3));
        assert_eq!(resource.padding, Rect::EMPTY);
        assert_eq!(resource.px_to_dp, 2.0);
    }

    #[test]
    fn test_metadata_overrides_padding_and_aperture() {
        let (_temp, dir) = resource_dir();
        RgbaImage::new(32, 32).save(dir.join("1.png")).unwrap();
        fs::write(
            dir.join("1.yaml"),
            "padding: { left: 4, top: 4, right: 4, bottom: 4 }\naperture: { left: 8, top: 8, right: 24, bottom: 24 }\n",
        )
        .unwrap();

        let resource = StaticResourceCreator::new(&dir, 1.0).create(1).unwrap();
        assert_eq!(resource.padding, Rect::new(4, 4, 4, 4));
        assert_eq!(resource.aperture, Rect::new(8, 8, 24, 24));
    }

    #[test]
    fn test_missing_or_corrupt_resource_is_none() {
        let (_temp, dir) = resource_dir();
        fs::write(dir.join("2.png"), b"not a png").unwrap();

        let creator = StaticResourceCreator::new(&dir, 1.0);
        assert!(creator.create(1).is_none());
        assert!(creator.create(2).is_none());
    }
}
