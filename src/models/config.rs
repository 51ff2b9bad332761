use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Locale tag that every bundle is built to contain.
pub const DEFAULT_FALLBACK_LOCALE: &str = "en-US";

/// How locale paks are packaged inside the application.
///
/// - `Apk`: a monolithic package keeping every locale under one shared `locales/` directory
/// - `Bundle`: split per-language install modules, each with its own `locales#lang_<language>/`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackagingKind {
    #[default]
    Apk,
    Bundle,
}

/// Extractor configuration loaded from `pakload.yaml` and `PAKLOAD_*` environment variables.
///
/// Contains the asset source location, output location, locale set and
/// resource loading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Application data directory. Paks are extracted to `<app_data_dir>/paks`.
    #[serde(default = "default_app_data_dir")]
    pub app_data_dir: Utf8PathBuf,

    /// Either an asset directory or an `.apk`/`.zip` archive with an `assets/` tree.
    #[serde(default = "default_assets_path")]
    pub assets_path: Utf8PathBuf,

    #[serde(default)]
    pub packaging: PackagingKind,

    /// Locale tags compressed into the package, in build order.
    #[serde(default = "default_compressed_locales")]
    pub compressed_locales: Vec<String>,

    #[serde(default = "default_fallback_locale")]
    pub fallback_locale: String,

    /// Marker appended to every extracted file name. Changes with each app build.
    #[serde(default = "default_version_suffix")]
    pub version_suffix: String,

    /// UI language override. Empty means "follow the device".
    #[serde(default)]
    pub ui_language: String,

    #[serde(default = "default_device_language")]
    pub device_language: String,

    /// Directory holding static bitmap resources (`<id>.png` + optional `<id>.yaml`).
    #[serde(default = "default_resource_dir")]
    pub resource_dir: Utf8PathBuf,

    #[serde(default = "default_px_to_dp")]
    pub px_to_dp: f32,

    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: Utf8PathBuf,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            app_data_dir: default_app_data_dir(),
            assets_path: default_assets_path(),
            packaging: PackagingKind::default(),
            compressed_locales: default_compressed_locales(),
            fallback_locale: default_fallback_locale(),
            version_suffix: default_version_suffix(),
            ui_language: String::new(),
            device_language: default_device_language(),
            resource_dir: default_resource_dir(),
            px_to_dp: default_px_to_dp(),
            debug_mode: false,
            log_dir: default_log_dir(),
        }
    }
}

impl ExtractorConfig {
    /// Directory that receives extracted locale paks.
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.app_data_dir.join("paks")
    }

    /// The language the extractor should resolve against: the override if set,
    /// otherwise the device language.
    pub fn effective_language(&self) -> &str {
        if self.ui_language.trim().is_empty() {
            &self.device_language
        } else {
            &self.ui_language
        }
    }
}

fn default_app_data_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("app_data")
}

fn default_assets_path() -> Utf8PathBuf {
    Utf8PathBuf::from("assets")
}

fn default_compressed_locales() -> Vec<String> {
    vec![DEFAULT_FALLBACK_LOCALE.to_string()]
}

fn default_fallback_locale() -> String {
    DEFAULT_FALLBACK_LOCALE.to_string()
}

fn default_version_suffix() -> String {
    format!("@{}", env!("CARGO_PKG_VERSION"))
}

fn default_device_language() -> String {
    "en".to_string()
}

fn default_resource_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("res")
}

fn default_px_to_dp() -> f32 {
    1.0
}

fn default_log_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("logs")
}
