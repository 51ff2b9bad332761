use crate::models::ExtractorConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the configuration file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "pakload.yaml";

/// Prefix of environment variables that override file settings
/// (`PAKLOAD_UI_LANGUAGE=fr`, `PAKLOAD_COMPRESSED_LOCALES=en-US,fr`).
pub const ENV_PREFIX: &str = "PAKLOAD";

/// Configuration manager for loading and saving the extractor configuration.
///
/// Settings are layered, later sources winning:
/// 1. Built-in defaults
/// 2. `pakload.yaml` in the config directory (optional)
/// 3. `PAKLOAD_*` environment variables
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `pakload.yaml`; created if missing
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    /// Load the configuration from the file and the process environment.
    pub fn load(&self) -> Result<ExtractorConfig> {
        self.load_layers(None)
    }

    /// Load the configuration from the file only, ignoring the environment.
    pub fn load_file_only(&self) -> Result<ExtractorConfig> {
        self.load_layers(Some(config::Map::new()))
    }

    /// `env` replaces the process environment when given.
    fn load_layers(&self, env: Option<config::Map<String, String>>) -> Result<ExtractorConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
        }

        let settings = Config::builder()
            .add_source(
                File::from(self.config_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("compressed_locales")
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: ExtractorConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!(
            "Loaded config: packaging={:?}, locales={}, suffix={}",
            config.packaging,
            config.compressed_locales.len(),
            config.version_suffix
        );
        Ok(config)
    }

    /// Save the configuration file.
    pub fn save(&self, config: &ExtractorConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
