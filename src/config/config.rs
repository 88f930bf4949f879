use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent defaults for the `molecules` command. Flags given on the
/// command line override these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Partitioning distance in bp
    #[serde(default = "default_dist")]
    pub dist: u64,

    #[serde(default = "default_barcode_tag")]
    pub barcode_tag: String,

    #[serde(default)]
    pub min_mapping_quality: u8,

    /// htslib decompression threads
    #[serde(default = "default_threads")]
    pub threads: usize,
}

fn default_dist() -> u64 {
    50_000
}

fn default_barcode_tag() -> String {
    "RX".to_string()
}

fn default_threads() -> usize {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dist: default_dist(),
            barcode_tag: default_barcode_tag(),
            min_mapping_quality: 0,
            threads: default_threads(),
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "linkedread", "linkedread-tools")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }

    /// Loads the user config, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load() -> Self {
        let Some(config_path) = Self::config_path() else {
            return Config::default();
        };
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Config::default();
        }

        match Self::load_from(&config_path) {
            Ok(config) => {
                debug!("Loaded config from {}", config_path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config {}: {:#}", config_path.display(), e);
                Config::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::config_path().context("Could not determine a config directory")?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(config_dir) = path.parent() {
            fs::create_dir_all(config_dir)?;
        }
        let content = self.to_toml()?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("dist = 10000\n").unwrap();
        assert_eq!(config.dist, 10_000);
        assert_eq!(config.barcode_tag, "RX");
        assert_eq!(config.threads, 1);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            dist: 25_000,
            barcode_tag: "BX".to_string(),
            min_mapping_quality: 20,
            threads: 4,
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "dist = \"far\"").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
