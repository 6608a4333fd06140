use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ExtrasError, ExtrasResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bridge: BridgeConfig,
    pub engine: EngineConfig,
    pub site: SiteConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fan-out rounds per flush while features keep inserting nodes.
    pub max_mutation_rounds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub preferences_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins.
    pub filter: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 3_000,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_mutation_rounds: 16,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origins: vec![
                "https://twitter.com/*".to_string(),
                "https://x.com/*".to_string(),
            ],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            preferences_path: dirs::data_dir()
                .unwrap_or_else(|| {
                    dirs::home_dir()
                        .map(|h| h.join(".local").join("share"))
                        .unwrap_or_else(|| PathBuf::from("/tmp"))
                })
                .join("twitter-extras")
                .join("preferences.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                // Fallback: ~ is not expanded by PathBuf, so use dirs::home_dir
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("twitter-extras")
            .join("config.toml")
    }

    /// Load config from the default path, or return defaults if not found
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`; unreadable or invalid files fall back to
    /// defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::read(path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to load config {}: {}", path.display(), e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    fn read(path: &Path) -> ExtrasResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate and clamp config values to acceptable ranges
    fn validate(&mut self) {
        self.bridge.request_timeout_ms = self.bridge.request_timeout_ms.clamp(100, 60_000);
        self.engine.max_mutation_rounds = self.engine.max_mutation_rounds.clamp(1, 256);

        self.site.origins.retain(|o| !o.trim().is_empty());
        if self.site.origins.is_empty() {
            self.site.origins = SiteConfig::default().origins;
        }

        if self.logging.filter.trim().is_empty() {
            self.logging.filter = LoggingConfig::default().filter;
        }
    }

    /// Save config to the default path
    pub fn save(&self) -> ExtrasResult<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> ExtrasResult<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ExtrasError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bridge.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.engine.max_mutation_rounds, 16);
        assert_eq!(config.site.origins.len(), 2);
        assert!(config
            .storage
            .preferences_path
            .ends_with("twitter-extras/preferences.json"));
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_and_clamping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[bridge]\nrequest_timeout_ms = 5\n\n[engine]\nmax_mutation_rounds = 0\n\n[site]\norigins = []\n",
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.bridge.request_timeout_ms, 100);
        assert_eq!(config.engine.max_mutation_rounds, 1);
        assert_eq!(config.site.origins, SiteConfig::default().origins);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_invalid_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "bridge = [not toml").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.bridge.request_timeout_ms = 1_500;
        config.logging.filter = "extras=debug".to_string();

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }
}
