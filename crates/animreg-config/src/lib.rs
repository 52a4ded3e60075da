//! Configuration for the animreg registry
//!
//! Settings live in `animreg.toml`. The file location can be overridden with
//! the `ANIMREG_CONFIG` environment variable; a missing file yields defaults
//! that match the conventional project layout:
//!
//! ```toml
//! module_dir = "src/animations"
//! manifest_path = "src/Root.tsx"
//! sentinel_path = "src/.animreg-reload"
//! poll_interval_ms = 2000
//!
//! [baseline]
//! id = "Baseline"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_ENV: &str = "ANIMREG_CONFIG";
pub const CONFIG_FILE_NAME: &str = "animreg.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

/// What `create` does when the requested module name collides
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Proceed under the first alternative name and report the collision
    #[default]
    Rename,
    /// Fail with the ranked alternatives
    Reject,
}

/// The default composition that must always be present in the manifest
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BaselineConfig {
    pub id: String,
    pub component: String,
    pub import_source: String,
    pub duration_frames: u32,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        BaselineConfig {
            id: "Baseline".to_string(),
            component: "Baseline".to_string(),
            import_source: "./Baseline".to_string(),
            duration_frames: 150,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding one source file per animation module
    pub module_dir: String,
    /// The generated registry manifest
    pub manifest_path: String,
    /// File touched after every manifest write so the preview reloads
    pub sentinel_path: String,
    /// Module source extension, without the dot
    pub module_extension: String,
    /// Import path prefix the manifest uses for module files
    pub import_prefix: String,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub poll_interval_ms: u64,
    pub on_conflict: ConflictPolicy,
    /// Run a full resync when the watcher sees a module created or modified
    pub resync_on_change: bool,
    pub baseline: BaselineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module_dir: "src/animations".to_string(),
            manifest_path: "src/Root.tsx".to_string(),
            sentinel_path: "src/.animreg-reload".to_string(),
            module_extension: "tsx".to_string(),
            import_prefix: "./animations".to_string(),
            fps: 30,
            width: 1920,
            height: 1080,
            poll_interval_ms: 2000,
            on_conflict: ConflictPolicy::Rename,
            resync_on_change: false,
            baseline: BaselineConfig::default(),
        }
    }
}

impl Config {
    /// Location of the config file
    ///
    /// `ANIMREG_CONFIG` wins when set and non-empty, otherwise `animreg.toml`
    /// in the current directory.
    pub fn path() -> PathBuf {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        PathBuf::from(CONFIG_FILE_NAME)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(&Self::path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::path())
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "module-dir" => Some(self.module_dir.clone()),
            "manifest-path" => Some(self.manifest_path.clone()),
            "sentinel-path" => Some(self.sentinel_path.clone()),
            "module-extension" => Some(self.module_extension.clone()),
            "import-prefix" => Some(self.import_prefix.clone()),
            "fps" => Some(self.fps.to_string()),
            "width" => Some(self.width.to_string()),
            "height" => Some(self.height.to_string()),
            "poll-interval-ms" => Some(self.poll_interval_ms.to_string()),
            "on-conflict" => Some(
                match self.on_conflict {
                    ConflictPolicy::Rename => "rename",
                    ConflictPolicy::Reject => "reject",
                }
                .to_string(),
            ),
            "resync-on-change" => Some(self.resync_on_change.to_string()),
            "baseline-id" => Some(self.baseline.id.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        let invalid = |value: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "module-dir" => self.module_dir = value,
            "manifest-path" => self.manifest_path = value,
            "sentinel-path" => self.sentinel_path = value,
            "module-extension" => self.module_extension = value.trim_start_matches('.').to_string(),
            "import-prefix" => self.import_prefix = value,
            "fps" => self.fps = value.parse().map_err(|_| invalid(&value))?,
            "width" => self.width = value.parse().map_err(|_| invalid(&value))?,
            "height" => self.height = value.parse().map_err(|_| invalid(&value))?,
            "poll-interval-ms" => {
                self.poll_interval_ms = value.parse().map_err(|_| invalid(&value))?;
            }
            "on-conflict" => {
                self.on_conflict = match value.as_str() {
                    "rename" => ConflictPolicy::Rename,
                    "reject" => ConflictPolicy::Reject,
                    _ => return Err(invalid(&value)),
                };
            }
            "resync-on-change" => {
                self.resync_on_change = value.parse().map_err(|_| invalid(&value))?;
            }
            "baseline-id" => self.baseline.id = value,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// All displayable key/value pairs, in a stable order
    pub fn values_iter(&self) -> Vec<(&'static str, String)> {
        const KEYS: &[&str] = &[
            "module-dir",
            "manifest-path",
            "sentinel-path",
            "module-extension",
            "import-prefix",
            "fps",
            "width",
            "height",
            "poll-interval-ms",
            "on-conflict",
            "resync-on-change",
            "baseline-id",
        ];
        KEYS.iter()
            .filter_map(|key| self.get(key).map(|value| (*key, value)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.fps, 30);
        assert_eq!(config.module_extension, "tsx");
        assert_eq!(config.baseline.id, "Baseline");
        assert_eq!(config.on_conflict, ConflictPolicy::Rename);
        assert_eq!(config.poll_interval(), Duration::from_millis(2000));
    }

    #[test]
    fn test_config_set_get() {
        let mut config = Config::default();
        assert!(config.set("fps", "60".to_string()).is_ok());
        assert_eq!(config.get("fps"), Some("60".to_string()));

        assert!(config.set("on-conflict", "reject".to_string()).is_ok());
        assert_eq!(config.on_conflict, ConflictPolicy::Reject);
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let mut config = Config::default();
        assert!(matches!(
            config.set("fps", "fast".to_string()),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config.set("unknown-key", "value".to_string()),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let Ok(temp_dir) = tempfile::TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        assert!(fs::write(&path, "fps = 24\n\n[baseline]\nid = \"Intro\"\n").is_ok());

        let loaded = Config::load_from_path(&path);
        assert!(loaded.is_ok_and(|config| config.fps == 24
            && config.baseline.id == "Intro"
            && config.baseline.duration_frames == 150
            && config.module_dir == "src/animations"));
    }

    #[test]
    fn test_save_and_reload() {
        let Ok(temp_dir) = tempfile::TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = Config::default();
        assert!(config.set("module-dir", "anims".to_string()).is_ok());
        assert!(config.save_to_path(&path).is_ok());

        let loaded = Config::load_from_path(&path);
        assert!(loaded.is_ok_and(|reloaded| reloaded == config));
    }
}
