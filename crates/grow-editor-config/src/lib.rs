use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Editor settings. Every option is optional; unset ones fall back to the
/// engine's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autosave: Option<bool>,
    /// Milliseconds between autosave ticks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autosave_interval: Option<u64>,
    /// Document opened at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut settings: Settings =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the log file path
        settings.log_file = settings
            .log_file
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(settings))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/grow-editor");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Log file to use, falling back to one beside the config file.
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            Self::config_path().with_file_name("grow-editor.log")
        })
    }

    /// The set options as editor overrides.
    pub fn overrides(&self) -> Map<String, Value> {
        let mut overrides = Map::new();
        if let Some(host) = &self.host {
            overrides.insert("host".to_string(), Value::from(host.as_str()));
        }
        if let Some(port) = self.port {
            overrides.insert("port".to_string(), Value::from(port));
        }
        if let Some(base) = &self.base {
            overrides.insert("base".to_string(), Value::from(base.as_str()));
        }
        if let Some(autosave) = self.autosave {
            overrides.insert("autosave".to_string(), Value::from(autosave));
        }
        if let Some(interval) = self.autosave_interval {
            overrides.insert("autosave_interval".to_string(), Value::from(interval));
        }
        overrides
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Settings::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/grow-editor/config.toml"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Settings::expand_path(&PathBuf::from("~/logs/editor.log")).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("logs/editor.log"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("GROW_EDITOR_TEST_LOGS", "/var/log/grow");
        }

        let expanded = Settings::expand_path(&PathBuf::from("$GROW_EDITOR_TEST_LOGS/editor.log"));
        assert_eq!(expanded, Some(PathBuf::from("/var/log/grow/editor.log")));

        unsafe {
            env::remove_var("GROW_EDITOR_TEST_LOGS");
        }
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/editor.log");

        assert_eq!(Settings::expand_path(&path), Some(path));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Settings::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let settings = Settings {
            host: Some("preview.local".to_string()),
            port: Some(9000),
            autosave: Some(true),
            pod_path: Some("/content/pages/home.yaml".to_string()),
            log_file: Some(PathBuf::from("/tmp/grow-editor.log")),
            ..Settings::default()
        };

        settings.save_to_path(&config_file).unwrap();
        let loaded = Settings::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_unset_options_are_not_written() {
        let content = toml::to_string_pretty(&Settings {
            port: Some(8081),
            ..Settings::default()
        })
        .unwrap();

        assert_eq!(content.trim(), "port = 8081");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "port = \"not a number\"").unwrap();

        let err = Settings::load_from_path(&config_file).unwrap_err();

        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_log_file_with_tilde_is_expanded() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "log_file = \"~/grow/editor.log\"\n").unwrap();

        let settings = Settings::load_from_path(&config_file).unwrap().unwrap();
        let log_file = settings.log_path();

        assert!(!log_file.to_string_lossy().starts_with('~'));
        assert!(log_file.ends_with("grow/editor.log"));
    }

    #[test]
    fn test_overrides_include_only_set_options() {
        let settings: Settings = toml::from_str(
            r#"
host = "0.0.0.0"
autosave_interval = 2500
pod_path = "/content/pages/about.yaml"
"#,
        )
        .unwrap();

        let overrides = settings.overrides();

        assert_eq!(
            Value::Object(overrides),
            serde_json::json!({"host": "0.0.0.0", "autosave_interval": 2500})
        );
    }
}
