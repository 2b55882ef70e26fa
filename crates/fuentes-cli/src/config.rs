//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for fuentes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the retrieval backend
    pub backend_url: Option<String>,
    /// Collections searched when none are given on the command line
    pub collections: Vec<String>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Color theme (dark, light)
    pub theme: Option<String>,
    /// Text shown in place of an answer when a query fails
    pub error_message: Option<String>,
    /// Connect timeout for backend requests, in seconds
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fuentes")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("FUENTES_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Parse config file content
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            backend_url: Some(fuentes_stream::DEFAULT_BASE_URL.to_string()),
            collections: Vec::new(),
            tui: Some(true),
            theme: Some("dark".to_string()),
            error_message: Some(fuentes_chat::DEFAULT_ERROR_MESSAGE.to_string()),
            request_timeout_secs: Some(10),
        };

        default_config.save()?;
        Ok(path)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# fuentes configuration file
# Place at ~/.config/fuentes/config.toml (Linux/Mac) or %APPDATA%\fuentes\config.toml (Windows)

# Base URL of the retrieval backend
backend_url = "http://localhost:8000"

# Collections to search by default (override with -C/--collection)
collections = ["leyes", "normativa"]

# Whether to use TUI mode by default (true by default)
# Set to false for simple stdin/stdout mode
tui = true

# Color theme (dark, light)
theme = "dark"

# Text shown in place of an answer when a query fails
error_message = "Error al procesar la consulta"

# Connect timeout for backend requests, in seconds
request_timeout_secs = 10
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let cfg = Config::parse(example_config()).unwrap();
        assert_eq!(cfg.backend_url.as_deref(), Some("http://localhost:8000"));
        assert_eq!(cfg.collections, vec!["leyes", "normativa"]);
        assert_eq!(cfg.tui, Some(true));
        assert_eq!(cfg.request_timeout_secs, Some(10));
    }

    #[test]
    fn test_missing_fields_default() {
        let cfg = Config::parse("tui = false\n").unwrap();
        assert_eq!(cfg.tui, Some(false));
        assert!(cfg.collections.is_empty());
        assert!(cfg.backend_url.is_none());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let cfg = Config {
            backend_url: Some("http://rag:9000".into()),
            collections: vec!["a".into()],
            ..Config::default()
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(Config::parse(&text).unwrap(), cfg);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::parse("collections = leyes").is_err());
    }
}
