use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_format() -> String {
    "text".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Overridden by the `GEMINI_API_KEY` env var
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted `POST /upload-analyze` body, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_mb() -> usize {
    200
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("meterbill").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !["text", "json"].contains(&self.settings.default_format.as_str()) {
            issues.push(format!(
                "Invalid default_format: '{}' (must be 'text' or 'json')",
                self.settings.default_format
            ));
        }
        if !["auto", "always", "never"].contains(&self.settings.color.as_str()) {
            issues.push(format!(
                "Invalid color: '{}' (must be 'auto', 'always', or 'never')",
                self.settings.color
            ));
        }
        // The API key travels in a header, so plain HTTP would leak it.
        if !self.vision.endpoint.starts_with("https://") {
            issues.push(format!(
                "vision.endpoint must use HTTPS, got: {}",
                self.vision.endpoint
            ));
        }
        if self.vision.model.trim().is_empty() {
            issues.push("vision.model must not be empty".to_string());
        }
        if self.vision.timeout_secs == 0 {
            issues.push("vision.timeout_secs must be greater than 0".to_string());
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            issues.push(format!(
                "Invalid server.bind: '{}' (expected host:port)",
                self.server.bind
            ));
        }
        if self.server.max_upload_mb == 0 {
            issues.push("server.max_upload_mb must be greater than 0".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let config = AppConfig::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Default config should be valid, got: {:?}", issues);
    }

    #[test]
    fn default_format_is_text() {
        let settings = Settings::default();
        assert_eq!(settings.default_format, "text");
    }

    #[test]
    fn default_vision_targets_flash() {
        let vision = VisionConfig::default();
        assert_eq!(vision.model, "gemini-1.5-flash");
        assert!(vision.endpoint.starts_with("https://generativelanguage.googleapis.com"));
        assert!(vision.api_key.is_none());
    }

    #[test]
    fn validate_catches_invalid_format() {
        let mut config = AppConfig::default();
        config.settings.default_format = "xml".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("default_format")));
    }

    #[test]
    fn validate_catches_invalid_color() {
        let mut config = AppConfig::default();
        config.settings.color = "blue".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("color")));
    }

    #[test]
    fn validate_catches_plain_http_endpoint() {
        let mut config = AppConfig::default();
        config.vision.endpoint = "http://evil.com".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("must use HTTPS")));
    }

    #[test]
    fn validate_catches_empty_model_and_zero_timeout() {
        let mut config = AppConfig::default();
        config.vision.model = "  ".to_string();
        config.vision.timeout_secs = 0;
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn validate_catches_bad_bind() {
        let mut config = AppConfig::default();
        config.server.bind = "localhost".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("server.bind")));
    }

    #[test]
    fn upload_limit_defaults_to_200_mb() {
        let server = ServerConfig::default();
        assert_eq!(server.max_upload_mb, 200);
        assert_eq!(server.max_upload_bytes(), 200 * 1024 * 1024);

        let config: AppConfig = toml::from_str("[server]\nmax_upload_mb = 0\n").unwrap();
        assert!(config.validate().iter().any(|i| i.contains("max_upload_mb")));
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[settings]
default_format = "json"
color = "always"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.default_format, "json");
        assert_eq!(config.settings.color, "always");
        assert_eq!(config.server.bind, "127.0.0.1:8000");
    }

    #[test]
    fn parse_vision_toml() {
        let toml = r#"
[vision]
model = "gemini-2.0-flash"
api_key = "abc"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.vision.model, "gemini-2.0-flash");
        assert_eq!(config.vision.api_key.as_deref(), Some("abc"));
        assert_eq!(config.vision.timeout_secs, 60);
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.settings.default_format, "text");
        assert_eq!(config.settings.color, "auto");
        assert_eq!(config.vision.model, "gemini-1.5-flash");
    }

    #[test]
    fn api_key_is_omitted_when_unset() {
        let out = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(!out.contains("api_key"));
        assert!(out.contains("[vision]"));
    }

    #[test]
    fn config_path_uses_xdg_when_set() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test_xdg_config");
        let path = AppConfig::config_path();
        std::env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(path, PathBuf::from("/tmp/test_xdg_config/meterbill/config.toml"));
    }
}
