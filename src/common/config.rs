use crate::common::error::{MaskLensError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CameraConfig {
    /// Special value 999 means auto-detect
    #[serde(default = "default_device_index")]
    pub device_index: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_ms: u64,
}

fn default_device_index() -> u32 { 999 }
fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_warmup_frames() -> u32 { 5 }
fn default_warmup_delay() -> u64 { 50 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: default_device_index(),
            width: default_width(),
            height: default_height(),
            warmup_frames: default_warmup_frames(),
            warmup_delay_ms: default_warmup_delay(),
        }
    }
}

impl Config {
    /// Load the config file if it exists, otherwise fall back to defaults
    /// so a fresh checkout works against a local server.
    pub fn load_or_default() -> Result<Self> {
        let config_path = Path::new("configs/masklens.toml");
        if config_path.exists() {
            Self::load_from_path(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MaskLensError::Other(anyhow::anyhow!(
                "Config file not found: {}",
                path.display()
            )));
        }

        tracing::debug!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| MaskLensError::Other(anyhow::anyhow!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.width > 4096 {
            return Err(MaskLensError::Other(anyhow::anyhow!(
                "Camera width must be between 1 and 4096, got {}",
                self.camera.width
            )));
        }
        if self.camera.height == 0 || self.camera.height > 4096 {
            return Err(MaskLensError::Other(anyhow::anyhow!(
                "Camera height must be between 1 and 4096, got {}",
                self.camera.height
            )));
        }

        if self.server.timeout_seconds < 1 || self.server.timeout_seconds > 300 {
            return Err(MaskLensError::Other(anyhow::anyhow!(
                "Server timeout must be between 1 and 300 seconds, got {}",
                self.server.timeout_seconds
            )));
        }

        if !self.server.base_url.starts_with("http://") && !self.server.base_url.starts_with("https://") {
            return Err(MaskLensError::Other(anyhow::anyhow!(
                "Server base_url must start with http:// or https://, got {}",
                self.server.base_url
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert_eq!(config.camera.device_index, 999);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            base_url = "https://masklens.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "https://masklens.example.com");
        assert_eq!(config.server.timeout_seconds, 30);
        assert_eq!(config.camera.width, 640);
    }

    #[test]
    fn rejects_bad_base_url() {
        let mut config = Config::default();
        config.server.base_url = "localhost:5000".to_string();
        assert!(config.validate().is_err());
    }
}
