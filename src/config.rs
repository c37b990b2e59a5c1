use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/api";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the station backend, e.g. `http://127.0.0.1:5000/api`.
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read config: {path:?}")),
        };
        let text = String::from_utf8_lossy(&bytes);
        toml::from_str(&text).with_context(|| format!("Invalid config TOML: {path:?}"))
    }
}

fn config_path() -> Result<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
        })
        .context("Could not determine XDG config directory")?;
    Ok(base.join("radiodial").join("config.toml"))
}

/// Log destination. The terminal belongs to the UI, so logs go to a file.
pub fn log_path() -> Result<PathBuf> {
    let base = std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("state"))
        })
        .context("Could not determine XDG state directory")?;
    let dir = base.join("radiodial");
    fs::create_dir_all(&dir).with_context(|| format!("Create state dir: {dir:?}"))?;
    Ok(dir.join("radiodial.log"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn api_base_override() {
        let cfg: AppConfig = toml::from_str(r#"api_base = "http://radio.local/api""#).unwrap();
        assert_eq!(cfg.api_base, "http://radio.local/api");
    }
}
