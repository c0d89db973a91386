use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::launch::LaunchConfig;
use crate::logging::LogFormat;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub services: BTreeMap<String, ServiceConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

/// A named service: how to start it and, optionally, how to stop it.
///
/// Without a `stop` command the service is stopped by signaling the pid
/// recorded in the start command's pid file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub start: LaunchConfig,
    pub stop: Option<LaunchConfig>,
}

impl Config {
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.get(name)
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("svcproc").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}
