use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quality::{
    AnalyzerConfig, DEFAULT_DECODE_TIMEOUT, DEFAULT_DECODE_WORKERS, DEFAULT_MAX_INPUT_BYTES,
};
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MIN_PASSING_SCORE: u32 = 70;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub max_upload_bytes: u64,
    pub decode_timeout_secs: u64,
    pub max_decode_workers: usize,
    pub min_passing_score: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_INPUT_BYTES,
            decode_timeout_secs: DEFAULT_DECODE_TIMEOUT.as_secs(),
            max_decode_workers: DEFAULT_DECODE_WORKERS,
            min_passing_score: DEFAULT_MIN_PASSING_SCORE,
        }
    }
}

impl ServerConfig {
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            max_input_bytes: self.max_upload_bytes,
            decode_timeout: Duration::from_secs(self.decode_timeout_secs),
            max_decode_workers: self.max_decode_workers,
        }
    }

    fn normalize(&mut self) {
        if self.port == 0 {
            self.port = DEFAULT_PORT;
        }
        if self.max_upload_bytes == 0 {
            self.max_upload_bytes = DEFAULT_MAX_INPUT_BYTES;
        }
        if self.decode_timeout_secs == 0 {
            self.decode_timeout_secs = DEFAULT_DECODE_TIMEOUT.as_secs();
        }
        if self.max_decode_workers == 0 {
            self.max_decode_workers = DEFAULT_DECODE_WORKERS;
        }
        if self.min_passing_score > 100 {
            self.min_passing_score = 100;
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("TRACKGATE_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("config.yaml"))
            .unwrap_or_else(|| PathBuf::from("config.yaml")),
        Err(_) => PathBuf::from("config.yaml"),
    }
}

pub fn parse_config(contents: &str) -> Result<ServerConfig, ConfigError> {
    let mut config: ServerConfig = serde_yaml::from_str(contents)?;
    config.normalize();
    Ok(config)
}

pub fn load_or_create_config(path: &Path) -> Result<(ServerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        return Ok((parse_config(&contents)?, false));
    }

    let config = ServerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &ServerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}
