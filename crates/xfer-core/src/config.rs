//! Configuration for xfer tools.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $XFER_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/xfer/config.toml
//!   3. ~/.config/xfer/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::digest::DigestAlgorithm;
use crate::framer::DEFAULT_CHUNK_SIZE;
use crate::session::DEFAULT_MAX_CHUNKS;
use crate::wire::MAX_SEQUENCE;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct XferConfig {
    pub framer: FramerConfig,
    pub digest: DigestConfig,
    pub receiver: ReceiverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramerConfig {
    /// Raw bytes per data chunk, before base64.
    pub chunk_size: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    /// "sha1" (compatible with existing senders) or "blake3".
    pub algorithm: DigestAlgorithm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Where reconstructed buffers are written.
    pub output_dir: PathBuf,
    /// Largest chunk count a transfer header may declare.
    pub max_chunks: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            output_dir: data_dir().join("received"),
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("xfer")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("xfer")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl XferConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            XferConfig::default()
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        let config: XferConfig =
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("XFER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = XferConfig::default().to_toml()?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.framer.chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "framer.chunk_size",
                "must be at least 1".into(),
            ));
        }
        if self.receiver.max_chunks == 0 || self.receiver.max_chunks > MAX_SEQUENCE + 1 {
            return Err(ConfigError::InvalidValue(
                "receiver.max_chunks",
                format!("must be between 1 and {}", MAX_SEQUENCE + 1),
            ));
        }
        Ok(())
    }

    /// Apply XFER_* overrides, reading variables through `lookup`.
    fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("XFER_FRAMER__CHUNK_SIZE") {
            self.framer.chunk_size = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue("XFER_FRAMER__CHUNK_SIZE", v.clone()))?;
        }
        if let Some(v) = lookup("XFER_DIGEST__ALGORITHM") {
            self.digest.algorithm = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue("XFER_DIGEST__ALGORITHM", v.clone()))?;
        }
        if let Some(v) = lookup("XFER_RECEIVER__OUTPUT_DIR") {
            self.receiver.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("XFER_RECEIVER__MAX_CHUNKS") {
            self.receiver.max_chunks = v
                .parse()
                .map_err(|_| ConfigError::InvalidValue("XFER_RECEIVER__MAX_CHUNKS", v.clone()))?;
        }
        self.validate()?;
        Ok(self)
    }
}
