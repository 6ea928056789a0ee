#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Connection settings for the Ollama embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
    /// Inputs longer than this are truncated at a char boundary before the
    /// embed request is sent. Roughly 4 chars per token against the model's
    /// 2048-token budget.
    pub max_input_chars: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            max_input_chars: 8000,
        }
    }
}

/// Settings for the answer-generation backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    /// Best retrieval score below which no answer is generated.
    pub min_score: f32,
    pub timeout_seconds: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "llama3.1:latest".to_string(),
            min_score: 0.22,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid max input length: {0} (must be at least 256 chars)")]
    InvalidMaxInputChars(usize),
    #[error("Invalid minimum score: {0} (must be between 0 and 1)")]
    InvalidMinScore(f32),
    #[error("Invalid generation timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidGenerationTimeout(u64),
    #[error("Invalid max chunk size: {0} (must be between 200 and 8000 chars)")]
    InvalidMaxChunkChars(usize),
    #[error("Invalid min chunk size: {0} (must be between 50 and 4000 chars)")]
    InvalidMinChunkChars(usize),
    #[error("Max chunk size ({0}) must be greater than min chunk size ({1})")]
    MaxChunkTooSmall(usize, usize),
    #[error("Overlap ({0}) must be smaller than min chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from the default application directory.
    #[inline]
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_base_dir()?)
    }

    #[inline]
    pub fn load_from<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                ollama: OllamaConfig::default(),
                generation: GenerationConfig::default(),
                chunking: ChunkingConfig::default(),
                base_dir: base_dir.as_ref().to_path_buf(),
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = base_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.base_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn default_base_dir() -> Result<PathBuf> {
        let dir = dirs::data_local_dir()
            .ok_or(ConfigError::DirectoryError)?
            .join("scheme-advisor");
        Ok(dir)
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.generation.validate()?;
        self.validate_chunking_config()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(200..=8000).contains(&config.max_chars) {
            return Err(ConfigError::InvalidMaxChunkChars(config.max_chars));
        }

        if !(50..=4000).contains(&config.min_chars) {
            return Err(ConfigError::InvalidMinChunkChars(config.min_chars));
        }

        if config.max_chars <= config.min_chars {
            return Err(ConfigError::MaxChunkTooSmall(
                config.max_chars,
                config.min_chars,
            ));
        }

        // The chunk cursor must always advance past the previous overlap.
        if config.overlap_chars >= config.min_chars {
            return Err(ConfigError::OverlapTooLarge(
                config.overlap_chars,
                config.min_chars,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.base_dir.join("config.toml")
    }

    /// Path of the SQLite metadata store.
    #[inline]
    pub fn database_path(&self) -> PathBuf {
        self.base_dir.join("metadata.db")
    }

    /// Path of the LanceDB vector index directory.
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.base_dir.join("vectors")
    }

    /// Directory scanned for source PDFs at build time.
    #[inline]
    pub fn corpus_dir_path(&self) -> PathBuf {
        self.base_dir.join("corpus")
    }

    /// Path of the scheme link registry JSON.
    #[inline]
    pub fn registry_path(&self) -> PathBuf {
        self.base_dir.join("scheme_links.json")
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if self.max_input_chars < 256 {
            return Err(ConfigError::InvalidMaxInputChars(self.max_input_chars));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(ConfigError::InvalidMinScore(self.min_score));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 600 {
            return Err(ConfigError::InvalidGenerationTimeout(self.timeout_seconds));
        }

        Ok(())
    }
}
