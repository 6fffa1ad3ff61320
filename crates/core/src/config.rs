//! Configuration management for IAMSage.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.iamsage/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Every setting is fixed once the process starts; nothing here is adjustable
//! while serving.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// LLM providers the factory knows how to build.
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["gemini", "ollama"];

/// Embedding providers the factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: &[&str] = &["ollama", "hash"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workspace root; relative data paths resolve against it
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Directory holding the raw `.md` / `.txt` corpus
    pub raw_data_dir: PathBuf,

    /// Directory holding the built index artifacts
    pub processed_dir: PathBuf,

    /// Chunking policy
    pub chunking: ChunkingConfig,

    /// Embedding model settings
    pub embedding: EmbeddingSettings,

    /// Retrieval defaults
    pub retrieval: RetrievalConfig,

    /// Answer generation settings
    pub llm: LlmSettings,

    /// Explicit API key override (`IAMSAGE_API_KEY`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit JSON log lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Chunking policy, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 50,
        }
    }
}

/// Embedding model settings shared by build and serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "hash"
    pub provider: String,

    /// Model identifier, persisted next to the index
    pub model: String,

    /// Expected vector dimension
    pub dimensions: usize,

    /// Provider endpoint (Ollama base URL)
    pub endpoint: String,

    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: "http://localhost:11434".to_string(),
            batch_size: 64,
        }
    }
}

/// Retrieval defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 4 }
    }
}

/// Hosted LLM settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Provider name: "gemini" or "ollama"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Environment variable holding the credential
    pub api_key_env: String,

    /// Custom endpoint (provider default when unset)
    pub endpoint: Option<String>,

    /// HTTP timeout; the client default applies when unset
    pub timeout_secs: Option<u64>,

    /// Prompt definition used for answers
    pub prompt_id: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-pro".to_string(),
            temperature: 0.2,
            max_tokens: 1024,
            api_key_env: "GOOGLE_API_KEY".to_string(),
            endpoint: None,
            timeout_secs: None,
            prompt_id: "iam.answer".to_string(),
        }
    }
}

impl LlmSettings {
    /// Whether the provider needs a credential to run.
    pub fn requires_api_key(&self) -> bool {
        self.provider.eq_ignore_ascii_case("gemini")
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    data: Option<DataSection>,
    chunking: Option<ChunkingSection>,
    embedding: Option<EmbeddingSection>,
    retrieval: Option<RetrievalSection>,
    llm: Option<LlmSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataSection {
    raw_dir: Option<PathBuf>,
    processed_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChunkingSection {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
    batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalSection {
    top_k: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    api_key_env: Option<String>,
    endpoint: Option<String>,
    timeout: Option<u64>,
    prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub workspace: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub log_level: Option<String>,
    pub log_json: bool,
    pub verbose: bool,
    pub no_color: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            raw_data_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmSettings::default(),
            api_key: None,
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment and defaults.
    ///
    /// Environment variables:
    /// - `IAMSAGE_WORKSPACE`: Override workspace path
    /// - `IAMSAGE_CONFIG`: Path to config file
    /// - `IAMSAGE_RAW_DIR` / `IAMSAGE_PROCESSED_DIR`: Data directories
    /// - `IAMSAGE_EMBEDDING_PROVIDER` / `IAMSAGE_EMBEDDING_MODEL`: Embedder
    /// - `OLLAMA_URL`: Embedding endpoint
    /// - `IAMSAGE_PROVIDER` / `IAMSAGE_MODEL`: Answer LLM
    /// - `IAMSAGE_API_KEY`: Explicit credential
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use iamsage_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Corpus: {:?}", config.raw_data_path());
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load configuration using a custom environment lookup.
    pub fn load_with<F>(env: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workspace) = env("IAMSAGE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Some(config_file) = env("IAMSAGE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.workspace.join(".iamsage/config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Some(dir) = env("IAMSAGE_RAW_DIR") {
            config.raw_data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env("IAMSAGE_PROCESSED_DIR") {
            config.processed_dir = PathBuf::from(dir);
        }
        if let Some(provider) = env("IAMSAGE_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Some(model) = env("IAMSAGE_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(url) = env("OLLAMA_URL") {
            config.embedding.endpoint = url;
        }
        if let Some(provider) = env("IAMSAGE_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(model) = env("IAMSAGE_MODEL") {
            config.llm.model = model;
        }

        config.api_key = env("IAMSAGE_API_KEY").filter(|k| !k.trim().is_empty());

        if let Some(level) = env("RUST_LOG") {
            config.log_level = Some(level);
        }

        if env("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(data) = config_file.data {
            if let Some(raw) = data.raw_dir {
                result.raw_data_dir = raw;
            }
            if let Some(processed) = data.processed_dir {
                result.processed_dir = processed;
            }
        }

        if let Some(chunking) = config_file.chunking {
            if let Some(size) = chunking.chunk_size {
                result.chunking.chunk_size = size;
            }
            if let Some(overlap) = chunking.chunk_overlap {
                result.chunking.chunk_overlap = overlap;
            }
        }

        if let Some(embedding) = config_file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
            if let Some(endpoint) = embedding.endpoint {
                result.embedding.endpoint = endpoint;
            }
            if let Some(batch_size) = embedding.batch_size {
                result.embedding.batch_size = batch_size;
            }
        }

        if let Some(top_k) = config_file.retrieval.and_then(|r| r.top_k) {
            result.retrieval.top_k = top_k;
        }

        if let Some(llm) = config_file.llm {
            if let Some(provider) = llm.provider {
                result.llm.provider = provider;
            }
            if let Some(model) = llm.model {
                result.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                result.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                result.llm.max_tokens = max_tokens;
            }
            if let Some(api_key_env) = llm.api_key_env {
                result.llm.api_key_env = api_key_env;
            }
            if llm.endpoint.is_some() {
                result.llm.endpoint = llm.endpoint;
            }
            if llm.timeout.is_some() {
                result.llm.timeout_secs = llm.timeout;
            }
            if let Some(prompt) = llm.prompt {
                result.llm.prompt_id = prompt;
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_json = format.eq_ignore_ascii_case("json");
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and
    /// the config file.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = overrides.config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = overrides.provider {
            self.llm.provider = provider;
        }

        if let Some(model) = overrides.model {
            self.llm.model = model;
        }

        if let Some(log_level) = overrides.log_level {
            self.log_level = Some(log_level);
        }

        if overrides.log_json {
            self.log_json = true;
        }

        if overrides.verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if overrides.no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the `.iamsage` directory.
    pub fn iamsage_dir(&self) -> PathBuf {
        self.workspace.join(".iamsage")
    }

    /// Resolved corpus directory.
    pub fn raw_data_path(&self) -> PathBuf {
        self.resolve(&self.raw_data_dir)
    }

    /// Resolved artifact directory.
    pub fn processed_path(&self) -> PathBuf {
        self.resolve(&self.processed_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Resolve the LLM credential from the process environment.
    pub fn resolve_api_key(&self) -> AppResult<Option<String>> {
        self.resolve_api_key_with(|key| std::env::var(key).ok())
    }

    /// Resolve the LLM credential using a custom environment lookup.
    ///
    /// Returns `Ok(None)` for providers that need no credential and a
    /// configuration error when a required credential is absent.
    pub fn resolve_api_key_with<F>(&self, env: F) -> AppResult<Option<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref key) = self.api_key {
            return Ok(Some(key.clone()));
        }

        if !self.llm.requires_api_key() {
            return Ok(None);
        }

        match env(&self.llm.api_key_env).filter(|k| !k.trim().is_empty()) {
            Some(key) => Ok(Some(key)),
            None => Err(AppError::Config(format!(
                "{} not found. Set it in the environment before asking questions (provider: {}).",
                self.llm.api_key_env, self.llm.provider
            ))),
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.llm.provider.to_lowercase();
        if !KNOWN_LLM_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        let embedding_provider = self.embedding.provider.to_lowercase();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.model.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding model identifier must not be empty".to_string(),
            ));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be positive".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be positive".to_string(),
            ));
        }

        if self.chunking.chunk_size == 0 {
            return Err(AppError::Config("Chunk size must be positive".to_string()));
        }

        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AppError::Config(format!(
                "Chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }

        if self.retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be positive".to_string()));
        }

        validate_temperature(self.llm.temperature)
    }
}

/// Sampling temperature accepted by both providers.
pub fn validate_temperature(temperature: f32) -> AppResult<()> {
    if !(0.0..=2.0).contains(&temperature) {
        return Err(AppError::Config(format!(
            "Temperature must be between 0.0 and 2.0, got {}",
            temperature
        )));
    }
    Ok(())
}
