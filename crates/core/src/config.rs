//! Configuration management for Syllabus.
//!
//! Configuration is merged from, in increasing precedence:
//! - Built-in defaults
//! - The config file (`.syllabus/config.yaml` or `SYLLABUS_CONFIG`)
//! - Environment variables
//! - Command-line flags
//!
//! Retrieval limits (chunk size, overlap, result count, history depth) live in
//! [`RagConfig`] and are handed explicitly to each component constructor.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .syllabus/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Generation provider ("claude" or "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmConfig>,

    /// Retrieval and orchestration limits
    pub rag: RagConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderConfig {
    Claude {
        #[serde(rename = "apiKeyEnv")]
        api_key_env: String,
        model: String,
        endpoint: Option<String>,
        #[serde(rename = "apiVersion")]
        api_version: Option<String>,
    },
    Ollama {
        endpoint: String,
        model: String,
        timeout: Option<u64>,
    },
}

impl ProviderConfig {
    /// Custom endpoint, if one is configured.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Claude { endpoint, .. } => endpoint.as_deref(),
            Self::Ollama { endpoint, .. } => Some(endpoint.as_str()),
        }
    }
}

/// Limits for parsing, chunking, retrieval, generation and session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagConfig {
    /// Maximum characters per chunk body
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters repeated from the end of one chunk at the start of the next
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks returned by a content search
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Number of (user, assistant) turns kept per session
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Hits below this cosine similarity are dropped by the store
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Embedding vector dimension
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Maximum tokens the backend may generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature for generation
    #[serde(default)]
    pub temperature: f32,

    /// Index location, relative to `.syllabus/` unless absolute
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

fn default_chunk_size() -> usize {
    800
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_max_results() -> usize {
    5
}

fn default_max_history() -> usize {
    2
}

fn default_min_similarity() -> f32 {
    0.20
}

fn default_embedding_dim() -> usize {
    384
}

fn default_max_tokens() -> u32 {
    800
}

fn default_index_path() -> PathBuf {
    PathBuf::from("index.sqlite")
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_results: default_max_results(),
            max_history: default_max_history(),
            min_similarity: default_min_similarity(),
            embedding_dim: default_embedding_dim(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            index_path: default_index_path(),
        }
    }
}

impl RagConfig {
    /// Check that the limits are usable.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("rag.chunkSize must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "rag.chunkOverlap ({}) must be smaller than rag.chunkSize ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_results == 0 {
            return Err(AppError::Config("rag.maxResults must be positive".to_string()));
        }
        if self.embedding_dim == 0 {
            return Err(AppError::Config("rag.embeddingDim must be positive".to_string()));
        }
        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    rag: Option<RagConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(),
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            llm: None,
            rag: RagConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `SYLLABUS_WORKSPACE`: Override workspace path
    /// - `SYLLABUS_CONFIG`: Path to config file
    /// - `SYLLABUS_PROVIDER`: Generation provider
    /// - `SYLLABUS_MODEL`: Model identifier
    /// - `SYLLABUS_API_KEY`: API key
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("SYLLABUS_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("SYLLABUS_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.syllabus_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(provider) = std::env::var("SYLLABUS_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("SYLLABUS_MODEL") {
            config.model = model;
        }

        config.api_key = std::env::var("SYLLABUS_API_KEY").ok();
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
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
                result.log_format = format;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = match provider_config {
                    ProviderConfig::Claude { model, .. } => model.clone(),
                    ProviderConfig::Ollama { model, .. } => model.clone(),
                };
            }

            result.llm = Some(llm);
        }

        if let Some(rag) = config_file.rag {
            result.rag = rag;
        }

        Ok(result)
    }

    /// Apply CLI overrides; flags win over environment and file values.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .syllabus directory.
    pub fn syllabus_dir(&self) -> PathBuf {
        self.workspace.join(".syllabus")
    }

    /// Ensure the .syllabus directory exists.
    pub fn ensure_syllabus_dir(&self) -> AppResult<()> {
        let dir = self.syllabus_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .syllabus directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolved location of the similarity index.
    pub fn index_path(&self) -> PathBuf {
        if self.rag.index_path.is_absolute() {
            self.rag.index_path.clone()
        } else {
            self.syllabus_dir().join(&self.rag.index_path)
        }
    }

    /// Get a provider configuration by name.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key: explicit key first, then the provider's env var.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        match self.get_provider_config(provider) {
            Some(ProviderConfig::Claude { api_key_env, .. }) => std::env::var(&api_key_env).ok(),
            _ => None,
        }
    }

    /// Validate configuration for the active provider and the retrieval limits.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();
        let known_providers = ["claude", "anthropic", "ollama"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                known_providers.join(", ")
            )));
        }

        if let Some(ProviderConfig::Claude { api_key_env, .. }) =
            self.get_provider_config(&self.provider)
        {
            if self.api_key.is_none() && std::env::var(&api_key_env).is_err() {
                return Err(AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    api_key_env
                )));
            }
        }

        self.rag.validate()
    }
}
