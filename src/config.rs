//! Environment Configuration
//!
//! Reads `.env` and process environment into a single typed config.
//! Both the index builder and the search tools resolve paths through here.

use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_COLLECTION: &str = "ipc_collection";
pub const DEFAULT_REPORT_DIR: &str = "reports";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set in .env file.")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Which backend answers LLM calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAICompatible,
}

/// Which embedder builds the statute index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    FastEmbed,
    Hashing,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ipc_json_path: Option<PathBuf>,
    pub persist_directory: Option<PathBuf>,
    pub collection_name: String,
    pub tavily_api_key: Option<String>,
    pub provider: ProviderKind,
    pub ollama_host: String,
    pub ollama_port: u16,
    pub openai_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    /// Overrides every role's default model when set
    pub model_override: Option<String>,
    pub embedder: EmbedderKind,
    pub report_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ipc_json_path: None,
            persist_directory: None,
            collection_name: DEFAULT_COLLECTION.to_string(),
            tavily_api_key: None,
            provider: ProviderKind::Ollama,
            ollama_host: "http://localhost".to_string(),
            ollama_port: 11434,
            openai_base_url: None,
            openai_api_key: None,
            model_override: None,
            embedder: EmbedderKind::FastEmbed,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let provider = match get("LLM_PROVIDER").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("ollama") => ProviderKind::Ollama,
            Some("openai") | Some("openai-compatible") => ProviderKind::OpenAICompatible,
            Some(other) => {
                return Err(ConfigError::Invalid { var: "LLM_PROVIDER", value: other.to_string() })
            }
        };

        let embedder = match get("EMBEDDER").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("fastembed") => EmbedderKind::FastEmbed,
            Some("hashing") => EmbedderKind::Hashing,
            Some(other) => {
                return Err(ConfigError::Invalid { var: "EMBEDDER", value: other.to_string() })
            }
        };

        let ollama_port = match get("OLLAMA_PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "OLLAMA_PORT", value: p.clone() })?,
            None => defaults.ollama_port,
        };

        Ok(Self {
            ipc_json_path: get("IPC_JSON_PATH").map(PathBuf::from),
            persist_directory: get("PERSIST_DIRECTORY")
                .or_else(|| get("PERSIST_DIRECTORY_PATH"))
                .map(PathBuf::from),
            collection_name: get("COLLECTION_NAME")
                .or_else(|| get("IPC_COLLECTION_NAME"))
                .unwrap_or(defaults.collection_name),
            tavily_api_key: get("TAVILY_API_KEY"),
            provider,
            ollama_host: get("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            ollama_port,
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_api_key: get("OPENAI_API_KEY"),
            model_override: get("LEGAL_MODEL"),
            embedder,
            report_dir: get("REPORT_DIR").map(PathBuf::from).unwrap_or(defaults.report_dir),
        })
    }

    pub fn require_ipc_json_path(&self) -> Result<&PathBuf, ConfigError> {
        self.ipc_json_path.as_ref().ok_or(ConfigError::Missing("IPC_JSON_PATH"))
    }

    pub fn require_persist_directory(&self) -> Result<&PathBuf, ConfigError> {
        self.persist_directory.as_ref().ok_or(ConfigError::Missing("PERSIST_DIRECTORY"))
    }
}
