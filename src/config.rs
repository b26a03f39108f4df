//! Run configuration for graphlens
//!
//! Settings come from built-in defaults, an optional `graphlens.toml`, and
//! finally command-line flags and environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the optional config file inside the cache directory
pub const CONFIG_FILE_NAME: &str = "graphlens.toml";

/// Tunables that are rarely changed from the command line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// LLM endpoint configuration
    #[serde(default)]
    pub llm: LlmSettings,

    /// Content fetching
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Pipeline pacing and limits
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model name to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens for response
    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Language the summary should be written in
    #[serde(default = "default_response_language")]
    pub response_language: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// Content fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Raw-content host
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    /// Content API host
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Host used for `git clone` in local mode
    #[serde(default = "default_clone_base_url")]
    pub clone_base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Pause after each file in network mode, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Flush the caches after this many attempted files
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,

    /// File content beyond this many characters is not sent to the model
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_response_language() -> String {
    "English".to_string()
}

fn default_llm_timeout() -> u64 {
    120
}

fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_clone_base_url() -> String {
    "https://github.com".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_flush_interval() -> usize {
    5
}

fn default_max_content_chars() -> usize {
    8000
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            response_language: default_response_language(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            raw_base_url: default_raw_base_url(),
            api_base_url: default_api_base_url(),
            clone_base_url: default_clone_base_url(),
            timeout_secs: default_fetch_timeout(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            flush_interval: default_flush_interval(),
            max_content_chars: default_max_content_chars(),
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl FileConfig {
    /// Load the config file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Load `graphlens.toml` from `dir` if present, otherwise defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// How file content is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Raw-content and content API endpoints
    Network,
    /// Shallow clone into a scratch directory
    LocalClone,
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMode::Network => write!(f, "network"),
            FetchMode::LocalClone => write!(f, "local clone"),
        }
    }
}

/// The repository whose files are analyzed
#[derive(Debug, Clone)]
pub struct RepoTarget {
    /// `owner/name`
    pub repo: String,
    /// Branch to read from
    pub branch: String,
    /// Optional access token for the content API
    pub token: Option<String>,
}

impl RepoTarget {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}
