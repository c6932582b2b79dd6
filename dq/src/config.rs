//! docsqueeze configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::chunker::ChunkMode;
use crate::llm::{Model, RetryPolicy};

/// Instruction sent as the system prompt when none is configured
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "\
Your task is to rewrite content for a prompt input to LLM. Reduce the given text as much as possible following the guidelines below:
1. Focus on extracting code examples from the provided text and reduce the surrounding text or remove it entirely.
2. Remove any unnecessary details.
3. Remove any links, references to further reading, phrases that include recommendations and opinions.
4. Remove any narration, only focus on dry facts. Bullet points are preferred.
5. IMPORTANT: If there's nothing of value in the text, remove it entirely and return a single dash (-).
6. Format text using markdown. Preserve all special characters within code examples in the output.";

/// Default word budget per chunk and per batch
pub const DEFAULT_TARGET_WORDS: usize = 600;

/// Main docsqueeze configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Rewrite behaviour
    pub rewrite: RewriteConfig,

    /// Completion endpoint configuration
    pub llm: LlmConfig,

    /// GitHub source configuration
    pub github: GithubConfig,

    /// Output configuration
    pub output: OutputConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Credentials are checked separately when the client is built, so
    /// commands that never call the endpoint work without them.
    pub fn validate(&self) -> Result<()> {
        if self.rewrite.target_words == 0 {
            return Err(eyre::eyre!("rewrite.target-words must be greater than zero"));
        }
        if self.rewrite.system_instruction.trim().is_empty() {
            return Err(eyre::eyre!("rewrite.system-instruction must not be empty"));
        }
        url::Url::parse(&self.llm.base_url).context(format!("Invalid llm.base-url: {}", self.llm.base_url))?;
        url::Url::parse(&self.github.api_url).context(format!("Invalid github.api-url: {}", self.github.api_url))?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .docsqueeze.yml
        let local_config = PathBuf::from(".docsqueeze.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/docsqueeze/docsqueeze.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("docsqueeze").join("docsqueeze.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Any failure yields `None`; the full load reports it later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".docsqueeze.yml")];
                if let Some(config_dir) = dirs::config_dir() {
                    paths.push(config_dir.join("docsqueeze").join("docsqueeze.yml"));
                }
                paths
            }
        };

        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn apply(&mut self, overrides: Overrides) {
        debug!(?overrides, "Config::apply: called");
        if let Some(model) = overrides.model {
            self.rewrite.model = model;
        }
        if let Some(target_words) = overrides.target_words {
            self.rewrite.target_words = target_words;
        }
        if let Some(mode) = overrides.mode {
            self.rewrite.mode = mode;
        }
        if let Some(system_instruction) = overrides.system_instruction {
            self.rewrite.system_instruction = system_instruction;
        }
        if overrides.debug {
            self.rewrite.debug = true;
        }
        if let Some(file) = overrides.output {
            self.output.file = file;
        }
        if let Some(extensions) = overrides.extensions {
            self.github.extensions = extensions;
        }
    }
}

/// Values given on the command line that replace configured ones
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub model: Option<Model>,
    pub target_words: Option<usize>,
    pub mode: Option<ChunkMode>,
    pub system_instruction: Option<String>,
    pub debug: bool,
    pub output: Option<PathBuf>,
    pub extensions: Option<Vec<String>>,
}

/// Rewrite behaviour, fixed for a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// System prompt sent with every batch
    #[serde(rename = "system-instruction")]
    pub system_instruction: String,

    /// Chat model used for rewriting
    pub model: Model,

    /// Word budget per chunk and per batch
    #[serde(rename = "target-words")]
    pub target_words: usize,

    /// Chunking mode (auto picks markdown for .md files)
    pub mode: ChunkMode,

    /// Log every prompt/response pair
    pub debug: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            model: Model::default(),
            target_words: DEFAULT_TARGET_WORDS,
            mode: ChunkMode::default(),
            debug: false,
        }
    }
}

/// Completion endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Retries after a transient failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First retry delay in milliseconds, doubled per retry
    #[serde(rename = "initial-backoff-ms")]
    pub initial_backoff_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            timeout_ms: 180_000,
            max_retries: crate::llm::RetryPolicy::default().max_retries,
            initial_backoff_ms: 1000,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        let key = std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("LLM API key not found. Set the {} environment variable.", self.api_key_env))?;
        if key.trim().is_empty() {
            return Err(eyre::eyre!("LLM API key in {} is empty", self.api_key_env));
        }
        Ok(key)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }
}

/// GitHub source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// REST API base URL
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Environment variable holding an optional access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// File extensions to rewrite (matched case-insensitively)
    pub extensions: Vec<String>,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_PERSONAL_ACCESS_TOKEN".to_string(),
            extensions: vec![".md".to_string()],
            timeout_ms: 60_000,
        }
    }
}

impl GithubConfig {
    /// Read the access token, if the configured variable is set and non-empty
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.trim().is_empty())
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// File the rewritten text is appended to
    pub file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("output.md"),
        }
    }
}
