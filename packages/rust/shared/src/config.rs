//! Application configuration for LeadGen.
//!
//! User config lives at `~/.leadgen/leadgen.toml`.
//! CLI flags override environment variables, which override config file
//! values, which override defaults. The CLI applies the first two layers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LeadGenError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadgen";

// ---------------------------------------------------------------------------
// Config structs (matching leadgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub google_sheets: GoogleSheetsConfig,

    #[serde(default)]
    pub scraping: ScrapingConfig,

    #[serde(default)]
    pub outreach: OutreachConfig,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Country whose agencies are prospected.
    #[serde(default = "default_target_country")]
    pub target_country: String,

    /// Upper bound on discovered agencies.
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Free-text agency category, e.g. "social media marketing agency".
    #[serde(default = "default_search_query")]
    pub search_query: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target_country: default_target_country(),
            target_count: default_target_count(),
            search_query: default_search_query(),
        }
    }
}

fn default_target_country() -> String {
    "Finland".into()
}
fn default_target_count() -> usize {
    20
}
fn default_search_query() -> String {
    "social media marketing agency".into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model identifier passed to the chat-completions endpoint.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            temperature: default_temperature(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_temperature() -> f32 {
    0.7
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Primary CSV destination.
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Run log file (receives every log line in addition to stdout).
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Append to an existing CSV instead of overwriting it.
    #[serde(default)]
    pub append: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_file: default_output_file(),
            log_file: default_log_file(),
            append: false,
        }
    }
}

fn default_output_file() -> String {
    "outputs/leads.csv".into()
}
fn default_log_file() -> String {
    "outputs/logs.txt".into()
}

/// `[google_sheets]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleSheetsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Spreadsheet id from the sheet URL.
    #[serde(default)]
    pub sheet_id: Option<String>,

    /// Path to a service-account JSON key file.
    #[serde(default)]
    pub credentials_path: Option<String>,
}

/// `[scraping]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    /// Minimum ms between requests to the same host.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries on transient failures (network, 429, 5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on visible text kept per page.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            rate_limit_ms: default_rate_limit(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

fn default_rate_limit() -> u64 {
    1500
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_max_retries() -> u32 {
    3
}
fn default_max_text_chars() -> usize {
    5000
}

/// `[outreach]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    /// Soft word limit for generated messages.
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
        }
    }
}

fn default_max_words() -> usize {
    120
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Read the LLM API key from the env var named by `llm.api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }

    /// Check every setting and report all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.api_key().is_none() {
            problems.push(format!(
                "{} is required but not set",
                self.llm.api_key_env
            ));
        }
        if self.search.target_country.trim().is_empty() {
            problems.push("target_country must not be empty".to_string());
        }
        if self.search.search_query.trim().is_empty() {
            problems.push("search_query must not be empty".to_string());
        }
        if self.search.target_count == 0 {
            problems.push("target_count must be greater than zero".to_string());
        }
        if self.llm.model.trim().is_empty() {
            problems.push("llm model must not be empty".to_string());
        }
        if self.output.output_file.trim().is_empty() {
            problems.push("output_file must not be empty".to_string());
        }
        if self.output.log_file.trim().is_empty() {
            problems.push("log_file must not be empty".to_string());
        }
        if self.google_sheets.enabled {
            if is_blank(&self.google_sheets.sheet_id) {
                problems.push("GOOGLE_SHEET_ID is required when Google Sheets is enabled".into());
            }
            if is_blank(&self.google_sheets.credentials_path) {
                problems.push(
                    "GOOGLE_APPLICATION_CREDENTIALS is required when Google Sheets is enabled"
                        .into(),
                );
            }
        }

        if problems.is_empty() {
            return Ok(());
        }

        let listing = problems
            .iter()
            .map(|p| format!("  - {p}"))
            .collect::<Vec<_>>()
            .join("\n");
        Err(LeadGenError::config(format!(
            "Configuration validation failed:\n{listing}"
        )))
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Show only a short prefix of a secret.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "***".into();
    }
    let prefix: String = secret.chars().take(8).collect();
    format!("{prefix}...")
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + env + CLI flags)
// ---------------------------------------------------------------------------

/// Resolved spreadsheet destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsTarget {
    pub sheet_id: String,
    pub credentials_path: PathBuf,
}

/// Runtime configuration handed to the pipeline after validation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub target_country: String,
    pub target_count: usize,
    pub search_query: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub api_key: Option<String>,
    pub output_file: PathBuf,
    pub append: bool,
    pub sheets: Option<SheetsTarget>,
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_text_chars: usize,
    pub max_words: usize,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let sheets = if config.google_sheets.enabled {
            match (
                config.google_sheets.sheet_id.as_deref(),
                config.google_sheets.credentials_path.as_deref(),
            ) {
                (Some(id), Some(path)) if !id.trim().is_empty() && !path.trim().is_empty() => {
                    Some(SheetsTarget {
                        sheet_id: id.trim().to_string(),
                        credentials_path: PathBuf::from(path),
                    })
                }
                _ => None,
            }
        } else {
            None
        };

        Self {
            target_country: config.search.target_country.clone(),
            target_count: config.search.target_count,
            search_query: config.search.search_query.clone(),
            model: config.llm.model.clone(),
            base_url: config.llm.base_url.clone(),
            temperature: config.llm.temperature,
            api_key: config.api_key(),
            output_file: PathBuf::from(&config.output.output_file),
            append: config.output.append,
            sheets,
            rate_limit_ms: config.scraping.rate_limit_ms,
            timeout_secs: config.scraping.timeout_secs,
            max_retries: config.scraping.max_retries,
            max_text_chars: config.scraping.max_text_chars,
            max_words: config.outreach.max_words,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| LeadGenError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadgen/leadgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadGenError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadGenError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file. Uses `~/.leadgen/leadgen.toml` when no path
/// is given. Returns the path to the created file.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config_file_path()?,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| LeadGenError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadGenError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadGenError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
