//! Application configuration for PaperDigest.
//!
//! User config lives at `~/.paperdigest/paperdigest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PaperdigestError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "paperdigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".paperdigest";

// ---------------------------------------------------------------------------
// Config structs (matching paperdigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory where per-paper output (assets, reports) is written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Concurrent asset downloads per paper.
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            download_concurrency: default_download_concurrency(),
        }
    }
}

fn default_output_dir() -> String {
    "~/paperdigest-papers".into()
}
fn default_download_concurrency() -> usize {
    5
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds, covering the full body read.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Attempts per fetch before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay in seconds between retry attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
        .into()
}
fn default_request_timeout() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    2
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime HTTP fetch configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User-Agent header sent with every request.
    pub user_agent: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Attempts per fetch before giving up.
    pub max_attempts: u32,
    /// Base delay in seconds between retry attempts.
    pub retry_delay_secs: u64,
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.http.user_agent.clone(),
            request_timeout_secs: config.http.request_timeout_secs,
            max_attempts: config.http.max_attempts,
            retry_delay_secs: config.http.retry_delay_secs,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.paperdigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PaperdigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.paperdigest/paperdigest.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PaperdigestError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PaperdigestError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PaperdigestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PaperdigestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PaperdigestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~/` against the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
