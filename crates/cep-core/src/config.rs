//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `cep-gateway.toml` configuration file
//! 3. Default values
//!
//! `${VAR_NAME}` inside the configuration file is expanded from the environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default lookup page of the Correios postal-code range search
pub const DEFAULT_TARGET_URL: &str =
    "http://www.buscacep.correios.com.br/sistemas/buscacep/buscaFaixaCep.cfm";

/// What the orchestrator does when one region's run fails
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole request on the first failure
    #[default]
    FailFast,
    /// Keep the successful regions and report the failed ones
    CollectErrors,
}

impl FailurePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Some(Self::FailFast),
            "collect_errors" => Some(Self::CollectErrors),
            _ => None,
        }
    }
}

/// Main configuration for cep-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Browser scraping configuration
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Persistence configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Result file configuration
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Page holding the search form
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Overall deadline for one request, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    /// Wait limit for a single element, in seconds
    #[serde(default = "default_element_timeout_secs")]
    pub element_timeout_secs: u64,

    /// Fixed wait after each click, in milliseconds (0 disables it)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Interval between readiness checks, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on result pages followed per region
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Whether Chrome runs headless
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            target_url: default_target_url(),
            deadline_secs: default_deadline_secs(),
            element_timeout_secs: default_element_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_pages: default_max_pages(),
            headless: default_headless(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ScraperConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Whether scraped regions are persisted
    #[serde(default)]
    pub enabled: bool,

    /// Path to SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Whether result files are written after each batch
    #[serde(default = "default_output_enabled")]
    pub enabled: bool,

    /// Newline-delimited JSON output, one non-empty region per line
    #[serde(default = "default_jsonl_path")]
    pub jsonl_path: String,

    /// Full result set as a single JSON array
    #[serde(default = "default_json_path")]
    pub json_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: default_output_enabled(),
            jsonl_path: default_jsonl_path(),
            json_path: default_json_path(),
        }
    }
}

fn default_api_port() -> u16 {
    8080
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_deadline_secs() -> u64 {
    60
}

fn default_element_timeout_secs() -> u64 {
    20
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_max_pages() -> usize {
    500
}

fn default_headless() -> bool {
    true
}

fn default_db_path() -> String {
    "data/cep-gateway.db".to_string()
}

fn default_output_enabled() -> bool {
    true
}

fn default_jsonl_path() -> String {
    "result.jsonl".to_string()
}

fn default_json_path() -> String {
    "result.json".to_string()
}

impl Config {
    /// Expand `${VAR_NAME}` references from the environment.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let var_name = &after[..end];
                    if !var_name.is_empty() {
                        if let Ok(env_value) = std::env::var(var_name) {
                            result.push_str(&env_value);
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // unterminated reference is kept verbatim
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse configuration from TOML text (with `${VAR}` expansion)
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load configuration from the default location.
    ///
    /// Uses `./cep-gateway.toml` when present, otherwise defaults plus environment.
    pub fn load() -> crate::Result<Self> {
        if Path::new("cep-gateway.toml").exists() {
            return Self::from_toml_file("cep-gateway.toml");
        }

        Self::from_env()
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Override settings from environment variables
    fn apply_env_overrides(&mut self) {
        if let Some(port) = env_parse("API_PORT") {
            self.api.port = port;
        }

        if let Ok(url) = std::env::var("CEP_TARGET_URL") {
            if !url.is_empty() {
                self.scraper.target_url = url;
            }
        }
        if let Some(secs) = env_parse("CEP_DEADLINE_SECS") {
            self.scraper.deadline_secs = secs;
        }
        if let Some(secs) = env_parse("CEP_ELEMENT_TIMEOUT_SECS") {
            self.scraper.element_timeout_secs = secs;
        }
        if let Some(ms) = env_parse("CEP_SETTLE_DELAY_MS") {
            self.scraper.settle_delay_ms = ms;
        }
        if let Some(pages) = env_parse("CEP_MAX_PAGES") {
            self.scraper.max_pages = pages;
        }
        if let Ok(headless) = std::env::var("CEP_HEADLESS") {
            self.scraper.headless = headless.to_lowercase() != "false";
        }
        if let Ok(policy) = std::env::var("CEP_FAILURE_POLICY") {
            match FailurePolicy::parse(&policy) {
                Some(policy) => self.scraper.failure_policy = policy,
                None => tracing::warn!("Ignoring unknown CEP_FAILURE_POLICY: {}", policy),
            }
        }

        if let Ok(enabled) = std::env::var("STORE_ENABLED") {
            self.store.enabled = enabled.to_lowercase() == "true";
        }
        if let Ok(path) = std::env::var("DB_PATH") {
            self.store.db_path = path;
        }

        if let Ok(enabled) = std::env::var("OUTPUT_ENABLED") {
            self.output.enabled = enabled.to_lowercase() != "false";
        }
        if let Ok(path) = std::env::var("OUTPUT_JSONL_PATH") {
            self.output.jsonl_path = path;
        }
        if let Ok(path) = std::env::var("OUTPUT_JSON_PATH") {
            self.output.json_path = path;
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
