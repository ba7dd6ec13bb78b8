use crate::error::{Result, SpecServerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default tag API host
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default raw-content CDN host
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Organization and project whose tags are published as versions
pub const DEFAULT_ORGANIZATION: &str = "opentripmodel";
pub const DEFAULT_PROJECT: &str = "opentripmodel";

/// Branch used for paths under a version string that is not a known tag
pub const DEFAULT_FALLBACK_REF: &str = "master";

/// Version-list cache: one short-lived entry
pub const DEFAULT_VERSIONS_CAPACITY: usize = 100;
pub const DEFAULT_VERSIONS_TTL_SECS: u64 = 500;

/// File cache: many entries, commits are immutable so the TTL is long
pub const DEFAULT_FILES_CAPACITY: usize = 1000;
pub const DEFAULT_FILES_TTL_SECS: u64 = 86_400;

pub const DEFAULT_STATSD_ADDRESS: &str = "127.0.0.1:8125";

// Environment overrides
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_LOCAL_HTML_FILE: &str = "LOCAL_HTML_FILE";
pub const ENV_LOCAL_SWAGGER_FILE: &str = "LOCAL_SWAGGER_FILE";
pub const ENV_HIDE_ALPHA: &str = "HIDE_ALPHA_VERSIONS";
pub const ENV_METRICS_ENABLED: &str = "METRICS_ENABLED";
pub const ENV_STATSD_ADDRESS: &str = "STATSD_ADDRESS";
pub const ENV_ENVIRONMENT: &str = "ENVIRONMENT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_project")]
    pub project: String,
    /// Credential for the tag API. Sent as `Authorization: token {..}`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_fallback_ref")]
    pub fallback_ref: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            raw_base_url: default_raw_base_url(),
            organization: default_organization(),
            project: default_project(),
            token: None,
            timeout_secs: default_timeout_secs(),
            fallback_ref: default_fallback_ref(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_raw_base_url() -> String {
    DEFAULT_RAW_BASE_URL.to_string()
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fallback_ref() -> String {
    DEFAULT_FALLBACK_REF.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_versions_capacity")]
    pub versions_capacity: usize,
    #[serde(default = "default_versions_ttl_secs")]
    pub versions_ttl_secs: u64,
    #[serde(default = "default_files_capacity")]
    pub files_capacity: usize,
    #[serde(default = "default_files_ttl_secs")]
    pub files_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            versions_capacity: default_versions_capacity(),
            versions_ttl_secs: default_versions_ttl_secs(),
            files_capacity: default_files_capacity(),
            files_ttl_secs: default_files_ttl_secs(),
        }
    }
}

fn default_versions_capacity() -> usize {
    DEFAULT_VERSIONS_CAPACITY
}

fn default_versions_ttl_secs() -> u64 {
    DEFAULT_VERSIONS_TTL_SECS
}

fn default_files_capacity() -> usize {
    DEFAULT_FILES_CAPACITY
}

fn default_files_ttl_secs() -> u64 {
    DEFAULT_FILES_TTL_SECS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Serve `redoc/index.html` from `local_root` instead of upstream
    #[serde(default)]
    pub local_html_file: bool,
    /// Serve `api/swagger.yaml` from `local_root` instead of upstream
    #[serde(default)]
    pub local_swagger_file: bool,
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    /// Directory backing `/lib/*`. `None` disables static assets.
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<PathBuf>,
    /// Hide versions whose prerelease label starts with `alpha`
    #[serde(default)]
    pub hide_alpha: bool,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            local_html_file: false,
            local_swagger_file: false,
            local_root: default_local_root(),
            static_dir: default_static_dir(),
            hide_alpha: false,
        }
    }
}

fn default_local_root() -> PathBuf {
    PathBuf::from("..")
}

fn default_static_dir() -> Option<PathBuf> {
    Some(PathBuf::from("lib"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_statsd_address")]
    pub statsd_address: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            statsd_address: default_statsd_address(),
            environment: default_environment(),
        }
    }
}

fn default_statsd_address() -> String {
    DEFAULT_STATSD_ADDRESS.to_string()
}

fn default_environment() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a boolean environment flag: only `TRUE` (any case) counts as set.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

impl Config {
    /// Load a TOML configuration file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SpecServerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup, so the mapping can be
    /// exercised without touching the process environment.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_GITHUB_TOKEN).filter(|t| !t.is_empty()) {
            self.upstream.token = Some(token);
        }
        if let Some(v) = lookup(ENV_LOCAL_HTML_FILE) {
            self.content.local_html_file = parse_flag(&v);
        }
        if let Some(v) = lookup(ENV_LOCAL_SWAGGER_FILE) {
            self.content.local_swagger_file = parse_flag(&v);
        }
        if let Some(v) = lookup(ENV_HIDE_ALPHA) {
            self.content.hide_alpha = parse_flag(&v);
        }
        if let Some(v) = lookup(ENV_METRICS_ENABLED) {
            self.metrics.enabled = parse_flag(&v);
        }
        if let Some(addr) = lookup(ENV_STATSD_ADDRESS).filter(|a| !a.is_empty()) {
            self.metrics.statsd_address = addr;
        }
        if let Some(env) = lookup(ENV_ENVIRONMENT).filter(|e| !e.is_empty()) {
            self.metrics.environment = env;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.is_empty()) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.upstream.organization.is_empty() || self.upstream.project.is_empty() {
            return Err(SpecServerError::Config(
                "upstream.organization and upstream.project must not be empty".to_string(),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(SpecServerError::Config(
                "upstream.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.cache.versions_capacity == 0 || self.cache.files_capacity == 0 {
            return Err(SpecServerError::Config(
                "cache capacities must be greater than zero".to_string(),
            ));
        }
        if self.cache.versions_ttl_secs == 0 || self.cache.files_ttl_secs == 0 {
            return Err(SpecServerError::Config(
                "cache TTLs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
