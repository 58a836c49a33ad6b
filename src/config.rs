//! Configuration for lurnix.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LURNIX_HOME, LURNIX_STORE_ROOT, LURNIX_STORE_URL)
//! 2. Config file (.lurnix/config.yaml)
//! 3. Defaults (~/.lurnix)
//!
//! Config file discovery:
//! - Searches current directory and parents for .lurnix/config.yaml
//! - `paths.home` is relative to the .lurnix/ directory
//! - `store.root` is relative to the config file's project root

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::aggregator::DEFAULT_MAX_CONCURRENT_GROUPS;
use crate::core::validation::SubmissionLimits;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub lifecycle: Option<LifecycleConfig>,
    #[serde(default)]
    pub submission: Option<SubmissionLimits>,
    #[serde(default)]
    pub aggregation: Option<AggregationConfig>,
    #[serde(default)]
    pub pipeline: Option<PipelineConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .lurnix/)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Filesystem object store directory
    pub root: Option<String>,
    /// Blob container URL, including its query-string token
    pub container_url: Option<String>,
    /// Per-request HTTP timeout for the blob container
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    pub pending_delay_ms: Option<u64>,
    pub processing_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    pub max_concurrent_groups: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub endpoint: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// Default per-request timeout for store HTTP calls
pub const DEFAULT_STORE_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where artifacts are discovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Filesystem(PathBuf),
    Container(String),
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filesystem(path) => write!(f, "{}", path.display()),
            // Never print the token
            Self::Container(url) => write!(f, "{}", url.split('?').next().unwrap_or(url)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub pending_delay: Duration,
    pub processing_delay: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            pending_delay: Duration::from_millis(2000),
            processing_delay: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// HTTP trigger endpoint; the simulated pipeline is used when unset
    pub endpoint: Option<String>,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            poll_interval: Duration::from_millis(2000),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to lurnix home (snapshot, default store)
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub store: StoreLocation,
    /// Timeout for a single store request (not the pipeline polling budget)
    pub store_request_timeout: Duration,
    pub lifecycle: LifecycleSettings,
    pub submission: SubmissionLimits,
    pub max_concurrent_groups: usize,
    pub pipeline: PipelineSettings,
}

impl ResolvedConfig {
    /// Document snapshot path ($LURNIX_HOME/catalog.json)
    pub fn catalog_path(&self) -> PathBuf {
        self.home.join("catalog.json")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".lurnix").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Environment overrides take priority over the file's store section
fn resolve_store(file: &StoreConfig, base_dir: &Path, home: &Path) -> StoreLocation {
    if let Some(url) = env_var("LURNIX_STORE_URL") {
        return StoreLocation::Container(url);
    }
    if let Some(root) = env_var("LURNIX_STORE_ROOT") {
        return StoreLocation::Filesystem(PathBuf::from(root));
    }
    if let Some(ref url) = file.container_url {
        return StoreLocation::Container(url.clone());
    }
    match file.root {
        Some(ref root) => StoreLocation::Filesystem(resolve_path(base_dir, root)),
        None => StoreLocation::Filesystem(home.join("store")),
    }
}

/// Merge a parsed config file over the defaults
fn resolve_file(
    config: ConfigFile,
    config_path: &Path,
    default_home: PathBuf,
) -> ResolvedConfig {
    // .lurnix/
    let lurnix_dir = config_path.parent().unwrap_or(Path::new("."));
    // project root
    let base_dir = lurnix_dir.parent().unwrap_or(Path::new("."));

    let home = if let Some(env_home) = env_var("LURNIX_HOME") {
        PathBuf::from(env_home)
    } else if let Some(ref home_path) = config.paths.home {
        resolve_path(lurnix_dir, home_path)
    } else {
        default_home
    };

    let store = resolve_store(&config.store, base_dir, &home);
    let store_request_timeout = config
        .store
        .request_timeout_seconds
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_STORE_REQUEST_TIMEOUT);

    let defaults = LifecycleSettings::default();
    let lifecycle = match config.lifecycle {
        Some(l) => LifecycleSettings {
            pending_delay: l
                .pending_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pending_delay),
            processing_delay: l
                .processing_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.processing_delay),
        },
        None => defaults,
    };

    let defaults = PipelineSettings::default();
    let pipeline = match config.pipeline {
        Some(p) => PipelineSettings {
            endpoint: p.endpoint,
            poll_interval: p
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            timeout: p
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        },
        None => defaults,
    };

    let max_concurrent_groups = config
        .aggregation
        .and_then(|a| a.max_concurrent_groups)
        .unwrap_or(DEFAULT_MAX_CONCURRENT_GROUPS)
        .max(1);

    ResolvedConfig {
        home,
        config_file: Some(config_path.to_path_buf()),
        store,
        store_request_timeout,
        lifecycle,
        submission: config.submission.unwrap_or_default(),
        max_concurrent_groups,
        pipeline,
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".lurnix");

    if let Some(config_path) = find_config_file() {
        let config = load_config_file(&config_path)?;
        return Ok(resolve_file(config, &config_path, default_home));
    }

    // No config file - use env vars or defaults
    let home = env_var("LURNIX_HOME")
        .map(PathBuf::from)
        .unwrap_or(default_home);
    let store = resolve_store(&StoreConfig::default(), Path::new("."), &home);

    Ok(ResolvedConfig {
        home,
        config_file: None,
        store,
        store_request_timeout: DEFAULT_STORE_REQUEST_TIMEOUT,
        lifecycle: LifecycleSettings::default(),
        submission: SubmissionLimits::default(),
        max_concurrent_groups: DEFAULT_MAX_CONCURRENT_GROUPS,
        pipeline: PipelineSettings::default(),
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the lurnix home directory
pub fn lurnix_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}

/// Get the document snapshot path ($LURNIX_HOME/catalog.json)
pub fn catalog_path() -> Result<PathBuf> {
    Ok(config()?.catalog_path())
}
