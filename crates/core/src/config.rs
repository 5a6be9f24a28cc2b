use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// How the module cache decides whether a cached entry is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Re-read the file on every request and reload when its SHA-256 changed.
    #[default]
    Fingerprint,
    /// Keep the first load of a path for the life of the process.
    Pinned,
}

impl FromStr for CachePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fingerprint" => Ok(Self::Fingerprint),
            "pinned" => Ok(Self::Pinned),
            other => Err(CoreError::Config(format!(
                "unknown cache policy '{other}' (expected 'fingerprint' or 'pinned')"
            ))),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fingerprint => write!(f, "fingerprint"),
            Self::Pinned => write!(f, "pinned"),
        }
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// File extension of module images, without the dot.
    pub binary_extension: String,
    /// Module names provided by the host process; references to them are
    /// satisfied without probing the filesystem.
    pub host_modules: Vec<String>,
    pub cache_policy: CachePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary_extension: "rmod".to_string(),
            host_modules: vec!["core".to_string()],
            cache_policy: CachePolicy::default(),
        }
    }
}

/// On-disk overrides; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    binary_extension: Option<String>,
    host_modules: Option<Vec<String>>,
    cache_policy: Option<CachePolicy>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self::from_vars(env_opt)
    }

    /// Build config from an arbitrary variable lookup, falling back to defaults.
    ///
    /// Reads `RULECHECK_BINARY_EXTENSION`, `RULECHECK_HOST_MODULES`
    /// (comma separated) and `RULECHECK_CACHE_POLICY`.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ext) = lookup("RULECHECK_BINARY_EXTENSION") {
            config.binary_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(hosts) = lookup("RULECHECK_HOST_MODULES") {
            config.host_modules = hosts
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(policy) = lookup("RULECHECK_CACHE_POLICY") {
            match policy.parse() {
                Ok(p) => config.cache_policy = p,
                Err(e) => tracing::warn!(error = %e, "ignoring RULECHECK_CACHE_POLICY"),
            }
        }

        config
    }

    /// Environment config with the TOML file at `path` layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_env();
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading config file");
            let content = fs::read_to_string(path)?;
            config.apply_toml(&content)?;
        }
        Ok(config)
    }

    fn apply_toml(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| CoreError::Config(e.to_string()))?;

        if let Some(ext) = file.binary_extension {
            self.binary_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(hosts) = file.host_modules {
            self.host_modules = hosts;
        }
        if let Some(policy) = file.cache_policy {
            self.cache_policy = policy;
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  binary_extension: {}", self.binary_extension);
        tracing::info!("  host_modules:     {}", self.host_modules.join(", "));
        tracing::info!("  cache_policy:     {}", self.cache_policy);
    }
}
