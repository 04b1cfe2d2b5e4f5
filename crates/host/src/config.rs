//! Configuration system for okd-deployer
//!
//! Reads config from ~/.config/okd-deployer/config.toml, then applies
//! environment overrides (`OKD_CLUSTER_API`, `OKD_SERVICE_ACCOUNT_TOKEN`,
//! `OKD_DEPLOYER_API_TOKEN`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const ENV_CLUSTER_API: &str = "OKD_CLUSTER_API";
pub const ENV_SERVICE_ACCOUNT_TOKEN: &str = "OKD_SERVICE_ACCOUNT_TOKEN";
pub const ENV_API_TOKEN: &str = "OKD_DEPLOYER_API_TOKEN";

/// Placeholders used when no cluster is configured
pub const MISSING_CLUSTER_API: &str = "https://missing-cluster-api.com";
pub const MISSING_SERVICE_ACCOUNT_TOKEN: &str = "missing-cluster-sa-token";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with the built frontend, served at `/`
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// Cluster access configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// API endpoint passed to `oc login --server`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Service-account token passed to `oc login --token`
    #[serde(default = "default_token")]
    pub token: String,

    /// Cluster CLI binary
    #[serde(default = "default_oc_binary")]
    pub oc_binary: String,

    #[serde(default = "default_true")]
    pub insecure_skip_tls_verify: bool,

    /// Upper bound for a single CLI invocation
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// How long a successful login is trusted
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,

    /// Lifetime of cached discovery results
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_api_url() -> String {
    MISSING_CLUSTER_API.to_string()
}

fn default_token() -> String {
    MISSING_SERVICE_ACCOUNT_TOKEN.to_string()
}

fn default_oc_binary() -> String {
    "oc".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_command_timeout() -> u64 {
    120
}

const fn default_token_expiry() -> u64 {
    3600 // 1 hour
}

const fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: default_token(),
            oc_binary: default_oc_binary(),
            insecure_skip_tls_verify: true,
            command_timeout_secs: default_command_timeout(),
            token_expiry_secs: default_token_expiry(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl ClusterConfig {
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub const fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_secs)
    }

    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// True while either credential is still the built-in placeholder
    pub fn uses_placeholders(&self) -> bool {
        self.api_url == MISSING_CLUSTER_API || self.token == MISSING_SERVICE_ACCOUNT_TOKEN
    }
}

// Keeps the token out of logs
impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .field("oc_binary", &self.oc_binary)
            .field("insecure_skip_tls_verify", &self.insecure_skip_tls_verify)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("token_expiry_secs", &self.token_expiry_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

/// API access configuration
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token required on `/api` routes; open when unset
    #[serde(default)]
    pub api_token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Full application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load from `path`, or the default path when it exists, then apply env overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("okd-deployer")
            .join("config.toml")
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment overrides; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(api_url) = get(ENV_CLUSTER_API) {
            self.cluster.api_url = api_url;
        }
        if let Some(token) = get(ENV_SERVICE_ACCOUNT_TOKEN) {
            self.cluster.token = token;
        }
        if let Some(api_token) = get(ENV_API_TOKEN) {
            self.auth.api_token = Some(api_token);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.cluster.token_expiry(), Duration::from_secs(3600));
        assert_eq!(config.cluster.cache_ttl(), Duration::from_secs(300));
        assert!(config.cluster.uses_placeholders());
        assert!(config.auth.api_token.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[server]
port = 8081

[cluster]
api_url = "https://api.okd.example.com:6443"
cache_ttl_secs = 60
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.cluster.api_url, "https://api.okd.example.com:6443");
        assert_eq!(config.cluster.cache_ttl_secs, 60);
        assert_eq!(config.cluster.oc_binary, "oc");
        assert!(config.cluster.insecure_skip_tls_verify);
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            (ENV_CLUSTER_API, "https://api.cluster:6443".to_string()),
            (ENV_SERVICE_ACCOUNT_TOKEN, "sha256~token".to_string()),
            (ENV_API_TOKEN, String::new()),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).cloned());

        assert_eq!(config.cluster.api_url, "https://api.cluster:6443");
        assert_eq!(config.cluster.token, "sha256~token");
        assert!(config.auth.api_token.is_none());
        assert!(!config.cluster.uses_placeholders());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auth]\napi_token = \"secret\"").unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.auth.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = ClusterConfig::default();
        config.token = "super-secret".to_string();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(Config::from_toml_str("[server\nport = 1").is_err());
    }
}
