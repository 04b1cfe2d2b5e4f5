//! Authenticated cluster session
//!
//! One `ClusterSession` is created at startup and shared by every request
//! handler. Logins are serialized behind a gate so concurrent callers never
//! issue a second login while one is in flight; callers that waited on a
//! failed attempt receive that attempt's error instead of retrying.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::cache::TtlCache;
use super::discovery::{
    parse_namespaces, parse_storage_classes, Discovery, NamespaceSummary, StorageClassSummary,
};
use super::error::ClusterError;
use super::executor::{ClusterExecutor, CommandOutput, ResourceKind};
use crate::config::ClusterConfig;

/// Substring `oc login` prints on success
pub const LOGIN_SUCCESS_MARKER: &str = "Logged into";

/// Endpoint and service-account token used to log in
#[derive(Clone)]
pub struct ClusterCredentials {
    pub api_url: String,
    pub token: String,
}

impl fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Session lifetimes
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub token_expiry: Duration,
    pub cache_ttl: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            token_expiry: Duration::from_secs(3600),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Snapshot returned by [`ClusterSession::auth_status`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticated_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct AuthState {
    authenticated_at: Option<Instant>,
    authenticated_at_wall: Option<DateTime<Utc>>,
    /// Completed login attempts
    attempts: u64,
    last_error: Option<ClusterError>,
}

impl AuthState {
    fn is_fresh(&self, expiry: Duration) -> bool {
        self.authenticated_at
            .is_some_and(|at| at.elapsed() < expiry)
    }
}

/// Shared cluster session: authentication state plus discovery caches
pub struct ClusterSession {
    executor: Arc<dyn ClusterExecutor>,
    credentials: ClusterCredentials,
    token_expiry: Duration,
    auth: RwLock<AuthState>,
    login_gate: Mutex<()>,
    namespaces: TtlCache<Vec<NamespaceSummary>>,
    storage_classes: TtlCache<Vec<StorageClassSummary>>,
}

impl ClusterSession {
    pub fn new(
        executor: Arc<dyn ClusterExecutor>,
        credentials: ClusterCredentials,
        settings: SessionSettings,
    ) -> Self {
        Self {
            executor,
            credentials,
            token_expiry: settings.token_expiry,
            auth: RwLock::new(AuthState::default()),
            login_gate: Mutex::new(()),
            namespaces: TtlCache::new(settings.cache_ttl),
            storage_classes: TtlCache::new(settings.cache_ttl),
        }
    }

    pub fn from_config(executor: Arc<dyn ClusterExecutor>, config: &ClusterConfig) -> Self {
        Self::new(
            executor,
            ClusterCredentials {
                api_url: config.api_url.clone(),
                token: config.token.clone(),
            },
            SessionSettings {
                token_expiry: config.token_expiry(),
                cache_ttl: config.cache_ttl(),
            },
        )
    }

    /// Ensure a fresh login, logging in at most once across concurrent callers
    pub async fn authenticate(&self) -> Result<(), ClusterError> {
        let observed = {
            let state = self.auth.read().await;
            if state.is_fresh(self.token_expiry) {
                debug!("Using cached cluster authentication");
                return Ok(());
            }
            state.attempts
        };

        let _gate = self.login_gate.lock().await;

        {
            let state = self.auth.read().await;
            if state.is_fresh(self.token_expiry) {
                debug!("Authenticated by a concurrent caller");
                return Ok(());
            }
            // An attempt finished while we waited; share its outcome
            if state.attempts != observed {
                if let Some(err) = &state.last_error {
                    return Err(err.clone());
                }
            }
        }

        let result = self.login().await;

        let mut state = self.auth.write().await;
        state.attempts += 1;
        match &result {
            Ok(()) => {
                state.authenticated_at = Some(Instant::now());
                state.authenticated_at_wall = Some(Utc::now());
                state.last_error = None;
                info!(endpoint = %self.credentials.api_url, "Authenticated to cluster");
            }
            Err(e) => {
                state.authenticated_at = None;
                state.authenticated_at_wall = None;
                state.last_error = Some(e.clone());
                warn!(endpoint = %self.credentials.api_url, error = %e, "Cluster authentication failed");
            }
        }
        result
    }

    async fn login(&self) -> Result<(), ClusterError> {
        let endpoint = &self.credentials.api_url;
        info!(endpoint = %endpoint, "Logging in to cluster");

        let output = self
            .executor
            .login(endpoint, &self.credentials.token)
            .await
            .map_err(|e| ClusterError::execution("login", &e))?;

        if !output.succeeded() {
            return Err(ClusterError::Authentication {
                endpoint: endpoint.clone(),
                message: output.diagnostic(),
            });
        }
        if !output.stdout.contains(LOGIN_SUCCESS_MARKER) {
            return Err(ClusterError::Authentication {
                endpoint: endpoint.clone(),
                message: format!("login output did not contain {LOGIN_SUCCESS_MARKER:?}"),
            });
        }
        Ok(())
    }

    /// Whether a fresh login is cached; performs no I/O
    pub async fn check_auth_status(&self) -> bool {
        self.auth.read().await.is_fresh(self.token_expiry)
    }

    pub async fn auth_status(&self) -> AuthStatus {
        let state = self.auth.read().await;
        let authenticated = state.is_fresh(self.token_expiry);
        AuthStatus {
            authenticated,
            authenticated_at: state.authenticated_at_wall.filter(|_| authenticated),
        }
    }

    /// User namespaces, from cache when `use_cache` and still fresh
    pub async fn namespaces(
        &self,
        use_cache: bool,
    ) -> Result<Arc<Vec<NamespaceSummary>>, ClusterError> {
        self.discover(
            ResourceKind::Namespaces,
            &self.namespaces,
            use_cache,
            parse_namespaces,
        )
        .await
    }

    /// Storage classes, from cache when `use_cache` and still fresh
    pub async fn storage_classes(
        &self,
        use_cache: bool,
    ) -> Result<Arc<Vec<StorageClassSummary>>, ClusterError> {
        self.discover(
            ResourceKind::StorageClasses,
            &self.storage_classes,
            use_cache,
            parse_storage_classes,
        )
        .await
    }

    pub async fn fetch_discovery(
        &self,
        kind: ResourceKind,
        use_cache: bool,
    ) -> Result<Discovery, ClusterError> {
        Ok(match kind {
            ResourceKind::Namespaces => Discovery::Namespaces(self.namespaces(use_cache).await?),
            ResourceKind::StorageClasses => {
                Discovery::StorageClasses(self.storage_classes(use_cache).await?)
            }
        })
    }

    async fn discover<T>(
        &self,
        kind: ResourceKind,
        cache: &TtlCache<Vec<T>>,
        use_cache: bool,
        parse: fn(&str) -> Result<Vec<T>, ClusterError>,
    ) -> Result<Arc<Vec<T>>, ClusterError> {
        if use_cache {
            if let Some(cached) = cache.get().await {
                debug!(kind = kind.key(), "Serving discovery from cache");
                return Ok(cached);
            }
        }

        self.authenticate().await?;

        let output = self
            .executor
            .list_resources(kind)
            .await
            .map_err(|e| ClusterError::execution("list", &e))?;
        if !output.succeeded() {
            let e = failed("list", &output);
            warn!(kind = kind.key(), error = %e, "Discovery failed");
            return Err(e);
        }

        let items = parse(&output.stdout).inspect_err(|e| {
            warn!(kind = kind.key(), error = %e, "Discovery output unreadable");
        })?;
        info!(kind = kind.key(), count = items.len(), "Refreshed discovery cache");
        Ok(cache.store(items).await)
    }

    /// Apply a manifest file, authenticating first
    pub async fn apply_manifest(&self, path: &Path) -> Result<String, ClusterError> {
        self.authenticate().await?;

        let output = self
            .executor
            .apply(path)
            .await
            .map_err(|e| ClusterError::execution("apply", &e))?;
        if !output.succeeded() {
            let e = failed("apply", &output);
            error!(path = %path.display(), error = %e, "Apply failed");
            return Err(e);
        }

        info!(path = %path.display(), "Applied manifests");
        Ok(output.stdout)
    }

    /// Stage rendered YAML in a temporary file and apply it
    pub async fn apply_yaml(&self, yaml: &str) -> Result<String, ClusterError> {
        let staged = tempfile::Builder::new()
            .prefix("okd-deployer-")
            .suffix(".yaml")
            .tempfile()
            .map_err(|e| ClusterError::Staging(e.to_string()))?;
        let path = staged.path().to_path_buf();

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ClusterError::Staging(e.to_string()))?;
        file.write_all(yaml.as_bytes())
            .await
            .map_err(|e| ClusterError::Staging(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| ClusterError::Staging(e.to_string()))?;
        drop(file);

        // `staged` removes the file when dropped
        self.apply_manifest(&path).await
    }
}

fn failed(operation: &'static str, output: &CommandOutput) -> ClusterError {
    ClusterError::Execution {
        operation,
        message: output.diagnostic(),
    }
}
