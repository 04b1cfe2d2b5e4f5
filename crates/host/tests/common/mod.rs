//! Common test utilities
#![allow(dead_code)] // Not every helper is used by every test file

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use okd_deployer_host::cluster::{
    ClusterCredentials, ClusterExecutor, ClusterSession, CommandOutput, ResourceKind,
    SessionSettings,
};

pub const API_URL: &str = "https://api.okd.example.com:6443";

pub const LOGIN_OK: &str =
    "Logged into \"https://api.okd.example.com:6443\" as \"system:serviceaccount:deployer:sa\" using the token provided.\n";

pub const NAMESPACES_JSON: &str = r#"{
    "apiVersion": "v1",
    "kind": "List",
    "items": [
        {"apiVersion": "v1", "kind": "Namespace",
         "metadata": {"name": "team-a", "creationTimestamp": "2024-05-01T10:00:00Z"},
         "status": {"phase": "Active"}},
        {"apiVersion": "v1", "kind": "Namespace",
         "metadata": {"name": "openshift-console"}, "status": {"phase": "Active"}}
    ]
}"#;

pub const STORAGE_CLASSES_JSON: &str = r#"{
    "apiVersion": "v1",
    "kind": "List",
    "items": [
        {"apiVersion": "storage.k8s.io/v1", "kind": "StorageClass",
         "metadata": {"name": "standard",
                      "annotations": {"storageclass.kubernetes.io/is-default-class": "true"}},
         "provisioner": "kubernetes.io/cinder"}
    ]
}"#;

/// Scripted executor that counts every invocation
pub struct MockExecutor {
    login_output: Mutex<CommandOutput>,
    /// Makes `login` fail to run at all
    login_error: Option<String>,
    login_delay: Duration,
    listings: Mutex<HashMap<ResourceKind, CommandOutput>>,
    apply_output: Mutex<CommandOutput>,
    /// (path, file contents) seen by `apply`
    applied: Mutex<Vec<(PathBuf, String)>>,
    login_calls: AtomicUsize,
    list_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self {
            login_output: Mutex::new(CommandOutput::success(LOGIN_OK)),
            login_error: None,
            login_delay: Duration::ZERO,
            listings: Mutex::new(HashMap::from([
                (ResourceKind::Namespaces, CommandOutput::success(NAMESPACES_JSON)),
                (
                    ResourceKind::StorageClasses,
                    CommandOutput::success(STORAGE_CLASSES_JSON),
                ),
            ])),
            apply_output: Mutex::new(CommandOutput::success(
                "deployment.apps/demo-deployment created\nservice/demo-service created\n",
            )),
            applied: Mutex::new(Vec::new()),
            login_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            apply_calls: AtomicUsize::new(0),
        }
    }
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(self, output: CommandOutput) -> Self {
        *self.login_output.lock().unwrap() = output;
        self
    }

    pub fn with_login_error(mut self, message: &str) -> Self {
        self.login_error = Some(message.to_string());
        self
    }

    /// Login sleeps on the tokio clock, so paused tests stay deterministic
    pub fn with_login_delay(mut self, delay: Duration) -> Self {
        self.login_delay = delay;
        self
    }

    pub fn with_apply(self, output: CommandOutput) -> Self {
        *self.apply_output.lock().unwrap() = output;
        self
    }

    pub fn set_listing(&self, kind: ResourceKind, output: CommandOutput) {
        self.listings.lock().unwrap().insert(kind, output);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn applied(&self) -> Vec<(PathBuf, String)> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterExecutor for MockExecutor {
    async fn login(&self, api_endpoint: &str, token: &str) -> Result<CommandOutput> {
        assert_eq!(api_endpoint, API_URL);
        assert_eq!(token, "sha256~test-token");
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if !self.login_delay.is_zero() {
            tokio::time::sleep(self.login_delay).await;
        }
        if let Some(message) = &self.login_error {
            anyhow::bail!("{message}");
        }
        Ok(self.login_output.lock().unwrap().clone())
    }

    async fn list_resources(&self, kind: ResourceKind) -> Result<CommandOutput> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let output = self.listings.lock().unwrap().get(&kind).cloned();
        output.ok_or_else(|| anyhow::anyhow!("no listing scripted for {}", kind.key()))
    }

    async fn apply(&self, path: &Path) -> Result<CommandOutput> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        let contents = std::fs::read_to_string(path)?;
        self.applied
            .lock()
            .unwrap()
            .push((path.to_path_buf(), contents));
        Ok(self.apply_output.lock().unwrap().clone())
    }
}

pub fn session_with(executor: &Arc<MockExecutor>) -> ClusterSession {
    ClusterSession::new(
        executor.clone(),
        ClusterCredentials {
            api_url: API_URL.to_string(),
            token: "sha256~test-token".to_string(),
        },
        SessionSettings::default(),
    )
}
