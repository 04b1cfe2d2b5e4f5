//! `oc` command-line executor
//!
//! Uses the system `oc` binary; kubeconfig state lives in `~/.kube`.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::executor::{ClusterExecutor, CommandOutput, ResourceKind};
use crate::config::ClusterConfig;

/// Runs cluster commands through the `oc` CLI
#[derive(Debug, Clone)]
pub struct OcCli {
    binary: String,
    insecure_skip_tls_verify: bool,
    timeout: Duration,
}

impl OcCli {
    pub fn new(binary: impl Into<String>, insecure_skip_tls_verify: bool, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            insecure_skip_tls_verify,
            timeout,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(
            config.oc_binary.clone(),
            config.insecure_skip_tls_verify,
            config.command_timeout(),
        )
    }

    fn login_args(&self, api_endpoint: &str, token: &str) -> Vec<String> {
        let mut args = vec![
            "login".to_string(),
            format!("--server={api_endpoint}"),
            format!("--token={token}"),
        ];
        if self.insecure_skip_tls_verify {
            args.push("--insecure-skip-tls-verify".to_string());
        }
        args
    }

    /// Run one command; `subcommand` is logged in place of the arguments
    async fn run<I, S>(&self, subcommand: &str, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args.into_iter().map(Into::into))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(binary = %self.binary, subcommand, "Running cluster CLI");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .with_context(|| {
                format!(
                    "`{} {subcommand}` timed out after {}s",
                    self.binary,
                    self.timeout.as_secs()
                )
            })?
            .with_context(|| format!("Failed to run `{} {subcommand}`", self.binary))?;

        Ok(output.into())
    }
}

fn ensure_kube_dir() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let kube_dir = home.join(".kube");
    if let Err(e) = std::fs::create_dir_all(&kube_dir) {
        warn!(path = %kube_dir.display(), error = %e, "Failed to create kubeconfig directory");
    }
}

#[async_trait]
impl ClusterExecutor for OcCli {
    async fn login(&self, api_endpoint: &str, token: &str) -> Result<CommandOutput> {
        ensure_kube_dir();
        self.run("login", self.login_args(api_endpoint, token)).await
    }

    async fn list_resources(&self, kind: ResourceKind) -> Result<CommandOutput> {
        self.run("get", ["get", kind.cli_name(), "-o", "json"]).await
    }

    async fn apply(&self, path: &Path) -> Result<CommandOutput> {
        let args: [OsString; 3] = ["apply".into(), "-f".into(), path.as_os_str().to_owned()];
        self.run("apply", args).await
    }
}
