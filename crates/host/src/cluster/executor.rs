use std::path::Path;
use std::process::Output;

use anyhow::Result;
use async_trait::async_trait;

/// Cluster resource kinds that can be listed for discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespaces,
    StorageClasses,
}

impl ResourceKind {
    /// Resource name understood by `oc get`
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::StorageClasses => "storageclass",
        }
    }

    /// Key used in API responses and logs
    pub const fn key(self) -> &'static str {
        match self {
            Self::Namespaces => "namespaces",
            Self::StorageClasses => "storageClasses",
        }
    }
}

/// Captured result of one CLI invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Best human-readable explanation of a failure
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        }
    }
}

/// Runs cluster CLI commands on behalf of the session
///
/// `Err` means the command could not be run at all; a command that ran and
/// failed is reported through [`CommandOutput::exit_code`].
#[async_trait]
pub trait ClusterExecutor: Send + Sync {
    /// Log in to `api_endpoint` with a service-account `token`
    async fn login(&self, api_endpoint: &str, token: &str) -> Result<CommandOutput>;

    /// List every object of `kind` as JSON on stdout
    async fn list_resources(&self, kind: ResourceKind) -> Result<CommandOutput>;

    /// Apply the manifests in `path`
    async fn apply(&self, path: &Path) -> Result<CommandOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let output = CommandOutput {
            stdout: "partial".to_string(),
            stderr: "error: forbidden\n".to_string(),
            exit_code: Some(1),
        };
        assert_eq!(output.diagnostic(), "error: forbidden");
        assert!(!output.succeeded());
    }

    #[test]
    fn test_diagnostic_falls_back_to_status() {
        let output = CommandOutput {
            exit_code: None,
            ..Default::default()
        };
        assert_eq!(output.diagnostic(), "terminated by signal");
        assert_eq!(CommandOutput::failure(2, "").diagnostic(), "exited with status 2");
    }

    #[test]
    fn test_resource_kind_names() {
        assert_eq!(ResourceKind::StorageClasses.cli_name(), "storageclass");
        assert_eq!(ResourceKind::StorageClasses.key(), "storageClasses");
        assert_eq!(ResourceKind::Namespaces.cli_name(), "namespaces");
    }
}
