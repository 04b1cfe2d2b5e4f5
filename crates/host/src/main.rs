//! okd-deployer - OpenShift deployment manifests from a single request
//!
//! Serves the REST API (and optionally the built frontend), or renders a
//! request file to YAML offline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use okd_deployer_host::api::{self, AppState};
use okd_deployer_host::cluster::{ClusterSession, OcCli};
use okd_deployer_host::config::Config;
use okd_deployer_manifest::{render, DeploymentRequest};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!("okd-deployer - OpenShift deployment manifests from a single request");
    println!();
    println!("USAGE:");
    println!("    okd-deployer [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    serve            Start the API server (default)");
    println!("    render FILE      Print the manifests for a JSON request file");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config FILE  Config file to load");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version");
    println!();
    println!("CONFIG:");
    println!("    ~/.config/okd-deployer/config.toml");
    println!();
    println!("ENVIRONMENT:");
    println!("    OKD_CLUSTER_API            Cluster API endpoint");
    println!("    OKD_SERVICE_ACCOUNT_TOKEN  Service-account token for `oc login`");
    println!("    OKD_DEPLOYER_API_TOKEN     Bearer token required on /api routes");
    println!("    RUST_LOG                   Log filter (default: info)");
}

enum Command {
    Serve { config: Option<PathBuf> },
    Render { file: PathBuf },
    Help,
    Version,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let mut config = None;
    let mut render_file = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-v" => return Ok(Command::Version),
            "--config" | "-c" if i + 1 < args.len() => {
                config = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--config" | "-c" => bail!("--config requires a path"),
            "render" if i + 1 < args.len() => {
                render_file = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "render" => bail!("render requires a request file"),
            "serve" => {}
            other => bail!("unknown argument: {other} (see --help)"),
        }
        i += 1;
    }

    match (render_file, config) {
        (Some(_), Some(_)) => bail!("--config applies to serve, not render"),
        (Some(file), None) => Ok(Command::Render { file }),
        (None, config) => Ok(Command::Serve { config }),
    }
}

fn render_file(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    let request: DeploymentRequest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request {}", path.display()))?;
    let yaml = render(&request).context("Failed to build manifests")?;
    print!("{yaml}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Graceful shutdown initiated");
}

async fn serve(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    if config.cluster.uses_placeholders() {
        warn!(
            "Cluster API or service-account token not configured; set OKD_CLUSTER_API and OKD_SERVICE_ACCOUNT_TOKEN"
        );
    }
    if config.auth.api_token.is_none() {
        warn!("No API token configured; /api routes are open");
    }

    let executor = Arc::new(OcCli::from_config(&config.cluster));
    let session = Arc::new(ClusterSession::from_config(executor, &config.cluster));
    let state = AppState::new(session, config.auth.api_token.clone());

    if let Some(dir) = &config.server.static_dir {
        info!(path = %dir.display(), "Serving frontend");
    }
    let app = api::app(state, config.server.static_dir.as_deref());

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, cluster = %config.cluster.api_url, "okd-deployer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured logging (tracing)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            println!("okd-deployer {VERSION}");
            Ok(())
        }
        Command::Render { file } => render_file(&file),
        Command::Serve { config } => serve(config.as_deref()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_default_is_serve() {
        assert!(matches!(
            parse_args(&[]).unwrap(),
            Command::Serve { config: None }
        ));
    }

    #[test]
    fn test_serve_with_config() {
        match parse_args(&args(&["serve", "--config", "/etc/okd.toml"])).unwrap() {
            Command::Serve { config } => assert_eq!(config, Some(PathBuf::from("/etc/okd.toml"))),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_render_requires_file() {
        assert!(parse_args(&args(&["render"])).is_err());
        assert!(matches!(
            parse_args(&args(&["render", "req.json"])).unwrap(),
            Command::Render { .. }
        ));
    }

    #[test]
    fn test_config_requires_path() {
        let err = parse_args(&args(&["serve", "--config"])).err().unwrap();
        assert_eq!(err.to_string(), "--config requires a path");
        assert!(parse_args(&args(&["-c"])).is_err());
    }

    #[test]
    fn test_render_rejects_config() {
        let err = parse_args(&args(&["render", "req.json", "--config", "x.toml"]))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "--config applies to serve, not render");
    }

    #[test]
    fn test_unknown_argument() {
        assert!(parse_args(&args(&["deploy"])).is_err());
        assert!(matches!(parse_args(&args(&["-v"])).unwrap(), Command::Version));
    }
}
