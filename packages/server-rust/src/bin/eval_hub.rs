//! `eval-hub` -- evaluation hub HTTP service.
//!
//! Usage:
//!   eval-hub                                  # config from ./config or .
//!   eval-hub --config-dir /etc/eval-hub       # custom base config location
//!   eval-hub --log-format pretty --port 9090  # local development

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use evalhub_server::config::{BuildInfo, Config, ConfigLoader};
use evalhub_server::http_metrics::install_recorder;
use evalhub_server::logging::{init_tracing, LogFormat};
use evalhub_server::network::lifecycle::{
    termination_file, write_ready_file, write_termination_message,
};
use evalhub_server::network::{AppState, NetworkConfig, NetworkModule};
use evalhub_server::storage::create_storage;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "eval-hub", version, about = "Evaluation hub service")]
struct Cli {
    /// Directories searched, in order, for the required server.yaml
    #[arg(long = "config-dir", env = "EVAL_HUB_CONFIG_DIR", value_delimiter = ',', default_values = ["config", "."])]
    config_dirs: Vec<PathBuf>,

    /// Directories searched, in order, for the optional config.yaml overlay
    #[arg(long = "overlay-dir", env = "EVAL_HUB_OVERLAY_DIR", value_delimiter = ',', default_values = [".", ".."])]
    overlay_dirs: Vec<PathBuf>,

    /// Log output format (defaults to pretty when EVAL_HUB_DEVELOPMENT=true, else json)
    #[arg(long, env = "EVAL_HUB_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormat>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: option_env!("EVAL_HUB_BUILD").unwrap_or_default().to_string(),
        build_date: option_env!("EVAL_HUB_BUILD_DATE")
            .unwrap_or_default()
            .to_string(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = cli.log_format.unwrap_or_else(LogFormat::from_environment);
    if let Err(err) = init_tracing(format) {
        return startup_failed(None, "failed to create service logger", &err);
    }

    let loader = ConfigLoader::new(cli.config_dirs, cli.overlay_dirs);
    let mut config = match loader.load(build_info()) {
        Ok(config) => config,
        Err(err) => {
            return startup_failed(None, "failed to create service config", &err.into());
        }
    };
    if let Some(port) = cli.port {
        config.service.port = port;
    }
    let config = Arc::new(config);

    match run(Arc::clone(&config)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => startup_failed(config.service.termination_file.as_deref(), "server failed", &err),
    }
}

async fn run(config: Arc<Config>) -> anyhow::Result<()> {
    info!(
        version = %config.build.version,
        build = %config.build.build,
        build_date = %config.build.build_date,
        "starting eval-hub"
    );

    let storage = create_storage(&config)
        .await
        .context("failed to create storage")?;
    let metrics = install_recorder().context("failed to install metrics recorder")?;

    let mut state = AppState::new(Arc::clone(&config), Arc::clone(&storage));
    state.metrics = Some(metrics);

    let mut module = NetworkModule::new(NetworkConfig::from(&config.service), state);
    module.start().await.context("failed to bind listener")?;
    if let Some(path) = &config.service.ready_file {
        write_ready_file(path)
            .await
            .with_context(|| format!("failed to write ready file {}", path.display()))?;
    }

    module.serve(shutdown_signal()).await?;

    if let Err(err) = storage.close().await {
        warn!(error = %err, "failed to close storage");
    }
    info!("server shutdown gracefully");
    Ok(())
}

/// Logs the failure, records it in the termination file and picks the exit code.
fn startup_failed(configured: Option<&Path>, message: &str, err: &anyhow::Error) -> ExitCode {
    let text = format!("{message}: {err:#}");
    error!("{text}");
    eprintln!("{text}");
    write_termination_message(&termination_file(configured), &text);
    ExitCode::FAILURE
}

/// Resolves on SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
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
}
