use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Parser, Subcommand};
use loading_time::LoadingTimeModule;
use loading_time::config::{LoadingTimeConfig, MODULE_NAME};
use mimalloc::MiMalloc;
use shipload_bootstrap::{AppConfig, CliArgs, init_logging, module_config_or_default};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Shipload Server - asynchronous ship loading-time calculation
#[derive(Parser)]
#[command(name = "shipload-server")]
#[command(about = "Shipload Server - asynchronous ship loading-time calculation")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.clone(),
        port: cli.port,
        verbose: cli.verbose,
    };

    // 1) defaults -> 2) YAML (if provided) -> 3) env (APP__*) -> 4) CLI overrides
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    config.apply_cli_overrides(&args)?;

    if cli.print_config {
        println!("Effective configuration:\n{}", render_config(&config)?);
        return Ok(());
    }

    let _log_guard = init_logging(&config.logging)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Shipload Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config.server.socket_addr()?;
    let module_cfg: LoadingTimeConfig = module_config_or_default(config, MODULE_NAME)?;
    module_cfg
        .validate()
        .with_context(|| format!("invalid '{MODULE_NAME}' module config"))?;

    println!("Configuration is valid");
    println!("{}", render_config(config)?);
    Ok(())
}

/// YAML view of the configuration with the module section re-rendered from
/// its typed form, so secrets marked `skip_serializing` never reach stdout.
fn render_config(config: &AppConfig) -> Result<String> {
    let module_cfg: LoadingTimeConfig = module_config_or_default(config, MODULE_NAME)?;
    let mut shown = config.clone();
    shown.modules.insert(
        MODULE_NAME.to_owned(),
        serde_json::json!({ "config": module_cfg }),
    );
    Ok(shown.to_yaml()?)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let module = LoadingTimeModule::from_app_config(&config)?;
    let app = module.register_rest(Router::new());

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "HTTP server listening");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if let Err(e) = shipload_bootstrap::wait_for_shutdown().await {
                tracing::error!(error = %e, "signal handling failed; shutting down");
            }
            cancel.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped; draining calculations");
    module.stop(config.server.shutdown_grace).await;
    tracing::info!("Shipload Server stopped");
    Ok(())
}
