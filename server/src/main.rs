use anyhow::{Context, Result};
use clap::Parser;
use coordinator_server::{config::Config, initialize_app};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "coordinator-server")]
#[command(about = "Agent fleet coordination server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path; falls back to built-in defaults + env vars.
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// `DATABASE_URL` override.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// `SERVICE_PORT` override.
    #[arg(long)]
    port: Option<u16>,

    /// `LOG_LEVEL` override.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    if let Some(database_url) = &cli.database_url {
        config.database.url = Some(database_url.clone());
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(log_level) = &cli.log_level {
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl+c");
        info!("received ctrl+c, shutting down");
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    if let Err(err) = run().await {
        eprintln!("fatal: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).context("failed to load configuration")?;

    coordinator_server::telemetry::init_telemetry(&config.logging)
        .context("failed to initialize telemetry")?;

    config.validate().context("invalid configuration")?;

    info!(address = %config.server_address(), database_url = %config.database_url(), "starting coordinator-server");

    let app = initialize_app(&config).await.context("failed to initialize application")?;

    let listener = tokio::net::TcpListener::bind(&app.address)
        .await
        .with_context(|| format!("failed to bind {}", app.address))?;

    info!(address = %app.address, "coordinator-server is ready");

    axum::serve(
        listener,
        app.router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| {
        error!(error = %e, "server error");
        e
    })?;

    info!("coordinator-server shut down cleanly");
    Ok(())
}
