use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskd::{config::TaskdConfig, rest, storage::Storage, AppContext};

#[derive(Parser)]
#[command(name = "taskd", about = "Personal task-management service", version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// REST API port
    #[arg(long, env = "TASKD_PORT")]
    port: Option<u16>,

    /// Data directory for config and the SQLite database
    #[arg(long, env = "TASKD_DATA_DIR")]
    data_dir: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "TASKD_LOG")]
    log: Option<String>,

    /// Secret for signing bearer tokens
    #[arg(long, env = "TASKD_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Bind address (default: 127.0.0.1; use 0.0.0.0 for LAN access)
    #[arg(long, env = "TASKD_BIND")]
    bind_address: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server (default when no subcommand given).
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TaskdConfig::load(
        args.port,
        args.data_dir,
        args.log,
        args.jwt_secret,
        args.bind_address,
    )?;

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: TaskdConfig) -> Result<()> {
    config.warn_if_dev_secret();
    info!(data_dir = %config.data_dir.display(), "starting taskd");

    let storage = Arc::new(Storage::new(&config.data_dir).await?);
    let ctx = Arc::new(AppContext::new(Arc::new(config), storage));

    rest::start_rest_server(ctx).await
}
