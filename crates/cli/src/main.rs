use anyhow::Context;
use clap::Parser;
use ferrous_tap_domain::{CliOverrides, DispatchMode};
use tokio_util::sync::CancellationToken;
use tracing::info;

mod bootstrap;
mod di;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "ferrous-tap")]
#[command(version = "0.1.0")]
#[command(about = "Ferrous Tap - dnstap receiver over Frame Streams")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Unix socket to listen on
    #[arg(short = 's', long, value_name = "PATH")]
    socket: Option<String>,

    /// Content type to require from senders (empty accepts the first offer)
    #[arg(long)]
    content_type: Option<String>,

    /// Record dispatch mode (ordered, concurrent)
    #[arg(long, value_parser = parse_dispatch_mode)]
    dispatch_mode: Option<DispatchMode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Only print records of these message types (repeatable)
    #[arg(short = 't', long = "message-type", value_name = "TYPE")]
    message_types: Vec<String>,
}

fn parse_dispatch_mode(value: &str) -> Result<DispatchMode, String> {
    match value.to_ascii_lowercase().as_str() {
        "ordered" => Ok(DispatchMode::Ordered),
        "concurrent" => Ok(DispatchMode::Concurrent),
        other => Err(format!("unknown dispatch mode '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        socket_path: cli.socket,
        content_type: cli.content_type,
        dispatch_mode: cli.dispatch_mode,
        log_level: cli.log_level,
        message_types: cli.message_types,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config)?;

    info!("Starting Ferrous Tap v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    let listener = di::Pipeline::new(&config)
        .listen(shutdown.clone())
        .with_context(|| format!("Failed to bind {}", config.server.socket_path))?;

    let server = tokio::spawn(listener.run());

    bootstrap::wait_for_shutdown().await;
    info!("Shutdown signal received");
    shutdown.cancel();

    server
        .await
        .context("Listener task failed")?
        .context("Listener stopped with an error")?;

    info!("Receiver shutdown complete");
    Ok(())
}
