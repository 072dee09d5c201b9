//! Standalone board server binary
//!
//! Usage: cargo run -p flipcard_web --bin flipcard-server -- boards/perfect.txt

use clap::Parser;
use flipcard_web::config::{self, ServerArgs};
use flipcard_web::{AppContext, ServerConfig, WebServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();
    let resolved = config::load(&args)?;
    let config = resolved.config;

    flipcard_web::init_logging(config.log_format)?;
    tracing::debug!(sources = ?resolved.sources, "configuration resolved");

    let board_path = config
        .board
        .clone()
        .ok_or("no board file configured")?;
    let context = AppContext::from_file(ServerConfig::from(&config), &board_path)?;

    tracing::info!(
        board = %board_path.display(),
        host = %config.host,
        port = config.port,
        flip_timeout_secs = config.flip_timeout_secs,
        "starting board server"
    );

    let handle = WebServer::new(context).start().await?;
    println!("Serving {} at http://{}", board_path.display(), handle.address());
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down board server");
    handle.shutdown().await?;
    Ok(())
}
