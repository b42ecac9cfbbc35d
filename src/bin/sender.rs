//! VBAN Text Sender
//!
//! Reads command lines from stdin and sends each one as a Text packet.
//!
//! Usage: `sender [target:port] [stream-name]`

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vban_stream::{config::AppConfig, network::VbanOutputStream, protocol::ProtocolTag};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VBAN text sender");

    let mut config = AppConfig::load_or_default().context("Failed to load config")?;

    let mut args = std::env::args().skip(1);
    if let Some(target) = args.next() {
        let target: SocketAddr = target
            .parse()
            .with_context(|| format!("Invalid target address: {}", target))?;
        config.network.target_address = target.ip().to_string();
        config.network.udp_port = target.port();
    }
    if let Some(name) = args.next() {
        config.stream.stream_name = Some(name);
    }
    if config.stream.protocol != ProtocolTag::Text {
        tracing::warn!(
            "Configured protocol is {}, sending text instead",
            config.stream.protocol
        );
        config.stream.protocol = ProtocolTag::Text;
    }

    let mut stream = VbanOutputStream::from_config(&config)?;
    tracing::info!(
        "Sending stdin lines to {} as stream '{}'",
        stream.target(),
        stream.factory().header_factory().stream_name()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let interrupted = loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break false };
                let command = line.trim_end();
                if command.is_empty() {
                    continue;
                }
                if let Err(e) = stream.send_text(command) {
                    tracing::warn!("Failed to send '{}': {}", command, e);
                }
            }
            _ = tokio::signal::ctrl_c() => break true,
        }
    };

    stream.close()?;
    let stats = stream.stats();
    tracing::info!(
        "Sender stats: {} packets, {} bytes",
        stats.packets_sent,
        stats.bytes_sent
    );

    if interrupted {
        // The pending stdin read cannot be cancelled
        std::process::exit(0);
    }
    Ok(())
}
