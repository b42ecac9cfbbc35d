//! VBAN Receiver
//!
//! Listens for VBAN packets and prints them as log lines, or as JSON
//! objects on stdout with `--json`.
//!
//! Usage: `receiver [port] [--json]`

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vban_stream::{
    config::AppConfig,
    network::{ReceivedPacket, VbanReceiver},
    protocol::Payload,
};

/// One printed packet
#[derive(Serialize)]
struct PacketRecord<'a> {
    #[serde(flatten)]
    packet: &'a ReceivedPacket,
    payload: String,
}

fn describe_payload(packet: &ReceivedPacket) -> String {
    match packet.to_payload() {
        Ok(Payload::Text(command)) => command.into_string(),
        Ok(Payload::Serial(command)) => command.to_string(),
        Ok(Payload::Audio(frame)) => format!("{} bytes of audio", frame.len()),
        Err(e) => format!("<{}>", e),
    }
}

fn print_packet(packet: &ReceivedPacket, json: bool) -> Result<()> {
    let payload = describe_payload(packet);
    if json {
        let record = PacketRecord { packet, payload };
        println!("{}", serde_json::to_string(&record)?);
    } else {
        let header = &packet.header;
        tracing::info!(
            "{} '{}' #{} from {}: {}",
            header.protocol,
            header.stream_name,
            header.frame_counter,
            packet.source,
            payload
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting VBAN receiver");

    let mut config = AppConfig::load_or_default().context("Failed to load config")?;
    let mut json = false;
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            config.network.udp_port = arg
                .parse()
                .with_context(|| format!("Invalid port: {}", arg))?;
        }
    }

    // Create packet channel
    let (packet_tx, packet_rx) = bounded::<ReceivedPacket>(4096);

    let mut receiver = VbanReceiver::new();
    receiver.set_channel(packet_tx);
    receiver.start(&config.network)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut last_stats_time = Instant::now();

    while !shutdown.load(Ordering::Relaxed) && receiver.is_running() {
        while let Ok(packet) = packet_rx.try_recv() {
            print_packet(&packet, json)?;
        }

        // Periodic stats
        if last_stats_time.elapsed() >= Duration::from_secs(5) {
            last_stats_time = Instant::now();

            let stats = receiver.stats();
            tracing::debug!(
                "Receiver stats: {} packets, {} bytes, {} invalid, {} dropped",
                stats.packets_received,
                stats.bytes_received,
                stats.invalid_packets,
                stats.dropped_packets
            );
        }

        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    receiver.stop();
    let stats = receiver.stats();
    tracing::info!(
        "Receiver stats: {} packets, {} bytes, {} invalid",
        stats.packets_received,
        stats.bytes_received,
        stats.invalid_packets
    );
    Ok(())
}
