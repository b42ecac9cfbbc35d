//! VBAN input stream and background receiver

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;

use crate::codec::{DecodedPacket, Header};
use crate::config::NetworkConfig;
use crate::constants::MAX_SIZE;
use crate::error::{CodecError, Error, NetworkError, Result};
use crate::network::udp::create_socket;
use crate::protocol::{Payload, ProtocolTag};

/// Receive buffer length; one byte over the limit so oversized datagrams are detected
const RECV_BUFFER_SIZE: usize = MAX_SIZE + 1;

fn is_poll_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

/// Closes an input stream from another thread
#[derive(Debug, Clone)]
pub struct CloseHandle {
    closed: Arc<AtomicBool>,
}

impl CloseHandle {
    /// Close the stream; a blocked read returns `SocketClosed` within one poll interval
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Blocking input stream expecting a single protocol
pub struct VbanInputStream {
    socket: UdpSocket,
    expected: ProtocolTag,
    buffer: Vec<u8>,
    closed: Arc<AtomicBool>,
    read_timeout: Option<Duration>,
}

impl VbanInputStream {
    /// Bind to `addr` with default socket settings
    pub fn open(expected: ProtocolTag, addr: SocketAddr) -> Result<Self> {
        Self::bind(expected, addr, &NetworkConfig::default())
    }

    /// Bind to the configured address and port
    pub fn from_config(expected: ProtocolTag, config: &NetworkConfig) -> Result<Self> {
        Self::bind(expected, config.bind_socket_addr()?, config)
    }

    pub fn bind(expected: ProtocolTag, addr: SocketAddr, config: &NetworkConfig) -> Result<Self> {
        let socket = create_socket(addr, config)?;
        socket.set_read_timeout(Some(Duration::from_millis(config.read_poll_ms.max(1))))?;

        tracing::info!("Opened {} input stream on {}", expected.name(), socket.local_addr()?);

        Ok(Self {
            socket,
            expected,
            buffer: vec![0u8; RECV_BUFFER_SIZE],
            closed: Arc::new(AtomicBool::new(false)),
            read_timeout: None,
        })
    }

    /// Limit how long a read waits for a datagram; `None` waits until closed
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Receive and decode the next packet of any protocol
    pub fn read_packet(&mut self) -> Result<DecodedPacket> {
        let started = Instant::now();
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(NetworkError::SocketClosed.into());
            }

            match self.socket.recv_from(&mut self.buffer) {
                Ok((len, _source)) => {
                    return Ok(DecodedPacket::decode(&self.buffer[..len])?);
                }
                Err(e) if is_poll_timeout(&e) => {
                    if let Some(timeout) = self.read_timeout {
                        if started.elapsed() >= timeout {
                            return Err(NetworkError::Timeout(timeout).into());
                        }
                    }
                }
                Err(e) => return Err(NetworkError::ReceiveFailed(e.to_string()).into()),
            }
        }
    }

    /// Receive the next packet and convert its payload
    ///
    /// A packet of another protocol fails with `ProtocolMismatch`.
    pub fn read_data(&mut self) -> Result<Payload> {
        let packet = self.read_packet()?;
        let received = packet.header.protocol;
        if received != self.expected {
            return Err(NetworkError::ProtocolMismatch {
                expected: self.expected,
                received,
            }
            .into());
        }
        Ok(packet.into_payload()?)
    }

    /// Handle for closing this stream from another thread
    pub fn close_handle(&self) -> CloseHandle {
        CloseHandle {
            closed: self.closed.clone(),
        }
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("Closed {} input stream", self.expected.name());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn expected_protocol(&self) -> ProtocolTag {
        self.expected
    }

    /// Get the local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

/// A decoded packet delivered by [`VbanReceiver`]
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedPacket {
    pub source: SocketAddr,
    pub header: Header,
    #[serde(skip)]
    pub payload: Bytes,
    pub received_at: DateTime<Utc>,
}

impl ReceivedPacket {
    /// Convert the payload through the protocol registry
    pub fn to_payload(&self) -> std::result::Result<Payload, CodecError> {
        self.header.protocol.decode_payload(self.payload.clone())
    }
}

/// Receiver statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiverStats {
    pub packets_received: u64,
    pub bytes_received: u64,
    pub invalid_packets: u64,
    pub dropped_packets: u64,
}

#[derive(Debug, Default)]
struct ReceiverCounters {
    packets_received: AtomicU64,
    bytes_received: AtomicU64,
    invalid_packets: AtomicU64,
    dropped_packets: AtomicU64,
}

/// Background receiver thread feeding decoded packets into a channel
pub struct VbanReceiver {
    running: Arc<AtomicBool>,
    counters: Arc<ReceiverCounters>,
    channel: Option<Sender<ReceivedPacket>>,
    local_addr: Option<SocketAddr>,
    handle: Option<JoinHandle<()>>,
}

impl VbanReceiver {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(ReceiverCounters::default()),
            channel: None,
            local_addr: None,
            handle: None,
        }
    }

    /// Set the channel decoded packets are delivered to
    pub fn set_channel(&mut self, tx: Sender<ReceivedPacket>) {
        self.channel = Some(tx);
    }

    /// Start receiving on the configured address
    pub fn start(&mut self, config: &NetworkConfig) -> Result<()> {
        self.start_on(config.bind_socket_addr()?, config)
    }

    /// Start receiving on `addr`
    pub fn start_on(&mut self, addr: SocketAddr, config: &NetworkConfig) -> Result<()> {
        if self.running.load(Ordering::Relaxed) {
            return Ok(());
        }
        let tx = self
            .channel
            .clone()
            .ok_or_else(|| Error::Config("receiver packet channel not set".to_string()))?;

        let socket = create_socket(addr, config)?;
        socket.set_read_timeout(Some(Duration::from_millis(config.read_poll_ms.max(1))))?;
        let local_addr = socket.local_addr()?;

        self.running.store(true, Ordering::Relaxed);
        let running = self.running.clone();
        let counters = self.counters.clone();

        let handle = thread::Builder::new()
            .name("vban-receiver".to_string())
            .spawn(move || receive_loop(socket, tx, running, counters))?;

        self.local_addr = Some(local_addr);
        self.handle = Some(handle);
        tracing::info!("VBAN receiver listening on {}", local_addr);
        Ok(())
    }

    /// Stop the receiver thread and wait for it to exit
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("VBAN receiver thread panicked");
            }
            tracing::info!("VBAN receiver stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get the bound address once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Get receiver statistics
    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            packets_received: self.counters.packets_received.load(Ordering::Relaxed),
            bytes_received: self.counters.bytes_received.load(Ordering::Relaxed),
            invalid_packets: self.counters.invalid_packets.load(Ordering::Relaxed),
            dropped_packets: self.counters.dropped_packets.load(Ordering::Relaxed),
        }
    }
}

impl Default for VbanReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VbanReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pause after a failed receive
const ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Consecutive receive failures before the loop gives up
const MAX_CONSECUTIVE_ERRORS: u32 = 50;

/// Tracks consecutive socket errors in the receive loop
#[derive(Debug, Default)]
struct ErrorBackoff {
    consecutive: u32,
}

impl ErrorBackoff {
    /// Record a failure; `None` means the loop should stop
    fn record(&mut self) -> Option<Duration> {
        self.consecutive += 1;
        if self.consecutive >= MAX_CONSECUTIVE_ERRORS {
            None
        } else {
            Some(ERROR_BACKOFF)
        }
    }

    fn reset(&mut self) {
        self.consecutive = 0;
    }
}

fn receive_loop(
    socket: UdpSocket,
    tx: Sender<ReceivedPacket>,
    running: Arc<AtomicBool>,
    counters: Arc<ReceiverCounters>,
) {
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
    let mut backoff = ErrorBackoff::default();

    while running.load(Ordering::Relaxed) {
        let (len, source) = match socket.recv_from(&mut buffer) {
            Ok(received) => received,
            Err(e) if is_poll_timeout(&e) => {
                backoff.reset();
                continue;
            }
            Err(e) => match backoff.record() {
                Some(pause) => {
                    tracing::warn!("Receive error: {}", e);
                    thread::sleep(pause);
                    continue;
                }
                None => {
                    tracing::error!(
                        "Receive failed {} times in a row, stopping receiver: {}",
                        MAX_CONSECUTIVE_ERRORS,
                        e
                    );
                    break;
                }
            },
        };
        backoff.reset();

        counters.packets_received.fetch_add(1, Ordering::Relaxed);
        counters.bytes_received.fetch_add(len as u64, Ordering::Relaxed);

        let packet = match DecodedPacket::decode(&buffer[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                counters.invalid_packets.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Dropped invalid datagram from {}: {}", source, e);
                continue;
            }
        };

        let received = ReceivedPacket {
            source,
            header: packet.header,
            payload: packet.payload,
            received_at: Utc::now(),
        };

        match tx.try_send(received) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                counters.dropped_packets.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("Packet channel closed, stopping receiver");
                break;
            }
        }
    }

    running.store(false, Ordering::Relaxed);
}
