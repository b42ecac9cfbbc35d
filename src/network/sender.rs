//! VBAN output stream
//!
//! Buffers written bytes and sends them as one packet per flush.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use bytes::{Bytes, BytesMut};
use serde::Serialize;

use crate::codec::{HeaderFactory, PacketFactory};
use crate::config::{AppConfig, NetworkConfig};
use crate::constants::MAX_PAYLOAD_SIZE;
use crate::error::{CodecError, NetworkError, Result};
use crate::network::udp::create_sender_socket;
use crate::protocol::ProtocolTag;

/// Sender statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SenderStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
}

/// Output stream sending packets to a single target
pub struct VbanOutputStream {
    socket: UdpSocket,
    target: SocketAddr,
    factory: PacketFactory,
    buffer: BytesMut,
    flush_on_newline: bool,
    closed: bool,
    stats: SenderStats,
}

impl VbanOutputStream {
    /// Open a stream with default socket settings
    pub fn open(target: SocketAddr, factory: PacketFactory) -> Result<Self> {
        Self::with_config(target, factory, &NetworkConfig::default())
    }

    pub fn with_config(
        target: SocketAddr,
        factory: PacketFactory,
        config: &NetworkConfig,
    ) -> Result<Self> {
        let socket = create_sender_socket(target, config)?;

        tracing::info!(
            "Opened {} output stream to {}",
            factory.protocol().name(),
            target
        );

        Ok(Self {
            socket,
            target,
            factory,
            buffer: BytesMut::with_capacity(MAX_PAYLOAD_SIZE),
            flush_on_newline: false,
            closed: false,
            stats: SenderStats::default(),
        })
    }

    /// Open a Text stream with the default command factory
    ///
    /// Each written line is sent as its own packet.
    pub fn open_text(target: SocketAddr) -> Result<Self> {
        let head = HeaderFactory::default_for(ProtocolTag::Text)?.build()?;
        let mut stream = Self::open(target, PacketFactory::new(head))?;
        stream.flush_on_newline = true;
        Ok(stream)
    }

    /// Open a stream from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let target = config.network.target_socket_addr()?;
        let factory = config.stream.packet_factory()?;
        let mut stream = Self::with_config(target, factory, &config.network)?;
        stream.flush_on_newline = config.stream.flush_on_newline;
        Ok(stream)
    }

    pub fn set_flush_on_newline(&mut self, enabled: bool) {
        self.flush_on_newline = enabled;
    }

    /// Append bytes to the pending packet
    ///
    /// With flush-on-newline enabled every `\n` ends a packet. Size checks
    /// for every resulting packet run before anything is sent, so an
    /// oversized write leaves the buffer untouched.
    ///
    /// A send failure partway through is a partial write: lines before the
    /// failing one have been sent, the failing line and everything after it
    /// are not consumed. `io::Write::write` reports the consumed count.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write_lines(data).1
    }

    /// Buffer `data`, returning how many bytes were consumed and the
    /// first failure
    fn write_lines(&mut self, data: &[u8]) -> (usize, Result<()>) {
        if let Err(e) = self.ensure_open() {
            return (0, Err(e));
        }

        if !self.flush_on_newline {
            let total = self.buffer.len() + data.len();
            if total > MAX_PAYLOAD_SIZE {
                return (0, Err(CodecError::PayloadTooLarge(total).into()));
            }
            self.buffer.extend_from_slice(data);
            return (data.len(), Ok(()));
        }

        let mut pending = self.buffer.len();
        for line in data.split_inclusive(|&b| b == b'\n') {
            let total = pending + line.len();
            if total > MAX_PAYLOAD_SIZE {
                return (0, Err(CodecError::PayloadTooLarge(total).into()));
            }
            pending = if line.ends_with(b"\n") { 0 } else { total };
        }

        let mut consumed = 0;
        for line in data.split_inclusive(|&b| b == b'\n') {
            let mark = self.buffer.len();
            self.buffer.extend_from_slice(line);
            if line.ends_with(b"\n") {
                if let Err(e) = self.send_buffer() {
                    self.buffer.truncate(mark);
                    return (consumed, Err(e));
                }
            }
            consumed += line.len();
        }
        (consumed, Ok(()))
    }

    /// Send pending bytes as one packet
    ///
    /// Does nothing when no bytes are pending. On failure the bytes stay
    /// pending.
    pub fn flush_data(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.send_buffer()
    }

    /// Append `data` to the pending bytes and send everything as one packet
    ///
    /// Always sends, even when both are empty. The combined size is checked
    /// before any I/O, and a failed send leaves the pending bytes as they were.
    pub fn send_data(&mut self, data: impl Into<Bytes>) -> Result<()> {
        self.ensure_open()?;
        let data = data.into();
        let total = self.buffer.len() + data.len();
        if total > MAX_PAYLOAD_SIZE {
            return Err(CodecError::PayloadTooLarge(total).into());
        }

        let mark = self.buffer.len();
        self.buffer.extend_from_slice(&data);
        let result = self.send_buffer();
        if result.is_err() {
            self.buffer.truncate(mark);
        }
        result
    }

    /// Send a text command as one packet
    pub fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_data(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Flush pending bytes and mark the stream closed
    ///
    /// The stream is closed even if the final flush fails.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.flush_data();
        self.closed = true;
        self.buffer.clear();
        tracing::info!("Closed output stream to {}", self.target);
        result
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get the target address
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Get the local address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Get the number of buffered bytes not yet sent
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Get the packet factory
    pub fn factory(&self) -> &PacketFactory {
        &self.factory
    }

    /// Get sender statistics
    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(NetworkError::StreamClosed.into());
        }
        Ok(())
    }

    /// Send the whole buffer as one packet, clearing it only on success
    fn send_buffer(&mut self) -> Result<()> {
        let mut packet = self.factory.create();
        packet.set_data(Bytes::copy_from_slice(&self.buffer))?;
        let bytes = packet.to_bytes()?;

        self.socket
            .send_to(&bytes, self.target)
            .map_err(|e| NetworkError::SendFailed(e.to_string()))?;

        self.stats.packets_sent += 1;
        self.stats.bytes_sent += bytes.len() as u64;
        tracing::trace!(
            "Sent packet #{} ({} bytes) to {}",
            packet.header().frame_counter,
            bytes.len(),
            self.target
        );
        self.buffer.clear();
        Ok(())
    }
}

impl io::Write for VbanOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_lines(buf) {
            (consumed, _) if consumed > 0 => Ok(consumed),
            (_, Err(e)) => Err(io::Error::new(io::ErrorKind::Other, e)),
            (consumed, Ok(())) => Ok(consumed),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_data()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

impl Drop for VbanOutputStream {
    fn drop(&mut self) {
        if self.closed || self.buffer.is_empty() {
            return;
        }
        if let Err(e) = self.flush_data() {
            tracing::warn!("Failed to flush output stream on drop: {}", e);
        }
    }
}
