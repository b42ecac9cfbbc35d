//! # VBAN Stream
//!
//! Packet codec and thin UDP transport for the VBAN streaming protocol
//! (audio, MIDI/serial, text commands) between networked endpoints.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────── SENDER ─────────────────────────────────┐
//! │                                                                         │
//! │  caller bytes ──► VbanOutputStream (network::sender)                    │
//! │                        │  buffer, flush on newline / explicit flush     │
//! │                        ▼                                                │
//! │                   PacketFactory (codec::factory)                        │
//! │                        │  fixed stream params + frame counter           │
//! │                        ▼                                                │
//! │                   encode_header (codec::header) ── 28 bytes             │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   assemble_packet (codec::packet) ── ≤ 1436 bytes       │
//! └────────────────────────┼────────────────────────────────────────────────┘
//!                          │ one UDP datagram = one packet
//!                          ▼
//! ┌────────────────────────┼──────────── RECEIVER ──────────────────────────┐
//! │                   VbanInputStream / VbanReceiver (network::receiver)    │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   split_packet ──► decode_header ──► ProtocolTag        │
//! │                                                          │              │
//! │                                                          ▼              │
//! │                                       decode_payload (protocol)         │
//! │                                   AudioFrame | MidiCommand | Utf8Command│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire layout
//!
//! ```text
//! offset  size  field
//!  0..4     4   "VBAN"
//!  4        1   protocol (bits 5-7) | rate index (bits 0-4)
//!  5        1   samples - 1
//!  6        1   channel - 1
//!  7        1   format (bits 0-2) | codec (bits 4-7)
//!  8..24   16   stream name, ASCII, NUL padded
//! 24..28    4   frame counter, big endian
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;

pub use codec::{
    assemble_packet, decode_header, encode_header, split_packet, DecodedPacket, Header,
    HeaderFactory, Packet, PacketFactory,
};
pub use config::{AppConfig, NetworkConfig, StreamConfig};
pub use error::{CodecError, Error, NetworkError, Result};
pub use protocol::{Payload, ProtocolTag};

/// Protocol-wide constants
pub mod constants {
    /// Magic bytes opening every header
    pub const MAGIC: [u8; 4] = *b"VBAN";

    /// Fixed header size in bytes
    pub const HEADER_SIZE: usize = 28;

    /// Maximum size of a whole packet (header + payload)
    pub const MAX_SIZE: usize = 1436;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = MAX_SIZE - HEADER_SIZE;

    /// Size of the stream name field
    pub const STREAM_NAME_SIZE: usize = 16;

    /// Default UDP port for VBAN
    pub const DEFAULT_PORT: u16 = 6980;

    /// Protocol bits of header byte 4
    pub const PROTOCOL_MASK: u8 = 0xE0;

    /// Rate index bits of header byte 4
    pub const RATE_MASK: u8 = 0x1F;

    /// Format bits of header byte 7
    pub const FORMAT_MASK: u8 = 0x07;

    /// Codec bits of header byte 7
    pub const CODEC_MASK: u8 = 0xF0;
}
