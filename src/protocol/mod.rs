//! Protocol registry
//!
//! Binds each VBAN sub-protocol to its packed header value, its name and
//! the payload type its trailing bytes decode into.

pub mod payload;

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::PROTOCOL_MASK;
use crate::error::CodecError;

pub use payload::{AudioFrame, MidiCommand, Payload, Utf8Command};

/// VBAN sub-protocol carried in the top bits of header byte 4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolTag {
    Audio,
    Serial,
    Text,
    Service,
}

/// Payload type a protocol is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    AudioFrame,
    MidiCommand,
    Utf8Command,
    Raw,
}

impl ProtocolTag {
    pub const ALL: [ProtocolTag; 4] = [
        ProtocolTag::Audio,
        ProtocolTag::Serial,
        ProtocolTag::Text,
        ProtocolTag::Service,
    ];

    /// Packed value (already shifted into the protocol bits)
    pub const fn value(self) -> u8 {
        match self {
            ProtocolTag::Audio => 0x00,
            ProtocolTag::Serial => 0x20,
            ProtocolTag::Text => 0x40,
            ProtocolTag::Service => 0x60,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ProtocolTag::Audio => "AUDIO",
            ProtocolTag::Serial => "SERIAL",
            ProtocolTag::Text => "TEXT",
            ProtocolTag::Service => "SERVICE",
        }
    }

    /// Look up a protocol by its packed value
    pub fn by_value(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(ProtocolTag::Audio),
            0x20 => Ok(ProtocolTag::Serial),
            0x40 => Ok(ProtocolTag::Text),
            0x60 => Ok(ProtocolTag::Service),
            other => Err(CodecError::UnknownProtocol(other)),
        }
    }

    /// Extract the protocol from header byte 4
    pub fn from_header_byte(byte: u8) -> Result<Self, CodecError> {
        Self::by_value(byte & PROTOCOL_MASK)
    }

    pub const fn payload_kind(self) -> PayloadKind {
        match self {
            ProtocolTag::Audio => PayloadKind::AudioFrame,
            ProtocolTag::Serial => PayloadKind::MidiCommand,
            ProtocolTag::Text => PayloadKind::Utf8Command,
            ProtocolTag::Service => PayloadKind::Raw,
        }
    }

    pub const fn is_audio(self) -> bool {
        matches!(self, ProtocolTag::Audio)
    }

    pub const fn is_serial(self) -> bool {
        matches!(self, ProtocolTag::Serial)
    }

    pub const fn is_text(self) -> bool {
        matches!(self, ProtocolTag::Text)
    }

    pub const fn is_service(self) -> bool {
        matches!(self, ProtocolTag::Service)
    }

    /// Convert trailing packet bytes into this protocol's payload type
    ///
    /// Service payloads have no decoder and are rejected.
    pub fn decode_payload(self, bytes: Bytes) -> Result<Payload, CodecError> {
        match self {
            ProtocolTag::Audio => Ok(Payload::Audio(AudioFrame::from_bytes(bytes))),
            ProtocolTag::Serial => Ok(Payload::Serial(MidiCommand::from_bytes(bytes))),
            ProtocolTag::Text => Ok(Payload::Text(Utf8Command::from_bytes(bytes)?)),
            ProtocolTag::Service => Err(CodecError::UnsupportedProtocol(self)),
        }
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Protocol({:#04x})", self.name(), self.value())
    }
}

/// Registry entry point: decode `bytes` as the payload of `tag`
pub fn decode_payload(tag: ProtocolTag, bytes: Bytes) -> Result<Payload, CodecError> {
    tag.decode_payload(bytes)
}
