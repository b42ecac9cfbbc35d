//! Error types for the VBAN codec and transport

use std::string::FromUtf8Error;

use thiserror::Error;

use crate::protocol::ProtocolTag;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header, framing and payload errors
///
/// All of these are local to a single packet and never retried.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Bad magic: expected \"VBAN\", got {0:02X?}")]
    BadMagic([u8; 4]),

    #[error("Unknown protocol value: {0:#04x}")]
    UnknownProtocol(u8),

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(ProtocolTag),

    #[error("Unknown rate value: {0}")]
    UnknownRateValue(u8),

    #[error("Unknown format value: {0:#04x}")]
    UnknownFormatValue(u8),

    #[error("Unknown codec: {0:#04x}")]
    UnknownCodec(u8),

    #[error("Field {field} out of range: {value} (expected 0..=255)")]
    FieldOutOfRange { field: &'static str, value: u32 },

    #[error("Stream name too long: {0} bytes (max 16)")]
    StreamNameTooLong(usize),

    #[error("Stream name must be ASCII without NUL bytes")]
    InvalidStreamName,

    #[error("Truncated packet: expected at least {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Packet data already set")]
    DataAlreadySet,

    #[error("Missing header field: {0}")]
    MissingField(&'static str),

    #[error("Invalid text payload: {0}")]
    InvalidText(#[from] FromUtf8Error),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Socket closed")]
    SocketClosed,

    #[error("Stream is closed")]
    StreamClosed,

    #[error("Read timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Protocol mismatch: expected {expected}, received {received}")]
    ProtocolMismatch {
        expected: ProtocolTag,
        received: ProtocolTag,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
