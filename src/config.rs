//! Configuration
//!
//! Stored as TOML in the platform config directory. Every field has a
//! default, so a partial file is valid.

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::codec::{Codec, HeaderFactory, PacketFactory};
use crate::constants::DEFAULT_PORT;
use crate::error::{CodecError, Error, NetworkError, Result};
use crate::protocol::ProtocolTag;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub stream: StreamConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// `config.toml` inside the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "vban-stream").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default path, or fall back to defaults if no file exists
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address to bind
    pub bind_address: String,
    /// UDP port, used for both binding and the target
    pub udp_port: u16,
    /// Host that output streams send to
    pub target_address: String,
    /// Socket receive buffer size in bytes
    pub recv_buffer_size: usize,
    /// Socket send buffer size in bytes
    pub send_buffer_size: usize,
    /// Read timeout used to poll for close (milliseconds)
    pub read_poll_ms: u64,
    pub reuse_address: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            udp_port: DEFAULT_PORT,
            target_address: "127.0.0.1".to_string(),
            recv_buffer_size: 1024 * 1024, // 1MB
            send_buffer_size: 256 * 1024,
            read_poll_ms: 100,
            reuse_address: true,
        }
    }
}

impl NetworkConfig {
    /// Address to bind receivers to
    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        resolve(&self.bind_address, self.udp_port)
    }

    /// Address output streams send to
    pub fn target_socket_addr(&self) -> Result<SocketAddr> {
        resolve(&self.target_address, self.udp_port)
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::InvalidAddress(format!("{}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| Error::Network(NetworkError::InvalidAddress(format!("{}:{}", host, port))))
}

/// Stream parameters
///
/// Unset fields fall back to the protocol defaults of
/// [`HeaderFactory::default_for`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub protocol: ProtocolTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,
    /// Packed rate index (sample rate for audio, bit rate otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_index: Option<u8>,
    /// Packed format value of the protocol's format table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<Codec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u16>,
    /// Send one datagram per written line
    pub flush_on_newline: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::text()
    }
}

impl StreamConfig {
    /// Text command stream preset
    pub fn text() -> Self {
        Self {
            protocol: ProtocolTag::Text,
            stream_name: None,
            rate_index: None,
            format_value: None,
            codec: None,
            samples: None,
            channel: None,
            flush_on_newline: true,
        }
    }

    /// Audio stream preset
    pub fn audio() -> Self {
        Self {
            protocol: ProtocolTag::Audio,
            flush_on_newline: false,
            ..Self::text()
        }
    }

    /// Build a packet factory from the protocol defaults plus overrides
    pub fn packet_factory(&self) -> std::result::Result<PacketFactory, CodecError> {
        let mut builder = HeaderFactory::default_for(self.protocol)?;
        if let Some(name) = &self.stream_name {
            builder = builder.stream_name(name.clone());
        }
        if let Some(index) = self.rate_index {
            builder = builder.rate_index(index);
        }
        if let Some(value) = self.format_value {
            builder = builder.format_value(value);
        }
        if let Some(codec) = self.codec {
            builder = builder.codec(codec);
        }
        if let Some(samples) = self.samples {
            builder = builder.samples(samples);
        }
        if let Some(channel) = self.channel {
            builder = builder.channel(channel);
        }
        Ok(PacketFactory::new(builder.build()?))
    }
}
