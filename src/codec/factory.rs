//! Header and packet factories
//!
//! A factory holds the fixed parameters of one logical stream and stamps
//! every header it creates with the next frame counter value.

use parking_lot::Mutex;

use crate::codec::header::{validate_count, validate_stream_name, Header};
use crate::codec::packet::Packet;
use crate::codec::values::{
    AudioFormat, BitsPerSecond, Codec, CommandFormat, DataFormat, DataRate, SampleRate,
};
use crate::error::CodecError;
use crate::protocol::ProtocolTag;

/// Builder for [`HeaderFactory`]
///
/// Rate and format are kept as packed values and resolved through the
/// protocol's tables on [`build`](Self::build), so a table member from a
/// different protocol is accepted when its value exists in the target table.
#[derive(Debug, Clone)]
pub struct HeaderFactoryBuilder {
    protocol: ProtocolTag,
    rate: Option<u8>,
    samples: Option<u16>,
    channel: Option<u16>,
    format: Option<u8>,
    codec: Codec,
    stream_name: String,
}

impl HeaderFactoryBuilder {
    pub fn new(protocol: ProtocolTag) -> Self {
        Self {
            protocol,
            rate: None,
            samples: None,
            channel: None,
            format: None,
            codec: Codec::Pcm,
            stream_name: String::new(),
        }
    }

    pub fn rate(mut self, rate: impl Into<DataRate>) -> Self {
        self.rate = Some(rate.into().value());
        self
    }

    /// Set the raw rate index
    pub fn rate_index(mut self, index: u8) -> Self {
        self.rate = Some(index);
        self
    }

    pub fn samples(mut self, samples: u16) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn channel(mut self, channel: u16) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn format(mut self, format: impl Into<DataFormat>) -> Self {
        self.format = Some(format.into().value());
        self
    }

    /// Set the raw format value
    pub fn format_value(mut self, value: u8) -> Self {
        self.format = Some(value);
        self
    }

    pub fn codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn stream_name(mut self, name: impl Into<String>) -> Self {
        self.stream_name = name.into();
        self
    }

    pub fn protocol(&self) -> ProtocolTag {
        self.protocol
    }

    /// Validate every field and create the factory with its counter at 0
    pub fn build(self) -> Result<HeaderFactory, CodecError> {
        let protocol = self.protocol;
        if protocol.is_service() {
            return Err(CodecError::UnsupportedProtocol(protocol));
        }

        let rate = DataRate::resolve(protocol, self.rate.ok_or(CodecError::MissingField("rate"))?)?;
        let format = DataFormat::resolve(
            protocol,
            self.format.ok_or(CodecError::MissingField("format"))?,
        )?;
        let samples = self.samples.ok_or(CodecError::MissingField("samples"))?;
        let channel = self.channel.ok_or(CodecError::MissingField("channel"))?;
        validate_count("samples", samples)?;
        validate_count("channel", channel)?;
        validate_stream_name(&self.stream_name)?;

        Ok(HeaderFactory {
            protocol,
            rate,
            samples,
            channel,
            format,
            codec: self.codec,
            stream_name: self.stream_name,
            counter: Mutex::new(0),
        })
    }
}

/// Stamps successive headers for one stream
#[derive(Debug)]
pub struct HeaderFactory {
    protocol: ProtocolTag,
    rate: DataRate,
    samples: u16,
    channel: u16,
    format: DataFormat,
    codec: Codec,
    stream_name: String,
    /// Next frame counter value
    counter: Mutex<u32>,
}

impl HeaderFactory {
    pub fn builder(protocol: ProtocolTag) -> HeaderFactoryBuilder {
        HeaderFactoryBuilder::new(protocol)
    }

    /// Builder seeded with the protocol's typical values
    ///
    /// Serial only gets its stream name; rate, format, samples and channel
    /// must be supplied before `build()` succeeds.
    pub fn default_for(protocol: ProtocolTag) -> Result<HeaderFactoryBuilder, CodecError> {
        let builder = HeaderFactoryBuilder::new(protocol);
        match protocol {
            ProtocolTag::Audio => Ok(builder
                .rate(SampleRate::Hz48000)
                .samples(255)
                .channel(2)
                .format(AudioFormat::Int16)
                .codec(Codec::Pcm)
                .stream_name("Stream1")),
            ProtocolTag::Text => Ok(builder
                .rate(BitsPerSecond::Bps256000)
                .samples(0)
                .channel(0)
                // byte-8 data type, value 0
                .format(CommandFormat::Ascii)
                .codec(Codec::Pcm)
                .stream_name("Command1")),
            ProtocolTag::Serial => Ok(builder.stream_name("MIDI1")),
            ProtocolTag::Service => Err(CodecError::UnsupportedProtocol(protocol)),
        }
    }

    /// Create the next header and advance the counter
    pub fn create(&self) -> Header {
        let mut counter = self.counter.lock();
        let header = Header {
            protocol: self.protocol,
            rate: self.rate,
            samples: self.samples,
            channel: self.channel,
            format: self.format,
            codec: self.codec,
            stream_name: self.stream_name.clone(),
            frame_counter: *counter,
        };
        *counter = counter.wrapping_add(1);
        header
    }

    /// Counter value the next header will carry
    pub fn counter(&self) -> u32 {
        *self.counter.lock()
    }

    pub fn protocol(&self) -> ProtocolTag {
        self.protocol
    }

    pub fn rate(&self) -> DataRate {
        self.rate
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

/// Creates packets whose headers come from a [`HeaderFactory`]
#[derive(Debug)]
pub struct PacketFactory {
    head_factory: HeaderFactory,
}

impl PacketFactory {
    pub fn new(head_factory: HeaderFactory) -> Self {
        Self { head_factory }
    }

    /// Create a packet with the next header and no payload yet
    pub fn create(&self) -> Packet {
        Packet::new(self.head_factory.create())
    }

    pub fn counter(&self) -> u32 {
        self.head_factory.counter()
    }

    pub fn protocol(&self) -> ProtocolTag {
        self.head_factory.protocol()
    }

    pub fn header_factory(&self) -> &HeaderFactory {
        &self.head_factory
    }
}

impl From<HeaderFactory> for PacketFactory {
    fn from(head_factory: HeaderFactory) -> Self {
        Self::new(head_factory)
    }
}
