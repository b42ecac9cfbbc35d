//! Header field value tables
//!
//! Every header field other than samples, channel, name and counter is a
//! small closed table with a packed wire value. Byte 4's rate bits and
//! byte 7's format bits mean different things depending on the protocol,
//! so they are exposed as the [`DataRate`] and [`DataFormat`] unions and
//! resolved once against a [`ProtocolTag`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::protocol::ProtocolTag;

/// Declares a field table: the enum, its packed values and the checked
/// inverse lookup that fails with the given error constructor.
macro_rules! field_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident : $err:path {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every member of the table, in wire order
            pub const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            /// Packed value as it appears in the header
            pub const fn value(self) -> u8 {
                match self {
                    $( $name::$variant => $value ),+
                }
            }

            /// Look up a member by its packed value
            pub fn by_value(value: u8) -> Result<Self, CodecError> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|member| member.value() == value)
                    .ok_or_else(|| $err(value))
            }

            /// Member name
            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => stringify!($variant) ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

field_table! {
    /// Sample rate index used by the Audio protocol
    pub enum SampleRate : CodecError::UnknownRateValue {
        Hz6000 = 0,
        Hz12000 = 1,
        Hz24000 = 2,
        Hz48000 = 3,
        Hz96000 = 4,
        Hz192000 = 5,
        Hz384000 = 6,
        Hz8000 = 7,
        Hz16000 = 8,
        Hz32000 = 9,
        Hz64000 = 10,
        Hz128000 = 11,
        Hz256000 = 12,
        Hz512000 = 13,
        Hz11025 = 14,
        Hz22050 = 15,
        Hz44100 = 16,
        Hz88200 = 17,
        Hz176400 = 18,
        Hz352800 = 19,
        Hz705600 = 20,
    }
}

impl SampleRate {
    /// Sample rate in Hz
    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::Hz6000 => 6_000,
            SampleRate::Hz12000 => 12_000,
            SampleRate::Hz24000 => 24_000,
            SampleRate::Hz48000 => 48_000,
            SampleRate::Hz96000 => 96_000,
            SampleRate::Hz192000 => 192_000,
            SampleRate::Hz384000 => 384_000,
            SampleRate::Hz8000 => 8_000,
            SampleRate::Hz16000 => 16_000,
            SampleRate::Hz32000 => 32_000,
            SampleRate::Hz64000 => 64_000,
            SampleRate::Hz128000 => 128_000,
            SampleRate::Hz256000 => 256_000,
            SampleRate::Hz512000 => 512_000,
            SampleRate::Hz11025 => 11_025,
            SampleRate::Hz22050 => 22_050,
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz88200 => 88_200,
            SampleRate::Hz176400 => 176_400,
            SampleRate::Hz352800 => 352_800,
            SampleRate::Hz705600 => 705_600,
        }
    }

    /// Find the table entry for a rate in Hz
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|rate| rate.hz() == hz)
    }
}

field_table! {
    /// Bit rate index used by the Serial and Text protocols
    pub enum BitsPerSecond : CodecError::UnknownRateValue {
        Bps0 = 0,
        Bps110 = 1,
        Bps150 = 2,
        Bps300 = 3,
        Bps600 = 4,
        Bps1200 = 5,
        Bps2400 = 6,
        Bps4800 = 7,
        Bps9600 = 8,
        Bps14400 = 9,
        Bps19200 = 10,
        Bps31250 = 11,
        Bps38400 = 12,
        Bps57600 = 13,
        Bps115200 = 14,
        Bps128000 = 15,
        Bps230400 = 16,
        Bps250000 = 17,
        Bps256000 = 18,
        Bps460800 = 19,
        Bps921600 = 20,
        Bps1000000 = 21,
        Bps1500000 = 22,
        Bps2000000 = 23,
        Bps3000000 = 24,
    }
}

impl BitsPerSecond {
    /// Bit rate in bits per second
    pub const fn bps(self) -> u32 {
        match self {
            BitsPerSecond::Bps0 => 0,
            BitsPerSecond::Bps110 => 110,
            BitsPerSecond::Bps150 => 150,
            BitsPerSecond::Bps300 => 300,
            BitsPerSecond::Bps600 => 600,
            BitsPerSecond::Bps1200 => 1_200,
            BitsPerSecond::Bps2400 => 2_400,
            BitsPerSecond::Bps4800 => 4_800,
            BitsPerSecond::Bps9600 => 9_600,
            BitsPerSecond::Bps14400 => 14_400,
            BitsPerSecond::Bps19200 => 19_200,
            BitsPerSecond::Bps31250 => 31_250,
            BitsPerSecond::Bps38400 => 38_400,
            BitsPerSecond::Bps57600 => 57_600,
            BitsPerSecond::Bps115200 => 115_200,
            BitsPerSecond::Bps128000 => 128_000,
            BitsPerSecond::Bps230400 => 230_400,
            BitsPerSecond::Bps250000 => 250_000,
            BitsPerSecond::Bps256000 => 256_000,
            BitsPerSecond::Bps460800 => 460_800,
            BitsPerSecond::Bps921600 => 921_600,
            BitsPerSecond::Bps1000000 => 1_000_000,
            BitsPerSecond::Bps1500000 => 1_500_000,
            BitsPerSecond::Bps2000000 => 2_000_000,
            BitsPerSecond::Bps3000000 => 3_000_000,
        }
    }
}

field_table! {
    /// Sample format used by the Audio protocol
    pub enum AudioFormat : CodecError::UnknownFormatValue {
        Byte8 = 0x00,
        Int16 = 0x01,
        Int24 = 0x02,
        Int32 = 0x03,
        Float32 = 0x04,
        Float64 = 0x05,
        Bits12 = 0x06,
        Bits10 = 0x07,
    }
}

impl AudioFormat {
    /// Bytes per sample, `None` for the packed 12/10 bit formats
    pub const fn bytes_per_sample(self) -> Option<usize> {
        match self {
            AudioFormat::Byte8 => Some(1),
            AudioFormat::Int16 => Some(2),
            AudioFormat::Int24 => Some(3),
            AudioFormat::Int32 | AudioFormat::Float32 => Some(4),
            AudioFormat::Float64 => Some(8),
            AudioFormat::Bits12 | AudioFormat::Bits10 => None,
        }
    }
}

field_table! {
    /// Data format used by the Serial protocol
    pub enum SerialFormat : CodecError::UnknownFormatValue {
        Byte8 = 0x00,
    }
}

field_table! {
    /// Text encoding used by the Text protocol
    ///
    /// Packed by ordinal into the format bits so that it never overlaps
    /// the codec nibble.
    pub enum CommandFormat : CodecError::UnknownFormatValue {
        Ascii = 0x00,
        Utf8 = 0x01,
        Wchar = 0x02,
    }
}

field_table! {
    /// Codec nibble (bits 4-7 of byte 7)
    pub enum Codec : CodecError::UnknownCodec {
        Pcm = 0x00,
        /// VB-Audio AOIP codec
        Vbca = 0x10,
        /// VB-Audio VOIP codec
        Vbcv = 0x20,
        User = 0xF0,
    }
}

impl Default for Codec {
    fn default() -> Self {
        Codec::Pcm
    }
}

/// Rate bits of header byte 4, keyed by protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataRate {
    /// Audio protocol
    Sample(SampleRate),
    /// Serial and Text protocols
    Bits(BitsPerSecond),
}

impl DataRate {
    /// Resolve a packed rate index through the protocol's table
    pub fn resolve(protocol: ProtocolTag, index: u8) -> Result<Self, CodecError> {
        match protocol {
            ProtocolTag::Audio => SampleRate::by_value(index).map(DataRate::Sample),
            ProtocolTag::Serial | ProtocolTag::Text => {
                BitsPerSecond::by_value(index).map(DataRate::Bits)
            }
            ProtocolTag::Service => Err(CodecError::UnsupportedProtocol(protocol)),
        }
    }

    /// Packed rate index
    pub const fn value(self) -> u8 {
        match self {
            DataRate::Sample(rate) => rate.value(),
            DataRate::Bits(rate) => rate.value(),
        }
    }

    /// Whether this member belongs to the protocol's rate table
    pub fn belongs_to(self, protocol: ProtocolTag) -> bool {
        matches!(
            (self, protocol),
            (DataRate::Sample(_), ProtocolTag::Audio)
                | (DataRate::Bits(_), ProtocolTag::Serial | ProtocolTag::Text)
        )
    }

    pub fn as_sample_rate(self) -> Option<SampleRate> {
        match self {
            DataRate::Sample(rate) => Some(rate),
            DataRate::Bits(_) => None,
        }
    }

    pub fn as_bits_per_second(self) -> Option<BitsPerSecond> {
        match self {
            DataRate::Bits(rate) => Some(rate),
            DataRate::Sample(_) => None,
        }
    }
}

impl From<SampleRate> for DataRate {
    fn from(rate: SampleRate) -> Self {
        DataRate::Sample(rate)
    }
}

impl From<BitsPerSecond> for DataRate {
    fn from(rate: BitsPerSecond) -> Self {
        DataRate::Bits(rate)
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRate::Sample(rate) => write!(f, "{} Hz", rate.hz()),
            DataRate::Bits(rate) => write!(f, "{} bps", rate.bps()),
        }
    }
}

/// Format bits of header byte 7, keyed by protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    Audio(AudioFormat),
    Serial(SerialFormat),
    Command(CommandFormat),
}

impl DataFormat {
    /// Resolve a packed format value through the protocol's table
    pub fn resolve(protocol: ProtocolTag, value: u8) -> Result<Self, CodecError> {
        match protocol {
            ProtocolTag::Audio => AudioFormat::by_value(value).map(DataFormat::Audio),
            ProtocolTag::Serial => SerialFormat::by_value(value).map(DataFormat::Serial),
            ProtocolTag::Text => CommandFormat::by_value(value).map(DataFormat::Command),
            ProtocolTag::Service => Err(CodecError::UnsupportedProtocol(protocol)),
        }
    }

    /// Packed format value
    pub const fn value(self) -> u8 {
        match self {
            DataFormat::Audio(format) => format.value(),
            DataFormat::Serial(format) => format.value(),
            DataFormat::Command(format) => format.value(),
        }
    }

    /// Whether this member belongs to the protocol's format table
    pub fn belongs_to(self, protocol: ProtocolTag) -> bool {
        matches!(
            (self, protocol),
            (DataFormat::Audio(_), ProtocolTag::Audio)
                | (DataFormat::Serial(_), ProtocolTag::Serial)
                | (DataFormat::Command(_), ProtocolTag::Text)
        )
    }

    pub fn as_audio_format(self) -> Option<AudioFormat> {
        match self {
            DataFormat::Audio(format) => Some(format),
            _ => None,
        }
    }

    pub fn as_command_format(self) -> Option<CommandFormat> {
        match self {
            DataFormat::Command(format) => Some(format),
            _ => None,
        }
    }
}

impl From<AudioFormat> for DataFormat {
    fn from(format: AudioFormat) -> Self {
        DataFormat::Audio(format)
    }
}

impl From<SerialFormat> for DataFormat {
    fn from(format: SerialFormat) -> Self {
        DataFormat::Serial(format)
    }
}

impl From<CommandFormat> for DataFormat {
    fn from(format: CommandFormat) -> Self {
        DataFormat::Command(format)
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Audio(format) => write!(f, "{}", format),
            DataFormat::Serial(format) => write!(f, "{}", format),
            DataFormat::Command(format) => write!(f, "{}", format),
        }
    }
}
