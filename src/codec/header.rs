//! Header codec
//!
//! Encodes and decodes the fixed 28-byte VBAN header:
//!
//! ```text
//! ┌──────┬──────────┬─────────┬─────────┬──────────────┬──────────────┬─────────┐
//! │"VBAN"│ proto|sr │ samples │ channel │ format|codec │ stream name  │ counter │
//! │  4   │    1     │    1    │    1    │      1       │     16       │  4 BE   │
//! └──────┴──────────┴─────────┴─────────┴──────────────┴──────────────┴─────────┘
//! ```
//!
//! Samples and channel are carried as `value - 1`. Rate and format bits are
//! resolved through the table selected by the protocol.

use serde::Serialize;

use crate::codec::values::{Codec, DataFormat, DataRate};
use crate::constants::{
    CODEC_MASK, FORMAT_MASK, HEADER_SIZE, MAGIC, RATE_MASK, STREAM_NAME_SIZE,
};
use crate::error::CodecError;
use crate::protocol::ProtocolTag;

const NAME_OFFSET: usize = 8;
const COUNTER_OFFSET: usize = NAME_OFFSET + STREAM_NAME_SIZE;

/// A VBAN packet header
///
/// `rate` and `format` must be members of the tables `protocol` selects;
/// [`encode_header`] rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub protocol: ProtocolTag,
    pub rate: DataRate,
    /// Samples per frame, 1..=255 on the wire (0 is sent as 1)
    ///
    /// Wire byte `0xFF` decodes to 256, which [`encode_header`] rejects, so
    /// such a decoded header cannot be re-encoded as is.
    pub samples: u16,
    /// Channel count, 1..=255 on the wire (0 is sent as 1)
    ///
    /// Decodes to 256 for wire byte `0xFF`, with the same re-encode limit as
    /// `samples`.
    pub channel: u16,
    pub format: DataFormat,
    pub codec: Codec,
    pub stream_name: String,
    pub frame_counter: u32,
}

impl Header {
    /// Encode into the 28-byte wire form
    pub fn encode(&self) -> Result<[u8; HEADER_SIZE], CodecError> {
        encode_header(self)
    }

    /// Decode from the 28-byte wire form
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, CodecError> {
        decode_header(bytes)
    }
}

/// Check a stream name fits the 16-byte ASCII field
pub fn validate_stream_name(name: &str) -> Result<(), CodecError> {
    if name.len() > STREAM_NAME_SIZE {
        return Err(CodecError::StreamNameTooLong(name.len()));
    }
    if !name.is_ascii() || name.bytes().any(|b| b == 0) {
        return Err(CodecError::InvalidStreamName);
    }
    Ok(())
}

/// Check a samples/channel value fits the one-byte field
pub fn validate_count(field: &'static str, value: u16) -> Result<(), CodecError> {
    if value > u8::MAX as u16 {
        return Err(CodecError::FieldOutOfRange {
            field,
            value: value as u32,
        });
    }
    Ok(())
}

fn pack_count(field: &'static str, value: u16) -> Result<u8, CodecError> {
    validate_count(field, value)?;
    Ok((value as u8).saturating_sub(1))
}

/// Encode a header into exactly [`HEADER_SIZE`] bytes
pub fn encode_header(header: &Header) -> Result<[u8; HEADER_SIZE], CodecError> {
    let protocol = header.protocol;
    if protocol.is_service() {
        return Err(CodecError::UnsupportedProtocol(protocol));
    }
    if !header.rate.belongs_to(protocol) {
        return Err(CodecError::UnknownRateValue(header.rate.value()));
    }
    if !header.format.belongs_to(protocol) {
        return Err(CodecError::UnknownFormatValue(header.format.value()));
    }
    validate_stream_name(&header.stream_name)?;

    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&MAGIC);
    buf[4] = protocol.value() | (header.rate.value() & RATE_MASK);
    buf[5] = pack_count("samples", header.samples)?;
    buf[6] = pack_count("channel", header.channel)?;
    buf[7] = (header.format.value() & FORMAT_MASK) | header.codec.value();

    let name = header.stream_name.as_bytes();
    buf[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);

    buf[COUNTER_OFFSET..HEADER_SIZE].copy_from_slice(&header.frame_counter.to_be_bytes());
    Ok(buf)
}

/// Decode and validate a header
pub fn decode_header(bytes: &[u8; HEADER_SIZE]) -> Result<Header, CodecError> {
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != MAGIC {
        return Err(CodecError::BadMagic(magic));
    }

    let protocol = ProtocolTag::from_header_byte(bytes[4])?;
    if protocol.is_service() {
        return Err(CodecError::UnsupportedProtocol(protocol));
    }

    let rate = DataRate::resolve(protocol, bytes[4] & RATE_MASK)?;
    let samples = bytes[5] as u16 + 1;
    let channel = bytes[6] as u16 + 1;
    let format = DataFormat::resolve(protocol, bytes[7] & FORMAT_MASK)?;
    let codec = Codec::by_value(bytes[7] & CODEC_MASK)?;

    // NUL terminated, or the full 16 bytes when unterminated
    let name_field = &bytes[NAME_OFFSET..COUNTER_OFFSET];
    let name_len = name_field
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(STREAM_NAME_SIZE);
    let name = &name_field[..name_len];
    if !name.is_ascii() {
        return Err(CodecError::InvalidStreamName);
    }
    let stream_name = name.iter().map(|&b| b as char).collect();

    let frame_counter = u32::from_be_bytes([
        bytes[COUNTER_OFFSET],
        bytes[COUNTER_OFFSET + 1],
        bytes[COUNTER_OFFSET + 2],
        bytes[COUNTER_OFFSET + 3],
    ]);

    Ok(Header {
        protocol,
        rate,
        samples,
        channel,
        format,
        codec,
        stream_name,
        frame_counter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::values::{
        AudioFormat, BitsPerSecond, CommandFormat, SampleRate, SerialFormat,
    };
    use proptest::prelude::*;

    fn text_header() -> Header {
        Header {
            protocol: ProtocolTag::Text,
            rate: BitsPerSecond::Bps150.into(),
            samples: 8,
            channel: 5,
            format: CommandFormat::Utf8.into(),
            codec: Codec::Vbca,
            stream_name: "Textstream".to_string(),
            frame_counter: 0x0102_0304,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_header(&text_header()).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"VBAN");
        assert_eq!(bytes[4], 0x40 | 2);
        assert_eq!(bytes[5], 7);
        assert_eq!(bytes[6], 4);
        assert_eq!(bytes[7], 0x10 | 0x01);
        assert_eq!(&bytes[8..18], b"Textstream");
        assert!(bytes[18..24].iter().all(|&b| b == 0));
        assert_eq!(&bytes[24..28], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_text_header_round_trip() {
        let header = text_header();
        let decoded = decode_header(&encode_header(&header).unwrap()).unwrap();

        assert_eq!(decoded.rate, DataRate::Bits(BitsPerSecond::Bps150));
        assert_eq!(decoded.format, DataFormat::Command(CommandFormat::Utf8));
        assert_eq!(decoded.channel, 5);
        assert_eq!(decoded.samples, 8);
        assert_eq!(decoded.codec, Codec::Vbca);
        assert_eq!(decoded.stream_name, "Textstream");
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_count_offset_by_one() {
        let mut header = text_header();
        header.samples = 1;
        header.channel = 255;
        let bytes = encode_header(&header).unwrap();
        assert_eq!(bytes[5], 0x00);
        assert_eq!(bytes[6], 0xFE);

        // Zero is carried as the lowest wire value
        header.samples = 0;
        assert_eq!(encode_header(&header).unwrap()[5], 0x00);
    }

    #[test]
    fn test_count_out_of_range() {
        let mut header = text_header();
        header.samples = 256;
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::FieldOutOfRange { field: "samples", value: 256 })
        ));

        let mut header = text_header();
        header.channel = 300;
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::FieldOutOfRange { field: "channel", .. })
        ));
    }

    #[test]
    fn test_decoded_max_count_not_reencodable() {
        let mut bytes = encode_header(&text_header()).unwrap();
        bytes[5] = 0xFF;
        bytes[6] = 0xFF;

        let decoded = decode_header(&bytes).unwrap();
        assert_eq!(decoded.samples, 256);
        assert_eq!(decoded.channel, 256);
        assert!(matches!(
            encode_header(&decoded),
            Err(CodecError::FieldOutOfRange { field: "samples", value: 256 })
        ));
    }

    #[test]
    fn test_stream_name_limits() {
        let mut header = text_header();
        header.stream_name = "exactly16bytes!!".to_string();
        let decoded = decode_header(&encode_header(&header).unwrap()).unwrap();
        assert_eq!(decoded.stream_name, "exactly16bytes!!");

        header.stream_name = "seventeen bytes!!".to_string();
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::StreamNameTooLong(17))
        ));

        header.stream_name = "Strömung".to_string();
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::InvalidStreamName)
        ));
    }

    #[test]
    fn test_stream_name_stops_at_nul() {
        let mut bytes = encode_header(&text_header()).unwrap();
        bytes[8..24].copy_from_slice(b"abc\0garbage\0\0\0\0\0");
        assert_eq!(decode_header(&bytes).unwrap().stream_name, "abc");
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode_header(&text_header()).unwrap();
        bytes[0..4].copy_from_slice(b"VBAX");
        assert!(matches!(
            decode_header(&bytes),
            Err(CodecError::BadMagic(m)) if &m == b"VBAX"
        ));
    }

    #[test]
    fn test_service_rejected() {
        let mut bytes = encode_header(&text_header()).unwrap();
        bytes[4] = 0x60;
        assert!(matches!(
            decode_header(&bytes),
            Err(CodecError::UnsupportedProtocol(ProtocolTag::Service))
        ));

        let mut header = text_header();
        header.protocol = ProtocolTag::Service;
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::UnsupportedProtocol(ProtocolTag::Service))
        ));
    }

    #[test]
    fn test_unknown_protocol_bits() {
        let mut bytes = encode_header(&text_header()).unwrap();
        bytes[4] = 0x80;
        assert!(matches!(
            decode_header(&bytes),
            Err(CodecError::UnknownProtocol(0x80))
        ));
    }

    #[test]
    fn test_unknown_rate_index() {
        let mut bytes = encode_header(&text_header()).unwrap();
        // Audio has 21 rates, index 21 is out of table
        bytes[4] = 21;
        bytes[7] = 0x01;
        assert!(matches!(
            decode_header(&bytes),
            Err(CodecError::UnknownRateValue(21))
        ));
    }

    #[test]
    fn test_rate_index_above_seven() {
        let header = Header {
            protocol: ProtocolTag::Audio,
            rate: SampleRate::Hz44100.into(),
            samples: 255,
            channel: 2,
            format: AudioFormat::Int16.into(),
            codec: Codec::Pcm,
            stream_name: "Stream1".to_string(),
            frame_counter: 7,
        };
        let bytes = encode_header(&header).unwrap();
        assert_eq!(bytes[4], 16);
        assert_eq!(decode_header(&bytes).unwrap(), header);
    }

    #[test]
    fn test_unknown_format_and_codec() {
        let mut bytes = encode_header(&text_header()).unwrap();
        bytes[7] = 0x03;
        assert!(matches!(
            decode_header(&bytes),
            Err(CodecError::UnknownFormatValue(3))
        ));

        bytes[7] = 0x30;
        assert!(matches!(
            decode_header(&bytes),
            Err(CodecError::UnknownCodec(0x30))
        ));
    }

    #[test]
    fn test_mismatched_table_rejected_on_encode() {
        let mut header = text_header();
        header.rate = SampleRate::Hz48000.into();
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::UnknownRateValue(3))
        ));

        let mut header = text_header();
        header.format = SerialFormat::Byte8.into();
        assert!(matches!(
            encode_header(&header),
            Err(CodecError::UnknownFormatValue(0))
        ));
    }

    fn arb_header() -> impl Strategy<Value = Header> {
        prop::sample::select(vec![ProtocolTag::Audio, ProtocolTag::Serial, ProtocolTag::Text])
            .prop_flat_map(|protocol| {
                let rate = match protocol {
                    ProtocolTag::Audio => prop::sample::select(SampleRate::ALL.to_vec())
                        .prop_map(DataRate::from)
                        .boxed(),
                    _ => prop::sample::select(BitsPerSecond::ALL.to_vec())
                        .prop_map(DataRate::from)
                        .boxed(),
                };
                let format = match protocol {
                    ProtocolTag::Audio => prop::sample::select(AudioFormat::ALL.to_vec())
                        .prop_map(DataFormat::from)
                        .boxed(),
                    ProtocolTag::Serial => prop::sample::select(SerialFormat::ALL.to_vec())
                        .prop_map(DataFormat::from)
                        .boxed(),
                    _ => prop::sample::select(CommandFormat::ALL.to_vec())
                        .prop_map(DataFormat::from)
                        .boxed(),
                };
                (
                    Just(protocol),
                    rate,
                    1u16..=255,
                    1u16..=255,
                    format,
                    prop::sample::select(Codec::ALL.to_vec()),
                    "[ -~]{0,16}",
                    any::<u32>(),
                )
            })
            .prop_map(
                |(protocol, rate, samples, channel, format, codec, stream_name, frame_counter)| {
                    Header {
                        protocol,
                        rate,
                        samples,
                        channel,
                        format,
                        codec,
                        stream_name,
                        frame_counter,
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_header_round_trip(header in arb_header()) {
            let bytes = encode_header(&header).unwrap();
            prop_assert_eq!(decode_header(&bytes).unwrap(), header);
        }
    }
}
