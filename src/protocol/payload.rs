//! Typed payloads bound to each protocol

use std::fmt;

use bytes::Bytes;

use crate::codec::values::{AudioFormat, SampleRate};
use crate::error::CodecError;
use crate::protocol::ProtocolTag;

/// Audio protocol payload: interleaved PCM bytes as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Bytes,
}

impl AudioFrame {
    pub fn from_bytes(data: Bytes) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of sample frames (one sample per channel) in this payload
    ///
    /// Returns `None` for packed bit formats or a zero channel count.
    pub fn frame_count(&self, format: AudioFormat, channels: u16) -> Option<usize> {
        let sample_size = format.bytes_per_sample()?;
        if channels == 0 {
            return None;
        }
        Some(self.data.len() / (sample_size * channels as usize))
    }

    /// Playback duration in microseconds
    pub fn duration_us(&self, rate: SampleRate, format: AudioFormat, channels: u16) -> Option<u64> {
        let frames = self.frame_count(format, channels)? as u64;
        Some(frames * 1_000_000 / rate.hz() as u64)
    }
}

/// Serial protocol payload: raw MIDI bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiCommand {
    data: Bytes,
}

impl MidiCommand {
    pub fn from_bytes(data: Bytes) -> Self {
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl fmt::Display for MidiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.data.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Text protocol payload: a UTF-8 command line such as `Strip[0].Mute=1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utf8Command {
    text: String,
}

impl Utf8Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Decode payload bytes, rejecting invalid UTF-8
    pub fn from_bytes(data: Bytes) -> Result<Self, CodecError> {
        let text = String::from_utf8(data.to_vec())?;
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for Utf8Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Decoded payload of any supported protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Audio(AudioFrame),
    Serial(MidiCommand),
    Text(Utf8Command),
}

impl Payload {
    /// Protocol this payload belongs to
    pub fn protocol(&self) -> ProtocolTag {
        match self {
            Payload::Audio(_) => ProtocolTag::Audio,
            Payload::Serial(_) => ProtocolTag::Serial,
            Payload::Text(_) => ProtocolTag::Text,
        }
    }

    /// Wire bytes of this payload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Audio(frame) => frame.as_bytes(),
            Payload::Serial(command) => command.as_bytes(),
            Payload::Text(command) => command.as_str().as_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(command) => Some(command.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_frame_count() {
        // 4 stereo frames of 16-bit PCM
        let frame = AudioFrame::from_bytes(Bytes::from(vec![0u8; 16]));
        assert_eq!(frame.frame_count(AudioFormat::Int16, 2), Some(4));
        assert_eq!(frame.frame_count(AudioFormat::Bits12, 2), None);
        assert_eq!(frame.frame_count(AudioFormat::Int16, 0), None);
    }

    #[test]
    fn test_audio_duration() {
        // 480 mono frames at 48kHz = 10ms
        let frame = AudioFrame::from_bytes(Bytes::from(vec![0u8; 960]));
        assert_eq!(
            frame.duration_us(SampleRate::Hz48000, AudioFormat::Int16, 1),
            Some(10_000)
        );
    }

    #[test]
    fn test_midi_display() {
        let command = MidiCommand::from_bytes(Bytes::from_static(&[0x90, 0x3C, 0x7F]));
        assert_eq!(command.to_string(), "90 3C 7F");
    }

    #[test]
    fn test_text_payload_bytes() {
        let payload = Payload::Text(Utf8Command::new("Strip[0].Gain=-6"));
        assert_eq!(payload.as_bytes(), b"Strip[0].Gain=-6");
        assert_eq!(payload.as_text(), Some("Strip[0].Gain=-6"));
    }
}
