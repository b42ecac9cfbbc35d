//! Packet framer
//!
//! One UDP datagram carries exactly one packet: the 28-byte header
//! followed by up to [`MAX_PAYLOAD_SIZE`] payload bytes. The payload ends
//! where the datagram ends.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::header::{decode_header, encode_header, Header};
use crate::constants::{HEADER_SIZE, MAX_PAYLOAD_SIZE, MAX_SIZE};
use crate::error::CodecError;
use crate::protocol::Payload;

/// Concatenate an encoded header with its payload
pub fn assemble_packet(header: &[u8; HEADER_SIZE], payload: &[u8]) -> Result<Bytes, CodecError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(CodecError::PayloadTooLarge(payload.len()));
    }

    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_slice(header);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Split a received datagram into header bytes and payload bytes
pub fn split_packet(datagram: &[u8]) -> Result<(&[u8; HEADER_SIZE], &[u8]), CodecError> {
    if datagram.len() < HEADER_SIZE {
        return Err(CodecError::Truncated {
            expected: HEADER_SIZE,
            actual: datagram.len(),
        });
    }
    if datagram.len() > MAX_SIZE {
        return Err(CodecError::PayloadTooLarge(datagram.len() - HEADER_SIZE));
    }

    let (head, payload) = datagram.split_at(HEADER_SIZE);
    let head: &[u8; HEADER_SIZE] = head.try_into().map_err(|_| CodecError::Truncated {
        expected: HEADER_SIZE,
        actual: datagram.len(),
    })?;
    Ok((head, payload))
}

/// An outgoing packet: a stamped header plus payload set exactly once
#[derive(Debug, Clone)]
pub struct Packet {
    header: Header,
    payload: Option<Bytes>,
}

impl Packet {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            payload: None,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.payload.as_ref()
    }

    /// Attach the payload
    ///
    /// Fails if a payload was already attached or it exceeds the size limit.
    pub fn set_data(&mut self, data: impl Into<Bytes>) -> Result<&mut Self, CodecError> {
        if self.payload.is_some() {
            return Err(CodecError::DataAlreadySet);
        }
        let data = data.into();
        if data.len() > MAX_PAYLOAD_SIZE {
            return Err(CodecError::PayloadTooLarge(data.len()));
        }
        self.payload = Some(data);
        Ok(self)
    }

    /// Encode header and payload into one datagram
    ///
    /// A packet without payload encodes as a bare header.
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let head = encode_header(&self.header)?;
        assemble_packet(&head, self.payload.as_deref().unwrap_or_default())
    }
}

/// A received packet after header validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPacket {
    pub header: Header,
    pub payload: Bytes,
}

impl DecodedPacket {
    /// Decode a datagram, sharing the payload with the input buffer
    pub fn from_bytes(datagram: Bytes) -> Result<Self, CodecError> {
        let (head, _) = split_packet(&datagram)?;
        let header = decode_header(head)?;
        let payload = datagram.slice(HEADER_SIZE..);
        Ok(Self { header, payload })
    }

    /// Decode a borrowed datagram
    pub fn decode(datagram: &[u8]) -> Result<Self, CodecError> {
        Self::from_bytes(Bytes::copy_from_slice(datagram))
    }

    /// Convert the payload through the protocol registry
    pub fn to_payload(&self) -> Result<Payload, CodecError> {
        self.header.protocol.decode_payload(self.payload.clone())
    }

    pub fn into_payload(self) -> Result<Payload, CodecError> {
        self.header.protocol.decode_payload(self.payload)
    }
}
