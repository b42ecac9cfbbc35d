//! VBAN header and packet codec
//!
//! Pure encode/decode of the 28-byte header, packet framing, and the
//! factories that stamp frame counters. Nothing here touches the network.

pub mod factory;
pub mod header;
pub mod packet;
pub mod values;

pub use factory::{HeaderFactory, HeaderFactoryBuilder, PacketFactory};
pub use header::{decode_header, encode_header, Header};
pub use packet::{assemble_packet, split_packet, DecodedPacket, Packet};
pub use values::{
    AudioFormat, BitsPerSecond, Codec, CommandFormat, DataFormat, DataRate, SampleRate,
    SerialFormat,
};
