//! Network subsystem for VBAN over UDP

pub mod udp;
#[cfg(feature = "sender")]
pub mod sender;
#[cfg(feature = "receiver")]
pub mod receiver;

pub use udp::{create_sender_socket, create_socket};
#[cfg(feature = "sender")]
pub use sender::{SenderStats, VbanOutputStream};
#[cfg(feature = "receiver")]
pub use receiver::{CloseHandle, ReceivedPacket, ReceiverStats, VbanInputStream, VbanReceiver};
