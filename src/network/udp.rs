//! UDP socket setup

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::config::NetworkConfig;
use crate::error::NetworkError;

/// Create a blocking UDP socket bound to `addr`
///
/// Buffer sizes are best effort; the OS may clamp or refuse them.
pub fn create_socket(addr: SocketAddr, config: &NetworkConfig) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;

    if config.reuse_address {
        socket
            .set_reuse_address(true)
            .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    }
    if let Err(e) = socket.set_recv_buffer_size(config.recv_buffer_size) {
        tracing::warn!("Failed to set receive buffer size: {}", e);
    }
    if let Err(e) = socket.set_send_buffer_size(config.send_buffer_size) {
        tracing::warn!("Failed to set send buffer size: {}", e);
    }

    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

    let socket: UdpSocket = socket.into();
    if let Ok(local) = socket.local_addr() {
        tracing::debug!("UDP socket bound on {}", local);
    }
    Ok(socket)
}

/// Create a socket on an ephemeral port suitable for sending to `target`
pub fn create_sender_socket(
    target: SocketAddr,
    config: &NetworkConfig,
) -> Result<UdpSocket, NetworkError> {
    let local = match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    };
    let sender_config = NetworkConfig {
        reuse_address: false,
        ..config.clone()
    };
    create_socket(local, &sender_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_socket_ephemeral() {
        let socket = create_socket("127.0.0.1:0".parse().unwrap(), &NetworkConfig::default()).unwrap();
        let local = socket.local_addr().unwrap();
        assert!(local.ip().is_loopback());
        assert_ne!(local.port(), 0);
    }

    #[test]
    fn test_sender_socket_matches_family() {
        let socket =
            create_sender_socket("127.0.0.1:6980".parse().unwrap(), &NetworkConfig::default())
                .unwrap();
        assert!(socket.local_addr().unwrap().is_ipv4());
    }
}
