use std::net::{SocketAddr, UdpSocket};

use anyhow::{Context, Result};
use ds_core::traits::TransportSink;

/// Default observer port.
pub const DEFAULT_PORT: u16 = 7667;

/// Sends every frame as one UDP datagram to each observer address.
///
/// Broadcast is enabled on the socket so a subnet broadcast address can
/// serve any number of listeners at once.
///
/// # Error Handling
///
/// Send failures are logged but don't propagate errors.
///
/// # Example
/// ```no_run
/// use ds_pipeline::sink::UdpSink;
/// let sink = UdpSink::bind(vec!["255.255.255.255:7667".parse().unwrap()]).unwrap();
/// ```
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
    targets: Vec<SocketAddr>,
}

impl UdpSink {
    /// Bind an ephemeral local port and prepare to send to `targets`.
    ///
    /// # Errors
    /// Returns an error if the socket cannot be created or configured.
    pub fn bind(targets: Vec<SocketAddr>) -> Result<Self> {
        let local: SocketAddr = if targets.iter().any(SocketAddr::is_ipv6) {
            SocketAddr::from(([0u16; 8], 0))
        } else {
            SocketAddr::from(([0u8; 4], 0))
        };
        let socket = UdpSocket::bind(local).context("Failed to bind UDP socket")?;
        socket
            .set_broadcast(true)
            .context("Failed to enable UDP broadcast")?;

        log::info!("UDP sink ready for {targets:?}");
        Ok(Self { socket, targets })
    }

    /// Observer addresses.
    #[must_use]
    pub fn targets(&self) -> &[SocketAddr] {
        &self.targets
    }
}

impl TransportSink for UdpSink {
    fn broadcast(&mut self, bytes: &[u8]) {
        for addr in &self.targets {
            match self.socket.send_to(bytes, addr) {
                Ok(sent) if sent < bytes.len() => {
                    log::warn!("Partial send to {addr}: {sent}/{} bytes", bytes.len());
                }
                Ok(_) => {}
                Err(e) => log::warn!("Failed to send frame to {addr}: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn datagrams_reach_every_target() {
        let a = UdpSocket::bind("127.0.0.1:0").unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").unwrap();
        for s in [&a, &b] {
            s.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        }

        let mut sink =
            UdpSink::bind(vec![a.local_addr().unwrap(), b.local_addr().unwrap()]).unwrap();
        sink.broadcast(&[1, 2, 3, 4]);

        for s in [&a, &b] {
            let mut buf = [0u8; 16];
            let (n, _) = s.recv_from(&mut buf).unwrap();
            assert_eq!(&buf[..n], &[1, 2, 3, 4]);
        }
    }

    #[test]
    fn no_targets_is_a_silent_no_op() {
        let mut sink = UdpSink::bind(Vec::new()).unwrap();
        sink.broadcast(&[0; 8]);
        assert!(sink.targets().is_empty());
    }
}
