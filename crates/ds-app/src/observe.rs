use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use ds_core::frame::Frame;
use ds_pipeline::wire::{WireError, parse_frame};

/// Largest UDP payload.
const MAX_DATAGRAM: usize = 65_535;
/// Stop flag polling period.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What one receive attempt produced.
#[derive(Debug)]
pub enum Received {
    Frame(Frame),
    Malformed(WireError),
    Idle,
}

/// Récepteur UDP : décode chaque datagramme et journalise l'en-tête.
pub struct Observer {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl Observer {
    /// # Errors
    /// Returns an error if the address cannot be bound.
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        let socket =
            UdpSocket::bind(addr).with_context(|| format!("Failed to bind observer on {addr}"))?;
        socket
            .set_read_timeout(Some(POLL_INTERVAL))
            .context("Failed to set observer read timeout")?;
        Ok(Self {
            socket,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    /// # Errors
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait up to the poll interval for one datagram.
    ///
    /// # Errors
    /// Returns an error on a socket failure other than a timeout.
    pub fn receive(&mut self) -> Result<Received> {
        match self.socket.recv_from(&mut self.buf) {
            Ok((len, _)) => Ok(match parse_frame(&self.buf[..len]) {
                Ok(frame) => Received::Frame(frame),
                Err(e) => Received::Malformed(e),
            }),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                Ok(Received::Idle)
            }
            Err(e) => Err(e).context("Observer receive failed"),
        }
    }
}

/// One-line header summary.
#[must_use]
pub fn summarize(frame: &Frame) -> String {
    format!(
        "n={} | RMS: {:.5} | Centroid: {:.1} Hz | Scene: {} | Gain: {:.1}x",
        frame.sample_count(),
        frame.rms,
        frame.centroid,
        frame.scene,
        frame.gain
    )
}

/// Receive until `stop` is set or `max_frames` valid frames have arrived.
///
/// Returns the number of valid frames seen.
///
/// # Errors
/// Returns an error if the socket fails.
pub fn run(mut observer: Observer, stop: &AtomicBool, max_frames: Option<u64>) -> Result<u64> {
    log::info!("Observing frames on {}", observer.local_addr()?);
    let mut frames = 0u64;
    let mut malformed = 0u64;

    while !stop.load(Ordering::Relaxed) {
        match observer.receive()? {
            Received::Frame(frame) => {
                frames += 1;
                log::info!("{}", summarize(&frame));
                if max_frames.is_some_and(|max| frames >= max) {
                    break;
                }
            }
            Received::Malformed(e) => {
                malformed += 1;
                log::warn!("Invalid audio frame received: {e}");
            }
            Received::Idle => {}
        }
    }

    log::info!("Observer stopped: frames={frames} malformed={malformed}");
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use ds_core::frame::{Classification, Features, Scene};
    use ds_pipeline::wire::{encoded_len, serialize};

    use super::*;

    fn packet() -> Vec<u8> {
        let frame = Frame::new(
            Features {
                rms: 0.2,
                centroid: 2500.0,
            },
            Classification {
                scene: Scene::Noise,
                gain: 0.5,
            },
            vec![10i16; 32].into_boxed_slice(),
            vec![5i16; 32].into_boxed_slice(),
        )
        .unwrap();
        let mut buf = vec![0u8; encoded_len(32)];
        serialize(&frame, &mut buf).unwrap();
        buf
    }

    #[test]
    fn receives_and_rejects() {
        let mut observer = Observer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let target = observer.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(&packet(), target).unwrap();
        match observer.receive().unwrap() {
            Received::Frame(frame) => {
                assert_eq!(frame.scene, Scene::Noise);
                assert_eq!(frame.samples_out(), &[5i16; 32][..]);
                assert_eq!(
                    summarize(&frame),
                    "n=32 | RMS: 0.20000 | Centroid: 2500.0 Hz | Scene: noise | Gain: 0.5x"
                );
            }
            other => panic!("expected a frame, got {other:?}"),
        }

        sender.send_to(&[0u8; 10], target).unwrap();
        assert!(matches!(observer.receive().unwrap(), Received::Malformed(_)));
    }

    #[test]
    fn run_stops_after_max_frames() {
        let observer = Observer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let target = observer.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        for _ in 0..2 {
            sender.send_to(&packet(), target).unwrap();
        }
        let stop = AtomicBool::new(false);
        assert_eq!(run(observer, &stop, Some(2)).unwrap(), 2);
    }

    #[test]
    fn idle_until_stopped() {
        let mut observer = Observer::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        assert!(matches!(observer.receive().unwrap(), Received::Idle));
        let stop = AtomicBool::new(true);
        assert_eq!(run(observer, &stop, None).unwrap(), 0);
    }
}
