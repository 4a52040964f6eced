//! UDP ingress: negotiates the stream from the first datagram, then decodes
//! every following datagram into the hand-off channel.
//!
//! The lifecycle is encoded in the types. [`Listener`] is a bound socket
//! awaiting its first packet; [`Listener::negotiate`] consumes it and yields
//! the [`Session`] plus a [`Stream`]; [`Stream::run`] consumes the stream and
//! returns once the socket has been released. Whichever path ends the
//! session, the socket is dropped exactly once by whoever owns it last.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::audio::decode::{decode_frame, AudioFrame};
use crate::error::PipelineError;
use crate::handoff::FrameSender;
use crate::session::Session;

/// Upper bound on a single blocking receive, so cancellation is noticed.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Large enough for any UDP payload; a short buffer would silently truncate
/// oversized datagrams and corrupt negotiation.
const MAX_DATAGRAM: usize = 65_536;

#[derive(Clone, Debug)]
pub struct IngressConfig {
    pub addr: SocketAddr,
    pub startup_timeout: Duration,
    pub idle_timeout: Duration,
    pub window_ms: u32,
}

/// Why a stream ended without a socket failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseReason {
    IdleTimeout,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IngressReport {
    pub reason: CloseReason,
    pub frames: u64,
    pub malformed: u64,
    pub dropped: u64,
}

/// Bound socket waiting for its first datagram.
pub struct Listener {
    socket: UdpSocket,
    config: IngressConfig,
    cancel: Arc<AtomicBool>,
}

impl Listener {
    pub fn bind(config: IngressConfig, cancel: Arc<AtomicBool>) -> Result<Self, PipelineError> {
        let socket = UdpSocket::bind(config.addr).map_err(|source| PipelineError::Bind {
            addr: config.addr,
            source,
        })?;
        log::info!("Listening for UDP packets on {}", socket.local_addr()?);
        Ok(Self {
            socket,
            config,
            cancel,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Wait up to the startup timeout for a datagram and infer the session
    /// from its size. On failure the socket is released before returning.
    pub fn negotiate(self) -> Result<(Session, Stream), PipelineError> {
        let deadline = Instant::now() + self.config.startup_timeout;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        let (len, peer) = loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(PipelineError::Interrupted);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::error!(
                    "Timeout: nothing received after {:?}",
                    self.config.startup_timeout
                );
                return Err(PipelineError::StartupTimeout(self.config.startup_timeout));
            }
            self.socket.set_read_timeout(Some(remaining.min(POLL_INTERVAL)))?;
            match self.socket.recv_from(&mut buf) {
                Ok(received) => break received,
                Err(e) if is_poll_timeout(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        };

        log::info!("Receiving packet of size {} from {}", len, peer);
        let session = Session::negotiate(len, self.config.window_ms)?;
        log::info!(
            "Determined sample rate is {} Hz ({} samples per {} ms window)",
            session.sample_rate,
            session.chunk_size,
            session.window_ms
        );

        // Every canonical packet size is even, so this cannot fail.
        let first = decode_frame(&buf[..len]).ok();

        self.socket
            .set_read_timeout(Some(POLL_INTERVAL.min(self.config.idle_timeout)))?;

        let stream = Stream {
            socket: self.socket,
            idle_timeout: self.config.idle_timeout,
            cancel: self.cancel,
            first,
            buf,
        };
        Ok((session, stream))
    }
}

/// Negotiated socket, ready to stream frames.
pub struct Stream {
    socket: UdpSocket,
    idle_timeout: Duration,
    cancel: Arc<AtomicBool>,
    first: Option<AudioFrame>,
    buf: Vec<u8>,
}

impl Stream {
    /// Receive and forward frames until the stream goes idle, is cancelled,
    /// or the socket fails. The channel always receives the shutdown
    /// sentinel and the socket is closed before this returns.
    pub fn run(mut self, mut tx: FrameSender) -> Result<IngressReport, PipelineError> {
        let mut counters = Counters::default();
        let result = self.pump(&mut tx, &mut counters);

        let dropped = tx.dropped();
        tx.close();
        let Stream { socket, .. } = self;
        drop(socket);
        log::info!("Closing socket");

        let reason = result.map_err(|e| {
            log::error!("Ingress stopped: {}", e);
            e
        })?;
        log::info!(
            "Stopping: {:?} after {} frame(s), {} malformed",
            reason,
            counters.frames,
            counters.malformed
        );
        Ok(IngressReport {
            reason,
            frames: counters.frames,
            malformed: counters.malformed,
            dropped,
        })
    }

    fn pump(
        &mut self,
        tx: &mut FrameSender,
        counters: &mut Counters,
    ) -> Result<CloseReason, PipelineError> {
        if let Some(frame) = self.first.take() {
            counters.frames += 1;
            tx.send(frame);
        }

        let mut last_packet = Instant::now();
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(CloseReason::Cancelled);
            }

            let len = match self.socket.recv_from(&mut self.buf) {
                Ok((len, _)) => len,
                Err(e) if is_poll_timeout(&e) => {
                    if last_packet.elapsed() >= self.idle_timeout {
                        return Ok(CloseReason::IdleTimeout);
                    }
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            last_packet = Instant::now();

            match decode_frame(&self.buf[..len]) {
                Ok(frame) if frame.is_empty() => {}
                Ok(frame) => {
                    log::trace!("Frame of {} samples", frame.len());
                    counters.frames += 1;
                    tx.send(frame);
                }
                Err(e) => {
                    counters.malformed += 1;
                    log::warn!("Dropping malformed packet: {}", e);
                }
            }
        }
    }
}

#[derive(Default)]
struct Counters {
    frames: u64,
    malformed: u64,
}

/// Read timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows.
fn is_poll_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff;

    fn config(startup_ms: u64, idle_ms: u64) -> IngressConfig {
        IngressConfig {
            addr: "127.0.0.1:0".parse().unwrap(),
            startup_timeout: Duration::from_millis(startup_ms),
            idle_timeout: Duration::from_millis(idle_ms),
            window_ms: 200,
        }
    }

    fn listener(startup_ms: u64, idle_ms: u64) -> (Listener, SocketAddr) {
        let listener =
            Listener::bind(config(startup_ms, idle_ms), Arc::new(AtomicBool::new(false))).unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    fn client() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").unwrap()
    }

    #[test]
    fn first_packet_negotiates_48k() {
        let (listener, addr) = listener(2_000, 200);
        client().send_to(&[0u8; 3_840], addr).unwrap();
        let (session, _stream) = listener.negotiate().unwrap();
        assert_eq!(session.sample_rate, 48_000);
        assert_eq!(session.chunk_size, 9_600);
    }

    #[test]
    fn first_packet_negotiates_192k() {
        let (listener, addr) = listener(2_000, 200);
        client().send_to(&vec![0u8; 15_360], addr).unwrap();
        let (session, _stream) = listener.negotiate().unwrap();
        assert_eq!(session.sample_rate, 192_000);
    }

    #[test]
    fn unknown_first_packet_fails_negotiation() {
        let (listener, addr) = listener(2_000, 200);
        client().send_to(&[0u8; 1_000], addr).unwrap();
        assert!(matches!(
            listener.negotiate(),
            Err(PipelineError::UnknownSampleRate(1_000))
        ));
        // Socket was released on the failure path.
        UdpSocket::bind(addr).unwrap();
    }

    #[test]
    fn silence_times_out_at_startup() {
        let (listener, addr) = listener(100, 200);
        let started = Instant::now();
        assert!(matches!(
            listener.negotiate(),
            Err(PipelineError::StartupTimeout(_))
        ));
        assert!(started.elapsed() >= Duration::from_millis(100));
        UdpSocket::bind(addr).unwrap();
    }

    #[test]
    fn cancelled_before_first_packet() {
        let cancel = Arc::new(AtomicBool::new(true));
        let listener = Listener::bind(config(2_000, 200), cancel).unwrap();
        assert!(matches!(
            listener.negotiate(),
            Err(PipelineError::Interrupted)
        ));
    }

    #[test]
    fn streams_frames_skips_malformed_and_closes_when_idle() {
        let (listener, addr) = listener(2_000, 300);
        let sender = client();

        let mut first = Vec::new();
        for i in 0..1_920i16 {
            first.extend_from_slice(&i.to_le_bytes());
        }
        sender.send_to(&first, addr).unwrap();
        let (_session, stream) = listener.negotiate().unwrap();

        sender.send_to(&[1, 2, 3], addr).unwrap();
        sender.send_to(&[0x05, 0x00, 0xfb, 0xff], addr).unwrap();

        let (tx, rx) = handoff::channel(16);
        let report = stream.run(tx).unwrap();

        assert_eq!(report.reason, CloseReason::IdleTimeout);
        assert_eq!(report.frames, 2);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.dropped, 0);

        let drained = rx.drain();
        assert!(drained.finished);
        assert_eq!(drained.frames.len(), 2);
        assert_eq!(drained.frames[0].len(), 1_920);
        assert_eq!(drained.frames[0].samples[1_919], 1_919);
        assert_eq!(drained.frames[1].samples, vec![5, -5]);

        // Released exactly once: the port is free and nothing else arrives.
        let rebound = UdpSocket::bind(addr).unwrap();
        drop(rebound);
        sender.send_to(&[0u8; 4], addr).ok();
        assert!(rx.drain().frames.is_empty());
    }

    #[test]
    fn cancellation_stops_the_stream() {
        let cancel = Arc::new(AtomicBool::new(false));
        let listener = Listener::bind(config(2_000, 10_000), cancel.clone()).unwrap();
        let addr = listener.local_addr().unwrap();
        client().send_to(&[0u8; 640], addr).unwrap();
        let (_session, stream) = listener.negotiate().unwrap();

        let (tx, rx) = handoff::channel(16);
        let handle = std::thread::spawn(move || stream.run(tx));
        std::thread::sleep(Duration::from_millis(50));
        cancel.store(true, Ordering::SeqCst);

        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.reason, CloseReason::Cancelled);
        assert_eq!(report.frames, 1);
        let drained = rx.drain();
        assert!(drained.finished);
        assert_eq!(drained.frames.len(), 1);
    }
}
