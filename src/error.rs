use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Session-level failures. Any of these ends the session.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no datagram received within {0:?}")]
    StartupTimeout(Duration),

    #[error("interrupted before the first datagram arrived")]
    Interrupted,

    #[error("cannot infer sample rate from a {0}-byte packet")]
    UnknownSampleRate(usize),

    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    #[error("window of {window_ms} ms is invalid at {sample_rate} Hz (must be 1..=500 ms)")]
    InvalidWindow { window_ms: u32, sample_rate: u32 },

    #[cfg(feature = "capture")]
    #[error("capture device error: {0}")]
    Capture(String),
}

/// A single malformed payload. Never escapes the ingress loop.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("odd-length payload of {0} bytes")]
pub struct DecodeError(pub usize);
