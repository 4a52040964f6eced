use crate::audio::rate::{packet_len_for_rate, rate_for_packet_len};
use crate::error::PipelineError;

/// Longest display window that still fits in the half-second accumulator.
pub const MAX_WINDOW_MS: u32 = 500;

/// Stream constants fixed for the lifetime of one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub sample_rate: u32,
    /// Size of the packet the rate was inferred from. `None` for sources
    /// that report their rate directly at a non-canonical value.
    pub packet_byte_length: Option<usize>,
    pub window_ms: u32,
    /// Samples in the display window and in each spectral analysis window.
    pub chunk_size: usize,
}

impl Session {
    /// Negotiate from the byte length of the first datagram.
    pub fn negotiate(packet_byte_length: usize, window_ms: u32) -> Result<Self, PipelineError> {
        let sample_rate = rate_for_packet_len(packet_byte_length)?;
        Self::build(sample_rate, Some(packet_byte_length), window_ms)
    }

    /// Session for a producer that knows its own sample rate.
    #[cfg_attr(not(feature = "capture"), allow(dead_code))]
    pub fn for_rate(sample_rate: u32, window_ms: u32) -> Result<Self, PipelineError> {
        Self::build(sample_rate, packet_len_for_rate(sample_rate), window_ms)
    }

    fn build(
        sample_rate: u32,
        packet_byte_length: Option<usize>,
        window_ms: u32,
    ) -> Result<Self, PipelineError> {
        let chunk_size = (window_ms as u64 * sample_rate as u64 / 1000) as usize;
        if window_ms == 0 || window_ms > MAX_WINDOW_MS || chunk_size < 2 {
            return Err(PipelineError::InvalidWindow {
                window_ms,
                sample_rate,
            });
        }
        Ok(Self {
            sample_rate,
            packet_byte_length,
            window_ms,
            chunk_size,
        })
    }

    /// Capacity of the frequency accumulator (half a second of audio).
    pub fn accumulator_len(&self) -> usize {
        (self.sample_rate / 2) as usize
    }
}
