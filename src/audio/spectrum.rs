use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Rolling sample history feeding the spectral analyzer, decoupled from the
/// display window. Holds exactly `capacity` samples, pre-filled with silence.
#[derive(Clone, Debug)]
pub struct FrequencyAccumulator {
    samples: Vec<f32>,
    capacity: usize,
}

impl FrequencyAccumulator {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            capacity,
        }
    }

    /// Append a frame, then trim from the front back down to capacity.
    pub fn push(&mut self, frame: &[i16]) {
        self.samples.extend(frame.iter().map(|&s| s as f32));
        let excess = self.samples.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.samples.drain(..excess);
        }
    }

    /// The most recent `n` samples (fewer if the accumulator is smaller).
    pub fn tail(&self, n: usize) -> &[f32] {
        &self.samples[self.samples.len().saturating_sub(n)..]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Magnitude spectrum over the last `chunk_size` accumulated samples.
///
/// The FFT plan, frequency axis and working buffers are built once; each
/// [`SpectralAnalyzer::analyze`] call only refills them.
pub struct SpectralAnalyzer {
    chunk_size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    frequencies: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(sample_rate: u32, chunk_size: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(chunk_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let half = chunk_size / 2;

        log::debug!(
            "Planned {}-point FFT, {} bins of {:.2} Hz",
            chunk_size,
            half,
            sample_rate as f32 / chunk_size as f32
        );

        Self {
            chunk_size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); chunk_size],
            scratch,
            frequencies: frequency_axis(sample_rate, chunk_size),
            magnitudes: vec![0.0; half],
        }
    }

    /// Recompute magnitudes from the accumulator. A short accumulator is
    /// zero-padded at the front.
    pub fn analyze(&mut self, accumulator: &FrequencyAccumulator) -> &[f32] {
        let tail = accumulator.tail(self.chunk_size);
        let pad = self.chunk_size - tail.len();

        for c in &mut self.buffer[..pad] {
            *c = Complex::new(0.0, 0.0);
        }
        for (c, &s) in self.buffer[pad..].iter_mut().zip(tail) {
            *c = Complex::new(s, 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        // Real input: the upper half mirrors the lower half.
        let scale = 2.0 / self.chunk_size as f32;
        for (m, c) in self.magnitudes.iter_mut().zip(&self.buffer) {
            *m = c.norm() * scale;
        }

        &self.magnitudes
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }
}

/// Center frequency of each non-negative bin: `k * fs / n` for `k < n / 2`.
pub fn frequency_axis(sample_rate: u32, chunk_size: usize) -> Vec<f32> {
    let resolution = sample_rate as f64 / chunk_size as f64;
    (0..chunk_size / 2)
        .map(|k| (k as f64 * resolution) as f32)
        .collect()
}
