use crate::stage::Snapshot;

/// Anything that draws the time and frequency views once per tick.
pub trait Render {
    fn render(&mut self, snapshot: &Snapshot<'_>);
}

/// Console stand-in for a plotting front end: periodically logs the level
/// of the time-domain window and the dominant frequency.
pub struct LevelMeter {
    every: u64,
    ticks: u64,
}

impl LevelMeter {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            ticks: 0,
        }
    }
}

impl Render for LevelMeter {
    fn render(&mut self, snapshot: &Snapshot<'_>) {
        self.ticks += 1;
        if self.ticks % self.every != 0 {
            return;
        }

        let level = rms(snapshot.waveform);
        match dominant_bin(snapshot.magnitudes) {
            Some(bin) => log::info!(
                "rms {:8.1} | peak {:8.1} Hz @ {:8.2} (nyquist {} Hz)",
                level,
                snapshot.frequencies[bin],
                snapshot.magnitudes[bin],
                snapshot.sample_rate / 2
            ),
            None => log::info!("rms {:8.1} | no spectrum", level),
        }
    }
}

pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Strongest non-DC bin, falling back to DC for a single-bin spectrum.
pub fn dominant_bin(magnitudes: &[f32]) -> Option<usize> {
    let start = if magnitudes.len() > 1 { 1 } else { 0 };
    magnitudes
        .iter()
        .enumerate()
        .skip(start)
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
