use crate::audio::spectrum::{FrequencyAccumulator, SpectralAnalyzer};
use crate::audio::window::SlidingWindow;
use crate::handoff::FrameReceiver;
use crate::session::Session;

/// Read-only view handed to the renderer once per tick.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub sample_rate: u32,
    /// Most recent `chunk_size` samples, oldest first.
    pub waveform: &'a [i16],
    /// Bin center frequencies in Hz, fixed for the session.
    pub frequencies: &'a [f32],
    pub magnitudes: &'a [f32],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    Running,
    /// The producer closed the channel; no further ticks are needed.
    Finished,
}

/// Owns every piece of analysis state. Only the analysis thread touches it.
pub struct AnalysisStage {
    session: Session,
    rx: FrameReceiver,
    window: SlidingWindow,
    accumulator: FrequencyAccumulator,
    analyzer: SpectralAnalyzer,
}

impl AnalysisStage {
    pub fn new(session: Session, rx: FrameReceiver) -> Self {
        Self {
            session,
            rx,
            window: SlidingWindow::new(session.chunk_size),
            accumulator: FrequencyAccumulator::new(session.accumulator_len()),
            analyzer: SpectralAnalyzer::new(session.sample_rate, session.chunk_size),
        }
    }

    /// Drain every queued frame, fold it into both buffers, then recompute
    /// the spectrum. Never blocks.
    pub fn tick(&mut self) -> TickStatus {
        let drained = self.rx.drain();
        for frame in &drained.frames {
            self.window.push(&frame.samples);
            self.accumulator.push(&frame.samples);
        }
        debug_assert_eq!(self.window.len(), self.session.chunk_size);
        debug_assert!(self.accumulator.len() <= self.session.accumulator_len());
        self.analyzer.analyze(&self.accumulator);

        if drained.finished {
            TickStatus::Finished
        } else {
            TickStatus::Running
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            sample_rate: self.session.sample_rate,
            waveform: self.window.samples(),
            frequencies: self.analyzer.frequencies(),
            magnitudes: self.analyzer.magnitudes(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
