//! Bounded FIFO between a frame producer (network ingress or local capture)
//! and the analysis stage.
//!
//! Backpressure is drop-oldest: when the queue is full the producer evicts
//! the oldest queued frame so that reception never blocks and the consumer
//! always catches up to the live signal.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::audio::decode::AudioFrame;

#[derive(Debug, PartialEq, Eq)]
pub enum Message {
    Frame(AudioFrame),
    /// No more frames will follow.
    Shutdown,
}

/// Create a hand-off channel holding at most `capacity` messages.
pub fn channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let sender = FrameSender {
        tx,
        evict: rx.clone(),
        dropped: 0,
    };
    (sender, FrameReceiver { rx })
}

pub struct FrameSender {
    tx: Sender<Message>,
    // Producer-side handle used only to evict the oldest entry when full.
    evict: Receiver<Message>,
    dropped: u64,
}

impl FrameSender {
    /// Enqueue without blocking.
    pub fn send(&mut self, frame: AudioFrame) {
        self.push(Message::Frame(frame));
    }

    /// Deliver the shutdown sentinel and release the producer end.
    pub fn close(mut self) {
        self.push(Message::Shutdown);
        log::debug!("Shutdown sentinel queued");
        if self.dropped > 0 {
            log::info!("Hand-off dropped {} frame(s) in total", self.dropped);
        }
    }

    /// Frames evicted so far to make room for newer ones.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn push(&mut self, mut msg: Message) {
        loop {
            match self.tx.try_send(msg) {
                // The eviction handle keeps the channel connected, so this
                // only happens during teardown.
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    msg = back;
                    if let Ok(Message::Frame(_)) = self.evict.try_recv() {
                        self.dropped += 1;
                        if self.dropped % 100 == 1 {
                            log::warn!(
                                "Analysis falling behind, dropped {} frame(s) so far",
                                self.dropped
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Result of draining the channel once.
#[derive(Debug, Default)]
pub struct Drained {
    pub frames: Vec<AudioFrame>,
    /// The producer has finished: the sentinel arrived or the channel closed.
    pub finished: bool,
}

pub struct FrameReceiver {
    rx: Receiver<Message>,
}

impl FrameReceiver {
    /// Take every frame queued right now, in arrival order, without blocking.
    pub fn drain(&self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.rx.try_recv() {
                Ok(Message::Frame(frame)) => drained.frames.push(frame),
                Ok(Message::Shutdown) | Err(TryRecvError::Disconnected) => {
                    drained.finished = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        drained
    }
}
