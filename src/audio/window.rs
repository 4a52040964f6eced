/// Fixed-length rolling store of the most recent samples, oldest first.
#[derive(Clone, Debug)]
pub struct SlidingWindow {
    samples: Vec<i16>,
}

impl SlidingWindow {
    /// A window of `len` zeros.
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0; len],
        }
    }

    /// Shift in `frame`, discarding as many of the oldest samples.
    pub fn push(&mut self, frame: &[i16]) {
        let len = self.samples.len();
        if frame.len() >= len {
            // Only the tail of an oversized frame survives.
            self.samples.copy_from_slice(&frame[frame.len() - len..]);
            return;
        }

        let shift = frame.len();
        self.samples.copy_within(shift.., 0);
        self.samples[len - shift..].copy_from_slice(frame);
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_silent() {
        let window = SlidingWindow::new(4);
        assert_eq!(window.samples(), &[0, 0, 0, 0]);
    }

    #[test]
    fn shifts_in_short_frames() {
        let mut window = SlidingWindow::new(4);
        window.push(&[1, 2, 3, 4]);
        assert_eq!(window.samples(), &[1, 2, 3, 4]);
        window.push(&[5, 6]);
        assert_eq!(window.samples(), &[3, 4, 5, 6]);
    }

    #[test]
    fn oversized_frame_keeps_its_tail() {
        let mut window = SlidingWindow::new(3);
        window.push(&[9, 9]);
        window.push(&[1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(window.samples(), &[5, 6, 7]);
    }

    #[test]
    fn empty_frame_is_a_no_op() {
        let mut window = SlidingWindow::new(3);
        window.push(&[1, 2, 3]);
        window.push(&[]);
        assert_eq!(window.samples(), &[1, 2, 3]);
    }

    #[test]
    fn matches_tail_of_concatenated_stream() {
        let mut window = SlidingWindow::new(10);
        let mut stream: Vec<i16> = Vec::new();
        let mut next = 0i16;
        for size in [3usize, 7, 1, 12, 4, 9, 2, 10, 5] {
            let frame: Vec<i16> = (0..size)
                .map(|_| {
                    next += 1;
                    next
                })
                .collect();
            stream.extend_from_slice(&frame);
            window.push(&frame);
            assert_eq!(window.len(), 10);
            if stream.len() >= 10 {
                assert_eq!(window.samples(), &stream[stream.len() - 10..]);
            }
        }
    }
}
