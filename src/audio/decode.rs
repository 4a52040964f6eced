use crate::error::DecodeError;

/// Samples decoded from one packet (or one capture callback), in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Decode an unframed payload of little-endian signed 16-bit PCM.
pub fn decode_frame(payload: &[u8]) -> Result<AudioFrame, DecodeError> {
    if payload.len() % 2 != 0 {
        return Err(DecodeError(payload.len()));
    }

    let samples = payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    Ok(AudioFrame { samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_consecutive_pairs() {
        let payload = [0x01, 0x00, 0xff, 0xff, 0x00, 0x80, 0xff, 0x7f];
        let frame = decode_frame(&payload).unwrap();
        assert_eq!(frame.samples, vec![1, -1, i16::MIN, i16::MAX]);
    }

    #[test]
    fn sample_count_is_half_the_byte_count() {
        let payload = vec![0x34u8; 3_840];
        let frame = decode_frame(&payload).unwrap();
        assert_eq!(frame.len(), 1_920);
        assert!(frame.samples.iter().all(|&s| s == 0x3434));
    }

    #[test]
    fn odd_length_is_rejected() {
        assert_eq!(decode_frame(&[1, 2, 3]), Err(DecodeError(3)));
    }

    #[test]
    fn empty_payload_is_an_empty_frame() {
        let frame = decode_frame(&[]).unwrap();
        assert!(frame.is_empty());
    }
}
