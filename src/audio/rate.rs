use crate::error::PipelineError;

/// Packet byte length ↔ sample rate, as sent by the AudioLAN Android app.
/// Both columns are unique, so the table reads in either direction.
const PACKET_RATES: [(usize, u32); 9] = [
    (640, 8_000),
    (896, 11_025),
    (1_280, 16_000),
    (1_792, 22_050),
    (3_584, 44_100),
    (3_840, 48_000),
    (7_104, 88_200),
    (7_680, 96_000),
    (15_360, 192_000),
];

/// Infer the stream's sample rate from the size of a packet.
pub fn rate_for_packet_len(len: usize) -> Result<u32, PipelineError> {
    PACKET_RATES
        .iter()
        .find(|&&(bytes, _)| bytes == len)
        .map(|&(_, rate)| rate)
        .ok_or(PipelineError::UnknownSampleRate(len))
}

/// Packet size the sender uses at `rate`, if it is a canonical rate.
pub fn packet_len_for_rate(rate: u32) -> Option<usize> {
    PACKET_RATES
        .iter()
        .find(|&&(_, r)| r == rate)
        .map(|&(bytes, _)| bytes)
}
