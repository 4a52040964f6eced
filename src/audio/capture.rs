//! Local microphone producer. Feeds the same hand-off channel as network
//! ingress, but takes its sample rate from the device instead of packet size.
#![cfg_attr(not(feature = "capture"), allow(dead_code))]

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Input device name; `None` picks the host default.
    pub device: Option<String>,
    /// 1-based channel to keep from interleaved input.
    pub channel: usize,
    /// Keep every n-th sample.
    pub downsample: usize,
}

/// Pick one channel out of interleaved `data`, keep every `downsample`-th
/// frame and convert to i16.
pub fn select_channel<T: Copy>(
    data: &[T],
    device_channels: usize,
    channel: usize,
    downsample: usize,
    convert: fn(T) -> i16,
) -> Vec<i16> {
    data.chunks_exact(device_channels)
        .step_by(downsample.max(1))
        .map(|frame| convert(frame[channel - 1]))
        .collect()
}

pub fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

pub fn u16_to_i16(s: u16) -> i16 {
    (s as i32 - 32_768) as i16
}

#[cfg(feature = "capture")]
pub use device::LocalCapture;

#[cfg(feature = "capture")]
mod device {
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

    use super::{f32_to_i16, select_channel, u16_to_i16, CaptureConfig};
    use crate::audio::decode::AudioFrame;
    use crate::error::PipelineError;
    use crate::handoff::FrameSender;

    /// A running input stream. Dropping it stops capture and closes the
    /// hand-off channel.
    pub struct LocalCapture {
        _stream: cpal::Stream,
        sample_rate: u32,
    }

    impl LocalCapture {
        pub fn open(config: &CaptureConfig, tx: FrameSender) -> Result<Self, PipelineError> {
            let host = cpal::default_host();
            let device = match config.device {
                Some(ref name) => host
                    .input_devices()
                    .map_err(|e| PipelineError::Capture(format!("enumerate devices: {}", e)))?
                    .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                    .ok_or_else(|| PipelineError::Capture(format!("device '{}' not found", name)))?,
                None => host
                    .default_input_device()
                    .ok_or_else(|| PipelineError::Capture("no default input device".into()))?,
            };

            let supported = device
                .default_input_config()
                .map_err(|e| PipelineError::Capture(format!("input config: {}", e)))?;
            let device_channels = supported.channels() as usize;
            if config.channel == 0 || config.channel > device_channels {
                return Err(PipelineError::Capture(format!(
                    "channel {} out of range, device has {}",
                    config.channel, device_channels
                )));
            }

            let downsample = config.downsample.max(1);
            let sample_rate = supported.sample_rate().0 / downsample as u32;
            let format = supported.sample_format();
            let stream_config: cpal::StreamConfig = supported.into();

            log::info!(
                "Opening stream on {}: channel {} of {}, {} Hz after /{} downsample",
                device.name().unwrap_or_else(|_| "unknown".into()),
                config.channel,
                device_channels,
                sample_rate,
                downsample
            );

            let channel = config.channel;
            let stream = match format {
                cpal::SampleFormat::F32 => {
                    build::<f32>(&device, &stream_config, tx, channel, downsample, f32_to_i16)
                }
                cpal::SampleFormat::I16 => {
                    build::<i16>(&device, &stream_config, tx, channel, downsample, |s| s)
                }
                cpal::SampleFormat::U16 => {
                    build::<u16>(&device, &stream_config, tx, channel, downsample, u16_to_i16)
                }
                other => {
                    return Err(PipelineError::Capture(format!(
                        "unsupported sample format {:?}",
                        other
                    )))
                }
            }
            .map_err(|e| PipelineError::Capture(format!("build stream: {}", e)))?;

            stream
                .play()
                .map_err(|e| PipelineError::Capture(format!("start stream: {}", e)))?;

            Ok(Self {
                _stream: stream,
                sample_rate,
            })
        }

        pub fn sample_rate(&self) -> u32 {
            self.sample_rate
        }
    }

    fn build<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut tx: FrameSender,
        channel: usize,
        downsample: usize,
        convert: fn(T) -> i16,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample + Send + 'static,
    {
        let device_channels = config.channels as usize;
        device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples = select_channel(data, device_channels, channel, downsample, convert);
                if !samples.is_empty() {
                    tx.send(AudioFrame::new(samples));
                }
            },
            |err| log::error!("Audio input error: {}", err),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_one_channel_of_interleaved_input() {
        let stereo: [i16; 8] = [1, -1, 2, -2, 3, -3, 4, -4];
        assert_eq!(select_channel(&stereo, 2, 1, 1, |s| s), vec![1, 2, 3, 4]);
        assert_eq!(select_channel(&stereo, 2, 2, 1, |s| s), vec![-1, -2, -3, -4]);
    }

    #[test]
    fn downsample_keeps_every_nth_frame() {
        let mono: Vec<i16> = (0..10).collect();
        assert_eq!(select_channel(&mono, 1, 1, 3, |s| s), vec![0, 3, 6, 9]);
    }

    #[test]
    fn converts_float_and_unsigned_samples() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.0), i16::MAX);
        assert_eq!(f32_to_i16(-4.0), -i16::MAX);
        assert_eq!(u16_to_i16(32_768), 0);
        assert_eq!(u16_to_i16(0), i16::MIN);
        assert_eq!(u16_to_i16(u16::MAX), i16::MAX);

        let floats = [0.5f32, 0.25];
        assert_eq!(select_channel(&floats, 2, 1, 1, f32_to_i16), vec![16_383]);
    }
}
