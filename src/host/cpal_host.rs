// cpal output host - the mixer's realtime callback, gated for the bridge
//
// The render closure produces interleaved f32 frames; conversion to the
// device's sample format happens while writing the output buffer. Note: on
// macOS (CoreAudio) the cpal Stream is not Send, so the host stays on the
// thread that built it.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use tracing::{info, warn};

use super::AudioCallbackControl;
use super::gate::CallbackGate;
use crate::error::HostError;

/// Initial scratch size, in samples; grows if the device asks for more
const SCRATCH_SAMPLES: usize = 8192;

pub struct CpalHost {
    _device: Device,
    stream: Stream,
    gate: CallbackGate,
    sample_rate: u32,
    channels: u16,
}

impl CpalHost {
    /// Open the default output device and start rendering through `render`
    ///
    /// `render` receives an interleaved buffer (already zeroed) and the
    /// channel count.
    pub fn new<F>(render: F) -> Result<Self, HostError>
    where
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(HostError::NoDevice)?;

        let supported_config = device
            .default_output_config()
            .map_err(|e| HostError::Config(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();
        let config: StreamConfig = supported_config.into();

        info!(
            "Audio device: {} ({} Hz, {} channels, {:?})",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels,
            sample_format
        );

        let gate = CallbackGate::new();
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32, F>(&device, &config, gate.clone(), render),
            SampleFormat::I16 => Self::build_stream::<i16, F>(&device, &config, gate.clone(), render),
            SampleFormat::U16 => Self::build_stream::<u16, F>(&device, &config, gate.clone(), render),
            other => return Err(HostError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream
            .play()
            .map_err(|e| HostError::Stream(e.to_string()))?;

        Ok(Self {
            _device: device,
            stream,
            gate,
            sample_rate,
            channels,
        })
    }

    fn build_stream<T, F>(
        device: &Device,
        config: &StreamConfig,
        gate: CallbackGate,
        mut render: F,
    ) -> Result<Stream, HostError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
        F: FnMut(&mut [f32], usize) + Send + 'static,
    {
        let channels = config.channels as usize;
        let mut scratch = vec![0.0f32; SCRATCH_SAMPLES];

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Realtime: no blocking, allocation only if the device
                    // outgrows the scratch buffer
                    let len = data.len();
                    if scratch.len() < len {
                        scratch.resize(len, 0.0);
                    }
                    let frame = &mut scratch[..len];

                    let rendered = gate.enter(|| {
                        frame.fill(0.0);
                        render(&mut *frame, channels);
                    });

                    if rendered {
                        for (out, sample) in data.iter_mut().zip(frame.iter()) {
                            *out = T::from_sample(*sample);
                        }
                    } else {
                        data.fill(T::EQUILIBRIUM);
                    }
                },
                |err| warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| HostError::Stream(e.to_string()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Gate shared with the realtime callback
    pub fn gate(&self) -> &CallbackGate {
        &self.gate
    }
}

impl AudioCallbackControl for CpalHost {
    fn pause(&self, paused: bool) {
        self.gate.pause(paused);

        let result = if paused {
            self.stream.pause().map_err(|e| e.to_string())
        } else {
            self.stream.play().map_err(|e| e.to_string())
        };
        if let Err(e) = result {
            warn!("Cannot {} audio stream: {}", if paused { "pause" } else { "resume" }, e);
        }
    }

    fn lock(&self) {
        self.gate.lock();
    }

    fn unlock(&self) -> bool {
        self.gate.unlock()
    }
}
