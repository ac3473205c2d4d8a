//! Live capture from the default audio input through cpal.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use log::{debug, error, info};

use noise_core::sampling::{ANALYSER_WINDOW, Sampler, rms};

use super::SamplerError;

/// Most recent amplitudes of the first input channel, oldest first
type SharedWindow = Arc<Mutex<VecDeque<f32>>>;

/// Loudness of the default audio input device.
///
/// The input stream callback keeps the latest [`ANALYSER_WINDOW`]
/// amplitudes; every reading is the RMS of that window. The stream stops
/// when the sampler is dropped.
pub struct MicrophoneSampler {
    window: SharedWindow,
    scratch: Vec<f32>,
    _stream: Stream,
}

impl MicrophoneSampler {
    /// Open the default input device and start capturing.
    pub fn open() -> Result<Self, SamplerError> {
        let host = cpal::default_host();
        debug!("Audio host: {:?}", host.id());

        let device = host.default_input_device().ok_or_else(|| {
            error!("No input device available!");
            SamplerError::NoInputDevice
        })?;
        info!(
            "Input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| SamplerError::Device(e.to_string()))?;
        let channels = usize::from(config.channels()).max(1);
        debug!(
            "Config: {} Hz, {:?}, {} channels",
            config.sample_rate().0,
            config.sample_format(),
            channels
        );

        let window: SharedWindow = Arc::new(Mutex::new(VecDeque::with_capacity(ANALYSER_WINDOW)));
        let err_fn = |err: cpal::StreamError| error!("Audio stream error: {}", err);

        let stream = match config.sample_format() {
            SampleFormat::F32 => {
                let window = window.clone();
                device.build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        push_frames(&window, data.iter().step_by(channels).copied());
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let window = window.clone();
                device.build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let frames = data
                            .iter()
                            .step_by(channels)
                            .map(|&s| s as f32 / i16::MAX as f32);
                        push_frames(&window, frames);
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::U16 => {
                let window = window.clone();
                device.build_input_stream(
                    &config.into(),
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        let frames = data
                            .iter()
                            .step_by(channels)
                            .map(|&s| (s as f32 / u16::MAX as f32) * 2.0 - 1.0);
                        push_frames(&window, frames);
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(SamplerError::Device(format!(
                    "Unsupported sample format {:?}",
                    other
                )));
            }
        }
        .map_err(|e| SamplerError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| SamplerError::Stream(e.to_string()))?;
        info!("Audio stream started");

        Ok(Self {
            window,
            scratch: Vec::with_capacity(ANALYSER_WINDOW),
            _stream: stream,
        })
    }
}

fn push_frames(window: &SharedWindow, frames: impl Iterator<Item = f32>) {
    let Ok(mut window) = window.lock() else {
        return;
    };
    for frame in frames {
        if window.len() == ANALYSER_WINDOW {
            window.pop_front();
        }
        window.push_back(frame);
    }
}

impl Sampler for MicrophoneSampler {
    fn sample(&mut self) -> f32 {
        self.scratch.clear();
        if let Ok(window) = self.window.lock() {
            self.scratch.extend(window.iter().copied());
        }
        rms(&self.scratch)
    }
}
