//! Loudness sources for the drive loop

#[cfg(feature = "microphone")]
mod microphone;
mod synthetic;

#[cfg(feature = "microphone")]
pub use microphone::MicrophoneSampler;
pub use synthetic::SyntheticSampler;

pub use noise_core::sampling::Sampler;

use thiserror::Error;

/// Audio acquisition failures. All of them happen during setup, before the
/// first sample is taken.
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("No audio input device available")]
    NoInputDevice,
    #[error("Audio device error: {0}")]
    Device(String),
    #[error("Audio stream error: {0}")]
    Stream(String),
}
