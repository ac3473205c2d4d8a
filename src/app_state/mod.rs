//! Application-wide state and error types for the noise meter

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};
use thiserror::Error;

use noise_core::events::{
    EVENT_CHANNEL_CAPACITY, EVENT_PUBLISHERS, EVENT_SUBSCRIBERS, NoiseEvent,
};

use crate::form_memory::FormMemoryError;
use crate::sampler::SamplerError;

/// Pub-sub channel carrying rollover events from the drive loop
pub type NoiseChannel = PubSubChannel<
    CriticalSectionRawMutex,
    NoiseEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type NoisePublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    NoiseEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type NoiseSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    NoiseEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

/// Global pub-sub channel for noise events
/// The drive loop publishes; the display manager and the log emitter subscribe
pub static NOISE_CHANNEL: NoiseChannel = PubSubChannel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    /// Samples are flowing but no period has completed yet
    Measuring,
    /// At least one completed period has been published
    Reporting,
    Stopped,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Audio acquisition failed: {0}")]
    Sampler(#[from] SamplerError),
    #[error("Form memory error: {0}")]
    FormMemory(#[from] FormMemoryError),
    #[error("Event channel error: {0}")]
    Channel(&'static str),
}

/// Take the drive loop's publisher from `channel`
pub fn publisher(channel: &NoiseChannel) -> Result<NoisePublisher<'_>, AppError> {
    channel
        .publisher()
        .map_err(|_| AppError::Channel("no publisher slot left"))
}

/// Take one subscriber from `channel`
pub fn subscriber(channel: &NoiseChannel) -> Result<NoiseSubscriber<'_>, AppError> {
    channel
        .subscriber()
        .map_err(|_| AppError::Channel("no subscriber slot left"))
}
