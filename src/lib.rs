//! Host side of the noise meter: audio sampling, the drive loop, chart
//! rendering, and log shipping around the `noise-core` store.

pub mod app_state;
pub mod display_manager;
pub mod drive;
pub mod emitter;
pub mod form_memory;
pub mod sampler;
