//! Platform-independent core library for noise-meter
//!
//! This crate contains all logic of the ambient noise instrument that does
//! not touch audio hardware, the network or the filesystem: the windowed
//! aggregation store, summary statistics, chart series, the Loki push
//! payload, rollover events, and chart rendering onto any
//! `embedded-graphics` draw target.
//!
//! Binaries (the meter itself and the relay) depend on this crate and
//! provide the I/O around it.

pub mod chart;
pub mod config;
pub mod events;
pub mod loki;
pub mod metrics;
pub mod sampling;
pub mod storage;
pub mod ui;
