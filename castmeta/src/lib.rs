//! # castmeta - Now-playing metadata monitoring for cast playback
//!
//! `castmeta` tracks what internet radio streams are playing while they are
//! rendered on remote playback devices. It polls two wire formats (in-band
//! ICY metadata framing, and the BBC RMS segments API), normalizes both
//! into a common shape, detects song changes, and keeps a short per-stream
//! history of what played before.
//!
//! ## Features
//!
//! - **One worker per stream**: monitoring is started and stopped
//!   idempotently; at most one poller ever runs per stream URL per family
//! - **Last-known-value cache**: metadata survives the monitor that
//!   produced it, so queries never block on a poll
//! - **Self-cleaning**: a periodic health check stops monitors whose
//!   device went idle or vanished, and caps how long any stream is polled
//! - **Narrow seams**: playback devices and persistence are reached only
//!   through the [`castcontrol`] and [`caststore`] traits
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use castmeta::Services;
//! use castcontrol::NullDeviceControl;
//! use caststore::MemoryStateStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let services = Services::builder()
//!         .device_control(Arc::new(NullDeviceControl))
//!         .store(Arc::new(MemoryStateStore::new()))
//!         .build()?;
//!
//!     services.start_monitoring("http://ice.example.org/radio").await;
//!
//!     if let Some(entry) = services.get_metadata("http://ice.example.org/radio").await {
//!         println!("Now playing: {}", entry.raw);
//!     }
//!
//!     services.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bbc;
pub mod error;
pub mod health;
pub mod icy;
pub mod models;
pub mod pool;
pub mod services;

pub use bbc::{BbcClient, BbcClientBuilder, extract_station_id, is_bbc_stream};
pub use error::{Error, Result};
pub use health::{HealthCheck, HealthCheckConfig, HealthCheckHandle};
pub use icy::IcyClient;
pub use models::{HistorySong, MetadataEntry, NowPlaying};
pub use pool::{
    BbcMonitorPool, BbcPoller, IcyMonitorPool, IcyPoller, MonitorPool, PoolConfig, StreamPoller,
};
pub use services::{Services, ServicesBuilder};
