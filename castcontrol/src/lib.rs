//! Minimal device-control abstraction shared between CastNow crates.
//!
//! This crate defines the narrow seam through which the monitoring core
//! talks to a playback backend (Chromecast, UPnP renderer, ...): a status
//! query plus the basic transport commands. Concrete network bindings live
//! outside the core and implement [`DeviceControl`]; implementations only
//! need to override the commands their backend supports.
//!
//! # Examples
//!
//! ```rust
//! use castcontrol::{DeviceControl, DeviceId, NullDeviceControl};
//!
//! # tokio_test::block_on(async {
//! let control = NullDeviceControl;
//! let device = DeviceId::new("living-room");
//!
//! // The null binding knows no devices at all
//! assert!(control.get_status(&device).await.is_err());
//! # });
//! ```

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

/// Result alias for device-control operations.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors produced by a device-control backend.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The device is not known to the backend (never discovered, or gone).
    #[error("device {0} not found")]
    DeviceNotFound(DeviceId),

    /// The backend does not implement this command.
    #[error("operation '{0}' is not supported by this control backend")]
    Unsupported(&'static str),

    /// The backend failed to execute a command or query.
    #[error("control backend error: {0}")]
    Backend(String),
}

impl ControlError {
    /// Create a backend error from a message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Stable identifier of a playback device, as reported by discovery.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical player state across backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PlayerState {
    Playing,
    Paused,
    Buffering,
    Idle,
    /// Backend-specific or unknown state label.
    Unknown(String),
}

impl PlayerState {
    /// Map a raw backend state label to a logical [`PlayerState`].
    ///
    /// Labels are matched case-insensitively; anything unrecognized is kept
    /// verbatim as [`PlayerState::Unknown`].
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PLAYING" => PlayerState::Playing,
            "PAUSED" | "PAUSED_PLAYBACK" => PlayerState::Paused,
            "BUFFERING" | "LOADING" => PlayerState::Buffering,
            "IDLE" | "STOPPED" => PlayerState::Idle,
            _ => PlayerState::Unknown(raw.to_string()),
        }
    }

    /// Human-readable label for the state.
    pub fn as_str(&self) -> &str {
        match self {
            PlayerState::Playing => "PLAYING",
            PlayerState::Paused => "PAUSED",
            PlayerState::Buffering => "BUFFERING",
            PlayerState::Idle => "IDLE",
            PlayerState::Unknown(s) => s.as_str(),
        }
    }
}

/// Snapshot of a device's playback condition.
#[derive(Clone, Debug, Serialize)]
pub struct DeviceStatus {
    /// True when no receiver app is running on the device.
    pub is_idle: bool,
    /// State of the media player session, if any.
    pub player_state: PlayerState,
}

/// Trait implemented by playback-control backends.
///
/// Only [`get_status`](DeviceControl::get_status) is required; transport
/// commands default to [`ControlError::Unsupported`] so read-only bindings
/// stay trivial to write.
///
/// All implementations must be `Send + Sync` so they can be shared across
/// monitor workers and the health check.
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// Query the current playback status of a device.
    async fn get_status(&self, device: &DeviceId) -> Result<DeviceStatus>;

    /// Load and play a media URL on the device.
    async fn play_url(
        &self,
        _device: &DeviceId,
        _url: &str,
        _title: Option<&str>,
    ) -> Result<()> {
        Err(ControlError::Unsupported("play_url"))
    }

    /// Resume playback.
    async fn play(&self, _device: &DeviceId) -> Result<()> {
        Err(ControlError::Unsupported("play"))
    }

    /// Pause playback.
    async fn pause(&self, _device: &DeviceId) -> Result<()> {
        Err(ControlError::Unsupported("pause"))
    }

    /// Stop playback and tear down the media session.
    async fn stop(&self, _device: &DeviceId) -> Result<()> {
        Err(ControlError::Unsupported("stop"))
    }
}

/// Control binding that knows no devices.
///
/// Useful for tests and for deployments where the monitoring core runs
/// without a cast backend: every status query reports the device as not
/// found, every command as unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDeviceControl;

#[async_trait]
impl DeviceControl for NullDeviceControl {
    async fn get_status(&self, device: &DeviceId) -> Result<DeviceStatus> {
        Err(ControlError::DeviceNotFound(device.clone()))
    }
}
