//! Persistent state abstraction shared between CastNow crates.
//!
//! The monitoring core needs three small pieces of durable state: the radio
//! station catalog, the last device the user selected, and the mapping from
//! each playback device to the stream URL currently believed to be playing
//! on it. This crate defines the [`StateStore`] trait for that surface and
//! ships [`MemoryStateStore`], an in-memory implementation suitable for
//! tests and single-process deployments. Database-backed implementations
//! live outside the core.
//!
//! The store has no caching semantics of its own; callers read and write
//! through it directly.
//!
//! # Examples
//!
//! ```rust
//! use castcontrol::DeviceId;
//! use caststore::{MemoryStateStore, StateStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStateStore::new();
//! let device = DeviceId::new("kitchen");
//!
//! store
//!     .set_device_stream(&device, "http://ice.example.org/stream")
//!     .await
//!     .unwrap();
//!
//! let url = store.device_stream(&device).await.unwrap();
//! assert_eq!(url.as_deref(), Some("http://ice.example.org/stream"));
//! # });
//! ```

use async_trait::async_trait;
use castcontrol::DeviceId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors produced by a state-store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend failed to read or write (connection lost, table missing, ...).
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create a backend error from a message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A radio station in the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Catalog key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Stream URL to dispatch to a device.
    pub url: String,
    /// Logo URL, if the station has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Trait implemented by state-store backends.
///
/// All operations are asynchronous so database backends can implement the
/// trait directly. Implementations must be `Send + Sync`.
#[async_trait]
pub trait StateStore: Send + Sync {
    // ------------------------------------------------------------------
    // Device / stream mappings
    // ------------------------------------------------------------------

    /// The stream URL currently associated with a device, if any.
    async fn device_stream(&self, device: &DeviceId) -> Result<Option<String>>;

    /// Associate a device with the stream it is now playing.
    async fn set_device_stream(&self, device: &DeviceId, url: &str) -> Result<()>;

    /// Remove a device's stream association. No-op when absent.
    async fn clear_device_stream(&self, device: &DeviceId) -> Result<()>;

    /// Snapshot of every device→stream association.
    async fn all_device_streams(&self) -> Result<HashMap<DeviceId, String>>;

    // ------------------------------------------------------------------
    // Station catalog
    // ------------------------------------------------------------------

    /// All stations, sorted by name (case-insensitive).
    async fn all_stations(&self) -> Result<Vec<Station>>;

    /// Look up a station by id.
    async fn station(&self, id: &str) -> Result<Option<Station>>;

    /// Insert or replace a station.
    async fn put_station(&self, station: Station) -> Result<()>;

    /// Delete a station by id. No-op when absent.
    async fn delete_station(&self, id: &str) -> Result<()>;

    // ------------------------------------------------------------------
    // UI state
    // ------------------------------------------------------------------

    /// Identifier of the device last selected for playback.
    async fn last_selected_device(&self) -> Result<Option<String>>;

    /// Remember the device last selected for playback.
    async fn set_last_selected_device(&self, device: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    device_streams: HashMap<DeviceId, String>,
    stations: HashMap<String, Station>,
    last_selected_device: Option<String>,
}

/// In-memory [`StateStore`] implementation.
///
/// State lives behind a `tokio::sync::RwLock` and is lost on process exit.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<MemoryState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn device_stream(&self, device: &DeviceId) -> Result<Option<String>> {
        Ok(self.state.read().await.device_streams.get(device).cloned())
    }

    async fn set_device_stream(&self, device: &DeviceId, url: &str) -> Result<()> {
        self.state
            .write()
            .await
            .device_streams
            .insert(device.clone(), url.to_string());
        Ok(())
    }

    async fn clear_device_stream(&self, device: &DeviceId) -> Result<()> {
        self.state.write().await.device_streams.remove(device);
        Ok(())
    }

    async fn all_device_streams(&self) -> Result<HashMap<DeviceId, String>> {
        Ok(self.state.read().await.device_streams.clone())
    }

    async fn all_stations(&self) -> Result<Vec<Station>> {
        let mut stations: Vec<Station> =
            self.state.read().await.stations.values().cloned().collect();
        stations.sort_by_key(|s| s.name.to_lowercase());
        Ok(stations)
    }

    async fn station(&self, id: &str) -> Result<Option<Station>> {
        Ok(self.state.read().await.stations.get(id).cloned())
    }

    async fn put_station(&self, station: Station) -> Result<()> {
        self.state
            .write()
            .await
            .stations
            .insert(station.id.clone(), station);
        Ok(())
    }

    async fn delete_station(&self, id: &str) -> Result<()> {
        self.state.write().await.stations.remove(id);
        Ok(())
    }

    async fn last_selected_device(&self) -> Result<Option<String>> {
        Ok(self.state.read().await.last_selected_device.clone())
    }

    async fn set_last_selected_device(&self, device: &str) -> Result<()> {
        self.state.write().await.last_selected_device = Some(device.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, name: &str) -> Station {
        Station {
            id: id.to_string(),
            name: name.to_string(),
            url: format!("http://radio.example.org/{id}"),
            icon_url: None,
        }
    }

    #[tokio::test]
    async fn test_device_stream_roundtrip() {
        let store = MemoryStateStore::new();
        let device = DeviceId::new("dev-1");

        assert_eq!(store.device_stream(&device).await.unwrap(), None);

        store
            .set_device_stream(&device, "http://a.example.org/s")
            .await
            .unwrap();
        assert_eq!(
            store.device_stream(&device).await.unwrap().as_deref(),
            Some("http://a.example.org/s")
        );

        let all = store.all_device_streams().await.unwrap();
        assert_eq!(all.len(), 1);

        store.clear_device_stream(&device).await.unwrap();
        assert_eq!(store.device_stream(&device).await.unwrap(), None);

        // clearing again is a no-op
        store.clear_device_stream(&device).await.unwrap();
    }

    #[tokio::test]
    async fn test_stations_sorted_by_name() {
        let store = MemoryStateStore::new();
        store.put_station(station("1", "zeta FM")).await.unwrap();
        store.put_station(station("2", "Alpha Radio")).await.unwrap();
        store.put_station(station("3", "beta One")).await.unwrap();

        let names: Vec<String> = store
            .all_stations()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alpha Radio", "beta One", "zeta FM"]);
    }

    #[tokio::test]
    async fn test_last_selected_device() {
        let store = MemoryStateStore::new();
        assert_eq!(store.last_selected_device().await.unwrap(), None);

        store.set_last_selected_device("kitchen").await.unwrap();
        assert_eq!(
            store.last_selected_device().await.unwrap().as_deref(),
            Some("kitchen")
        );
    }
}
