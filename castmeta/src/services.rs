//! Service registry wiring the monitoring core together
//!
//! One [`Services`] value is built at process start and shared (behind an
//! `Arc`) by the request layer; the health check runs inside it. There are
//! no module-level singletons; everything a caller can reach goes through
//! this registry.
//!
//! Besides the raw monitoring operations, the registry owns the small
//! playback dance the request layer would otherwise have to get right on
//! its own: stop monitoring the previous stream, dispatch playback, persist
//! the device mapping, start monitoring the right family.

use crate::bbc::{self, BbcClient};
use crate::error::{Error, Result};
use crate::health::{HealthCheck, HealthCheckConfig, HealthCheckHandle};
use crate::icy::{DEFAULT_USER_AGENT, IcyClient};
use crate::models::MetadataEntry;
use crate::pool::{BbcMonitorPool, BbcPoller, IcyMonitorPool, IcyPoller, MonitorPool, PoolConfig};
use castcontrol::{DeviceControl, DeviceId};
use caststore::StateStore;
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The wired monitoring core: both pools, the collaborators, and the
/// running health check.
pub struct Services {
    device_control: Arc<dyn DeviceControl>,
    store: Arc<dyn StateStore>,
    icy: Arc<IcyMonitorPool>,
    bbc: Arc<BbcMonitorPool>,
    health: Mutex<Option<HealthCheckHandle>>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Create a builder for wiring the registry
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    /// Whether a stream URL belongs to the BBC polling family.
    pub fn is_bbc_stream(&self, stream_url: &str) -> bool {
        bbc::is_bbc_stream(stream_url)
    }

    /// Start monitoring a stream on the family its URL belongs to.
    pub async fn start_monitoring(&self, stream_url: &str) {
        if self.is_bbc_stream(stream_url) {
            self.bbc.start(stream_url).await;
        } else {
            self.icy.start(stream_url).await;
        }
    }

    /// Stop monitoring a stream on both families.
    pub async fn stop_monitoring(&self, stream_url: &str) {
        self.bbc.stop(stream_url).await;
        self.icy.stop(stream_url).await;
    }

    /// Last known metadata for a stream.
    pub async fn get_metadata(&self, stream_url: &str) -> Option<MetadataEntry> {
        if self.is_bbc_stream(stream_url) {
            self.bbc.get_metadata(stream_url).await
        } else {
            self.icy.get_metadata(stream_url).await
        }
    }

    /// Play a station on a device and begin tracking its metadata.
    ///
    /// Any stream previously mapped to the device stops being monitored
    /// first. The mapping and the last-selected-device marker are persisted
    /// only when the playback command actually succeeded.
    pub async fn play_station(
        &self,
        device: &DeviceId,
        stream_url: &str,
        title: Option<&str>,
    ) -> Result<()> {
        if let Some(previous) = self.store.device_stream(device).await? {
            if previous != stream_url {
                debug!(device = %device, stream = %previous, "stopping monitoring for replaced stream");
                self.stop_monitoring(&previous).await;
            }
        }

        self.device_control.play_url(device, stream_url, title).await?;

        self.store.set_last_selected_device(device.as_str()).await?;
        self.store.set_device_stream(device, stream_url).await?;
        self.start_monitoring(stream_url).await;

        info!(device = %device, stream = %stream_url, "playback started");
        Ok(())
    }

    /// Stop playback on a device and tear down its metadata tracking.
    pub async fn stop_playback(&self, device: &DeviceId) -> Result<()> {
        if let Some(stream_url) = self.store.device_stream(device).await? {
            self.stop_monitoring(&stream_url).await;
            self.store.clear_device_stream(device).await?;
        }

        self.device_control.stop(device).await?;

        info!(device = %device, "playback stopped");
        Ok(())
    }

    /// Metadata for whatever stream a device is currently mapped to.
    ///
    /// `Ok(None)` covers both "no stream mapped" and "no metadata polled
    /// yet"; queries never fail because a poll has not happened.
    pub async fn device_now_playing(&self, device: &DeviceId) -> Result<Option<MetadataEntry>> {
        let Some(stream_url) = self.store.device_stream(device).await? else {
            return Ok(None);
        };
        Ok(self.get_metadata(&stream_url).await)
    }

    /// The device-control collaborator.
    pub fn device_control(&self) -> &Arc<dyn DeviceControl> {
        &self.device_control
    }

    /// The state-store collaborator.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// The in-band (ICY) monitor pool.
    pub fn icy_pool(&self) -> &Arc<IcyMonitorPool> {
        &self.icy
    }

    /// The BBC monitor pool.
    pub fn bbc_pool(&self) -> &Arc<BbcMonitorPool> {
        &self.bbc
    }

    /// Stop the health check and drain both pools.
    ///
    /// Every join is bounded; a stuck worker is logged and abandoned so
    /// process shutdown cannot hang. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(health) = self.health.lock().await.take() {
            health.stop().await;
        }
        self.icy.shutdown().await;
        self.bbc.shutdown().await;
        info!("monitoring services shut down");
    }
}

/// Builder for wiring [`Services`]
///
/// The device-control binding and the state store are required; pollers and
/// tuning knobs default to production settings. Custom clients exist mainly
/// so tests can point the pollers at mock servers.
#[derive(Default)]
pub struct ServicesBuilder {
    device_control: Option<Arc<dyn DeviceControl>>,
    store: Option<Arc<dyn StateStore>>,
    pool_config: PoolConfig,
    health_config: HealthCheckConfig,
    icy_client: Option<IcyClient>,
    bbc_client: Option<BbcClient>,
}

impl ServicesBuilder {
    /// Set the device-control binding (required)
    pub fn device_control(mut self, control: Arc<dyn DeviceControl>) -> Self {
        self.device_control = Some(control);
        self
    }

    /// Set the state store (required)
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the monitor-pool tuning
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    /// Override the health-check tuning
    pub fn health_config(mut self, config: HealthCheckConfig) -> Self {
        self.health_config = config;
        self
    }

    /// Use a preconfigured ICY client
    pub fn icy_client(mut self, client: IcyClient) -> Self {
        self.icy_client = Some(client);
        self
    }

    /// Use a preconfigured BBC client
    pub fn bbc_client(mut self, client: BbcClient) -> Self {
        self.bbc_client = Some(client);
        self
    }

    /// Wire everything and spawn the health check.
    pub fn build(self) -> Result<Services> {
        let device_control = self
            .device_control
            .ok_or_else(|| Error::other("service registry requires a device-control binding"))?;
        let store = self
            .store
            .ok_or_else(|| Error::other("service registry requires a state store"))?;

        // Both pollers share one HTTP connection pool unless custom clients
        // were injected.
        let (icy_client, bbc_client) = match (self.icy_client, self.bbc_client) {
            (Some(icy), Some(bbc)) => (icy, bbc),
            (icy, bbc) => {
                let http = Client::builder().user_agent(DEFAULT_USER_AGENT).build()?;
                let icy = icy.unwrap_or_else(|| IcyClient::with_client(http.clone()));
                let bbc = match bbc {
                    Some(client) => client,
                    None => BbcClient::builder().client(http).build()?,
                };
                (icy, bbc)
            }
        };

        let icy = Arc::new(MonitorPool::new(
            IcyPoller::new(icy_client),
            self.pool_config.clone(),
        ));
        let bbc = Arc::new(MonitorPool::new(
            BbcPoller::new(bbc_client),
            self.pool_config,
        ));

        let health = HealthCheck::new(
            Arc::clone(&device_control),
            Arc::clone(&store),
            Arc::clone(&icy),
            Arc::clone(&bbc),
            self.health_config,
        )
        .spawn();

        Ok(Services {
            device_control,
            store,
            icy,
            bbc,
            health: Mutex::new(Some(health)),
        })
    }
}
