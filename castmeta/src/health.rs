//! Periodic health check for stream monitors
//!
//! Monitors are started when playback starts, but playback can end without
//! anyone telling us: the device is switched off, another app takes it
//! over, the controlling client disappears. This loop is what guarantees
//! polling work is eventually torn down anyway.
//!
//! Each cycle reconciles two independent views:
//! 1. every device→stream mapping in the store against the device's actual
//!    playback state: idle or vanished devices get their monitors stopped
//!    and their mapping cleared;
//! 2. every active monitor's age against a hard ceiling: overdue monitors
//!    are stopped and any mapping still pointing at their stream is cleared
//!    as well, without assuming the first pass caught it.
//!
//! A failure on one item never aborts the rest of the cycle.

use crate::pool::{BbcMonitorPool, IcyMonitorPool, MonitorPool, StreamPoller};
use castcontrol::{ControlError, DeviceControl, DeviceId, PlayerState};
use caststore::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default wait between two health-check cycles
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;

/// Default ceiling on how long a single stream stays monitored
pub const DEFAULT_MAX_MONITORING_SECS: u64 = 600;

/// How long shutdown waits for the loop before giving up on it
const TASK_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning knobs for the health check
#[derive(Clone, Debug)]
pub struct HealthCheckConfig {
    /// Wait between two cycles.
    pub check_interval: Duration,
    /// Monitors at or past this age are stopped.
    pub max_monitoring_duration: Duration,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            max_monitoring_duration: Duration::from_secs(DEFAULT_MAX_MONITORING_SECS),
        }
    }
}

/// The health-check service itself.
///
/// Holds shared references to both monitor pools and the two collaborators
/// and interacts with them only through their public, already-synchronized
/// operations; it keeps no lock of its own.
pub struct HealthCheck {
    device_control: Arc<dyn DeviceControl>,
    store: Arc<dyn StateStore>,
    icy: Arc<IcyMonitorPool>,
    bbc: Arc<BbcMonitorPool>,
    config: HealthCheckConfig,
}

impl HealthCheck {
    pub fn new(
        device_control: Arc<dyn DeviceControl>,
        store: Arc<dyn StateStore>,
        icy: Arc<IcyMonitorPool>,
        bbc: Arc<BbcMonitorPool>,
        config: HealthCheckConfig,
    ) -> Self {
        Self {
            device_control,
            store,
            icy,
            bbc,
            config,
        }
    }

    /// Spawn the periodic loop. It runs one cycle immediately, then every
    /// configured interval until the returned handle is stopped.
    pub fn spawn(self) -> HealthCheckHandle {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            info!("playback health check started");
            loop {
                self.run_once().await;
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = sleep(self.config.check_interval) => {}
                }
            }
            info!("playback health check stopped");
        });

        HealthCheckHandle { cancel, task }
    }

    /// Run a single reconciliation cycle.
    pub async fn run_once(&self) {
        debug!("running playback health check");

        match self.store.all_device_streams().await {
            Ok(mappings) => {
                debug!(tracked = mappings.len(), "device streams to verify");
                for (device, stream_url) in mappings {
                    if let Err(err) = self.check_device(&device, &stream_url).await {
                        warn!(device = %device, "health check failed for device: {err}");
                    }
                }
            }
            Err(err) => warn!("could not enumerate device streams: {err}"),
        }

        self.stop_overdue(&self.icy).await;
        self.stop_overdue(&self.bbc).await;

        debug!("playback health check cycle complete");
    }

    /// Verify one device is still playing its mapped stream.
    async fn check_device(&self, device: &DeviceId, stream_url: &str) -> anyhow::Result<()> {
        let status = match self.device_control.get_status(device).await {
            Ok(status) => status,
            Err(ControlError::DeviceNotFound(_)) => {
                info!(device = %device, "device no longer reachable");
                self.cleanup_stream(device, stream_url, "device not found")
                    .await?;
                return Ok(());
            }
            // A failing query is not evidence the device stopped playing;
            // leave the mapping for the next cycle.
            Err(err) => return Err(err.into()),
        };

        debug!(
            device = %device,
            is_idle = status.is_idle,
            player_state = status.player_state.as_str(),
            "device status"
        );

        let stale = status.is_idle
            || matches!(
                status.player_state,
                PlayerState::Idle | PlayerState::Unknown(_)
            );
        if stale {
            self.cleanup_stream(device, stream_url, "device idle").await?;
        }

        Ok(())
    }

    /// Stop monitoring a stream on both pools and drop the device mapping.
    ///
    /// Stopping on the pool that never tracked the URL is a harmless no-op,
    /// so no family detection is needed here.
    async fn cleanup_stream(
        &self,
        device: &DeviceId,
        stream_url: &str,
        reason: &str,
    ) -> anyhow::Result<()> {
        info!(device = %device, stream = %stream_url, reason, "cleaning up stream monitoring");
        self.icy.stop(stream_url).await;
        self.bbc.stop(stream_url).await;
        self.store.clear_device_stream(device).await?;
        Ok(())
    }

    /// Stop every monitor in a pool that has reached the age ceiling, and
    /// clear any mapping still pointing at its stream.
    async fn stop_overdue<P: StreamPoller>(&self, pool: &MonitorPool<P>) {
        for (stream_url, elapsed) in pool.active_durations().await {
            if elapsed >= self.config.max_monitoring_duration {
                warn!(
                    stream = %stream_url,
                    elapsed_secs = elapsed.as_secs(),
                    "monitoring exceeded maximum duration, stopping"
                );
                pool.stop(&stream_url).await;
                self.clear_mappings_for(&stream_url).await;
            }
        }
    }

    /// Reverse scan: drop every device mapping that points at a stream.
    async fn clear_mappings_for(&self, stream_url: &str) {
        let mappings = match self.store.all_device_streams().await {
            Ok(mappings) => mappings,
            Err(err) => {
                warn!("could not enumerate device streams: {err}");
                return;
            }
        };

        for (device, mapped_url) in mappings {
            if mapped_url == stream_url {
                info!(device = %device, stream = %stream_url, "clearing device mapping");
                if let Err(err) = self.store.clear_device_stream(&device).await {
                    warn!(device = %device, "could not clear device mapping: {err}");
                }
            }
        }
    }
}

/// Handle to a spawned health-check loop.
pub struct HealthCheckHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HealthCheckHandle {
    /// Stop the loop and wait for it, with a bounded join.
    ///
    /// A loop that misses the deadline is logged and abandoned rather than
    /// blocking process shutdown.
    pub async fn stop(self) {
        self.cancel.cancel();
        match timeout(TASK_JOIN_TIMEOUT, self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!("health check task failed: {err}"),
            Err(_) => warn!(
                "health check did not stop within {}s",
                TASK_JOIN_TIMEOUT.as_secs()
            ),
        }
    }
}
