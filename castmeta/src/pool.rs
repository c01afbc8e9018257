//! Generic stream monitor pool
//!
//! A pool runs at most one background worker per monitored stream URL and
//! owns the metadata cache those workers publish into. The two polling
//! families are two instances of the same pool, parameterized by a
//! [`StreamPoller`]; all lifecycle and locking logic lives here once.
//!
//! One `RwLock` guards both the handle table and the cache, and every
//! mutation goes through pool methods; the maps are never exposed.
//! Network I/O always happens outside the lock.

use crate::bbc::{self, BbcClient};
use crate::error::Result;
use crate::icy::IcyClient;
use crate::models::{MetadataEntry, NowPlaying};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default wait between two polls of the same stream
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// How long shutdown waits for each worker before giving up on it
const WORKER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Tuning knobs for a monitor pool
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Wait between two polls of the same stream.
    pub poll_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// One polling strategy, plugged into a [`MonitorPool`].
///
/// `prepare` runs once at `start()` and extracts whatever the family needs
/// to poll: the URL itself for in-band metadata, a station identifier for
/// the REST family. A failure there means monitoring cannot begin at all.
/// `poll` runs once per cycle; `Ok(None)` means "nothing to report this
/// time", which is not a failure.
#[async_trait]
pub trait StreamPoller: Send + Sync + 'static {
    type Target: Clone + Send + Sync + 'static;

    /// Short family label used in logs.
    fn family(&self) -> &'static str;

    /// Derive the poll target from the stream URL.
    fn prepare(&self, stream_url: &str) -> Result<Self::Target>;

    /// Poll the target once.
    async fn poll(&self, target: &Self::Target) -> Result<Option<NowPlaying>>;
}

/// In-band (ICY) polling strategy: the stream URL is polled directly.
pub struct IcyPoller {
    client: IcyClient,
}

impl IcyPoller {
    pub fn new(client: IcyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamPoller for IcyPoller {
    type Target = String;

    fn family(&self) -> &'static str {
        "icy"
    }

    fn prepare(&self, stream_url: &str) -> Result<String> {
        Ok(stream_url.to_string())
    }

    async fn poll(&self, target: &String) -> Result<Option<NowPlaying>> {
        self.client.fetch_now_playing(target).await
    }
}

/// REST polling strategy: polls the RMS API with the station identifier
/// extracted from the stream URL.
pub struct BbcPoller {
    client: BbcClient,
}

impl BbcPoller {
    pub fn new(client: BbcClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamPoller for BbcPoller {
    type Target = String;

    fn family(&self) -> &'static str {
        "bbc"
    }

    fn prepare(&self, stream_url: &str) -> Result<String> {
        bbc::extract_station_id(stream_url)
    }

    async fn poll(&self, target: &String) -> Result<Option<NowPlaying>> {
        self.client.fetch_latest_segment(target).await
    }
}

/// Pool monitoring in-band (ICY) streams
pub type IcyMonitorPool = MonitorPool<IcyPoller>;

/// Pool monitoring BBC streams through the RMS API
pub type BbcMonitorPool = MonitorPool<BbcPoller>;

/// Live monitor for one stream: its stop signal, start time and task.
struct MonitorHandle {
    cancel: CancellationToken,
    started_at: Instant,
    worker: JoinHandle<()>,
}

#[derive(Default)]
struct PoolState {
    handles: HashMap<String, MonitorHandle>,
    cache: HashMap<String, MetadataEntry>,
}

/// Pool of background metadata monitors for one polling family.
///
/// `start` and `stop` are idempotent; `get_metadata` keeps returning the
/// last published entry after the monitor is gone, so callers always see
/// the most recent known song for a stream.
pub struct MonitorPool<P: StreamPoller> {
    poller: Arc<P>,
    state: Arc<RwLock<PoolState>>,
    config: PoolConfig,
}

impl<P: StreamPoller> MonitorPool<P> {
    pub fn new(poller: P, config: PoolConfig) -> Self {
        Self {
            poller: Arc::new(poller),
            state: Arc::new(RwLock::new(PoolState::default())),
            config,
        }
    }

    /// Start monitoring a stream. No-op when already monitored.
    ///
    /// When the poller cannot derive a poll target from the URL, the error
    /// is logged and no monitor is created; the call can simply be retried
    /// with a corrected URL.
    pub async fn start(&self, stream_url: &str) {
        let mut state = self.state.write().await;
        if state.handles.contains_key(stream_url) {
            debug!(family = self.poller.family(), stream = %stream_url, "already monitoring");
            return;
        }

        let target = match self.poller.prepare(stream_url) {
            Ok(target) => target,
            Err(err) => {
                warn!(
                    family = self.poller.family(),
                    stream = %stream_url,
                    "cannot start monitoring: {err}"
                );
                return;
            }
        };

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(monitor_stream(
            Arc::clone(&self.poller),
            Arc::clone(&self.state),
            stream_url.to_string(),
            target,
            cancel.clone(),
            self.config.poll_interval,
        ));
        state.handles.insert(
            stream_url.to_string(),
            MonitorHandle {
                cancel,
                started_at: Instant::now(),
                worker,
            },
        );

        info!(family = self.poller.family(), stream = %stream_url, "started metadata monitoring");
    }

    /// Stop monitoring a stream. Safe to repeat, and a no-op for URLs that
    /// were never started. The cached entry is left in place.
    pub async fn stop(&self, stream_url: &str) {
        let mut state = self.state.write().await;
        if let Some(handle) = state.handles.remove(stream_url) {
            handle.cancel.cancel();
            info!(family = self.poller.family(), stream = %stream_url, "stopped metadata monitoring");
        }
    }

    /// Last known metadata for a stream, monitored or not.
    pub async fn get_metadata(&self, stream_url: &str) -> Option<MetadataEntry> {
        self.state.read().await.cache.get(stream_url).cloned()
    }

    /// Whether a monitor currently exists for this stream.
    pub async fn is_monitoring(&self, stream_url: &str) -> bool {
        self.state.read().await.handles.contains_key(stream_url)
    }

    /// Snapshot of how long each currently-monitored stream has been
    /// monitored.
    pub async fn active_durations(&self) -> HashMap<String, Duration> {
        self.state
            .read()
            .await
            .handles
            .iter()
            .map(|(url, handle)| (url.clone(), handle.started_at.elapsed()))
            .collect()
    }

    /// Stop every monitor and wait for the workers, each join bounded.
    ///
    /// A worker that misses its deadline is logged and abandoned; shutdown
    /// never hangs on a stuck poll.
    pub async fn shutdown(&self) {
        let handles: Vec<(String, MonitorHandle)> =
            self.state.write().await.handles.drain().collect();

        for (_, handle) in &handles {
            handle.cancel.cancel();
        }

        for (stream_url, handle) in handles {
            match timeout(WORKER_JOIN_TIMEOUT, handle.worker).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(family = self.poller.family(), stream = %stream_url, "monitor worker failed: {err}");
                }
                Err(_) => {
                    warn!(
                        family = self.poller.family(),
                        stream = %stream_url,
                        "monitor worker did not stop within {}s",
                        WORKER_JOIN_TIMEOUT.as_secs()
                    );
                }
            }
        }
    }
}

/// Body of one monitor worker.
///
/// Runs until cancelled. A failed poll is logged and the monitor keeps
/// going; the inter-poll wait is interruptible so `stop()` takes effect
/// within the in-flight request's own timeout rather than a full cycle.
async fn monitor_stream<P: StreamPoller>(
    poller: Arc<P>,
    state: Arc<RwLock<PoolState>>,
    stream_url: String,
    target: P::Target,
    cancel: CancellationToken,
    poll_interval: Duration,
) {
    let family = poller.family();

    loop {
        let polled = tokio::select! {
            _ = cancel.cancelled() => break,
            polled = poller.poll(&target) => polled,
        };

        match polled {
            Ok(Some(now)) => publish(&state, family, &stream_url, now).await,
            Ok(None) => debug!(family, stream = %stream_url, "no metadata this cycle"),
            Err(err) => warn!(family, stream = %stream_url, "metadata poll failed: {err}"),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(poll_interval) => {}
        }
    }

    debug!(family, stream = %stream_url, "monitor worker exited");
}

/// Merge one poll result into the cache; logs only actual song changes.
async fn publish(state: &RwLock<PoolState>, family: &'static str, stream_url: &str, now: NowPlaying) {
    let polled_at = Utc::now();
    let mut state = state.write().await;

    let changed = match state.cache.entry(stream_url.to_string()) {
        Entry::Occupied(mut occupied) => occupied.get_mut().update(now, polled_at),
        Entry::Vacant(vacant) => {
            vacant.insert(MetadataEntry::new(now, polled_at));
            true
        }
    };

    if changed {
        if let Some(entry) = state.cache.get(stream_url) {
            info!(
                family,
                stream = %stream_url,
                artist = entry.artist.as_deref().unwrap_or(""),
                title = entry.title.as_deref().unwrap_or(""),
                "song changed"
            );
        }
    }
}
