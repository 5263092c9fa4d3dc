//! Remote sampling policy
//!
//! Periodically fetches `/configuration` and caches the screenshot interval
//! it carries. Fetch failures keep the last known value; until the first
//! successful fetch the default interval applies. The capture side reads
//! the cache through a cheap [`PolicyHandle`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Deserialize;
use tempo_core::tracking::SamplingPolicy;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tempo_domain::constants::DEFAULT_SCREENSHOT_INTERVAL_MIN;

use crate::api::client::ApiClient;
use crate::api::transport::ApiResponse;

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const POLICY_PATH: &str = "/configuration";

/// Policy document returned by the configuration endpoint.
#[derive(Debug, Deserialize)]
struct PolicyDoc {
    #[serde(default)]
    screen_shot_interval: Option<u64>,
}

/// Read handle over the cached policy; clones share the cache.
#[derive(Clone)]
pub struct PolicyHandle {
    cached_interval_min: Arc<RwLock<Option<u64>>>,
}

impl SamplingPolicy for PolicyHandle {
    fn screenshot_interval_min(&self) -> u64 {
        self.cached_interval_min
            .read()
            .ok()
            .and_then(|guard| *guard)
            .unwrap_or(DEFAULT_SCREENSHOT_INTERVAL_MIN)
    }
}

/// Background fetcher keeping the sampling policy fresh.
pub struct PolicyWatcher {
    client: Arc<ApiClient>,
    interval: Duration,
    cached_interval_min: Arc<RwLock<Option<u64>>>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl PolicyWatcher {
    pub fn new(client: Arc<ApiClient>, interval: Duration) -> Self {
        Self {
            client,
            interval,
            cached_interval_min: Arc::new(RwLock::new(None)),
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn handle(&self) -> PolicyHandle {
        PolicyHandle { cached_interval_min: Arc::clone(&self.cached_interval_min) }
    }

    /// Fetch the policy once and update the cache on success.
    pub async fn refresh(&self) {
        refresh_once(&self.client, &self.cached_interval_min).await;
    }

    /// Start the refresh loop; the first fetch runs immediately.
    #[instrument(skip(self))]
    pub async fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.cancellation_token = CancellationToken::new();
        let cancel = self.cancellation_token.clone();
        let client = Arc::clone(&self.client);
        let cached = Arc::clone(&self.cached_interval_min);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => refresh_once(&client, &cached).await,
                }
            }
        });

        *self.task_handle.lock().await = Some(handle);
    }

    pub async fn stop(&mut self) {
        self.cancellation_token.cancel();
        if let Some(handle) = self.task_handle.lock().await.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for PolicyWatcher {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

async fn refresh_once(client: &ApiClient, cached: &RwLock<Option<u64>>) {
    match client.get::<ApiResponse<PolicyDoc>>(POLICY_PATH).await {
        Ok(response) if response.success => {
            match response.data.and_then(|doc| doc.screen_shot_interval) {
                Some(minutes) => {
                    if let Ok(mut guard) = cached.write() {
                        if *guard != Some(minutes) {
                            info!(minutes, "sampling policy updated");
                        }
                        *guard = Some(minutes);
                    }
                }
                None => debug!("policy fetch succeeded without an interval"),
            }
        }
        Ok(response) => {
            debug!(message = %response.message.unwrap_or_default(), "policy fetch rejected");
        }
        Err(err) => {
            warn!(error = %err, "policy fetch failed, keeping cached value");
        }
    }
}
