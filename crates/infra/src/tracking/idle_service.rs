//! Idle tracking service
//!
//! Drives the idle state machine from a shared 1 Hz timer. The timer is
//! armed when the first key starts tracking and torn down once no keys
//! remain; closed idle periods are persisted as they are produced.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use tempo_core::tracking::{ClosedIdlePeriod, IdleProbe, IdleTracker};
use tempo_domain::constants::IDLE_POLL_INTERVAL_SECS;
use tempo_domain::errors::Result;
use tempo_domain::types::TaskKey;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::database::IdleRepository;

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

pub struct IdleService {
    probe: Arc<dyn IdleProbe>,
    repo: Arc<IdleRepository>,
    tracker: Arc<StdMutex<IdleTracker>>,
    cancellation_token: StdMutex<CancellationToken>,
    task_handle: TaskHandle,
}

impl IdleService {
    pub fn new(probe: Arc<dyn IdleProbe>, repo: Arc<IdleRepository>, threshold_secs: u64) -> Self {
        Self {
            probe,
            repo,
            tracker: Arc::new(StdMutex::new(IdleTracker::new(threshold_secs))),
            cancellation_token: StdMutex::new(CancellationToken::new()),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Track a key (making it active) and arm the shared timer if needed.
    pub async fn start_tracking(self: &Arc<Self>, key: TaskKey) {
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.start_tracking(key);
        }
        self.ensure_timer().await;
    }

    /// Switch the key that accumulates idle time.
    pub fn set_active(&self, key: TaskKey) {
        if let Ok(mut tracker) = self.tracker.lock() {
            tracker.set_active(key);
        }
    }

    /// Stop tracking a key; persists any open idle interval and returns the
    /// accumulated idle seconds.
    pub async fn stop_tracking(&self, key: TaskKey) -> Result<u64> {
        let now = Utc::now();
        let (stopped, empty) = match self.tracker.lock() {
            Ok(mut tracker) => {
                let stopped = tracker.stop_tracking(key, now);
                (stopped, tracker.is_empty())
            }
            Err(_) => (None, false),
        };

        let Some(stopped) = stopped else { return Ok(0) };
        if let Some(period) = stopped.open_period {
            self.persist(period).await;
        }
        if empty {
            self.disarm_timer().await;
        }
        Ok(stopped.accumulated_secs)
    }

    /// Forced teardown: close and persist every open interval, drop all
    /// keys, and disarm the timer.
    pub async fn clear_all(&self) {
        let closed = match self.tracker.lock() {
            Ok(mut tracker) => tracker.clear_all(Utc::now()),
            Err(_) => Vec::new(),
        };
        for period in closed {
            self.persist(period).await;
        }
        self.disarm_timer().await;
    }

    /// One poll: sample the probe and feed the state machine. Probe
    /// failures skip the sample; a wedged probe must not fabricate idle
    /// transitions.
    pub async fn poll_once(&self) {
        let probe = Arc::clone(&self.probe);
        let sampled =
            tokio::task::spawn_blocking(move || probe.idle_duration()).await.ok().and_then(
                |result| match result {
                    Ok(duration) => Some(duration),
                    Err(err) => {
                        debug!(error = %err, "idle probe failed, skipping sample");
                        None
                    }
                },
            );
        let Some(idle) = sampled else { return };

        let closed = match self.tracker.lock() {
            Ok(mut tracker) => tracker.observe(Utc::now(), idle.as_secs()),
            Err(_) => None,
        };
        if let Some(period) = closed {
            self.persist(period).await;
        }
    }

    async fn persist(&self, period: ClosedIdlePeriod) {
        debug!(
            project_id = period.key.project_id,
            task_id = period.key.task_id,
            duration_secs = period.duration_secs,
            "idle period closed"
        );
        if let Err(err) = self.repo.insert_period(period).await {
            warn!(error = %err, "failed to persist idle period");
        }
    }

    async fn ensure_timer(self: &Arc<Self>) {
        let mut guard = self.task_handle.lock().await;
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        if let Ok(mut token) = self.cancellation_token.lock() {
            *token = cancel.clone();
        }

        info!("idle polling timer armed");
        let service = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            let mut timer =
                tokio::time::interval(Duration::from_secs(IDLE_POLL_INTERVAL_SECS));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {
                        service.poll_once().await;
                        let empty = service
                            .tracker
                            .lock()
                            .map(|tracker| tracker.is_empty())
                            .unwrap_or(true);
                        if empty {
                            debug!("no tracked keys remain, idle timer stopping");
                            break;
                        }
                    }
                }
            }
        }));
    }

    async fn disarm_timer(&self) {
        if let Ok(token) = self.cancellation_token.lock() {
            token.cancel();
        }
        if let Some(handle) = self.task_handle.lock().await.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    use tempo_domain::errors::TempoError;
    use tempo_domain::types::ObservationKind;

    use super::*;
    use crate::database::open_store;
    use crate::paths::DataLayout;

    struct ScriptedProbe {
        samples: StdMutex<VecDeque<u64>>,
    }

    impl ScriptedProbe {
        fn new(samples: &[u64]) -> Self {
            Self { samples: StdMutex::new(samples.iter().copied().collect()) }
        }
    }

    impl IdleProbe for ScriptedProbe {
        fn idle_duration(&self) -> Result<Duration> {
            let mut samples = self.samples.lock().unwrap();
            samples
                .pop_front()
                .map(Duration::from_secs)
                .ok_or_else(|| TempoError::Platform("out of samples".to_string()))
        }
    }

    fn repo(dir: &tempfile::TempDir) -> Arc<IdleRepository> {
        let layout = DataLayout::new(dir.path().to_path_buf());
        Arc::new(IdleRepository::new(open_store(&layout, ObservationKind::Idle).unwrap()))
    }

    /// Register a key without arming the shared timer, so tests drive
    /// `poll_once` deterministically.
    fn track(service: &IdleService, key: TaskKey) {
        service.tracker.lock().unwrap().start_tracking(key);
    }

    #[tokio::test]
    async fn closed_periods_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let probe = Arc::new(ScriptedProbe::new(&[0, 61, 62, 0]));
        let service = Arc::new(IdleService::new(probe, Arc::clone(&repo), 60));

        track(&service, TaskKey::new(1, 2));
        for _ in 0..4 {
            service.poll_once().await;
        }

        assert_eq!(repo.count().await.unwrap(), 1);
        let accumulated = service.stop_tracking(TaskKey::new(1, 2)).await.unwrap();
        assert_eq!(accumulated, 2);
    }

    #[tokio::test]
    async fn stop_during_idle_persists_the_open_interval() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let probe = Arc::new(ScriptedProbe::new(&[90, 91]));
        let service = Arc::new(IdleService::new(probe, Arc::clone(&repo), 60));

        track(&service, TaskKey::new(3, -1));
        service.poll_once().await;
        service.poll_once().await;

        let accumulated = service.stop_tracking(TaskKey::new(3, -1)).await.unwrap();
        assert_eq!(accumulated, 2);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn probe_failures_skip_the_sample() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        // Empty script: every sample errors.
        let probe = Arc::new(ScriptedProbe::new(&[]));
        let service = Arc::new(IdleService::new(probe, Arc::clone(&repo), 60));

        track(&service, TaskKey::new(1, 1));
        service.poll_once().await;
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_all_persists_open_intervals() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let probe = Arc::new(ScriptedProbe::new(&[120]));
        let service = Arc::new(IdleService::new(probe, Arc::clone(&repo), 60));

        track(&service, TaskKey::new(5, 6));
        service.poll_once().await;
        service.clear_all().await;

        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn start_tracking_arms_the_timer_and_clear_all_disarms_it() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repo(&dir);
        let probe = Arc::new(ScriptedProbe::new(&[0]));
        let service = Arc::new(IdleService::new(probe, Arc::clone(&repo), 60));

        service.start_tracking(TaskKey::new(1, 1)).await;
        assert!(service.is_polling());

        service.clear_all().await;
        assert!(!service.is_polling());
    }
}
