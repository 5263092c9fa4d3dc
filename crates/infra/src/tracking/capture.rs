//! Capture service
//!
//! Ties one capture tick together: gate on the sampling policy, resolve the
//! foreground application and (best effort) its active browser tab, queue
//! an activity record, feed the duration change detector, and spool
//! screenshots. Task start/stop manages time entries and idle tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock as StdRwLock};

use chrono::{Duration as ChronoDuration, Utc};
use tempo_core::tracking::{
    CaptureGate, DurationTracker, ForegroundProvider, Observation, SamplingPolicy, ScreenGrabber,
    TabResolver,
};
use tempo_domain::errors::Result;
use tempo_domain::types::{ActivityRecord, ScreenshotName, TaskKey};
use tracing::{debug, info, warn};

use crate::database::{ActivityRepository, DurationRepository, TimeEntryRepository};
use crate::screenshots::ScreenshotStore;

use super::idle_service::IdleService;

pub struct CaptureService {
    foreground: Arc<dyn ForegroundProvider>,
    tabs: Arc<dyn TabResolver>,
    grabber: Option<Arc<dyn ScreenGrabber>>,
    policy: Arc<dyn SamplingPolicy>,
    activities: Arc<ActivityRepository>,
    durations: Arc<DurationRepository>,
    time_entries: Arc<TimeEntryRepository>,
    screenshots: Arc<ScreenshotStore>,
    idle: Arc<IdleService>,
    gate: StdMutex<CaptureGate>,
    duration_tracker: StdMutex<DurationTracker>,
    selected: StdRwLock<Option<TaskKey>>,
    open_entries: StdMutex<HashMap<TaskKey, i64>>,
}

impl CaptureService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        foreground: Arc<dyn ForegroundProvider>,
        tabs: Arc<dyn TabResolver>,
        grabber: Option<Arc<dyn ScreenGrabber>>,
        policy: Arc<dyn SamplingPolicy>,
        activities: Arc<ActivityRepository>,
        durations: Arc<DurationRepository>,
        time_entries: Arc<TimeEntryRepository>,
        screenshots: Arc<ScreenshotStore>,
        idle: Arc<IdleService>,
    ) -> Self {
        Self {
            foreground,
            tabs,
            grabber,
            policy,
            activities,
            durations,
            time_entries,
            screenshots,
            idle,
            gate: StdMutex::new(CaptureGate::new()),
            duration_tracker: StdMutex::new(DurationTracker::default()),
            selected: StdRwLock::new(None),
            open_entries: StdMutex::new(HashMap::new()),
        }
    }

    /// Begin timing a task: opens a time entry, starts idle tracking, and
    /// makes the key the capture target.
    pub async fn start_task(&self, key: TaskKey) -> Result<()> {
        let entry_id = self.time_entries.open(key, Utc::now()).await?;
        if let Ok(mut open) = self.open_entries.lock() {
            open.insert(key, entry_id);
        }
        if let Ok(mut selected) = self.selected.write() {
            *selected = Some(key);
        }
        self.idle.start_tracking(key).await;
        info!(project_id = key.project_id, task_id = key.task_id, "task started");
        Ok(())
    }

    /// Stop timing a task. Closes its time entry and returns the idle
    /// seconds accumulated while it was tracked.
    pub async fn stop_task(&self, key: TaskKey) -> Result<u64> {
        let entry_id = self.open_entries.lock().ok().and_then(|mut open| open.remove(&key));
        if let Some(id) = entry_id {
            self.time_entries.close(id, Utc::now()).await?;
        }

        if self.selected.read().ok().and_then(|s| *s) == Some(key) {
            if let Ok(mut selected) = self.selected.write() {
                *selected = None;
            }
        }

        let idle_secs = self.idle.stop_tracking(key).await?;
        info!(
            project_id = key.project_id,
            task_id = key.task_id,
            idle_secs,
            "task stopped"
        );
        Ok(idle_secs)
    }

    /// Currently selected capture target, if any.
    pub fn selected_task(&self) -> Option<TaskKey> {
        self.selected.read().ok().and_then(|s| *s)
    }

    /// One externally driven tick (roughly 1 Hz).
    ///
    /// Stale duration spans are flushed on every tick; the capture itself
    /// only fires when the sampling-policy gate allows it.
    pub async fn tick(&self) -> Result<()> {
        let now = Utc::now();

        let stale = self.duration_tracker.lock().ok().and_then(|mut t| t.flush_stale(now));
        if let Some(record) = stale {
            self.durations.insert(record).await?;
        }

        let Some(key) = self.selected_task() else { return Ok(()) };

        let interval = ChronoDuration::minutes(self.policy.screenshot_interval_min() as i64);
        let due = self
            .gate
            .lock()
            .ok()
            .map(|mut gate| gate.should_fire(now, interval))
            .unwrap_or(false);
        if !due {
            return Ok(());
        }

        let app_name = match self.foreground.foreground_app().await {
            Ok(name) => name,
            Err(err) => {
                warn!(error = %err, "foreground lookup failed, skipping capture");
                return Ok(());
            }
        };

        // Browser failures degrade to "no URL"; the activity still counts.
        let url = match self.tabs.resolve_active_tab(&app_name).await {
            Ok(Some(tab)) => tab.url,
            Ok(None) => String::new(),
            Err(err) => {
                debug!(error = %err, app_name, "tab resolution failed, capturing without URL");
                String::new()
            }
        };

        self.activities
            .insert(ActivityRecord {
                id: 0,
                project_id: key.project_id,
                task_id: key.task_id,
                app_name: app_name.clone(),
                url: url.clone(),
                timestamp: now,
            })
            .await?;

        let closed = self.duration_tracker.lock().ok().and_then(|mut t| {
            t.observe(Observation { key, app_name, url, timestamp: now })
        });
        if let Some(record) = closed {
            self.durations.insert(record).await?;
        }

        if let Some(grabber) = &self.grabber {
            match grabber.grab().await {
                Ok(frames) => {
                    for frame in frames {
                        let name =
                            ScreenshotName::new(key.project_id, key.task_id, now, frame.display);
                        if let Err(err) = self.screenshots.store(&name, &frame.png).await {
                            warn!(error = %err, "failed to spool screenshot");
                        }
                    }
                }
                Err(err) => debug!(error = %err, "screen grab failed"),
            }
        }

        Ok(())
    }

    /// Shutdown path: close the open duration span and tear down idle
    /// tracking, persisting whatever is still open.
    pub async fn shutdown(&self) {
        let now = Utc::now();
        let open = self.duration_tracker.lock().ok().and_then(|mut t| t.flush(now));
        if let Some(record) = open {
            if let Err(err) = self.durations.insert(record).await {
                warn!(error = %err, "failed to persist final duration span");
            }
        }
        self.idle.clear_all().await;
    }
}
