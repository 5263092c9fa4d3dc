//! Idle/active state machine
//!
//! Pure logic driven by 1 Hz samples of the OS idle duration. One tracker
//! instance serves all tracked (project, task) keys, but only the currently
//! active key accumulates idle seconds; switching the active key does not
//! migrate partial idle state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tempo_domain::types::TaskKey;

/// A finished continuous idle interval, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedIdlePeriod {
    pub key: TaskKey,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_secs: i64,
}

/// Result of `stop_tracking` for one key.
#[derive(Debug, Clone)]
pub struct StoppedTracking {
    /// Total idle seconds accumulated while the key was tracked.
    pub accumulated_secs: u64,
    /// Idle interval that was still open when tracking stopped, if any.
    pub open_period: Option<ClosedIdlePeriod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleState {
    Active,
    Idle { since: DateTime<Utc>, secs: i64 },
}

#[derive(Debug)]
struct TrackedTask {
    state: IdleState,
    accumulated_secs: u64,
}

/// Per-key idle tracking over a shared polling timer.
#[derive(Debug)]
pub struct IdleTracker {
    threshold_secs: u64,
    active: Option<TaskKey>,
    tasks: HashMap<TaskKey, TrackedTask>,
}

impl IdleTracker {
    pub fn new(threshold_secs: u64) -> Self {
        Self { threshold_secs, active: None, tasks: HashMap::new() }
    }

    /// Begin tracking a key and make it the active one.
    pub fn start_tracking(&mut self, key: TaskKey) {
        self.tasks
            .entry(key)
            .or_insert(TrackedTask { state: IdleState::Active, accumulated_secs: 0 });
        self.active = Some(key);
    }

    /// Switch which key accumulates idle time. A key never tracked is
    /// ignored; partial idle state of the previous key stays frozen.
    pub fn set_active(&mut self, key: TaskKey) {
        if self.tasks.contains_key(&key) {
            self.active = Some(key);
        }
    }

    /// Whether any key is still tracked (the shared timer is torn down once
    /// none remain).
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Feed one idle-duration sample for the active key.
    ///
    /// Returns a closed period on the `Idle -> Active` transition.
    pub fn observe(&mut self, now: DateTime<Utc>, idle_secs: u64) -> Option<ClosedIdlePeriod> {
        let key = self.active?;
        let task = self.tasks.get_mut(&key)?;

        if idle_secs >= self.threshold_secs {
            task.accumulated_secs += 1;
            task.state = match task.state {
                IdleState::Active => IdleState::Idle { since: now, secs: 1 },
                IdleState::Idle { since, secs } => IdleState::Idle { since, secs: secs + 1 },
            };
            None
        } else {
            match task.state {
                IdleState::Idle { since, secs } => {
                    task.state = IdleState::Active;
                    Some(ClosedIdlePeriod {
                        key,
                        start_time: since,
                        end_time: now,
                        duration_secs: secs,
                    })
                }
                IdleState::Active => None,
            }
        }
    }

    /// Stop tracking a key, returning its accumulated idle seconds and any
    /// idle interval still open.
    pub fn stop_tracking(&mut self, key: TaskKey, now: DateTime<Utc>) -> Option<StoppedTracking> {
        let task = self.tasks.remove(&key)?;
        if self.active == Some(key) {
            self.active = None;
        }

        let open_period = match task.state {
            IdleState::Idle { since, secs } => Some(ClosedIdlePeriod {
                key,
                start_time: since,
                end_time: now,
                duration_secs: secs,
            }),
            IdleState::Active => None,
        };

        Some(StoppedTracking { accumulated_secs: task.accumulated_secs, open_period })
    }

    /// Forced teardown at process shutdown: close every open idle interval
    /// and drop all keys.
    pub fn clear_all(&mut self, now: DateTime<Utc>) -> Vec<ClosedIdlePeriod> {
        let mut closed = Vec::new();
        for (key, task) in self.tasks.drain() {
            if let IdleState::Idle { since, secs } = task.state {
                closed.push(ClosedIdlePeriod {
                    key,
                    start_time: since,
                    end_time: now,
                    duration_secs: secs,
                });
            }
        }
        self.active = None;
        closed
    }
}
