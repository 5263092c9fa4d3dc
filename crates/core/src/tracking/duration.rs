//! Duration span change detection
//!
//! Maintains the open "frontmost application" span. A new span starts when
//! the observed application name differs from the previous observation; the
//! previous span is closed and handed back at that transition, or by
//! `flush_stale` once no observation has arrived for the inactivity
//! timeout. Only the application name participates in change detection; an
//! intra-application URL change does not close a span.

use chrono::{DateTime, Duration, Utc};
use tempo_domain::constants::DURATION_INACTIVITY_TIMEOUT_SECS;
use tempo_domain::types::{DurationRecord, TaskKey};

/// One capture-side observation of the foreground application.
#[derive(Debug, Clone)]
pub struct Observation {
    pub key: TaskKey,
    pub app_name: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OpenSpan {
    key: TaskKey,
    app_name: String,
    url: String,
    start_time: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

impl OpenSpan {
    fn close(self, end_time: DateTime<Utc>) -> DurationRecord {
        DurationRecord {
            id: 0,
            project_id: self.key.project_id,
            task_id: self.key.task_id,
            app_name: self.app_name,
            url: self.url,
            start_time: self.start_time,
            end_time,
        }
    }
}

/// Change detector producing closed [`DurationRecord`]s.
#[derive(Debug)]
pub struct DurationTracker {
    current: Option<OpenSpan>,
    inactivity_timeout: Duration,
}

impl Default for DurationTracker {
    fn default() -> Self {
        Self::new(Duration::seconds(DURATION_INACTIVITY_TIMEOUT_SECS))
    }
}

impl DurationTracker {
    pub fn new(inactivity_timeout: Duration) -> Self {
        Self { current: None, inactivity_timeout }
    }

    /// Feed one observation. Returns the previous span, closed, when the
    /// frontmost application changed.
    pub fn observe(&mut self, obs: Observation) -> Option<DurationRecord> {
        match self.current.take() {
            Some(mut span) if span.app_name == obs.app_name => {
                span.last_seen = obs.timestamp;
                self.current = Some(span);
                None
            }
            previous => {
                let closed = previous.map(|span| span.close(obs.timestamp));
                self.current = Some(OpenSpan {
                    key: obs.key,
                    app_name: obs.app_name,
                    url: obs.url,
                    start_time: obs.timestamp,
                    last_seen: obs.timestamp,
                });
                closed
            }
        }
    }

    /// Close the open span if no observation arrived within the inactivity
    /// timeout. The span ends at its last observation.
    pub fn flush_stale(&mut self, now: DateTime<Utc>) -> Option<DurationRecord> {
        let stale = self
            .current
            .as_ref()
            .is_some_and(|span| now - span.last_seen >= self.inactivity_timeout);
        if stale {
            self.current.take().map(|span| {
                let end = span.last_seen;
                span.close(end)
            })
        } else {
            None
        }
    }

    /// Unconditionally close the open span (shutdown path).
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<DurationRecord> {
        self.current.take().map(|span| span.close(now))
    }
}
