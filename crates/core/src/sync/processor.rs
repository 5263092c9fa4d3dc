//! Generic durable-queue sync processor
//!
//! One instantiation per observation kind. A timer-driven loop drains queued
//! records, posts them to the remote endpoint, and deletes each record only
//! on an acknowledged success. Every instantiation is independent: no lock
//! is shared across kinds, and within one kind an in-flight flag makes
//! overlapping cycles a no-op (skip, not queue).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tempo_domain::constants::SYNC_BATCH_SIZE;
use tempo_domain::types::ObservationKind;

use super::ports::{SyncBacklog, SyncTransport};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Lifecycle errors for a queue processor
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor already running")]
    AlreadyRunning,

    #[error("processor not running")]
    NotRunning,

    #[error("processor shutdown timed out after {0:?}")]
    ShutdownTimeout(Duration),

    #[error("processor task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration for one processor instantiation
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Observation kind this processor drains; fixes the endpoint path.
    pub kind: ObservationKind,
    /// Interval between cycles (the first cycle runs immediately on start).
    pub interval: Duration,
    /// Upper bound on records pulled per cycle.
    pub batch_size: usize,
}

impl ProcessorConfig {
    pub fn new(kind: ObservationKind, interval: Duration) -> Self {
        Self { kind, interval, batch_size: SYNC_BATCH_SIZE }
    }
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub kind: ObservationKind,
    /// True when the cycle was a re-entrancy no-op.
    pub skipped: bool,
    /// Records fetched from the backlog this cycle.
    pub fetched: usize,
    /// Records acknowledged and deleted.
    pub forwarded: usize,
    /// Records the endpoint answered with `success: false`; left for retry.
    pub rejected: usize,
    /// Records that hit a transport or delete error; left for retry.
    pub failed: usize,
    /// Per-record errors as (record id, message).
    pub errors: Vec<(String, String)>,
}

impl CycleReport {
    fn skipped(kind: ObservationKind) -> Self {
        Self {
            kind,
            skipped: true,
            fetched: 0,
            forwarded: 0,
            rejected: 0,
            failed: 0,
            errors: Vec::new(),
        }
    }

    fn empty(kind: ObservationKind) -> Self {
        Self { skipped: false, ..Self::skipped(kind) }
    }
}

/// Shared state cloned into the background loop.
struct CycleContext {
    backlog: Arc<dyn SyncBacklog>,
    transport: Arc<dyn SyncTransport>,
    config: ProcessorConfig,
    in_flight: Arc<AtomicBool>,
}

/// Timer-driven processor for one observation kind.
pub struct QueueProcessor {
    context: Arc<CycleContext>,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl QueueProcessor {
    pub fn new(
        backlog: Arc<dyn SyncBacklog>,
        transport: Arc<dyn SyncTransport>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            context: Arc::new(CycleContext {
                backlog,
                transport,
                config,
                in_flight: Arc::new(AtomicBool::new(false)),
            }),
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Observation kind this processor serves.
    pub fn kind(&self) -> ObservationKind {
        self.context.config.kind
    }

    /// Start the processor.
    ///
    /// Runs one cycle immediately, then repeats on the configured interval.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::AlreadyRunning`] if already started.
    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn start(&mut self) -> Result<(), ProcessorError> {
        if self.is_running() {
            return Err(ProcessorError::AlreadyRunning);
        }

        info!("starting sync processor");

        // Fresh token so the processor can be restarted after a stop.
        self.cancellation_token = CancellationToken::new();
        let cancel = self.cancellation_token.clone();
        let context = Arc::clone(&self.context);

        let handle = tokio::spawn(async move {
            Self::sync_loop(context, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop the processor gracefully.
    ///
    /// Disarms the timer; an in-flight cycle is left to finish. Only the
    /// *next* cycle is prevented from starting.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::NotRunning`] if not started.
    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn stop(&mut self) -> Result<(), ProcessorError> {
        if !self.is_running() {
            return Err(ProcessorError::NotRunning);
        }

        info!("stopping sync processor");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| ProcessorError::ShutdownTimeout(join_timeout))??;
        }

        Ok(())
    }

    /// Whether a background loop is currently armed.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Run a single cycle outside the timer (used by the immediate-start
    /// path and by tests). Honors the same re-entrancy guard.
    pub async fn run_cycle(&self) -> CycleReport {
        Self::cycle(&self.context).await
    }

    async fn sync_loop(context: Arc<CycleContext>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(context.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(kind = %context.config.kind, "sync loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let report = Self::cycle(&context).await;
                    if report.forwarded > 0 || report.failed > 0 || report.rejected > 0 {
                        info!(
                            kind = %report.kind,
                            fetched = report.fetched,
                            forwarded = report.forwarded,
                            rejected = report.rejected,
                            failed = report.failed,
                            "sync cycle finished"
                        );
                    }
                }
            }
        }
    }

    async fn cycle(context: &CycleContext) -> CycleReport {
        let kind = context.config.kind;

        // Re-entrancy guard: a cycle firing while one is in flight is a
        // skip, never a queue.
        if context
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(kind = %kind, "cycle already in flight; skipping");
            return CycleReport::skipped(kind);
        }
        let _guard = InFlightGuard(&context.in_flight);

        let mut report = CycleReport::empty(kind);

        let batch = match context.backlog.pending(context.config.batch_size).await {
            Ok(batch) => batch,
            Err(err) => {
                warn!(kind = %kind, error = %err, "failed to fetch pending records");
                report.errors.push(("<cycle>".to_string(), err.to_string()));
                return report;
            }
        };
        report.fetched = batch.len();

        for upload in batch {
            match context.transport.submit(kind.endpoint(), &upload.body).await {
                Ok(ack) if ack.success => {
                    match context.backlog.remove(&upload.id).await {
                        Ok(()) => report.forwarded += 1,
                        Err(err) => {
                            // The record stays queued; the endpoint will see
                            // it again next cycle.
                            warn!(kind = %kind, id = %upload.id, error = %err, "failed to delete acknowledged record");
                            report.failed += 1;
                            report.errors.push((upload.id, err.to_string()));
                        }
                    }
                }
                Ok(ack) => {
                    debug!(kind = %kind, id = %upload.id, message = %ack.message, "record rejected; will retry");
                    report.rejected += 1;
                }
                Err(err) => {
                    warn!(kind = %kind, id = %upload.id, error = %err, "failed to forward record");
                    report.failed += 1;
                    report.errors.push((upload.id, err.to_string()));
                }
            }
        }

        report
    }
}

/// Releases the in-flight flag unconditionally, including on panic, so a
/// transient failure cannot permanently wedge the loop.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Drop for QueueProcessor {
    fn drop(&mut self) {
        // Best-effort cleanup; the handle cannot be awaited here.
        if !self.cancellation_token.is_cancelled() {
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tempo_domain::{Result, TempoError};
    use tokio::sync::Notify;

    use super::*;
    use crate::sync::ports::{PendingUpload, SyncAck};

    /// In-memory backlog keyed by id.
    struct MemoryBacklog {
        rows: std::sync::Mutex<BTreeMap<u64, Value>>,
    }

    impl MemoryBacklog {
        fn with_rows(count: u64) -> Self {
            let rows = (0..count).map(|i| (i, json!({ "project_id": i }))).collect();
            Self { rows: std::sync::Mutex::new(rows) }
        }

        fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SyncBacklog for MemoryBacklog {
        async fn pending(&self, limit: usize) -> Result<Vec<PendingUpload>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .take(limit)
                .map(|(id, body)| PendingUpload { id: id.to_string(), body: body.clone() })
                .collect())
        }

        async fn remove(&self, id: &str) -> Result<()> {
            let id: u64 = id.parse().map_err(|_| TempoError::InvalidInput(id.into()))?;
            self.rows.lock().unwrap().remove(&id);
            Ok(())
        }
    }

    /// Transport with a switchable acknowledgment and a call counter.
    struct ScriptedTransport {
        succeed: AtomicBool,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        fn new(succeed: bool) -> Self {
            Self { succeed: AtomicBool::new(succeed), calls: AtomicUsize::new(0), gate: None }
        }

        fn gated(gate: Arc<Notify>) -> Self {
            Self {
                succeed: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
                gate: Some(gate),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SyncTransport for ScriptedTransport {
        async fn submit(&self, _endpoint: &str, _record: &Value) -> Result<SyncAck> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(SyncAck {
                success: self.succeed.load(Ordering::SeqCst),
                message: String::new(),
            })
        }
    }

    fn processor(
        backlog: Arc<MemoryBacklog>,
        transport: Arc<ScriptedTransport>,
    ) -> QueueProcessor {
        QueueProcessor::new(
            backlog,
            transport,
            ProcessorConfig::new(ObservationKind::Activity, Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn rejected_rows_survive_and_drain_on_later_success() {
        let backlog = Arc::new(MemoryBacklog::with_rows(3));
        let transport = Arc::new(ScriptedTransport::new(false));
        let proc = processor(Arc::clone(&backlog), Arc::clone(&transport));

        let report = proc.run_cycle().await;
        assert_eq!(report.rejected, 3);
        assert_eq!(report.forwarded, 0);
        assert_eq!(backlog.len(), 3, "unacknowledged rows must remain queued");

        transport.succeed.store(true, Ordering::SeqCst);
        let report = proc.run_cycle().await;
        assert_eq!(report.forwarded, 3);
        assert_eq!(backlog.len(), 0);
    }

    #[tokio::test]
    async fn transport_errors_leave_rows_queued() {
        struct FailingTransport;

        #[async_trait]
        impl SyncTransport for FailingTransport {
            async fn submit(&self, _: &str, _: &Value) -> Result<SyncAck> {
                Err(TempoError::Network("connection refused".into()))
            }
        }

        let backlog = Arc::new(MemoryBacklog::with_rows(2));
        let proc = QueueProcessor::new(
            Arc::clone(&backlog) as Arc<dyn SyncBacklog>,
            Arc::new(FailingTransport),
            ProcessorConfig::new(ObservationKind::Duration, Duration::from_secs(10)),
        );

        let report = proc.run_cycle().await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(backlog.len(), 2);
    }

    #[tokio::test]
    async fn overlapping_cycle_is_a_no_op() {
        let gate = Arc::new(Notify::new());
        let backlog = Arc::new(MemoryBacklog::with_rows(1));
        let transport = Arc::new(ScriptedTransport::gated(Arc::clone(&gate)));
        let proc = Arc::new(processor(Arc::clone(&backlog), Arc::clone(&transport)));

        let first = {
            let proc = Arc::clone(&proc);
            tokio::spawn(async move { proc.run_cycle().await })
        };

        // Wait until the first cycle is parked inside the transport.
        while transport.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let second = proc.run_cycle().await;
        assert!(second.skipped);
        assert_eq!(transport.calls(), 1, "no second HTTP call may be observed");
        assert_eq!(backlog.len(), 1, "row count unchanged by the skipped cycle");

        gate.notify_one();
        let first = first.await.unwrap();
        assert!(!first.skipped);
        assert_eq!(first.forwarded, 1);
    }

    #[tokio::test]
    async fn cycle_processes_at_most_batch_size_rows() {
        let backlog = Arc::new(MemoryBacklog::with_rows(150));
        let transport = Arc::new(ScriptedTransport::new(true));
        let proc = processor(Arc::clone(&backlog), Arc::clone(&transport));

        let report = proc.run_cycle().await;
        assert_eq!(report.fetched, 100);
        assert_eq!(report.forwarded, 100);
        assert_eq!(backlog.len(), 50, "the remainder waits for the next cycle");

        let report = proc.run_cycle().await;
        assert_eq!(report.forwarded, 50);
        assert_eq!(backlog.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_start_and_stop() {
        let backlog = Arc::new(MemoryBacklog::with_rows(0));
        let transport = Arc::new(ScriptedTransport::new(true));
        let mut proc = processor(backlog, transport);

        assert!(!proc.is_running());
        proc.start().await.unwrap();
        assert!(proc.is_running());

        // Second start fails while running.
        assert!(matches!(proc.start().await, Err(ProcessorError::AlreadyRunning)));

        proc.stop().await.unwrap();
        assert!(!proc.is_running());

        // Restart after stop is allowed.
        proc.start().await.unwrap();
        proc.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn immediate_cycle_runs_on_start() {
        let backlog = Arc::new(MemoryBacklog::with_rows(5));
        let transport = Arc::new(ScriptedTransport::new(true));
        let mut proc = processor(Arc::clone(&backlog), Arc::clone(&transport));

        proc.start().await.unwrap();
        // The first tick fires immediately; wait for it to drain the queue.
        for _ in 0..100 {
            if backlog.len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(backlog.len(), 0);
        proc.stop().await.unwrap();
    }
}
