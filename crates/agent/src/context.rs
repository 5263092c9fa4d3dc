//! Agent wiring
//!
//! Builds the full capture-and-forward stack from configuration: per-kind
//! stores, the shared API client, one sync processor per observation kind,
//! the policy watcher, and the capture/idle services.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tempo_core::sync::{ProcessorConfig, QueueProcessor, SyncBacklog};
use tempo_domain::config::Config;
use tempo_domain::types::ObservationKind;
use tempo_infra::api::transport::ApiTransport;
use tempo_infra::database::{
    open_store, ActivityRepository, DurationRepository, IdleRepository, TimeEntryRepository,
};
use tempo_infra::platform::{
    SystemForegroundProvider, SystemIdleProbe, SystemScreenGrabber,
};
use tempo_infra::policy::PolicyWatcher;
use tempo_infra::screenshots::{ScreenshotQueue, ScreenshotStore};
use tempo_infra::tracking::{CaptureService, IdleService};
use tempo_infra::{ApiClient, ApiClientConfig, DataLayout, KeyringTokenStore};
use tracing::{info, warn};

const KEYCHAIN_SERVICE: &str = "com.tempo.agent";
const KEYCHAIN_ACCOUNT: &str = "access-token";

pub struct AgentContext {
    pub capture: Arc<CaptureService>,
    processors: Vec<QueueProcessor>,
    policy: PolicyWatcher,
}

impl AgentContext {
    pub fn build(config: &Config) -> anyhow::Result<Self> {
        let layout = DataLayout::resolve(config.data_dir.as_deref())
            .context("resolving data directory")?;
        layout.ensure().context("creating data directories")?;
        info!(root = %layout.root().display(), "data directory ready");

        let token_store =
            Arc::new(KeyringTokenStore::new(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT));
        let client = Arc::new(
            ApiClient::new(
                ApiClientConfig::new(config.api.base_url.clone(), config.api.timeout()),
                token_store,
            )
            .context("building API client")?,
        );
        let transport = Arc::new(ApiTransport::new(client.clone()));

        let activities = Arc::new(ActivityRepository::new(
            open_store(&layout, ObservationKind::Activity).context("opening activity store")?,
        ));
        let durations = Arc::new(DurationRepository::new(
            open_store(&layout, ObservationKind::Duration).context("opening duration store")?,
        ));
        let idles = Arc::new(IdleRepository::new(
            open_store(&layout, ObservationKind::Idle).context("opening idle store")?,
        ));
        let time_entries = Arc::new(TimeEntryRepository::new(
            open_store(&layout, ObservationKind::TimeEntry)
                .context("opening time entry store")?,
        ));
        let screenshot_queue = Arc::new(ScreenshotQueue::new(layout.screenshots_dir()));
        let screenshot_store =
            Arc::new(ScreenshotStore::new(layout.screenshots_dir()).context("opening spool")?);

        let sync = &config.sync;
        let batch = sync.batch_size;
        let queues: Vec<(Arc<dyn SyncBacklog>, ObservationKind, u64)> = vec![
            (activities.clone(), ObservationKind::Activity, sync.activity_interval_secs),
            (durations.clone(), ObservationKind::Duration, sync.duration_interval_secs),
            (idles.clone(), ObservationKind::Idle, sync.idle_interval_secs),
            (time_entries.clone(), ObservationKind::TimeEntry, sync.time_entry_interval_secs),
            (screenshot_queue, ObservationKind::Screenshot, sync.screenshot_interval_secs),
        ];
        let processors = queues
            .into_iter()
            .map(|(backlog, kind, interval_secs)| {
                let config = ProcessorConfig {
                    kind,
                    interval: Duration::from_secs(interval_secs),
                    batch_size: batch,
                };
                QueueProcessor::new(backlog, transport.clone(), config)
            })
            .collect();

        let policy = PolicyWatcher::new(
            client,
            Duration::from_secs(sync.policy_refresh_interval_secs),
        );

        let idle_service = Arc::new(IdleService::new(
            Arc::new(SystemIdleProbe::new()),
            idles,
            config.tracking.idle_threshold_secs,
        ));

        let capture = Arc::new(CaptureService::new(
            Arc::new(SystemForegroundProvider::new()),
            Arc::new(tempo_infra::browser::BrowserResolver::new()),
            Some(Arc::new(SystemScreenGrabber::new())),
            Arc::new(policy.handle()),
            activities,
            durations,
            time_entries,
            screenshot_store,
            idle_service,
        ));

        Ok(Self { capture, processors, policy })
    }

    /// Start every background loop: sync processors and the policy watcher.
    pub async fn start(&mut self) {
        self.policy.start().await;
        for processor in &mut self.processors {
            let kind = processor.kind();
            if let Err(err) = processor.start().await {
                warn!(%kind, error = %err, "failed to start sync processor");
            }
        }
    }

    /// Graceful shutdown: stop timers, flush open state.
    pub async fn shutdown(&mut self) {
        self.capture.shutdown().await;
        for processor in &mut self.processors {
            let kind = processor.kind();
            if let Err(err) = processor.stop().await {
                warn!(%kind, error = %err, "sync processor did not stop cleanly");
            }
        }
        self.policy.stop().await;
        info!("agent shut down");
    }
}
