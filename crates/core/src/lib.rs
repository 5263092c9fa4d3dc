//! # Tempo Core
//!
//! Pure capture-and-forward logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The snapshot container decoder
//! - Browser session-state tab selection
//! - The generic durable-queue sync processor
//! - Idle, duration, and capture-gate state machines
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `tempo-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod session;
pub mod snapshot;
pub mod sync;
pub mod tracking;

// Re-export specific items to avoid ambiguity
pub use sync::ports::{PendingUpload, SyncAck, SyncBacklog, SyncTransport};
pub use sync::processor::{CycleReport, ProcessorConfig, QueueProcessor};
pub use tracking::ports::{
    CapturedFrame, ForegroundProvider, IdleProbe, SamplingPolicy, ScreenGrabber, TabResolver,
};
pub use tracking::{CaptureGate, ClosedIdlePeriod, DurationTracker, IdleTracker};
