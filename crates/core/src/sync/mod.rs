//! Durable local-queue sync engine and its ports.

pub mod ports;
pub mod processor;

pub use ports::{PendingUpload, SyncAck, SyncBacklog, SyncTransport};
pub use processor::{CycleReport, ProcessorConfig, ProcessorError, QueueProcessor};
