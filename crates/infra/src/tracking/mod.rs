//! Tracking services wiring the pure state machines to storage and probes.

pub mod capture;
pub mod idle_service;

pub use capture::CaptureService;
pub use idle_service::IdleService;
