//! Capture-side state machines and their ports.

pub mod duration;
pub mod gate;
pub mod idle;
pub mod ports;

pub use duration::{DurationTracker, Observation};
pub use gate::CaptureGate;
pub use idle::{ClosedIdlePeriod, IdleTracker, StoppedTracking};
pub use ports::{
    CapturedFrame, ForegroundProvider, IdleProbe, SamplingPolicy, ScreenGrabber, TabResolver,
};
