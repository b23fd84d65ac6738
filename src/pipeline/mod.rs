//! Capture and playback session orchestration.
//!
//! Both pipelines wire a queue half into a stream callback via an adapter
//! and monitor progress from a non-real-time task by polling the adapter's
//! shared counters; the queue's atomic index publication is the only
//! cross-thread coordination.

mod capture;
mod playback;

pub use capture::{CaptureSession, Recording};
pub use playback::{PlaybackReport, PlaybackSession};

use std::time::Duration;

/// How often session monitor loops poll the adapter counters.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lifecycle phase of a capture or playback session.
///
/// Capture moves `Idle -> Streaming -> Draining -> Closed`; playback moves
/// `Idle -> Preloading -> Streaming -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Queue allocated, no callback registered yet.
    Idle,
    /// Playback only: the source is being decoded into the queue.
    Preloading,
    /// Backend callback registered and running.
    Streaming,
    /// Capture only: callback unregistered, remaining samples being read out.
    Draining,
    /// Session finished, queue released.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_equality() {
        assert_eq!(PipelineState::Idle, PipelineState::Idle);
        assert_ne!(PipelineState::Streaming, PipelineState::Draining);
    }
}
