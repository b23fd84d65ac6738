//! Configuration for capture and playback sessions.

use std::time::Duration;

/// Frames delivered or requested per backend callback invocation.
///
/// The backend is asked for fixed 1024-frame periods; the adapter handles
/// whatever length the callback actually delivers.
pub const PERIOD_FRAMES: u32 = 1024;

/// Configuration for a capture session.
///
/// The queue capacity is derived from these fields, so a session's queue
/// can hold the entire configured recording.
///
/// # Example
///
/// ```
/// use pcm_stream::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig {
///     duration: Duration::from_secs(10),
///     ..Default::default()
/// };
/// assert_eq!(config.capacity(), 441_000);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sample rate in Hz.
    ///
    /// Default: 44100
    pub sample_rate: u32,

    /// Number of channels (1 = mono, 2 = stereo).
    ///
    /// Default: 1
    pub channels: u16,

    /// How long to capture.
    ///
    /// Default: 4 seconds
    pub duration: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            duration: Duration::from_secs(4),
        }
    }
}

impl SessionConfig {
    /// Queue capacity in samples: sample rate x channels x duration.
    pub fn capacity(&self) -> usize {
        let frames = (f64::from(self.sample_rate) * self.duration.as_secs_f64()) as usize;
        frames * self.channels as usize
    }

    /// Total samples a full-length capture produces.
    pub fn target_samples(&self) -> u64 {
        self.capacity() as u64
    }
}
