//! Capture pipeline: backend-driven producer, polling consumer.
//!
//! The cpal callback pushes each period into the queue in producer role; a
//! monitor loop on the orchestrating task pops available samples into memory
//! while streaming, then drains the tail after the callback is unregistered.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{AdapterStats, CaptureAdapter};
use crate::config::SessionConfig;
use crate::device::{AudioDevice, StreamHandle};
use crate::error::{StreamError, WavError};
use crate::pipeline::{PipelineState, POLL_INTERVAL};
use crate::queue::{bounded, QueueConsumer};
use crate::sample::Sample;
use crate::wav;

/// Extra wall-clock allowance past the configured duration before the
/// monitor gives up waiting for the target sample count.
const COMPLETION_GRACE: Duration = Duration::from_millis(500);

/// A running capture session.
///
/// Created by [`CaptureSession::open`], which allocates the queue, registers
/// the producer-role callback, and starts streaming. Call
/// [`finish`](CaptureSession::finish) to wait for the configured amount of
/// audio, or [`stop`](CaptureSession::stop) to end the session early; both
/// drain the queue and return the captured samples as a [`Recording`].
///
/// # Example
///
/// ```ignore
/// let device = AudioDevice::default_input()?;
/// let session = CaptureSession::<i16>::open(&device, &SessionConfig::default())?;
/// let recording = session.finish().await;
/// recording.save(Path::new("out.wav")).await?;
/// ```
pub struct CaptureSession<T: Sample> {
    stream: Option<StreamHandle>,
    consumer: QueueConsumer<T>,
    stats: Arc<AdapterStats>,
    sample_rate: u32,
    channels: u16,
    target_samples: usize,
    opened_at: Instant,
    backstop: Duration,
    state: PipelineState,
}

impl<T: Sample> CaptureSession<T> {
    /// Allocates the session queue and starts streaming from `device`.
    ///
    /// The queue capacity covers the full configured duration. Backend or
    /// negotiation failure aborts here, before any streaming begins.
    pub fn open(device: &AudioDevice, config: &SessionConfig) -> Result<Self, StreamError> {
        let capacity = config.capacity().max(1);
        let (producer, consumer) = bounded::<T>(capacity);

        let adapter = CaptureAdapter::new(producer);
        let stats = adapter.stats();

        tracing::debug!(
            device = %device.name(),
            sample_rate = config.sample_rate,
            channels = config.channels,
            capacity,
            "opening capture session"
        );

        let stream = device.start_capture(config.sample_rate, config.channels, adapter)?;

        tracing::info!(
            device = %device.name(),
            duration = ?config.duration,
            "capture streaming"
        );

        Ok(Self {
            stream: Some(stream),
            consumer,
            stats,
            sample_rate: config.sample_rate,
            channels: config.channels,
            target_samples: capacity,
            opened_at: Instant::now(),
            backstop: config.duration + COMPLETION_GRACE,
            state: PipelineState::Streaming,
        })
    }

    /// Returns the current lifecycle phase.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Returns the shared adapter counters.
    pub fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    /// Runs the session to completion and returns the recording.
    ///
    /// Completion is count-based: the session ends once the target sample
    /// count has been collected, with a wall-clock backstop slightly past
    /// the configured duration in case the device delivers short.
    pub async fn finish(mut self) -> Recording<T> {
        let mut samples = Vec::with_capacity(self.target_samples);
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        while self.state == PipelineState::Streaming {
            interval.tick().await;

            while samples.len() < self.target_samples {
                match self.consumer.try_pop() {
                    Some(sample) => samples.push(sample),
                    None => break,
                }
            }

            if samples.len() >= self.target_samples {
                break;
            }
            if self.opened_at.elapsed() >= self.backstop {
                tracing::warn!(
                    collected = samples.len(),
                    target = self.target_samples,
                    "capture hit wall-clock backstop before target sample count"
                );
                break;
            }
        }

        self.close(samples)
    }

    /// Stops the session immediately and returns whatever was captured.
    pub fn stop(mut self) -> Recording<T> {
        let samples = Vec::with_capacity(self.consumer.occupied_len());
        self.close(samples)
    }

    /// Unregisters the callback, drains the queue tail, and closes.
    fn close(&mut self, mut samples: Vec<T>) -> Recording<T> {
        // Dropping the handle unregisters the callback; an in-flight
        // invocation completes before the stream is released.
        self.stream.take();
        self.state = PipelineState::Draining;
        tracing::debug!(collected = samples.len(), "draining capture queue");

        while let Some(sample) = self.consumer.try_pop() {
            samples.push(sample);
        }
        // Periods that arrived past the configured duration are discarded
        // so the recording length matches the session exactly.
        samples.truncate(self.target_samples);

        self.state = PipelineState::Closed;
        tracing::info!(
            samples = samples.len(),
            dropped = self.stats.dropped(),
            "capture session closed"
        );

        Recording {
            samples: Arc::new(samples),
            sample_rate: self.sample_rate,
            channels: self.channels,
            dropped: self.stats.dropped(),
        }
    }
}

/// An in-memory capture result.
///
/// Samples are `Arc`-wrapped so persisting and replaying the same recording
/// share one allocation.
#[derive(Debug, Clone)]
pub struct Recording<T: Sample> {
    /// Captured interleaved samples.
    pub samples: Arc<Vec<T>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels.
    pub channels: u16,
    /// Samples dropped on push during the session (diagnostic).
    pub dropped: u64,
}

impl<T: Sample> Recording<T> {
    /// Returns the length of the recording.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Persists the recording as a WAV file.
    ///
    /// File I/O runs in a blocking thread to avoid stalling the async
    /// runtime. On failure no partial file is left behind.
    pub async fn save(&self, path: &Path) -> Result<(), WavError> {
        let samples = Arc::clone(&self.samples);
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        let path_buf = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            wav::write_wav(&path_buf, &samples, sample_rate, channels)
        })
        .await
        .map_err(|e| {
            WavError::io(
                path,
                std::io::Error::other(format!("save task panicked: {e}")),
            )
        })?
    }
}
