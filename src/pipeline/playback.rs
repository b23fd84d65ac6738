//! Playback pipeline: preloading producer, backend-driven consumer.
//!
//! The source is fully decoded into the queue before the output callback is
//! registered, so the callback never races the preload. Once streaming, the
//! callback pops in consumer role and pads with silence past the end of the
//! source; the monitor waits for the played count to cover the whole source
//! before tearing the stream down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{AdapterStats, PlaybackAdapter};
use crate::config::PERIOD_FRAMES;
use crate::device::{AudioDevice, StreamHandle};
use crate::error::StreamError;
use crate::pipeline::{PipelineState, POLL_INTERVAL};
use crate::queue::bounded;
use crate::sample::Sample;

/// Extra wall-clock allowance past the source duration before the monitor
/// stops waiting on the played count.
const COMPLETION_GRACE: Duration = Duration::from_secs(1);

/// A running playback session.
///
/// [`open`](PlaybackSession::open) preloads the whole source into the queue,
/// then registers the consumer-role callback and starts streaming.
/// [`finish`](PlaybackSession::finish) waits for the source to be fully
/// consumed, including the trailing partial period, before releasing the
/// stream.
pub struct PlaybackSession<T: Sample> {
    stream: Option<StreamHandle>,
    stats: Arc<AdapterStats>,
    total_samples: usize,
    sample_rate: u32,
    channels: u16,
    opened_at: Instant,
    state: PipelineState,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Sample> PlaybackSession<T> {
    /// Preloads `samples` into a fresh queue and starts streaming to `device`.
    ///
    /// The queue is sized to hold the entire source, so the preload cannot
    /// overflow. Preloading runs on a blocking thread; the callback is only
    /// registered once every sample is enqueued.
    pub async fn open(
        device: &AudioDevice,
        samples: Arc<Vec<T>>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, StreamError> {
        let total_samples = samples.len();
        let (producer, consumer) = bounded::<T>(total_samples.max(1));

        tracing::debug!(
            device = %device.name(),
            total_samples,
            sample_rate,
            "preloading playback queue"
        );

        // The callback is not registered yet, so the producer has the queue
        // to itself during the preload.
        let producer = tokio::task::spawn_blocking(move || {
            let mut producer = producer;
            for &sample in samples.iter() {
                // Capacity equals the source length; a rejection here would
                // mean the queue math is broken.
                if producer.try_push(sample).is_err() {
                    break;
                }
            }
            producer
        })
        .await
        .map_err(|e| StreamError::TaskFailed(format!("preload task panicked: {e}")))?;

        debug_assert!(producer.is_full() || total_samples == 0);
        drop(producer);

        let adapter = PlaybackAdapter::new(consumer);
        let stats = adapter.stats();
        let stream = device.start_playback(sample_rate, channels, adapter)?;

        tracing::info!(
            device = %device.name(),
            total_samples,
            "playback streaming"
        );

        Ok(Self {
            stream: Some(stream),
            stats,
            total_samples,
            sample_rate,
            channels,
            opened_at: Instant::now(),
            state: PipelineState::Streaming,
            _marker: std::marker::PhantomData,
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

    /// Waits until the whole source has been played, then releases the
    /// stream and returns a report.
    ///
    /// Completion is count-based on the real samples popped by the callback;
    /// a wall-clock backstop covers devices that stop invoking the callback
    /// early. One extra period of slack lets the trailing silence-padded
    /// period reach the hardware before teardown.
    pub async fn finish(mut self) -> PlaybackReport {
        let total = self.total_samples as u64;
        let backstop = self.source_duration() + COMPLETION_GRACE;
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        while self.state == PipelineState::Streaming {
            interval.tick().await;

            if self.stats.samples() >= total {
                // Give the final mixed period time to leave the queue
                // buffers downstream of us.
                tokio::time::sleep(self.period_duration()).await;
                break;
            }
            if self.opened_at.elapsed() >= backstop {
                tracing::warn!(
                    played = self.stats.samples(),
                    total,
                    "playback hit wall-clock backstop before source was consumed"
                );
                break;
            }
        }

        self.stream.take();
        self.state = PipelineState::Closed;

        let report = PlaybackReport {
            played: self.stats.samples(),
            underrun_samples: self.stats.underruns(),
        };
        tracing::info!(
            played = report.played,
            underruns = report.underrun_samples,
            "playback session closed"
        );
        report
    }

    /// Stops playback immediately, releasing the stream mid-source.
    pub fn stop(mut self) -> PlaybackReport {
        self.stream.take();
        self.state = PipelineState::Closed;

        let report = PlaybackReport {
            played: self.stats.samples(),
            underrun_samples: self.stats.underruns(),
        };
        tracing::info!(played = report.played, "playback stopped early");
        report
    }

    fn source_duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.total_samples / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }

    fn period_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(PERIOD_FRAMES) / f64::from(self.sample_rate))
    }
}

/// What happened over one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Real samples delivered to the output callback.
    pub played: u64,
    /// Output slots padded with silence, trailing period included.
    pub underrun_samples: u64,
}
