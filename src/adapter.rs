//! Adapters binding the queue to the backend's per-period buffer contract.
//!
//! The backend delivers each callback period as a borrowed slice that is
//! only valid for the duration of the invocation. The adapters translate
//! that fixed-length buffer into a sequence of per-sample queue operations:
//! [`CaptureAdapter`] pushes every input sample, [`PlaybackAdapter`] fills
//! every output slot, substituting silence on underflow so the buffer is
//! always fully populated before the callback returns.
//!
//! Both adapters run on the real-time callback thread and stay wait-free:
//! queue pressure is counted, never waited on. Counters live in an
//! [`AdapterStats`] shared with the orchestrating thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::queue::{QueueConsumer, QueueProducer};
use crate::sample::Sample;

/// Diagnostic counters shared between an adapter (callback thread) and the
/// session that monitors it.
///
/// Counters are updated once per callback period, not per sample.
#[derive(Debug, Default)]
pub struct AdapterStats {
    /// Samples moved through the queue (accepted pushes, or real pops).
    samples: AtomicU64,
    /// Capture: pushes rejected because the queue was full.
    dropped: AtomicU64,
    /// Playback: output slots filled with silence because the queue was empty.
    underruns: AtomicU64,
}

impl AdapterStats {
    /// Samples successfully moved through the queue so far.
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Samples dropped on push while the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Output samples substituted with silence on underflow.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Producer-role adapter: feeds captured periods into the queue.
pub struct CaptureAdapter<T> {
    producer: QueueProducer<T>,
    stats: Arc<AdapterStats>,
}

impl<T: Sample> CaptureAdapter<T> {
    /// Wraps the producer half of a session's queue.
    pub fn new(producer: QueueProducer<T>) -> Self {
        Self {
            producer,
            stats: Arc::new(AdapterStats::default()),
        }
    }

    /// Returns the shared counters. Call before moving the adapter into
    /// the stream callback.
    pub fn stats(&self) -> Arc<AdapterStats> {
        Arc::clone(&self.stats)
    }

    /// Pushes one callback period into the queue.
    ///
    /// A rejected push drops that sample and is counted; the session is
    /// never aborted from here. The borrowed buffer is not retained.
    pub fn push_period(&mut self, input: &[T]) {
        let mut accepted = 0u64;
        let mut dropped = 0u64;

        for &sample in input {
            match self.producer.try_push(sample) {
                Ok(()) => accepted += 1,
                Err(_) => dropped += 1,
            }
        }

        self.stats.samples.fetch_add(accepted, Ordering::Relaxed);
        if dropped > 0 {
            self.stats.dropped.fetch_add(dropped, Ordering::Relaxed);
        }
    }
}

/// Consumer-role adapter: fills playback periods from the queue.
pub struct PlaybackAdapter<T> {
    consumer: QueueConsumer<T>,
    stats: Arc<AdapterStats>,
}

impl<T: Sample> PlaybackAdapter<T> {
    /// Wraps the consumer half of a session's queue.
    pub fn new(consumer: QueueConsumer<T>) -> Self {
        Self {
            consumer,
            stats: Arc::new(AdapterStats::default()),
        }
    }

    /// Returns the shared counters. Call before moving the adapter into
    /// the stream callback.
    pub fn stats(&self) -> Arc<AdapterStats> {
        Arc::clone(&self.stats)
    }

    /// Fills one callback period from the queue.
    ///
    /// Every slot in `output` is written before returning: real samples
    /// while the queue has them, silence afterwards. Underflow past the end
    /// of the source is expected during the trailing periods of a session
    /// and is counted, not treated as a failure.
    pub fn fill_period(&mut self, output: &mut [T]) {
        let mut real = 0u64;
        let mut silent = 0u64;

        for slot in output.iter_mut() {
            match self.consumer.try_pop() {
                Some(sample) => {
                    *slot = sample;
                    real += 1;
                }
                None => {
                    *slot = T::SILENCE;
                    silent += 1;
                }
            }
        }

        self.stats.samples.fetch_add(real, Ordering::Relaxed);
        if silent > 0 {
            self.stats.underruns.fetch_add(silent, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::bounded;

    #[test]
    fn test_capture_adapter_pushes_full_period() {
        let (producer, mut consumer) = bounded::<i16>(2048);
        let mut adapter = CaptureAdapter::new(producer);
        let stats = adapter.stats();

        let period: Vec<i16> = (0..1024i16).collect();
        adapter.push_period(&period);

        assert_eq!(stats.samples(), 1024);
        assert_eq!(stats.dropped(), 0);
        for expected in 0..1024i16 {
            assert_eq!(consumer.try_pop(), Some(expected));
        }
    }

    #[test]
    fn test_capture_adapter_counts_drops() {
        let (producer, consumer) = bounded::<i16>(100);
        let mut adapter = CaptureAdapter::new(producer);
        let stats = adapter.stats();

        let period = vec![1i16; 256];
        adapter.push_period(&period);

        assert_eq!(stats.samples(), 100);
        assert_eq!(stats.dropped(), 156);
        assert_eq!(consumer.occupied_len(), 100);
    }

    #[test]
    fn test_playback_adapter_fills_from_queue() {
        let (mut producer, consumer) = bounded::<i16>(1024);
        for i in 0..512 {
            producer.try_push(i).unwrap();
        }

        let mut adapter = PlaybackAdapter::new(consumer);
        let stats = adapter.stats();

        let mut period = vec![-1i16; 512];
        adapter.fill_period(&mut period);

        assert_eq!(stats.samples(), 512);
        assert_eq!(stats.underruns(), 0);
        for (i, &sample) in period.iter().enumerate() {
            assert_eq!(sample, i as i16);
        }
    }

    #[test]
    fn test_playback_underflow_pads_with_silence() {
        // k real samples preloaded, a larger period requested: the first k
        // slots get the real samples, the rest get silence, without
        // blocking.
        let (mut producer, consumer) = bounded::<i16>(1024);
        for i in 1..=300i16 {
            producer.try_push(i).unwrap();
        }

        let mut adapter = PlaybackAdapter::new(consumer);
        let stats = adapter.stats();

        let mut period = vec![-1i16; 1024];
        adapter.fill_period(&mut period);

        for (i, &sample) in period.iter().enumerate() {
            if i < 300 {
                assert_eq!(sample, (i + 1) as i16);
            } else {
                assert_eq!(sample, 0);
            }
        }
        assert_eq!(stats.samples(), 300);
        assert_eq!(stats.underruns(), 724);
    }

    #[test]
    fn test_playback_empty_queue_all_silence() {
        let (_producer, consumer) = bounded::<f32>(16);
        let mut adapter = PlaybackAdapter::new(consumer);

        let mut period = vec![1.0f32; 64];
        adapter.fill_period(&mut period);

        assert!(period.iter().all(|&s| s == 0.0));
        assert_eq!(adapter.stats().underruns(), 64);
    }

    #[test]
    fn test_stats_accumulate_across_periods() {
        let (producer, _consumer) = bounded::<i16>(4096);
        let mut adapter = CaptureAdapter::new(producer);
        let stats = adapter.stats();

        let period = vec![0i16; 1024];
        adapter.push_period(&period);
        adapter.push_period(&period);
        adapter.push_period(&period);

        assert_eq!(stats.samples(), 3072);
    }
}
