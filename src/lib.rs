//! # pcm-stream
//!
//! PCM audio capture and playback built around a bounded lock-free SPSC
//! sample queue.
//!
//! The queue is the boundary between the backend's hard-real-time callback
//! thread and ordinary application code: pushes against a full queue and
//! pops against an empty queue return immediately, so the callback never
//! blocks, allocates, or waits. Capture sessions run the callback in
//! producer role and drain from a polling task; playback sessions preload
//! the queue and run the callback in consumer role, padding with silence
//! past the end of the source.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pcm_stream::{AudioDevice, CaptureSession, PlaybackSession, SessionConfig};
//!
//! let config = SessionConfig::default(); // 44.1 kHz mono, 4 seconds
//! let input = AudioDevice::default_input()?;
//! let recording = CaptureSession::<i16>::open(&input, &config)?.finish().await;
//!
//! let output = AudioDevice::default_output()?;
//! PlaybackSession::open(&output, recording.samples.clone(),
//!     recording.sample_rate, recording.channels).await?.finish().await;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **CPAL Thread**: High-priority audio callback that never blocks
//! - **Sample Queue**: Bounded lock-free SPSC ring decouples the callback
//!   from application pacing
//! - **Tokio Runtime**: Session monitors poll shared counters and handle
//!   file I/O off the real-time path

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod adapter;
mod config;
mod device;
mod error;
mod pipeline;
pub mod queue;
mod sample;
pub mod wav;

pub use adapter::{AdapterStats, CaptureAdapter, PlaybackAdapter};
pub use config::{SessionConfig, PERIOD_FRAMES};
pub use device::{list_input_devices, list_output_devices, AudioDevice, StreamHandle};
pub use error::{StreamError, WavError};
pub use pipeline::{
    CaptureSession, PipelineState, PlaybackReport, PlaybackSession, Recording,
};
pub use sample::Sample;
pub use wav::{WavReader, WavSpec};
