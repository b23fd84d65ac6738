//! Error types for pcm-stream.
//!
//! Errors are split into two fatal categories:
//! - **Backend errors** ([`StreamError`]): device or negotiation failures
//!   that abort a session before any streaming begins
//! - **Codec errors** ([`WavError`]): WAV file read/write failures that
//!   terminate a session
//!
//! Queue pressure (overflow on push, underflow on pop) is deliberately not
//! an error anywhere: it is resolved by drop-on-push or silence-on-pop and
//! surfaced only through diagnostic counters.

use std::path::PathBuf;

/// Fatal errors from the audio backend.
///
/// These are returned before a capture or playback session enters its
/// streaming phase; there is no partial session to clean up.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// No default input device is configured on this system.
    #[error("no default input device configured")]
    NoDefaultInputDevice,

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultOutputDevice,

    /// The requested device index is out of range.
    #[error("device index {index} not found ({available} devices available)")]
    DeviceNotFound {
        /// The index that was requested.
        index: usize,
        /// How many devices exist.
        available: usize,
    },

    /// The device does not support the requested sample format.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// The device does not support the requested sample rate.
    #[error("sample rate {requested}Hz not supported by device")]
    UnsupportedSampleRate {
        /// The requested sample rate.
        requested: u32,
    },

    /// The device does not support the requested channel count.
    #[error("channel count {requested} not supported by device")]
    UnsupportedChannels {
        /// The requested channel count.
        requested: u16,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),

    /// A background task failed unexpectedly.
    #[error("internal task failed: {0}")]
    TaskFailed(String),
}

/// Fatal errors from the WAV codec or file I/O.
///
/// A failed write removes the partial file, so the filesystem is left with
/// either a complete header+data file or nothing.
#[derive(Debug, thiserror::Error)]
pub enum WavError {
    /// File I/O error.
    #[error("file error: {path}: {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not begin with a RIFF/WAVE container header.
    #[error("not a RIFF/WAVE file: {path}")]
    NotWave {
        /// Path to the file.
        path: PathBuf,
    },

    /// A required subchunk is missing from the container.
    #[error("missing '{chunk}' chunk: {path}")]
    MissingChunk {
        /// Four-character chunk identifier.
        chunk: &'static str,
        /// Path to the file.
        path: PathBuf,
    },

    /// The file ends before the declared chunk data.
    #[error("truncated file: {path}")]
    Truncated {
        /// Path to the file.
        path: PathBuf,
    },

    /// The sample encoding is not one this codec handles.
    #[error("unsupported encoding: format tag {format_tag}, {bits_per_sample} bits per sample")]
    UnsupportedEncoding {
        /// WAV audio format tag (1 = PCM, 3 = IEEE float).
        format_tag: u16,
        /// Declared bits per sample.
        bits_per_sample: u16,
    },
}

impl WavError {
    /// Creates an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::DeviceNotFound {
            index: 7,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "device index 7 not found (2 devices available)"
        );
    }

    #[test]
    fn test_unsupported_sample_rate_display() {
        let err = StreamError::UnsupportedSampleRate { requested: 44100 };
        assert!(err.to_string().contains("44100"));
    }

    #[test]
    fn test_wav_error_io_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = WavError::io("/tmp/missing.wav", io_err);
        assert!(err.to_string().contains("/tmp/missing.wav"));
    }

    #[test]
    fn test_unsupported_encoding_display() {
        let err = WavError::UnsupportedEncoding {
            format_tag: 85,
            bits_per_sample: 24,
        };
        assert!(err.to_string().contains("85"));
        assert!(err.to_string().contains("24"));
    }
}
