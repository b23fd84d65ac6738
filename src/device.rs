//! CPAL device wrapper: enumeration, negotiation, and stream construction.
//!
//! Streams are handed their adapter by value; the adapter moves into the
//! callback closure, so the active handler is explicit per session and no
//! global callback state exists. The returned [`StreamHandle`] is RAII:
//! dropping it unregisters the callback, which is the only cancellation
//! primitive — in-flight callback invocations complete normally.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleRate, Stream, StreamConfig as CpalStreamConfig};

use crate::adapter::{CaptureAdapter, PlaybackAdapter};
use crate::config::PERIOD_FRAMES;
use crate::error::StreamError;
use crate::sample::Sample;

/// Lists the names of all available input devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_input_devices() -> Result<Vec<String>, StreamError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| StreamError::BackendError(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Lists the names of all available output devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_output_devices() -> Result<Vec<String>, StreamError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| StreamError::BackendError(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Which way audio flows through a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Input,
    Output,
}

/// Wrapper around a CPAL audio device, input or output.
#[must_use]
pub struct AudioDevice {
    device: Device,
    direction: Direction,
}

impl AudioDevice {
    /// Opens the default input device.
    pub fn default_input() -> Result<Self, StreamError> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or(StreamError::NoDefaultInputDevice)?;
        Ok(Self {
            device,
            direction: Direction::Input,
        })
    }

    /// Opens the input device at the given enumeration index.
    ///
    /// The index matches the order returned by [`list_input_devices`].
    pub fn input_by_index(index: usize) -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let devices: Vec<Device> = host
            .input_devices()
            .map_err(|e| StreamError::BackendError(e.to_string()))?
            .collect();
        let available = devices.len();
        let device = devices
            .into_iter()
            .nth(index)
            .ok_or(StreamError::DeviceNotFound { index, available })?;
        Ok(Self {
            device,
            direction: Direction::Input,
        })
    }

    /// Opens the default output device.
    pub fn default_output() -> Result<Self, StreamError> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or(StreamError::NoDefaultOutputDevice)?;
        Ok(Self {
            device,
            direction: Direction::Output,
        })
    }

    /// Opens the output device at the given enumeration index.
    ///
    /// The index matches the order returned by [`list_output_devices`].
    pub fn output_by_index(index: usize) -> Result<Self, StreamError> {
        let host = cpal::default_host();
        let devices: Vec<Device> = host
            .output_devices()
            .map_err(|e| StreamError::BackendError(e.to_string()))?
            .collect();
        let available = devices.len();
        let device = devices
            .into_iter()
            .nth(index)
            .ok_or(StreamError::DeviceNotFound { index, available })?;
        Ok(Self {
            device,
            direction: Direction::Output,
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Checks that the device supports the requested format, rate, and
    /// channel count before any stream is built.
    ///
    /// Negotiation failure is fatal: the caller aborts before streaming.
    fn ensure_supported<T: Sample>(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), StreamError> {
        let configs: Vec<_> = match self.direction {
            Direction::Input => self
                .device
                .supported_input_configs()
                .map_err(|e| StreamError::BackendError(e.to_string()))?
                .collect(),
            Direction::Output => self
                .device
                .supported_output_configs()
                .map_err(|e| StreamError::BackendError(e.to_string()))?
                .collect(),
        };

        let format_matches: Vec<_> = configs
            .into_iter()
            .filter(|c| c.sample_format() == <T as Sample>::FORMAT)
            .collect();
        if format_matches.is_empty() {
            return Err(StreamError::UnsupportedFormat {
                format: format!("{:?}", <T as Sample>::FORMAT),
            });
        }

        let channel_matches: Vec<_> = format_matches
            .into_iter()
            .filter(|c| c.channels() == channels)
            .collect();
        if channel_matches.is_empty() {
            return Err(StreamError::UnsupportedChannels {
                requested: channels,
            });
        }

        let rate_ok = channel_matches.iter().any(|c| {
            c.min_sample_rate().0 <= sample_rate && sample_rate <= c.max_sample_rate().0
        });
        if !rate_ok {
            return Err(StreamError::UnsupportedSampleRate {
                requested: sample_rate,
            });
        }

        Ok(())
    }

    fn stream_config(sample_rate: u32, channels: u16) -> CpalStreamConfig {
        CpalStreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Fixed(PERIOD_FRAMES),
        }
    }

    /// Builds and starts an input stream feeding the given adapter.
    ///
    /// The adapter moves into the callback closure; keep the returned
    /// handle alive for capture to continue.
    pub fn start_capture<T: Sample>(
        &self,
        sample_rate: u32,
        channels: u16,
        mut adapter: CaptureAdapter<T>,
    ) -> Result<StreamHandle, StreamError> {
        self.ensure_supported::<T>(sample_rate, channels)?;
        let config = Self::stream_config(sample_rate, channels);

        let stream = self
            .device
            .build_input_stream(
                &config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    adapter.push_period(data);
                },
                |err| {
                    tracing::error!("audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| StreamError::BackendError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| StreamError::BackendError(e.to_string()))?;

        Ok(StreamHandle { _stream: stream })
    }

    /// Builds and starts an output stream drawing from the given adapter.
    ///
    /// The adapter moves into the callback closure; keep the returned
    /// handle alive for playback to continue.
    pub fn start_playback<T: Sample>(
        &self,
        sample_rate: u32,
        channels: u16,
        mut adapter: PlaybackAdapter<T>,
    ) -> Result<StreamHandle, StreamError> {
        self.ensure_supported::<T>(sample_rate, channels)?;
        let config = Self::stream_config(sample_rate, channels);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    adapter.fill_period(data);
                },
                |err| {
                    tracing::error!("audio stream error: {err}");
                },
                None,
            )
            .map_err(|e| StreamError::BackendError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| StreamError::BackendError(e.to_string()))?;

        Ok(StreamHandle { _stream: stream })
    }
}

/// A running audio stream.
///
/// The backend keeps invoking its callback while this exists. Dropping the
/// handle unregisters the callback and releases the stream.
pub struct StreamHandle {
    /// The underlying CPAL stream. Dropping this stops the callback.
    _stream: Stream,
}
