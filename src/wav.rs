//! RIFF/WAVE codec: canonical 44-byte header plus raw little-endian samples.
//!
//! The writer produces a complete header+data file or nothing: on any write
//! failure the partial file is removed before the error is returned. The
//! reader tolerates extra subchunks before `data` and validates the `fmt `
//! chunk against the sample types this crate handles (16-bit PCM and 32-bit
//! IEEE float).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::WavError;
use crate::sample::Sample;

// WAV file format constants
// See: http://soundfile.sapp.org/doc/WaveFormat/

/// Size of the canonical WAV header in bytes (RIFF + fmt + data headers).
pub const WAV_HEADER_SIZE: usize = 44;

/// Size of the fmt chunk data (16 bytes for PCM and IEEE float).
const WAV_FMT_CHUNK_SIZE: u32 = 16;

/// Bytes occupied by a subchunk's id + size fields.
const CHUNK_HEADER_SIZE: usize = 8;

/// Declared format of a WAV file's sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// WAV audio format tag (1 = linear PCM, 3 = IEEE float).
    pub format_tag: u16,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Declared bits per sample.
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// Bytes per single sample.
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample / 8) as usize
    }
}

/// Writes `samples` to `path` as a canonical WAV file.
///
/// The header is byte-exact for the sample type: 16-bit input produces a
/// format-1 PCM file, 32-bit float a format-3 IEEE float file. On error the
/// partially written file is removed so the path holds either a complete
/// file or nothing.
pub fn write_wav<T: Sample>(
    path: &Path,
    samples: &[T],
    sample_rate: u32,
    channels: u16,
) -> Result<(), WavError> {
    let data_size = (samples.len() * T::BYTES) as u32;

    let result = write_wav_inner(path, samples, sample_rate, channels, data_size);
    if result.is_err() {
        // Leave no ambiguous partial file behind.
        let _ = std::fs::remove_file(path);
    }
    result
}

fn write_wav_inner<T: Sample>(
    path: &Path,
    samples: &[T],
    sample_rate: u32,
    channels: u16,
    data_size: u32,
) -> Result<(), WavError> {
    let file = File::create(path).map_err(|e| WavError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    write_header::<T>(&mut writer, sample_rate, channels, data_size)
        .map_err(|e| WavError::io(path, e))?;

    let mut data = Vec::with_capacity(data_size as usize);
    for &sample in samples {
        sample.write_le(&mut data);
    }
    writer.write_all(&data).map_err(|e| WavError::io(path, e))?;
    writer.flush().map_err(|e| WavError::io(path, e))?;

    Ok(())
}

/// Writes the canonical 44-byte header.
fn write_header<T: Sample>(
    writer: &mut BufWriter<File>,
    sample_rate: u32,
    channels: u16,
    data_size: u32,
) -> std::io::Result<()> {
    // RIFF container header
    writer.write_all(b"RIFF")?;
    let riff_size = WAV_HEADER_SIZE as u32 - CHUNK_HEADER_SIZE as u32 + data_size;
    writer.write_all(&riff_size.to_le_bytes())?;
    writer.write_all(b"WAVE")?;

    // fmt subchunk (format specification)
    writer.write_all(b"fmt ")?;
    writer.write_all(&WAV_FMT_CHUNK_SIZE.to_le_bytes())?;
    writer.write_all(&T::WAV_FORMAT_TAG.to_le_bytes())?;
    writer.write_all(&channels.to_le_bytes())?;
    writer.write_all(&sample_rate.to_le_bytes())?;

    let bytes_per_sample = T::BYTES as u32;
    let byte_rate = sample_rate * u32::from(channels) * bytes_per_sample;
    writer.write_all(&byte_rate.to_le_bytes())?;

    let block_align = channels * bytes_per_sample as u16;
    writer.write_all(&block_align.to_le_bytes())?;
    writer.write_all(&T::BITS.to_le_bytes())?;

    // data subchunk header
    writer.write_all(b"data")?;
    writer.write_all(&data_size.to_le_bytes())?;

    Ok(())
}

/// A decoded WAV file held in memory.
///
/// # Example
///
/// ```no_run
/// use pcm_stream::WavReader;
///
/// let reader = WavReader::open("recording.wav".as_ref())?;
/// println!("{} samples at {}Hz", reader.sample_count(), reader.spec().sample_rate);
/// let samples: Vec<i16> = reader.samples()?;
/// # Ok::<(), pcm_stream::WavError>(())
/// ```
pub struct WavReader {
    spec: WavSpec,
    data: Vec<u8>,
    path: PathBuf,
}

impl WavReader {
    /// Opens and parses a WAV file.
    ///
    /// Subchunks other than `fmt ` and `data` are skipped. Fails if the
    /// container is not RIFF/WAVE, a required chunk is missing, or the file
    /// ends before the declared data.
    pub fn open(path: &Path) -> Result<Self, WavError> {
        let bytes = std::fs::read(path).map_err(|e| WavError::io(path, e))?;
        Self::parse(bytes, path.to_path_buf())
    }

    fn parse(bytes: Vec<u8>, path: PathBuf) -> Result<Self, WavError> {
        if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(WavError::NotWave { path });
        }

        let mut spec: Option<WavSpec> = None;
        let mut data: Option<Vec<u8>> = None;
        let mut offset = 12;

        while offset + CHUNK_HEADER_SIZE <= bytes.len() {
            let id = &bytes[offset..offset + 4];
            let size = u32::from_le_bytes([
                bytes[offset + 4],
                bytes[offset + 5],
                bytes[offset + 6],
                bytes[offset + 7],
            ]) as usize;
            let body = offset + CHUNK_HEADER_SIZE;

            if body + size > bytes.len() {
                return Err(WavError::Truncated { path });
            }

            match id {
                b"fmt " => {
                    if size < 16 {
                        return Err(WavError::Truncated { path });
                    }
                    spec = Some(WavSpec {
                        format_tag: u16::from_le_bytes([bytes[body], bytes[body + 1]]),
                        channels: u16::from_le_bytes([bytes[body + 2], bytes[body + 3]]),
                        sample_rate: u32::from_le_bytes([
                            bytes[body + 4],
                            bytes[body + 5],
                            bytes[body + 6],
                            bytes[body + 7],
                        ]),
                        bits_per_sample: u16::from_le_bytes([bytes[body + 14], bytes[body + 15]]),
                    });
                }
                b"data" => {
                    data = Some(bytes[body..body + size].to_vec());
                    break;
                }
                _ => {}
            }

            // Chunk bodies are word-aligned; odd sizes carry a pad byte.
            offset = body + size + (size & 1);
        }

        let spec = spec.ok_or(WavError::MissingChunk {
            chunk: "fmt ",
            path: path.clone(),
        })?;
        let data = data.ok_or(WavError::MissingChunk {
            chunk: "data",
            path: path.clone(),
        })?;

        if spec.bits_per_sample == 0 || spec.bits_per_sample % 8 != 0 {
            return Err(WavError::UnsupportedEncoding {
                format_tag: spec.format_tag,
                bits_per_sample: spec.bits_per_sample,
            });
        }

        Ok(Self { spec, data, path })
    }

    /// Returns the declared sample format.
    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// Returns the path this reader was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total number of samples in the data chunk (all channels).
    pub fn sample_count(&self) -> usize {
        self.data.len() / self.spec.bytes_per_sample()
    }

    /// Playing time of the data chunk.
    pub fn duration(&self) -> Duration {
        if self.spec.sample_rate == 0 || self.spec.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.sample_count() / self.spec.channels as usize;
        Duration::from_secs_f64(f64::from(frames as u32) / f64::from(self.spec.sample_rate))
    }

    /// Decodes the data chunk as samples of type `T`.
    ///
    /// Fails with `UnsupportedEncoding` if the file's format tag or bit
    /// depth does not match `T`.
    pub fn samples<T: Sample>(&self) -> Result<Vec<T>, WavError> {
        if self.spec.format_tag != T::WAV_FORMAT_TAG || self.spec.bits_per_sample != T::BITS {
            return Err(WavError::UnsupportedEncoding {
                format_tag: self.spec.format_tag,
                bits_per_sample: self.spec.bits_per_sample,
            });
        }

        Ok(self
            .data
            .chunks_exact(T::BYTES)
            .map(T::read_le)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_byte_exact_16bit_mono() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");

        let samples = vec![0i16; 100];
        write_wav(&path, &samples, 44100, 1).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), WAV_HEADER_SIZE + 200);

        assert_eq!(&data[0..4], b"RIFF");
        // RIFF chunk size = 36 + data byte count
        let riff_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        assert_eq!(riff_size, 36 + 200);
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(&data[12..16], b"fmt ");
        // fmt chunk size 16, audio format 1 (PCM)
        assert_eq!(u32::from_le_bytes([data[16], data[17], data[18], data[19]]), 16);
        assert_eq!(u16::from_le_bytes([data[20], data[21]]), 1);
        assert_eq!(u16::from_le_bytes([data[22], data[23]]), 1);
        // sample rate, byte rate = rate*channels*bits/8, block align
        assert_eq!(
            u32::from_le_bytes([data[24], data[25], data[26], data[27]]),
            44100
        );
        assert_eq!(
            u32::from_le_bytes([data[28], data[29], data[30], data[31]]),
            44100 * 2
        );
        assert_eq!(u16::from_le_bytes([data[32], data[33]]), 2);
        assert_eq!(u16::from_le_bytes([data[34], data[35]]), 16);
        assert_eq!(&data[36..40], b"data");
        assert_eq!(
            u32::from_le_bytes([data[40], data[41], data[42], data[43]]),
            200
        );
    }

    #[test]
    fn test_float32_header_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("float.wav");

        let samples = vec![0.25f32; 10];
        write_wav(&path, &samples, 48000, 2).unwrap();

        let data = std::fs::read(&path).unwrap();
        // format tag 3 (IEEE float), 32 bits, block align 8
        assert_eq!(u16::from_le_bytes([data[20], data[21]]), 3);
        assert_eq!(u16::from_le_bytes([data[34], data[35]]), 32);
        assert_eq!(u16::from_le_bytes([data[32], data[33]]), 8);
        assert_eq!(
            u32::from_le_bytes([data[40], data[41], data[42], data[43]]),
            40
        );
    }

    #[test]
    fn test_round_trip_i16() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rt.wav");

        let samples: Vec<i16> = (0..4410).map(|i| (i % 256 - 128) as i16 * 100).collect();
        write_wav(&path, &samples, 44100, 1).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.sample_count(), 4410);
        assert_eq!(reader.duration(), Duration::from_millis(100));
        assert_eq!(reader.samples::<i16>().unwrap(), samples);
    }

    #[test]
    fn test_round_trip_f32() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rt_f32.wav");

        let samples: Vec<f32> = (0..800).map(|i| (i as f32 / 800.0) - 0.5).collect();
        write_wav(&path, &samples, 16000, 1).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().format_tag, 3);
        assert_eq!(reader.samples::<f32>().unwrap(), samples);
    }

    #[test]
    fn test_capture_duration_data_size() {
        // 2 seconds at 8kHz mono 16-bit must produce exactly 8000*2*2
        // data bytes.
        let dir = tempdir().unwrap();
        let path = dir.path().join("sized.wav");

        let samples = vec![1234i16; 8000 * 2];
        write_wav(&path, &samples, 8000, 1).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len() - WAV_HEADER_SIZE, 8000 * 2 * 2);
    }

    #[test]
    fn test_sample_type_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mismatch.wav");

        write_wav(&path, &[0i16; 8], 8000, 1).unwrap();
        let reader = WavReader::open(&path).unwrap();

        assert!(matches!(
            reader.samples::<f32>(),
            Err(WavError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let result = WavReader::open("/nonexistent/missing.wav".as_ref());
        assert!(matches!(result, Err(WavError::Io { .. })));
    }

    #[test]
    fn test_write_unwritable_path() {
        let path = PathBuf::from("/nonexistent/directory/out.wav");
        let result = write_wav(&path, &[0i16; 4], 8000, 1);
        assert!(matches!(result, Err(WavError::Io { .. })));
    }

    #[test]
    fn test_not_wave_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.wav");
        std::fs::write(&path, b"definitely not a wave file").unwrap();

        assert!(matches!(
            WavReader::open(&path),
            Err(WavError::NotWave { .. })
        ));
    }

    #[test]
    fn test_truncated_data_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("trunc.wav");

        write_wav(&path, &[7i16; 100], 8000, 1).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 50);
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            WavReader::open(&path),
            Err(WavError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unknown_chunks_skipped() {
        // Hand-build a file with a LIST chunk between fmt and data.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&0u32.to_le_bytes()); // size patched below
        bytes.extend_from_slice(b"WAVE");

        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&8000u32.to_le_bytes());
        bytes.extend_from_slice(&16000u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());

        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"INFO");

        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&100i16.to_le_bytes());
        bytes.extend_from_slice(&200i16.to_le_bytes());

        let riff_size = (bytes.len() - 8) as u32;
        bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());

        let dir = tempdir().unwrap();
        let path = dir.path().join("list.wav");
        std::fs::write(&path, &bytes).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.samples::<i16>().unwrap(), vec![100, 200]);
    }

    #[test]
    fn test_missing_data_chunk() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&28u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);

        let dir = tempdir().unwrap();
        let path = dir.path().join("nodata.wav");
        std::fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            WavReader::open(&path),
            Err(WavError::MissingChunk { chunk: "data", .. })
        ));
    }
}
