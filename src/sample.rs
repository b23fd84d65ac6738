//! Sample types supported by the queue, adapters, and WAV codec.
//!
//! A session is generic over one [`Sample`] type chosen at construction;
//! the two supported representations are 16-bit signed integer and 32-bit
//! IEEE float PCM. Mixing formats within a session is unrepresentable.

use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}
    impl Sealed for i16 {}
    impl Sealed for f32 {}
}

/// A PCM sample representation.
///
/// Implemented for `i16` (16-bit linear PCM) and `f32` (32-bit IEEE float)
/// only. The trait carries everything format-dependent: the silence value
/// substituted on underflow, the WAV `fmt ` chunk fields, the little-endian
/// byte encoding, and the matching CPAL sample format for negotiation.
pub trait Sample:
    sealed::Sealed + cpal::SizedSample + Copy + Send + Sync + PartialEq + Debug + 'static
{
    /// The silence value (numeric zero) written on queue underflow.
    const SILENCE: Self;

    /// Bits per sample, as declared in the WAV header.
    const BITS: u16;

    /// Bytes per sample on the wire.
    const BYTES: usize = (Self::BITS / 8) as usize;

    /// WAV audio format tag: 1 for linear PCM, 3 for IEEE float.
    const WAV_FORMAT_TAG: u16;

    /// The CPAL sample format used during stream negotiation.
    const FORMAT: cpal::SampleFormat;

    /// Appends the little-endian encoding of this sample to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decodes a sample from exactly [`Sample::BYTES`] little-endian bytes.
    ///
    /// Callers hand in exact-sized slices (via `chunks_exact`).
    fn read_le(bytes: &[u8]) -> Self;
}

impl Sample for i16 {
    const SILENCE: Self = 0;
    const BITS: u16 = 16;
    const WAV_FORMAT_TAG: u16 = 1;
    const FORMAT: cpal::SampleFormat = cpal::SampleFormat::I16;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }
}

impl Sample for f32 {
    const SILENCE: Self = 0.0;
    const BITS: u16 = 32;
    const WAV_FORMAT_TAG: u16 = 3;
    const FORMAT: cpal::SampleFormat = cpal::SampleFormat::F32;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Self {
        f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}
