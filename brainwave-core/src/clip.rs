//! Recorded audio clips and the decode boundary.
//!
//! A clip always carries its own sample rate. Timing descriptors (duration,
//! pause length, pace) are derived from that rate rather than from a hidden
//! constant, so a clip captured at 48 kHz does not silently produce wrong
//! figures. Callers that hand over headerless PCM supply a fallback rate,
//! which defaults to [`DEFAULT_SAMPLE_RATE`].

use std::io::Cursor;

use crate::error::{BrainwaveError, Result};

/// Analysis rate assumed for headerless clips (Hz, mono).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// A finished mono recording ready for analysis.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 44100, 48000).
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the duration of this clip in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Returns true if the clip contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size of the clip as raw f32 PCM, used as the rule engine's
    /// secondary buffer-size signal when no original byte length exists.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }

    /// Decode a raw recorded byte buffer into a clip.
    ///
    /// RIFF-tagged buffers are parsed as WAV; anything else is treated as
    /// headerless little-endian f32 PCM at `fallback_rate`.
    ///
    /// # Errors
    /// Returns [`BrainwaveError::ClipDecode`] for empty or malformed input.
    /// This is the only failure mode of the analysis path; the caller is
    /// expected to surface it as a retryable condition.
    pub fn decode(bytes: &[u8], fallback_rate: u32) -> Result<Self> {
        if bytes.is_empty() {
            return Err(BrainwaveError::ClipDecode("empty audio buffer".into()));
        }
        if bytes.starts_with(b"RIFF") {
            Self::from_wav_bytes(bytes)
        } else {
            Self::from_raw_f32(bytes, fallback_rate)
        }
    }

    /// Parse a WAV container (int 16/24/32 or float 32), downmixing
    /// interleaved channels to mono by averaging.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| BrainwaveError::ClipDecode(format!("wav header: {e}")))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| BrainwaveError::ClipDecode(format!("wav samples: {e}")))?,
            hound::SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| BrainwaveError::ClipDecode(format!("wav samples: {e}")))?
            }
        };

        if interleaved.is_empty() {
            return Err(BrainwaveError::ClipDecode("wav contains no samples".into()));
        }

        let samples = downmix(&interleaved, spec.channels as usize);
        Ok(Self::new(samples, spec.sample_rate))
    }

    /// Interpret headerless bytes as little-endian f32 mono PCM.
    pub fn from_raw_f32(bytes: &[u8], sample_rate: u32) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(BrainwaveError::ClipDecode(format!(
                "raw pcm length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let samples: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        if samples.iter().any(|s| !s.is_finite()) {
            return Err(BrainwaveError::ClipDecode(
                "raw pcm contains non-finite samples".into(),
            ));
        }
        Ok(Self::new(samples, sample_rate))
    }
}

/// Average interleaved frames down to one channel.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn empty_buffer_is_a_decode_error() {
        let err = AudioClip::decode(&[], DEFAULT_SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, BrainwaveError::ClipDecode(_)));
    }

    #[test]
    fn misaligned_raw_pcm_is_a_decode_error() {
        let err = AudioClip::decode(&[0u8; 7], DEFAULT_SAMPLE_RATE).unwrap_err();
        assert!(matches!(err, BrainwaveError::ClipDecode(_)));
    }

    #[test]
    fn raw_f32_round_trips() {
        let samples = [0.0f32, 0.5, -0.5, 1.0];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let clip = AudioClip::decode(&bytes, 16_000).unwrap();
        assert_eq!(clip.samples, samples);
        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.byte_len(), 16);
    }

    #[test]
    fn non_finite_raw_pcm_is_rejected() {
        let bytes: Vec<u8> = f32::NAN.to_le_bytes().to_vec();
        let err = AudioClip::from_raw_f32(&bytes, 16_000).unwrap_err();
        assert!(matches!(err, BrainwaveError::ClipDecode(_)));
    }

    #[test]
    fn wav_int16_decodes_with_its_own_rate() {
        let bytes = wav_bytes(&[0, 16384, -16384, 32767], 1, 22_050);
        let clip = AudioClip::decode(&bytes, DEFAULT_SAMPLE_RATE).unwrap();
        assert_eq!(clip.sample_rate, 22_050);
        assert_eq!(clip.samples.len(), 4);
        assert!((clip.samples[1] - 0.5).abs() < 1e-3);
        assert!((clip.samples[2] + 0.5).abs() < 1e-3);
    }

    #[test]
    fn stereo_wav_downmixes_to_mono() {
        // L=0.5, R=-0.5 per frame → mono 0.0
        let bytes = wav_bytes(&[16384, -16384, 16384, -16384], 2, 44_100);
        let clip = AudioClip::from_wav_bytes(&bytes).unwrap();
        assert_eq!(clip.samples.len(), 2);
        assert!(clip.samples.iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn duration_uses_the_clip_rate() {
        let clip = AudioClip::new(vec![0.0; 22_050], 22_050);
        assert!((clip.duration_secs() - 1.0).abs() < 1e-6);
    }
}
