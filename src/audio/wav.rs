//! In-memory WAV encoding for captured clips.

use crate::error::{AurisError, Result};
use std::io::Cursor;

/// Encode 16-bit PCM mono samples into a WAV container in memory.
///
/// The classification endpoint is sensitive to content framing, so every
/// clip is shipped as a well-formed mono WAV at the capture rate.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| AurisError::AudioCapture {
                message: format!("Failed to create WAV writer: {}", e),
            })?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| AurisError::AudioCapture {
                    message: format!("Failed to write WAV sample: {}", e),
                })?;
        }
        writer.finalize().map_err(|e| AurisError::AudioCapture {
            message: format!("Failed to finalize WAV data: {}", e),
        })?;
    }

    Ok(cursor.into_inner())
}

/// Decode a WAV buffer back into 16-bit PCM samples.
///
/// Used by tests and by the playback path when a consumer wants raw PCM.
pub fn decode_wav(data: &[u8]) -> Result<(Vec<i16>, u32)> {
    let reader = hound::WavReader::new(Cursor::new(data)).map_err(|e| AurisError::AudioCapture {
        message: format!("Failed to parse WAV data: {}", e),
    })?;

    let sample_rate = reader.spec().sample_rate;
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AurisError::AudioCapture {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

    Ok((samples, sample_rate))
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos.floor() as usize;
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx.min(samples.len().saturating_sub(1))]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_riff_header() {
        let samples = vec![0i16; 1600];
        let data = encode_wav(&samples, 16000).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let samples: Vec<i16> = (0..1000).map(|i| (i % 321) as i16 - 160).collect();
        let data = encode_wav(&samples, 16000).unwrap();
        let (decoded, rate) = decode_wav(&data).unwrap();
        assert_eq!(rate, 16000);
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_encode_empty_samples_is_valid_wav() {
        let data = encode_wav(&[], 16000).unwrap();
        // Header only: 44 bytes for a canonical PCM WAV
        assert_eq!(data.len(), 44);
        let (decoded, _) = decode_wav(&data).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_wav(b"not a wav file").is_err());
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![1i16, 2, 3, 4];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples = vec![0i16; 1000];
        let out = resample(&samples, 32000, 16000);
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn test_resample_doubles_length() {
        let samples = vec![100i16; 500];
        let out = resample(&samples, 16000, 32000);
        assert_eq!(out.len(), 1000);
        assert!(out.iter().all(|&s| s == 100));
    }
}
