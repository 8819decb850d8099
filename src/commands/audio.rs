//! WAV decoding into de-interleaved sample buffers.

use crate::timeline::AudioBuffer;
use anyhow::{anyhow, Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;

/// Reads a WAV file of any channel count into normalized `f32` channels.
///
/// # Errors
/// - If the file cannot be opened or is not a valid WAV
/// - If the sample data is truncated or malformed
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(anyhow!("WAV file {} has no channels", path.display()));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<hound::Result<Vec<f32>>>()?,
        SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / max_val))
                .collect::<hound::Result<Vec<f32>>>()?
        }
    };

    let buffer = AudioBuffer::from_interleaved(spec.sample_rate, spec.channels as usize, &samples);
    tracing::info!(
        "Decoded {}: {} Hz, {} channel(s), {} samples",
        path.display(),
        buffer.sample_rate,
        buffer.channel_count(),
        buffer.len()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    #[test]
    fn test_reads_interleaved_int_wav() {
        let path =
            std::env::temp_dir().join(format!("spectrowave-{}-read.wav", std::process::id()));
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..100i16 {
            writer.write_sample(i * 100).unwrap();
            writer.write_sample(-i * 100).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = read_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate, 8000);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.len(), 100);
        assert!((buffer.channels[0][99] - 9900.0 / 32768.0).abs() < 1e-6);
        assert!((buffer.channels[1][99] + 9900.0 / 32768.0).abs() < 1e-6);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_wav(Path::new("/nonexistent/spectrowave.wav")).is_err());
    }
}
