//! Reports the dominant frequency of a WAV file.

use super::audio::read_wav;
use crate::config::AppConfig;
use crate::spectrogram::{SpectrogramConfig, WindowFunction};
use crate::timeline::AudioBuffer;
use crate::worker::{ComputeJob, SampleRange, WorkerCoordinator};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Loudest cell of a spectrogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub hz: f32,
    pub db: f32,
    /// Start of the frame containing the peak, in seconds
    pub seconds: f64,
}

/// Handles `spectrowave peak`.
///
/// # Errors
/// - If the config file is malformed
/// - If the WAV cannot be decoded
/// - If the worker fails to compute the spectrogram
pub async fn handle_peak(
    input: &Path,
    fft_size: Option<usize>,
    zero_padding: Option<usize>,
    window: Option<String>,
) -> Result<()> {
    let mut config = AppConfig::load()?.spectrogram;
    if let Some(fft_size) = fft_size {
        config.fft_size = fft_size;
    }
    if let Some(factor) = zero_padding {
        config.zero_padding_factor = factor;
    }
    if let Some(window) = window {
        config.window = WindowFunction::from_name(&window);
    }

    let buffer = Arc::new(read_wav(input)?);
    match dominant_frequency(buffer, config).await? {
        Some(peak) => println!(
            "{:.1} Hz at {:.3} s ({:.1} dBFS)",
            peak.hz, peak.seconds, peak.db
        ),
        None => println!("No audio data in {}", input.display()),
    }
    Ok(())
}

/// Computes the channel-average spectrogram and finds its loudest cell.
///
/// Uses an uncached compute: the data comes straight back and nothing stays
/// in the worker.
///
/// # Errors
/// - If the worker fails to compute the spectrogram
pub async fn dominant_frequency(
    buffer: Arc<AudioBuffer>,
    config: SpectrogramConfig,
) -> Result<Option<Peak>> {
    if buffer.is_empty() {
        return Ok(None);
    }

    let worker = WorkerCoordinator::spawn();
    let clip = "peak".to_string();
    worker.register_audio(clip.clone(), Arc::clone(&buffer)).await?;
    let data = worker
        .compute(ComputeJob {
            clip,
            config,
            range: SampleRange::new(0, buffer.len()),
            mono: true,
        })
        .await?;
    worker.terminate();

    let peak = data.first().and_then(|spectrogram| {
        let (frame, bin, db) = spectrogram.peak()?;
        let sample = spectrogram.start_sample + frame * spectrogram.hop_size;
        Some(Peak {
            hz: spectrogram.bin_frequency(bin),
            db,
            seconds: sample as f64 / spectrogram.sample_rate.max(1) as f64,
        })
    });
    Ok(peak)
}
