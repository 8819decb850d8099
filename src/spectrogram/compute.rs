//! Short-time Fourier transform over a channel's samples.
//!
//! Produces a row-major frame x bin decibel matrix from overlapping, windowed,
//! zero-padded frames. Samples past the end of the buffer read as silence.

use super::config::SpectrogramConfig;
use super::fft::FftEngine;
use super::window::generate_window;

/// Computed frequency data for one channel (or a mono mixdown) of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramData {
    /// Transform length actually used (window size x zero-padding factor)
    pub fft_length: usize,
    /// Analysis window length in samples
    pub window_size: usize,
    /// Always `fft_length / 2`
    pub frequency_bin_count: usize,
    pub sample_rate: u32,
    pub hop_size: usize,
    pub frame_count: usize,
    /// Buffer position (in samples) where frame 0 starts
    pub start_sample: usize,
    /// Row-major `frame_count x frequency_bin_count` decibel values
    pub data: Vec<f32>,
    /// Gain in effect when computed
    pub gain_db: f32,
    /// Range in effect when computed
    pub range_db: f32,
}

impl SpectrogramData {
    /// Returns the decibel row for `frame`.
    pub fn frame(&self, frame: usize) -> &[f32] {
        let start = frame * self.frequency_bin_count;
        &self.data[start..start + self.frequency_bin_count]
    }

    pub fn value(&self, frame: usize, bin: usize) -> f32 {
        self.data[frame * self.frequency_bin_count + bin]
    }

    /// Center frequency of `bin` in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_length as f32
    }

    /// Width of a single bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate as f32 / self.fft_length as f32
    }

    /// Finds the loudest cell as `(frame, bin, db)`.
    pub fn peak(&self) -> Option<(usize, usize, f32)> {
        let bins = self.frequency_bin_count;
        if bins == 0 {
            return None;
        }
        self.data
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (index, &db)| match best {
                Some((_, best_db)) if best_db >= db => best,
                _ => Some((index, db)),
            })
            .map(|(index, db)| (index / bins, index % bins, db))
    }
}

/// Number of analysis frames for `duration` samples.
///
/// `max(1, floor((duration - window) / hop) + 1)`
pub fn frame_count(duration: usize, window_size: usize, hop_size: usize) -> usize {
    let hop = hop_size.max(1);
    if duration < window_size {
        1
    } else {
        (duration - window_size) / hop + 1
    }
}

/// Computes the spectrogram of `samples[offset..offset + duration]`.
///
/// # Arguments
/// * `samples` - One channel of decoded audio
/// * `sample_rate` - Sample rate of `samples` in Hz
/// * `config` - Analysis settings; only the compute subset is used
/// * `offset` - First sample of the analysed range
/// * `duration` - Length of the analysed range in samples
/// * `engine` - Reusable FFT engine
pub fn compute_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    config: &SpectrogramConfig,
    offset: usize,
    duration: usize,
    engine: &mut FftEngine,
) -> SpectrogramData {
    let window_size = config.window_size();
    let hop_size = config.hop();
    let fft_length = config.fft_length();
    let bins = fft_length / 2;
    let frames = frame_count(duration, window_size, hop_size);

    let window = generate_window(config.window, window_size, config.window_param);
    let mut frame_buffer = vec![0.0f32; fft_length];
    let mut data = vec![0.0f32; frames * bins];

    for (frame, row) in data.chunks_exact_mut(bins).enumerate() {
        let frame_start = offset + frame * hop_size;
        for (i, (slot, &w)) in frame_buffer.iter_mut().zip(window.iter()).enumerate() {
            let sample = samples.get(frame_start + i).copied().unwrap_or(0.0);
            *slot = sample * w;
        }
        engine.magnitudes_db(&frame_buffer, row);
    }

    SpectrogramData {
        fft_length,
        window_size,
        frequency_bin_count: bins,
        sample_rate,
        hop_size,
        frame_count: frames,
        start_sample: offset,
        data,
        gain_db: config.gain_db,
        range_db: config.range_db,
    }
}

/// Computes one spectrogram per channel over the same range.
pub fn compute_channels(
    channels: &[Vec<f32>],
    sample_rate: u32,
    config: &SpectrogramConfig,
    offset: usize,
    duration: usize,
    engine: &mut FftEngine,
) -> Vec<SpectrogramData> {
    channels
        .iter()
        .map(|samples| compute_spectrogram(samples, sample_rate, config, offset, duration, engine))
        .collect()
}

/// Computes a single spectrogram of the channel average.
///
/// Only the samples the frames actually read are mixed. With one channel this
/// is the plain single-channel path.
pub fn compute_mono(
    channels: &[Vec<f32>],
    sample_rate: u32,
    config: &SpectrogramConfig,
    offset: usize,
    duration: usize,
    engine: &mut FftEngine,
) -> SpectrogramData {
    match channels {
        [] => compute_spectrogram(&[], sample_rate, config, offset, duration, engine),
        [only] => compute_spectrogram(only, sample_rate, config, offset, duration, engine),
        _ => {
            let frames = frame_count(duration, config.window_size(), config.hop());
            let span = (frames - 1) * config.hop() + config.window_size();
            let available = channels.iter().map(Vec::len).max().unwrap_or(0);
            let end = (offset + span).min(available);
            let scale = 1.0 / channels.len() as f32;

            let mixed: Vec<f32> = (offset..end.max(offset))
                .map(|index| {
                    channels
                        .iter()
                        .map(|channel| channel.get(index).copied().unwrap_or(0.0))
                        .sum::<f32>()
                        * scale
                })
                .collect();

            let mut data = compute_spectrogram(&mixed, sample_rate, config, 0, duration, engine);
            data.start_sample = offset;
            data
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::WindowFunction;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_frame_count_formula() {
        assert_eq!(frame_count(10000, 2048, 512), 16);
        assert_eq!(frame_count(2048, 2048, 512), 1);
        assert_eq!(frame_count(100, 2048, 512), 1);
        assert_eq!(frame_count(2047, 2048, 512), 1);
        assert_eq!(frame_count(2560, 2048, 512), 2);
        for duration in [2048usize, 3000, 4096, 44100] {
            let expected = ((duration - 2048) / 256 + 1).max(1);
            assert_eq!(frame_count(duration, 2048, 256), expected);
        }
    }

    #[test]
    fn test_concrete_dimensions() {
        let config = SpectrogramConfig {
            fft_size: 2048,
            hop_size: Some(512),
            zero_padding_factor: 2,
            ..SpectrogramConfig::default()
        };
        let samples = vec![0.0f32; 10000];
        let mut engine = FftEngine::new();
        let data = compute_spectrogram(&samples, 44100, &config, 0, 10000, &mut engine);
        assert_eq!(data.frame_count, 16);
        assert_eq!(data.frequency_bin_count, 2048);
        assert_eq!(data.fft_length, 4096);
        assert_eq!(data.data.len(), 16 * 2048);
    }

    #[test]
    fn test_sine_peak_within_one_bin() {
        let sample_rate = 44100;
        let freq = 1000.0;
        let config = SpectrogramConfig {
            fft_size: 2048,
            window: WindowFunction::Rectangular,
            zero_padding_factor: 1,
            ..SpectrogramConfig::default()
        };
        let samples = sine(freq, sample_rate, 8192);
        let mut engine = FftEngine::new();
        let data =
            compute_spectrogram(&samples, sample_rate, &config, 0, samples.len(), &mut engine);

        let row = data.frame(0);
        let (peak_bin, _) = row
            .iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (bin, &db)| if db > best.1 { (bin, db) } else { best });
        let peak_hz = peak_bin as f32 / data.frequency_bin_count as f32 * sample_rate as f32 / 2.0;
        assert!((peak_hz - freq).abs() <= data.bin_width(), "peak at {peak_hz} Hz");
    }

    #[test]
    fn test_full_scale_sine_near_zero_db() {
        let sample_rate = 48000;
        // Exactly on bin 128 of a 4096-point transform
        let freq = 128.0 * sample_rate as f32 / 4096.0;
        let config = SpectrogramConfig {
            fft_size: 2048,
            window: WindowFunction::Hann,
            zero_padding_factor: 2,
            ..SpectrogramConfig::default()
        };
        let samples = sine(freq, sample_rate, 4096);
        let mut engine = FftEngine::new();
        let data =
            compute_spectrogram(&samples, sample_rate, &config, 0, samples.len(), &mut engine);
        let (_, _, peak_db) = data.peak().unwrap();
        assert!(peak_db.abs() < 0.5, "peak {peak_db} dB");
    }

    #[test]
    fn test_out_of_range_frames_read_silence() {
        let config = SpectrogramConfig {
            fft_size: 256,
            zero_padding_factor: 1,
            ..SpectrogramConfig::default()
        };
        let samples = vec![0.5f32; 300];
        let mut engine = FftEngine::new();
        // Range starts beyond the buffer: every frame is silent
        let data = compute_spectrogram(&samples, 8000, &config, 1000, 512, &mut engine);
        assert_eq!(data.start_sample, 1000);
        assert!(data.data.iter().all(|&db| db == super::super::fft::DB_FLOOR));
    }

    #[test]
    fn test_ranged_matches_full_at_same_offset() {
        let config = SpectrogramConfig {
            fft_size: 256,
            hop_size: Some(64),
            zero_padding_factor: 1,
            ..SpectrogramConfig::default()
        };
        let samples = sine(440.0, 8000, 4000);
        let mut engine = FftEngine::new();
        let full = compute_spectrogram(&samples, 8000, &config, 0, 4000, &mut engine);
        let ranged = compute_spectrogram(&samples, 8000, &config, 640, 1024, &mut engine);
        // frame 0 of the range is frame 10 of the full analysis
        assert_eq!(ranged.frame(0), full.frame(10));
        assert_eq!(ranged.frame_count, frame_count(1024, 256, 64));
    }

    #[test]
    fn test_mono_mixdown_averages_channels() {
        let config = SpectrogramConfig {
            fft_size: 256,
            zero_padding_factor: 1,
            ..SpectrogramConfig::default()
        };
        let left = sine(500.0, 8000, 2048);
        let inverted: Vec<f32> = left.iter().map(|s| -s).collect();
        let mut engine = FftEngine::new();

        // Opposite-phase channels cancel out
        let cancelled = compute_mono(
            &[left.clone(), inverted],
            8000,
            &config,
            0,
            2048,
            &mut engine,
        );
        assert!(cancelled.data.iter().all(|&db| db == super::super::fft::DB_FLOOR));

        // Identical channels match the single-channel path
        let doubled = compute_mono(
            &[left.clone(), left.clone()],
            8000,
            &config,
            0,
            2048,
            &mut engine,
        );
        let single = compute_mono(&[left.clone()], 8000, &config, 0, 2048, &mut engine);
        assert_eq!(doubled.frame_count, single.frame_count);
        for (a, b) in doubled.data.iter().zip(single.data.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}
