//! Analysis window generation.
//!
//! Windows are normalized so their coefficients sum to 2, which makes a
//! full-scale sinusoid peak at 0 dB regardless of the window shape.

use super::config::WindowFunction;
use std::f64::consts::PI;

const DEFAULT_HAMMING_ALPHA: f64 = 0.54;
const DEFAULT_BLACKMAN_ALPHA: f64 = 0.16;

/// Generates a normalized window of `size` coefficients.
///
/// # Arguments
/// * `kind` - Window function to evaluate
/// * `size` - Number of coefficients (the analysis window length, not the padded FFT length)
/// * `param` - Optional shape parameter (Hamming alpha, Blackman alpha)
pub fn generate_window(kind: WindowFunction, size: usize, param: Option<f32>) -> Vec<f32> {
    if size == 0 {
        return Vec::new();
    }

    let raw: Vec<f64> = (0..size).map(|i| coefficient(kind, i, size, param)).collect();
    let sum: f64 = raw.iter().sum();
    let scale = if sum > 0.0 { 2.0 / sum } else { 0.0 };

    raw.into_iter().map(|w| (w * scale) as f32).collect()
}

fn coefficient(kind: WindowFunction, i: usize, size: usize, param: Option<f32>) -> f64 {
    if size == 1 {
        return 1.0;
    }

    let n = i as f64;
    let last = (size - 1) as f64;
    let phase = 2.0 * PI * n / last;

    match kind {
        WindowFunction::Hann => 0.5 * (1.0 - phase.cos()),
        WindowFunction::Hamming => {
            let alpha = param.map(f64::from).unwrap_or(DEFAULT_HAMMING_ALPHA);
            alpha - (1.0 - alpha) * phase.cos()
        }
        WindowFunction::Blackman => {
            let alpha = param.map(f64::from).unwrap_or(DEFAULT_BLACKMAN_ALPHA);
            let a0 = (1.0 - alpha) / 2.0;
            let a2 = alpha / 2.0;
            a0 - 0.5 * phase.cos() + a2 * (2.0 * phase).cos()
        }
        WindowFunction::BlackmanHarris => {
            0.35875 - 0.48829 * phase.cos() + 0.14128 * (2.0 * phase).cos()
                - 0.01168 * (3.0 * phase).cos()
        }
        WindowFunction::Bartlett => {
            let half = last / 2.0;
            1.0 - ((n - half) / half).abs()
        }
        WindowFunction::Rectangular => 1.0,
    }
}
