//! Magnitude spectrum in decibels using FFT.
//!
//! Converts a windowed, zero-padded real frame into `N / 2` decibel magnitudes.
//! Display gain and range are applied separately by [`normalize_db`] so cached
//! frequency data stays independent of display settings.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

/// Lowest decibel value produced, standing in for silence.
pub const DB_FLOOR: f32 = -160.0;

/// Stateful FFT engine with per-size plan and scratch reuse.
pub struct FftEngine {
    fft_planner: FftPlanner<f32>,
    plans: HashMap<usize, Arc<dyn Fft<f32>>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftEngine {
    /// Creates a new FFT engine with an empty plan cache.
    pub fn new() -> Self {
        Self {
            fft_planner: FftPlanner::new(),
            plans: HashMap::new(),
            buffer: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn plan(&mut self, len: usize) -> Arc<dyn Fft<f32>> {
        let planner = &mut self.fft_planner;
        Arc::clone(
            self.plans
                .entry(len)
                .or_insert_with(|| planner.plan_fft_forward(len)),
        )
    }

    /// Transforms `frame` and writes `frame.len() / 2` decibel magnitudes into `out`.
    ///
    /// # Arguments
    /// * `frame` - Windowed real samples, already zero-padded to the FFT length
    /// * `out` - Destination for the positive-frequency bins
    pub fn magnitudes_db(&mut self, frame: &[f32], out: &mut [f32]) {
        let len = frame.len();
        if len == 0 {
            return;
        }

        let fft = self.plan(len);

        self.buffer.clear();
        self.buffer
            .extend(frame.iter().map(|&sample| Complex::new(sample, 0.0)));

        let scratch_len = fft.get_inplace_scratch_len();
        if self.scratch.len() < scratch_len {
            self.scratch.resize(scratch_len, Complex::new(0.0, 0.0));
        }
        fft.process_with_scratch(&mut self.buffer, &mut self.scratch[..scratch_len]);

        for (slot, bin) in out.iter_mut().zip(self.buffer.iter().take(len / 2)) {
            *slot = magnitude_to_db(bin.norm());
        }
    }

    /// Number of distinct transform sizes planned so far.
    pub fn planned_sizes(&self) -> usize {
        self.plans.len()
    }
}

impl Default for FftEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a linear magnitude to decibels, floored at [`DB_FLOOR`].
pub fn magnitude_to_db(magnitude: f32) -> f32 {
    if magnitude > 0.0 {
        (20.0 * magnitude.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// Maps a decibel value to `[0, 1]` for display.
///
/// `clamp01((db + range + gain) / range)`: with zero gain, `-range` dB maps to 0 and
/// 0 dB maps to 1.
pub fn normalize_db(db: f32, gain_db: f32, range_db: f32) -> f32 {
    if range_db <= 0.0 {
        return 0.0;
    }
    ((db + range_db + gain_db) / range_db).clamp(0.0, 1.0)
}
