//! Frequency to vertical position mapping.

use super::config::FrequencyScale;

impl FrequencyScale {
    /// Maps `hz` to a normalized position where `min_hz` is 0 and `max_hz` is 1.
    ///
    /// Returns 0 when the bounds coincide. Evaluated per output row, so it stays
    /// allocation-free.
    pub fn position(self, hz: f32, min_hz: f32, max_hz: f32) -> f32 {
        if max_hz == min_hz {
            return 0.0;
        }

        let (value, low, high) = match self {
            FrequencyScale::Linear => (hz as f64, min_hz as f64, max_hz as f64),
            FrequencyScale::Logarithmic => (
                (hz.max(1.0) as f64).log2(),
                (min_hz.max(1.0) as f64).log2(),
                (max_hz as f64).log2(),
            ),
            FrequencyScale::Mel => (hz_to_mel(hz), hz_to_mel(min_hz), hz_to_mel(max_hz)),
            FrequencyScale::Bark => (hz_to_bark(hz), hz_to_bark(min_hz), hz_to_bark(max_hz)),
            FrequencyScale::Erb => (hz_to_erb(hz), hz_to_erb(min_hz), hz_to_erb(max_hz)),
        };

        let span = high - low;
        if span == 0.0 || !span.is_finite() {
            return 0.0;
        }
        ((value - low) / span) as f32
    }
}

fn hz_to_mel(hz: f32) -> f64 {
    2595.0 * (1.0 + hz as f64 / 700.0).log10()
}

fn hz_to_bark(hz: f32) -> f64 {
    let hz = hz as f64;
    13.0 * (0.00076 * hz).atan() + 3.5 * (hz / 7500.0).powi(2).atan()
}

fn hz_to_erb(hz: f32) -> f64 {
    21.4 * (1.0 + 0.00437 * hz as f64).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_map_to_unit_interval() {
        for &scale in FrequencyScale::all() {
            for (min, max) in [(0.0, 22050.0), (20.0, 20000.0), (100.0, 8000.0)] {
                let low = scale.position(min, min, max);
                let high = scale.position(max, min, max);
                assert!(low.abs() < 1e-6, "{scale} at min: {low}");
                assert!((high - 1.0).abs() < 1e-6, "{scale} at max: {high}");
            }
        }
    }

    #[test]
    fn test_monotonic_over_range() {
        for &scale in FrequencyScale::all() {
            let (min, max) = (20.0, 20000.0);
            let mut previous = f32::NEG_INFINITY;
            for step in 0..=1000 {
                let hz = min + (max - min) * step as f32 / 1000.0;
                let pos = scale.position(hz, min, max);
                assert!(pos >= previous, "{scale} decreased at {hz} Hz");
                previous = pos;
            }
        }
    }

    #[test]
    fn test_equal_bounds_return_zero() {
        for &scale in FrequencyScale::all() {
            assert_eq!(scale.position(440.0, 1000.0, 1000.0), 0.0);
        }
    }

    #[test]
    fn test_perceptual_scales_expand_low_frequencies() {
        let linear = FrequencyScale::Linear.position(1000.0, 0.0, 22050.0);
        for scale in [
            FrequencyScale::Logarithmic,
            FrequencyScale::Mel,
            FrequencyScale::Bark,
            FrequencyScale::Erb,
        ] {
            assert!(scale.position(1000.0, 0.0, 22050.0) > linear, "{scale}");
        }
    }

    #[test]
    fn test_mel_reference_point() {
        // 1000 Hz is close to 1000 mel by construction of the formula
        assert!((hz_to_mel(1000.0) - 1000.0).abs() < 1.0);
    }
}
