//! Frequency axis tick placement for the label toggle.

use crate::spectrogram::DisplayParams;

const CANDIDATE_HZ: [f32; 16] = [
    20.0, 50.0, 100.0, 200.0, 300.0, 500.0, 1000.0, 2000.0, 3000.0, 5000.0, 8000.0, 10000.0,
    12000.0, 15000.0, 20000.0, 40000.0,
];

/// Minimum vertical distance between two labelled ticks, in pixels.
const MIN_TICK_SPACING: u32 = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyTick {
    /// Row from the top of the chunk
    pub row: u32,
    pub hz: f32,
    pub label: String,
}

/// Places round-frequency ticks within the display range, laid out by the active scale.
pub fn frequency_ticks(display: &DisplayParams, height: u32) -> Vec<FrequencyTick> {
    if height == 0 || display.max_frequency <= display.min_frequency {
        return Vec::new();
    }

    let mut ticks: Vec<FrequencyTick> = Vec::new();
    for hz in CANDIDATE_HZ {
        if hz < display.min_frequency || hz > display.max_frequency {
            continue;
        }
        let position = display
            .frequency_scale
            .position(hz, display.min_frequency, display.max_frequency)
            .clamp(0.0, 1.0);
        let row = ((1.0 - position) * (height - 1) as f32).round() as u32;

        // Candidates ascend in Hz, so rows descend
        if ticks
            .last()
            .is_some_and(|previous| previous.row.saturating_sub(row) < MIN_TICK_SPACING)
        {
            continue;
        }
        ticks.push(FrequencyTick {
            row,
            hz,
            label: format_hz(hz),
        });
    }
    ticks
}

/// Formats a frequency compactly: `500`, `1k`, `2.5k`.
pub fn format_hz(hz: f32) -> String {
    if hz >= 1000.0 {
        let khz = hz / 1000.0;
        if (khz - khz.round()).abs() < f32::EPSILON {
            format!("{}k", khz.round() as u32)
        } else {
            format!("{khz:.1}k")
        }
    } else {
        format!("{}", hz.round() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::FrequencyScale;

    fn display(scale: FrequencyScale) -> DisplayParams {
        DisplayParams {
            frequency_scale: scale,
            min_frequency: 0.0,
            max_frequency: 22050.0,
            gain_db: 20.0,
            range_db: 80.0,
            labels: true,
        }
    }

    #[test]
    fn test_format_hz() {
        assert_eq!(format_hz(500.0), "500");
        assert_eq!(format_hz(1000.0), "1k");
        assert_eq!(format_hz(2500.0), "2.5k");
    }

    #[test]
    fn test_ticks_are_spaced_and_ordered() {
        for &scale in FrequencyScale::all() {
            let ticks = frequency_ticks(&display(scale), 256);
            assert!(!ticks.is_empty(), "{scale}");
            for pair in ticks.windows(2) {
                assert!(pair[0].hz < pair[1].hz);
                assert!(pair[0].row - pair[1].row >= MIN_TICK_SPACING);
            }
        }
    }

    #[test]
    fn test_log_scale_spreads_low_ticks() {
        let linear = frequency_ticks(&display(FrequencyScale::Linear), 256);
        let log = frequency_ticks(&display(FrequencyScale::Logarithmic), 256);
        assert!(log.len() > linear.len());
    }
}
