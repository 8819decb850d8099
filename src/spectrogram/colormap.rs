//! Color lookup tables for spectrogram rendering.
//!
//! Every map is a flat 256 x RGB table (768 bytes). Named presets are expanded
//! from a handful of control stops and cached by name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// Number of entries in a lookup table.
pub const LUT_ENTRIES: usize = 256;

/// Length in bytes of a lookup table.
pub const LUT_BYTES: usize = LUT_ENTRIES * 3;

/// Shared, immutable 256 x RGB lookup table.
pub type ColorLut = Arc<[u8]>;

const DEFAULT_COLOR_MAP: &str = "viridis";

const VIRIDIS: &[[u8; 3]] = &[
    [68, 1, 84],
    [72, 36, 117],
    [65, 68, 135],
    [53, 95, 141],
    [42, 120, 142],
    [33, 145, 140],
    [34, 168, 132],
    [68, 191, 112],
    [122, 209, 81],
    [189, 223, 38],
    [253, 231, 37],
];

const MAGMA: &[[u8; 3]] = &[
    [0, 0, 4],
    [20, 14, 54],
    [59, 15, 112],
    [100, 26, 128],
    [140, 41, 129],
    [183, 55, 121],
    [222, 73, 104],
    [247, 112, 92],
    [254, 159, 109],
    [254, 207, 146],
    [252, 253, 191],
];

const INFERNO: &[[u8; 3]] = &[
    [0, 0, 4],
    [22, 11, 57],
    [66, 10, 104],
    [106, 23, 110],
    [147, 38, 103],
    [188, 55, 84],
    [221, 81, 58],
    [243, 120, 25],
    [252, 165, 10],
    [246, 215, 70],
    [252, 255, 164],
];

const ROSEUS: &[[u8; 3]] = &[
    [4, 4, 4],
    [40, 13, 68],
    [97, 18, 112],
    [157, 30, 120],
    [209, 59, 103],
    [243, 105, 81],
    [254, 163, 91],
    [255, 219, 143],
    [255, 254, 214],
];

/// Color map selection: a preset name or a list of custom stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorMapValue {
    Named(String),
    Custom(Vec<ColorStop>),
}

impl Default for ColorMapValue {
    fn default() -> Self {
        ColorMapValue::Named(DEFAULT_COLOR_MAP.to_string())
    }
}

impl From<&str> for ColorMapValue {
    fn from(name: &str) -> Self {
        ColorMapValue::Named(name.to_string())
    }
}

/// A single custom stop; alpha is accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorStop {
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl ColorStop {
    fn rgb(self) -> [u8; 3] {
        match self {
            ColorStop::Rgb(rgb) => rgb,
            ColorStop::Rgba([r, g, b, _]) => [r, g, b],
        }
    }
}

/// Names of the built-in presets.
pub fn preset_names() -> &'static [&'static str] {
    &[
        "viridis",
        "magma",
        "inferno",
        "roseus",
        "grayscale",
        "igray",
    ]
}

/// Resolves a color map value to its lookup table.
pub fn get_color_map(value: &ColorMapValue) -> ColorLut {
    match value {
        ColorMapValue::Named(name) => named_color_map(name),
        ColorMapValue::Custom(stops) => {
            let rgb: Vec<[u8; 3]> = stops.iter().map(|stop| stop.rgb()).collect();
            if rgb.is_empty() {
                tracing::warn!("Empty custom color map, falling back to {DEFAULT_COLOR_MAP}");
                return named_color_map(DEFAULT_COLOR_MAP);
            }
            Arc::from(interpolate_stops(&rgb))
        }
    }
}

/// Returns the cached lookup table for a preset name.
///
/// Unknown names resolve to viridis (with a warning on first use).
pub fn named_color_map(name: &str) -> ColorLut {
    let cache = lut_cache();
    if let Some(existing) = cache.read().ok().and_then(|map| map.get(name).cloned()) {
        return existing;
    }

    let lut: ColorLut = Arc::from(build_named(name));
    if let Ok(mut map) = cache.write() {
        return Arc::clone(map.entry(name.to_string()).or_insert(lut));
    }
    lut
}

fn lut_cache() -> &'static RwLock<HashMap<String, ColorLut>> {
    static INSTANCE: OnceLock<RwLock<HashMap<String, ColorLut>>> = OnceLock::new();
    INSTANCE.get_or_init(|| RwLock::new(HashMap::new()))
}

fn build_named(name: &str) -> Vec<u8> {
    match name.trim().to_ascii_lowercase().as_str() {
        "viridis" => interpolate_stops(VIRIDIS),
        "magma" => interpolate_stops(MAGMA),
        "inferno" => interpolate_stops(INFERNO),
        "roseus" => interpolate_stops(ROSEUS),
        "gray" | "grayscale" => ramp(|i| i),
        "igray" | "inverted-grayscale" | "inverted_grayscale" => ramp(|i| 255 - i),
        _ => {
            tracing::warn!("Unknown color map '{}', falling back to {DEFAULT_COLOR_MAP}", name);
            interpolate_stops(VIRIDIS)
        }
    }
}

fn ramp(level: impl Fn(u8) -> u8) -> Vec<u8> {
    (0..=255u8)
        .flat_map(|i| {
            let v = level(i);
            [v, v, v]
        })
        .collect()
}

/// Expands control stops into a 256-entry table by linear interpolation across stop indices.
fn interpolate_stops(stops: &[[u8; 3]]) -> Vec<u8> {
    let mut lut = Vec::with_capacity(LUT_BYTES);
    if stops.len() == 1 {
        for _ in 0..LUT_ENTRIES {
            lut.extend_from_slice(&stops[0]);
        }
        return lut;
    }

    let segments = (stops.len() - 1) as f32;
    for i in 0..LUT_ENTRIES {
        let t = i as f32 / (LUT_ENTRIES - 1) as f32 * segments;
        let lower = (t.floor() as usize).min(stops.len() - 2);
        let frac = t - lower as f32;
        let (a, b) = (stops[lower], stops[lower + 1]);
        for channel in 0..3 {
            let value = a[channel] as f32 + (b[channel] as f32 - a[channel] as f32) * frac;
            lut.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_maps_are_cached_and_identical() {
        let first = get_color_map(&ColorMapValue::from("viridis"));
        let second = get_color_map(&ColorMapValue::from("viridis"));
        assert_eq!(first.len(), LUT_BYTES);
        assert_eq!(&first[..], &second[..]);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_grayscale_endpoints() {
        let lut = get_color_map(&ColorMapValue::from("grayscale"));
        assert_eq!(&lut[0..3], &[0, 0, 0]);
        assert_eq!(&lut[765..768], &[255, 255, 255]);

        let inverted = get_color_map(&ColorMapValue::from("igray"));
        assert_eq!(&inverted[0..3], &[255, 255, 255]);
        assert_eq!(&inverted[765..768], &[0, 0, 0]);
    }

    #[test]
    fn test_presets_hit_their_end_stops() {
        for (name, stops) in [
            ("viridis", VIRIDIS),
            ("magma", MAGMA),
            ("inferno", INFERNO),
            ("roseus", ROSEUS),
        ] {
            let lut = named_color_map(name);
            assert_eq!(lut.len(), LUT_BYTES, "{name}");
            assert_eq!(&lut[0..3], &stops[0], "{name}");
            assert_eq!(&lut[765..768], &stops[stops.len() - 1], "{name}");
        }
    }

    #[test]
    fn test_custom_stops_interpolate() {
        let value: ColorMapValue =
            serde_json::from_str("[[0, 0, 0, 255], [255, 0, 100]]").unwrap();
        let lut = get_color_map(&value);
        assert_eq!(&lut[0..3], &[0, 0, 0]);
        assert_eq!(&lut[765..768], &[255, 0, 100]);
        assert_eq!(lut[128 * 3], 128);
    }

    #[test]
    fn test_unknown_name_falls_back_to_viridis() {
        let unknown = named_color_map("sunset-at-sea");
        let viridis = named_color_map("viridis");
        assert_eq!(&unknown[..], &viridis[..]);
    }
}
