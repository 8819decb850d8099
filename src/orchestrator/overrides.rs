//! Per-track settings resolution: override, then the track's own settings, then
//! the global default.

use crate::spectrogram::{ColorMapValue, SpectrogramConfig};
use crate::timeline::{RenderMode, Track, TrackId};
use std::collections::HashMap;

/// Settings in effect for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    pub mode: RenderMode,
    pub config: SpectrogramConfig,
    pub color_map: ColorMapValue,
    pub mono: bool,
}

#[derive(Debug, Clone, Default)]
struct TrackOverride {
    render_mode: Option<RenderMode>,
    config: Option<SpectrogramConfig>,
    color_map: Option<ColorMapValue>,
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    config: SpectrogramConfig,
    color_map: ColorMapValue,
    tracks: HashMap<TrackId, TrackOverride>,
}

impl Overrides {
    pub fn new(config: SpectrogramConfig, color_map: ColorMapValue) -> Self {
        Self {
            config,
            color_map,
            tracks: HashMap::new(),
        }
    }

    pub fn set_global(&mut self, config: SpectrogramConfig, color_map: ColorMapValue) {
        self.config = config;
        self.color_map = color_map;
    }

    pub fn global_config(&self) -> &SpectrogramConfig {
        &self.config
    }

    pub fn global_color_map(&self) -> &ColorMapValue {
        &self.color_map
    }

    pub fn set_render_mode(&mut self, track: &str, mode: RenderMode) {
        self.tracks.entry(track.to_string()).or_default().render_mode = Some(mode);
    }

    /// Applies a settings submission to one track. `None` keeps the current color map.
    pub fn set_config(
        &mut self,
        track: &str,
        config: SpectrogramConfig,
        color_map: Option<ColorMapValue>,
    ) {
        let entry = self.tracks.entry(track.to_string()).or_default();
        entry.config = Some(config);
        if color_map.is_some() {
            entry.color_map = color_map;
        }
    }

    pub fn clear(&mut self, track: &str) {
        self.tracks.remove(track);
    }

    /// Drops overrides for tracks that no longer exist.
    pub fn retain_tracks(&mut self, tracks: &[Track]) {
        self.tracks
            .retain(|id, _| tracks.iter().any(|track| &track.id == id));
    }

    pub fn resolve(&self, track: &Track) -> ResolvedTrack {
        let entry = self.tracks.get(&track.id);
        ResolvedTrack {
            mode: entry
                .and_then(|o| o.render_mode)
                .or(track.render_mode)
                .unwrap_or_default(),
            config: entry
                .and_then(|o| o.config.clone())
                .or_else(|| track.spectrogram.clone())
                .unwrap_or_else(|| self.config.clone()),
            color_map: entry
                .and_then(|o| o.color_map.clone())
                .or_else(|| track.color_map.clone())
                .unwrap_or_else(|| self.color_map.clone()),
            mono: track.mono,
        }
    }
}
