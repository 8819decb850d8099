//! Change detection over resolved track settings.
//!
//! The config signature covers everything that affects pixels; the compute
//! signature covers only what affects frequency data. A track whose config
//! signature changed while its compute signature did not only needs repainting.

use super::overrides::ResolvedTrack;
use crate::spectrogram::{ColorMapValue, ComputeParams, SpectrogramConfig};
use crate::timeline::{RenderMode, TrackId};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Serialize)]
struct ConfigSignature<'a> {
    mode: RenderMode,
    config: &'a SpectrogramConfig,
    color_map: &'a ColorMapValue,
    mono: bool,
}

#[derive(Serialize)]
struct ComputeSignature {
    params: ComputeParams,
    mono: bool,
}

pub fn config_signature(track: &ResolvedTrack) -> Result<String> {
    serde_json::to_string(&ConfigSignature {
        mode: track.mode,
        config: &track.config,
        color_map: &track.color_map,
        mono: track.mono,
    })
    .context("Failed to serialize config signature")
}

pub fn compute_signature(track: &ResolvedTrack) -> Result<String> {
    serde_json::to_string(&ComputeSignature {
        params: track.config.compute_params(),
        mono: track.mono,
    })
    .context("Failed to serialize compute signature")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSignatures {
    pub config: String,
    pub compute: String,
}

impl TrackSignatures {
    pub fn of(track: &ResolvedTrack) -> Result<Self> {
        Ok(Self {
            config: config_signature(track)?,
            compute: compute_signature(track)?,
        })
    }
}

/// Tracks whose signatures differ from the previous pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureChanges {
    pub config_changed: HashSet<TrackId>,
    pub compute_changed: HashSet<TrackId>,
}

impl SignatureChanges {
    pub fn is_empty(&self) -> bool {
        self.config_changed.is_empty() && self.compute_changed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignatureMap(HashMap<TrackId, TrackSignatures>);

impl SignatureMap {
    pub fn insert(&mut self, track: TrackId, signatures: TrackSignatures) {
        self.0.insert(track, signatures);
    }

    pub fn get(&self, track: &str) -> Option<&TrackSignatures> {
        self.0.get(track)
    }

    /// Compares `next` against this map. New tracks count as changed on both.
    pub fn diff(&self, next: &SignatureMap) -> SignatureChanges {
        let mut changes = SignatureChanges::default();
        for (track, signatures) in &next.0 {
            match self.0.get(track) {
                Some(previous) => {
                    if previous.config != signatures.config {
                        changes.config_changed.insert(track.clone());
                    }
                    if previous.compute != signatures.compute {
                        changes.compute_changed.insert(track.clone());
                    }
                }
                None => {
                    changes.config_changed.insert(track.clone());
                    changes.compute_changed.insert(track.clone());
                }
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::FrequencyScale;

    fn resolved() -> ResolvedTrack {
        ResolvedTrack {
            mode: RenderMode::Spectrogram,
            config: SpectrogramConfig::default(),
            color_map: ColorMapValue::default(),
            mono: false,
        }
    }

    fn map(track: &ResolvedTrack) -> SignatureMap {
        let mut map = SignatureMap::default();
        map.insert("t".to_string(), TrackSignatures::of(track).unwrap());
        map
    }

    #[test]
    fn test_display_change_keeps_compute_signature() {
        let before = resolved();
        let mut after = resolved();
        after.color_map = ColorMapValue::from("magma");
        after.config.frequency_scale = FrequencyScale::Bark;
        after.mode = RenderMode::Both;

        let changes = map(&before).diff(&map(&after));
        assert!(changes.config_changed.contains("t"));
        assert!(changes.compute_changed.is_empty());
    }

    #[test]
    fn test_compute_change_and_mono() {
        let before = resolved();
        let mut padded = resolved();
        padded.config.zero_padding_factor = 4;
        let mut mono = resolved();
        mono.mono = true;

        assert!(map(&before).diff(&map(&padded)).compute_changed.contains("t"));
        assert!(map(&before).diff(&map(&mono)).compute_changed.contains("t"));
        assert!(map(&before).diff(&map(&before)).is_empty());
    }

    #[test]
    fn test_new_track_counts_as_changed() {
        let changes = SignatureMap::default().diff(&map(&resolved()));
        assert!(changes.config_changed.contains("t"));
        assert!(changes.compute_changed.contains("t"));
    }
}
