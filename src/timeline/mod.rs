//! Track and clip model consumed by the spectrogram subsystem.
//!
//! The surrounding editor owns these values; spectrogram code only reads sample
//! data, positions and per-track display preferences.

use crate::spectrogram::{ColorMapValue, SpectrogramConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type ClipId = String;
pub type TrackId = String;
pub type ChunkId = String;

/// Decoded, de-interleaved linear PCM.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Builds a buffer from interleaved frames.
    pub fn from_interleaved(sample_rate: u32, channel_count: usize, samples: &[f32]) -> Self {
        let channel_count = channel_count.max(1);
        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Length in samples of the longest channel.
    pub fn len(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A placement of (part of) an audio buffer on the timeline.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub id: ClipId,
    pub buffer: Arc<AudioBuffer>,
    /// Timeline position of the clip's first sample
    pub start_sample: usize,
    /// Offset into `buffer` where the clip begins
    pub offset_samples: usize,
    pub duration_samples: usize,
}

impl AudioClip {
    /// Creates a clip spanning the whole buffer at timeline position zero.
    pub fn whole(id: impl Into<ClipId>, buffer: Arc<AudioBuffer>) -> Self {
        let duration_samples = buffer.len();
        Self {
            id: id.into(),
            buffer,
            start_sample: 0,
            offset_samples: 0,
            duration_samples,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.buffer.sample_rate
    }
}

/// How a track is drawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Waveform,
    Spectrogram,
    Both,
}

impl RenderMode {
    pub fn shows_spectrogram(self) -> bool {
        matches!(self, RenderMode::Spectrogram | RenderMode::Both)
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waveform => write!(f, "waveform"),
            Self::Spectrogram => write!(f, "spectrogram"),
            Self::Both => write!(f, "both"),
        }
    }
}

/// A track as stored by the editor, including its own display preferences.
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub id: TrackId,
    pub clips: Vec<AudioClip>,
    pub render_mode: Option<RenderMode>,
    pub spectrogram: Option<SpectrogramConfig>,
    pub color_map: Option<ColorMapValue>,
    pub mono: bool,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, clips: Vec<AudioClip>) -> Self {
        Self {
            id: id.into(),
            clips,
            ..Self::default()
        }
    }
}

/// Horizontal scroll state of the timeline, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_left: f64,
    pub visible_width: f64,
    /// Width of fixed track controls that overlay the visible area
    pub controls_width: f64,
}

impl Viewport {
    /// Visible timeline span `[start, end)` in pixels.
    pub fn timeline_span(&self) -> (f64, f64) {
        let width = (self.visible_width - self.controls_width).max(0.0);
        (self.scroll_left, self.scroll_left + width)
    }
}

/// Zoom level and output geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformScale {
    pub samples_per_pixel: f64,
    /// Rendering height in CSS pixels
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Default for WaveformScale {
    fn default() -> Self {
        Self {
            samples_per_pixel: 1000.0,
            height: 128,
            device_pixel_ratio: 1.0,
        }
    }
}

impl WaveformScale {
    /// Pixel span `[left, right)` of a clip on the timeline.
    pub fn clip_span(&self, clip: &AudioClip) -> (f64, f64) {
        let spp = self.samples_per_pixel.max(f64::MIN_POSITIVE);
        let left = clip.start_sample as f64 / spp;
        (left, left + clip.duration_samples as f64 / spp)
    }
}
