//! Paints computed frequency data into fixed-width drawing surface chunks.
//!
//! Each chunk covers `css_width` CSS pixels starting at a global pixel offset
//! within its clip. Pixels are produced at CSS resolution and stretched onto the
//! physical surface without smoothing.

use super::surface::{ImageData, PixelSurface};
use crate::spectrogram::{normalize_db, ColorLut, DisplayParams, FrequencyScale, SpectrogramData};
use crate::timeline::ChunkId;

/// A chunk to paint and where it sits within its clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkTarget {
    pub id: ChunkId,
    pub css_width: u32,
    /// Horizontal offset of the chunk's first column, in clip-local CSS pixels
    pub global_offset: u32,
}

impl ChunkTarget {
    pub fn new(id: impl Into<ChunkId>, css_width: u32, global_offset: u32) -> Self {
        Self {
            id: id.into(),
            css_width,
            global_offset,
        }
    }

    /// Whether the chunk overlaps the clip-local pixel span `[start, end)`.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        let left = self.global_offset as f64;
        let right = left + self.css_width as f64;
        left < end && right > start
    }
}

/// Everything besides the frequency data needed to paint a chunk.
#[derive(Debug, Clone)]
pub struct RenderParams {
    pub color_lut: ColorLut,
    pub display: DisplayParams,
    pub samples_per_pixel: f64,
    pub css_height: u32,
    pub device_pixel_ratio: f32,
    /// Buffer sample shown at clip-local pixel 0
    pub timeline_origin: usize,
}

/// Physical pixel size for a CSS size at the given device pixel ratio.
pub fn physical_size(css_width: u32, css_height: u32, device_pixel_ratio: f32) -> (u32, u32) {
    let ratio = if device_pixel_ratio > 0.0 { device_pixel_ratio } else { 1.0 };
    let scale = |css: u32| {
        if css == 0 {
            0
        } else {
            ((css as f32 * ratio).round() as u32).max(1)
        }
    };
    (scale(css_width), scale(css_height))
}

/// Source frequency bin for every output row, top row first.
///
/// Linear scales map proportionally; other scales invert the scale function by
/// binary search over bins, since bin position is monotonic in frequency.
pub fn row_bins(data: &SpectrogramData, display: &DisplayParams, height: u32) -> Vec<usize> {
    let bins = data.frequency_bin_count;
    if bins == 0 || height == 0 {
        return Vec::new();
    }
    let last_bin = bins - 1;
    let (min_hz, max_hz) = (display.min_frequency, display.max_frequency);

    (0..height)
        .map(|y| {
            let target = 1.0 - y as f32 / height as f32;
            match display.frequency_scale {
                FrequencyScale::Linear => {
                    let hz = min_hz + target * (max_hz - min_hz);
                    ((hz / data.bin_width()).floor().max(0.0) as usize).min(last_bin)
                }
                scale => {
                    let position =
                        |bin: usize| scale.position(data.bin_frequency(bin), min_hz, max_hz);
                    let (mut low, mut high) = (0usize, bins);
                    while low < high {
                        let mid = low + (high - low) / 2;
                        if position(mid) < target {
                            low = mid + 1;
                        } else {
                            high = mid;
                        }
                    }
                    low.min(last_bin)
                }
            }
        })
        .collect()
}

/// Source frame for clip-local pixel column `global_x`, if it lies inside the data.
pub fn column_frame(data: &SpectrogramData, params: &RenderParams, global_x: u32) -> Option<usize> {
    let sample = params.timeline_origin as f64 + global_x as f64 * params.samples_per_pixel;
    let relative = sample - data.start_sample as f64;
    if relative < 0.0 || data.hop_size == 0 {
        return None;
    }
    let frame = (relative / data.hop_size as f64).floor() as usize;
    (frame < data.frame_count).then_some(frame)
}

/// Renders one chunk at CSS resolution.
///
/// Columns outside the data's frame range stay transparent.
pub fn render_image(
    data: &SpectrogramData,
    target: &ChunkTarget,
    params: &RenderParams,
) -> ImageData {
    let height = params.css_height;
    let mut image = ImageData::new(target.css_width, height);
    let rows = row_bins(data, &params.display, height);
    let lut = &params.color_lut;
    let display = &params.display;

    for x in 0..target.css_width {
        let Some(frame) = column_frame(data, params, target.global_offset + x) else {
            continue;
        };
        let row = data.frame(frame);
        for (y, &bin) in rows.iter().enumerate() {
            let level = normalize_db(row[bin], display.gain_db, display.range_db);
            let index = ((level * 255.0).floor() as usize).min(255) * 3;
            image.put_pixel(x, y as u32, [lut[index], lut[index + 1], lut[index + 2], 255]);
        }
    }

    image
}

/// Renders one chunk and paints it onto `surface` at physical resolution.
pub fn render_chunk(
    data: &SpectrogramData,
    target: &ChunkTarget,
    params: &RenderParams,
    surface: &mut PixelSurface,
) {
    let (width, height) = physical_size(
        target.css_width,
        params.css_height,
        params.device_pixel_ratio,
    );
    surface.set_size(width, height);
    let image = render_image(data, target, params);
    surface.draw_scaled(&image);
}
