//! Renders a WAV file to a PNG through the full orchestration pipeline.
//!
//! The file becomes a single clip on a spectrogram track. Chunks are laid out
//! across the clip for every channel, painted by the worker, then handed back
//! and stitched into one image with channels stacked top to bottom.

use super::audio::read_wav;
use crate::config::AppConfig;
use crate::orchestrator::{chunk_id, Orchestrator};
use crate::render::{frequency_ticks, physical_size, ChunkTarget, PixelSurface};
use crate::spectrogram::{ColorMapValue, FrequencyScale, WindowFunction};
use crate::timeline::{AudioBuffer, AudioClip, ChunkId, RenderMode, Track, Viewport};
use anyhow::{anyhow, bail, Context, Result};
use image::{imageops, Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;

const TICK_LENGTH: u32 = 6;
const TICK_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub fft_size: Option<usize>,
    pub zero_padding: Option<usize>,
    pub window: Option<String>,
    pub scale: Option<String>,
    pub color_map: Option<String>,
    pub mono: bool,
    pub width_px: Option<u32>,
    pub height: Option<u32>,
    pub labels: bool,
}

impl RenderOptions {
    fn apply(&self, settings: &mut AppConfig, sample_count: usize) {
        let spectrogram = &mut settings.spectrogram;
        if let Some(fft_size) = self.fft_size {
            spectrogram.fft_size = fft_size;
        }
        if let Some(factor) = self.zero_padding {
            spectrogram.zero_padding_factor = factor;
        }
        if let Some(window) = &self.window {
            spectrogram.window = WindowFunction::from_name(window);
        }
        if let Some(scale) = &self.scale {
            spectrogram.frequency_scale = FrequencyScale::from_name(scale);
        }
        if self.labels {
            spectrogram.labels = true;
        }
        if let Some(color_map) = &self.color_map {
            settings.color_map = ColorMapValue::from(color_map.as_str());
        }
        if let Some(height) = self.height {
            settings.render.height = height.max(1);
        }
        if let Some(width) = self.width_px.filter(|w| *w > 0) {
            settings.render.samples_per_pixel = (sample_count as f64 / width as f64).max(1e-3);
        }
    }
}

/// Handles `spectrowave render`.
///
/// # Errors
/// - If the config file is malformed
/// - If the WAV cannot be decoded
/// - If any clip fails to render
/// - If the PNG cannot be written
pub async fn handle_render(input: &Path, output: &Path, options: RenderOptions) -> Result<()> {
    let mut settings = AppConfig::load()?;
    let buffer = Arc::new(read_wav(input)?);
    options.apply(&mut settings, buffer.len());

    let image = render_buffer(buffer, &settings, options.mono).await?;
    image
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        "Wrote {}x{} spectrogram to {}",
        image.width(),
        image.height(),
        output.display()
    );
    println!(
        "Wrote {}x{} spectrogram to {}",
        image.width(),
        image.height(),
        output.display()
    );
    Ok(())
}

/// Runs one orchestration pass over `buffer` and stitches the painted chunks.
///
/// # Errors
/// - If the worker fails to compute or paint the clip
pub async fn render_buffer(
    buffer: Arc<AudioBuffer>,
    settings: &AppConfig,
    mono: bool,
) -> Result<RgbaImage> {
    let scale = settings.render.waveform_scale();
    let clip = AudioClip::whole("input", buffer);
    let channels = if mono {
        1
    } else {
        clip.buffer.channel_count().max(1)
    };
    let clip_width = (clip.duration_samples as f64 / scale.samples_per_pixel)
        .ceil()
        .max(1.0) as u32;
    let chunk_width = settings.render.chunk_width.max(1);

    let mut orchestrator =
        Orchestrator::new(settings.spectrogram.clone(), settings.color_map.clone())
            .with_idle_batch_size(settings.render.idle_batch_size);
    orchestrator.set_scale(scale);
    orchestrator.set_viewport(Viewport {
        scroll_left: 0.0,
        visible_width: clip_width as f64,
        controls_width: 0.0,
    });

    let mut layout: Vec<(usize, ChunkTarget)> = Vec::new();
    for channel in 0..channels {
        let chunks: Vec<(ChunkTarget, PixelSurface)> = (0..clip_width.div_ceil(chunk_width))
            .map(|index| {
                let offset = index * chunk_width;
                let target = ChunkTarget::new(
                    chunk_id(&clip.id, channel, index as usize),
                    chunk_width.min(clip_width - offset),
                    offset,
                );
                layout.push((channel, target.clone()));
                (target, PixelSurface::default())
            })
            .collect();
        orchestrator.register_chunks(&clip.id, channel, chunks).await?;
    }

    orchestrator.set_tracks(vec![Track {
        render_mode: Some(RenderMode::Spectrogram),
        mono,
        ..Track::new("main", vec![clip.clone()])
    }]);

    let report = orchestrator.refresh().await;
    if report.failures > 0 {
        orchestrator.shutdown();
        bail!("Spectrogram rendering failed; see logs for details");
    }
    tracing::debug!(
        "Painted {} chunk(s) across {} channel(s)",
        report.chunks_painted,
        channels
    );

    let ids: Vec<ChunkId> = layout.iter().map(|(_, target)| target.id.clone()).collect();
    let surfaces = orchestrator.unregister_chunks(&clip.id, &ids).await?;
    orchestrator.shutdown();
    if surfaces.len() != layout.len() {
        bail!(
            "Expected {} painted chunks, got {}",
            layout.len(),
            surfaces.len()
        );
    }

    let (_, row_height) = physical_size(clip_width, scale.height, scale.device_pixel_ratio);
    let total_width: u32 = layout
        .iter()
        .zip(&surfaces)
        .filter(|((channel, _), _)| *channel == 0)
        .map(|(_, surface)| surface.width())
        .sum();
    let mut image = RgbaImage::new(total_width, row_height * channels as u32);

    let mut cursor = vec![0u32; channels];
    for ((channel, _), surface) in layout.iter().zip(surfaces) {
        let (width, height) = (surface.width(), surface.height());
        let tile = RgbaImage::from_raw(width, height, surface.into_pixels())
            .ok_or_else(|| anyhow!("Painted chunk has an invalid pixel buffer"))?;
        imageops::replace(
            &mut image,
            &tile,
            cursor[*channel] as i64,
            (*channel as u32 * row_height) as i64,
        );
        cursor[*channel] += width;
    }

    if settings.spectrogram.labels {
        let display = settings.spectrogram.display_params(clip.sample_rate());
        let ratio = if scale.device_pixel_ratio > 0.0 {
            scale.device_pixel_ratio
        } else {
            1.0
        };
        for tick in frequency_ticks(&display, scale.height) {
            let row = ((tick.row as f32 * ratio).round() as u32).min(row_height.saturating_sub(1));
            for channel in 0..channels as u32 {
                for dx in 0..TICK_LENGTH.min(image.width()) {
                    image.put_pixel(dx, channel * row_height + row, TICK_COLOR);
                }
            }
            tracing::debug!("Tick {} at row {}", tick.label, row);
        }
    }

    Ok(image)
}
