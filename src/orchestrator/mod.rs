//! Decides what to compute and what to repaint as tracks, settings and the
//! viewport change.
//!
//! A pass resolves every track's settings, compares their signatures with the
//! previous pass, and per clip either reuses the worker's cached frequency data
//! or runs a new FFT. Registered chunks are painted visible-first; the rest are
//! painted in idle batches, checking the pass generation between batches.

pub mod cancel;
pub mod overrides;
pub mod registry;
pub mod signature;

pub use cancel::{CancelHandle, Generation, PassGuard};
pub use overrides::{Overrides, ResolvedTrack};
pub use registry::{chunk_id, ChunkRegistry};
pub use signature::{SignatureChanges, SignatureMap, TrackSignatures};

use crate::render::schedule::group_by_channel;
use crate::render::{ChunkPlan, ChunkTarget, PixelSurface, RenderParams, IDLE_BATCH_SIZE};
use crate::spectrogram::{
    get_color_map, ColorLut, ColorMapValue, FrequencyScale, SpectrogramConfig, SpectrogramData,
};
use crate::timeline::{
    AudioBuffer, AudioClip, ChunkId, ClipId, RenderMode, Track, Viewport, WaveformScale,
};
use crate::worker::{CacheKey, ComputeJob, RenderJob, SampleRange, WorkerCoordinator};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where the worker runs once it is first needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerMode {
    #[default]
    Threaded,
    Inline,
}

/// Outcome of one [`Orchestrator::refresh`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub generation: u64,
    /// Clips that needed a full FFT pass
    pub clips_computed: usize,
    /// Clips repainted from cached data
    pub clips_rerendered: usize,
    pub chunks_painted: usize,
    pub failures: usize,
    /// Set when a newer pass superseded this one
    pub cancelled: bool,
}

struct CachedClip {
    compute_signature: String,
    key: CacheKey,
}

#[derive(Default)]
struct PaintedClip {
    signature: String,
    chunks: HashSet<ChunkId>,
}

pub struct Orchestrator {
    worker: Option<Arc<WorkerCoordinator>>,
    worker_mode: WorkerMode,
    tracks: Vec<Track>,
    viewport: Viewport,
    scale: WaveformScale,
    overrides: Overrides,
    signatures: SignatureMap,
    chunks: ChunkRegistry,
    cache: HashMap<ClipId, CachedClip>,
    painted: HashMap<ClipId, PaintedClip>,
    registered_audio: HashMap<ClipId, Arc<AudioBuffer>>,
    /// Surfaces registered before the worker existed
    pending_surfaces: Vec<(ChunkId, PixelSurface)>,
    generation: Generation,
    idle_batch_size: usize,
}

impl Orchestrator {
    pub fn new(config: SpectrogramConfig, color_map: ColorMapValue) -> Self {
        Self {
            worker: None,
            worker_mode: WorkerMode::default(),
            tracks: Vec::new(),
            viewport: Viewport::default(),
            scale: WaveformScale::default(),
            overrides: Overrides::new(config, color_map),
            signatures: SignatureMap::default(),
            chunks: ChunkRegistry::default(),
            cache: HashMap::new(),
            painted: HashMap::new(),
            registered_audio: HashMap::new(),
            pending_surfaces: Vec::new(),
            generation: Generation::new(),
            idle_batch_size: IDLE_BATCH_SIZE,
        }
    }

    pub fn with_worker_mode(mut self, mode: WorkerMode) -> Self {
        self.worker_mode = mode;
        self
    }

    pub fn with_idle_batch_size(mut self, batch_size: usize) -> Self {
        self.idle_batch_size = batch_size.max(1);
        self
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.overrides.retain_tracks(&tracks);
        self.tracks = tracks;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Changes zoom or output geometry. Every chunk is repainted on the next pass.
    pub fn set_scale(&mut self, scale: WaveformScale) {
        if scale != self.scale {
            self.scale = scale;
            self.painted.clear();
        }
    }

    pub fn set_global_config(&mut self, config: SpectrogramConfig, color_map: ColorMapValue) {
        self.overrides.set_global(config, color_map);
    }

    pub fn set_track_render_mode(&mut self, track: &str, mode: RenderMode) {
        self.overrides.set_render_mode(track, mode);
    }

    /// Applies a settings submission to one track.
    pub fn set_track_config(
        &mut self,
        track: &str,
        config: SpectrogramConfig,
        color_map: Option<ColorMapValue>,
    ) {
        self.overrides.set_config(track, config, color_map);
    }

    pub fn resolve(&self, track: &str) -> Option<ResolvedTrack> {
        self.tracks
            .iter()
            .find(|t| t.id == track)
            .map(|t| self.overrides.resolve(t))
    }

    /// Color table in effect for a track, or the global one for unknown tracks.
    pub fn color_map_for(&self, track: &str) -> ColorLut {
        match self.resolve(track) {
            Some(resolved) => get_color_map(&resolved.color_map),
            None => get_color_map(self.overrides.global_color_map()),
        }
    }

    /// Frequency scale in effect for a track, or the global one for unknown tracks.
    pub fn frequency_scale_for(&self, track: &str) -> FrequencyScale {
        self.resolve(track)
            .map(|resolved| resolved.config.frequency_scale)
            .unwrap_or(self.overrides.global_config().frequency_scale)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.generation.cancel_handle()
    }

    pub fn is_worker_running(&self) -> bool {
        self.worker.is_some()
    }

    /// FFT passes the worker has run so far.
    pub fn compute_passes(&self) -> usize {
        self.worker.as_ref().map_or(0, |worker| worker.compute_passes())
    }

    /// Registers drawing surfaces for chunks of one clip channel.
    ///
    /// Surfaces move to the worker; if it does not exist yet they are queued
    /// until it is created.
    ///
    /// # Errors
    /// - If the worker rejects a surface
    pub async fn register_chunks(
        &mut self,
        clip: &str,
        channel: usize,
        chunks: Vec<(ChunkTarget, PixelSurface)>,
    ) -> Result<()> {
        for (target, surface) in chunks {
            let id = target.id.clone();
            self.chunks.register(clip, channel, target);
            if let Some(painted) = self.painted.get_mut(clip) {
                painted.chunks.remove(&id);
            }
            match self.worker.clone() {
                Some(worker) => worker.register_surface(id, surface).await?,
                None => {
                    self.pending_surfaces.retain(|(pending, _)| pending != &id);
                    self.pending_surfaces.push((id, surface));
                }
            }
        }
        Ok(())
    }

    /// Unregisters chunks and hands their surfaces back.
    ///
    /// # Errors
    /// - If the worker fails to release a surface
    pub async fn unregister_chunks(
        &mut self,
        clip: &str,
        ids: &[ChunkId],
    ) -> Result<Vec<PixelSurface>> {
        self.chunks.unregister(clip, ids);
        if let Some(painted) = self.painted.get_mut(clip) {
            for id in ids {
                painted.chunks.remove(id);
            }
        }

        let mut surfaces = Vec::new();
        match self.worker.clone() {
            Some(worker) => {
                for id in ids {
                    if let Some(surface) = worker.unregister_surface(id.clone()).await? {
                        surfaces.push(surface);
                    }
                }
            }
            None => {
                let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_surfaces)
                    .into_iter()
                    .partition(|(id, _)| ids.contains(id));
                self.pending_surfaces = kept;
                surfaces.extend(taken.into_iter().map(|(_, surface)| surface));
            }
        }
        Ok(surfaces)
    }

    /// Cached per-channel frequency data for a clip, if its full compute finished.
    ///
    /// # Errors
    /// - If the worker request fails
    pub async fn spectrogram_data(&self, clip: &str) -> Result<Option<Arc<[SpectrogramData]>>> {
        let (Some(worker), Some(cached)) = (&self.worker, self.cache.get(clip)) else {
            return Ok(None);
        };
        worker.fetch(cached.key.clone()).await
    }

    /// Runs one pass over every track, superseding any pass still in flight.
    ///
    /// Per-clip failures are logged and counted; they never abort the pass.
    pub async fn refresh(&mut self) -> PassReport {
        let guard = self.generation.begin();
        let mut report = PassReport {
            generation: guard.generation(),
            ..PassReport::default()
        };

        let mut next = SignatureMap::default();
        let mut work: Vec<(ResolvedTrack, Vec<AudioClip>)> = Vec::new();
        for track in &self.tracks {
            let resolved = self.overrides.resolve(track);
            match TrackSignatures::of(&resolved) {
                Ok(signatures) => next.insert(track.id.clone(), signatures),
                Err(e) => {
                    tracing::error!("Skipping track {}: {e:#}", track.id);
                    report.failures += 1;
                    continue;
                }
            }
            if resolved.mode.shows_spectrogram() {
                work.push((resolved, track.clips.clone()));
            }
        }

        let changes = self.signatures.diff(&next);
        if !changes.is_empty() {
            tracing::debug!(
                "Pass {}: {} track(s) changed settings, {} need new frequency data",
                report.generation,
                changes.config_changed.len(),
                changes.compute_changed.len()
            );
        }
        self.apply_changes(&changes);
        self.signatures = next;

        if let Some(worker) = self.worker.clone() {
            self.release_removed_clips(&worker).await;
        }

        if work.is_empty() {
            return report;
        }

        let worker = match self.ensure_worker().await {
            Ok(worker) => worker,
            Err(e) => {
                tracing::error!("Spectrogram worker unavailable: {e:#}");
                report.failures += 1;
                return report;
            }
        };

        'tracks: for (track, clips) in &work {
            for clip in clips {
                if !guard.is_current() {
                    report.cancelled = true;
                    break 'tracks;
                }
                match self
                    .process_clip(&worker, &guard, track, clip, &mut report)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        report.cancelled = true;
                        break 'tracks;
                    }
                    Err(e) => {
                        tracing::error!("Spectrogram for clip {} failed: {e:#}", clip.id);
                        report.failures += 1;
                    }
                }
            }
        }

        if report.cancelled {
            tracing::debug!("Pass {} superseded", report.generation);
        } else {
            tracing::debug!(
                "Pass {} done: {} computed, {} repainted from cache, {} chunk(s) painted, {} failure(s)",
                report.generation,
                report.clips_computed,
                report.clips_rerendered,
                report.chunks_painted,
                report.failures
            );
        }
        report
    }

    /// Cancels any running pass, stops the worker and forgets worker-side state.
    pub fn shutdown(&mut self) {
        self.generation.cancel_handle().cancel();
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        self.registered_audio.clear();
        self.cache.clear();
        self.painted.clear();
        self.pending_surfaces.clear();
    }

    fn apply_changes(&mut self, changes: &SignatureChanges) {
        for track in &self.tracks {
            let config_changed = changes.config_changed.contains(&track.id);
            let compute_changed = changes.compute_changed.contains(&track.id);
            for clip in &track.clips {
                if config_changed {
                    self.painted.remove(&clip.id);
                }
                if compute_changed {
                    self.cache.remove(&clip.id);
                }
            }
        }
    }

    /// Unregisters audio of clips that left the track list.
    async fn release_removed_clips(&mut self, worker: &WorkerCoordinator) {
        let removed: Vec<ClipId> = {
            let live: HashSet<&str> = self
                .tracks
                .iter()
                .flat_map(|track| track.clips.iter().map(|clip| clip.id.as_str()))
                .collect();
            self.registered_audio
                .keys()
                .filter(|clip| !live.contains(clip.as_str()))
                .cloned()
                .collect()
        };

        for clip in removed {
            self.registered_audio.remove(&clip);
            self.cache.remove(&clip);
            self.painted.remove(&clip);
            if let Err(e) = worker.unregister_audio(clip.clone()).await {
                tracing::warn!("Failed to unregister audio for clip {}: {e:#}", clip);
            }
        }
    }

    async fn ensure_worker(&mut self) -> Result<Arc<WorkerCoordinator>> {
        if let Some(worker) = &self.worker {
            return Ok(Arc::clone(worker));
        }

        let worker = Arc::new(match self.worker_mode {
            WorkerMode::Threaded => WorkerCoordinator::spawn(),
            WorkerMode::Inline => WorkerCoordinator::inline(),
        });
        self.adopt_worker(worker).await
    }

    /// Hands queued surfaces to a new worker and keeps it. On failure the
    /// worker is dropped and the surfaces not yet sent stay queued.
    async fn adopt_worker(
        &mut self,
        worker: Arc<WorkerCoordinator>,
    ) -> Result<Arc<WorkerCoordinator>> {
        let mut queued = std::mem::take(&mut self.pending_surfaces).into_iter();
        while let Some((chunk, surface)) = queued.next() {
            if let Err(e) = worker.register_surface(chunk, surface).await {
                self.pending_surfaces.extend(queued);
                return Err(e);
            }
        }
        self.worker = Some(Arc::clone(&worker));
        Ok(worker)
    }

    async fn ensure_audio(&mut self, worker: &WorkerCoordinator, clip: &AudioClip) -> Result<()> {
        match self.registered_audio.get(&clip.id) {
            Some(buffer) if Arc::ptr_eq(buffer, &clip.buffer) => return Ok(()),
            Some(_) => {
                self.cache.remove(&clip.id);
                self.painted.remove(&clip.id);
            }
            None => {}
        }
        worker
            .register_audio(clip.id.clone(), Arc::clone(&clip.buffer))
            .await?;
        self.registered_audio
            .insert(clip.id.clone(), Arc::clone(&clip.buffer));
        Ok(())
    }

    /// Computes (if needed) and paints one clip. Returns `false` if superseded.
    async fn process_clip(
        &mut self,
        worker: &WorkerCoordinator,
        guard: &PassGuard,
        track: &ResolvedTrack,
        clip: &AudioClip,
        report: &mut PassReport,
    ) -> Result<bool> {
        let signatures = TrackSignatures::of(track)?;
        self.ensure_audio(worker, clip).await?;

        let params = self.render_params(track, clip);
        let visible = self.visible_span(clip);

        let cached = self
            .cache
            .get(&clip.id)
            .filter(|cached| cached.compute_signature == signatures.compute)
            .map(|cached| cached.key.clone());
        let from_cache = cached.is_some();

        let key = match cached {
            Some(key) => key,
            None => {
                self.painted.remove(&clip.id);
                let job = ComputeJob {
                    clip: clip.id.clone(),
                    config: track.config.clone(),
                    range: SampleRange::new(clip.offset_samples, clip.duration_samples),
                    mono: track.mono,
                };

                // Visible pixels first, from a padded partial compute
                if let Some(range) = self.visible_range(clip, &track.config) {
                    let partial_key = worker
                        .compute_cached(ComputeJob {
                            range,
                            ..job.clone()
                        })
                        .await?;
                    if !guard.is_current() {
                        return Ok(false);
                    }
                    let plan = ChunkPlan::new(self.chunks.chunks(&clip.id).to_vec(), visible);
                    report.chunks_painted +=
                        render_targets(worker, &partial_key, &params, &plan.visible).await?;
                    tracing::debug!(
                        "Painted {} visible chunk(s) of clip {} from samples {}..{}",
                        plan.visible.len(),
                        clip.id,
                        range.start,
                        range.end()
                    );
                    if !guard.is_current() {
                        return Ok(false);
                    }
                }

                let key = worker.compute_cached(job).await?;
                report.clips_computed += 1;
                if !guard.is_current() {
                    return Ok(false);
                }
                worker
                    .release_cache(clip.id.clone(), vec![key.clone()])
                    .await?;
                self.cache.insert(
                    clip.id.clone(),
                    CachedClip {
                        compute_signature: signatures.compute.clone(),
                        key: key.clone(),
                    },
                );
                key
            }
        };

        let painted = self.painted.entry(clip.id.clone()).or_default();
        if painted.signature != signatures.config {
            painted.signature = signatures.config;
            painted.chunks.clear();
        }
        let pending: Vec<(usize, ChunkTarget)> = self
            .chunks
            .chunks(&clip.id)
            .iter()
            .filter(|(_, chunk)| !painted.chunks.contains(&chunk.id))
            .cloned()
            .collect();
        if pending.is_empty() {
            return Ok(true);
        }
        if from_cache {
            report.clips_rerendered += 1;
        }

        let plan = ChunkPlan::new(pending, visible);
        report.chunks_painted += self
            .paint(worker, &clip.id, &key, &params, &plan.visible)
            .await?;

        for batch in plan.batches(self.idle_batch_size) {
            tokio::task::yield_now().await;
            if !guard.is_current() {
                return Ok(false);
            }
            report.chunks_painted += self.paint(worker, &clip.id, &key, &params, batch).await?;
        }
        Ok(true)
    }

    /// Renders chunks from the full-clip data and records them as painted.
    async fn paint(
        &mut self,
        worker: &WorkerCoordinator,
        clip: &str,
        key: &CacheKey,
        params: &RenderParams,
        chunks: &[(usize, ChunkTarget)],
    ) -> Result<usize> {
        let painted = render_targets(worker, key, params, chunks).await?;
        self.painted
            .entry(clip.to_string())
            .or_default()
            .chunks
            .extend(chunks.iter().map(|(_, chunk)| chunk.id.clone()));
        Ok(painted)
    }

    fn render_params(&self, track: &ResolvedTrack, clip: &AudioClip) -> RenderParams {
        RenderParams {
            color_lut: get_color_map(&track.color_map),
            display: track.config.display_params(clip.sample_rate()),
            samples_per_pixel: self.scale.samples_per_pixel,
            css_height: self.scale.height,
            device_pixel_ratio: self.scale.device_pixel_ratio,
            timeline_origin: clip.offset_samples,
        }
    }

    /// On-screen part of a clip in clip-local pixels.
    fn visible_span(&self, clip: &AudioClip) -> Option<(f64, f64)> {
        let (view_start, view_end) = self.viewport.timeline_span();
        let (left, right) = self.scale.clip_span(clip);
        let start = view_start.max(left);
        let end = view_end.min(right);
        (end > start).then_some((start - left, end - left))
    }

    /// Padded buffer range behind the visible pixels, when only part of the
    /// clip is on screen and it has chunks to paint.
    fn visible_range(&self, clip: &AudioClip, config: &SpectrogramConfig) -> Option<SampleRange> {
        let (start, end) = self.visible_span(clip)?;
        let spp = self.scale.samples_per_pixel;
        let clip_width = clip.duration_samples as f64 / spp;
        if (start <= 0.0 && end >= clip_width) || !self.chunks.has_chunks(&clip.id) {
            return None;
        }

        let pad = config.window_size();
        let first = ((start * spp).floor() as usize).saturating_sub(pad);
        let last = ((end * spp).ceil() as usize + pad).min(clip.duration_samples);
        (last > first).then(|| SampleRange::new(clip.offset_samples + first, last - first))
    }
}

async fn render_targets(
    worker: &WorkerCoordinator,
    key: &CacheKey,
    params: &RenderParams,
    chunks: &[(usize, ChunkTarget)],
) -> Result<usize> {
    let mut painted = 0;
    for (channel, targets) in group_by_channel(chunks) {
        painted += worker
            .render_chunks(RenderJob {
                key: key.clone(),
                channel,
                params: params.clone(),
                chunks: targets,
            })
            .await?;
    }
    Ok(painted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::frame_count;

    const SAMPLE_RATE: u32 = 8000;

    fn buffer(channels: usize, len: usize) -> Arc<AudioBuffer> {
        let channel = |c: usize| {
            (0..len)
                .map(|i| (i as f32 * 0.05 * (c + 1) as f32).sin())
                .collect::<Vec<f32>>()
        };
        Arc::new(AudioBuffer::new(SAMPLE_RATE, (0..channels).map(channel).collect()))
    }

    fn config() -> SpectrogramConfig {
        SpectrogramConfig {
            fft_size: 256,
            zero_padding_factor: 1,
            ..SpectrogramConfig::default()
        }
    }

    fn spectrogram_track(id: &str, clips: Vec<AudioClip>) -> Track {
        Track {
            render_mode: Some(RenderMode::Spectrogram),
            ..Track::new(id, clips)
        }
    }

    fn orchestrator() -> Orchestrator {
        let mut orchestrator = Orchestrator::new(config(), ColorMapValue::default())
            .with_worker_mode(WorkerMode::Inline);
        orchestrator.set_scale(WaveformScale {
            samples_per_pixel: 100.0,
            height: 16,
            device_pixel_ratio: 1.0,
        });
        orchestrator
    }

    /// Registers `width`-pixel chunks covering the clip on every listed channel.
    async fn register(
        orchestrator: &mut Orchestrator,
        clip: &AudioClip,
        channels: &[usize],
        width: u32,
    ) -> Vec<ChunkId> {
        let clip_width = (clip.duration_samples as f64 / 100.0).ceil() as u32;
        let count = clip_width.div_ceil(width);
        let mut ids = Vec::new();
        for &channel in channels {
            let chunks: Vec<_> = (0..count)
                .map(|i| {
                    let id = chunk_id(&clip.id, channel, i as usize);
                    ids.push(id.clone());
                    (ChunkTarget::new(id, width, i * width), PixelSurface::default())
                })
                .collect();
            orchestrator.register_chunks(&clip.id, channel, chunks).await.unwrap();
        }
        ids
    }

    #[tokio::test]
    async fn test_unchanged_config_reuses_cache() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("a", buffer(1, 8000));
        register(&mut orchestrator, &clip, &[0], 20).await;
        orchestrator.set_tracks(vec![spectrogram_track("t", vec![clip])]);

        let first = orchestrator.refresh().await;
        assert_eq!(first.clips_computed, 1);
        assert_eq!(first.chunks_painted, 4);
        assert_eq!(orchestrator.compute_passes(), 1);

        let second = orchestrator.refresh().await;
        assert_eq!(second.clips_computed, 0);
        assert_eq!(second.chunks_painted, 0);
        assert_eq!(orchestrator.compute_passes(), 1);
        assert!(second.generation > first.generation);
    }

    #[tokio::test]
    async fn test_display_change_repaints_without_fft() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("a", buffer(1, 8000));
        register(&mut orchestrator, &clip, &[0], 20).await;
        orchestrator.set_tracks(vec![spectrogram_track("t", vec![clip])]);
        orchestrator.refresh().await;

        orchestrator.set_track_config(
            "t",
            SpectrogramConfig {
                frequency_scale: FrequencyScale::Mel,
                gain_db: 0.0,
                ..config()
            },
            Some(ColorMapValue::from("magma")),
        );
        let report = orchestrator.refresh().await;
        assert_eq!(report.clips_computed, 0);
        assert_eq!(report.clips_rerendered, 1);
        assert_eq!(report.chunks_painted, 4);
        assert_eq!(orchestrator.compute_passes(), 1);
        assert_eq!(orchestrator.frequency_scale_for("t"), FrequencyScale::Mel);
        assert_eq!(
            orchestrator.color_map_for("t"),
            get_color_map(&ColorMapValue::from("magma"))
        );

        // A compute-affecting change does run a new FFT
        orchestrator.set_track_config(
            "t",
            SpectrogramConfig {
                zero_padding_factor: 2,
                ..config()
            },
            None,
        );
        let report = orchestrator.refresh().await;
        assert_eq!(report.clips_computed, 1);
        assert_eq!(orchestrator.compute_passes(), 2);
    }

    #[tokio::test]
    async fn test_render_mode_switch_computes_only_that_track() {
        let mut orchestrator = orchestrator();
        let a1 = AudioClip::whole("a1", buffer(1, 4000));
        let a2 = AudioClip::whole("a2", buffer(1, 4000));
        let b1 = AudioClip::whole("b1", buffer(2, 4000));
        orchestrator.set_tracks(vec![
            spectrogram_track("a", vec![a1, a2]),
            Track::new("b", vec![b1]),
        ]);

        orchestrator.refresh().await;
        assert_eq!(orchestrator.compute_passes(), 2);

        orchestrator.set_track_render_mode("b", RenderMode::Spectrogram);
        let report = orchestrator.refresh().await;
        assert_eq!(report.clips_computed, 1);
        assert_eq!(orchestrator.compute_passes(), 3);

        // Hiding and showing again keeps the cached data
        orchestrator.set_track_render_mode("a", RenderMode::Waveform);
        orchestrator.refresh().await;
        orchestrator.set_track_render_mode("a", RenderMode::Both);
        let report = orchestrator.refresh().await;
        assert_eq!(report.clips_computed, 0);
        assert_eq!(orchestrator.compute_passes(), 3);
    }

    #[tokio::test]
    async fn test_scrolling_never_recomputes() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("long", buffer(1, 80_000));
        register(&mut orchestrator, &clip, &[0], 100).await;
        orchestrator.set_tracks(vec![spectrogram_track("t", vec![clip.clone()])]);
        orchestrator.set_viewport(Viewport {
            scroll_left: 0.0,
            visible_width: 200.0,
            controls_width: 0.0,
        });

        // Partial visible compute, then the full clip
        let first = orchestrator.refresh().await;
        assert_eq!(orchestrator.compute_passes(), 2);
        assert_eq!(first.clips_computed, 1);
        assert_eq!(first.chunks_painted, 2 + 8);

        let data = orchestrator.spectrogram_data("long").await.unwrap().unwrap();
        assert_eq!(data[0].frame_count, frame_count(80_000, 256, 64));
        assert_eq!(data[0].start_sample, 0);

        orchestrator.set_viewport(Viewport {
            scroll_left: 500.0,
            visible_width: 200.0,
            controls_width: 0.0,
        });
        let scrolled = orchestrator.refresh().await;
        assert_eq!(scrolled.chunks_painted, 0);
        assert_eq!(orchestrator.compute_passes(), 2);

        // A newly mounted chunk is painted from the cache
        orchestrator
            .register_chunks(
                "long",
                0,
                vec![(ChunkTarget::new("long:extra", 50, 550), PixelSurface::default())],
            )
            .await
            .unwrap();
        let mounted = orchestrator.refresh().await;
        assert_eq!(mounted.chunks_painted, 1);
        assert_eq!(orchestrator.compute_passes(), 2);
    }

    #[tokio::test]
    async fn test_failed_clip_does_not_abort_pass() {
        let mut orchestrator = orchestrator();
        let empty = Arc::new(AudioBuffer::new(SAMPLE_RATE, Vec::new()));
        let broken = AudioClip::whole("broken", empty);
        let good = AudioClip::whole("good", buffer(1, 8000));
        orchestrator
            .register_chunks(
                "broken",
                0,
                vec![(ChunkTarget::new("broken:0:0", 20, 0), PixelSurface::default())],
            )
            .await
            .unwrap();
        register(&mut orchestrator, &good, &[0], 20).await;
        orchestrator.set_tracks(vec![spectrogram_track("t", vec![broken, good])]);

        let report = orchestrator.refresh().await;
        assert_eq!(report.failures, 1);
        assert_eq!(report.chunks_painted, 4);
        assert!(orchestrator.spectrogram_data("good").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_pass_stops_between_batches() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("a", buffer(1, 8000));
        register(&mut orchestrator, &clip, &[0], 10).await;
        orchestrator.set_tracks(vec![spectrogram_track("t", vec![clip])]);

        let handle = orchestrator.cancel_handle();
        let (report, ()) = tokio::join!(orchestrator.refresh(), async { handle.cancel() });
        assert!(report.cancelled);
        assert_eq!(report.clips_computed, 1);
        assert_eq!(report.chunks_painted, 0);

        // The next pass finishes the work from the cache
        let report = orchestrator.refresh().await;
        assert!(!report.cancelled);
        assert_eq!(report.chunks_painted, 8);
        assert_eq!(orchestrator.compute_passes(), 1);
    }

    #[tokio::test]
    async fn test_mono_serves_every_channel_and_surfaces_return_painted() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("stereo", buffer(2, 8000));
        let ids = register(&mut orchestrator, &clip, &[0, 1], 40).await;
        orchestrator.set_tracks(vec![Track {
            mono: true,
            ..spectrogram_track("t", vec![clip])
        }]);

        let report = orchestrator.refresh().await;
        assert_eq!(report.chunks_painted, 4);
        let data = orchestrator.spectrogram_data("stereo").await.unwrap().unwrap();
        assert_eq!(data.len(), 1);

        let surfaces = orchestrator.unregister_chunks("stereo", &ids).await.unwrap();
        assert_eq!(surfaces.len(), 4);
        for surface in &surfaces {
            assert_eq!((surface.width(), surface.height()), (40, 16));
            assert_eq!(surface.pixel(0, 0).map(|p| p[3]), Some(255));
        }
    }

    #[tokio::test]
    async fn test_removed_clips_release_cache() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("a", buffer(1, 4000));
        orchestrator.set_tracks(vec![spectrogram_track("t", vec![clip])]);
        orchestrator.refresh().await;
        assert!(orchestrator.spectrogram_data("a").await.unwrap().is_some());

        orchestrator.set_tracks(Vec::new());
        orchestrator.refresh().await;
        assert!(orchestrator.spectrogram_data("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replaced_buffer_recomputes() {
        let mut orchestrator = orchestrator();
        orchestrator.set_tracks(vec![spectrogram_track(
            "t",
            vec![AudioClip::whole("a", buffer(1, 4000))],
        )]);
        orchestrator.refresh().await;
        orchestrator.set_tracks(vec![spectrogram_track(
            "t",
            vec![AudioClip::whole("a", buffer(1, 4000))],
        )]);
        let report = orchestrator.refresh().await;
        assert_eq!(report.clips_computed, 1);
        assert_eq!(orchestrator.compute_passes(), 2);
    }

    #[tokio::test]
    async fn test_threaded_worker_is_lazy_and_shuts_down() {
        let mut orchestrator = Orchestrator::new(config(), ColorMapValue::default());
        let clip = AudioClip::whole("a", buffer(1, 8000));
        orchestrator.set_tracks(vec![Track::new("t", vec![clip])]);

        // Waveform-only tracks never start the worker
        orchestrator.refresh().await;
        assert!(!orchestrator.is_worker_running());

        orchestrator.set_track_render_mode("t", RenderMode::Spectrogram);
        let report = orchestrator.refresh().await;
        assert_eq!(report.clips_computed, 1);
        assert!(orchestrator.is_worker_running());

        orchestrator.shutdown();
        assert!(!orchestrator.is_worker_running());
        assert_eq!(orchestrator.compute_passes(), 0);
    }

    #[tokio::test]
    async fn test_failed_worker_keeps_queued_surfaces() {
        let mut orchestrator = orchestrator();
        let clip = AudioClip::whole("a", buffer(1, 8000));
        let ids = register(&mut orchestrator, &clip, &[0], 20).await;
        assert_eq!(orchestrator.pending_surfaces.len(), 4);

        let dead = Arc::new(WorkerCoordinator::inline());
        dead.terminate();
        assert!(orchestrator.adopt_worker(dead).await.is_err());
        assert!(!orchestrator.is_worker_running());
        // The first surface went to the dead worker; the rest are still queued
        assert_eq!(orchestrator.pending_surfaces.len(), 3);

        orchestrator.set_tracks(vec![spectrogram_track("t", vec![clip])]);
        let report = orchestrator.refresh().await;
        assert_eq!(report.chunks_painted, 3);
        let surfaces = orchestrator.unregister_chunks("a", &ids).await.unwrap();
        assert_eq!(surfaces.len(), 3);
    }
}
