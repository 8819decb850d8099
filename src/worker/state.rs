//! State owned by the spectrogram worker: registered audio, registered
//! surfaces and computed spectrograms keyed by cache key.

use super::protocol::{CacheKey, ComputeJob, RenderJob, SampleRange, WorkerReply, WorkerRequest};
use crate::render::{render_chunk, PixelSurface};
use crate::spectrogram::{compute_channels, compute_mono, FftEngine, SpectrogramData};
use crate::timeline::{AudioBuffer, ChunkId, ClipId};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CacheEntry {
    clip: ClipId,
    spectrograms: Arc<[SpectrogramData]>,
}

pub struct WorkerState {
    audio: HashMap<ClipId, Arc<AudioBuffer>>,
    surfaces: HashMap<ChunkId, PixelSurface>,
    cache: HashMap<CacheKey, CacheEntry>,
    engine: FftEngine,
    /// Number of FFT passes run (cache misses and uncached computes)
    compute_passes: Arc<AtomicUsize>,
}

impl WorkerState {
    pub fn new(compute_passes: Arc<AtomicUsize>) -> Self {
        Self {
            audio: HashMap::new(),
            surfaces: HashMap::new(),
            cache: HashMap::new(),
            engine: FftEngine::new(),
            compute_passes,
        }
    }

    /// Executes one request.
    ///
    /// # Errors
    /// - If the request names a clip with no registered audio
    /// - If a render references an unknown cache key
    pub fn handle(&mut self, request: WorkerRequest) -> Result<WorkerReply> {
        match request {
            WorkerRequest::RegisterAudio { clip, buffer } => {
                let replaced = self
                    .audio
                    .insert(clip.clone(), Arc::clone(&buffer))
                    .is_some_and(|previous| !Arc::ptr_eq(&previous, &buffer));
                if replaced {
                    self.drop_clip_cache(&clip, &[]);
                }
                tracing::debug!(
                    "Registered audio for clip {}: {} channels, {} samples",
                    clip,
                    buffer.channel_count(),
                    buffer.len()
                );
                Ok(WorkerReply::Done)
            }
            WorkerRequest::UnregisterAudio { clip } => {
                self.audio.remove(&clip);
                self.drop_clip_cache(&clip, &[]);
                tracing::debug!("Unregistered audio for clip {}", clip);
                Ok(WorkerReply::Done)
            }
            WorkerRequest::RegisterSurface { chunk, surface } => {
                self.surfaces.insert(chunk, surface);
                Ok(WorkerReply::Done)
            }
            WorkerRequest::UnregisterSurface { chunk } => {
                Ok(WorkerReply::Surface(self.surfaces.remove(&chunk)))
            }
            WorkerRequest::Compute(job) => {
                let spectrograms = self.compute(&job)?;
                Ok(WorkerReply::Spectrograms(spectrograms))
            }
            WorkerRequest::ComputeCached(job) => {
                let key = job.cache_key();
                if self.cache.contains_key(&key) {
                    tracing::debug!("Cache hit for {}", key);
                } else {
                    let spectrograms = self.compute(&job)?;
                    self.cache.insert(
                        key.clone(),
                        CacheEntry {
                            clip: job.clip.clone(),
                            spectrograms,
                        },
                    );
                }
                Ok(WorkerReply::Key(key))
            }
            WorkerRequest::RenderChunks(job) => self.render(job).map(WorkerReply::Painted),
            WorkerRequest::FetchCached { key } => Ok(WorkerReply::Cached(
                self.cache
                    .get(&key)
                    .map(|entry| Arc::clone(&entry.spectrograms)),
            )),
            WorkerRequest::ReleaseCache { clip, keep } => {
                self.drop_clip_cache(&clip, &keep);
                Ok(WorkerReply::Done)
            }
        }
    }

    fn compute(&mut self, job: &ComputeJob) -> Result<Arc<[SpectrogramData]>> {
        let buffer = self
            .audio
            .get(&job.clip)
            .ok_or_else(|| anyhow!("No audio registered for clip {}", job.clip))?;

        let SampleRange { start, len } = job.range;
        let spectrograms = if job.mono {
            vec![compute_mono(
                &buffer.channels,
                buffer.sample_rate,
                &job.config,
                start,
                len,
                &mut self.engine,
            )]
        } else {
            compute_channels(
                &buffer.channels,
                buffer.sample_rate,
                &job.config,
                start,
                len,
                &mut self.engine,
            )
        };

        self.compute_passes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Computed {} spectrogram(s) for clip {} over samples {}..{} ({} frames each)",
            spectrograms.len(),
            job.clip,
            start,
            start + len,
            spectrograms.first().map_or(0, |data| data.frame_count)
        );
        Ok(spectrograms.into())
    }

    fn render(&mut self, job: RenderJob) -> Result<usize> {
        let entry = self
            .cache
            .get(&job.key)
            .ok_or_else(|| anyhow!("No cached spectrogram for key {}", job.key))?;
        // A mono mixdown serves every channel
        let data = match &entry.spectrograms[..] {
            [mono] => mono,
            channels => channels.get(job.channel).ok_or_else(|| {
                anyhow!(
                    "Cached spectrogram {} has {} channel(s), no channel {}",
                    job.key,
                    channels.len(),
                    job.channel
                )
            })?,
        };

        let mut painted = 0;
        for target in &job.chunks {
            match self.surfaces.get_mut(&target.id) {
                Some(surface) => {
                    render_chunk(data, target, &job.params, surface);
                    painted += 1;
                }
                None => tracing::debug!("Skipping unregistered chunk {}", target.id),
            }
        }
        Ok(painted)
    }

    fn drop_clip_cache(&mut self, clip: &str, keep: &[CacheKey]) {
        let before = self.cache.len();
        self.cache
            .retain(|key, entry| entry.clip != clip || keep.contains(key));
        let dropped = before - self.cache.len();
        if dropped > 0 {
            tracing::debug!("Released {} cached spectrogram(s) for clip {}", dropped, clip);
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}
