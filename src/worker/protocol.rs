//! Messages exchanged with the spectrogram worker.

use crate::render::{ChunkTarget, PixelSurface, RenderParams};
use crate::spectrogram::{SpectrogramConfig, SpectrogramData};
use crate::timeline::{AudioBuffer, ChunkId, ClipId};
use std::sync::Arc;

/// Correlation id matching a reply to its request.
pub type RequestId = u64;

/// Key of a computed spectrogram retained by the worker.
pub type CacheKey = String;

/// A span of buffer samples `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRange {
    pub start: usize,
    pub len: usize,
}

impl SampleRange {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// What to compute for a registered clip.
#[derive(Debug, Clone)]
pub struct ComputeJob {
    pub clip: ClipId,
    pub config: SpectrogramConfig,
    pub range: SampleRange,
    /// Average all channels into a single spectrogram
    pub mono: bool,
}

impl ComputeJob {
    /// Deterministic key from clip, range, mixdown and the compute subset of the config.
    pub fn cache_key(&self) -> CacheKey {
        format!(
            "{}@{}+{}/{}/{}",
            self.clip,
            self.range.start,
            self.range.len,
            if self.mono { "mono" } else { "multi" },
            self.config.compute_params().fingerprint()
        )
    }
}

/// Paint request for chunks of one channel.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub key: CacheKey,
    pub channel: usize,
    pub params: RenderParams,
    pub chunks: Vec<ChunkTarget>,
}

pub enum WorkerRequest {
    RegisterAudio {
        clip: ClipId,
        buffer: Arc<AudioBuffer>,
    },
    UnregisterAudio {
        clip: ClipId,
    },
    RegisterSurface {
        chunk: ChunkId,
        surface: PixelSurface,
    },
    UnregisterSurface {
        chunk: ChunkId,
    },
    /// Compute and hand the data back without caching it.
    Compute(ComputeJob),
    /// Compute (or reuse) and keep the data worker-side, replying with its key.
    ComputeCached(ComputeJob),
    RenderChunks(RenderJob),
    FetchCached {
        key: CacheKey,
    },
    /// Drop cached entries of a clip except the listed keys.
    ReleaseCache {
        clip: ClipId,
        keep: Vec<CacheKey>,
    },
}

impl WorkerRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterAudio { .. } => "register-audio",
            Self::UnregisterAudio { .. } => "unregister-audio",
            Self::RegisterSurface { .. } => "register-surface",
            Self::UnregisterSurface { .. } => "unregister-surface",
            Self::Compute(_) => "compute",
            Self::ComputeCached(_) => "compute-cached",
            Self::RenderChunks(_) => "render-chunks",
            Self::FetchCached { .. } => "fetch-cached",
            Self::ReleaseCache { .. } => "release-cache",
        }
    }
}

#[derive(Debug)]
pub enum WorkerReply {
    Done,
    Key(CacheKey),
    Spectrograms(Arc<[SpectrogramData]>),
    Cached(Option<Arc<[SpectrogramData]>>),
    Surface(Option<PixelSurface>),
    /// Number of chunks painted
    Painted(usize),
}

/// A request tagged with its correlation id.
pub struct Envelope {
    pub id: RequestId,
    pub request: WorkerRequest,
}
