//! Chunked rendering of spectrogram data onto pixel surfaces.

pub mod axis;
pub mod chunks;
pub mod schedule;
pub mod surface;

pub use axis::{frequency_ticks, FrequencyTick};
pub use chunks::{physical_size, render_chunk, render_image, ChunkTarget, RenderParams};
pub use schedule::{ChunkPlan, IDLE_BATCH_SIZE};
pub use surface::{ImageData, PixelSurface};
