//! Off-thread spectrogram computation and chunk painting.

pub mod coordinator;
pub mod protocol;
pub mod state;

pub use coordinator::WorkerCoordinator;
pub use protocol::{CacheKey, ComputeJob, RenderJob, SampleRange, WorkerReply, WorkerRequest};
