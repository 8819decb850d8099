//! Spectrogram analysis: windows, FFT, frequency scales, color maps and the STFT itself.

pub mod colormap;
pub mod compute;
pub mod config;
pub mod fft;
pub mod scale;
pub mod window;

pub use colormap::{get_color_map, named_color_map, ColorLut, ColorMapValue, ColorStop};
pub use compute::{
    compute_channels, compute_mono, compute_spectrogram, frame_count, SpectrogramData,
};
pub use config::{ComputeParams, DisplayParams, FrequencyScale, SpectrogramConfig, WindowFunction};
pub use fft::{normalize_db, FftEngine, DB_FLOOR};
pub use window::generate_window;
