//! Application command handlers for spectrowave.
//!
//! # Commands
//! - `render`: Render a WAV file to a PNG spectrogram
//! - `peak`: Print the dominant frequency of a WAV file
//! - `config`: Open configuration file in user's preferred editor
//! - `logs`: Display recent log entries

pub mod audio;
pub mod config;
pub mod logs;
pub mod peak;
pub mod render;

pub use config::handle_config;
pub use logs::handle_logs;
pub use peak::handle_peak;
pub use render::handle_render;
