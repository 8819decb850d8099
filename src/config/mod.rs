//! Configuration management for spectrowave.
//!
//! Application settings are loaded from and saved to a TOML file in the user's
//! config directory. The `[spectrogram]` section and `color_map` key seed the
//! global defaults that tracks fall back to.

pub mod file;

pub use file::{get_config_path, AppConfig, RenderConfig};
