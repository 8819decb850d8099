//! Configuration file management for spectrowave.
//!
//! Settings are read from `~/.config/spectrowave/spectrowave.toml`. Every field
//! has a default, so a missing file or a partial file is fine.

use crate::spectrogram::{ColorMapValue, SpectrogramConfig};
use crate::timeline::WaveformScale;
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Output geometry and scheduling for painted chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width of one drawing-surface chunk in CSS pixels
    pub chunk_width: u32,
    /// Rendering height in CSS pixels
    pub height: u32,
    pub device_pixel_ratio: f32,
    /// Off-screen chunks painted between yields
    pub idle_batch_size: usize,
    /// Zoom level: audio samples per CSS pixel
    pub samples_per_pixel: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            chunk_width: 1000,
            height: 128,
            device_pixel_ratio: 1.0,
            idle_batch_size: crate::render::IDLE_BATCH_SIZE,
            samples_per_pixel: 1000.0,
        }
    }
}

impl RenderConfig {
    pub fn waveform_scale(&self) -> WaveformScale {
        WaveformScale {
            samples_per_pixel: self.samples_per_pixel,
            height: self.height,
            device_pixel_ratio: self.device_pixel_ratio,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Preset name or a list of `[r, g, b]` / `[r, g, b, a]` stops
    pub color_map: ColorMapValue,
    pub spectrogram: SpectrogramConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the file exists but cannot be read or parsed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Loads configuration from `path`, falling back to defaults if it does not exist.
    ///
    /// # Errors
    /// - If the file exists but cannot be read
    /// - If the TOML is malformed
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    /// - If the directory cannot be created or the file cannot be written
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Retrieves the path to the config file, creating its directory if needed.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    let config_dir = home.join(".config").join("spectrowave");
    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("spectrowave.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrogram::{FrequencyScale, WindowFunction};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("spectrowave-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from(&temp_path("missing.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.render.chunk_width, 1000);
        assert_eq!(config.spectrogram.fft_size, 2048);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            color_map = "magma"

            [spectrogram]
            fft_size = 1024
            window = "blackman-harris"
            frequency_scale = "mel"

            [render]
            height = 256
            "#,
        )
        .unwrap();
        assert_eq!(config.color_map, ColorMapValue::from("magma"));
        assert_eq!(config.spectrogram.fft_size, 1024);
        assert_eq!(config.spectrogram.window, WindowFunction::BlackmanHarris);
        assert_eq!(config.spectrogram.frequency_scale, FrequencyScale::Mel);
        assert_eq!(config.spectrogram.range_db, 80.0);
        assert_eq!(config.render.height, 256);
        assert_eq!(config.render.idle_batch_size, 4);
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let config: AppConfig = toml::from_str(
            r#"
            [spectrogram]
            window = "kaiser"
            frequency_scale = "cents"
            "#,
        )
        .unwrap();
        assert_eq!(config.spectrogram.window, WindowFunction::Hann);
        assert_eq!(config.spectrogram.frequency_scale, FrequencyScale::Linear);
    }

    #[test]
    fn test_custom_color_stops() {
        let config: AppConfig =
            toml::from_str("color_map = [[0, 0, 0], [255, 0, 0, 255]]").unwrap();
        assert!(matches!(config.color_map, ColorMapValue::Custom(ref stops) if stops.len() == 2));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("saved.toml");
        let mut config = AppConfig::default();
        config.spectrogram.zero_padding_factor = 4;
        config.render.samples_per_pixel = 256.0;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("broken.toml");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[spectrogram\nfft_size = ").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
        let _ = fs::remove_file(&path);
    }
}
