//! Spectrogram analysis and display settings.
//!
//! A [`SpectrogramConfig`] splits into two subsets: the compute subset
//! ([`ComputeParams`]) whose changes invalidate cached frequency data, and the
//! display subset ([`DisplayParams`]) which only requires re-rendering.

use serde::{Deserialize, Serialize};

/// Analysis window applied to each STFT frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum WindowFunction {
    #[default]
    Hann,
    /// Shape parameter is the alpha coefficient (default 0.54)
    Hamming,
    /// Shape parameter is the Blackman alpha (default 0.16)
    Blackman,
    BlackmanHarris,
    Bartlett,
    Rectangular,
}

impl WindowFunction {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Hann => "hann",
            Self::Hamming => "hamming",
            Self::Blackman => "blackman",
            Self::BlackmanHarris => "blackman-harris",
            Self::Bartlett => "bartlett",
            Self::Rectangular => "rectangular",
        }
    }

    /// Parses a window name, falling back to Hann for unknown names.
    pub fn from_name(name: &str) -> Self {
        match normalize_name(name).as_str() {
            "hann" | "hanning" => Self::Hann,
            "hamming" => Self::Hamming,
            "blackman" => Self::Blackman,
            "blackmanharris" => Self::BlackmanHarris,
            "bartlett" | "triangular" => Self::Bartlett,
            "rectangular" | "rect" | "none" => Self::Rectangular,
            _ => {
                tracing::warn!("Unknown window function '{}', falling back to hann", name);
                Self::Hann
            }
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Hann,
            Self::Hamming,
            Self::Blackman,
            Self::BlackmanHarris,
            Self::Bartlett,
            Self::Rectangular,
        ]
    }
}

impl From<String> for WindowFunction {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<WindowFunction> for String {
    fn from(window: WindowFunction) -> Self {
        window.id().to_string()
    }
}

impl std::fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Vertical frequency axis law.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum FrequencyScale {
    #[default]
    Linear,
    Logarithmic,
    Mel,
    Bark,
    Erb,
}

impl FrequencyScale {
    pub fn id(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Logarithmic => "logarithmic",
            Self::Mel => "mel",
            Self::Bark => "bark",
            Self::Erb => "erb",
        }
    }

    /// Parses a scale name, falling back to linear for unknown names.
    pub fn from_name(name: &str) -> Self {
        match normalize_name(name).as_str() {
            "linear" => Self::Linear,
            "logarithmic" | "log" => Self::Logarithmic,
            "mel" => Self::Mel,
            "bark" => Self::Bark,
            "erb" => Self::Erb,
            _ => {
                tracing::warn!("Unknown frequency scale '{}', falling back to linear", name);
                Self::Linear
            }
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Linear,
            Self::Logarithmic,
            Self::Mel,
            Self::Bark,
            Self::Erb,
        ]
    }
}

impl From<String> for FrequencyScale {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<FrequencyScale> for String {
    fn from(scale: FrequencyScale) -> Self {
        scale.id().to_string()
    }
}

impl std::fmt::Display for FrequencyScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// FFT sizes offered by the settings surface.
pub const FFT_SIZES: [usize; 6] = [256, 512, 1024, 2048, 4096, 8192];

/// Zero-padding factors offered by the settings surface.
pub const ZERO_PADDING_FACTORS: [usize; 5] = [1, 2, 4, 8, 16];

/// Complete spectrogram configuration for one track (or the global default).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Analysis window length in samples (power of two, 256-8192)
    pub fft_size: usize,
    /// Frame advance in samples; defaults to a quarter of the window
    pub hop_size: Option<usize>,
    /// Window function name (hann, hamming, blackman, blackman-harris, bartlett, rectangular)
    pub window: WindowFunction,
    /// Optional window shape parameter
    pub window_param: Option<f32>,
    /// Actual FFT length is `fft_size * zero_padding_factor`
    pub zero_padding_factor: usize,
    /// Frequency axis law (linear, logarithmic, mel, bark, erb)
    pub frequency_scale: FrequencyScale,
    /// Lowest displayed frequency in Hz
    pub min_frequency: f32,
    /// Highest displayed frequency in Hz; defaults to Nyquist
    pub max_frequency: Option<f32>,
    /// Display gain in dB
    pub gain_db: f32,
    /// Displayed dynamic range in dB
    pub range_db: f32,
    /// Whether frequency axis labels are drawn
    pub labels: bool,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: None,
            window: WindowFunction::Hann,
            window_param: None,
            zero_padding_factor: 2,
            frequency_scale: FrequencyScale::Linear,
            min_frequency: 0.0,
            max_frequency: None,
            gain_db: 20.0,
            range_db: 80.0,
            labels: false,
        }
    }
}

impl SpectrogramConfig {
    pub fn window_size(&self) -> usize {
        self.fft_size.max(2)
    }

    /// Hop size, resolving the default of a quarter window.
    pub fn hop(&self) -> usize {
        self.hop_size
            .filter(|&hop| hop > 0)
            .unwrap_or(self.window_size() / 4)
            .max(1)
    }

    pub fn padding_factor(&self) -> usize {
        self.zero_padding_factor.max(1)
    }

    /// Length of the transform actually run per frame.
    pub fn fft_length(&self) -> usize {
        self.window_size() * self.padding_factor()
    }

    pub fn compute_params(&self) -> ComputeParams {
        ComputeParams {
            window_size: self.window_size(),
            hop_size: self.hop(),
            window: self.window,
            window_param: self.window_param,
            zero_padding_factor: self.padding_factor(),
        }
    }

    /// Resolves the display subset for audio at `sample_rate`.
    ///
    /// The frequency bounds are clamped to `[0, nyquist]`.
    pub fn display_params(&self, sample_rate: u32) -> DisplayParams {
        let nyquist = sample_rate as f32 / 2.0;
        let max_frequency = self
            .max_frequency
            .filter(|hz| *hz > 0.0)
            .unwrap_or(nyquist)
            .min(nyquist);
        let min_frequency = self.min_frequency.clamp(0.0, max_frequency);

        DisplayParams {
            frequency_scale: self.frequency_scale,
            min_frequency,
            max_frequency,
            gain_db: self.gain_db,
            range_db: if self.range_db > 0.0 { self.range_db } else { 80.0 },
            labels: self.labels,
        }
    }
}

/// FFT-affecting subset of a configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeParams {
    pub window_size: usize,
    pub hop_size: usize,
    pub window: WindowFunction,
    pub window_param: Option<f32>,
    pub zero_padding_factor: usize,
}

impl ComputeParams {
    /// Stable textual form used inside cache keys.
    pub fn fingerprint(&self) -> String {
        let param = self
            .window_param
            .map(|p| format!("{:08x}", p.to_bits()))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "w{}h{}{}:{}z{}",
            self.window_size, self.hop_size, self.window, param, self.zero_padding_factor
        )
    }
}

/// Render-only subset of a configuration, with frequency bounds resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayParams {
    pub frequency_scale: FrequencyScale,
    pub min_frequency: f32,
    pub max_frequency: f32,
    pub gain_db: f32,
    pub range_db: f32,
    pub labels: bool,
}
