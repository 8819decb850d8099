//! Application orchestration and command routing.
//!
//! Handles command-line argument parsing and delegates to appropriate command handlers.

use crate::commands;
use crate::commands::render::RenderOptions;
use crate::logging;
use crate::spectrogram::colormap::preset_names;
use crate::spectrogram::config::{FFT_SIZES, ZERO_PADDING_FACTORS};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

/// Multitrack spectrogram engine: renders WAV files to spectrogram images
#[derive(Parser)]
#[command(name = "spectrowave")]
#[command(version)]
#[command(
    long_about = "Computes short-time Fourier spectrograms on a background worker and paints\nthem into fixed-width chunks, visible chunks first.\n\nEXAMPLES:\n    # Render a WAV file with the configured defaults\n    $ spectrowave render take.wav -o take.png\n\n    # Mel scale, magma colors, 4096-point FFT\n    $ spectrowave render take.wav -o take.png --scale mel --color-map magma --fft-size 4096\n\n    # Print the dominant frequency\n    $ spectrowave peak tone.wav"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/spectrowave/spectrowave.toml\n    Logs:               ~/.local/state/spectrowave/spectrowave.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Spectrogram settings that override the config file for one invocation.
#[derive(Args, Debug, Clone, Default)]
struct AnalysisArgs {
    /// FFT window size in samples (256, 512, 1024, 2048, 4096, 8192)
    #[arg(long, value_name = "N", value_parser = parse_fft_size)]
    fft_size: Option<usize>,

    /// Zero-padding factor (1, 2, 4, 8, 16)
    #[arg(long, value_name = "N", value_parser = parse_zero_padding)]
    zero_padding: Option<usize>,

    /// Window function: hann, hamming, blackman, blackman-harris, bartlett, rectangular
    #[arg(long, value_name = "NAME")]
    window: Option<String>,

    /// Average all channels into one spectrogram
    #[arg(long)]
    mono: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a WAV file to a PNG spectrogram
    ///
    /// Runs the full pipeline: the audio is registered with the background
    /// worker, analysed once, and painted chunk by chunk. Channels are stacked
    /// vertically.
    #[command(visible_alias = "r")]
    Render {
        /// Path to the WAV file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Where to write the PNG
        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Frequency scale: linear, logarithmic, mel, bark, erb
        #[arg(long, value_name = "NAME")]
        scale: Option<String>,

        /// Color map preset (viridis, magma, inferno, roseus, grayscale, igray)
        #[arg(long, value_name = "NAME", value_parser = parse_color_map)]
        color_map: Option<String>,

        /// Image width in pixels; sets the zoom so the whole file fits
        #[arg(long, value_name = "PX")]
        width_px: Option<u32>,

        /// Height of each channel row in pixels
        #[arg(long, value_name = "PX")]
        height: Option<u32>,

        /// Draw frequency tick marks along the left edge
        #[arg(long)]
        labels: bool,
    },

    /// Print the dominant frequency of a WAV file
    ///
    /// Analyses the channel average and reports the loudest bin of the loudest frame.
    #[command(visible_alias = "p")]
    Peak {
        /// Path to the WAV file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        analysis: AnalysisArgs,
    },

    /// Open configuration file in your preferred editor
    ///
    /// Uses $EDITOR environment variable or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// Show recent log entries from the application
    Logs {
        /// Number of lines to show
        #[arg(short = 'n', long, value_name = "LINES")]
        lines: Option<usize>,
    },

    /// Generate shell completion script
    ///
    /// Examples:
    ///   spectrowave completions bash > spectrowave.bash
    ///   spectrowave completions zsh > _spectrowave
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_fft_size(value: &str) -> Result<usize, String> {
    parse_choice(value, &FFT_SIZES)
}

fn parse_zero_padding(value: &str) -> Result<usize, String> {
    parse_choice(value, &ZERO_PADDING_FACTORS)
}

fn parse_color_map(value: &str) -> Result<String, String> {
    let name = value.trim().to_ascii_lowercase();
    if preset_names().contains(&name.as_str()) {
        Ok(name)
    } else {
        Err(format!("expected one of {}", preset_names().join(", ")))
    }
}

fn parse_choice(value: &str, choices: &[usize]) -> Result<usize, String> {
    let parsed: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if choices.contains(&parsed) {
        Ok(parsed)
    } else {
        Err(format!("expected one of {choices:?}"))
    }
}

/// Runs the main application based on command-line arguments.
///
/// # Errors
/// - If logging initialization fails
/// - If the config file is malformed
/// - If command execution fails (e.g., unreadable WAV, unwritable output)
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Commands that don't need logging
    match &cli.command {
        Commands::Completions { shell } => {
            generate(*shell, &mut Cli::command(), "spectrowave", &mut io::stdout());
            return Ok(());
        }
        Commands::Logs { lines } => {
            return match commands::handle_logs(*lines) {
                Ok(()) => Ok(()),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            };
        }
        _ => {}
    }

    logging::init_logging()?;

    match cli.command {
        Commands::Render {
            file,
            output,
            analysis,
            scale,
            color_map,
            width_px,
            height,
            labels,
        } => {
            let options = RenderOptions {
                fft_size: analysis.fft_size,
                zero_padding: analysis.zero_padding,
                window: analysis.window,
                scale,
                color_map,
                mono: analysis.mono,
                width_px,
                height,
                labels,
            };
            commands::handle_render(&file, &output, options).await?;
        }
        Commands::Peak { file, analysis } => {
            commands::handle_peak(&file, analysis.fft_size, analysis.zero_padding, analysis.window)
                .await?;
        }
        Commands::Config => {
            commands::handle_config()?;
        }
        Commands::Completions { .. } | Commands::Logs { .. } => {
            unreachable!("These commands are handled earlier")
        }
    }

    Ok(())
}
