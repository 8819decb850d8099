//! Configuration file editor command.
//!
//! Writes the default settings if no config file exists yet, opens it in the
//! user's editor and re-parses it afterwards so mistakes show up immediately.

use crate::config::{get_config_path, AppConfig};
use anyhow::{anyhow, bail, Context};
use std::env;
use std::path::Path;
use std::process::Command;

const FALLBACK_EDITORS: [&str; 2] = ["nano", "vi"];

/// Opens the configuration file in the user's preferred editor.
///
/// The editor is `$VISUAL`, then `$EDITOR`, then the first of nano or vi on
/// `PATH`. Editor variables may carry arguments (`code --wait`).
///
/// # Errors
/// - If the default config cannot be written
/// - If no editor can be found or it exits with an error
/// - If the edited file no longer parses
pub fn handle_config() -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    if !config_path.exists() {
        AppConfig::default().save_to(&config_path)?;
    }

    let editor = choose_editor(
        env::var("VISUAL").ok(),
        env::var("EDITOR").ok(),
        on_path,
    )
    .ok_or_else(|| anyhow!("No editor found. Set $VISUAL or $EDITOR."))?;
    tracing::info!(
        "Opening {} with {}",
        config_path.display(),
        editor.join(" ")
    );

    let (program, args) = editor
        .split_first()
        .ok_or_else(|| anyhow!("Editor command is empty"))?;
    let status = Command::new(program)
        .args(args)
        .arg(&config_path)
        .status()
        .with_context(|| format!("Failed to launch editor '{program}'"))?;
    if !status.success() {
        bail!("Editor exited with code {}", status.code().unwrap_or(-1));
    }

    AppConfig::load_from(&config_path)?;
    tracing::info!("Config file edited successfully");
    Ok(())
}

/// Picks the editor command line, first match wins.
fn choose_editor(
    visual: Option<String>,
    editor: Option<String>,
    available: impl Fn(&str) -> bool,
) -> Option<Vec<String>> {
    [visual, editor]
        .into_iter()
        .flatten()
        .map(|value| value.split_whitespace().map(str::to_string).collect::<Vec<_>>())
        .find(|words| !words.is_empty())
        .or_else(|| {
            FALLBACK_EDITORS
                .into_iter()
                .find(|name| available(name))
                .map(|name| vec![name.to_string()])
        })
}

fn on_path(program: &str) -> bool {
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| is_file(&dir.join(program))))
        .unwrap_or(false)
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|meta| meta.is_file()).unwrap_or(false)
}
