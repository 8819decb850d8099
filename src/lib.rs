//! Multitrack spectrogram engine.
//!
//! Frequency analysis ([`spectrogram`]) runs on a background worker
//! ([`worker`]) that also paints fixed-width pixel chunks ([`render`]). The
//! [`orchestrator`] decides per pass which clips need a new FFT and which only
//! need repainting, based on the tracks described in [`timeline`].

pub mod app;
pub mod commands;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod render;
pub mod spectrogram;
pub mod timeline;
pub mod worker;
