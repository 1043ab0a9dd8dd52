//! Headless host for the polyvoice engine.
//!
//! Loads settings and the tuning bank, drives an [`Engine`] offline from a
//! timed MIDI script, and renders the result to WAV. Shared by the CLI and
//! the integration tests.

mod session;
mod settings;
mod sine_voice;

use thiserror::Error;

// Re-export common types so callers don't need pv-engine/pv-ir directly.
pub use pv_engine::{Engine, EngineConfig, EngineError};
pub use pv_formats::FormatError;
pub use pv_ir::{AudioBuffer, DspUnit, TuningBank};

pub use session::{chord_script, ScriptEvent, Session};
pub use settings::Settings;
pub use sine_voice::SineVoice;

#[derive(Debug, Error)]
pub enum MasterError {
    #[error("settings: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Format(#[from] FormatError),
}
