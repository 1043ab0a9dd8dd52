//! File formats for polyvoice.
//!
//! Loads MIDI Tuning Standard `.syx` files into a tuning bank and writes
//! rendered audio as WAV.

mod tuning_dir;
mod tuning_file;
mod wav_format;

pub use tuning_dir::{default_tuning_dirs, load_default_bank, load_tuning_dir};
pub use tuning_file::{load_tuning_file, parse_tuning, tuning_name};
pub use wav_format::{buffer_to_wav, write_wav};

use thiserror::Error;

/// Error type for file loading.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid tuning sysex: {reason}")]
    InvalidSysex { reason: &'static str },
    #[error("malformed sysex header: {0}")]
    Header(#[from] binrw::Error),
}
