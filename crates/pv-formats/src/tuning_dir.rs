//! Tuning bank discovery.
//!
//! Every `*.syx` file in the tuning directory that holds a valid octave
//! tuning dump becomes one bank entry, ordered by name.

use std::path::{Path, PathBuf};

use pv_ir::TuningBank;
use tracing::{debug, warn};

use crate::tuning_file::load_tuning_file;

const HOME_VAR: &str = "POLYVOICE_HOME";

/// Load every valid tuning in `dir`, sorted by name.
///
/// A missing or unreadable directory yields an empty bank. Invalid files
/// are skipped with a warning.
pub fn load_tuning_dir(dir: &Path) -> TuningBank {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "no tuning directory");
            return TuningBank::default();
        }
    };

    let mut frames = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_syx = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.len() > 4 && n.ends_with(".syx"));
        if !is_syx || !path.is_file() {
            continue;
        }
        match load_tuning_file(&path) {
            Ok(frame) => frames.push(frame),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping tuning file"),
        }
    }
    frames.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(dir = %dir.display(), tunings = frames.len(), "tuning bank loaded");
    TuningBank::new(frames)
}

/// Directories searched for tunings, in order.
///
/// The first is `$POLYVOICE_HOME/tuning`, else `$HOME/.polyvoice/tuning`,
/// else `polyvoice/tuning` relative to the working directory. On macOS
/// `$HOME/Library/Polyvoice/Tuning` follows as a fallback.
pub fn default_tuning_dirs() -> Vec<PathBuf> {
    tuning_dirs_from(
        std::env::var_os(HOME_VAR).map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
        cfg!(target_os = "macos"),
    )
}

fn tuning_dirs_from(app_home: Option<PathBuf>, home: Option<PathBuf>, macos: bool) -> Vec<PathBuf> {
    let base = match (app_home, &home) {
        (Some(dir), _) => dir,
        (None, Some(home)) => home.join(".polyvoice"),
        (None, None) => PathBuf::from("polyvoice"),
    };
    let mut dirs = vec![base.join("tuning")];
    if macos {
        if let Some(home) = home {
            dirs.push(home.join("Library").join("Polyvoice").join("Tuning"));
        }
    }
    dirs
}

/// Load the bank from the first default directory that has any tunings.
pub fn load_default_bank() -> TuningBank {
    first_nonempty(&default_tuning_dirs())
}

fn first_nonempty(dirs: &[PathBuf]) -> TuningBank {
    for dir in dirs {
        let bank = load_tuning_dir(dir);
        if !bank.is_empty() {
            return bank;
        }
    }
    TuningBank::default()
}
