//! Single `.syx` tuning files.
//!
//! A file must hold exactly one complete MTS scale/octave tuning dump,
//! F0 through F7: 21 bytes for the one-byte form, 33 for the two-byte form.

use std::io::Cursor;
use std::path::Path;

use binrw::{BinRead, BinReaderExt};
use pv_ir::TuningFrame;

use crate::FormatError;

const ONE_BYTE_LEN: usize = 21;
const TWO_BYTE_LEN: usize = 33;

#[derive(BinRead, Debug)]
#[br(big, magic = 0xF0u8)]
struct SysexHeader {
    #[br(assert(universal == 0x7E || universal == 0x7F))]
    universal: u8,
    _device: u8,
    #[br(assert(sub_id == 0x08))]
    sub_id: u8,
    sub_id2: u8,
}

/// Validate raw file contents as a tuning dump.
pub fn parse_tuning(name: &str, data: &[u8]) -> Result<TuningFrame, FormatError> {
    if data.last() != Some(&0xF7) {
        return Err(FormatError::InvalidSysex {
            reason: "missing F7 terminator",
        });
    }
    let header: SysexHeader = Cursor::new(data).read_be()?;
    match (header.sub_id2, data.len()) {
        (0x08, ONE_BYTE_LEN) | (0x09, TWO_BYTE_LEN) => {}
        (0x08 | 0x09, _) => {
            return Err(FormatError::InvalidSysex {
                reason: "length does not match tuning form",
            })
        }
        _ => {
            return Err(FormatError::InvalidSysex {
                reason: "not a scale/octave tuning",
            })
        }
    }
    if header.universal == 0x7F {
        tracing::trace!(name, "realtime tuning dump");
    }
    TuningFrame::new(name, data).ok_or(FormatError::InvalidSysex {
        reason: "frame too long",
    })
}

/// Tuning name for a file: its file name without a `.syx` suffix.
pub fn tuning_name(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file.strip_suffix(".syx") {
        Some(stem) => stem.to_string(),
        None => file,
    }
}

/// Read and validate one `.syx` file.
pub fn load_tuning_file(path: &Path) -> Result<TuningFrame, FormatError> {
    let data = std::fs::read(path)?;
    parse_tuning(&tuning_name(path), &data)
}
