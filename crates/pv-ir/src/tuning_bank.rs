//! Named MIDI Tuning Standard frames loaded ahead of time.

use alloc::string::String;
use alloc::vec::Vec;

use arrayvec::ArrayVec;

/// Longest complete MTS octave/scale dump, F0 through F7 (two-byte form).
pub const MTS_FRAME_MAX: usize = 33;

/// One tuning: a display name and the raw sysex bytes that apply it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TuningFrame {
    pub name: String,
    pub data: ArrayVec<u8, MTS_FRAME_MAX>,
}

impl TuningFrame {
    /// Returns `None` if `data` is longer than any valid frame.
    pub fn new(name: impl Into<String>, data: &[u8]) -> Option<Self> {
        let data = ArrayVec::try_from(data).ok()?;
        Some(Self {
            name: name.into(),
            data,
        })
    }
}

/// Ordered list of tunings. Bank position `i` is selected as tuning `i + 1`;
/// tuning 0 is always equal temperament and has no frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TuningBank {
    frames: Vec<TuningFrame>,
}

impl TuningBank {
    pub fn new(frames: Vec<TuningFrame>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TuningFrame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, TuningFrame> {
        self.frames.iter()
    }
}
