//! Engine construction parameters.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest block size the mixdown buffers can be sized for.
pub const MAX_BLOCK_SIZE: usize = 8192;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// Frames per block the voice mixdown buffers hold. Longer host blocks
    /// are processed in chunks of this size.
    pub max_block_size: usize,
    /// Overrides the unit's `nvoices` metadata. `Some(0)` forces effect mode.
    pub max_voices: Option<usize>,
    /// Map controllers named in `midi: ctrl N` metadata.
    pub midi_cc: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            max_block_size: 512,
            max_voices: None,
            midi_cc: true,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_max_block_size(mut self, frames: usize) -> Self {
        self.max_block_size = frames;
        self
    }

    pub fn with_max_voices(mut self, voices: usize) -> Self {
        self.max_voices = Some(voices);
        self
    }

    pub fn with_midi_cc(mut self, enabled: bool) -> Self {
        self.midi_cc = enabled;
        self
    }
}
