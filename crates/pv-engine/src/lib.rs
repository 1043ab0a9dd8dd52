//! Polyphonic voice engine for single-voice DSP units.
//!
//! Owns a fixed pool of DSP replicas, binds MIDI notes to them, applies
//! pitch bend, RPN master tuning and MIDI Tuning Standard frames, maps
//! MIDI controllers onto the unit's controls, and mixes every voice into the
//! host's output once per block. The event and block paths never allocate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod block;
mod config;
mod control;
mod controller_map;
mod engine;
mod error;
mod frequency;
mod interpreter;
pub mod mts;
pub mod rpn;
mod tuning;
mod voice_pool;

#[cfg(test)]
mod test_dsp;

pub use config::{EngineConfig, MAX_BLOCK_SIZE};
pub use control::{ControlTable, VoiceCells};
pub use controller_map::{parse_ctrl_meta, ControllerMap};
pub use engine::Engine;
pub use error::EngineError;
pub use frequency::pitch_to_freq;
pub use mts::MtsFrame;
pub use rpn::{RpnState, RpnTarget};
pub use tuning::{ChannelTuning, TuningModel, DEFAULT_BEND_RANGE};
pub use voice_pool::{Allocation, Release, Voice, VoiceId, VoicePool, VoiceState, MAX_VOICES};
