//! Core types for the polyvoice engine.
//!
//! This crate defines the vocabulary shared by every other crate in the
//! workspace: decoded MIDI messages, the contract a single-voice DSP unit
//! implements, the control interface it declares, tuning bank frames, and
//! the planar buffer used for voice mixdown.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod dsp;
mod event;
mod interface;
mod tuning_bank;

pub use audio_buffer::{AudioBuffer, MAX_CHANNELS};
pub use dsp::{meta_value, DspUnit, META_NAME, META_NVOICES};
pub use event::{MidiMessage, NUM_CHANNELS, NUM_NOTES, PITCH_BEND_CENTER};
pub use interface::{
    ControlDecl, ControlId, ControlKind, Interface, META_MIDI, META_UNIT, VOICE_FREQ, VOICE_GAIN,
    VOICE_GATE,
};
pub use tuning_bank::{TuningBank, TuningFrame, MTS_FRAME_MAX};
