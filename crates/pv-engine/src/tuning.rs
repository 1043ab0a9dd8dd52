//! Per-channel pitch state: octave tuning, pitch bend and master tuning.

use pv_ir::{NUM_CHANNELS, PITCH_BEND_CENTER};
use tracing::trace;

use crate::frequency::pitch_to_freq;
use crate::mts::MtsFrame;
use crate::rpn::RpnTarget;

/// Default pitch bend range in semitones.
pub const DEFAULT_BEND_RANGE: f32 = 2.0;

/// Pitch state of one MIDI channel. All values are in semitones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelTuning {
    /// Offset per pitch class, C first.
    pub octave: [f32; 12],
    pub bend: f32,
    pub bend_range: f32,
    pub coarse: f32,
    pub fine: f32,
    /// `coarse + fine`.
    pub master: f32,
}

impl Default for ChannelTuning {
    fn default() -> Self {
        Self {
            octave: [0.0; 12],
            bend: 0.0,
            bend_range: DEFAULT_BEND_RANGE,
            coarse: 0.0,
            fine: 0.0,
            master: 0.0,
        }
    }
}

/// Pitch state for all 16 channels.
#[derive(Clone, Debug, Default)]
pub struct TuningModel {
    channels: [ChannelTuning; NUM_CHANNELS],
}

impl TuningModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, channel: usize) -> &ChannelTuning {
        &self.channels[channel]
    }

    /// Frequency in Hz of `note` on `channel` with every pitch source applied.
    pub fn frequency(&self, note: u8, channel: usize) -> f32 {
        let ch = &self.channels[channel];
        let pitch = note as f32 + ch.master + ch.octave[note as usize % 12] + ch.bend;
        pitch_to_freq(pitch)
    }

    /// Set bend from a raw 14-bit pitch wheel value.
    pub fn set_pitch_bend(&mut self, channel: usize, raw: u16) {
        let ch = &mut self.channels[channel];
        ch.bend = (raw as f32 - PITCH_BEND_CENTER as f32) / PITCH_BEND_CENTER as f32 * ch.bend_range;
    }

    pub fn reset_pitch_bend(&mut self, channel: usize) {
        self.channels[channel].bend = 0.0;
    }

    pub fn reset_all_pitch_bends(&mut self) {
        for ch in &mut self.channels {
            ch.bend = 0.0;
        }
    }

    /// Apply data entry bytes to an RPN target.
    pub fn apply_rpn(&mut self, channel: usize, target: RpnTarget, msb: u8, lsb: u8) {
        let ch = &mut self.channels[channel];
        match target {
            RpnTarget::PitchBendRange => {
                ch.bend_range = msb as f32 + lsb as f32 / 100.0;
                trace!(channel, range = ch.bend_range, "pitch bend range");
                return;
            }
            RpnTarget::FineTuning => {
                let value = (msb as u16) << 7 | lsb as u16;
                ch.fine = (value as f32 - 8192.0) / 8192.0;
            }
            RpnTarget::CoarseTuning => {
                ch.coarse = msb as f32 - 64.0;
            }
        }
        ch.master = ch.coarse + ch.fine;
        trace!(channel, coarse = ch.coarse, fine = ch.fine, "master tuning");
    }

    /// Return every channel to equal temperament.
    pub fn reset_octave_tuning(&mut self) {
        for ch in &mut self.channels {
            ch.octave = [0.0; 12];
        }
    }

    /// Store a frame's offsets on every channel it selects.
    pub fn apply_mts(&mut self, frame: &MtsFrame) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            if frame.affects(i) {
                ch.octave = frame.offsets;
            }
        }
        trace!(
            channels = frame.channels,
            realtime = frame.realtime,
            "octave tuning"
        );
    }

    /// Restore every channel to its power-on state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
