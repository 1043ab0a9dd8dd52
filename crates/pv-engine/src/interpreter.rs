//! MIDI event interpretation.
//!
//! Channel-voice messages drive the voice pool and tuning model; sysex
//! frames are tried as MIDI Tuning Standard dumps. In effect mode only
//! mapped controllers and RPN selector bookkeeping have any effect.

use pv_ir::{DspUnit, MidiMessage, NUM_CHANNELS, NUM_NOTES};
use tracing::trace;

use crate::engine::Engine;
use crate::mts::MtsFrame;
use crate::rpn::{cc, RpnTarget};
use crate::voice_pool::{Allocation, Release};

impl<D: DspUnit> Engine<D> {
    /// Decode and apply one raw MIDI message. Anything that does not decode
    /// is ignored.
    pub fn handle_midi(&mut self, bytes: &[u8]) {
        if let Some(message) = MidiMessage::parse(bytes) {
            self.handle_message(message);
        }
    }

    /// Apply one decoded MIDI message.
    pub fn handle_message(&mut self, message: MidiMessage<'_>) {
        if let Some(channel) = message.channel() {
            if channel as usize >= NUM_CHANNELS {
                return;
            }
        }
        match message {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } if velocity > 0 => self.note_on(channel, note, velocity),
            MidiMessage::NoteOn { channel, note, .. } | MidiMessage::NoteOff { channel, note, .. } => {
                self.note_off(channel, note)
            }
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(channel, controller, value),
            MidiMessage::PitchBend { channel, value } => self.pitch_bend(channel, value),
            MidiMessage::SysEx(bytes) => self.sysex(bytes),
        }
    }

    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        if self.is_effect() || note as usize >= NUM_NOTES || self.voices().active_count() == 0 {
            return;
        }
        let velocity = velocity.min(127);
        match self.pool.allocate(channel, note, velocity) {
            Allocation::Fresh(v) => self.voice_on(v, channel, note, velocity),
            Allocation::Retrigger(v) | Allocation::Stolen { voice: v, .. } => {
                self.voice_off(v);
                self.voice_on(v, channel, note, velocity);
            }
        }
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        if self.is_effect() || note as usize >= NUM_NOTES {
            return;
        }
        if let Some(Release::Freed(v)) = self.pool.release(channel, note) {
            self.voice_off(v);
        }
    }

    fn pitch_bend(&mut self, channel: u8, value: u16) {
        if self.is_effect() {
            return;
        }
        self.tuning.set_pitch_bend(channel as usize, value.min(0x3FFF));
        trace!(channel, bend = self.tuning.channel(channel as usize).bend, "pitch bend");
        self.update_voices(channel);
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        if controller > 127 || value > 127 {
            return;
        }
        let ch = channel as usize;
        match controller {
            cc::ALL_SOUND_OFF | cc::ALL_NOTES_OFF => {
                if !self.is_effect() {
                    self.all_notes_off_channel(channel);
                }
            }
            cc::RESET_ALL_CONTROLLERS => self.rpn[ch].reset(),
            cc::RPN_MSB => self.rpn[ch].msb = value,
            cc::RPN_LSB => self.rpn[ch].lsb = value,
            cc::DATA_ENTRY_MSB => {
                self.rpn[ch].data_msb = value;
                self.apply_rpn(channel);
            }
            cc::DATA_ENTRY_LSB => {
                self.rpn[ch].data_lsb = value;
                self.apply_rpn(channel);
            }
            cc::DATA_INCREMENT => {
                self.rpn[ch].increment();
                self.apply_rpn(channel);
            }
            cc::DATA_DECREMENT => {
                self.rpn[ch].decrement();
                self.apply_rpn(channel);
            }
            _ => self.mapped_controller(channel, controller, value),
        }
    }

    /// Apply the data entry bytes to the selected RPN.
    fn apply_rpn(&mut self, channel: u8) {
        if self.is_effect() {
            return;
        }
        let state = self.rpn[channel as usize];
        let Some(target) = state.target() else {
            return;
        };
        self.tuning
            .apply_rpn(channel as usize, target, state.data_msb, state.data_lsb);
        if target != RpnTarget::PitchBendRange {
            self.update_voices(channel);
        }
    }

    fn mapped_controller(&mut self, channel: u8, controller: u8, value: u8) {
        let Some(port) = self.cc_map.lookup(controller) else {
            return;
        };
        let id = self.controls.input_id(port);
        let scaled = self.controls.input(port).scale_midi(value);
        self.channel_values[port][channel as usize] = scaled;

        if self.is_effect() {
            self.dsps[0].set_control(id, scaled);
        } else {
            let Self { pool, dsps, .. } = self;
            for v in pool.used_on_channel(channel) {
                dsps[v].set_control(id, scaled);
            }
        }
        trace!(channel, controller, port, value = scaled, "controller");
    }

    fn sysex(&mut self, bytes: &[u8]) {
        if self.is_effect() {
            return;
        }
        match MtsFrame::parse(bytes) {
            Some(frame) => self.apply_tuning_frame(&frame),
            None => trace!(len = bytes.len(), "ignored sysex"),
        }
    }
}
