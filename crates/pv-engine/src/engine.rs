//! The owning engine instance.
//!
//! One [`Engine`] wraps every replica of a DSP unit together with the voice
//! pool, tuning state, controller map and host-facing control ports. MIDI
//! is fed in through [`Engine::handle_midi`] and audio pulled out through
//! [`Engine::process`]; both run on the host's audio thread and never
//! allocate. Everything else here is setup or lifecycle and may allocate.

use alloc::vec::Vec;

use pv_ir::{
    meta_value, AudioBuffer, ControlDecl, ControlId, DspUnit, Interface, TuningBank, MAX_CHANNELS,
    META_NVOICES, NUM_CHANNELS,
};
use tracing::{debug, trace};

use crate::config::{EngineConfig, MAX_BLOCK_SIZE};
use crate::control::ControlTable;
use crate::controller_map::ControllerMap;
use crate::error::EngineError;
use crate::mts::MtsFrame;
use crate::rpn::RpnState;
use crate::tuning::TuningModel;
use crate::voice_pool::{VoiceId, VoicePool, MAX_VOICES};

/// A polyphonic (or single-instance effect) wrapper around a DSP unit.
pub struct Engine<D: DspUnit> {
    /// One replica per voice, or a single one in effect mode.
    pub(crate) dsps: Vec<D>,
    pub(crate) controls: ControlTable,
    pub(crate) cc_map: ControllerMap,
    pub(crate) pool: VoicePool,
    pub(crate) tuning: TuningModel,
    pub(crate) rpn: [RpnState; NUM_CHANNELS],
    /// `0` in effect mode.
    max_voices: usize,
    /// Requested active voice count, applied at the next block.
    pub(crate) polyphony: usize,
    /// Host-set input port values.
    pub(crate) ports: Vec<f32>,
    /// Input port values last pushed to the DSPs.
    pub(crate) baseline: Vec<f32>,
    /// Per-port, per-channel values from mapped controllers.
    pub(crate) channel_values: Vec<[f32; NUM_CHANNELS]>,
    /// Output port values aggregated after the last block.
    pub(crate) outputs: Vec<f32>,
    pub(crate) mixdown: AudioBuffer,
    /// Silent input planes for hosts that deliver fewer inputs than declared.
    pub(crate) silent_inputs: AudioBuffer,
    /// One-frame scratch for retrigger flushes.
    pub(crate) flush_in: AudioBuffer,
    pub(crate) flush_out: AudioBuffer,
    bank: TuningBank,
    tuning_index: usize,
    sample_rate: u32,
    pub(crate) max_block_size: usize,
    pub(crate) num_inputs: usize,
    pub(crate) num_outputs: usize,
    pub(crate) active: bool,
}

impl<D: DspUnit> Engine<D> {
    /// Build an engine, calling `factory` once per voice.
    ///
    /// The voice count comes from `config.max_voices` if set, else from the
    /// unit's `nvoices` metadata, else zero (effect mode).
    pub fn new(mut factory: impl FnMut() -> D, config: EngineConfig) -> Result<Self, EngineError> {
        let first = factory();
        let declared = meta_value(&first, META_NVOICES)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let max_voices = config.max_voices.unwrap_or(declared);
        if max_voices > MAX_VOICES {
            return Err(EngineError::TooManyVoices {
                requested: max_voices,
                max: MAX_VOICES,
            });
        }
        check_block_size(config.max_block_size)?;

        let num_inputs = first.num_inputs();
        let num_outputs = first.num_outputs();
        if num_outputs == 0 {
            return Err(EngineError::NoOutputs);
        }
        if num_inputs.max(num_outputs) > MAX_CHANNELS {
            return Err(EngineError::TooManyChannels {
                channels: num_inputs.max(num_outputs),
                max: MAX_CHANNELS,
            });
        }

        let decls = declared_controls(&first);
        let mut dsps = Vec::with_capacity(max_voices.max(1));
        dsps.push(first);
        for voice in 1..max_voices.max(1) {
            let dsp = factory();
            if dsp.num_inputs() != num_inputs
                || dsp.num_outputs() != num_outputs
                || declared_controls(&dsp) != decls
            {
                return Err(EngineError::InconsistentInterface { voice });
            }
            dsps.push(dsp);
        }
        for dsp in &mut dsps {
            dsp.init(config.sample_rate);
        }

        let controls = ControlTable::scan(decls, max_voices > 0);
        let cc_map = if config.midi_cc {
            ControllerMap::from_ports(controls.inputs())
        } else {
            ControllerMap::new()
        };
        let has_gate = controls.cells().gate.is_some();
        let init: Vec<f32> = controls.inputs().map(|d| d.init).collect();
        let outputs = (0..controls.num_outputs())
            .map(|p| controls.output(p).init)
            .collect();

        debug!(
            voices = max_voices,
            inputs = num_inputs,
            outputs = num_outputs,
            in_ports = controls.num_inputs(),
            out_ports = controls.num_outputs(),
            sample_rate = config.sample_rate,
            "engine created"
        );

        Ok(Self {
            dsps,
            pool: VoicePool::new(max_voices, has_gate),
            cc_map,
            tuning: TuningModel::new(),
            rpn: [RpnState::default(); NUM_CHANNELS],
            max_voices,
            polyphony: max_voices,
            channel_values: init.iter().map(|&v| [v; NUM_CHANNELS]).collect(),
            baseline: init.clone(),
            ports: init,
            outputs,
            mixdown: AudioBuffer::new(num_outputs, config.max_block_size),
            silent_inputs: AudioBuffer::new(num_inputs, config.max_block_size),
            flush_in: AudioBuffer::new(num_inputs, 1),
            flush_out: AudioBuffer::new(num_outputs, 1),
            bank: TuningBank::default(),
            tuning_index: 0,
            sample_rate: config.sample_rate,
            max_block_size: config.max_block_size,
            num_inputs,
            num_outputs,
            controls,
            active: true,
        })
    }

    // === Introspection ===

    /// True when the unit runs as a single-instance effect.
    pub fn is_effect(&self) -> bool {
        self.max_voices == 0
    }

    /// Voice replicas available, `0` for an effect.
    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn controls(&self) -> &ControlTable {
        &self.controls
    }

    pub fn controller_map(&self) -> &ControllerMap {
        &self.cc_map
    }

    pub fn voices(&self) -> &VoicePool {
        &self.pool
    }

    pub fn tuning(&self) -> &TuningModel {
        &self.tuning
    }

    pub fn rpn(&self, channel: usize) -> &RpnState {
        &self.rpn[channel]
    }

    pub fn dsp(&self, voice: VoiceId) -> &D {
        &self.dsps[voice]
    }

    // === Control ports ===

    /// Set an input port from the host. Takes effect at the next block and
    /// replaces the controller-set value on every channel.
    pub fn set_control(&mut self, port: usize, value: f32) {
        if let Some(slot) = self.ports.get_mut(port) {
            *slot = value;
        }
    }

    /// Host-set value of an input port.
    pub fn control(&self, port: usize) -> Option<f32> {
        self.ports.get(port).copied()
    }

    /// Value a mapped controller left for `port` on `channel`.
    pub fn channel_value(&self, port: usize, channel: usize) -> Option<f32> {
        self.channel_values.get(port)?.get(channel).copied()
    }

    /// Output port value from the last block.
    pub fn output(&self, port: usize) -> Option<f32> {
        self.outputs.get(port).copied()
    }

    // === Polyphony ===

    /// Request `voices` active voices from the next block on. Ignored
    /// outside `1..=max_voices`.
    pub fn set_polyphony(&mut self, voices: usize) {
        if (1..=self.max_voices).contains(&voices) {
            self.polyphony = voices;
        }
    }

    /// Requested active voice count.
    pub fn polyphony(&self) -> usize {
        self.polyphony
    }

    // === Tuning bank ===

    /// Install the list of selectable tunings. Resets to equal temperament
    /// if a bank tuning was selected.
    pub fn set_tuning_bank(&mut self, bank: TuningBank) {
        debug!(tunings = bank.len(), "tuning bank installed");
        self.bank = bank;
        if self.tuning_index != 0 {
            self.select_tuning(0);
        }
    }

    pub fn tuning_bank(&self) -> &TuningBank {
        &self.bank
    }

    /// Currently selected tuning, `0` for equal temperament.
    pub fn tuning_index(&self) -> usize {
        self.tuning_index
    }

    /// Select tuning `index`: `0` returns every channel to equal temperament,
    /// `i` replays bank frame `i - 1` as if it arrived as sysex.
    pub fn select_tuning(&mut self, index: usize) {
        if self.is_effect() || index == self.tuning_index || index > self.bank.len() {
            return;
        }
        if index == 0 {
            self.tuning.reset_octave_tuning();
            self.tuning_index = 0;
            debug!("tuning reset to equal temperament");
            return;
        }
        let Some(frame) = self.bank.get(index - 1).and_then(|f| MtsFrame::parse(&f.data)) else {
            return;
        };
        self.tuning_index = index;
        debug!(index, name = %self.bank.get(index - 1).map_or("", |f| f.name.as_str()), "tuning selected");
        self.apply_tuning_frame(&frame);
    }

    // === Lifecycle ===

    /// Stop processing. Every note is released.
    pub fn suspend(&mut self) {
        self.active = false;
        if !self.is_effect() {
            self.all_notes_off();
        }
        debug!("suspended");
    }

    /// Re-initialise every replica and resume processing.
    pub fn resume(&mut self) {
        self.init_dsps();
        let Self {
            controls, baseline, ..
        } = self;
        for (value, decl) in baseline.iter_mut().zip(controls.inputs()) {
            *value = decl.init;
        }
        self.active = true;
        debug!("resumed");
    }

    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        self.init_dsps();
        debug!(sample_rate, "sample rate changed");
    }

    /// Resize the mixdown buffers. Only allowed while suspended.
    pub fn set_max_block_size(&mut self, frames: usize) -> Result<(), EngineError> {
        if self.active {
            return Err(EngineError::NotSuspended);
        }
        check_block_size(frames)?;
        self.max_block_size = frames;
        self.mixdown = AudioBuffer::new(self.num_outputs, frames);
        self.silent_inputs = AudioBuffer::new(self.num_inputs, frames);
        debug!(frames, "max block size changed");
        Ok(())
    }

    /// Restore default input values, polyphony and equal temperament.
    pub fn reset_program(&mut self) {
        let Self { controls, ports, .. } = self;
        for (value, decl) in ports.iter_mut().zip(controls.inputs()) {
            *value = decl.init;
        }
        self.polyphony = self.max_voices;
        self.tuning.reset_octave_tuning();
        self.tuning_index = 0;
        debug!("program reset");
    }

    fn init_dsps(&mut self) {
        for dsp in &mut self.dsps {
            dsp.init(self.sample_rate);
        }
        for v in 0..self.pool.capacity() {
            self.pool.set_last_gate(v, 0.0);
        }
    }

    // === Voice control ===

    /// Push note state into voice `v`, flushing a gate transition first if
    /// the voice was still gated.
    pub(crate) fn voice_on(&mut self, v: VoiceId, channel: u8, note: u8, velocity: u8) {
        let cells = self.controls.cells();
        let dsp = &mut self.dsps[v];

        if let Some(gate) = cells.gate {
            if self.pool.voice(v).last_gate != 0.0 && !dsp.retrigger() {
                dsp.set_control(gate, 0.0);
                let inputs = self.flush_in.planes(1);
                let mut outputs = self.flush_out.planes_mut(1);
                dsp.compute(1, &inputs, &mut outputs);
                trace!(voice = v, "gate flush");
            }
            self.pool.set_last_gate(v, 0.0);
        }

        if let Some(freq) = cells.freq {
            dsp.set_control(freq, self.tuning.frequency(note, channel as usize));
        }
        if let Some(gate) = cells.gate {
            dsp.set_control(gate, 1.0);
        }
        if let Some(gain) = cells.gain {
            dsp.set_control(gain, velocity as f32 / 127.0);
        }
        for (port, values) in self.channel_values.iter().enumerate() {
            dsp.set_control(self.controls.input_id(port), values[channel as usize]);
        }
    }

    pub(crate) fn voice_off(&mut self, v: VoiceId) {
        if let Some(gate) = self.controls.cells().gate {
            self.dsps[v].set_control(gate, 0.0);
        }
    }

    /// Push fresh frequencies to every used voice on `channel`.
    pub(crate) fn update_voices(&mut self, channel: u8) {
        let Some(freq) = self.controls.cells().freq else {
            return;
        };
        let Self {
            pool, dsps, tuning, ..
        } = self;
        for v in pool.used_on_channel(channel) {
            if let Some(note) = pool.voice(v).note {
                dsps[v].set_control(freq, tuning.frequency(note, channel as usize));
            }
        }
    }

    /// Release every voice and zero every channel's pitch bend.
    pub fn all_notes_off(&mut self) {
        let gate = self.controls.cells().gate;
        let dsps = &mut self.dsps;
        self.pool.all_notes_off(|v| gate_off(dsps, gate, v));
        self.tuning.reset_all_pitch_bends();
        trace!("all notes off");
    }

    /// Release every voice on `channel` and zero its pitch bend.
    pub(crate) fn all_notes_off_channel(&mut self, channel: u8) {
        let gate = self.controls.cells().gate;
        let dsps = &mut self.dsps;
        self.pool
            .all_notes_off_channel(channel, |v| gate_off(dsps, gate, v));
        self.tuning.reset_pitch_bend(channel as usize);
        trace!(channel, "all notes off");
    }

    pub(crate) fn apply_tuning_frame(&mut self, frame: &MtsFrame) {
        self.tuning.apply_mts(frame);
        if frame.realtime {
            for channel in 0..NUM_CHANNELS as u8 {
                if frame.affects(channel as usize) {
                    self.update_voices(channel);
                }
            }
        }
    }
}

/// Lower the gate of voice `v`, if the unit has one.
pub(crate) fn gate_off<D: DspUnit>(dsps: &mut [D], gate: Option<ControlId>, v: VoiceId) {
    if let Some(gate) = gate {
        dsps[v].set_control(gate, 0.0);
    }
}

fn declared_controls<D: DspUnit>(dsp: &D) -> Vec<ControlDecl> {
    let mut ui = Interface::new();
    dsp.build_interface(&mut ui);
    ui.into_controls()
}

fn check_block_size(frames: usize) -> Result<(), EngineError> {
    if frames == 0 || frames > MAX_BLOCK_SIZE {
        return Err(EngineError::BlockTooLarge {
            requested: frames,
            max: MAX_BLOCK_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::pitch_to_freq;
    use crate::mts::tests::one_byte_frame;
    use crate::test_dsp::{engine, TestDsp, FREQ};
    use pv_ir::TuningFrame;

    // === Construction ===

    #[test]
    fn voice_count_from_metadata() {
        let e = Engine::new(
            || TestDsp::new(false).declaring_voices(),
            EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(e.max_voices(), 8);
        assert_eq!(e.polyphony(), 8);
        assert!(!e.is_effect());
        assert_eq!(e.voices().free_len(), 8);
    }

    #[test]
    fn override_beats_metadata() {
        let e = Engine::new(
            || TestDsp::new(false).declaring_voices(),
            EngineConfig::default().with_max_voices(0),
        )
        .unwrap();
        assert!(e.is_effect());
        assert_eq!(e.controls().num_inputs(), 5);
    }

    #[test]
    fn no_metadata_means_effect() {
        let e = Engine::new(|| TestDsp::new(false), EngineConfig::default()).unwrap();
        assert!(e.is_effect());
        assert_eq!(e.voices().capacity(), 0);
    }

    #[test]
    fn factory_called_once_per_voice() {
        let mut made = 0;
        let e = Engine::new(
            || {
                made += 1;
                TestDsp::new(false)
            },
            EngineConfig::default().with_max_voices(6),
        )
        .unwrap();
        assert_eq!(made, 6);
        assert_eq!(e.dsp(5).inits, 1);
    }

    #[test]
    fn too_many_voices_rejected() {
        let err = Engine::new(
            || TestDsp::new(false),
            EngineConfig::default().with_max_voices(MAX_VOICES + 1),
        )
        .err();
        assert_eq!(
            err,
            Some(EngineError::TooManyVoices {
                requested: MAX_VOICES + 1,
                max: MAX_VOICES
            })
        );
    }

    #[test]
    fn bad_block_size_rejected() {
        let err = Engine::new(
            || TestDsp::new(false),
            EngineConfig::default().with_max_block_size(MAX_BLOCK_SIZE + 1),
        )
        .err();
        assert!(matches!(err, Some(EngineError::BlockTooLarge { .. })));
    }

    #[test]
    fn cc_mapping_can_be_disabled() {
        let e = Engine::new(
            || TestDsp::new(false),
            EngineConfig::default().with_max_voices(2).with_midi_cc(false),
        )
        .unwrap();
        assert!(e.controller_map().is_empty());

        let e = engine(2);
        assert_eq!(e.controller_map().lookup(74), Some(0));
    }

    // === Stealing ===

    #[test]
    fn fifth_note_steals_first() {
        let mut e = engine(4);
        for (note, vel) in [(60, 100), (64, 90), (67, 80), (72, 70)] {
            e.handle_midi(&[0x90, note, vel]);
        }
        let first = e.voices().lookup(0, 60).unwrap();
        e.handle_midi(&[0x90, 76, 60]);
        assert_eq!(e.voices().lookup(0, 60), None);
        assert_eq!(e.voices().lookup(0, 76), Some(first));
        assert!((e.dsp(first).cells[FREQ] - pitch_to_freq(76.0)).abs() < 1e-3);
        assert_eq!(e.voices().used().len(), 4);
    }

    // === Tuning bank ===

    fn bank() -> TuningBank {
        let mut quarter = [64u8; 12];
        quarter[9] = 89; // A +25 cents
        TuningBank::new(alloc::vec![
            TuningFrame::new("quarter", &one_byte_frame(true, 0xFFFF, quarter)).unwrap(),
            TuningFrame::new("garbage", &[0xF0, 0x01, 0xF7]).unwrap(),
        ])
    }

    #[test]
    fn select_tuning_replays_frame() {
        let mut e = engine(2);
        e.set_tuning_bank(bank());
        e.handle_midi(&[0x90, 69, 100]);
        let v = e.voices().lookup(0, 69).unwrap();

        e.select_tuning(1);
        assert_eq!(e.tuning_index(), 1);
        assert!((e.dsp(v).cells[FREQ] - pitch_to_freq(69.25)).abs() < 1e-3);

        e.select_tuning(0);
        assert_eq!(e.tuning_index(), 0);
        assert_eq!(e.tuning().channel(0).octave, [0.0; 12]);
        // Back to equal temperament without touching sounding voices.
        assert!((e.dsp(v).cells[FREQ] - pitch_to_freq(69.25)).abs() < 1e-3);
    }

    #[test]
    fn select_tuning_ignores_bad_indices() {
        let mut e = engine(2);
        e.set_tuning_bank(bank());
        e.select_tuning(3);
        assert_eq!(e.tuning_index(), 0);
        e.select_tuning(2); // frame does not parse
        assert_eq!(e.tuning_index(), 0);
    }

    #[test]
    fn reselecting_same_tuning_is_noop() {
        let mut e = engine(2);
        e.set_tuning_bank(bank());
        e.select_tuning(1);
        // An explicit sysex changes channel 0; reselecting 1 must not undo it.
        e.handle_midi(&one_byte_frame(false, 1, [70; 12]));
        e.select_tuning(1);
        assert!((e.tuning().channel(0).octave[0] - 0.06).abs() < 1e-6);
    }

    // === Lifecycle ===

    #[test]
    fn suspend_releases_and_zeroes_bend() {
        let mut e = engine(2);
        e.handle_midi(&[0x90, 60, 100]);
        e.handle_midi(&[0xE3, 0, 0]);
        e.suspend();
        assert!(!e.is_active());
        assert!(e.voices().used().is_empty());
        assert_eq!(e.tuning().channel(3).bend, 0.0);
    }

    #[test]
    fn sample_rate_change_reinitialises() {
        let mut e = engine(2);
        e.set_sample_rate(48000);
        assert_eq!(e.sample_rate(), 48000);
        assert_eq!(e.dsp(1).inits, 2);
    }

    #[test]
    fn reset_program_restores_defaults() {
        let mut e = engine(4);
        e.set_tuning_bank(bank());
        e.select_tuning(1);
        e.set_control(0, 4000.0);
        e.set_polyphony(2);
        e.reset_program();
        assert_eq!(e.control(0), Some(1000.0));
        assert_eq!(e.polyphony(), 4);
        assert_eq!(e.tuning_index(), 0);
        assert_eq!(e.tuning().channel(5).octave, [0.0; 12]);
    }

    #[test]
    fn out_of_range_ports_are_ignored() {
        let mut e = engine(2);
        e.set_control(99, 1.0);
        assert_eq!(e.control(99), None);
        assert_eq!(e.output(1), None);
        assert_eq!(e.channel_value(0, 16), None);
    }
}
