//! Instrumented DSP unit for unit tests.

use alloc::vec;
use alloc::vec::Vec;

use pv_ir::{
    ControlId, DspUnit, Interface, META_MIDI, META_NVOICES, VOICE_FREQ, VOICE_GAIN, VOICE_GATE,
};

use crate::{Engine, EngineConfig};

pub const FREQ: ControlId = 0;
pub const GAIN: ControlId = 1;
pub const GATE: ControlId = 2;
/// Input port 0, mapped to CC 74.
pub const CUTOFF: ControlId = 3;
/// Input port 1, unmapped.
pub const DRIVE: ControlId = 4;
/// Output port 0: `gain * gate` after each compute.
pub const LEVEL: ControlId = 5;

/// Writes `input + gain * gate` to its single output and records every
/// compute call as `(frames, gate)`.
pub struct TestDsp {
    pub cells: Vec<f32>,
    pub computed_frames: Vec<(usize, f32)>,
    pub inits: usize,
    pub retriggers: usize,
    supports_retrigger: bool,
    declares_voices: bool,
}

impl TestDsp {
    pub fn new(supports_retrigger: bool) -> Self {
        let mut dsp = Self {
            cells: vec![0.0; 6],
            computed_frames: Vec::new(),
            inits: 0,
            retriggers: 0,
            supports_retrigger,
            declares_voices: false,
        };
        dsp.reset_cells();
        dsp
    }

    /// Declare `nvoices = 8` in the unit metadata.
    pub fn declaring_voices(mut self) -> Self {
        self.declares_voices = true;
        self
    }

    fn reset_cells(&mut self) {
        let mut ui = Interface::new();
        self.build_interface(&mut ui);
        for (cell, decl) in self.cells.iter_mut().zip(ui.controls()) {
            *cell = decl.init;
        }
    }
}

impl DspUnit for TestDsp {
    fn num_inputs(&self) -> usize {
        1
    }

    fn num_outputs(&self) -> usize {
        1
    }

    fn init(&mut self, _sample_rate: u32) {
        self.inits += 1;
        self.reset_cells();
    }

    fn build_interface(&self, ui: &mut Interface) {
        ui.slider(VOICE_FREQ, 440.0, 20.0, 20000.0, 0.01);
        ui.slider(VOICE_GAIN, 0.5, 0.0, 1.0, 0.01);
        ui.button(VOICE_GATE);
        ui.slider("cutoff", 1000.0, 100.0, 5000.0, 1.0)
            .meta(META_MIDI, "ctrl 74");
        ui.slider("drive", 0.0, 0.0, 1.0, 0.01);
        ui.bargraph("level", 0.0, 1.0);
    }

    fn compute(&mut self, frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let gate = self.cells[GATE];
        let level = self.cells[GAIN] * gate;
        for (o, i) in outputs[0][..frames].iter_mut().zip(inputs[0].iter()) {
            *o = i + level;
        }
        self.cells[LEVEL] = level;
        self.computed_frames.push((frames, gate));
    }

    fn set_control(&mut self, id: ControlId, value: f32) {
        self.cells[id] = value;
    }

    fn control(&self, id: ControlId) -> f32 {
        self.cells[id]
    }

    fn retrigger(&mut self) -> bool {
        if self.supports_retrigger {
            self.retriggers += 1;
        }
        self.supports_retrigger
    }

    fn metadata(&self) -> &[(&'static str, &'static str)] {
        if self.declares_voices {
            &[(META_NVOICES, "8")]
        } else {
            &[]
        }
    }
}

pub fn engine_with_config(voices: usize, retrigger: bool, config: EngineConfig) -> Engine<TestDsp> {
    let config = EngineConfig {
        max_voices: Some(voices),
        ..config
    };
    match Engine::new(|| TestDsp::new(retrigger), config) {
        Ok(engine) => engine,
        Err(err) => panic!("test engine: {err}"),
    }
}

pub fn engine_with(voices: usize, retrigger: bool) -> Engine<TestDsp> {
    engine_with_config(voices, retrigger, EngineConfig::default())
}

pub fn engine(voices: usize) -> Engine<TestDsp> {
    engine_with(voices, false)
}

pub fn effect_engine() -> Engine<TestDsp> {
    engine(0)
}

impl<D: DspUnit> Engine<D> {
    /// Render one silent block and discard the output.
    pub(crate) fn run_block(&mut self, frames: usize) {
        let input = vec![0.0f32; frames];
        let mut output = vec![0.0f32; frames];
        self.process(frames, &[&input[..]], &mut [&mut output[..]]);
    }
}
