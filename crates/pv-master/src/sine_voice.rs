//! A small enveloped sine voice for demos and tests.

use pv_ir::{
    ControlId, DspUnit, Interface, META_MIDI, META_NAME, META_NVOICES, META_UNIT, VOICE_FREQ,
    VOICE_GAIN, VOICE_GATE,
};

const FREQ: ControlId = 0;
const GAIN: ControlId = 1;
const GATE: ControlId = 2;
const VOLUME: ControlId = 3;
const ATTACK: ControlId = 4;
const RELEASE: ControlId = 5;
const LEVEL: ControlId = 6;
const NUM_CONTROLS: usize = 7;

/// Sine oscillator with a linear attack/release envelope on a stereo pair.
///
/// `volume` answers to CC 7. `level` reports the envelope peak of the last
/// block.
#[derive(Clone, Debug)]
pub struct SineVoice {
    cells: [f32; NUM_CONTROLS],
    sample_rate: f32,
    phase: f32,
    env: f32,
}

impl SineVoice {
    pub fn new() -> Self {
        let mut voice = Self {
            cells: [0.0; NUM_CONTROLS],
            sample_rate: 44100.0,
            phase: 0.0,
            env: 0.0,
        };
        voice.reset_cells();
        voice
    }

    fn reset_cells(&mut self) {
        let mut ui = Interface::new();
        self.build_interface(&mut ui);
        for (cell, decl) in self.cells.iter_mut().zip(ui.controls()) {
            *cell = decl.init;
        }
    }

    /// Envelope change per sample for a ramp lasting `seconds`.
    fn env_step(&self, seconds: f32) -> f32 {
        if seconds <= 0.0 {
            1.0
        } else {
            1.0 / (seconds * self.sample_rate)
        }
    }
}

impl Default for SineVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl DspUnit for SineVoice {
    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        2
    }

    fn init(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate as f32;
        self.phase = 0.0;
        self.env = 0.0;
        self.reset_cells();
    }

    fn build_interface(&self, ui: &mut Interface) {
        ui.slider(VOICE_FREQ, 440.0, 20.0, 20000.0, 0.01)
            .meta(META_UNIT, "Hz");
        ui.slider(VOICE_GAIN, 0.5, 0.0, 1.0, 0.01);
        ui.button(VOICE_GATE);
        ui.slider("volume", 0.8, 0.0, 1.0, 0.01)
            .meta(META_MIDI, "ctrl 7");
        ui.num_entry("attack", 0.01, 0.0, 2.0, 0.001)
            .meta(META_UNIT, "s");
        ui.slider("release", 0.2, 0.0, 5.0, 0.01)
            .meta(META_UNIT, "s");
        ui.bargraph("level", 0.0, 1.0);
    }

    fn compute(&mut self, frames: usize, _inputs: &[&[f32]], outputs: &mut [&mut [f32]]) {
        let gated = self.cells[GATE] > 0.0;
        let step = if gated {
            self.env_step(self.cells[ATTACK])
        } else {
            self.env_step(self.cells[RELEASE])
        };
        let amp = self.cells[GAIN] * self.cells[VOLUME];
        let inc = self.cells[FREQ] / self.sample_rate;
        let mut peak = 0.0f32;

        let (left, rest) = outputs.split_at_mut(1);
        for (i, l) in left[0][..frames].iter_mut().enumerate() {
            self.env = if gated {
                (self.env + step).min(1.0)
            } else {
                (self.env - step).max(0.0)
            };
            peak = peak.max(self.env);
            let s = sine(self.phase) * amp * self.env;
            self.phase = (self.phase + inc).fract();
            *l = s;
            if let Some(right) = rest.first_mut() {
                right[i] = s;
            }
        }
        self.cells[LEVEL] = peak;
    }

    fn set_control(&mut self, id: ControlId, value: f32) {
        if let Some(cell) = self.cells.get_mut(id) {
            *cell = value;
        }
    }

    fn control(&self, id: ControlId) -> f32 {
        self.cells.get(id).copied().unwrap_or(0.0)
    }

    /// The envelope continues from its current level, so no flush is needed.
    fn retrigger(&mut self) -> bool {
        true
    }

    fn metadata(&self) -> &[(&'static str, &'static str)] {
        &[(META_NAME, "sine"), (META_NVOICES, "8")]
    }
}

fn sine(phase: f32) -> f32 {
    (phase * core::f32::consts::TAU).sin()
}
