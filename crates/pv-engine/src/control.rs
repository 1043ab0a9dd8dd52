//! Classification of a DSP unit's declared controls into voice cells and
//! host-facing ports.

use alloc::vec::Vec;

use pv_ir::{ControlDecl, ControlId, VOICE_FREQ, VOICE_GAIN, VOICE_GATE};
use tracing::debug;

/// The controls the engine drives per note.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoiceCells {
    pub freq: Option<ControlId>,
    pub gain: Option<ControlId>,
    pub gate: Option<ControlId>,
}

/// A unit's controls split into voice cells, input ports and output ports.
///
/// Port numbers are dense: input port `p` is the `p`-th input control that
/// is not a voice cell, output port `p` the `p`-th output control.
#[derive(Clone, Debug)]
pub struct ControlTable {
    decls: Vec<ControlDecl>,
    cells: VoiceCells,
    inputs: Vec<ControlId>,
    outputs: Vec<ControlId>,
}

impl ControlTable {
    /// Classify `decls`. Voice cells are only recognised when `poly` is set;
    /// otherwise `freq`, `gain` and `gate` are ordinary input ports.
    pub fn scan(decls: Vec<ControlDecl>, poly: bool) -> Self {
        let mut cells = VoiceCells::default();
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        for (id, decl) in decls.iter().enumerate() {
            if decl.kind.is_output() {
                outputs.push(id);
                continue;
            }
            if poly {
                let cell = match decl.label.as_str() {
                    VOICE_FREQ => Some(&mut cells.freq),
                    VOICE_GAIN => Some(&mut cells.gain),
                    VOICE_GATE => Some(&mut cells.gate),
                    _ => None,
                };
                if let Some(cell) = cell {
                    if cell.is_none() {
                        *cell = Some(id);
                        continue;
                    }
                }
            }
            inputs.push(id);
        }

        debug!(
            controls = decls.len(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            freq = ?cells.freq,
            gain = ?cells.gain,
            gate = ?cells.gate,
            "scanned controls"
        );

        Self {
            decls,
            cells,
            inputs,
            outputs,
        }
    }

    pub fn cells(&self) -> VoiceCells {
        self.cells
    }

    pub fn decls(&self) -> &[ControlDecl] {
        &self.decls
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Control id behind input port `port`.
    pub fn input_id(&self, port: usize) -> ControlId {
        self.inputs[port]
    }

    /// Control id behind output port `port`.
    pub fn output_id(&self, port: usize) -> ControlId {
        self.outputs[port]
    }

    pub fn input(&self, port: usize) -> &ControlDecl {
        &self.decls[self.inputs[port]]
    }

    pub fn output(&self, port: usize) -> &ControlDecl {
        &self.decls[self.outputs[port]]
    }

    /// Input port declarations in port order.
    pub fn inputs(&self) -> impl Iterator<Item = &ControlDecl> + '_ {
        self.inputs.iter().map(|&id| &self.decls[id])
    }
}
