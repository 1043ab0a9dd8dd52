//! The single-voice DSP unit contract.

use crate::interface::{ControlId, Interface};

/// Unit-level metadata key giving the default maximum voice count.
/// A value of `0` (or an absent key with no override) makes the unit an effect.
pub const META_NVOICES: &str = "nvoices";

/// Unit-level metadata key giving a display name.
pub const META_NAME: &str = "name";

/// One replica of a signal processor.
///
/// The engine treats a unit as a black box: `compute` is a deterministic
/// function of the unit's internal state and the current values of its
/// control cells. Every replica built by the same factory must declare the
/// same interface.
pub trait DspUnit: Send {
    /// Number of audio input channels.
    fn num_inputs(&self) -> usize;

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize;

    /// Reset internal state for the given sample rate. Control cells return
    /// to their declared initial values.
    fn init(&mut self, sample_rate: u32);

    /// Declare controls in a fixed order.
    fn build_interface(&self, ui: &mut Interface);

    /// Render `frames` samples. Every input and output slice holds at least
    /// `frames` samples; outputs are overwritten, not accumulated.
    fn compute(&mut self, frames: usize, inputs: &[&[f32]], outputs: &mut [&mut [f32]]);

    /// Write a control cell.
    fn set_control(&mut self, id: ControlId, value: f32);

    /// Read a control cell. Output controls report what the last `compute`
    /// wrote.
    fn control(&self, id: ControlId) -> f32;

    /// Restart the voice's envelopes as if its gate had fallen and risen.
    ///
    /// Returns `false` if the unit has no such capability, in which case the
    /// engine lowers the gate and renders a single silent frame to let the
    /// unit observe the transition.
    fn retrigger(&mut self) -> bool {
        false
    }

    /// Unit-level key/value metadata.
    fn metadata(&self) -> &[(&'static str, &'static str)] {
        &[]
    }
}

/// Look up a unit-level metadata value.
pub fn meta_value<D: DspUnit + ?Sized>(dsp: &D, key: &str) -> Option<&'static str> {
    dsp.metadata()
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}
