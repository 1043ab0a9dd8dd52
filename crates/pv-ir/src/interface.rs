//! Control interface a DSP unit declares to the engine.
//!
//! A unit describes its parameters by calling builder methods on an
//! [`Interface`] from [`DspUnit::build_interface`](crate::DspUnit::build_interface).
//! Declaration order is the control's [`ControlId`]; the unit receives that
//! same index back through `set_control` and `control`.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Index of a control in declaration order.
pub type ControlId = usize;

/// Label of the per-voice frequency control, in Hz.
pub const VOICE_FREQ: &str = "freq";
/// Label of the per-voice gain control, in `[0, 1]`.
pub const VOICE_GAIN: &str = "gain";
/// Label of the per-voice gate control, `1.0` while a note is held.
pub const VOICE_GATE: &str = "gate";

/// Metadata key binding a control to a MIDI controller (`"ctrl N"`).
pub const META_MIDI: &str = "midi";
/// Metadata key carrying a display unit.
pub const META_UNIT: &str = "unit";

/// What kind of widget a control is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlKind {
    /// Momentary push button.
    Button,
    /// Toggle.
    CheckButton,
    /// Continuous input.
    Slider,
    /// Numeric entry.
    NumEntry,
    /// Read-only meter the unit writes during `compute`.
    Bargraph,
}

impl ControlKind {
    /// Buttons and checkboxes only ever take the values `0` and `1`.
    pub fn is_boolean(self) -> bool {
        matches!(self, Self::Button | Self::CheckButton)
    }

    /// Output controls are read from the unit, never written to it.
    pub fn is_output(self) -> bool {
        matches!(self, Self::Bargraph)
    }
}

/// One declared control.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlDecl {
    pub label: String,
    pub kind: ControlKind,
    pub init: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub meta: Vec<(String, String)>,
}

impl ControlDecl {
    fn new(label: &str, kind: ControlKind, init: f32, min: f32, max: f32, step: f32) -> Self {
        Self {
            label: label.to_string(),
            kind,
            init,
            min,
            max,
            step,
            meta: Vec::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn meta(&mut self, key: &str, value: &str) -> &mut Self {
        self.meta.push((key.to_string(), value.to_string()));
        self
    }

    /// First metadata value stored under `key`.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.meta
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Map a 7-bit MIDI controller value onto this control's range.
    ///
    /// Boolean controls switch at 64. Other controls scale linearly by
    /// `v / 128`, with 127 pinned to `max` so the top of the range is
    /// reachable.
    pub fn scale_midi(&self, value: u8) -> f32 {
        if self.kind.is_boolean() {
            return if value >= 64 { 1.0 } else { 0.0 };
        }
        if value >= 127 {
            return self.max;
        }
        self.min + (self.max - self.min) * value as f32 / 128.0
    }
}

/// Collects control declarations from a DSP unit.
#[derive(Clone, Debug, Default)]
pub struct Interface {
    controls: Vec<ControlDecl>,
}

impl Interface {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, decl: ControlDecl) -> &mut ControlDecl {
        self.controls.push(decl);
        let last = self.controls.len() - 1;
        &mut self.controls[last]
    }

    pub fn button(&mut self, label: &str) -> &mut ControlDecl {
        self.push(ControlDecl::new(label, ControlKind::Button, 0.0, 0.0, 1.0, 1.0))
    }

    pub fn checkbox(&mut self, label: &str) -> &mut ControlDecl {
        self.push(ControlDecl::new(
            label,
            ControlKind::CheckButton,
            0.0,
            0.0,
            1.0,
            1.0,
        ))
    }

    pub fn slider(
        &mut self,
        label: &str,
        init: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> &mut ControlDecl {
        self.push(ControlDecl::new(label, ControlKind::Slider, init, min, max, step))
    }

    pub fn num_entry(
        &mut self,
        label: &str,
        init: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> &mut ControlDecl {
        self.push(ControlDecl::new(
            label,
            ControlKind::NumEntry,
            init,
            min,
            max,
            step,
        ))
    }

    /// Output meter. Its initial value is `min`.
    pub fn bargraph(&mut self, label: &str, min: f32, max: f32) -> &mut ControlDecl {
        self.push(ControlDecl::new(label, ControlKind::Bargraph, min, min, max, 0.0))
    }

    pub fn controls(&self) -> &[ControlDecl] {
        &self.controls
    }

    pub fn into_controls(self) -> Vec<ControlDecl> {
        self.controls
    }
}
