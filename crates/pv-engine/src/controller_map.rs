//! MIDI CC number to input port lookup.

use pv_ir::{ControlDecl, META_MIDI};
use tracing::debug;

/// Maps each of the 128 controller numbers to at most one input port.
///
/// Built once at construction and never changed afterwards.
#[derive(Clone, Debug)]
pub struct ControllerMap {
    ports: [Option<usize>; 128],
}

impl Default for ControllerMap {
    fn default() -> Self {
        Self { ports: [None; 128] }
    }
}

impl ControllerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `cc` to `port`. The first binding for a controller wins; later
    /// ones are ignored and `false` is returned.
    pub fn register(&mut self, cc: u8, port: usize) -> bool {
        let Some(slot) = self.ports.get_mut(cc as usize) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(port);
        true
    }

    /// Build from input port declarations, reading each one's
    /// `midi: ctrl N` metadata.
    pub fn from_ports<'a>(ports: impl IntoIterator<Item = &'a ControlDecl>) -> Self {
        let mut map = Self::new();
        for (port, decl) in ports.into_iter().enumerate() {
            let Some(cc) = decl.metadata(META_MIDI).and_then(parse_ctrl_meta) else {
                continue;
            };
            if map.register(cc, port) {
                debug!(cc, port, label = %decl.label, "mapped controller");
            } else {
                debug!(cc, port, label = %decl.label, "controller already mapped, ignoring");
            }
        }
        map
    }

    pub fn lookup(&self, cc: u8) -> Option<usize> {
        self.ports.get(cc as usize).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.iter().all(Option::is_none)
    }
}

/// Parse a `"ctrl N"` metadata value into a controller number.
pub fn parse_ctrl_meta(value: &str) -> Option<u8> {
    let rest = value.trim().strip_prefix("ctrl")?;
    let n: u32 = rest.trim().parse().ok()?;
    u8::try_from(n).ok().filter(|&cc| cc < 128)
}
