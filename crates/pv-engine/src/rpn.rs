//! Registered Parameter Number selection and data entry.

/// Selector value meaning "no parameter selected" (RPN null is 7F/7F).
pub const RPN_NULL: u8 = 0x7F;

/// Controller numbers of the RPN protocol.
pub mod cc {
    pub const DATA_ENTRY_MSB: u8 = 6;
    pub const DATA_ENTRY_LSB: u8 = 38;
    pub const DATA_INCREMENT: u8 = 96;
    pub const DATA_DECREMENT: u8 = 97;
    pub const RPN_LSB: u8 = 100;
    pub const RPN_MSB: u8 = 101;
    pub const ALL_SOUND_OFF: u8 = 120;
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// The parameters this engine responds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpnTarget {
    PitchBendRange,
    FineTuning,
    CoarseTuning,
}

/// Per-channel RPN protocol state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpnState {
    pub msb: u8,
    pub lsb: u8,
    pub data_msb: u8,
    pub data_lsb: u8,
}

impl Default for RpnState {
    fn default() -> Self {
        Self {
            msb: RPN_NULL,
            lsb: RPN_NULL,
            data_msb: 0,
            data_lsb: 0,
        }
    }
}

impl RpnState {
    /// Forget the selection and the data bytes.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The selected parameter, if it is one the engine supports.
    pub fn target(&self) -> Option<RpnTarget> {
        match (self.msb, self.lsb) {
            (0, 0) => Some(RpnTarget::PitchBendRange),
            (0, 1) => Some(RpnTarget::FineTuning),
            (0, 2) => Some(RpnTarget::CoarseTuning),
            _ => None,
        }
    }

    /// Coarse tuning only uses the MSB, so steps go there. Everything else
    /// steps the LSB.
    fn steps_msb(&self) -> bool {
        self.target() == Some(RpnTarget::CoarseTuning)
    }

    pub fn increment(&mut self) {
        let byte = if self.steps_msb() {
            &mut self.data_msb
        } else {
            &mut self.data_lsb
        };
        *byte = byte.saturating_add(1).min(127);
    }

    pub fn decrement(&mut self) {
        let byte = if self.steps_msb() {
            &mut self.data_msb
        } else {
            &mut self.data_lsb
        };
        *byte = byte.saturating_sub(1);
    }
}
