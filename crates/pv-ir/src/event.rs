//! Decoded MIDI input messages.

/// Number of MIDI channels.
pub const NUM_CHANNELS: usize = 16;

/// Number of MIDI note numbers.
pub const NUM_NOTES: usize = 128;

/// Raw 14-bit pitch bend value meaning "no bend".
pub const PITCH_BEND_CENTER: u16 = 0x2000;

/// A MIDI message the engine understands.
///
/// Everything the host can deliver is folded into this closed set; raw bytes
/// outside it decode to `None` and are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage<'a> {
    /// Note on. A velocity of zero is a note off by MIDI convention; the
    /// variant keeps it as sent and leaves that decision to the interpreter.
    NoteOn { channel: u8, note: u8, velocity: u8 },
    /// Note off.
    NoteOff { channel: u8, note: u8, velocity: u8 },
    /// Control change.
    ControlChange {
        channel: u8,
        controller: u8,
        value: u8,
    },
    /// Pitch bend, 14-bit value assembled from LSB then MSB.
    PitchBend { channel: u8, value: u16 },
    /// System exclusive dump, as delivered (may or may not include F0/F7).
    SysEx(&'a [u8]),
}

impl<'a> MidiMessage<'a> {
    /// Decode a raw MIDI message.
    ///
    /// Returns `None` for status bytes the engine does not handle and for
    /// messages with missing or malformed data bytes.
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        if status == 0xF0 {
            return Some(Self::SysEx(bytes));
        }

        let channel = status & 0x0F;
        let data_byte = |i: usize| data.get(i).copied().filter(|b| b & 0x80 == 0);

        match status & 0xF0 {
            0x80 => Some(Self::NoteOff {
                channel,
                note: data_byte(0)?,
                velocity: data_byte(1)?,
            }),
            0x90 => Some(Self::NoteOn {
                channel,
                note: data_byte(0)?,
                velocity: data_byte(1)?,
            }),
            0xB0 => Some(Self::ControlChange {
                channel,
                controller: data_byte(0)?,
                value: data_byte(1)?,
            }),
            0xE0 => {
                let lsb = data_byte(0)? as u16;
                let msb = data_byte(1)? as u16;
                Some(Self::PitchBend {
                    channel,
                    value: lsb | (msb << 7),
                })
            }
            _ => None,
        }
    }

    /// Channel of a channel-voice message.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            Self::SysEx(_) => None,
        }
    }
}
