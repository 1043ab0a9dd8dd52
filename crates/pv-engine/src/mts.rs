//! MIDI Tuning Standard scale/octave frames.
//!
//! Wire format, with the surrounding `F0`/`F7` optional:
//!
//! ```text
//! F0 [7E|7F] <device> 08 [08|09] <ch mask: 3 bytes> <12 values> F7
//! ```
//!
//! Sub-id2 `08` carries one byte per pitch class, `(v - 64) / 100`
//! semitones. Sub-id2 `09` carries a big-endian 14-bit pair per pitch class,
//! `(v - 8192) / 8192` semitones. `7F` is the realtime universal id.

const UNIVERSAL_NON_REALTIME: u8 = 0x7E;
const UNIVERSAL_REALTIME: u8 = 0x7F;
const SUB_ID_TUNING: u8 = 0x08;
const SUB_ID_OCTAVE_1BYTE: u8 = 0x08;
const SUB_ID_OCTAVE_2BYTE: u8 = 0x09;

/// Payload length (no F0/F7) of a one-byte octave tuning frame.
pub const PAYLOAD_LEN_1BYTE: usize = 19;
/// Payload length (no F0/F7) of a two-byte octave tuning frame.
pub const PAYLOAD_LEN_2BYTE: usize = 31;

const HEADER_LEN: usize = 7;

/// A decoded octave tuning frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MtsFrame {
    /// Apply to sounding voices immediately.
    pub realtime: bool,
    /// Bit `n` selects MIDI channel `n`.
    pub channels: u16,
    /// Semitone offset per pitch class, C first.
    pub offsets: [f32; 12],
}

impl MtsFrame {
    /// Decode a frame, or `None` if the bytes are not a scale/octave tuning
    /// message of the expected length.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.strip_prefix(&[0xF0]).unwrap_or(bytes);
        let payload = bytes.strip_suffix(&[0xF7]).unwrap_or(bytes);

        if payload.len() < HEADER_LEN || payload.iter().any(|&b| b & 0x80 != 0) {
            return None;
        }
        let realtime = match payload[0] {
            UNIVERSAL_NON_REALTIME => false,
            UNIVERSAL_REALTIME => true,
            _ => return None,
        };
        if payload[2] != SUB_ID_TUNING {
            return None;
        }

        let mask = (payload[4] as u32) << 14 | (payload[5] as u32) << 7 | payload[6] as u32;
        let values = &payload[HEADER_LEN..];
        let mut offsets = [0.0f32; 12];

        match (payload[3], payload.len()) {
            (SUB_ID_OCTAVE_1BYTE, PAYLOAD_LEN_1BYTE) => {
                for (offset, &v) in offsets.iter_mut().zip(values) {
                    *offset = (v as f32 - 64.0) / 100.0;
                }
            }
            (SUB_ID_OCTAVE_2BYTE, PAYLOAD_LEN_2BYTE) => {
                for (offset, pair) in offsets.iter_mut().zip(values.chunks_exact(2)) {
                    let v = (pair[0] as u16) << 7 | pair[1] as u16;
                    *offset = (v as f32 - 8192.0) / 8192.0;
                }
            }
            _ => return None,
        }

        Some(Self {
            realtime,
            channels: (mask & 0xFFFF) as u16,
            offsets,
        })
    }

    /// Whether the frame applies to `channel`.
    pub fn affects(&self, channel: usize) -> bool {
        channel < 16 && self.channels & (1 << channel) != 0
    }
}
