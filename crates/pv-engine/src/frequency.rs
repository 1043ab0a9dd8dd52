//! Pitch-to-frequency conversion.

/// MIDI note of the reference pitch.
pub const A4_NOTE: f32 = 69.0;

/// Frequency of the reference pitch in Hz.
pub const A4_FREQ: f32 = 440.0;

/// Convert a fractional MIDI pitch to Hz in 12-tone equal temperament.
///
/// `pitch_to_freq(69.0)` is exactly 440.0 since `2^0` is exact.
pub fn pitch_to_freq(pitch: f32) -> f32 {
    A4_FREQ * libm::exp2f((pitch - A4_NOTE) / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_is_exact() {
        assert_eq!(pitch_to_freq(69.0), 440.0);
    }

    #[test]
    fn octaves_double() {
        assert!((pitch_to_freq(81.0) - 880.0).abs() < 1e-3);
        assert!((pitch_to_freq(57.0) - 220.0).abs() < 1e-3);
    }

    #[test]
    fn middle_c() {
        assert!((pitch_to_freq(60.0) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn fractional_pitch_is_between_neighbours() {
        let lo = pitch_to_freq(60.0);
        let hi = pitch_to_freq(61.0);
        let mid = pitch_to_freq(60.5);
        assert!(lo < mid && mid < hi);
    }
}
