//! Logarithmic DAC
//!
//! Each 5-bit level is 1.5 dB above the previous one (a factor of
//! 2^(1/4)), with level 31 at full per-channel amplitude.

use super::envelope::ENV_MAX_LEVEL;

/// Number of DAC levels
pub const DAC_LEVELS: usize = ENV_MAX_LEVEL as usize + 1;

/// Output headroom: -3 dBFS
pub fn headroom() -> f32 {
    10f32.powf(-3.0 / 20.0)
}

/// Level to amplitude table for one channel
#[derive(Debug, Clone)]
pub struct Dac {
    table: [f32; DAC_LEVELS],
    max_amplitude: f32,
}

impl Dac {
    /// Create a DAC whose full-scale output is shared by `ampshare` channels.
    ///
    /// With every channel at level 31 the mixed signal peaks at
    /// `+headroom`; with every channel silent it sits near `-headroom`.
    pub fn new(ampshare: usize) -> Self {
        let max_amplitude = 2.0 * headroom() / ampshare.max(1) as f32;
        let mut table = [0f32; DAC_LEVELS];
        for (level, amp) in table.iter_mut().enumerate() {
            let exponent = (level as f32 - ENV_MAX_LEVEL as f32) / 4.0;
            *amp = 2f32.powf(exponent) * max_amplitude;
        }
        Dac {
            table,
            max_amplitude,
        }
    }

    /// Amplitude of a 5-bit level
    #[inline]
    pub fn amplitude(&self, level: u8) -> f32 {
        self.table[(level as usize).min(DAC_LEVELS - 1)]
    }

    /// Amplitude at level 31
    pub fn max_amplitude(&self) -> f32 {
        self.max_amplitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monotonic() {
        let dac = Dac::new(3);
        for level in 1..DAC_LEVELS as u8 {
            assert!(dac.amplitude(level) > dac.amplitude(level - 1));
        }
    }

    #[test]
    fn test_full_scale_is_headroom() {
        let dac = Dac::new(3);
        let total = 3.0 * dac.amplitude(31);
        assert_relative_eq!(total, 2.0 * headroom(), epsilon = 1e-6);
        assert_relative_eq!(headroom(), 0.707_945_8, epsilon = 1e-6);
    }

    #[test]
    fn test_quarter_octave_steps() {
        let dac = Dac::new(1);
        assert_relative_eq!(dac.amplitude(27) * 2.0, dac.amplitude(31), epsilon = 1e-6);
        assert_relative_eq!(
            dac.amplitude(30) / dac.amplitude(29),
            2f32.powf(0.25),
            epsilon = 1e-5
        );
    }
}
