//! 17-bit noise LFSR
//!
//! Galois shift register with taps at x^17 and x^14, matching the YM2149
//! noise source. The raw feedback bit is inverted on output: a raw 1 drives
//! the channel to amplitude 0.

/// Tap mask for taps 17 and 14 (bits 16 and 13)
pub const LFSR_TAPS: u32 = 0x12000;

/// Seed used by the chip at power-on
pub const LFSR_SEED: u32 = 1;

/// Sequence length of a maximal 17-bit register
pub const LFSR_PERIOD: usize = (1 << 17) - 1;

/// Noise shift register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lfsr {
    x: u32,
}

impl Lfsr {
    /// Fresh register at the power-on seed
    pub fn new() -> Self {
        Lfsr { x: LFSR_SEED }
    }

    /// Advance one step and return the output bit (0 or 1)
    #[inline]
    pub fn next_bit(&mut self) -> u8 {
        let bit = self.x & 1;
        self.x >>= 1;
        if bit != 0 {
            self.x ^= LFSR_TAPS;
        }
        (1 - bit) as u8
    }

    /// Raw register state
    pub fn state(&self) -> u32 {
        self.x
    }
}

impl Default for Lfsr {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Lfsr {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_bit())
    }
}
