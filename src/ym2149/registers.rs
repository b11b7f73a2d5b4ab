//! YM2149 Register Definitions
//!
//! Defines the 16 registers (R0-R13, R14-R15 for I/O ports) that control
//! the PSG chip, and the versioned register bank every derived value is
//! computed from.

use std::fmt;

/// Number of addressable registers
pub const REGISTER_COUNT: usize = 16;

/// Valid bits per register; writes are masked on the way in
pub const REG_MASK: [u8; REGISTER_COUNT] = [
    0xFF, 0x0F, 0xFF, 0x0F, 0xFF, 0x0F, // tone periods
    0x1F, // noise period
    0xFF, // mixer
    0x1F, 0x1F, 0x1F, // amplitudes
    0xFF, 0xFF, // envelope period
    0x0F, // envelope shape
    0xFF, 0xFF, // I/O ports
];

/// YM2149 Register Address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    /// Channel A Frequency (low byte) - R0
    ChAFreqLo = 0x00,
    /// Channel A Frequency (high byte) - R1
    ChAFreqHi = 0x01,
    /// Channel B Frequency (low byte) - R2
    ChBFreqLo = 0x02,
    /// Channel B Frequency (high byte) - R3
    ChBFreqHi = 0x03,
    /// Channel C Frequency (low byte) - R4
    ChCFreqLo = 0x04,
    /// Channel C Frequency (high byte) - R5
    ChCFreqHi = 0x05,
    /// Noise Frequency Control - R6
    NoiseFreq = 0x06,
    /// Mixer Control (enable/disable channels and noise) - R7
    MixerCtrl = 0x07,
    /// Channel A Amplitude - R8
    ChAAmplitude = 0x08,
    /// Channel B Amplitude - R9
    ChBAmplitude = 0x09,
    /// Channel C Amplitude - R10
    ChCAmplitude = 0x0A,
    /// Envelope Frequency (low byte) - R11
    EnvelopeFreqLo = 0x0B,
    /// Envelope Frequency (high byte) - R12
    EnvelopeFreqHi = 0x0C,
    /// Envelope Shape - R13
    EnvelopeShape = 0x0D,
    /// I/O Port A - R14
    PortA = 0x0E,
    /// I/O Port B - R15
    PortB = 0x0F,
}

impl Register {
    /// Convert a raw register number to a Register (wraps at 16)
    pub fn from_addr(addr: u8) -> Self {
        match addr & 0x0F {
            0x00 => Register::ChAFreqLo,
            0x01 => Register::ChAFreqHi,
            0x02 => Register::ChBFreqLo,
            0x03 => Register::ChBFreqHi,
            0x04 => Register::ChCFreqLo,
            0x05 => Register::ChCFreqHi,
            0x06 => Register::NoiseFreq,
            0x07 => Register::MixerCtrl,
            0x08 => Register::ChAAmplitude,
            0x09 => Register::ChBAmplitude,
            0x0A => Register::ChCAmplitude,
            0x0B => Register::EnvelopeFreqLo,
            0x0C => Register::EnvelopeFreqHi,
            0x0D => Register::EnvelopeShape,
            0x0E => Register::PortA,
            _ => Register::PortB,
        }
    }

    /// Get the register address value
    pub fn addr(&self) -> u8 {
        *self as u8
    }

    /// Tone period low byte register of a channel
    pub fn tone_lo(channel: usize) -> Self {
        Self::from_addr((channel * 2) as u8)
    }

    /// Amplitude register of a channel
    pub fn amplitude(channel: usize) -> Self {
        Self::from_addr(0x08 + channel as u8)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::ChAFreqLo => write!(f, "R0 (Channel A Frequency Low)"),
            Register::ChAFreqHi => write!(f, "R1 (Channel A Frequency High)"),
            Register::ChBFreqLo => write!(f, "R2 (Channel B Frequency Low)"),
            Register::ChBFreqHi => write!(f, "R3 (Channel B Frequency High)"),
            Register::ChCFreqLo => write!(f, "R4 (Channel C Frequency Low)"),
            Register::ChCFreqHi => write!(f, "R5 (Channel C Frequency High)"),
            Register::NoiseFreq => write!(f, "R6 (Noise Frequency)"),
            Register::MixerCtrl => write!(f, "R7 (Mixer Control)"),
            Register::ChAAmplitude => write!(f, "R8 (Channel A Amplitude)"),
            Register::ChBAmplitude => write!(f, "R9 (Channel B Amplitude)"),
            Register::ChCAmplitude => write!(f, "R10 (Channel C Amplitude)"),
            Register::EnvelopeFreqLo => write!(f, "R11 (Envelope Frequency Low)"),
            Register::EnvelopeFreqHi => write!(f, "R12 (Envelope Frequency High)"),
            Register::EnvelopeShape => write!(f, "R13 (Envelope Shape)"),
            Register::PortA => write!(f, "R14 (I/O Port A)"),
            Register::PortB => write!(f, "R15 (I/O Port B)"),
        }
    }
}

/// A register value with its write version.
///
/// The version increases on every write, including writes of the same
/// value, so consumers can tell "written again" from "unchanged".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reg {
    value: u8,
    version: u64,
}

impl Reg {
    /// Value and version as one consistent pair
    #[inline]
    pub fn get(&self) -> (u8, u64) {
        (self.value, self.version)
    }

    /// Current value
    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Current version
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    fn set(&mut self, value: u8) {
        self.value = value;
        self.version += 1;
    }
}

/// Raw register bank (16 versioned bytes)
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterBank {
    regs: [Reg; REGISTER_COUNT],
}

impl RegisterBank {
    /// Create a new register bank with all values set to 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a register value
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.regs[(addr & 0x0F) as usize].value()
    }

    /// Read a register with its version
    #[inline]
    pub fn reg(&self, addr: u8) -> Reg {
        self.regs[(addr & 0x0F) as usize]
    }

    /// Write a register value (masked to the register's valid bits)
    pub fn write(&mut self, addr: u8, value: u8) {
        let index = (addr & 0x0F) as usize;
        self.regs[index].set(value & REG_MASK[index]);
    }

    /// All register values
    pub fn values(&self) -> [u8; REGISTER_COUNT] {
        let mut out = [0u8; REGISTER_COUNT];
        for (slot, reg) in out.iter_mut().zip(self.regs.iter()) {
            *slot = reg.value();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_conversion() {
        assert_eq!(Register::from_addr(0x00), Register::ChAFreqLo);
        assert_eq!(Register::from_addr(0x0D), Register::EnvelopeShape);
        assert_eq!(Register::from_addr(0x0F), Register::PortB);
        assert_eq!(Register::from_addr(0x10), Register::ChAFreqLo); // Should wrap
        assert_eq!(Register::tone_lo(2), Register::ChCFreqLo);
        assert_eq!(Register::amplitude(1), Register::ChBAmplitude);
    }

    #[test]
    fn test_register_bank() {
        let mut bank = RegisterBank::new();
        assert_eq!(bank.read(0x00), 0);

        bank.write(0x00, 0x42);
        assert_eq!(bank.read(0x00), 0x42);
    }

    #[test]
    fn test_writes_are_masked() {
        let mut bank = RegisterBank::new();
        bank.write(Register::ChAFreqHi.addr(), 0xFF);
        bank.write(Register::NoiseFreq.addr(), 0xFF);
        bank.write(Register::EnvelopeShape.addr(), 0xFF);
        assert_eq!(bank.read(0x01), 0x0F);
        assert_eq!(bank.read(0x06), 0x1F);
        assert_eq!(bank.read(0x0D), 0x0F);
    }

    #[test]
    fn test_version_bumps_on_same_value() {
        let mut bank = RegisterBank::new();
        bank.write(0x0D, 0x0A);
        let (value, first) = bank.reg(0x0D).get();
        bank.write(0x0D, 0x0A);
        let (again, second) = bank.reg(0x0D).get();
        assert_eq!(value, again);
        assert!(second > first);
    }
}
