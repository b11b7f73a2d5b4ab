//! Derived registers
//!
//! Values such as "tone period of channel B" are pure functions of one or
//! two raw registers. Each [`DerivedRegister`] remembers the upstream
//! versions it was computed from and recomputes on read only when one of
//! them moved. Propagation is pull-based: nothing happens on write.

use std::fmt;

use super::mixer::MixerFlags;
use super::registers::{Register, RegisterBank};

/// Most upstream registers any derived value depends on
const MAX_INPUTS: usize = 2;

/// A cached pure function of upstream registers
#[derive(Clone)]
pub struct DerivedRegister<T: Copy> {
    inputs: &'static [u8],
    compute: fn(&[u8]) -> T,
    value: T,
    /// Upstream versions at last compute (or direct write)
    seen: [u64; MAX_INPUTS],
    /// Direct writes made to this register
    own_writes: u64,
    /// Bumped whenever the visible value is recomputed or overridden
    revision: u64,
    valid: bool,
}

impl<T: Copy> DerivedRegister<T> {
    /// Create a derived register over `inputs` (raw addresses).
    pub fn new(inputs: &'static [u8], compute: fn(&[u8]) -> T, initial: T) -> Self {
        debug_assert!(inputs.len() <= MAX_INPUTS);
        DerivedRegister {
            inputs,
            compute,
            value: initial,
            seen: [0; MAX_INPUTS],
            own_writes: 0,
            revision: 0,
            valid: false,
        }
    }

    fn upstream_versions(&self, bank: &RegisterBank) -> [u64; MAX_INPUTS] {
        let mut versions = [0; MAX_INPUTS];
        for (slot, &addr) in versions.iter_mut().zip(self.inputs) {
            *slot = bank.reg(addr).version();
        }
        versions
    }

    /// Current value, recomputed if any upstream register was written.
    pub fn read(&mut self, bank: &RegisterBank) -> T {
        let versions = self.upstream_versions(bank);
        if !self.valid || versions != self.seen {
            let mut values = [0u8; MAX_INPUTS];
            for (slot, &addr) in values.iter_mut().zip(self.inputs) {
                *slot = bank.read(addr);
            }
            self.value = (self.compute)(&values[..self.inputs.len()]);
            self.seen = versions;
            self.revision += 1;
            self.valid = true;
        }
        self.value
    }

    /// Override the value until the next upstream write.
    pub fn write(&mut self, bank: &RegisterBank, value: T) {
        self.value = value;
        self.seen = self.upstream_versions(bank);
        self.own_writes += 1;
        self.revision += 1;
        self.valid = true;
    }

    /// Value together with its revision, recomputing first if stale.
    pub fn read_versioned(&mut self, bank: &RegisterBank) -> (T, u64) {
        let value = self.read(bank);
        (value, self.revision)
    }

    /// Version tuple: upstream versions followed by the own-write count
    pub fn version_tuple(&self) -> ([u64; MAX_INPUTS], u64) {
        (self.seen, self.own_writes)
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for DerivedRegister<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedRegister")
            .field("inputs", &self.inputs)
            .field("value", &self.value)
            .field("revision", &self.revision)
            .finish()
    }
}

fn word12(v: &[u8]) -> u16 {
    (((v[1] & 0x0F) as u16) << 8) | v[0] as u16
}

fn word16(v: &[u8]) -> u16 {
    ((v[1] as u16) << 8) | v[0] as u16
}

fn low5(v: &[u8]) -> u8 {
    v[0] & 0x1F
}

fn low4(v: &[u8]) -> u8 {
    v[0] & 0x0F
}

fn env_mode(v: &[u8]) -> bool {
    v[0] & 0x10 != 0
}

fn tone_a_on(v: &[u8]) -> bool {
    MixerFlags::from_register(v[0]).is_tone_enabled(0)
}
fn tone_b_on(v: &[u8]) -> bool {
    MixerFlags::from_register(v[0]).is_tone_enabled(1)
}
fn tone_c_on(v: &[u8]) -> bool {
    MixerFlags::from_register(v[0]).is_tone_enabled(2)
}
fn noise_a_on(v: &[u8]) -> bool {
    MixerFlags::from_register(v[0]).is_noise_enabled(0)
}
fn noise_b_on(v: &[u8]) -> bool {
    MixerFlags::from_register(v[0]).is_noise_enabled(1)
}
fn noise_c_on(v: &[u8]) -> bool {
    MixerFlags::from_register(v[0]).is_noise_enabled(2)
}

const TONE_INPUTS: [&[u8]; 3] = [&[0x00, 0x01], &[0x02, 0x03], &[0x04, 0x05]];
const AMP_INPUTS: [&[u8]; 3] = [&[0x08], &[0x09], &[0x0A]];
const MIXER_INPUT: &[u8] = &[0x07];
const TONE_FLAGS: [fn(&[u8]) -> bool; 3] = [tone_a_on, tone_b_on, tone_c_on];
const NOISE_FLAGS: [fn(&[u8]) -> bool; 3] = [noise_a_on, noise_b_on, noise_c_on];

/// Per-channel derived values
#[derive(Debug, Clone)]
pub struct ChannelRegisters {
    /// 12-bit tone period
    pub tone_period: DerivedRegister<u16>,
    /// Tone enabled in R7
    pub tone_enabled: DerivedRegister<bool>,
    /// Noise enabled in R7
    pub noise_enabled: DerivedRegister<bool>,
    /// 4-bit fixed level
    pub fixed_level: DerivedRegister<u8>,
    /// Envelope drives the level
    pub env_mode: DerivedRegister<bool>,
}

impl ChannelRegisters {
    fn new(channel: usize) -> Self {
        ChannelRegisters {
            tone_period: DerivedRegister::new(TONE_INPUTS[channel], word12, 0),
            tone_enabled: DerivedRegister::new(MIXER_INPUT, TONE_FLAGS[channel], true),
            noise_enabled: DerivedRegister::new(MIXER_INPUT, NOISE_FLAGS[channel], true),
            fixed_level: DerivedRegister::new(AMP_INPUTS[channel], low4, 0),
            env_mode: DerivedRegister::new(AMP_INPUTS[channel], env_mode, false),
        }
    }
}

/// Raw registers plus every value the oscillators and mixer pull from them
#[derive(Debug, Clone)]
pub struct ChipRegisters {
    bank: RegisterBank,
    /// Channel A, B, C
    pub channels: [ChannelRegisters; 3],
    /// 5-bit noise period
    pub noise_period: DerivedRegister<u8>,
    /// 16-bit envelope period
    pub env_period: DerivedRegister<u16>,
    /// 4-bit envelope shape; its revision restarts the envelope
    pub env_shape: DerivedRegister<u8>,
}

impl ChipRegisters {
    /// Power-on state: all zero except R7 = 0x3F (everything disabled)
    pub fn new() -> Self {
        let mut regs = ChipRegisters {
            bank: RegisterBank::new(),
            channels: [
                ChannelRegisters::new(0),
                ChannelRegisters::new(1),
                ChannelRegisters::new(2),
            ],
            noise_period: DerivedRegister::new(&[0x06], low5, 0),
            env_period: DerivedRegister::new(&[0x0B, 0x0C], word16, 0),
            env_shape: DerivedRegister::new(&[0x0D], low4, 0),
        };
        regs.bank.write(Register::MixerCtrl.addr(), 0x3F);
        regs
    }

    /// Raw register bank
    pub fn bank(&self) -> &RegisterBank {
        &self.bank
    }

    /// Raw register write
    pub fn write(&mut self, addr: u8, value: u8) {
        self.bank.write(addr, value);
    }

    /// Raw register read
    pub fn read(&self, addr: u8) -> u8 {
        self.bank.read(addr)
    }

    /// Tone period of a channel
    pub fn tone_period(&mut self, channel: usize) -> u16 {
        self.channels[channel].tone_period.read(&self.bank)
    }

    /// Tone enable flag of a channel
    pub fn tone_enabled(&mut self, channel: usize) -> bool {
        self.channels[channel].tone_enabled.read(&self.bank)
    }

    /// Noise enable flag of a channel
    pub fn noise_enabled(&mut self, channel: usize) -> bool {
        self.channels[channel].noise_enabled.read(&self.bank)
    }

    /// Fixed 4-bit level of a channel
    pub fn fixed_level(&mut self, channel: usize) -> u8 {
        self.channels[channel].fixed_level.read(&self.bank)
    }

    /// Whether the envelope drives a channel's level
    pub fn env_mode(&mut self, channel: usize) -> bool {
        self.channels[channel].env_mode.read(&self.bank)
    }

    /// Noise period
    pub fn noise_period(&mut self) -> u8 {
        self.noise_period.read(&self.bank)
    }

    /// Envelope period
    pub fn env_period(&mut self) -> u16 {
        self.env_period.read(&self.bank)
    }

    /// Envelope shape and its revision
    pub fn env_shape(&mut self) -> (u8, u64) {
        self.env_shape.read_versioned(&self.bank)
    }

    /// Override a channel's tone period
    pub fn set_tone_period(&mut self, channel: usize, period: u16) {
        self.channels[channel]
            .tone_period
            .write(&self.bank, period & 0x0FFF);
    }

    /// Override a channel's tone enable flag
    pub fn set_tone_enabled(&mut self, channel: usize, enabled: bool) {
        self.channels[channel].tone_enabled.write(&self.bank, enabled);
    }

    /// Override a channel's noise enable flag
    pub fn set_noise_enabled(&mut self, channel: usize, enabled: bool) {
        self.channels[channel]
            .noise_enabled
            .write(&self.bank, enabled);
    }

    /// Override a channel's fixed level
    pub fn set_fixed_level(&mut self, channel: usize, level: u8) {
        self.channels[channel]
            .fixed_level
            .write(&self.bank, level & 0x0F);
    }

    /// Override whether the envelope drives a channel
    pub fn set_env_mode(&mut self, channel: usize, enabled: bool) {
        self.channels[channel].env_mode.write(&self.bank, enabled);
    }

    /// Override the noise period
    pub fn set_noise_period(&mut self, period: u8) {
        self.noise_period.write(&self.bank, period & 0x1F);
    }

    /// Override the envelope period
    pub fn set_env_period(&mut self, period: u16) {
        self.env_period.write(&self.bank, period);
    }

    /// Override the envelope shape (restarts the envelope)
    pub fn set_env_shape(&mut self, shape: u8) {
        self.env_shape.write(&self.bank, shape & 0x0F);
    }
}

impl Default for ChipRegisters {
    fn default() -> Self {
        Self::new()
    }
}
