//! YM2149 Output Mixer
//!
//! Combines per-channel tone and noise bits with the mixer control register
//! (R7), picks each channel's level, and sums the DAC outputs into the
//! naive composite signal.
//!
//! Signal path per tick and channel:
//! - BinMix: tone/noise AND-combination gated by the R7 enable flags
//! - Level: fixed `2L+1` or envelope level, multiplied by the BinMix bit
//! - DAC: level to amplitude, summed on top of a `-headroom` bias

use bitflags::bitflags;

use super::dac::{headroom, Dac};
use crate::block::{Block, BlockCache};
use crate::config::CHANNELS_PER_PSG;

bitflags! {
    /// Mixer Control Register (R7) bitflags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MixerFlags: u8 {
        /// Channel A tone enable (1 = disable, 0 = enable)
        const CH_A_TONE = 0x01;
        /// Channel B tone enable
        const CH_B_TONE = 0x02;
        /// Channel C tone enable
        const CH_C_TONE = 0x04;
        /// Channel A noise enable (1 = disable, 0 = enable)
        const CH_A_NOISE = 0x08;
        /// Channel B noise enable
        const CH_B_NOISE = 0x10;
        /// Channel C noise enable
        const CH_C_NOISE = 0x20;
    }
}

impl MixerFlags {
    /// Create mixer flags from raw register value
    pub fn from_register(value: u8) -> Self {
        MixerFlags::from_bits_truncate(value)
    }

    /// Check if a channel's tone is enabled
    pub fn is_tone_enabled(&self, channel: usize) -> bool {
        !self.contains(MixerFlags::from_bits_truncate(0x01 << channel))
    }

    /// Check if a channel's noise is enabled
    pub fn is_noise_enabled(&self, channel: usize) -> bool {
        !self.contains(MixerFlags::from_bits_truncate(0x08 << channel))
    }
}

/// Binary combination of one tick's tone and noise bits.
///
/// A channel with neither source enabled idles high.
#[inline]
pub fn binmix(tone: u8, noise: u8, tone_enabled: bool, noise_enabled: bool) -> u8 {
    match (tone_enabled, noise_enabled) {
        (true, true) => tone & noise,
        (true, false) => tone,
        (false, true) => noise,
        (false, false) => 1,
    }
}

/// Per-channel inputs to the level stage for one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Tone enabled in R7
    pub tone_enabled: bool,
    /// Noise enabled in R7
    pub noise_enabled: bool,
    /// Envelope drives the level
    pub env_mode: bool,
    /// 4-bit fixed level
    pub fixed_level: u8,
}

impl ChannelSettings {
    /// Fixed level promoted to 5 bits (4-bit zero maps to one)
    #[inline]
    pub fn fixed_level5(&self) -> u8 {
        2 * (self.fixed_level & 0x0F) + 1
    }

    /// 5-bit level for one tick
    #[inline]
    pub fn level(&self, bit: u8, env_level: u8) -> u8 {
        let level = if self.env_mode {
            env_level
        } else {
            self.fixed_level5()
        };
        level * bit
    }
}

/// Summing bus handed to the mix closure for one block
pub struct MixBus<'a> {
    out: &'a mut [f32],
    dac: &'a Dac,
    muted: &'a [bool; CHANNELS_PER_PSG],
}

impl MixBus<'_> {
    /// Add one channel's DAC output to the bus
    pub fn add_channel(
        &mut self,
        channel: usize,
        tone: &[u8],
        noise: &[u8],
        env: &[u8],
        settings: &ChannelSettings,
    ) {
        if self.muted.get(channel).copied().unwrap_or(true) {
            return;
        }
        let ticks = self.out.iter_mut().zip(tone).zip(noise).zip(env);
        for (((out, &t), &n), &e) in ticks {
            let bit = binmix(t, n, settings.tone_enabled, settings.noise_enabled);
            *out += self.dac.amplitude(settings.level(bit, e));
        }
    }

    /// Number of ticks on the bus
    pub fn len(&self) -> usize {
        self.out.len()
    }

    /// Whether the bus is empty
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }
}

/// Audio Mixer - Combines all channels
///
/// The output buffer is rebuilt from the bias on every new block, so
/// nothing leaks from one block into the next.
#[derive(Debug, Clone)]
pub struct Mixer {
    dac: Dac,
    bias: f32,
    muted: [bool; CHANNELS_PER_PSG],
    cache: BlockCache<f32>,
}

impl Mixer {
    /// Create a new mixer for `ampshare` channels
    pub fn new(ampshare: usize) -> Self {
        Mixer {
            dac: Dac::new(ampshare),
            bias: -headroom(),
            muted: [false; CHANNELS_PER_PSG],
            cache: BlockCache::new(),
        }
    }

    /// Mute or unmute a channel
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if let Some(slot) = self.muted.get_mut(channel) {
            *slot = mute;
        }
    }

    /// Check if a channel is muted
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        self.muted.get(channel).copied().unwrap_or(false)
    }

    /// DC bias every block starts from
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// The DAC used for every channel
    pub fn dac(&self) -> &Dac {
        &self.dac
    }

    /// Whether `block` is already mixed
    pub fn is_current(&self, block: &Block) -> bool {
        self.cache.is_current(block)
    }

    /// Mix `block`, calling `mix` to add channels only if it is not cached
    pub fn render<F>(&mut self, block: &Block, mix: F) -> &[f32]
    where
        F: FnOnce(&mut MixBus<'_>),
    {
        let bias = self.bias;
        let dac = &self.dac;
        let muted = &self.muted;
        self.cache.get_or_render(block, |out| {
            out.fill(bias);
            let mut bus = MixBus { out, dac, muted };
            mix(&mut bus);
        })
    }

    /// Last mixed buffer
    pub fn output(&self) -> &[f32] {
        self.cache.last()
    }
}
