//! Tone and noise oscillators
//!
//! Both render one byte per chip tick for a [`Block`] and keep their phase
//! across calls, so any sequence of block sizes (including empty blocks)
//! produces the same gap-free stream as one long call.

use super::lfsr::Lfsr;
use crate::block::{Block, BlockCache};

/// Square wave generator for one channel
///
/// A fresh oscillator outputs 1 for the first full half-period. The period
/// is only sampled when a half-period expires, so a mid-flight period write
/// takes effect at the next edge. Periods below `min_period` hold the
/// output at 1, as a disabled tone would.
#[derive(Debug, Clone)]
pub struct ToneOsc {
    /// Ticks per period register unit
    scale: u32,
    /// Smallest period register value rendered as a tone (frequency clamp)
    min_period: u32,
    value: u8,
    /// Ticks left in the current half-period
    remaining: u32,
    cache: BlockCache<u8>,
}

impl ToneOsc {
    /// Create a tone oscillator
    pub fn new(scale: u32, min_period: u32) -> Self {
        ToneOsc {
            scale: scale.max(1),
            min_period: min_period.max(1),
            value: 0,
            remaining: 0,
            cache: BlockCache::new(),
        }
    }

    /// Half-period in ticks for a period register value
    #[inline]
    pub fn half_period_ticks(&self, period: u16) -> u32 {
        (period as u32).max(1) * self.scale
    }

    /// Whether a tone at `period` would be above the output Nyquist and is held
    #[inline]
    pub fn is_clamped(&self, period: u16) -> bool {
        ((period as u32).max(1)) < self.min_period
    }

    /// Render `block` using the current period register value
    pub fn render(&mut self, block: &Block, period: u16) -> &[u8] {
        let half_period = self.half_period_ticks(period);
        let clamped = self.is_clamped(period);
        let ToneOsc {
            value,
            remaining,
            cache,
            ..
        } = self;
        cache.get_or_render(block, |buf| {
            if clamped {
                // Resumes with a falling edge once the period is audible again
                *value = 1;
                *remaining = 0;
                buf.fill(1);
                return;
            }
            let mut i = 0;
            while i < buf.len() {
                if *remaining == 0 {
                    *value ^= 1;
                    *remaining = half_period;
                }
                let run = (*remaining as usize).min(buf.len() - i);
                buf[i..i + run].fill(*value);
                i += run;
                *remaining -= run as u32;
            }
        })
    }

    /// Output level at the end of the last rendered block
    pub fn value(&self) -> u8 {
        self.value
    }
}

/// Noise source shared by all channels
///
/// Each step advances the LFSR once and holds its output. The step length
/// is compared against the elapsed ticks continuously, so a period write
/// applies immediately rather than at the next step.
#[derive(Debug, Clone)]
pub struct NoiseOsc {
    scale: u32,
    lfsr: Lfsr,
    value: u8,
    /// Ticks since the last step
    elapsed: u32,
    cache: BlockCache<u8>,
}

impl NoiseOsc {
    /// Create a noise oscillator with a fresh LFSR
    pub fn new(scale: u32) -> Self {
        NoiseOsc {
            scale: scale.max(1),
            lfsr: Lfsr::new(),
            value: 0,
            // First tick always steps
            elapsed: u32::MAX,
            cache: BlockCache::new(),
        }
    }

    /// Step length in ticks for a noise period register value
    #[inline]
    pub fn step_ticks(&self, period: u8) -> u32 {
        (period as u32).max(1) * 2 * self.scale
    }

    /// Render `block` using the current noise period register value
    pub fn render(&mut self, block: &Block, period: u8) -> &[u8] {
        let step = self.step_ticks(period);
        let NoiseOsc {
            lfsr,
            value,
            elapsed,
            cache,
            ..
        } = self;
        cache.get_or_render(block, |buf| {
            let mut i = 0;
            while i < buf.len() {
                if *elapsed >= step {
                    *value = lfsr.next_bit();
                    *elapsed = 0;
                }
                let run = ((step - *elapsed) as usize).min(buf.len() - i);
                buf[i..i + run].fill(*value);
                i += run;
                *elapsed += run as u32;
            }
        })
    }
}
