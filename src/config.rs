//! Chip geometry and rate configuration
//!
//! Everything that used to be implicit chip geometry (channel count, tick
//! scale, clamp policy) lives in one immutable [`ChipConfig`] that is
//! validated once and handed to every stage at construction.

use serde::{Deserialize, Serialize};

use crate::{Result, Ym2149Error};

/// Standard Atari ST master clock frequency (2 MHz).
pub const ATARI_ST_CLOCK: u32 = 2_000_000;

/// Standard audio sample rate (44.1 kHz CD quality).
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Number of audio channels per YM2149 PSG chip.
pub const CHANNELS_PER_PSG: usize = 3;

/// Native oversampling factor: the chip's fastest counter runs at clock / 8.
pub const NATIVE_OVERSAMPLE: u32 = 8;

/// Narrowest kernel transition band accepted.
///
/// The kernel has about `4 * scale / transition` taps, so this bounds its
/// length (about 200 000 taps at a scale of 500).
pub const MIN_TRANSITION: f64 = 0.01;

/// Parameters of the minBLEP kernel design.
///
/// `cutoff` and `transition` are fractions of the *output* sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelParams {
    /// Centre of the transition band (0.5 = output Nyquist)
    pub cutoff: f64,
    /// Width of the transition band
    pub transition: f64,
    /// Upper bound on sub-sample resolution of the kernel table
    pub max_scale: usize,
}

impl Default for KernelParams {
    fn default() -> Self {
        KernelParams {
            cutoff: 0.475,
            transition: 0.05,
            max_scale: 500,
        }
    }
}

impl KernelParams {
    /// Sub-sample resolution for a naive/output rate pair.
    ///
    /// The exact ratio `naive / gcd(naive, out)` makes every tick land on a
    /// table row; it is capped at `max_scale` to bound the table size.
    pub fn scale_for(&self, naive_rate: u64, out_rate: u64) -> usize {
        let exact = naive_rate / gcd(naive_rate, out_rate);
        (exact as usize).clamp(1, self.max_scale.max(1))
    }

    fn validate(&self) -> Result<()> {
        if !(self.cutoff > 0.0 && self.cutoff <= 0.5) {
            return Err(Ym2149Error::ConfigError(format!(
                "kernel cutoff {} must be in (0, 0.5]",
                self.cutoff
            )));
        }
        if !(self.transition >= MIN_TRANSITION && self.transition < 1.0) {
            return Err(Ym2149Error::ConfigError(format!(
                "kernel transition {} must be in [{}, 1)",
                self.transition, MIN_TRANSITION
            )));
        }
        if self.max_scale == 0 {
            return Err(Ym2149Error::ConfigError(
                "kernel max_scale must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Immutable chip and output configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChipConfig {
    /// Chip master clock in Hz
    pub clock_hz: u32,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Number of tone channels mixed (1..=3); also the DAC ampshare
    pub channels: usize,
    /// Under-clock divisor; must divide 8 and the clock
    pub underclock: u32,
    /// Hold tones above the output Nyquist at a constant level
    pub freq_clamp: bool,
    /// Minimum number of blocks per second of chip time
    pub min_block_rate: u32,
    /// MinBLEP kernel design
    pub kernel: KernelParams,
}

impl Default for ChipConfig {
    fn default() -> Self {
        ChipConfig {
            clock_hz: ATARI_ST_CLOCK,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: CHANNELS_PER_PSG,
            underclock: 1,
            freq_clamp: true,
            min_block_rate: 100,
            kernel: KernelParams::default(),
        }
    }
}

impl ChipConfig {
    /// Configuration for a given clock and output rate, other fields default
    pub fn with_rates(clock_hz: u32, sample_rate: u32) -> Self {
        ChipConfig {
            clock_hz,
            sample_rate,
            ..Self::default()
        }
    }

    /// Check every constraint; configuration errors are fatal at startup.
    pub fn validate(&self) -> Result<()> {
        if self.clock_hz == 0 || self.sample_rate == 0 {
            return Err(Ym2149Error::ConfigError(
                "clock and sample rate must be non-zero".into(),
            ));
        }
        if self.underclock == 0 || NATIVE_OVERSAMPLE % self.underclock != 0 {
            return Err(Ym2149Error::ConfigError(format!(
                "underclock {} must be a factor of {}",
                self.underclock, NATIVE_OVERSAMPLE
            )));
        }
        if self.clock_hz % self.underclock != 0 {
            return Err(Ym2149Error::ConfigError(format!(
                "clock {} is not divisible by underclock {}",
                self.clock_hz, self.underclock
            )));
        }
        if !(1..=CHANNELS_PER_PSG).contains(&self.channels) {
            return Err(Ym2149Error::ConfigError(format!(
                "channel count {} must be in 1..={}",
                self.channels, CHANNELS_PER_PSG
            )));
        }
        if self.min_block_rate == 0 || self.min_block_rate > self.naive_rate() {
            return Err(Ym2149Error::ConfigError(format!(
                "min_block_rate {} must be in 1..={}",
                self.min_block_rate,
                self.naive_rate()
            )));
        }
        self.kernel.validate()
    }

    /// Rate of the naive signal in ticks per second
    pub fn naive_rate(&self) -> u32 {
        self.clock_hz / self.underclock
    }

    /// Ticks per unit of a tone/envelope period register
    pub fn osc_scale(&self) -> u32 {
        NATIVE_OVERSAMPLE / self.underclock
    }

    /// Largest block the timer may hand out
    pub fn max_block_ticks(&self) -> usize {
        (self.naive_rate() / self.min_block_rate) as usize
    }

    /// Smallest tone period register value rendered as a tone
    pub fn min_tone_period(&self) -> u32 {
        if !self.freq_clamp {
            return 1;
        }
        // clock / (16 P) <= rate / 2  <=>  P >= clock / (8 rate)
        let denom = 8 * self.sample_rate as u64;
        let p = (self.clock_hz as u64).div_ceil(denom);
        p.max(1) as u32
    }

    /// Output amplitude ceiling per channel (DAC ampshare)
    pub fn ampshare(&self) -> usize {
        self.channels
    }
}

pub(crate) fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = ChipConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.naive_rate(), 2_000_000);
        assert_eq!(cfg.osc_scale(), 8);
        assert_eq!(cfg.max_block_ticks(), 20_000);
    }

    #[test]
    fn test_underclock_must_divide_native_oversample() {
        let cfg = ChipConfig {
            underclock: 3,
            ..ChipConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Ym2149Error::ConfigError(_))));
    }

    #[test]
    fn test_clock_must_divide_by_underclock() {
        let cfg = ChipConfig {
            clock_hz: 2_000_001,
            underclock: 2,
            ..ChipConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("not divisible"));
    }

    #[test]
    fn test_underclock_scales_rates() {
        let cfg = ChipConfig {
            underclock: 8,
            ..ChipConfig::default()
        };
        cfg.validate().unwrap();
        assert_eq!(cfg.naive_rate(), 250_000);
        assert_eq!(cfg.osc_scale(), 1);
    }

    #[test]
    fn test_channel_count_bounds() {
        for channels in [0, 4] {
            let cfg = ChipConfig {
                channels,
                ..ChipConfig::default()
            };
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn test_min_tone_period() {
        let cfg = ChipConfig::default();
        // 2 MHz / (8 * 44.1 kHz) = 5.67
        assert_eq!(cfg.min_tone_period(), 6);
        let unclamped = ChipConfig {
            freq_clamp: false,
            ..cfg
        };
        assert_eq!(unclamped.min_tone_period(), 1);
    }

    #[test]
    fn test_kernel_scale_is_capped() {
        let params = KernelParams::default();
        assert_eq!(params.scale_for(2_000_000, 44_100), 500);
        assert_eq!(params.scale_for(12, 1), 12);
        assert_eq!(params.scale_for(48_000, 48_000), 1);
    }

    #[test]
    fn test_kernel_transition_bounds() {
        for transition in [1e-6, 0.0, f64::NAN, 1.0] {
            let cfg = ChipConfig {
                kernel: KernelParams {
                    transition,
                    ..KernelParams::default()
                },
                ..ChipConfig::default()
            };
            assert!(matches!(cfg.validate(), Err(Ym2149Error::ConfigError(_))));
        }
        let narrowest = ChipConfig {
            kernel: KernelParams {
                transition: MIN_TRANSITION,
                ..KernelParams::default()
            },
            ..ChipConfig::default()
        };
        narrowest.validate().unwrap();
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let cfg: ChipConfig =
            serde_json::from_str(r#"{"sample_rate": 48000, "kernel": {"max_scale": 64}}"#)
                .unwrap();
        assert_eq!(cfg.sample_rate, 48_000);
        assert_eq!(cfg.clock_hz, ATARI_ST_CLOCK);
        assert_eq!(cfg.kernel.max_scale, 64);
        assert_eq!(cfg.kernel.cutoff, 0.475);
    }
}
