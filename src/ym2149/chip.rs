//! YM2149 PSG emulation
//!
//! Runs the chip at its native tick rate (clock / underclock) and renders
//! the naive composite signal one [`Block`] at a time. Every stage caches
//! its buffer per block generation, so pulling the same block twice is free
//! and the shared noise and envelope generators advance exactly once.

use log::debug;

use super::derived::ChipRegisters;
use super::envelope::{EnvOsc, EnvelopeShape};
use super::mixer::{ChannelSettings, Mixer};
use super::osc::{NoiseOsc, ToneOsc};
use super::registers::Register;
use crate::backend::Ym2149Backend;
use crate::block::Block;
use crate::config::{ChipConfig, CHANNELS_PER_PSG};
use crate::Result;

/// YM2149 chip
#[derive(Debug, Clone)]
pub struct Ym2149 {
    config: ChipConfig,
    regs: ChipRegisters,
    tones: [ToneOsc; CHANNELS_PER_PSG],
    noise: NoiseOsc,
    env: EnvOsc,
    mixer: Mixer,
}

impl Ym2149 {
    /// Create a chip from a configuration, validating it first
    pub fn new(config: ChipConfig) -> Result<Self> {
        config.validate()?;
        let scale = config.osc_scale();
        let min_period = config.min_tone_period();
        debug!(
            "ym2149: naive rate {} Hz, osc scale {}, min tone period {}",
            config.naive_rate(),
            scale,
            min_period
        );
        Ok(Ym2149 {
            config,
            regs: ChipRegisters::new(),
            tones: std::array::from_fn(|_| ToneOsc::new(scale, min_period)),
            noise: NoiseOsc::new(scale),
            env: EnvOsc::new(scale),
            mixer: Mixer::new(config.ampshare()),
        })
    }

    /// Configuration the chip was built with
    pub fn config(&self) -> &ChipConfig {
        &self.config
    }

    /// Raw register write (index wraps at 16, value masked)
    pub fn set_register(&mut self, index: u8, value: u8) {
        self.regs.write(index, value);
    }

    /// Raw register read
    pub fn register(&self, index: u8) -> u8 {
        self.regs.read(index)
    }

    /// Register state including derived values
    pub fn registers(&self) -> &ChipRegisters {
        &self.regs
    }

    /// Mutable register state, for named derived writes
    pub fn registers_mut(&mut self) -> &mut ChipRegisters {
        &mut self.regs
    }

    /// Set a channel's 12-bit tone period directly
    pub fn set_tone_period(&mut self, channel: usize, period: u16) {
        if channel < CHANNELS_PER_PSG {
            self.regs.set_tone_period(channel, period);
        }
    }

    /// Set the 5-bit noise period directly
    pub fn set_noise_period(&mut self, period: u8) {
        self.regs.set_noise_period(period);
    }

    /// Set the 16-bit envelope period directly
    pub fn set_env_period(&mut self, period: u16) {
        self.regs.set_env_period(period);
    }

    /// Set the envelope shape directly (restarts the envelope)
    pub fn set_env_shape(&mut self, shape: u8) {
        self.regs.set_env_shape(shape);
    }

    /// Enable or disable a channel's tone
    pub fn set_tone_enabled(&mut self, channel: usize, enabled: bool) {
        if channel < CHANNELS_PER_PSG {
            self.regs.set_tone_enabled(channel, enabled);
        }
    }

    /// Enable or disable a channel's noise
    pub fn set_noise_enabled(&mut self, channel: usize, enabled: bool) {
        if channel < CHANNELS_PER_PSG {
            self.regs.set_noise_enabled(channel, enabled);
        }
    }

    /// Set a channel's fixed 4-bit level
    pub fn set_fixed_level(&mut self, channel: usize, level: u8) {
        if channel < CHANNELS_PER_PSG {
            self.regs.set_fixed_level(channel, level);
        }
    }

    /// Let the envelope drive a channel's level, or not
    pub fn set_env_mode(&mut self, channel: usize, enabled: bool) {
        if channel < CHANNELS_PER_PSG {
            self.regs.set_env_mode(channel, enabled);
        }
    }

    /// Mute or unmute a channel (0=A, 1=B, 2=C)
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        self.mixer.set_channel_mute(channel, mute);
    }

    /// Check if a channel is muted
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        self.mixer.is_channel_muted(channel)
    }

    /// Current envelope shape as named in R13
    pub fn envelope_shape(&self) -> EnvelopeShape {
        EnvelopeShape::from_value(self.regs.read(Register::EnvelopeShape.addr()))
    }

    /// Naive composite signal for `block`, one sample per chip tick
    pub fn render(&mut self, block: &Block) -> &[f32] {
        let Ym2149 {
            config,
            regs,
            tones,
            noise,
            env,
            mixer,
        } = self;
        let channels = config.channels;
        mixer.render(block, |bus| {
            let noise_bits = noise.render(block, regs.noise_period());
            let (shape, revision) = regs.env_shape();
            let env_levels = env.render(block, shape, revision, regs.env_period());
            for (channel, tone) in tones.iter_mut().enumerate().take(channels) {
                let tone_bits = tone.render(block, regs.tone_period(channel));
                let settings = ChannelSettings {
                    tone_enabled: regs.tone_enabled(channel),
                    noise_enabled: regs.noise_enabled(channel),
                    env_mode: regs.env_mode(channel),
                    fixed_level: regs.fixed_level(channel),
                };
                bus.add_channel(channel, tone_bits, noise_bits, env_levels, &settings);
            }
        })
    }
}

impl Ym2149Backend for Ym2149 {
    fn write_register(&mut self, addr: u8, value: u8) {
        self.set_register(addr, value);
    }

    fn read_register(&self, addr: u8) -> u8 {
        self.register(addr)
    }

    /// Restart the envelope with the shape in effect, which may come from
    /// [`Ym2149::set_env_shape`] rather than R13
    fn trigger_envelope(&mut self) {
        let (shape, _) = self.regs.env_shape();
        self.regs.set_env_shape(shape);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ym2149::dac::headroom;
    use approx::assert_relative_eq;

    fn chip() -> Ym2149 {
        Ym2149::new(ChipConfig {
            freq_clamp: false,
            ..ChipConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = ChipConfig {
            underclock: 5,
            ..ChipConfig::default()
        };
        assert!(Ym2149::new(cfg).is_err());
    }

    #[test]
    fn test_power_on_is_constant() {
        let mut chip = chip();
        let out = chip.render(&Block::new(1, 64)).to_vec();
        // Mixer disabled everywhere: channels idle high at level 1
        assert!(out.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_tone_square_wave() {
        let mut chip = chip();
        chip.set_register(0x00, 3);
        chip.set_register(0x07, 0x3E);
        chip.set_register(0x08, 0x0F);
        let out = chip.render(&Block::new(1, 96)).to_vec();
        let high = out[0];
        let low = out[24];
        assert!(high > low);
        assert!(out[..24].iter().all(|&v| v == high));
        assert!(out[24..48].iter().all(|&v| v == low));
        assert!(out[48..72].iter().all(|&v| v == high));
    }

    #[test]
    fn test_clamped_tone_matches_disabled_tone() {
        // 2 MHz at 44.1 kHz: periods below 6 are above the output Nyquist
        let mut chip = Ym2149::new(ChipConfig::default()).unwrap();
        chip.set_register(0x00, 1);
        chip.set_register(0x07, 0x3E);
        chip.set_register(0x08, 0x0F);
        let clamped = chip.render(&Block::new(1, 400)).to_vec();
        assert!(clamped.windows(2).all(|w| w[0] == w[1]));

        chip.set_register(0x07, 0x3F);
        let disabled = chip.render(&Block::new(2, 400)).to_vec();
        assert_eq!(clamped, disabled);
    }

    #[test]
    fn test_same_block_renders_once() {
        let mut chip = chip();
        chip.set_register(0x00, 3);
        chip.set_register(0x07, 0x36);
        chip.set_register(0x08, 0x0F);
        let block = Block::new(9, 100);
        let first = chip.render(&block).to_vec();
        let second = chip.render(&block).to_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_named_writes_match_register_writes() {
        let mut by_reg = chip();
        by_reg.set_register(0x02, 0x40);
        by_reg.set_register(0x07, 0x3D);
        by_reg.set_register(0x09, 0x0C);

        let mut by_name = chip();
        by_name.set_tone_period(1, 0x40);
        by_name.set_tone_enabled(1, true);
        by_name.set_fixed_level(1, 0x0C);

        let block = Block::new(1, 2000);
        assert_eq!(by_reg.render(&block).to_vec(), by_name.render(&block).to_vec());
    }

    #[test]
    fn test_mute_silences_channel() {
        let mut chip = chip();
        chip.set_register(0x00, 3);
        chip.set_register(0x07, 0x3E);
        chip.set_register(0x08, 0x0F);
        chip.set_channel_mute(0, true);
        chip.set_channel_mute(1, true);
        chip.set_channel_mute(2, true);
        assert!(chip.is_channel_muted(0));
        let out = chip.render(&Block::new(1, 64)).to_vec();
        for v in out {
            assert_relative_eq!(v, -headroom(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_envelope_drives_level() {
        let mut chip = chip();
        chip.set_register(0x07, 0x3F);
        chip.set_register(0x08, 0x10);
        chip.set_register(0x0B, 1);
        chip.set_register(0x0D, 0x0D);
        assert_eq!(chip.envelope_shape(), EnvelopeShape::AttackHigh);
        let out = chip.render(&Block::new(1, 8 * 40)).to_vec();
        // Attack: strictly rising once per 8-tick step, then held
        for step in 1..32 {
            assert!(out[step * 8] > out[(step - 1) * 8]);
        }
        assert_eq!(out[32 * 8], out[39 * 8]);
    }

    #[test]
    fn test_backend_dump_and_load() {
        let mut chip = chip();
        let mut regs = [0u8; 16];
        regs[0] = 0x12;
        regs[7] = 0x38;
        regs[13] = 0x0A;
        chip.load_registers(&regs);
        assert_eq!(chip.dump_registers(), regs);
    }

    #[test]
    fn test_trigger_envelope_restarts() {
        let mut chip = chip();
        chip.set_register(0x07, 0x3F);
        chip.set_register(0x08, 0x10);
        chip.set_register(0x0B, 1);
        chip.set_register(0x0D, 0x0C);
        let first = chip.render(&Block::new(1, 80)).to_vec();
        chip.trigger_envelope();
        let again = chip.render(&Block::new(2, 80)).to_vec();
        assert_eq!(first, again);
    }

    #[test]
    fn test_trigger_envelope_keeps_named_shape() {
        let mut chip = chip();
        chip.set_register(0x07, 0x3F);
        chip.set_register(0x08, 0x10);
        chip.set_register(0x0B, 1);
        chip.set_register(0x0D, 0x0C);
        chip.set_env_shape(0x08);
        let first = chip.render(&Block::new(1, 80)).to_vec();
        // Decaying sawtooth from the named write, not the rising one in R13
        assert!(first[0] > first[79]);

        chip.render(&Block::new(2, 40));
        chip.trigger_envelope();
        let again = chip.render(&Block::new(3, 80)).to_vec();
        assert_eq!(first, again);
        assert_eq!(chip.register(0x0D), 0x0C);
    }
}
