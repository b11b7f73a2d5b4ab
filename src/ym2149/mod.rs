//! YM2149 PSG Emulation Domain
//!
//! Register bank, oscillators, mixer and DAC of the Yamaha YM2149
//! Programmable Sound Generator, rendered block by block at the chip's
//! native tick rate.

// Internal modules
pub mod chip;
pub mod dac;
pub mod derived;
pub mod envelope;
pub mod lfsr;
pub mod mixer;
pub mod osc;
pub mod registers;

// Re-export public API
pub use chip::Ym2149;
pub use derived::{ChipRegisters, DerivedRegister};
pub use envelope::EnvelopeShape;
pub use mixer::MixerFlags;
pub use registers::{Register, RegisterBank};
