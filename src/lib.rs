//! YM2149 PSG emulator with minBLEP band-limited output
//!
//! Emulates the Yamaha YM2149 (AY-3-8910 family) at the chip's native tick
//! rate and converts the resulting step signal to an alias-free PCM stream
//! using minimum-phase band-limited steps (minBLEP).
//!
//! # Pipeline
//! - Tone, noise and envelope oscillators render per-tick buffers for a
//!   [`Block`] of chip ticks
//! - BinMix / Level / DAC / Mixer turn them into a naive composite signal
//! - [`MinBlepResampler`] pastes a band-limited step for every transition
//! - [`Timer`] slices wall-clock refresh periods into blocks without drift
//! - An [`OutputSink`] receives the finished samples
//!
//! # Crate feature flags
//! - `export-wav` (default): 16-bit PCM WAV sink via `hound`
//! - `streaming` (opt-in): real-time audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ```no_run
//! use ym2149_blep::{BufferSink, ChipConfig, Renderer};
//!
//! let mut renderer = Renderer::new(ChipConfig::default()).unwrap();
//! let chip = renderer.chip_mut();
//! chip.set_register(0x00, 0x1C); // Tone A period low
//! chip.set_register(0x01, 0x01); // Tone A period high
//! chip.set_register(0x07, 0x3E); // Mixer: tone A only
//! chip.set_register(0x08, 0x0F); // Volume A
//!
//! let mut sink = BufferSink::new();
//! for _ in 0..50 {
//!     renderer.render_frame(50.0, &mut sink).unwrap();
//! }
//! assert_eq!(sink.samples().len(), 44_100);
//! ```

#![warn(missing_docs)]

pub mod backend; // Register write seam
pub mod block; // Blocks and per-block memoization
pub mod config; // Chip geometry and rates
pub mod minblep; // Band-limited step kernel and resampler
pub mod renderer; // Pull pipeline driver
pub mod streaming; // Output sinks
pub mod timer; // Refresh period -> block planning
pub mod ym2149; // YM2149 PSG emulation (core)

/// Error types for YM2149 emulator operations
#[derive(thiserror::Error, Debug)]
pub enum Ym2149Error {
    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error writing audio file
    #[error("Audio file write error: {0}")]
    AudioFileError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Ym2149Error {
    /// Converts a String into `Ym2149Error::Other`.
    ///
    /// Prefer the specific variants (`ConfigError`, `AudioFileError`,
    /// `AudioDeviceError`) where the failure class is known.
    fn from(msg: String) -> Self {
        Ym2149Error::Other(msg)
    }
}

impl From<&str> for Ym2149Error {
    fn from(msg: &str) -> Self {
        Ym2149Error::Other(msg.to_string())
    }
}

/// Result type for emulator operations
pub type Result<T> = std::result::Result<T, Ym2149Error>;

// Public API exports
pub use backend::Ym2149Backend;
pub use block::Block;
pub use config::{ChipConfig, KernelParams};
pub use minblep::{MinBlepResampler, MinBleps};
pub use renderer::{RegisterWriter, Renderer};
pub use streaming::{BufferSink, OutputSink, RealtimePlayer, RingBuffer, StreamConfig};
pub use timer::Timer;
pub use ym2149::Ym2149;

#[cfg(feature = "export-wav")]
pub use streaming::WavSink;

#[cfg(feature = "streaming")]
pub use streaming::AudioDevice;
