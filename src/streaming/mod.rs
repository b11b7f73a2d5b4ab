//! Output sinks
//!
//! The renderer pushes finished f32 samples into an [`OutputSink`]. Sinks
//! own any format conversion (16-bit PCM for WAV) and any blocking
//! (ring-buffer backpressure for real-time playback).

#[cfg(feature = "streaming")]
pub mod audio_device;
pub mod realtime;
pub mod ring_buffer;
#[cfg(feature = "export-wav")]
pub mod wav;

#[cfg(feature = "streaming")]
pub use audio_device::AudioDevice;
pub use realtime::{PlaybackStats, RealtimePlayer};
pub use ring_buffer::RingBuffer;
#[cfg(feature = "export-wav")]
pub use wav::WavSink;

use crate::Result;

/// Buffer backoff time in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 100;

/// Consumer of rendered output samples
pub trait OutputSink {
    /// Accept the next run of samples
    fn push_samples(&mut self, samples: &[f32]) -> Result<()>;

    /// Push buffered samples further down (default: nothing buffered)
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// No more samples will follow
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

impl<S: OutputSink + ?Sized> OutputSink for &mut S {
    fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        (**self).push_samples(samples)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Convert a float sample to 16-bit PCM (clamped to [-1, 1])
#[inline]
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// In-memory sink collecting every sample
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    samples: Vec<f32>,
    closed: bool,
}

impl BufferSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples received so far
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Take the collected samples
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Collected samples as 16-bit PCM
    pub fn to_pcm16(&self) -> Vec<i16> {
        self.samples.iter().map(|&s| to_pcm16(s)).collect()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl OutputSink for BufferSink {
    fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Configuration for streaming playback
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Size of the ring buffer (in samples)
    /// Larger buffers = more latency but less chance of underrun
    pub ring_buffer_size: usize,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of audio channels
    pub channels: u16,
}

impl StreamConfig {
    /// Create a streaming configuration optimized for low latency
    /// Buffer = 4096 samples ≈ 93ms @ 44.1kHz
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 4096,
            sample_rate,
            channels: 1,
        }
    }

    /// Create a streaming configuration optimized for stability
    /// Buffer = 16384 samples ≈ 372ms @ 44.1kHz
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 16384,
            sample_rate,
            channels: 1,
        }
    }

    /// Get latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        ((self.ring_buffer_size as f32) / (self.sample_rate as f32)) * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(crate::config::DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_latency() {
        let config = StreamConfig::low_latency(44100);
        let latency = config.latency_ms();
        assert!(latency > 90.0 && latency < 95.0);
        assert!(StreamConfig::default().latency_ms() > 300.0);
    }

    #[test]
    fn test_pcm16_conversion() {
        assert_eq!(to_pcm16(0.0), 0);
        assert_eq!(to_pcm16(1.0), i16::MAX);
        assert_eq!(to_pcm16(2.0), i16::MAX);
        assert_eq!(to_pcm16(-1.5), -i16::MAX);
    }

    #[test]
    fn test_buffer_sink_collects() {
        let mut sink = BufferSink::new();
        sink.push_samples(&[0.5, -0.5]).unwrap();
        fn finish<S: OutputSink>(mut sink: S) {
            sink.push_samples(&[0.25]).unwrap();
            sink.close().unwrap();
        }
        finish(&mut sink);
        assert!(sink.is_closed());
        assert_eq!(sink.samples(), &[0.5, -0.5, 0.25]);
        assert_eq!(sink.to_pcm16()[0], (0.5 * i16::MAX as f32) as i16);
    }
}
