//! Real-time sink with backpressure
//!
//! Writes block while the ring is full, backing off in small sleeps, so the
//! renderer runs no faster than the audio device drains it.

use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::{OutputSink, RingBuffer, StreamConfig, BUFFER_BACKOFF_MICROS};
use crate::Result;

/// Backoff rounds without progress before samples are dropped (~100ms)
const MAX_RETRIES: u32 = 1000;

/// Playback statistics for monitoring overruns and buffer health
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaybackStats {
    /// Number of overrun events (write gave up on a full buffer)
    pub overrun_count: usize,
    /// Samples handed to the ring buffer
    pub samples_written: usize,
    /// Samples dropped by overruns
    pub samples_dropped: usize,
    /// Current buffer fill percentage
    pub fill_percentage: f32,
}

/// Ring-buffer sink for a playback thread
pub struct RealtimePlayer {
    buffer: Arc<RingBuffer>,
    stats: Arc<Mutex<PlaybackStats>>,
    config: StreamConfig,
    closed: bool,
}

impl RealtimePlayer {
    /// Create a player with its own ring buffer
    pub fn new(config: StreamConfig) -> Result<Self> {
        let buffer = Arc::new(RingBuffer::new(config.ring_buffer_size)?);
        Ok(RealtimePlayer {
            buffer,
            stats: Arc::new(Mutex::new(PlaybackStats::default())),
            config,
            closed: false,
        })
    }

    /// Write all samples, waiting for space.
    ///
    /// Gives up after about 100ms without progress; the rest
    /// is dropped and counted as an overrun. Returns the number written.
    pub fn write_blocking(&self, samples: &[f32]) -> usize {
        let mut total_written = 0;
        let mut remaining = samples;
        let mut retry_count = 0;

        while !remaining.is_empty() && retry_count < MAX_RETRIES {
            let written = self.buffer.write(remaining);
            total_written += written;
            if written == 0 {
                std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
                retry_count += 1;
            } else {
                remaining = &remaining[written..];
                retry_count = 0;
            }
        }

        let mut stats = self.stats.lock();
        stats.samples_written += total_written;
        stats.fill_percentage = self.buffer.fill_percentage();
        if !remaining.is_empty() {
            stats.overrun_count += 1;
            stats.samples_dropped += remaining.len();
            warn!(
                "realtime: ring buffer overrun, dropped {} samples ({} overruns)",
                remaining.len(),
                stats.overrun_count
            );
        }
        total_written
    }

    /// Get current playback statistics
    pub fn get_stats(&self) -> PlaybackStats {
        *self.stats.lock()
    }

    /// Get buffer fill percentage (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        self.buffer.fill_percentage()
    }

    /// Shared ring buffer for the audio device
    pub fn get_buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }
}

impl OutputSink for RealtimePlayer {
    fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        self.write_blocking(samples);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            let stats = self.get_stats();
            info!(
                "realtime: closed after {} samples, {} overruns",
                stats.samples_written, stats.overrun_count
            );
        }
        Ok(())
    }
}

impl Drop for RealtimePlayer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_fills_buffer() {
        let mut player = RealtimePlayer::new(StreamConfig::low_latency(44100)).unwrap();
        player.push_samples(&[0.5; 1000]).unwrap();
        let stats = player.get_stats();
        assert_eq!(stats.samples_written, 1000);
        assert_eq!(stats.overrun_count, 0);
        assert_eq!(player.get_buffer().available_read(), 1000);
    }

    #[test]
    fn test_backpressure_waits_for_consumer() {
        let config = StreamConfig {
            ring_buffer_size: 256,
            ..StreamConfig::low_latency(44100)
        };
        let mut player = RealtimePlayer::new(config).unwrap();
        let ring = player.get_buffer();
        let consumer = std::thread::spawn(move || {
            let mut total = 0;
            let mut chunk = [0.0f32; 64];
            while total < 4096 {
                total += ring.read(&mut chunk);
                std::thread::sleep(Duration::from_micros(50));
            }
            total
        });
        player.push_samples(&[0.1; 4096]).unwrap();
        assert_eq!(consumer.join().unwrap(), 4096);
        assert_eq!(player.get_stats().overrun_count, 0);
    }

    #[test]
    fn test_overrun_is_counted() {
        let config = StreamConfig {
            ring_buffer_size: 16,
            ..StreamConfig::low_latency(44100)
        };
        let player = RealtimePlayer::new(config).unwrap();
        let written = player.write_blocking(&[0.0; 20]);
        assert_eq!(written, 15);
        let stats = player.get_stats();
        assert_eq!(stats.overrun_count, 1);
        assert_eq!(stats.samples_dropped, 5);
    }
}
