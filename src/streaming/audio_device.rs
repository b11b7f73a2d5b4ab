//! System audio output through rodio
//!
//! A rodio `Source` drains the shared [`RingBuffer`] in batches and plays
//! silence on underrun until [`AudioDevice::finish`] ends the stream.

use log::{debug, info};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::RingBuffer;
use crate::{Result, Ym2149Error};

/// Samples pulled from the ring per refill
const BATCH_LEN: usize = 1024;

/// rodio source reading from the ring buffer
struct RingBufferSource {
    ring: Arc<RingBuffer>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    batch: Vec<f32>,
    batch_pos: usize,
    underruns: u64,
}

impl RingBufferSource {
    fn new(ring: Arc<RingBuffer>, sample_rate: u32, channels: u16, finished: Arc<AtomicBool>) -> Self {
        RingBufferSource {
            ring,
            sample_rate,
            channels,
            finished,
            batch: vec![0.0; BATCH_LEN],
            batch_pos: BATCH_LEN,
            underruns: 0,
        }
    }

    fn refill(&mut self) {
        let read = self.ring.read(&mut self.batch);
        if read < self.batch.len() {
            // Pad the short read with silence
            self.batch[read..].fill(0.0);
            if read == 0 {
                self.underruns += 1;
            }
        }
        self.batch_pos = 0;
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        match self.batch.len().saturating_sub(self.batch_pos) {
            0 => Some(BATCH_LEN),
            remaining => Some(remaining),
        }
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let drained = self.batch_pos >= self.batch.len() && self.ring.is_empty();
        if drained && self.finished.load(Ordering::Relaxed) {
            if self.underruns > 0 {
                debug!("audio: {} underruns during playback", self.underruns);
                self.underruns = 0;
            }
            return None;
        }
        if self.batch_pos >= self.batch.len() {
            self.refill();
        }
        let sample = self.batch[self.batch_pos];
        self.batch_pos += 1;
        Some(sample)
    }
}

/// Playback of a ring buffer on the default output device
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default device and start playing from `ring`.
    ///
    /// `channels` tells the device how to interleave the ring's samples.
    pub fn new(sample_rate: u32, channels: u16, ring: Arc<RingBuffer>) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| Ym2149Error::AudioDeviceError(format!("Failed to create audio stream: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| Ym2149Error::AudioDeviceError(format!("Failed to create audio sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            ring,
            sample_rate,
            channels,
            Arc::clone(&finished),
        ));
        info!("audio: playing {sample_rate} Hz, {channels} channel(s)");

        Ok(AudioDevice {
            _stream: stream,
            sink,
            running: Arc::new(AtomicBool::new(true)),
            finished,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Whether the device has not been dropped
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// No more samples will be produced; the stream ends once the ring drains
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Block until the stream has ended
    pub fn wait_for_finish(&self) {
        self.sink.sleep_until_end();
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.pause();
        self.running.store(false, Ordering::Relaxed);
    }
}
