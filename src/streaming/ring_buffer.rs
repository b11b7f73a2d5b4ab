//! Ring buffer between the render loop and a playback thread
//!
//! One producer (the renderer) writes finished samples, one consumer (the
//! audio device) reads them. Memory is fixed at `capacity * sizeof(f32)`
//! regardless of how long playback runs.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Result, Ym2149Error};

/// Largest ring accepted: 512 MB worth of f32 samples
const MAX_CAPACITY: usize = 512 * 1024 * 1024 / std::mem::size_of::<f32>();

/// Single-producer single-consumer sample ring
///
/// Storage sits behind a `parking_lot::Mutex`; the positions are atomics so
/// fill level can be read without taking the lock. Positions only grow and
/// are reduced with the power-of-two mask on access.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Mutex<Vec<f32>>,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// Create a ring of at least `requested_capacity` samples (rounded up to a power of 2)
    pub fn new(requested_capacity: usize) -> Result<Self> {
        if requested_capacity == 0 {
            return Err(Ym2149Error::ConfigError(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }
        let capacity = requested_capacity.next_power_of_two();
        if capacity > MAX_CAPACITY {
            return Err(Ym2149Error::ConfigError(format!(
                "Ring buffer capacity {capacity} exceeds maximum safe size {MAX_CAPACITY}"
            )));
        }
        Ok(RingBuffer {
            buffer: Mutex::new(vec![0.0; capacity]),
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Capacity in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples ready to read
    pub fn available_read(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Free slots (one slot always stays empty)
    pub fn available_write(&self) -> usize {
        self.capacity - self.available_read() - 1
    }

    /// Write as many samples as fit; returns how many were written
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let free = self.capacity - write_pos.wrapping_sub(read_pos) - 1;
        let to_write = samples.len().min(free);
        if to_write == 0 {
            return 0;
        }

        let start = write_pos & self.mask;
        let first = to_write.min(self.capacity - start);
        buf[start..start + first].copy_from_slice(&samples[..first]);
        buf[..to_write - first].copy_from_slice(&samples[first..to_write]);
        drop(buf);

        self.write_pos
            .store(write_pos.wrapping_add(to_write), Ordering::Release);
        to_write
    }

    /// Read up to `dest.len()` samples; returns how many were read
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let buf = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        let read_pos = self.read_pos.load(Ordering::Acquire);
        let to_read = dest.len().min(write_pos.wrapping_sub(read_pos));
        if to_read == 0 {
            return 0;
        }

        let start = read_pos & self.mask;
        let first = to_read.min(self.capacity - start);
        dest[..first].copy_from_slice(&buf[start..start + first]);
        dest[first..to_read].copy_from_slice(&buf[..to_read - first]);
        drop(buf);

        self.read_pos
            .store(read_pos.wrapping_add(to_read), Ordering::Release);
        to_read
    }

    /// Drop everything not yet read
    pub fn clear(&self) {
        let _guard = self.buffer.lock();
        let write_pos = self.write_pos.load(Ordering::Acquire);
        self.read_pos.store(write_pos, Ordering::Release);
    }

    /// Whether nothing is waiting to be read
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Whether a write would be refused
    pub fn is_full(&self) -> bool {
        self.available_write() == 0
    }

    /// Fill level (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        (self.available_read() as f32) / (self.capacity as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ring_buffer_power_of_two() {
        let rb = RingBuffer::new(1000).unwrap();
        assert_eq!(rb.capacity(), 1024);
        assert!(rb.is_empty());
        assert!(!rb.is_full());
    }

    #[test]
    fn test_write_and_read() {
        let rb = RingBuffer::new(16).unwrap();
        let samples = vec![0.1, 0.2, 0.3, 0.4];
        assert_eq!(rb.write(&samples), 4);
        assert_eq!(rb.available_read(), 4);

        let mut dest = vec![0.0; 4];
        assert_eq!(rb.read(&mut dest), 4);
        assert_eq!(dest, samples);
    }

    #[test]
    fn test_wrap_preserves_order() {
        let rb = RingBuffer::new(16).unwrap();
        let first: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(rb.write(&first), 10);
        let mut dest = vec![0.0; 6];
        assert_eq!(rb.read(&mut dest), 6);

        let second: Vec<f32> = (10..21).map(|i| i as f32).collect();
        assert_eq!(rb.write(&second), 11);
        assert!(rb.is_full());

        let mut rest = vec![0.0; 32];
        assert_eq!(rb.read(&mut rest), 15);
        let expected: Vec<f32> = (6..21).map(|i| i as f32).collect();
        assert_eq!(&rest[..15], &expected[..]);
    }

    #[test]
    fn test_full_buffer_refuses() {
        let rb = RingBuffer::new(8).unwrap();
        assert_eq!(rb.write(&[1.0; 20]), 7);
        assert_eq!(rb.write(&[1.0]), 0);
        assert!(rb.fill_percentage() > 0.8);
    }

    #[test]
    fn test_clear() {
        let rb = RingBuffer::new(16).unwrap();
        rb.write(&[1.0; 8]);
        rb.clear();
        assert!(rb.is_empty());
    }

    #[test]
    fn test_capacity_errors() {
        let err = RingBuffer::new(0).unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
        let err = RingBuffer::new(MAX_CAPACITY + 1).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_concurrent_transfer() {
        let rb = Arc::new(RingBuffer::new(64).unwrap());
        let producer = {
            let rb = Arc::clone(&rb);
            std::thread::spawn(move || {
                let data: Vec<f32> = (0..5000).map(|i| i as f32).collect();
                let mut rest = &data[..];
                while !rest.is_empty() {
                    let n = rb.write(rest);
                    rest = &rest[n..];
                    if n == 0 {
                        std::thread::yield_now();
                    }
                }
            })
        };
        let mut got = Vec::new();
        let mut chunk = [0.0f32; 37];
        while got.len() < 5000 {
            let n = rb.read(&mut chunk);
            got.extend_from_slice(&chunk[..n]);
            if n == 0 {
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();
        assert!(got.iter().enumerate().all(|(i, &v)| v == i as f32));
    }
}
