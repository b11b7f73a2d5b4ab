//! Streaming minBLEP resampler
//!
//! Consumes the naive composite signal block by block and emits the output
//! samples whose positions fall inside each block. Every level change adds
//! a flat step at its output index plus the step response's deviation from
//! flat (`row[k] - 1`) over the following `mixin_len` samples; the part of
//! that deviation past the end of the block is carried into the next call.

use super::MinBleps;
use crate::block::Block;
use crate::config::ChipConfig;

/// Naive-rate to output-rate converter
#[derive(Debug, Clone)]
pub struct MinBlepResampler {
    minbleps: MinBleps,
    /// Naive tick at which the next block starts
    naive_pos: u64,
    /// Last naive level seen
    last: f32,
    /// Flat level of the output before the current sample
    dc: f32,
    /// Step-response deviations, starting at the next output sample
    acc: Vec<f32>,
    /// New flat level per output sample of the current block, if any
    levels: Vec<Option<f32>>,
    generation: Option<u64>,
    out: Vec<f32>,
}

impl MinBlepResampler {
    /// Create a resampler from a validated configuration
    pub fn from_config(config: &ChipConfig) -> Self {
        Self::new(MinBleps::from_config(config))
    }

    /// Create a resampler around a kernel table
    pub fn new(minbleps: MinBleps) -> Self {
        let mixin_len = minbleps.mixin_len();
        MinBlepResampler {
            minbleps,
            naive_pos: 0,
            last: 0.0,
            dc: 0.0,
            acc: vec![0.0; mixin_len],
            levels: Vec::new(),
            generation: None,
            out: Vec::new(),
        }
    }

    /// The kernel table
    pub fn minbleps(&self) -> &MinBleps {
        &self.minbleps
    }

    /// Naive ticks consumed so far
    pub fn naive_pos(&self) -> u64 {
        self.naive_pos
    }

    /// Number of output samples a block of `ticks` starting now will produce
    pub fn output_len(&self, ticks: usize) -> usize {
        let start = self.minbleps.locate(self.naive_pos).0;
        let end = self.minbleps.locate(self.naive_pos + ticks as u64).0;
        (end - start) as usize
    }

    /// Resample `naive` (one value per tick of `block`) to output samples.
    ///
    /// Calling again with the same block generation returns the cached
    /// output without consuming anything.
    pub fn render(&mut self, block: &Block, naive: &[f32]) -> &[f32] {
        if self.generation == Some(block.generation()) {
            return &self.out;
        }
        debug_assert_eq!(naive.len(), block.ticks());

        let t0 = self.naive_pos;
        let mixin_len = self.minbleps.mixin_len();
        let out_start = self.minbleps.locate(t0).0;
        let out_end = self.minbleps.locate(t0 + naive.len() as u64).0;
        let count = (out_end - out_start) as usize;

        self.acc.resize(count + mixin_len, 0.0);
        self.levels.clear();
        self.levels.resize(count + 1, None);

        for (i, &value) in naive.iter().enumerate() {
            if value == self.last {
                continue;
            }
            let delta = value - self.last;
            let (out_index, shape) = self.minbleps.locate(t0 + i as u64);
            let rel = (out_index - out_start) as usize;
            self.levels[rel] = Some(value);
            let row = self.minbleps.mixin(shape);
            for (a, &r) in self.acc[rel..rel + mixin_len].iter_mut().zip(row) {
                *a += delta * (r - 1.0);
            }
            self.last = value;
        }

        self.out.clear();
        for (acc, level) in self.acc[..count].iter().zip(&self.levels[..count]) {
            if let Some(level) = level {
                self.dc = *level;
            }
            self.out.push(acc + self.dc);
        }
        // Changes after the last output sample of this block
        if let Some(level) = self.levels[count] {
            self.dc = level;
        }
        self.acc.drain(..count);

        self.naive_pos += naive.len() as u64;
        self.generation = Some(block.generation());
        &self.out
    }
}
