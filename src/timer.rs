//! Refresh-rate timing
//!
//! Converts a refresh rate (e.g. a 50Hz player frame) into blocks of chip
//! ticks. The fractional remainder of each period is carried into the next
//! call so the long-run tick rate is exact, and large periods are split so no
//! block exceeds the configured maximum.

use log::{debug, warn};

use crate::block::Block;
use crate::config::ChipConfig;
use crate::{Result, Ym2149Error};

/// Block planner with drift-free carry
#[derive(Debug, Clone)]
pub struct Timer {
    /// Naive ticks per second
    naive_rate: u32,
    /// Largest block handed out
    max_block_ticks: usize,
    /// Leftover in tick*refresh units, |carry| <= refresh / 2
    carry_ticks: f64,
    /// Next block generation
    next_generation: u64,
    /// Ticks planned so far
    total_ticks: u64,
}

impl Timer {
    /// Create a timer for `naive_rate` ticks per second
    pub fn new(naive_rate: u32, max_block_ticks: usize) -> Self {
        Timer {
            naive_rate,
            max_block_ticks: max_block_ticks.max(1),
            carry_ticks: 0.0,
            next_generation: 1,
            total_ticks: 0,
        }
    }

    /// Create a timer from a validated configuration
    pub fn from_config(config: &ChipConfig) -> Self {
        Self::new(config.naive_rate(), config.max_block_ticks())
    }

    /// Plan the blocks for one period of `refresh_rate` Hz.
    ///
    /// The returned blocks sum to the rounded tick count of the period; the
    /// rounding error stays in [`carry_ticks`](Self::carry_ticks).
    pub fn blocks_for_period(&mut self, refresh_rate: f64) -> Result<Blocks> {
        if !(refresh_rate.is_finite() && refresh_rate > 0.0) {
            return Err(Ym2149Error::ConfigError(format!(
                "refresh rate {refresh_rate} must be positive"
            )));
        }
        let available = self.carry_ticks + self.naive_rate as f64;
        let block_ticks = (available / refresh_rate).round_ties_even();
        self.carry_ticks = available - block_ticks * refresh_rate;

        let ticks = block_ticks as usize;
        Ok(self.split(ticks))
    }

    /// Plan an explicit number of ticks, split by the maximum block size.
    pub fn blocks_for_ticks(&mut self, ticks: usize) -> Blocks {
        self.split(ticks)
    }

    fn split(&mut self, ticks: usize) -> Blocks {
        let count = ticks.div_ceil(self.max_block_ticks) as u64;
        let blocks = Blocks {
            remaining: ticks,
            max_block_ticks: self.max_block_ticks,
            next_generation: self.next_generation,
        };
        self.next_generation += count;
        self.total_ticks += ticks as u64;
        debug!(
            "timer: {} ticks in {} block(s), carry {:.3}",
            ticks, count, self.carry_ticks
        );
        blocks
    }

    /// Current fractional leftover (in tick × refresh-rate units)
    pub fn carry_ticks(&self) -> f64 {
        self.carry_ticks
    }

    /// Total ticks planned since creation
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Report the residual carry at shutdown.
    ///
    /// A non-zero residual only means the clock/refresh ratio is not an
    /// integer; it is logged as a warning and returned.
    pub fn finish(&self) -> f64 {
        if self.carry_ticks != 0.0 {
            warn!(
                "timer: {:.3} carry ticks left at shutdown (inexact rate ratio)",
                self.carry_ticks
            );
        }
        self.carry_ticks
    }
}

/// Blocks of one planned period
#[derive(Debug, Clone)]
pub struct Blocks {
    remaining: usize,
    max_block_ticks: usize,
    next_generation: u64,
}

impl Iterator for Blocks {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        if self.remaining == 0 {
            return None;
        }
        let ticks = self.remaining.min(self.max_block_ticks);
        self.remaining -= ticks;
        let block = Block::new(self.next_generation, ticks);
        self.next_generation += 1;
        Some(block)
    }
}
