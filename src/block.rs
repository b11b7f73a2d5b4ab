//! Blocks of chip ticks and per-block memoization
//!
//! A [`Block`] names a contiguous run of chip ticks. Every stage of the
//! render chain caches its output for the last block generation it saw, so
//! a stage shared by several consumers (the noise generator feeds all three
//! channels) renders exactly once per block.

/// Immutable descriptor of a run of chip ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    generation: u64,
    ticks: usize,
}

impl Block {
    /// Create a block. Distinct blocks must carry distinct generations.
    pub fn new(generation: u64, ticks: usize) -> Self {
        Block { generation, ticks }
    }

    /// Generation number used for memoization
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of chip ticks in the block
    pub fn ticks(&self) -> usize {
        self.ticks
    }
}

/// Output buffer of one render stage, valid for one block generation
#[derive(Debug, Clone)]
pub struct BlockCache<T> {
    generation: Option<u64>,
    buf: Vec<T>,
}

impl<T: Copy + Default> BlockCache<T> {
    /// Create an empty cache
    pub fn new() -> Self {
        BlockCache {
            generation: None,
            buf: Vec::new(),
        }
    }

    /// Whether the cached buffer already belongs to `block`
    #[inline]
    pub fn is_current(&self, block: &Block) -> bool {
        self.generation == Some(block.generation())
    }

    /// Return the cached buffer for `block`, rendering it first if needed.
    ///
    /// `fill` receives a buffer already sized to the block; it is only
    /// called once per generation.
    pub fn get_or_render<F>(&mut self, block: &Block, fill: F) -> &[T]
    where
        F: FnOnce(&mut [T]),
    {
        if !self.is_current(block) {
            self.buf.clear();
            self.buf.resize(block.ticks(), T::default());
            fill(&mut self.buf);
            self.generation = Some(block.generation());
        }
        &self.buf
    }

    /// Last rendered buffer, whatever block it belongs to
    pub fn last(&self) -> &[T] {
        &self.buf
    }

    /// Forget the cached generation
    pub fn invalidate(&mut self) {
        self.generation = None;
    }
}

impl<T: Copy + Default> Default for BlockCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_generation_renders_once() {
        let mut cache = BlockCache::<u8>::new();
        let block = Block::new(1, 4);
        let mut calls = 0;
        cache.get_or_render(&block, |buf| {
            calls += 1;
            buf.fill(7);
        });
        let out = cache.get_or_render(&block, |buf| {
            calls += 1;
            buf.fill(9);
        });
        assert_eq!(out, &[7, 7, 7, 7]);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_new_generation_rerenders() {
        let mut cache = BlockCache::<u8>::new();
        cache.get_or_render(&Block::new(1, 2), |buf| buf.fill(1));
        let out = cache.get_or_render(&Block::new(2, 3), |buf| buf.fill(2));
        assert_eq!(out, &[2, 2, 2]);
    }

    #[test]
    fn test_empty_block() {
        let mut cache = BlockCache::<f32>::new();
        let out = cache.get_or_render(&Block::new(5, 0), |_| {});
        assert!(out.is_empty());
        assert!(cache.is_current(&Block::new(5, 0)));
    }
}
