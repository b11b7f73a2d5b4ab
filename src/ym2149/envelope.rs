//! YM2149 Envelope Generator
//!
//! Register R13 selects one of 16 shapes. Only eight are distinct: values
//! 0-3 behave like 9 (decay then silence) and 4-7 like 15 (attack then
//! silence). Every shape is two 32-step segments followed by a loop point,
//! and the whole table is built at compile time so rendering never branches
//! on shape identity.

use std::fmt;

use crate::block::{Block, BlockCache};

/// Steps per ramp
pub const ENV_STEPS: usize = 32;

/// Highest envelope level (5 bits)
pub const ENV_MAX_LEVEL: u8 = 31;

/// Envelope Shape Control - Register R13
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    /// 0000: Decay then silence (same as 1001)
    Decay0 = 0x00,
    /// 0001: Decay then silence
    Decay1 = 0x01,
    /// 0010: Decay then silence
    Decay2 = 0x02,
    /// 0011: Decay then silence
    Decay3 = 0x03,
    /// 0100: Attack then silence (same as 1111)
    Attack0 = 0x04,
    /// 0101: Attack then silence
    Attack1 = 0x05,
    /// 0110: Attack then silence
    Attack2 = 0x06,
    /// 0111: Attack then silence
    Attack3 = 0x07,
    /// 1000: Repeating decay - BUZZER SOUND
    SawtoothDown = 0x08,
    /// 1001: Decay then silence
    DecayLow = 0x09,
    /// 1010: Decay/attack triangle, repeating
    TriangleDown = 0x0A,
    /// 1011: Decay then hold high
    DecayHigh = 0x0B,
    /// 1100: Repeating attack - BUZZER SOUND
    SawtoothUp = 0x0C,
    /// 1101: Attack then hold high
    AttackHigh = 0x0D,
    /// 1110: Attack/decay triangle, repeating
    TriangleUp = 0x0E,
    /// 1111: Attack then silence
    AttackLow = 0x0F,
}

impl EnvelopeShape {
    /// Create from raw register value
    pub fn from_value(val: u8) -> Self {
        match val & 0x0F {
            0x00 => EnvelopeShape::Decay0,
            0x01 => EnvelopeShape::Decay1,
            0x02 => EnvelopeShape::Decay2,
            0x03 => EnvelopeShape::Decay3,
            0x04 => EnvelopeShape::Attack0,
            0x05 => EnvelopeShape::Attack1,
            0x06 => EnvelopeShape::Attack2,
            0x07 => EnvelopeShape::Attack3,
            0x08 => EnvelopeShape::SawtoothDown,
            0x09 => EnvelopeShape::DecayLow,
            0x0A => EnvelopeShape::TriangleDown,
            0x0B => EnvelopeShape::DecayHigh,
            0x0C => EnvelopeShape::SawtoothUp,
            0x0D => EnvelopeShape::AttackHigh,
            0x0E => EnvelopeShape::TriangleUp,
            _ => EnvelopeShape::AttackLow,
        }
    }

    /// The distinct shape this value behaves as
    pub fn canonical(self) -> Self {
        match self as u8 {
            0x00..=0x03 => EnvelopeShape::DecayLow,
            0x04..=0x07 => EnvelopeShape::AttackLow,
            _ => self,
        }
    }

    /// Whether the shape keeps cycling instead of holding
    pub fn is_repeating(self) -> bool {
        SHAPES[self as usize].loop_start < 2 * ENV_STEPS - 1
    }
}

impl fmt::Display for EnvelopeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            EnvelopeShape::SawtoothDown => write!(f, "\\\\\\\\ (Sawtooth-Down)"),
            EnvelopeShape::DecayLow => write!(f, "\\___ (Decay)"),
            EnvelopeShape::TriangleDown => write!(f, "\\/\\/ (Triangle)"),
            EnvelopeShape::DecayHigh => write!(f, "\\¯¯¯ (Decay-Hold)"),
            EnvelopeShape::SawtoothUp => write!(f, "//// (Sawtooth-Up)"),
            EnvelopeShape::AttackHigh => write!(f, "/¯¯¯ (Attack-Hold)"),
            EnvelopeShape::TriangleUp => write!(f, "/\\/\\ (Triangle)"),
            _ => write!(f, "/___ (Attack)"),
        }
    }
}

/// One entry of the shape table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeDescriptor {
    /// Levels of the first two ramps
    pub levels: [u8; 2 * ENV_STEPS],
    /// Position the envelope jumps to after the last step
    pub loop_start: usize,
}

#[derive(Clone, Copy)]
enum Segment {
    Down,
    Up,
    Low,
    High,
}

const fn segment_level(segment: Segment, step: usize) -> u8 {
    match segment {
        Segment::Down => ENV_MAX_LEVEL - step as u8,
        Segment::Up => step as u8,
        Segment::Low => 0,
        Segment::High => ENV_MAX_LEVEL,
    }
}

const fn descriptor(first: Segment, second: Segment, repeat: bool) -> ShapeDescriptor {
    let mut levels = [0u8; 2 * ENV_STEPS];
    let mut step = 0;
    while step < ENV_STEPS {
        levels[step] = segment_level(first, step);
        levels[ENV_STEPS + step] = segment_level(second, step);
        step += 1;
    }
    ShapeDescriptor {
        levels,
        // A hold shape parks on its last step
        loop_start: if repeat { 0 } else { 2 * ENV_STEPS - 1 },
    }
}

const DECAY_LOW: ShapeDescriptor = descriptor(Segment::Down, Segment::Low, false);
const ATTACK_LOW: ShapeDescriptor = descriptor(Segment::Up, Segment::Low, false);

/// Shape table indexed by the raw 4-bit register value
pub static SHAPES: [ShapeDescriptor; 16] = [
    DECAY_LOW,
    DECAY_LOW,
    DECAY_LOW,
    DECAY_LOW,
    ATTACK_LOW,
    ATTACK_LOW,
    ATTACK_LOW,
    ATTACK_LOW,
    descriptor(Segment::Down, Segment::Down, true),
    DECAY_LOW,
    descriptor(Segment::Down, Segment::Up, true),
    descriptor(Segment::Down, Segment::High, false),
    descriptor(Segment::Up, Segment::Up, true),
    descriptor(Segment::Up, Segment::High, false),
    descriptor(Segment::Up, Segment::Down, true),
    ATTACK_LOW,
];

/// Envelope oscillator producing a 5-bit level per tick
///
/// A new shape revision (any R13 write, even of the same value) restarts
/// the envelope at step 0. The period is sampled at each step boundary.
#[derive(Debug, Clone)]
pub struct EnvOsc {
    scale: u32,
    shape: &'static ShapeDescriptor,
    /// Shape revision the current run started from
    started: Option<u64>,
    pos: usize,
    /// Ticks left in the current step
    remaining: u32,
    cache: BlockCache<u8>,
}

impl EnvOsc {
    /// Create an envelope oscillator
    pub fn new(scale: u32) -> Self {
        EnvOsc {
            scale: scale.max(1),
            shape: &SHAPES[0],
            started: None,
            pos: 0,
            remaining: 0,
            cache: BlockCache::new(),
        }
    }

    /// Step length in ticks for an envelope period register value
    #[inline]
    pub fn step_ticks(&self, period: u16) -> u32 {
        (period as u32).max(1) * self.scale
    }

    /// Render `block` for the given shape (with its revision) and period
    pub fn render(&mut self, block: &Block, shape: u8, revision: u64, period: u16) -> &[u8] {
        let step = self.step_ticks(period);
        if self.cache.is_current(block) {
            return self.cache.last();
        }
        if self.started != Some(revision) {
            self.shape = &SHAPES[(shape & 0x0F) as usize];
            self.started = Some(revision);
            self.pos = 0;
            self.remaining = step;
        }
        let table: &'static ShapeDescriptor = self.shape;
        let levels = &table.levels;
        let loop_start = table.loop_start;
        let EnvOsc {
            pos,
            remaining,
            cache,
            ..
        } = self;
        cache.get_or_render(block, |buf| {
            let mut i = 0;
            while i < buf.len() {
                if *remaining == 0 {
                    *pos += 1;
                    if *pos == levels.len() {
                        *pos = loop_start;
                    }
                    *remaining = step;
                }
                let run = (*remaining as usize).min(buf.len() - i);
                buf[i..i + run].fill(levels[*pos]);
                i += run;
                *remaining -= run as u32;
            }
        })
    }

    /// Current level
    pub fn level(&self) -> u8 {
        self.shape.levels[self.pos]
    }
}
