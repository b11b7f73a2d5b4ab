//! Register write seam
//!
//! Anything that accepts YM2149 register writes implements
//! [`Ym2149Backend`]: the chip itself, and the cross-thread
//! [`RegisterWriter`](crate::RegisterWriter) that queues writes for the
//! render loop.

use crate::ym2149::registers::{Register, REGISTER_COUNT};

/// Common interface for YM2149 register sinks
///
/// # Example
///
/// ```
/// use ym2149_blep::{ChipConfig, Ym2149, Ym2149Backend};
///
/// fn play_note<B: Ym2149Backend>(chip: &mut B) {
///     chip.write_register(0x00, 0xF0); // Channel A period low
///     chip.write_register(0x01, 0x01); // Channel A period high
///     chip.write_register(0x08, 0x0F); // Channel A volume
///     chip.write_register(0x07, 0x3E); // Mixer: enable tone A
/// }
///
/// let mut chip = Ym2149::new(ChipConfig::default()).unwrap();
/// play_note(&mut chip);
/// assert_eq!(chip.read_register(0x08), 0x0F);
/// ```
pub trait Ym2149Backend: Send {
    /// Write to a YM2149 register
    ///
    /// # Arguments
    ///
    /// * `addr` - Register address (0x00-0x0F, wraps above)
    /// * `value` - Register value, masked to the register's valid bits
    fn write_register(&mut self, addr: u8, value: u8);

    /// Read from a YM2149 register
    fn read_register(&self, addr: u8) -> u8;

    /// Load all 16 YM2149 registers at once
    ///
    /// R13 is only written when it differs from the current value, since
    /// any write to it restarts the envelope.
    fn load_registers(&mut self, regs: &[u8; REGISTER_COUNT]) {
        let shape = Register::EnvelopeShape.addr();
        for (addr, &value) in regs.iter().enumerate() {
            let addr = addr as u8;
            if addr == shape && self.read_register(addr) == value {
                continue;
            }
            self.write_register(addr, value);
        }
    }

    /// Dump all 16 YM2149 registers
    fn dump_registers(&self) -> [u8; REGISTER_COUNT] {
        let mut out = [0u8; REGISTER_COUNT];
        for (addr, slot) in out.iter_mut().enumerate() {
            *slot = self.read_register(addr as u8);
        }
        out
    }

    /// Restart the envelope by rewriting R13 with its current value
    fn trigger_envelope(&mut self) {
        let shape = Register::EnvelopeShape.addr();
        let value = self.read_register(shape);
        self.write_register(shape, value);
    }
}
