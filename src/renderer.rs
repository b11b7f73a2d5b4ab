//! Render loop driver
//!
//! Owns the chip, the resampler and the timer, and pulls one refresh period
//! at a time: queued register writes are applied first, then every planned
//! block is rendered by the chip, resampled and pushed to the sink.

use log::{debug, info};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::backend::Ym2149Backend;
use crate::config::ChipConfig;
use crate::minblep::MinBlepResampler;
use crate::streaming::OutputSink;
use crate::timer::Timer;
use crate::ym2149::registers::{REGISTER_COUNT, REG_MASK};
use crate::ym2149::Ym2149;
use crate::Result;

#[derive(Debug)]
struct PendingWrites {
    queue: Vec<(u8, u8)>,
    shadow: [u8; REGISTER_COUNT],
}

/// Cross-thread register writer
///
/// Writes are queued and applied by the renderer before the next frame.
/// Reads return the value last written through any clone of the writer,
/// or the chip's state as of the last frame.
#[derive(Debug, Clone)]
pub struct RegisterWriter {
    inner: Arc<Mutex<PendingWrites>>,
}

impl RegisterWriter {
    fn new(shadow: [u8; REGISTER_COUNT]) -> Self {
        RegisterWriter {
            inner: Arc::new(Mutex::new(PendingWrites {
                queue: Vec::new(),
                shadow,
            })),
        }
    }

    /// Writes waiting for the next frame
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    fn take(&self) -> Vec<(u8, u8)> {
        std::mem::take(&mut self.inner.lock().queue)
    }

    fn sync(&self, registers: [u8; REGISTER_COUNT]) {
        let mut inner = self.inner.lock();
        // Writes queued since the drain still win
        let mut shadow = registers;
        for &(addr, value) in &inner.queue {
            shadow[addr as usize] = value;
        }
        inner.shadow = shadow;
    }
}

impl Ym2149Backend for RegisterWriter {
    fn write_register(&mut self, addr: u8, value: u8) {
        let addr = addr & 0x0F;
        let value = value & REG_MASK[addr as usize];
        let mut inner = self.inner.lock();
        inner.queue.push((addr, value));
        inner.shadow[addr as usize] = value;
    }

    fn read_register(&self, addr: u8) -> u8 {
        self.inner.lock().shadow[(addr & 0x0F) as usize]
    }
}

/// Chip, resampler and timer driven frame by frame
#[derive(Debug)]
pub struct Renderer {
    chip: Ym2149,
    resampler: MinBlepResampler,
    timer: Timer,
    writer: RegisterWriter,
    quit: Arc<AtomicBool>,
    samples_out: u64,
}

impl Renderer {
    /// Validate `config` and build the whole pipeline
    pub fn new(config: ChipConfig) -> Result<Self> {
        let chip = Ym2149::new(config)?;
        let resampler = MinBlepResampler::from_config(&config);
        debug!(
            "renderer: {} Hz -> {} Hz, kernel scale {}, mixin {}",
            config.naive_rate(),
            config.sample_rate,
            resampler.minbleps().scale(),
            resampler.minbleps().mixin_len()
        );
        let writer = RegisterWriter::new(chip.dump_registers());
        Ok(Renderer {
            chip,
            resampler,
            timer: Timer::from_config(&config),
            writer,
            quit: Arc::new(AtomicBool::new(false)),
            samples_out: 0,
        })
    }

    /// The emulated chip
    pub fn chip(&self) -> &Ym2149 {
        &self.chip
    }

    /// The emulated chip, for direct register writes between frames
    pub fn chip_mut(&mut self) -> &mut Ym2149 {
        &mut self.chip
    }

    /// Handle for queuing register writes from another thread
    pub fn register_writer(&self) -> RegisterWriter {
        self.writer.clone()
    }

    /// Flag that stops rendering at the next block boundary when set
    pub fn quit_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }

    /// Whether quit has been requested
    pub fn is_quitting(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }

    /// Output samples produced so far
    pub fn samples_out(&self) -> u64 {
        self.samples_out
    }

    /// The block planner
    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Render one period of `refresh_rate` Hz into `sink`.
    ///
    /// Returns the number of samples pushed. Stops early, without error,
    /// once quit is requested.
    pub fn render_frame<S>(&mut self, refresh_rate: f64, sink: &mut S) -> Result<usize>
    where
        S: OutputSink + ?Sized,
    {
        self.apply_pending();
        let blocks = self.timer.blocks_for_period(refresh_rate)?;
        let mut pushed = 0;
        for block in blocks {
            if self.quit.load(Ordering::Relaxed) {
                break;
            }
            let naive = self.chip.render(&block);
            let out = self.resampler.render(&block, naive);
            sink.push_samples(out)?;
            pushed += out.len();
        }
        self.samples_out += pushed as u64;
        Ok(pushed)
    }

    /// Render frames until quit is requested or `frame` returns false.
    ///
    /// `frame` runs before each period and may change registers. The sink
    /// is closed at the end, also when rendering failed, and leftover timer
    /// carry is reported. Returns the number of frames rendered.
    pub fn run<S, F>(&mut self, refresh_rate: f64, mut sink: S, mut frame: F) -> Result<u64>
    where
        S: OutputSink,
        F: FnMut(&mut Ym2149) -> bool,
    {
        let mut frames = 0u64;
        let mut outcome = Ok(());
        while !self.is_quitting() && frame(&mut self.chip) {
            if let Err(e) = self.render_frame(refresh_rate, &mut sink) {
                outcome = Err(e);
                break;
            }
            frames += 1;
        }
        let closed = sink.close();
        self.timer.finish();
        info!(
            "renderer: {} frames, {} samples",
            frames, self.samples_out
        );
        outcome?;
        closed?;
        Ok(frames)
    }

    fn apply_pending(&mut self) {
        let writes = self.writer.take();
        if !writes.is_empty() {
            debug!("renderer: applying {} queued register writes", writes.len());
        }
        for (addr, value) in writes {
            self.chip.set_register(addr, value);
        }
        self.writer.sync(self.chip.dump_registers());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::streaming::BufferSink;
    use crate::ym2149::dac::headroom;
    use crate::Ym2149Error;

    fn renderer() -> Renderer {
        let config = ChipConfig {
            clock_hz: 1_000_000,
            sample_rate: 25_000,
            kernel: crate::config::KernelParams {
                max_scale: 8,
                ..Default::default()
            },
            ..ChipConfig::default()
        };
        Renderer::new(config).unwrap()
    }

    #[test]
    fn test_frame_sample_count() {
        let mut r = renderer();
        let mut sink = BufferSink::new();
        for _ in 0..50 {
            assert_eq!(r.render_frame(50.0, &mut sink).unwrap(), 500);
        }
        assert_eq!(sink.samples().len(), 25_000);
        assert_eq!(r.samples_out(), 25_000);
        assert_eq!(r.timer().total_ticks(), 1_000_000);
    }

    #[test]
    fn test_silent_chip_settles_to_bias() {
        let mut r = renderer();
        let mut sink = BufferSink::new();
        for _ in 0..5 {
            r.render_frame(50.0, &mut sink).unwrap();
        }
        // All channels disabled and at level 0 sit at the lowest DAC step
        let last = *sink.samples().last().unwrap();
        let naive = r.chip_mut().render(&Block::new(u64::MAX, 1))[0];
        assert_eq!(last, naive);
        assert!(last < -headroom() * 0.9);
    }

    #[test]
    fn test_queued_writes_apply_next_frame() {
        let mut r = renderer();
        let mut writer = r.register_writer();
        let handle = std::thread::spawn(move || {
            let mixer = writer.read_register(0x07);
            writer.write_register(0x08, 0x1F);
            writer.write_register(0x17, 0x0A);
            mixer
        });
        assert_eq!(handle.join().unwrap(), 0x3F);

        let writer = r.register_writer();
        assert_eq!(writer.pending(), 2);
        assert_eq!(writer.read_register(0x08), 0x1F);
        assert_eq!(r.chip().register(0x08), 0);

        r.render_frame(50.0, &mut BufferSink::new()).unwrap();
        assert_eq!(writer.pending(), 0);
        assert_eq!(r.chip().register(0x08), 0x1F);
        assert_eq!(r.chip().register(0x07), 0x0A);
    }

    #[test]
    fn test_writer_shadow_follows_direct_writes() {
        let mut r = renderer();
        let writer = r.register_writer();
        r.chip_mut().set_register(0x0B, 0x34);
        r.render_frame(50.0, &mut BufferSink::new()).unwrap();
        assert_eq!(writer.read_register(0x0B), 0x34);
    }

    #[test]
    fn test_quit_stops_rendering() {
        let mut r = renderer();
        r.quit_handle().store(true, Ordering::Relaxed);
        let mut sink = BufferSink::new();
        assert_eq!(r.render_frame(50.0, &mut sink).unwrap(), 0);
        let frames = r.run(50.0, &mut sink, |_| true).unwrap();
        assert_eq!(frames, 0);
        assert!(sink.is_closed());
    }

    #[test]
    fn test_run_until_callback_stops() {
        let mut r = renderer();
        let mut sink = BufferSink::new();
        let mut count = 0;
        let frames = r
            .run(50.0, &mut sink, |chip| {
                chip.set_register(0x08, count as u8);
                count += 1;
                count <= 10
            })
            .unwrap();
        assert_eq!(frames, 10);
        assert_eq!(sink.samples().len(), 5_000);
        assert!(sink.is_closed());
        assert_eq!(r.chip().register(0x08), 10);
    }

    struct FailingSink {
        closed: bool,
    }

    impl OutputSink for FailingSink {
        fn push_samples(&mut self, _samples: &[f32]) -> Result<()> {
            Err(Ym2149Error::AudioFileError("disk full".into()))
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    #[test]
    fn test_sink_error_propagates_and_closes() {
        let mut r = renderer();
        let mut sink = FailingSink { closed: false };
        let err = r.run(50.0, &mut sink, |_| true).unwrap_err();
        assert!(matches!(err, Ym2149Error::AudioFileError(_)));
        assert!(sink.closed);
    }

    #[test]
    fn test_invalid_refresh_rate() {
        let mut r = renderer();
        assert!(r.render_frame(-1.0, &mut BufferSink::new()).is_err());
    }
}
