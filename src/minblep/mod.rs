//! Minimum-phase band-limited steps (minBLEP)
//!
//! A step at an arbitrary sub-sample position is replaced by a
//! precomputed band-limited step response, so the naive step signal of the
//! chip can be decimated to the output rate without aliasing.
//!
//! Kernel construction:
//! - Blackman-windowed sinc low-pass (`bli`) at `scale` times the output rate
//! - Minimum-phase equivalent via the real cepstrum (`minbli`), which keeps
//!   the magnitude spectrum and moves the energy to the start of the kernel
//! - Running sum gives the step response, cut into `scale` interleaved rows
//!   indexed by sub-sample offset

use log::debug;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::config::{ChipConfig, KernelParams};

pub mod resampler;

pub use resampler::MinBlepResampler;

/// Floor applied to the magnitude spectrum before taking its log (e^-100)
const LOG_FLOOR_EXP: f64 = -100.0;

/// FFT frame size as a multiple of the kernel's next power of two.
///
/// The real cepstrum of a sharp low-pass decays slowly, so a frame barely
/// longer than the kernel aliases it and leaves energy past the kernel
/// length that truncation would drop.
const FFT_OVERSIZE: usize = 8;

/// Intermediate kernels of one design, kept for inspection
#[derive(Debug, Clone)]
pub struct KernelDesign {
    /// Linear-phase windowed sinc, odd length, unit DC gain
    pub bli: Vec<f64>,
    /// Minimum-phase kernel over the whole FFT frame
    pub minbli: Vec<f64>,
    /// FFT frame length (power of two, several times `bli`)
    pub fft_size: usize,
}

impl KernelDesign {
    /// Design the kernel for `params` at `scale` times the output rate
    pub fn new(params: &KernelParams, scale: usize) -> Self {
        let scale = scale.max(1) as f64;
        let cutoff = params.cutoff / scale;
        let transition = params.transition / scale;
        let bli = windowed_sinc(cutoff, transition);
        let fft_size = (bli.len() + 1).next_power_of_two() * FFT_OVERSIZE;
        let minbli = minimum_phase(&bli, fft_size);
        KernelDesign {
            bli,
            minbli,
            fft_size,
        }
    }

    /// Step response: running sum of the minimum-phase kernel, ending at 1
    pub fn step_response(&self) -> Vec<f64> {
        let mut acc = 0.0;
        let mut minblep: Vec<f64> = self.minbli[..self.bli.len()]
            .iter()
            .map(|&v| {
                acc += v;
                acc
            })
            .collect();
        if let Some(&last) = minblep.last() {
            for v in &mut minblep {
                *v /= last;
            }
            // Exact after normalization
            if let Some(end) = minblep.last_mut() {
                *end = 1.0;
            }
        }
        minblep
    }
}

/// Blackman-windowed sinc of odd length, normalized to unit DC gain.
///
/// `cutoff` and `transition` are in cycles per sample.
pub fn windowed_sinc(cutoff: f64, transition: f64) -> Vec<f64> {
    let mut len = (4.0 / transition).ceil() as usize;
    if len % 2 == 0 {
        len += 1;
    }
    let len = len.max(3);
    let mid = (len - 1) as f64 / 2.0;
    let span = (len - 1) as f64;
    let mut kernel: Vec<f64> = (0..len)
        .map(|i| {
            let x = 2.0 * cutoff * (i as f64 - mid);
            let sinc = if x == 0.0 {
                1.0
            } else {
                (std::f64::consts::PI * x).sin() / (std::f64::consts::PI * x)
            };
            let phase = 2.0 * std::f64::consts::PI * i as f64 / span;
            let window = 0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos();
            sinc * window
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Minimum-phase equivalent of `kernel` over an `fft_size` frame.
///
/// Folds the real cepstrum onto its causal half: the anti-causal half is
/// zeroed, the causal half doubled, and the DC and midpoint terms kept.
pub fn minimum_phase(kernel: &[f64], fft_size: usize) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);
    let norm = 1.0 / fft_size as f64;
    let floor = LOG_FLOOR_EXP.exp();

    let mut buf: Vec<Complex<f64>> = kernel
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_size)
        .collect();
    fft.process(&mut buf);
    for c in &mut buf {
        *c = Complex::new(c.norm().max(floor).ln(), 0.0);
    }
    ifft.process(&mut buf);

    let half = fft_size / 2;
    for (i, c) in buf.iter_mut().enumerate() {
        let re = c.re * norm;
        *c = match i {
            0 => Complex::new(re, 0.0),
            i if i < half => Complex::new(2.0 * re, 0.0),
            i if i == half => Complex::new(re, 0.0),
            _ => Complex::new(0.0, 0.0),
        };
    }
    fft.process(&mut buf);
    for c in &mut buf {
        *c = c.exp();
    }
    ifft.process(&mut buf);
    buf.iter().map(|c| c.re * norm).collect()
}

/// Magnitude of the `fft_size`-point DFT of `signal` (zero-padded)
pub fn magnitude_spectrum(signal: &[f64], fft_size: usize) -> Vec<f64> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let mut buf: Vec<Complex<f64>> = signal
        .iter()
        .map(|&v| Complex::new(v, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(fft_size)
        .collect();
    fft.process(&mut buf);
    buf.iter().map(|c| c.norm()).collect()
}

/// Immutable minBLEP table for one naive/output rate pair
#[derive(Debug, Clone)]
pub struct MinBleps {
    naive_rate: u64,
    out_rate: u64,
    scale: usize,
    mixin_len: usize,
    /// `scale` rows of `mixin_len` step-response samples
    table: Vec<f32>,
}

impl MinBleps {
    /// Build the table for a validated chip configuration
    pub fn from_config(config: &ChipConfig) -> Self {
        Self::new(
            config.naive_rate() as u64,
            config.sample_rate as u64,
            &config.kernel,
        )
    }

    /// Build the table for `naive_rate` ticks/s resampled to `out_rate` Hz
    pub fn new(naive_rate: u64, out_rate: u64, params: &KernelParams) -> Self {
        let scale = params.scale_for(naive_rate, out_rate);
        let design = KernelDesign::new(params, scale);
        let mut minblep = design.step_response();
        let padded = minblep.len().div_ceil(scale) * scale;
        minblep.resize(padded, 1.0);
        let mixin_len = padded / scale;

        let mut table = vec![0f32; scale * mixin_len];
        for (shape, row) in table.chunks_exact_mut(mixin_len).enumerate() {
            for (k, slot) in row.iter_mut().enumerate() {
                *slot = minblep[k * scale + shape] as f32;
                debug_assert!(slot.is_finite(), "non-finite minBLEP value");
            }
        }
        debug!(
            "minblep: naive {} Hz -> {} Hz, scale {}, kernel {} taps, fft {}, mixin {}",
            naive_rate,
            out_rate,
            scale,
            design.bli.len(),
            design.fft_size,
            mixin_len
        );
        MinBleps {
            naive_rate,
            out_rate,
            scale,
            mixin_len,
            table,
        }
    }

    /// Sub-sample resolution
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Output samples each step response spans
    pub fn mixin_len(&self) -> usize {
        self.mixin_len
    }

    /// Naive rate in ticks per second
    pub fn naive_rate(&self) -> u64 {
        self.naive_rate
    }

    /// Output rate in Hz
    pub fn out_rate(&self) -> u64 {
        self.out_rate
    }

    /// Position of naive tick `t` in 1/scale output samples, rounded half to even
    pub fn position(&self, t: u64) -> u64 {
        let num = t as u128 * self.out_rate as u128 * self.scale as u128;
        let den = self.naive_rate as u128;
        let q = num / den;
        let twice_rem = 2 * (num % den);
        let p = if twice_rem > den || (twice_rem == den && q % 2 == 1) {
            q + 1
        } else {
            q
        };
        p as u64
    }

    /// First output sample at or after naive tick `t`, and the row to use
    ///
    /// The shape is always in `0..scale`; a tick landing exactly on an
    /// output sample uses shape 0 at that sample.
    pub fn locate(&self, t: u64) -> (u64, usize) {
        let p = self.position(t);
        let scale = self.scale as u64;
        let out_index = p.div_ceil(scale);
        let shape = (out_index * scale - p) as usize;
        (out_index, shape)
    }

    /// Step response row for a sub-sample shape
    #[inline]
    pub fn mixin(&self, shape: usize) -> &[f32] {
        let start = shape * self.mixin_len;
        &self.table[start..start + self.mixin_len]
    }

    /// Output index and scaled step response for a transition of `delta` at tick `t`
    pub fn get_mixin(&self, t: u64, delta: f32) -> (u64, impl Iterator<Item = f32> + '_) {
        let (out_index, shape) = self.locate(t);
        let row = self.mixin(shape).iter().map(move |&v| v * delta);
        (out_index, row)
    }
}
