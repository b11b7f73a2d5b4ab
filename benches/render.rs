//! Benchmarks for the render path
//!
//! Run with: cargo bench --bench render

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use ym2149_blep::{Block, ChipConfig, MinBlepResampler, OutputSink, Renderer, Ym2149};

/// Sink that only counts samples
struct Discard(usize);

impl OutputSink for Discard {
    fn push_samples(&mut self, samples: &[f32]) -> ym2149_blep::Result<()> {
        self.0 += black_box(samples).len();
        Ok(())
    }
}

fn configure(chip: &mut Ym2149) {
    chip.set_register(0x00, 0x1C); // Tone A period low
    chip.set_register(0x01, 0x01); // Tone A period high (440 Hz)
    chip.set_register(0x02, 0x8E); // Tone B period low
    chip.set_register(0x06, 0x08); // Noise period
    chip.set_register(0x07, 0x1C); // Tone A/B, noise C
    chip.set_register(0x08, 0x0F);
    chip.set_register(0x09, 0x0C);
    chip.set_register(0x0A, 0x10); // C on the envelope
    chip.set_register(0x0B, 0x00);
    chip.set_register(0x0C, 0x04);
    chip.set_register(0x0D, 0x0E);
}

fn bench_chip_blocks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chip_render");

    let mut chip = Ym2149::new(ChipConfig::default()).unwrap();
    configure(&mut chip);

    for ticks in [2_000usize, 20_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(ticks), ticks, |b, &ticks| {
            let mut generation = 0;
            b.iter(|| {
                generation += 1;
                black_box(chip.render(&Block::new(generation, ticks)).len());
            });
        });
    }

    group.finish();
}

fn bench_resampler(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");

    let config = ChipConfig::default();
    let mut chip = Ym2149::new(config).unwrap();
    configure(&mut chip);
    let naive = chip.render(&Block::new(1, 20_000)).to_vec();
    let mut resampler = MinBlepResampler::from_config(&config);

    group.bench_function("20000_ticks", |b| {
        let mut generation = 0;
        b.iter(|| {
            generation += 1;
            black_box(resampler.render(&Block::new(generation, naive.len()), &naive).len());
        });
    });

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");

    let mut renderer = Renderer::new(ChipConfig::default()).unwrap();
    configure(renderer.chip_mut());

    group.bench_function("50hz", |b| {
        let mut sink = Discard(0);
        b.iter(|| {
            black_box(renderer.render_frame(50.0, &mut sink).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_chip_blocks, bench_resampler, bench_frames);
criterion_main!(benches);
