//! Criterion benchmarks for strata-sampler components
//!
//! Run with: cargo bench -p strata-sampler
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use strata_sampler::{AdsrEnvelope, AdsrParams, Sampler, SamplerParam, SampleZone, ZoneMap};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512, 1024];
const VOICE_COUNTS: &[usize] = &[1, 8, 32, 64];

fn looped_bank() -> ZoneMap {
    let data: Vec<f32> = (0..48000)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / SAMPLE_RATE).sin() * 0.5)
        .collect();
    ZoneMap::single(SampleZone::mono(data, SAMPLE_RATE, 440.0).with_loop(0, 48000))
}

fn sampler_with_voices(voices: usize, filter: bool) -> Sampler {
    let mut sampler: Sampler = Sampler::new(SAMPLE_RATE).unwrap();
    sampler.set_bank(looped_bank());
    sampler.set_filter_enabled(filter);
    sampler.set_param(SamplerParam::VibratoDepth, 0.3);
    for i in 0..voices {
        let note = 36 + (i % 64) as u8;
        sampler.play_note(note, 100, 440.0 * (1.0 + i as f32 * 0.01));
    }
    sampler
}

// ============================================================================
// Envelope benchmarks
// ============================================================================

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("AdsrEnvelope");
    let params = AdsrParams::with_times(SAMPLE_RATE, 0.01, 0.1, 0.7, 0.2);

    for &block_size in BLOCK_SIZES {
        group.bench_with_input(
            BenchmarkId::new("next_sample", block_size),
            &block_size,
            |b, &size| {
                let mut env = AdsrEnvelope::new();
                env.start();
                b.iter(|| {
                    let mut sum = 0.0f32;
                    for _ in 0..size {
                        sum += env.next_sample(&params);
                    }
                    black_box(sum)
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Sampler render benchmarks
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sampler");

    for &voices in VOICE_COUNTS {
        for (name, filter) in [("render", false), ("render_filtered", true)] {
            group.bench_with_input(BenchmarkId::new(name, voices), &voices, |b, &voices| {
                let mut sampler = sampler_with_voices(voices, filter);
                let mut left = vec![0.0f32; 256];
                let mut right = vec![0.0f32; 256];
                b.iter(|| {
                    sampler.render(&mut [&mut left[..], &mut right[..]], 256);
                    black_box(left[0] + right[0])
                });
            });
        }
    }

    group.finish();
}

fn bench_note_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sampler events");

    group.bench_function("play_note_steal", |b| {
        let mut sampler = sampler_with_voices(64, false);
        let mut note = 0u8;
        b.iter(|| {
            note = (note + 1) % 128;
            sampler.play_note(black_box(note), 100, 440.0);
        });
    });

    group.bench_function("handle_queue_and_drain", |b| {
        let mut sampler = sampler_with_voices(0, false);
        let handle = sampler.handle();
        let mut left = vec![0.0f32; 64];
        let mut right = vec![0.0f32; 64];
        b.iter(|| {
            for note in 60..68u8 {
                handle.play_note(note, 100, 440.0);
            }
            for note in 60..68u8 {
                handle.stop_note(note, true);
            }
            sampler.render(&mut [&mut left[..], &mut right[..]], 64);
            black_box(left[0])
        });
    });

    group.finish();
}

criterion_group!(benches, bench_envelope, bench_render, bench_note_events);

criterion_main!(benches);
