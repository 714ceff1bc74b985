//! Threaded render demo: a render thread owns the sampler while a control
//! thread plays notes, works the pedal and swaps the sample bank.
//!
//! Run with: RUST_LOG=debug cargo run -p strata-sampler --example threaded_render

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use strata_sampler::{Sampler, SamplerConfig, SamplerParam, SampleZone, ZoneMap};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK: usize = 256;

fn tone(freq: f32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| (i as f32 * freq * std::f32::consts::TAU / SAMPLE_RATE).sin() * 0.5)
        .collect()
}

fn bank(freq: f32) -> ZoneMap {
    let frames = SAMPLE_RATE as usize;
    ZoneMap::single(SampleZone::mono(tone(freq, frames), SAMPLE_RATE, freq).with_loop(0, frames))
}

fn note_freq(note: u8) -> f32 {
    440.0 * 2f32.powf((f32::from(note) - 69.0) / 12.0)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut sampler: Sampler = Sampler::new(SAMPLE_RATE).expect("valid sample rate");
    sampler.set_bank(bank(440.0));
    let handle = sampler.handle();

    let config = SamplerConfig::from_toml_str(
        r#"
        filter_enabled = true
        vibrato_depth = 0.2

        [amp_envelope]
        attack = 0.01
        release = 0.3
        "#,
    )
    .expect("valid config");
    handle.apply_config(&config).expect("config in range");

    let running = Arc::new(AtomicBool::new(true));
    let render_running = Arc::clone(&running);

    // --- Render thread ---
    let render = thread::spawn(move || {
        let mut left = vec![0.0f32; BLOCK];
        let mut right = vec![0.0f32; BLOCK];
        let mut blocks = 0usize;
        let mut peak = 0.0f32;
        while render_running.load(Ordering::Relaxed) {
            sampler.render(&mut [&mut left[..], &mut right[..]], BLOCK);
            peak = left.iter().chain(&right).fold(peak, |p, s| p.max(s.abs()));
            blocks += 1;
            if blocks % 100 == 0 {
                println!(
                    "block {:>5} | voices {:>2} | peak {:.3}",
                    blocks,
                    sampler.active_voice_count(),
                    peak
                );
                peak = 0.0;
            }
            thread::sleep(Duration::from_micros(500));
        }
        blocks
    });

    // --- Control thread (this one) ---
    println!("=== Chord ===");
    for note in [60u8, 64, 67] {
        handle.play_note(note, 100, note_freq(note));
    }
    thread::sleep(Duration::from_millis(300));

    println!("=== Pedal down, keys up ===");
    handle.sustain_pedal(true);
    for note in [60u8, 64, 67] {
        handle.stop_note(note, false);
    }
    thread::sleep(Duration::from_millis(300));
    println!("=== Pedal up ===");
    handle.sustain_pedal(false);
    thread::sleep(Duration::from_millis(400));

    println!("=== Bank swap ===");
    handle.play_note(72, 90, note_freq(72));
    thread::sleep(Duration::from_millis(100));
    handle.stop_all_voices();
    handle.set_bank(bank(220.0));
    handle.set_param(SamplerParam::PitchOffset, 12.0);
    handle.restart_voices();

    handle.play_note(69, 110, note_freq(69));
    thread::sleep(Duration::from_millis(300));
    handle.stop_note(69, false);
    thread::sleep(Duration::from_millis(400));

    running.store(false, Ordering::Relaxed);
    let blocks = render.join().expect("render thread panicked");
    println!("\nRendered {} blocks ({:.2} s)", blocks, (blocks * BLOCK) as f32 / SAMPLE_RATE);
}
