//! Allocation-free event and block path tests.
//!
//! These tests verify that MIDI handling and `Engine::process()` do not
//! allocate once the engine is built. They drive a busy event stream
//! (stealing, retriggers, bends, RPN, MTS, controller sweeps, polyphony
//! changes) through many blocks inside `assert_no_alloc`.
//!
//! Just run `cargo test`, no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use pv_engine::{Engine, EngineConfig};
use pv_ir::{TuningBank, TuningFrame};
use pv_master::SineVoice;

const BLOCK: usize = 256;

fn engine(voices: usize) -> Engine<SineVoice> {
    let config = EngineConfig::default()
        .with_sample_rate(48_000)
        .with_max_block_size(BLOCK)
        .with_max_voices(voices);
    Engine::new(SineVoice::new, config).unwrap()
}

fn mts_frame(value: u8) -> [u8; 21] {
    let mut frame = [0u8; 21];
    frame[..8].copy_from_slice(&[0xF0, 0x7F, 0x7F, 0x08, 0x08, 0x03, 0x7F, 0x7F]);
    frame[8..20].fill(value);
    frame[20] = 0xF7;
    frame
}

/// Handle a few events per block for `blocks` blocks, aborting on any heap
/// allocation.
fn assert_stream_alloc_free(engine: &mut Engine<SineVoice>, blocks: usize) {
    let mut left = vec![0.0f32; BLOCK * 2];
    let mut right = vec![0.0f32; BLOCK * 2];
    let mts_up = mts_frame(80);
    let mts_flat = mts_frame(64);

    assert_no_alloc(|| {
        for b in 0..blocks {
            let note = 36 + (b * 7 % 60) as u8;
            let ch = (b % 4) as u8;
            engine.handle_midi(&[0x90 | ch, note, 100]);
            engine.handle_midi(&[0x90 | ch, note, 90]);
            engine.handle_midi(&[0xE0 | ch, (b % 128) as u8, 0x40]);
            engine.handle_midi(&[0xB0 | ch, 7, (b % 128) as u8]);
            if b % 5 == 0 {
                engine.handle_midi(&[0x80 | ch, 36 + ((b + 3) * 7 % 60) as u8, 0]);
            }
            if b % 11 == 0 {
                engine.handle_midi(&[0xB0, 101, 0]);
                engine.handle_midi(&[0xB0, 100, 1]);
                engine.handle_midi(&[0xB0, 6, 0x50]);
                engine.handle_midi(&[0xB0, 96, 0]);
            }
            if b % 13 == 0 {
                engine.handle_midi(if b % 2 == 0 { &mts_up } else { &mts_flat });
            }
            if b % 17 == 0 && engine.max_voices() > 0 {
                engine.set_polyphony(1 + b % engine.max_voices());
            }
            if b % 29 == 0 {
                engine.select_tuning(b % 3);
            }
            if b % 31 == 0 {
                engine.handle_midi(&[0xB0 | ch, 123, 0]);
            }
            let frames = if b % 3 == 0 { BLOCK * 2 } else { BLOCK - b % 64 };
            engine.process(frames, &[], &mut [&mut left[..], &mut right[..]]);
        }
    });
}

#[test]
fn instrument_stream_alloc_free() {
    let mut e = engine(8);
    let bank = TuningBank::new(vec![
        TuningFrame::new("raised", &mts_frame(80)).unwrap(),
        TuningFrame::new("plain", &mts_frame(64)).unwrap(),
    ]);
    e.set_tuning_bank(bank);
    assert_stream_alloc_free(&mut e, 400);
}

#[test]
fn single_voice_steal_alloc_free() {
    let mut e = engine(1);
    assert_stream_alloc_free(&mut e, 200);
}

#[test]
fn effect_mode_alloc_free() {
    let mut e = engine(0);
    assert!(e.is_effect());
    assert_stream_alloc_free(&mut e, 100);
}

#[test]
fn suspended_bypass_alloc_free() {
    let mut e = engine(4);
    e.suspend();
    assert_stream_alloc_free(&mut e, 50);
}
