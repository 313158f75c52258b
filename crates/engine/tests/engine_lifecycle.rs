//! Lifecycle and control-surface tests: clamps, sentinels, the external
//! data lock, and a short live run through the worker pool and conductor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use engine::{EngineSettings, ParticleAttribute, FieldMut, SourceKind, WaveEngine};

#[test]
fn engine_starts_stops_and_disposes() {
    let mut engine = WaveEngine::with_size(16);
    assert!(!engine.is_working());

    engine.start();
    assert!(engine.is_working());

    engine.stop();
    assert!(!engine.is_working());

    engine.dispose();
    // Dispose is idempotent.
    engine.dispose();
}

#[test]
fn setters_clamp_to_documented_ranges() {
    let engine = WaveEngine::with_size(16);

    engine.set_number_of_threads(100);
    assert_eq!(engine.number_of_threads(), 32);
    engine.set_number_of_threads(0);
    assert_eq!(engine.number_of_threads(), 1);

    engine.set_thread_delay(5000);
    assert_eq!(engine.thread_delay(), 1000);

    engine.set_loss_ratio(2.0);
    assert_eq!(engine.loss_ratio(), 1.0);
    engine.set_loss_ratio(-0.5);
    assert_eq!(engine.loss_ratio(), 0.0);

    engine.set_absorber_thickness(100);
    assert_eq!(engine.absorber_thickness(), 8); // size / 2

    engine.set_iterations_per_second(-3.0);
    assert_eq!(engine.iterations_per_second(), 0.0);

    engine.set_amplitude_multiplier(-1.0);
    assert_eq!(engine.amplitude_multiplier(), 0.0);
}

#[test]
fn oscillator_surface_rejects_bad_ids_and_periods() {
    let engine = WaveEngine::with_size(16);

    assert_eq!(engine.oscillator_period(99), -1.0);
    assert_eq!(engine.oscillator_amplitude(99), -1.0);
    assert!(!engine.oscillator_enabled(99));
    assert_eq!(engine.oscillator_source(99), SourceKind::Point);
    assert_eq!(engine.oscillator_anchor_a(99), [-1.0, -1.0]);
    assert_eq!(engine.oscillator_real_location(99), [-1.0, -1.0]);

    // Period below 1 is rejected, not clamped.
    engine.set_oscillator_period(0, 0.5);
    assert_eq!(engine.oscillator_period(0), 30.0);
    engine.set_oscillator_period(0, 1.0);
    assert_eq!(engine.oscillator_period(0), 1.0);

    engine.set_oscillator_move_period(0, 0.0);
    assert_eq!(engine.oscillator_move_period(0), 800.0);

    // Setters on bad ids are silent no-ops.
    engine.set_oscillator_amplitude(42, 9.0);
    engine.set_oscillator_enabled(42, true);
}

#[test]
fn oscillator_real_location_reports_the_source_position() {
    let engine = WaveEngine::with_size(32);
    engine.set_oscillator_anchor_a(0, [4.0, 6.0]);
    assert_eq!(engine.oscillator_real_location(0), [4.0, 6.0]);

    engine.set_oscillator_source(1, SourceKind::Line);
    engine.set_oscillator_anchor_a(1, [0.0, 0.0]);
    engine.set_oscillator_anchor_b(1, [10.0, 20.0]);
    assert_eq!(engine.oscillator_real_location(1), [5.0, 10.0]);
}

#[test]
fn external_lock_is_exclusive_and_reentrant_safe() {
    let engine = WaveEngine::with_size(8);

    let mut data = engine.lock().expect("first lock must succeed");
    assert!(engine.lock().is_none(), "double lock must be refused");

    data.heights()[3] = 1.5;
    match data.field(ParticleAttribute::Fixity) {
        FieldMut::Flags(fixity) => fixity[4] = 1,
        FieldMut::Scalar(_) => panic!("fixity is a flag field"),
    }
    data.unlock();

    let mut data = engine.lock().expect("lock must succeed after unlock");
    assert_eq!(data.heights()[3], 1.5);
    assert_eq!(data.fixity()[4], 1);
}

#[test]
fn resize_to_same_size_keeps_mass_and_fixity() {
    let engine = WaveEngine::with_size(8);
    {
        let mut data = engine.lock().unwrap();
        data.masses()[10] = 2.5;
        data.fixity()[11] = 1;
        data.heights()[12] = 3.0;
    }

    engine.set_size(8);

    let mut data = engine.lock().unwrap();
    assert_eq!(data.masses()[10], 2.5);
    assert_eq!(data.fixity()[11], 1);
    assert_eq!(data.heights()[12], 0.0, "heights reset on resize");
}

#[test]
fn settings_apply_through_the_control_surface() {
    let settings: EngineSettings = serde_json::from_str(
        r#"{
            "size": 24,
            "threads": 3,
            "loss": 0.25,
            "fps": 10.0,
            "extreme_contrast": true,
            "oscillators": [
                { "active": true, "period": 12.0, "anchor_a": [5.0, 5.0] }
            ]
        }"#,
    )
    .unwrap();
    settings.validate().unwrap();

    let engine = WaveEngine::with_size(8);
    settings.apply(&engine);

    assert_eq!(engine.size(), 24);
    assert_eq!(engine.number_of_threads(), 3);
    assert_eq!(engine.loss_ratio(), 0.25);
    assert_eq!(engine.frames_per_second(), 10.0);
    assert!(engine.extreme_contrast_enabled());
    assert!(engine.oscillator_enabled(0));
    assert_eq!(engine.oscillator_period(0), 12.0);
    assert_eq!(engine.oscillator_anchor_a(0), [5.0, 5.0]);
}

#[test]
fn running_engine_spreads_an_impulse() {
    let mut engine = WaveEngine::with_size(16);
    engine.set_number_of_threads(2);
    engine.set_render_enabled(false);

    {
        let mut data = engine.lock().unwrap();
        data.heights()[8 + 16 * 8] = 1.0;
    }

    engine.start();
    thread::sleep(Duration::from_millis(300));
    engine.stop();

    // With IPS at the default 100 the 300 ms window runs many cycles; the
    // impulse cell must have been averaged down.
    let mut data = engine.lock().unwrap();
    assert!(
        data.heights()[8 + 16 * 8] < 1.0,
        "impulse never moved: {}",
        data.heights()[8 + 16 * 8]
    );
    drop(data);
    engine.dispose();
}

#[test]
fn render_callback_receives_bitmaps() {
    let mut engine = WaveEngine::with_size(16);
    engine.set_frames_per_second(60.0);

    let frames = Arc::new(AtomicUsize::new(0));
    let sized_right = Arc::new(AtomicBool::new(true));
    {
        let frames = Arc::clone(&frames);
        let sized_right = Arc::clone(&sized_right);
        engine.set_render_callback(move |bitmap| {
            if bitmap.len() != 16 * 16 * 3 {
                sized_right.store(false, Ordering::Relaxed);
            }
            frames.fetch_add(1, Ordering::Relaxed);
        });
    }

    engine.start();
    thread::sleep(Duration::from_millis(400));
    engine.stop();
    engine.dispose();

    assert!(
        frames.load(Ordering::Relaxed) >= 1,
        "no frame was ever delivered"
    );
    assert!(sized_right.load(Ordering::Relaxed), "bitmap had a wrong size");
}
