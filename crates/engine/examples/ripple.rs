//! Headless demo: run the engine for a couple of seconds with a line
//! oscillator and report how many frames the render callback delivered.
//!
//! Run with: cargo run -p engine --example ripple

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use engine::{SourceKind, WaveEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "engine=debug,kernel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut engine = WaveEngine::with_size(200);
    engine.set_number_of_threads(4);
    engine.set_frames_per_second(30.0);

    engine.set_oscillator_source(0, SourceKind::Line);
    engine.set_oscillator_anchor_a(0, [60.0, 100.0]);
    engine.set_oscillator_anchor_b(0, [140.0, 100.0]);
    engine.set_oscillator_period(0, 25.0);
    engine.set_oscillator_enabled(0, true);

    let frames = Arc::new(AtomicUsize::new(0));
    {
        let frames = Arc::clone(&frames);
        engine.set_render_callback(move |bitmap| {
            debug_assert_eq!(bitmap.len(), 200 * 200 * 3);
            frames.fetch_add(1, Ordering::Relaxed);
        });
    }

    engine.start();
    std::thread::sleep(Duration::from_secs(2));
    engine.stop();

    tracing::info!(
        "delivered {} frames in 2 s",
        frames.load(Ordering::Relaxed)
    );
    engine.dispose();
}
