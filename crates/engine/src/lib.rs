//! Wave Pool Engine
//!
//! Orchestration for the wave pool simulation kernel:
//! - A fixed pool of worker threads that partition the grid by index range
//!   and execute one mission per barrier cycle.
//! - A conductor thread that rate-limits iterations and paints
//!   independently and delivers the bitmap through a render callback.
//! - The public control surface: clamped configuration setters, the
//!   external data-access lock, start/stop/dispose.
//! - Serde-backed settings loading.

#![warn(missing_docs)]

mod conductor;
pub mod control;
pub mod settings;
mod shared;
mod workers;

pub use control::{FieldMut, PoolData, RenderCallback, WaveEngine};
pub use settings::{EngineSettings, OscillatorSettings, SourceSetting};

pub use kernel::{ParticleAttribute, Rgb, SourceKind};

/// Create an idle engine from a JSON settings file.
///
/// Loads and validates the settings, builds the engine, and pushes the
/// configuration through the control surface. The engine is returned
/// stopped; call [`WaveEngine::start`] to run it.
pub fn create_engine(settings_path: &str) -> Result<WaveEngine, String> {
    tracing::info!("creating wave engine from settings: {}", settings_path);

    let settings = EngineSettings::load(settings_path)?;
    let engine = WaveEngine::with_size(settings.size);
    settings.apply(&engine);

    tracing::info!(
        "engine configured: {}x{} pool, {} workers, {} oscillators",
        settings.size,
        settings.size,
        settings.threads,
        settings.oscillators.len()
    );
    Ok(engine)
}
