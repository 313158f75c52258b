//! Engine settings: serde-backed configuration with validation.
//!
//! Every field falls back to the engine default when absent, so a settings
//! file only needs to name what it changes. `validate` rejects values the
//! imperative setters would otherwise silently clamp, which makes mistakes
//! in hand-written files visible.

use serde::{Deserialize, Serialize};
use std::fs;

use kernel::{Rgb, SourceKind, MAX_OSCILLATORS};

use crate::control::WaveEngine;
use crate::workers::MAX_WORKERS;

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Edge length of the pool.
    #[serde(default = "default_size")]
    pub size: usize,
    /// Worker thread count.
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Iterations per second, 0 = unlimited.
    #[serde(default = "default_ips")]
    pub ips: f64,
    /// Paints per second, 0 = unlimited.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Idle sleep in milliseconds.
    #[serde(default = "default_thread_delay_ms")]
    pub thread_delay_ms: u64,
    /// Throughput log interval in milliseconds.
    #[serde(default = "default_log_interval_ms")]
    pub performance_log_interval_ms: u64,
    /// Emit the periodic throughput line.
    #[serde(default = "default_true")]
    pub log_performance: bool,
    /// Base energy loss ratio in `[0, 1]`.
    #[serde(default)]
    pub loss: f64,
    /// Absorbing frame on/off.
    #[serde(default = "default_true")]
    pub absorber_enabled: bool,
    /// Absorbing frame depth in cells.
    #[serde(default = "default_absorber_thickness")]
    pub absorber_thickness: usize,
    /// Loss ratio at the pool edge, in `[0, 1]`.
    #[serde(default = "default_absorber_loss")]
    pub absorber_loss: f64,
    /// Per-cycle mean-height shift on/off.
    #[serde(default = "default_true")]
    pub shifting: bool,
    /// Trade limiter accuracy for lower idle CPU use.
    #[serde(default)]
    pub power_save: bool,
    /// Run paint cycles and the render callback.
    #[serde(default = "default_true")]
    pub render_enabled: bool,
    /// Run calculation cycles.
    #[serde(default = "default_true")]
    pub calculation_enabled: bool,
    /// Crest color as `[r, g, b]`.
    #[serde(default = "default_crest")]
    pub crest_color: [u8; 3],
    /// Trough color as `[r, g, b]`.
    #[serde(default = "default_trough")]
    pub trough_color: [u8; 3],
    /// Static particle color as `[r, g, b]`.
    #[serde(default = "default_static")]
    pub static_color: [u8; 3],
    /// Collapse painting to crest / trough / midpoint.
    #[serde(default)]
    pub extreme_contrast: bool,
    /// Height gain before the crest/trough interpolation.
    #[serde(default = "default_amplitude_multiplier")]
    pub amplitude_multiplier: f64,
    /// Paint the mass field instead of the wave.
    #[serde(default)]
    pub mass_map: bool,
    /// Cold end of the mass-map palette range.
    #[serde(default = "default_mass_low")]
    pub mass_map_range_low: f64,
    /// Hot end of the mass-map palette range.
    #[serde(default = "default_mass_high")]
    pub mass_map_range_high: f64,
    /// Oscillator slots, applied in order starting at slot 0.
    #[serde(default)]
    pub oscillators: Vec<OscillatorSettings>,
}

/// Configuration of one oscillator slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorSettings {
    /// Whether the slot drives the pool.
    #[serde(default)]
    pub active: bool,
    /// Source geometry.
    #[serde(default = "default_source")]
    pub source: SourceSetting,
    /// Iterations per sine cycle, at least 1.
    #[serde(default = "default_period")]
    pub period: f64,
    /// Phase offset in degrees.
    #[serde(default)]
    pub phase: f64,
    /// Peak height.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Iterations per anchor-to-anchor pass, at least 1.
    #[serde(default = "default_move_period")]
    pub move_period: f64,
    /// First anchor in pool coordinates.
    #[serde(default)]
    pub anchor_a: [f64; 2],
    /// Second anchor in pool coordinates.
    #[serde(default)]
    pub anchor_b: [f64; 2],
}

/// Serializable source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSetting {
    /// Single-cell source at anchor A.
    Point,
    /// Segment source from anchor A to anchor B.
    Line,
    /// Gliding source from anchor A to anchor B.
    MovingPoint,
}

impl From<SourceSetting> for SourceKind {
    fn from(setting: SourceSetting) -> Self {
        match setting {
            SourceSetting::Point => SourceKind::Point,
            SourceSetting::Line => SourceKind::Line,
            SourceSetting::MovingPoint => SourceKind::MovingPoint,
        }
    }
}

fn default_size() -> usize {
    300
}
fn default_threads() -> usize {
    1
}
fn default_ips() -> f64 {
    100.0
}
fn default_fps() -> f64 {
    25.0
}
fn default_thread_delay_ms() -> u64 {
    5
}
fn default_log_interval_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_absorber_thickness() -> usize {
    25
}
fn default_absorber_loss() -> f64 {
    0.3
}
fn default_crest() -> [u8; 3] {
    [0xFF, 0xFF, 0xFF]
}
fn default_trough() -> [u8; 3] {
    [0, 0, 0]
}
fn default_static() -> [u8; 3] {
    [0xFF, 0xFF, 0]
}
fn default_amplitude_multiplier() -> f64 {
    20.0
}
fn default_mass_low() -> f64 {
    1.0
}
fn default_mass_high() -> f64 {
    5.0
}
fn default_source() -> SourceSetting {
    SourceSetting::Point
}
fn default_period() -> f64 {
    30.0
}
fn default_amplitude() -> f64 {
    1.0
}
fn default_move_period() -> f64 {
    800.0
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            size: default_size(),
            threads: default_threads(),
            ips: default_ips(),
            fps: default_fps(),
            thread_delay_ms: default_thread_delay_ms(),
            performance_log_interval_ms: default_log_interval_ms(),
            log_performance: true,
            loss: 0.0,
            absorber_enabled: true,
            absorber_thickness: default_absorber_thickness(),
            absorber_loss: default_absorber_loss(),
            shifting: true,
            power_save: false,
            render_enabled: true,
            calculation_enabled: true,
            crest_color: default_crest(),
            trough_color: default_trough(),
            static_color: default_static(),
            extreme_contrast: false,
            amplitude_multiplier: default_amplitude_multiplier(),
            mass_map: false,
            mass_map_range_low: default_mass_low(),
            mass_map_range_high: default_mass_high(),
            oscillators: Vec::new(),
        }
    }
}

impl Default for OscillatorSettings {
    fn default() -> Self {
        Self {
            active: false,
            source: default_source(),
            period: default_period(),
            phase: 0.0,
            amplitude: default_amplitude(),
            move_period: default_move_period(),
            anchor_a: [0.0, 0.0],
            anchor_b: [0.0, 0.0],
        }
    }
}

impl EngineSettings {
    /// Load settings from a JSON file and validate them.
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read settings file {}: {}", path, e))?;

        let settings: EngineSettings = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse settings JSON: {}", e))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.size < 1 {
            return Err("Pool size must be at least 1".to_string());
        }
        if self.threads < 1 || self.threads > MAX_WORKERS {
            return Err(format!("Thread count must be in [1, {}]", MAX_WORKERS));
        }
        if self.ips < 0.0 {
            return Err("Iterations per second must be non-negative".to_string());
        }
        if self.fps < 0.0 {
            return Err("Frames per second must be non-negative".to_string());
        }
        if self.thread_delay_ms > 1000 {
            return Err("Thread delay must be at most 1000 ms".to_string());
        }
        if !(0.0..=1.0).contains(&self.loss) {
            return Err("Loss ratio must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.absorber_loss) {
            return Err("Absorber loss ratio must be in [0, 1]".to_string());
        }
        if self.amplitude_multiplier < 0.0 {
            return Err("Amplitude multiplier must be non-negative".to_string());
        }
        if self.mass_map_range_low < 0.0 || self.mass_map_range_high < 0.0 {
            return Err("Mass map range bounds must be non-negative".to_string());
        }
        if self.oscillators.len() > MAX_OSCILLATORS {
            return Err(format!(
                "At most {} oscillators are supported",
                MAX_OSCILLATORS
            ));
        }
        for (id, osc) in self.oscillators.iter().enumerate() {
            if osc.period < 1.0 {
                return Err(format!("Oscillator {}: period must be at least 1", id));
            }
            if osc.move_period < 1.0 {
                return Err(format!("Oscillator {}: move period must be at least 1", id));
            }
        }
        Ok(())
    }

    /// Push the settings into an engine through its setters.
    pub fn apply(&self, engine: &WaveEngine) {
        engine.set_size(self.size);
        engine.set_number_of_threads(self.threads);
        engine.set_iterations_per_second(self.ips);
        engine.set_frames_per_second(self.fps);
        engine.set_thread_delay(self.thread_delay_ms);
        engine.set_performance_log_interval(self.performance_log_interval_ms);
        engine.set_log_performance(self.log_performance);
        engine.set_loss_ratio(self.loss);
        engine.set_absorber_enabled(self.absorber_enabled);
        engine.set_absorber_thickness(self.absorber_thickness);
        engine.set_absorber_loss_ratio(self.absorber_loss);
        engine.set_shift_particles_enabled(self.shifting);
        engine.set_power_save_mode(self.power_save);
        engine.set_render_enabled(self.render_enabled);
        engine.set_calculation_enabled(self.calculation_enabled);
        engine.set_crest_color(rgb(self.crest_color));
        engine.set_trough_color(rgb(self.trough_color));
        engine.set_static_color(rgb(self.static_color));
        engine.set_extreme_contrast_enabled(self.extreme_contrast);
        engine.set_amplitude_multiplier(self.amplitude_multiplier);
        engine.set_show_mass_map(self.mass_map);
        engine.set_mass_map_range_low(self.mass_map_range_low);
        engine.set_mass_map_range_high(self.mass_map_range_high);
        for (id, osc) in self.oscillators.iter().enumerate() {
            engine.set_oscillator_source(id, osc.source.into());
            engine.set_oscillator_period(id, osc.period);
            engine.set_oscillator_phase(id, osc.phase);
            engine.set_oscillator_amplitude(id, osc.amplitude);
            engine.set_oscillator_move_period(id, osc.move_period);
            engine.set_oscillator_anchor_a(id, osc.anchor_a);
            engine.set_oscillator_anchor_b(id, osc.anchor_b);
            engine.set_oscillator_enabled(id, osc.active);
        }
    }
}

fn rgb(channels: [u8; 3]) -> Rgb {
    Rgb::new(channels[0], channels[1], channels[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = EngineSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.size, 300);
        assert_eq!(settings.threads, 1);
        assert_eq!(settings.fps, 25.0);
        assert_eq!(settings.absorber_thickness, 25);
    }

    #[test]
    fn empty_json_yields_defaults() {
        let settings: EngineSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.ips, 100.0);
        assert!(settings.shifting);
        assert!(settings.oscillators.is_empty());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let settings: EngineSettings = serde_json::from_str(
            r#"{
                "size": 64,
                "threads": 4,
                "oscillators": [
                    { "active": true, "source": "Line", "anchor_b": [10.0, 0.0] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(settings.size, 64);
        assert_eq!(settings.threads, 4);
        assert_eq!(settings.fps, 25.0);
        assert_eq!(settings.oscillators.len(), 1);
        assert_eq!(settings.oscillators[0].source, SourceSetting::Line);
        assert_eq!(settings.oscillators[0].period, 30.0);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut settings = EngineSettings::default();
        settings.threads = 0;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.loss = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.thread_delay_ms = 5000;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.oscillators = vec![OscillatorSettings {
            period: 0.5,
            ..OscillatorSettings::default()
        }];
        assert!(settings.validate().is_err());
    }

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = EngineSettings::default();
        settings.size = 128;
        settings.crest_color = [1, 2, 3];
        let json = serde_json::to_string(&settings).unwrap();
        let back: EngineSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.size, 128);
        assert_eq!(back.crest_color, [1, 2, 3]);
    }
}
