//! RGB output: wave display and mass-map display.
//!
//! The painter fills a row-major R,G,B byte buffer of length `3 * size^2`.
//! View state never feeds back into the physics.

use crate::pool::Pool;

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Construct from channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Unpack a 24-bit value with red in the low byte.
    pub const fn from_rgb32(value: u32) -> Self {
        Self {
            r: value as u8,
            g: (value >> 8) as u8,
            b: (value >> 16) as u8,
        }
    }

    /// Pack into a 24-bit value with red in the low byte.
    pub const fn to_rgb32(self) -> u32 {
        self.r as u32 | (self.g as u32) << 8 | (self.b as u32) << 16
    }
}

/// View state for the painter.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Color of a fully raised particle.
    pub crest: Rgb,
    /// Color of a fully lowered particle.
    pub trough: Rgb,
    /// Color of static particles.
    pub static_color: Rgb,
    /// Paint only crest, trough, or their midpoint instead of interpolating.
    pub extreme_contrast: bool,
    /// Height gain before clamping, to reveal weak vibrations.
    pub amplitude_multiplier: f64,
    /// Paint the mass field instead of the wave.
    pub mass_map: bool,
    /// Mass mapped to the cold end of the palette.
    pub mass_map_range_low: f64,
    /// Mass mapped to the hot end of the palette.
    pub mass_map_range_high: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            crest: Rgb::new(0xFF, 0xFF, 0xFF),
            trough: Rgb::new(0, 0, 0),
            static_color: Rgb::new(0xFF, 0xFF, 0),
            extreme_contrast: false,
            amplitude_multiplier: 20.0,
            mass_map: false,
            mass_map_range_low: 1.0,
            mass_map_range_high: 5.0,
        }
    }
}

/// Distinct colors along the thermal palette: six anchor colors joined by
/// five 128-step linear bands, minus the shared endpoints.
const MASS_MAP_COLORS: f64 = 128.0 * 5.0 - 4.0;

/// Paint the particles in `[first, first + count)` into `rgb`.
///
/// Wave mode interpolates crest-to-trough from the (gain-multiplied, clamped)
/// height, paints static particles in the static color, and under extreme
/// contrast collapses to crest / trough / their midpoint. Mass-map mode maps
/// each mass through a six-band thermal palette over the configured range,
/// or black when the range is empty.
///
/// Returns `false` without painting if the range is invalid or the buffer is
/// too short.
pub fn paint_bitmap(
    pool: &Pool,
    config: &RenderConfig,
    first: usize,
    count: usize,
    rgb: &mut [u8],
) -> bool {
    let cells = pool.cell_count();
    let end = match first.checked_add(count) {
        Some(end) if count >= 1 && end <= cells => end,
        _ => return false,
    };
    if rgb.len() < cells * 3 {
        return false;
    }

    for index in first..end {
        let px = index * 3;
        if !config.mass_map {
            if pool.fixity[index] != 0 {
                rgb[px] = config.static_color.r;
                rgb[px + 1] = config.static_color.g;
                rgb[px + 2] = config.static_color.b;
            } else if config.extreme_contrast {
                let height = pool.height[index];
                if height > 0.0 {
                    rgb[px] = config.crest.r;
                    rgb[px + 1] = config.crest.g;
                    rgb[px + 2] = config.crest.b;
                } else if height < 0.0 {
                    rgb[px] = config.trough.r;
                    rgb[px + 1] = config.trough.g;
                    rgb[px + 2] = config.trough.b;
                } else {
                    rgb[px] = ((config.crest.r as u16 + config.trough.r as u16) / 2) as u8;
                    rgb[px + 1] = ((config.crest.g as u16 + config.trough.g as u16) / 2) as u8;
                    rgb[px + 2] = ((config.crest.b as u16 + config.trough.b as u16) / 2) as u8;
                }
            } else {
                let scaled = pool.height[index] * config.amplitude_multiplier;
                let bright = (scaled.clamp(-1.0, 1.0) + 1.0) / 2.0;
                let dim = 1.0 - bright;
                rgb[px] = (config.crest.r as f64 * bright + config.trough.r as f64 * dim) as u8;
                rgb[px + 1] = (config.crest.g as f64 * bright + config.trough.g as f64 * dim) as u8;
                rgb[px + 2] = (config.crest.b as f64 * bright + config.trough.b as f64 * dim) as u8;
            }
        } else {
            let range = config.mass_map_range_high - config.mass_map_range_low;
            if range <= 0.0 {
                rgb[px] = 0;
                rgb[px + 1] = 0;
                rgb[px + 2] = 0;
                continue;
            }
            let mass = pool.mass[index].clamp(config.mass_map_range_low, config.mass_map_range_high);
            let color = ((mass - config.mass_map_range_low) * MASS_MAP_COLORS / range).round()
                as i32;
            let (r, g, b) = if color < 128 {
                (0, 0, color)
            } else if color < 128 * 2 {
                (color & 127, 0, 127)
            } else if color < 128 * 3 {
                (128 + (color & 127), color & 127, 127 - (color & 127))
            } else if color < 128 * 4 {
                (255, 128 + (color & 127), color & 127)
            } else {
                (255, 255, 128 + (color & 127))
            };
            rgb[px] = r as u8;
            rgb[px + 1] = g as u8;
            rgb[px + 2] = b as u8;
        }
    }

    true
}
