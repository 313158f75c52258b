//! Programmable wave sources.
//!
//! Nine fixed slots, each a point, line, or moving-point source. A source
//! overwrites the height at its target cells every iteration with a sine of
//! the global tick and zeroes the velocity there, turning those cells into a
//! driven boundary. Point and line sources precompute their target indices;
//! a moving-point source derives its single live cell from the tick.

use std::f64::consts::PI;

use crate::pool::Pool;

/// Number of oscillator slots.
pub const MAX_OSCILLATORS: usize = 9;

/// How an oscillator feeds the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Emit from the single cell under anchor A.
    Point,
    /// Emit along the segment from anchor A to anchor B.
    Line,
    /// Emit from one cell that glides from anchor A to anchor B and wraps,
    /// one full pass per move period.
    MovingPoint,
}

/// One oscillator slot.
///
/// Anchors are continuous pool coordinates; the cells they map to are
/// recomputed by [`OscillatorBank::reindex`] whenever the source kind, an
/// anchor, or the pool size changes.
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Whether the slot currently drives the pool.
    pub active: bool,
    /// Source geometry.
    pub source: SourceKind,
    /// Iterations per full sine cycle, at least 1.
    pub period: f64,
    /// Phase offset in degrees.
    pub phase: f64,
    /// Peak height written to the target cells.
    pub amplitude: f64,
    /// Iterations per full anchor-A-to-anchor-B pass, at least 1.
    pub move_period: f64,
    /// First anchor, in pool coordinates.
    pub anchor_a: [f64; 2],
    /// Second anchor, in pool coordinates.
    pub anchor_b: [f64; 2],
    indices: Vec<usize>,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            active: false,
            source: SourceKind::Point,
            period: 30.0,
            phase: 0.0,
            amplitude: 1.0,
            move_period: 800.0,
            anchor_a: [0.0, 0.0],
            anchor_b: [0.0, 0.0],
            indices: Vec::new(),
        }
    }
}

/// The nine oscillator slots of a pool.
#[derive(Debug, Clone, Default)]
pub struct OscillatorBank {
    slots: [Oscillator; MAX_OSCILLATORS],
}

impl OscillatorBank {
    /// Create a bank of inactive point sources with target indices computed
    /// for the given pool size.
    pub fn new(size: usize) -> Self {
        let mut bank = Self::default();
        bank.reindex_all(size);
        bank
    }

    /// Borrow a slot, or `None` for an out-of-range id.
    pub fn get(&self, id: usize) -> Option<&Oscillator> {
        self.slots.get(id)
    }

    /// Mutably borrow a slot, or `None` for an out-of-range id.
    ///
    /// Changing the source kind or an anchor must be followed by a
    /// [`reindex`](Self::reindex) for the edit to take effect on the target
    /// cells.
    pub fn get_mut(&mut self, id: usize) -> Option<&mut Oscillator> {
        self.slots.get_mut(id)
    }

    /// Precomputed target indices of a slot (empty for moving-point sources
    /// and out-of-range ids).
    pub fn indices(&self, id: usize) -> &[usize] {
        self.slots.get(id).map(|o| o.indices.as_slice()).unwrap_or(&[])
    }

    /// Recompute the target indices of one slot for the given pool size.
    ///
    /// - Point: the cell under anchor A, or nothing when out of bounds.
    /// - Line: floor-sampled cells every 0.5 units along A to B, endpoint
    ///   included, keeping only in-bounds samples. Duplicates from flooring
    ///   are kept. A zero-length segment yields nothing.
    /// - Moving point: nothing; the live cell is derived per tick.
    pub fn reindex(&mut self, id: usize, size: usize) {
        let Some(osc) = self.slots.get_mut(id) else {
            return;
        };
        let bound = size as f64;
        osc.indices.clear();

        match osc.source {
            SourceKind::Point => {
                let [x, y] = osc.anchor_a;
                if x >= 0.0 && x < bound && y >= 0.0 && y < bound {
                    osc.indices.push(x as usize + size * y as usize);
                }
            }
            SourceKind::Line => {
                let dx = osc.anchor_b[0] - osc.anchor_a[0];
                let dy = osc.anchor_b[1] - osc.anchor_a[1];
                let length = (dx * dx + dy * dy).sqrt();
                if length == 0.0 {
                    return;
                }
                let x_over_l = dx / length;
                let y_over_l = dy / length;
                let mut i = 0.0;
                while i <= length {
                    let x = osc.anchor_a[0] + x_over_l * i;
                    let y = osc.anchor_a[1] + y_over_l * i;
                    if x >= 0.0 && x < bound && y >= 0.0 && y < bound {
                        osc.indices.push(x.floor() as usize + size * y.floor() as usize);
                    }
                    i += 0.5;
                }
            }
            SourceKind::MovingPoint => {}
        }
    }

    /// Recompute the target indices of every slot.
    pub fn reindex_all(&mut self, size: usize) {
        for id in 0..MAX_OSCILLATORS {
            self.reindex(id, size);
        }
    }

    /// Rescale every anchor by `new_size / old_size` and recompute all
    /// indices. Called on pool resize so sources keep their relative
    /// positions.
    pub fn rescale(&mut self, old_size: usize, new_size: usize) {
        let ratio = new_size as f64 / old_size as f64;
        for osc in &mut self.slots {
            osc.anchor_a = [osc.anchor_a[0] * ratio, osc.anchor_a[1] * ratio];
            osc.anchor_b = [osc.anchor_b[0] * ratio, osc.anchor_b[1] * ratio];
        }
        self.reindex_all(new_size);
    }

    /// Drive every active slot for the given tick: write the slot's sine
    /// height to each target cell and zero the velocity there.
    ///
    /// Writes are a pure function of `(bank, tick)`, so concurrent callers
    /// applying the same tick write identical values.
    pub fn apply(&self, pool: &mut Pool, tick: u64) {
        let size = pool.size();
        for osc in &self.slots {
            if !osc.active {
                continue;
            }
            let height = osc.amplitude
                * (osc.phase * PI / 180.0 + 2.0 * PI * (tick as f64 % osc.period) / osc.period)
                    .sin();

            match osc.source {
                SourceKind::Point | SourceKind::Line => {
                    for &index in &osc.indices {
                        pool.height[index] = height;
                        pool.velocity[index] = 0.0;
                    }
                }
                SourceKind::MovingPoint => {
                    let ratio = (tick as f64 % osc.move_period) / osc.move_period;
                    let x = (1.0 - ratio) * osc.anchor_a[0] + ratio * osc.anchor_b[0];
                    let y = (1.0 - ratio) * osc.anchor_a[1] + ratio * osc.anchor_b[1];
                    if x < 0.0 || y < 0.0 {
                        continue;
                    }
                    let (cx, cy) = (x.floor() as usize, y.floor() as usize);
                    if cx < size && cy < size {
                        let index = cx + size * cy;
                        pool.height[index] = height;
                        pool.velocity[index] = 0.0;
                    }
                }
            }
        }
    }

    /// The instantaneous source position of a slot at the given tick: the
    /// anchor for a point, the segment midpoint for a line, the interpolated
    /// position for a moving point. `[-1.0, -1.0]` for an out-of-range id.
    pub fn real_location(&self, id: usize, tick: u64) -> [f64; 2] {
        let Some(osc) = self.slots.get(id) else {
            return [-1.0, -1.0];
        };
        match osc.source {
            SourceKind::Point => osc.anchor_a,
            SourceKind::Line => [
                (osc.anchor_a[0] + osc.anchor_b[0]) / 2.0,
                (osc.anchor_a[1] + osc.anchor_b[1]) / 2.0,
            ],
            SourceKind::MovingPoint => {
                let ratio = (tick as f64 % osc.move_period) / osc.move_period;
                [
                    (1.0 - ratio) * osc.anchor_a[0] + ratio * osc.anchor_b[0],
                    (1.0 - ratio) * osc.anchor_a[1] + ratio * osc.anchor_b[1],
                ]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_source_maps_to_one_cell() {
        let mut bank = OscillatorBank::new(16);
        {
            let osc = bank.get_mut(0).unwrap();
            osc.anchor_a = [10.9, 3.2];
        }
        bank.reindex(0, 16);
        assert_eq!(bank.indices(0), &[10 + 16 * 3]);
    }

    #[test]
    fn out_of_bounds_point_has_no_targets() {
        let mut bank = OscillatorBank::new(16);
        bank.get_mut(0).unwrap().anchor_a = [16.0, 3.0];
        bank.reindex(0, 16);
        assert!(bank.indices(0).is_empty());

        bank.get_mut(0).unwrap().anchor_a = [-0.5, 3.0];
        bank.reindex(0, 16);
        assert!(bank.indices(0).is_empty());
    }

    #[test]
    fn zero_length_line_has_no_targets() {
        let mut bank = OscillatorBank::new(16);
        {
            let osc = bank.get_mut(2).unwrap();
            osc.source = SourceKind::Line;
            osc.anchor_a = [4.0, 4.0];
            osc.anchor_b = [4.0, 4.0];
        }
        bank.reindex(2, 16);
        assert!(bank.indices(2).is_empty());
    }

    #[test]
    fn reindex_is_idempotent() {
        let mut bank = OscillatorBank::new(16);
        {
            let osc = bank.get_mut(1).unwrap();
            osc.source = SourceKind::Line;
            osc.anchor_a = [1.0, 2.0];
            osc.anchor_b = [9.0, 7.0];
        }
        bank.reindex(1, 16);
        let first = bank.indices(1).to_vec();
        bank.reindex(1, 16);
        assert_eq!(bank.indices(1), first.as_slice());
    }

    #[test]
    fn rescale_keeps_relative_position() {
        let mut bank = OscillatorBank::new(16);
        bank.get_mut(0).unwrap().anchor_a = [10.0, 10.0];
        bank.reindex(0, 16);
        assert_eq!(bank.indices(0), &[10 + 16 * 10]);

        bank.rescale(16, 32);
        assert_eq!(bank.get(0).unwrap().anchor_a, [20.0, 20.0]);
        assert_eq!(bank.indices(0), &[20 + 32 * 20]);
    }

    #[test]
    fn inactive_slots_leave_the_pool_alone() {
        let mut pool = Pool::new(8);
        let bank = OscillatorBank::new(8);
        bank.apply(&mut pool, 17);
        assert!(pool.height.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn active_point_source_writes_sine_height() {
        let mut pool = Pool::new(8);
        let mut bank = OscillatorBank::new(8);
        {
            let osc = bank.get_mut(0).unwrap();
            osc.active = true;
            osc.anchor_a = [3.0, 3.0];
            osc.period = 20.0;
            osc.phase = 90.0;
            osc.amplitude = 2.0;
        }
        bank.reindex(0, 8);
        pool.velocity[3 + 8 * 3] = 5.0;

        bank.apply(&mut pool, 0);
        // phase 90 degrees at tick 0: sin(pi/2) = 1.
        assert!((pool.height[3 + 8 * 3] - 2.0).abs() < 1e-12);
        assert_eq!(pool.velocity[3 + 8 * 3], 0.0);
    }

    #[test]
    fn real_location_interpolates_moving_source() {
        let mut bank = OscillatorBank::new(16);
        {
            let osc = bank.get_mut(4).unwrap();
            osc.source = SourceKind::MovingPoint;
            osc.anchor_a = [0.0, 0.0];
            osc.anchor_b = [10.0, 20.0];
            osc.move_period = 4.0;
        }
        assert_eq!(bank.real_location(4, 1), [2.5, 5.0]);
        assert_eq!(bank.real_location(4, 4), [0.0, 0.0]);
        assert_eq!(bank.real_location(99, 0), [-1.0, -1.0]);
    }
}
