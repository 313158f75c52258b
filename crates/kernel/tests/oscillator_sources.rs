//! Index-level checks for the oscillator sources: the line walk, the moving
//! point schedule, and recomputation behavior.

use kernel::oscillator::{OscillatorBank, SourceKind};
use kernel::pool::Pool;

#[test]
fn horizontal_line_walk_floors_half_steps() {
    let size = 16;
    let mut bank = OscillatorBank::new(size);
    {
        let osc = bank.get_mut(0).unwrap();
        osc.source = SourceKind::Line;
        osc.anchor_a = [10.0, 10.0];
        osc.anchor_b = [13.0, 10.0];
    }
    bank.reindex(0, size);

    let row = size * 10;
    assert_eq!(
        bank.indices(0),
        &[
            10 + row,
            10 + row,
            11 + row,
            11 + row,
            12 + row,
            12 + row,
            13 + row,
        ]
    );
}

#[test]
fn diagonal_line_stays_in_bounds() {
    let size = 8;
    let mut bank = OscillatorBank::new(size);
    {
        let osc = bank.get_mut(0).unwrap();
        osc.source = SourceKind::Line;
        osc.anchor_a = [5.0, 5.0];
        osc.anchor_b = [12.0, 12.0]; // runs off the pool
    }
    bank.reindex(0, size);

    assert!(!bank.indices(0).is_empty());
    for &index in bank.indices(0) {
        assert!(index < size * size);
        let (x, y) = (index % size, index / size);
        assert!(x >= 5 && y >= 5, "unexpected cell ({x},{y})");
    }
}

#[test]
fn moving_point_glides_along_the_diagonal() {
    let size = 16;
    let mut bank = OscillatorBank::new(size);
    {
        let osc = bank.get_mut(0).unwrap();
        osc.active = true;
        osc.source = SourceKind::MovingPoint;
        osc.anchor_a = [0.0, 0.0];
        osc.anchor_b = [(size - 1) as f64, (size - 1) as f64];
        osc.move_period = 4.0;
        osc.phase = 90.0; // non-zero height already at tick 0
    }
    bank.reindex(0, size);
    assert!(bank.indices(0).is_empty(), "moving sources precompute nothing");

    for (tick, expected_step) in [(0u64, 0usize), (1, 3), (2, 7), (3, 11)] {
        let mut pool = Pool::new(size);
        bank.apply(&mut pool, tick);

        let expected = expected_step * (size + 1);
        assert!(
            pool.height[expected] != 0.0,
            "tick {tick}: expected cell {expected} to be driven"
        );
        let written = pool.height.iter().filter(|&&h| h != 0.0).count();
        assert_eq!(written, 1, "tick {tick}: exactly one cell is driven");
    }
}

#[test]
fn moving_point_wraps_after_a_full_period() {
    let size = 16;
    let mut bank = OscillatorBank::new(size);
    {
        let osc = bank.get_mut(0).unwrap();
        osc.active = true;
        osc.source = SourceKind::MovingPoint;
        osc.anchor_a = [0.0, 0.0];
        osc.anchor_b = [15.0, 15.0];
        osc.move_period = 4.0;
        osc.phase = 90.0;
    }

    let mut pool = Pool::new(size);
    bank.apply(&mut pool, 4);
    assert!(pool.height[0] != 0.0, "tick 4 wraps back to anchor A");
}

#[test]
fn switching_source_kind_recomputes_targets() {
    let size = 16;
    let mut bank = OscillatorBank::new(size);
    {
        let osc = bank.get_mut(0).unwrap();
        osc.anchor_a = [4.0, 4.0];
        osc.anchor_b = [7.0, 4.0];
    }
    bank.reindex(0, size);
    assert_eq!(bank.indices(0), &[4 + size * 4]);

    bank.get_mut(0).unwrap().source = SourceKind::Line;
    bank.reindex(0, size);
    assert!(bank.indices(0).len() > 1);

    bank.get_mut(0).unwrap().source = SourceKind::MovingPoint;
    bank.reindex(0, size);
    assert!(bank.indices(0).is_empty());
}
