//! Boundary loss ramp: raises the per-particle loss near the frame so
//! outgoing waves are swallowed instead of reflected back into the pool.

/// Fill `loss` (a `size * size` grid) from an absorber configuration.
///
/// When the absorber is disabled, or `max < base` (the ramp must rise toward
/// the edge), the whole field is `base`. Otherwise the field is `base` in the
/// interior and ramps linearly to `max` at each of the four edges over
/// `thickness` rows/columns. The bands are written in four overlapping
/// passes -- top first, fading edge-to-interior, then bottom, left, and right
/// rising interior-to-edge -- so the last pass to touch a corner owns it.
/// The thickness is capped below half the pool so opposite bands cannot
/// cross.
pub fn build_loss(
    loss: &mut [f64],
    size: usize,
    base: f64,
    max: f64,
    thickness: usize,
    enabled: bool,
) {
    debug_assert_eq!(loss.len(), size * size);

    if !enabled || max < base {
        loss.fill(base);
        return;
    }

    let offset = if thickness >= size / 2 {
        match (size / 2).checked_sub(1) {
            Some(capped) => capped,
            // A one-cell pool has no room for a ramp.
            None => {
                loss.fill(base);
                return;
            }
        }
    } else {
        thickness
    };

    // Loss gain per row/column. With a zero offset this is infinite (or NaN
    // for a flat ramp) but the single-pass loops below never apply it past
    // the first row.
    let step = (max - base) / offset as f64;

    loss.fill(base);

    // Top: edge inward, fading from max.
    let mut cur = max;
    for off in 0..=offset {
        for x in off..size - off {
            loss[x + off * size] = cur;
        }
        cur -= step;
    }

    // Bottom: interior outward, rising to max at the last row.
    cur = base;
    for off in 0..=offset {
        for x in (offset - off)..size - (offset - off) {
            loss[x + off * size + size * (size - offset - 1)] = cur;
        }
        cur += step;
    }

    // Left.
    cur = base;
    for off in 0..=offset {
        for x in (offset - off)..size - (offset - off) {
            loss[x * size + (offset - off)] = cur;
        }
        cur += step;
    }

    // Right.
    cur = base;
    for off in 0..=offset {
        for x in (offset - off)..size - (offset - off) {
            loss[x * size + off + size - offset - 1] = cur;
        }
        cur += step;
    }
}
