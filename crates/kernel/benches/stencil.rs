//! Stencil throughput -- force + move over full grids of increasing size.
//!
//! Run with: cargo bench -p kernel --bench stencil

use std::time::Instant;

use kernel::{stencil, Pool};

fn main() {
    println!("=== Stencil Throughput ===\n");

    // (pool size, steps) -- fewer steps at larger grids
    let configs = [(100, 2000), (300, 300), (500, 100), (1000, 25)];

    println!(
        "{:>8} {:>10} {:>8} {:>10} {:>12} {:>12}",
        "Size", "Cells", "Steps", "Time (s)", "steps/s", "ms/step"
    );

    for &(size, steps) in &configs {
        let mut pool = Pool::new(size);
        let cells = pool.cell_count();
        pool.height[size / 2 * (size + 1)] = 1.0;

        // Warmup: let the ripple reach a few cells so the loss paths see
        // non-zero energy.
        for _ in 0..5 {
            stencil::calculate_forces(&mut pool, 0, cells);
            stencil::move_particles(&mut pool, 0, cells);
        }

        let start = Instant::now();
        for _ in 0..steps {
            stencil::calculate_forces(&mut pool, 0, cells);
            stencil::move_particles(&mut pool, 0, cells);
        }
        let elapsed = start.elapsed().as_secs_f64();

        println!(
            "{:>8} {:>10} {:>8} {:>10.3} {:>12.1} {:>12.3}",
            size,
            cells,
            steps,
            elapsed,
            steps as f64 / elapsed,
            1000.0 * elapsed / steps as f64
        );
    }
}
