//! Simulation state shared between the conductor, the workers, and the
//! external data lock.

use std::cell::UnsafeCell;

use kernel::{OscillatorBank, Pool, RenderConfig};

/// Everything the worker missions touch: the particle grid, the oscillator
/// bank, the view state, the output bitmap, and the global iteration tick.
pub(crate) struct SimState {
    /// Particle grid.
    pub pool: Pool,
    /// The nine oscillator slots.
    pub oscillators: OscillatorBank,
    /// View state read by the color mission.
    pub render: RenderConfig,
    /// Row-major R,G,B output, `3 * size^2` bytes.
    pub bitmap: Vec<u8>,
    /// Completed force+move cycles since construction; the oscillators read
    /// it, the conductor advances it once per cycle.
    pub tick: u64,
}

impl SimState {
    pub fn new(size: usize) -> Self {
        let pool = Pool::new(size);
        let size = pool.size();
        Self {
            oscillators: OscillatorBank::new(size),
            render: RenderConfig::default(),
            bitmap: vec![0; size * size * 3],
            tick: 0,
            pool,
        }
    }
}

/// Shared-state cell handed to every worker and to the conductor.
///
/// Exclusive access is enforced by protocol, not by a lock: the engine's
/// control mutex and the worker barrier are arranged so that either
///
/// - the control mutex is held and every worker is quiescent (setters, the
///   external data lock, the conductor between phases), or
/// - a phase is in flight and each worker touches only its own index range
///   of the grid.
///
/// The one relaxation is the force mission: workers read neighbor heights
/// across range boundaries while their owners update them, and every worker
/// writes the oscillator cells. Those writes are identical across workers,
/// a pure function of the bank and the tick.
pub(crate) struct SharedSim {
    state: UnsafeCell<SimState>,
}

// SAFETY: see the struct docs -- all access goes through `state()` under the
// barrier/mutex protocol above.
unsafe impl Sync for SharedSim {}

impl SharedSim {
    pub fn new(state: SimState) -> Self {
        Self {
            state: UnsafeCell::new(state),
        }
    }

    /// Borrow the simulation state.
    ///
    /// # Safety
    ///
    /// The caller must hold the control mutex while no phase is in flight,
    /// or be a worker inside its mission window touching only its own range
    /// (plus the idempotent oscillator cells).
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn state(&self) -> &mut SimState {
        &mut *self.state.get()
    }
}
