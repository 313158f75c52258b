//! The worker pool: missions, grid partitioning, and the barrier protocol.
//!
//! The conductor broadcasts one mission at a time; every worker executes it
//! over its own contiguous index range and signals back on its end
//! condition. Workers are long-lived: between missions they wait on the
//! shared start condition (with a timed wait so shutdown is always
//! observed), and they only exit on the `Destroy` mission or when the engine
//! is disposing.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kernel::{color, stencil};

use crate::control::{Control, EngineCore};

/// Upper bound on the worker count.
pub(crate) const MAX_WORKERS: usize = 32;

/// The unit of work a worker performs in one barrier cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mission {
    /// No work; wait for the next order.
    Pause,
    /// Exit the worker loop.
    Destroy,
    /// Run the wave stencil and apply the oscillators.
    CalculateForces,
    /// Integrate velocities into heights.
    MoveParticles,
    /// Paint the RGB bitmap.
    CalculateColors,
}

/// The order currently broadcast to the pool. The epoch increments with
/// every broadcast so a worker can tell a fresh order from the one it has
/// already executed.
pub(crate) struct Orders {
    pub mission: Mission,
    pub epoch: u64,
}

/// Contiguous slice of the grid owned by one worker during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WorkerRange {
    pub first: usize,
    pub count: usize,
}

/// Completion signal of one worker.
pub(crate) struct WorkerSlot {
    pub done: Mutex<bool>,
    pub end_cond: Condvar,
}

/// A spawned worker: its completion slot plus the join handle.
pub(crate) struct WorkerHandle {
    pub slot: Arc<WorkerSlot>,
    pub thread: JoinHandle<()>,
}

/// Split `cells` into `workers` contiguous ranges covering `[0, cells)`
/// exactly once; the last worker absorbs the remainder.
pub(crate) fn partition(cells: usize, workers: usize) -> Vec<WorkerRange> {
    let workers = workers.clamp(1, MAX_WORKERS);
    let base = cells / workers;
    let extra = cells % workers;
    (0..workers)
        .map(|j| WorkerRange {
            first: j * base,
            count: if j == workers - 1 { base + extra } else { base },
        })
        .collect()
}

/// Broadcast a mission to every worker: clear the done flags, publish the
/// order under the start mutex, and wake the pool.
pub(crate) fn send_order(core: &EngineCore, ctl: &mut Control, mission: Mission) {
    for worker in &ctl.workers {
        *worker.slot.done.lock().unwrap() = false;
    }
    {
        let mut orders = core.orders.lock().unwrap();
        orders.mission = mission;
        orders.epoch = orders.epoch.wrapping_add(1);
    }
    core.start_cond.notify_all();
}

/// Block until every worker has signalled completion of the current order.
/// Each wait is timed (3 s) as a liveness backstop. The wait is abandoned
/// only on dispose: a worker that has already picked the order up will
/// finish it even if the engine is stopped meanwhile, so waiting keeps the
/// barrier intact across `stop`.
pub(crate) fn wait_for_workers(core: &EngineCore, ctl: &Control) {
    for worker in &ctl.workers {
        let mut done = worker.slot.done.lock().unwrap();
        while !core.is_disposing() && !*done {
            let (guard, _) = worker
                .slot
                .end_cond
                .wait_timeout(done, Duration::from_secs(3))
                .unwrap();
            done = guard;
        }
    }
}

/// Destroy the current workers and spawn `ctl.num_workers` fresh ones with
/// ranges partitioned over the current grid. Requires the control mutex
/// (callers hold `ctl` mutably).
pub(crate) fn rebuild(core: &Arc<EngineCore>, ctl: &mut Control) {
    send_order(core, ctl, Mission::Destroy);
    for worker in ctl.workers.drain(..) {
        let _ = worker.thread.join();
    }
    core.orders.lock().unwrap().mission = Mission::Pause;

    // SAFETY: every worker has been joined and we hold the control mutex, so
    // this thread has exclusive access.
    let cells = unsafe { core.shared.state() }.pool.cell_count();
    for (id, range) in partition(cells, ctl.num_workers).into_iter().enumerate() {
        let slot = Arc::new(WorkerSlot {
            done: Mutex::new(false),
            end_cond: Condvar::new(),
        });
        let thread = {
            let core = Arc::clone(core);
            let slot = Arc::clone(&slot);
            thread::Builder::new()
                .name(format!("wave-worker-{id}"))
                .spawn(move || worker_loop(core, slot, id, range))
                .expect("failed to spawn worker thread")
        };
        ctl.workers.push(WorkerHandle { slot, thread });
    }
}

fn worker_loop(core: Arc<EngineCore>, slot: Arc<WorkerSlot>, id: usize, range: WorkerRange) {
    tracing::debug!("worker[{id}] entering loop, range {}+{}", range.first, range.count);
    let mut last_epoch = 0;

    loop {
        let (mission, epoch) = {
            let orders = core.orders.lock().unwrap();
            (orders.mission, orders.epoch)
        };
        if mission == Mission::Destroy || core.is_disposing() {
            break;
        }

        if mission != Mission::Pause && epoch != last_epoch {
            last_epoch = epoch;
            let mut done = slot.done.lock().unwrap();
            if !*done {
                execute(&core, mission, range);
                *done = true;
                slot.end_cond.notify_one();
            }
        }

        // Wait for an order we have not consumed yet. Timed so a Destroy or
        // dispose that raced the broadcast is still observed promptly.
        {
            let mut orders = core.orders.lock().unwrap();
            while (orders.mission == Mission::Pause || orders.epoch == last_epoch)
                && orders.mission != Mission::Destroy
                && !core.is_disposing()
                && core.is_working()
            {
                let (guard, _) = core
                    .start_cond
                    .wait_timeout(orders, Duration::from_secs(1))
                    .unwrap();
                orders = guard;
            }
        }

        if !core.is_working() && !core.is_disposing() {
            thread::sleep(Duration::from_millis(
                core.thread_delay_ms.load(Ordering::Relaxed),
            ));
        }
    }

    tracing::debug!("worker[{id}] returning");
}

fn execute(core: &EngineCore, mission: Mission, range: WorkerRange) {
    // SAFETY: the conductor holds the control mutex for the whole phase and
    // does not read the state until every worker has signalled done; this
    // worker writes only its own range. The oscillator cells are written by
    // every worker, identically (see `SharedSim`).
    let sim = unsafe { core.shared.state() };
    match mission {
        Mission::CalculateForces => {
            stencil::calculate_forces(&mut sim.pool, range.first, range.count);
            sim.oscillators.apply(&mut sim.pool, sim.tick);
        }
        Mission::MoveParticles => {
            stencil::move_particles(&mut sim.pool, range.first, range.count);
        }
        Mission::CalculateColors => {
            color::paint_bitmap(&sim.pool, &sim.render, range.first, range.count, &mut sim.bitmap);
        }
        Mission::Pause | Mission::Destroy => {}
    }
}
