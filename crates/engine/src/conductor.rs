//! The conductor: the engine's main loop.
//!
//! Schedules calculation cycles (forces, moves, optional shift) and paint
//! cycles against two independent wall-clock limiters, delivers the bitmap
//! to the render callback, emits the periodic throughput line, and decides
//! between yielding and sleeping when there is nothing to do.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kernel::stencil;

use crate::control::{Control, EngineCore};
use crate::workers::{self, Mission};

pub(crate) fn conductor_loop(core: Arc<EngineCore>) {
    let time_start = Instant::now();
    let mut time_log_previous = Instant::now();
    let mut num_calcs = 0.0_f64;
    let mut num_paints = 0.0_f64;
    // How many cycles should have happened since start, per the limiters.
    // Stale while a limiter is unlimited.
    let mut calc_needed = 0_u64;
    let mut paint_needed = 0_u64;

    while !core.is_disposing() {
        while core.is_working() && !core.is_disposing() {
            {
                let mut ctl = core.control.lock().unwrap();
                if ctl.calculation_enabled {
                    let behind = if ctl.ips == 0.0 {
                        true
                    } else {
                        calc_needed = (ctl.ips * time_start.elapsed().as_secs_f64()) as u64;
                        calc_needed > ctl.calc_done
                    };
                    if behind {
                        run_calculation_cycle(&core, &mut ctl);
                        num_calcs += 1.0;
                        // If the backlog grew, catch up to one cycle behind so
                        // the next tick advances by one instead of bursting.
                        if calc_needed > ctl.calc_done + 1 {
                            ctl.calc_done = calc_needed - 1;
                        }
                    }
                }
            }

            if core.is_working() {
                let mut ctl = core.control.lock().unwrap();
                if ctl.render_enabled {
                    let behind = if ctl.fps == 0.0 {
                        true
                    } else {
                        paint_needed = (ctl.fps * time_start.elapsed().as_secs_f64()) as u64;
                        paint_needed > ctl.paint_done
                    };
                    if behind {
                        workers::send_order(&core, &mut ctl, Mission::CalculateColors);
                        workers::wait_for_workers(&core, &ctl);
                        // A dispose abandons the wait with a worker possibly
                        // still painting; skip delivery in that case.
                        if !core.is_disposing() {
                            num_paints += 1.0;
                            ctl.paint_done += 1;
                            if paint_needed > ctl.paint_done + 1 {
                                ctl.paint_done = paint_needed - 1;
                            }
                            // Deliver while still holding the control mutex
                            // so a concurrent resize cannot swap the buffer
                            // mid-read.
                            let mut listener = core.listener.lock().unwrap();
                            if let Some(callback) = listener.as_mut() {
                                // SAFETY: the paint barrier has completed and
                                // nothing writes the bitmap until the next
                                // paint order.
                                let sim = unsafe { core.shared.state() };
                                callback(&sim.bitmap);
                            }
                        }
                    }
                }
            }

            if core.is_working() {
                let ctl = core.control.lock().unwrap();
                if ctl.log_performance
                    && time_log_previous.elapsed().as_millis() as u64 >= ctl.log_interval_ms
                {
                    time_log_previous = Instant::now();
                    let interval = ctl.log_interval_ms as f64;
                    tracing::info!(
                        "iterations & paints per second: {:.1} {:.1}",
                        num_calcs * 1000.0 / interval,
                        num_paints * 1000.0 / interval,
                    );
                    num_calcs = 0.0;
                    num_paints = 0.0;
                }
            }

            // In a hurry when a limiter is behind schedule, or when running
            // unlimited outside power-save mode; otherwise park the workers.
            let (hurry, power_save) = {
                let ctl = core.control.lock().unwrap();
                let hurry = (!ctl.power_save && (ctl.fps == 0.0 || ctl.ips == 0.0))
                    || (ctl.calculation_enabled && ctl.calc_done < calc_needed)
                    || (ctl.render_enabled && ctl.paint_done < paint_needed);
                (hurry, ctl.power_save)
            };
            if hurry {
                thread::yield_now();
            } else {
                {
                    let mut ctl = core.control.lock().unwrap();
                    workers::send_order(&core, &mut ctl, Mission::Pause);
                }
                if power_save {
                    thread::sleep(Duration::from_millis(
                        core.thread_delay_ms.load(Ordering::Relaxed),
                    ));
                } else {
                    thread::yield_now();
                }
            }
        }

        thread::sleep(Duration::from_millis(
            core.thread_delay_ms.load(Ordering::Relaxed),
        ));
    }
}

/// One full calculation cycle: force barrier, move barrier, optional shift,
/// counter advance. The caller holds the control mutex.
fn run_calculation_cycle(core: &Arc<EngineCore>, ctl: &mut Control) {
    workers::send_order(core, ctl, Mission::CalculateForces);
    workers::wait_for_workers(core, ctl);
    workers::send_order(core, ctl, Mission::MoveParticles);
    workers::wait_for_workers(core, ctl);

    // A dispose abandons the waits above, so a worker may still be mid
    // mission; leave the state to it and bail out.
    if core.is_disposing() {
        return;
    }

    // SAFETY: both barriers have completed; the workers are idle and we hold
    // the control mutex.
    let sim = unsafe { core.shared.state() };
    if ctl.shifting {
        stencil::shift_to_origin(&mut sim.pool);
    }
    ctl.calc_done += 1;
    sim.tick = sim.tick.wrapping_add(1);
}
