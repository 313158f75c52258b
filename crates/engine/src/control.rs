//! The public control surface of the wave pool engine.
//!
//! [`WaveEngine`] owns the worker pool and the conductor thread. Every
//! setter takes the engine-wide control mutex, clamps its argument to a sane
//! range, and updates state; setters that change geometry or oscillator
//! parameters also recompute the derived structures (target indices, loss
//! field, worker ranges). Because the conductor holds the same mutex while a
//! phase is in flight, a setter can never observe -- or race -- a half
//! finished step.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use kernel::{absorber, ParticleAttribute, Rgb, SourceKind, DEFAULT_POOL_SIZE};

use crate::conductor::conductor_loop;
use crate::shared::{SharedSim, SimState};
use crate::workers::{self, Mission, Orders, WorkerHandle, MAX_WORKERS};

/// Callback receiving the finished RGB bitmap after each paint phase.
///
/// Invoked on the conductor thread; it must return promptly and must not
/// call back into the engine.
pub type RenderCallback = Box<dyn FnMut(&[u8]) + Send>;

/// Mutable engine state guarded by the control mutex.
pub(crate) struct Control {
    pub ips: f64,
    pub fps: f64,
    pub num_workers: usize,
    pub log_performance: bool,
    pub log_interval_ms: u64,
    pub power_save: bool,
    pub shifting: bool,
    pub render_enabled: bool,
    pub calculation_enabled: bool,
    pub base_loss: f64,
    pub absorber_enabled: bool,
    pub absorber_thickness: usize,
    pub absorber_max_loss: f64,
    pub calc_done: u64,
    pub paint_done: u64,
    pub workers: Vec<WorkerHandle>,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            ips: 100.0,
            fps: 25.0,
            num_workers: 1,
            log_performance: true,
            log_interval_ms: 1000,
            power_save: false,
            shifting: true,
            render_enabled: true,
            calculation_enabled: true,
            base_loss: 0.0,
            absorber_enabled: true,
            absorber_thickness: 25,
            absorber_max_loss: 0.3,
            calc_done: 0,
            paint_done: 0,
            workers: Vec::new(),
        }
    }
}

/// State shared by the control surface, the conductor, and the workers.
pub(crate) struct EngineCore {
    pub shared: SharedSim,
    pub control: Mutex<Control>,
    pub orders: Mutex<Orders>,
    pub start_cond: Condvar,
    pub work_now: AtomicBool,
    pub disposing: AtomicBool,
    pub externally_locked: AtomicBool,
    pub thread_delay_ms: AtomicU64,
    pub listener: Mutex<Option<RenderCallback>>,
}

impl EngineCore {
    pub fn is_working(&self) -> bool {
        self.work_now.load(Ordering::SeqCst)
    }

    pub fn is_disposing(&self) -> bool {
        self.disposing.load(Ordering::SeqCst)
    }
}

/// A real-time wave pool simulator.
///
/// A fixed square grid of particles driven by up to nine programmable
/// oscillators, bounded by an absorbing frame, and periodically rendered to
/// an RGB bitmap that is delivered through a render callback. Iteration and
/// paint rates are limited independently.
///
/// The engine spins up its threads on construction but stays idle until
/// [`start`](Self::start) is called. Dropping the engine disposes it.
pub struct WaveEngine {
    core: Arc<EngineCore>,
    conductor: Option<JoinHandle<()>>,
}

impl WaveEngine {
    /// Create an engine with the default pool size, one worker, and default
    /// configuration. Idle until started.
    pub fn new() -> Self {
        Self::with_size(DEFAULT_POOL_SIZE)
    }

    /// Create an engine with the given pool size (bumped to at least 1).
    pub fn with_size(size: usize) -> Self {
        let size = size.max(1);
        let core = Arc::new(EngineCore {
            shared: SharedSim::new(SimState::new(size)),
            control: Mutex::new(Control::default()),
            orders: Mutex::new(Orders {
                mission: Mission::Pause,
                epoch: 0,
            }),
            start_cond: Condvar::new(),
            work_now: AtomicBool::new(false),
            disposing: AtomicBool::new(false),
            externally_locked: AtomicBool::new(false),
            thread_delay_ms: AtomicU64::new(5),
            listener: Mutex::new(None),
        });

        {
            let mut ctl = core.control.lock().unwrap();
            // SAFETY: no worker or conductor exists yet.
            let sim = unsafe { core.shared.state() };
            absorber::build_loss(
                &mut sim.pool.loss,
                size,
                ctl.base_loss,
                ctl.absorber_max_loss,
                ctl.absorber_thickness,
                ctl.absorber_enabled,
            );
            workers::rebuild(&core, &mut ctl);
        }

        let conductor = {
            let core = Arc::clone(&core);
            thread::Builder::new()
                .name("wave-conductor".into())
                .spawn(move || conductor_loop(core))
                .expect("failed to spawn conductor thread")
        };

        tracing::info!("wave engine ready: {size}x{size} pool");
        Self {
            core,
            conductor: Some(conductor),
        }
    }

    // ---- lifecycle -------------------------------------------------------

    /// Begin running calculation and paint cycles.
    pub fn start(&self) {
        let _ctl = self.core.control.lock().unwrap();
        self.core.work_now.store(true, Ordering::SeqCst);
    }

    /// Stop scheduling cycles; workers fall back to `Pause` at the next
    /// barrier. State is preserved and `start` resumes.
    pub fn stop(&self) {
        let _ctl = self.core.control.lock().unwrap();
        self.core.work_now.store(false, Ordering::SeqCst);
    }

    /// Whether the engine is currently running cycles.
    pub fn is_working(&self) -> bool {
        self.core.is_working()
    }

    /// Shut the engine down: stop work, destroy the workers, and join every
    /// thread. Idempotent; also runs on drop.
    pub fn dispose(&mut self) {
        if self.core.disposing.swap(true, Ordering::SeqCst) {
            return;
        }
        self.core.work_now.store(false, Ordering::SeqCst);
        {
            let mut ctl = self.core.control.lock().unwrap();
            workers::send_order(&self.core, &mut ctl, Mission::Destroy);
            for worker in ctl.workers.drain(..) {
                let _ = worker.thread.join();
            }
        }
        if let Some(conductor) = self.conductor.take() {
            let _ = conductor.join();
        }
        tracing::debug!("wave engine disposed");
    }

    // ---- geometry and threading ------------------------------------------

    /// Edge length of the pool.
    pub fn size(&self) -> usize {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.pool.size()
    }

    /// Resize the pool to `size * size` (at least 1). Mass and fixity are
    /// rescaled nearest-neighbor, heights and velocities are zeroed, the
    /// loss field is rebuilt, oscillator anchors are rescaled, and the
    /// worker ranges are recomputed.
    pub fn set_size(&self, size: usize) {
        let size = size.max(1);
        let mut ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        let sim = unsafe { self.core.shared.state() };
        let old_size = sim.pool.size();
        sim.pool.resize(size);
        sim.bitmap = vec![0; size * size * 3];
        sim.oscillators.rescale(old_size, size);
        absorber::build_loss(
            &mut sim.pool.loss,
            size,
            ctl.base_loss,
            ctl.absorber_max_loss,
            ctl.absorber_thickness,
            ctl.absorber_enabled,
        );
        workers::rebuild(&self.core, &mut ctl);
    }

    /// Current worker count.
    pub fn number_of_threads(&self) -> usize {
        self.core.control.lock().unwrap().num_workers
    }

    /// Set the worker count, clamped to `[1, 32]`. The pool is rebuilt with
    /// fresh contiguous ranges.
    pub fn set_number_of_threads(&self, threads: usize) {
        let mut ctl = self.core.control.lock().unwrap();
        ctl.num_workers = threads.clamp(1, MAX_WORKERS);
        workers::rebuild(&self.core, &mut ctl);
    }

    // ---- rate limiting ---------------------------------------------------

    /// Target iterations per second (0 = unlimited).
    pub fn iterations_per_second(&self) -> f64 {
        self.core.control.lock().unwrap().ips
    }

    /// Set the iteration limiter (clamped non-negative, 0 = unlimited) and
    /// re-baseline the calculation counter.
    pub fn set_iterations_per_second(&self, ips: f64) {
        let mut ctl = self.core.control.lock().unwrap();
        ctl.ips = ips.max(0.0);
        ctl.calc_done = 0;
    }

    /// Target paints per second (0 = unlimited).
    pub fn frames_per_second(&self) -> f64 {
        self.core.control.lock().unwrap().fps
    }

    /// Set the paint limiter (clamped non-negative, 0 = unlimited) and
    /// re-baseline the paint counter.
    pub fn set_frames_per_second(&self, fps: f64) {
        let mut ctl = self.core.control.lock().unwrap();
        ctl.fps = fps.max(0.0);
        ctl.paint_done = 0;
    }

    /// Idle sleep of the conductor and parked workers, in milliseconds.
    pub fn thread_delay(&self) -> u64 {
        self.core.thread_delay_ms.load(Ordering::Relaxed)
    }

    /// Set the idle sleep, clamped to `[0, 1000]` ms.
    pub fn set_thread_delay(&self, delay_ms: u64) {
        let _ctl = self.core.control.lock().unwrap();
        self.core.thread_delay_ms.store(delay_ms.min(1000), Ordering::Relaxed);
    }

    /// Trade limiter accuracy for lower CPU use while idle.
    pub fn power_save_mode(&self) -> bool {
        self.core.control.lock().unwrap().power_save
    }

    /// Enable or disable power-save mode.
    pub fn set_power_save_mode(&self, enabled: bool) {
        self.core.control.lock().unwrap().power_save = enabled;
    }

    // ---- feature toggles -------------------------------------------------

    /// Whether calculation cycles run.
    pub fn calculation_enabled(&self) -> bool {
        self.core.control.lock().unwrap().calculation_enabled
    }

    /// Halt or resume calculation cycles (painting continues).
    pub fn set_calculation_enabled(&self, enabled: bool) {
        self.core.control.lock().unwrap().calculation_enabled = enabled;
    }

    /// Whether paint cycles and the render callback run.
    pub fn render_enabled(&self) -> bool {
        self.core.control.lock().unwrap().render_enabled
    }

    /// Halt or resume paint cycles.
    pub fn set_render_enabled(&self, enabled: bool) {
        self.core.control.lock().unwrap().render_enabled = enabled;
    }

    /// Whether the per-cycle mean-height shift is applied.
    pub fn shift_particles_enabled(&self) -> bool {
        self.core.control.lock().unwrap().shifting
    }

    /// Enable or disable the mean-height shift. Disable it for exact energy
    /// accounting.
    pub fn set_shift_particles_enabled(&self, enabled: bool) {
        self.core.control.lock().unwrap().shifting = enabled;
    }

    // ---- loss and absorber -----------------------------------------------

    /// Base energy loss ratio applied to every particle.
    pub fn loss_ratio(&self) -> f64 {
        self.core.control.lock().unwrap().base_loss
    }

    /// Set the base loss ratio, clamped to `[0, 1]`, and rebuild the loss
    /// field.
    pub fn set_loss_ratio(&self, loss: f64) {
        let mut ctl = self.core.control.lock().unwrap();
        ctl.base_loss = loss.clamp(0.0, 1.0);
        self.rebuild_loss(&mut ctl);
    }

    /// Whether the absorbing frame is active.
    pub fn absorber_enabled(&self) -> bool {
        self.core.control.lock().unwrap().absorber_enabled
    }

    /// Enable or disable the absorbing frame and rebuild the loss field.
    pub fn set_absorber_enabled(&self, enabled: bool) {
        let mut ctl = self.core.control.lock().unwrap();
        ctl.absorber_enabled = enabled;
        self.rebuild_loss(&mut ctl);
    }

    /// Depth of the absorbing frame, in cells.
    pub fn absorber_thickness(&self) -> usize {
        self.core.control.lock().unwrap().absorber_thickness
    }

    /// Set the absorber depth, clamped to `[0, size / 2]`, and rebuild the
    /// loss field.
    pub fn set_absorber_thickness(&self, thickness: usize) {
        let mut ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        let size = unsafe { self.core.shared.state() }.pool.size();
        ctl.absorber_thickness = thickness.min(size / 2);
        self.rebuild_loss(&mut ctl);
    }

    /// Loss ratio at the very edge of the absorbing frame.
    pub fn absorber_loss_ratio(&self) -> f64 {
        self.core.control.lock().unwrap().absorber_max_loss
    }

    /// Set the edge loss ratio, clamped to `[0, 1]`, and rebuild the loss
    /// field.
    pub fn set_absorber_loss_ratio(&self, loss: f64) {
        let mut ctl = self.core.control.lock().unwrap();
        ctl.absorber_max_loss = loss.clamp(0.0, 1.0);
        self.rebuild_loss(&mut ctl);
    }

    fn rebuild_loss(&self, ctl: &mut Control) {
        // SAFETY: control mutex held, no phase in flight.
        let sim = unsafe { self.core.shared.state() };
        let size = sim.pool.size();
        absorber::build_loss(
            &mut sim.pool.loss,
            size,
            ctl.base_loss,
            ctl.absorber_max_loss,
            ctl.absorber_thickness,
            ctl.absorber_enabled,
        );
    }

    // ---- observability ---------------------------------------------------

    /// Whether the periodic throughput line is emitted.
    pub fn log_performance(&self) -> bool {
        self.core.control.lock().unwrap().log_performance
    }

    /// Enable or disable the periodic throughput line.
    pub fn set_log_performance(&self, enabled: bool) {
        self.core.control.lock().unwrap().log_performance = enabled;
    }

    /// Interval of the throughput line, in milliseconds.
    pub fn performance_log_interval(&self) -> u64 {
        self.core.control.lock().unwrap().log_interval_ms
    }

    /// Set the throughput line interval.
    pub fn set_performance_log_interval(&self, interval_ms: u64) {
        self.core.control.lock().unwrap().log_interval_ms = interval_ms;
    }

    // ---- view state ------------------------------------------------------

    /// Color of a fully raised particle.
    pub fn crest_color(&self) -> Rgb {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.crest
    }

    /// Set the crest color.
    pub fn set_crest_color(&self, color: Rgb) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.crest = color;
    }

    /// Color of a fully lowered particle.
    pub fn trough_color(&self) -> Rgb {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.trough
    }

    /// Set the trough color.
    pub fn set_trough_color(&self, color: Rgb) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.trough = color;
    }

    /// Color of static particles.
    pub fn static_color(&self) -> Rgb {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.static_color
    }

    /// Set the static particle color.
    pub fn set_static_color(&self, color: Rgb) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.static_color = color;
    }

    /// Whether the painter collapses to crest / trough / midpoint.
    pub fn extreme_contrast_enabled(&self) -> bool {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.extreme_contrast
    }

    /// Enable or disable extreme contrast.
    pub fn set_extreme_contrast_enabled(&self, enabled: bool) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.extreme_contrast = enabled;
    }

    /// Height gain applied before the crest/trough interpolation.
    pub fn amplitude_multiplier(&self) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.amplitude_multiplier
    }

    /// Set the height gain, clamped non-negative.
    pub fn set_amplitude_multiplier(&self, multiplier: f64) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.amplitude_multiplier = multiplier.max(0.0);
    }

    /// Whether the painter shows the mass field instead of the wave.
    pub fn show_mass_map(&self) -> bool {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.mass_map
    }

    /// Switch between wave display and mass-map display.
    pub fn set_show_mass_map(&self, enabled: bool) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.mass_map = enabled;
    }

    /// Mass mapped to the cold end of the mass-map palette.
    pub fn mass_map_range_low(&self) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.mass_map_range_low
    }

    /// Set the cold end of the mass-map range, clamped non-negative.
    pub fn set_mass_map_range_low(&self, low: f64) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.mass_map_range_low = low.max(0.0);
    }

    /// Mass mapped to the hot end of the mass-map palette.
    pub fn mass_map_range_high(&self) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.mass_map_range_high
    }

    /// Set the hot end of the mass-map range, clamped non-negative.
    pub fn set_mass_map_range_high(&self, high: f64) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }.render.mass_map_range_high = high.max(0.0);
    }

    // ---- render callback -------------------------------------------------

    /// Install the render callback. It receives the finished bitmap on the
    /// conductor thread after every paint phase.
    pub fn set_render_callback(&self, callback: impl FnMut(&[u8]) + Send + 'static) {
        *self.core.listener.lock().unwrap() = Some(Box::new(callback));
    }

    /// Remove the render callback.
    pub fn clear_render_callback(&self) {
        *self.core.listener.lock().unwrap() = None;
    }

    // ---- oscillators -----------------------------------------------------

    /// Whether an oscillator slot is active; `false` for an out-of-range id.
    pub fn oscillator_enabled(&self, id: usize) -> bool {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.active)
            .unwrap_or(false)
    }

    /// Turn an oscillator slot on or off. Out-of-range ids are ignored.
    pub fn set_oscillator_enabled(&self, id: usize, enabled: bool) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        if let Some(osc) = unsafe { self.core.shared.state() }.oscillators.get_mut(id) {
            osc.active = enabled;
        }
    }

    /// Source kind of a slot; `Point` for an out-of-range id.
    pub fn oscillator_source(&self, id: usize) -> SourceKind {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.source)
            .unwrap_or(SourceKind::Point)
    }

    /// Change the source kind of a slot and recompute its target cells.
    pub fn set_oscillator_source(&self, id: usize, source: SourceKind) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        let sim = unsafe { self.core.shared.state() };
        let size = sim.pool.size();
        if let Some(osc) = sim.oscillators.get_mut(id) {
            osc.source = source;
            sim.oscillators.reindex(id, size);
        }
    }

    /// Period of a slot in iterations; `-1.0` for an out-of-range id.
    pub fn oscillator_period(&self, id: usize) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.period)
            .unwrap_or(-1.0)
    }

    /// Set the period of a slot. Periods below 1 are rejected.
    pub fn set_oscillator_period(&self, id: usize, period: f64) {
        if period < 1.0 {
            return;
        }
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        if let Some(osc) = unsafe { self.core.shared.state() }.oscillators.get_mut(id) {
            osc.period = period;
        }
    }

    /// Phase of a slot in degrees; `-1.0` for an out-of-range id.
    pub fn oscillator_phase(&self, id: usize) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.phase)
            .unwrap_or(-1.0)
    }

    /// Set the phase of a slot in degrees.
    pub fn set_oscillator_phase(&self, id: usize, phase: f64) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        if let Some(osc) = unsafe { self.core.shared.state() }.oscillators.get_mut(id) {
            osc.phase = phase;
        }
    }

    /// Amplitude of a slot; `-1.0` for an out-of-range id.
    pub fn oscillator_amplitude(&self, id: usize) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.amplitude)
            .unwrap_or(-1.0)
    }

    /// Set the amplitude of a slot.
    pub fn set_oscillator_amplitude(&self, id: usize, amplitude: f64) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        if let Some(osc) = unsafe { self.core.shared.state() }.oscillators.get_mut(id) {
            osc.amplitude = amplitude;
        }
    }

    /// Move period of a slot in iterations; `-1.0` for an out-of-range id.
    pub fn oscillator_move_period(&self, id: usize) -> f64 {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.move_period)
            .unwrap_or(-1.0)
    }

    /// Set the move period of a slot. Periods below 1 are rejected.
    pub fn set_oscillator_move_period(&self, id: usize, move_period: f64) {
        if move_period < 1.0 {
            return;
        }
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        if let Some(osc) = unsafe { self.core.shared.state() }.oscillators.get_mut(id) {
            osc.move_period = move_period;
        }
    }

    /// Anchor A of a slot; `[-1.0, -1.0]` for an out-of-range id.
    pub fn oscillator_anchor_a(&self, id: usize) -> [f64; 2] {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.anchor_a)
            .unwrap_or([-1.0, -1.0])
    }

    /// Move anchor A of a slot and recompute its target cells.
    pub fn set_oscillator_anchor_a(&self, id: usize, anchor: [f64; 2]) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        let sim = unsafe { self.core.shared.state() };
        let size = sim.pool.size();
        if let Some(osc) = sim.oscillators.get_mut(id) {
            osc.anchor_a = anchor;
            sim.oscillators.reindex(id, size);
        }
    }

    /// Anchor B of a slot; `[-1.0, -1.0]` for an out-of-range id.
    pub fn oscillator_anchor_b(&self, id: usize) -> [f64; 2] {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        unsafe { self.core.shared.state() }
            .oscillators
            .get(id)
            .map(|o| o.anchor_b)
            .unwrap_or([-1.0, -1.0])
    }

    /// Move anchor B of a slot and recompute its target cells.
    pub fn set_oscillator_anchor_b(&self, id: usize, anchor: [f64; 2]) {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        let sim = unsafe { self.core.shared.state() };
        let size = sim.pool.size();
        if let Some(osc) = sim.oscillators.get_mut(id) {
            osc.anchor_b = anchor;
            sim.oscillators.reindex(id, size);
        }
    }

    /// The instantaneous source position of a slot (anchor, segment
    /// midpoint, or interpolated moving point); `[-1.0, -1.0]` for an
    /// out-of-range id.
    pub fn oscillator_real_location(&self, id: usize) -> [f64; 2] {
        let _ctl = self.core.control.lock().unwrap();
        // SAFETY: control mutex held, no phase in flight.
        let sim = unsafe { self.core.shared.state() };
        sim.oscillators.real_location(id, sim.tick)
    }

    // ---- external data access --------------------------------------------

    /// Acquire exclusive access to the particle fields.
    ///
    /// While the guard lives, no phase can start and no setter can run; the
    /// caller may freely read and edit the backing arrays. Returns `None` if
    /// the pool is already locked externally (a double lock never
    /// re-acquires). The lock is released when the guard drops.
    pub fn lock(&self) -> Option<PoolData<'_>> {
        if self.core.externally_locked.swap(true, Ordering::SeqCst) {
            return None;
        }
        let guard = self.core.control.lock().unwrap();
        Some(PoolData {
            core: &self.core,
            _guard: guard,
        })
    }
}

impl Default for WaveEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaveEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Mutable view of one particle field, typed by attribute.
pub enum FieldMut<'a> {
    /// Height, velocity, loss, or mass.
    Scalar(&'a mut [f64]),
    /// Fixity flags.
    Flags(&'a mut [u8]),
}

/// Exclusive access to the particle fields, obtained from
/// [`WaveEngine::lock`]. Releases the pool on drop.
pub struct PoolData<'a> {
    core: &'a Arc<EngineCore>,
    _guard: MutexGuard<'a, Control>,
}

impl PoolData<'_> {
    /// Borrow the backing array of one attribute.
    pub fn field(&mut self, attribute: ParticleAttribute) -> FieldMut<'_> {
        // SAFETY: the guard holds the control mutex, so no phase is in
        // flight; the borrow is tied to `&mut self`.
        let sim = unsafe { self.core.shared.state() };
        match attribute {
            ParticleAttribute::Height => FieldMut::Scalar(&mut sim.pool.height),
            ParticleAttribute::Velocity => FieldMut::Scalar(&mut sim.pool.velocity),
            ParticleAttribute::Loss => FieldMut::Scalar(&mut sim.pool.loss),
            ParticleAttribute::Mass => FieldMut::Scalar(&mut sim.pool.mass),
            ParticleAttribute::Fixity => FieldMut::Flags(&mut sim.pool.fixity),
        }
    }

    /// Heights, row-major.
    pub fn heights(&mut self) -> &mut [f64] {
        // SAFETY: as in `field`.
        &mut unsafe { self.core.shared.state() }.pool.height
    }

    /// Velocities, row-major.
    pub fn velocities(&mut self) -> &mut [f64] {
        // SAFETY: as in `field`.
        &mut unsafe { self.core.shared.state() }.pool.velocity
    }

    /// Loss ratios, row-major.
    pub fn losses(&mut self) -> &mut [f64] {
        // SAFETY: as in `field`.
        &mut unsafe { self.core.shared.state() }.pool.loss
    }

    /// Masses, row-major.
    pub fn masses(&mut self) -> &mut [f64] {
        // SAFETY: as in `field`.
        &mut unsafe { self.core.shared.state() }.pool.mass
    }

    /// Fixity flags, row-major.
    pub fn fixity(&mut self) -> &mut [u8] {
        // SAFETY: as in `field`.
        &mut unsafe { self.core.shared.state() }.pool.fixity
    }

    /// Release the pool explicitly (dropping the guard does the same).
    pub fn unlock(self) {}
}

impl Drop for PoolData<'_> {
    fn drop(&mut self) {
        self.core.externally_locked.store(false, Ordering::SeqCst);
    }
}
