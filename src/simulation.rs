use std::time::Instant;

use tracing::{debug, trace};

use crate::constants::FastRand;
use crate::world::World;
use crate::CreateError;
use crate::{acid, fire, fluid, gas, powder, thermal};

/// Fixed-timestep tick orchestrator.
///
/// Owns the tick clock and the deterministic RNG every subsystem draws
/// from. The trajectory of a world is fully determined by its initial
/// contents and the engine RNG state.
pub struct Simulation {
    tick_hz: f64,
    dt: f64,
    accumulator: f64,
    tick_count: u64,

    /// Persistent engine RNG; reseeds the tick RNG once per tick.
    rng: FastRand,
    /// Per-tick RNG, source of every stochastic decision inside a tick.
    tick_rng: FastRand,

    // Performance tracking
    tick_time_ms: f64,
    avg_tick_time_ms: f64,
    profile_powder_us: f64,
    profile_fluid_us: f64,
    profile_fire_us: f64,
    profile_gas_us: f64,
    profile_total_us: f64,

    paused: bool,
    step_once: bool,
}

/// Accumulator cap in ticks, to prevent a death spiral after a stall.
const MAX_PENDING_TICKS: f64 = 5.0;

impl Simulation {
    /// Create a simulation seeded from process entropy.
    pub fn new(tick_hz: f64) -> Result<Self, CreateError> {
        Self::with_seed(tick_hz, rand::random::<u32>())
    }

    /// Create a simulation with a pinned RNG seed, for reproducible runs.
    pub fn with_seed(tick_hz: f64, seed: u32) -> Result<Self, CreateError> {
        if !(tick_hz > 0.0) {
            return Err(CreateError::BadTickRate(tick_hz));
        }

        let mut rng = FastRand::new(seed);
        let tick_rng = FastRand::new(rng.rand());

        Ok(Self {
            tick_hz,
            dt: 1.0 / tick_hz,
            accumulator: 0.0,
            tick_count: 0,
            rng,
            tick_rng,
            tick_time_ms: 0.0,
            avg_tick_time_ms: 0.0,
            profile_powder_us: 0.0,
            profile_fluid_us: 0.0,
            profile_fire_us: 0.0,
            profile_gas_us: 0.0,
            profile_total_us: 0.0,
            paused: false,
            step_once: false,
        })
    }

    /// Advance the simulation by real elapsed time, consuming whole `dt`
    /// slices. The sole per-frame entry point for drivers.
    pub fn update(&mut self, world: &mut World, real_dt: f64) {
        if self.paused && !self.step_once {
            return;
        }

        if self.step_once {
            self.tick(world);
            self.step_once = false;
            return;
        }

        self.accumulator += real_dt;

        let max_accumulator = self.dt * MAX_PENDING_TICKS;
        if self.accumulator > max_accumulator {
            debug!(
                accumulator = self.accumulator,
                clamped_to = max_accumulator,
                "tick accumulator clamped"
            );
            self.accumulator = max_accumulator;
        }

        while self.accumulator >= self.dt {
            self.tick(world);
            self.accumulator -= self.dt;
        }
    }

    /// Run one simulation tick: refresh the tick seed, clear tick-scoped
    /// flags, run the subsystem pipeline in fixed order, then promote the
    /// chunk activation bitmaps.
    pub fn tick(&mut self, world: &mut World) {
        let tick_start = Instant::now();

        self.tick_rng = FastRand::new(self.rng.rand());

        world.clear_tick_flags();
        world.cells_updated = 0;

        let t = Instant::now();
        powder::powder_update(self, world);
        self.profile_powder_us = t.elapsed().as_secs_f64() * 1e6;

        let t = Instant::now();
        fluid::fluid_update(self, world);
        self.profile_fluid_us = t.elapsed().as_secs_f64() * 1e6;

        let t = Instant::now();
        fire::fire_update(self, world);
        self.profile_fire_us = t.elapsed().as_secs_f64() * 1e6;

        let t = Instant::now();
        gas::gas_update(self, world);
        self.profile_gas_us = t.elapsed().as_secs_f64() * 1e6;

        acid::acid_update(self, world);
        thermal::thermal_update(self, world);

        self.profile_total_us = self.profile_powder_us
            + self.profile_fluid_us
            + self.profile_fire_us
            + self.profile_gas_us;

        world.update_chunk_activation();
        self.tick_count += 1;

        self.tick_time_ms = tick_start.elapsed().as_secs_f64() * 1e3;
        self.avg_tick_time_ms = if self.tick_count == 1 {
            self.tick_time_ms
        } else {
            self.avg_tick_time_ms * 0.95 + self.tick_time_ms * 0.05
        };

        trace!(
            tick = self.tick_count,
            cells_updated = world.cells_updated(),
            active_chunks = world.active_chunks(),
            tick_ms = self.tick_time_ms,
            "tick complete"
        );
    }

    // -------------------------------------------------------------------
    // Deterministic per-tick RNG
    // -------------------------------------------------------------------

    /// Next value from the tick RNG.
    #[inline]
    pub fn rand(&mut self) -> u32 {
        self.tick_rng.rand()
    }

    /// Random float in `[0, 1)`.
    #[inline]
    pub fn randf(&mut self) -> f32 {
        (self.rand() as f64 / 4_294_967_296.0) as f32
    }

    /// Random integer in `[min, max]` inclusive.
    pub fn rand_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + (self.rand() % range) as i32
    }

    // -------------------------------------------------------------------
    // Driver controls
    // -------------------------------------------------------------------

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Queue a single tick for the next `update`, typically while paused.
    pub fn step_once(&mut self) {
        self.step_once = true;
    }

    /// Restart the clock and reseed the RNG from process entropy.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.tick_count = 0;
        self.rng = FastRand::new(rand::random::<u32>());
        self.tick_rng = FastRand::new(self.rng.rand());
        self.paused = false;
        self.step_once = false;
    }

    // -------------------------------------------------------------------
    // Telemetry
    // -------------------------------------------------------------------

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    #[inline]
    pub fn tick_hz(&self) -> f64 {
        self.tick_hz
    }

    #[inline]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    #[inline]
    pub fn tick_time_ms(&self) -> f64 {
        self.tick_time_ms
    }

    #[inline]
    pub fn avg_tick_time_ms(&self) -> f64 {
        self.avg_tick_time_ms
    }

    pub fn profile_powder_us(&self) -> f64 {
        self.profile_powder_us
    }

    pub fn profile_fluid_us(&self) -> f64 {
        self.profile_fluid_us
    }

    pub fn profile_fire_us(&self) -> f64 {
        self.profile_fire_us
    }

    pub fn profile_gas_us(&self) -> f64 {
        self.profile_gas_us
    }

    pub fn profile_total_us(&self) -> f64 {
        self.profile_total_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_HZ;

    #[test]
    fn rejects_bad_tick_rate() {
        assert!(Simulation::new(0.0).is_err());
        assert!(Simulation::new(-60.0).is_err());
        assert!(Simulation::new(f64::NAN).is_err());
        assert!(Simulation::new(TICK_HZ).is_ok());
    }

    #[test]
    fn identical_seeds_give_identical_streams() {
        let mut a = Simulation::with_seed(TICK_HZ, 7).unwrap();
        let mut b = Simulation::with_seed(TICK_HZ, 7).unwrap();
        for _ in 0..256 {
            assert_eq!(a.rand(), b.rand());
        }
    }

    #[test]
    fn randf_stays_in_unit_interval() {
        let mut sim = Simulation::with_seed(TICK_HZ, 3).unwrap();
        for _ in 0..10_000 {
            let f = sim.randf();
            assert!((0.0..=1.0).contains(&f));
        }
    }

    #[test]
    fn rand_range_is_inclusive_and_bounded() {
        let mut sim = Simulation::with_seed(TICK_HZ, 11).unwrap();
        let mut saw_min = false;
        let mut saw_max = false;
        for _ in 0..10_000 {
            let v = sim.rand_range(-3, 3);
            assert!((-3..=3).contains(&v));
            saw_min |= v == -3;
            saw_max |= v == 3;
        }
        assert!(saw_min && saw_max);
        assert_eq!(sim.rand_range(5, 5), 5);
        assert_eq!(sim.rand_range(9, 2), 9);
    }

    #[test]
    fn update_consumes_whole_dt_slices() {
        let mut sim = Simulation::with_seed(TICK_HZ, 1).unwrap();
        let mut world = World::new(32, 32).unwrap();
        let dt = sim.dt();

        sim.update(&mut world, dt * 0.6);
        assert_eq!(sim.tick_count(), 0);
        sim.update(&mut world, dt * 0.6);
        assert_eq!(sim.tick_count(), 1);
        sim.update(&mut world, dt * 3.0);
        assert_eq!(sim.tick_count(), 4);
    }

    #[test]
    fn accumulator_clamps_after_a_stall() {
        let mut sim = Simulation::with_seed(TICK_HZ, 1).unwrap();
        let mut world = World::new(32, 32).unwrap();
        // A two-second stall must not replay two seconds of ticks
        sim.update(&mut world, 2.0);
        assert_eq!(sim.tick_count(), MAX_PENDING_TICKS as u64);
    }

    #[test]
    fn pause_blocks_and_step_once_runs_exactly_one_tick() {
        let mut sim = Simulation::with_seed(TICK_HZ, 1).unwrap();
        let mut world = World::new(32, 32).unwrap();

        sim.set_paused(true);
        sim.update(&mut world, 1.0);
        assert_eq!(sim.tick_count(), 0);

        sim.step_once();
        sim.update(&mut world, 1.0);
        assert_eq!(sim.tick_count(), 1);
        sim.update(&mut world, 1.0);
        assert_eq!(sim.tick_count(), 1);

        sim.toggle_pause();
        assert!(!sim.is_paused());
    }

    #[test]
    fn tick_resets_cells_updated() {
        let mut sim = Simulation::with_seed(TICK_HZ, 1).unwrap();
        let mut world = World::new(64, 64).unwrap();
        world.set_mat(10, 10, crate::materials::MaterialId::Sand);
        world.update_chunk_activation();
        sim.tick(&mut world);
        let first = world.cells_updated();
        assert!(first > 0, "falling sand should register an update");
    }
}
