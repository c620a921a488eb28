//! Thermal subsystem: heat diffusion and phase changes.
//!
//! Two chunk-gated passes over the grid. The first diffuses heat between
//! 4-neighbours into the back buffer, the second applies temperature-driven
//! phase changes, then the buffers swap.

use crate::behavior::{boil_transition, condense_transition, freeze_transition, melt_transition};
use crate::constants::{
    AMBIENT_COOLING_RATE, AMBIENT_TEMP, CHUNK_SIZE, FIRE_TEMPERATURE, HEAT_DIFFUSION_RATE,
    TEMP_MAX, TEMP_MIN,
};
use crate::materials::MaterialId;
use crate::simulation::Simulation;
use crate::world::{World, NEIGHBOR4};

/// Heat of fusion released or absorbed by each transition, in degrees.
const MELT_HEAT: f32 = 10.0;
const FREEZE_HEAT: f32 = 5.0;
const BOIL_HEAT: f32 = 50.0;
const CONDENSE_HEAT: f32 = 20.0;

pub fn thermal_update(sim: &mut Simulation, world: &mut World) {
    // Pass 1: diffusion into the back buffer
    for y in 0..world.height() {
        let chunk_y = y / CHUNK_SIZE;
        for x in 0..world.width() {
            if !world.is_chunk_active(x / CHUNK_SIZE, chunk_y) {
                continue;
            }
            diffuse_cell(world, x, y);
        }
    }

    // Pass 2: phase changes on the freshly diffused temperatures
    for y in 0..world.height() {
        let chunk_y = y / CHUNK_SIZE;
        for x in 0..world.width() {
            if !world.is_chunk_active(x / CHUNK_SIZE, chunk_y) {
                continue;
            }
            check_phase_change(sim, world, x, y);
        }
    }

    world.swap_temp_buffers();
}

fn diffuse_cell(world: &mut World, x: i32, y: i32) {
    let idx = world.index(x, y);
    let mat = world.mat[idx];
    let temp = world.temp[idx];

    // Fire is a constant heat source
    if mat == MaterialId::Fire {
        world.temp_next[idx] = FIRE_TEMPERATURE;
        return;
    }

    // Empty cells relax to ambient quickly
    if mat == MaterialId::Empty {
        world.temp_next[idx] = temp + (AMBIENT_TEMP - temp) * 0.1;
        return;
    }

    let props = world.materials.get(mat);
    let conductivity = props.conductivity;
    let heat_capacity = props.heat_capacity.max(0.1);

    if conductivity <= 0.001 {
        world.temp_next[idx] = temp;
        return;
    }

    let mut heat_in = 0.0;
    let mut neighbor_count = 0;

    for (dx, dy) in NEIGHBOR4 {
        let nx = x + dx;
        let ny = y + dy;
        if !world.in_bounds(nx, ny) {
            continue;
        }
        let nidx = world.index(nx, ny);
        let ncond = world.materials.get(world.mat[nidx]).conductivity;

        // Effective conductivity is the geometric mean of the pair
        let eff_cond = if conductivity * ncond > 0.0 {
            (conductivity * ncond).sqrt()
        } else {
            0.0
        };

        heat_in += (world.temp[nidx] - temp) * eff_cond;
        neighbor_count += 1;
    }

    let mut next = if neighbor_count > 0 {
        let delta = heat_in * HEAT_DIFFUSION_RATE / neighbor_count as f32;
        temp + delta / heat_capacity
    } else {
        temp
    };

    // Slow heat loss to the environment
    next += (AMBIENT_TEMP - next) * AMBIENT_COOLING_RATE;

    world.temp_next[idx] = next.clamp(TEMP_MIN, TEMP_MAX);
}

fn check_phase_change(sim: &mut Simulation, world: &mut World, x: i32, y: i32) {
    let idx = world.index(x, y);
    let mat = world.mat[idx];
    let temp = world.temp_next[idx];

    // Melting (ice -> water) absorbs heat
    if let Some(t) = melt_transition(mat) {
        if temp > t.threshold {
            let chance = t.probability + (temp - t.threshold) * 0.002;
            if sim.randf() < chance {
                world.set_mat(x, y, t.result);
                world.temp_next[idx] -= MELT_HEAT;
            } else {
                // Retry the roll next tick
                world.activate_chunk_at(x, y);
            }
        }
    }

    // Freezing (water -> ice) releases heat
    if let Some(t) = freeze_transition(mat) {
        if temp < t.threshold {
            let chance = t.probability + (t.threshold - temp) * 0.001;
            if sim.randf() < chance {
                world.set_mat(x, y, t.result);
                world.temp_next[idx] += FREEZE_HEAT;
            } else {
                world.activate_chunk_at(x, y);
            }
        }
    }

    // Boiling (water -> steam) absorbs a lot of heat
    if let Some(t) = boil_transition(mat) {
        if temp > t.threshold {
            let chance = t.probability + (temp - t.threshold) * 0.005;
            if sim.randf() < chance {
                world.set_mat(x, y, t.result);
                world.set_lifetime(x, y, 0);
                world.temp_next[idx] -= BOIL_HEAT;
            } else {
                world.activate_chunk_at(x, y);
            }
        }
    }

    // Condensation (steam -> water) releases heat. The gas pass also rolls
    // for this, independently; both are probability rolls, not mass changes.
    if let Some(t) = condense_transition(mat) {
        if temp < t.threshold {
            let chance = t.probability + (t.threshold - temp) * 0.001;
            if sim.randf() < chance {
                world.set_mat(x, y, t.result);
                world.set_lifetime(x, y, 0);
                world.temp_next[idx] += CONDENSE_HEAT;
            } else {
                world.activate_chunk_at(x, y);
            }
        }
    }
}
