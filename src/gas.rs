//! Gas subsystem: smoke and steam.
//!
//! Gases rise, drift sideways, fade out (smoke) or condense back to water
//! (steam). Fire is skipped here; it has its own subsystem and borrows the
//! rise logic below.

use crate::grid_iter::grid_iterate_rising;
use crate::materials::{MaterialId, MaterialState};
use crate::simulation::Simulation;
use crate::world::World;

const SMOKE_DISSIPATE_CHANCE: f32 = 0.006;
const SMOKE_RISE_CHANCE: f32 = 0.85;
const SMOKE_SPREAD_CHANCE: f32 = 0.3;

const STEAM_RISE_CHANCE: f32 = 0.9;
const STEAM_CONDENSE_CHANCE: f32 = 0.01;
const STEAM_CONDENSE_TEMP: f32 = 80.0;

/// Gas-style movement: straight up, diagonally up, sideways, and optionally
/// bubbling up through a fluid. Returns true when the cell moved.
///
/// `horizontal_gate` is the probability of attempting the sideways step;
/// `None` always attempts it (fire rises this way, gases roll first).
pub(crate) fn try_rise(
    sim: &mut Simulation,
    world: &mut World,
    x: i32,
    y: i32,
    horizontal_gate: Option<f32>,
    allow_bubble: bool,
) -> bool {
    let mut new_x = x;
    let mut new_y = y;
    let mut moved = false;

    // Priority 1: rise straight up
    if world.gas_can_enter(x, y - 1) {
        new_y = y - 1;
        moved = true;
    } else {
        // Priority 2: rise diagonally
        let can_up_left = world.gas_can_enter(x - 1, y - 1);
        let can_up_right = world.gas_can_enter(x + 1, y - 1);

        if can_up_left && can_up_right {
            new_x = if sim.randf() < 0.5 { x - 1 } else { x + 1 };
            new_y = y - 1;
            moved = true;
        } else if can_up_left {
            new_x = x - 1;
            new_y = y - 1;
            moved = true;
        } else if can_up_right {
            new_x = x + 1;
            new_y = y - 1;
            moved = true;
        }
    }

    // Priority 3: spread horizontally
    if !moved {
        let attempt = match horizontal_gate {
            Some(chance) => sim.randf() < chance,
            None => true,
        };
        if attempt {
            let can_left = world.gas_can_enter(x - 1, y);
            let can_right = world.gas_can_enter(x + 1, y);

            if can_left && can_right {
                new_x = if sim.randf() < 0.5 { x - 1 } else { x + 1 };
                moved = true;
            } else if can_left {
                new_x = x - 1;
                moved = true;
            } else if can_right {
                new_x = x + 1;
                moved = true;
            }
        }
    }

    // Priority 4: bubble up through a fluid
    if !moved && allow_bubble && world.cell_state(x, y - 1) == MaterialState::Fluid {
        new_y = y - 1;
        moved = true;
    }

    if moved {
        world.move_cell(x, y, new_x, new_y);
        return true;
    }

    false
}

/// Process every gas cell, top-down with per-tick horizontal direction.
pub fn gas_update(sim: &mut Simulation, world: &mut World) {
    grid_iterate_rising(sim, world, |sim, world, x, y| {
        gas_update_cell(sim, world, x, y);
        true
    });
}

pub(crate) fn gas_update_cell(sim: &mut Simulation, world: &mut World, x: i32, y: i32) -> bool {
    if world.was_updated(x, y) {
        return false;
    }

    let mat = world.get_mat(x, y);
    if world.materials.state(mat) != MaterialState::Gas || mat == MaterialId::Fire {
        return false;
    }

    world.bump_lifetime(x, y);

    // Smoke fades faster the older it gets
    if mat == MaterialId::Smoke {
        let lifetime = world.lifetime_at(x, y);
        let dissipate_chance = SMOKE_DISSIPATE_CHANCE * (1.0 + lifetime as f32 / 100.0);
        if sim.randf() < dissipate_chance {
            world.set_mat(x, y, MaterialId::Empty);
            world.set_lifetime(x, y, 0);
            world.mark_updated(x, y);
            world.cells_updated += 1;
            return true;
        }
    }

    // Cool steam condenses back to water
    if mat == MaterialId::Steam {
        let temp = world.temp_at(x, y);
        if temp < STEAM_CONDENSE_TEMP {
            let condense_chance =
                STEAM_CONDENSE_CHANCE * (STEAM_CONDENSE_TEMP - temp) / STEAM_CONDENSE_TEMP;
            if sim.randf() < condense_chance {
                world.set_mat(x, y, MaterialId::Water);
                world.set_lifetime(x, y, 0);
                world.mark_updated(x, y);
                world.cells_updated += 1;
                return true;
            }
        }
    }

    let rise_chance = if mat == MaterialId::Steam {
        STEAM_RISE_CHANCE
    } else {
        SMOKE_RISE_CHANCE
    };
    if sim.randf() > rise_chance {
        return false;
    }

    try_rise(sim, world, x, y, Some(SMOKE_SPREAD_CHANCE), true)
}
