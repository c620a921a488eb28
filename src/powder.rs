//! Powder subsystem: sand, soil and ash.
//!
//! Powders fall under gravity, pile up by sliding down diagonals, and sink
//! through lighter fluids and gases. A fast grain landing in fluid throws a
//! splash parcel sideways.

use crate::grid_iter::grid_iterate_falling;
use crate::materials::{MaterialId, MaterialState};
use crate::physics;
use crate::simulation::Simulation;
use crate::world::World;

/// Cap on cells fallen per tick.
const MAX_FALL_STEPS: i32 = 3;

/// Sideways speed given to a splashed fluid parcel.
const SPLASH_SPEED_X: f32 = 0.8;

/// Upward speed given to a splashed fluid parcel.
const SPLASH_SPEED_Y: f32 = -0.5;

/// Process every powder cell, bottom-up with per-tick horizontal direction.
pub fn powder_update(sim: &mut Simulation, world: &mut World) {
    grid_iterate_falling(sim, world, |sim, world, x, y| {
        powder_update_cell(sim, world, x, y);
        true
    });
}

fn can_displace(world: &World, source: MaterialId, x: i32, y: i32) -> bool {
    if !world.in_bounds(x, y) {
        return false;
    }
    // Only fluids and gases give way to a heavier grain
    let state = world.cell_state(x, y);
    if state != MaterialState::Fluid && state != MaterialState::Gas {
        return false;
    }
    physics::can_displace(&world.materials, source, world.get_mat(x, y))
}

/// Copy the displaced fluid up and to a random side of the impact point.
fn create_splash(sim: &mut Simulation, world: &mut World, x: i32, y: i32, fluid: MaterialId) {
    let dir = if sim.rand() & 1 == 1 { -1 } else { 1 };
    let splash_x = x + dir;
    let splash_y = y - 1;

    if !world.in_bounds(splash_x, splash_y) {
        return;
    }
    if world.is_passable(splash_x, splash_y) {
        let seed = world.color_seed_at(x, y);
        world.set_mat(splash_x, splash_y, fluid);
        world.set_velocity(splash_x, splash_y, dir as f32 * SPLASH_SPEED_X, SPLASH_SPEED_Y);
        world.set_color_seed(splash_x, splash_y, seed);
    }
}

pub(crate) fn powder_update_cell(sim: &mut Simulation, world: &mut World, x: i32, y: i32) -> bool {
    if world.was_updated(x, y) {
        return false;
    }

    let mat = world.get_mat(x, y);
    if !world.materials.is_powder(mat) {
        return false;
    }

    let props = *world.materials.get(mat);

    // Settling: a grain resting on a stable pile skips its update, which
    // suppresses jitter on finished piles.
    if sim.randf() < props.settle_probability {
        let below = world.cell_state(x, y + 1);
        let below_blocked = below != MaterialState::Empty
            && below != MaterialState::Fluid
            && below != MaterialState::Gas;

        if below_blocked {
            let left_blocked = !world.powder_can_enter(x - 1, y + 1);
            let right_blocked = !world.powder_can_enter(x + 1, y + 1);
            if left_blocked && right_blocked {
                return false;
            }
        }
    }

    physics::apply_gravity_fixed(world, x, y, &props);
    let steps = physics::fall_steps(world, x, y, MAX_FALL_STEPS);

    let mut dx = 0;
    let mut dy = 0;
    let mut moved = false;

    // Priority 1: fall straight down, up to `steps` cells
    let mut cur_y = y;
    for _ in 0..steps {
        if world.powder_can_enter(x, cur_y + 1) {
            cur_y += 1;
            dy = cur_y - y;
            moved = true;
        } else {
            physics::stop_vertical(world, x, y);
            break;
        }
    }

    // Priority 2 and 3: slide down a diagonal
    if !moved && steps == 1 {
        let try_left_first = sim.randf() < props.slide_bias;

        let mut can_left = world.powder_can_enter(x - 1, y + 1);
        let mut can_right = world.powder_can_enter(x + 1, y + 1);

        // Cohesion holds the grain in place when both diagonals are open
        if can_left && can_right && props.cohesion > 0.0 && sim.randf() < props.cohesion {
            can_left = false;
            can_right = false;
            // The grain is still unstable; retry next tick
            world.activate_chunk_at(x, y);
        }

        if try_left_first {
            if can_left {
                dx = -1;
                dy = 1;
                moved = true;
            } else if can_right {
                dx = 1;
                dy = 1;
                moved = true;
            }
        } else if can_right {
            dx = 1;
            dy = 1;
            moved = true;
        } else if can_left {
            dx = -1;
            dy = 1;
            moved = true;
        }
    }

    if moved {
        let new_x = x + dx;
        let new_y = y + dy;
        let target = world.get_mat(new_x, new_y);

        if world.cell_state(new_x, new_y) == MaterialState::Empty {
            world.swap_cells(x, y, new_x, new_y);
        } else if can_displace(world, mat, new_x, new_y) {
            if world.cell_state(new_x, new_y) == MaterialState::Fluid
                && physics::is_impact(world, x, y)
            {
                create_splash(sim, world, new_x, new_y, target);
            }
            world.swap_cells(x, y, new_x, new_y);
        }

        // A failed displacement still spends both cells' update for this
        // tick (a light grain resting on a denser fluid goes nowhere)
        world.mark_updated(new_x, new_y);
        world.mark_updated(x, y);
        world.cells_updated += 1;
        return true;
    }

    false
}
