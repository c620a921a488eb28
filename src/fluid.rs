//! Fluid subsystem: water and acid locomotion.
//!
//! Fluids fall, spread sideways at their flow rate, and equalise the height
//! of connected columns. Acid corrosion lives in the acid subsystem; this
//! pass only moves it.

use crate::fixed::fixed_mul;
use crate::grid_iter::{grid_iterate_multipass, IterHorizontal, IterVertical};
use crate::physics;
use crate::simulation::Simulation;
use crate::world::World;

/// Update passes per tick; the extra pass improves dispersion.
const DISPERSION_PASSES: u32 = 2;

/// Minimum column height difference before pressure moves a cell sideways.
const PRESSURE_THRESHOLD: i32 = 1;

/// Chance per tick to attempt pressure equalisation.
const PRESSURE_CHANCE: f32 = 0.3;

/// Cap on cells fallen per tick.
const MAX_FALL_STEPS: i32 = 2;

/// Process every fluid cell, bottom-up, clearing `UPDATED` between passes so
/// each pass can move a cell once.
pub fn fluid_update(sim: &mut Simulation, world: &mut World) {
    grid_iterate_multipass(
        sim,
        world,
        IterVertical::BottomUp,
        IterHorizontal::Random,
        DISPERSION_PASSES,
        true,
        |sim, world, x, y| {
            fluid_update_cell(sim, world, x, y);
            true
        },
    );
}

pub(crate) fn fluid_update_cell(sim: &mut Simulation, world: &mut World, x: i32, y: i32) -> bool {
    if world.was_updated(x, y) {
        return false;
    }

    let mat = world.get_mat(x, y);
    if !world.materials.is_fluid(mat) {
        return false;
    }

    let props = *world.materials.get(mat);

    physics::apply_gravity_fixed(world, x, y, &props);

    let idx = world.index(x, y);
    let vy = world.vel_y[idx];
    let steps = physics::fall_steps(world, x, y, MAX_FALL_STEPS);

    let mut new_x = x;
    let mut new_y = y;
    let mut moved = false;

    // Priority 1: fall
    if vy > 0 {
        for _ in 0..steps {
            if world.fluid_can_enter(new_x, new_y + 1) {
                new_y += 1;
                moved = true;
            } else {
                physics::stop_vertical(world, x, y);
                break;
            }
        }
    }

    // Priority 2: horizontal flow
    if !moved || vy <= 0 {
        if sim.randf() < props.flow_rate {
            let can_left = world.fluid_can_enter(x - 1, y);
            let can_right = world.fluid_can_enter(x + 1, y);

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

    // Priority 3: pressure equalisation toward the shorter column
    if !moved && sim.randf() < PRESSURE_CHANCE {
        let my_height = physics::column_height(world, x, y, mat);

        if world.fluid_can_enter(x - 1, y) {
            let left_height = physics::column_height(world, x - 1, y, mat);
            if left_height < my_height - PRESSURE_THRESHOLD {
                new_x = x - 1;
                moved = true;
            }
        }

        if !moved && world.fluid_can_enter(x + 1, y) {
            let right_height = physics::column_height(world, x + 1, y, mat);
            if right_height < my_height - PRESSURE_THRESHOLD {
                new_x = x + 1;
                moved = true;
            }
        }
    }

    // Horizontal drag
    world.vel_x[idx] = fixed_mul(world.vel_x[idx], props.drag_factor_fixed);

    if moved && (new_x != x || new_y != y) {
        world.move_cell(x, y, new_x, new_y);
        return true;
    }

    // A cell with somewhere to go that lost its rolls this tick must stay
    // on the active list or it would freeze mid-flow
    if world.fluid_can_enter(x, y + 1)
        || world.fluid_can_enter(x - 1, y)
        || world.fluid_can_enter(x + 1, y)
    {
        world.activate_chunk_at(x, y);
    }

    false
}
