//! Acid corrosion subsystem.
//!
//! Locomotion is the fluid pass's job; this pass only dissolves corrodible
//! neighbours, sometimes venting smoke and sometimes spending the acid.

use crate::behavior::corrosion_reaction;
use crate::grid_iter::grid_iterate_falling;
use crate::materials::MaterialId;
use crate::simulation::Simulation;
use crate::world::World;

/// Chance the acid survives a reaction.
const ACID_SURVIVE_CHANCE: f32 = 0.5;

/// Process corrosion for every acid cell.
pub fn acid_update(sim: &mut Simulation, world: &mut World) {
    grid_iterate_falling(sim, world, |sim, world, x, y| {
        acid_update_cell(sim, world, x, y);
        true
    });
}

pub(crate) fn acid_update_cell(sim: &mut Simulation, world: &mut World, x: i32, y: i32) -> bool {
    if world.get_mat(x, y) != MaterialId::Acid {
        return false;
    }

    let mut corrodible_nearby = false;

    for (nx, ny) in world.neighbors8(x, y) {
        let Some(rule) = corrosion_reaction(world.get_mat(nx, ny)) else {
            continue;
        };
        corrodible_nearby = true;

        if sim.randf() < rule.probability {
            if sim.randf() < rule.byproduct_chance {
                world.set_mat(nx, ny, rule.byproduct);
                world.set_lifetime(nx, ny, 0);
            } else {
                world.set_mat(nx, ny, rule.result_target);
            }

            if sim.randf() > ACID_SURVIVE_CHANCE {
                world.set_mat(x, y, rule.result_self);
            }

            world.mark_updated(x, y);
            world.mark_updated(nx, ny);
            world.cells_updated += 1;

            // One reaction per acid cell per tick
            return true;
        }
    }

    // Unfinished business: keep the cell live so failed rolls retry
    if corrodible_nearby {
        world.activate_chunk_at(x, y);
    }

    false
}
