//! Fire subsystem.
//!
//! Fire ages, dies into ash/smoke/nothing, seeds smoke above itself,
//! ignites flammable neighbours and drifts upward like a gas.

use crate::behavior::fire_death;
use crate::gas::try_rise;
use crate::grid_iter::grid_iterate_falling;
use crate::materials::{Color, MaterialId, MaterialState};
use crate::simulation::Simulation;
use crate::world::{CellFlags, World, NEIGHBOR8};

const FIRE_RISE_CHANCE: f32 = 0.6;
const FIRE_DIE_CHANCE: f32 = 0.02;
const FIRE_SPREAD_CHANCE: f32 = 0.03;
const FIRE_SMOKE_CHANCE: f32 = 0.15;
const FIRE_MAX_LIFETIME: u8 = 120;

/// Flame colour ramp indexed by lifetime, hot to dying.
const FIRE_PALETTE: [Color; 6] = [
    Color::rgba(255, 255, 200, 255),
    Color::rgba(255, 220, 100, 255),
    Color::rgba(255, 150, 50, 255),
    Color::rgba(255, 80, 20, 255),
    Color::rgba(200, 50, 20, 255),
    Color::rgba(100, 30, 10, 255),
];

/// Renderer-facing colour for a fire cell of the given age.
pub fn fire_color(lifetime: u8) -> Color {
    let idx = (lifetime / 20).min(5) as usize;
    FIRE_PALETTE[idx]
}

/// Set a flammable cell on fire. Returns true when it ignited.
pub fn try_ignite(world: &mut World, x: i32, y: i32) -> bool {
    if !world.in_bounds(x, y) {
        return false;
    }
    if world.get_mat(x, y).is_flammable() {
        world.set_mat(x, y, MaterialId::Fire);
        world.add_flag(x, y, CellFlags::BURNING);
        return true;
    }
    false
}

/// Process every fire cell, bottom-up with per-tick horizontal direction.
pub fn fire_update(sim: &mut Simulation, world: &mut World) {
    grid_iterate_falling(sim, world, |sim, world, x, y| {
        fire_update_cell(sim, world, x, y);
        true
    });
}

pub(crate) fn fire_update_cell(sim: &mut Simulation, world: &mut World, x: i32, y: i32) -> bool {
    if world.was_updated(x, y) {
        return false;
    }

    if world.get_mat(x, y) != MaterialId::Fire {
        return false;
    }

    world.bump_lifetime(x, y);

    let should_die =
        sim.randf() < FIRE_DIE_CHANCE || world.lifetime_at(x, y) >= FIRE_MAX_LIFETIME;

    if should_die {
        let products = fire_death();
        let r = sim.randf();

        if r < products.ash_chance {
            world.set_mat(x, y, products.ash);
        } else if r < products.ash_chance + products.smoke_chance {
            world.set_mat(x, y, products.smoke);
        } else {
            world.set_mat(x, y, MaterialId::Empty);
        }

        world.set_lifetime(x, y, 0);
        world.remove_flag(x, y, CellFlags::BURNING);
        world.mark_updated(x, y);
        world.cells_updated += 1;
        return true;
    }

    // Seed smoke in the cell above
    if sim.randf() < FIRE_SMOKE_CHANCE
        && world.in_bounds(x, y - 1)
        && world.cell_state(x, y - 1) == MaterialState::Empty
    {
        world.set_mat(x, y - 1, MaterialId::Smoke);
        world.mark_updated(x, y - 1);
    }

    // Spread to flammable neighbours
    for (dx, dy) in NEIGHBOR8 {
        if sim.randf() < FIRE_SPREAD_CHANCE {
            let nx = x + dx;
            let ny = y + dy;
            if world.in_bounds(nx, ny) && world.get_mat(nx, ny).is_flammable() {
                try_ignite(world, nx, ny);
            }
        }
    }

    // Flames lick upward; unlike smoke, the sideways step is not gated
    if sim.randf() < FIRE_RISE_CHANCE && try_rise(sim, world, x, y, None, false) {
        return true;
    }

    world.mark_updated(x, y);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_HZ;

    fn setup(w: i32, h: i32) -> (Simulation, World) {
        let sim = Simulation::with_seed(TICK_HZ, 777).unwrap();
        let mut world = World::new(w, h).unwrap();
        world.activate_all();
        world.update_chunk_activation();
        (sim, world)
    }

    #[test]
    fn palette_covers_all_lifetimes() {
        assert_eq!(fire_color(0), FIRE_PALETTE[0]);
        assert_eq!(fire_color(45), FIRE_PALETTE[2]);
        assert_eq!(fire_color(119), FIRE_PALETTE[5]);
        assert_eq!(fire_color(255), FIRE_PALETTE[5]);
    }

    #[test]
    fn ignite_only_burns_flammables() {
        let (_, mut world) = setup(16, 16);
        world.set_mat(5, 5, MaterialId::Wood);
        world.set_mat(6, 5, MaterialId::Stone);

        assert!(try_ignite(&mut world, 5, 5));
        assert_eq!(world.get_mat(5, 5), MaterialId::Fire);
        assert!(world.has_flag(5, 5, CellFlags::BURNING));

        assert!(!try_ignite(&mut world, 6, 5));
        assert_eq!(world.get_mat(6, 5), MaterialId::Stone);
        assert!(!try_ignite(&mut world, -1, 5));
    }

    #[test]
    fn lone_fire_burns_out() {
        let (mut sim, mut world) = setup(16, 16);
        world.set_mat(8, 14, MaterialId::Fire);
        world.update_chunk_activation();

        for _ in 0..200 {
            sim.tick(&mut world);
            if world.count_material(MaterialId::Fire) == 0 {
                return;
            }
        }
        panic!("fire outlived its maximum lifetime");
    }

    #[test]
    fn fire_leaves_only_known_residue() {
        let (mut sim, mut world) = setup(16, 16);
        world.set_mat(8, 14, MaterialId::Fire);
        world.update_chunk_activation();

        for _ in 0..400 {
            sim.tick(&mut world);
        }
        for y in 0..16 {
            for x in 0..16 {
                let mat = world.get_mat(x, y);
                assert!(
                    matches!(
                        mat,
                        MaterialId::Empty | MaterialId::Ash | MaterialId::Smoke
                    ),
                    "unexpected residue {mat:?} at ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn fire_eventually_ignites_adjacent_wood() {
        let (mut sim, mut world) = setup(16, 16);
        for x in 4..12 {
            world.set_mat(x, 12, MaterialId::Wood);
        }
        world.update_chunk_activation();

        for _ in 0..2000 {
            // Keep a flame burning right above the plank
            if world.count_material(MaterialId::Fire) == 0 {
                world.set_mat(8, 11, MaterialId::Fire);
            }
            sim.tick(&mut world);
            if world.count_material(MaterialId::Wood) < 8 {
                return;
            }
        }
        panic!("wood never caught fire");
    }

    #[test]
    fn fire_seeds_smoke_above() {
        let (mut sim, mut world) = setup(16, 16);
        world.set_mat(8, 14, MaterialId::Fire);
        world.update_chunk_activation();

        let mut saw_smoke = false;
        for _ in 0..600 {
            if world.count_material(MaterialId::Fire) == 0 {
                world.set_mat(8, 14, MaterialId::Fire);
            }
            sim.tick(&mut world);
            if world.count_material(MaterialId::Smoke) > 0 {
                saw_smoke = true;
                break;
            }
        }
        assert!(saw_smoke, "burning fire never produced smoke");
    }
}
