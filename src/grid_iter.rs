//! Centralised grid traversal for the subsystem passes.
//!
//! All passes walk the grid through these helpers so the scan order rules
//! live in one place: vertical direction by subsystem, horizontal direction
//! randomised per tick from the tick seed, and cells in inactive chunks
//! skipped entirely.

use crate::constants::CHUNK_SIZE;
use crate::simulation::Simulation;
use crate::world::{CellFlags, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterVertical {
    /// y: 0 -> height, for rising materials.
    TopDown,
    /// y: height -> 0, for falling materials.
    BottomUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterHorizontal {
    LeftRight,
    RightLeft,
    /// Direction drawn from the tick seed, once per traversal.
    Random,
}

/// Walk every cell in active chunks in the requested order. The callback
/// returns `false` to abort the traversal.
pub fn grid_iterate<F>(
    sim: &mut Simulation,
    world: &mut World,
    vertical: IterVertical,
    horizontal: IterHorizontal,
    mut visit: F,
) where
    F: FnMut(&mut Simulation, &mut World, i32, i32) -> bool,
{
    let scan_left = match horizontal {
        IterHorizontal::LeftRight => true,
        IterHorizontal::RightLeft => false,
        IterHorizontal::Random => sim.rand() & 1 == 1,
    };

    let height = world.height();
    let width = world.width();

    let mut row = |sim: &mut Simulation, world: &mut World, y: i32| -> bool {
        let chunk_y = y / CHUNK_SIZE;
        if scan_left {
            for x in 0..width {
                if world.is_chunk_active(x / CHUNK_SIZE, chunk_y) && !visit(sim, world, x, y) {
                    return false;
                }
            }
        } else {
            for x in (0..width).rev() {
                if world.is_chunk_active(x / CHUNK_SIZE, chunk_y) && !visit(sim, world, x, y) {
                    return false;
                }
            }
        }
        true
    };

    match vertical {
        IterVertical::TopDown => {
            for y in 0..height {
                if !row(sim, world, y) {
                    return;
                }
            }
        }
        IterVertical::BottomUp => {
            for y in (0..height).rev() {
                if !row(sim, world, y) {
                    return;
                }
            }
        }
    }
}

/// Bottom-up scan with per-tick random horizontal direction, for falling
/// materials.
pub fn grid_iterate_falling<F>(sim: &mut Simulation, world: &mut World, visit: F)
where
    F: FnMut(&mut Simulation, &mut World, i32, i32) -> bool,
{
    grid_iterate(sim, world, IterVertical::BottomUp, IterHorizontal::Random, visit);
}

/// Top-down scan with per-tick random horizontal direction, for rising
/// materials.
pub fn grid_iterate_rising<F>(sim: &mut Simulation, world: &mut World, visit: F)
where
    F: FnMut(&mut Simulation, &mut World, i32, i32) -> bool,
{
    grid_iterate(sim, world, IterVertical::TopDown, IterHorizontal::Random, visit);
}

/// Run the traversal several times. With `clear_flags_between`, the
/// `UPDATED` flag is wiped on active-chunk cells before each re-run so a
/// cell can move once per pass.
pub fn grid_iterate_multipass<F>(
    sim: &mut Simulation,
    world: &mut World,
    vertical: IterVertical,
    horizontal: IterHorizontal,
    passes: u32,
    clear_flags_between: bool,
    mut visit: F,
) where
    F: FnMut(&mut Simulation, &mut World, i32, i32) -> bool,
{
    for pass in 0..passes {
        if pass > 0 && clear_flags_between {
            clear_updated_in_active_chunks(world);
        }
        grid_iterate(sim, world, vertical, horizontal, &mut visit);
    }
}

fn clear_updated_in_active_chunks(world: &mut World) {
    for y in 0..world.height() {
        let chunk_y = y / CHUNK_SIZE;
        for x in 0..world.width() {
            if world.is_chunk_active(x / CHUNK_SIZE, chunk_y) {
                world.remove_flag(x, y, CellFlags::UPDATED);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TICK_HZ;
    use crate::materials::MaterialId;

    fn setup() -> (Simulation, World) {
        let sim = Simulation::with_seed(TICK_HZ, 99).unwrap();
        let world = World::new(96, 96).unwrap();
        (sim, world)
    }

    #[test]
    fn skips_inactive_chunks() {
        let mut sim = Simulation::with_seed(TICK_HZ, 99).unwrap();
        let mut world = World::new(160, 160).unwrap();
        // Activate only the chunk neighbourhood around (80, 80)
        world.set_mat(80, 80, MaterialId::Sand);
        world.update_chunk_activation();

        let mut visited_outside = 0;
        let mut visited_inside = 0;
        grid_iterate(
            &mut sim,
            &mut world,
            IterVertical::TopDown,
            IterHorizontal::LeftRight,
            |_, _, x, y| {
                if (32..128).contains(&x) && (32..128).contains(&y) {
                    visited_inside += 1;
                } else {
                    visited_outside += 1;
                }
                true
            },
        );
        assert_eq!(visited_outside, 0);
        assert!(visited_inside > 0);
    }

    #[test]
    fn bottom_up_visits_lower_rows_first() {
        let (mut sim, mut world) = setup();
        world.activate_all();
        world.update_chunk_activation();

        let mut rows = Vec::new();
        grid_iterate(
            &mut sim,
            &mut world,
            IterVertical::BottomUp,
            IterHorizontal::LeftRight,
            |_, _, x, y| {
                if x == 0 {
                    rows.push(y);
                }
                true
            },
        );
        assert_eq!(rows.first(), Some(&95));
        assert_eq!(rows.last(), Some(&0));
    }

    #[test]
    fn callback_false_stops_iteration() {
        let (mut sim, mut world) = setup();
        world.activate_all();
        world.update_chunk_activation();

        let mut visits = 0;
        grid_iterate(
            &mut sim,
            &mut world,
            IterVertical::TopDown,
            IterHorizontal::LeftRight,
            |_, _, _, _| {
                visits += 1;
                visits < 10
            },
        );
        assert_eq!(visits, 10);
    }

    #[test]
    fn multipass_clears_updated_between_passes() {
        let (mut sim, mut world) = setup();
        world.activate_all();
        world.update_chunk_activation();

        let mut first_pass_saw_flag = None;
        let mut second_pass_saw_flag = None;
        let mut pass = 0;
        grid_iterate_multipass(
            &mut sim,
            &mut world,
            IterVertical::TopDown,
            IterHorizontal::LeftRight,
            2,
            true,
            |_, world, x, y| {
                if x == 12 && y == 12 {
                    if pass == 0 {
                        first_pass_saw_flag = Some(world.has_flag(x, y, CellFlags::UPDATED));
                        world.add_flag(x, y, CellFlags::UPDATED);
                        pass = 1;
                    } else {
                        second_pass_saw_flag = Some(world.has_flag(x, y, CellFlags::UPDATED));
                    }
                }
                true
            },
        );
        assert_eq!(first_pass_saw_flag, Some(false));
        // The flag set during pass 1 was cleared before pass 2
        assert_eq!(second_pass_saw_flag, Some(false));
    }

    #[test]
    fn random_direction_comes_from_tick_seed() {
        // Identical seeds must produce identical visit sequences
        let mut orders = Vec::new();
        for _ in 0..2 {
            let (mut sim, mut world) = setup();
            world.activate_all();
            world.update_chunk_activation();
            let mut first_x = None;
            grid_iterate(
                &mut sim,
                &mut world,
                IterVertical::TopDown,
                IterHorizontal::Random,
                |_, _, x, _| {
                    first_x.get_or_insert(x);
                    false
                },
            );
            orders.push(first_x);
        }
        assert_eq!(orders[0], orders[1]);
    }
}
