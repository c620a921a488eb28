//! Shared physics helpers: gravity integration, movement step counts,
//! density displacement, impact detection and fluid column pressure.

use crate::fixed::{fixed_mul, fixed_to_float, FIXED_SHIFT};
use crate::materials::{Material, MaterialId, MaterialRegistry};
use crate::world::World;

/// Velocity magnitude above which a falling cell splashes what it lands in.
pub const IMPACT_THRESHOLD: f32 = 1.5;

/// Hard cap on velocity magnitude, in cells/tick.
pub const MAX_VELOCITY: f32 = 4.0;

/// Float view of a cell's fixed-point velocity pair.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn from_fixed(vx: crate::fixed::Fixed8, vy: crate::fixed::Fixed8) -> Self {
        Self { vx: fixed_to_float(vx), vy: fixed_to_float(vy) }
    }
}

/// Integrate gravity into a cell's vertical velocity in fixed point:
/// accelerate, apply drag, clamp to the material's terminal velocity.
pub(crate) fn apply_gravity_fixed(world: &mut World, x: i32, y: i32, props: &Material) {
    if !world.in_bounds(x, y) {
        return;
    }
    let idx = world.index(x, y);
    let mut vy = world.vel_y[idx];

    vy += props.gravity_step_fixed;
    vy = fixed_mul(vy, props.drag_factor_fixed);
    vy = vy.clamp(-props.terminal_velocity_fixed, props.terminal_velocity_fixed);

    world.vel_y[idx] = vy;
}

/// Whole-cell fall steps from the current vertical velocity, clamped to
/// `max_steps`. A cell with any vertical motion takes at least one step.
pub(crate) fn fall_steps(world: &World, x: i32, y: i32, max_steps: i32) -> i32 {
    if !world.in_bounds(x, y) {
        return 0;
    }
    let idx = world.index(x, y);
    let vy = world.vel_y[idx];

    let steps = ((vy as i32).abs() >> FIXED_SHIFT).clamp(0, max_steps);
    if steps == 0 {
        1
    } else {
        steps
    }
}

/// Vertical collision: full stop.
pub(crate) fn stop_vertical(world: &mut World, x: i32, y: i32) {
    if !world.in_bounds(x, y) {
        return;
    }
    let idx = world.index(x, y);
    world.vel_y[idx] = 0;
}

/// Horizontal collision: full stop.
#[allow(dead_code)]
pub(crate) fn stop_horizontal(world: &mut World, x: i32, y: i32) {
    if !world.in_bounds(x, y) {
        return;
    }
    let idx = world.index(x, y);
    world.vel_x[idx] = 0;
}

/// Higher density displaces lower.
pub(crate) fn can_displace(
    materials: &MaterialRegistry,
    source: MaterialId,
    target: MaterialId,
) -> bool {
    materials.get(source).density > materials.get(target).density
}

/// True when the cell is falling fast enough for impact effects.
pub(crate) fn is_impact(world: &World, x: i32, y: i32) -> bool {
    if !world.in_bounds(x, y) {
        return false;
    }
    let idx = world.index(x, y);
    fixed_to_float(world.vel_y[idx].abs()) > IMPACT_THRESHOLD
}

/// Height of the contiguous column of `mat` from `(x, y)` upward, inclusive.
pub(crate) fn column_height(world: &World, x: i32, y: i32, mat: MaterialId) -> i32 {
    let mut count = 0;
    let mut cy = y;
    while cy >= 0 {
        if world.get_mat(x, cy) == mat {
            count += 1;
        } else {
            break;
        }
        cy -= 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::fixed_from_float;

    fn world() -> World {
        World::new(64, 64).unwrap()
    }

    #[test]
    fn gravity_accelerates_and_clamps() {
        let mut w = world();
        w.set_mat(5, 5, MaterialId::Sand);
        let props = *w.materials.get(MaterialId::Sand);
        let idx = w.index(5, 5);

        apply_gravity_fixed(&mut w, 5, 5, &props);
        let after_one = w.vel_y[idx];
        assert!(after_one > 0);

        for _ in 0..200 {
            apply_gravity_fixed(&mut w, 5, 5, &props);
        }
        let settled = w.vel_y[idx];
        assert!(settled <= props.terminal_velocity_fixed);
        // Drag settles the velocity to an equilibrium below terminal
        apply_gravity_fixed(&mut w, 5, 5, &props);
        assert_eq!(w.vel_y[idx], settled);
    }

    #[test]
    fn fall_steps_floor_at_one() {
        let mut w = world();
        let idx = w.index(3, 3);
        w.vel_y[idx] = fixed_from_float(0.4);
        assert_eq!(fall_steps(&w, 3, 3, 3), 1);
        w.vel_y[idx] = fixed_from_float(2.6);
        assert_eq!(fall_steps(&w, 3, 3, 3), 2);
        w.vel_y[idx] = fixed_from_float(3.9);
        assert_eq!(fall_steps(&w, 3, 3, 2), 2);
        w.vel_y[idx] = fixed_from_float(-1.5);
        assert_eq!(fall_steps(&w, 3, 3, 3), 1);
    }

    #[test]
    fn displacement_follows_density() {
        let w = world();
        let m = &w.materials;
        assert!(can_displace(m, MaterialId::Sand, MaterialId::Water));
        assert!(!can_displace(m, MaterialId::Ash, MaterialId::Water));
        assert!(can_displace(m, MaterialId::Water, MaterialId::Smoke));
        assert!(!can_displace(m, MaterialId::Water, MaterialId::Water));
    }

    #[test]
    fn impact_threshold() {
        let mut w = world();
        let idx = w.index(4, 4);
        w.vel_y[idx] = fixed_from_float(1.4);
        assert!(!is_impact(&w, 4, 4));
        w.vel_y[idx] = fixed_from_float(1.6);
        assert!(is_impact(&w, 4, 4));
        w.vel_y[idx] = fixed_from_float(-2.0);
        assert!(is_impact(&w, 4, 4));
    }

    #[test]
    fn column_height_counts_contiguous_material() {
        let mut w = world();
        for y in 10..20 {
            w.set_mat(7, y, MaterialId::Water);
        }
        assert_eq!(column_height(&w, 7, 19, MaterialId::Water), 10);
        assert_eq!(column_height(&w, 7, 14, MaterialId::Water), 5);
        assert_eq!(column_height(&w, 7, 9, MaterialId::Water), 0);
        // A gap cuts the column
        w.set_mat(7, 15, MaterialId::Empty);
        assert_eq!(column_height(&w, 7, 19, MaterialId::Water), 4);
    }
}
