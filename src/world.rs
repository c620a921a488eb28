use bitflags::bitflags;
use smallvec::SmallVec;
use tracing::info;

use crate::constants::{FastRand, AMBIENT_TEMP, CHUNK_SIZE};
use crate::fixed::{fixed_from_float, Fixed8};
use crate::materials::{Color, MaterialId, MaterialRegistry, MaterialState};
use crate::physics::Velocity;
use crate::CreateError;

bitflags! {
    /// Per-cell overlay states. `UPDATED` has tick scope, the rest persist
    /// until a rule clears them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CellFlags: u16 {
        const UPDATED   = 0x0001;
        const STATIC    = 0x0002;
        const BURNING   = 0x0004;
        const WET       = 0x0008;
        const HOT       = 0x0010;
        const ACTIVE    = 0x0020;
        const CORRODING = 0x0040;
        const FROZEN    = 0x0080;
    }
}

/// 4-directional neighbour offsets.
pub(crate) const NEIGHBOR4: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// 8-directional neighbour offsets.
pub(crate) const NEIGHBOR8: [(i32, i32); 8] =
    [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

/// The mutable grid, stored as parallel arrays keyed by `y * width + x`.
///
/// Out-of-bounds reads yield `Empty`; movement treats out-of-bounds cells as
/// solid walls; out-of-bounds writes are silent no-ops.
pub struct World {
    width: i32,
    height: i32,
    chunks_x: i32,
    chunks_y: i32,

    pub materials: MaterialRegistry,

    pub(crate) mat: Vec<MaterialId>,
    /// Per-cell flags, readable by renderers.
    pub flags: Vec<CellFlags>,
    /// Stable per-grain colour variation seeds.
    pub color_seed: Vec<u32>,
    /// Temperature field in Celsius, double-buffered with `temp_next`.
    pub temp: Vec<f32>,
    pub(crate) temp_next: Vec<f32>,
    /// Reserved advisory field.
    pub pressure: Vec<f32>,
    /// Reserved advisory field; materials define their own densities.
    pub density: Vec<f32>,
    pub(crate) vel_x: Vec<Fixed8>,
    pub(crate) vel_y: Vec<Fixed8>,
    /// Ticks since spawn, saturating at 255 (fire, smoke, steam).
    pub lifetime: Vec<u8>,

    chunk_active: Vec<bool>,
    chunk_active_next: Vec<bool>,

    pub(crate) cells_updated: u32,
    active_chunks: u32,
}

impl World {
    pub fn new(width: i32, height: i32) -> Result<Self, CreateError> {
        if width <= 0 || height <= 0 {
            return Err(CreateError::BadDimensions { width, height });
        }

        let grid_size = (width as usize) * (height as usize);
        let chunks_x = (width + CHUNK_SIZE - 1) / CHUNK_SIZE;
        let chunks_y = (height + CHUNK_SIZE - 1) / CHUNK_SIZE;
        let chunk_count = (chunks_x as usize) * (chunks_y as usize);

        // Fixed seed so per-grain variation is stable across runs
        let mut seeder = FastRand::new(12345);
        let color_seed = (0..grid_size).map(|_| seeder.rand()).collect();

        info!(width, height, chunks_x, chunks_y, "world created");

        Ok(Self {
            width,
            height,
            chunks_x,
            chunks_y,
            materials: MaterialRegistry::new(),
            mat: vec![MaterialId::Empty; grid_size],
            flags: vec![CellFlags::empty(); grid_size],
            color_seed,
            temp: vec![AMBIENT_TEMP; grid_size],
            temp_next: vec![AMBIENT_TEMP; grid_size],
            pressure: vec![0.0; grid_size],
            density: vec![0.0; grid_size],
            vel_x: vec![0; grid_size],
            vel_y: vec![0; grid_size],
            lifetime: vec![0; grid_size],
            chunk_active: vec![false; chunk_count],
            chunk_active_next: vec![false; chunk_count],
            cells_updated: 0,
            active_chunks: 0,
        })
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    #[inline]
    pub fn index(&self, x: i32, y: i32) -> usize {
        debug_assert!(self.in_bounds(x, y));
        (y * self.width + x) as usize
    }

    /// Reset every cell to empty. Temperatures and colour seeds are kept.
    pub fn clear(&mut self) {
        self.mat.fill(MaterialId::Empty);
        self.flags.fill(CellFlags::empty());
        self.vel_x.fill(0);
        self.vel_y.fill(0);
        self.lifetime.fill(0);
    }

    // -------------------------------------------------------------------
    // Cell access
    // -------------------------------------------------------------------

    #[inline]
    pub fn get_mat(&self, x: i32, y: i32) -> MaterialId {
        if !self.in_bounds(x, y) {
            return MaterialId::Empty;
        }
        self.mat[self.index(x, y)]
    }

    /// Set the material at a cell, zeroing its velocity and activating the
    /// chunk neighbourhood. No-op out of bounds.
    pub fn set_mat(&mut self, x: i32, y: i32, mat: MaterialId) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.mat[idx] = mat;
        self.vel_x[idx] = 0;
        self.vel_y[idx] = 0;
        self.activate_chunk_at(x, y);
    }

    #[inline]
    pub fn get_flags(&self, x: i32, y: i32) -> CellFlags {
        if !self.in_bounds(x, y) {
            return CellFlags::empty();
        }
        self.flags[self.index(x, y)]
    }

    pub fn set_flags(&mut self, x: i32, y: i32, flags: CellFlags) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.flags[idx] = flags;
    }

    pub fn add_flag(&mut self, x: i32, y: i32, flag: CellFlags) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.flags[idx] |= flag;
    }

    pub fn remove_flag(&mut self, x: i32, y: i32, flag: CellFlags) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.flags[idx] &= !flag;
    }

    #[inline]
    pub fn has_flag(&self, x: i32, y: i32, flag: CellFlags) -> bool {
        self.get_flags(x, y).intersects(flag)
    }

    #[inline]
    pub(crate) fn was_updated(&self, x: i32, y: i32) -> bool {
        self.has_flag(x, y, CellFlags::UPDATED)
    }

    #[inline]
    pub(crate) fn mark_updated(&mut self, x: i32, y: i32) {
        self.add_flag(x, y, CellFlags::UPDATED);
    }

    #[inline]
    pub fn lifetime_at(&self, x: i32, y: i32) -> u8 {
        if !self.in_bounds(x, y) {
            return 0;
        }
        self.lifetime[self.index(x, y)]
    }

    pub(crate) fn set_lifetime(&mut self, x: i32, y: i32, value: u8) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.lifetime[idx] = value;
        self.activate_chunk_at(x, y);
    }

    /// Saturating lifetime increment; keeps the cell's chunk live.
    pub(crate) fn bump_lifetime(&mut self, x: i32, y: i32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.lifetime[idx] = self.lifetime[idx].saturating_add(1);
        self.activate_chunk_at(x, y);
    }

    #[inline]
    pub fn temp_at(&self, x: i32, y: i32) -> f32 {
        if !self.in_bounds(x, y) {
            return AMBIENT_TEMP;
        }
        self.temp[self.index(x, y)]
    }

    pub fn get_velocity(&self, x: i32, y: i32) -> Velocity {
        if !self.in_bounds(x, y) {
            return Velocity::default();
        }
        let idx = self.index(x, y);
        Velocity::from_fixed(self.vel_x[idx], self.vel_y[idx])
    }

    pub fn set_velocity(&mut self, x: i32, y: i32, vx: f32, vy: f32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.vel_x[idx] = fixed_from_float(vx);
        self.vel_y[idx] = fixed_from_float(vy);
        self.activate_chunk_at(x, y);
    }

    pub fn color_seed_at(&self, x: i32, y: i32) -> u32 {
        if !self.in_bounds(x, y) {
            return 0;
        }
        self.color_seed[self.index(x, y)]
    }

    pub(crate) fn set_color_seed(&mut self, x: i32, y: i32, seed: u32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let idx = self.index(x, y);
        self.color_seed[idx] = seed;
    }

    pub fn get_cell_color(&self, x: i32, y: i32) -> Color {
        if !self.in_bounds(x, y) {
            return Color::rgba(0, 0, 0, 255);
        }
        let idx = self.index(x, y);
        self.materials.color(self.mat[idx], self.color_seed[idx])
    }

    // -------------------------------------------------------------------
    // Cell state classifiers
    // -------------------------------------------------------------------

    /// State class at a cell; out-of-bounds reads as a solid wall.
    #[inline]
    pub fn cell_state(&self, x: i32, y: i32) -> MaterialState {
        if !self.in_bounds(x, y) {
            return MaterialState::Solid;
        }
        self.materials.state(self.mat[self.index(x, y)])
    }

    #[inline]
    pub fn is_empty(&self, x: i32, y: i32) -> bool {
        self.materials.is_empty(self.get_mat(x, y))
    }

    #[inline]
    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if !self.in_bounds(x, y) {
            return true; // Out of bounds treated as solid
        }
        self.materials.is_solid(self.get_mat(x, y))
    }

    /// Empty or gas: cells a splash or ember may occupy.
    #[inline]
    pub fn is_passable(&self, x: i32, y: i32) -> bool {
        matches!(self.cell_state(x, y), MaterialState::Empty | MaterialState::Gas)
    }

    /// Cells a powder may enter: empty, fluid or gas.
    #[inline]
    pub fn powder_can_enter(&self, x: i32, y: i32) -> bool {
        matches!(
            self.cell_state(x, y),
            MaterialState::Empty | MaterialState::Fluid | MaterialState::Gas
        )
    }

    /// Cells a fluid may enter: empty or gas.
    #[inline]
    pub fn fluid_can_enter(&self, x: i32, y: i32) -> bool {
        matches!(self.cell_state(x, y), MaterialState::Empty | MaterialState::Gas)
    }

    /// Cells a gas may enter: empty only.
    #[inline]
    pub fn gas_can_enter(&self, x: i32, y: i32) -> bool {
        self.cell_state(x, y) == MaterialState::Empty
    }

    /// In-bounds 8-neighbourhood of a cell.
    pub fn neighbors8(&self, x: i32, y: i32) -> SmallVec<[(i32, i32); 8]> {
        let mut out = SmallVec::new();
        for (dx, dy) in NEIGHBOR8 {
            let (nx, ny) = (x + dx, y + dy);
            if self.in_bounds(nx, ny) {
                out.push((nx, ny));
            }
        }
        out
    }

    // -------------------------------------------------------------------
    // Movement
    // -------------------------------------------------------------------

    /// Exchange material, colour seed, velocity and lifetime between two
    /// cells. Flags stay put. Both chunk neighbourhoods are activated.
    pub fn swap_cells(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        if !self.in_bounds(x1, y1) || !self.in_bounds(x2, y2) {
            return;
        }
        let a = self.index(x1, y1);
        let b = self.index(x2, y2);

        self.mat.swap(a, b);
        self.color_seed.swap(a, b);
        self.vel_x.swap(a, b);
        self.vel_y.swap(a, b);
        self.lifetime.swap(a, b);

        self.activate_chunk_at(x1, y1);
        self.activate_chunk_at(x2, y2);
    }

    /// Swap a cell into its target and mark both endpoints processed.
    pub(crate) fn move_cell(&mut self, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> bool {
        if !self.in_bounds(from_x, from_y) || !self.in_bounds(to_x, to_y) {
            return false;
        }
        self.swap_cells(from_x, from_y, to_x, to_y);
        self.mark_updated(to_x, to_y);
        self.mark_updated(from_x, from_y);
        self.cells_updated += 1;
        true
    }

    // -------------------------------------------------------------------
    // Chunk activation
    // -------------------------------------------------------------------

    #[inline]
    fn chunk_index(&self, chunk_x: i32, chunk_y: i32) -> Option<usize> {
        if chunk_x < 0 || chunk_x >= self.chunks_x || chunk_y < 0 || chunk_y >= self.chunks_y {
            return None;
        }
        Some((chunk_y * self.chunks_x + chunk_x) as usize)
    }

    #[inline]
    pub fn chunks_x(&self) -> i32 {
        self.chunks_x
    }

    #[inline]
    pub fn chunks_y(&self) -> i32 {
        self.chunks_y
    }

    /// Mark a chunk for processing next tick.
    pub fn activate_chunk(&mut self, chunk_x: i32, chunk_y: i32) {
        if let Some(idx) = self.chunk_index(chunk_x, chunk_y) {
            self.chunk_active_next[idx] = true;
        }
    }

    /// Activate the chunk containing a cell and all 8 neighbouring chunks,
    /// so movement across chunk borders is never missed.
    pub fn activate_chunk_at(&mut self, x: i32, y: i32) {
        if !self.in_bounds(x, y) {
            return;
        }
        let chunk_x = x / CHUNK_SIZE;
        let chunk_y = y / CHUNK_SIZE;
        for dy in -1..=1 {
            for dx in -1..=1 {
                self.activate_chunk(chunk_x + dx, chunk_y + dy);
            }
        }
    }

    #[inline]
    pub fn is_chunk_active(&self, chunk_x: i32, chunk_y: i32) -> bool {
        match self.chunk_index(chunk_x, chunk_y) {
            Some(idx) => self.chunk_active[idx],
            None => false,
        }
    }

    /// Mark every chunk for processing next tick.
    pub fn activate_all(&mut self) {
        self.chunk_active_next.fill(true);
    }

    /// Promote next-tick activations to the live bitmap, recount, and reset
    /// the write bitmap for the coming tick.
    pub fn update_chunk_activation(&mut self) {
        std::mem::swap(&mut self.chunk_active, &mut self.chunk_active_next);
        self.active_chunks = self.chunk_active.iter().filter(|&&a| a).count() as u32;
        self.chunk_active_next.fill(false);
    }

    #[inline]
    pub fn active_chunks(&self) -> u32 {
        self.active_chunks
    }

    /// Exchange the temperature buffers at the end of the thermal pass.
    pub(crate) fn swap_temp_buffers(&mut self) {
        std::mem::swap(&mut self.temp, &mut self.temp_next);
    }

    /// Clear the `UPDATED` bit across the whole grid.
    pub fn clear_tick_flags(&mut self) {
        for flags in self.flags.iter_mut() {
            flags.remove(CellFlags::UPDATED);
        }
    }

    #[inline]
    pub fn cells_updated(&self) -> u32 {
        self.cells_updated
    }

    // -------------------------------------------------------------------
    // Painting
    // -------------------------------------------------------------------

    /// Paint a filled disc of material.
    pub fn paint_circle(&mut self, cx: i32, cy: i32, radius: i32, mat: MaterialId) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.set_mat(cx + dx, cy + dy, mat);
                }
            }
        }
    }

    /// Paint a thick line using Bresenham traversal with a disc brush.
    pub fn paint_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, radius: i32, mat: MaterialId) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        let (mut x, mut y) = (x0, y0);

        loop {
            self.paint_circle(x, y, radius, mat);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Count cells holding a given material, for telemetry and tests.
    pub fn count_material(&self, mat: MaterialId) -> usize {
        self.mat.iter().filter(|&&m| m == mat).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::fixed_to_float;

    fn world() -> World {
        World::new(96, 96).unwrap()
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(World::new(0, 10).is_err());
        assert!(World::new(10, -1).is_err());
        assert!(World::new(1, 1).is_ok());
    }

    #[test]
    fn out_of_bounds_reads_are_empty() {
        let w = world();
        assert_eq!(w.get_mat(-1, 0), MaterialId::Empty);
        assert_eq!(w.get_mat(0, 96), MaterialId::Empty);
        assert_eq!(w.get_flags(-1, -1), CellFlags::empty());
        assert_eq!(w.temp_at(-5, 2), AMBIENT_TEMP);
        // Movement sees a wall instead
        assert_eq!(w.cell_state(-1, 0), MaterialState::Solid);
        assert!(w.is_solid(96, 0));
        assert!(!w.powder_can_enter(0, 96));
        assert!(!w.gas_can_enter(0, -1));
    }

    #[test]
    fn out_of_bounds_writes_are_noops() {
        let mut w = world();
        w.set_mat(-1, 0, MaterialId::Sand);
        w.set_mat(96, 96, MaterialId::Sand);
        w.add_flag(-1, 0, CellFlags::BURNING);
        assert_eq!(w.count_material(MaterialId::Sand), 0);
    }

    #[test]
    fn set_mat_zeroes_velocity() {
        let mut w = world();
        w.set_velocity(5, 5, 1.5, -0.5);
        w.set_mat(5, 5, MaterialId::Sand);
        let v = w.get_velocity(5, 5);
        assert_eq!(v.vx, 0.0);
        assert_eq!(v.vy, 0.0);
    }

    #[test]
    fn flag_add_remove_round_trips() {
        let mut w = world();
        let before = w.get_flags(3, 3);
        w.add_flag(3, 3, CellFlags::FROZEN);
        assert!(w.has_flag(3, 3, CellFlags::FROZEN));
        w.remove_flag(3, 3, CellFlags::FROZEN);
        assert_eq!(w.get_flags(3, 3), before);
    }

    #[test]
    fn swap_cells_twice_restores_both() {
        let mut w = world();
        w.set_mat(2, 2, MaterialId::Sand);
        w.set_mat(4, 4, MaterialId::Water);
        w.set_velocity(2, 2, 0.5, 1.0);
        let seed_a = w.color_seed_at(2, 2);
        let seed_b = w.color_seed_at(4, 4);

        w.swap_cells(2, 2, 4, 4);
        assert_eq!(w.get_mat(2, 2), MaterialId::Water);
        assert_eq!(w.get_mat(4, 4), MaterialId::Sand);
        assert_eq!(w.color_seed_at(4, 4), seed_a);
        assert_eq!(fixed_to_float(w.vel_x[w.index(4, 4)]), 0.5);

        w.swap_cells(2, 2, 4, 4);
        assert_eq!(w.get_mat(2, 2), MaterialId::Sand);
        assert_eq!(w.get_mat(4, 4), MaterialId::Water);
        assert_eq!(w.color_seed_at(2, 2), seed_a);
        assert_eq!(w.color_seed_at(4, 4), seed_b);
    }

    #[test]
    fn swap_does_not_move_flags() {
        let mut w = world();
        w.set_mat(1, 1, MaterialId::Wood);
        w.add_flag(1, 1, CellFlags::BURNING);
        w.swap_cells(1, 1, 2, 1);
        assert!(w.has_flag(1, 1, CellFlags::BURNING));
        assert!(!w.has_flag(2, 1, CellFlags::BURNING));
    }

    #[test]
    fn mutation_activates_full_chunk_neighbourhood() {
        let mut w = world();
        // Cell in chunk (1, 1)
        w.set_mat(40, 40, MaterialId::Sand);
        w.update_chunk_activation();
        for cy in 0..=2 {
            for cx in 0..=2 {
                assert!(w.is_chunk_active(cx, cy), "chunk ({cx},{cy}) inactive");
            }
        }
        assert_eq!(w.active_chunks(), 9);
    }

    #[test]
    fn chunk_activation_decays_without_mutations() {
        let mut w = world();
        w.set_mat(40, 40, MaterialId::Stone);
        w.update_chunk_activation();
        assert!(w.is_chunk_active(1, 1));
        // No further writes: the next promotion empties the live set
        w.update_chunk_activation();
        assert!(!w.is_chunk_active(1, 1));
        assert_eq!(w.active_chunks(), 0);
    }

    #[test]
    fn clear_tick_flags_only_touches_updated() {
        let mut w = world();
        w.add_flag(7, 7, CellFlags::UPDATED | CellFlags::BURNING);
        w.clear_tick_flags();
        assert!(!w.has_flag(7, 7, CellFlags::UPDATED));
        assert!(w.has_flag(7, 7, CellFlags::BURNING));
    }

    #[test]
    fn paint_circle_then_erase_is_identity() {
        let mut w = world();
        let before: Vec<MaterialId> = w.mat.clone();
        w.paint_circle(48, 48, 5, MaterialId::Stone);
        assert!(w.count_material(MaterialId::Stone) > 0);
        w.paint_circle(48, 48, 5, MaterialId::Empty);
        assert_eq!(w.mat, before);
    }

    #[test]
    fn paint_circle_clips_at_borders() {
        let mut w = world();
        w.paint_circle(0, 0, 4, MaterialId::Sand);
        assert!(w.count_material(MaterialId::Sand) > 0);
        // Nothing outside the grid, nothing panicked
        w.paint_circle(-10, -10, 3, MaterialId::Sand);
    }

    #[test]
    fn paint_line_connects_endpoints() {
        let mut w = world();
        w.paint_line(10, 10, 30, 20, 0, MaterialId::Stone);
        assert_eq!(w.get_mat(10, 10), MaterialId::Stone);
        assert_eq!(w.get_mat(30, 20), MaterialId::Stone);
        assert!(w.count_material(MaterialId::Stone) >= 21);
    }

    #[test]
    fn neighbors8_filters_out_of_bounds() {
        let w = world();
        assert_eq!(w.neighbors8(0, 0).len(), 3);
        assert_eq!(w.neighbors8(0, 5).len(), 5);
        assert_eq!(w.neighbors8(5, 5).len(), 8);
        assert_eq!(w.neighbors8(95, 95).len(), 3);
    }

    #[test]
    fn cell_color_follows_seed() {
        let mut w = world();
        w.set_mat(8, 8, MaterialId::Sand);
        let c1 = w.get_cell_color(8, 8);
        assert_eq!(c1, w.materials.color(MaterialId::Sand, w.color_seed_at(8, 8)));
        assert_eq!(w.get_cell_color(-1, 0), Color::rgba(0, 0, 0, 255));
    }

    #[test]
    fn clear_keeps_temperature_field() {
        let mut w = world();
        w.set_mat(5, 5, MaterialId::Sand);
        let idx = w.index(5, 5);
        w.temp[idx] = 300.0;
        w.clear();
        assert_eq!(w.count_material(MaterialId::Sand), 0);
        assert_eq!(w.temp_at(5, 5), 300.0);
    }
}
