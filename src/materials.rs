use serde::{Deserialize, Serialize};

use crate::constants::{hash32, GRAVITY_ACCEL};
use crate::fixed::{fixed_from_float, Fixed8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MaterialId {
    Empty = 0,
    Sand = 1,
    Stone = 2,
    Water = 3,
    Wood = 4,
    Fire = 5,
    Smoke = 6,
    Soil = 7,
    Ice = 8,
    Steam = 9,
    Ash = 10,
    Acid = 11,
}

/// Total number of materials.
pub const MAT_COUNT: usize = 12;

impl MaterialId {
    /// Decode a raw id; unknown values degrade to `Empty`.
    pub fn from_u8(value: u8) -> MaterialId {
        match value {
            1 => MaterialId::Sand,
            2 => MaterialId::Stone,
            3 => MaterialId::Water,
            4 => MaterialId::Wood,
            5 => MaterialId::Fire,
            6 => MaterialId::Smoke,
            7 => MaterialId::Soil,
            8 => MaterialId::Ice,
            9 => MaterialId::Steam,
            10 => MaterialId::Ash,
            11 => MaterialId::Acid,
            _ => MaterialId::Empty,
        }
    }

    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialState {
    Empty,
    Solid,
    Powder,
    Fluid,
    Gas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Static per-material properties. Densities are advisory kg/m^3 figures,
/// velocities are cells/tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: &'static str,
    pub state: MaterialState,
    pub base_color: Color,
    pub color_variation: i32,
    pub density: f32,
    pub friction: f32,
    pub cohesion: f32,
    pub gravity_scale: f32,
    pub drag_coeff: f32,
    pub terminal_velocity: f32,
    pub flow_rate: f32,
    pub settle_probability: f32,
    pub slide_bias: f32,
    pub conductivity: f32,
    pub heat_capacity: f32,
    pub ignition_temp: f32,
    pub melting_temp: f32,
    pub boiling_temp: f32,
    // Precomputed fixed-point mirrors, filled in by the registry
    pub gravity_step_fixed: Fixed8,
    pub drag_factor_fixed: Fixed8,
    pub terminal_velocity_fixed: Fixed8,
}

/// Registry of the full material roster plus derived lookup tables.
pub struct MaterialRegistry {
    props: [Material; MAT_COUNT],
    state: [MaterialState; MAT_COUNT],
    is_powder: [bool; MAT_COUNT],
    is_fluid: [bool; MAT_COUNT],
    is_solid: [bool; MAT_COUNT],
    is_empty: [bool; MAT_COUNT],
    is_gas: [bool; MAT_COUNT],
}

impl MaterialRegistry {
    pub fn new() -> Self {
        let mut props = material_table();

        for mat in props.iter_mut() {
            mat.gravity_step_fixed = fixed_from_float(GRAVITY_ACCEL * mat.gravity_scale);
            mat.drag_factor_fixed = fixed_from_float(1.0 - mat.drag_coeff);
            mat.terminal_velocity_fixed = fixed_from_float(mat.terminal_velocity);
        }

        let mut state = [MaterialState::Empty; MAT_COUNT];
        let mut is_powder = [false; MAT_COUNT];
        let mut is_fluid = [false; MAT_COUNT];
        let mut is_solid = [false; MAT_COUNT];
        let mut is_empty = [false; MAT_COUNT];
        let mut is_gas = [false; MAT_COUNT];

        for (i, mat) in props.iter().enumerate() {
            state[i] = mat.state;
            is_powder[i] = mat.state == MaterialState::Powder;
            is_fluid[i] = mat.state == MaterialState::Fluid;
            is_solid[i] = mat.state == MaterialState::Solid;
            is_empty[i] = mat.state == MaterialState::Empty;
            is_gas[i] = mat.state == MaterialState::Gas;
        }

        Self { props, state, is_powder, is_fluid, is_solid, is_empty, is_gas }
    }

    #[inline]
    pub fn get(&self, id: MaterialId) -> &Material {
        &self.props[id.index()]
    }

    #[inline]
    pub fn state(&self, id: MaterialId) -> MaterialState {
        self.state[id.index()]
    }

    #[inline]
    pub fn is_powder(&self, id: MaterialId) -> bool {
        self.is_powder[id.index()]
    }

    #[inline]
    pub fn is_fluid(&self, id: MaterialId) -> bool {
        self.is_fluid[id.index()]
    }

    #[inline]
    pub fn is_solid(&self, id: MaterialId) -> bool {
        self.is_solid[id.index()]
    }

    #[inline]
    pub fn is_empty(&self, id: MaterialId) -> bool {
        self.is_empty[id.index()]
    }

    #[inline]
    pub fn is_gas(&self, id: MaterialId) -> bool {
        self.is_gas[id.index()]
    }

    /// Base colour perturbed by a stable hash of the per-cell seed.
    pub fn color(&self, id: MaterialId, seed: u32) -> Color {
        let mat = self.get(id);
        let mut c = mat.base_color;

        if mat.color_variation > 0 && seed != 0 {
            let h = hash32(seed);
            let span = (mat.color_variation * 2 + 1) as u32;
            let var = (h % span) as i32 - mat.color_variation;

            c.r = (c.r as i32 + var).clamp(0, 255) as u8;
            c.g = (c.g as i32 + var).clamp(0, 255) as u8;
            c.b = (c.b as i32 + var).clamp(0, 255) as u8;
        }

        c
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A material entry before the fixed-point mirrors are filled in.
#[allow(clippy::too_many_arguments)]
fn material(
    id: MaterialId,
    name: &'static str,
    state: MaterialState,
    base_color: Color,
    color_variation: i32,
    density: f32,
    friction: f32,
    cohesion: f32,
    gravity_scale: f32,
    drag_coeff: f32,
    terminal_velocity: f32,
    flow_rate: f32,
    settle_probability: f32,
    conductivity: f32,
    heat_capacity: f32,
    ignition_temp: f32,
    melting_temp: f32,
    boiling_temp: f32,
) -> Material {
    Material {
        id,
        name,
        state,
        base_color,
        color_variation,
        density,
        friction,
        cohesion,
        gravity_scale,
        drag_coeff,
        terminal_velocity,
        flow_rate,
        settle_probability,
        slide_bias: 0.5,
        conductivity,
        heat_capacity,
        ignition_temp,
        melting_temp,
        boiling_temp,
        gravity_step_fixed: 0,
        drag_factor_fixed: 0,
        terminal_velocity_fixed: 0,
    }
}

#[rustfmt::skip]
fn material_table() -> [Material; MAT_COUNT] {
    use MaterialId as M;
    use MaterialState as S;
    [
        // id, name, state, color, var, density, friction, cohesion, grav, drag, terminal, flow, settle, cond, heat_cap, ignition, melt, boil
        material(M::Empty, "Empty", S::Empty, Color::rgba(0, 0, 0, 255),       0,  1.225,  0.0,  0.0,   0.0, 1.0,  0.0, 0.0, 0.0,  0.0,  0.0,  0.0,    0.0,    0.0),
        material(M::Sand,  "Sand",  S::Powder, Color::rgba(220, 190, 130, 255), 25, 1600.0, 0.7,  0.15,  1.2, 0.25, 3.5, 0.0, 0.25, 0.3,  0.8,  9999.0, 1700.0, 9999.0),
        material(M::Stone, "Stone", S::Solid, Color::rgba(80, 80, 90, 255),    20, 2600.0, 0.9,  1.0,   0.0, 1.0,  0.0, 0.0, 1.0,  0.8,  0.9,  9999.0, 1200.0, 9999.0),
        material(M::Water, "Water", S::Fluid, Color::rgba(30, 100, 200, 200),  15, 1000.0, 0.0,  0.0,   1.0, 0.1,  4.0, 0.6, 0.0,  0.6,  4.2,  9999.0, 0.0,    100.0),
        material(M::Wood,  "Wood",  S::Solid, Color::rgba(139, 90, 43, 255),   25, 600.0,  0.8,  1.0,   0.0, 1.0,  0.0, 0.0, 1.0,  0.15, 1.7,  300.0,  9999.0, 9999.0),
        material(M::Fire,  "Fire",  S::Gas,   Color::rgba(255, 100, 20, 255),  50, 0.4,    0.0,  0.0,  -0.3, 0.2,  2.0, 0.7, 0.0,  0.1,  0.1,  0.0,    9999.0, 9999.0),
        material(M::Smoke, "Smoke", S::Gas,   Color::rgba(60, 60, 60, 150),    20, 0.6,    0.0,  0.0,  -0.1, 0.8,  1.2, 0.5, 0.0,  0.02, 0.1,  9999.0, 9999.0, 9999.0),
        material(M::Soil,  "Soil",  S::Powder, Color::rgba(100, 70, 40, 255),  20, 1800.0, 0.85, 0.4,   1.1, 0.3,  2.5, 0.0, 0.4,  0.5,  1.0,  9999.0, 9999.0, 9999.0),
        material(M::Ice,   "Ice",   S::Solid, Color::rgba(180, 220, 255, 220), 15, 917.0,  0.1,  1.0,   0.0, 1.0,  0.0, 0.0, 1.0,  2.2,  2.1,  9999.0, 0.0,    100.0),
        material(M::Steam, "Steam", S::Gas,   Color::rgba(220, 220, 230, 80),  10, 0.6,    0.0,  0.0,  -0.5, 0.5,  2.5, 0.6, 0.0,  0.02, 2.0,  9999.0, 0.0,    100.0),
        material(M::Ash,   "Ash",   S::Powder, Color::rgba(90, 90, 90, 255),   15, 500.0,  0.3,  0.05,  0.3, 0.7,  1.0, 0.0, 0.15, 0.1,  0.8,  9999.0, 9999.0, 9999.0),
        material(M::Acid,  "Acid",  S::Fluid, Color::rgba(100, 255, 50, 200),  20, 1100.0, 0.0,  0.0,   1.0, 0.15, 3.5, 0.7, 0.0,  0.5,  3.0,  9999.0, -20.0,  120.0),
    ]
}
