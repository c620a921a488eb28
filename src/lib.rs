//! Deterministic falling-sand pixel-cell physics engine.
//!
//! A fixed-timestep cellular simulation over a dense grid of material
//! cells: powders pile, fluids flow and level out, fire burns and spreads,
//! gases rise, acid corrodes, and heat diffuses and drives phase changes.
//! Given the same initial grid and RNG seed, trajectories are bit-exact.

use thiserror::Error;

pub mod acid;
pub mod behavior;
pub mod constants;
pub mod fire;
pub mod fixed;
pub mod fluid;
pub mod gas;
pub mod grid_iter;
pub mod materials;
pub mod physics;
pub mod powder;
pub mod simulation;
pub mod thermal;
pub mod world;

pub use materials::{Color, Material, MaterialId, MaterialRegistry, MaterialState};
pub use physics::Velocity;
pub use simulation::Simulation;
pub use world::{CellFlags, World};

/// Construction failures. Everything past construction is total: bad
/// coordinates no-op and bad material ids read as empty.
#[derive(Debug, Error, PartialEq)]
pub enum CreateError {
    #[error("grid dimensions must be positive, got {width}x{height}")]
    BadDimensions { width: i32, height: i32 },
    #[error("tick rate must be positive, got {0}")]
    BadTickRate(f64),
}
