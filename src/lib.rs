//! # verlet2d
//!
//! 2D particle physics under gravity and box confinement, advanced with
//! sub-stepped Verlet integration. Collision detection groups particles
//! into uniform grid cells with a counting sort and resolves overlapping
//! same-cell pairs by positional correction, keeping the whole pipeline
//! sub-quadratic in particle count.
//!
//! ## Quick Start
//!
//! ```no_run
//! use verlet2d::prelude::*;
//!
//! // 800x600 container, largest particle radius 10.
//! let mut solver = Solver::new(Vec2::new(800.0, 600.0), 10.0).unwrap();
//!
//! let ball = solver.spawn_particle(Vec2::new(400.0, 500.0), 10.0);
//! solver.particle_mut(ball).set_velocity(Vec2::new(120.0, 0.0), 1.0 / 60.0 / 8.0);
//!
//! loop {
//!     solver.update(1.0 / 60.0);
//! }
//! ```
//!
//! ## Pipeline
//!
//! Every `update(dt)` runs 8 substeps (configurable), each of which:
//!
//! 1. resets force accumulators and applies gravity,
//! 2. integrates positions (Verlet, implicit velocity),
//! 3. constrains particles to the container with damped wall bounces,
//! 4. rebuilds the spatial hash from current positions,
//! 5. resolves overlapping pairs cell by cell.
//!
//! ## GPU Offload
//!
//! Step 5 can be delegated to a [`CollisionBackend`]. The built-in
//! [`gpu::GpuCollider`] runs the resolution pass as a wgpu compute shader;
//! [`LocalBackend`] is the behaviorally identical CPU fallback:
//!
//! ```no_run
//! use verlet2d::prelude::*;
//! use verlet2d::gpu::GpuCollider;
//!
//! let solver = Solver::new(Vec2::new(800.0, 600.0), 10.0)
//!     .unwrap()
//!     .with_backend(GpuCollider::new().unwrap());
//! ```
//!
//! Both backends resolve each particle from a snapshot of the substep's
//! positions, so swapping them changes performance and nothing else. The
//! default (no backend) resolves pairs sequentially in place, which is the
//! reference behavior.

mod backend;
pub mod clock;
pub mod collision;
mod error;
pub mod gpu;
mod particle;
mod solver;
pub mod spatial;

pub use backend::{CollisionBackend, CollisionFrame, LocalBackend};
pub use error::{GpuError, SolverError};
pub use glam::Vec2;
pub use particle::{Particle, ParticleHandle, ParticleStore};
pub use solver::{Solver, DEFAULT_SUB_STEPS, GRAVITY, WALL_RESTITUTION};
pub use spatial::{CellTable, GridGeometry};

/// Convenient re-exports for common usage.
///
/// ```no_run
/// use verlet2d::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::{CollisionBackend, CollisionFrame, LocalBackend};
    pub use crate::clock::FrameClock;
    pub use crate::error::{GpuError, SolverError};
    pub use crate::particle::{Particle, ParticleHandle, ParticleStore};
    pub use crate::solver::Solver;
    pub use crate::spatial::{CellTable, GridGeometry};
    pub use crate::Vec2;
}
