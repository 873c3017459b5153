//! The simulation solver: substep scheduling, gravity, boundary constraint,
//! and collision dispatch.
//!
//! Each `update(dt)` runs a fixed number of substeps, and every substep
//! executes the same sequence: accumulate forces, integrate, constrain to
//! the container, rebuild the cell table, resolve collisions. The cell
//! table is never incrementally maintained; it is recomputed from current
//! positions every substep.

use glam::Vec2;

use crate::backend::{CollisionBackend, CollisionFrame};
use crate::collision::collide_pair;
use crate::error::SolverError;
use crate::particle::{Particle, ParticleHandle, ParticleStore};
use crate::spatial::{CellTable, GridGeometry};

/// Default downward gravity, in distance units per second squared.
pub const GRAVITY: Vec2 = Vec2::new(0.0, -2000.0);

/// Energy retained along an axis after a wall bounce.
pub const WALL_RESTITUTION: f32 = 0.25;

/// Default number of substeps per `update` call.
pub const DEFAULT_SUB_STEPS: u32 = 8;

/// A 2D particle simulation under gravity and box confinement.
///
/// Created once per simulation; lives for the run. Configure with the
/// builder-style `with_*` methods before the first update:
///
/// ```no_run
/// use verlet2d::prelude::*;
///
/// let mut solver = Solver::new(Vec2::new(800.0, 600.0), 10.0).unwrap();
/// solver.spawn_particle(Vec2::new(400.0, 500.0), 10.0);
///
/// loop {
///     solver.update(1.0 / 60.0);
/// }
/// ```
pub struct Solver {
    screen_size: Vec2,
    sub_steps: u32,
    gravity: Vec2,
    geom: GridGeometry,
    particles: ParticleStore,
    table: CellTable,
    backend: Option<Box<dyn CollisionBackend>>,
    // Snapshot buffers reused across substeps.
    scratch_positions: Vec<Vec2>,
    scratch_radii: Vec<f32>,
}

impl Solver {
    /// Create a solver for a `screen_size` container, sizing grid cells to
    /// the largest particle that will ever be spawned.
    ///
    /// Fails if the container has degenerate area or the radius cannot
    /// produce a valid grid. Spawning particles larger than
    /// `largest_particle_radius` afterwards breaks the one-cell overlap
    /// assumption and collisions between them may be missed.
    pub fn new(screen_size: Vec2, largest_particle_radius: f32) -> Result<Self, SolverError> {
        let geom = GridGeometry::new(screen_size, largest_particle_radius)?;

        Ok(Self {
            screen_size,
            sub_steps: DEFAULT_SUB_STEPS,
            gravity: GRAVITY,
            geom,
            particles: ParticleStore::new(),
            table: CellTable::new(),
            backend: None,
            scratch_positions: Vec::new(),
            scratch_radii: Vec::new(),
        })
    }

    /// Set the number of substeps per update. More substeps converge dense
    /// overlapping clusters faster, at linear cost.
    pub fn with_sub_steps(mut self, sub_steps: u32) -> Self {
        assert!(sub_steps > 0, "sub_steps must be at least 1");
        self.sub_steps = sub_steps;
        self
    }

    /// Override the gravity vector (default `(0, -2000)`, y-up).
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Offload the bulk collision pass to a compute backend.
    pub fn with_backend<B: CollisionBackend + 'static>(mut self, backend: B) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Attach or replace the compute backend after construction.
    pub fn set_backend<B: CollisionBackend + 'static>(&mut self, backend: B) {
        self.backend = Some(Box::new(backend));
    }

    /// Spawn a particle at rest. Must not be called during an update.
    ///
    /// `radius` must be positive and no larger than the
    /// `largest_particle_radius` the solver was constructed with.
    pub fn spawn_particle(&mut self, pos: Vec2, radius: f32) -> ParticleHandle {
        debug_assert!(
            2.0 * radius <= self.geom.cell_width,
            "particle radius {} exceeds the grid's largest supported radius",
            radius
        );
        self.particles.spawn(pos, radius)
    }

    /// Advance the whole system by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        let step_dt = dt / self.sub_steps as f32;

        for _ in 0..self.sub_steps {
            self.accumulate_forces();
            self.integrate(step_dt);
            self.constrain_to_box(self.screen_size, self.screen_size * 0.5);
            self.build_cell_table();
            self.resolve_collisions();
        }
    }

    #[inline]
    pub fn screen_size(&self) -> Vec2 {
        self.screen_size
    }

    #[inline]
    pub fn sub_steps(&self) -> u32 {
        self.sub_steps
    }

    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    #[inline]
    pub fn grid(&self) -> &GridGeometry {
        &self.geom
    }

    #[inline]
    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    #[inline]
    pub fn particles_mut(&mut self) -> &mut ParticleStore {
        &mut self.particles
    }

    #[inline]
    pub fn particle(&self, handle: ParticleHandle) -> &Particle {
        self.particles.get(handle)
    }

    #[inline]
    pub fn particle_mut(&mut self, handle: ParticleHandle) -> &mut Particle {
        self.particles.get_mut(handle)
    }

    /// Reset every force accumulator and apply gravity.
    ///
    /// The accumulator is rebuilt from scratch each substep; without the
    /// reset, re-adding gravity every substep would grow forces without
    /// bound.
    fn accumulate_forces(&mut self) {
        for p in self.particles.iter_mut() {
            p.force = Vec2::ZERO;
            p.force += self.gravity;
        }
    }

    fn integrate(&mut self, dt: f32) {
        for p in self.particles.iter_mut() {
            p.integrate(dt);
        }
    }

    /// Clamp particles into the box, reflecting by twice the penetration
    /// and damping the implicit velocity along the violated axis by
    /// [`WALL_RESTITUTION`]. The other axis keeps its velocity untouched.
    ///
    /// Per axis the right/top check runs before the left/bottom check, and
    /// only one of the two can fire per substep. A particle wider than the
    /// box therefore settles on whichever wall its left/bottom check puts
    /// it at: last applied wins.
    fn constrain_to_box(&mut self, box_size: Vec2, box_center: Vec2) {
        let half = box_size * 0.5;
        let box_left = box_center.x - half.x;
        let box_right = box_center.x + half.x;
        let box_top = box_center.y + half.y;
        let box_bottom = box_center.y - half.y;

        for p in self.particles.iter_mut() {
            if p.pos.x + p.radius > box_right {
                let displacement_x = p.pos.x - p.prev_pos.x;
                p.pos.x -= 2.0 * (p.pos.x + p.radius - box_right);
                p.prev_pos.x = p.pos.x + WALL_RESTITUTION * displacement_x;
            } else if p.pos.x - p.radius < box_left {
                let displacement_x = p.prev_pos.x - p.pos.x;
                p.pos.x += 2.0 * (box_left - (p.pos.x - p.radius));
                p.prev_pos.x = p.pos.x - WALL_RESTITUTION * displacement_x;
            }

            if p.pos.y + p.radius > box_top {
                let displacement_y = p.pos.y - p.prev_pos.y;
                p.pos.y -= 2.0 * (p.pos.y + p.radius - box_top);
                p.prev_pos.y = p.pos.y + WALL_RESTITUTION * displacement_y;
            } else if p.pos.y - p.radius < box_bottom {
                let displacement_y = p.prev_pos.y - p.pos.y;
                p.pos.y += 2.0 * (box_bottom - (p.pos.y - p.radius));
                p.prev_pos.y = p.pos.y - WALL_RESTITUTION * displacement_y;
            }
        }
    }

    fn build_cell_table(&mut self) {
        self.scratch_positions.clear();
        self.scratch_positions
            .extend(self.particles.iter().map(|p| p.pos));
        self.table.build(&self.scratch_positions, &self.geom);
    }

    fn resolve_collisions(&mut self) {
        if self.backend.is_some() {
            self.resolve_with_backend();
        } else {
            self.resolve_in_place();
        }
    }

    /// Sequential same-cell pair sweep in grid traversal order.
    ///
    /// Positions mutate in place, so later pairs in the same substep see
    /// already-corrected earlier pairs. Pairs straddling a cell boundary
    /// are not checked this substep; the rebuild next substep catches them.
    fn resolve_in_place(&mut self) {
        let particles = self.particles.as_mut_slice();

        for h in 0..self.geom.cell_count() {
            let cell = self.table.cell(h);
            for a in 0..cell.len() {
                for b in (a + 1)..cell.len() {
                    collide_pair(particles, cell[a] as usize, cell[b] as usize);
                }
            }
        }
    }

    /// Hand the snapshot to the backend and write corrected positions back.
    ///
    /// `scratch_positions` already holds the snapshot the cell table was
    /// built from. The backend call blocks until results are available.
    fn resolve_with_backend(&mut self) {
        self.scratch_radii.clear();
        self.scratch_radii
            .extend(self.particles.iter().map(|p| p.radius));

        let backend = self
            .backend
            .as_mut()
            .expect("resolve_with_backend called without a backend");

        backend.resolve(CollisionFrame {
            positions: &mut self.scratch_positions,
            radii: &self.scratch_radii,
            starts: self.table.starts(),
            grouped: self.table.grouped(),
            geom: self.geom,
        });

        for (p, pos) in self.particles.iter_mut().zip(&self.scratch_positions) {
            p.pos = *pos;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_rejects_degenerate_config() {
        assert!(Solver::new(Vec2::new(0.0, 600.0), 10.0).is_err());
        assert!(Solver::new(Vec2::new(800.0, 600.0), -2.0).is_err());
        assert!(Solver::new(Vec2::new(f32::INFINITY, 600.0), 10.0).is_err());
    }

    #[test]
    fn test_defaults() {
        let solver = Solver::new(Vec2::new(800.0, 600.0), 10.0).unwrap();
        assert_eq!(solver.sub_steps(), 8);
        assert_eq!(solver.gravity(), Vec2::new(0.0, -2000.0));
        assert_eq!(solver.grid().cell_width, 20.0);
    }

    #[test]
    fn test_builder_overrides() {
        let solver = Solver::new(Vec2::new(800.0, 600.0), 10.0)
            .unwrap()
            .with_sub_steps(4)
            .with_gravity(Vec2::ZERO);
        assert_eq!(solver.sub_steps(), 4);
        assert_eq!(solver.gravity(), Vec2::ZERO);
    }

    #[test]
    fn test_falling_particle_moves_down_without_drift() {
        let mut solver = Solver::new(Vec2::new(800.0, 600.0), 10.0).unwrap();
        let h = solver.spawn_particle(Vec2::new(400.0, 590.0), 10.0);

        solver.update(1.0 / 60.0);

        let p = solver.particle(h);
        assert!(p.pos.y < 590.0, "gravity must pull the particle down");
        assert!(
            (p.pos.x - p.prev_pos.x).abs() < 1e-6,
            "no horizontal drift without horizontal force"
        );
        assert_eq!(p.pos.x, 400.0);
    }

    #[test]
    fn test_force_accumulator_does_not_grow() {
        let mut solver = Solver::new(Vec2::new(800.0, 600.0), 10.0).unwrap();
        let h = solver.spawn_particle(Vec2::new(400.0, 300.0), 10.0);

        solver.update(1.0 / 60.0);
        let force_after_one = solver.particle(h).force;
        solver.update(1.0 / 60.0);

        // Gravity is re-applied from zero every substep, never stacked.
        assert_eq!(solver.particle(h).force, force_after_one);
        assert_eq!(force_after_one, GRAVITY);
    }

    #[test]
    fn test_wall_bounce_keeps_other_axis_velocity() {
        let mut solver = Solver::new(Vec2::new(800.0, 600.0), 10.0)
            .unwrap()
            .with_gravity(Vec2::ZERO)
            .with_sub_steps(1);
        let h = solver.spawn_particle(Vec2::new(788.0, 300.0), 10.0);
        solver
            .particle_mut(h)
            .set_velocity(Vec2::new(600.0, 120.0), 1.0 / 60.0);

        solver.update(1.0 / 60.0);

        let p = solver.particle(h);
        // Reflected off the right wall with damped x velocity.
        assert!(p.pos.x + p.radius <= 800.0 + 1e-3);
        assert!(p.velocity().x < 0.0);
        // The y component of the implicit velocity is preserved.
        assert!((p.velocity().y - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_update_with_no_particles_is_harmless() {
        let mut solver = Solver::new(Vec2::new(800.0, 600.0), 10.0).unwrap();
        solver.update(1.0 / 60.0);
        assert!(solver.particles().is_empty());
    }
}
