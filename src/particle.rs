//! Particle storage and Verlet integration.
//!
//! Particles are owned by a [`ParticleStore`] arena and referenced everywhere
//! else by stable integer handles. Velocity is never stored: it is implicit
//! in the distance between the current and previous position.

use glam::Vec2;

/// A circular particle integrated with position-only Verlet.
///
/// `force` is a per-substep accumulator; the solver rebuilds it from scratch
/// before every integration step, so its value is only meaningful between a
/// force-accumulation pass and the [`integrate`](Particle::integrate) that
/// consumes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// Current center position.
    pub pos: Vec2,
    /// Position one substep ago; encodes the implicit velocity.
    pub prev_pos: Vec2,
    /// Collision radius. Fixed at spawn time, always positive.
    pub radius: f32,
    /// Force accumulator, reset each substep. Mass is normalized to 1,
    /// so force doubles as acceleration.
    pub force: Vec2,
}

impl Particle {
    /// Create a particle at rest at `pos`.
    pub fn new(pos: Vec2, radius: f32) -> Self {
        debug_assert!(radius > 0.0, "particle radius must be positive");
        Self {
            pos,
            prev_pos: pos,
            radius,
            force: Vec2::ZERO,
        }
    }

    /// Implicit velocity in distance-per-substep units.
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.pos - self.prev_pos
    }

    /// Seed an initial velocity by back-dating `prev_pos`.
    ///
    /// `dt` must match the substep length the solver will integrate with,
    /// otherwise the effective speed is scaled by the mismatch.
    #[inline]
    pub fn set_velocity(&mut self, velocity: Vec2, dt: f32) {
        self.prev_pos = self.pos - velocity * dt;
    }

    /// Advance one Verlet step: `pos += (pos - prev_pos) + force * dt^2`.
    #[inline]
    pub fn integrate(&mut self, dt: f32) {
        let velocity = self.pos - self.prev_pos;
        self.prev_pos = self.pos;
        self.pos += velocity + self.force * (dt * dt);
    }
}

/// Stable handle into a [`ParticleStore`].
///
/// Handles are plain indices and remain valid for the life of the store:
/// particles are never removed, so indices never shift.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParticleHandle(pub(crate) u32);

impl ParticleHandle {
    /// The raw index this handle refers to.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Arena that owns every particle in a simulation.
///
/// Spawning is append-only; there is no deletion. All spawns must happen
/// between [`Solver::update`](crate::Solver::update) calls.
#[derive(Debug, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
        }
    }

    /// Append a new particle at rest and return its handle.
    pub fn spawn(&mut self, pos: Vec2, radius: f32) -> ParticleHandle {
        let handle = ParticleHandle(self.particles.len() as u32);
        self.particles.push(Particle::new(pos, radius));
        handle
    }

    #[inline]
    pub fn get(&self, handle: ParticleHandle) -> &Particle {
        &self.particles[handle.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, handle: ParticleHandle) -> &mut Particle {
        &mut self.particles[handle.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_starts_at_rest() {
        let mut store = ParticleStore::new();
        let h = store.spawn(Vec2::new(3.0, 4.0), 1.5);

        let p = store.get(h);
        assert_eq!(p.pos, p.prev_pos);
        assert_eq!(p.force, Vec2::ZERO);
        assert_eq!(p.radius, 1.5);
        assert_eq!(p.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_handles_are_stable_across_growth() {
        let mut store = ParticleStore::new();
        let first = store.spawn(Vec2::new(1.0, 0.0), 1.0);
        for i in 0..1000 {
            store.spawn(Vec2::new(i as f32, 0.0), 1.0);
        }

        assert_eq!(store.get(first).pos, Vec2::new(1.0, 0.0));
        assert_eq!(first.index(), 0);
        assert_eq!(store.len(), 1001);
    }

    #[test]
    fn test_integrate_carries_velocity() {
        let mut p = Particle::new(Vec2::ZERO, 1.0);
        p.set_velocity(Vec2::new(2.0, 0.0), 1.0);
        p.integrate(1.0);

        assert_eq!(p.pos, Vec2::new(2.0, 0.0));
        // Velocity is preserved with no force applied.
        assert_eq!(p.velocity(), Vec2::new(2.0, 0.0));
    }

    #[test]
    fn test_integrate_applies_force_once() {
        let mut p = Particle::new(Vec2::ZERO, 1.0);
        p.force = Vec2::new(0.0, -100.0);
        p.integrate(0.1);

        // dt * dt is inexact in f32, so compare with a tolerance.
        assert!((p.pos - Vec2::new(0.0, -1.0)).length() < 1e-6);
        assert_eq!(p.prev_pos, Vec2::ZERO);
    }

    #[test]
    fn test_set_velocity_scales_with_dt() {
        let mut p = Particle::new(Vec2::new(5.0, 5.0), 1.0);
        p.set_velocity(Vec2::new(60.0, 0.0), 1.0 / 60.0);

        assert!((p.velocity().x - 1.0).abs() < 1e-6);
        assert_eq!(p.velocity().y, 0.0);
    }
}
