//! The parallel compute seam for collision resolution.
//!
//! A [`CollisionBackend`] is a pure function from (positions, grid) to
//! corrected positions: the solver uploads a snapshot of positions plus the
//! cell table, blocks until the backend finishes, and writes the results
//! back. Nothing runs concurrently with the simulation loop, so swapping
//! [`LocalBackend`] for the wgpu-based [`GpuCollider`](crate::gpu::GpuCollider)
//! changes performance and nothing else.

use glam::Vec2;

use crate::collision::gather_corrections;
use crate::spatial::GridGeometry;

/// Borrowed view of one resolution pass.
///
/// `positions` is read as input and overwritten with corrected positions.
/// `starts` is the prefix-summed per-cell offset table including its
/// sentinel slot; `grouped` is the flat particle index array.
pub struct CollisionFrame<'a> {
    pub positions: &'a mut [Vec2],
    pub radii: &'a [f32],
    pub starts: &'a [u32],
    pub grouped: &'a [u32],
    pub geom: GridGeometry,
}

/// Bulk per-particle collision resolution, offloadable.
///
/// Implementations must be functionally equivalent to the local gather
/// resolver: each particle's corrected position depends only on the input
/// snapshot, never on other particles' corrected positions within the same
/// pass. The call is blocking and runs to completion once dispatched.
pub trait CollisionBackend {
    fn resolve(&mut self, frame: CollisionFrame<'_>);
}

/// Non-offloaded reference backend.
///
/// Runs the same gather algorithm the GPU shader runs, on the calling
/// thread. Useful as a drop-in when no adapter is available and as the
/// behavioral reference in tests.
#[derive(Debug, Default)]
pub struct LocalBackend {
    scratch: Vec<Vec2>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CollisionBackend for LocalBackend {
    fn resolve(&mut self, frame: CollisionFrame<'_>) {
        self.scratch.clear();
        self.scratch.resize(frame.positions.len(), Vec2::ZERO);

        gather_corrections(
            frame.positions,
            frame.radii,
            frame.starts,
            frame.grouped,
            &frame.geom,
            &mut self.scratch,
        );

        frame.positions.copy_from_slice(&self.scratch);
    }
}
