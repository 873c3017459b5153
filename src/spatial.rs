//! Spatial hashing via counting sort.
//!
//! Every substep the solver rebuilds a dense grouping of particle indices by
//! grid cell: a count pass, an in-place prefix sum, and a decrementing
//! scatter pass. The result is a flat index array partitioned by cell with
//! no per-cell allocation, so the hot loop never touches the heap once the
//! scratch buffers have grown to size.

use glam::Vec2;

use crate::error::SolverError;

/// Uniform grid layout covering the simulation bounds.
///
/// `cell_width` must be at least the diameter of the largest particle;
/// same-cell-only collision checking relies on one cell covering any
/// possible overlap between a particle and its largest neighbor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridGeometry {
    pub cell_width: f32,
    pub cell_count_x: u32,
    pub cell_count_y: u32,
}

impl GridGeometry {
    /// Derive the grid for a container, sizing cells to the bounding square
    /// of the largest particle.
    pub fn new(screen_size: Vec2, largest_particle_radius: f32) -> Result<Self, SolverError> {
        if !largest_particle_radius.is_finite() || largest_particle_radius <= 0.0 {
            return Err(SolverError::InvalidRadius(largest_particle_radius));
        }
        if !screen_size.x.is_finite()
            || !screen_size.y.is_finite()
            || screen_size.x <= 0.0
            || screen_size.y <= 0.0
        {
            return Err(SolverError::DegenerateBounds {
                width: screen_size.x,
                height: screen_size.y,
            });
        }

        let cell_width = 2.0 * largest_particle_radius;
        let cell_count_x = (screen_size.x / cell_width).ceil() as u32;
        let cell_count_y = (screen_size.y / cell_width).ceil() as u32;

        if cell_count_x == 0 || cell_count_y == 0 {
            return Err(SolverError::DegenerateBounds {
                width: screen_size.x,
                height: screen_size.y,
            });
        }

        Ok(Self {
            cell_width,
            cell_count_x,
            cell_count_y,
        })
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_count_x as usize * self.cell_count_y as usize
    }

    /// Map a position to its cell index by particle center.
    ///
    /// Uses `floor`, not truncation toward zero, so negative coordinates
    /// fall into cell -1 instead of folding into cell 0 before the clamp.
    /// Positions can sit outside the bounds transiently (a spawn past an
    /// edge, or resolution pushing a particle through a wall at the end of
    /// a substep); clamping the cell coordinates per axis keeps any such
    /// particle from producing an out-of-range write.
    #[inline]
    pub fn cell_index(&self, pos: Vec2) -> usize {
        let cell_x = (pos.x / self.cell_width).floor() as i64;
        let cell_y = (pos.y / self.cell_width).floor() as i64;
        let cell_x = cell_x.clamp(0, self.cell_count_x as i64 - 1) as usize;
        let cell_y = cell_y.clamp(0, self.cell_count_y as i64 - 1) as usize;
        cell_y * self.cell_count_x as usize + cell_x
    }
}

/// Counting-sort grouping of particle indices by cell.
///
/// After [`build`](CellTable::build), `starts` holds one offset per cell
/// plus a sentinel: the indices of the particles in cell `h` live in
/// `grouped[starts[h]..starts[h + 1]]`. Particles within a cell appear in
/// scatter order, not insertion order.
#[derive(Debug, Default)]
pub struct CellTable {
    starts: Vec<u32>,
    grouped: Vec<u32>,
}

impl CellTable {
    pub fn new() -> Self {
        Self {
            starts: Vec::new(),
            grouped: Vec::new(),
        }
    }

    /// Rebuild the grouping from current positions.
    ///
    /// The table holds no persistent membership; it is a pure function of
    /// the positions passed in. Scratch buffers are reused across calls.
    pub fn build(&mut self, positions: &[Vec2], geom: &GridGeometry) {
        let cells = geom.cell_count();

        self.starts.clear();
        self.starts.resize(cells + 1, 0);
        self.grouped.clear();
        self.grouped.resize(positions.len(), 0);

        // Count pass.
        for pos in positions {
            self.starts[geom.cell_index(*pos)] += 1;
        }

        // Prefix-sum pass: counts become cumulative end offsets.
        for i in 1..self.starts.len() {
            self.starts[i] += self.starts[i - 1];
        }

        // Scatter pass: decrementing each cell's running offset turns the
        // cumulative ends into start offsets as a side effect. The sentinel
        // slot is never decremented and stays at the total particle count.
        for (p_i, pos) in positions.iter().enumerate() {
            let h = geom.cell_index(*pos);
            self.starts[h] -= 1;
            self.grouped[self.starts[h] as usize] = p_i as u32;
        }
    }

    /// Particle indices grouped into cell `h`.
    #[inline]
    pub fn cell(&self, h: usize) -> &[u32] {
        let start = self.starts[h] as usize;
        let end = self.starts[h + 1] as usize;
        &self.grouped[start..end]
    }

    /// Per-cell start offsets (prefix-summed), including the sentinel slot.
    #[inline]
    pub fn starts(&self) -> &[u32] {
        &self.starts
    }

    /// The flat grouped index array, one entry per particle.
    #[inline]
    pub fn grouped(&self) -> &[u32] {
        &self.grouped
    }
}
