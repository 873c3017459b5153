//! Error types for verlet2d.
//!
//! Construction is the only fallible path in the simulation core: a solver
//! that cannot derive a valid grid refuses to initialize. The per-frame
//! update path preserves its invariants with guards instead of returning
//! errors.

use std::fmt;

/// Errors raised while constructing a [`Solver`](crate::Solver).
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// Screen size has zero or negative area, or is not finite.
    DegenerateBounds { width: f32, height: f32 },
    /// Largest particle radius is zero, negative, or not finite.
    InvalidRadius(f32),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::DegenerateBounds { width, height } => write!(
                f,
                "Cannot derive a collision grid from a {}x{} container",
                width, height
            ),
            SolverError::InvalidRadius(r) => write!(
                f,
                "Largest particle radius must be positive and finite, got {}",
                r
            ),
        }
    }
}

impl std::error::Error for SolverError {}

/// Errors that can occur while setting up the GPU collision backend.
#[derive(Debug)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_error_display() {
        let err = SolverError::DegenerateBounds {
            width: 0.0,
            height: 600.0,
        };
        assert!(err.to_string().contains("0x600"));

        let err = SolverError::InvalidRadius(-1.0);
        assert!(err.to_string().contains("-1"));
    }
}
