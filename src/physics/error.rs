//! Physics error types.

use thiserror::Error;

/// Errors reported by physics configuration and registration.
///
/// Per-step collision processing never fails; missing components there are skipped.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("grid cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),

    #[error("fixed timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error(transparent)]
    MissingComponent(#[from] hecs::ComponentError),

    #[error(transparent)]
    NoSuchEntity(#[from] hecs::NoSuchEntity),
}

/// Check a grid cell size.
pub fn validate_cell_size(cell_size: f32) -> Result<(), PhysicsError> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidCellSize(cell_size))
    }
}
