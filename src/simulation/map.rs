use crate::simulation::geometry::Location;
use thiserror::Error;

/// Largest accepted map side, also the upper bound for speeds. Telemetry ranges derived from the
/// map stay well inside `i64`.
pub const MAX_MAP_SIZE: i64 = 1_000_000_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MapError {
    #[error("map size must be positive, got x_size={x_size}, y_size={y_size}")]
    NonPositiveSize { x_size: i64, y_size: i64 },
    #[error("map size must not exceed {MAX_MAP_SIZE}, got x_size={x_size}, y_size={y_size}")]
    TooLarge { x_size: i64, y_size: i64 },
}

/// Rectangular operating area shared by all vehicles of a run.
///
/// There is no way to change the bounds after construction. Vehicles hold it
/// behind an `Arc`, so a run has exactly one map that every vehicle reads.
#[derive(Debug, PartialEq, Eq)]
pub struct NavigationMap {
    x_size: i64,
    y_size: i64,
}

impl NavigationMap {
    pub fn new(x_size: i64, y_size: i64) -> Result<Self, MapError> {
        if x_size <= 0 || y_size <= 0 {
            return Err(MapError::NonPositiveSize { x_size, y_size });
        }
        if x_size > MAX_MAP_SIZE || y_size > MAX_MAP_SIZE {
            return Err(MapError::TooLarge { x_size, y_size });
        }
        Ok(NavigationMap { x_size, y_size })
    }

    pub fn x_size(&self) -> i64 {
        self.x_size
    }

    pub fn y_size(&self) -> i64 {
        self.y_size
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, location: &Location) -> bool {
        (0..=self.x_size).contains(&location.x) && (0..=self.y_size).contains(&location.y)
    }
}
