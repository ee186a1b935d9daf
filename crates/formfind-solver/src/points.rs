//! Point store: the solver's owned vertex positions.
//!
//! Positions live in a single `Vec<DVec3>` (array-of-structs) so that the
//! local step can hand each constraint a shared slice and the global step
//! can write the solved positions back in one pass.

use formfind_math::DVec3;
use formfind_types::{FormfindError, FormfindResult};

/// Ordered collection of 3D points, indexed `0..len`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointStore {
    positions: Vec<DVec3>,
}

impl PointStore {
    /// Creates a store from a list of points.
    pub fn new(positions: Vec<DVec3>) -> FormfindResult<Self> {
        check_finite(&positions)?;
        Ok(Self { positions })
    }

    /// Creates a store from a flat `[x0, y0, z0, x1, ...]` buffer.
    pub fn from_flat(coords: &[f64]) -> FormfindResult<Self> {
        if coords.len() % 3 != 0 {
            return Err(FormfindError::InvalidPoints(format!(
                "flat coordinate buffer length {} is not a multiple of 3",
                coords.len()
            )));
        }
        let positions = coords
            .chunks_exact(3)
            .map(|c| DVec3::new(c[0], c[1], c[2]))
            .collect();
        Self::new(positions)
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_slice(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn as_mut_slice(&mut self) -> &mut [DVec3] {
        &mut self.positions
    }

    /// Copy of all positions.
    pub fn get_all(&self) -> Vec<DVec3> {
        self.positions.clone()
    }

    /// Replaces all positions. The point count must not change.
    pub fn set_all(&mut self, positions: &[DVec3]) -> FormfindResult<()> {
        if positions.len() != self.positions.len() {
            return Err(FormfindError::InvalidPoints(format!(
                "expected {} points, got {}",
                self.positions.len(),
                positions.len()
            )));
        }
        check_finite(positions)?;
        self.positions.copy_from_slice(positions);
        Ok(())
    }

    /// Flattens to `[x0, y0, z0, x1, ...]`.
    pub fn to_flat(&self) -> Vec<f64> {
        self.positions
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }
}

fn check_finite(positions: &[DVec3]) -> FormfindResult<()> {
    match positions.iter().position(|p| !p.is_finite()) {
        Some(i) => Err(FormfindError::InvalidPoints(format!(
            "point {i} has a non-finite coordinate"
        ))),
        None => Ok(()),
    }
}
