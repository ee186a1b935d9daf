//! Constraint signatures: serialisable batch descriptions.
//!
//! A signature names one kind and a list of point-index groups; each
//! group becomes one constraint. Weights and scalar groups are either a
//! single entry broadcast to every group or one entry per group.
//!
//! ```json
//! {
//!   "kind": "EdgeStrain",
//!   "pointIndexGroups": [[0, 1], [1, 2]],
//!   "weights": [1.0],
//!   "scalars": [[1.0, 0.9, 1.1]]
//! }
//! ```

use formfind_math::DVec3;
use formfind_types::{ConstraintId, ConstraintKind, FormfindError, FormfindResult};
use serde::{Deserialize, Serialize};

use crate::constraint::{build_constraint, validate_indices, validate_weight};
use crate::solver::Solver;

/// Kind, index groups, weights and scalar parameters for a batch of
/// constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintSignature {
    pub kind: ConstraintKind,
    pub point_index_groups: Vec<Vec<usize>>,
    /// One weight for all groups, or one per group.
    pub weights: Vec<f64>,
    /// Empty (keep defaults), one group for all, or one per group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scalars: Vec<Vec<f64>>,
}

/// One expanded constraint: what `Solver::add_constraint` and
/// `Solver::edit_constraint` consume.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    pub kind: ConstraintKind,
    pub indices: Vec<usize>,
    pub weight: f64,
    pub scalars: Option<Vec<f64>>,
}

impl ConstraintSignature {
    /// Unit weight, no scalars.
    pub fn new(kind: ConstraintKind, point_index_groups: Vec<Vec<usize>>) -> Self {
        Self {
            kind,
            point_index_groups,
            weights: vec![1.0],
            scalars: Vec::new(),
        }
    }

    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_scalars(mut self, scalars: Vec<Vec<f64>>) -> Self {
        self.scalars = scalars;
        self
    }

    /// Scalars from candidate shapes: each entry is one group's list of
    /// shapes, flattened to `[x, y, z, ...]`.
    pub fn with_candidate_shapes(mut self, shapes: Vec<Vec<Vec<DVec3>>>) -> Self {
        self.scalars = shapes
            .into_iter()
            .map(|group| {
                group
                    .iter()
                    .flatten()
                    .flat_map(|p| p.to_array())
                    .collect()
            })
            .collect();
        self
    }

    /// Parses a JSON array of signatures.
    pub fn list_from_json(text: &str) -> FormfindResult<Vec<Self>> {
        serde_json::from_str(text).map_err(|e| {
            FormfindError::Serialization(format!("constraint signatures: {e}"))
        })
    }

    pub fn group_count(&self) -> usize {
        self.point_index_groups.len()
    }

    /// Weight for group `g` after broadcasting.
    fn weight_for(&self, group: usize) -> FormfindResult<f64> {
        match self.weights.len() {
            1 => Ok(self.weights[0]),
            n if n == self.group_count() => Ok(self.weights[group]),
            n => Err(FormfindError::WeightCountMismatch {
                kind: self.kind,
                groups: self.group_count(),
                weights: n,
            }),
        }
    }

    /// Scalars for group `g` after broadcasting; `None` when absent.
    pub fn scalars_for(&self, group: usize) -> FormfindResult<Option<&[f64]>> {
        match self.scalars.len() {
            0 => Ok(None),
            1 => Ok(Some(&self.scalars[0])),
            n if n == self.group_count() => Ok(Some(&self.scalars[group])),
            n => Err(FormfindError::ScalarGroupCountMismatch {
                kind: self.kind,
                groups: self.group_count(),
                scalar_groups: n,
            }),
        }
    }

    /// One [`ConstraintSpec`] per index group, in group order. Validates
    /// arity, index range, weight and scalar count of every group before
    /// returning.
    pub fn expand(&self, point_count: usize) -> FormfindResult<Vec<ConstraintSpec>> {
        let mut specs = Vec::with_capacity(self.group_count());
        for (group, indices) in self.point_index_groups.iter().enumerate() {
            self.kind.check_arity(indices.len())?;
            validate_indices(self.kind, indices, point_count)?;
            let weight = self.weight_for(group)?;
            validate_weight(self.kind, weight)?;
            let scalars = self.scalars_for(group)?;
            if let Some(s) = scalars {
                self.kind.check_scalar_count(s.len(), indices.len())?;
            }
            specs.push(ConstraintSpec {
                kind: self.kind,
                indices: indices.clone(),
                weight,
                scalars: scalars.map(<[f64]>::to_vec),
            });
        }
        Ok(specs)
    }
}

impl Solver {
    /// Adds every group of `signature` as a constraint, applying its
    /// scalars. Either all groups are added or none.
    ///
    /// Returns the new ids in group order.
    pub fn add_signature(
        &mut self,
        signature: &ConstraintSignature,
    ) -> FormfindResult<Vec<ConstraintId>> {
        self.ensure_unlocked("add a signature")?;
        let specs = signature
            .expand(self.point_count())
            .inspect_err(|e| tracing::warn!(error = %e, "signature rejected"))?;

        let mut built = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut constraint =
                build_constraint(spec.kind, spec.indices, spec.weight, self.points())?;
            if let Some(scalars) = &spec.scalars {
                constraint.set_scalars(scalars)?;
            }
            built.push(constraint);
        }

        Ok(built
            .into_iter()
            .map(|c| self.push_constraint(c))
            .collect())
    }
}
