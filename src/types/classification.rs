//! Result of classifying a fingerprint trajectory against a reference catalog.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

/// Errors raised when assembling a [`Classification`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("distances have shape {distances:?} but references have shape {references:?}")]
    ShapeMismatch {
        distances: (usize, usize),
        references: (usize, usize),
    },
    #[error("reference index {index} at frame {frame}, atom {atom} is outside the legend of {legend} entries")]
    ReferenceOutOfRange {
        frame: usize,
        atom: usize,
        index: usize,
        legend: usize,
    },
}

/// Per-frame, per-atom nearest-reference assignment.
///
/// Three parallel structures: `distances[[frame, atom]]` is the distance to
/// the closest reference, `references[[frame, atom]]` its position in
/// `legend`. Every reference index is a valid legend position.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    distances: Array2<f64>,
    references: Array2<usize>,
    legend: Vec<String>,
}

impl Classification {
    pub fn new(
        distances: Array2<f64>,
        references: Array2<usize>,
        legend: Vec<String>,
    ) -> Result<Self, ClassificationError> {
        if distances.dim() != references.dim() {
            return Err(ClassificationError::ShapeMismatch {
                distances: distances.dim(),
                references: references.dim(),
            });
        }
        if let Some(((frame, atom), &index)) = references
            .indexed_iter()
            .find(|(_, index)| **index >= legend.len())
        {
            return Err(ClassificationError::ReferenceOutOfRange {
                frame,
                atom,
                index,
                legend: legend.len(),
            });
        }
        Ok(Self {
            distances,
            references,
            legend,
        })
    }

    /// Classification known only by its state ids; distances are NaN.
    pub fn from_states(
        references: Array2<usize>,
        legend: Vec<String>,
    ) -> Result<Self, ClassificationError> {
        let distances = Array2::from_elem(references.dim(), f64::NAN);
        Self::new(distances, references, legend)
    }

    pub fn distances(&self) -> ArrayView2<'_, f64> {
        self.distances.view()
    }

    pub fn references(&self) -> ArrayView2<'_, usize> {
        self.references.view()
    }

    pub fn legend(&self) -> &[String] {
        &self.legend
    }

    pub fn num_frames(&self) -> usize {
        self.references.nrows()
    }

    pub fn num_atoms(&self) -> usize {
        self.references.ncols()
    }

    pub fn num_states(&self) -> usize {
        self.legend.len()
    }

    /// State ids of one atom across all frames.
    pub fn atom_states(&self, atom: usize) -> ArrayView1<'_, usize> {
        self.references.index_axis(Axis(1), atom)
    }

    pub fn into_parts(self) -> (Array2<f64>, Array2<usize>, Vec<String>) {
        (self.distances, self.references, self.legend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn legend(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("state{i}")).collect()
    }

    #[test]
    fn test_from_states() {
        let c = Classification::from_states(array![[0, 1], [1, 1], [2, 0]], legend(3)).unwrap();
        assert_eq!(c.num_frames(), 3);
        assert_eq!(c.num_atoms(), 2);
        assert_eq!(c.atom_states(0).to_vec(), vec![0, 1, 2]);
        assert!(c.distances().iter().all(|d| d.is_nan()));
    }

    #[test]
    fn test_rejects_index_outside_legend() {
        let err = Classification::from_states(array![[0, 1], [3, 1]], legend(3)).unwrap_err();
        assert_eq!(
            err,
            ClassificationError::ReferenceOutOfRange {
                frame: 1,
                atom: 0,
                index: 3,
                legend: 3
            }
        );
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let err = Classification::new(Array2::zeros((2, 2)), array![[0, 0, 0]], legend(1))
            .unwrap_err();
        assert!(matches!(err, ClassificationError::ShapeMismatch { .. }));
    }
}
