//! # Cross-subject aggregation
//!
//! Consistency and average weight per node pair, computed once and shared
//! read-only by both categories.
//!
//! ```text
//! C[i, j] = #{ k : A[i, j, k] > 0 }
//! W[i, j] = sum_{k : A[i, j, k] > 0} A[i, j, k] / C[i, j]     (0 when C = 0)
//! ```
//!
//! Only strictly positive weights count. A subject slice that is all zero
//! contributes nothing to either matrix.

use crate::network::{SquareMatrix, SubjectStack};

/// Consistency and average-weight matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregates {
    /// Number of subjects with a positive edge at (i, j).
    pub consistency: SquareMatrix<u32>,

    /// Mean positive weight at (i, j); zero where no subject has an edge.
    pub average_weight: SquareMatrix<f64>,
}

impl Aggregates {
    /// Aggregate a subject stack. Streams one subject slice at a time.
    pub fn from_subjects(subjects: &SubjectStack) -> Self {
        let n = subjects.node_count();
        let mut consistency: SquareMatrix<u32> = SquareMatrix::zeros(n);
        let mut weight_sum: SquareMatrix<f64> = SquareMatrix::zeros(n);

        for slice in subjects.subjects() {
            let counts = consistency.as_mut_slice();
            let sums = weight_sum.as_mut_slice();
            for (idx, &w) in slice.as_slice().iter().enumerate() {
                if w > 0.0 {
                    counts[idx] += 1;
                    sums[idx] += w;
                }
            }
        }

        let average_weight = SquareMatrix::from_fn(n, |i, j| {
            let c = consistency.get(i, j);
            if c == 0 {
                0.0
            } else {
                weight_sum.get(i, j) / c as f64
            }
        });

        Self {
            consistency,
            average_weight,
        }
    }
}
