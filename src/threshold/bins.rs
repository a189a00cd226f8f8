//! # Distance bins
//!
//! `nbins` equal-width, half-open bins `[lo, hi)` spanning the range of the
//! strictly positive distances. Zero entries are self-distances (or pairs
//! with no geometry) and do not define the range.
//!
//! The last edge is pushed up by `upper_edge_padding` so the longest
//! distance lands inside the last bin instead of on its open upper end.

use serde::{Deserialize, Serialize};

use crate::network::SquareMatrix;
use crate::{ThresholdError, ThresholdResult};

/// Bin edges: `edges.len() == nbins + 1`, ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBins {
    edges: Vec<f64>,
}

impl DistanceBins {
    /// Compute bin edges from a distance matrix.
    ///
    /// # Errors
    /// - `InvalidBinCount` if `nbins == 0`
    /// - `NonFinite` if any distance is NaN or infinite
    /// - `NoPositiveDistance` if no entry is strictly positive
    pub fn from_distances(
        dist: &SquareMatrix<f64>,
        nbins: usize,
        upper_edge_padding: f64,
    ) -> ThresholdResult<Self> {
        if nbins == 0 {
            return Err(ThresholdError::InvalidBinCount(nbins));
        }

        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for (idx, &d) in dist.as_slice().iter().enumerate() {
            if !d.is_finite() {
                let (i, j) = dist.position(idx);
                return Err(ThresholdError::NonFinite {
                    what: "distance matrix",
                    i,
                    j,
                });
            }
            if d > 0.0 {
                lo = lo.min(d);
                hi = hi.max(d);
            }
        }
        if lo > hi {
            return Err(ThresholdError::NoPositiveDistance);
        }

        Ok(Self::linspace(lo, hi, nbins, upper_edge_padding))
    }

    /// `nbins + 1` evenly spaced edges from `lo` to `hi`, last edge padded.
    ///
    /// The last edge is always strictly above `hi`, even when `hi` is so
    /// large that adding the padding rounds back to `hi`.
    pub fn linspace(lo: f64, hi: f64, nbins: usize, upper_edge_padding: f64) -> Self {
        let step = (hi - lo) / nbins as f64;
        let mut edges: Vec<f64> = (0..nbins).map(|k| lo + step * k as f64).collect();
        let top = hi + upper_edge_padding;
        edges.push(if top > hi { top } else { next_above(hi) });
        Self { edges }
    }

    pub fn nbins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// `(lo, hi)` of bin `b`.
    pub fn range(&self, b: usize) -> (f64, f64) {
        (self.edges[b], self.edges[b + 1])
    }

    /// The bin `b` with `lo_b <= d < hi_b`, if any.
    pub fn bin_of(&self, d: f64) -> Option<usize> {
        // largest b with edges[b] <= d
        let above = self.edges.partition_point(|&e| e <= d);
        if above == 0 || above > self.nbins() {
            None
        } else {
            Some(above - 1)
        }
    }
}

/// Smallest `f64` strictly greater than a finite `x`.
fn next_above(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    f64::from_bits(if x > 0.0 { bits + 1 } else { bits - 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(rows: Vec<Vec<f64>>) -> SquareMatrix<f64> {
        SquareMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_edges_span_positive_range() {
        let d = dist(vec![
            vec![0.0, 2.0, 6.0],
            vec![2.0, 0.0, 4.0],
            vec![6.0, 4.0, 0.0],
        ]);
        let bins = DistanceBins::from_distances(&d, 2, 1.0).unwrap();
        assert_eq!(bins.edges(), &[2.0, 4.0, 7.0]);
        assert_eq!(bins.nbins(), 2);
    }

    #[test]
    fn test_half_open_assignment() {
        let bins = DistanceBins::linspace(2.0, 6.0, 2, 1.0);
        assert_eq!(bins.bin_of(2.0), Some(0));
        assert_eq!(bins.bin_of(3.999), Some(0));
        assert_eq!(bins.bin_of(4.0), Some(1));
        // the maximum is inside the last bin thanks to the padding
        assert_eq!(bins.bin_of(6.0), Some(1));
        assert_eq!(bins.bin_of(6.5), Some(1));
        assert_eq!(bins.bin_of(7.0), None);
        assert_eq!(bins.bin_of(1.0), None);
        assert_eq!(bins.bin_of(0.0), None);
    }

    #[test]
    fn test_single_distance_value() {
        let d = dist(vec![vec![0.0, 3.0], vec![3.0, 0.0]]);
        let bins = DistanceBins::from_distances(&d, 4, 1.0).unwrap();
        assert_eq!(bins.bin_of(3.0), Some(3));
    }

    #[test]
    fn test_padding_below_precision_still_covers_maximum() {
        let hi = 2f64.powi(60);
        let d = dist(vec![vec![0.0, 1.0, hi], vec![1.0, 0.0, 1.0], vec![hi, 1.0, 0.0]]);
        let bins = DistanceBins::from_distances(&d, 2, 1.0).unwrap();
        assert!(bins.edges()[2] > hi);
        assert_eq!(bins.bin_of(hi), Some(1));
    }

    #[test]
    fn test_next_above() {
        assert!(next_above(1.0) > 1.0);
        assert_eq!(next_above(1.0), 1.0 + f64::EPSILON);
        assert!(next_above(0.0) > 0.0);
        assert!(next_above(-1.0) > -1.0);
    }

    #[test]
    fn test_errors() {
        let zero = dist(vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
        assert!(matches!(
            DistanceBins::from_distances(&zero, 2, 1.0),
            Err(ThresholdError::NoPositiveDistance)
        ));
        let d = dist(vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert!(matches!(
            DistanceBins::from_distances(&d, 0, 1.0),
            Err(ThresholdError::InvalidBinCount(0))
        ));
        let nan = dist(vec![vec![0.0, f64::NAN], vec![1.0, 0.0]]);
        assert!(matches!(
            DistanceBins::from_distances(&nan, 2, 1.0),
            Err(ThresholdError::NonFinite { i: 0, j: 1, .. })
        ));
    }
}
