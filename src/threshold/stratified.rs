//! # Distance-stratified selection
//!
//! The core of the procedure. For one category:
//!
//! 1. Pool every positive subject edge (upper triangle, inside the
//!    category, positive distance) into one sample `D` of distances.
//!    The budget is `tgt = |D| / s`, the average edge count per subject.
//! 2. Give bin `b` the quota `round(tgt * |D ∩ b| / |D|)`, so the group
//!    graph inherits the subject-level distance distribution.
//! 3. Inside each bin, keep the `quota` most consistent pairs.
//!
//! Quotas are rounded independently (ties to even), so their sum may
//! drift from `tgt` by up to half an edge per bin.

use serde::{Deserialize, Serialize};

use crate::network::hemisphere::CategoryMask;
use crate::network::{SquareMatrix, SubjectStack};
use crate::threshold::bins::DistanceBins;
use crate::threshold::rank::{mark, rank_descending, take_top, Candidate};

/// What happened in one distance bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinReport {
    pub bin: usize,
    pub lower: f64,
    pub upper: f64,
    /// Pooled subject edges with a distance in this bin.
    pub pooled: usize,
    /// Edges this bin should contribute.
    pub quota: usize,
    /// Group-level pairs with nonzero consistency in this bin.
    pub candidates: usize,
    /// Edges actually selected (`min(quota, candidates)`).
    pub selected: usize,
}

/// Result of the stratified pass for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedSelection {
    /// Upper-triangular binary selection.
    pub selected: SquareMatrix<u8>,
    /// Edge budget `|D| / s`.
    pub target: f64,
    /// `|D|`.
    pub pooled_edges: usize,
    pub bins: Vec<BinReport>,
}

impl StratifiedSelection {
    pub fn edge_count(&self) -> usize {
        self.bins.iter().map(|b| b.selected).sum()
    }
}

/// Pooled subject-edge distances of one category, histogrammed by bin.
///
/// Returns `(|D|, per-bin counts)`. The bins cover every positive
/// distance, so the counts sum to `|D|`.
pub fn pooled_histogram(
    subjects: &SubjectStack,
    dist: &SquareMatrix<f64>,
    mask: &CategoryMask,
    bins: &DistanceBins,
) -> (usize, Vec<usize>) {
    let mut histogram = vec![0usize; bins.nbins()];
    let mut total = 0usize;

    for (i, j) in mask.upper_pairs() {
        let d = dist.get(i, j);
        if d <= 0.0 {
            continue;
        }
        let present = subjects.subjects().filter(|a| a.get(i, j) > 0.0).count();
        if present == 0 {
            continue;
        }
        total += present;
        if let Some(b) = bins.bin_of(d) {
            histogram[b] += present;
        }
    }

    (total, histogram)
}

/// Number of edges bin should receive out of `target`.
///
/// Zero when the pooled sample is empty.
pub fn bin_quota(target: f64, in_bin: usize, pooled: usize) -> usize {
    if pooled == 0 {
        return 0;
    }
    let quota = (target * in_bin as f64 / pooled as f64).round_ties_even();
    if quota <= 0.0 {
        0
    } else {
        quota as usize
    }
}

/// Run the stratified selection for one category.
///
/// # Arguments
/// * `subjects` - Per-subject weights, used only for the pooled sample
/// * `consistency` - Cross-subject consistency `C`
/// * `dist` - Node distance matrix
/// * `mask` - Category mask; only its strict upper triangle is considered
/// * `bins` - Distance bins
///
/// # Returns
/// The upper-triangular selection plus per-bin bookkeeping.
pub fn select_by_distance(
    subjects: &SubjectStack,
    consistency: &SquareMatrix<u32>,
    dist: &SquareMatrix<f64>,
    mask: &CategoryMask,
    bins: &DistanceBins,
) -> StratifiedSelection {
    let n = mask.n();
    let (pooled_edges, histogram) = pooled_histogram(subjects, dist, mask, bins);
    let target = pooled_edges as f64 / subjects.subject_count() as f64;

    // c = C * triu(d) * [lo_b <= dist < hi_b], bucketed once for all bins
    let mut per_bin: Vec<Vec<Candidate>> = vec![Vec::new(); bins.nbins()];
    for (i, j) in mask.upper_pairs() {
        let c = consistency.get(i, j);
        if c == 0 {
            continue;
        }
        if let Some(b) = bins.bin_of(dist.get(i, j)) {
            per_bin[b].push(Candidate::new(consistency.index(i, j), c as f64));
        }
    }

    let mut selected: SquareMatrix<u8> = SquareMatrix::zeros(n);
    let mut reports = Vec::with_capacity(bins.nbins());

    for (b, candidates) in per_bin.into_iter().enumerate() {
        let (lower, upper) = bins.range(b);
        let quota = bin_quota(target, histogram[b], pooled_edges);
        let available = candidates.len();
        let ranked = rank_descending(candidates);
        let chosen = take_top(&ranked, quota);
        mark(&mut selected, chosen);

        log::debug!(
            "[{}] bin {} [{:.3}, {:.3}): pooled={} quota={} candidates={} selected={}",
            mask.category(),
            b,
            lower,
            upper,
            histogram[b],
            quota,
            available,
            chosen.len(),
        );

        reports.push(BinReport {
            bin: b,
            lower,
            upper,
            pooled: histogram[b],
            quota,
            candidates: available,
            selected: chosen.len(),
        });
    }

    StratifiedSelection {
        selected,
        target,
        pooled_edges,
        bins: reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::hemisphere::{Category, HemisphereLabels};
    use crate::threshold::aggregate::Aggregates;

    /// Four nodes in one hemisphere, distances 1 (neighbours) and 3 (far).
    fn fixture() -> (SubjectStack, SquareMatrix<f64>, CategoryMask) {
        let dist = SquareMatrix::from_fn(4, |i, j| {
            if i == j {
                0.0
            } else if i.abs_diff(j) == 1 {
                1.0
            } else {
                3.0
            }
        });
        // subject 0 has every edge, subject 1 only the near ones
        let s0 = SquareMatrix::from_fn(4, |i, j| if i == j { 0.0 } else { 1.0 });
        let s1 = SquareMatrix::from_fn(4, |i, j| if i.abs_diff(j) == 1 { 2.0 } else { 0.0 });
        let stack = SubjectStack::from_slices(vec![s0, s1]).unwrap();
        let labels = HemisphereLabels::from_labels(&[0, 0, 0, 0]).unwrap();
        let mask = CategoryMask::build(Category::Intra, &labels);
        (stack, dist, mask)
    }

    #[test]
    fn test_pooled_histogram() {
        let (stack, dist, mask) = fixture();
        let bins = DistanceBins::from_distances(&dist, 2, 1.0).unwrap();
        let (total, hist) = pooled_histogram(&stack, &dist, &mask, &bins);
        // near pairs: 3 pairs x 2 subjects, far pairs: 3 pairs x 1 subject
        assert_eq!(total, 9);
        assert_eq!(hist, vec![6, 3]);
    }

    #[test]
    fn test_bin_quota_rounding() {
        assert_eq!(bin_quota(4.5, 6, 9), 3);
        assert_eq!(bin_quota(4.5, 3, 9), 2); // 1.5 -> 2 (ties to even)
        assert_eq!(bin_quota(5.0, 1, 10), 0); // 0.5 -> 0 (ties to even)
        assert_eq!(bin_quota(3.0, 0, 0), 0);
    }

    #[test]
    fn test_select_by_distance_follows_histogram() {
        let (stack, dist, mask) = fixture();
        let agg = Aggregates::from_subjects(&stack);
        let bins = DistanceBins::from_distances(&dist, 2, 1.0).unwrap();
        let sel = select_by_distance(&stack, &agg.consistency, &dist, &mask, &bins);

        assert_eq!(sel.pooled_edges, 9);
        assert_eq!(sel.target, 4.5);
        assert_eq!(sel.bins[0].quota, 3);
        assert_eq!(sel.bins[1].quota, 2);
        assert_eq!(sel.bins[0].selected, 3);
        assert_eq!(sel.bins[1].selected, 2);
        assert_eq!(sel.edge_count(), 5);
        assert_eq!(sel.selected.count_nonzero(), 5);

        // all three near pairs are in
        assert_eq!(sel.selected.get(0, 1), 1);
        assert_eq!(sel.selected.get(1, 2), 1);
        assert_eq!(sel.selected.get(2, 3), 1);
        // far pairs tie on consistency 1; lowest flattened indices win
        assert_eq!(sel.selected.get(0, 2), 1);
        assert_eq!(sel.selected.get(0, 3), 1);
        assert_eq!(sel.selected.get(1, 3), 0);
        // never below the diagonal
        assert_eq!(sel.selected.get(1, 0), 0);
    }

    #[test]
    fn test_quota_larger_than_candidates() {
        let (stack, dist, mask) = fixture();
        let agg = Aggregates::from_subjects(&stack);
        // one bin holding everything, and only 6 pairs exist
        let bins = DistanceBins::from_distances(&dist, 1, 1.0).unwrap();
        let sel = select_by_distance(&stack, &agg.consistency, &dist, &mask, &bins);
        assert!(sel.edge_count() <= mask.pair_count());
        assert_eq!(sel.bins[0].candidates, 6);
    }

    #[test]
    fn test_empty_category_selects_nothing() {
        let (stack, dist, _) = fixture();
        let labels = HemisphereLabels::from_labels(&[0, 0, 0, 0]).unwrap();
        let inter = CategoryMask::build(Category::Inter, &labels);
        let agg = Aggregates::from_subjects(&stack);
        let bins = DistanceBins::from_distances(&dist, 3, 1.0).unwrap();
        let sel = select_by_distance(&stack, &agg.consistency, &dist, &inter, &bins);
        assert_eq!(sel.pooled_edges, 0);
        assert_eq!(sel.target, 0.0);
        assert_eq!(sel.edge_count(), 0);
    }
}
