//! # Group Thresholding Orchestrator
//!
//! Runs the five stages in order and assembles the two group networks:
//!
//! 1. `aggregate` - consistency and average weight per pair
//! 2. `bins` - distance bin edges
//! 3. category masks (`network::hemisphere`)
//! 4. `stratified` - per category, per bin, consistency-ranked selection
//! 5. `consensus` - weight-ranked baseline with the same per-category count,
//!    then both results are merged across categories and symmetrized
//!
//! Inputs are validated once up front; after that nothing can fail.

pub mod aggregate;
pub mod bins;
pub mod consensus;
pub mod rank;
pub mod stratified;

use serde::{Deserialize, Serialize};

use crate::network::hemisphere::{Category, CategoryMask, HemisphereLabels};
use crate::network::{SquareMatrix, SubjectStack};
use crate::{BinningConfig, ThresholdError, ThresholdResult};

use aggregate::Aggregates;
use bins::DistanceBins;
use stratified::BinReport;

/// Per-category bookkeeping of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub category: Category,

    /// Distinct node pairs in this category.
    pub available_pairs: usize,

    /// Pooled subject edges `|D|`.
    pub pooled_edges: usize,

    /// Average edges per subject `|D| / s`.
    pub target: f64,

    /// Edges in the distance-matched graph for this category.
    pub distance_edges: usize,

    /// Edges in the consensus baseline for this category.
    pub consensus_edges: usize,

    pub bins: Vec<BinReport>,
}

/// Both group networks plus the per-category report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNetworks {
    /// Distance-matched group network `G`.
    pub distance: SquareMatrix<u8>,

    /// Weight-ranked consensus network `Gc`.
    pub consensus: SquareMatrix<u8>,

    /// Distance bin edges used for stratification.
    pub bin_edges: Vec<f64>,

    pub categories: Vec<CategoryReport>,
}

impl GroupNetworks {
    /// Consume into `(G, Gc)`.
    pub fn into_pair(self) -> (SquareMatrix<u8>, SquareMatrix<u8>) {
        (self.distance, self.consensus)
    }

    /// Undirected edge count of `G`.
    pub fn distance_edge_count(&self) -> usize {
        self.distance.upper_triangle_count()
    }

    /// Undirected edge count of `Gc`.
    pub fn consensus_edge_count(&self) -> usize {
        self.consensus.upper_triangle_count()
    }

    /// Edge density of `G` over all n(n-1)/2 pairs.
    pub fn density(&self) -> f64 {
        let n = self.distance.n();
        if n < 2 {
            return 0.0;
        }
        self.distance_edge_count() as f64 / (n * (n - 1) / 2) as f64
    }

    pub fn report(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|r| r.category == category)
    }
}

/// Configured runner for the thresholding procedure.
#[derive(Debug, Clone)]
pub struct GroupThresholder {
    config: BinningConfig,
}

impl GroupThresholder {
    /// Create a thresholder with the given binning configuration.
    pub fn new(config: &BinningConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Thresholder with `nbins` bins and the default edge padding.
    pub fn with_nbins(nbins: usize) -> Self {
        Self {
            config: BinningConfig {
                nbins,
                upper_edge_padding: 1.0,
            },
        }
    }

    /// Compute both group networks.
    ///
    /// # Errors
    /// Shape mismatches between the three inputs, `nbins == 0`, hemisphere
    /// labels other than 0/1, non-finite distances and a distance matrix
    /// without positive entries.
    pub fn run(
        &self,
        subjects: &SubjectStack,
        dist: &SquareMatrix<f64>,
        hemiid: &[i64],
    ) -> ThresholdResult<GroupNetworks> {
        let n = subjects.node_count();
        dist.check_shape()?;
        if dist.n() != n {
            return Err(ThresholdError::Shape(format!(
                "distance matrix is {}x{} but subjects have {} nodes",
                dist.n(),
                dist.n(),
                n
            )));
        }
        if hemiid.len() != n {
            return Err(ThresholdError::Shape(format!(
                "{} hemisphere labels for {} nodes",
                hemiid.len(),
                n
            )));
        }
        let labels = HemisphereLabels::from_labels(hemiid)?;
        let bins =
            DistanceBins::from_distances(dist, self.config.nbins, self.config.upper_edge_padding)?;

        if !labels.is_bilateral() {
            log::warn!(
                "Only one hemisphere label present; the inter-hemispheric category is empty"
            );
        }

        let aggregates = Aggregates::from_subjects(subjects);

        let mut g: SquareMatrix<u8> = SquareMatrix::zeros(n);
        let mut gc: SquareMatrix<u8> = SquareMatrix::zeros(n);
        let mut categories = Vec::with_capacity(Category::ALL.len());

        for category in Category::ALL {
            let mask = CategoryMask::build(category, &labels);
            let selection = stratified::select_by_distance(
                subjects,
                &aggregates.consistency,
                dist,
                &mask,
                &bins,
            );
            let k = selection.selected.count_nonzero();
            let baseline = consensus::select_by_weight(&aggregates.average_weight, &mask, k);
            let consensus_edges = baseline.count_nonzero();

            log::info!(
                "[{}] target {:.2} edges/subject from {} pooled edges; selected {} (consensus {})",
                category,
                selection.target,
                selection.pooled_edges,
                k,
                consensus_edges,
            );

            g = g.sum(&selection.selected)?;
            gc = gc.sum(&baseline)?;

            categories.push(CategoryReport {
                category,
                available_pairs: mask.pair_count(),
                pooled_edges: selection.pooled_edges,
                target: selection.target,
                distance_edges: k,
                consensus_edges,
                bins: selection.bins,
            });
        }

        Ok(GroupNetworks {
            distance: g.symmetrize_max(),
            consensus: gc.symmetrize_max(),
            bin_edges: bins.edges().to_vec(),
            categories,
        })
    }
}

/// Distance-dependent consensus thresholding.
///
/// Returns `(G, Gc)`: the distance-matched group network and the
/// weight-ranked consensus baseline, both n×n, binary, symmetric, with a
/// zero diagonal.
///
/// # Example
/// ```
/// use distance_consensus::{distance_threshold, SquareMatrix, SubjectStack};
///
/// let subject = SquareMatrix::from_rows(vec![
///     vec![0.0, 1.0, 1.0],
///     vec![1.0, 0.0, 1.0],
///     vec![1.0, 1.0, 0.0],
/// ])?;
/// let dist = SquareMatrix::from_rows(vec![
///     vec![0.0, 1.0, 2.0],
///     vec![1.0, 0.0, 1.0],
///     vec![2.0, 1.0, 0.0],
/// ])?;
/// let stack = SubjectStack::from_slices(vec![subject])?;
/// let (g, gc) = distance_threshold(&stack, &dist, &[0, 0, 1], 2)?;
/// assert!(g.is_symmetric() && gc.is_symmetric());
/// # Ok::<(), distance_consensus::ThresholdError>(())
/// ```
pub fn distance_threshold(
    subjects: &SubjectStack,
    dist: &SquareMatrix<f64>,
    hemiid: &[i64],
    nbins: usize,
) -> ThresholdResult<(SquareMatrix<u8>, SquareMatrix<u8>)> {
    GroupThresholder::with_nbins(nbins)
        .run(subjects, dist, hemiid)
        .map(GroupNetworks::into_pair)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_stack(n: usize, s: usize) -> SubjectStack {
        let slices = (0..s)
            .map(|k| {
                SquareMatrix::from_fn(n, |i, j| if i == j { 0.0 } else { (1 + i + j + k) as f64 })
            })
            .collect();
        SubjectStack::from_slices(slices).unwrap()
    }

    fn line_distances(n: usize) -> SquareMatrix<f64> {
        SquareMatrix::from_fn(n, |i, j| i.abs_diff(j) as f64)
    }

    #[test]
    fn test_shape_mismatch_distance() {
        let err = GroupThresholder::with_nbins(2)
            .run(&full_stack(3, 1), &line_distances(4), &[0, 0, 1])
            .unwrap_err();
        assert!(matches!(err, ThresholdError::Shape(_)));
    }

    #[test]
    fn test_shape_mismatch_labels() {
        let err = GroupThresholder::with_nbins(2)
            .run(&full_stack(3, 1), &line_distances(3), &[0, 1])
            .unwrap_err();
        assert!(matches!(err, ThresholdError::Shape(_)));
    }

    #[test]
    fn test_zero_bins_rejected() {
        let err = GroupThresholder::with_nbins(0)
            .run(&full_stack(3, 1), &line_distances(3), &[0, 0, 1])
            .unwrap_err();
        assert!(matches!(err, ThresholdError::InvalidBinCount(0)));
    }

    #[test]
    fn test_report_per_category() {
        let result = GroupThresholder::with_nbins(3)
            .run(&full_stack(6, 3), &line_distances(6), &[0, 0, 0, 1, 1, 1])
            .unwrap();
        assert_eq!(result.categories.len(), 2);
        assert_eq!(result.categories[0].category, Category::Inter);
        assert_eq!(result.categories[1].category, Category::Intra);
        assert_eq!(result.bin_edges.len(), 4);

        let inter = result.report(Category::Inter).unwrap();
        assert_eq!(inter.available_pairs, 9);
        // every subject has every edge: tgt equals the pair count
        assert_eq!(inter.pooled_edges, 27);
        assert_eq!(inter.target, 9.0);
        assert_eq!(inter.distance_edges, inter.consensus_edges);

        let total: usize = result.categories.iter().map(|r| r.distance_edges).sum();
        assert_eq!(result.distance_edge_count(), total);
    }

    #[test]
    fn test_density() {
        let result = GroupThresholder::with_nbins(1)
            .run(&full_stack(4, 2), &line_distances(4), &[0, 0, 1, 1])
            .unwrap();
        // full graph in every subject: everything is kept
        assert_eq!(result.distance_edge_count(), 6);
        assert_eq!(result.density(), 1.0);
    }
}
