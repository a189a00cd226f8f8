//! # Consensus baseline
//!
//! Classic consensus thresholding: keep the `k` heaviest pairs of a
//! category by average weight, ignoring distance. `k` is not derived here;
//! it is the edge count the stratified pass chose for the same category,
//! so both graphs spend the same budget.

use crate::network::hemisphere::CategoryMask;
use crate::network::SquareMatrix;
use crate::threshold::rank::{mark, rank_descending, take_top, Candidate};

/// Select the top `k` upper-triangular pairs of `mask` by average weight.
///
/// Pairs with zero average weight (no subject has the edge) are never
/// selected, so the result may hold fewer than `k` edges when the category
/// has fewer weighted pairs.
pub fn select_by_weight(
    average_weight: &SquareMatrix<f64>,
    mask: &CategoryMask,
    k: usize,
) -> SquareMatrix<u8> {
    let candidates: Vec<Candidate> = mask
        .upper_pairs()
        .filter_map(|(i, j)| {
            let w = average_weight.get(i, j);
            if w > 0.0 {
                Some(Candidate::new(average_weight.index(i, j), w))
            } else {
                None
            }
        })
        .collect();

    let ranked = rank_descending(candidates);
    let mut selected = SquareMatrix::zeros(mask.n());
    mark(&mut selected, take_top(&ranked, k));
    selected
}
