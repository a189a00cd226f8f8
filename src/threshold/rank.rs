//! # Ranked selection
//!
//! Selection never marks positions in place while ranking. Candidates are
//! collected as (flattened index, score) pairs, sorted into an explicit
//! order, and a prefix of that order is written into a fresh matrix.
//!
//! ## Ordering
//!
//! Score descending, then flattened row-major index ascending. The second
//! key makes equal scores resolve the same way on every run.

use std::cmp::Ordering;

use crate::network::SquareMatrix;

/// A selectable matrix position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Row-major flattened index (`i * n + j`).
    pub index: usize,
    /// Ranking score; higher is better.
    pub score: f64,
}

impl Candidate {
    pub fn new(index: usize, score: f64) -> Self {
        Self { index, score }
    }
}

/// Sort candidates by score descending, ties by index ascending.
pub fn rank_descending(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.index.cmp(&b.index))
    });
    candidates
}

/// The first `k` ranked candidates, or all of them if there are fewer.
pub fn take_top(ranked: &[Candidate], k: usize) -> &[Candidate] {
    &ranked[..k.min(ranked.len())]
}

/// Mark the given candidates with 1 in `target`.
pub fn mark(target: &mut SquareMatrix<u8>, chosen: &[Candidate]) {
    for candidate in chosen {
        target.set_flat(candidate.index, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descending_with_index_tiebreak() {
        let ranked = rank_descending(vec![
            Candidate::new(7, 1.0),
            Candidate::new(3, 2.0),
            Candidate::new(5, 2.0),
            Candidate::new(1, 1.0),
        ]);
        let order: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![3, 5, 1, 7]);
    }

    #[test]
    fn test_take_top_clamps() {
        let ranked = vec![Candidate::new(0, 3.0), Candidate::new(1, 2.0)];
        assert_eq!(take_top(&ranked, 1).len(), 1);
        assert_eq!(take_top(&ranked, 5).len(), 2);
        assert!(take_top(&[], 3).is_empty());
    }

    #[test]
    fn test_mark_fresh_matrix() {
        let mut m: SquareMatrix<u8> = SquareMatrix::zeros(3);
        mark(&mut m, &[Candidate::new(1, 1.0), Candidate::new(5, 1.0)]);
        assert_eq!(m.get(0, 1), 1);
        assert_eq!(m.get(1, 2), 1);
        assert_eq!(m.count_nonzero(), 2);
    }
}
