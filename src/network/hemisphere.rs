// distance-consensus - Network arrays
// hemisphere.rs - Hemisphere labels and the intra/inter category masks
//
// Labels are exactly 0 and 1. Anything else is rejected when the labels
// are parsed, so no node pair can silently fall outside both categories.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::network::SquareMatrix;
use crate::{ThresholdError, ThresholdResult};

/// Which of the two node groups a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    /// Label 0.
    First,
    /// Label 1.
    Second,
}

impl Hemisphere {
    pub const ALL: [Hemisphere; 2] = [Hemisphere::First, Hemisphere::Second];

    /// Parse a numeric label. Only 0 and 1 are accepted.
    pub fn from_label(label: i64) -> Option<Hemisphere> {
        match label {
            0 => Some(Hemisphere::First),
            1 => Some(Hemisphere::Second),
            _ => None,
        }
    }
}

/// Validated per-node hemisphere assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HemisphereLabels {
    nodes: Vec<Hemisphere>,
}

impl HemisphereLabels {
    /// Parse raw labels, failing on the first value that is not 0 or 1.
    pub fn from_labels(labels: &[i64]) -> ThresholdResult<Self> {
        let nodes = labels
            .iter()
            .enumerate()
            .map(|(node, &label)| {
                Hemisphere::from_label(label)
                    .ok_or(ThresholdError::InvalidHemisphereLabel { node, label })
            })
            .collect::<ThresholdResult<Vec<_>>>()?;
        Ok(Self { nodes })
    }

    /// Node count.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, node: usize) -> Hemisphere {
        self.nodes[node]
    }

    /// Number of nodes carrying the given label.
    pub fn count(&self, hemisphere: Hemisphere) -> usize {
        self.nodes.iter().filter(|&&h| h == hemisphere).count()
    }

    /// True when both labels are present.
    pub fn is_bilateral(&self) -> bool {
        Hemisphere::ALL.iter().all(|&h| self.count(h) > 0)
    }
}

/// Topological edge category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Endpoints carry different labels.
    Inter,
    /// Endpoints carry the same label.
    Intra,
}

impl Category {
    /// Processing order.
    pub const ALL: [Category; 2] = [Category::Inter, Category::Intra];

    /// Does the pair (a, b) belong to this category?
    pub fn contains(&self, a: Hemisphere, b: Hemisphere) -> bool {
        match self {
            Category::Inter => a != b,
            Category::Intra => a == b,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Inter => write!(f, "inter-hemispheric"),
            Category::Intra => write!(f, "intra-hemispheric"),
        }
    }
}

/// Symmetric boolean mask over all node pairs of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMask {
    category: Category,
    mask: SquareMatrix<bool>,
}

impl CategoryMask {
    /// Build the mask for `category` from validated labels.
    ///
    /// The category predicate is symmetric in its arguments; the mask is
    /// still OR'd with its own transpose so symmetry never depends on it.
    pub fn build(category: Category, labels: &HemisphereLabels) -> Self {
        let n = labels.len();
        let raw = SquareMatrix::from_fn(n, |i, j| category.contains(labels.get(i), labels.get(j)));
        let transposed = raw.transpose();
        let mask = SquareMatrix::from_fn(n, |i, j| raw.get(i, j) || transposed.get(i, j));
        Self { category, mask }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn n(&self) -> usize {
        self.mask.n()
    }

    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.mask.get(i, j)
    }

    pub fn as_matrix(&self) -> &SquareMatrix<bool> {
        &self.mask
    }

    /// Strictly upper-triangular pairs (i < j) inside the mask, in
    /// row-major order.
    pub fn upper_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.n();
        (0..n)
            .flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(move |&(i, j)| self.contains(i, j))
    }

    /// Number of distinct node pairs in this category.
    pub fn pair_count(&self) -> usize {
        self.upper_pairs().count()
    }
}
