// distance-consensus - Network arrays
// mod.rs - Square matrices and the per-subject connectivity stack
//
// Everything here is plain row-major storage addressed by node index.
// Node identity is array position; there is nothing else to look up.

pub mod hemisphere;

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::{ThresholdError, ThresholdResult};

/// An n×n matrix stored row-major.
///
/// `data[i * n + j]` is entry (i, j). The flattened index is also the
/// ranking tie-break key used during edge selection, so `index()` and
/// `position()` are part of the public contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareMatrix<T> {
    n: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> SquareMatrix<T> {
    /// An n×n matrix filled with `T::default()` (zero / false).
    pub fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![T::default(); n * n],
        }
    }

    /// Build a matrix by evaluating `f(i, j)` for every entry.
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                data.push(f(i, j));
            }
        }
        Self { n, data }
    }

    /// Build a matrix from nested rows. Every row must have length n.
    pub fn from_rows(rows: Vec<Vec<T>>) -> ThresholdResult<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(ThresholdError::Shape(format!(
                    "row {} has {} entries, expected {} for a square matrix",
                    i,
                    row.len(),
                    n
                )));
            }
            data.extend(row);
        }
        Ok(Self { n, data })
    }

    /// Nested-row copy of the matrix.
    pub fn to_rows(&self) -> Vec<Vec<T>> {
        self.data.chunks(self.n.max(1)).map(<[T]>::to_vec).collect()
    }

    /// Number of rows (and columns).
    pub fn n(&self) -> usize {
        self.n
    }

    /// Flattened row-major index of (i, j).
    #[inline]
    pub fn index(&self, i: usize, j: usize) -> usize {
        i * self.n + j
    }

    /// Inverse of `index()`.
    #[inline]
    pub fn position(&self, idx: usize) -> (usize, usize) {
        (idx / self.n, idx % self.n)
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[self.index(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        let idx = self.index(i, j);
        self.data[idx] = value;
    }

    /// Set entry by flattened index.
    #[inline]
    pub fn set_flat(&mut self, idx: usize, value: T) {
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.n, |i, j| self.get(j, i))
    }

    /// Check that the flat storage matches the declared size.
    ///
    /// Matrices built through the constructors always pass; this guards
    /// matrices that arrive through deserialization.
    pub fn check_shape(&self) -> ThresholdResult<()> {
        if self.data.len() != self.n * self.n {
            return Err(ThresholdError::Shape(format!(
                "matrix declares n = {} but stores {} entries",
                self.n,
                self.data.len()
            )));
        }
        Ok(())
    }
}

impl<T: Copy + Default + PartialEq> SquareMatrix<T> {
    /// Number of entries that differ from zero / false.
    pub fn count_nonzero(&self) -> usize {
        let zero = T::default();
        self.data.iter().filter(|&&v| v != zero).count()
    }

    /// Number of nonzero entries strictly above the diagonal.
    ///
    /// For a symmetric matrix with a zero diagonal this is the number of
    /// undirected edges.
    pub fn upper_triangle_count(&self) -> usize {
        let zero = T::default();
        let mut count = 0;
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.get(i, j) != zero {
                    count += 1;
                }
            }
        }
        count
    }

    pub fn is_symmetric(&self) -> bool {
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if self.get(i, j) != self.get(j, i) {
                    return false;
                }
            }
        }
        true
    }

    pub fn diagonal_is_zero(&self) -> bool {
        let zero = T::default();
        (0..self.n).all(|i| self.get(i, i) == zero)
    }
}

impl<T: Copy + Default + PartialOrd> SquareMatrix<T> {
    /// Element-wise maximum with the transpose: `M = max(M, Mᵗ)`.
    pub fn symmetrize_max(&self) -> Self {
        Self::from_fn(self.n, |i, j| {
            let a = self.get(i, j);
            let b = self.get(j, i);
            if b > a {
                b
            } else {
                a
            }
        })
    }
}

impl<T: Copy + Default + Add<Output = T>> SquareMatrix<T> {
    /// Element-wise sum. Both matrices must have the same size.
    pub fn sum(&self, other: &Self) -> ThresholdResult<Self> {
        if self.n != other.n {
            return Err(ThresholdError::Shape(format!(
                "cannot add a {n1}x{n1} matrix to a {n2}x{n2} matrix",
                n1 = self.n,
                n2 = other.n
            )));
        }
        Ok(Self::from_fn(self.n, |i, j| self.get(i, j) + other.get(i, j)))
    }
}

/// The n×n×s per-subject connectivity tensor.
///
/// Stored as one `SquareMatrix` per subject so that `A[i, j, k]` is
/// `slices[k].get(i, j)`. Zero means "no edge for that subject".
///
/// Deserialization goes through `from_slices`, so a stack read from JSON
/// carries the same guarantees as one built in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSubjectStack")]
pub struct SubjectStack {
    n: usize,
    slices: Vec<SquareMatrix<f64>>,
}

/// Unvalidated wire form of `SubjectStack`.
#[derive(Deserialize)]
struct RawSubjectStack {
    n: usize,
    slices: Vec<SquareMatrix<f64>>,
}

impl TryFrom<RawSubjectStack> for SubjectStack {
    type Error = ThresholdError;

    fn try_from(raw: RawSubjectStack) -> ThresholdResult<Self> {
        let stack = Self::from_slices(raw.slices)?;
        if stack.n != raw.n {
            return Err(ThresholdError::Shape(format!(
                "stack declares n = {} but its subjects are {}x{}",
                raw.n, stack.n, stack.n
            )));
        }
        Ok(stack)
    }
}

impl SubjectStack {
    /// Build a stack from per-subject matrices.
    ///
    /// Fails if there are no subjects, if slices disagree on n, or if any
    /// weight is NaN or infinite.
    pub fn from_slices(slices: Vec<SquareMatrix<f64>>) -> ThresholdResult<Self> {
        let first = slices.first().ok_or(ThresholdError::NoSubjects)?;
        let n = first.n();
        for (k, slice) in slices.iter().enumerate() {
            slice.check_shape()?;
            if slice.n() != n {
                return Err(ThresholdError::Shape(format!(
                    "subject {} is {}x{}, subject 0 is {}x{}",
                    k,
                    slice.n(),
                    slice.n(),
                    n,
                    n
                )));
            }
            if let Some(idx) = slice.as_slice().iter().position(|v| !v.is_finite()) {
                let (i, j) = slice.position(idx);
                return Err(ThresholdError::NonFinite {
                    what: "subject weights",
                    i,
                    j,
                });
            }
        }
        Ok(Self { n, slices })
    }

    /// Build a stack from a flat n×n×s buffer laid out as `A[i, j, k]`,
    /// i.e. `data[(i * n + j) * s + k]`.
    pub fn from_tensor(n: usize, s: usize, data: &[f64]) -> ThresholdResult<Self> {
        if data.len() != n * n * s {
            return Err(ThresholdError::Shape(format!(
                "tensor buffer has {} entries, expected {}x{}x{} = {}",
                data.len(),
                n,
                n,
                s,
                n * n * s
            )));
        }
        let slices = (0..s)
            .map(|k| SquareMatrix::from_fn(n, |i, j| data[(i * n + j) * s + k]))
            .collect();
        Self::from_slices(slices)
    }

    /// Node count n.
    pub fn node_count(&self) -> usize {
        self.n
    }

    /// Subject count s.
    pub fn subject_count(&self) -> usize {
        self.slices.len()
    }

    /// `A[i, j, k]`.
    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.slices[k].get(i, j)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &SquareMatrix<f64>> {
        self.slices.iter()
    }
}
