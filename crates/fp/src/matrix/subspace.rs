use std::fmt;

use itertools::Itertools;

use super::Matrix;
use crate::prime::ValidPrime;
use crate::vector::{FpVector, Slice, SliceMut};

/// A subspace of `F_p^n`, stored as a basis in reduced row echelon form. Because the basis is
/// reduced, it is canonical: two subspaces are equal exactly when their bases are.
#[derive(Clone, PartialEq, Eq)]
pub struct Subspace {
    matrix: Matrix,
}

impl Subspace {
    pub fn empty_space(p: ValidPrime, dim: usize) -> Self {
        let mut matrix = Matrix::new(p, 0, dim);
        matrix.row_reduce();
        Self { matrix }
    }

    pub fn entire_space(p: ValidPrime, dim: usize) -> Self {
        let mut matrix = Matrix::identity(p, dim);
        matrix.row_reduce();
        Self { matrix }
    }

    /// The span of `rows`, each of length `dim`.
    pub fn from_rows(p: ValidPrime, dim: usize, rows: Vec<FpVector>) -> Self {
        let mut matrix = Matrix::from_rows(p, rows, dim);
        let rank = matrix.row_reduce();
        let mut rows = matrix.into_rows();
        rows.truncate(rank);
        let mut matrix = Matrix::from_rows(p, rows, dim);
        matrix.row_reduce();
        Self { matrix }
    }

    pub fn prime(&self) -> ValidPrime {
        self.matrix.prime()
    }

    pub fn dimension(&self) -> usize {
        self.matrix.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.dimension() == 0
    }

    pub fn pivots(&self) -> &[isize] {
        self.matrix.pivots()
    }

    /// The reduced basis, in increasing order of pivot column.
    pub fn iter(&self) -> impl Iterator<Item = Slice<'_>> + '_ {
        self.matrix.iter().map(FpVector::as_slice)
    }

    /// Reduce `vector` modulo the subspace. The result is zero exactly when `vector` lies in the
    /// subspace, and is otherwise zero in every pivot column.
    pub fn reduce(&self, mut vector: SliceMut) {
        let p = self.prime();
        for (column, &row) in self.pivots().iter().enumerate() {
            if row < 0 {
                continue;
            }
            let c = vector.entry(column);
            if c != 0 {
                vector.add(self.matrix.row(row as usize), p.negate(c));
            }
        }
    }

    pub fn contains(&self, vector: Slice) -> bool {
        let mut v = vector.to_owned();
        self.reduce(v.as_slice_mut());
        v.is_zero()
    }

    /// Add `vector` to the subspace, returning whether the dimension went up.
    pub fn add_vector(&mut self, vector: Slice) -> bool {
        let mut v = vector.to_owned();
        self.reduce(v.as_slice_mut());
        if v.is_zero() {
            return false;
        }
        self.matrix.push_row(v);
        self.matrix.row_reduce();
        true
    }
}

impl fmt::Display for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.matrix.iter().join(", "))
    }
}

impl fmt::Debug for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subspace(p = {}, {})", self.prime(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_reduce() {
        let p = ValidPrime::new(3);
        let mut space = Subspace::empty_space(p, 3);
        assert!(space.add_vector(FpVector::from_slice(p, &[0, 2, 1]).as_slice()));
        assert!(space.add_vector(FpVector::from_slice(p, &[1, 1, 0]).as_slice()));
        assert!(!space.add_vector(FpVector::from_slice(p, &[2, 1, 1]).as_slice()));
        assert_eq!(space.dimension(), 2);
        assert_eq!(space.to_string(), "[[1, 0, 1], [0, 1, 2]]");

        let mut v = FpVector::from_slice(p, &[2, 2, 2]);
        space.reduce(v.as_slice_mut());
        assert_eq!(v.to_string(), "[0, 0, 2]");
        assert!(!space.contains(FpVector::from_slice(p, &[0, 0, 1]).as_slice()));
        assert!(Subspace::entire_space(p, 3).contains(v.as_slice()));
    }
}
