//! Matrices over `F_p`. Matrices act on the right: a matrix with `n` rows and `m` columns is a
//! map from `F_p^n` to `F_p^m`, and row `i` is the image of the `i`th basis vector.

mod quasi_inverse;
mod subspace;

use std::fmt;
use std::ops::{Deref, DerefMut, Index, IndexMut};

use itertools::Itertools;

pub use quasi_inverse::QuasiInverse;
pub use subspace::Subspace;

use crate::prime::ValidPrime;
use crate::vector::{FpVector, Slice, SliceMut};

#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    p: ValidPrime,
    columns: usize,
    rows: Vec<FpVector>,
    /// `pivots[c]` is the row whose leading entry is in column `c`, or `-1`. Only meaningful
    /// after [`Matrix::row_reduce`].
    pivots: Vec<isize>,
}

impl Matrix {
    pub fn new(p: ValidPrime, rows: usize, columns: usize) -> Self {
        Self {
            p,
            columns,
            rows: (0..rows).map(|_| FpVector::new(p, columns)).collect(),
            pivots: Vec::new(),
        }
    }

    pub fn from_rows(p: ValidPrime, rows: Vec<FpVector>, columns: usize) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns));
        Self {
            p,
            columns,
            rows,
            pivots: Vec::new(),
        }
    }

    /// ```
    /// # use fp::{matrix::Matrix, prime::ValidPrime};
    /// let m = Matrix::from_vec(ValidPrime::new(3), &[vec![1, 2], vec![0, 1]]);
    /// assert_eq!(m.columns(), 2);
    /// assert_eq!(m.row(1).entry(1), 1);
    /// ```
    pub fn from_vec(p: ValidPrime, input: &[Vec<u32>]) -> Self {
        let columns = input.first().map_or(0, Vec::len);
        let rows = input
            .iter()
            .map(|row| FpVector::from_slice(p, row))
            .collect();
        Self::from_rows(p, rows, columns)
    }

    pub fn identity(p: ValidPrime, dim: usize) -> Self {
        let mut result = Self::new(p, dim, dim);
        for (i, row) in result.rows.iter_mut().enumerate() {
            row.set_entry(i, 1);
        }
        result
    }

    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn pivots(&self) -> &[isize] {
        &self.pivots
    }

    pub fn row(&self, i: usize) -> Slice<'_> {
        self.rows[i].as_slice()
    }

    pub fn row_mut(&mut self, i: usize) -> SliceMut<'_> {
        self.rows[i].as_slice_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FpVector> {
        self.rows.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FpVector> {
        self.rows.iter_mut()
    }

    pub fn into_rows(self) -> Vec<FpVector> {
        self.rows
    }

    pub fn to_vec(&self) -> Vec<Vec<u32>> {
        self.rows.iter().map(|r| r.iter().collect()).collect()
    }

    pub fn push_row(&mut self, row: FpVector) {
        debug_assert_eq!(row.len(), self.columns);
        self.rows.push(row);
    }

    /// A view of the columns `start..end` of every row.
    pub fn slice_mut(&mut self, start: usize, end: usize) -> MatrixSliceMut<'_> {
        MatrixSliceMut {
            rows: &mut self.rows,
            start,
            end,
        }
    }

    /// `result += coeff * (input · self)`.
    pub fn apply(&self, mut result: SliceMut, coeff: u32, input: Slice) {
        debug_assert_eq!(input.len(), self.rows());
        for (i, c) in input.iter_nonzero() {
            result.add(self.row(i), self.p.product(c, coeff));
        }
    }

    /// Put the matrix in reduced row echelon form, recording the pivot of each column, and return
    /// the rank. Row operations are performed in column order, so the result only depends on the
    /// row space and the fixed column order.
    pub fn row_reduce(&mut self) -> usize {
        let p = self.p;
        self.pivots.clear();
        self.pivots.resize(self.columns, -1);

        let mut pivot_row = 0;
        for column in 0..self.columns {
            if pivot_row == self.rows.len() {
                break;
            }
            let Some(found) = (pivot_row..self.rows.len()).find(|&r| self.rows[r].entry(column) != 0)
            else {
                continue;
            };
            self.rows.swap(pivot_row, found);

            let leading = self.rows[pivot_row].entry(column);
            self.rows[pivot_row].scale(p.inverse(leading));
            let pivot = self.rows[pivot_row].clone();

            for (r, row) in self.rows.iter_mut().enumerate() {
                if r == pivot_row {
                    continue;
                }
                let c = row.entry(column);
                if c != 0 {
                    row.add(&pivot, p.negate(c));
                }
            }
            self.pivots[column] = pivot_row as isize;
            pivot_row += 1;
        }
        pivot_row
    }

    /// The rank, computed on a copy.
    pub fn rank(&self) -> usize {
        self.clone().row_reduce()
    }
}

impl Index<usize> for Matrix {
    type Output = FpVector;

    fn index(&self, i: usize) -> &FpVector {
        &self.rows[i]
    }
}

impl IndexMut<usize> for Matrix {
    fn index_mut(&mut self, i: usize) -> &mut FpVector {
        &mut self.rows[i]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.rows.iter().join(", "))
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix(p = {}, {})", self.p, self)
    }
}

/// A block of columns of a [`Matrix`], spanning every row.
pub struct MatrixSliceMut<'a> {
    rows: &'a mut [FpVector],
    start: usize,
    end: usize,
}

impl<'a> MatrixSliceMut<'a> {
    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> usize {
        self.end - self.start
    }

    pub fn row_slice(&mut self, i: usize) -> SliceMut<'_> {
        self.rows[i].slice_mut(self.start, self.end)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = SliceMut<'_>> + '_ {
        let (start, end) = (self.start, self.end);
        self.rows.iter_mut().map(move |r| r.slice_mut(start, end))
    }

    /// Add the identity matrix to the top left square of the block.
    pub fn add_identity(&mut self) {
        let n = std::cmp::min(self.rows(), self.columns());
        for i in 0..n {
            self.row_slice(i).add_basis_element(i, 1);
        }
    }
}

/// A matrix whose columns are split into `N` consecutive segments. The typical use is
/// `[A | I]`: after row reduction the rows with a pivot in the first segment describe the image
/// of `A` and a quasi-inverse, and the remaining rows describe the kernel.
#[derive(Clone)]
pub struct AugmentedMatrix<const N: usize> {
    inner: Matrix,
    start: [usize; N],
    end: [usize; N],
}

impl<const N: usize> AugmentedMatrix<N> {
    pub fn new(p: ValidPrime, rows: usize, columns: [usize; N]) -> Self {
        let mut start = [0; N];
        let mut end = [0; N];
        let mut offset = 0;
        for i in 0..N {
            start[i] = offset;
            offset += columns[i];
            end[i] = offset;
        }
        Self {
            inner: Matrix::new(p, rows, offset),
            start,
            end,
        }
    }

    /// The columns of segments `first..=last`.
    pub fn segment(&mut self, first: usize, last: usize) -> MatrixSliceMut<'_> {
        let (start, end) = (self.start[first], self.end[last]);
        self.inner.slice_mut(start, end)
    }

    pub fn row_segment(&self, i: usize, first: usize, last: usize) -> Slice<'_> {
        self.inner.row(i).slice(self.start[first], self.end[last])
    }

    pub fn segment_width(&self, i: usize) -> usize {
        self.end[i] - self.start[i]
    }
}

impl AugmentedMatrix<2> {
    /// The number of rows whose pivot lies in the first segment. Requires a row-reduced matrix.
    fn image_rank(&self) -> usize {
        self.inner.pivots()[..self.end[0]]
            .iter()
            .filter(|&&x| x >= 0)
            .count()
    }

    /// The row space of the first segment. Requires a row-reduced matrix.
    pub fn compute_image(&self) -> Subspace {
        let rows = (0..self.image_rank())
            .map(|i| self.row_segment(i, 0, 0).to_owned())
            .collect();
        Subspace::from_rows(self.inner.prime(), self.segment_width(0), rows)
    }

    /// Assuming the matrix is `[A | I]` and has been row reduced, the kernel of `A`.
    pub fn compute_kernel(&self) -> Subspace {
        let first_kernel_row = self.image_rank();
        let rows = (first_kernel_row..self.inner.rows())
            .map(|i| self.row_segment(i, 1, 1))
            .filter(|row| !row.is_zero())
            .map(Slice::to_owned)
            .collect();
        Subspace::from_rows(self.inner.prime(), self.segment_width(1), rows)
    }

    /// Assuming the matrix is `[A | I]` and has been row reduced, a quasi-inverse of `A`.
    pub fn compute_quasi_inverse(&self) -> QuasiInverse {
        let image_rank = self.image_rank();
        let preimage = Matrix::from_rows(
            self.inner.prime(),
            (0..image_rank)
                .map(|i| self.row_segment(i, 1, 1).to_owned())
                .collect(),
            self.segment_width(1),
        );
        QuasiInverse::new(Some(self.inner.pivots()[..self.end[0]].to_vec()), preimage)
    }
}

impl<const N: usize> Deref for AugmentedMatrix<N> {
    type Target = Matrix;

    fn deref(&self) -> &Matrix {
        &self.inner
    }
}

impl<const N: usize> DerefMut for AugmentedMatrix<N> {
    fn deref_mut(&mut self) -> &mut Matrix {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn row_reduce_small() {
        let p = ValidPrime::new(3);
        let mut m = Matrix::from_vec(
            p,
            &[
                vec![0, 2, 1, 1],
                vec![1, 1, 0, 2],
                vec![1, 0, 1, 0],
            ],
        );
        assert_eq!(m.row_reduce(), 2);
        expect!["[[1, 0, 1, 0], [0, 1, 2, 2], [0, 0, 0, 0]]"].assert_eq(&m.to_string());
        assert_eq!(m.pivots(), &[0, 1, -1, -1]);
    }

    #[test]
    fn kernel_image_and_quasi_inverse() {
        let p = ValidPrime::new(2);
        // The map F_2^3 -> F_2^2 sending e0, e1 to f0 and e2 to f1.
        let a = Matrix::from_vec(p, &[vec![1, 0], vec![1, 0], vec![0, 1]]);
        let mut aug = AugmentedMatrix::<2>::new(p, 3, [2, 3]);
        for (i, mut row) in aug.segment(0, 0).iter_mut().enumerate() {
            row.assign(a.row(i));
        }
        aug.segment(1, 1).add_identity();
        aug.row_reduce();

        let kernel = aug.compute_kernel();
        expect!["[[1, 1, 0]]"].assert_eq(&kernel.to_string());

        let image = aug.compute_image();
        assert_eq!(image.dimension(), 2);

        let qi = aug.compute_quasi_inverse();
        let target = FpVector::from_slice(p, &[1, 1]);
        let mut preimage = FpVector::new(p, 3);
        qi.apply(preimage.as_slice_mut(), 1, target.as_slice());
        let mut back = FpVector::new(p, 2);
        a.apply(back.as_slice_mut(), 1, preimage.as_slice());
        assert_eq!(back, target);
    }

    fn arb_matrix(p: u32) -> impl Strategy<Value = Vec<Vec<u32>>> {
        (1usize..6, 1usize..6).prop_flat_map(move |(r, c)| {
            proptest::collection::vec(proptest::collection::vec(0..p, c), r)
        })
    }

    proptest! {
        #[test]
        fn rank_nullity(rows in arb_matrix(5)) {
            let p = ValidPrime::new(5);
            let a = Matrix::from_vec(p, &rows);
            let mut aug = AugmentedMatrix::<2>::new(p, a.rows(), [a.columns(), a.rows()]);
            for (i, mut row) in aug.segment(0, 0).iter_mut().enumerate() {
                row.assign(a.row(i));
            }
            aug.segment(1, 1).add_identity();
            aug.row_reduce();

            let kernel = aug.compute_kernel();
            let image = aug.compute_image();
            prop_assert_eq!(kernel.dimension() + image.dimension(), a.rows());
            prop_assert_eq!(image.dimension(), a.rank());

            for v in kernel.iter() {
                let mut out = FpVector::new(p, a.columns());
                a.apply(out.as_slice_mut(), 1, v);
                prop_assert!(out.is_zero());
            }
        }
    }
}
