use itertools::Itertools;
use std::sync::Arc;

use fp::prime::ValidPrime;
use fp::vector::{Slice, SliceMut};

use crate::algebra::Algebra;

/// A graded module over an [`Algebra`], finite dimensional in each degree and bounded below.
pub trait Module: std::fmt::Display + Send + Sync {
    type Algebra: Algebra;

    fn algebra(&self) -> Arc<Self::Algebra>;
    fn min_degree(&self) -> i32;
    fn compute_basis(&self, _degree: i32) {}
    /// The maximum `t` for which the module is defined at `t`.
    fn max_computed_degree(&self) -> i32;
    fn dimension(&self, degree: i32) -> usize;

    /// Add `coeff` times the action of the algebra basis element `(op_degree, op_index)` on the
    /// module basis element `(mod_degree, mod_index)` to `result`.
    fn act_on_basis(
        &self,
        result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        mod_degree: i32,
        mod_index: usize,
    );

    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String;

    fn prime(&self) -> ValidPrime {
        self.algebra().prime()
    }

    /// `max_degree` is a degree such that if t > `max_degree`, then `self.dimension(t) = 0`.
    fn max_degree(&self) -> Option<i32> {
        None
    }

    fn total_dimension(&self) -> usize {
        let max_degree = self
            .max_degree()
            .expect("total_dimension requires module to be bounded");

        (self.min_degree()..=max_degree)
            .map(|i| self.dimension(i))
            .sum()
    }

    /// The length of `input` need not be equal to the dimension of the module in said degree.
    /// Missing entries are interpreted to be 0.
    fn act(
        &self,
        mut result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        input_degree: i32,
        input: Slice,
    ) {
        assert!(input.len() <= self.dimension(input_degree));
        let p = self.prime();
        for (i, v) in input.iter_nonzero() {
            self.act_on_basis(
                result.copy(),
                p.product(coeff, v),
                op_degree,
                op_index,
                input_degree,
                i,
            );
        }
    }

    fn act_by_element(
        &self,
        mut result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op: Slice,
        input_degree: i32,
        input: Slice,
    ) {
        assert_eq!(op.len(), self.algebra().dimension(op_degree));
        let p = self.prime();
        for (i, v) in op.iter_nonzero() {
            self.act(
                result.copy(),
                p.product(coeff, v),
                op_degree,
                i,
                input_degree,
                input,
            );
        }
    }

    fn element_to_string(&self, degree: i32, element: Slice) -> String {
        let result = element
            .iter_nonzero()
            .map(|(idx, value)| {
                let coeff = if value == 1 {
                    "".to_string()
                } else {
                    format!("{value} ")
                };
                let basis_elt = self.basis_element_to_string(degree, idx);
                format!("{coeff}{basis_elt}")
            })
            .join(" + ");
        if result.is_empty() {
            "0".to_string()
        } else {
            result
        }
    }
}
