use std::sync::Arc;

use bivec::BiVec;
use fp::vector::{FpVector, Slice, SliceMut};
use once::OnceBiVec;

use crate::algebra::Bialgebra;
use crate::module::{FDModule, Module};

/// The tensor product of two modules over a [`Bialgebra`].
///
/// The basis in degree `t` consists of the pairs `a.b` with `|a| + |b| = t`, in blocks of
/// ascending `|a|`. Within a block the index is `left_index * right_dimension + right_index`.
pub struct TensorModule<M: Module, N: Module<Algebra = M::Algebra>> {
    pub left: Arc<M>,
    pub right: Arc<N>,
    /// degree -> left degree -> offset of the block. The final entry of each degree is the total
    /// dimension.
    offsets: OnceBiVec<BiVec<usize>>,
}

impl<M: Module, N: Module<Algebra = M::Algebra>> std::fmt::Display for TensorModule<M, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} (x) {}", self.left, self.right)
    }
}

impl<A, M, N> TensorModule<M, N>
where
    A: Bialgebra,
    M: Module<Algebra = A>,
    N: Module<Algebra = A>,
{
    pub fn new(left: Arc<M>, right: Arc<N>) -> Self {
        TensorModule {
            offsets: OnceBiVec::new(left.min_degree() + right.min_degree()),
            left,
            right,
        }
    }

    /// The range of left degrees that contribute to degree `degree`.
    fn left_degrees(&self, degree: i32) -> std::ops::RangeInclusive<i32> {
        let max = degree - self.right.min_degree();
        let max = match self.left.max_degree() {
            Some(top) => std::cmp::min(top, max),
            None => max,
        };
        self.left.min_degree()..=max
    }

    pub fn offset(&self, degree: i32, left_degree: i32) -> usize {
        self.offsets[degree][left_degree]
    }

    /// The degree of the left factor of the basis element `idx`.
    fn seek_module_num(&self, degree: i32, idx: usize) -> i32 {
        let offsets = &self.offsets[degree];
        assert!(idx < self.dimension(degree));
        // Empty blocks share their start with the next block, so take the last match.
        offsets
            .iter_enum()
            .rev()
            .skip(1)
            .find(|&(_, &start)| start <= idx)
            .map_or(self.left.min_degree(), |(left_degree, _)| left_degree)
    }

    /// Act by an element whose coproduct is given by [`Bialgebra::coproduct`].
    fn act_helper(
        &self,
        mut result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        mod_degree: i32,
        input: Slice,
    ) {
        let algebra = self.algebra();
        let p = self.prime();
        let output_degree = mod_degree + op_degree;

        let mut left_result = FpVector::new(p, 0);
        let mut right_result = FpVector::new(p, 0);

        for (op_deg_l, op_idx_l, op_deg_r, op_idx_r) in algebra.coproduct(op_degree, op_index) {
            for left_deg in self.left_degrees(mod_degree) {
                let right_deg = mod_degree - left_deg;

                let left_source_dim = self.left.dimension(left_deg);
                let right_source_dim = self.right.dimension(right_deg);
                let left_target_dim = self.left.dimension(left_deg + op_deg_l);
                let right_target_dim = self.right.dimension(right_deg + op_deg_r);

                if left_target_dim == 0
                    || right_target_dim == 0
                    || left_source_dim == 0
                    || right_source_dim == 0
                {
                    continue;
                }
                let sign = p.minus_one_to_the_n(op_deg_r * left_deg);
                let block = self.offset(mod_degree, left_deg);
                let target_block = self.offset(output_degree, left_deg + op_deg_l);

                left_result.set_scratch_vector_size(left_target_dim);
                right_result.set_scratch_vector_size(right_target_dim);

                for i in 0..left_source_dim {
                    self.left.act_on_basis(
                        left_result.as_slice_mut(),
                        p.product(coeff, sign),
                        op_deg_l,
                        op_idx_l,
                        left_deg,
                        i,
                    );
                    if left_result.is_zero() {
                        continue;
                    }

                    for j in 0..right_source_dim {
                        let entry = input.entry(block + i * right_source_dim + j);
                        if entry == 0 {
                            continue;
                        }
                        self.right.act_on_basis(
                            right_result.as_slice_mut(),
                            entry,
                            op_deg_r,
                            op_idx_r,
                            right_deg,
                            j,
                        );
                        if right_result.is_zero() {
                            continue;
                        }
                        result.add_tensor(
                            target_block,
                            1,
                            left_result.as_slice(),
                            right_result.as_slice(),
                        );
                        right_result.set_to_zero();
                    }
                    left_result.set_to_zero();
                }
            }
        }
    }

    /// Convert to an [`FDModule`], discarding everything above `max_degree`.
    pub fn as_finite_module(&self, max_degree: i32) -> error::Result<FDModule<A>> {
        FDModule::from_module_truncated(self, max_degree)
    }
}

impl<A, M, N> Module for TensorModule<M, N>
where
    A: Bialgebra,
    M: Module<Algebra = A>,
    N: Module<Algebra = A>,
{
    type Algebra = A;

    fn algebra(&self) -> Arc<A> {
        self.left.algebra()
    }

    fn min_degree(&self) -> i32 {
        self.left.min_degree() + self.right.min_degree()
    }

    fn max_computed_degree(&self) -> i32 {
        self.offsets.max_degree()
    }

    fn compute_basis(&self, degree: i32) {
        self.left.compute_basis(degree - self.right.min_degree());
        self.right.compute_basis(degree - self.left.min_degree());
        self.offsets.extend(degree, |i| {
            let mut offsets = BiVec::new(self.left.min_degree());
            let mut total = 0;
            for j in self.left_degrees(i) {
                offsets.push(total);
                total += self.left.dimension(j) * self.right.dimension(i - j);
            }
            offsets.push(total);
            offsets
        });
    }

    fn dimension(&self, degree: i32) -> usize {
        if degree < self.min_degree() {
            return 0;
        }
        if let Some(top) = self.max_degree() {
            if degree > top {
                return 0;
            }
        }
        match self.offsets[degree].last() {
            Some(&total) => total,
            None => 0,
        }
    }

    fn act_on_basis(
        &self,
        result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        mod_degree: i32,
        mod_index: usize,
    ) {
        let mut working_element = FpVector::new(self.prime(), self.dimension(mod_degree));
        working_element.set_entry(mod_index, 1);

        self.act(
            result,
            coeff,
            op_degree,
            op_index,
            mod_degree,
            working_element.as_slice(),
        );
    }

    fn act(
        &self,
        mut result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        mod_degree: i32,
        input: Slice,
    ) {
        if op_degree == 0 {
            result.add(input, coeff);
            return;
        }
        if self.dimension(mod_degree + op_degree) == 0 {
            return;
        }

        let algebra = self.algebra();
        let p = self.prime();
        let decomposition = algebra.decompose(op_degree, op_index);
        let Some((&(last_degree, last_index), rest)) = decomposition.split_last() else {
            panic!("Decomposition has length 0");
        };

        // Apply the factors in order, carrying the intermediate element. The coefficient is only
        // applied by the last factor.
        let mut working_degree = mod_degree;
        let mut working_element = input.to_owned();
        for &(op_degree, op_index) in rest {
            let mut new_element = FpVector::new(p, self.dimension(working_degree + op_degree));
            self.act_helper(
                new_element.as_slice_mut(),
                1,
                op_degree,
                op_index,
                working_degree,
                working_element.as_slice(),
            );
            working_element = new_element;
            working_degree += op_degree;
        }
        self.act_helper(
            result,
            coeff,
            last_degree,
            last_index,
            working_degree,
            working_element.as_slice(),
        );
    }

    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String {
        let left_degree = self.seek_module_num(degree, idx);
        let right_degree = degree - left_degree;
        let inner_index = idx - self.offset(degree, left_degree);

        let right_dim = self.right.dimension(right_degree);

        let left_index = inner_index / right_dim;
        let right_index = inner_index % right_dim;

        format!(
            "{}.{}",
            self.left.basis_element_to_string(left_degree, left_index),
            self.right.basis_element_to_string(right_degree, right_index)
        )
    }

    fn max_degree(&self) -> Option<i32> {
        Some(self.left.max_degree()? + self.right.max_degree()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Algebra, MilnorAlgebra};
    use crate::module::FDModuleBuilder;
    use expect_test::expect;
    use fp::prime::ValidPrime;

    fn module(p: u32, gens: &[(i32, &str)], actions: &[&str]) -> Arc<FDModule<MilnorAlgebra>> {
        let mut b = FDModuleBuilder::new(Arc::new(MilnorAlgebra::new(ValidPrime::new(p))));
        for &(d, name) in gens {
            b = b.add_generator(d, name).unwrap();
        }
        for action in actions {
            b = b.add_action(action).unwrap();
        }
        Arc::new(b.build().unwrap())
    }

    fn act_string<M: Module>(m: &M, op: &str, degree: i32, idx: usize) -> String {
        let algebra = m.algebra();
        let (op_deg, op_idx) = algebra.basis_element_from_string(op).unwrap();
        m.compute_basis(degree + op_deg);
        let mut result = FpVector::new(m.prime(), m.dimension(degree + op_deg));
        m.act_on_basis(result.as_slice_mut(), 1, op_deg, op_idx, degree, idx);
        m.element_to_string(degree + op_deg, result.as_slice())
    }

    #[test]
    fn c2_tensor_c2() {
        let c2 = module(2, &[(0, "x0"), (1, "x1")], &["Sq1 x0 = x1"]);
        let tensor = TensorModule::new(Arc::clone(&c2), Arc::clone(&c2));
        tensor.compute_basis(2);
        assert_eq!(
            (0..=3).map(|t| tensor.dimension(t)).collect::<Vec<_>>(),
            vec![1, 2, 1, 0]
        );
        assert_eq!(tensor.basis_element_to_string(1, 1), "x1.x0");
        expect!["x0.x1 + x1.x0"].assert_eq(&act_string(&tensor, "Sq1", 0, 0));
        expect!["x1.x1"].assert_eq(&act_string(&tensor, "Sq2", 0, 0));
        expect!["0"].assert_eq(&act_string(&tensor, "Sq(0,1)", 0, 0));
    }

    #[test]
    fn signs_at_odd_primes() {
        let m = module(3, &[(0, "x0"), (1, "x1")], &["b x0 = x1"]);
        let tensor = TensorModule::new(Arc::clone(&m), Arc::clone(&m));
        expect!["x0.x1 + x1.x0"].assert_eq(&act_string(&tensor, "b", 0, 0));
        expect!["x1.x1"].assert_eq(&act_string(&tensor, "b", 1, 0));
        expect!["2 x1.x1"].assert_eq(&act_string(&tensor, "b", 1, 1));
    }

    #[test]
    fn finite_module_is_valid() {
        let joker = module(
            2,
            &[(0, "x0"), (1, "x1"), (2, "x2"), (3, "x3"), (4, "x4")],
            &["Sq1 x0 = x1", "Sq2 x0 = x2", "Sq2 x1 = x3", "Sq1 x3 = x4", "Sq2 x2 = x4"],
        );
        let c2 = module(2, &[(0, "y0"), (1, "y1")], &["Sq1 y0 = y1"]);
        let tensor = TensorModule::new(joker, c2);
        let finite = tensor.as_finite_module(10).unwrap();
        assert_eq!(finite.total_dimension(), 10);
        for input in 0..=5 {
            for output in input + 1..=5 {
                finite.check_validity(input, output).unwrap();
            }
        }
    }

    #[test]
    fn truncation_at_odd_primes() {
        let m = module(3, &[(0, "x0"), (1, "x1"), (4, "x4")], &["b x0 = x1", "P1 x0 = x4"]);
        let tensor = TensorModule::new(Arc::clone(&m), Arc::clone(&m));
        let finite = tensor.as_finite_module(5).unwrap();
        assert_eq!(finite.max_degree(), Some(5));
        assert_eq!(finite.dimension(4), 2);
        assert_eq!(finite.dimension(5), 2);
        expect!["x0.x4 + x4.x0"].assert_eq(&act_string(&finite, "P1", 0, 0));
    }
}
