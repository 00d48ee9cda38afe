use std::sync::Arc;

use fp::vector::SliceMut;
use itertools::Itertools;
use once::OnceBiVec;

use crate::module::{FDModule, Module};

/// The direct sum of a list of modules.
///
/// The basis in degree `t` is the concatenation of the bases of the summands in degree `t`, in the
/// order the summands were given. Basis elements keep the names they have in their summand.
pub struct SumModule<M: Module> {
    // Kept separately since the list of summands may be empty.
    algebra: Arc<M::Algebra>,
    min_degree: i32,
    pub modules: Vec<Arc<M>>,
    /// degree -> summand -> offset of its block. The final entry of each degree is the total
    /// dimension.
    offsets: OnceBiVec<Vec<usize>>,
}

impl<M: Module> std::fmt::Display for SumModule<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.modules.is_empty() {
            write!(f, "0")
        } else {
            write!(f, "{}", self.modules.iter().join(" + "))
        }
    }
}

impl<M: Module> SumModule<M> {
    /// Summands with a minimum degree below `min_degree` are cut off at `min_degree`.
    pub fn new(algebra: Arc<M::Algebra>, modules: Vec<Arc<M>>, min_degree: i32) -> Self {
        Self {
            algebra,
            min_degree,
            modules,
            offsets: OnceBiVec::new(min_degree),
        }
    }

    fn summand_dimension(module: &M, degree: i32) -> usize {
        if degree < module.min_degree() {
            0
        } else {
            module.dimension(degree)
        }
    }

    /// The position of the block of summand `module_num` in degree `degree`.
    pub fn offset(&self, degree: i32, module_num: usize) -> usize {
        self.offsets[degree][module_num]
    }

    /// The summand containing the basis element `idx`, and the index of the element within it.
    fn seek_module_num(&self, degree: i32, idx: usize) -> (usize, usize) {
        let offsets = &self.offsets[degree];
        assert!(idx < self.dimension(degree));
        // Empty blocks share their start with the next block, so take the last match.
        let module_num = offsets.partition_point(|&start| start <= idx) - 1;
        (module_num, idx - offsets[module_num])
    }

    /// Convert to an [`FDModule`], discarding everything above `max_degree`.
    pub fn as_finite_module(&self, max_degree: i32) -> error::Result<FDModule<M::Algebra>> {
        FDModule::from_module_truncated(self, max_degree)
    }
}

impl<M: Module> Module for SumModule<M> {
    type Algebra = M::Algebra;

    fn algebra(&self) -> Arc<Self::Algebra> {
        Arc::clone(&self.algebra)
    }

    fn min_degree(&self) -> i32 {
        self.min_degree
    }

    fn max_computed_degree(&self) -> i32 {
        self.offsets.max_degree()
    }

    fn compute_basis(&self, degree: i32) {
        for module in &self.modules {
            module.compute_basis(degree);
        }
        self.offsets.extend(degree, |t| {
            let mut offsets = Vec::with_capacity(self.modules.len() + 1);
            let mut total = 0;
            for module in &self.modules {
                offsets.push(total);
                total += Self::summand_dimension(module, t);
            }
            offsets.push(total);
            offsets
        });
    }

    fn dimension(&self, degree: i32) -> usize {
        self.offsets
            .get(degree)
            .and_then(|offsets| offsets.last())
            .copied()
            .unwrap_or(0)
    }

    fn act_on_basis(
        &self,
        mut result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        mod_degree: i32,
        mod_index: usize,
    ) {
        let output_degree = mod_degree + op_degree;
        if self.dimension(output_degree) == 0 {
            return;
        }
        let (module_num, inner_index) = self.seek_module_num(mod_degree, mod_index);
        let start = self.offset(output_degree, module_num);
        let end = self.offset(output_degree, module_num + 1);
        if start == end {
            return;
        }
        self.modules[module_num].act_on_basis(
            result.slice_mut(start, end),
            coeff,
            op_degree,
            op_index,
            mod_degree,
            inner_index,
        );
    }

    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String {
        let (module_num, inner_index) = self.seek_module_num(degree, idx);
        self.modules[module_num].basis_element_to_string(degree, inner_index)
    }

    fn max_degree(&self) -> Option<i32> {
        self.modules
            .iter()
            .try_fold(self.min_degree - 1, |top, module| {
                Some(std::cmp::max(top, module.max_degree()?))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Algebra, MilnorAlgebra};
    use crate::module::FDModuleBuilder;
    use expect_test::expect;
    use fp::prime::ValidPrime;
    use fp::vector::FpVector;

    fn module(
        algebra: &Arc<MilnorAlgebra>,
        name: &str,
        gens: &[(i32, &str)],
        actions: &[&str],
    ) -> Arc<FDModule<MilnorAlgebra>> {
        let mut b = FDModuleBuilder::new(Arc::clone(algebra)).set_name(name);
        for &(d, generator) in gens {
            b = b.add_generator(d, generator).unwrap();
        }
        for action in actions {
            b = b.add_action(action).unwrap();
        }
        Arc::new(b.build().unwrap())
    }

    #[test]
    fn c2_plus_ceta() {
        let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(2)));
        let c2 = module(&algebra, "C2", &[(0, "x0"), (1, "x1")], &["Sq1 x0 = x1"]);
        let ceta = module(&algebra, "Ceta", &[(0, "y0"), (2, "y2")], &["Sq2 y0 = y2"]);
        let sum = SumModule::new(Arc::clone(&algebra), vec![c2, ceta], 0);
        sum.compute_basis(4);

        expect!["C2 + Ceta"].assert_eq(&sum.to_string());
        assert_eq!(sum.max_degree(), Some(2));
        assert_eq!(
            (0..=3).map(|t| sum.dimension(t)).collect::<Vec<_>>(),
            vec![2, 1, 1, 0]
        );
        assert_eq!(sum.basis_element_to_string(0, 1), "y0");

        let act = |op: &str, degree: i32, idx: usize| {
            let (op_deg, op_idx) = algebra.basis_element_from_string(op).unwrap();
            let mut result = FpVector::new(sum.prime(), sum.dimension(degree + op_deg));
            sum.act_on_basis(result.as_slice_mut(), 1, op_deg, op_idx, degree, idx);
            sum.element_to_string(degree + op_deg, result.as_slice())
        };
        assert_eq!(act("Sq1", 0, 0), "x1");
        assert_eq!(act("Sq1", 0, 1), "0");
        assert_eq!(act("Sq2", 0, 0), "0");
        assert_eq!(act("Sq2", 0, 1), "y2");
        assert_eq!(act("Sq(1)", 1, 0), "0");

        let finite = sum.as_finite_module(10).unwrap();
        assert_eq!(finite.total_dimension(), 4);
        let expected = module(
            &algebra,
            "C2 + Ceta",
            &[(0, "x0"), (0, "y0"), (1, "x1"), (2, "y2")],
            &["Sq1 x0 = x1", "Sq2 y0 = y2"],
        );
        assert_eq!(&finite, expected.as_ref());
    }

    #[test]
    fn empty_sum() {
        let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(2)));
        let sum: SumModule<FDModule<MilnorAlgebra>> = SumModule::new(algebra, vec![], 0);
        sum.compute_basis(3);
        assert_eq!(sum.to_string(), "0");
        assert_eq!(sum.max_degree(), Some(-1));
        assert_eq!(sum.dimension(2), 0);
    }

    #[test]
    fn summands_in_negative_degrees() {
        let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(2)));
        let low = module(&algebra, "low", &[(-1, "u"), (0, "v")], &["Sq1 u = v"]);
        let high = module(&algebra, "high", &[(1, "w")], &[]);
        let sum = SumModule::new(Arc::clone(&algebra), vec![high, low], -1);
        sum.compute_basis(2);
        assert_eq!(
            (-1..=2).map(|t| sum.dimension(t)).collect::<Vec<_>>(),
            vec![1, 1, 1, 0]
        );
        assert_eq!(sum.offset(-1, 1), 0);
        assert_eq!(sum.basis_element_to_string(-1, 0), "u");
        assert_eq!(sum.basis_element_to_string(1, 0), "w");
    }
}
