use std::sync::Arc;

use fp::matrix::{QuasiInverse, Subspace};
use fp::vector::{FpVector, SliceMut};
use once::OnceBiVec;
use parking_lot::Mutex;

use crate::module::free_module::OperationGeneratorPair;
use crate::module::homomorphism::ModuleHomomorphism;
use crate::module::{FreeModule, Module};

/// A homomorphism out of a free module, determined by the images of the generators.
///
/// The outputs are recorded one generator degree at a time. The kernel and quasi-inverse are
/// optional and are only recorded when the caller computes them (the differentials of a
/// resolution do, chain maps do not).
pub struct FreeModuleHomomorphism<M: Module> {
    source: Arc<FreeModule<M::Algebra>>,
    target: Arc<M>,
    outputs: OnceBiVec<Vec<FpVector>>, // degree --> input_idx --> output
    kernel: OnceBiVec<Subspace>,
    quasi_inverse: OnceBiVec<QuasiInverse>,
    min_degree: i32,
    lock: Mutex<()>,
    /// degree shift, such that output_degree = input_degree - degree_shift
    degree_shift: i32,
}

impl<M: Module> ModuleHomomorphism for FreeModuleHomomorphism<M> {
    type Source = FreeModule<M::Algebra>;
    type Target = M;

    fn source(&self) -> Arc<Self::Source> {
        Arc::clone(&self.source)
    }

    fn target(&self) -> Arc<Self::Target> {
        Arc::clone(&self.target)
    }

    fn degree_shift(&self) -> i32 {
        self.degree_shift
    }

    fn min_degree(&self) -> i32 {
        self.min_degree
    }

    fn apply_to_basis_element(
        &self,
        result: SliceMut,
        coeff: u32,
        input_degree: i32,
        input_index: usize,
    ) {
        assert!(input_degree >= self.source.min_degree());
        assert!(input_index < self.source.dimension(input_degree));
        let output_degree = input_degree - self.degree_shift;
        assert_eq!(self.target.dimension(output_degree), result.as_slice().len());
        let OperationGeneratorPair {
            operation_degree,
            generator_degree,
            operation_index,
            generator_index,
        } = *self.source.index_to_op_gen(input_degree, input_index);

        if generator_degree >= self.min_degree {
            let output_on_generator = self.output(generator_degree, generator_index);
            self.target.act(
                result,
                coeff,
                operation_degree,
                operation_index,
                generator_degree - self.degree_shift,
                output_on_generator.as_slice(),
            );
        }
    }

    fn kernel(&self, degree: i32) -> Option<&Subspace> {
        self.kernel.get(degree)
    }

    fn quasi_inverse(&self, degree: i32) -> Option<&QuasiInverse> {
        self.quasi_inverse.get(degree)
    }
}

impl<M: Module> FreeModuleHomomorphism<M> {
    pub fn new(source: Arc<FreeModule<M::Algebra>>, target: Arc<M>, degree_shift: i32) -> Self {
        let min_degree = std::cmp::max(source.min_degree(), target.min_degree() + degree_shift);
        Self {
            source,
            target,
            outputs: OnceBiVec::new(min_degree),
            kernel: OnceBiVec::new(min_degree),
            quasi_inverse: OnceBiVec::new(min_degree),
            min_degree,
            lock: Mutex::new(()),
            degree_shift,
        }
    }

    /// The first generator degree whose outputs are not yet known.
    pub fn next_degree(&self) -> i32 {
        self.outputs.len()
    }

    pub fn output(&self, generator_degree: i32, generator_index: usize) -> &FpVector {
        assert!(
            generator_degree >= self.min_degree,
            "generator_degree {generator_degree} less than min degree {}",
            self.min_degree
        );
        assert!(
            generator_index < self.source.number_of_gens_in_degree(generator_degree),
            "generator_index {generator_index} greater than number of generators {}",
            self.source.number_of_gens_in_degree(generator_degree)
        );
        &self.outputs[generator_degree][generator_index]
    }

    /// Send every generator of degree at most `degree` whose output is unset to zero.
    pub fn extend_by_zero(&self, degree: i32) {
        let _lock = self.lock.lock();

        if degree < self.min_degree {
            return;
        }

        let p = self.prime();
        self.outputs.extend(degree, |i| {
            let num_gens = self.source.number_of_gens_in_degree(i);
            let dimension = self.target.dimension(i - self.degree_shift);
            (0..num_gens).map(|_| FpVector::new(p, dimension)).collect()
        });
    }

    /// Set the outputs of the generators in degree `degree`. There must be exactly one row per
    /// generator, of the dimension of the target in degree `degree - degree_shift`.
    pub fn add_generators_from_rows(&self, degree: i32, rows: Vec<FpVector>) {
        let _lock = self.lock.lock();
        debug_assert_eq!(rows.len(), self.source.number_of_gens_in_degree(degree));
        debug_assert!(rows
            .iter()
            .all(|r| r.len() == self.target.dimension(degree - self.degree_shift)));
        self.outputs.push_checked(rows, degree);
    }

    pub fn set_kernel(&self, degree: i32, kernel: Subspace) {
        self.kernel.push_checked(kernel, degree);
    }

    pub fn set_quasi_inverse(&self, degree: i32, quasi_inverse: QuasiInverse) {
        self.quasi_inverse.push_checked(quasi_inverse, degree);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Algebra, MilnorAlgebra};
    use crate::module::{FDModule, FDModuleBuilder};
    use fp::matrix::Matrix;
    use fp::prime::ValidPrime;

    fn setup() -> (Arc<FreeModule<MilnorAlgebra>>, Arc<FDModule<MilnorAlgebra>>) {
        let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(2)));
        algebra.compute_basis(6);
        let c2 = FDModuleBuilder::new(Arc::clone(&algebra))
            .add_generator(0, "x0")
            .and_then(|b| b.add_generator(1, "x1"))
            .and_then(|b| b.add_action("Sq1 x0 = x1"))
            .and_then(|b| b.build())
            .unwrap();
        let free = FreeModule::new(algebra, "F".to_owned(), 0);
        free.extend_table_entries(0);
        free.add_generators(0, 1, None);
        free.extend_table_entries(4);
        for t in 1..=4 {
            free.add_generators(t, 0, None);
        }
        (Arc::new(free), Arc::new(c2))
    }

    #[test]
    fn apply_to_basis_element() {
        let (free, c2) = setup();
        let p = free.prime();
        let hom = FreeModuleHomomorphism::new(Arc::clone(&free), Arc::clone(&c2), 0);
        assert_eq!(hom.next_degree(), 0);
        hom.add_generators_from_rows(0, vec![FpVector::from_slice(p, &[1])]);
        hom.extend_by_zero(4);
        assert_eq!(hom.next_degree(), 5);

        let mut result = FpVector::new(p, 1);
        // Sq1 x_{0,0} |-> Sq1 x0 = x1
        hom.apply_to_basis_element(result.as_slice_mut(), 1, 1, 0);
        assert_eq!(result.entry(0), 1);

        let mut matrix = Matrix::new(p, free.dimension(2), c2.dimension(2));
        hom.get_matrix(matrix.slice_mut(0, 0), 2);
        assert_eq!(matrix.rows(), 1);
        assert_eq!(matrix.columns(), 0);
    }

    #[test]
    fn kernel_is_optional() {
        let (free, c2) = setup();
        let hom = FreeModuleHomomorphism::new(free, c2, 0);
        assert!(hom.kernel(0).is_none());
        assert!(hom.quasi_inverse(0).is_none());
        hom.set_kernel(0, Subspace::empty_space(hom.prime(), 1));
        assert_eq!(hom.kernel(0).map(Subspace::dimension), Some(0));
    }

    #[test]
    fn min_degree_with_shift() {
        let (free, c2) = setup();
        let hom = FreeModuleHomomorphism::new(free, c2, 2);
        assert_eq!(ModuleHomomorphism::min_degree(&hom), 2);
        // generators below the minimum degree map to zero without being recorded
        let mut result = FpVector::new(hom.prime(), 1);
        hom.extend_by_zero(3);
        hom.apply_to_basis_element(result.as_slice_mut(), 1, 3, 0);
        assert!(result.is_zero());
        assert_eq!(hom.source().algebra().prime(), 2);
    }
}
