use std::sync::Arc;

use fp::matrix::{MatrixSliceMut, QuasiInverse, Subspace};
use fp::prime::ValidPrime;
use fp::vector::{Slice, SliceMut};

use crate::module::Module;

mod fd_module_homomorphism;
mod free_module_homomorphism;

pub use fd_module_homomorphism::{FDModuleHomomorphism, FDModuleHomomorphismBuilder};
pub use free_module_homomorphism::FreeModuleHomomorphism;

/// A homomorphism of modules over the same algebra. A homomorphism with degree shift `k` sends
/// degree `t` of the source to degree `t - k` of the target.
///
/// A `ModuleHomomorphism` may come with the kernel and a quasi-inverse at each degree (the
/// quasi-inverse is a map that is a right inverse when restricted to the image). These are
/// retrieved through [`ModuleHomomorphism::kernel`] and [`ModuleHomomorphism::quasi_inverse`],
/// and need not be available.
pub trait ModuleHomomorphism: Send + Sync {
    type Source: Module;
    type Target: Module<Algebra = <Self::Source as Module>::Algebra>;

    fn source(&self) -> Arc<Self::Source>;
    fn target(&self) -> Arc<Self::Target>;
    fn degree_shift(&self) -> i32;

    /// Add `coeff` times the image of the basis element `input_idx` to `result`. The length of
    /// `result` must be the dimension of the target in degree `input_degree - degree_shift`.
    fn apply_to_basis_element(
        &self,
        result: SliceMut,
        coeff: u32,
        input_degree: i32,
        input_idx: usize,
    );

    #[allow(unused_variables)]
    fn kernel(&self, degree: i32) -> Option<&Subspace> {
        None
    }

    #[allow(unused_variables)]
    fn quasi_inverse(&self, degree: i32) -> Option<&QuasiInverse> {
        None
    }

    fn apply(&self, mut result: SliceMut, coeff: u32, input_degree: i32, input: Slice) {
        let p = self.prime();
        for (i, v) in input.iter_nonzero() {
            self.apply_to_basis_element(result.copy(), p.product(coeff, v), input_degree, i);
        }
    }

    fn prime(&self) -> ValidPrime {
        self.source().prime()
    }

    fn min_degree(&self) -> i32 {
        self.source().min_degree()
    }

    /// Write the matrix of the homomorphism at input degree `degree` to `matrix`.
    ///
    /// The (sliced) dimensions of `matrix` must be equal to source_dimension x
    /// target_dimension
    fn get_matrix(&self, mut matrix: MatrixSliceMut, degree: i32) {
        if self.target().dimension(degree - self.degree_shift()) == 0 {
            return;
        }

        assert_eq!(self.source().dimension(degree), matrix.rows());
        assert_eq!(
            self.target().dimension(degree - self.degree_shift()),
            matrix.columns()
        );

        for (i, row) in matrix.iter_mut().enumerate() {
            self.apply_to_basis_element(row, 1, degree, i);
        }
    }
}
