//! This module exports the [`Resolution`] object, which is a chain complex resolving a module. In
//! particular, this contains the core logic that computes minimal resolutions.
use std::sync::Arc;

use algebra::module::homomorphism::{FreeModuleHomomorphism, ModuleHomomorphism};
use algebra::module::{FreeModule, Module};
use algebra::Algebra;
use fp::matrix::{AugmentedMatrix, Subspace};
use fp::vector::{FpVector, Slice};
use maybe_rayon::prelude::*;
use once::OnceVec;
use parking_lot::Mutex;

use crate::chain_complex::{AugmentedChainComplex, ChainComplex};

/// A minimal free resolution of a module. [`Resolution::compute_through_bidegree`] and
/// [`Resolution::resolve_through_degree`] extend the resolution; both only ever add to what has
/// been computed.
pub struct Resolution<M: Module> {
    name: String,
    lock: Mutex<()>,
    module: Arc<M>,
    modules: OnceVec<Arc<FreeModule<M::Algebra>>>,
    zero_module: Arc<FreeModule<M::Algebra>>,
    augmentation: Arc<FreeModuleHomomorphism<M>>,
    differentials: OnceVec<Arc<FreeModuleHomomorphism<FreeModule<M::Algebra>>>>,
    degree_budget: Option<i32>,
}

impl<M: Module> Resolution<M> {
    pub fn new(module: Arc<M>) -> Self {
        let algebra = module.algebra();
        let min_degree = module.min_degree();
        let zero_module = Arc::new(FreeModule::new(
            Arc::clone(&algebra),
            "F_{-1}".to_owned(),
            min_degree,
        ));
        let first = Arc::new(FreeModule::new(algebra, "F_0".to_owned(), min_degree));
        let augmentation = Arc::new(FreeModuleHomomorphism::new(
            Arc::clone(&first),
            Arc::clone(&module),
            0,
        ));

        let modules = OnceVec::new();
        let differentials = OnceVec::new();
        differentials.push(Arc::new(FreeModuleHomomorphism::new(
            Arc::clone(&first),
            Arc::clone(&zero_module),
            0,
        )));
        modules.push(first);

        Self {
            name: format!("Resolution of {module}"),
            lock: Mutex::new(()),
            module,
            modules,
            zero_module,
            augmentation,
            differentials,
            degree_budget: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Refuse to compute past internal degree `budget`. Requests beyond it fail with
    /// [`error::Error::DegreeBudgetExceeded`].
    pub fn set_degree_budget(&mut self, budget: Option<i32>) {
        self.degree_budget = budget;
    }

    /// Compute stages `0..=max_degree` in internal degrees up to `max_degree`.
    pub fn resolve_through_degree(&self, max_degree: i32) -> error::Result<()> {
        self.compute_through_bidegree(std::cmp::max(max_degree, 0) as u32, max_degree)
    }

    /// This function prepares the Resolution object to perform computations up to the
    /// specified s degree. It does *not* perform any computations by itself.
    fn extend_through_degree(&self, max_s: u32) {
        let min_degree = self.min_degree();

        for s in self.modules.len() as u32..=max_s {
            let module = Arc::new(FreeModule::new(
                self.algebra(),
                format!("F_{s}"),
                min_degree,
            ));
            self.differentials.push(Arc::new(FreeModuleHomomorphism::new(
                Arc::clone(&module),
                Arc::clone(&self.modules[s as usize - 1]),
                0,
            )));
            self.modules.push(module);
        }
    }

    /// The kernel of the map out of the `s`th module at degree `t`. For `s = 0` this is the kernel
    /// of the augmentation.
    fn kernel(&self, s: u32, t: i32) -> &Subspace {
        let kernel = if s == 0 {
            self.augmentation.kernel(t)
        } else {
            self.differentials[s as usize].kernel(t)
        };
        kernel.unwrap_or_else(|| panic!("kernel at ({s}, {t}) requested before it was computed"))
    }

    /// Add generators to the `s`th module in degree `t` until the image of `d` contains the
    /// subspace `to_hit` of the target. Records the kernel and a quasi-inverse of `d` at `t`.
    ///
    /// The kernel of `d` is computed before any generator is added: new generators map to
    /// vectors that are independent modulo the old image, so they never contribute to it.
    fn add_generators_hitting<T: Module<Algebra = M::Algebra>>(
        &self,
        s: u32,
        t: i32,
        d: &FreeModuleHomomorphism<T>,
        to_hit: Option<&Subspace>,
    ) -> usize {
        let p = self.prime();
        let source = d.source();
        let target = d.target();

        source.extend_table_entries(t);
        let source_dimension = source.dimension(t);
        let target_dimension = target.dimension(t);

        let mut matrix =
            AugmentedMatrix::<2>::new(p, source_dimension, [target_dimension, source_dimension]);
        d.get_matrix(matrix.segment(0, 0), t);
        matrix.segment(1, 1).add_identity();
        matrix.row_reduce();
        let kernel = matrix.compute_kernel();

        // Walk the reduced basis of `to_hit` in pivot order, keeping the vectors whose pivot is
        // not already an image pivot.
        let image_pivots = &matrix.pivots()[..target_dimension];
        let new_outputs: Vec<FpVector> = match to_hit {
            Some(to_hit) => to_hit
                .iter()
                .filter(|row| {
                    row.first_nonzero()
                        .is_some_and(|(column, _)| image_pivots[column] < 0)
                })
                .map(Slice::to_owned)
                .collect(),
            None => (0..target_dimension)
                .filter(|&column| image_pivots[column] < 0)
                .map(|column| {
                    let mut v = FpVector::new(p, target_dimension);
                    v.set_entry(column, 1);
                    v
                })
                .collect(),
        };
        let num_new_gens = new_outputs.len();
        let new_dimension = source_dimension + num_new_gens;

        source.add_generators(t, num_new_gens, None);
        d.add_generators_from_rows(t, new_outputs);

        let kernel_rows = kernel
            .iter()
            .map(|row| {
                let mut row = row.to_owned();
                row.extend_len(new_dimension);
                row
            })
            .collect();
        d.set_kernel(t, Subspace::from_rows(p, new_dimension, kernel_rows));

        let mut matrix =
            AugmentedMatrix::<2>::new(p, new_dimension, [target_dimension, new_dimension]);
        d.get_matrix(matrix.segment(0, 0), t);
        matrix.segment(1, 1).add_identity();
        matrix.row_reduce();
        d.set_quasi_inverse(t, matrix.compute_quasi_inverse());

        if num_new_gens > 0 {
            tracing::info!(s, t, num_new_gens, "added generators");
        }
        num_new_gens
    }

    /// Compute the bidegree `(s, t)`. This requires `(s, t - 1)` and `(s - 1, t)` to have been
    /// computed.
    ///
    /// For `s = 0` the new generators hit the whole of the module in degree `t`; otherwise they
    /// hit the kernel of the previous differential.
    #[tracing::instrument(skip(self), fields(resolution = %self.name))]
    fn step_resolution(&self, s: u32, t: i32) {
        if self.has_computed_bidegree(s, t) {
            return;
        }
        if s == 0 {
            self.zero_module.extend_table_entries(t);
            self.add_generators_hitting(0, t, &self.augmentation, None);
            self.differentials[0].extend_by_zero(t);
        } else {
            let to_hit = self.kernel(s - 1, t);
            self.add_generators_hitting(s, t, &self.differentials[s as usize], Some(to_hit));
        }
    }
}

impl<M: Module> ChainComplex for Resolution<M> {
    type Algebra = M::Algebra;
    type Module = FreeModule<M::Algebra>;
    type Homomorphism = FreeModuleHomomorphism<FreeModule<M::Algebra>>;

    fn algebra(&self) -> Arc<Self::Algebra> {
        self.module.algebra()
    }

    fn min_degree(&self) -> i32 {
        self.module.min_degree()
    }

    fn zero_module(&self) -> Arc<Self::Module> {
        Arc::clone(&self.zero_module)
    }

    fn module(&self, s: u32) -> Arc<Self::Module> {
        Arc::clone(&self.modules[s as usize])
    }

    fn differential(&self, s: u32) -> Arc<Self::Homomorphism> {
        Arc::clone(&self.differentials[s as usize])
    }

    fn has_computed_bidegree(&self, s: u32, t: i32) -> bool {
        self.differentials
            .get(s as usize)
            .is_some_and(|d| d.next_degree() > t)
    }

    /// Bidegrees on an anti-diagonal `s + t = k` only depend on the previous anti-diagonal, so
    /// each anti-diagonal is computed in parallel, one after the other.
    fn compute_through_bidegree(&self, max_s: u32, max_t: i32) -> error::Result<()> {
        if let Some(budget) = self.degree_budget {
            if max_t > budget {
                return Err(error::Error::DegreeBudgetExceeded {
                    requested: max_t,
                    budget,
                });
            }
        }
        let min_degree = self.min_degree();
        self.algebra()
            .ensure_degree(std::cmp::max(0, max_t - min_degree))?;

        let _lock = self.lock.lock();
        self.extend_through_degree(max_s);
        self.module.compute_basis(max_t);

        for diagonal in 0..=(max_s as i32 + max_t - min_degree) {
            let bidegrees: Vec<(u32, i32)> = (0..=max_s)
                .map(|s| (s, min_degree + diagonal - s as i32))
                .filter(|&(s, t)| {
                    t >= min_degree && t <= max_t && !self.has_computed_bidegree(s, t)
                })
                .collect();
            bidegrees
                .into_maybe_par_iter()
                .for_each(|(s, t)| self.step_resolution(s, t));
        }
        tracing::debug!(max_s, max_t, resolution = %self.name, "computed through bidegree");
        Ok(())
    }

    fn next_homological_degree(&self) -> u32 {
        self.modules.len() as u32
    }
}

impl<M: Module> AugmentedChainComplex for Resolution<M> {
    type TargetModule = M;

    fn target(&self) -> Arc<M> {
        Arc::clone(&self.module)
    }

    fn augmentation(&self) -> Arc<FreeModuleHomomorphism<M>> {
        Arc::clone(&self.augmentation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_complex::FreeChainComplex;
    use algebra::module::{FDModule, FDModuleBuilder};
    use algebra::MilnorAlgebra;
    use expect_test::expect;
    use fp::prime::ValidPrime;
    use rstest::rstest;

    fn sphere(p: u32) -> Arc<FDModule<MilnorAlgebra>> {
        let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(p)));
        let module = FDModuleBuilder::new(algebra)
            .set_name("S")
            .add_generator(0, "x0")
            .unwrap()
            .build()
            .unwrap();
        Arc::new(module)
    }

    #[test]
    fn sphere_chart() {
        let res = Resolution::new(sphere(2));
        res.resolve_through_degree(6).unwrap();
        expect![[r#"
            ·
            ·
            ·
            ·     ·
            ·   · ·
            · ·   ·
            ·
        "#]]
        .assert_eq(&res.graded_dimension_string());
    }

    #[test]
    fn restart() {
        let res = Resolution::new(sphere(2));
        res.compute_through_bidegree(3, 10).unwrap();
        res.compute_through_bidegree(6, 4).unwrap();
        res.resolve_through_degree(6).unwrap();

        let fresh = Resolution::new(sphere(2));
        fresh.resolve_through_degree(6).unwrap();
        for s in 0..=6 {
            for t in 0..=6 {
                assert_eq!(
                    res.number_of_gens_in_bidegree(s, t),
                    fresh.number_of_gens_in_bidegree(s, t),
                    "({s}, {t})"
                );
            }
        }
        // (3, 10) was computed by the first call and is kept.
        assert!(res.has_computed_bidegree(3, 10));
        assert!(!fresh.has_computed_bidegree(3, 10));
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    fn d_squared_is_zero(#[case] p: u32) {
        let res = Resolution::new(sphere(p));
        let max = 12;
        res.resolve_through_degree(max).unwrap();

        for s in 1..=max as u32 {
            let d = res.differential(s);
            let prev = res.differential(s - 1);
            let augmentation = res.augmentation();
            for t in 0..=max {
                for idx in 0..res.number_of_gens_in_bidegree(s, t) {
                    let dx = d.output(t, idx);
                    if s == 1 {
                        let mut result = FpVector::new(res.prime(), res.target().dimension(t));
                        augmentation.apply(result.as_slice_mut(), 1, t, dx.as_slice());
                        assert!(result.is_zero(), "(1, {t}, {idx})");
                    } else {
                        let mut result =
                            FpVector::new(res.prime(), res.module(s - 2).dimension(t));
                        prev.apply(result.as_slice_mut(), 1, t, dx.as_slice());
                        assert!(result.is_zero(), "({s}, {t}, {idx})");
                    }
                }
            }
        }
    }

    #[test]
    fn minimal() {
        // A differential lands in the augmentation ideal exactly when no generator is sent to a
        // non-zero multiple of a generator.
        let res = Resolution::new(sphere(2));
        res.resolve_through_degree(10).unwrap();
        for s in 1..=10 {
            let target = res.module(s - 1);
            for t in 0..=10 {
                for idx in 0..res.number_of_gens_in_bidegree(s, t) {
                    let d = res.differential(s);
                    let dx = d.output(t, idx);
                    for j in 0..target.number_of_gens_in_degree(t) {
                        let k = target.operation_generator_to_index(0, 0, t, j);
                        assert_eq!(dx.entry(k), 0, "({s}, {t}, {idx})");
                    }
                }
            }
        }
    }

    #[test]
    fn boundary() {
        let res = Resolution::new(sphere(2));
        res.resolve_through_degree(2).unwrap();
        assert_eq!(res.boundary_string(1, 1, 0), "Sq(1) x_{0,0}");
        assert_eq!(res.boundary_string(1, 2, 0), "Sq(2) x_{0,0}");
    }

    #[test]
    fn budget() {
        let mut res = Resolution::new(sphere(2));
        res.set_degree_budget(Some(5));
        res.resolve_through_degree(5).unwrap();
        assert!(matches!(
            res.resolve_through_degree(6),
            Err(error::Error::DegreeBudgetExceeded {
                requested: 6,
                budget: 5
            })
        ));
        assert!(!res.has_computed_bidegree(0, 6));
    }

    #[test]
    fn insufficient_algebra() {
        let algebra = Arc::new(MilnorAlgebra::with_max_degree(ValidPrime::new(2), 4));
        let module = FDModuleBuilder::new(algebra)
            .add_generator(0, "x0")
            .unwrap()
            .build()
            .unwrap();
        let res = Resolution::new(Arc::new(module));
        res.resolve_through_degree(4).unwrap();
        assert!(matches!(
            res.resolve_through_degree(5),
            Err(error::Error::InsufficientAlgebraData {
                requested: 5,
                available: 4
            })
        ));
    }
}
