//! Traits for the chain complexes built by this crate. A [`crate::resolution::Resolution`] is the
//! only implementor, but the lifting code in [`crate::resolution_homomorphism`] only relies on
//! what is described here.

use std::sync::Arc;

use algebra::module::homomorphism::{FreeModuleHomomorphism, ModuleHomomorphism};
use algebra::module::{FreeModule, Module};
use algebra::Algebra;
use fp::prime::ValidPrime;
use itertools::Itertools;

use crate::utils::unicode_num;

/// A chain complex is defined to start in degree 0. The min_degree is the min_degree of the
/// modules in the chain complex, all of which must be the same.
pub trait ChainComplex: Send + Sync {
    type Algebra: Algebra;
    type Module: Module<Algebra = Self::Algebra>;
    type Homomorphism: ModuleHomomorphism<Source = Self::Module, Target = Self::Module>;

    fn prime(&self) -> ValidPrime {
        self.algebra().prime()
    }

    fn algebra(&self) -> Arc<Self::Algebra>;
    fn min_degree(&self) -> i32;
    fn zero_module(&self) -> Arc<Self::Module>;
    fn module(&self, s: u32) -> Arc<Self::Module>;

    /// This returns the differential starting from the sth module. The differential out of the
    /// 0th module goes to [`ChainComplex::zero_module`].
    fn differential(&self, s: u32) -> Arc<Self::Homomorphism>;

    /// If the complex has been computed at bidegree (s, t). This means the module has been
    /// computed at (s, t), and so has the differential at (s, t).
    fn has_computed_bidegree(&self, s: u32, t: i32) -> bool;

    /// Ensure all bidegrees less than or equal to (s, t) have been computed
    fn compute_through_bidegree(&self, s: u32, t: i32) -> error::Result<()>;

    /// The first s such that `self.module(s)` is not defined.
    fn next_homological_degree(&self) -> u32;
}

pub trait FreeChainComplex:
    ChainComplex<
    Module = FreeModule<<Self as ChainComplex>::Algebra>,
    Homomorphism = FreeModuleHomomorphism<FreeModule<<Self as ChainComplex>::Algebra>>,
>
{
    /// A chart of the number of generators, one line per `s`, with the largest `s` at the top.
    /// Within a line, the `n`th entry is the bidegree `(s, s + n + min_degree)`.
    fn graded_dimension_string(&self) -> String {
        let mut result = String::new();
        let min_degree = self.min_degree();
        for s in (0..self.next_homological_degree()).rev() {
            let module = self.module(s);

            let line = (min_degree + s as i32..=module.max_computed_degree())
                .map(|t| unicode_num(module.number_of_gens_in_degree(t)))
                .join(" ");
            result.push_str(line.trim_end());
            result.push('\n');
            // If it is empty so far, don't print anything
            if result.trim_start().is_empty() {
                result.clear()
            }
        }
        result
    }

    fn number_of_gens_in_bidegree(&self, s: u32, t: i32) -> usize {
        self.module(s).number_of_gens_in_degree(t)
    }

    /// Get a string representation of d(gen), where d is the differential of the resolution.
    fn boundary_string(&self, s: u32, t: i32, idx: usize) -> String {
        let d = self.differential(s);
        let target = d.target();
        target.element_to_string(t, d.output(t, idx).as_slice())
    }
}

impl<CC> FreeChainComplex for CC where
    CC: ChainComplex<
        Module = FreeModule<<CC as ChainComplex>::Algebra>,
        Homomorphism = FreeModuleHomomorphism<FreeModule<<CC as ChainComplex>::Algebra>>,
    >
{
}

/// A chain complex with a quasi-isomorphism to a module concentrated in homological degree 0,
/// given by the augmentation out of the 0th module. We usually think of the complex as a
/// resolution of the module.
pub trait AugmentedChainComplex: ChainComplex {
    type TargetModule: Module<Algebra = Self::Algebra>;

    fn target(&self) -> Arc<Self::TargetModule>;
    fn augmentation(&self) -> Arc<FreeModuleHomomorphism<Self::TargetModule>>;
}
