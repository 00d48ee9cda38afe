//! Traits describing algebras, and the Milnor basis implementation of the Steenrod algebra.

mod algebra_trait;
pub use algebra_trait::{Algebra, Bialgebra, GeneratedAlgebra};

pub mod combinatorics;

pub mod milnor_algebra;
pub use milnor_algebra::{MilnorAlgebra, MilnorBasisElement};
