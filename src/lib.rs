//! Minimal free resolutions of finite modules over the Steenrod algebra, and chain maps between
//! them lifted from module homomorphisms.
//!
//! The usual workflow is
//!  1. Build a module with [`algebra::module::FDModuleBuilder`], or read one with
//!     [`utils::construct`].
//!  2. Resolve it with [`resolution::Resolution::resolve_through_degree`].
//!  3. Build a map of modules with
//!     [`algebra::module::homomorphism::FDModuleHomomorphismBuilder`] and lift it with
//!     [`resolution_homomorphism::ResolutionHomomorphism::from_module_homomorphism`].

#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![warn(clippy::default_trait_access)]
#![warn(clippy::if_not_else)]
#![warn(clippy::needless_continue)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::explicit_iter_loop)]

pub mod chain_complex;
pub mod resolution;
pub mod resolution_homomorphism;
pub mod utils;

pub use error::{Error, Result};
