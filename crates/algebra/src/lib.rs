//! Types and traits for working with the Steenrod algebra and its modules.

pub mod module;
pub mod steenrod_parser;

mod algebra;
pub use crate::algebra::*;
