//! Linear algebra over prime fields: vectors, matrices and the row reduction routines that
//! kernels, images and quasi-inverses are built from.

pub mod matrix;
pub mod prime;
pub mod vector;
