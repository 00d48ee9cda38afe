//! A facade over `rayon`. With the `concurrent` feature the iterators dispatch to the rayon thread
//! pool; without it they are ordinary sequential iterators, so callers can be written once.

#[cfg(feature = "concurrent")]
mod concurrent;
#[cfg(feature = "concurrent")]
pub use concurrent::*;

#[cfg(not(feature = "concurrent"))]
mod sequential;
#[cfg(not(feature = "concurrent"))]
pub use sequential::*;
