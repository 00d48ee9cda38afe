pub mod prelude {
    pub use rayon::iter::{IndexedParallelIterator, ParallelIterator};
    use rayon::prelude::*;

    pub trait IntoMaybeParallelIterator: IntoParallelIterator {
        fn into_maybe_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoParallelIterator> IntoMaybeParallelIterator for I {
        fn into_maybe_par_iter(self) -> Self::Iter {
            self.into_par_iter()
        }
    }
}
