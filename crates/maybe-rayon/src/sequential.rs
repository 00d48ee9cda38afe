pub mod prelude {
    pub trait IntoMaybeParallelIterator: IntoIterator + Sized {
        fn into_maybe_par_iter(self) -> Self::IntoIter {
            self.into_iter()
        }
    }

    impl<I: IntoIterator> IntoMaybeParallelIterator for I {}
}
