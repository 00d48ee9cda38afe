//! Append-only vectors that can be read while another thread pushes.
//!
//! Entries live in pages whose sizes double, so a pushed entry never moves and references handed
//! out by [`OnceVec::get`] stay valid for the lifetime of the vector. Pushes are serialized by a
//! mutex; reads never lock.

use std::ops::Index;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::Mutex;

const NUM_PAGES: usize = usize::BITS as usize;

/// Page `k` stores the indices `2^k - 1 .. 2^(k + 1) - 1`.
fn locate(index: usize) -> (usize, usize) {
    let shifted = index + 1;
    let page = (usize::BITS - 1 - shifted.leading_zeros()) as usize;
    (page, shifted - (1 << page))
}

pub struct OnceVec<T> {
    pages: [OnceLock<Box<[OnceLock<T>]>>; NUM_PAGES],
    len: AtomicUsize,
    lock: Mutex<()>,
}

impl<T> Default for OnceVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for OnceVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Clone> Clone for OnceVec<T> {
    fn clone(&self) -> Self {
        Self::from_vec(self.iter().cloned().collect())
    }
}

impl<T: PartialEq> PartialEq for OnceVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T: Eq> Eq for OnceVec<T> {}

impl<T> OnceVec<T> {
    pub fn new() -> Self {
        Self {
            pages: std::array::from_fn(|_| OnceLock::new()),
            len: AtomicUsize::new(0),
            lock: Mutex::new(()),
        }
    }

    pub fn from_vec(v: Vec<T>) -> Self {
        let result = Self::new();
        for x in v {
            result.push(x);
        }
        result
    }

    /// The number of entries that are visible to readers.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let (page, offset) = locate(index);
        self.pages[page].get()?[offset].get()
    }

    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Append `value` and return its index.
    pub fn push(&self, value: T) -> usize {
        let _guard = self.lock.lock();
        self.push_locked(value)
    }

    /// Append `value`, asserting that it lands at `index`. Use this when several writers race
    /// to fill the same slot and the caller has already established who wins.
    pub fn push_checked(&self, value: T, index: usize) {
        let _guard = self.lock.lock();
        assert_eq!(self.len(), index, "out-of-order push into OnceVec");
        self.push_locked(value);
    }

    fn push_locked(&self, value: T) -> usize {
        let index = self.len.load(Ordering::Acquire);
        let (page, offset) = locate(index);
        let slots = self.pages[page]
            .get_or_init(|| (0..1usize << page).map(|_| OnceLock::new()).collect());
        if slots[offset].set(value).is_err() {
            unreachable!("slot {index} of OnceVec written twice");
        }
        self.len.store(index + 1, Ordering::Release);
        index
    }

    /// Push `f(i)` for every `i` from the current length up to and including `max`.
    pub fn extend(&self, max: usize, mut f: impl FnMut(usize) -> T) {
        let _guard = self.lock.lock();
        for i in self.len()..=max {
            self.push_locked(f(i));
        }
    }

    /// Iterate over the entries present when the iterator was created.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        (0..self.len()).map(move |i| &self[i])
    }
}

impl<T> Index<usize> for OnceVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(x) => x,
            None => panic!(
                "index {index} out of bounds for OnceVec of length {}",
                self.len()
            ),
        }
    }
}

/// A [`OnceVec`] indexed from an arbitrary minimum degree.
pub struct OnceBiVec<T> {
    data: OnceVec<T>,
    min_degree: i32,
}

impl<T: std::fmt::Debug> std::fmt::Debug for OnceBiVec<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OnceBiVec({}) ", self.min_degree)?;
        self.data.fmt(f)
    }
}

impl<T: Clone> Clone for OnceBiVec<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            min_degree: self.min_degree,
        }
    }
}

impl<T: PartialEq> PartialEq for OnceBiVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.min_degree == other.min_degree && self.data == other.data
    }
}

impl<T> OnceBiVec<T> {
    pub fn new(min_degree: i32) -> Self {
        Self {
            data: OnceVec::new(),
            min_degree,
        }
    }

    pub const fn min_degree(&self) -> i32 {
        self.min_degree
    }

    /// One more than the largest index present.
    pub fn len(&self) -> i32 {
        self.data.len() as i32 + self.min_degree
    }

    pub fn max_degree(&self) -> i32 {
        self.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: i32) -> Option<&T> {
        if index < self.min_degree {
            return None;
        }
        self.data.get((index - self.min_degree) as usize)
    }

    pub fn last(&self) -> Option<&T> {
        self.data.last()
    }

    /// Append `value` and return the degree it was stored at.
    pub fn push(&self, value: T) -> i32 {
        self.data.push(value) as i32 + self.min_degree
    }

    pub fn push_checked(&self, value: T, index: i32) {
        assert!(index >= self.min_degree);
        self.data
            .push_checked(value, (index - self.min_degree) as usize);
    }

    /// Push `f(i)` for every degree `i` from `len()` up to and including `max`.
    pub fn extend(&self, max: i32, mut f: impl FnMut(i32) -> T) {
        if max < self.min_degree {
            return;
        }
        let min_degree = self.min_degree;
        self.data.extend((max - min_degree) as usize, |i| {
            f(i as i32 + min_degree)
        });
    }

    pub fn range(&self) -> std::ops::Range<i32> {
        self.min_degree..self.len()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.data.iter()
    }

    pub fn iter_enum(&self) -> impl DoubleEndedIterator<Item = (i32, &T)> + '_ {
        let min_degree = self.min_degree;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, t)| (i as i32 + min_degree, t))
    }
}

impl<T> Index<i32> for OnceBiVec<T> {
    type Output = T;

    fn index(&self, index: i32) -> &T {
        match self.get(index) {
            Some(x) => x,
            None => panic!(
                "index {index} out of bounds for OnceBiVec with range {:?}",
                self.range()
            ),
        }
    }
}
