use std::fmt;
use std::ops::{Index, IndexMut};

/// A vector indexed by degrees starting at an arbitrary, possibly negative, `min_degree`.
///
/// `len()` is one more than the largest valid index, not the number of entries. For example if
/// `min_degree = -2` and `len() = 3`, the valid indices are `-2, -1, 0, 1, 2`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BiVec<T> {
    data: Vec<T>,
    min_degree: i32,
}

impl<T: fmt::Debug> fmt::Debug for BiVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BiVec({}) ", self.min_degree)?;
        self.data.fmt(f)
    }
}

impl<T> Default for BiVec<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> BiVec<T> {
    pub const fn new(min_degree: i32) -> Self {
        Self {
            data: Vec::new(),
            min_degree,
        }
    }

    pub fn from_vec(min_degree: i32, data: Vec<T>) -> Self {
        Self { data, min_degree }
    }

    pub fn with_capacity(min_degree: i32, capacity: i32) -> Self {
        Self {
            data: Vec::with_capacity((capacity - min_degree).max(0) as usize),
            min_degree,
        }
    }

    pub const fn min_degree(&self) -> i32 {
        self.min_degree
    }

    /// The largest valid index, i.e. `len() - 1`.
    ///
    /// ```
    /// # use bivec::BiVec;
    /// let v = BiVec::from_vec(-2, vec![3, 4, 6, 8, 2]);
    /// assert_eq!(v.max_degree(), 2);
    /// ```
    pub fn max_degree(&self) -> i32 {
        self.len() - 1
    }

    /// The smallest `i` such that `v[i]` is not defined.
    ///
    /// ```
    /// # use bivec::BiVec;
    /// let v = BiVec::from_vec(-2, vec![3, 4, 6, 8, 2]);
    /// assert_eq!(v.len(), 3);
    /// ```
    pub fn len(&self) -> i32 {
        self.data.len() as i32 + self.min_degree
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push(&mut self, x: T) {
        self.data.push(x);
    }

    pub fn get(&self, idx: i32) -> Option<&T> {
        if idx < self.min_degree {
            return None;
        }
        self.data.get((idx - self.min_degree) as usize)
    }

    pub fn get_mut(&mut self, idx: i32) -> Option<&mut T> {
        if idx < self.min_degree {
            return None;
        }
        self.data.get_mut((idx - self.min_degree) as usize)
    }

    pub fn last(&self) -> Option<&T> {
        self.data.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Iterate over `(degree, entry)` pairs.
    pub fn iter_enum(&self) -> impl DoubleEndedIterator<Item = (i32, &T)> + '_ {
        let min_degree = self.min_degree;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, t)| (i as i32 + min_degree, t))
    }

    pub fn range(&self) -> std::ops::Range<i32> {
        self.min_degree..self.len()
    }
}

impl<T: Clone> BiVec<T> {
    /// Make `degree` a valid index, filling the new entries with `value`.
    pub fn extend_with(&mut self, degree: i32, value: T) {
        if degree >= self.len() {
            self.data
                .resize((degree - self.min_degree + 1) as usize, value);
        }
    }
}

impl<T> Index<i32> for BiVec<T> {
    type Output = T;

    fn index(&self, i: i32) -> &T {
        assert!(
            i >= self.min_degree,
            "index {i} below minimum degree {}",
            self.min_degree
        );
        &self.data[(i - self.min_degree) as usize]
    }
}

impl<T> IndexMut<i32> for BiVec<T> {
    fn index_mut(&mut self, i: i32) -> &mut T {
        assert!(
            i >= self.min_degree,
            "index {i} below minimum degree {}",
            self.min_degree
        );
        &mut self.data[(i - self.min_degree) as usize]
    }
}

impl<'a, T> IntoIterator for &'a BiVec<T> {
    type IntoIter = std::slice::Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_indices() {
        let mut v = BiVec::new(-3);
        v.push('a');
        v.push('b');
        assert_eq!(v.len(), -1);
        assert_eq!(v[-2], 'b');
        assert_eq!(v.get(-4), None);
        assert_eq!(v.get(-1), None);

        v.extend_with(1, 'z');
        assert_eq!(v.max_degree(), 1);
        assert_eq!(v[0], 'z');
        assert_eq!(
            v.iter_enum().map(|(d, _)| d).collect::<Vec<_>>(),
            vec![-3, -2, -1, 0, 1]
        );
    }
}
