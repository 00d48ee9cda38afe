//! Dense vectors over `F_p`, together with borrowed views into them.
//!
//! Entries are stored one per `u32` and are always reduced mod p.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::prime::ValidPrime;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FpVector {
    p: ValidPrime,
    entries: Vec<u32>,
}

/// An immutable view into a contiguous range of an [`FpVector`].
#[derive(Clone, Copy)]
pub struct Slice<'a> {
    p: ValidPrime,
    entries: &'a [u32],
}

/// A mutable view into a contiguous range of an [`FpVector`].
pub struct SliceMut<'a> {
    p: ValidPrime,
    entries: &'a mut [u32],
}

impl FpVector {
    pub fn new(p: ValidPrime, len: usize) -> Self {
        Self {
            p,
            entries: vec![0; len],
        }
    }

    pub fn from_slice(p: ValidPrime, entries: &[u32]) -> Self {
        Self {
            p,
            entries: entries.iter().map(|&x| x % *p).collect(),
        }
    }

    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> u32 {
        self.entries[index]
    }

    pub fn set_entry(&mut self, index: usize, value: u32) {
        self.entries[index] = value % *self.p;
    }

    pub fn add_basis_element(&mut self, index: usize, coeff: u32) {
        self.as_slice_mut().add_basis_element(index, coeff);
    }

    pub fn add(&mut self, other: &FpVector, coeff: u32) {
        self.as_slice_mut().add(other.as_slice(), coeff);
    }

    pub fn scale(&mut self, coeff: u32) {
        self.as_slice_mut().scale(coeff);
    }

    pub fn set_to_zero(&mut self) {
        self.entries.iter_mut().for_each(|x| *x = 0);
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&x| x == 0)
    }

    pub fn assign(&mut self, other: &FpVector) {
        debug_assert_eq!(self.len(), other.len());
        self.entries.copy_from_slice(&other.entries);
    }

    /// Resize to `len`, padding with zeros.
    pub fn extend_len(&mut self, len: usize) {
        if len > self.entries.len() {
            self.entries.resize(len, 0);
        }
    }

    /// Resize to `len` and zero every entry.
    pub fn set_scratch_vector_size(&mut self, len: usize) {
        self.entries.clear();
        self.entries.resize(len, 0);
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = u32> + '_ {
        self.entries.iter().copied()
    }

    pub fn iter_nonzero(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.as_slice().iter_nonzero()
    }

    pub fn first_nonzero(&self) -> Option<(usize, u32)> {
        self.iter_nonzero().next()
    }

    pub fn as_slice(&self) -> Slice<'_> {
        Slice {
            p: self.p,
            entries: &self.entries,
        }
    }

    pub fn as_slice_mut(&mut self) -> SliceMut<'_> {
        SliceMut {
            p: self.p,
            entries: &mut self.entries,
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> Slice<'_> {
        self.as_slice().slice(start, end)
    }

    pub fn slice_mut(&mut self, start: usize, end: usize) -> SliceMut<'_> {
        SliceMut {
            p: self.p,
            entries: &mut self.entries[start..end],
        }
    }
}

impl<'a> Slice<'a> {
    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> u32 {
        self.entries[index]
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&x| x == 0)
    }

    pub fn iter(self) -> impl ExactSizeIterator<Item = u32> + 'a {
        self.entries.iter().copied()
    }

    pub fn iter_nonzero(self) -> impl Iterator<Item = (usize, u32)> + 'a {
        self.entries
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, x)| x != 0)
    }

    pub fn first_nonzero(self) -> Option<(usize, u32)> {
        self.iter_nonzero().next()
    }

    pub fn slice(self, start: usize, end: usize) -> Slice<'a> {
        Slice {
            p: self.p,
            entries: &self.entries[start..end],
        }
    }

    pub fn to_owned(self) -> FpVector {
        FpVector {
            p: self.p,
            entries: self.entries.to_vec(),
        }
    }
}

impl<'a> SliceMut<'a> {
    pub fn prime(&self) -> ValidPrime {
        self.p
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> u32 {
        self.entries[index]
    }

    pub fn set_entry(&mut self, index: usize, value: u32) {
        self.entries[index] = value % *self.p;
    }

    pub fn add_basis_element(&mut self, index: usize, coeff: u32) {
        self.entries[index] = self.p.sum(self.entries[index], coeff);
    }

    /// `self += coeff * other`.
    pub fn add(&mut self, other: Slice, coeff: u32) {
        debug_assert_eq!(self.len(), other.len());
        let coeff = coeff % *self.p;
        if coeff == 0 {
            return;
        }
        let p = *self.p;
        for (x, &y) in self.entries.iter_mut().zip(other.entries) {
            *x = ((*x as u64 + coeff as u64 * y as u64) % p as u64) as u32;
        }
    }

    /// `self += coeff * (left ⊗ right)`, where the tensor product is laid out row by row starting
    /// at `offset`.
    pub fn add_tensor(&mut self, offset: usize, coeff: u32, left: Slice, right: Slice) {
        let width = right.len();
        for (i, c) in left.iter_nonzero() {
            let start = offset + i * width;
            let c = self.p.product(c, coeff);
            self.slice_mut(start, start + width).add(right, c);
        }
    }

    pub fn scale(&mut self, coeff: u32) {
        let coeff = coeff % *self.p;
        for x in self.entries.iter_mut() {
            *x = self.p.product(*x, coeff);
        }
    }

    pub fn set_to_zero(&mut self) {
        self.entries.iter_mut().for_each(|x| *x = 0);
    }

    pub fn assign(&mut self, other: Slice) {
        self.entries.copy_from_slice(other.entries);
    }

    pub fn as_slice(&self) -> Slice<'_> {
        Slice {
            p: self.p,
            entries: &*self.entries,
        }
    }

    /// Reborrow, so that a `SliceMut` can be passed to a function without being consumed.
    pub fn copy(&mut self) -> SliceMut<'_> {
        SliceMut {
            p: self.p,
            entries: &mut *self.entries,
        }
    }

    pub fn slice_mut(&mut self, start: usize, end: usize) -> SliceMut<'_> {
        SliceMut {
            p: self.p,
            entries: &mut self.entries[start..end],
        }
    }
}

impl fmt::Display for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.entries.iter().join(", "))
    }
}

impl fmt::Display for FpVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl fmt::Debug for FpVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FpVector(p = {}, {})", self.p, self)
    }
}

impl<'a> From<&'a FpVector> for Slice<'a> {
    fn from(v: &'a FpVector) -> Self {
        v.as_slice()
    }
}
