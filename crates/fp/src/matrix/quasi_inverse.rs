use super::Matrix;
use crate::prime::ValidPrime;
use crate::vector::{Slice, SliceMut};

/// A quasi-inverse of a matrix `M` is a map `Q` from the codomain to the domain with `xQM = x`
/// for every `x` in the image of `M`.
///
/// `image` holds the pivots of the reduced image of `M`; row `i` of `preimage` is a preimage of
/// the `i`th reduced image vector. If `image` is `None` the image is everything, with the
/// standard basis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuasiInverse {
    image: Option<Vec<isize>>,
    preimage: Matrix,
}

impl QuasiInverse {
    pub fn new(image: Option<Vec<isize>>, preimage: Matrix) -> Self {
        Self { image, preimage }
    }

    pub fn prime(&self) -> ValidPrime {
        self.preimage.prime()
    }

    pub fn source_dimension(&self) -> usize {
        self.preimage.columns()
    }

    pub fn target_dimension(&self) -> usize {
        self.image
            .as_ref()
            .map_or(self.preimage.rows(), Vec::len)
    }

    pub fn pivots(&self) -> Option<&[isize]> {
        self.image.as_deref()
    }

    pub fn preimage(&self) -> &Matrix {
        &self.preimage
    }

    /// Add `coeff` times a preimage of `input` to `target`. The result is only meaningful when
    /// `input` lies in the image.
    pub fn apply(&self, mut target: SliceMut, coeff: u32, input: Slice) {
        let p = self.prime();
        let mut row = 0;
        for i in 0..input.len() {
            if let Some(pivots) = &self.image {
                if pivots[i] < 0 {
                    continue;
                }
            }
            let c = input.entry(i);
            if c != 0 {
                target.add(self.preimage.row(row), p.product(coeff, c));
            }
            row += 1;
        }
    }
}
