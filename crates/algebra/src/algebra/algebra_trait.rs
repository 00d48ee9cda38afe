use fp::prime::ValidPrime;
use fp::vector::{Slice, SliceMut};

/// A graded algebra over F_p, finite dimensional in each degree, equipped with a choice of ordered
/// basis in each dimension. Basis elements of the algebra are referred to by their degree and
/// index, and general elements are referred to by the degree and an `FpVector` listing the
/// coefficients of the element in terms of the basis.
///
/// Since the graded algebra is infinite dimensional, we never construct a complete description of
/// it. Instead, `compute_basis(degree)` computes the data needed to perform calculations up to
/// degree `degree`. It is the responsibility of users to ensure `compute_basis(degree)` is called
/// before calling other functions with the `degree` parameter. Code that must respect a degree cap
/// goes through [`Algebra::ensure_degree`] instead.
pub trait Algebra: std::fmt::Display + Send + Sync + 'static {
    /// Returns the prime the algebra is over.
    fn prime(&self) -> ValidPrime;

    /// The largest degree this algebra is willing to compute, if any.
    fn max_degree(&self) -> Option<i32> {
        None
    }

    /// Computes the list of basis elements up to and including degree `degree`. Calling this
    /// repeatedly with the same degree is cheap.
    fn compute_basis(&self, degree: i32);

    /// Gets the dimension of the algebra in degree `degree`.
    fn dimension(&self, degree: i32) -> usize;

    /// Computes the product `r * s` of the two basis elements, and *adds* `coeff` times the result
    /// to `result`.
    fn multiply_basis_elements(
        &self,
        result: SliceMut,
        coeff: u32,
        r_degree: i32,
        r_idx: usize,
        s_degree: i32,
        s_idx: usize,
    );

    fn multiply_basis_element_by_element(
        &self,
        mut result: SliceMut,
        coeff: u32,
        r_degree: i32,
        r_idx: usize,
        s_degree: i32,
        s: Slice,
    ) {
        let p = self.prime();
        for (i, v) in s.iter_nonzero() {
            self.multiply_basis_elements(
                result.copy(),
                p.product(coeff, v),
                r_degree,
                r_idx,
                s_degree,
                i,
            );
        }
    }

    /// Converts a basis element into a string for display.
    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String;

    /// Parses the name of a basis element. This accepts at least everything produced by
    /// [`Algebra::basis_element_to_string`] and [`GeneratedAlgebra::generator_to_string`].
    fn basis_element_from_string(&self, elt: &str) -> Option<(i32, usize)>;

    /// Converts an element into a string for display.
    fn element_to_string(&self, degree: i32, element: Slice) -> String {
        let mut result = String::new();
        let mut zero = true;
        for (idx, value) in element.iter_nonzero() {
            zero = false;
            if value != 1 {
                result.push_str(&format!("{value} * "));
            }
            let b = self.basis_element_to_string(degree, idx);
            result.push_str(&format!("{b} + "));
        }
        if zero {
            result.push('0');
        } else {
            // Remove trailing " + "
            result.truncate(result.len() - 3);
        }
        result
    }

    /// Computes the basis through `degree`, unless that exceeds [`Algebra::max_degree`].
    fn ensure_degree(&self, degree: i32) -> error::Result<()> {
        if let Some(available) = self.max_degree() {
            if degree > available {
                return Err(error::Error::InsufficientAlgebraData {
                    requested: degree,
                    available,
                });
            }
        }
        self.compute_basis(degree);
        Ok(())
    }
}

/// An algebra with a specified list of generators and generating relations. This data can be used
/// to specify modules by specifying the actions of the generators.
pub trait GeneratedAlgebra: Algebra {
    /// Given a degree `degree`, the function returns a list of algebra generators in that degree.
    /// This return value is the list of indices of the basis elements that are generators.
    ///
    /// This method need not be fast, because it is only called when constructing modules.
    fn generators(&self, degree: i32) -> Vec<usize>;

    /// This returns the name of a generator. Note that the index is the index of the generator
    /// in the list of all basis elements.
    ///
    /// The default implementation calls `self.basis_element_to_string`, but occasionally the
    /// generators have more concise names that are preferred.
    fn generator_to_string(&self, degree: i32, idx: usize) -> String {
        self.basis_element_to_string(degree, idx)
    }

    /// Given a non-generator basis element of the algebra, decompose it in terms of algebra
    /// generators. Recall each basis element is given by a pair $(d, i))$, where $d$ is the degree of
    /// the generator, and $i$ is the index of the basis element. Given a basis element $A$, the
    /// function returns a list of triples $(c_i, A_i, B_i)$ where each $A_i$ and $B_i$ are basis
    /// elements of strictly smaller degree than the original, and
    /// $$ A = \sum_i c_i A_i B_i.$$
    /// This allows us to recursively compute the action of the algebra.
    ///
    /// Called on a generator, this returns the single term `(1, A, 1)`.
    fn decompose_basis_element(
        &self,
        degree: i32,
        idx: usize,
    ) -> Vec<(u32, (i32, usize), (i32, usize))>;

    /// Relations among products of generators in degree `degree`. Each relation is a list of
    /// terms `(c, A, B)` asserting `sum c A B = 0`. Every relation of the algebra follows from
    /// these, so a module whose action satisfies them is a genuine module.
    fn generating_relations(&self, degree: i32) -> Vec<Vec<(u32, (i32, usize), (i32, usize))>>;
}

/// An algebra with a coproduct, so that the tensor product of two modules is again a module.
pub trait Bialgebra: Algebra {
    /// The coproduct of a basis element, as a list of `(left degree, left index, right degree,
    /// right index)`. This is only required on the elements returned by [`Bialgebra::decompose`].
    fn coproduct(&self, op_deg: i32, op_idx: usize) -> Vec<(i32, usize, i32, usize)>;

    /// Write a basis element as a product of elements whose coproducts are easy to compute. The
    /// result is listed in the order they should be applied, i.e. the last element is the leftmost
    /// factor.
    fn decompose(&self, op_deg: i32, op_idx: usize) -> Vec<(i32, usize)>;
}
