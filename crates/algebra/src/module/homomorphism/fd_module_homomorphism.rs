use std::sync::Arc;

use bivec::BiVec;
use fp::matrix::{AugmentedMatrix, Matrix};
use fp::vector::{FpVector, SliceMut};
use rustc_hash::FxHashMap;

use crate::algebra::Algebra;
use crate::module::homomorphism::ModuleHomomorphism;
use crate::module::{FDModule, Module};
use crate::steenrod_parser;

/// A homomorphism between finite dimensional modules, recorded as one matrix per target degree.
/// Row `i` of the matrix in target degree `t` is the image of basis element `i` of the source in
/// degree `t + degree_shift`.
///
/// Use [`FDModuleHomomorphismBuilder`] to specify a homomorphism by its values on a few basis
/// elements.
pub struct FDModuleHomomorphism<A: Algebra> {
    source: Arc<FDModule<A>>,
    target: Arc<FDModule<A>>,
    degree_shift: i32,
    matrices: BiVec<Matrix>,
}

impl<A: Algebra> ModuleHomomorphism for FDModuleHomomorphism<A> {
    type Source = FDModule<A>;
    type Target = FDModule<A>;

    fn source(&self) -> Arc<Self::Source> {
        Arc::clone(&self.source)
    }

    fn target(&self) -> Arc<Self::Target> {
        Arc::clone(&self.target)
    }

    fn degree_shift(&self) -> i32 {
        self.degree_shift
    }

    fn apply_to_basis_element(
        &self,
        mut result: SliceMut,
        coeff: u32,
        input_degree: i32,
        input_idx: usize,
    ) {
        let output_degree = input_degree - self.degree_shift;
        if let Some(matrix) = self.matrices.get(output_degree) {
            if matrix.columns() > 0 {
                result.add(matrix.row(input_idx), coeff);
            }
        }
    }
}

impl<A: Algebra> FDModuleHomomorphism<A> {
    fn from_matrices(
        source: Arc<FDModule<A>>,
        target: Arc<FDModule<A>>,
        degree_shift: i32,
        matrices: BiVec<Matrix>,
    ) -> Self {
        Self {
            source,
            target,
            degree_shift,
            matrices,
        }
    }

    pub fn identity(module: Arc<FDModule<A>>) -> Self {
        let p = module.prime();
        let min_degree = module.min_degree();
        let max_degree = module.max_degree().unwrap_or(min_degree - 1);

        let mut matrices = BiVec::with_capacity(min_degree, max_degree + 1);
        for t in min_degree..=max_degree {
            matrices.push(Matrix::identity(p, module.dimension(t)));
        }
        Self::from_matrices(Arc::clone(&module), module, 0, matrices)
    }

    /// The image of the basis element `(degree, idx)` of the source.
    pub fn image_of(&self, degree: i32, idx: usize) -> FpVector {
        let mut result = FpVector::new(
            self.prime(),
            self.target.dimension(degree - self.degree_shift),
        );
        self.apply_to_basis_element(result.as_slice_mut(), 1, degree, idx);
        result
    }
}

/// Accumulates the values of a homomorphism of finite dimensional modules on some basis elements.
///
/// ```
/// # use std::sync::Arc;
/// # use algebra::MilnorAlgebra;
/// # use algebra::module::FDModuleBuilder;
/// # use algebra::module::homomorphism::{FDModuleHomomorphismBuilder, ModuleHomomorphism};
/// # use fp::prime::ValidPrime;
/// let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(2)));
/// let c2 = FDModuleBuilder::new(Arc::clone(&algebra))
///     .add_generator(0, "x0")?
///     .add_generator(1, "x1")?
///     .add_action("Sq1 x0 = x1")?
///     .build()?;
/// let sphere = FDModuleBuilder::new(algebra).add_generator(0, "x0")?.build()?;
///
/// let f = FDModuleHomomorphismBuilder::new(Arc::new(c2), Arc::new(sphere), 0)
///     .set("x0", "x0")?
///     .build()?;
/// assert_eq!(f.image_of(1, 0).len(), 0);
/// # Ok::<(), error::Error>(())
/// ```
pub struct FDModuleHomomorphismBuilder<A: Algebra> {
    source: Arc<FDModule<A>>,
    target: Arc<FDModule<A>>,
    degree_shift: i32,
    values: FxHashMap<(i32, usize), FpVector>,
}

impl<A: Algebra> FDModuleHomomorphismBuilder<A> {
    pub fn new(source: Arc<FDModule<A>>, target: Arc<FDModule<A>>, degree_shift: i32) -> Self {
        Self {
            source,
            target,
            degree_shift,
            values: FxHashMap::default(),
        }
    }

    /// Send the source basis element `name` to `value`, a sum such as `x0 + 2 x3` or `0`. Setting
    /// the same element again replaces the earlier value.
    pub fn set(mut self, name: &str, value: &str) -> error::Result<Self> {
        let (degree, idx) = self
            .source
            .string_to_basis_element(name)
            .ok_or_else(|| error::Error::UnknownGenerator(name.to_owned()))?;
        let output_degree = degree - self.degree_shift;

        let mut output = FpVector::new(self.source.prime(), self.target.dimension(output_degree));
        for (coeff, term) in steenrod_parser::parse_module_sum(value)? {
            let (term_degree, term_idx) = self
                .target
                .string_to_basis_element(&term)
                .ok_or_else(|| error::Error::UnknownGenerator(term.clone()))?;
            if term_degree != output_degree {
                return Err(error::Error::InconsistentHomomorphism(format!(
                    "{name} has degree {degree} and is sent to degree {output_degree}, but {term} has degree {term_degree}"
                )));
            }
            output.add_basis_element(term_idx, coeff);
        }
        self.values.insert((degree, idx), output);
        Ok(self)
    }

    /// Solve for the homomorphism one source degree at a time. In source degree `t` the unknowns
    /// are the images of the basis elements, subject to `f(a m) = a f(m)` for `m` of lower degree,
    /// and to the values that were set. Unconstrained directions are sent to zero.
    #[tracing::instrument(skip_all, fields(source = %self.source, target = %self.target))]
    pub fn build(self) -> error::Result<FDModuleHomomorphism<A>> {
        let p = self.source.prime();
        let algebra = self.source.algebra();
        let shift = self.degree_shift;

        let min_degree = self.target.min_degree();
        let max_degree = self.target.max_degree().unwrap_or(min_degree - 1);
        algebra.ensure_degree(std::cmp::max(
            0,
            max_degree + shift - self.source.min_degree(),
        ))?;
        let mut matrices: BiVec<Matrix> = BiVec::with_capacity(min_degree, max_degree + 1);

        for output_degree in min_degree..=max_degree {
            let degree = output_degree + shift;
            let source_dim = self.source.dimension(degree);
            let target_dim = self.target.dimension(output_degree);

            let mut rows: Vec<FpVector> = Vec::new();
            if target_dim > 0 {
                for input_degree in self.source.min_degree()..degree {
                    // Below the target's minimum degree the map is zero.
                    let lower = matrices
                        .get(input_degree - shift)
                        .filter(|matrix| matrix.columns() > 0);
                    let op_degree = degree - input_degree;
                    for input_idx in 0..self.source.dimension(input_degree) {
                        for op_idx in 0..algebra.dimension(op_degree) {
                            let mut row = FpVector::new(p, source_dim + target_dim);
                            self.source.act_on_basis(
                                row.slice_mut(0, source_dim),
                                1,
                                op_degree,
                                op_idx,
                                input_degree,
                                input_idx,
                            );
                            if let Some(lower) = lower {
                                self.target.act(
                                    row.slice_mut(source_dim, source_dim + target_dim),
                                    1,
                                    op_degree,
                                    op_idx,
                                    input_degree - shift,
                                    lower.row(input_idx),
                                );
                            }
                            if !row.is_zero() {
                                rows.push(row);
                            }
                        }
                    }
                }
                for idx in 0..source_dim {
                    if let Some(value) = self.values.get(&(degree, idx)) {
                        let mut row = FpVector::new(p, source_dim + target_dim);
                        row.add_basis_element(idx, 1);
                        row.slice_mut(source_dim, source_dim + target_dim)
                            .assign(value.as_slice());
                        rows.push(row);
                    }
                }
            }

            let mut system = AugmentedMatrix::<2>::new(p, 0, [source_dim, target_dim]);
            for row in rows {
                system.push_row(row);
            }
            system.row_reduce();

            if let Some(bad_row) = system.pivots()[source_dim..]
                .iter()
                .find(|&&row| row >= 0)
                .map(|&row| row as usize)
            {
                let forced = self
                    .target
                    .element_to_string(output_degree, system.row_segment(bad_row, 1, 1));
                return Err(error::Error::InconsistentHomomorphism(format!(
                    "in degree {degree}, 0 would have to be sent to {forced}"
                )));
            }

            let mut matrix = Matrix::new(p, source_dim, target_dim);
            for (idx, &pivot_row) in system.pivots()[..source_dim].iter().enumerate() {
                if pivot_row >= 0 {
                    matrix
                        .row_mut(idx)
                        .assign(system.row_segment(pivot_row as usize, 1, 1));
                }
            }
            matrices.push(matrix);
        }

        tracing::debug!(degrees = matrices.len() - min_degree, "built homomorphism");
        Ok(FDModuleHomomorphism::from_matrices(
            self.source,
            self.target,
            shift,
            matrices,
        ))
    }
}
