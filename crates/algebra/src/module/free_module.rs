use std::sync::Arc;

use fp::vector::SliceMut;
use once::{OnceBiVec, OnceVec};
use parking_lot::Mutex;

use crate::algebra::Algebra;
use crate::module::Module;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationGeneratorPair {
    pub operation_degree: i32,
    pub operation_index: usize,
    pub generator_degree: i32,
    pub generator_index: usize,
}

/// A free module.
///
/// A free module is uniquely determined by its list of generators. The generators are listed in
/// increasing degrees, and the index in this list is the internal index. In each degree the basis
/// consists of the elements `op * gen`, grouped by generator in internal order, and within a
/// generator ordered by the algebra basis.
///
/// Generators are added one degree at a time, and the tables are only extended as far as
/// [`FreeModule::extend_table_entries`] asks. Everything is append-only, so a free module can be
/// read while it grows.
pub struct FreeModule<A: Algebra> {
    algebra: Arc<A>,
    name: String,
    min_degree: i32,
    gen_names: OnceBiVec<Vec<String>>,
    /// degree -> internal index of first generator in degree
    gen_deg_idx_to_internal_idx: OnceBiVec<usize>,
    num_gens: OnceBiVec<usize>,
    basis_element_to_opgen: OnceBiVec<OnceVec<OperationGeneratorPair>>,
    /// degree -> internal_gen_idx -> the offset of the generator in degree
    generator_to_index: OnceBiVec<OnceVec<usize>>,
    lock: Mutex<()>,
}

impl<A: Algebra> std::fmt::Display for FreeModule<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<A: Algebra> FreeModule<A> {
    pub fn new(algebra: Arc<A>, name: String, min_degree: i32) -> Self {
        let gen_deg_idx_to_internal_idx = OnceBiVec::new(min_degree);
        gen_deg_idx_to_internal_idx.push(0);
        Self {
            algebra,
            name,
            min_degree,
            gen_names: OnceBiVec::new(min_degree),
            gen_deg_idx_to_internal_idx,
            num_gens: OnceBiVec::new(min_degree),
            basis_element_to_opgen: OnceBiVec::new(min_degree),
            generator_to_index: OnceBiVec::new(min_degree),
            lock: Mutex::new(()),
        }
    }
}

impl<A: Algebra> Module for FreeModule<A> {
    type Algebra = A;

    fn algebra(&self) -> Arc<A> {
        Arc::clone(&self.algebra)
    }

    fn min_degree(&self) -> i32 {
        self.min_degree
    }

    fn max_computed_degree(&self) -> i32 {
        self.num_gens.max_degree()
    }

    fn dimension(&self, degree: i32) -> usize {
        if degree < self.min_degree {
            return 0;
        }
        assert!(
            degree < self.basis_element_to_opgen.len(),
            "Free Module {self} not computed through degree {degree}"
        );
        self.basis_element_to_opgen[degree].len()
    }

    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String {
        let opgen = self.index_to_op_gen(degree, idx);
        let gen_name = &self.gen_names[opgen.generator_degree][opgen.generator_index];
        if opgen.operation_degree == 0 {
            gen_name.clone()
        } else {
            let op_str = self
                .algebra
                .basis_element_to_string(opgen.operation_degree, opgen.operation_index);
            format!("{op_str} {gen_name}")
        }
    }

    fn act_on_basis(
        &self,
        mut result: SliceMut,
        coeff: u32,
        op_degree: i32,
        op_index: usize,
        mod_degree: i32,
        mod_index: usize,
    ) {
        let operation_generator = self.index_to_op_gen(mod_degree, mod_index);
        let module_operation_degree = operation_generator.operation_degree;
        let module_operation_index = operation_generator.operation_index;
        let generator_degree = operation_generator.generator_degree;
        let generator_index = operation_generator.generator_index;

        // Now all of the output elements are going to be of the form s * x. Find where such things go in the output vector.
        let num_ops = self.algebra.dimension(module_operation_degree + op_degree);
        let output_block_min = self.operation_generator_to_index(
            module_operation_degree + op_degree,
            0,
            generator_degree,
            generator_index,
        );
        let output_block_max = output_block_min + num_ops;

        // Now we multiply s * r and write the result to the appropriate position.
        self.algebra.multiply_basis_elements(
            result.slice_mut(output_block_min, output_block_max),
            coeff,
            op_degree,
            op_index,
            module_operation_degree,
            module_operation_index,
        );
    }
}

impl<A: Algebra> FreeModule<A> {
    pub fn gen_names(&self) -> &OnceBiVec<Vec<String>> {
        &self.gen_names
    }

    pub fn number_of_gens_in_degree(&self, degree: i32) -> usize {
        self.num_gens.get(degree).copied().unwrap_or(0)
    }

    /// The number of generators of degree less than `degree`.
    pub fn gen_deg_idx_to_internal_idx(&self, degree: i32) -> usize {
        self.gen_deg_idx_to_internal_idx[degree]
    }

    /// Compute the basis through `max_degree`. The algebra must already be computed through
    /// `max_degree - min_degree`.
    pub fn extend_table_entries(&self, max_degree: i32) {
        let _lock = self.lock.lock();
        self.basis_element_to_opgen.extend(max_degree, |degree| {
            let new_row = OnceVec::new();
            let offsets = OnceVec::new();

            let mut offset = 0;
            for (gen_deg, &num_gens) in self.num_gens.iter_enum() {
                let op_deg = degree - gen_deg;
                let num_ops = self.algebra.dimension(op_deg);
                for gen_idx in 0..num_gens {
                    offsets.push(offset);
                    offset += num_ops;
                    for op_idx in 0..num_ops {
                        new_row.push(OperationGeneratorPair {
                            generator_degree: gen_deg,
                            generator_index: gen_idx,
                            operation_degree: op_deg,
                            operation_index: op_idx,
                        });
                    }
                }
            }
            self.generator_to_index.push_checked(offsets, degree);
            new_row
        });
    }

    /// Add the generators of degree `degree`. This must be called exactly once per degree, in
    /// increasing order, and after [`FreeModule::extend_table_entries`] has reached `degree`.
    pub fn add_generators(&self, degree: i32, num_gens: usize, names: Option<Vec<String>>) {
        // Changing num_gens modifies the behaviour of extend_table_entries, and the two cannot
        // happen concurrently.
        let _lock = self.lock.lock();
        assert!(degree >= self.min_degree);
        assert!(degree < self.basis_element_to_opgen.len());

        let gen_names = names.unwrap_or_else(|| {
            (0..num_gens)
                .map(|i| format!("x_{{{degree},{i}}}"))
                .collect()
        });
        assert_eq!(gen_names.len(), num_gens);

        self.gen_names.push_checked(gen_names, degree);
        self.num_gens.push_checked(num_gens, degree);

        let internal_gen_idx = self.gen_deg_idx_to_internal_idx[degree];
        // After adding generators in degree `t`, we now know when the generators for degree `t +
        // 1` starts.
        self.gen_deg_idx_to_internal_idx
            .push_checked(internal_gen_idx + num_gens, degree + 1);

        for total_degree in degree..self.basis_element_to_opgen.len() {
            let op_deg = total_degree - degree;
            let row = &self.basis_element_to_opgen[total_degree];
            let mut offset = row.len();
            let num_ops = self.algebra.dimension(op_deg);
            for gen_idx in 0..num_gens {
                self.generator_to_index[total_degree].push(offset);
                offset += num_ops;
                for op_idx in 0..num_ops {
                    row.push(OperationGeneratorPair {
                        generator_degree: degree,
                        generator_index: gen_idx,
                        operation_degree: op_deg,
                        operation_index: op_idx,
                    });
                }
            }
        }
    }

    /// Given a generator `(gen_deg, gen_idx)`, find the first index in degree `degree` with
    /// elements from the generator.
    pub fn generator_offset(&self, degree: i32, gen_deg: i32, gen_idx: usize) -> usize {
        assert!(gen_deg >= self.min_degree);
        assert!(gen_idx < self.num_gens[gen_deg]);
        self.generator_to_index[degree][self.gen_deg_idx_to_internal_idx[gen_deg] + gen_idx]
    }

    pub fn operation_generator_to_index(
        &self,
        op_deg: i32,
        op_idx: usize,
        gen_deg: i32,
        gen_idx: usize,
    ) -> usize {
        assert!(op_deg >= 0);
        self.generator_offset(op_deg + gen_deg, gen_deg, gen_idx) + op_idx
    }

    pub fn index_to_op_gen(&self, degree: i32, index: usize) -> &OperationGeneratorPair {
        assert!(degree >= self.min_degree);
        &self.basis_element_to_opgen[degree][index]
    }
}
