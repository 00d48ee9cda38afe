use std::fmt::Write as _;
use std::sync::Arc;

use bivec::BiVec;
use fp::vector::{FpVector, SliceMut};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::algebra::{Algebra, GeneratedAlgebra};
use crate::module::{FDModuleBuilder, Module};

/// A module that is finite dimensional in total, with the action of every algebra basis element
/// stored explicitly.
///
/// Instances are produced by [`FDModuleBuilder`], [`FDModule::from_module_truncated`] or
/// [`FDModule::from_json`], and are immutable afterwards.
pub struct FDModule<A: Algebra> {
    algebra: Arc<A>,
    pub name: String,
    graded_dimension: BiVec<usize>,
    gen_names: BiVec<Vec<String>>,
    // This goes input_degree --> output_degree --> operation --> input_index --> Vector
    actions: BiVec<BiVec<Vec<Vec<FpVector>>>>,
}

impl<A: Algebra> std::fmt::Display for FDModule<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl<A: Algebra> std::fmt::Debug for FDModule<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "FDModule({}, graded dimension {:?})",
            self.name,
            self.graded_dimension.iter_enum().collect::<Vec<_>>()
        )
    }
}

impl<A: Algebra> Clone for FDModule<A> {
    fn clone(&self) -> Self {
        Self {
            algebra: Arc::clone(&self.algebra),
            name: self.name.clone(),
            graded_dimension: self.graded_dimension.clone(),
            gen_names: self.gen_names.clone(),
            actions: self.actions.clone(),
        }
    }
}

impl<A: Algebra> PartialEq for FDModule<A> {
    fn eq(&self, other: &Self) -> bool {
        self.test_equal(other).is_ok()
    }
}

impl<A: Algebra> Eq for FDModule<A> {}

impl<A: Algebra> FDModule<A> {
    /// Compare two modules, describing the first disagreement found. Names of basis elements are
    /// part of the comparison.
    pub fn test_equal(&self, other: &Self) -> Result<(), String> {
        let dim = |m: &Self, t: i32| m.graded_dimension.get(t).copied().unwrap_or(0);
        let min = std::cmp::min(self.min_degree(), other.min_degree());
        let max = std::cmp::max(self.graded_dimension.len(), other.graded_dimension.len());

        let disagreements: Vec<i32> = (min..max).filter(|&t| dim(self, t) != dim(other, t)).collect();
        if !disagreements.is_empty() {
            return Err(format!(
                "Graded dimensions disagree in positions {disagreements:?}. Left has graded \
                 dimensions:\n    {:?}\nRight has graded dimension:\n    {:?}\n",
                self.graded_dimension.iter().collect::<Vec<_>>(),
                other.graded_dimension.iter().collect::<Vec<_>>(),
            ));
        }

        for (t, names) in self.gen_names.iter_enum() {
            let other_names = other.gen_names.get(t).map_or(&[][..], Vec::as_slice);
            if names.as_slice() != other_names {
                return Err(format!(
                    "Names disagree in degree {t}: {names:?} vs {other_names:?}"
                ));
            }
        }

        if self.actions == other.actions {
            return Ok(());
        }
        let mut err_string = String::new();
        for (input_degree, outputs) in self.actions.iter_enum() {
            for (output_degree, ops) in outputs.iter_enum().skip(1) {
                if self.dimension(output_degree) == 0 {
                    continue;
                }
                for (op_idx, inputs) in ops.iter().enumerate() {
                    for (input_idx, left) in inputs.iter().enumerate() {
                        let right =
                            other.action(output_degree - input_degree, op_idx, input_degree, input_idx);
                        if left != right {
                            let _ = write!(
                                err_string,
                                "  {} * {} disagreement.\n    Left: {}\n    Right: {}\n",
                                self.algebra
                                    .basis_element_to_string(output_degree - input_degree, op_idx),
                                self.basis_element_to_string(input_degree, input_idx),
                                self.element_to_string(output_degree, left.as_slice()),
                                self.element_to_string(output_degree, right.as_slice())
                            );
                        }
                    }
                }
            }
        }
        if err_string.is_empty() {
            Ok(())
        } else {
            Err(format!("Actions disagree.\n{err_string}"))
        }
    }
}

impl<A: Algebra> Module for FDModule<A> {
    type Algebra = A;

    fn algebra(&self) -> Arc<Self::Algebra> {
        Arc::clone(&self.algebra)
    }

    fn min_degree(&self) -> i32 {
        self.graded_dimension.min_degree()
    }

    fn max_computed_degree(&self) -> i32 {
        i32::MAX
    }

    fn dimension(&self, degree: i32) -> usize {
        self.graded_dimension.get(degree).copied().unwrap_or(0)
    }

    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String {
        self.gen_names[degree][idx].clone()
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
        assert!(op_index < self.algebra().dimension(op_degree));
        assert!(mod_index < self.dimension(mod_degree));
        let output_dimension = self.dimension(mod_degree + op_degree);
        if output_dimension == 0 {
            return;
        }
        if op_degree == 0 {
            // The algebra is connected, so the only operation in degree 0 is the unit.
            result.add_basis_element(mod_index, coeff);
            return;
        }
        let output = self.action(op_degree, op_index, mod_degree, mod_index);
        result.add(output.as_slice(), coeff);
    }

    fn max_degree(&self) -> Option<i32> {
        Some(self.graded_dimension.max_degree())
    }
}

impl<A: Algebra> FDModule<A> {
    /// A module with the given graded dimension and every action zero. Basis elements are named
    /// `x{degree}_{index}` until renamed.
    pub fn new(algebra: Arc<A>, name: String, graded_dimension: BiVec<usize>) -> Self {
        let min_degree = graded_dimension.min_degree();
        let max_degree = graded_dimension.len();
        algebra.compute_basis(max_degree - min_degree);
        let mut gen_names = BiVec::with_capacity(min_degree, max_degree);
        for (i, &dim) in graded_dimension.iter_enum() {
            gen_names.push((0..dim).map(|j| format!("x{i}_{j}")).collect());
        }
        let actions = Self::allocate_actions(&algebra, &graded_dimension);
        Self {
            algebra,
            name,
            graded_dimension,
            gen_names,
            actions,
        }
    }

    pub fn set_basis_element_name(&mut self, degree: i32, idx: usize, name: String) {
        self.gen_names[degree][idx] = name;
    }

    pub fn gen_names(&self) -> &BiVec<Vec<String>> {
        &self.gen_names
    }

    fn allocate_actions(
        algebra: &Arc<A>,
        graded_dimension: &BiVec<usize>,
    ) -> BiVec<BiVec<Vec<Vec<FpVector>>>> {
        let p = algebra.prime();
        let min_degree = graded_dimension.min_degree();
        let max_degree = graded_dimension.len();
        let mut result: BiVec<BiVec<Vec<Vec<FpVector>>>> =
            BiVec::with_capacity(min_degree, max_degree);

        for input_degree in min_degree..max_degree {
            let mut outputs_vec: BiVec<Vec<Vec<FpVector>>> =
                BiVec::with_capacity(input_degree, max_degree);
            // The algebra is connected, so the degree 0 action is the identity.
            let number_of_inputs = graded_dimension[input_degree];
            let identity = (0..number_of_inputs)
                .map(|i| {
                    let mut v = FpVector::new(p, number_of_inputs);
                    v.set_entry(i, 1);
                    v
                })
                .collect();
            outputs_vec.push(vec![identity]);

            for output_degree in input_degree + 1..max_degree {
                let number_of_operations = algebra.dimension(output_degree - input_degree);
                let number_of_outputs = graded_dimension[output_degree];
                outputs_vec.push(vec![
                    vec![FpVector::new(p, number_of_outputs); number_of_inputs];
                    number_of_operations
                ]);
            }
            result.push(outputs_vec);
        }
        result
    }

    pub fn string_to_basis_element(&self, string: &str) -> Option<(i32, usize)> {
        self.gen_names.iter_enum().find_map(|(i, names)| {
            names
                .iter()
                .position(|n| n == string)
                .map(|j| (i, j))
        })
    }

    pub fn set_action(
        &mut self,
        operation_degree: i32,
        operation_idx: usize,
        input_degree: i32,
        input_idx: usize,
        output: &FpVector,
    ) {
        assert!(operation_idx < self.algebra.dimension(operation_degree));
        assert!(input_idx < self.dimension(input_degree));
        self.action_mut(operation_degree, operation_idx, input_degree, input_idx)
            .assign(output);
    }

    /// This function will panic if you call it with input such that `module.dimension(input_degree +
    /// operation_degree) = 0`.
    pub fn action(
        &self,
        operation_degree: i32,
        operation_idx: usize,
        input_degree: i32,
        input_idx: usize,
    ) -> &FpVector {
        let output_degree = input_degree + operation_degree;
        &self.actions[input_degree][output_degree][operation_idx][input_idx]
    }

    /// This function will panic if you call it with input such that `module.dimension(input_degree +
    /// operation_degree) = 0`.
    pub fn action_mut(
        &mut self,
        operation_degree: i32,
        operation_idx: usize,
        input_degree: i32,
        input_idx: usize,
    ) -> &mut FpVector {
        let output_degree = input_degree + operation_degree;
        &mut self.actions[input_degree][output_degree][operation_idx][input_idx]
    }

    /// Copy the part of `module` in degrees at most `max_degree` into an [`FDModule`]. Anything
    /// above `max_degree` is dropped. If `module` is bounded, its own top degree caps the result.
    pub fn from_module_truncated<M: Module<Algebra = A>>(
        module: &M,
        max_degree: i32,
    ) -> error::Result<Self> {
        let min_degree = module.min_degree();
        let max_degree = match module.max_degree() {
            Some(top) => {
                if top > max_degree {
                    module.compute_basis(top);
                    let dropped: usize = (max_degree + 1..=top).map(|t| module.dimension(t)).sum();
                    if dropped > 0 {
                        tracing::debug!(
                            module = %module,
                            max_degree,
                            dropped,
                            "truncation discards non-zero structure"
                        );
                    }
                }
                std::cmp::min(top, max_degree)
            }
            None => max_degree,
        };
        let algebra = module.algebra();
        algebra.ensure_degree(std::cmp::max(0, max_degree - min_degree))?;
        module.compute_basis(max_degree);

        let mut graded_dimension = BiVec::with_capacity(min_degree, max_degree + 1);
        for t in min_degree..=max_degree {
            graded_dimension.push(module.dimension(t));
        }
        let mut result = Self::new(Arc::clone(&algebra), module.to_string(), graded_dimension);
        for t in min_degree..=max_degree {
            for idx in 0..result.dimension(t) {
                result.set_basis_element_name(t, idx, module.basis_element_to_string(t, idx));
            }
        }

        for input_degree in min_degree..=max_degree {
            for output_degree in (input_degree + 1)..=max_degree {
                if result.dimension(output_degree) == 0 {
                    continue;
                }
                let op_degree = output_degree - input_degree;
                for input_idx in 0..result.dimension(input_degree) {
                    for op_idx in 0..algebra.dimension(op_degree) {
                        let output_vec = result.action_mut(op_degree, op_idx, input_degree, input_idx);
                        module.act_on_basis(
                            output_vec.as_slice_mut(),
                            1,
                            op_degree,
                            op_idx,
                            input_degree,
                            input_idx,
                        );
                    }
                }
            }
        }
        Ok(result)
    }
}

impl<A: GeneratedAlgebra> FDModule<A> {
    /// Fill in the actions of every non-generator, and check the result against the generating
    /// relations of the algebra. The actions of generators must already be set.
    pub(crate) fn close(&mut self) -> error::Result<()> {
        let min_degree = self.min_degree();
        let max_degree = self.graded_dimension.max_degree();
        for input_degree in (min_degree..=max_degree).rev() {
            for output_degree in input_degree + 1..=max_degree {
                self.extend_actions(input_degree, output_degree);
                self.check_validity(input_degree, output_degree)?;
            }
        }
        Ok(())
    }

    /// Verify every generating relation of the algebra from `input_deg` to `output_deg`.
    pub fn check_validity(&self, input_deg: i32, output_deg: i32) -> error::Result<()> {
        assert!(output_deg > input_deg);
        let p = self.prime();
        let algebra = self.algebra();
        let op_deg = output_deg - input_deg;
        let mut output_vec = FpVector::new(p, self.dimension(output_deg));
        let mut tmp_output = FpVector::new(p, 0);
        let relations = algebra.generating_relations(op_deg);
        for idx in 0..self.dimension(input_deg) {
            for relation in &relations {
                for &(coef, (deg_1, idx_1), (deg_2, idx_2)) in relation {
                    tmp_output.set_scratch_vector_size(self.dimension(input_deg + deg_2));
                    self.act_on_basis(tmp_output.as_slice_mut(), 1, deg_2, idx_2, input_deg, idx);
                    self.act(
                        output_vec.as_slice_mut(),
                        coef,
                        deg_1,
                        idx_1,
                        deg_2 + input_deg,
                        tmp_output.as_slice(),
                    );
                }

                if !output_vec.is_zero() {
                    let relation_string = relation
                        .iter()
                        .map(|&(coef, (deg_1, idx_1), (deg_2, idx_2))| {
                            format!(
                                "{coef} * {} * {}",
                                algebra.basis_element_to_string(deg_1, idx_1),
                                algebra.basis_element_to_string(deg_2, idx_2)
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("  +  ");
                    let value_string = format!(
                        "{} on {}",
                        self.element_to_string(output_deg, output_vec.as_slice()),
                        self.basis_element_to_string(input_deg, idx)
                    );
                    return Err(error::Error::failed_relation(relation_string, value_string));
                }
            }
        }
        Ok(())
    }

    /// Compute the action of the non-generators from `input_deg` to `output_deg`, assuming the
    /// actions into lower output degrees are known.
    pub fn extend_actions(&mut self, input_deg: i32, output_deg: i32) {
        let p = self.prime();
        let algebra = self.algebra();
        let op_deg = output_deg - input_deg;
        if self.dimension(output_deg) == 0 || self.dimension(input_deg) == 0 {
            return;
        }

        let mut tmp_output = FpVector::new(p, 0);
        let generators = algebra.generators(op_deg);
        for idx in 0..self.dimension(input_deg) {
            for op_idx in 0..algebra.dimension(op_deg) {
                if generators.contains(&op_idx) {
                    continue;
                }
                let mut output_vec = std::mem::replace(
                    &mut self.actions[input_deg][output_deg][op_idx][idx],
                    FpVector::new(p, 0),
                );
                output_vec.set_to_zero();
                for (coef, (deg_1, idx_1), (deg_2, idx_2)) in
                    algebra.decompose_basis_element(op_deg, op_idx)
                {
                    tmp_output.set_scratch_vector_size(self.dimension(input_deg + deg_2));
                    self.act_on_basis(tmp_output.as_slice_mut(), 1, deg_2, idx_2, input_deg, idx);
                    self.act(
                        output_vec.as_slice_mut(),
                        coef,
                        deg_1,
                        idx_1,
                        deg_2 + input_deg,
                        tmp_output.as_slice(),
                    );
                }
                self.actions[input_deg][output_deg][op_idx][idx] = output_vec;
            }
        }
    }

    /// The actions of the algebra generators, as relations `op gen = sum` that
    /// [`FDModuleBuilder::add_action`] accepts.
    pub fn actions_to_strings(&self) -> Vec<String> {
        let algebra = self.algebra();
        let min_degree = self.min_degree();
        let max_degree = self.graded_dimension.len();
        let mut actions = Vec::new();
        for input_degree in min_degree..max_degree {
            for output_degree in (input_degree + 1)..max_degree {
                if self.dimension(output_degree) == 0 {
                    continue;
                }
                let op_degree = output_degree - input_degree;
                for op_idx in algebra.generators(op_degree) {
                    for input_idx in 0..self.dimension(input_degree) {
                        let vec = self.action(op_degree, op_idx, input_degree, input_idx);
                        if vec.is_zero() {
                            continue;
                        }
                        actions.push(format!(
                            "{} {} = {}",
                            algebra.generator_to_string(op_degree, op_idx),
                            self.gen_names[input_degree][input_idx],
                            self.element_to_string(output_degree, vec.as_slice())
                        ))
                    }
                }
            }
        }
        actions
    }

    pub fn to_json(&self) -> Value {
        let mut gens = serde_json::Map::new();
        for (i, deg_i_gens) in self.gen_names.iter_enum() {
            for g in deg_i_gens {
                gens.insert(g.clone(), Value::from(i));
            }
        }
        json!({
            "type": "finite dimensional module",
            "name": self.name,
            "p": self.prime().as_u32(),
            "gens": gens,
            "actions": self.actions_to_strings(),
        })
    }

    /// Read a module written by [`FDModule::to_json`]. The actions listed are treated exactly as
    /// builder relations, so the result is validated in the same way.
    pub fn from_json(algebra: Arc<A>, json: &Value) -> error::Result<Self> {
        let malformed = |reason: &str| error::Error::parse(&json.to_string(), reason);
        let document = ModuleDocument::deserialize(json)?;

        if let Some(p) = document.p {
            if p != algebra.prime().as_u32() {
                return Err(malformed(&format!(
                    "module is defined at p = {p} but the algebra is at p = {}",
                    algebra.prime()
                )));
            }
        }

        let mut builder = FDModuleBuilder::new(algebra);
        if let Some(name) = document.name {
            builder = builder.set_name(name);
        }
        for (name, degree) in document.gens {
            let degree = degree
                .as_i64()
                .and_then(|d| i32::try_from(d).ok())
                .ok_or_else(|| malformed(&format!("bad degree for {name}")))?;
            builder = builder.add_generator(degree, name)?;
        }
        for action in &document.actions {
            builder = builder.add_action(action)?;
        }
        builder.build()
    }
}

/// The json form of an [`FDModule`]. Generators keep the order they are listed in.
#[derive(Deserialize)]
struct ModuleDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    p: Option<u32>,
    gens: Map<String, Value>,
    #[serde(default)]
    actions: Vec<String>,
}
