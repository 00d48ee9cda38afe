use std::sync::Arc;

use bivec::BiVec;
use fp::vector::FpVector;
use rustc_hash::FxHashMap;

use crate::algebra::GeneratedAlgebra;
use crate::module::{FDModule, Module};
use crate::steenrod_parser::{self, ModuleSum};

/// A relation `op gen = sum` after the algebra element has been parsed. The generator names are
/// resolved at build time, once every generator is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRelation {
    pub op: (i32, usize),
    pub input: String,
    pub output: ModuleSum,
    pub text: String,
}

/// Accumulates generators and action relations, then freezes them into an [`FDModule`].
///
/// ```
/// # use std::sync::Arc;
/// # use algebra::{MilnorAlgebra, module::{FDModuleBuilder, Module}};
/// # use fp::prime::ValidPrime;
/// let algebra = Arc::new(MilnorAlgebra::new(ValidPrime::new(2)));
/// let c2 = FDModuleBuilder::new(algebra)
///     .add_generator(0, "x0")?
///     .add_generator(1, "x1")?
///     .add_action("Sq1 x0 = x1")?
///     .build()?;
/// assert_eq!(c2.total_dimension(), 2);
/// # Ok::<(), error::Error>(())
/// ```
pub struct FDModuleBuilder<A: GeneratedAlgebra> {
    algebra: Arc<A>,
    name: String,
    /// Generators in insertion order.
    gens: Vec<(i32, String)>,
    gen_to_idx: FxHashMap<String, (i32, usize)>,
    relations: Vec<ActionRelation>,
}

impl<A: GeneratedAlgebra> FDModuleBuilder<A> {
    pub fn new(algebra: Arc<A>) -> Self {
        Self {
            algebra,
            name: String::new(),
            gens: Vec::new(),
            gen_to_idx: FxHashMap::default(),
            relations: Vec::new(),
        }
    }

    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a basis element. Within a degree, basis elements are indexed in the order they are
    /// added.
    pub fn add_generator(mut self, degree: i32, name: impl Into<String>) -> error::Result<Self> {
        let name = name.into();
        if !steenrod_parser::is_generator_name(&name) {
            return Err(error::Error::parse(&name, "invalid generator name"));
        }
        if self.gen_to_idx.contains_key(&name) {
            return Err(error::Error::DuplicateGenerator(name));
        }
        let idx = self.gens.iter().filter(|(d, _)| *d == degree).count();
        self.gen_to_idx.insert(name.clone(), (degree, idx));
        self.gens.push((degree, name));
        Ok(self)
    }

    /// Add a relation such as `P1 x0 = x4` or `Sq(0,1) x0 = x3 + x2.x1`. Relations on algebra
    /// generators define the module; relations on other basis elements are checked against the
    /// action computed from the generators.
    pub fn add_action(mut self, text: &str) -> error::Result<Self> {
        let parsed = steenrod_parser::parse_relation(text)?;
        let op = self
            .algebra
            .basis_element_from_string(&parsed.operation)
            .ok_or_else(|| {
                error::Error::InvalidRelation(format!(
                    "{text}: {} is not an element of {}",
                    parsed.operation, self.algebra
                ))
            })?;
        self.relations.push(ActionRelation {
            op,
            input: parsed.input,
            output: parsed.output,
            text: text.to_owned(),
        });
        Ok(self)
    }

    fn lookup(&self, name: &str) -> error::Result<(i32, usize)> {
        self.gen_to_idx
            .get(name)
            .copied()
            .ok_or_else(|| error::Error::UnknownGenerator(name.to_owned()))
    }

    /// Resolve the names of `relation`, returning the input basis element and the output vector,
    /// or `None` if the output degree is empty.
    fn resolve(
        &self,
        relation: &ActionRelation,
        graded_dimension: &BiVec<usize>,
    ) -> error::Result<((i32, usize), Option<FpVector>)> {
        let p = self.algebra.prime();
        let (op_deg, _) = relation.op;
        let (input_deg, input_idx) = self.lookup(&relation.input)?;
        let output_deg = input_deg + op_deg;

        let dim = graded_dimension.get(output_deg).copied().unwrap_or(0);
        let mut output = FpVector::new(p, dim);
        for (coeff, name) in &relation.output {
            let (deg, idx) = self.lookup(name)?;
            if deg != output_deg {
                return Err(error::Error::InvalidRelation(format!(
                    "{}: degree of {name} is {deg} but degree of the left hand side is {output_deg}",
                    relation.text
                )));
            }
            output.add_basis_element(idx, *coeff);
        }
        Ok(((input_deg, input_idx), (dim > 0).then_some(output)))
    }

    #[tracing::instrument(skip_all, fields(module = %self.name))]
    pub fn build(self) -> error::Result<FDModule<A>> {
        let p = self.algebra.prime();
        let min_degree = self.gens.iter().map(|&(d, _)| d).min().unwrap_or(0);
        let max_degree = self.gens.iter().map(|&(d, _)| d).max().unwrap_or(min_degree - 1);
        let mut graded_dimension = BiVec::with_capacity(min_degree, max_degree + 1);
        graded_dimension.extend_with(max_degree, 0);
        for &(d, _) in &self.gens {
            graded_dimension[d] += 1;
        }

        let mut declared: FxHashMap<((i32, usize), (i32, usize)), (FpVector, &str)> =
            FxHashMap::default();
        for relation in &self.relations {
            let (input, output) = self.resolve(relation, &graded_dimension)?;
            let Some(output) = output else {
                continue;
            };
            if relation.op.0 == 0 {
                // The only operation in degree 0 is the unit.
                let mut identity = FpVector::new(p, output.len());
                identity.add_basis_element(input.1, 1);
                if output != identity {
                    return Err(error::Error::InvalidRelation(format!(
                        "{}: the unit must act as the identity",
                        relation.text
                    )));
                }
                continue;
            }
            match declared.get(&(relation.op, input)) {
                Some((existing, text)) if existing != &output => {
                    return Err(error::Error::InvalidRelation(format!(
                        "{} conflicts with {text}",
                        relation.text
                    )));
                }
                Some(_) => {}
                None => {
                    declared.insert((relation.op, input), (output, &relation.text));
                }
            }
        }

        self.algebra.ensure_degree(max_degree - min_degree)?;

        let mut module = FDModule::new(Arc::clone(&self.algebra), self.name.clone(), graded_dimension);
        for (d, name) in &self.gens {
            let (_, idx) = self.gen_to_idx[name];
            module.set_basis_element_name(*d, idx, name.clone());
        }

        let mut non_generators = Vec::new();
        for (&((op_deg, op_idx), (input_deg, input_idx)), (output, text)) in &declared {
            if self.algebra.generators(op_deg).contains(&op_idx) {
                module.set_action(op_deg, op_idx, input_deg, input_idx, output);
            } else {
                non_generators.push(((op_deg, op_idx), (input_deg, input_idx), output, *text));
            }
        }

        module.close()?;

        // Sort so that the first reported mismatch does not depend on hashing.
        non_generators.sort_by_key(|&(op, input, _, _)| (input, op));
        for ((op_deg, op_idx), (input_deg, input_idx), output, text) in non_generators {
            let computed = module.action(op_deg, op_idx, input_deg, input_idx);
            if computed != output {
                return Err(error::Error::InvalidRelation(format!(
                    "{text}: the generators force {}",
                    module.element_to_string(input_deg + op_deg, computed.as_slice())
                )));
            }
        }

        tracing::debug!(
            dimension = module.total_dimension(),
            relations = self.relations.len(),
            "built module"
        );
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{Algebra, MilnorAlgebra};
    use fp::prime::ValidPrime;
    use rstest::rstest;

    fn builder(p: u32) -> FDModuleBuilder<MilnorAlgebra> {
        FDModuleBuilder::new(Arc::new(MilnorAlgebra::new(ValidPrime::new(p))))
    }

    fn build(p: u32, gens: &[(i32, &str)], actions: &[&str]) -> error::Result<FDModule<MilnorAlgebra>> {
        let mut b = builder(p);
        for &(d, name) in gens {
            b = b.add_generator(d, name)?;
        }
        for action in actions {
            b = b.add_action(action)?;
        }
        b.build()
    }

    #[test]
    fn c2() {
        let module = build(2, &[(0, "x0"), (1, "x1")], &["Sq1 x0 = x1"]).unwrap();
        assert_eq!(module.dimension(0), 1);
        assert_eq!(module.dimension(1), 1);
        assert_eq!(module.action(1, 0, 0, 0).entry(0), 1);
    }

    #[test]
    fn odd_prime_relation() {
        let module = build(3, &[(0, "x0"), (1, "x1"), (4, "x4")], &["b x0 = x1", "P1 x0 = x4"]).unwrap();
        let algebra = module.algebra();
        let (deg, idx) = algebra.basis_element_from_string("P1").unwrap();
        assert_eq!(module.element_to_string(4, module.action(deg, idx, 0, 0).as_slice()), "x4");
        assert_eq!(module.max_degree(), Some(4));
    }

    #[test]
    fn non_generator_relations_are_checked() {
        let gens = [(0, "x0"), (1, "x1"), (2, "x2"), (3, "x3")];
        let actions = ["Sq1 x0 = x1", "Sq2 x1 = x3", "Sq2 x0 = x2", "Sq1 x2 = x3"];
        // Sq(0,1) = Sq3 + Sq2 Sq1, and Sq3 = Sq1 Sq2.
        let mut consistent = actions.to_vec();
        consistent.push("Sq(0,1) x0 = 0");
        build(2, &gens, &consistent).unwrap();

        let mut inconsistent = actions.to_vec();
        inconsistent.push("Sq(0,1) x0 = x3");
        assert!(matches!(
            build(2, &gens, &inconsistent),
            Err(error::Error::InvalidRelation(_))
        ));
    }

    #[rstest]
    #[case(&[(0, "x0"), (1, "x1"), (2, "x2")], &["Sq1 x0 = x1", "Sq1 x1 = x2"])]
    #[case(&[(0, "x0"), (1, "x1")], &["Sq1 x0 = x1", "Sq1 x0 = 0"])]
    #[case(&[(0, "x0"), (2, "x2")], &["Sq1 x0 = x2"])]
    #[case(&[(0, "x0")], &["1 x0 = 0"])]
    fn invalid_relation(#[case] gens: &[(i32, &str)], #[case] actions: &[&str]) {
        let result = build(2, gens, actions);
        assert!(
            matches!(result, Err(error::Error::InvalidRelation(_))),
            "{result:?}"
        );
    }

    #[test]
    fn failed_relation_message() {
        let err = build(2, &[(0, "x0"), (1, "x1"), (2, "x2")], &["Sq1 x0 = x1", "Sq1 x1 = x2"])
            .unwrap_err();
        assert!(err.to_string().contains("Relation failed"), "{err}");
    }

    #[test]
    fn unknown_and_duplicate_generators() {
        assert!(matches!(
            build(2, &[(0, "x0")], &["Sq1 x0 = y"]),
            Err(error::Error::UnknownGenerator(name)) if name == "y"
        ));
        assert!(matches!(
            build(2, &[(0, "x0"), (1, "x0")], &[]),
            Err(error::Error::DuplicateGenerator(_))
        ));
        assert!(matches!(
            build(2, &[(0, "x0")], &["Sq1 z = x0"]),
            Err(error::Error::UnknownGenerator(_))
        ));
    }

    #[rstest]
    #[case(2, "Q_1 x0 = x1")]
    #[case(2, "Sq1 Sq1 x0 = x1")]
    #[case(3, "Sq1 x0 = x1")]
    #[case(3, "Q_1 Q_0 x0 = x1")]
    fn unparseable_operation(#[case] p: u32, #[case] text: &str) {
        let result = builder(p)
            .add_generator(0, "x0")
            .and_then(|b| b.add_generator(1, "x1"))
            .and_then(|b| b.add_action(text));
        assert!(matches!(result, Err(error::Error::InvalidRelation(_))));
    }

    #[test]
    fn insufficient_algebra_data() {
        let algebra = Arc::new(MilnorAlgebra::with_max_degree(ValidPrime::new(2), 2));
        let result = FDModuleBuilder::new(algebra)
            .add_generator(0, "x0")
            .and_then(|b| b.add_generator(4, "x4"))
            .and_then(FDModuleBuilder::build);
        assert!(matches!(
            result,
            Err(error::Error::InsufficientAlgebraData { requested: 4, available: 2 })
        ));
    }

    #[test]
    fn empty_module() {
        let module = builder(2).build().unwrap();
        assert_eq!(module.total_dimension(), 0);
    }

    #[test]
    fn generator_order() {
        let module = build(2, &[(0, "a"), (2, "c"), (0, "b")], &[]).unwrap();
        assert_eq!(module.string_to_basis_element("b"), Some((0, 1)));
        assert_eq!(module.string_to_basis_element("c"), Some((2, 0)));
        assert_eq!(module.dimension(1), 0);
        let algebra = module.algebra();
        assert!(algebra.dimension(2) > 0);
    }
}
