use std::sync::Arc;

use algebra::module::homomorphism::{
    FDModuleHomomorphism, FDModuleHomomorphismBuilder, ModuleHomomorphism,
};
use algebra::module::{FDModule, Module, TensorModule};
use algebra::MilnorAlgebra;
use expect_test::expect;
use ext_engine::chain_complex::{AugmentedChainComplex, ChainComplex, FreeChainComplex};
use ext_engine::resolution::Resolution;
use ext_engine::resolution_homomorphism::ResolutionHomomorphism;
use ext_engine::utils::{construct, FDResolution};
use fp::vector::FpVector;

type Lift = ResolutionHomomorphism<FDResolution, FDResolution>;

fn resolution(module_name: &str) -> Arc<FDResolution> {
    construct(format!("steenrod_modules/{module_name}.json").as_str()).unwrap()
}

/// Check `d g_s = g_{s - 1} d` on every generator through `(max_s, max_t)`, and `ε g_0 = f ε`.
fn check_chain_map(
    hom: &Lift,
    f: &FDModuleHomomorphism<MilnorAlgebra>,
    max_s: u32,
    max_t: i32,
) {
    let p = hom.source.prime();
    let shift = hom.shift_t;
    for s in 0..=max_s {
        for t in 0..=max_t {
            let output_t = t - shift;
            for idx in 0..hom.source.number_of_gens_in_bidegree(s, t) {
                let gx = hom.act(s, t, idx).unwrap();
                let (lhs, rhs) = if s == 0 {
                    let target_module = hom.target.target();
                    let mut lhs = FpVector::new(p, target_module.dimension(output_t));
                    hom.target
                        .augmentation()
                        .apply(lhs.as_slice_mut(), 1, output_t, gx.as_slice());

                    let source_module = hom.source.target();
                    let mut ex = FpVector::new(p, source_module.dimension(t));
                    hom.source.augmentation().apply_to_basis_element(
                        ex.as_slice_mut(),
                        1,
                        t,
                        hom.source.module(0).operation_generator_to_index(0, 0, t, idx),
                    );
                    let mut rhs = FpVector::new(p, target_module.dimension(output_t));
                    f.apply(rhs.as_slice_mut(), 1, t, ex.as_slice());
                    (lhs, rhs)
                } else {
                    let dimension = hom.target.module(s - 1).dimension(output_t);
                    let mut lhs = FpVector::new(p, dimension);
                    hom.target
                        .differential(s)
                        .apply(lhs.as_slice_mut(), 1, output_t, gx.as_slice());

                    let mut rhs = FpVector::new(p, dimension);
                    let d = hom.source.differential(s);
                    let dx = d.output(t, idx);
                    hom.get_map(s - 1)
                        .unwrap()
                        .apply(rhs.as_slice_mut(), 1, t, dx.as_slice());
                    (lhs, rhs)
                };
                assert_eq!(lhs, rhs, "{}: x_({s}, {t}, {idx})", hom.name());
            }
        }
    }
}

fn c2_to_sphere() -> (Lift, FDModuleHomomorphism<MilnorAlgebra>) {
    let source = resolution("C2");
    let target = resolution("S_2");
    let f = FDModuleHomomorphismBuilder::new(source.target(), target.target(), 0)
        .set("x0", "x0")
        .and_then(FDModuleHomomorphismBuilder::build)
        .unwrap();
    let hom = Lift::from_module_homomorphism("C2 -> S".to_owned(), source, target, &f).unwrap();
    hom.extend_resolving(4, 12).unwrap();
    (hom, f)
}

#[test]
fn bottom_cell() {
    let (hom, f) = c2_to_sphere();
    check_chain_map(&hom, &f, 4, 12);

    // There is no generator in bidegree (1, 1) of the source, since h_0 acts trivially.
    assert!(matches!(
        hom.act(1, 1, 0),
        Err(ext_engine::Error::UnknownGenerator(_))
    ));

    let f_h1 = hom.act(1, 2, 0).unwrap();
    let target = hom.target.module(1);
    expect!["x_{2,0}"].assert_eq(&target.element_to_string(2, f_h1.as_slice()));
    expect!["x_{0,0}"].assert_eq(
        &hom.target
            .module(0)
            .element_to_string(0, hom.act(0, 0, 0).unwrap().as_slice()),
    );

    // h_0 pulls back to zero and h_1 pulls back to h_1.
    assert_eq!(hom.act_on_ext(1, 1, 0).unwrap(), Vec::<u32>::new());
    assert_eq!(hom.act_on_ext(1, 2, 0).unwrap(), vec![1]);
    assert_eq!(hom.act_on_ext(0, 0, 0).unwrap(), vec![1]);
}

#[test]
fn lift_is_deterministic() {
    let (first, _) = c2_to_sphere();
    let (second, _) = c2_to_sphere();
    for s in 0..=4 {
        for t in 0..=12 {
            for idx in 0..first.source.number_of_gens_in_bidegree(s, t) {
                assert_eq!(
                    first.act(s, t, idx).unwrap(),
                    second.act(s, t, idx).unwrap(),
                    "x_({s}, {t}, {idx})"
                );
            }
            for idx in 0..first.target.number_of_gens_in_bidegree(s, t) {
                assert_eq!(
                    first.act_on_ext(s, t, idx).unwrap(),
                    second.act_on_ext(s, t, idx).unwrap()
                );
            }
        }
    }
}

#[test]
fn identity() {
    for module_name in ["S_2", "C2", "Joker", "C3"] {
        let res = resolution(module_name);
        res.resolve_through_degree(10).unwrap();
        let f = FDModuleHomomorphism::identity(res.target());
        let hom = Lift::from_module_homomorphism(
            format!("id_{module_name}"),
            Arc::clone(&res),
            Arc::clone(&res),
            &f,
        )
        .unwrap();
        hom.extend_all().unwrap();

        for s in 0..=10 {
            let module = res.module(s);
            for t in 0..=10 {
                for idx in 0..module.number_of_gens_in_degree(t) {
                    let mut expected = FpVector::new(res.prime(), module.dimension(t));
                    expected.set_entry(module.operation_generator_to_index(0, 0, t, idx), 1);
                    assert_eq!(
                        hom.act(s, t, idx).unwrap(),
                        expected,
                        "{module_name}: x_({s}, {t}, {idx})"
                    );
                    let mut ext = vec![0; module.number_of_gens_in_degree(t)];
                    ext[idx] = 1;
                    assert_eq!(hom.act_on_ext(s, t, idx).unwrap(), ext);
                }
            }
        }
    }
}

#[test]
fn eta_left_right() {
    let c2 = resolution("C2").target();
    let tensor = TensorModule::new(Arc::clone(&c2), Arc::clone(&c2));
    let max_degree = c2.max_degree().unwrap();
    let source_module = Arc::new(tensor.as_finite_module(2 * max_degree).unwrap());
    assert_eq!(source_module.total_dimension(), 4);

    let base = c2.basis_element_to_string(0, 0);
    let mut eta_l = FDModuleHomomorphismBuilder::new(Arc::clone(&source_module), Arc::clone(&c2), 0);
    let mut eta_r = FDModuleHomomorphismBuilder::new(Arc::clone(&source_module), Arc::clone(&c2), 0);
    for t in c2.min_degree()..=max_degree {
        for idx in 0..c2.dimension(t) {
            let name = c2.basis_element_to_string(t, idx);
            eta_l = eta_l.set(&format!("{name}.{base}"), &name).unwrap();
            eta_r = eta_r.set(&format!("{base}.{name}"), &name).unwrap();
        }
    }
    let eta_l = eta_l.build().unwrap();
    let eta_r = eta_r.build().unwrap();

    let source = Arc::new(Resolution::new(source_module));
    let target = Arc::new(Resolution::new(c2));
    for (name, f) in [("etaL", &eta_l), ("etaR", &eta_r)] {
        let hom =
            Lift::from_module_homomorphism(name.to_owned(), Arc::clone(&source), Arc::clone(&target), f)
                .unwrap();
        hom.extend_resolving(4, 10).unwrap();
        check_chain_map(&hom, f, 4, 10);
        assert_eq!(hom.act_on_ext(0, 0, 0).unwrap(), vec![1]);
    }
}

#[test]
fn shifted_map() {
    // The inclusion of the top cell of C2 is a map S -> C2 of degree -1.
    let source = resolution("S_2");
    let target = resolution("C2");
    let f = FDModuleHomomorphismBuilder::new(source.target(), target.target(), -1)
        .set("x0", "x1")
        .and_then(FDModuleHomomorphismBuilder::build)
        .unwrap();
    let hom = Lift::from_module_homomorphism("top cell".to_owned(), source, target, &f).unwrap();
    hom.extend_resolving(3, 8).unwrap();
    check_chain_map(&hom, &f, 3, 8);

    // The generator of F_0(S) goes to Sq1 on the generator of F_0(C2).
    expect!["Sq(1) x_{0,0}"].assert_eq(
        &hom.target
            .module(0)
            .element_to_string(1, hom.act(0, 0, 0).unwrap().as_slice()),
    );
}
