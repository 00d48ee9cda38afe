//! Chain maps between resolutions, obtained by lifting a map of the resolved modules.

use std::sync::Arc;

use algebra::module::homomorphism::{FreeModuleHomomorphism, ModuleHomomorphism};
use algebra::module::Module;
use fp::vector::FpVector;
use maybe_rayon::prelude::*;
use once::OnceVec;
use parking_lot::Mutex;

use crate::chain_complex::{AugmentedChainComplex, FreeChainComplex};

/// A chain map from the resolution `source` to the resolution `target`, lifting a map between the
/// modules they resolve. The map on the `s`th module has the same degree shift as the module map,
/// so a generator in degree `t` is sent to degree `t - shift_t`.
///
/// The lift is unique up to chain homotopy. For a fixed pair of resolutions, the choices made
/// here are deterministic.
pub struct ResolutionHomomorphism<CC1, CC2>
where
    CC1: FreeChainComplex + AugmentedChainComplex,
    CC2: FreeChainComplex<Algebra = CC1::Algebra> + AugmentedChainComplex,
{
    name: String,
    pub source: Arc<CC1>,
    pub target: Arc<CC2>,
    maps: OnceVec<FreeModuleHomomorphism<CC2::Module>>,
    lock: Mutex<()>,
    pub shift_t: i32,
}

impl<CC1, CC2> ResolutionHomomorphism<CC1, CC2>
where
    CC1: FreeChainComplex + AugmentedChainComplex,
    CC2: FreeChainComplex<Algebra = CC1::Algebra> + AugmentedChainComplex,
{
    fn new(name: String, source: Arc<CC1>, target: Arc<CC2>, shift_t: i32) -> Self {
        Self {
            name,
            source,
            target,
            maps: OnceVec::new(),
            lock: Mutex::new(()),
            shift_t,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lift `f` to a chain map. Stage 0 is computed right away, through the top degree of the
    /// source module, after extending both resolutions at stage 0 as far as needed.
    pub fn from_module_homomorphism<F>(
        name: String,
        source: Arc<CC1>,
        target: Arc<CC2>,
        f: &F,
    ) -> error::Result<Self>
    where
        F: ModuleHomomorphism<Source = CC1::TargetModule, Target = CC2::TargetModule>,
    {
        let source_module = source.target();
        let target_module = target.target();
        if !Arc::ptr_eq(&source_module, &f.source()) {
            return Err(error::Error::InconsistentHomomorphism(format!(
                "{name}: source resolution resolves {source_module}, not {}",
                f.source()
            )));
        }
        if !Arc::ptr_eq(&target_module, &f.target()) {
            return Err(error::Error::InconsistentHomomorphism(format!(
                "{name}: target resolution resolves {target_module}, not {}",
                f.target()
            )));
        }
        let max_degree = source_module.max_degree().ok_or_else(|| {
            error::Error::InconsistentHomomorphism(format!(
                "{name}: source module {source_module} is not bounded"
            ))
        })?;

        let p = source.prime();
        let shift_t = f.degree_shift();

        source.compute_through_bidegree(0, max_degree)?;
        target.compute_through_bidegree(0, max_degree - shift_t)?;

        let hom = Self::new(name, source, target, shift_t);
        let source_augmentation = hom.source.augmentation();
        let target_augmentation = hom.target.augmentation();

        let g = hom.get_map_ensure_length(0);
        for t in g.next_degree()..=max_degree {
            let output_t = t - shift_t;
            let num_gens = hom.source.number_of_gens_in_bidegree(0, t);
            let output_dimension = hom.target.module(0).dimension(output_t);
            let mut outputs = vec![FpVector::new(p, output_dimension); num_gens];
            if num_gens > 0 && output_dimension > 0 {
                let quasi_inverse = target_augmentation
                    .quasi_inverse(output_t)
                    .ok_or(error::Error::ResolutionNotExtended { s: 0, t: output_t })?;
                let mut fx = FpVector::new(p, target_module.dimension(output_t));
                for (j, output) in outputs.iter_mut().enumerate() {
                    f.apply(
                        fx.as_slice_mut(),
                        1,
                        t,
                        source_augmentation.output(t, j).as_slice(),
                    );
                    quasi_inverse.apply(output.as_slice_mut(), 1, fx.as_slice());
                    fx.set_to_zero();
                }
            }
            g.add_generators_from_rows(t, outputs);
        }
        tracing::debug!(name = %hom.name, max_degree, "lifted stage 0");
        Ok(hom)
    }

    fn get_map_ensure_length(&self, s: u32) -> &FreeModuleHomomorphism<CC2::Module> {
        self.maps.extend(s as usize, |s| {
            FreeModuleHomomorphism::new(
                self.source.module(s as u32),
                self.target.module(s as u32),
                self.shift_t,
            )
        });
        &self.maps[s as usize]
    }

    /// The map on the `s`th module, if the lift has reached stage `s`.
    pub fn get_map(&self, s: u32) -> Option<&FreeModuleHomomorphism<CC2::Module>> {
        self.maps.get(s as usize)
    }

    /// The largest degree of the source the lift can be extended to at stage `s`, given what the
    /// two resolutions have computed.
    fn max_extendable_degree(&self, s: u32) -> Option<i32> {
        if s >= self.source.next_homological_degree() || s >= self.target.next_homological_degree()
        {
            return None;
        }
        let source_max = self.source.differential(s).next_degree() - 1;
        let target_max = self.target.differential(s).next_degree() - 1 + self.shift_t;
        Some(std::cmp::min(source_max, target_max))
    }

    /// Extend the lift to stages `s <= max_s` and source degrees `t <= max_t`. Both resolutions
    /// must already be computed that far; otherwise nothing is changed.
    pub fn extend(&self, max_s: u32, max_t: i32) -> error::Result<()> {
        if !self.source.has_computed_bidegree(max_s, max_t) {
            return Err(error::Error::ResolutionNotExtended { s: max_s, t: max_t });
        }
        let output_t = max_t - self.shift_t;
        if !self.target.has_computed_bidegree(max_s, output_t) {
            return Err(error::Error::ResolutionNotExtended {
                s: max_s,
                t: output_t,
            });
        }

        let _lock = self.lock.lock();
        for s in 0..=max_s {
            self.extend_stage(s, max_t)?;
        }
        Ok(())
    }

    /// Extend the lift as far as both resolutions allow.
    pub fn extend_all(&self) -> error::Result<()> {
        let _lock = self.lock.lock();
        let mut s = 0;
        while let Some(max_t) = self.max_extendable_degree(s) {
            self.extend_stage(s, max_t)?;
            s += 1;
        }
        Ok(())
    }

    /// Compute both resolutions far enough, then [`ResolutionHomomorphism::extend`].
    pub fn extend_resolving(&self, max_s: u32, max_t: i32) -> error::Result<()> {
        self.source.compute_through_bidegree(max_s, max_t)?;
        self.target
            .compute_through_bidegree(max_s, max_t - self.shift_t)?;
        self.extend(max_s, max_t)
    }

    fn extend_stage(&self, s: u32, max_t: i32) -> error::Result<()> {
        let map = self.get_map_ensure_length(s);
        for t in map.next_degree()..=max_t {
            self.extend_step(s, t)?;
        }
        Ok(())
    }

    /// Compute the lift on the generators of bidegree `(s, t)` as `g_s = d^{-1} g_{s-1} d`, using
    /// the quasi-inverse of the target differential.
    #[tracing::instrument(skip(self), fields(name = %self.name))]
    fn extend_step(&self, s: u32, t: i32) -> error::Result<()> {
        let output_t = t - self.shift_t;
        let p = self.source.prime();

        let f_cur = self.get_map_ensure_length(s);
        if t < f_cur.next_degree() {
            return Ok(());
        }

        let num_gens = self.source.number_of_gens_in_bidegree(s, t);
        let fx_dimension = f_cur.target().dimension(output_t);
        if num_gens == 0 || fx_dimension == 0 {
            f_cur.add_generators_from_rows(t, vec![FpVector::new(p, fx_dimension); num_gens]);
            return Ok(());
        }
        // The generators of the 0th module all lie in degrees where the module is non-zero, and
        // these were handled when the lift was created.
        assert!(s > 0, "stage 0 generator in degree {t} was not lifted");

        let d_source = self.source.differential(s);
        let d_target = self.target.differential(s);
        let f_prev = self.get_map_ensure_length(s - 1);
        let quasi_inverse = d_target
            .quasi_inverse(output_t)
            .ok_or(error::Error::ResolutionNotExtended { s, t: output_t })?;

        let fdx_dimension = f_prev.target().dimension(output_t);
        let outputs: Vec<FpVector> = (0..num_gens)
            .into_maybe_par_iter()
            .map(|k| {
                let mut fdx = FpVector::new(p, fdx_dimension);
                f_prev.apply(fdx.as_slice_mut(), 1, t, d_source.output(t, k).as_slice());
                let mut output = FpVector::new(p, fx_dimension);
                quasi_inverse.apply(output.as_slice_mut(), 1, fdx.as_slice());
                output
            })
            .collect();
        f_cur.add_generators_from_rows(t, outputs);
        Ok(())
    }

    /// The image of generator `idx` of the source in bidegree `(s, t)`, as an element of the
    /// `s`th module of the target in degree `t - shift_t`.
    ///
    /// This is the chain-level map, so `idx` indexes a generator of the source. For the induced
    /// map on Ext, where `idx` indexes a generator of the target, use [`Self::act_on_ext`].
    pub fn act(&self, s: u32, t: i32, idx: usize) -> error::Result<FpVector> {
        let map = self
            .get_map(s)
            .filter(|map| map.next_degree() > t)
            .ok_or(error::Error::ResolutionNotExtended { s, t })?;
        let num_gens = self.source.number_of_gens_in_bidegree(s, t);
        if idx >= num_gens {
            return Err(error::Error::UnknownGenerator(format!(
                "x_({s}, {t}, {idx}): only {num_gens} generators in bidegree ({s}, {t})"
            )));
        }
        if t < ModuleHomomorphism::min_degree(map) {
            return Ok(FpVector::new(self.source.prime(), 0));
        }
        Ok(map.output(t, idx).clone())
    }

    /// The induced map on Ext, evaluated on the dual of target generator `idx` in bidegree
    /// `(s, t)`. The result lists, for each source generator in bidegree `(s, t + shift_t)`, the
    /// coefficient of the target generator in its image.
    pub fn act_on_ext(&self, s: u32, t: i32, idx: usize) -> error::Result<Vec<u32>> {
        let source_t = t + self.shift_t;
        let map = self
            .get_map(s)
            .filter(|map| map.next_degree() > source_t)
            .ok_or(error::Error::ResolutionNotExtended { s, t: source_t })?;

        let target_module = self.target.module(s);
        if !self.target.has_computed_bidegree(s, t) || idx >= target_module.number_of_gens_in_degree(t)
        {
            return Err(error::Error::UnknownGenerator(format!(
                "x_({s}, {t}, {idx}) is not a generator of the target"
            )));
        }
        let num_gens = self.source.number_of_gens_in_bidegree(s, source_t);
        let j = target_module.operation_generator_to_index(0, 0, t, idx);
        Ok((0..num_gens)
            .map(|i| map.output(source_t, i).entry(j))
            .collect())
    }
}
