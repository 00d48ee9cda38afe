use itertools::Itertools;
use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use fp::prime::ValidPrime;
use fp::vector::{FpVector, SliceMut};
use once::OnceVec;

use crate::algebra::combinatorics;
use crate::algebra::{Algebra, Bialgebra, GeneratedAlgebra};
use crate::steenrod_parser::{self, AlgebraBasisElt};

pub type PPart = Vec<u32>;

/// The Milnor basis element `Q(E) P(R)`. The bits of `q_part` record `E`, and `p_part` is `R`
/// without trailing zeros. At the prime 2, `q_part` is always zero and `P(R)` is `Sq(R)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MilnorBasisElement {
    pub q_part: u32,
    pub p_part: PPart,
    pub degree: i32,
}

impl MilnorBasisElement {
    fn from_p(p_part: PPart, degree: i32) -> Self {
        Self {
            q_part: 0,
            p_part,
            degree,
        }
    }
}

fn trim_zeros(v: &mut PPart) {
    while let Some(0) = v.last() {
        v.pop();
    }
}

fn is_power_of(mut n: u32, p: u32) -> bool {
    if n == 0 {
        return false;
    }
    while n % p == 0 {
        n /= p;
    }
    n == 1
}

// The basis in degree d is built from ppart_table and the subsets of tau degrees: for each subset
// E of total degree e with d - e divisible by q, every P(R) in ppart_table[(d - e) / q] gives the
// basis element Q(E) P(R). Subsets are visited in increasing order of their bitmask.
pub struct MilnorAlgebra {
    p: ValidPrime,
    generic: bool,
    max_degree: Option<i32>,
    xi_degrees: Vec<i32>,
    tau_degrees: Vec<i32>,
    lock: Mutex<()>,
    ppart_table: OnceVec<Vec<PPart>>,
    basis_table: OnceVec<Vec<MilnorBasisElement>>,
    basis_element_to_index_map: OnceVec<HashMap<MilnorBasisElement, usize>>,
}

impl std::fmt::Display for MilnorAlgebra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MilnorAlgebra(p={})", self.p)
    }
}

impl MilnorAlgebra {
    pub fn new(p: ValidPrime) -> Self {
        Self {
            p,
            generic: p != 2,
            max_degree: None,
            xi_degrees: combinatorics::xi_degrees(p),
            tau_degrees: combinatorics::tau_degrees(p),
            lock: Mutex::new(()),
            ppart_table: OnceVec::new(),
            basis_table: OnceVec::new(),
            basis_element_to_index_map: OnceVec::new(),
        }
    }

    /// An algebra that refuses to compute beyond `max_degree`, reporting
    /// [`error::Error::InsufficientAlgebraData`] through [`Algebra::ensure_degree`] instead.
    pub fn with_max_degree(p: ValidPrime, max_degree: i32) -> Self {
        Self {
            max_degree: Some(max_degree),
            ..Self::new(p)
        }
    }

    pub fn generic(&self) -> bool {
        self.generic
    }

    pub fn q(&self) -> i32 {
        combinatorics::q(self.p)
    }

    pub fn basis_element_from_index(&self, degree: i32, idx: usize) -> &MilnorBasisElement {
        &self.basis_table[degree as usize][idx]
    }

    pub fn try_basis_element_to_index(&self, elt: &MilnorBasisElement) -> Option<usize> {
        self.basis_element_to_index_map
            .get(elt.degree as usize)?
            .get(elt)
            .copied()
    }

    pub fn basis_element_to_index(&self, elt: &MilnorBasisElement) -> usize {
        self.try_basis_element_to_index(elt)
            .unwrap_or_else(|| panic!("Didn't find element: {elt:?}"))
    }

    /// The index of `Q_0^e P(x)`, i.e. `b^e P^x`.
    fn beps_pn(&self, e: u32, x: u32) -> (i32, usize) {
        let degree = self.q() * x as i32 + e as i32;
        let p_part = if x == 0 { vec![] } else { vec![x] };
        let idx = self.basis_element_to_index(&MilnorBasisElement {
            q_part: e,
            p_part,
            degree,
        });
        (degree, idx)
    }

    fn ppart_degree(&self, p_part: &[u32]) -> i32 {
        self.q()
            * p_part
                .iter()
                .zip(&self.xi_degrees)
                .map(|(&r, &d)| r as i32 * d)
                .sum::<i32>()
    }

    fn qpart_degree(&self, q_part: u32) -> i32 {
        (0..u32::BITS)
            .filter(|&k| q_part & (1 << k) != 0)
            .map(|k| self.tau_degrees[k as usize])
            .sum()
    }
}

// Basis generation
impl MilnorAlgebra {
    /// Extend `ppart_table` so that it contains every `P(R)` of degree `q * n` for `n <= max`.
    /// Each `R` is produced exactly once, by adding one to its last entry.
    fn compute_ppart(&self, max: i32) {
        for n in self.ppart_table.len() as i32..=max {
            let mut new_row = Vec::new();
            if n == 0 {
                new_row.push(Vec::new());
            }
            for (i, &xi) in self.xi_degrees.iter().enumerate() {
                if xi > n {
                    break;
                }
                for old in &self.ppart_table[(n - xi) as usize] {
                    if old.len() > i + 1 {
                        continue;
                    }
                    let mut r = old.clone();
                    r.resize(i + 1, 0);
                    r[i] += 1;
                    new_row.push(r);
                }
            }
            self.ppart_table.push(new_row);
        }
    }

    fn generate_basis_2(&self, degree: i32) -> Vec<MilnorBasisElement> {
        self.ppart_table[degree as usize]
            .iter()
            .map(|r| MilnorBasisElement::from_p(r.clone(), degree))
            .collect()
    }

    fn generate_basis_generic(&self, degree: i32) -> Vec<MilnorBasisElement> {
        let q = self.q();
        let num_taus = self
            .tau_degrees
            .iter()
            .take_while(|&&t| t <= degree)
            .count();
        let mut result = Vec::new();
        for q_part in 0u32..1 << num_taus {
            let q_degree = self.qpart_degree(q_part);
            if q_degree > degree || (degree - q_degree) % q != 0 {
                continue;
            }
            for r in &self.ppart_table[((degree - q_degree) / q) as usize] {
                result.push(MilnorBasisElement {
                    q_part,
                    p_part: r.clone(),
                    degree,
                });
            }
        }
        result
    }
}

// Multiplication
impl MilnorAlgebra {
    /// Compute `m1 * Q(f)` as a list of terms `Q(E) P(R)`, by repeatedly applying
    /// `P(R) Q_k = Q_k P(R) + Q_{k+1} P(R - p^k e_1) + Q_{k+2} P(R - p^k e_2) + ...`
    /// and `Q_j Q_k = -Q_k Q_j`. Terms with a negative entry in `R` vanish.
    fn multiply_qpart(&self, m1: &MilnorBasisElement, f: u32) -> Vec<(u32, u32, PPart)> {
        let p = self.p;
        let mut result = vec![(1, m1.q_part, m1.p_part.clone())];

        for k in (0..u32::BITS).filter(|&k| f & (1 << k) != 0) {
            let pk = match p.as_u32().checked_pow(k) {
                Some(pk) => pk,
                None => u32::MAX,
            };
            let old = std::mem::take(&mut result);
            for (coef, q_part, p_part) in old {
                for i in 0..=p_part.len() {
                    let target = k + i as u32;
                    if q_part & (1 << target) != 0 {
                        continue;
                    }
                    if i > 0 && p_part[i - 1] < pk {
                        continue;
                    }
                    let mut new_p = p_part.clone();
                    if i > 0 {
                        new_p[i - 1] -= pk;
                    }
                    trim_zeros(&mut new_p);

                    let larger_q = (q_part >> (target + 1)).count_ones();
                    let c = if larger_q % 2 == 0 {
                        coef
                    } else {
                        p.negate(coef)
                    };
                    result.push((c, q_part | 1 << target, new_p));
                }
            }
        }
        result
    }

    fn multiply(&self, mut result: SliceMut, coef: u32, m1: &MilnorBasisElement, m2: &MilnorBasisElement) {
        let p = self.p;
        let degree = m1.degree + m2.degree;
        let terms = if self.generic && m2.q_part != 0 {
            self.multiply_qpart(m1, m2.q_part)
        } else {
            vec![(1, m1.q_part, m1.p_part.clone())]
        };
        for (c, q_part, r) in terms {
            let c = p.product(c, coef);
            multiply_p_parts(p, &r, &m2.p_part, |v, p_part| {
                let idx = self.basis_element_to_index(&MilnorBasisElement {
                    q_part,
                    p_part,
                    degree,
                });
                result.add_basis_element(idx, p.product(c, v));
            });
        }
    }
}

/// Run `f(coefficient, T)` for each term of the product `P(R) P(S)`, using Milnor's product
/// formula. The terms are indexed by matrices `x_ij` with `sum_j p^j x_ij = r_i` for `i > 0` and
/// `sum_i x_ij = s_j` for `j > 0`. The term `T` has `t_n = sum_{i + j = n} x_ij`, and its
/// coefficient is the product over `n` of the multinomial coefficients of the diagonals.
fn multiply_p_parts(p: ValidPrime, r: &[u32], s: &[u32], mut f: impl FnMut(u32, PPart)) {
    // m[i][0] and m[0][j] hold whatever of r_i and s_j is not yet accounted for by the interior.
    let mut m = vec![vec![0; s.len() + 1]; r.len() + 1];
    for (i, &ri) in r.iter().enumerate() {
        m[i + 1][0] = ri;
    }
    for (j, &sj) in s.iter().enumerate() {
        m[0][j + 1] = sj;
    }
    fill_matrix(p, &mut m, 1, 1, &mut f);
}

fn fill_matrix(p: ValidPrime, m: &mut [Vec<u32>], i: usize, j: usize, f: &mut impl FnMut(u32, PPart)) {
    let rows = m.len() - 1;
    let cols = m[0].len() - 1;
    if i > rows || cols == 0 {
        emit_matrix(p, m, f);
        return;
    }
    if j > cols {
        fill_matrix(p, m, i + 1, 1, f);
        return;
    }
    let pj = p.as_u32().checked_pow(j as u32);
    let max = pj.map_or(0, |pj| std::cmp::min(m[i][0] / pj, m[0][j]));
    for x in 0..=max {
        let weight = pj.map_or(0, |pj| x * pj);
        m[i][j] = x;
        m[i][0] -= weight;
        m[0][j] -= x;
        fill_matrix(p, m, i, j + 1, f);
        m[i][0] += weight;
        m[0][j] += x;
    }
    m[i][j] = 0;
}

fn emit_matrix(p: ValidPrime, m: &[Vec<u32>], f: &mut impl FnMut(u32, PPart)) {
    let rows = m.len() - 1;
    let cols = m[0].len() - 1;
    let mut coef = 1;
    let mut t = Vec::with_capacity(rows + cols);
    let mut diagonal = Vec::with_capacity(rows + 1);
    for n in 1..=rows + cols {
        diagonal.clear();
        for i in n.saturating_sub(cols)..=std::cmp::min(n, rows) {
            diagonal.push(m[i][n - i]);
        }
        coef = p.product(coef, p.multinomial(&diagonal));
        if coef == 0 {
            return;
        }
        t.push(diagonal.iter().sum());
    }
    trim_zeros(&mut t);
    f(coef, t);
}

// Decomposition
impl MilnorAlgebra {
    fn decompose_basis_element_qpart(
        &self,
        degree: i32,
        idx: usize,
    ) -> Vec<(u32, (i32, usize), (i32, usize))> {
        let p = self.p;
        let basis = self.basis_element_from_index(degree, idx);
        // The left-most Q
        let i = basis.q_part.trailing_zeros();

        if basis.q_part == 1 << i && basis.p_part.is_empty() {
            if i == 0 {
                return vec![(1, (degree, idx), (0, 0))];
            }
            // Q_{k+1} = P(p^k) Q_k - Q_k P(p^k)
            let ppow = p.as_u32().pow(i - 1);
            let p_gen = self.beps_pn(0, ppow);
            let q_degree = self.tau_degrees[i as usize - 1];
            let q_gen = (
                q_degree,
                self.basis_element_to_index(&MilnorBasisElement {
                    q_part: 1 << (i - 1),
                    p_part: Vec::new(),
                    degree: q_degree,
                }),
            );
            return vec![(1, p_gen, q_gen), (p.negate(1), q_gen, p_gen)];
        }

        let first_degree = self.tau_degrees[i as usize];
        let second_degree = degree - first_degree;
        let first_idx = self.basis_element_to_index(&MilnorBasisElement {
            q_part: 1 << i,
            p_part: Vec::new(),
            degree: first_degree,
        });
        let second_idx = self.basis_element_to_index(&MilnorBasisElement {
            q_part: basis.q_part ^ 1 << i,
            p_part: basis.p_part.clone(),
            degree: second_degree,
        });
        vec![(1, (first_degree, first_idx), (second_degree, second_idx))]
    }

    fn decompose_basis_element_ppart(
        &self,
        degree: i32,
        idx: usize,
    ) -> Vec<(u32, (i32, usize), (i32, usize))> {
        let p = self.p;
        let b = self.basis_element_from_index(degree, idx);
        let first;
        let second;
        if b.p_part.len() > 1 {
            let mut t1 = 0;
            let mut pow = 1;
            for r in &b.p_part {
                t1 += r * pow;
                pow *= p.as_u32();
            }
            first = self.beps_pn(0, t1);
            let second_degree = degree - first.0;
            let second_idx = self.basis_element_to_index(&MilnorBasisElement::from_p(
                b.p_part[1..].to_vec(),
                second_degree,
            ));
            second = (second_degree, second_idx);
        } else {
            let sq = b.p_part[0];
            let mut pow = 1;
            let mut rest = sq;
            while rest % p.as_u32() == 0 {
                rest /= p.as_u32();
                pow *= p.as_u32();
            }
            if sq == pow {
                return vec![(1, (degree, idx), (0, 0))];
            }
            first = self.beps_pn(0, pow);
            second = self.beps_pn(0, sq - pow);
        }

        let mut out = FpVector::new(p, self.dimension(degree));
        self.multiply_basis_elements(out.as_slice_mut(), 1, first.0, first.1, second.0, second.1);
        let c = out.entry(idx);
        debug_assert_ne!(c, 0, "leading coefficient vanished");
        out.set_entry(idx, 0);

        // b = c^{-1} (first * second - sum of the other terms)
        let c_inv = p.inverse(c);
        let mut result = vec![(c_inv, first, second)];
        for (i, v) in out.iter_nonzero() {
            for (c2, t1, t2) in self.decompose_basis_element_ppart(degree, i) {
                result.push((p.negate(p.product(c_inv, p.product(v, c2))), t1, t2));
            }
        }
        result
    }
}

impl Algebra for MilnorAlgebra {
    fn prime(&self) -> ValidPrime {
        self.p
    }

    fn max_degree(&self) -> Option<i32> {
        self.max_degree
    }

    fn compute_basis(&self, degree: i32) {
        if degree < self.basis_table.len() as i32 {
            return;
        }
        let _lock = self.lock.lock();
        let next_degree = self.basis_table.len() as i32;
        if degree < next_degree {
            return;
        }
        tracing::trace!(algebra = %self, degree, "computing basis");

        self.compute_ppart(degree / self.q());
        for d in next_degree..=degree {
            let basis = if self.generic {
                self.generate_basis_generic(d)
            } else {
                self.generate_basis_2(d)
            };
            let map = basis
                .iter()
                .enumerate()
                .map(|(i, b)| (b.clone(), i))
                .collect();
            // Readers use basis_table as the marker of what is computed
            self.basis_element_to_index_map.push(map);
            self.basis_table.push(basis);
        }
    }

    fn dimension(&self, degree: i32) -> usize {
        if degree < 0 {
            return 0;
        }
        self.basis_table[degree as usize].len()
    }

    fn multiply_basis_elements(
        &self,
        result: SliceMut,
        coeff: u32,
        r_degree: i32,
        r_idx: usize,
        s_degree: i32,
        s_idx: usize,
    ) {
        self.multiply(
            result,
            coeff,
            &self.basis_table[r_degree as usize][r_idx],
            &self.basis_table[s_degree as usize][s_idx],
        );
    }

    fn basis_element_to_string(&self, degree: i32, idx: usize) -> String {
        let b = self.basis_element_from_index(degree, idx);
        if b.q_part == 0 && b.p_part.is_empty() {
            return "1".to_owned();
        }
        let mut parts: Vec<String> = (0..u32::BITS)
            .filter(|&k| b.q_part & (1 << k) != 0)
            .map(|k| format!("Q_{k}"))
            .collect();
        if !b.p_part.is_empty() {
            let prefix = if self.generic { "P" } else { "Sq" };
            parts.push(format!("{prefix}({})", b.p_part.iter().join(",")));
        }
        parts.join(" ")
    }

    fn basis_element_from_string(&self, elt: &str) -> Option<(i32, usize)> {
        let parsed = steenrod_parser::parse_basis_element(elt).ok()?;
        // Sq only makes sense at the prime 2. P is accepted everywhere.
        if parsed.uses_sq && self.generic {
            return None;
        }

        let mut q_part = 0u32;
        let mut p_part = None;
        for factor in parsed.factors {
            if p_part.is_some() {
                // Nothing may follow the P part
                return None;
            }
            match factor {
                AlgebraBasisElt::Q(k) => {
                    if !self.generic || k >= u32::BITS || q_part >> k != 0 {
                        return None;
                    }
                    q_part |= 1 << k;
                }
                AlgebraBasisElt::P(n) => p_part = Some(vec![n]),
                AlgebraBasisElt::PList(r) => p_part = Some(r),
                AlgebraBasisElt::Unit => p_part = Some(vec![]),
            }
        }
        let mut p_part = p_part.unwrap_or_default();
        trim_zeros(&mut p_part);
        if p_part.len() > self.xi_degrees.len() {
            return None;
        }
        let degree = self.qpart_degree(q_part) + self.ppart_degree(&p_part);
        self.compute_basis(degree);
        let elt = MilnorBasisElement {
            q_part,
            p_part,
            degree,
        };
        Some((degree, self.try_basis_element_to_index(&elt)?))
    }
}

impl GeneratedAlgebra for MilnorAlgebra {
    fn generators(&self, degree: i32) -> Vec<usize> {
        if degree <= 0 {
            return Vec::new();
        }
        self.compute_basis(degree);
        if self.generic && degree == 1 {
            return vec![0];
        }
        let q = self.q();
        if degree % q != 0 || !is_power_of((degree / q) as u32, self.p.as_u32()) {
            return Vec::new();
        }
        vec![self.beps_pn(0, (degree / q) as u32).1]
    }

    fn generator_to_string(&self, degree: i32, idx: usize) -> String {
        let b = self.basis_element_from_index(degree, idx);
        match (self.generic, b.q_part, b.p_part.as_slice()) {
            (false, _, &[n]) => format!("Sq{n}"),
            (true, 1, &[]) => "b".to_owned(),
            (true, 0, &[n]) => format!("P{n}"),
            _ => self.basis_element_to_string(degree, idx),
        }
    }

    fn decompose_basis_element(
        &self,
        degree: i32,
        idx: usize,
    ) -> Vec<(u32, (i32, usize), (i32, usize))> {
        if self.basis_element_from_index(degree, idx).q_part == 0 {
            self.decompose_basis_element_ppart(degree, idx)
        } else {
            self.decompose_basis_element_qpart(degree, idx)
        }
    }

    /// The Adem relations for every inadmissible `P^x b^e P^y` in this degree, together with
    /// `b^2 = 0` at odd primes.
    fn generating_relations(&self, degree: i32) -> Vec<Vec<(u32, (i32, usize), (i32, usize))>> {
        let p = self.p;
        if self.generic && degree == 2 {
            return vec![vec![(1, (1, 0), (1, 0))]];
        }
        self.compute_basis(degree);

        combinatorics::inadmissible_pairs(p, degree)
            .into_iter()
            .map(|(x, b, y)| {
                let mut relation = vec![(p.negate(1), self.beps_pn(0, x), self.beps_pn(b, y))];
                for e1 in 0..=b {
                    let e2 = b - e1;
                    for j in 0..=x / p.as_u32() {
                        let c = combinatorics::adem_relation_coefficient(p, x, y, j, e1, e2);
                        if c == 0 {
                            continue;
                        }
                        if j == 0 {
                            relation.push((c, self.beps_pn(e1, x + y), (e2 as i32, 0)));
                        } else {
                            relation.push((c, self.beps_pn(e1, x + y - j), self.beps_pn(e2, j)));
                        }
                    }
                }
                relation
            })
            .collect()
    }
}

impl Bialgebra for MilnorAlgebra {
    fn coproduct(&self, op_deg: i32, op_idx: usize) -> Vec<(i32, usize, i32, usize)> {
        if op_deg == 0 {
            return vec![(0, 0, 0, 0)];
        }
        let b = self.basis_element_from_index(op_deg, op_idx);
        if b.q_part != 0 {
            assert!(
                b.q_part.is_power_of_two() && b.p_part.is_empty(),
                "coproduct is only computed on Q_k and P(R)"
            );
            return vec![(op_deg, op_idx, 0, 0), (0, 0, op_deg, op_idx)];
        }

        // Delta P(R) = sum_{R' + R'' = R} P(R') (x) P(R'')
        let p_part = &b.p_part;
        let mut result = Vec::new();
        let mut left = vec![0u32; p_part.len()];
        loop {
            let mut left_ppart = left.clone();
            trim_zeros(&mut left_ppart);
            let mut right_ppart: PPart = p_part.iter().zip(&left).map(|(r, l)| r - l).collect();
            trim_zeros(&mut right_ppart);

            let left_degree = self.ppart_degree(&left_ppart);
            let right_degree = op_deg - left_degree;
            let left_idx =
                self.basis_element_to_index(&MilnorBasisElement::from_p(left_ppart, left_degree));
            let right_idx =
                self.basis_element_to_index(&MilnorBasisElement::from_p(right_ppart, right_degree));
            result.push((left_degree, left_idx, right_degree, right_idx));

            // Increment left as a mixed-radix counter bounded by p_part
            let mut i = 0;
            loop {
                if i == left.len() {
                    return result;
                }
                if left[i] < p_part[i] {
                    left[i] += 1;
                    break;
                }
                left[i] = 0;
                i += 1;
            }
        }
    }

    /// `Q(E) P(R) = Q_{e_1} ... Q_{e_n} P(R)`, applied as `P(R)` first and `Q_{e_1}` last.
    fn decompose(&self, op_deg: i32, op_idx: usize) -> Vec<(i32, usize)> {
        let b = self.basis_element_from_index(op_deg, op_idx);
        if b.q_part == 0 || (b.q_part.is_power_of_two() && b.p_part.is_empty()) {
            return vec![(op_deg, op_idx)];
        }
        let mut result = Vec::new();
        if !b.p_part.is_empty() {
            let degree = self.ppart_degree(&b.p_part);
            result.push((
                degree,
                self.basis_element_to_index(&MilnorBasisElement::from_p(b.p_part.clone(), degree)),
            ));
        }
        for k in (0..u32::BITS).rev().filter(|&k| b.q_part & (1 << k) != 0) {
            let degree = self.tau_degrees[k as usize];
            result.push((
                degree,
                self.basis_element_to_index(&MilnorBasisElement {
                    q_part: 1 << k,
                    p_part: Vec::new(),
                    degree,
                }),
            ));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use expect_test::expect;
    use proptest::prelude::*;
    use rstest::rstest;

    fn product(algebra: &MilnorAlgebra, r: &str, s: &str) -> String {
        let (r_deg, r_idx) = algebra.basis_element_from_string(r).unwrap();
        let (s_deg, s_idx) = algebra.basis_element_from_string(s).unwrap();
        let degree = r_deg + s_deg;
        algebra.compute_basis(degree);
        let mut result = FpVector::new(algebra.prime(), algebra.dimension(degree));
        algebra.multiply_basis_elements(result.as_slice_mut(), 1, r_deg, r_idx, s_deg, s_idx);
        algebra.element_to_string(degree, result.as_slice())
    }

    #[test]
    fn dimensions() {
        let algebra = MilnorAlgebra::new(ValidPrime::new(2));
        algebra.compute_basis(8);
        let dims: Vec<usize> = (0..=8).map(|d| algebra.dimension(d)).collect();
        assert_eq!(dims, [1, 1, 1, 2, 2, 2, 3, 4, 4]);

        let algebra = MilnorAlgebra::new(ValidPrime::new(3));
        algebra.compute_basis(10);
        let dims: Vec<usize> = (0..=10).map(|d| algebra.dimension(d)).collect();
        // Degree 5 holds Q_0 P(1) and Q_1, degree 10 only Q_0 Q_1 P(1).
        assert_eq!(dims, [1, 1, 0, 0, 1, 2, 1, 0, 1, 2, 1]);
    }

    #[test]
    fn products() {
        let algebra = MilnorAlgebra::new(ValidPrime::new(2));
        expect!["0"].assert_eq(&product(&algebra, "Sq1", "Sq1"));
        expect!["Sq(3)"].assert_eq(&product(&algebra, "Sq1", "Sq2"));
        expect!["Sq(1,1)"].assert_eq(&product(&algebra, "Sq2", "Sq2"));
        expect!["Sq(3,1)"].assert_eq(&product(&algebra, "Sq(1,1)", "Sq2"));

        let algebra = MilnorAlgebra::new(ValidPrime::new(3));
        expect!["2 * P(2)"].assert_eq(&product(&algebra, "P1", "P1"));
        expect!["Q_0 P(1) + Q_1"].assert_eq(&product(&algebra, "P1", "b"));
        expect!["Q_0 P(1)"].assert_eq(&product(&algebra, "b", "P1"));
        expect!["0"].assert_eq(&product(&algebra, "b", "b"));
    }

    #[test]
    fn strings() {
        let algebra = MilnorAlgebra::new(ValidPrime::new(3));
        algebra.compute_basis(20);
        assert_eq!(algebra.basis_element_from_string("Q_0 Q_1"), Some((6, 0)));
        assert_eq!(algebra.basis_element_from_string("Q_1 Q_0"), None);
        assert_eq!(algebra.basis_element_from_string("Sq2"), None);
        assert_eq!(algebra.generators(1), vec![0]);
        assert_eq!(algebra.generator_to_string(1, 0), "b");
        assert_eq!(algebra.generators(4).len(), 1);
        assert!(algebra.generators(8).is_empty());
        assert_eq!(algebra.generators(12).len(), 1);
    }

    #[rstest]
    #[case(2, 32)]
    #[case(3, 80)]
    fn basis_names(#[case] p: u32, #[case] max_degree: i32) {
        let algebra = MilnorAlgebra::new(ValidPrime::new(p));
        algebra.compute_basis(max_degree);
        for degree in 0..=max_degree {
            for idx in 0..algebra.dimension(degree) {
                let name = algebra.basis_element_to_string(degree, idx);
                assert_eq!(
                    algebra.basis_element_from_string(&name),
                    Some((degree, idx)),
                    "{name}"
                );
            }
        }
    }

    #[rstest]
    #[case(2, 32)]
    #[case(3, 80)]
    fn decompose(#[case] p: u32, #[case] max_degree: i32) {
        let p = ValidPrime::new(p);
        let algebra = MilnorAlgebra::new(p);
        algebra.compute_basis(max_degree);
        for degree in 1..=max_degree {
            let dim = algebra.dimension(degree);
            for idx in 0..dim {
                let mut total = FpVector::new(p, dim);
                for (c, (d1, i1), (d2, i2)) in algebra.decompose_basis_element(degree, idx) {
                    algebra.multiply_basis_elements(total.as_slice_mut(), c, d1, i1, d2, i2);
                }
                let mut expected = FpVector::new(p, dim);
                expected.set_entry(idx, 1);
                assert_eq!(
                    total,
                    expected,
                    "{}",
                    algebra.basis_element_to_string(degree, idx)
                );
            }
        }
    }

    #[rstest]
    #[case(2, 32)]
    #[case(3, 80)]
    fn adem_relations(#[case] p: u32, #[case] max_degree: i32) {
        let p = ValidPrime::new(p);
        let algebra = MilnorAlgebra::new(p);
        algebra.compute_basis(max_degree);
        for degree in 1..=max_degree {
            for relation in algebra.generating_relations(degree) {
                let mut total = FpVector::new(p, algebra.dimension(degree));
                for (c, (d1, i1), (d2, i2)) in relation {
                    algebra.multiply_basis_elements(total.as_slice_mut(), c, d1, i1, d2, i2);
                }
                assert!(total.is_zero(), "degree {degree}: {total}");
            }
        }
    }

    #[rstest]
    #[case(2, 20)]
    #[case(3, 40)]
    fn coproduct_is_multiplicative_on_decompositions(#[case] p: u32, #[case] max_degree: i32) {
        let algebra = MilnorAlgebra::new(ValidPrime::new(p));
        algebra.compute_basis(max_degree);
        for degree in 1..=max_degree {
            for idx in 0..algebra.dimension(degree) {
                let factors = algebra.decompose(degree, idx);
                assert_eq!(factors.iter().map(|&(d, _)| d).sum::<i32>(), degree);
                for (d, i) in factors {
                    for (ld, li, rd, ri) in algebra.coproduct(d, i) {
                        assert_eq!(ld + rd, d);
                        assert!(li < algebra.dimension(ld) && ri < algebra.dimension(rd));
                    }
                }
            }
        }
    }

    #[test]
    fn capped_algebra() {
        let algebra = MilnorAlgebra::with_max_degree(ValidPrime::new(2), 10);
        assert!(algebra.ensure_degree(10).is_ok());
        assert!(matches!(
            algebra.ensure_degree(11),
            Err(error::Error::InsufficientAlgebraData {
                requested: 11,
                available: 10
            })
        ));
    }

    fn associativity(p: u32, degrees: (i32, i32, i32), indices: (usize, usize, usize)) {
        let p = ValidPrime::new(p);
        let algebra = MilnorAlgebra::new(p);
        let (a, b, c) = degrees;
        algebra.compute_basis(a + b + c);
        let (ia, ib, ic) = (
            indices.0 % algebra.dimension(a).max(1),
            indices.1 % algebra.dimension(b).max(1),
            indices.2 % algebra.dimension(c).max(1),
        );
        if algebra.dimension(a) == 0 || algebra.dimension(b) == 0 || algebra.dimension(c) == 0 {
            return;
        }

        let mut ab = FpVector::new(p, algebra.dimension(a + b));
        algebra.multiply_basis_elements(ab.as_slice_mut(), 1, a, ia, b, ib);
        let mut left = FpVector::new(p, algebra.dimension(a + b + c));
        for (i, v) in ab.iter_nonzero() {
            algebra.multiply_basis_elements(left.as_slice_mut(), v, a + b, i, c, ic);
        }

        let mut bc = FpVector::new(p, algebra.dimension(b + c));
        algebra.multiply_basis_elements(bc.as_slice_mut(), 1, b, ib, c, ic);
        let mut right = FpVector::new(p, algebra.dimension(a + b + c));
        algebra.multiply_basis_element_by_element(right.as_slice_mut(), 1, a, ia, b + c, bc.as_slice());

        assert_eq!(left, right);
    }

    proptest! {
        #[test]
        fn associative_at_two(a in 0i32..12, b in 0i32..12, c in 0i32..12, i in 0usize..8, j in 0usize..8, k in 0usize..8) {
            associativity(2, (a, b, c), (i, j, k));
        }

        #[test]
        fn associative_at_three(a in 0i32..25, b in 0i32..25, c in 0i32..25, i in 0usize..8, j in 0usize..8, k in 0usize..8) {
            associativity(3, (a, b, c), (i, j, k));
        }
    }
}
