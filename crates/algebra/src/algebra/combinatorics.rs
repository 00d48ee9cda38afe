use fp::prime::ValidPrime;

/// The number of Milnor generators tracked; degrees beyond `i32::MAX` are never reached first.
const MAX_XI_TAU: usize = 24;

/// `q = 2p - 2` at odd primes and `1` at the prime 2. Reduced powers live in degrees divisible
/// by `q`.
pub fn q(p: ValidPrime) -> i32 {
    if p == 2 {
        1
    } else {
        2 * p.as_i32() - 2
    }
}

/// The degrees of `xi_1, xi_2, ...` divided by `q`, i.e. `(p^(i+1) - 1) / (p - 1)` for `i >= 0`.
/// The list stops before the degrees overflow an `i32`.
pub fn xi_degrees(p: ValidPrime) -> Vec<i32> {
    let p = p.as_i32() as i64;
    let mut result = Vec::new();
    let mut degree: i64 = 1;
    let mut power: i64 = 1;
    while result.len() < MAX_XI_TAU && degree * (2 * p - 2).max(1) < i32::MAX as i64 {
        result.push(degree as i32);
        power *= p;
        degree += power;
    }
    result
}

/// The degrees of `tau_0, tau_1, ...`, i.e. `2p^i - 1`. Only meaningful at odd primes.
pub fn tau_degrees(p: ValidPrime) -> Vec<i32> {
    let p = p.as_i32() as i64;
    let mut result = Vec::new();
    let mut power: i64 = 1;
    while result.len() < MAX_XI_TAU && 2 * power - 1 < i32::MAX as i64 {
        result.push((2 * power - 1) as i32);
        power *= p;
    }
    result
}

/// The coefficient of `b^e1 P^(x + y - j) b^e2 P^j` in the Adem relation for `P^x b^(e1 + e2)
/// P^y`.
pub fn adem_relation_coefficient(p: ValidPrime, x: u32, y: u32, j: u32, e1: u32, e2: u32) -> u32 {
    let pi = p.as_i32();
    let (x, y, j, e1, e2) = (x as i32, y as i32, j as i32, e1 as i32, e2 as i32);
    let c = p.binomial((y - j) * (pi - 1) + e1 - 1, x - pi * j - e2);
    if c == 0 {
        return 0;
    }
    p.product(c, p.minus_one_to_the_n(x + j + e2))
}

/// The pairs `(x, b, y)` in the given degree for which `P^x b^b P^y` is inadmissible, so that an
/// Adem relation rewrites it. At the prime 2, `P` means `Sq` and `b` is always `0`.
pub fn inadmissible_pairs(p: ValidPrime, degree: i32) -> Vec<(u32, u32, u32)> {
    let generic = p != 2;
    let q = q(p) as u32;
    let pu = p.as_u32();
    let degree = degree as u32;
    let mut result = Vec::new();

    if degree % q == 0 {
        // P^x P^y is inadmissible when x < p y, i.e. x < p * (degq - x), x < p degq / (p + 1).
        let degq = degree / q;
        for x in 1..(pu * degq + pu) / (pu + 1) {
            result.push((x, 0, degq - x));
        }
    } else if generic && degree % q == 1 {
        // P^x b P^y is inadmissible when x <= p y.
        let degq = degree / q;
        for x in 1..(pu * degq + pu + 1) / (pu + 1) {
            result.push((x, 1, degq - x));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees() {
        let two = ValidPrime::new(2);
        let three = ValidPrime::new(3);
        assert_eq!(&xi_degrees(two)[..4], &[1, 3, 7, 15]);
        assert_eq!(&xi_degrees(three)[..3], &[1, 4, 13]);
        assert_eq!(&tau_degrees(three)[..3], &[1, 5, 17]);
    }

    #[test]
    fn inadmissible() {
        let two = ValidPrime::new(2);
        // Sq^1 Sq^2 and Sq^1 Sq^3, Sq^2 Sq^2 in degrees 3 and 4.
        assert_eq!(inadmissible_pairs(two, 3), vec![(1, 0, 2)]);
        assert_eq!(inadmissible_pairs(two, 4), vec![(1, 0, 3), (2, 0, 2)]);

        let three = ValidPrime::new(3);
        // P^1 P^1 in degree 8 and P^1 b P^1 in degree 9.
        assert_eq!(inadmissible_pairs(three, 8), vec![(1, 0, 1)]);
        assert_eq!(inadmissible_pairs(three, 9), vec![(1, 1, 1)]);
        assert!(inadmissible_pairs(three, 5).is_empty());
    }

    #[test]
    fn adem_sq2_sq2() {
        // Sq^2 Sq^2 = Sq^3 Sq^1.
        let two = ValidPrime::new(2);
        assert_eq!(adem_relation_coefficient(two, 2, 2, 0, 0, 0), 0);
        assert_eq!(adem_relation_coefficient(two, 2, 2, 1, 0, 0), 1);
    }
}
