use std::fmt;
use std::ops::Deref;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub const TWO: ValidPrime = ValidPrime(2);

/// A prime number, checked once at construction so that the arithmetic below never has to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidPrime(u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimeError(pub u32);

impl fmt::Display for PrimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not a valid prime", self.0)
    }
}

impl std::error::Error for PrimeError {}

const fn is_prime(p: u32) -> bool {
    if p < 2 {
        return false;
    }
    let mut i = 2;
    while i * i <= p {
        if p % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

impl ValidPrime {
    pub const fn new(p: u32) -> Self {
        assert!(is_prime(p));
        Self(p)
    }

    /// Without the `odd-primes` feature only 2 is accepted.
    pub fn try_new(p: u32) -> Option<Self> {
        if !cfg!(feature = "odd-primes") && p != 2 {
            return None;
        }
        is_prime(p).then_some(Self(p))
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    pub fn sum(self, a: u32, b: u32) -> u32 {
        ((a as u64 + b as u64) % self.0 as u64) as u32
    }

    pub fn product(self, a: u32, b: u32) -> u32 {
        ((a as u64 * b as u64) % self.0 as u64) as u32
    }

    /// `-a mod p`.
    pub fn negate(self, a: u32) -> u32 {
        (self.0 - a % self.0) % self.0
    }

    pub fn pow_mod(self, mut b: u32, mut e: u32) -> u32 {
        let mut result = 1;
        b %= self.0;
        while e > 0 {
            if e & 1 == 1 {
                result = self.product(result, b);
            }
            b = self.product(b, b);
            e >>= 1;
        }
        result % self.0
    }

    /// The multiplicative inverse of `k` mod `p`. `k` must not be divisible by `p`.
    pub fn inverse(self, k: u32) -> u32 {
        debug_assert!(k % self.0 != 0, "{k} is not invertible mod {}", self.0);
        self.pow_mod(k, self.0 - 2)
    }

    /// `(-1)^n mod p`.
    pub fn minus_one_to_the_n(self, n: i32) -> u32 {
        if n % 2 == 0 {
            1
        } else {
            self.0 - 1
        }
    }

    /// `binom(n, k) mod p` by Lucas' theorem. Returns 0 when `k` is out of range.
    pub fn binomial(self, n: i32, k: i32) -> u32 {
        if k < 0 || n < k {
            return 0;
        }
        let p = self.0;
        let (mut n, mut k) = (n as u32, k as u32);
        let mut result = 1;
        while n > 0 || k > 0 {
            let (nd, kd) = (n % p, k % p);
            if kd > nd {
                return 0;
            }
            result = self.product(result, small_binomial(nd, kd, p));
            n /= p;
            k /= p;
        }
        result
    }

    /// The multinomial coefficient `(Σ l_i)! / Π l_i!` mod p.
    ///
    /// By Lucas' theorem this is non-zero exactly when there are no carries when adding the
    /// `l_i` in base p, in which case it is the product of the digit-wise multinomials.
    pub fn multinomial(self, l: &[u32]) -> u32 {
        let p = self.0;
        let mut digits: Vec<u32> = l.to_vec();
        let mut result = 1;
        while digits.iter().any(|&x| x > 0) {
            let mut total = 0;
            for d in &mut digits {
                let digit = *d % p;
                total += digit;
                if total >= p {
                    return 0;
                }
                result = self.product(result, small_binomial(total, digit, p));
                *d /= p;
            }
        }
        result
    }
}

fn small_binomial(n: u32, k: u32, p: u32) -> u32 {
    debug_assert!(n < p && k <= n);
    let mut num = 1u64;
    let mut den = 1u64;
    for i in 0..k as u64 {
        num = num * (n as u64 - i) % p as u64;
        den = den * (i + 1) % p as u64;
    }
    let den = ValidPrime(p).inverse(den as u32) as u64;
    (num * den % p as u64) as u32
}

impl Deref for ValidPrime {
    type Target = u32;

    fn deref(&self) -> &u32 {
        &self.0
    }
}

impl TryFrom<u32> for ValidPrime {
    type Error = PrimeError;

    fn try_from(p: u32) -> Result<Self, PrimeError> {
        Self::try_new(p).ok_or(PrimeError(p))
    }
}

impl std::str::FromStr for ValidPrime {
    type Err = PrimeError;

    fn from_str(s: &str) -> Result<Self, PrimeError> {
        let p: u32 = s.trim().parse().map_err(|_| PrimeError(0))?;
        Self::try_from(p)
    }
}

impl PartialEq<u32> for ValidPrime {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ValidPrime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for ValidPrime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidPrime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let p = u32::deserialize(deserializer)?;
        Self::try_new(p).ok_or_else(|| de::Error::custom(PrimeError(p)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn naive_binomial(n: u64, k: u64) -> u64 {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    #[case(7)]
    fn binomial_matches_naive(#[case] p: u32) {
        let prime = ValidPrime::new(p);
        for n in 0..30 {
            for k in 0..=n {
                assert_eq!(
                    prime.binomial(n, k),
                    (naive_binomial(n as u64, k as u64) % p as u64) as u32,
                    "binom({n}, {k}) mod {p}"
                );
            }
        }
        assert_eq!(prime.binomial(3, 5), 0);
        assert_eq!(prime.binomial(3, -1), 0);
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    fn multinomial_is_product_of_binomials(#[case] p: u32) {
        let prime = ValidPrime::new(p);
        for a in 0..12 {
            for b in 0..12 {
                for c in 0..12 {
                    let expected = prime.product(
                        prime.binomial(a + b + c, a),
                        prime.binomial(b + c, b),
                    );
                    assert_eq!(prime.multinomial(&[a as u32, b as u32, c as u32]), expected);
                }
            }
        }
    }

    #[test]
    fn inverses() {
        for p in [2, 3, 5, 7, 11, 13] {
            let prime = ValidPrime::new(p);
            for k in 1..p {
                assert_eq!(prime.product(k, prime.inverse(k)), 1);
            }
        }
    }

    #[test]
    fn parse_prime() {
        assert_eq!("7".parse::<ValidPrime>(), Ok(ValidPrime::new(7)));
        assert_eq!("9".parse::<ValidPrime>(), Err(PrimeError(9)));
        assert!(serde_json::from_str::<ValidPrime>("4").is_err());
    }
}
