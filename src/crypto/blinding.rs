//! Blinding factors and secure exponent sampling
//!
//! A bank session draws one blinding factor `r` with `1 < r < phi` and
//! `gcd(r, phi) = 1`, and reuses it for every attribute it blinds. The signer
//! only ever sees `x^r`, which is uniformly distributed over the subgroup and
//! unlinkable to `x` as long as `r` stays unpredictable.
//!
//! The factor and its exponent-space inverse are held as big-endian bytes
//! inside `Zeroizing` buffers and wiped when the session ends. They are never
//! serialized.

use super::field::{self, FieldElement};
use super::FieldError;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

/// Source of cryptographically secure random bytes.
pub trait EntropySource: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), FieldError>;
}

impl EntropySource for SystemRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), FieldError> {
        SecureRandom::fill(self, dest).map_err(|e| FieldError::RandomSource(e.to_string()))
    }
}

/// Upper bound on rejection-sampling draws before giving up.
///
/// Roughly half of all draws are even (and so share a factor with `phi`);
/// 128 consecutive failures has probability about 2^-128.
pub const MAX_SAMPLING_ATTEMPTS: u32 = 128;

/// Draw a uniformly random integer in `[lower, phi)` from the OS CSPRNG.
///
/// `accept` is an extra predicate the candidate must satisfy.
pub(crate) fn sample_exponent(
    rng: &dyn EntropySource,
    lower: &BigUint,
    accept: impl Fn(&BigUint) -> bool,
) -> Result<BigUint, FieldError> {
    let phi = field::phi();
    let byte_len = (phi.bits() as usize).div_ceil(8);
    let mut buf = Zeroizing::new(vec![0u8; byte_len]);

    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        rng.fill(&mut buf)?;
        let candidate = BigUint::from_bytes_be(&buf);
        if candidate >= *lower && candidate < *phi && accept(&candidate) {
            return Ok(candidate);
        }
    }

    Err(FieldError::EntropyExhausted {
        attempts: MAX_SAMPLING_ATTEMPTS,
    })
}

/// Per-session blinding exponent together with its inverse modulo `phi`.
pub struct BlindingFactor {
    factor: Zeroizing<Vec<u8>>,
    inverse: Zeroizing<Vec<u8>>,
}

impl BlindingFactor {
    /// Generate a fresh blinding factor from the system CSPRNG.
    pub fn generate() -> Result<Self, FieldError> {
        Self::generate_with(&SystemRandom::new())
    }

    /// Generate a blinding factor from the given secure source.
    pub fn generate_with(rng: &dyn EntropySource) -> Result<Self, FieldError> {
        let two = BigUint::from(2u32);
        let r = sample_exponent(rng, &two, |candidate| {
            candidate.gcd(field::phi()).is_one()
        })?;
        Self::from_exponent(&r)
    }

    /// Build a blinding factor from a known exponent.
    ///
    /// Rejects exponents outside `(1, phi)` or not invertible modulo `phi`.
    pub fn from_exponent(r: &BigUint) -> Result<Self, FieldError> {
        if *r <= BigUint::one() || r >= field::phi() {
            return Err(FieldError::NotInvertible);
        }
        let inverse = field::inverse_mod_phi(r)?;
        Ok(Self {
            factor: Zeroizing::new(r.to_bytes_be()),
            inverse: Zeroizing::new(inverse.to_bytes_be()),
        })
    }

    /// Mask a field element: `x^r mod p`.
    pub fn blind(&self, element: &FieldElement) -> FieldElement {
        field::power(element, &BigUint::from_bytes_be(&self.factor))
    }

    /// Remove the mask from a signed value: `y^(r^-1 mod phi) mod p`.
    pub fn unblind(&self, signed: &FieldElement) -> FieldElement {
        field::power(signed, &BigUint::from_bytes_be(&self.inverse))
    }
}

impl std::fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlindingFactor(<redacted>)")
    }
}
