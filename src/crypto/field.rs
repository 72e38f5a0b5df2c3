//! Prime-field arithmetic for the blind-exponentiation OPRF
//!
//! All protocol values live in the multiplicative group of integers modulo a
//! fixed 1536-bit safe prime `p` (RFC 3526, group 5). Exponents (server
//! secrets, blinding factors and their inverses) live modulo `phi = p - 1`.
//!
//! # Exponent Space vs Field Space
//!
//! Unblinding needs `r^-1 mod phi`, NOT `r^-1 mod p`. Using the wrong modulus
//! produces a value that looks valid but never matches. This module therefore
//! only exposes [`inverse_mod_phi`]; there is no field-element inverse.
//!
//! ```text
//! ((x^r)^k)^(r^-1 mod phi) = x^k  (mod p)     since x^phi = 1 for x != 0
//! ```

use super::FieldError;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

/// RFC 3526 1536-bit MODP group prime.
const PRIME_MODULUS_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA237327FFFFFFFFFFFFFFFF",
);

/// Width of a rendered signature in hex characters (1536 bits).
pub const SIGNATURE_HEX_WIDTH: usize = PRIME_MODULUS_HEX.len();

static PRIME: LazyLock<BigUint> = LazyLock::new(|| {
    BigUint::parse_bytes(PRIME_MODULUS_HEX.as_bytes(), 16)
        .unwrap_or_else(|| unreachable!("prime modulus constant is valid hex"))
});

static PHI: LazyLock<BigUint> = LazyLock::new(|| &*PRIME - 1u32);

/// The field modulus `p`.
pub fn modulus() -> &'static BigUint {
    &PRIME
}

/// Order of the multiplicative group, `phi = p - 1`.
pub fn phi() -> &'static BigUint {
    &PHI
}

/// An element of the prime field, always reduced into `[0, p)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldElement(BigUint);

impl FieldElement {
    /// Wrap an integer, reducing it modulo `p`.
    pub fn new(value: BigUint) -> Self {
        if value < *PRIME {
            Self(value)
        } else {
            Self(value % &*PRIME)
        }
    }

    /// The underlying integer.
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    /// Big-endian bytes, as carried across the client/server boundary.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self::new(BigUint::from_bytes_be(bytes))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// Deterministically map a normalized attribute string into the field.
///
/// The SHA-256 digest is read as a big-endian integer. A 256-bit digest is
/// always below the 1536-bit modulus, so no reduction takes place.
pub fn map_to_field(normalized: &str) -> FieldElement {
    let digest = Sha256::digest(normalized.as_bytes());
    FieldElement(BigUint::from_bytes_be(&digest))
}

/// Compute `base^exponent mod p`.
pub fn power(base: &FieldElement, exponent: &BigUint) -> FieldElement {
    FieldElement(base.0.modpow(exponent, &PRIME))
}

/// Multiplicative inverse of `value` modulo `phi` (exponent space).
///
/// Fails with [`FieldError::NotInvertible`] when `gcd(value, phi) != 1`.
pub fn inverse_mod_phi(value: &BigUint) -> Result<BigUint, FieldError> {
    if value.is_zero() || !value.gcd(&PHI).is_one() {
        return Err(FieldError::NotInvertible);
    }
    value.modinv(&PHI).ok_or(FieldError::NotInvertible)
}

/// Final, version-bound OPRF output for one normalized attribute.
///
/// Rendered as lowercase hex, zero-padded to the modulus width so that equal
/// field values always produce byte-identical strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpaqueSignature(String);

impl OpaqueSignature {
    pub fn from_element(element: &FieldElement) -> Self {
        let hex = element.0.to_str_radix(16);
        Self(format!("{:0>width$}", hex, width = SIGNATURE_HEX_WIDTH))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpaqueSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OpaqueSignature {
    fn from(value: String) -> Self {
        Self(value)
    }
}
