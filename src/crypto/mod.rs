/// Cryptographic primitives for the SilentMatch blind-matching protocol
///
/// This module implements:
/// - Prime-field arithmetic (exponentiation, exponent-space inverse, hash-to-field)
/// - Blinding factor generation from a secure random source
/// - Opaque signature rendering
pub mod blinding;
pub mod field;

use thiserror::Error;

pub use blinding::{BlindingFactor, EntropySource, MAX_SAMPLING_ATTEMPTS};
pub use field::{
    inverse_mod_phi, map_to_field, modulus, phi, power, FieldElement, OpaqueSignature,
    SIGNATURE_HEX_WIDTH,
};

/// Field and exponent arithmetic errors
///
/// None of these can surface for correctly generated inputs; callers treat
/// them as fatal.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Value is not invertible modulo p - 1")]
    NotInvertible,

    #[error("No valid exponent found after {attempts} draws")]
    EntropyExhausted { attempts: u32 },

    #[error("Secure random source failed: {0}")]
    RandomSource(String),
}
