//! SilentMatch - Privacy-Preserving Fraud Consortium
//!
//! Banks share fraud intelligence without revealing customer identities to
//! each other or to the consortium node.
//!
//! Key principles:
//! - Attributes are blinded before they leave the bank
//! - The node signs blindly and stores only opaque signatures
//! - Signatures are scoped to a key version; rotation retires a whole ledger
//! - Stale clients are detected and told to re-ingest

pub mod attribute;
pub mod crypto;
pub mod persistence;
pub mod protocol;
