//! Versioned server signing keys
//!
//! The key manager owns every secret exponent the server has ever used,
//! indexed by a monotonically increasing version. Only the current version is
//! used for signing; retired secrets are retained but never read by the
//! protocol.
//!
//! ## Persisted Form
//!
//! ```json
//! {
//!   "current_version": 2,
//!   "keys": { "1": 1234...., "2": 5678.... }
//! }
//! ```
//!
//! Secrets are written as exact JSON integers (up to 1536 bits).
//!
//! ## Rotation
//!
//! Rotation is irreversible. A new secret is drawn uniformly from `[1, phi)`,
//! the updated state is written to disk, and only then does the in-memory
//! version pointer advance. A failed write leaves the manager unchanged.
//!
//! Rotation happens in two steps. [`KeyManager::prepare_rotation`] draws the
//! secret without touching any state, so callers can get everything else
//! bound to the new version ready first. [`KeyManager::commit_rotation`] then
//! persists and activates it.

use super::store::{read_json, write_json_atomic, DataDir, PersistenceError};
use crate::crypto::blinding::sample_exponent;
use crate::crypto::{EntropySource, FieldError};
use num_bigint::BigUint;
use num_traits::One;
use ring::rand::SystemRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Key management errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Key manager has no active key version")]
    Uninitialized,

    #[error("Failed to draw a new secret: {0}")]
    Entropy(#[from] FieldError),

    #[error("Failed to persist key state: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Rotation prepared from v{prepared_from} but the current key is v{current}")]
    StaleRotation { prepared_from: u64, current: u64 },
}

/// Serde adapter writing a `BigUint` as a bare JSON integer.
mod json_integer {
    use num_bigint::BigUint;
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        let number: serde_json::Number = value
            .to_str_radix(10)
            .parse()
            .map_err(S::Error::custom)?;
        number.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let number = serde_json::Number::deserialize(deserializer)?;
        number
            .to_string()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected a non-negative integer, got {}", number)))
    }
}

/// A secret signing exponent. Never leaves the server.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerSecret(#[serde(with = "json_integer")] BigUint);

impl ServerSecret {
    pub(crate) fn exponent(&self) -> &BigUint {
        &self.0
    }
}

impl std::fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServerSecret(<redacted>)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeyState {
    current_version: u64,
    keys: BTreeMap<u64, ServerSecret>,
}

/// A drawn but not yet persisted key version.
#[derive(Debug)]
pub struct PendingRotation {
    based_on: u64,
    next: KeyState,
}

impl PendingRotation {
    /// Version that becomes current once committed.
    pub fn version(&self) -> u64 {
        self.next.current_version
    }
}

/// Owner of the server's versioned secrets and the current-version pointer.
pub struct KeyManager {
    path: PathBuf,
    rng: Box<dyn EntropySource>,
    state: KeyState,
}

impl KeyManager {
    /// Restore key state from `dir`, or create version 1 if none exists.
    pub fn initialize_or_load(dir: &DataDir) -> Result<Self, KeyError> {
        Self::initialize_or_load_with(dir, Box::new(SystemRandom::new()))
    }

    /// As [`KeyManager::initialize_or_load`] with an explicit random source.
    pub fn initialize_or_load_with(
        dir: &DataDir,
        rng: Box<dyn EntropySource>,
    ) -> Result<Self, KeyError> {
        let path = dir.keys_path();
        let state = read_json::<KeyState>(&path)?.unwrap_or_default();
        let mut manager = Self { path, rng, state };

        if manager.active_secret().is_err() {
            manager.rotate()?;
        } else {
            info!(
                version = manager.state.current_version,
                versions = manager.state.keys.len(),
                "loaded server key state"
            );
        }
        Ok(manager)
    }

    /// Advance to a fresh key version and return its number.
    pub fn rotate(&mut self) -> Result<u64, KeyError> {
        let pending = self.prepare_rotation()?;
        self.commit_rotation(pending)
    }

    /// Draw the next version's secret. Nothing is written or activated.
    pub fn prepare_rotation(&self) -> Result<PendingRotation, KeyError> {
        let secret = sample_exponent(self.rng.as_ref(), &BigUint::one(), |_| true)?;

        let mut next = self.state.clone();
        next.current_version += 1;
        next.keys.insert(next.current_version, ServerSecret(secret));
        Ok(PendingRotation {
            based_on: self.state.current_version,
            next,
        })
    }

    /// Persist a prepared rotation and make it current.
    pub fn commit_rotation(&mut self, pending: PendingRotation) -> Result<u64, KeyError> {
        if pending.based_on != self.state.current_version {
            return Err(KeyError::StaleRotation {
                prepared_from: pending.based_on,
                current: self.state.current_version,
            });
        }
        write_json_atomic(&self.path, &pending.next)?;

        self.state = pending.next;
        info!(version = self.state.current_version, "rotated server key");
        Ok(self.state.current_version)
    }

    /// Version used for all signing right now (0 only before initialization).
    pub fn current_version(&self) -> u64 {
        self.state.current_version
    }

    /// Secret of the current version.
    pub(crate) fn active_secret(&self) -> Result<&ServerSecret, KeyError> {
        self.state
            .keys
            .get(&self.state.current_version)
            .ok_or(KeyError::Uninitialized)
    }

    /// Secret of any past or current version.
    #[cfg(test)]
    pub(crate) fn secret_for(&self, version: u64) -> Option<&ServerSecret> {
        self.state.keys.get(&version)
    }

    /// All versions ever issued, oldest first.
    pub fn versions(&self) -> Vec<u64> {
        self.state.keys.keys().copied().collect()
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("path", &self.path)
            .field("current_version", &self.state.current_version)
            .finish_non_exhaustive()
    }
}
