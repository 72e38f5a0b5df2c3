//! Persistence module for SilentMatch server state.
//!
//! Three logical stores live under one data directory: the versioned key
//! state, the client registry, and one ledger per key version. Each store is
//! an explicit object with its own lifecycle; nothing here is a global.

pub mod keys;
pub mod ledger;
pub mod registry;
pub mod store;

pub use keys::{KeyError, KeyManager, PendingRotation, ServerSecret};
pub use ledger::{LedgerError, LedgerStore};
pub use registry::{ClientRecord, ClientRegistry, RegistryError};
pub use store::{read_json, write_json_atomic, DataDir, PersistenceError};
