#![forbid(unsafe_code)]

//! Security Association store, Key Ring, Managed-Parameter Table, and
//! Config Registry for the SDLS security library — the stateful layer
//! `sdls-core`'s pipelines read and mutate through.

mod audit;
mod config;
mod error;
mod keys;
mod managed_params;
mod sa;
mod store;

#[cfg(feature = "sql-backend")]
mod sql;

pub use audit::{AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{Config, SadbType, SqlBackendConfig, TlsMode};
pub use error::StoreError;
pub use keys::{Key, KeyRing, KeyState, KEY_RING_CAPACITY};
pub use managed_params::{ManagedParameter, ManagedParameterTable};
pub use sa::{SaState, SecurityAssociation};
pub use store::{InMemoryStore, SaStore};

#[cfg(feature = "sql-backend")]
pub use sql::SqlStore;
