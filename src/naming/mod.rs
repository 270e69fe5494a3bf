//! Naming namespace abstraction
//!
//! The cluster coordinates through a shared DNS-like namespace: an exclusive
//! singleton binding for the primary name, and a weighted multi-value pool
//! binding for the replica pool. Record values live in the external naming
//! backend; this subsystem only holds transient views of them during an
//! operation and never caches them across calls.

pub mod memory;
pub mod rest;

use std::time::Duration;

use crate::Result;

pub use memory::MemoryNaming;
pub use rest::RestNaming;

/// Record type of a name-to-address binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Cname,
    A,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::Cname => write!(f, "CNAME"),
            RecordType::A => write!(f, "A"),
        }
    }
}

/// One weighted entry in a replica pool binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub target: String,
    pub weight: u32,
    pub identifier: String,
    pub ttl: Duration,
}

/// Create/update/delete of name-to-address bindings.
///
/// `query` fails with [`crate::Error::RecordNotFound`] when the name is
/// absent; `create_exclusive` and `create_pool_entry` fail with
/// [`crate::Error::RecordExists`] when the name (or the pool identifier) is
/// already bound. Callers decide which of those conditions are errors.
pub trait NamingService {
    /// Resolve the values bound under `name`.
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>>;

    /// Create the exclusive singleton binding `name -> value`.
    async fn create_exclusive(&self, name: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Delete the exclusive binding `name -> value`.
    async fn delete_exclusive(&self, name: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Add a weighted entry to the pool binding under `name`.
    async fn create_pool_entry(
        &self,
        name: &str,
        value: &str,
        ttl: Duration,
        weight: u32,
        identifier: &str,
    ) -> Result<()>;
}
