//! Replica pool registration
//!
//! Replicas publish themselves under a weighted multi-value pool name so
//! read traffic can be spread across them. Registration is keyed by the
//! node's stable identifier, which makes re-registration after a process
//! restart idempotent.

use std::time::Duration;

use crate::naming::NamingService;
use crate::{Error, Result};

/// Idempotently adds a node's address to the weighted replica pool.
pub struct ReplicaPoolRegistrar<'a, N: NamingService> {
    naming: &'a N,
    ttl: Duration,
}

impl<'a, N: NamingService> ReplicaPoolRegistrar<'a, N> {
    pub fn new(naming: &'a N, ttl: Duration) -> Self {
        Self { naming, ttl }
    }

    /// Add `address` to the pool under `name`, keyed by `identifier`.
    ///
    /// An already-present identifier means this node registered on an
    /// earlier boot; that is success, not an error. Anything else the
    /// backend rejects surfaces as `RegistrationFailed`.
    pub async fn register(
        &self,
        name: &str,
        address: &str,
        identifier: &str,
        weight: u32,
    ) -> Result<()> {
        tracing::info!("Adding {} to the pool for {}", identifier, name);

        match self
            .naming
            .create_pool_entry(name, address, self.ttl, weight, identifier)
            .await
        {
            Ok(()) => {
                tracing::info!("Finished updating naming records");
                Ok(())
            }
            Err(Error::RecordExists(_)) => {
                tracing::warn!(
                    "Attempted to create a pool entry, but one already exists for this node"
                );
                Ok(())
            }
            Err(e) => Err(Error::RegistrationFailed(e.to_string())),
        }
    }
}
