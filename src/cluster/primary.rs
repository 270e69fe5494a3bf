//! Exclusive primary name coordination
//!
//! The primary binding is the cluster's single source of truth for which
//! node accepts writes. Claiming is check-then-create: racy by design, with
//! the losing writer surfacing `AlreadyClaimed` rather than silently
//! overwriting. A forced claim takes the name from its current holder.

use std::time::Duration;

use crate::naming::{NamingService, RecordType};
use crate::{Error, Result};

/// Claims, force-claims, and releases the exclusive primary binding.
pub struct PrimaryNameCoordinator<'a, N: NamingService> {
    naming: &'a N,
    ttl: Duration,
}

impl<'a, N: NamingService> PrimaryNameCoordinator<'a, N> {
    pub fn new(naming: &'a N, ttl: Duration) -> Self {
        Self { naming, ttl }
    }

    /// Point the primary name at `address`.
    ///
    /// Fails with `AlreadyClaimed` when the name is held and `force` is not
    /// set. With `force`, the existing binding is deleted first (best-effort
    /// two-step), so a forced claim always converges to exactly one binding
    /// at the new address.
    pub async fn claim(&self, name: &str, address: &str, force: bool) -> Result<()> {
        let existing = match self.naming.query(name, RecordType::Cname).await {
            Ok(values) => values.into_iter().next(),
            Err(Error::RecordNotFound(_)) => {
                tracing::info!("{} does not exist, so creating it", name);
                None
            }
            Err(e) => return Err(Error::ResolutionFailed(e.to_string())),
        };

        if let Some(old) = &existing {
            if !force {
                tracing::error!("{} exists and force is false - not taking the name", name);
                return Err(Error::AlreadyClaimed(name.to_string()));
            }
            tracing::info!("Deleting existing record for {} -> {}", name, old);
            self.naming.delete_exclusive(name, old, self.ttl).await?;
        }

        tracing::info!("Creating record for {} -> {}", name, address);
        match self.naming.create_exclusive(name, address, self.ttl).await {
            Ok(()) => {
                tracing::info!("Finished updating naming records");
                Ok(())
            }
            // Lost the check-then-create race to a concurrent claimer.
            Err(Error::RecordExists(_)) => Err(Error::AlreadyClaimed(name.to_string())),
            Err(e) => Err(e),
        }
    }

    /// Delete the primary binding if present; no-op when absent. Called when
    /// a node that attempted to become primary fails to start its service,
    /// so it does not strand a dangling claim.
    pub async fn release(&self, name: &str) -> Result<()> {
        let existing = match self.naming.query(name, RecordType::Cname).await {
            Ok(values) => values.into_iter().next(),
            Err(Error::RecordNotFound(_)) => None,
            Err(e) => return Err(Error::ResolutionFailed(e.to_string())),
        };

        match existing {
            Some(value) => {
                tracing::info!("Releasing {} -> {}", name, value);
                match self.naming.delete_exclusive(name, &value, self.ttl).await {
                    Ok(()) | Err(Error::RecordNotFound(_)) => Ok(()),
                    Err(e) => Err(e),
                }
            }
            None => {
                tracing::info!("{} not bound, nothing to release", name);
                Ok(())
            }
        }
    }
}
