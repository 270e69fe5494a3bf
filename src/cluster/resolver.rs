//! Role resolution
//!
//! A booting node decides its role from the naming namespace alone: if the
//! exclusive primary name is bound, someone already runs the cluster and we
//! join as a replica; if it is absent, we are the first node up and take the
//! primary role.

use serde::{Deserialize, Serialize};

use crate::naming::{NamingService, RecordType};
use crate::{Error, Result};

/// Role of a node in the cluster, computed once per process run. Promotion
/// is an explicit separate operation, never a re-resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterRole {
    Primary,
    Replica,
}

impl std::fmt::Display for ClusterRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterRole::Primary => write!(f, "primary"),
            ClusterRole::Replica => write!(f, "replica"),
        }
    }
}

/// Decides whether a booting node becomes primary or replica.
pub struct RoleResolver<'a, N: NamingService> {
    naming: &'a N,
}

impl<'a, N: NamingService> RoleResolver<'a, N> {
    pub fn new(naming: &'a N) -> Self {
        Self { naming }
    }

    /// Resolve this node's role from the primary binding.
    ///
    /// Only a definitive not-found answer means "no primary". Any other
    /// lookup failure is surfaced as `ResolutionFailed`: treating a naming
    /// outage as an empty namespace could elect a second primary. No retries
    /// here; retry policy belongs to the caller.
    pub async fn resolve(&self, primary_name: &str) -> Result<ClusterRole> {
        tracing::info!("Attempting to determine role via {}", primary_name);

        match self.naming.query(primary_name, RecordType::Cname).await {
            Ok(_) => {
                tracing::info!("Primary name already exists, assuming replica role");
                Ok(ClusterRole::Replica)
            }
            Err(Error::RecordNotFound(_)) => {
                tracing::info!("Primary name does not exist, assuming primary role");
                Ok(ClusterRole::Primary)
            }
            Err(e) => Err(Error::ResolutionFailed(e.to_string())),
        }
    }
}
