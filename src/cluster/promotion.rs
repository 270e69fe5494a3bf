//! Replica-to-primary promotion
//!
//! Promotion is an operator-triggered, at-most-once action. Before touching
//! the local database it runs the active-primary check: connect to whatever
//! the primary name points at and ask that instance whether it considers
//! itself primary. Only a reachable instance that answers "primary" blocks
//! promotion; an unreachable peer cannot be allowed to block failover.
//!
//! A successful promotion does NOT take over the primary name. Database-level
//! promotion and the naming takeover are separate steps so each can be
//! retried on its own.

use crate::db::{DatabaseClient, DatabaseConnection};
use crate::service::ServiceLifecycle;
use crate::{Error, Result};

const NOT_IN_STANDBY: &str = "server is not in standby mode";

/// Where a promotion attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionState {
    Evaluating,
    Blocked,
    Promoting,
    Promoted,
    Failed,
}

impl std::fmt::Display for PromotionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromotionState::Evaluating => write!(f, "evaluating"),
            PromotionState::Blocked => write!(f, "blocked"),
            PromotionState::Promoting => write!(f, "promoting"),
            PromotionState::Promoted => write!(f, "promoted"),
            PromotionState::Failed => write!(f, "failed"),
        }
    }
}

/// Why a promotion attempt did not succeed. Command-level reasons carry the
/// raw output verbatim for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionReason {
    /// A reachable instance at the primary name reports itself primary.
    ActivePrimaryExists,
    /// The local instance was never a replica; fatal misuse, do not retry.
    NotAReplica { output: String },
    /// The promotion command failed for some other reason; not retried.
    CommandFailed { output: String },
}

/// Outcome of one `promote` invocation. Transient, not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionOutcome {
    pub succeeded: bool,
    pub reason: Option<PromotionReason>,
}

impl PromotionOutcome {
    fn promoted() -> Self {
        Self {
            succeeded: true,
            reason: None,
        }
    }

    fn not_promoted(reason: PromotionReason) -> Self {
        Self {
            succeeded: false,
            reason: Some(reason),
        }
    }
}

/// Orchestrates the replica-to-primary transition.
pub struct PromotionController<'a, D: DatabaseClient, S: ServiceLifecycle> {
    db: &'a D,
    service: &'a S,
    primary_name: &'a str,
    state: PromotionState,
}

impl<'a, D: DatabaseClient, S: ServiceLifecycle> PromotionController<'a, D, S> {
    pub fn new(db: &'a D, service: &'a S, primary_name: &'a str) -> Self {
        Self {
            db,
            service,
            primary_name,
            state: PromotionState::Evaluating,
        }
    }

    pub fn state(&self) -> PromotionState {
        self.state
    }

    /// Promote the local replica to primary.
    ///
    /// With `force`, the operator explicitly overrides the active-primary
    /// guard. Failures are reported in the outcome, never retried here.
    pub async fn promote(&mut self, force: bool) -> Result<PromotionOutcome> {
        self.state = PromotionState::Evaluating;

        let active_primary = match self.check_active_primary().await {
            Ok(active) => active,
            Err(Error::ConnectionFailed(e)) => {
                tracing::info!("Could not connect to primary: {}", e);
                false
            }
            Err(e) => return Err(e),
        };

        if active_primary {
            tracing::warn!("There is an active primary at {}", self.primary_name);
            if !force {
                tracing::warn!("Refusing to promote without force");
                self.state = PromotionState::Blocked;
                return Ok(PromotionOutcome::not_promoted(
                    PromotionReason::ActivePrimaryExists,
                ));
            }
            tracing::warn!("Promotion forced by operator, overriding the guard");
        }

        self.state = PromotionState::Promoting;
        let report = self.service.run_promotion_command().await?;

        if report.success {
            tracing::info!("Local instance promoted to primary");
            self.state = PromotionState::Promoted;
            return Ok(PromotionOutcome::promoted());
        }

        self.state = PromotionState::Failed;
        if report.output.trim_end().ends_with(NOT_IN_STANDBY) {
            tracing::error!("This instance is not in standby mode, so it can not be promoted");
            Ok(PromotionOutcome::not_promoted(PromotionReason::NotAReplica {
                output: report.output,
            }))
        } else {
            tracing::error!("Promote command failed: {}", report.output.trim_end());
            Ok(PromotionOutcome::not_promoted(PromotionReason::CommandFailed {
                output: report.output,
            }))
        }
    }

    /// Is there a reachable instance at the primary name that itself
    /// believes it is primary?
    ///
    /// Connection failures propagate so the caller can treat them as a
    /// signal ("no active primary") rather than an error.
    async fn check_active_primary(&self) -> Result<bool> {
        tracing::info!("Checking primary at {}", self.primary_name);
        let conn = self.db.connect(Some(self.primary_name)).await?;

        if conn.is_in_recovery().await? {
            // The instance we reached thinks it is a replica; the binding
            // is stale or wrong and must not block promotion.
            tracing::info!("Instance at {} reports replica state", self.primary_name);
            return Ok(false);
        }

        Ok(conn.probe().await?)
    }

    /// Is the local database alive and in recovery (a functioning replica)?
    /// Here an unreachable database is a hard failure, not a signal.
    pub async fn check_replica(&self) -> Result<bool> {
        tracing::info!("Checking replica state of the local database");
        let conn = self.db.connect(None).await?;
        conn.is_in_recovery().await
    }
}
