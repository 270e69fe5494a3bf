//! Cluster node orchestration
//!
//! Composes the metadata, naming, database, service, and backup
//! collaborators into the bootstrap sequence: decide role, prepare the host
//! for that role, start the service, wait for it to become healthy, then
//! publish the node under the appropriate naming record. Collaborators are
//! injected at construction; role behavior is dispatched over the role enum.

use std::collections::HashMap;

use crate::backup::BackupScheduler;
use crate::cluster::identity::{MetadataProvider, NodeIdentity};
use crate::cluster::primary::PrimaryNameCoordinator;
use crate::cluster::promotion::{PromotionController, PromotionOutcome};
use crate::cluster::replica::ReplicaPoolRegistrar;
use crate::cluster::resolver::{ClusterRole, RoleResolver};
use crate::common::utils::render_template;
use crate::common::Config;
use crate::db::{DatabaseClient, DatabaseConnection};
use crate::naming::NamingService;
use crate::service::ServiceLifecycle;
use crate::{Error, Result};

pub struct ClusterNode<N, D, S, B>
where
    N: NamingService,
    D: DatabaseClient,
    S: ServiceLifecycle,
    B: BackupScheduler,
{
    identity: NodeIdentity,
    metadata: HashMap<String, String>,
    config: Config,
    naming: N,
    db: D,
    service: S,
    backup: B,
    primary_name: String,
    replica_pool_name: String,
    role: Option<ClusterRole>,
}

impl<N, D, S, B> ClusterNode<N, D, S, B>
where
    N: NamingService,
    D: DatabaseClient,
    S: ServiceLifecycle,
    B: BackupScheduler,
{
    /// Build a node from its injected collaborators. Fetches metadata once,
    /// derives the identity and renders the record names from the configured
    /// templates.
    pub async fn new(
        provider: &impl MetadataProvider,
        config: Config,
        naming: N,
        db: D,
        service: S,
        backup: B,
    ) -> Result<Self> {
        let metadata = provider.fetch().await?;
        let identity = NodeIdentity::from_metadata(&metadata)?;
        let primary_name = render_template(&config.naming.primary_name, &metadata)?;
        let replica_pool_name = render_template(&config.naming.replica_pool_name, &metadata)?;

        tracing::info!("Node {} ({})", identity.stable_id, identity.advertised_address);
        tracing::info!("  Primary name: {}", primary_name);
        tracing::info!("  Replica pool: {}", replica_pool_name);

        Ok(Self {
            identity,
            metadata,
            config,
            naming,
            db,
            service,
            backup,
            primary_name,
            replica_pool_name,
            role: None,
        })
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn primary_name(&self) -> &str {
        &self.primary_name
    }

    pub fn replica_pool_name(&self) -> &str {
        &self.replica_pool_name
    }

    /// The role this node resolved at bootstrap, if it has bootstrapped.
    pub fn role(&self) -> Option<ClusterRole> {
        self.role
    }

    /// Initialise this node as a primary or replica.
    ///
    /// The role is resolved exactly once per process run; a second call is
    /// misuse. Promotion never passes through here.
    pub async fn initialise(&mut self) -> Result<ClusterRole> {
        if self.role.is_some() {
            return Err(Error::Other(
                "role already resolved for this process run".into(),
            ));
        }

        let role = self.resolve_role().await?;
        self.role = Some(role);
        tracing::info!("Initialising as {}", role);

        let vars = self.template_vars();
        match role {
            ClusterRole::Primary => self.service.prepare_primary(&vars).await?,
            ClusterRole::Replica => self.service.prepare_replica(&vars).await?,
        }

        self.service.start_service().await?;

        if let Err(e) = self.await_healthy().await {
            tracing::error!("Service failed to become healthy: {}", e);
            if role == ClusterRole::Primary {
                // Do not strand a dangling claim from an earlier run.
                if let Err(release_err) = self.release_primary().await {
                    tracing::error!("Could not release primary name: {}", release_err);
                }
            }
            return Err(e);
        }

        match role {
            ClusterRole::Primary => {
                self.claim_primary(self.config.naming.force_claim).await?;
                self.ensure_backup_scheduled().await?;
            }
            ClusterRole::Replica => self.register_replica().await?,
        }

        tracing::info!("Node initialised as {}", role);
        Ok(role)
    }

    /// Should this node be a primary or a replica?
    pub async fn resolve_role(&self) -> Result<ClusterRole> {
        RoleResolver::new(&self.naming)
            .resolve(&self.primary_name)
            .await
    }

    /// Point the primary name at this node's advertised address.
    pub async fn claim_primary(&self, force: bool) -> Result<()> {
        PrimaryNameCoordinator::new(&self.naming, self.config.naming.primary_ttl()?)
            .claim(&self.primary_name, &self.identity.advertised_address, force)
            .await
    }

    /// Delete the primary binding if present.
    pub async fn release_primary(&self) -> Result<()> {
        PrimaryNameCoordinator::new(&self.naming, self.config.naming.primary_ttl()?)
            .release(&self.primary_name)
            .await
    }

    /// Add this node to the replica pool.
    pub async fn register_replica(&self) -> Result<()> {
        ReplicaPoolRegistrar::new(&self.naming, self.config.naming.pool_ttl()?)
            .register(
                &self.replica_pool_name,
                &self.identity.advertised_address,
                &self.identity.stable_id,
                self.config.naming.pool_weight,
            )
            .await
    }

    /// Promote the local replica to primary.
    ///
    /// Taking over the primary name is intentionally NOT part of this: the
    /// operator (or the calling automation) claims the name as a separate
    /// step, so database promotion and naming takeover are independently
    /// retryable. A freshly promoted primary does get the backup job.
    pub async fn promote(&self, force: bool) -> Result<PromotionOutcome> {
        let mut controller =
            PromotionController::new(&self.db, &self.service, &self.primary_name);
        let outcome = controller.promote(force).await?;

        if outcome.succeeded {
            self.ensure_backup_scheduled().await?;
        }
        Ok(outcome)
    }

    /// Is the local database a functioning replica?
    pub async fn check_replica(&self) -> Result<bool> {
        PromotionController::new(&self.db, &self.service, &self.primary_name)
            .check_replica()
            .await
    }

    async fn ensure_backup_scheduled(&self) -> Result<()> {
        if !self.config.backup.enabled {
            return Ok(());
        }
        self.backup
            .ensure_scheduled(&self.config.backup.command, &self.config.backup.cadence)
            .await
    }

    /// Poll the local database's liveness probe until it answers or the
    /// configured horizon expires.
    async fn await_healthy(&self) -> Result<()> {
        let timeout = self.config.service.health_poll_timeout()?;
        let interval = self.config.service.health_poll_interval()?;
        let deadline = tokio::time::Instant::now() + timeout;

        tracing::info!("Waiting up to {:?} for the database to become healthy", timeout);
        loop {
            if let Ok(conn) = self.db.connect(None).await {
                if conn.probe().await.unwrap_or(false) {
                    tracing::info!("Database is healthy");
                    return Ok(());
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "database did not become healthy within {:?}",
                    timeout
                )));
            }

            // Jitter keeps co-booting nodes from probing in lockstep.
            let jitter = std::time::Duration::from_millis(rand::random::<u64>() % 250);
            tokio::time::sleep(interval + jitter).await;
        }
    }

    /// Variables available to name templates and settings templates:
    /// the metadata map plus the derived names and identity.
    fn template_vars(&self) -> HashMap<String, String> {
        let mut vars = self.metadata.clone();
        vars.insert("primary_name".to_string(), self.primary_name.clone());
        vars.insert(
            "replica_pool_name".to_string(),
            self.replica_pool_name.clone(),
        );
        vars.insert("address".to_string(), self.identity.advertised_address.clone());
        vars.insert("stable_id".to_string(), self.identity.stable_id.clone());
        vars
    }
}
