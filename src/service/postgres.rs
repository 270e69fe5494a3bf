//! PostgreSQL service lifecycle
//!
//! Primary: starts postgres normally. Replica: renders a replication-settings
//! file from a template so postgres starts as a read replica following the
//! primary name. Promotion runs `pg_ctl promote` against the data directory
//! and hands back the raw output untouched.

use std::collections::HashMap;
use std::path::Path;

use tokio::process::Command;

use crate::common::PostgresConfig;
use crate::common::utils::render_template;
use crate::service::{capture, run_checked, CommandReport, ServiceLifecycle};
use crate::Result;

pub struct PostgresService {
    config: PostgresConfig,
}

impl PostgresService {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    /// Render `template` against `vars` and write it to the settings target.
    async fn write_settings(
        &self,
        template: &Path,
        vars: &HashMap<String, String>,
    ) -> Result<()> {
        tracing::info!(
            "Rendering replication settings from {} to {}",
            template.display(),
            self.config.settings_target.display()
        );
        let raw = tokio::fs::read_to_string(template).await?;
        let rendered = render_template(&raw, vars)?;
        tokio::fs::write(&self.config.settings_target, rendered).await?;
        Ok(())
    }
}

impl ServiceLifecycle for PostgresService {
    async fn prepare_primary(&self, vars: &HashMap<String, String>) -> Result<()> {
        match &self.config.primary_settings_template {
            Some(template) => self.write_settings(template, vars).await,
            None => {
                tracing::info!("No primary settings template configured, nothing to prepare");
                Ok(())
            }
        }
    }

    async fn prepare_replica(&self, vars: &HashMap<String, String>) -> Result<()> {
        self.write_settings(&self.config.replica_settings_template, vars)
            .await?;
        tracing::info!("Instance configured as a replica");
        Ok(())
    }

    async fn start_service(&self) -> Result<()> {
        tracing::info!("Starting postgres: {}", self.config.start_command);
        run_checked(&self.config.start_command).await
    }

    async fn run_promotion_command(&self) -> Result<CommandReport> {
        tracing::info!(
            "Running promote command: {} -D {} promote",
            self.config.pg_ctl.display(),
            self.config.data_dir.display()
        );
        let mut command = Command::new(&self.config.pg_ctl);
        command.arg("-D").arg(&self.config.data_dir).arg("promote");
        capture(&mut command).await
    }
}
