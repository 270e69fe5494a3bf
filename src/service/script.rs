//! Script-based service lifecycle
//!
//! Generic cluster member: runs configured scripts for role preparation and
//! an init-style command to start the service. Useful for services that have
//! no dedicated integration.

use std::collections::HashMap;

use crate::common::ScriptConfig;
use crate::service::{run_checked, run_command_line, CommandReport, ServiceLifecycle};
use crate::Result;

pub struct ScriptService {
    config: ScriptConfig,
}

impl ScriptService {
    pub fn new(config: ScriptConfig) -> Self {
        Self { config }
    }
}

impl ServiceLifecycle for ScriptService {
    async fn prepare_primary(&self, _vars: &HashMap<String, String>) -> Result<()> {
        run_checked(&self.config.prepare_primary).await
    }

    async fn prepare_replica(&self, _vars: &HashMap<String, String>) -> Result<()> {
        run_checked(&self.config.prepare_replica).await
    }

    async fn start_service(&self) -> Result<()> {
        tracing::info!("Starting service: {}", self.config.start);
        run_checked(&self.config.start).await
    }

    async fn run_promotion_command(&self) -> Result<CommandReport> {
        tracing::info!("Running promote command: {}", self.config.promote);
        run_command_line(&self.config.promote).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_config() -> ScriptConfig {
        ScriptConfig {
            prepare_primary: "true".to_string(),
            prepare_replica: "true".to_string(),
            start: "true".to_string(),
            promote: "echo promoted".to_string(),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_runs_scripts() {
        let service = ScriptService::new(echo_config());
        let vars = HashMap::new();

        service.prepare_primary(&vars).await.unwrap();
        service.prepare_replica(&vars).await.unwrap();
        service.start_service().await.unwrap();

        let report = service.run_promotion_command().await.unwrap();
        assert!(report.success);
        assert_eq!(report.output.trim_end(), "promoted");
    }

    #[tokio::test]
    async fn test_failing_prepare_surfaces_error() {
        let mut config = echo_config();
        config.prepare_replica = "false".to_string();
        let service = ScriptService::new(config);

        assert!(service.prepare_replica(&HashMap::new()).await.is_err());
    }
}
