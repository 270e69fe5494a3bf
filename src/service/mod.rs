//! Managed service lifecycle
//!
//! Role-specific preparation, service start, and the local promotion command.
//! These are the node's collaborators for everything that happens on the box
//! itself; the coordination protocol only observes their results.

pub mod postgres;
pub mod script;

use std::collections::HashMap;
use std::process::Stdio;

use tokio::process::Command;

use crate::{Error, Result};

pub use postgres::PostgresService;
pub use script::ScriptService;

/// Result of a promotion command invocation: exit success plus the raw
/// combined output, surfaced verbatim to the operator on failure.
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub success: bool,
    pub output: String,
}

/// Role-specific preparation and process control for the managed service.
pub trait ServiceLifecycle {
    /// Put the host in a state where the service can start as a primary.
    async fn prepare_primary(&self, vars: &HashMap<String, String>) -> Result<()>;

    /// Put the host in a state where the service can start as a replica.
    async fn prepare_replica(&self, vars: &HashMap<String, String>) -> Result<()>;

    /// Start the service.
    async fn start_service(&self) -> Result<()>;

    /// Promote the local replica to primary. At most once per invocation;
    /// interpretation of the report is the caller's job.
    async fn run_promotion_command(&self) -> Result<CommandReport>;
}

/// The configured service implementation, dispatched by variant.
pub enum Service {
    Postgres(PostgresService),
    Script(ScriptService),
}

impl Service {
    pub fn from_config(config: &crate::common::ServiceConfig) -> Result<Self> {
        match config.kind {
            crate::common::ServiceKind::Postgres => {
                let postgres = config.postgres.clone().ok_or_else(|| {
                    Error::InvalidConfig("service.kind = postgres but [service.postgres] missing".into())
                })?;
                Ok(Service::Postgres(PostgresService::new(postgres)))
            }
            crate::common::ServiceKind::Script => {
                let script = config.script.clone().ok_or_else(|| {
                    Error::InvalidConfig("service.kind = script but [service.script] missing".into())
                })?;
                Ok(Service::Script(ScriptService::new(script)))
            }
        }
    }
}

impl ServiceLifecycle for Service {
    async fn prepare_primary(&self, vars: &HashMap<String, String>) -> Result<()> {
        match self {
            Service::Postgres(s) => s.prepare_primary(vars).await,
            Service::Script(s) => s.prepare_primary(vars).await,
        }
    }

    async fn prepare_replica(&self, vars: &HashMap<String, String>) -> Result<()> {
        match self {
            Service::Postgres(s) => s.prepare_replica(vars).await,
            Service::Script(s) => s.prepare_replica(vars).await,
        }
    }

    async fn start_service(&self) -> Result<()> {
        match self {
            Service::Postgres(s) => s.start_service().await,
            Service::Script(s) => s.start_service().await,
        }
    }

    async fn run_promotion_command(&self) -> Result<CommandReport> {
        match self {
            Service::Postgres(s) => s.run_promotion_command().await,
            Service::Script(s) => s.run_promotion_command().await,
        }
    }
}

/// Run a prepared command, capturing stdout and stderr into one report.
pub(crate) async fn capture(command: &mut Command) -> Result<CommandReport> {
    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(CommandReport {
        success: output.status.success(),
        output: combined,
    })
}

/// Run a whitespace-delimited command line, capturing its output.
pub(crate) async fn run_command_line(line: &str) -> Result<CommandReport> {
    let mut parts = line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::InvalidConfig("empty command".into()))?;

    let mut command = Command::new(program);
    command.args(parts);
    capture(&mut command).await
}

/// Run a command line and fail with `ServiceFailed` unless it exits cleanly.
pub(crate) async fn run_checked(line: &str) -> Result<()> {
    let report = run_command_line(line).await?;
    if !report.success {
        return Err(Error::ServiceFailed(format!(
            "`{}` failed: {}",
            line,
            report.output.trim_end()
        )));
    }
    Ok(())
}
