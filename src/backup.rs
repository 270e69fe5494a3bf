//! Backup job scheduling
//!
//! A primary must have a periodic backup job installed; replicas get one the
//! moment they are promoted. Scheduling is idempotent so repeated bootstraps
//! and promotions never stack duplicate jobs.

use std::process::Stdio;

use croner::Cron;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::{Error, Result};

/// Idempotently installs a periodic backup command.
pub trait BackupScheduler {
    async fn ensure_scheduled(&self, command: &str, cadence: &str) -> Result<()>;
}

/// Schedules backups through the user crontab.
#[derive(Debug, Clone, Default)]
pub struct CrontabScheduler {
    user: Option<String>,
}

impl CrontabScheduler {
    pub fn new(user: Option<String>) -> Self {
        Self { user }
    }

    /// Does the crontab already carry an active entry for `command`?
    fn entry_present(existing: &str, command: &str) -> bool {
        existing
            .lines()
            .any(|line| !line.trim_start().starts_with('#') && line.contains(command))
    }

    async fn read_crontab(&self) -> Result<String> {
        let mut cmd = Command::new("crontab");
        if let Some(user) = &self.user {
            cmd.arg("-u").arg(user);
        }
        let output = cmd.arg("-l").stderr(Stdio::null()).output().await?;

        // A user without a crontab makes `crontab -l` exit non-zero.
        if !output.status.success() {
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn write_crontab(&self, content: &str) -> Result<()> {
        let mut cmd = Command::new("crontab");
        if let Some(user) = &self.user {
            cmd.arg("-u").arg(user);
        }
        let mut child = cmd
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::ServiceFailed("crontab stdin unavailable".into()))?;
        stdin.write_all(content.as_bytes()).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::ServiceFailed(format!(
                "crontab rejected entry: {}",
                String::from_utf8_lossy(&output.stderr).trim_end()
            )));
        }
        Ok(())
    }
}

impl BackupScheduler for CrontabScheduler {
    async fn ensure_scheduled(&self, command: &str, cadence: &str) -> Result<()> {
        let cron = Cron::new(cadence)
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("invalid backup cadence {}: {}", cadence, e)))?;
        if let Ok(next) = cron.find_next_occurrence(&chrono::Utc::now(), false) {
            tracing::debug!("Next backup run would be {}", next);
        }

        let existing = self.read_crontab().await?;
        if Self::entry_present(&existing, command) {
            tracing::warn!("The backup cron job already exists - skipping");
            return Ok(());
        }

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&format!("{} {}\n", cadence, command));

        tracing::info!("Adding crontab entry - {} {}", cadence, command);
        self.write_crontab(&content).await
    }
}
