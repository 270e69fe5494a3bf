//! Configuration for dnsherd components

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::utils::parse_duration;
use crate::Result;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Naming namespace settings (records, templates, TTLs)
    pub naming: NamingConfig,

    /// Where node metadata comes from
    pub metadata: MetadataConfig,

    /// Local/remote database probing
    pub database: DatabaseConfig,

    /// Managed service lifecycle (prepare, start, promote)
    pub service: ServiceConfig,

    /// Backup job scheduling
    pub backup: BackupConfig,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            naming: NamingConfig::default(),
            metadata: MetadataConfig::default(),
            database: DatabaseConfig::default(),
            service: ServiceConfig::default(),
            backup: BackupConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file plus `DNSHERD__`-prefixed
    /// environment overrides. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(p) => builder.add_source(config::File::from(p)),
            None => builder.add_source(config::File::with_name("dnsherd").required(false)),
        };
        builder = builder.add_source(
            config::Environment::with_prefix("DNSHERD")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder
            .build()
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))?;
        cfg.try_deserialize()
            .map_err(|e| crate::Error::InvalidConfig(e.to_string()))
    }
}

/// Naming namespace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Base URL of the authoritative naming API
    pub endpoint: String,

    /// Zone the cluster's records live in
    pub zone: String,

    /// Template for the exclusive primary name
    pub primary_name: String,

    /// Template for the weighted replica pool name
    pub replica_pool_name: String,

    /// TTL for the primary binding
    pub primary_ttl: String,

    /// TTL for replica pool entries
    pub pool_ttl: String,

    /// Weight assigned to each replica pool entry
    pub pool_weight: u32,

    /// Take the primary name even if another node holds it
    pub force_claim: bool,
}

impl NamingConfig {
    pub fn primary_ttl(&self) -> Result<Duration> {
        parse_duration(&self.primary_ttl)
    }

    pub fn pool_ttl(&self) -> Result<Duration> {
        parse_duration(&self.pool_ttl)
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8053".to_string(),
            zone: "cluster.example".to_string(),
            primary_name: "db.{cluster}.cluster.example".to_string(),
            replica_pool_name: "db-replicas.{cluster}.cluster.example".to_string(),
            primary_ttl: "60s".to_string(),
            pool_ttl: "60s".to_string(),
            pool_weight: 10,
            force_claim: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSourceKind {
    /// Environment variables (local development, containers)
    Env,
    /// Link-local instance metadata endpoint plus user-data document
    Instance,
}

/// Metadata source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub source: MetadataSourceKind,

    /// Prefix for environment-sourced metadata keys
    pub env_prefix: String,

    /// Instance metadata endpoint
    pub endpoint: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            source: MetadataSourceKind::Env,
            env_prefix: "DNSHERD_META_".to_string(),
            endpoint: "http://169.254.169.254/latest".to_string(),
        }
    }
}

/// Database probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Host used for local probes
    pub host: String,

    /// Port of the database's status endpoint
    pub status_port: u16,

    /// Connect timeout for probes
    pub connect_timeout: String,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Result<Duration> {
        parse_duration(&self.connect_timeout)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            status_port: 8008,
            connect_timeout: "5s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Postgres,
    Script,
}

/// Service lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub kind: ServiceKind,

    /// Postgres-specific config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresConfig>,

    /// Script-based config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptConfig>,

    /// How long to poll the local database for liveness after starting it
    pub health_poll_timeout: String,

    /// Base interval between liveness polls
    pub health_poll_interval: String,
}

impl ServiceConfig {
    pub fn health_poll_timeout(&self) -> Result<Duration> {
        parse_duration(&self.health_poll_timeout)
    }

    pub fn health_poll_interval(&self) -> Result<Duration> {
        parse_duration(&self.health_poll_interval)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            kind: ServiceKind::Postgres,
            postgres: Some(PostgresConfig::default()),
            script: None,
            health_poll_timeout: "60s".to_string(),
            health_poll_interval: "1s".to_string(),
        }
    }
}

/// PostgreSQL service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Path to pg_ctl
    pub pg_ctl: PathBuf,

    /// Data directory handed to pg_ctl
    pub data_dir: PathBuf,

    /// Command used to start the service
    pub start_command: String,

    /// Replication-settings template rendered for a primary, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_settings_template: Option<PathBuf>,

    /// Replication-settings template rendered for a replica
    pub replica_settings_template: PathBuf,

    /// Where the rendered settings file is written
    pub settings_target: PathBuf,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            pg_ctl: PathBuf::from("/usr/lib/postgresql/16/bin/pg_ctl"),
            data_dir: PathBuf::from("/var/lib/postgresql/16/main"),
            start_command: "systemctl start postgresql".to_string(),
            primary_settings_template: None,
            replica_settings_template: PathBuf::from("/etc/dnsherd/replica.conf.tmpl"),
            settings_target: PathBuf::from("/etc/postgresql/16/main/conf.d/replication.conf"),
        }
    }
}

/// Script-based service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    pub prepare_primary: String,
    pub prepare_replica: String,
    pub start: String,
    pub promote: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            prepare_primary: "/usr/local/bin/prepare-primary".to_string(),
            prepare_replica: "/usr/local/bin/prepare-replica".to_string(),
            start: "/etc/init.d/database start".to_string(),
            promote: "/usr/local/bin/promote".to_string(),
        }
    }
}

/// Backup job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Whether a backup job is installed at all
    pub enabled: bool,

    /// Command the cron job runs
    pub command: String,

    /// Cron cadence expression
    pub cadence: String,

    /// Crontab user; current user when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "snapshot-backup postgresql".to_string(),
            cadence: "0 8 * * *".to_string(),
            user: None,
        }
    }
}
