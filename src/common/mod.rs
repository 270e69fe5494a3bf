//! Common utilities and types shared across dnsherd

pub mod config;
pub mod error;
pub mod utils;

pub use config::{
    BackupConfig, Config, DatabaseConfig, MetadataConfig, MetadataSourceKind, NamingConfig,
    PostgresConfig, ScriptConfig, ServiceConfig, ServiceKind,
};
pub use error::{Error, Result};
pub use utils::{parse_duration, render_template};
