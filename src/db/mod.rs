//! Database liveness and recovery-state probes
//!
//! The managed database exposes a small status API next to its wire
//! protocol: `/health` answers liveness, `/status` reports whether the
//! instance is in recovery (a replica) or accepting writes (a primary).
//! The active-primary safety check and the bootstrap health poll both go
//! through this seam.

use serde::Deserialize;

use crate::common::DatabaseConfig;
use crate::{Error, Result};

/// Opens connections to a database instance by host.
pub trait DatabaseClient {
    type Conn: DatabaseConnection;

    /// Connect to `host`, or to the locally configured instance when `None`.
    /// An unreachable instance fails with [`crate::Error::ConnectionFailed`].
    async fn connect(&self, host: Option<&str>) -> Result<Self::Conn>;
}

/// A live connection to one database instance.
pub trait DatabaseConnection {
    /// Is the remote instance in recovery (following a primary)?
    async fn is_in_recovery(&self) -> Result<bool>;

    /// Basic liveness probe.
    async fn probe(&self) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    in_recovery: bool,
}

/// Probes a database's HTTP status endpoint.
#[derive(Debug, Clone)]
pub struct HttpDatabaseClient {
    host: String,
    status_port: u16,
    client: reqwest::Client,
}

impl HttpDatabaseClient {
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.connect_timeout()?)
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self {
            host: config.host.clone(),
            status_port: config.status_port,
            client,
        })
    }
}

impl DatabaseClient for HttpDatabaseClient {
    type Conn = HttpDatabaseConnection;

    async fn connect(&self, host: Option<&str>) -> Result<Self::Conn> {
        let host = host.unwrap_or(&self.host);
        let base = format!("http://{}:{}", host, self.status_port);

        // Reachability is established up front so connect failure and
        // status-query failure stay distinguishable to callers.
        self.client
            .get(format!("{}/health", base))
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed(format!("{}: {}", host, e)))?;

        Ok(HttpDatabaseConnection {
            base,
            client: self.client.clone(),
        })
    }
}

/// Connection to one instance's status API
#[derive(Debug, Clone)]
pub struct HttpDatabaseConnection {
    base: String,
    client: reqwest::Client,
}

impl DatabaseConnection for HttpDatabaseConnection {
    async fn is_in_recovery(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/status", self.base))
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "status query returned {}",
                response.status()
            )));
        }

        let status: StatusResponse = response.json().await?;
        Ok(status.in_recovery)
    }

    async fn probe(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/health", self.base))
            .send()
            .await
            .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
        Ok(response.status().is_success())
    }
}
