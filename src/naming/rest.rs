//! REST naming backend
//!
//! Client for an authoritative DNS-management API exposing zone/record CRUD.
//! Absence is a 404, an exclusive-name or pool-identifier collision is a 409;
//! both map onto the naming error contract. Queries go to the authoritative
//! API rather than a caching resolver, so mutual-exclusion checks never read
//! stale data.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::naming::{NamingService, RecordType};
use crate::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct RecordPayload {
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    values: Vec<String>,
    ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    set_identifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    values: Vec<String>,
}

/// Naming backend speaking to a DNS-management REST API
#[derive(Debug, Clone)]
pub struct RestNaming {
    endpoint: String,
    zone: String,
    client: reqwest::Client,
}

impl RestNaming {
    pub fn new(endpoint: &str, zone: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            zone: zone.to_string(),
            client,
        })
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/records", self.endpoint, self.zone)
    }

    fn record_url(&self, name: &str) -> String {
        format!("{}/{}", self.records_url(), name)
    }
}

impl NamingService for RestNaming {
    async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.record_url(name))
            .query(&[("type", record_type.to_string())])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::RecordNotFound(name.to_string())),
            status if status.is_success() => {
                let body: QueryResponse = response.json().await?;
                Ok(body.values)
            }
            status => Err(Error::Http(format!(
                "query {} returned {}",
                name, status
            ))),
        }
    }

    async fn create_exclusive(&self, name: &str, value: &str, ttl: Duration) -> Result<()> {
        let payload = RecordPayload {
            name: name.to_string(),
            record_type: RecordType::Cname.to_string(),
            values: vec![value.to_string()],
            ttl_secs: ttl.as_secs(),
            weight: None,
            set_identifier: None,
        };

        let response = self
            .client
            .post(self.records_url())
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(Error::RecordExists(name.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(Error::Http(format!(
                "create {} returned {}",
                name, status
            ))),
        }
    }

    async fn delete_exclusive(&self, name: &str, value: &str, ttl: Duration) -> Result<()> {
        let payload = RecordPayload {
            name: name.to_string(),
            record_type: RecordType::Cname.to_string(),
            values: vec![value.to_string()],
            ttl_secs: ttl.as_secs(),
            weight: None,
            set_identifier: None,
        };

        let response = self
            .client
            .delete(self.record_url(name))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::RecordNotFound(name.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(Error::Http(format!(
                "delete {} returned {}",
                name, status
            ))),
        }
    }

    async fn create_pool_entry(
        &self,
        name: &str,
        value: &str,
        ttl: Duration,
        weight: u32,
        identifier: &str,
    ) -> Result<()> {
        let payload = RecordPayload {
            name: name.to_string(),
            record_type: RecordType::Cname.to_string(),
            values: vec![value.to_string()],
            ttl_secs: ttl.as_secs(),
            weight: Some(weight),
            set_identifier: Some(identifier.to_string()),
        };

        let response = self
            .client
            .post(self.records_url())
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::CONFLICT => Err(Error::RecordExists(format!("{} ({})", name, identifier))),
            status if status.is_success() => Ok(()),
            status => Err(Error::Http(format!(
                "create pool entry {} returned {}",
                name, status
            ))),
        }
    }
}
