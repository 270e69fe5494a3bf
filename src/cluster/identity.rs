//! Node identity and metadata sources

use std::collections::HashMap;

use crate::common::{MetadataConfig, MetadataSourceKind};
use crate::{Error, Result};

/// Who this node is: a stable identifier that survives restarts and the
/// address other nodes and clients reach it at. Built once at startup,
/// never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub stable_id: String,
    pub advertised_address: String,
}

impl NodeIdentity {
    /// Build an identity from a metadata map. `instance-id` and
    /// `public-hostname` are required.
    pub fn from_metadata(metadata: &HashMap<String, String>) -> Result<Self> {
        let stable_id = metadata
            .get("instance-id")
            .ok_or_else(|| Error::MetadataUnavailable("instance-id".into()))?;
        let advertised_address = metadata
            .get("public-hostname")
            .ok_or_else(|| Error::MetadataUnavailable("public-hostname".into()))?;

        Ok(Self {
            stable_id: stable_id.clone(),
            advertised_address: advertised_address.clone(),
        })
    }
}

/// Supplies the metadata map a node builds its identity and record names
/// from. Must carry at least `instance-id` and `public-hostname`.
pub trait MetadataProvider {
    async fn fetch(&self) -> Result<HashMap<String, String>>;
}

/// Metadata from `PREFIX`-named environment variables: `PREFIX_INSTANCE_ID`
/// becomes `instance-id`, and so on. The local-development path.
#[derive(Debug, Clone)]
pub struct EnvMetadata {
    prefix: String,
}

impl EnvMetadata {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

impl MetadataProvider for EnvMetadata {
    async fn fetch(&self) -> Result<HashMap<String, String>> {
        let metadata: HashMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(&self.prefix)
                    .map(|rest| (rest.to_lowercase().replace('_', "-"), value))
            })
            .collect();

        if metadata.is_empty() {
            return Err(Error::MetadataUnavailable(format!(
                "no {}* environment variables set",
                self.prefix
            )));
        }
        Ok(metadata)
    }
}

/// Metadata from a link-local instance-metadata endpoint, merged with the
/// instance's user-data JSON document (which typically carries `cluster`).
#[derive(Debug, Clone)]
pub struct InstanceMetadata {
    endpoint: String,
    client: reqwest::Client,
}

impl InstanceMetadata {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn fetch_key(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint, path))
            .send()
            .await
            .map_err(|e| Error::MetadataUnavailable(format!("{}: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(Error::MetadataUnavailable(format!(
                "{} returned {}",
                path,
                response.status()
            )));
        }
        Ok(response.text().await?.trim().to_string())
    }
}

impl MetadataProvider for InstanceMetadata {
    async fn fetch(&self) -> Result<HashMap<String, String>> {
        let mut metadata = HashMap::new();
        metadata.insert(
            "instance-id".to_string(),
            self.fetch_key("meta-data/instance-id").await?,
        );
        metadata.insert(
            "public-hostname".to_string(),
            self.fetch_key("meta-data/public-hostname").await?,
        );

        // User data is a free-form JSON object; string values are merged in
        // alongside the instance keys.
        if let Ok(user_data) = self.fetch_key("user-data").await {
            if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(&user_data) {
                for (key, value) in map {
                    if let serde_json::Value::String(value) = value {
                        metadata.insert(key, value);
                    }
                }
            }
        }

        Ok(metadata)
    }
}

/// The configured metadata source, dispatched by variant.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    Env(EnvMetadata),
    Instance(InstanceMetadata),
}

impl MetadataSource {
    pub fn from_config(config: &MetadataConfig) -> Self {
        match config.source {
            MetadataSourceKind::Env => MetadataSource::Env(EnvMetadata::new(&config.env_prefix)),
            MetadataSourceKind::Instance => {
                MetadataSource::Instance(InstanceMetadata::new(&config.endpoint))
            }
        }
    }
}

impl MetadataProvider for MetadataSource {
    async fn fetch(&self) -> Result<HashMap<String, String>> {
        match self {
            MetadataSource::Env(provider) => provider.fetch().await,
            MetadataSource::Instance(provider) => provider.fetch().await,
        }
    }
}
