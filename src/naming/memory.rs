//! In-memory naming backend
//!
//! Used by tests and single-host development. Unlike the two-step
//! check-then-create the REST backend is stuck with, `create_exclusive` here
//! is an atomic check-and-insert under the lock: the first writer wins and
//! the loser observes `RecordExists`, which callers surface as
//! `AlreadyClaimed`. The externally observed contract is identical.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::naming::{NamingService, PoolEntry, RecordType};
use crate::{Error, Result};

#[derive(Debug, Clone)]
enum RecordSet {
    Exclusive { value: String },
    Pool(Vec<PoolEntry>),
}

/// Process-local naming namespace
#[derive(Debug, Clone, Default)]
pub struct MemoryNaming {
    records: Arc<Mutex<HashMap<String, RecordSet>>>,
}

impl MemoryNaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool entries currently bound under `name`, for inspection.
    pub fn pool_entries(&self, name: &str) -> Vec<PoolEntry> {
        match self.records.lock().unwrap().get(name) {
            Some(RecordSet::Pool(entries)) => entries.clone(),
            _ => Vec::new(),
        }
    }
}

impl NamingService for MemoryNaming {
    async fn query(&self, name: &str, _record_type: RecordType) -> Result<Vec<String>> {
        match self.records.lock().unwrap().get(name) {
            None => Err(Error::RecordNotFound(name.to_string())),
            Some(RecordSet::Exclusive { value }) => Ok(vec![value.clone()]),
            Some(RecordSet::Pool(entries)) => {
                Ok(entries.iter().map(|e| e.target.clone()).collect())
            }
        }
    }

    async fn create_exclusive(&self, name: &str, value: &str, _ttl: Duration) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(name) {
            return Err(Error::RecordExists(name.to_string()));
        }
        records.insert(
            name.to_string(),
            RecordSet::Exclusive {
                value: value.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_exclusive(&self, name: &str, _value: &str, _ttl: Duration) -> Result<()> {
        match self.records.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::RecordNotFound(name.to_string())),
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
        let mut records = self.records.lock().unwrap();
        let set = records
            .entry(name.to_string())
            .or_insert_with(|| RecordSet::Pool(Vec::new()));

        match set {
            // Shape mismatch, not an identifier collision: callers must not
            // mistake this for an idempotent re-registration.
            RecordSet::Exclusive { .. } => Err(Error::Other(format!(
                "{} is bound as an exclusive record",
                name
            ))),
            RecordSet::Pool(entries) => {
                if entries.iter().any(|e| e.identifier == identifier) {
                    return Err(Error::RecordExists(format!("{} ({})", name, identifier)));
                }
                entries.push(PoolEntry {
                    target: value.to_string(),
                    weight,
                    identifier: identifier.to_string(),
                    ttl,
                });
                Ok(())
            }
        }
    }
}
