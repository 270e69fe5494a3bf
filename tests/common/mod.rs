//! Shared fakes for integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use dnsherd::backup::BackupScheduler;
use dnsherd::cluster::identity::MetadataProvider;
use dnsherd::db::{DatabaseClient, DatabaseConnection};
use dnsherd::service::{CommandReport, ServiceLifecycle};
use dnsherd::{Config, Error, Result};

/// Fixed metadata for a test node.
pub struct StaticMetadata(pub HashMap<String, String>);

impl StaticMetadata {
    pub fn node(cluster: &str, id: &str, hostname: &str) -> Self {
        let mut map = HashMap::new();
        map.insert("cluster".to_string(), cluster.to_string());
        map.insert("instance-id".to_string(), id.to_string());
        map.insert("public-hostname".to_string(), hostname.to_string());
        Self(map)
    }
}

impl MetadataProvider for StaticMetadata {
    async fn fetch(&self) -> Result<HashMap<String, String>> {
        Ok(self.0.clone())
    }
}

/// What the fake database reports for the instance at the primary name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remote {
    Unreachable,
    Primary,
    Replica,
}

/// Configurable fake for local and remote database probes.
#[derive(Clone)]
pub struct FakeDb {
    pub remote: Remote,
    pub local_healthy: bool,
    pub local_in_recovery: bool,
}

impl FakeDb {
    pub fn healthy_replica() -> Self {
        Self {
            remote: Remote::Unreachable,
            local_healthy: true,
            local_in_recovery: true,
        }
    }
}

pub struct FakeConn {
    healthy: bool,
    in_recovery: bool,
}

impl DatabaseClient for FakeDb {
    type Conn = FakeConn;

    async fn connect(&self, host: Option<&str>) -> Result<Self::Conn> {
        match host {
            Some(host) => match self.remote {
                Remote::Unreachable => Err(Error::ConnectionFailed(format!("{}: refused", host))),
                Remote::Primary => Ok(FakeConn {
                    healthy: true,
                    in_recovery: false,
                }),
                Remote::Replica => Ok(FakeConn {
                    healthy: true,
                    in_recovery: true,
                }),
            },
            None if self.local_healthy => Ok(FakeConn {
                healthy: true,
                in_recovery: self.local_in_recovery,
            }),
            None => Err(Error::ConnectionFailed("localhost: refused".into())),
        }
    }
}

impl DatabaseConnection for FakeConn {
    async fn is_in_recovery(&self) -> Result<bool> {
        Ok(self.in_recovery)
    }

    async fn probe(&self) -> Result<bool> {
        Ok(self.healthy)
    }
}

#[derive(Default)]
struct ServiceLog {
    prepared: Mutex<Vec<String>>,
    starts: AtomicUsize,
    promotions: AtomicUsize,
}

/// Service fake that records lifecycle calls and answers promotion with a
/// configurable report.
#[derive(Clone)]
pub struct FakeService {
    log: Arc<ServiceLog>,
    promotion_report: Arc<Mutex<CommandReport>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            log: Arc::new(ServiceLog::default()),
            promotion_report: Arc::new(Mutex::new(CommandReport {
                success: true,
                output: "server promoting\n".to_string(),
            })),
        }
    }

    pub fn failing_promotion(output: &str) -> Self {
        let service = Self::new();
        *service.promotion_report.lock().unwrap() = CommandReport {
            success: false,
            output: output.to_string(),
        };
        service
    }

    pub fn prepared_roles(&self) -> Vec<String> {
        self.log.prepared.lock().unwrap().clone()
    }

    pub fn starts(&self) -> usize {
        self.log.starts.load(Ordering::SeqCst)
    }

    pub fn promotions(&self) -> usize {
        self.log.promotions.load(Ordering::SeqCst)
    }
}

impl ServiceLifecycle for FakeService {
    async fn prepare_primary(&self, _vars: &HashMap<String, String>) -> Result<()> {
        self.log.prepared.lock().unwrap().push("primary".to_string());
        Ok(())
    }

    async fn prepare_replica(&self, _vars: &HashMap<String, String>) -> Result<()> {
        self.log.prepared.lock().unwrap().push("replica".to_string());
        Ok(())
    }

    async fn start_service(&self) -> Result<()> {
        self.log.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn run_promotion_command(&self) -> Result<CommandReport> {
        self.log.promotions.fetch_add(1, Ordering::SeqCst);
        Ok(self.promotion_report.lock().unwrap().clone())
    }
}

/// Backup fake recording every (command, cadence) it was asked to install.
#[derive(Clone, Default)]
pub struct RecordingBackup {
    pub scheduled: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingBackup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.scheduled.lock().unwrap().len()
    }
}

impl BackupScheduler for RecordingBackup {
    async fn ensure_scheduled(&self, command: &str, cadence: &str) -> Result<()> {
        self.scheduled
            .lock()
            .unwrap()
            .push((command.to_string(), cadence.to_string()));
        Ok(())
    }
}

/// Config tuned for tests: short health poll, test-zone templates.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.naming.primary_name = "db.{cluster}.test.example".to_string();
    config.naming.replica_pool_name = "db-replicas.{cluster}.test.example".to_string();
    config.service.health_poll_timeout = "500ms".to_string();
    config.service.health_poll_interval = "10ms".to_string();
    config
}
