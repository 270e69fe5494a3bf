//! Node bootstrap integration tests

mod common;

use common::{FakeDb, FakeService, RecordingBackup, StaticMetadata, test_config};
use dnsherd::cluster::ClusterNode;
use dnsherd::naming::{MemoryNaming, NamingService, RecordType};
use dnsherd::{ClusterRole, Error};

async fn node(
    naming: &MemoryNaming,
    db: FakeDb,
    service: &FakeService,
    backup: &RecordingBackup,
    id: &str,
    hostname: &str,
) -> ClusterNode<MemoryNaming, FakeDb, FakeService, RecordingBackup> {
    let provider = StaticMetadata::node("orders", id, hostname);
    ClusterNode::new(
        &provider,
        test_config(),
        naming.clone(),
        db,
        service.clone(),
        backup.clone(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_first_node_becomes_primary_and_claims() {
    let naming = MemoryNaming::new();
    let service = FakeService::new();
    let backup = RecordingBackup::new();

    let mut a = node(
        &naming,
        FakeDb::healthy_replica(),
        &service,
        &backup,
        "i-a",
        "node-a.test.example",
    )
    .await;

    let role = a.initialise().await.unwrap();
    assert_eq!(role, ClusterRole::Primary);
    assert_eq!(a.role(), Some(ClusterRole::Primary));
    assert_eq!(service.prepared_roles(), vec!["primary"]);
    assert_eq!(service.starts(), 1);

    let values = naming
        .query("db.orders.test.example", RecordType::Cname)
        .await
        .unwrap();
    assert_eq!(values, vec!["node-a.test.example"]);

    // A fresh primary gets the backup job.
    assert_eq!(backup.count(), 1);
}

#[tokio::test]
async fn test_second_node_becomes_replica_and_registers() {
    let naming = MemoryNaming::new();
    let service = FakeService::new();
    let backup = RecordingBackup::new();

    let mut a = node(
        &naming,
        FakeDb::healthy_replica(),
        &service,
        &backup,
        "i-a",
        "node-a.test.example",
    )
    .await;
    a.initialise().await.unwrap();

    let replica_service = FakeService::new();
    let replica_backup = RecordingBackup::new();
    let mut b = node(
        &naming,
        FakeDb::healthy_replica(),
        &replica_service,
        &replica_backup,
        "i-b",
        "node-b.test.example",
    )
    .await;

    let role = b.initialise().await.unwrap();
    assert_eq!(role, ClusterRole::Replica);
    assert_eq!(replica_service.prepared_roles(), vec!["replica"]);

    let entries = naming.pool_entries("db-replicas.orders.test.example");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].identifier, "i-b");
    assert_eq!(entries[0].target, "node-b.test.example");

    // Replicas do not get a backup job at bootstrap.
    assert_eq!(replica_backup.count(), 0);
}

#[tokio::test]
async fn test_replica_rebootstrap_is_idempotent() {
    let naming = MemoryNaming::new();
    let service = FakeService::new();
    let backup = RecordingBackup::new();

    let mut a = node(
        &naming,
        FakeDb::healthy_replica(),
        &service,
        &backup,
        "i-a",
        "node-a.test.example",
    )
    .await;
    a.initialise().await.unwrap();

    // Same replica boots twice (e.g. a process restart).
    for _ in 0..2 {
        let mut b = node(
            &naming,
            FakeDb::healthy_replica(),
            &FakeService::new(),
            &RecordingBackup::new(),
            "i-b",
            "node-b.test.example",
        )
        .await;
        b.initialise().await.unwrap();
    }

    assert_eq!(naming.pool_entries("db-replicas.orders.test.example").len(), 1);
}

#[tokio::test]
async fn test_role_is_resolved_once_per_process() {
    let naming = MemoryNaming::new();
    let service = FakeService::new();
    let backup = RecordingBackup::new();

    let mut a = node(
        &naming,
        FakeDb::healthy_replica(),
        &service,
        &backup,
        "i-a",
        "node-a.test.example",
    )
    .await;

    a.initialise().await.unwrap();
    assert!(a.initialise().await.is_err());
}

#[tokio::test]
async fn test_unhealthy_primary_does_not_keep_a_claim() {
    let naming = MemoryNaming::new();
    let service = FakeService::new();
    let backup = RecordingBackup::new();

    let db = FakeDb {
        remote: common::Remote::Unreachable,
        local_healthy: false,
        local_in_recovery: false,
    };
    let mut a = node(&naming, db, &service, &backup, "i-a", "node-a.test.example").await;

    let result = a.initialise().await;
    assert!(matches!(result, Err(Error::Timeout(_))));

    // The primary name is not bound and no backup job was installed.
    assert!(naming
        .query("db.orders.test.example", RecordType::Cname)
        .await
        .is_err());
    assert_eq!(backup.count(), 0);
}

#[tokio::test]
async fn test_end_to_end_failover() {
    // Empty namespace: node A resolves primary and claims the name.
    let naming = MemoryNaming::new();
    let service_a = FakeService::new();
    let backup_a = RecordingBackup::new();
    let mut a = node(
        &naming,
        FakeDb::healthy_replica(),
        &service_a,
        &backup_a,
        "i-a",
        "node-a.test.example",
    )
    .await;
    assert_eq!(a.initialise().await.unwrap(), ClusterRole::Primary);

    // Node B resolves replica and registers in the pool.
    let service_b = FakeService::new();
    let backup_b = RecordingBackup::new();
    let mut b = node(
        &naming,
        FakeDb::healthy_replica(),
        &service_b,
        &backup_b,
        "i-b",
        "node-b.test.example",
    )
    .await;
    assert_eq!(b.initialise().await.unwrap(), ClusterRole::Replica);

    // A dies. The operator forces promotion of B; the primary at the bound
    // name is unreachable, so even the unforced guard would not fire.
    let outcome = b.promote(true).await.unwrap();
    assert!(outcome.succeeded);
    assert_eq!(outcome.reason, None);
    assert_eq!(service_b.promotions(), 1);

    // The freshly promoted primary now carries the backup job.
    assert_eq!(backup_b.count(), 1);

    // Naming takeover is the separate, explicit follow-up step.
    b.claim_primary(true).await.unwrap();
    let values = naming
        .query("db.orders.test.example", RecordType::Cname)
        .await
        .unwrap();
    assert_eq!(values, vec!["node-b.test.example"]);
}
