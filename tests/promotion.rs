//! Promotion safety integration tests

mod common;

use common::{FakeDb, FakeService, RecordingBackup, Remote, StaticMetadata, test_config};
use dnsherd::cluster::ClusterNode;
use dnsherd::naming::{MemoryNaming, NamingService, RecordType};
use dnsherd::PromotionReason;

async fn replica_node(
    naming: &MemoryNaming,
    db: FakeDb,
    service: &FakeService,
    backup: &RecordingBackup,
) -> ClusterNode<MemoryNaming, FakeDb, FakeService, RecordingBackup> {
    let provider = StaticMetadata::node("orders", "i-b", "node-b.test.example");
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

/// The primary name points at a live node that believes it is primary:
/// promotion is blocked and nothing runs locally.
#[tokio::test]
async fn test_promotion_blocked_by_active_primary() {
    let naming = MemoryNaming::new();
    let db = FakeDb {
        remote: Remote::Primary,
        local_healthy: true,
        local_in_recovery: true,
    };
    let service = FakeService::new();
    let backup = RecordingBackup::new();
    let node = replica_node(&naming, db, &service, &backup).await;

    let outcome = node.promote(false).await.unwrap();
    assert!(!outcome.succeeded);
    assert_eq!(outcome.reason, Some(PromotionReason::ActivePrimaryExists));
    assert_eq!(service.promotions(), 0);
    assert_eq!(backup.count(), 0);
}

/// The bound address answers but reports replica state: the binding is
/// stale and must not block promotion.
#[tokio::test]
async fn test_stale_binding_does_not_block() {
    let naming = MemoryNaming::new();
    let db = FakeDb {
        remote: Remote::Replica,
        local_healthy: true,
        local_in_recovery: true,
    };
    let service = FakeService::new();
    let backup = RecordingBackup::new();
    let node = replica_node(&naming, db, &service, &backup).await;

    let outcome = node.promote(false).await.unwrap();
    assert!(outcome.succeeded);
    assert_eq!(service.promotions(), 1);
}

#[tokio::test]
async fn test_forced_promotion_overrides_guard() {
    let naming = MemoryNaming::new();
    let db = FakeDb {
        remote: Remote::Primary,
        local_healthy: true,
        local_in_recovery: true,
    };
    let service = FakeService::new();
    let backup = RecordingBackup::new();
    let node = replica_node(&naming, db, &service, &backup).await;

    let outcome = node.promote(true).await.unwrap();
    assert!(outcome.succeeded);
    assert_eq!(service.promotions(), 1);
    assert_eq!(backup.count(), 1);
}

#[tokio::test]
async fn test_not_a_replica_is_surfaced_verbatim() {
    let naming = MemoryNaming::new();
    let db = FakeDb::healthy_replica();
    let service = FakeService::failing_promotion("pg_ctl: server is not in standby mode\n");
    let backup = RecordingBackup::new();
    let node = replica_node(&naming, db, &service, &backup).await;

    let outcome = node.promote(false).await.unwrap();
    assert!(!outcome.succeeded);
    match outcome.reason {
        Some(PromotionReason::NotAReplica { output }) => {
            assert_eq!(output, "pg_ctl: server is not in standby mode\n");
        }
        other => panic!("unexpected reason: {:?}", other),
    }
    // Fatal misuse: exactly one attempt, no backup job.
    assert_eq!(service.promotions(), 1);
    assert_eq!(backup.count(), 0);
}

#[tokio::test]
async fn test_promotion_does_not_touch_the_primary_name() {
    let naming = MemoryNaming::new();
    naming
        .create_exclusive(
            "db.orders.test.example",
            "node-a.test.example",
            std::time::Duration::from_secs(60),
        )
        .await
        .unwrap();

    let db = FakeDb::healthy_replica();
    let service = FakeService::new();
    let backup = RecordingBackup::new();
    let node = replica_node(&naming, db, &service, &backup).await;

    let outcome = node.promote(false).await.unwrap();
    assert!(outcome.succeeded);

    // The old binding is untouched until the operator claims explicitly.
    let values = naming
        .query("db.orders.test.example", RecordType::Cname)
        .await
        .unwrap();
    assert_eq!(values, vec!["node-a.test.example"]);
}
