//! # dnsherd
//!
//! Self-assembling database cluster coordination over DNS:
//! - Role resolution from the existence of the primary name record
//! - Exclusive primary binding with claim / force-claim / release
//! - Weighted replica pool with idempotent registration
//! - Safety-checked replica-to-primary promotion with operator override
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────────────────────┐
//!            │       Naming namespace       │
//!            │  db.orders.cluster.example   │──► primary (exclusive)
//!            │  db-replicas.orders....      │──► replicas (weighted pool)
//!            └──────────┬───────────────────┘
//!                       │ query / create / delete
//!        ┌──────────────┼──────────────┐
//!        │              │              │
//!  ┌─────▼─────┐  ┌─────▼─────┐  ┌────▼──────┐
//!  │  Node A   │  │  Node B   │  │  Node C   │
//!  │ (primary) │  │ (replica) │  │ (replica) │
//!  └───────────┘  └───────────┘  └───────────┘
//! ```
//!
//! The first node to boot finds the primary name unbound, takes the primary
//! role and claims the name; every later node sees the binding and joins the
//! replica pool. Uniqueness of the primary binding is enforced by a
//! check-then-create convention, not a consensus protocol: the deliberately
//! accepted race window and the operator-forced override are part of the
//! contract.
//!
//! ## Usage
//!
//! ### Bootstrap a node
//! ```bash
//! dnsherd init
//! ```
//!
//! ### Promote a replica after the primary is lost
//! ```bash
//! dnsherd promote --force --take-name
//! ```
//!
//! ### Inspect a node
//! ```bash
//! dnsherd status
//! ```

pub mod backup;
pub mod cluster;
pub mod common;
pub mod db;
pub mod naming;
pub mod service;

// Re-export commonly used types
pub use cluster::{ClusterNode, ClusterRole, PromotionOutcome, PromotionReason};
pub use common::{Config, Error, Result};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
