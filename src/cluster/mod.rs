//! Role coordination for the cluster
//!
//! The subsystem that decides which node is the primary:
//! - Role resolution from the primary binding's existence
//! - Claim/release of the exclusive primary name
//! - Idempotent replica pool registration
//! - Safety-checked promotion of a replica to primary

pub mod identity;
pub mod node;
pub mod primary;
pub mod promotion;
pub mod replica;
pub mod resolver;

pub use identity::{EnvMetadata, InstanceMetadata, MetadataProvider, MetadataSource, NodeIdentity};
pub use node::ClusterNode;
pub use primary::PrimaryNameCoordinator;
pub use promotion::{PromotionController, PromotionOutcome, PromotionReason, PromotionState};
pub use replica::ReplicaPoolRegistrar;
pub use resolver::{ClusterRole, RoleResolver};
