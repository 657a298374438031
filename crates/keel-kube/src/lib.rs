//! Keel Kube - waiting for applied resources to become ready
//!
//! - `readiness`: per-kind predicates for Pods, Services, PersistentVolumeClaims
//!   and Deployments (checked against their current ReplicaSet)
//! - `target`: what to wait for, by name or by label selector
//! - `accessor`: how live objects are fetched (kube-rs client or a scripted mock)
//! - `wait`: the polling coordinator with a deadline and cancellation

pub mod accessor;
pub mod error;
pub mod readiness;
pub mod target;
pub mod wait;

pub use accessor::{ClusterAccessor, KubeAccessor, MockClusterAccessor};
pub use error::{KubeError, Result};
pub use readiness::{
    NotReady, Readiness, check_deployment, check_persistent_volume_claim, check_pod,
    check_service, current_replica_set, is_deployment_ready, is_persistent_volume_claim_ready,
    is_pod_ready, is_service_ready,
};
pub use target::{ObjectSelector, ReadinessTarget, ResourceKind, targets_from_manifests};
pub use wait::{WaitConfig, WaitCoordinator, WaitOutcome};

pub use tokio_util::sync::CancellationToken;
