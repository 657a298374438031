//! Per-kind readiness predicates
//!
//! Each check is a pure function of the fetched object. A negative answer
//! is not an error, it just means "poll again".
//!
//! | Kind | Ready when |
//! |---|---|
//! | Pod | a `Ready` condition has status `True` |
//! | Service | `ExternalName`, or a cluster IP (or `None`) is assigned; LoadBalancers also need an ingress |
//! | PersistentVolumeClaim | phase is `Bound` |
//! | Deployment | generation observed, all replicas updated, current ReplicaSet fully ready |

use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Service};
use kube::ResourceExt;
use serde::{Deserialize, Serialize};

use crate::target::ResourceKind;

/// Annotation the deployment controller stamps on deployments and their ReplicaSets
pub const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

/// Answer of a single predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    NotReady(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    fn not_ready(reason: impl Into<String>) -> Self {
        Readiness::NotReady(reason.into())
    }
}

/// An object that failed its predicate on the last poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotReady {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
    pub reason: String,
}

impl std::fmt::Display for NotReady {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}/{}: {}",
            self.kind, self.namespace, self.name, self.reason
        )
    }
}

pub fn check_pod(pod: &Pod) -> Readiness {
    let ready = pod
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });

    if ready {
        Readiness::Ready
    } else {
        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown");
        Readiness::not_ready(format!("pod is not ready (phase {})", phase))
    }
}

pub fn check_service(service: &Service) -> Readiness {
    let spec = service.spec.as_ref();
    let service_type = spec.and_then(|s| s.type_.as_deref()).unwrap_or("ClusterIP");

    // No cluster address is ever assigned to these
    if service_type == "ExternalName" {
        return Readiness::Ready;
    }

    let has_cluster_ip = spec
        .and_then(|s| s.cluster_ip.as_deref())
        .is_some_and(|ip| !ip.is_empty());
    if !has_cluster_ip {
        return Readiness::not_ready("cluster IP not assigned");
    }

    if service_type == "LoadBalancer" {
        let ingress = service
            .status
            .as_ref()
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map_or(0, Vec::len);
        if ingress == 0 {
            return Readiness::not_ready("load balancer has no ingress");
        }
    }

    Readiness::Ready
}

pub fn check_persistent_volume_claim(pvc: &PersistentVolumeClaim) -> Readiness {
    let phase = pvc.status.as_ref().and_then(|s| s.phase.as_deref());
    match phase {
        Some("Bound") => Readiness::Ready,
        other => Readiness::not_ready(format!(
            "claim is {}, not Bound",
            other.unwrap_or("Pending")
        )),
    }
}

/// Deployment readiness against its current ReplicaSet
///
/// `replica_set` should come from [`current_replica_set`]; `None` means the
/// controller has not created one yet.
pub fn check_deployment(deployment: &Deployment, replica_set: Option<&ReplicaSet>) -> Readiness {
    let status = deployment.status.as_ref();

    let generation = deployment.metadata.generation;
    let observed = status.and_then(|s| s.observed_generation);
    if generation != observed {
        return Readiness::not_ready(format!(
            "generation {} not yet observed (last seen {})",
            display_opt(generation),
            display_opt(observed)
        ));
    }

    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let updated = status.and_then(|s| s.updated_replicas).unwrap_or(0);
    if updated != desired {
        return Readiness::not_ready(format!("{}/{} replicas updated", updated, desired));
    }

    let Some(rs) = replica_set else {
        return Readiness::not_ready("no current replica set");
    };
    let ready = rs.status.as_ref().and_then(|s| s.ready_replicas).unwrap_or(0);
    if ready != desired {
        return Readiness::not_ready(format!(
            "{}/{} replicas ready in {}",
            ready,
            desired,
            rs.name_any()
        ));
    }

    Readiness::Ready
}

pub fn is_pod_ready(pod: &Pod) -> bool {
    check_pod(pod).is_ready()
}

pub fn is_service_ready(service: &Service) -> bool {
    check_service(service).is_ready()
}

pub fn is_persistent_volume_claim_ready(pvc: &PersistentVolumeClaim) -> bool {
    check_persistent_volume_claim(pvc).is_ready()
}

pub fn is_deployment_ready(deployment: &Deployment, replica_set: Option<&ReplicaSet>) -> bool {
    check_deployment(deployment, replica_set).is_ready()
}

/// The ReplicaSet the deployment currently owns
///
/// Among ReplicaSets controlled by the deployment, the one whose revision
/// matches the deployment's wins; otherwise the highest revision.
pub fn current_replica_set<'a>(
    deployment: &Deployment,
    replica_sets: &'a [ReplicaSet],
) -> Option<&'a ReplicaSet> {
    let owned: Vec<&ReplicaSet> = replica_sets
        .iter()
        .filter(|rs| is_controlled_by(rs, deployment))
        .collect();

    if let Some(revision) = deployment.annotations().get(REVISION_ANNOTATION)
        && let Some(rs) = owned
            .iter()
            .copied()
            .find(|rs| rs.annotations().get(REVISION_ANNOTATION) == Some(revision))
    {
        return Some(rs);
    }

    owned.into_iter().max_by_key(|rs| revision_of(rs))
}

fn is_controlled_by(rs: &ReplicaSet, deployment: &Deployment) -> bool {
    rs.owner_references().iter().any(|owner| {
        owner.controller == Some(true)
            && owner.kind == "Deployment"
            && match deployment.metadata.uid.as_deref() {
                Some(uid) => owner.uid == uid,
                None => owner.name == deployment.name_any(),
            }
    })
}

fn revision_of(rs: &ReplicaSet) -> i64 {
    rs.annotations()
        .get(REVISION_ANNOTATION)
        .and_then(|r| r.parse().ok())
        .unwrap_or(0)
}

fn display_opt(value: Option<i64>) -> String {
    value.map_or_else(|| "none".to_string(), |v| v.to_string())
}
