//! Mock cluster accessor for testing
//!
//! Objects are scripted as frames per kind: every list call for a kind
//! consumes the next frame, and the last frame repeats forever. This makes
//! "not ready, not ready, ready" sequences easy to express without a cluster.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Service};
use kube::{Resource, ResourceExt};

use super::ClusterAccessor;
use crate::error::{KubeError, Result};
use crate::target::ObjectSelector;

/// In-memory cluster accessor for testing
#[derive(Clone, Default)]
pub struct MockClusterAccessor {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    pods: Frames<Pod>,
    services: Frames<Service>,
    claims: Frames<PersistentVolumeClaim>,
    deployments: Frames<Deployment>,
    replica_sets: Frames<ReplicaSet>,
    /// kind -> error message returned instead of objects
    failures: HashMap<&'static str, String>,
    latency: Option<Duration>,
    fetches: usize,
}

struct Frames<T> {
    frames: VecDeque<Vec<T>>,
}

impl<T> Default for Frames<T> {
    fn default() -> Self {
        Self {
            frames: VecDeque::new(),
        }
    }
}

impl<T: Clone> Frames<T> {
    fn push(&mut self, objects: Vec<T>) {
        self.frames.push_back(objects);
    }

    fn next(&mut self) -> Vec<T> {
        if self.frames.len() > 1 {
            self.frames.pop_front().unwrap_or_default()
        } else {
            self.frames.front().cloned().unwrap_or_default()
        }
    }
}

impl MockClusterAccessor {
    /// Create an accessor that serves no objects
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pods(self, pods: Vec<Pod>) -> Self {
        self.state().pods.push(pods);
        self
    }

    pub fn with_services(self, services: Vec<Service>) -> Self {
        self.state().services.push(services);
        self
    }

    pub fn with_persistent_volume_claims(self, claims: Vec<PersistentVolumeClaim>) -> Self {
        self.state().claims.push(claims);
        self
    }

    pub fn with_deployments(self, deployments: Vec<Deployment>) -> Self {
        self.state().deployments.push(deployments);
        self
    }

    pub fn with_replica_sets(self, replica_sets: Vec<ReplicaSet>) -> Self {
        self.state().replica_sets.push(replica_sets);
        self
    }

    /// Make every list of `kind` fail with `message`
    pub fn failing(self, kind: &'static str, message: impl Into<String>) -> Self {
        self.state().failures.insert(kind, message.into());
        self
    }

    /// Delay every fetch by `latency`
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state().latency = Some(latency);
        self
    }

    /// Number of list calls served so far
    pub fn fetch_count(&self) -> usize {
        self.state().fetches
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch<T>(
        &self,
        kind: &'static str,
        namespace: &str,
        selector: &ObjectSelector,
        frames: fn(&mut MockState) -> &mut Frames<T>,
    ) -> Result<Vec<T>>
    where
        T: Resource + Clone + Send,
    {
        let (result, latency) = {
            let mut state = self.state();
            state.fetches += 1;
            let failure = state.failures.get(kind).cloned();
            let result = match failure {
                Some(message) => Err(KubeError::Fetch {
                    kind: kind.to_string(),
                    namespace: namespace.to_string(),
                    message,
                }),
                None => Ok(frames(&mut *state)
                    .next()
                    .into_iter()
                    .filter(|obj| selected(obj, namespace, selector))
                    .collect()),
            };
            (result, state.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

/// Objects without a namespace are visible from every namespace
fn selected<T: Resource>(obj: &T, namespace: &str, selector: &ObjectSelector) -> bool {
    let in_namespace = obj
        .meta()
        .namespace
        .as_deref()
        .is_none_or(|ns| ns == namespace);
    in_namespace && selector.matches(&obj.name_any(), obj.meta().labels.as_ref())
}

#[async_trait]
impl ClusterAccessor for MockClusterAccessor {
    async fn list_pods(&self, namespace: &str, selector: &ObjectSelector) -> Result<Vec<Pod>> {
        self.fetch("Pod", namespace, selector, |s| &mut s.pods).await
    }

    async fn list_services(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<Service>> {
        self.fetch("Service", namespace, selector, |s| &mut s.services)
            .await
    }

    async fn list_persistent_volume_claims(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<PersistentVolumeClaim>> {
        self.fetch("PersistentVolumeClaim", namespace, selector, |s| {
            &mut s.claims
        })
        .await
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<Deployment>> {
        self.fetch("Deployment", namespace, selector, |s| &mut s.deployments)
            .await
    }

    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<ReplicaSet>> {
        self.fetch("ReplicaSet", namespace, selector, |s| &mut s.replica_sets)
            .await
    }
}
