//! Read-only access to live cluster objects
//!
//! The wait coordinator only needs list-by-selector for a handful of kinds.
//! [`KubeAccessor`] talks to the API server through kube-rs;
//! [`MockClusterAccessor`] serves scripted objects for tests.

mod mock;

pub use mock::MockClusterAccessor;

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Service};
use kube::api::Api;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;

use crate::error::{KubeError, Result};
use crate::target::ObjectSelector;

/// Fetches current object state by namespace and selector
///
/// Implementations must not retry internally forever; a fetch error ends
/// the wait it belongs to.
#[async_trait]
pub trait ClusterAccessor: Send + Sync {
    async fn list_pods(&self, namespace: &str, selector: &ObjectSelector) -> Result<Vec<Pod>>;

    async fn list_services(&self, namespace: &str, selector: &ObjectSelector)
    -> Result<Vec<Service>>;

    async fn list_persistent_volume_claims(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<PersistentVolumeClaim>>;

    async fn list_deployments(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<Deployment>>;

    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<ReplicaSet>>;
}

/// Cluster accessor backed by a kube-rs client
#[derive(Clone)]
pub struct KubeAccessor {
    client: Client,
}

impl KubeAccessor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using the ambient kubeconfig or in-cluster config
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await.map_err(KubeError::Api)?;
        Ok(Self::new(client))
    }

    async fn list<K>(&self, namespace: &str, selector: &ObjectSelector) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&selector.list_params()).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterAccessor for KubeAccessor {
    async fn list_pods(&self, namespace: &str, selector: &ObjectSelector) -> Result<Vec<Pod>> {
        self.list(namespace, selector).await
    }

    async fn list_services(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<Service>> {
        self.list(namespace, selector).await
    }

    async fn list_persistent_volume_claims(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<PersistentVolumeClaim>> {
        self.list(namespace, selector).await
    }

    async fn list_deployments(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<Deployment>> {
        self.list(namespace, selector).await
    }

    async fn list_replica_sets(
        &self,
        namespace: &str,
        selector: &ObjectSelector,
    ) -> Result<Vec<ReplicaSet>> {
        self.list(namespace, selector).await
    }
}
