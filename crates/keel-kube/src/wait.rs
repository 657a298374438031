//! Polling until every target is ready
//!
//! Each tick fetches all targets concurrently, evaluates every object with
//! its kind's predicate and only reports success when all of them pass in
//! that same tick. An earlier tick's success counts for nothing.
//!
//! ```text
//! Polling ──all ready──▶ Ready
//!    │ ──deadline──────▶ Timeout
//!    │ ──fetch error───▶ Error
//!    └ ──cancelled─────▶ Cancelled
//! ```

use std::time::Duration;

use futures::future::try_join_all;
use k8s_openapi::api::apps::v1::Deployment;
use keel_core::GenericManifest;
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::accessor::ClusterAccessor;
use crate::error::{KubeError, Result};
use crate::readiness::{
    NotReady, Readiness, check_deployment, check_persistent_volume_claim, check_pod, check_service,
    current_replica_set,
};
use crate::target::{ObjectSelector, ReadinessTarget, ResourceKind, targets_from_manifests};

/// Poll interval and overall deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
        }
    }
}

impl WaitConfig {
    /// A zero interval would poll without pausing
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(KubeError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Terminal state of one wait
#[derive(Debug)]
pub enum WaitOutcome {
    /// Every target passed in the same tick
    Ready { ticks: u32, elapsed: Duration },
    /// The deadline passed; `not_ready` is from the last completed tick
    Timeout {
        not_ready: Vec<NotReady>,
        elapsed: Duration,
    },
    /// The caller cancelled the wait
    Cancelled { not_ready: Vec<NotReady> },
    /// A fetch failed
    Error(KubeError),
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    /// Objects still not ready, for non-Ready outcomes
    pub fn not_ready(&self) -> &[NotReady] {
        match self {
            WaitOutcome::Timeout { not_ready, .. } | WaitOutcome::Cancelled { not_ready } => {
                not_ready
            }
            _ => &[],
        }
    }

    /// One-line description suitable for a status message
    pub fn summary(&self) -> String {
        match self {
            WaitOutcome::Ready { ticks, elapsed } => {
                format!("ready after {} poll(s) in {:?}", ticks, elapsed)
            }
            WaitOutcome::Timeout { not_ready, elapsed } => format!(
                "timed out after {:?}: {}",
                elapsed,
                describe(not_ready)
            ),
            WaitOutcome::Cancelled { not_ready } => {
                format!("cancelled: {}", describe(not_ready))
            }
            WaitOutcome::Error(e) => e.to_string(),
        }
    }

    /// Convert into a `Result`, mapping every non-Ready outcome to an error
    pub fn into_result(self) -> Result<()> {
        match self {
            WaitOutcome::Ready { .. } => Ok(()),
            WaitOutcome::Timeout { ref not_ready, .. } => {
                Err(KubeError::Timeout(describe(not_ready)))
            }
            WaitOutcome::Cancelled { ref not_ready } => {
                Err(KubeError::WaitCancelled(describe(not_ready)))
            }
            WaitOutcome::Error(e) => Err(e),
        }
    }
}

fn describe(not_ready: &[NotReady]) -> String {
    if not_ready.is_empty() {
        return "no resources evaluated yet".to_string();
    }
    let details = not_ready
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{} resource(s) not ready: {}", not_ready.len(), details)
}

/// Polls a cluster accessor until targets converge
pub struct WaitCoordinator<A> {
    accessor: A,
    config: WaitConfig,
}

impl<A: ClusterAccessor> WaitCoordinator<A> {
    /// Fails when the configuration would make the loop spin
    pub fn new(accessor: A, config: WaitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { accessor, config })
    }

    /// Wait for every target to be ready within the configured timeout
    ///
    /// Cancellation is honoured at every tick boundary, while sleeping and
    /// while fetches are outstanding.
    pub async fn wait_for_ready(
        &self,
        targets: &[ReadinessTarget],
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        let start = Instant::now();
        let deadline = start + self.config.timeout;
        let mut not_ready = Vec::new();
        let mut ticks = 0;

        loop {
            if cancel.is_cancelled() {
                return WaitOutcome::Cancelled { not_ready };
            }
            ticks += 1;

            // Give the final tick a full interval to answer
            let fetch_deadline = deadline.max(Instant::now() + self.config.interval);
            let evaluated = tokio::select! {
                biased;
                _ = cancel.cancelled() => return WaitOutcome::Cancelled { not_ready },
                result = self.evaluate(targets) => result,
                _ = tokio::time::sleep_until(fetch_deadline) => {
                    tracing::warn!("readiness fetch did not finish before the deadline");
                    return WaitOutcome::Timeout { not_ready, elapsed: start.elapsed() };
                }
            };

            not_ready = match evaluated {
                Ok(not_ready) => not_ready,
                Err(e) => return WaitOutcome::Error(e),
            };

            if not_ready.is_empty() {
                let elapsed = start.elapsed();
                tracing::debug!(ticks, ?elapsed, "all {} target(s) ready", targets.len());
                return WaitOutcome::Ready { ticks, elapsed };
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = start.elapsed();
                tracing::warn!(
                    ?elapsed,
                    "timed out with {} resource(s) not ready",
                    not_ready.len()
                );
                return WaitOutcome::Timeout { not_ready, elapsed };
            }

            let wake = (now + self.config.interval).min(deadline);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return WaitOutcome::Cancelled { not_ready },
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }

    /// Wait for the applied manifests that have a readiness predicate
    pub async fn wait_for_manifests(
        &self,
        manifests: &[GenericManifest],
        default_namespace: &str,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        let targets = targets_from_manifests(manifests, default_namespace);
        self.wait_for_ready(&targets, cancel).await
    }

    /// One tick: fetch every target concurrently and collect failures
    async fn evaluate(&self, targets: &[ReadinessTarget]) -> Result<Vec<NotReady>> {
        let per_target = try_join_all(targets.iter().map(|t| self.evaluate_target(t))).await?;
        Ok(per_target.into_iter().flatten().collect())
    }

    async fn evaluate_target(&self, target: &ReadinessTarget) -> Result<Vec<NotReady>> {
        let namespace = target.namespace.as_str();
        let selector = &target.selector;

        let not_ready = match target.kind {
            ResourceKind::Pod => {
                let pods = self.accessor.list_pods(namespace, selector).await?;
                collect(target, &pods, check_pod)
            }
            ResourceKind::Service => {
                let services = self.accessor.list_services(namespace, selector).await?;
                collect(target, &services, check_service)
            }
            ResourceKind::PersistentVolumeClaim => {
                let claims = self
                    .accessor
                    .list_persistent_volume_claims(namespace, selector)
                    .await?;
                collect(target, &claims, check_persistent_volume_claim)
            }
            ResourceKind::Deployment => {
                let deployments = self.accessor.list_deployments(namespace, selector).await?;
                let mut not_ready = missing(target, deployments.len());
                for deployment in &deployments {
                    if let Readiness::NotReady(reason) =
                        self.check_deployment_with_replica_set(namespace, deployment).await?
                    {
                        not_ready.push(not_ready_entry(target, deployment, reason));
                    }
                }
                not_ready
            }
        };

        for nr in &not_ready {
            tracing::debug!(
                kind = %nr.kind,
                namespace = %nr.namespace,
                name = %nr.name,
                reason = %nr.reason,
                "resource is not ready"
            );
        }
        Ok(not_ready)
    }

    async fn check_deployment_with_replica_set(
        &self,
        namespace: &str,
        deployment: &Deployment,
    ) -> Result<Readiness> {
        let labels = deployment
            .spec
            .as_ref()
            .and_then(|s| s.selector.match_labels.clone())
            .unwrap_or_default();
        let replica_sets = self
            .accessor
            .list_replica_sets(namespace, &ObjectSelector::Labels(labels))
            .await?;
        Ok(check_deployment(
            deployment,
            current_replica_set(deployment, &replica_sets),
        ))
    }
}

/// Apply a predicate to fetched objects, keeping the failures
fn collect<K: Resource>(
    target: &ReadinessTarget,
    objects: &[K],
    check: fn(&K) -> Readiness,
) -> Vec<NotReady> {
    let mut not_ready = missing(target, objects.len());
    for obj in objects {
        if let Readiness::NotReady(reason) = check(obj) {
            not_ready.push(not_ready_entry(target, obj, reason));
        }
    }
    not_ready
}

/// A by-name target that matched nothing has not been created yet
fn missing(target: &ReadinessTarget, found: usize) -> Vec<NotReady> {
    match &target.selector {
        ObjectSelector::Name(name) if found == 0 => vec![NotReady {
            kind: target.kind,
            namespace: target.namespace.clone(),
            name: name.clone(),
            reason: "not found".to_string(),
        }],
        _ => Vec::new(),
    }
}

fn not_ready_entry<K: Resource>(target: &ReadinessTarget, obj: &K, reason: String) -> NotReady {
    NotReady {
        kind: target.kind,
        namespace: obj.namespace().unwrap_or_else(|| target.namespace.clone()),
        name: obj.name_any(),
        reason,
    }
}
