//! What to wait for: kind + namespace + selector

use std::collections::BTreeMap;
use std::str::FromStr;

use keel_core::GenericManifest;
use kube::api::ListParams;
use serde::{Deserialize, Serialize};

use crate::error::KubeError;

/// Kinds with a readiness predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Pod,
    Service,
    PersistentVolumeClaim,
    Deployment,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Service => "Service",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::Deployment => "Deployment",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = KubeError;

    /// Accepts the kind name or the usual kubectl short names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pod" | "pods" | "po" => Ok(ResourceKind::Pod),
            "service" | "services" | "svc" => Ok(ResourceKind::Service),
            "persistentvolumeclaim" | "persistentvolumeclaims" | "pvc" => {
                Ok(ResourceKind::PersistentVolumeClaim)
            }
            "deployment" | "deployments" | "deploy" => Ok(ResourceKind::Deployment),
            _ => Err(KubeError::InvalidConfig(format!(
                "no readiness check for kind '{}'",
                s
            ))),
        }
    }
}

/// How to find the objects of a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectSelector {
    /// Every object carrying all of these labels (an empty set matches everything)
    Labels(BTreeMap<String, String>),
    /// Exactly one object by name
    Name(String),
}

impl ObjectSelector {
    /// Parse `key=value,key2=value2`
    pub fn parse_labels(s: &str) -> crate::Result<Self> {
        let mut labels = BTreeMap::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                KubeError::InvalidConfig(format!("invalid label selector '{}': expected key=value", pair))
            })?;
            labels.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(ObjectSelector::Labels(labels))
    }

    pub fn list_params(&self) -> ListParams {
        match self {
            ObjectSelector::Labels(labels) if labels.is_empty() => ListParams::default(),
            ObjectSelector::Labels(labels) => ListParams::default().labels(&label_string(labels)),
            ObjectSelector::Name(name) => {
                ListParams::default().fields(&format!("metadata.name={}", name))
            }
        }
    }

    /// Whether an object with these labels and name is selected
    pub fn matches(&self, name: &str, labels: Option<&BTreeMap<String, String>>) -> bool {
        match self {
            ObjectSelector::Name(wanted) => wanted == name,
            ObjectSelector::Labels(wanted) => wanted
                .iter()
                .all(|(k, v)| labels.and_then(|l| l.get(k)) == Some(v)),
        }
    }
}

impl std::fmt::Display for ObjectSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectSelector::Labels(labels) => write!(f, "{}", label_string(labels)),
            ObjectSelector::Name(name) => write!(f, "name={}", name),
        }
    }
}

fn label_string(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// A set of live objects to evaluate with one kind's predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessTarget {
    pub kind: ResourceKind,
    pub namespace: String,
    pub selector: ObjectSelector,
}

impl ReadinessTarget {
    pub fn named(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            selector: ObjectSelector::Name(name.into()),
        }
    }

    pub fn labelled<I, K, V>(kind: ResourceKind, namespace: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            kind,
            namespace: namespace.into(),
            selector: ObjectSelector::Labels(
                labels.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            ),
        }
    }
}

impl std::fmt::Display for ReadinessTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.selector)
    }
}

/// Readiness targets for the applied manifests that have a predicate
///
/// Each manifest becomes a by-name target in its own namespace, or in
/// `default_namespace` when it declares none. Other kinds are skipped.
pub fn targets_from_manifests(
    manifests: &[GenericManifest],
    default_namespace: &str,
) -> Vec<ReadinessTarget> {
    manifests
        .iter()
        .filter_map(|m| {
            let kind = m.head.kind().parse::<ResourceKind>().ok()?;
            let name = m.head.name();
            if name.is_empty() {
                tracing::debug!(source = %m.name, "skipping unnamed {} for readiness", kind);
                return None;
            }
            let namespace = m.head.namespace().unwrap_or(default_namespace);
            Some(ReadinessTarget::named(kind, namespace, name))
        })
        .collect()
}
