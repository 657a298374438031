//! Kind-based ordering of generic manifests
//!
//! Install order creates the things others depend on first (namespaces,
//! quotas, secrets, RBAC) and workloads last. Uninstall order is the exact
//! reverse of the install comparison.
//!
//! Kinds missing from the table share one default priority equal to the
//! table length: after every known kind on install, before every known kind
//! on uninstall. Equal priorities keep discovery order in both directions.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::manifest::GenericManifest;

/// Direction of the kind-priority comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    InstallOrder,
    UninstallOrder,
}

/// Default install order, lowest priority first
pub const INSTALL_ORDER: &[&str] = &[
    "Namespace",
    "ResourceQuota",
    "LimitRange",
    "PodSecurityPolicy",
    "PodDisruptionBudget",
    "Secret",
    "ConfigMap",
    "StorageClass",
    "PersistentVolume",
    "PersistentVolumeClaim",
    "ServiceAccount",
    "CustomResourceDefinition",
    "ClusterRole",
    "ClusterRoleList",
    "ClusterRoleBinding",
    "ClusterRoleBindingList",
    "Role",
    "RoleList",
    "RoleBinding",
    "RoleBindingList",
    "Service",
    "DaemonSet",
    "Pod",
    "ReplicationController",
    "ReplicaSet",
    "Deployment",
    "HorizontalPodAutoscaler",
    "StatefulSet",
    "Job",
    "CronJob",
    "Ingress",
    "APIService",
];

/// Kind → priority table
#[derive(Debug, Clone)]
pub struct KindOrder {
    priorities: HashMap<String, usize>,
}

impl Default for KindOrder {
    fn default() -> Self {
        Self::from_kinds(INSTALL_ORDER.iter().copied())
    }
}

impl KindOrder {
    /// Build a table from kinds listed in install order
    ///
    /// A kind listed twice keeps its first position.
    pub fn from_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut priorities = HashMap::new();
        for kind in kinds {
            let next = priorities.len();
            priorities.entry(kind.into()).or_insert(next);
        }
        Self { priorities }
    }

    /// Priority of a kind; unknown kinds get [`KindOrder::unknown_priority`]
    pub fn priority(&self, kind: &str) -> usize {
        self.priorities
            .get(kind)
            .copied()
            .unwrap_or_else(|| self.unknown_priority())
    }

    pub fn unknown_priority(&self) -> usize {
        self.priorities.len()
    }

    pub fn is_known(&self, kind: &str) -> bool {
        self.priorities.contains_key(kind)
    }

    /// Stable sort of manifests by kind priority in the given direction
    pub fn sort(&self, mut manifests: Vec<GenericManifest>, order: SortOrder) -> Vec<GenericManifest> {
        match order {
            SortOrder::InstallOrder => {
                manifests.sort_by_key(|m| self.priority(m.head.kind()));
            }
            SortOrder::UninstallOrder => {
                manifests.sort_by_key(|m| std::cmp::Reverse(self.priority(m.head.kind())));
            }
        }
        manifests
    }
}

/// Sort with the default table
pub fn sort_by_kind(manifests: Vec<GenericManifest>, order: SortOrder) -> Vec<GenericManifest> {
    KindOrder::default().sort(manifests, order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head::SimpleHead;

    fn manifest(name: &str, kind: &str) -> GenericManifest {
        GenericManifest {
            name: name.to_string(),
            content: format!("kind: {}", kind),
            head: SimpleHead {
                kind: Some(kind.to_string()),
                ..Default::default()
            },
        }
    }

    fn names(manifests: &[GenericManifest]) -> Vec<&str> {
        manifests.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_install_order() {
        let manifests = vec![
            manifest("deploy", "Deployment"),
            manifest("svc", "Service"),
            manifest("ns", "Namespace"),
            manifest("cm", "ConfigMap"),
        ];
        let sorted = sort_by_kind(manifests, SortOrder::InstallOrder);
        assert_eq!(names(&sorted), vec!["ns", "cm", "svc", "deploy"]);
    }

    #[test]
    fn test_uninstall_order_reverses() {
        let manifests = vec![
            manifest("ns", "Namespace"),
            manifest("deploy", "Deployment"),
            manifest("cm", "ConfigMap"),
            manifest("svc", "Service"),
        ];
        let sorted = sort_by_kind(manifests, SortOrder::UninstallOrder);
        assert_eq!(names(&sorted), vec!["deploy", "svc", "cm", "ns"]);
    }

    #[test]
    fn test_pair_order_independent_of_input_order() {
        for input in [
            vec![manifest("a", "Secret"), manifest("b", "Job")],
            vec![manifest("b", "Job"), manifest("a", "Secret")],
        ] {
            let install = sort_by_kind(input.clone(), SortOrder::InstallOrder);
            assert_eq!(names(&install), vec!["a", "b"]);
            let uninstall = sort_by_kind(input, SortOrder::UninstallOrder);
            assert_eq!(names(&uninstall), vec!["b", "a"]);
        }
    }

    #[test]
    fn test_unknown_kinds_last_on_install() {
        let manifests = vec![
            manifest("widget", "Widget"),
            manifest("ns", "Namespace"),
            manifest("gadget", "Gadget"),
            manifest("api", "APIService"),
        ];
        let sorted = sort_by_kind(manifests, SortOrder::InstallOrder);
        assert_eq!(names(&sorted), vec!["ns", "api", "widget", "gadget"]);
    }

    #[test]
    fn test_unknown_kinds_first_on_uninstall() {
        let manifests = vec![
            manifest("ns", "Namespace"),
            manifest("widget", "Widget"),
            manifest("api", "APIService"),
            manifest("gadget", "Gadget"),
        ];
        let sorted = sort_by_kind(manifests, SortOrder::UninstallOrder);
        assert_eq!(names(&sorted), vec!["widget", "gadget", "api", "ns"]);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let manifests = vec![
            manifest("cm-2", "ConfigMap"),
            manifest("cm-1", "ConfigMap"),
            manifest("cm-3", "ConfigMap"),
        ];
        let install = sort_by_kind(manifests.clone(), SortOrder::InstallOrder);
        assert_eq!(names(&install), vec!["cm-2", "cm-1", "cm-3"]);
        let uninstall = sort_by_kind(manifests, SortOrder::UninstallOrder);
        assert_eq!(names(&uninstall), vec!["cm-2", "cm-1", "cm-3"]);
    }

    #[test]
    fn test_missing_kind_uses_unknown_priority() {
        let order = KindOrder::default();
        assert_eq!(order.priority(""), order.unknown_priority());
        assert_eq!(order.unknown_priority(), INSTALL_ORDER.len());
    }

    #[test]
    fn test_custom_table() {
        let order = KindOrder::from_kinds(["Job", "ConfigMap", "Job"]);
        assert_eq!(order.priority("Job"), 0);
        assert_eq!(order.priority("ConfigMap"), 1);
        assert_eq!(order.unknown_priority(), 2);
        assert!(order.is_known("Job"));
        assert!(!order.is_known("Namespace"));

        let sorted = order.sort(
            vec![manifest("cm", "ConfigMap"), manifest("job", "Job")],
            SortOrder::InstallOrder,
        );
        assert_eq!(names(&sorted), vec!["job", "cm"]);
    }
}
