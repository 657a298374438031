//! Partitioning rendered templates into hooks, ordered manifests and notes
//!
//! Files are visited in lexicographic path order so the output is identical
//! across runs. Per file:
//! 1. `_`-prefixed partials are ignored
//! 2. blank files are skipped
//! 3. `NOTES.txt` files feed the [`NotesCollection`]
//! 4. everything else is split into documents and classified
//!
//! Generic manifests are then sorted by kind. Hooks are returned in
//! discovery order; see [`sort_hooks_by_weight`](crate::hooks::sort_hooks_by_weight).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, PartitionError};
use crate::head::{SimpleHead, VersionSet};
use crate::hooks::{Classification, Hook, HookClassifier, HookConfig};
use crate::kind_order::{KindOrder, SortOrder};
use crate::manifest::{GenericManifest, ManifestEntry, split_manifests, strip_source_comment};
use crate::notes::{self, NotesCollection};

/// Result of a partition call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub hooks: Vec<Hook>,
    /// Sorted by kind (discovery order when returned inside an error)
    pub manifests: Vec<GenericManifest>,
    pub notes: NotesCollection,
    /// Documents or tokens that were dropped, for reporting
    pub skipped: Vec<SkippedDocument>,
}

/// Something the partitioner dropped without failing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    /// The file rendered to nothing
    EmptyFile,
    /// A notes file whose path has no chart directory
    OrphanNotes,
    /// Hook annotation with an unresolvable event; the document was dropped
    UnknownHook { value: String },
    /// Unresolvable delete policy token; the hook was kept without it
    UnknownDeletePolicy { hook: String, value: String },
}

impl std::fmt::Display for SkippedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            SkipReason::EmptyFile => write!(f, "{}: empty, skipped", self.path),
            SkipReason::OrphanNotes => write!(f, "{}: notes outside a chart, skipped", self.path),
            SkipReason::UnknownHook { value } => {
                write!(f, "{}: unknown hook {:?}, document dropped", self.path, value)
            }
            SkipReason::UnknownDeletePolicy { hook, value } => write!(
                f,
                "{}: unknown delete policy {:?} on hook '{}', ignored",
                self.path, value, hook
            ),
        }
    }
}

/// Splits, classifies and orders rendered templates
#[derive(Debug, Clone, Copy)]
pub struct ManifestPartitioner<'a> {
    hooks: &'a HookConfig,
    kinds: &'a KindOrder,
}

impl<'a> ManifestPartitioner<'a> {
    pub fn new(hooks: &'a HookConfig, kinds: &'a KindOrder) -> Self {
        Self { hooks, kinds }
    }

    /// Partition a rendered file map
    ///
    /// Fails on the first document that is not valid YAML, returning what
    /// was accumulated up to that point inside the error.
    pub fn partition(
        &self,
        files: &BTreeMap<String, String>,
        apis: &VersionSet,
        order: SortOrder,
    ) -> std::result::Result<Partition, PartitionError> {
        let mut result = Partition::default();

        for (path, content) in files {
            if is_partial(path) {
                continue;
            }

            if content.trim().is_empty() {
                tracing::info!("manifest {:?} is empty. Skipping.", path);
                result.skip(path, SkipReason::EmptyFile);
                continue;
            }

            if notes::is_notes_file(path) {
                match notes::chart_name(path) {
                    Some(chart) => {
                        result.notes.insert(chart, content.as_str());
                    }
                    None => {
                        tracing::warn!("notes file {:?} is not inside a chart. Skipping.", path);
                        result.skip(path, SkipReason::OrphanNotes);
                    }
                }
                continue;
            }

            if let Err(error) = self.sort_file(path, content, apis, &mut result) {
                return Err(PartitionError {
                    error,
                    partial: Box::new(result),
                });
            }
        }

        result.manifests = self.kinds.sort(std::mem::take(&mut result.manifests), order);
        Ok(result)
    }

    fn sort_file(
        &self,
        path: &str,
        content: &str,
        apis: &VersionSet,
        result: &mut Partition,
    ) -> crate::error::Result<()> {
        let classifier = HookClassifier::new(self.hooks);

        for doc in split_manifests(content) {
            let (_, body) = strip_source_comment(&doc);
            let head = SimpleHead::parse(body).map_err(|e| CoreError::Parse {
                path: path.to_string(),
                message: e.to_string(),
            })?;

            let api_version = head.api_version();
            if !apis.is_empty() && !api_version.is_empty() && !apis.has(api_version) {
                tracing::debug!(
                    path,
                    kind = head.kind(),
                    "apiVersion {} is not served by the cluster",
                    api_version
                );
            }

            let entry = ManifestEntry {
                path: path.to_string(),
                content: body.to_string(),
                head,
            };

            match classifier.classify(entry) {
                Classification::Generic(manifest) => result.manifests.push(manifest),
                Classification::Hook {
                    hook,
                    unknown_delete_policies,
                } => {
                    for value in unknown_delete_policies {
                        result.skip(
                            path,
                            SkipReason::UnknownDeletePolicy {
                                hook: hook.name.clone(),
                                value,
                            },
                        );
                    }
                    result.hooks.push(hook);
                }
                Classification::Dropped { hook_value, .. } => {
                    result.skip(path, SkipReason::UnknownHook { value: hook_value });
                }
            }
        }

        Ok(())
    }
}

impl Partition {
    fn skip(&mut self, path: &str, reason: SkipReason) {
        self.skipped.push(SkippedDocument {
            path: path.to_string(),
            reason,
        });
    }
}

/// Partition with the default hook annotations and kind table
pub fn partition(
    files: &BTreeMap<String, String>,
    apis: &VersionSet,
    order: SortOrder,
) -> std::result::Result<Partition, PartitionError> {
    let hooks = HookConfig::default();
    let kinds = KindOrder::default();
    ManifestPartitioner::new(&hooks, &kinds).partition(files, apis, order)
}

/// Template partials (`_helpers.tpl` and friends) are never rendered out
fn is_partial(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|base| base.starts_with('_'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{DeletePolicy, HookEvent};

    fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn run(entries: &[(&str, &str)]) -> Partition {
        partition(&files(entries), &VersionSet::default(), SortOrder::InstallOrder).unwrap()
    }

    const CONFIG_MAP: &str = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n";
    const DEPLOYMENT: &str = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n";

    #[test]
    fn test_partials_never_emitted() {
        let p = run(&[
            ("app/templates/_helpers.tpl", "kind: ConfigMap\nmetadata:\n  name: x\n"),
            ("app/templates/_NOTES.txt", "hello"),
            ("app/templates/cm.yaml", CONFIG_MAP),
        ]);
        assert_eq!(p.manifests.len(), 1);
        assert_eq!(p.manifests[0].name, "app/templates/cm.yaml");
        assert!(p.notes.is_empty());
        assert!(p.skipped.is_empty());
    }

    #[test]
    fn test_partial_with_invalid_yaml_is_not_parsed() {
        let p = run(&[("app/templates/_broken.tpl", "{{ not: [yaml")]);
        assert!(p.manifests.is_empty());
    }

    #[test]
    fn test_empty_file_skipped() {
        let p = run(&[("app/templates/empty.yaml", "  \n\n")]);
        assert!(p.manifests.is_empty());
        assert_eq!(
            p.skipped,
            vec![SkippedDocument {
                path: "app/templates/empty.yaml".to_string(),
                reason: SkipReason::EmptyFile,
            }]
        );
    }

    #[test]
    fn test_notes_per_chart() {
        let p = run(&[
            ("parent/templates/NOTES.txt", "parent notes"),
            ("parent/charts/child/templates/NOTES.txt", "child notes"),
            ("parent/templates/cm.yaml", CONFIG_MAP),
        ]);
        assert_eq!(p.notes.len(), 2);
        assert_eq!(p.notes.get("parent"), Some("parent notes"));
        assert_eq!(p.notes.get("child"), Some("child notes"));
        assert_eq!(p.manifests.len(), 1);
        assert!(p.hooks.is_empty());
    }

    #[test]
    fn test_notes_duplicate_chart_last_path_wins() {
        let p = run(&[
            ("a/charts/db/templates/NOTES.txt", "from a"),
            ("b/charts/db/templates/NOTES.txt", "from b"),
        ]);
        assert_eq!(p.notes.get("db"), Some("from b"));
    }

    #[test]
    fn test_orphan_notes_not_a_manifest() {
        let p = run(&[("templates/NOTES.txt", "hi")]);
        assert!(p.notes.is_empty());
        assert!(p.manifests.is_empty());
        assert_eq!(p.skipped[0].reason, SkipReason::OrphanNotes);
    }

    #[test]
    fn test_generic_manifests_sorted_by_kind() {
        let p = run(&[
            ("app/templates/a-deploy.yaml", DEPLOYMENT),
            ("app/templates/b-cm.yaml", CONFIG_MAP),
        ]);
        let kinds: Vec<_> = p.manifests.iter().map(|m| m.head.kind()).collect();
        assert_eq!(kinds, vec!["ConfigMap", "Deployment"]);

        let p = partition(
            &files(&[
                ("app/templates/a-deploy.yaml", DEPLOYMENT),
                ("app/templates/b-cm.yaml", CONFIG_MAP),
            ]),
            &VersionSet::default(),
            SortOrder::UninstallOrder,
        )
        .unwrap();
        let kinds: Vec<_> = p.manifests.iter().map(|m| m.head.kind()).collect();
        assert_eq!(kinds, vec!["Deployment", "ConfigMap"]);
    }

    #[test]
    fn test_multi_document_file() {
        let text = format!("{}---\n{}---\n# only a comment\n", DEPLOYMENT, CONFIG_MAP);
        let p = run(&[("app/templates/all.yaml", &text)]);
        assert_eq!(p.manifests.len(), 3);
        assert_eq!(p.manifests[0].head.kind(), "ConfigMap");
        assert_eq!(p.manifests[1].head.kind(), "Deployment");
        assert!(p.manifests.iter().all(|m| m.name == "app/templates/all.yaml"));
    }

    #[test]
    fn test_hooks_and_generics_split() {
        let hook = "apiVersion: batch/v1\nkind: Job\nmetadata:\n  name: migrate\n  annotations:\n    helm.sh/hook: pre-install,pre-upgrade\n    helm.sh/hook-weight: \"-5\"\n    helm.sh/hook-delete-policy: hook-succeeded,bogus\n";
        let annotated = "apiVersion: v1\nkind: Secret\nmetadata:\n  name: s\n  annotations:\n    owner: me\n";
        let p = run(&[
            ("app/templates/job.yaml", hook),
            ("app/templates/secret.yaml", annotated),
        ]);

        assert_eq!(p.hooks.len(), 1);
        let h = &p.hooks[0];
        assert_eq!(h.name, "migrate");
        assert_eq!(h.events, vec![HookEvent::PreInstall, HookEvent::PreUpgrade]);
        assert_eq!(h.weight, -5);
        assert_eq!(h.delete_policies, vec![DeletePolicy::HookSucceeded]);

        assert_eq!(p.manifests.len(), 1);
        assert_eq!(p.manifests[0].head.kind(), "Secret");

        assert_eq!(
            p.skipped,
            vec![SkippedDocument {
                path: "app/templates/job.yaml".to_string(),
                reason: SkipReason::UnknownDeletePolicy {
                    hook: "migrate".to_string(),
                    value: "bogus".to_string(),
                },
            }]
        );
    }

    #[test]
    fn test_unknown_hook_dropped_everywhere() {
        let doc = "kind: Job\nmetadata:\n  name: j\n  annotations:\n    helm.sh/hook: pre-install,bogus\n";
        let p = run(&[("app/templates/job.yaml", doc)]);
        assert!(p.hooks.is_empty());
        assert!(p.manifests.is_empty());
        assert_eq!(p.skipped.len(), 1);
        assert_eq!(
            p.skipped[0].reason,
            SkipReason::UnknownHook {
                value: "pre-install,bogus".to_string()
            }
        );
    }

    #[test]
    fn test_parse_error_returns_partial() {
        let err = partition(
            &files(&[
                ("app/templates/a.yaml", CONFIG_MAP),
                ("app/templates/b.yaml", "kind: [broken"),
                ("app/templates/c.yaml", DEPLOYMENT),
                ("app/templates/NOTES.txt", "notes"),
            ]),
            &VersionSet::default(),
            SortOrder::InstallOrder,
        )
        .unwrap_err();

        assert!(err.to_string().contains("app/templates/b.yaml"));
        let (error, partial) = err.into_parts();
        assert!(matches!(error, CoreError::Parse { .. }));
        // NOTES.txt sorts before a.yaml, c.yaml after the failure
        assert_eq!(partial.notes.get("app"), Some("notes"));
        assert_eq!(partial.manifests.len(), 1);
        assert_eq!(partial.manifests[0].name, "app/templates/a.yaml");
    }

    #[test]
    fn test_source_comment_stripped() {
        let p = run(&[(
            "stored",
            "# Source: app/templates/cm.yaml\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg",
        )]);
        assert_eq!(p.manifests[0].content, CONFIG_MAP.trim_end());
        assert_eq!(p.manifests[0].head.name(), "cfg");
    }

    #[test]
    fn test_unserved_api_version_still_partitioned() {
        let apis = VersionSet::new(["v1"]);
        let p = partition(
            &files(&[("app/templates/d.yaml", DEPLOYMENT)]),
            &apis,
            SortOrder::InstallOrder,
        )
        .unwrap();
        assert_eq!(p.manifests.len(), 1);
    }

    #[test]
    fn test_custom_partitioner() {
        let hooks = HookConfig::default().with_keys("x/hook", "x/weight", "x/delete");
        let kinds = KindOrder::from_kinds(["Deployment", "ConfigMap"]);
        let partitioner = ManifestPartitioner::new(&hooks, &kinds);
        let p = partitioner
            .partition(
                &files(&[("app/templates/a.yaml", CONFIG_MAP), ("app/templates/b.yaml", DEPLOYMENT)]),
                &VersionSet::default(),
                SortOrder::InstallOrder,
            )
            .unwrap();
        let kinds: Vec<_> = p.manifests.iter().map(|m| m.head.kind()).collect();
        assert_eq!(kinds, vec!["Deployment", "ConfigMap"]);
    }

    #[test]
    fn test_unquoted_annotation_scalars_do_not_fail() {
        let p = run(&[
            (
                "app/templates/job.yaml",
                "apiVersion: batch/v1\nkind: Job\nmetadata:\n  name: migrate\n  annotations:\n    helm.sh/hook: pre-install\n    helm.sh/hook-weight: -5\n    helm.sh/hook-delete-policy:\n",
            ),
            (
                "app/templates/cm.yaml",
                "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: 123\n",
            ),
        ]);

        assert_eq!(p.hooks.len(), 1);
        assert_eq!(p.hooks[0].weight, -5);
        assert!(p.hooks[0].delete_policies.is_empty());
        assert_eq!(p.manifests.len(), 1);
        assert_eq!(p.manifests[0].head.name(), "123");
        assert_eq!(
            p.skipped,
            vec![SkippedDocument {
                path: "app/templates/job.yaml".to_string(),
                reason: SkipReason::UnknownDeletePolicy {
                    hook: "migrate".to_string(),
                    value: String::new(),
                },
            }]
        );
    }

    #[test]
    fn test_skipped_display() {
        let skipped = SkippedDocument {
            path: "app/templates/job.yaml".to_string(),
            reason: SkipReason::UnknownHook {
                value: "bogus".to_string(),
            },
        };
        insta::assert_snapshot!(skipped.to_string(), @r#"app/templates/job.yaml: unknown hook "bogus", document dropped"#);

        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["reason"], "unknown-hook");
        assert_eq!(json["value"], "bogus");
    }
}
