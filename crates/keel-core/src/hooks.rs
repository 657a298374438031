//! Lifecycle hook classification
//!
//! A document becomes a hook when its `helm.sh/hook` annotation (or whatever
//! key the [`HookConfig`] names) lists one or more known lifecycle events.
//!
//! Resolution is deliberately asymmetric:
//! - Events are all-or-nothing. One unknown event drops the whole document;
//!   it becomes neither a hook nor a generic manifest.
//! - Delete policies are resolved per token. Unknown tokens are dropped and
//!   the hook survives with whatever resolved.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::manifest::{GenericManifest, ManifestEntry};

/// Annotation naming the comma-separated hook events
pub const HOOK_ANNOTATION: &str = "helm.sh/hook";
/// Annotation carrying the integer hook weight
pub const HOOK_WEIGHT_ANNOTATION: &str = "helm.sh/hook-weight";
/// Annotation naming the comma-separated delete policies
pub const HOOK_DELETE_POLICY_ANNOTATION: &str = "helm.sh/hook-delete-policy";

/// Lifecycle event a hook is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookEvent {
    PreInstall,
    PostInstall,
    PreDelete,
    PostDelete,
    PreUpgrade,
    PostUpgrade,
    PreRollback,
    PostRollback,
    TestSuccess,
    TestFailure,
    CrdInstall,
}

static HOOK_EVENTS: phf::Map<&'static str, HookEvent> = phf::phf_map! {
    "pre-install" => HookEvent::PreInstall,
    "post-install" => HookEvent::PostInstall,
    "pre-delete" => HookEvent::PreDelete,
    "post-delete" => HookEvent::PostDelete,
    "pre-upgrade" => HookEvent::PreUpgrade,
    "post-upgrade" => HookEvent::PostUpgrade,
    "pre-rollback" => HookEvent::PreRollback,
    "post-rollback" => HookEvent::PostRollback,
    "test-success" => HookEvent::TestSuccess,
    "test-failure" => HookEvent::TestFailure,
    "crd-install" => HookEvent::CrdInstall,
};

impl HookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookEvent::PreInstall => "pre-install",
            HookEvent::PostInstall => "post-install",
            HookEvent::PreDelete => "pre-delete",
            HookEvent::PostDelete => "post-delete",
            HookEvent::PreUpgrade => "pre-upgrade",
            HookEvent::PostUpgrade => "post-upgrade",
            HookEvent::PreRollback => "pre-rollback",
            HookEvent::PostRollback => "post-rollback",
            HookEvent::TestSuccess => "test-success",
            HookEvent::TestFailure => "test-failure",
            HookEvent::CrdInstall => "crd-install",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HookEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HOOK_EVENTS
            .get(s)
            .copied()
            .ok_or_else(|| CoreError::UnknownValue {
                what: "hook event",
                value: s.to_string(),
            })
    }
}

/// When a hook's resource should be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    HookSucceeded,
    HookFailed,
    BeforeHookCreation,
}

static DELETE_POLICIES: phf::Map<&'static str, DeletePolicy> = phf::phf_map! {
    "hook-succeeded" => DeletePolicy::HookSucceeded,
    "hook-failed" => DeletePolicy::HookFailed,
    "before-hook-creation" => DeletePolicy::BeforeHookCreation,
};

impl DeletePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletePolicy::HookSucceeded => "hook-succeeded",
            DeletePolicy::HookFailed => "hook-failed",
            DeletePolicy::BeforeHookCreation => "before-hook-creation",
        }
    }
}

impl std::fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeletePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DELETE_POLICIES
            .get(s)
            .copied()
            .ok_or_else(|| CoreError::UnknownValue {
                what: "delete policy",
                value: s.to_string(),
            })
    }
}

/// Annotation keys and lookup tables used to recognize hooks
///
/// Built once and shared read-only between partition calls.
#[derive(Debug, Clone)]
pub struct HookConfig {
    pub hook_key: String,
    pub weight_key: String,
    pub delete_policy_key: String,
    events: HashMap<String, HookEvent>,
    delete_policies: HashMap<String, DeletePolicy>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            hook_key: HOOK_ANNOTATION.to_string(),
            weight_key: HOOK_WEIGHT_ANNOTATION.to_string(),
            delete_policy_key: HOOK_DELETE_POLICY_ANNOTATION.to_string(),
            events: HOOK_EVENTS
                .entries()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            delete_policies: DELETE_POLICIES
                .entries()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

impl HookConfig {
    /// Use different annotation keys (e.g. a vendor prefix)
    pub fn with_keys(
        mut self,
        hook_key: impl Into<String>,
        weight_key: impl Into<String>,
        delete_policy_key: impl Into<String>,
    ) -> Self {
        self.hook_key = hook_key.into();
        self.weight_key = weight_key.into();
        self.delete_policy_key = delete_policy_key.into();
        self
    }

    /// Accept an additional spelling for an event
    pub fn with_event_alias(mut self, name: impl Into<String>, event: HookEvent) -> Self {
        self.events.insert(name.into().to_lowercase(), event);
        self
    }

    /// Accept an additional spelling for a delete policy
    pub fn with_delete_policy_alias(mut self, name: impl Into<String>, policy: DeletePolicy) -> Self {
        self.delete_policies.insert(name.into().to_lowercase(), policy);
        self
    }

    pub fn event(&self, name: &str) -> Option<HookEvent> {
        self.events.get(name).copied()
    }

    pub fn delete_policy(&self, name: &str) -> Option<DeletePolicy> {
        self.delete_policies.get(name).copied()
    }
}

/// A resource applied at a lifecycle point rather than during normal rollout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    /// Kubernetes object name
    pub name: String,
    pub kind: String,
    /// File the hook was rendered from
    pub path: String,
    pub manifest: String,
    /// Events in annotation order, duplicates kept
    pub events: Vec<HookEvent>,
    /// Lower runs first
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub delete_policies: Vec<DeletePolicy>,
}

impl Hook {
    pub fn runs_on(&self, event: HookEvent) -> bool {
        self.events.contains(&event)
    }

    pub fn has_delete_policy(&self, policy: DeletePolicy) -> bool {
        self.delete_policies.contains(&policy)
    }
}

/// Order hooks for execution: weight ascending, discovery order on ties
pub fn sort_hooks_by_weight(hooks: &mut [Hook]) {
    hooks.sort_by_key(|h| h.weight);
}

/// Outcome of classifying one document
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Hook {
        hook: Hook,
        /// Delete policy tokens that did not resolve
        unknown_delete_policies: Vec<String>,
    },
    Generic(GenericManifest),
    /// Hook annotation present but at least one event unknown
    Dropped { entry: ManifestEntry, hook_value: String },
}

/// Decides hook vs. generic for parsed documents
#[derive(Debug, Clone, Copy)]
pub struct HookClassifier<'a> {
    config: &'a HookConfig,
}

impl<'a> HookClassifier<'a> {
    pub fn new(config: &'a HookConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, entry: ManifestEntry) -> Classification {
        let Some(hook_value) = entry.head.annotation(&self.config.hook_key) else {
            return Classification::Generic(entry.into());
        };
        let hook_value = hook_value.to_string();

        let requested: Vec<String> = tokens(&hook_value).collect();
        let mut events = Vec::with_capacity(requested.len());
        for token in &requested {
            match self.config.event(token) {
                Some(event) => events.push(event),
                None => {
                    tracing::warn!(
                        path = %entry.path,
                        "skipping unknown hook: {:?}",
                        hook_value
                    );
                    return Classification::Dropped { entry, hook_value };
                }
            }
        }

        let mut delete_policies = Vec::new();
        let mut unknown_delete_policies = Vec::new();
        if let Some(value) = entry.head.annotation(&self.config.delete_policy_key) {
            for token in tokens(value) {
                match self.config.delete_policy(&token) {
                    Some(policy) => delete_policies.push(policy),
                    None => {
                        tracing::warn!(
                            path = %entry.path,
                            "skipping unknown hook delete policy: {:?}",
                            token
                        );
                        unknown_delete_policies.push(token);
                    }
                }
            }
        }

        let weight = self.weight(&entry);
        let hook = Hook {
            name: entry.head.name().to_string(),
            kind: entry.head.kind().to_string(),
            path: entry.path,
            manifest: entry.content,
            events,
            weight,
            delete_policies,
        };

        Classification::Hook {
            hook,
            unknown_delete_policies,
        }
    }

    /// Parsed as a 64-bit integer and truncated to 32 bits, so
    /// `"4294967291"` is -5; anything unparsable is 0
    fn weight(&self, entry: &ManifestEntry) -> i32 {
        entry
            .head
            .annotation(&self.config.weight_key)
            .and_then(|w| w.parse::<i64>().ok())
            .map_or(0, |w| w as i32)
    }
}

/// Split, trim and lowercase a comma-separated annotation value
fn tokens(value: &str) -> impl Iterator<Item = String> + '_ {
    value.split(',').map(|t| t.trim().to_lowercase())
}
