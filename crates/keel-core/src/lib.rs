//! Keel Core - release manifest partitioning
//!
//! This crate turns the rendered output of a chart into a deployment plan:
//! - `partition`: split rendered files into hooks, kind-ordered manifests and notes
//! - `hooks`: lifecycle hook classification (events, weights, delete policies)
//! - `kind_order`: install/uninstall ordering by resource kind
//! - `manifest`: document splitting and the stored `# Source:` format
//! - `head`: tolerant parsing of a document's kind, apiVersion and metadata

pub mod error;
pub mod head;
pub mod hooks;
pub mod kind_order;
pub mod manifest;
pub mod notes;
pub mod partition;

pub use error::{CoreError, PartitionError, Result};
pub use head::{HeadMetadata, SimpleHead, VersionSet};
pub use hooks::{
    Classification, DeletePolicy, Hook, HookClassifier, HookConfig, HookEvent, sort_hooks_by_weight,
};
pub use kind_order::{KindOrder, SortOrder, sort_by_kind};
pub use manifest::{GenericManifest, ManifestEntry, flatten_files, flatten_manifests, split_manifests};
pub use notes::NotesCollection;
pub use partition::{ManifestPartitioner, Partition, SkipReason, SkippedDocument, partition};
