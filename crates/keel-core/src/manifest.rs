//! Splitting rendered files into documents and flattening them back
//!
//! The flattened form is what gets stored as a release's manifest:
//!
//! ```text
//!
//! ---
//! # Source: mychart/templates/service.yaml
//! apiVersion: v1
//! kind: Service
//! ...
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::head::SimpleHead;

/// Prefix of the comment line naming a document's source template
pub const SOURCE_COMMENT_PREFIX: &str = "# Source: ";

static DOCUMENT_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s*\n)---\s*").expect("valid regex"));

/// One YAML document extracted from one rendered file
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Path of the file the document came from
    pub path: String,
    /// Raw document text
    pub content: String,
    pub head: SimpleHead,
}

/// A deployable resource that is not bound to a lifecycle hook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericManifest {
    /// Owning file path (not necessarily the object name)
    pub name: String,
    pub content: String,
    pub head: SimpleHead,
}

impl From<ManifestEntry> for GenericManifest {
    fn from(entry: ManifestEntry) -> Self {
        Self {
            name: entry.path,
            content: entry.content,
            head: entry.head,
        }
    }
}

/// Split a multi-document YAML stream into trimmed, non-empty documents
pub fn split_manifests(text: &str) -> Vec<String> {
    DOCUMENT_SEPARATOR
        .split(text.trim())
        .map(str::trim)
        .filter(|doc| !doc.is_empty())
        .map(String::from)
        .collect()
}

/// Separate a leading `# Source: <path>` line from a document body
pub fn strip_source_comment(doc: &str) -> (Option<&str>, &str) {
    let Some(rest) = doc.strip_prefix(SOURCE_COMMENT_PREFIX) else {
        return (None, doc);
    };
    match rest.split_once('\n') {
        Some((source, body)) => (Some(source.trim()), body.trim_start()),
        None => (Some(rest.trim()), ""),
    }
}

/// Concatenate manifests into the stored `# Source:` stream
pub fn flatten_manifests(manifests: &[GenericManifest]) -> String {
    let mut out = String::new();
    for manifest in manifests {
        push_document(&mut out, &manifest.name, &manifest.content);
    }
    out
}

/// Concatenate a rendered file map into the stored `# Source:` stream
///
/// Files whose content is blank are left out.
pub fn flatten_files(files: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (name, content) in files {
        if content.trim().is_empty() {
            continue;
        }
        push_document(&mut out, name, content);
    }
    out
}

fn push_document(out: &mut String, name: &str, content: &str) {
    out.push_str("\n---\n");
    out.push_str(SOURCE_COMMENT_PREFIX);
    out.push_str(name);
    out.push('\n');
    out.push_str(content);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_single_document() {
        let docs = split_manifests("kind: ConfigMap\nmetadata:\n  name: a\n");
        assert_eq!(docs, vec!["kind: ConfigMap\nmetadata:\n  name: a"]);
    }

    #[test]
    fn test_split_multiple_documents() {
        let text = "---\nkind: A\n---\nkind: B\n\n---   \nkind: C\n";
        assert_eq!(split_manifests(text), vec!["kind: A", "kind: B", "kind: C"]);
    }

    #[test]
    fn test_split_drops_empty_documents() {
        assert!(split_manifests("---\n---\n   \n---\n").is_empty());
        assert!(split_manifests("").is_empty());
    }

    #[test]
    fn test_split_keeps_document_order() {
        let docs = split_manifests("kind: Z\n---\nkind: A\n---\nkind: M");
        assert_eq!(docs, vec!["kind: Z", "kind: A", "kind: M"]);
    }

    #[test]
    fn test_strip_source_comment() {
        let (source, body) = strip_source_comment("# Source: app/templates/cm.yaml\nkind: ConfigMap");
        assert_eq!(source, Some("app/templates/cm.yaml"));
        assert_eq!(body, "kind: ConfigMap");

        let (source, body) = strip_source_comment("kind: ConfigMap");
        assert_eq!(source, None);
        assert_eq!(body, "kind: ConfigMap");
    }

    #[test]
    fn test_strip_source_comment_without_body() {
        let (source, body) = strip_source_comment("# Source: a.yaml");
        assert_eq!(source, Some("a.yaml"));
        assert_eq!(body, "");
    }

    #[test]
    fn test_flatten_manifests_format() {
        let manifests = vec![
            GenericManifest {
                name: "app/templates/a.yaml".to_string(),
                content: "kind: A".to_string(),
                head: SimpleHead::default(),
            },
            GenericManifest {
                name: "app/templates/b.yaml".to_string(),
                content: "kind: B".to_string(),
                head: SimpleHead::default(),
            },
        ];

        assert_eq!(
            flatten_manifests(&manifests),
            "\n---\n# Source: app/templates/a.yaml\nkind: A\n---\n# Source: app/templates/b.yaml\nkind: B"
        );
    }

    #[test]
    fn test_flatten_files_skips_blank() {
        let mut files = BTreeMap::new();
        files.insert("b.yaml".to_string(), "kind: B".to_string());
        files.insert("a.yaml".to_string(), "  \n".to_string());

        assert_eq!(flatten_files(&files), "\n---\n# Source: b.yaml\nkind: B");
    }
}
