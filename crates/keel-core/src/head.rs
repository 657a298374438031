//! Minimal, tolerant parsing of a resource document's head
//!
//! Only `apiVersion`, `kind` and a handful of `metadata` fields are read.
//! Everything else in the document is ignored, and a missing `metadata`
//! block is treated as "no name, no annotations" rather than an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// The structural fields of a Kubernetes resource document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleHead {
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub metadata: Option<HeadMetadata>,
}

/// The subset of `metadata` the partitioner cares about
///
/// Scalars are read as text the way Kubernetes tooling does: an unquoted
/// `hook-weight: -5` is `"-5"` and a null annotation value is `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadMetadata {
    #[serde(default, deserialize_with = "scalar_text")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "scalar_text")]
    pub namespace: Option<String>,

    #[serde(default, deserialize_with = "annotation_map")]
    pub annotations: Option<BTreeMap<String, String>>,
}

fn scalar_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => to_text(value).map(Some).map_err(D::Error::custom),
    }
}

fn annotation_map<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(mapping) = Option::<Mapping>::deserialize(deserializer)? else {
        return Ok(None);
    };
    mapping
        .into_iter()
        .map(|(k, v)| Ok((to_text(k)?, to_text(v)?)))
        .collect::<std::result::Result<BTreeMap<String, String>, String>>()
        .map(Some)
        .map_err(D::Error::custom)
}

/// Text form of a YAML scalar; null is the empty string
fn to_text(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s),
        Value::Tagged(tagged) => to_text(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            Err("expected a scalar, found a sequence or mapping".to_string())
        }
    }
}

impl SimpleHead {
    /// Parse the head of a single YAML document
    ///
    /// An empty or comment-only document yields an empty head.
    pub fn parse(doc: &str) -> std::result::Result<Self, serde_yaml::Error> {
        let value: Value = serde_yaml::from_str(doc)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value)
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or("")
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .unwrap_or("")
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.namespace.as_deref())
    }

    /// Annotations, if the document declares a non-empty mapping
    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata
            .as_ref()
            .and_then(|m| m.annotations.as_ref())
            .filter(|a| !a.is_empty())
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }
}

/// API versions known to be served by the target cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionSet(BTreeSet<String>);

impl VersionSet {
    pub fn new<I, S>(versions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(versions.into_iter().map(Into::into).collect())
    }

    /// Whether a `group/version` string is in the set
    pub fn has(&self, api_version: &str) -> bool {
        self.0.contains(api_version)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}
