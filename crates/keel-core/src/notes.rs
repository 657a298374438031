//! Per-chart release notes
//!
//! `NOTES.txt` goes through rendering like any template but is not a
//! resource. Each chart (parent or subchart) may contribute one, keyed by
//! the directory that holds its `templates/` folder:
//!
//! ```text
//! parent/templates/NOTES.txt                 -> "parent"
//! parent/charts/child/templates/NOTES.txt    -> "child"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Suffix identifying a notes template
pub const NOTES_FILE_SUFFIX: &str = "NOTES.txt";

/// Chart name → rendered notes text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotesCollection(BTreeMap<String, String>);

impl NotesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chart's notes, replacing any earlier entry for that chart
    pub fn insert(&mut self, chart: impl Into<String>, notes: impl Into<String>) -> Option<String> {
        self.0.insert(chart.into(), notes.into())
    }

    pub fn get(&self, chart: &str) -> Option<&str> {
        self.0.get(chart).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn charts(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub fn is_notes_file(path: &str) -> bool {
    path.ends_with(NOTES_FILE_SUFFIX)
}

/// Chart owning a notes file: the path component two levels above it
///
/// Returns `None` when the path is too shallow to have one.
pub fn chart_name(path: &str) -> Option<&str> {
    let mut components = path.rsplit('/').filter(|c| !c.is_empty());
    components.next()?;
    components.next()?;
    components.next()
}
