//! Lexical facts extracted from a single source file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Coarse structural signals for one file.
///
/// Produced by pattern matching, not parsing. Sets are ordered so that prompt
/// text and digests built from them are stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactSet {
    pub path: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    pub imports: Vec<String>,
    pub declared_types: BTreeSet<String>,
    pub annotation_markers: BTreeSet<String>,
    #[serde(default)]
    pub methods: BTreeSet<String>,
}

impl FactSet {
    /// An empty fact set for a file whose content could not be inspected.
    pub fn empty(path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            ..Default::default()
        }
    }

    /// True when no lexical signal was found.
    pub fn is_empty(&self) -> bool {
        self.package_name.is_none()
            && self.imports.is_empty()
            && self.declared_types.is_empty()
            && self.annotation_markers.is_empty()
            && self.methods.is_empty()
    }

    /// One-line digest used in project-level summaries.
    pub fn digest_line(&self) -> String {
        let package = self.package_name.as_deref().unwrap_or("(none)");
        let types = join_or_none(self.declared_types.iter());
        let markers = join_or_none(self.annotation_markers.iter().map(|m| format!("@{m}")));
        format!(
            "package={}; types={}; imports={}; annotations={}",
            package,
            types,
            self.imports.len(),
            markers
        )
    }
}

fn join_or_none<I, S>(items: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    let joined = items
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}
