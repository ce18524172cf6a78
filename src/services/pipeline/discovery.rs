//! File Discovery
//!
//! Walks a project tree and returns the candidate source files in a stable
//! order. Respects `.gitignore`, the configured extension filter, exclusion
//! globs (matched against the root-relative path) and a per-file size cap.

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;
use serde::Serialize;

use crate::models::AnalyzerConfig;
use crate::utils::error::{AppError, AppResult};
use crate::utils::text::normalize_rel_path;

/// One candidate file, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredFile {
    /// Absolute (or root-joined) path used for reading.
    #[serde(skip)]
    pub abs_path: PathBuf,
    /// Forward-slash path relative to the project root.
    pub path: String,
    pub size_bytes: u64,
}

/// Filters applied while walking.
#[derive(Debug, Clone)]
pub struct DiscoveryFilter {
    extensions: Vec<String>,
    excludes: Vec<Pattern>,
    max_file_size_bytes: u64,
}

impl DiscoveryFilter {
    pub fn from_config(config: &AnalyzerConfig) -> AppResult<Self> {
        let extensions = config
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>();
        if extensions.is_empty() {
            return Err(AppError::config("at least one file extension is required"));
        }

        let mut excludes = Vec::with_capacity(config.exclude_globs.len());
        for raw in &config.exclude_globs {
            let pattern = Pattern::new(raw.trim()).map_err(|e| {
                AppError::config(format!("invalid exclude glob '{}': {}", raw, e))
            })?;
            excludes.push(pattern);
        }

        Ok(Self {
            extensions,
            excludes,
            max_file_size_bytes: config.max_file_size_bytes,
        })
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        self.excludes.iter().any(|p| p.matches(rel_path))
    }
}

/// Ensure the project root exists and is a directory.
pub fn validate_root(root: &Path) -> AppResult<()> {
    if !root.exists() {
        return Err(AppError::not_found(format!(
            "project path does not exist: {}",
            root.display()
        )));
    }
    if !root.is_dir() {
        return Err(AppError::validation(format!(
            "project path is not a directory: {}",
            root.display()
        )));
    }
    Ok(())
}

/// Discover candidate files under `root`, sorted by relative path.
pub fn discover_files(root: &Path, config: &AnalyzerConfig) -> AppResult<Vec<DiscoveredFile>> {
    validate_root(root)?;
    let filter = DiscoveryFilter::from_config(config)?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .follow_links(false)
        .git_ignore(true)
        .git_exclude(true)
        .git_global(false)
        .require_git(false);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if !filter.accepts_extension(path) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let rel_norm = normalize_rel_path(&rel.to_string_lossy());
        if rel_norm.is_empty() || filter.is_excluded(&rel_norm) {
            continue;
        }

        let size_bytes = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(err) => {
                tracing::debug!(path = %rel_norm, error = %err, "skipping file without metadata");
                continue;
            }
        };
        if size_bytes > filter.max_file_size_bytes {
            tracing::warn!(
                path = %rel_norm,
                size_bytes,
                limit = filter.max_file_size_bytes,
                "skipping file above size limit"
            );
            continue;
        }

        files.push(DiscoveredFile {
            abs_path: path.to_path_buf(),
            path: rel_norm,
            size_bytes,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(root = %root.display(), files = files.len(), "discovery complete");
    Ok(files)
}
