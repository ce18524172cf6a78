//! Prompt Builder
//!
//! Turns a file's facts and source text into bounded request payloads.
//! Output is a pure function of its inputs: no clocks, no randomness.

use arch_insight_core::FactSet;
use serde::Serialize;

use crate::utils::text::char_prefix;

/// Smallest excerpt worth splitting into several windows.
pub const MIN_USEFUL_EXCERPT_CHARS: usize = 200;

/// What the caller expects the model to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    FileInsight,
    ProjectSummary,
}

/// Per-unit limits on the source excerpt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBudget {
    pub max_content_chars: usize,
    pub max_chunks: usize,
}

impl SizeBudget {
    pub fn new(max_content_chars: usize, max_chunks: usize) -> Self {
        Self {
            max_content_chars,
            max_chunks: max_chunks.max(1),
        }
    }
}

impl Default for SizeBudget {
    fn default() -> Self {
        Self::new(12_000, 1)
    }
}

/// One request payload destined for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptUnit {
    pub file_ref: String,
    pub system_instruction: String,
    pub user_content: String,
    pub expected_shape: ResponseShape,
    /// Set when source text was cut to fit the budget.
    pub partial: bool,
    pub chunk_index: usize,
    pub chunk_count: usize,
}

pub fn file_system_prompt() -> &'static str {
    "You are an expert software architect and code reviewer.\n\
     Analyze the single source file you are given and report only what the file shows.\n\
     Keep every bullet short and specific to this file.\n\n\
     Output sections:\n\
     - Architectural Insights (the file's role and responsibilities)\n\
     - Design Patterns (one bullet per pattern, formatted as `Name: rationale`)\n\
     - Quality Issues\n\
     - Recommendations\n\n\
     Use the section names above as Markdown headings and `-` bullets beneath them.\n\
     Write `- None` under a section with nothing to report."
}

pub fn project_system_prompt() -> &'static str {
    "You are an expert software architect and code reviewer.\n\
     Your goal is to give a new developer a clear, concise and accurate overview of a project.\n\
     Base every statement on the per-file findings you are given; do not speculate.\n\n\
     Cover:\n\
     1) Overall architecture style\n\
     2) Key components and their relationships\n\
     3) Main design patterns used\n\
     4) Notable architectural decisions\n\n\
     Answer in a few short paragraphs of plain prose."
}

/// Build the ordered prompt units for one file.
///
/// Always returns at least one unit. A budget below
/// [`MIN_USEFUL_EXCERPT_CHARS`] disables chunking and yields exactly one
/// best-effort unit.
pub fn build(facts: &FactSet, source_text: &str, budget: SizeBudget) -> Vec<PromptUnit> {
    let max_chunks = if budget.max_content_chars < MIN_USEFUL_EXCERPT_CHARS {
        1
    } else {
        budget.max_chunks.max(1)
    };

    let mut windows: Vec<&str> = Vec::new();
    let mut rest = source_text;
    let mut partial = false;
    loop {
        let (window, cut) = char_prefix(rest, budget.max_content_chars);
        windows.push(window);
        rest = &rest[window.len()..];
        if !cut {
            break;
        }
        if windows.len() >= max_chunks {
            partial = true;
            break;
        }
    }

    let chunk_count = windows.len();
    windows
        .into_iter()
        .enumerate()
        .map(|(idx, window)| PromptUnit {
            file_ref: facts.path.clone(),
            system_instruction: file_system_prompt().to_string(),
            user_content: file_user_content(facts, window, idx, chunk_count),
            expected_shape: ResponseShape::FileInsight,
            partial: partial && idx + 1 == chunk_count,
            chunk_index: idx,
            chunk_count,
        })
        .collect()
}

fn file_user_content(facts: &FactSet, excerpt: &str, idx: usize, count: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("File: {}\n", facts.path));
    out.push_str(&format!(
        "Package: {}\n",
        facts.package_name.as_deref().unwrap_or("(none)")
    ));
    out.push_str(&format!("Size: {} bytes\n", facts.size_bytes));
    if !facts.declared_types.is_empty() {
        out.push_str(&format!("Declared types: {}\n", join(facts.declared_types.iter())));
    }
    if !facts.annotation_markers.is_empty() {
        out.push_str(&format!(
            "Annotations: {}\n",
            join(facts.annotation_markers.iter().map(|m| format!("@{m}")))
        ));
    }
    if !facts.methods.is_empty() {
        out.push_str(&format!("Methods: {}\n", join(facts.methods.iter())));
    }
    if !facts.imports.is_empty() {
        out.push_str(&format!("Imports ({}):\n", facts.imports.len()));
        for import in &facts.imports {
            out.push_str(&format!("- {}\n", import));
        }
    }
    if count > 1 {
        out.push_str(&format!("\nSource part {} of {}:\n", idx + 1, count));
    } else {
        out.push_str("\nSource:\n");
    }
    out.push_str("```\n");
    out.push_str(excerpt);
    if !excerpt.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

/// Build the single project-level narrative request.
pub fn build_summary_unit(project_path: &str, digest: &str) -> PromptUnit {
    PromptUnit {
        file_ref: project_path.to_string(),
        system_instruction: project_system_prompt().to_string(),
        user_content: format!(
            "Project: {}\n\nFindings from the analyzed files:\n{}\n\n\
             Summarize the overall project architecture based only on these findings.",
            project_path, digest
        ),
        expected_shape: ResponseShape::ProjectSummary,
        partial: false,
        chunk_index: 0,
        chunk_count: 1,
    }
}

fn join<I, S>(items: I) -> String
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    items
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
