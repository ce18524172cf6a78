//! Response Parser
//!
//! Best-effort structuring of free-form model output into the four insight
//! lists. Parsing is total: any string yields a record, possibly empty.
//! A JSON object (optionally fenced) is tried first, then section headers.

use std::sync::OnceLock;

use arch_insight_core::PatternMention;
use regex::Regex;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Notes,
    Patterns,
    Issues,
    Recommendations,
}

/// Lists recovered from one model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub architectural_notes: Vec<String>,
    pub patterns: Vec<PatternMention>,
    pub quality_issues: Vec<String>,
    pub recommendations: Vec<String>,
    /// Number of recognised sections, including ones that were empty.
    pub sections_found: usize,
}

impl ParsedResponse {
    pub fn is_shortfall(&self) -> bool {
        self.sections_found == 0
    }

    fn push(&mut self, section: Section, item: &str) {
        match section {
            Section::Notes => self.architectural_notes.push(item.to_string()),
            Section::Patterns => self.patterns.push(split_pattern(item)),
            Section::Issues => self.quality_issues.push(item.to_string()),
            Section::Recommendations => self.recommendations.push(item.to_string()),
        }
    }
}

fn bullet_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:[-*•+]|\d+[.)])\s+(.*)$").ok())
        .as_ref()
}

fn inline_header_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\*{0,2}([A-Za-z][A-Za-z /&-]{2,40}?)\*{0,2}\s*:\s*\*{0,2}\s*(.*)$").ok())
        .as_ref()
}

/// Parse a model response into insight lists.
pub fn parse_response(text: &str) -> ParsedResponse {
    if let Some(parsed) = parse_json(text) {
        return parsed;
    }
    parse_sections(text)
}

fn classify(label: &str) -> Option<Section> {
    let lower = label.to_lowercase();
    if lower.contains("pattern") {
        Some(Section::Patterns)
    } else if lower.contains("recommend") || lower.contains("suggest") || lower.contains("improve")
    {
        Some(Section::Recommendations)
    } else if lower.contains("quality")
        || lower.contains("issue")
        || lower.contains("smell")
        || lower.contains("problem")
    {
        Some(Section::Issues)
    } else if lower.contains("architect")
        || lower.contains("role")
        || lower.contains("insight")
        || lower.contains("responsibilit")
    {
        Some(Section::Notes)
    } else {
        None
    }
}

fn is_placeholder(item: &str) -> bool {
    let lower = item.trim().trim_end_matches('.').to_lowercase();
    matches!(
        lower.as_str(),
        "none" | "n/a" | "na" | "none identified" | "none found" | "not applicable" | "-"
    )
}

fn clean_item(item: &str) -> String {
    item.trim().trim_matches('`').trim().to_string()
}

/// Header text when the line is a section header.
fn header_label(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.starts_with('#') {
        return Some(trimmed.trim_start_matches('#').trim().trim_end_matches(':').trim());
    }
    if trimmed.len() > 4 && trimmed.starts_with("**") {
        let inner = trimmed.trim_end_matches(':').trim_end();
        if inner.ends_with("**") {
            let inner = inner.trim_matches('*').trim().trim_end_matches(':').trim();
            if !inner.is_empty() && !inner.contains("**") {
                return Some(inner);
            }
        }
    }
    None
}

/// Text of a short non-bullet line ending in `:`. Such a line opens a
/// section only when its text classifies; otherwise it is a lead-in.
fn colon_label(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if !trimmed.ends_with(':') || trimmed.chars().count() > 60 {
        return None;
    }
    let is_bullet = bullet_re().map(|re| re.is_match(trimmed)).unwrap_or(false);
    if is_bullet {
        return None;
    }
    Some(trimmed.trim_end_matches(':').trim_matches('*').trim())
}

fn parse_sections(text: &str) -> ParsedResponse {
    let mut out = ParsedResponse::default();
    let mut seen: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;
    let mut in_fence = false;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || trimmed.is_empty() {
            continue;
        }

        if let Some(label) = header_label(trimmed) {
            current = classify(label);
            if let Some(section) = current {
                if !seen.contains(&section) {
                    seen.push(section);
                }
            }
            continue;
        }

        if let Some(label) = colon_label(trimmed) {
            if let Some(section) = classify(label) {
                current = Some(section);
                if !seen.contains(&section) {
                    seen.push(section);
                }
            }
            continue;
        }

        let bullet = bullet_re()
            .and_then(|re| re.captures(trimmed))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());

        // "Design Patterns: Singleton" style lines outside any bullet list.
        if bullet.is_none() {
            if let Some(caps) = inline_header_re().and_then(|re| re.captures(trimmed)) {
                let label = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                if let Some(section) = classify(label) {
                    current = Some(section);
                    if !seen.contains(&section) {
                        seen.push(section);
                    }
                    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                    let item = clean_item(rest);
                    if !item.is_empty() && !is_placeholder(&item) {
                        out.push(section, &item);
                    }
                    continue;
                }
            }
        }

        let Some(section) = current else {
            continue;
        };
        let item = clean_item(bullet.unwrap_or(trimmed));
        if item.is_empty() || is_placeholder(&item) {
            continue;
        }
        out.push(section, &item);
    }

    out.sections_found = seen.len();
    out
}

/// Split `Name: rationale` or `Name - rationale`.
fn split_pattern(item: &str) -> PatternMention {
    let (name, rationale) = if let Some((name, rest)) = item.split_once(':') {
        (name, rest)
    } else if let Some((name, rest)) = item.split_once(" - ") {
        (name, rest)
    } else if let Some((name, rest)) = item.split_once(" – ") {
        (name, rest)
    } else {
        (item, "")
    };
    PatternMention::new(clean_pattern_name(name), rationale.trim())
}

fn clean_pattern_name(name: &str) -> String {
    let name = name.trim().trim_matches('*').trim_matches('`').trim();
    let lower = name.to_lowercase();
    if lower.ends_with(" pattern") && name.len() > " pattern".len() {
        name[..name.len() - " pattern".len()].trim().to_string()
    } else {
        name.to_string()
    }
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match body.find('\n') {
        Some(idx) => &body[idx + 1..],
        None => body,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_json(text: &str) -> Option<ParsedResponse> {
    let body = strip_code_fence(text);
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    let value: Value = serde_json::from_str(&body[start..=end]).ok()?;
    let obj = value.as_object()?;

    let mut out = ParsedResponse::default();
    let keys = [
        ("architectural_insights", Section::Notes),
        ("design_patterns", Section::Patterns),
        ("quality_issues", Section::Issues),
        ("recommendations", Section::Recommendations),
    ];
    for (key, section) in keys {
        let Some(field) = obj.get(key) else {
            continue;
        };
        out.sections_found += 1;
        let items: Vec<&Value> = match field {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };
        for item in items {
            match (section, item) {
                (Section::Patterns, Value::Object(map)) => {
                    let name = map
                        .get("name")
                        .or_else(|| map.get("pattern"))
                        .and_then(Value::as_str)
                        .map(clean_pattern_name)
                        .unwrap_or_default();
                    if name.is_empty() {
                        continue;
                    }
                    let rationale = map
                        .get("rationale")
                        .or_else(|| map.get("reason"))
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    out.patterns.push(PatternMention::new(name, rationale.trim()));
                }
                (_, Value::String(s)) => {
                    let item = clean_item(s);
                    if !item.is_empty() && !is_placeholder(&item) {
                        out.push(section, &item);
                    }
                }
                _ => {}
            }
        }
    }

    if out.sections_found == 0 {
        None
    } else {
        Some(out)
    }
}
