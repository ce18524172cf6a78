//! Structural Extractor
//!
//! Coarse lexical facts pulled out of source text with regular expressions.
//! This is pattern matching, not parsing: comments are stripped first, then
//! line-anchored patterns pick up package, import, type, method and
//! annotation names. Extraction never fails; odd input just yields fewer facts.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use arch_insight_core::FactSet;
use regex::Regex;

const MAX_IMPORTS: usize = 200;
const MAX_TYPES: usize = 100;
const MAX_METHODS: usize = 200;
const MAX_MARKERS: usize = 100;

/// Keywords that look like method calls to the method pattern.
const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "throw", "synchronized", "super",
    "this", "else", "try", "do",
];

struct Patterns {
    block_comment: Regex,
    line_comment: Regex,
    package: Regex,
    imports: Vec<Regex>,
    types: Regex,
    methods: Vec<Regex>,
    annotation: Regex,
}

/// Get compiled extraction patterns (initialized once).
fn patterns() -> Option<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS.get_or_init(compile_patterns).as_ref()
}

fn compile_patterns() -> Option<Patterns> {
    Some(Patterns {
        block_comment: Regex::new(r"(?s)/\*.*?\*/").ok()?,
        line_comment: Regex::new(r"(?m)//.*$").ok()?,
        package: Regex::new(r"(?m)^[\t ]*(?:package|namespace)\s+([A-Za-z_][\w.]*)").ok()?,
        imports: vec![
            // Java, Kotlin, Scala, Python `import x.y`
            Regex::new(r"(?m)^[\t ]*import\s+(?:static\s+)?([A-Za-z_][\w.]*(?:\.\*)?)\s*;?[\t \r]*$")
                .ok()?,
            // C#
            Regex::new(r"(?m)^[\t ]*using\s+(?:static\s+)?([A-Za-z_][\w.]*)\s*;").ok()?,
            // Python `from x import y`
            Regex::new(r"(?m)^[\t ]*from\s+([A-Za-z_.][\w.]*)\s+import\b").ok()?,
            // TypeScript / JavaScript
            Regex::new(r#"(?m)^[\t ]*import\b[^'"\n]*?from\s+['"]([^'"]+)['"]"#).ok()?,
            // Go single import
            Regex::new(r#"(?m)^[\t ]*import\s+"([^"]+)""#).ok()?,
        ],
        types: Regex::new(
            r"(?m)^[\t ]*(?:(?:public|private|protected|internal|static|final|abstract|sealed|non-sealed|data|open|export|pub(?:\([^)]*\))?)\s+)*(?:class|@?interface|enum|record|struct|trait|object)\s+([A-Za-z_]\w*)",
        )
        .ok()?,
        methods: vec![
            // Java / C# style: at least one modifier, optional generics and return type
            Regex::new(
                r"(?m)^[\t ]*(?:(?:public|private|protected|internal|static|final|abstract|synchronized|native|default|override|virtual|async)\s+)+(?:<[^>]*>\s+)?(?:[\w\[\].?<>]+\s+)?([A-Za-z_]\w*)\s*\(",
            )
            .ok()?,
            // Kotlin, Python, Rust, Go
            Regex::new(r"(?m)^[\t ]*(?:[a-z]+\s+)*(?:fun|def|fn|func)\s+(?:\([^)]*\)\s*)?([A-Za-z_]\w*)\s*[<(\[]")
                .ok()?,
        ],
        annotation: Regex::new(r"(?m)(?:^|[\s(,])@([A-Za-z_][\w.]*)").ok()?,
    })
}

/// Extract lexical facts from decoded source text.
pub fn extract_facts(path: &str, size_bytes: u64, text: &str) -> FactSet {
    let mut facts = FactSet::empty(path, size_bytes);
    let Some(p) = patterns() else {
        return facts;
    };

    let without_blocks = p.block_comment.replace_all(text, "");
    let code = p.line_comment.replace_all(&without_blocks, "");

    facts.package_name = p
        .package
        .captures(&code)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end_matches('.').to_string());

    let mut seen_imports = BTreeSet::new();
    let mut imports: Vec<(usize, String)> = Vec::new();
    for re in &p.imports {
        for cap in re.captures_iter(&code) {
            if let Some(m) = cap.get(1) {
                let name = m.as_str().to_string();
                if seen_imports.insert(name.clone()) {
                    imports.push((m.start(), name));
                }
            }
        }
    }
    // Source order, regardless of which pattern matched.
    imports.sort_by_key(|(pos, _)| *pos);
    facts.imports = imports
        .into_iter()
        .map(|(_, name)| name)
        .take(MAX_IMPORTS)
        .collect();

    for cap in p.types.captures_iter(&code) {
        if facts.declared_types.len() >= MAX_TYPES {
            break;
        }
        if let Some(m) = cap.get(1) {
            facts.declared_types.insert(m.as_str().to_string());
        }
    }

    for re in &p.methods {
        for cap in re.captures_iter(&code) {
            if facts.methods.len() >= MAX_METHODS {
                break;
            }
            let Some(m) = cap.get(1) else {
                continue;
            };
            let name = m.as_str();
            // Constructors and records share their type's name.
            if NOT_METHODS.contains(&name) || facts.declared_types.contains(name) {
                continue;
            }
            facts.methods.insert(name.to_string());
        }
    }

    for cap in p.annotation.captures_iter(&code) {
        if facts.annotation_markers.len() >= MAX_MARKERS {
            break;
        }
        if let Some(m) = cap.get(1) {
            if m.as_str() != "interface" {
                facts.annotation_markers.insert(m.as_str().to_string());
            }
        }
    }

    facts
}
