//! Diagram source normalization.
//!
//! Normalization makes loosely written diagrams acceptable to the renderer:
//! - a missing type declaration is injected when the type can be inferred
//! - class relationship lines with quoted cardinality labels are rewritten to
//!   the canonical `A "1" --> "*" B` form
//!
//! Normalization never rejects input and is idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::kind::{DiagramKind, DiagramType, declared_type, is_ignorable, split_frontmatter};

/// Class relationship line with optional quoted cardinality labels.
///
/// Labels may use double or single quotes, with any spacing around the arrow.
static RELATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"^(?P<indent>\s*)"#,
        r#"(?P<left>`[^`]+`|[A-Za-z_][\w~]*)\s*"#,
        r#"(?:"(?P<lq>[^"]*)"|'(?P<ls>[^']*)')?\s*"#,
        r#"(?P<arrow>(?:<\||<|\*|o)?(?:--|\.\.)(?:\|>|>|\*|o)?)\s*"#,
        r#"(?:"(?P<rq>[^"]*)"|'(?P<rs>[^']*)')?\s*"#,
        r#"(?P<right>`[^`]+`|[A-Za-z_][\w~]*)"#,
        r#"\s*(?P<label>:.*)?$"#,
    ))
    .unwrap()
});

/// Normalize a diagram source, detecting its kind first.
///
/// # Example
///
/// ```
/// use mermark_diagrams::normalize_source;
///
/// assert_eq!(normalize_source("class X"), "classDiagram\nclass X");
/// assert_eq!(normalize_source("A-->B"), "flowchart TD\nA-->B");
/// ```
#[must_use]
pub fn normalize_source(source: &str) -> String {
    let source = source.trim();
    normalize(DiagramKind::detect(source), source)
}

/// Normalize a diagram source of a known kind.
///
/// The kind's declaration line is inserted only when the source does not
/// already start with a type keyword. It goes after any frontmatter and
/// leading directives. Class diagrams have their relationship lines
/// canonicalized.
#[must_use]
pub fn normalize(kind: DiagramKind, source: &str) -> String {
    let source = source.trim();
    let present = declared_type(source);
    let declared = match (present, kind.diagram_type()) {
        (None, Some(diagram_type)) => insert_declaration(source, diagram_type.declaration()),
        _ => source.to_owned(),
    };

    if present.or(kind.diagram_type()) == Some(DiagramType::Class) {
        let (frontmatter, body) = split_frontmatter(&declared);
        format!("{frontmatter}{}", canonicalize_relations(body))
    } else {
        declared
    }
}

/// Insert `declaration` as its own line before the first meaningful line
/// following any frontmatter.
fn insert_declaration(source: &str, declaration: &str) -> String {
    let (frontmatter, body) = split_frontmatter(source);
    let mut offset = frontmatter.len();
    for line in body.split_inclusive('\n') {
        if !is_ignorable(line) {
            break;
        }
        offset += line.len();
    }

    let (head, tail) = source.split_at(offset);
    match (head.is_empty(), tail.is_empty()) {
        (true, true) => declaration.to_owned(),
        (false, true) => format!("{}\n{declaration}", head.trim_end()),
        _ => format!("{head}{declaration}\n{tail}"),
    }
}

/// Rewrite relationship lines carrying cardinality labels to canonical form.
fn canonicalize_relations(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    for line in source.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        let ending = &line[content.len()..];
        match RELATION_RE.captures(content) {
            Some(caps) if has_cardinality(&caps) => {
                out.push_str(&canonical_relation(&caps));
                out.push_str(ending);
            }
            _ => out.push_str(line),
        }
    }
    out
}

fn has_cardinality(caps: &Captures<'_>) -> bool {
    ["lq", "ls", "rq", "rs"]
        .iter()
        .any(|name| caps.name(name).is_some())
}

/// Cardinality label from either quote style.
fn cardinality<'h>(caps: &Captures<'h>, double: &str, single: &str) -> Option<&'h str> {
    caps.name(double)
        .or_else(|| caps.name(single))
        .map(|m| m.as_str())
}

fn canonical_relation(caps: &Captures<'_>) -> String {
    let mut parts = vec![caps["left"].to_owned()];
    if let Some(label) = cardinality(caps, "lq", "ls") {
        parts.push(format!("\"{label}\""));
    }
    parts.push(caps["arrow"].to_owned());
    if let Some(label) = cardinality(caps, "rq", "rs") {
        parts.push(format!("\"{label}\""));
    }
    parts.push(caps["right"].to_owned());
    if let Some(label) = caps.name("label") {
        parts.push(label.as_str().to_owned());
    }
    format!("{}{}", &caps["indent"], parts.join(" "))
}
