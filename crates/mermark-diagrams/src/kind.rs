//! Diagram type detection.
//!
//! A diagram either declares its type on its first meaningful line
//! (`classDiagram`, `flowchart LR`, ...) or has its type inferred from its
//! body. Comment and directive lines (`%% ...`, `%%{init: ...}%%`), blank
//! lines and a leading YAML frontmatter block (`---` ... `---`) never count as
//! the declaration.

use std::sync::LazyLock;

use regex::Regex;

/// A `class <Name>` definition line.
static CLASS_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*class\s+(?:`[^`]+`|[A-Za-z_][\w~]*)(?:\["[^"]*"\])?\s*(?:\{.*)?$"#).unwrap()
});

/// Edge tokens that imply a flowchart.
const EDGE_TOKENS: &[&str] = &["-.->", "-->", "---", "==>"];

/// Mermaid diagram types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramType {
    Flowchart,
    Sequence,
    Class,
    State,
    EntityRelationship,
    Gantt,
    Pie,
    Journey,
    GitGraph,
    Mindmap,
    Timeline,
    Quadrant,
    Requirement,
    C4,
    Sankey,
    XyChart,
    Block,
}

impl DiagramType {
    /// Parse a declaration keyword (the first word of a diagram).
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "graph" | "flowchart" | "flowchart-elk" => Some(Self::Flowchart),
            "sequenceDiagram" => Some(Self::Sequence),
            "classDiagram" | "classDiagram-v2" => Some(Self::Class),
            "stateDiagram" | "stateDiagram-v2" => Some(Self::State),
            "erDiagram" => Some(Self::EntityRelationship),
            "gantt" => Some(Self::Gantt),
            "pie" => Some(Self::Pie),
            "journey" => Some(Self::Journey),
            "gitGraph" => Some(Self::GitGraph),
            "mindmap" => Some(Self::Mindmap),
            "timeline" => Some(Self::Timeline),
            "quadrantChart" => Some(Self::Quadrant),
            "requirementDiagram" => Some(Self::Requirement),
            "C4Context" | "C4Container" | "C4Component" | "C4Dynamic" | "C4Deployment" => {
                Some(Self::C4)
            }
            "sankey-beta" => Some(Self::Sankey),
            "xychart-beta" => Some(Self::XyChart),
            "block-beta" => Some(Self::Block),
            _ => None,
        }
    }

    /// Declaration line injected when this type is inferred.
    #[must_use]
    pub fn declaration(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart TD",
            Self::Sequence => "sequenceDiagram",
            Self::Class => "classDiagram",
            Self::State => "stateDiagram-v2",
            Self::EntityRelationship => "erDiagram",
            Self::Gantt => "gantt",
            Self::Pie => "pie",
            Self::Journey => "journey",
            Self::GitGraph => "gitGraph",
            Self::Mindmap => "mindmap",
            Self::Timeline => "timeline",
            Self::Quadrant => "quadrantChart",
            Self::Requirement => "requirementDiagram",
            Self::C4 => "C4Context",
            Self::Sankey => "sankey-beta",
            Self::XyChart => "xychart-beta",
            Self::Block => "block-beta",
        }
    }
}

/// How the type of a diagram was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    /// The source starts with a type keyword.
    Declared(DiagramType),
    /// No keyword; the type was inferred from the body.
    Inferred(DiagramType),
    /// No keyword and nothing to infer from.
    Unknown,
}

impl DiagramKind {
    /// Detect the kind of a diagram source.
    ///
    /// A declared keyword always wins. Otherwise a `class <Name>` definition
    /// line implies a class diagram, and failing that an edge token
    /// (`-->`, `---`, `==>`, `-.->`) implies a flowchart.
    #[must_use]
    pub fn detect(source: &str) -> Self {
        if let Some(declared) = declared_type(source) {
            return Self::Declared(declared);
        }

        let (_, body) = split_frontmatter(source.trim_start());
        let mut has_edge = false;
        for line in meaningful_lines(body) {
            if CLASS_DEF_RE.is_match(line) {
                return Self::Inferred(DiagramType::Class);
            }
            has_edge = has_edge || is_edge_line(line);
        }

        if has_edge {
            Self::Inferred(DiagramType::Flowchart)
        } else {
            Self::Unknown
        }
    }

    /// Diagram type, if known.
    #[must_use]
    pub fn diagram_type(self) -> Option<DiagramType> {
        match self {
            Self::Declared(t) | Self::Inferred(t) => Some(t),
            Self::Unknown => None,
        }
    }
}

/// Whether a line is blank or a `%%` comment or directive.
pub(crate) fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with("%%")
}

/// Type keyword on the first meaningful line after any frontmatter.
pub(crate) fn declared_type(source: &str) -> Option<DiagramType> {
    let (_, body) = split_frontmatter(source.trim_start());
    meaningful_lines(body)
        .next()
        .and_then(|line| line.split_whitespace().next())
        .and_then(|word| DiagramType::from_keyword(word.trim_end_matches(';')))
}

/// Split a leading `---` ... `---` frontmatter block from the diagram body.
///
/// The frontmatter part includes the closing line and its terminator. Without
/// a closing `---` line there is no frontmatter.
pub(crate) fn split_frontmatter(source: &str) -> (&str, &str) {
    let mut lines = source.split_inclusive('\n');
    let Some(first) = lines.next().filter(|first| first.trim() == "---") else {
        return ("", source);
    };

    let mut offset = first.len();
    for line in lines {
        offset += line.len();
        if line.trim() == "---" {
            return source.split_at(offset);
        }
    }
    ("", source)
}

/// Whether a line holds an edge between two nodes.
///
/// A line of dashes alone is a frontmatter or separator line, not an edge.
fn is_edge_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.chars().all(|c| c == '-') && EDGE_TOKENS.iter().any(|token| trimmed.contains(token))
}

/// Lines that are neither blank nor comments.
fn meaningful_lines(source: &str) -> impl Iterator<Item = &str> {
    source.lines().filter(|line| !is_ignorable(line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declared_keywords() {
        assert_eq!(
            DiagramKind::detect("graph TD\nA-->B"),
            DiagramKind::Declared(DiagramType::Flowchart)
        );
        assert_eq!(
            DiagramKind::detect("classDiagram-v2\nclass A"),
            DiagramKind::Declared(DiagramType::Class)
        );
        assert_eq!(
            DiagramKind::detect("sequenceDiagram\nA->>B: hi"),
            DiagramKind::Declared(DiagramType::Sequence)
        );
        assert_eq!(
            DiagramKind::detect("pie title Pets\n\"Dogs\" : 3"),
            DiagramKind::Declared(DiagramType::Pie)
        );
    }

    #[test]
    fn test_declaration_after_comments_and_directives() {
        let source = "%%{init: {\"theme\": \"dark\"}}%%\n\n%% a comment\nerDiagram\nA ||--o{ B : has";
        assert_eq!(
            DiagramKind::detect(source),
            DiagramKind::Declared(DiagramType::EntityRelationship)
        );
    }

    #[test]
    fn test_declared_wins_over_inference() {
        assert_eq!(
            DiagramKind::detect("flowchart LR\nclass A"),
            DiagramKind::Declared(DiagramType::Flowchart)
        );
        assert_eq!(
            DiagramKind::detect("stateDiagram-v2\n[*] --> Still"),
            DiagramKind::Declared(DiagramType::State)
        );
    }

    #[test]
    fn test_class_inferred() {
        assert_eq!(
            DiagramKind::detect("class X"),
            DiagramKind::Inferred(DiagramType::Class)
        );
        assert_eq!(
            DiagramKind::detect("class Animal {\n  +name\n}"),
            DiagramKind::Inferred(DiagramType::Class)
        );
        assert_eq!(
            DiagramKind::detect("class List~T~"),
            DiagramKind::Inferred(DiagramType::Class)
        );
    }

    #[test]
    fn test_class_takes_precedence_over_edges() {
        assert_eq!(
            DiagramKind::detect("A --> B\nclass A"),
            DiagramKind::Inferred(DiagramType::Class)
        );
    }

    #[test]
    fn test_flowchart_inferred_from_edges() {
        for source in ["A-->B", "A --- B", "A ==> B", "A -.-> B"] {
            assert_eq!(
                DiagramKind::detect(source),
                DiagramKind::Inferred(DiagramType::Flowchart),
                "{source}"
            );
        }
    }

    #[test]
    fn test_flowchart_class_assignment_is_not_class_def() {
        assert_eq!(
            DiagramKind::detect("A-->B\nclass A highlight"),
            DiagramKind::Inferred(DiagramType::Flowchart)
        );
    }

    #[test]
    fn test_frontmatter_skipped_for_declaration() {
        assert_eq!(
            DiagramKind::detect("---\ntitle: Hello\n---\nsequenceDiagram\nAlice->>Bob: Hi"),
            DiagramKind::Declared(DiagramType::Sequence)
        );
        assert_eq!(
            DiagramKind::detect(
                "---\ntitle: Animal example\n---\nclassDiagram\nclass Duck {\n  +swim()\n}"
            ),
            DiagramKind::Declared(DiagramType::Class)
        );
        assert_eq!(
            DiagramKind::detect("---\nconfig:\n  theme: forest\n---\nflowchart LR\nA --- B"),
            DiagramKind::Declared(DiagramType::Flowchart)
        );
    }

    #[test]
    fn test_frontmatter_lines_are_not_edges() {
        assert_eq!(
            DiagramKind::detect("---\ntitle: Notes\n---\njust words"),
            DiagramKind::Unknown
        );
        assert_eq!(DiagramKind::detect("---\nwords"), DiagramKind::Unknown);
        assert_eq!(
            DiagramKind::detect("---\ntitle: Flow\n---\nA --> B"),
            DiagramKind::Inferred(DiagramType::Flowchart)
        );
    }

    #[test]
    fn test_split_frontmatter() {
        assert_eq!(
            split_frontmatter("---\ntitle: T\n---\npie"),
            ("---\ntitle: T\n---\n", "pie")
        );
        assert_eq!(split_frontmatter("---\ntitle: T"), ("", "---\ntitle: T"));
        assert_eq!(split_frontmatter("pie\n---\n"), ("", "pie\n---\n"));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(DiagramKind::detect(""), DiagramKind::Unknown);
        assert_eq!(DiagramKind::detect("just words"), DiagramKind::Unknown);
        assert_eq!(DiagramKind::detect("%% A --> B"), DiagramKind::Unknown);
        assert_eq!(DiagramKind::Unknown.diagram_type(), None);
    }
}
