//! Renderable node tree.
//!
//! Prose spans render to [`Element`] and text nodes; diagram spans render to a
//! single [`DiagramView`] that reflects the state of its render session.

/// Kinds of elements the markup renderer can produce.
///
/// Every kind has a presentation rule in [`StyleMap`](crate::StyleMap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// Container wrapping all nodes of one prose span.
    Prose,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Paragraph,
    OrderedList,
    UnorderedList,
    ListItem,
    InlineCode,
    CodeBlock,
    BlockQuote,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    Table,
    TableHead,
    TableRow,
    TableHeaderCell,
    TableCell,
    Rule,
    LineBreak,
    TaskMarker,
}

impl ElementKind {
    /// Number of element kinds.
    pub const COUNT: usize = 27;

    /// All element kinds, in declaration order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Prose,
        Self::Heading1,
        Self::Heading2,
        Self::Heading3,
        Self::Heading4,
        Self::Heading5,
        Self::Heading6,
        Self::Paragraph,
        Self::OrderedList,
        Self::UnorderedList,
        Self::ListItem,
        Self::InlineCode,
        Self::CodeBlock,
        Self::BlockQuote,
        Self::Emphasis,
        Self::Strong,
        Self::Strikethrough,
        Self::Link,
        Self::Image,
        Self::Table,
        Self::TableHead,
        Self::TableRow,
        Self::TableHeaderCell,
        Self::TableCell,
        Self::Rule,
        Self::LineBreak,
        Self::TaskMarker,
    ];

    /// Heading kind for a level (clamped to 1-6).
    #[must_use]
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => Self::Heading1,
            2 => Self::Heading2,
            3 => Self::Heading3,
            4 => Self::Heading4,
            5 => Self::Heading5,
            _ => Self::Heading6,
        }
    }

    /// Configuration name of this kind (used for style overrides).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Prose => "prose",
            Self::Heading1 => "h1",
            Self::Heading2 => "h2",
            Self::Heading3 => "h3",
            Self::Heading4 => "h4",
            Self::Heading5 => "h5",
            Self::Heading6 => "h6",
            Self::Paragraph => "p",
            Self::OrderedList => "ol",
            Self::UnorderedList => "ul",
            Self::ListItem => "li",
            Self::InlineCode => "code",
            Self::CodeBlock => "pre",
            Self::BlockQuote => "blockquote",
            Self::Emphasis => "em",
            Self::Strong => "strong",
            Self::Strikethrough => "del",
            Self::Link => "a",
            Self::Image => "img",
            Self::Table => "table",
            Self::TableHead => "thead",
            Self::TableRow => "tr",
            Self::TableHeaderCell => "th",
            Self::TableCell => "td",
            Self::Rule => "hr",
            Self::LineBreak => "br",
            Self::TaskMarker => "task",
        }
    }

    /// Parse a configuration name (see [`name`](Self::name)).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// HTML tag used when serializing this kind.
    #[must_use]
    pub fn html_tag(self) -> &'static str {
        match self {
            Self::Prose => "div",
            Self::TaskMarker => "input",
            other => other.name(),
        }
    }

    /// Whether the HTML element has no closing tag.
    #[must_use]
    pub fn is_void(self) -> bool {
        matches!(
            self,
            Self::Image | Self::Rule | Self::LineBreak | Self::TaskMarker
        )
    }
}

/// A styled element with children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element kind.
    pub kind: ElementKind,
    /// Presentation class from the style map.
    pub class: String,
    /// Extra attributes (e.g. `href`, `src`, `start`).
    pub attrs: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(kind: ElementKind, class: impl Into<String>) -> Self {
        Self {
            kind,
            class: class.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) => collect_text(&element.children, out),
            Node::Diagram(_) => {}
        }
    }
}

/// Display state of one diagram slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagramView {
    /// Render in flight (or waiting to start).
    Pending {
        /// Render session id.
        id: String,
    },
    /// Rendered vector markup.
    Rendered {
        /// Render session id.
        id: String,
        /// SVG markup.
        svg: String,
    },
    /// Rendering failed; shown as an inline error.
    Failed {
        /// Render session id.
        id: String,
        /// Error message.
        message: String,
    },
}

impl DiagramView {
    /// Render session id behind this view.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Pending { id } | Self::Rendered { id, .. } | Self::Failed { id, .. } => id,
        }
    }

    /// Whether the diagram is still waiting for its render.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// A node in the renderable tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Styled element.
    Element(Element),
    /// Plain text (escaped on output).
    Text(String),
    /// Embedded diagram.
    Diagram(DiagramView),
}

impl Node {
    /// Visit this node and all descendants in pre-order.
    pub fn visit(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        if let Self::Element(element) = self {
            for child in &element.children {
                child.visit(f);
            }
        }
    }

    /// Visit this node and all descendants mutably in pre-order.
    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        if let Self::Element(element) = self {
            for child in &mut element.children {
                child.visit_mut(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_has_every_kind_once() {
        let mut names: Vec<_> = ElementKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ElementKind::COUNT);
    }

    #[test]
    fn test_index_matches_declaration_order() {
        for (index, kind) in ElementKind::ALL.into_iter().enumerate() {
            assert_eq!(kind as usize, index, "{kind:?} out of order");
        }
    }

    #[test]
    fn test_parse_round_trips_names() {
        for kind in ElementKind::ALL {
            assert_eq!(ElementKind::parse(kind.name()), Some(kind));
        }
        assert_eq!(ElementKind::parse("h7"), None);
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(ElementKind::heading(1), ElementKind::Heading1);
        assert_eq!(ElementKind::heading(4), ElementKind::Heading4);
        assert_eq!(ElementKind::heading(9), ElementKind::Heading6);
    }

    #[test]
    fn test_text_content_skips_diagrams() {
        let mut p = Element::new(ElementKind::Paragraph, "");
        p.children.push(Node::Text("a".to_owned()));
        p.children.push(Node::Diagram(DiagramView::Pending {
            id: "x".to_owned(),
        }));
        let mut em = Element::new(ElementKind::Emphasis, "");
        em.children.push(Node::Text("b".to_owned()));
        p.children.push(Node::Element(em));
        assert_eq!(p.text_content(), "ab");
    }

    #[test]
    fn test_visit_counts_descendants() {
        let mut root = Element::new(ElementKind::Prose, "");
        root.children.push(Node::Text("x".to_owned()));
        root.children
            .push(Node::Element(Element::new(ElementKind::Rule, "")));
        let node = Node::Element(root);

        let mut count = 0;
        node.visit(&mut |_| count += 1);
        assert_eq!(count, 3);
    }
}
