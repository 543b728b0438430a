//! Span rendering: prose through the markup renderer, diagrams as views of
//! their render sessions.

use mermark_diagrams::DiagramSession;
use mermark_renderer::{
    CmarkRenderer, DiagramView, Element, ElementKind, MarkupRenderer, Node, StyleMap,
};

/// Renders individual spans into nodes.
#[derive(Debug, Clone)]
pub struct SpanRenderer<M = CmarkRenderer> {
    markup: M,
    styles: StyleMap,
}

impl Default for SpanRenderer {
    fn default() -> Self {
        Self::new(CmarkRenderer::new(), StyleMap::default())
    }
}

impl<M: MarkupRenderer> SpanRenderer<M> {
    #[must_use]
    pub fn new(markup: M, styles: StyleMap) -> Self {
        Self { markup, styles }
    }

    #[must_use]
    pub fn styles(&self) -> &StyleMap {
        &self.styles
    }

    /// Render a prose span into a prose container.
    ///
    /// Whitespace-only prose produces an empty container without calling the
    /// markup renderer.
    #[must_use]
    pub fn render_prose(&self, prose: &str) -> Node {
        let mut container = Element::new(ElementKind::Prose, self.styles.class(ElementKind::Prose));
        if !prose.trim().is_empty() {
            container.children = self.markup.render(prose, &self.styles);
        }
        Node::Element(container)
    }

    /// Render a diagram span from the state of its session.
    #[must_use]
    pub fn render_diagram(&self, session: &DiagramSession) -> Node {
        Node::Diagram(diagram_view(session))
    }
}

/// Display state for a render session.
#[must_use]
pub fn diagram_view(session: &DiagramSession) -> DiagramView {
    let id = session.id().to_string();
    if let Some(svg) = session.output() {
        DiagramView::Rendered {
            id,
            svg: svg.to_owned(),
        }
    } else if let Some(message) = session.error() {
        DiagramView::Failed {
            id,
            message: message.to_owned(),
        }
    } else {
        DiagramView::Pending { id }
    }
}
