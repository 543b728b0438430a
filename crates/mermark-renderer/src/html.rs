//! HTML serialization of the node tree.

use std::fmt::Write;

use crate::node::{DiagramView, Element, ElementKind, Node};

/// Inline style forbidding page breaks inside an element.
const AVOID_BREAK_STYLE: &str = "break-inside: avoid; page-break-inside: avoid";

/// Options for HTML serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Forbid page breaks inside diagrams, tables and images.
    pub avoid_breaks: bool,
}

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialize nodes to an HTML string.
#[must_use]
pub fn to_html(nodes: &[Node], options: HtmlOptions) -> String {
    let mut out = String::with_capacity(4096);
    write_html(nodes, options, &mut out);
    out
}

/// Serialize nodes, appending to `out`.
pub fn write_html(nodes: &[Node], options: HtmlOptions, out: &mut String) {
    for node in nodes {
        write_node(node, options, out);
    }
}

fn write_node(node: &Node, options: HtmlOptions, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&escape_html(text)),
        Node::Element(element) => write_element(element, options, out),
        Node::Diagram(view) => write_diagram(view, options, out),
    }
}

fn write_element(element: &Element, options: HtmlOptions, out: &mut String) {
    if element.kind == ElementKind::Prose && element.children.is_empty() {
        return;
    }
    if element.kind == ElementKind::CodeBlock {
        write_code_block(element, out);
        return;
    }

    let tag = element.kind.html_tag();
    out.push('<');
    out.push_str(tag);
    write_class(&element.class, out);
    for (name, value) in &element.attrs {
        write!(out, r#" {name}="{}""#, escape_html(value)).unwrap();
    }
    if options.avoid_breaks && matches!(element.kind, ElementKind::Table | ElementKind::Image) {
        write!(out, r#" style="{AVOID_BREAK_STYLE}""#).unwrap();
    }
    out.push('>');

    if element.kind.is_void() {
        return;
    }
    write_html(&element.children, options, out);
    write!(out, "</{tag}>").unwrap();
}

fn write_code_block(element: &Element, out: &mut String) {
    out.push_str("<pre");
    write_class(&element.class, out);
    out.push_str("><code");
    if let Some(lang) = element.attr("language") {
        write!(out, r#" class="language-{}""#, escape_html(lang)).unwrap();
    }
    out.push('>');
    out.push_str(&escape_html(&element.text_content()));
    out.push_str("</code></pre>");
}

fn write_class(class: &str, out: &mut String) {
    if !class.is_empty() {
        write!(out, r#" class="{}""#, escape_html(class)).unwrap();
    }
}

fn write_diagram(view: &DiagramView, options: HtmlOptions, out: &mut String) {
    let style = if options.avoid_breaks {
        format!(r#" style="{AVOID_BREAK_STYLE}""#)
    } else {
        String::new()
    };
    let id = escape_html(view.id());
    match view {
        DiagramView::Pending { .. } => {
            write!(
                out,
                r#"<figure class="diagram diagram-pending" data-diagram-id="{id}"{style}><p>Rendering diagram…</p></figure>"#
            )
            .unwrap();
        }
        DiagramView::Rendered { svg, .. } => {
            write!(
                out,
                r#"<figure class="diagram" data-diagram-id="{id}"{style}>{}</figure>"#,
                svg.trim()
            )
            .unwrap();
        }
        DiagramView::Failed { message, .. } => {
            write!(
                out,
                r#"<figure class="diagram diagram-error" data-diagram-id="{id}"{style}><pre>Diagram rendering failed: {}</pre></figure>"#,
                escape_html(message)
            )
            .unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{CmarkRenderer, MarkupRenderer};
    use crate::style::StyleMap;
    use pretty_assertions::assert_eq;

    fn markdown_html(markdown: &str) -> String {
        let nodes = CmarkRenderer::new().render(markdown, &StyleMap::unstyled());
        to_html(&nodes, HtmlOptions::default())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_paragraph_and_emphasis() {
        assert_eq!(
            markdown_html("Hello *world*"),
            "<p>Hello <em>world</em></p>"
        );
    }

    #[test]
    fn test_class_from_style_map() {
        let mut styles = StyleMap::unstyled();
        styles.apply_overrides([("h2", "big")]);
        let nodes = CmarkRenderer::new().render("## Title", &styles);
        assert_eq!(
            to_html(&nodes, HtmlOptions::default()),
            r#"<h2 class="big">Title</h2>"#
        );
    }

    #[test]
    fn test_code_block() {
        assert_eq!(
            markdown_html("```rust\nlet x = 1 < 2;\n```"),
            "<pre><code class=\"language-rust\">let x = 1 &lt; 2;\n</code></pre>"
        );
    }

    #[test]
    fn test_void_elements() {
        assert_eq!(
            markdown_html("![alt](a.png)"),
            r#"<p><img src="a.png" alt="alt"></p>"#
        );
        assert_eq!(markdown_html("---"), "<hr>");
    }

    #[test]
    fn test_raw_html_escaped() {
        assert_eq!(
            markdown_html("a <script>x</script>"),
            "<p>a &lt;script&gt;x&lt;/script&gt;</p>"
        );
    }

    #[test]
    fn test_empty_prose_container_skipped() {
        let nodes = vec![Node::Element(Element::new(ElementKind::Prose, "prose"))];
        assert_eq!(to_html(&nodes, HtmlOptions::default()), "");
    }

    #[test]
    fn test_diagram_views() {
        let nodes = vec![
            Node::Diagram(DiagramView::Pending {
                id: "d-1".to_owned(),
            }),
            Node::Diagram(DiagramView::Rendered {
                id: "d-2".to_owned(),
                svg: "<svg></svg>\n".to_owned(),
            }),
            Node::Diagram(DiagramView::Failed {
                id: "d-3".to_owned(),
                message: "Parse error <line 1>".to_owned(),
            }),
        ];
        let html = to_html(&nodes, HtmlOptions::default());

        assert!(html.contains(r#"class="diagram diagram-pending" data-diagram-id="d-1""#));
        assert!(html.contains(r#"<figure class="diagram" data-diagram-id="d-2"><svg></svg></figure>"#));
        assert!(html.contains("Diagram rendering failed: Parse error &lt;line 1&gt;"));
    }

    #[test]
    fn test_avoid_breaks() {
        let nodes = CmarkRenderer::new().render("| a |\n|---|\n| 1 |", &StyleMap::unstyled());
        let html = to_html(
            &nodes,
            HtmlOptions {
                avoid_breaks: true,
            },
        );
        assert!(html.starts_with(r#"<table style="break-inside: avoid; page-break-inside: avoid">"#));

        let diagram = [Node::Diagram(DiagramView::Rendered {
            id: "d".to_owned(),
            svg: "<svg/>".to_owned(),
        })];
        let html = to_html(
            &diagram,
            HtmlOptions {
                avoid_breaks: true,
            },
        );
        assert!(html.contains("break-inside: avoid"));
    }
}
