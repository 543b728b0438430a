//! Paginator collaborator.

use std::fmt::Write;
use std::future::Future;

use mermark_renderer::{HtmlOptions, Node, escape_html, to_html};

use crate::geometry::PageGeometry;

/// Error reported by a paginator.
#[derive(Debug, thiserror::Error)]
pub enum PaginateError {
    #[error("{0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lays out a settled node tree onto pages and produces the export bytes.
pub trait Paginator: Send + Sync {
    /// Media type of the produced artifact.
    fn media_type(&self) -> &str;

    /// Flatten a fully rendered node tree into a paginated document.
    fn flatten(
        &self,
        nodes: &[Node],
        geometry: &PageGeometry,
    ) -> impl Future<Output = Result<Vec<u8>, PaginateError>> + Send;
}

/// Paginator producing a self-contained, print-ready HTML document.
///
/// Page size and margins are expressed as CSS `@page` rules, so any
/// print-to-PDF engine lays the document out on the configured pages. Used by
/// `watch` for its browser preview; exports default to
/// [`PdfPaginator`](crate::PdfPaginator).
#[derive(Debug, Clone)]
pub struct PrintHtmlPaginator {
    title: String,
}

impl Default for PrintHtmlPaginator {
    fn default() -> Self {
        Self::new("Document")
    }
}

impl PrintHtmlPaginator {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Render the full document.
    #[must_use]
    pub fn document(&self, html: &str, geometry: &PageGeometry) -> String {
        let mut out = String::with_capacity(html.len() + 1024);
        out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        writeln!(out, "<title>{}</title>", escape_html(&self.title)).unwrap();
        out.push_str("<style>\n");
        writeln!(
            out,
            "@page {{ size: {}mm {}mm; margin: {}mm; }}",
            geometry.width_mm, geometry.height_mm, geometry.margin_mm
        )
        .unwrap();
        out.push_str("html, body { margin: 0; padding: 0; }\n");
        writeln!(out, "body {{ width: {}mm; }}", geometry.content_width_mm()).unwrap();
        out.push_str(
            "figure.diagram, table, img, pre { break-inside: avoid; page-break-inside: avoid; }\n",
        );
        out.push_str("figure.diagram { margin: 1em 0; text-align: center; }\n");
        out.push_str("</style>\n</head>\n<body>\n");
        out.push_str(html);
        out.push_str("\n</body>\n</html>\n");
        out
    }
}

impl Paginator for PrintHtmlPaginator {
    fn media_type(&self) -> &str {
        "text/html"
    }

    async fn flatten(
        &self,
        nodes: &[Node],
        geometry: &PageGeometry,
    ) -> Result<Vec<u8>, PaginateError> {
        let html = to_html(nodes, HtmlOptions { avoid_breaks: true });
        if html.trim().is_empty() {
            return Err(PaginateError::Failed("nothing to paginate".to_owned()));
        }
        Ok(self.document(&html, geometry).into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use mermark_renderer::{Element, ElementKind};

    use super::*;

    #[test]
    fn test_document_has_page_rules() {
        let doc = PrintHtmlPaginator::new("Notes & <Plans>")
            .document("<p>Hi</p>", &PageGeometry::default());

        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Notes &amp; &lt;Plans&gt;</title>"));
        assert!(doc.contains("@page { size: 210mm 297mm; margin: 10mm; }"));
        assert!(doc.contains("body { width: 190mm; }"));
        assert!(doc.contains("<p>Hi</p>"));
    }

    #[tokio::test]
    async fn test_flatten_empty_fails() {
        let paginator = PrintHtmlPaginator::default();
        let result = paginator.flatten(&[], &PageGeometry::default()).await;
        assert!(matches!(result, Err(PaginateError::Failed(_))));
    }

    #[tokio::test]
    async fn test_flatten_produces_bytes() {
        let mut p = Element::new(ElementKind::Paragraph, "");
        p.children.push(Node::Text("x".to_owned()));

        let paginator = PrintHtmlPaginator::default();
        let bytes = paginator
            .flatten(&[Node::Element(p)], &PageGeometry::default())
            .await
            .unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("<p>x</p>"));
        assert_eq!(paginator.media_type(), "text/html");
    }
}
