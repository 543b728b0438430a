//! Export flattening: settled preview tree to paginated artifact.

use mermark_diagrams::{DiagramRenderer, fit_svg_to_width};
use mermark_preview::Preview;
use mermark_renderer::{DiagramView, MarkupRenderer, Node};

use crate::geometry::PageGeometry;
use crate::paginator::{PaginateError, Paginator};
use crate::pdf::PdfPaginator;

/// Export error. No artifact is produced.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("invalid page geometry: {0}")]
    Geometry(String),
    #[error("pagination failed: {0}")]
    Paginate(#[from] PaginateError),
    #[error("paginator produced no output")]
    Empty,
}

/// Immutable export result.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    bytes: Vec<u8>,
    media_type: String,
    geometry: PageGeometry,
}

impl ExportArtifact {
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    #[must_use]
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }
}

/// Produces paginated artifacts from a live preview.
#[derive(Debug, Clone)]
pub struct Exporter<P = PdfPaginator> {
    paginator: P,
    geometry: PageGeometry,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(PdfPaginator::default(), PageGeometry::default())
    }
}

impl<P: Paginator> Exporter<P> {
    #[must_use]
    pub fn new(paginator: P, geometry: PageGeometry) -> Self {
        Self {
            paginator,
            geometry,
        }
    }

    #[must_use]
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Export the preview.
    ///
    /// Waits until every diagram in the preview is rendered or failed, then
    /// fits diagrams to the page content width, forbids page breaks inside
    /// diagrams, tables and images, and hands the result to the paginator.
    pub async fn export<R, M>(
        &self,
        preview: &mut Preview<R, M>,
    ) -> Result<ExportArtifact, ExportError>
    where
        R: DiagramRenderer,
        M: MarkupRenderer,
    {
        self.geometry.validate().map_err(ExportError::Geometry)?;

        preview.settle().await;
        let mut tree = preview.tree();
        fit_diagrams(tree.nodes_mut(), self.geometry.content_width_px());

        let bytes = self.paginator.flatten(tree.nodes(), &self.geometry).await?;
        if bytes.is_empty() {
            return Err(ExportError::Empty);
        }

        tracing::info!(
            bytes = bytes.len(),
            media_type = self.paginator.media_type(),
            "Export complete"
        );
        Ok(ExportArtifact {
            bytes,
            media_type: self.paginator.media_type().to_owned(),
            geometry: self.geometry,
        })
    }
}

/// Fit every rendered diagram to `max_width` CSS pixels.
fn fit_diagrams(nodes: &mut [Node], max_width: f64) {
    for node in nodes {
        node.visit_mut(&mut |node| {
            if let Node::Diagram(DiagramView::Rendered { svg, .. }) = node {
                *svg = fit_svg_to_width(svg, max_width);
            }
        });
    }
}
