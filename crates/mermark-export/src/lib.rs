//! Paginated export of rendered previews.
//!
//! [`Exporter::export`] settles a [`Preview`](mermark_preview::Preview) so no
//! diagram is still pending, sizes diagrams to the page content width and hands
//! the tree to a [`Paginator`]. The default [`PdfPaginator`] writes a PDF with
//! diagrams embedded as vector graphics; [`PrintHtmlPaginator`] produces a
//! print-ready HTML document instead.
//!
//! Page geometry is named configuration ([`PAGE_WIDTH_MM`], [`PAGE_HEIGHT_MM`],
//! [`PAGE_MARGIN_MM`], [`CSS_PX_PER_MM`]) carried in [`PageGeometry`].

mod flatten;
mod geometry;
mod paginator;
mod pdf;

pub use flatten::{ExportArtifact, ExportError, Exporter};
pub use geometry::{CSS_PX_PER_MM, PAGE_HEIGHT_MM, PAGE_MARGIN_MM, PAGE_WIDTH_MM, PageGeometry};
pub use paginator::{PaginateError, Paginator, PrintHtmlPaginator};
pub use pdf::PdfPaginator;
