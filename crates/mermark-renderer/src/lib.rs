//! Document segmentation and prose rendering.
//!
//! This crate splits a document into ordered prose and diagram spans and turns
//! prose into a styled node tree:
//! - [`Segmenter`]: line-oriented split on diagram fences
//! - [`CmarkRenderer`]: [`MarkupRenderer`] backed by `pulldown-cmark`
//! - [`StyleMap`]: total mapping from [`ElementKind`] to presentation classes
//! - [`to_html`]: serialization of the node tree, diagrams included
//!
//! Diagram spans are not rendered here; they are represented in the tree by a
//! [`DiagramView`] that the caller fills in.
//!
//! # Example
//!
//! ```
//! use mermark_renderer::{CmarkRenderer, HtmlOptions, MarkupRenderer, StyleMap, to_html};
//!
//! let nodes = CmarkRenderer::new().render("# Hello", &StyleMap::unstyled());
//! assert_eq!(to_html(&nodes, HtmlOptions::default()), "<h1>Hello</h1>");
//! ```

mod fence;
mod html;
mod markup;
mod node;
mod segment;
mod style;

pub use html::{HtmlOptions, escape_html, to_html, write_html};
pub use markup::{CmarkRenderer, MarkupRenderer};
pub use node::{DiagramView, Element, ElementKind, Node};
pub use segment::{DEFAULT_DIAGRAM_TAGS, Segmenter, Span, SpanKind};
pub use style::{StyleMap, StyleRule};
