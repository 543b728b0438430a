//! Live preview orchestration for prose + diagram documents.
//!
//! [`Preview`] keeps a rendered tree in step with a document: prose is rendered
//! synchronously on every edit, diagrams asynchronously through a
//! [`DiagramRenderer`](mermark_diagrams::DiagramRenderer). Theme changes and
//! explicit re-renders replace every diagram session; late results from
//! replaced sessions are dropped.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mermark_diagrams::{KrokiRenderer, Theme};
//! use mermark_preview::Preview;
//!
//! # async fn run() {
//! let mut preview = Preview::new(Arc::new(KrokiRenderer::new("https://kroki.io")));
//! preview.set_document("# Flow\n\n```mermaid\nA-->B\n```\n");
//! preview.set_theme(Theme::Dark);
//! preview.settle().await;
//! let html = preview.to_html();
//! # }
//! ```

mod debounce;
mod preview;
mod spans;

pub use preview::{DEFAULT_SETTLE, Preview, PreviewTree};
pub use spans::{SpanRenderer, diagram_view};
