//! Mermaid diagram normalization and asynchronous rendering.
//!
//! - [`normalize_source`]: heuristic repair of loosely written diagrams
//!   (missing type declaration, quoted cardinality labels)
//! - [`DiagramSession`]: one render attempt with a process-unique id
//! - [`DiagramRenderer`]: the rendering collaborator, implemented over HTTP by
//!   [`KrokiRenderer`]
//! - [`scope_svg_ids`], [`fit_svg_to_width`]: per-diagram ids and sizing of
//!   rendered SVG
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mermark_diagrams::{DiagramSession, KrokiRenderer, RenderContext};
//!
//! # async fn run() {
//! let renderer = Arc::new(KrokiRenderer::new("https://kroki.io"));
//! let mut session = DiagramSession::new("A-->B");
//! let outcome = session.render(renderer, RenderContext::default()).await;
//! session.complete(outcome);
//! println!("{:?}", session.output());
//! # }
//! ```

mod consts;
mod context;
mod error;
mod kind;
mod kroki;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod normalize;
mod renderer;
mod session;
mod svg;

pub use context::{LayoutOptions, RenderContext, SecurityMode, Theme};
pub use error::DiagramError;
pub use kind::{DiagramKind, DiagramType};
pub use kroki::KrokiRenderer;
pub use normalize::{normalize, normalize_source};
pub use renderer::DiagramRenderer;
pub use session::{DiagramSession, RenderOutcome, SessionId, SessionStatus};
pub use svg::{fit_svg_to_width, scope_svg_ids, svg_size};
