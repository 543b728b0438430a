//! Diagram renderer collaborator.

use std::future::Future;

use crate::context::RenderContext;
use crate::error::DiagramError;
use crate::session::SessionId;

/// Renders normalized diagram sources to SVG.
///
/// The render context is passed to every call; implementations must not
/// depend on state set by earlier calls to produce correct output.
pub trait DiagramRenderer: Send + Sync + 'static {
    /// Called before a render batch whenever the context changed since the
    /// previous batch.
    fn configure(&self, context: &RenderContext) {
        let _ = context;
    }

    /// Render one diagram.
    ///
    /// `id` is unique per render session and can be used for element ids in
    /// the produced markup.
    fn render(
        &self,
        id: &SessionId,
        source: &str,
        context: &RenderContext,
    ) -> impl Future<Output = Result<String, DiagramError>> + Send;
}
