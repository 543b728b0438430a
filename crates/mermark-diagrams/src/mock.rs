//! Mock diagram renderer for testing.
//!
//! Produces a small SVG that records the session id, theme and source line
//! count, fails for sources containing a marker, and can hold renders until
//! the test releases them.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;

use crate::context::RenderContext;
use crate::error::DiagramError;
use crate::renderer::DiagramRenderer;
use crate::session::SessionId;

/// Default marker making a render fail.
pub const FAIL_MARKER: &str = "%% fail";

/// Default marker making a render panic.
pub const PANIC_MARKER: &str = "%% panic";

/// Diagram renderer with scripted behavior and call recording.
#[derive(Debug, Default)]
pub struct MockRenderer {
    gate: Option<Arc<Semaphore>>,
    configured: Mutex<Vec<RenderContext>>,
    rendered: Mutex<Vec<String>>,
    renders: AtomicUsize,
}

impl MockRenderer {
    /// Create a renderer that completes every render immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer whose renders wait for permits on the returned gate.
    ///
    /// Each render consumes one permit; call `add_permits` to release renders.
    #[must_use]
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let renderer = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (renderer, gate)
    }

    /// Number of render calls started.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Contexts passed to `configure`, in call order.
    #[must_use]
    pub fn configured(&self) -> Vec<RenderContext> {
        self.configured
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Sources passed to `render`, in call order.
    #[must_use]
    pub fn rendered_sources(&self) -> Vec<String> {
        self.rendered.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DiagramRenderer for MockRenderer {
    fn configure(&self, context: &RenderContext) {
        if let Ok(mut configured) = self.configured.lock() {
            configured.push(*context);
        }
    }

    fn render(
        &self,
        id: &SessionId,
        source: &str,
        context: &RenderContext,
    ) -> impl Future<Output = Result<String, DiagramError>> + Send {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.push(source.to_owned());
        }

        let gate = self.gate.clone();
        let result = if source.contains(FAIL_MARKER) {
            Err(DiagramError::Syntax(format!("Parse error in diagram {id}")))
        } else {
            Ok(format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" id="{id}" width="1400" height="700" data-theme="{}" data-lines="{}"></svg>"#,
                context.theme,
                source.lines().count()
            ))
        };
        let panics = source.contains(PANIC_MARKER);

        async move {
            if let Some(gate) = gate {
                gate.acquire().await.map_err(|e| DiagramError::Task(e.to_string()))?.forget();
            }
            assert!(!panics, "mock renderer panic");
            result
        }
    }
}
