//! Diagram render sessions.
//!
//! A session is one attempt to render one normalized diagram source. It starts
//! `Pending` and moves once to `Rendered` or `Failed`. Re-rendering never
//! reuses a session: [`DiagramSession::restart`] creates a new one with a
//! fresh id, so late results for the old id can be recognized and dropped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::RenderContext;
use crate::normalize::normalize_source;
use crate::renderer::DiagramRenderer;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique render session id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value of the id.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mermark-{}", self.0)
    }
}

/// Session state without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Rendered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Pending,
    Rendered(String),
    Failed(String),
}

/// Result of a render attempt, tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub id: SessionId,
    /// SVG markup, or the error message.
    pub result: Result<String, String>,
}

/// One render attempt for one diagram.
#[derive(Debug, Clone)]
pub struct DiagramSession {
    id: SessionId,
    source: Arc<str>,
    state: SessionState,
}

impl DiagramSession {
    /// Create a pending session for a raw diagram source.
    ///
    /// The source is normalized before it is stored.
    #[must_use]
    pub fn new(source: &str) -> Self {
        Self::from_normalized(normalize_source(source).into())
    }

    fn from_normalized(source: Arc<str>) -> Self {
        Self {
            id: SessionId::next(),
            source,
            state: SessionState::Pending,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Normalized source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match self.state {
            SessionState::Pending => SessionStatus::Pending,
            SessionState::Rendered(_) => SessionStatus::Rendered,
            SessionState::Failed(_) => SessionStatus::Failed,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state == SessionState::Pending
    }

    /// Rendered SVG, if rendering succeeded.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match &self.state {
            SessionState::Rendered(svg) => Some(svg),
            _ => None,
        }
    }

    /// Error message, if rendering failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Future rendering this session's source.
    ///
    /// The future owns everything it needs, so it can be spawned. It resolves
    /// to an outcome for this session's id; renderer errors become
    /// `Err(message)`.
    pub fn render<R: DiagramRenderer>(
        &self,
        renderer: Arc<R>,
        context: RenderContext,
    ) -> impl Future<Output = RenderOutcome> + Send + use<R> {
        let id = self.id.clone();
        let source = Arc::clone(&self.source);
        async move {
            tracing::debug!(%id, theme = %context.theme, "Rendering diagram");
            let result = renderer
                .render(&id, &source, &context)
                .await
                .map_err(|e| e.to_string());
            RenderOutcome { id, result }
        }
    }

    /// Apply a render outcome.
    ///
    /// Returns `false` without changing anything if the outcome belongs to
    /// another session or this session is already resolved.
    pub fn complete(&mut self, outcome: RenderOutcome) -> bool {
        if outcome.id != self.id || !self.is_pending() {
            return false;
        }
        self.state = match outcome.result {
            Ok(svg) => SessionState::Rendered(svg),
            Err(message) => SessionState::Failed(message),
        };
        true
    }

    /// New pending session for the same source, with a fresh id.
    #[must_use]
    pub fn restart(&self) -> Self {
        Self::from_normalized(Arc::clone(&self.source))
    }
}
