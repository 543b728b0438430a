//! Diagram rendering errors.

/// Error reported by a diagram renderer for one render call.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// The diagram source was rejected.
    #[error("{0}")]
    Syntax(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    /// The render task was cancelled or panicked.
    #[error("render task failed: {0}")]
    Task(String),
}
