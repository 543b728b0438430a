//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default HTTP timeout for Kroki requests (30 seconds).
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Kroki endpoint for Mermaid diagrams.
pub(crate) const MERMAID_ENDPOINT: &str = "mermaid";
