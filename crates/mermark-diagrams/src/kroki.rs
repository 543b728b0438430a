//! Mermaid rendering via the Kroki service.
//!
//! Each render is a blocking HTTP POST of the diagram source, prefixed with an
//! `%%{init}%%` directive carrying the render context, to
//! `{server_url}/mermaid/svg`. Requests run on Tokio's blocking pool. The
//! returned SVG has its root id replaced by the session id.

use std::future::Future;
use std::time::Duration;

use ureq::Agent;

use crate::consts::{DEFAULT_TIMEOUT, MERMAID_ENDPOINT};
use crate::context::RenderContext;
use crate::error::DiagramError;
use crate::renderer::DiagramRenderer;
use crate::session::SessionId;
use crate::svg::scope_svg_ids;

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Diagram renderer backed by a Kroki server.
#[derive(Debug, Clone)]
pub struct KrokiRenderer {
    agent: Agent,
    server_url: String,
}

impl KrokiRenderer {
    /// Create a renderer for a Kroki server (e.g. `https://kroki.io`).
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_owned();
        Self {
            agent: create_agent(DEFAULT_TIMEOUT),
            server_url,
        }
    }

    /// Set the HTTP timeout for each render request.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = create_agent(timeout);
        self
    }

    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self) -> String {
        format!("{}/{MERMAID_ENDPOINT}/svg", self.server_url)
    }
}

/// Request body: init directive followed by the diagram source.
fn request_body(source: &str, context: &RenderContext) -> String {
    format!("{}\n{source}", context.init_directive())
}

/// Send a diagram to Kroki and return the SVG.
///
/// Handles HTTP errors by reading the response body for error details.
fn send_diagram_request(agent: &Agent, url: &str, body: &str) -> Result<String, DiagramError> {
    let response = agent
        .post(url)
        .header("Content-Type", "text/plain")
        .send(body.as_bytes())
        .map_err(|e| DiagramError::Http(e.to_string()))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        return Err(DiagramError::Http(format!(
            "HTTP {status}: {}",
            error_body.trim()
        )));
    }

    body.read_to_string()
        .map_err(|e| DiagramError::Io(e.to_string()))
}

impl DiagramRenderer for KrokiRenderer {
    fn configure(&self, context: &RenderContext) {
        tracing::debug!(
            server = %self.server_url,
            theme = context.theme.mermaid_theme(),
            "Configured Kroki renderer"
        );
    }

    fn render(
        &self,
        id: &SessionId,
        source: &str,
        context: &RenderContext,
    ) -> impl Future<Output = Result<String, DiagramError>> + Send {
        let agent = self.agent.clone();
        let url = self.endpoint();
        let body = request_body(source, context);
        let id = id.clone();

        async move {
            tracing::debug!(%id, %url, "Sending diagram to Kroki");
            let svg = tokio::task::spawn_blocking(move || send_diagram_request(&agent, &url, &body))
                .await
                .map_err(|e| DiagramError::Task(e.to_string()))??;
            Ok(scope_svg_ids(&svg, &id.to_string()))
        }
    }
}
