//! Preview orchestration.
//!
//! [`Preview`] owns the document and one slot per span. Prose slots are
//! rendered synchronously on every edit; diagram slots own a render session
//! that is rendered asynchronously on spawned tasks. Outcomes come back over a
//! channel and are applied only if their session still owns a slot.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use mermark_diagrams::{
    DiagramRenderer, DiagramSession, RenderContext, RenderOutcome, SessionId, Theme,
    normalize_source,
};
use mermark_renderer::{
    CmarkRenderer, HtmlOptions, MarkupRenderer, Node, Segmenter, SpanKind, to_html,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::debounce::SettleTimer;
use crate::spans::SpanRenderer;

/// Default delay between the last edit and the start of diagram renders.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(120);

/// Diagram slot: a session and whether its render has been started.
#[derive(Debug)]
struct DiagramSlot {
    session: DiagramSession,
    started: bool,
}

impl DiagramSlot {
    fn new(session: DiagramSession) -> Self {
        Self {
            session,
            started: false,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Prose(Node),
    Diagram(DiagramSlot),
}

/// Snapshot of the rendered preview: one node per span, in span order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTree {
    nodes: Vec<Node>,
}

impl PreviewTree {
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    #[must_use]
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    /// Whether no diagram is waiting for its render.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self
            .nodes
            .iter()
            .any(|node| matches!(node, Node::Diagram(view) if view.is_pending()))
    }

    /// Serialize the tree to HTML.
    #[must_use]
    pub fn to_html(&self, options: HtmlOptions) -> String {
        to_html(&self.nodes, options)
    }
}

/// Live preview of a prose + diagram document.
///
/// Edits are applied synchronously with [`set_document`](Self::set_document).
/// Diagram renders start once edits have settled; drive them with
/// [`poll`](Self::poll) or wait for all of them with [`settle`](Self::settle).
/// Both require a Tokio runtime.
pub struct Preview<R: DiagramRenderer, M: MarkupRenderer = CmarkRenderer> {
    renderer: Arc<R>,
    spans: SpanRenderer<M>,
    segmenter: Segmenter,
    document: String,
    context: RenderContext,
    /// Context last passed to the renderer's `configure`.
    configured: Option<RenderContext>,
    slots: Vec<Slot>,
    timer: SettleTimer,
    outcomes_tx: mpsc::UnboundedSender<RenderOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<RenderOutcome>,
}

impl<R: DiagramRenderer> Preview<R> {
    /// Create a preview with the default markup renderer and styles.
    #[must_use]
    pub fn new(renderer: Arc<R>) -> Self {
        Self::with_span_renderer(renderer, SpanRenderer::default())
    }
}

impl<R: DiagramRenderer, M: MarkupRenderer> Preview<R, M> {
    /// Create a preview with a custom span renderer.
    #[must_use]
    pub fn with_span_renderer(renderer: Arc<R>, spans: SpanRenderer<M>) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            renderer,
            spans,
            segmenter: Segmenter::default(),
            document: String::new(),
            context: RenderContext::default(),
            configured: None,
            slots: Vec::new(),
            timer: SettleTimer::new(DEFAULT_SETTLE),
            outcomes_tx,
            outcomes_rx,
        }
    }

    /// Set the delay between the last edit and the start of diagram renders.
    #[must_use]
    pub fn with_settle(mut self, delay: Duration) -> Self {
        self.timer = SettleTimer::new(delay);
        self
    }

    /// Set the segmenter used to find diagram fences.
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: Segmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Set the initial render context.
    #[must_use]
    pub fn with_context(mut self, context: RenderContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn document(&self) -> &str {
        &self.document
    }

    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.timer.delay()
    }

    /// When pending diagram renders will start, if scheduled.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Current diagram sessions, in document order.
    pub fn sessions(&self) -> impl Iterator<Item = &DiagramSession> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Diagram(diagram) => Some(&diagram.session),
            Slot::Prose(_) => None,
        })
    }

    /// Whether any diagram session is unresolved.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.sessions().any(DiagramSession::is_pending)
    }

    /// Replace the document.
    ///
    /// The document is re-segmented and prose is rendered immediately.
    /// Diagrams whose normalized source is unchanged keep their session;
    /// others get a new pending session, started after the settle delay.
    pub fn set_document(&mut self, text: impl Into<String>) {
        self.document = text.into();

        let mut previous: HashMap<String, VecDeque<DiagramSlot>> = HashMap::new();
        for slot in self.slots.drain(..) {
            if let Slot::Diagram(diagram) = slot {
                previous
                    .entry(diagram.session.source().to_owned())
                    .or_default()
                    .push_back(diagram);
            }
        }

        let mut created = 0;
        let mut reused = 0;
        for span in self.segmenter.segment(&self.document) {
            let slot = match span.kind {
                SpanKind::Prose => Slot::Prose(self.spans.render_prose(span.source)),
                SpanKind::Diagram => {
                    let normalized = normalize_source(span.source);
                    match previous.get_mut(&normalized).and_then(VecDeque::pop_front) {
                        Some(diagram) => {
                            reused += 1;
                            Slot::Diagram(diagram)
                        }
                        None => {
                            created += 1;
                            Slot::Diagram(DiagramSlot::new(DiagramSession::new(&normalized)))
                        }
                    }
                }
            };
            self.slots.push(slot);
        }

        let dropped: usize = previous.values().map(VecDeque::len).sum();
        tracing::debug!(
            spans = self.slots.len(),
            created,
            reused,
            dropped,
            "Document updated"
        );

        if self.has_unstarted() {
            self.timer.arm();
        }
    }

    /// Change the theme, re-rendering every diagram.
    pub fn set_theme(&mut self, theme: Theme) {
        self.set_context(RenderContext {
            theme,
            ..self.context
        });
    }

    /// Change the render context, re-rendering every diagram.
    ///
    /// Does nothing if the context is unchanged.
    pub fn set_context(&mut self, context: RenderContext) {
        if context == self.context {
            return;
        }
        tracing::debug!(theme = %context.theme, "Render context changed");
        self.context = context;
        self.restart_all();
    }

    /// Re-render every diagram with a new session.
    pub fn rerender(&mut self) {
        self.restart_all();
    }

    fn restart_all(&mut self) {
        for slot in &mut self.slots {
            if let Slot::Diagram(diagram) = slot {
                *diagram = DiagramSlot::new(diagram.session.restart());
            }
        }
        if self.has_unstarted() {
            self.timer.arm_now();
        }
    }

    fn has_unstarted(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| matches!(slot, Slot::Diagram(diagram) if !diagram.started))
    }

    /// Apply finished renders and start renders that are due.
    ///
    /// Never blocks. Returns `true` if anything changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = self.drain_outcomes();
        if self.timer.take_due() {
            changed |= self.start_unstarted() > 0;
        }
        changed
    }

    /// Wait until every diagram is rendered or failed.
    ///
    /// Sessions not yet started are started immediately, without waiting for
    /// the settle delay.
    pub async fn settle(&mut self) {
        self.drain_outcomes();
        self.timer.clear();
        self.start_unstarted();

        while self.has_pending() {
            match self.outcomes_rx.recv().await {
                Some(outcome) => {
                    self.apply(outcome);
                }
                None => break,
            }
        }
    }

    /// Snapshot of the current rendered tree.
    #[must_use]
    pub fn tree(&self) -> PreviewTree {
        let nodes = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Prose(node) => node.clone(),
                Slot::Diagram(diagram) => self.spans.render_diagram(&diagram.session),
            })
            .collect();
        PreviewTree { nodes }
    }

    /// Current preview as HTML.
    #[must_use]
    pub fn to_html(&self) -> String {
        self.tree().to_html(HtmlOptions::default())
    }

    fn drain_outcomes(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            changed |= self.apply(outcome);
        }
        changed
    }

    /// Apply an outcome to the slot owning its session, if any.
    fn apply(&mut self, outcome: RenderOutcome) -> bool {
        let id = outcome.id.clone();
        let slot = self.slots.iter_mut().find_map(|slot| match slot {
            Slot::Diagram(diagram) if diagram.session.id() == &id => Some(diagram),
            _ => None,
        });

        match slot {
            Some(diagram) => {
                let applied = diagram.session.complete(outcome);
                tracing::debug!(%id, status = ?diagram.session.status(), "Diagram render finished");
                applied
            }
            None => {
                tracing::trace!(%id, "Discarding stale render outcome");
                false
            }
        }
    }

    /// Start every unstarted session. Returns the number started.
    fn start_unstarted(&mut self) -> usize {
        if !self.has_unstarted() {
            return 0;
        }
        if self.configured != Some(self.context) {
            self.renderer.configure(&self.context);
            self.configured = Some(self.context);
        }

        let mut started = 0;
        for slot in &mut self.slots {
            if let Slot::Diagram(diagram) = slot
                && !diagram.started
            {
                diagram.started = true;
                started += 1;
                spawn_render(
                    &diagram.session,
                    Arc::clone(&self.renderer),
                    self.context,
                    self.outcomes_tx.clone(),
                );
            }
        }
        tracing::debug!(started, "Started diagram renders");
        started
    }
}

/// Spawn a render task that always reports an outcome, even if the renderer
/// panics.
fn spawn_render<R: DiagramRenderer>(
    session: &DiagramSession,
    renderer: Arc<R>,
    context: RenderContext,
    outcomes: mpsc::UnboundedSender<RenderOutcome>,
) {
    let id: SessionId = session.id().clone();
    let render = session.render(renderer, context);
    tokio::spawn(async move {
        let outcome = match tokio::spawn(render).await {
            Ok(outcome) => outcome,
            Err(e) => RenderOutcome {
                id,
                result: Err(format!("render task failed: {e}")),
            },
        };
        // The preview may have been dropped.
        let _ = outcomes.send(outcome);
    });
}
