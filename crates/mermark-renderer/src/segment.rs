//! Document segmentation into prose and diagram spans.
//!
//! [`Segmenter`] walks the document line by line. Fences whose language tag is a
//! configured diagram tag become [`SpanKind::Diagram`] spans; everything else,
//! ordinary code blocks included, stays in [`SpanKind::Prose`] spans byte for
//! byte. Concatenating [`Span::raw`] of all spans reproduces the input.

use std::ops::Range;

use crate::fence::{FenceLine, FenceTracker};

/// Fence language tags treated as diagrams by default.
pub const DEFAULT_DIAGRAM_TAGS: &[&str] = &["mermaid", "diagram"];

/// Kind of a document span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    /// Markup text, rendered by the markup renderer.
    Prose,
    /// Diagram description, rendered by the diagram renderer.
    Diagram,
}

/// A contiguous, typed slice of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<'a> {
    /// Span kind.
    pub kind: SpanKind,
    /// Exact document text covered by this span (fence lines included).
    pub raw: &'a str,
    /// Renderable text: diagram body (trimmed) or prose verbatim.
    pub source: &'a str,
    /// Zero-based position in the document.
    pub order: usize,
}

impl Span<'_> {
    /// Whether this is a prose span with nothing but whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.kind == SpanKind::Prose && self.source.trim().is_empty()
    }
}

/// Diagram fence that has been opened but not yet closed.
struct OpenDiagram {
    /// Byte offset of the opening fence line.
    start: usize,
    /// Byte offset of the first body line.
    body_start: usize,
}

/// Splits documents into prose and diagram spans.
///
/// # Example
///
/// ```
/// use mermark_renderer::{Segmenter, SpanKind};
///
/// let spans = Segmenter::default().segment("A\n```diagram\nclass X\n```\nB");
/// let kinds: Vec<_> = spans.iter().map(|s| s.kind).collect();
/// assert_eq!(kinds, [SpanKind::Prose, SpanKind::Diagram, SpanKind::Prose]);
/// assert_eq!(spans[1].source, "class X");
/// ```
#[derive(Debug, Clone)]
pub struct Segmenter {
    tags: Vec<String>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_DIAGRAM_TAGS.iter().copied())
    }
}

impl Segmenter {
    /// Create a segmenter recognizing the given fence language tags as diagrams.
    #[must_use]
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Fence language tags recognized as diagrams.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Whether a fence info string opens a diagram fence.
    ///
    /// Only the first word of the info string is compared (case-insensitive).
    #[must_use]
    pub fn is_diagram_fence(&self, info: &str) -> bool {
        info.split_whitespace()
            .next()
            .is_some_and(|lang| self.tags.iter().any(|t| t.eq_ignore_ascii_case(lang)))
    }

    /// Split `text` into ordered spans.
    ///
    /// Always returns a prose gap before, between and after diagram spans, so
    /// `N` complete diagram fences yield `N` diagram spans and `N + 1` prose spans
    /// (some possibly empty). An unterminated diagram fence is prose through the
    /// end of the text.
    #[must_use]
    pub fn segment<'a>(&self, text: &'a str) -> Vec<Span<'a>> {
        let mut spans = Vec::new();
        let mut tracker = FenceTracker::default();
        let mut open: Option<OpenDiagram> = None;
        let mut prose_start = 0;
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();
            let content = line.strip_suffix('\n').unwrap_or(line);

            match tracker.update(content) {
                Some(FenceLine::Open { info }) if self.is_diagram_fence(info) => {
                    open = Some(OpenDiagram {
                        start: line_start,
                        body_start: offset,
                    });
                }
                Some(FenceLine::Close) => {
                    if let Some(diagram) = open.take() {
                        let end = line_start + content.len();
                        push_prose(&mut spans, text, prose_start..diagram.start);
                        spans.push(Span {
                            kind: SpanKind::Diagram,
                            raw: &text[diagram.start..end],
                            source: text[diagram.body_start..line_start].trim(),
                            order: spans.len(),
                        });
                        prose_start = end;
                    }
                }
                _ => {}
            }
        }

        // An open diagram fence is left inside the trailing prose span.
        push_prose(&mut spans, text, prose_start..text.len());
        spans
    }
}

fn push_prose<'a>(spans: &mut Vec<Span<'a>>, text: &'a str, range: Range<usize>) {
    let raw = &text[range];
    spans.push(Span {
        kind: SpanKind::Prose,
        raw,
        source: raw,
        order: spans.len(),
    });
}
