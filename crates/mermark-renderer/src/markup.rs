//! Markup renderer: prose text to a styled node tree.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::node::{Element, ElementKind, Node};
use crate::style::StyleMap;

/// Renders prose text into styled nodes.
///
/// Implementations must only produce elements whose kinds appear in
/// [`ElementKind::ALL`], so the style map always has a rule for them.
pub trait MarkupRenderer: Send + Sync {
    /// Render one prose span.
    fn render(&self, prose: &str, styles: &StyleMap) -> Vec<Node>;
}

/// `CommonMark` renderer backed by `pulldown-cmark`.
///
/// GitHub Flavored Markdown (tables, strikethrough, task lists) is enabled by
/// default. Raw HTML in the source is kept as text and escaped on output.
#[derive(Debug, Clone)]
pub struct CmarkRenderer {
    gfm: bool,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        Self { gfm: true }
    }
}

impl CmarkRenderer {
    /// Create a renderer with GFM enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable GitHub Flavored Markdown features.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Get parser options based on GFM configuration.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }
}

impl MarkupRenderer for CmarkRenderer {
    fn render(&self, prose: &str, styles: &StyleMap) -> Vec<Node> {
        let mut builder = TreeBuilder::new(styles);
        for event in Parser::new_ext(prose, self.parser_options()) {
            builder.event(event);
        }
        builder.finish()
    }
}

/// Builds a node tree from `pulldown-cmark` events.
///
/// Every start tag pushes a frame; `None` frames stand for tags that produce no
/// element, and their children attach to the nearest element below them.
struct TreeBuilder<'s> {
    styles: &'s StyleMap,
    root: Vec<Node>,
    stack: Vec<Option<Element>>,
    in_table_head: bool,
}

impl<'s> TreeBuilder<'s> {
    fn new(styles: &'s StyleMap) -> Self {
        Self {
            styles,
            root: Vec::new(),
            stack: Vec::new(),
            in_table_head: false,
        }
    }

    fn element(&self, kind: ElementKind) -> Element {
        Element::new(kind, self.styles.class(kind))
    }

    fn attach(&mut self, node: Node) {
        match self.stack.iter_mut().rev().find_map(Option::as_mut) {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                self.attach(Node::Text(text.into_string()));
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => {
                self.attach(Node::Text(math.into_string()));
            }
            Event::Code(code) => {
                let mut element = self.element(ElementKind::InlineCode);
                element.children.push(Node::Text(code.into_string()));
                self.attach(Node::Element(element));
            }
            Event::SoftBreak => self.attach(Node::Text("\n".to_owned())),
            Event::HardBreak => {
                let br = self.element(ElementKind::LineBreak);
                self.attach(Node::Element(br));
            }
            Event::Rule => {
                let hr = self.element(ElementKind::Rule);
                self.attach(Node::Element(hr));
            }
            Event::TaskListMarker(checked) => {
                let mut marker = self
                    .element(ElementKind::TaskMarker)
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked {
                    marker = marker.with_attr("checked", "");
                }
                self.attach(Node::Element(marker));
            }
            Event::FootnoteReference(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Some(self.element(ElementKind::Paragraph)),
            Tag::Heading { level, .. } => {
                Some(self.element(ElementKind::heading(heading_level_to_num(level))))
            }
            Tag::BlockQuote(_) => Some(self.element(ElementKind::BlockQuote)),
            Tag::CodeBlock(kind) => {
                let code = self.element(ElementKind::CodeBlock);
                match kind {
                    CodeBlockKind::Fenced(info) => match info.split_whitespace().next() {
                        Some(lang) => Some(code.with_attr("language", lang)),
                        None => Some(code),
                    },
                    CodeBlockKind::Indented => Some(code),
                }
            }
            Tag::List(Some(start)) => {
                let list = self.element(ElementKind::OrderedList);
                Some(if start == 1 {
                    list
                } else {
                    list.with_attr("start", start.to_string())
                })
            }
            Tag::List(None) => Some(self.element(ElementKind::UnorderedList)),
            Tag::Item => Some(self.element(ElementKind::ListItem)),
            Tag::Table(_) => Some(self.element(ElementKind::Table)),
            Tag::TableHead => {
                // The parser emits header cells directly under the head; add the row.
                self.in_table_head = true;
                let head = self.element(ElementKind::TableHead);
                self.stack.push(Some(head));
                Some(self.element(ElementKind::TableRow))
            }
            Tag::TableRow => Some(self.element(ElementKind::TableRow)),
            Tag::TableCell => Some(self.element(if self.in_table_head {
                ElementKind::TableHeaderCell
            } else {
                ElementKind::TableCell
            })),
            Tag::Emphasis => Some(self.element(ElementKind::Emphasis)),
            Tag::Strong => Some(self.element(ElementKind::Strong)),
            Tag::Strikethrough => Some(self.element(ElementKind::Strikethrough)),
            Tag::Link {
                dest_url, title, ..
            } => {
                let link = self.element(ElementKind::Link).with_attr("href", safe_url(&dest_url));
                Some(if title.is_empty() {
                    link
                } else {
                    link.with_attr("title", title.into_string())
                })
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let image = self.element(ElementKind::Image).with_attr("src", safe_url(&dest_url));
                Some(if title.is_empty() {
                    image
                } else {
                    image.with_attr("title", title.into_string())
                })
            }
            _ => None,
        };
        self.stack.push(frame);
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if tag == TagEnd::TableHead {
            self.in_table_head = false;
            self.close_frame();
        }
        self.close_frame();
    }

    fn close_frame(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let Some(mut element) = frame else {
            return;
        };
        if element.kind == ElementKind::Image {
            // Alt text arrives as child text events.
            let alt = element.text_content();
            element.children.clear();
            element = element.with_attr("alt", alt);
        }
        self.attach(Node::Element(element));
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.close_frame();
        }
        self.root
    }
}

/// URL schemes allowed in link and image targets.
const SAFE_PROTOCOLS: &[&str] = &["http", "https", "mailto", "irc", "ircs", "xmpp"];

/// Keep relative URLs and URLs with a safe scheme; anything else becomes empty.
fn safe_url(url: &str) -> &str {
    let colon = url.find(':');
    let path_start = url.find(['/', '?', '#']);
    match (colon, path_start) {
        (None, _) => url,
        (Some(colon), Some(start)) if start < colon => url,
        (Some(colon), _)
            if SAFE_PROTOCOLS
                .iter()
                .any(|protocol| url[..colon].eq_ignore_ascii_case(protocol)) =>
        {
            url
        }
        _ => "",
    }
}

/// Convert heading level enum to number (1-6).
fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
