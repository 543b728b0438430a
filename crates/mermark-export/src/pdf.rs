//! PDF paginator.
//!
//! The node tree is laid out as blocks of wrapped lines on pages of the
//! configured geometry and written with `pdf-writer`. Prose uses the standard
//! Type 1 fonts (Helvetica and Courier, `WinAnsiEncoding`), so no font files
//! are embedded. Rendered diagrams are converted by `svg2pdf` into vector form
//! XObjects and placed whole: a diagram never straddles a page break.
//!
//! Line wrapping estimates glyph widths from an average advance per font.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use usvg::{PostProcessingSteps, TreeParsing, TreePostProc, fontdb};

use mermark_diagrams::svg_size;
use mermark_renderer::{DiagramView, Element, ElementKind, Node};

use crate::geometry::PageGeometry;
use crate::paginator::{PaginateError, Paginator};

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Points per CSS pixel.
const PT_PER_CSS_PX: f32 = 0.75;

const BODY_SIZE: f32 = 10.5;
const CODE_SIZE: f32 = 9.0;

/// Line height as a multiple of the font size.
const LEADING: f32 = 1.35;

/// Vertical space between blocks.
const BLOCK_GAP: f32 = 6.0;

/// Indentation per list or quote level.
const INDENT: f32 = 14.0;

/// Height taken by a horizontal rule.
const RULE_HEIGHT: f32 = 8.0;

const TABLE_SEPARATOR: &str = " | ";

/// Standard Type 1 fonts used for text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Font {
    Regular,
    Bold,
    Mono,
}

impl Font {
    const ALL: [Self; 3] = [Self::Regular, Self::Bold, Self::Mono];

    fn resource_name(self) -> Name<'static> {
        match self {
            Self::Regular => Name(b"F1"),
            Self::Bold => Name(b"F2"),
            Self::Mono => Name(b"F3"),
        }
    }

    fn base_font(self) -> Name<'static> {
        match self {
            Self::Regular => Name(b"Helvetica"),
            Self::Bold => Name(b"Helvetica-Bold"),
            Self::Mono => Name(b"Courier"),
        }
    }

    /// Average glyph advance in em.
    fn advance(self) -> f32 {
        match self {
            Self::Regular => 0.5,
            Self::Bold => 0.55,
            Self::Mono => 0.6,
        }
    }
}

/// Content positioned on a page.
///
/// `x` and `top` are points from the top-left corner of the content box.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Placed {
    Text {
        x: f32,
        top: f32,
        size: f32,
        font: Font,
        text: String,
    },
    Diagram {
        x: f32,
        top: f32,
        width: f32,
        height: f32,
        /// Index into [`Layout::svgs`].
        svg: usize,
    },
    Rule {
        top: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Page {
    pub(crate) items: Vec<Placed>,
}

/// Laid out document.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Layout {
    pub(crate) pages: Vec<Page>,
    pub(crate) svgs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    font: Font,
    text: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Lines {
        lines: Vec<Line>,
        size: f32,
        indent: f32,
        /// Move to the next page rather than break inside the block.
        keep_together: bool,
    },
    Diagram {
        svg: String,
        indent: f32,
        width: f32,
        height: f32,
    },
    Rule,
}

/// Converts the node tree into blocks sized for the content box.
struct BlockBuilder {
    width: f32,
    height: f32,
    blocks: Vec<Block>,
    /// List marker prepended to the next text block.
    marker: Option<String>,
}

impl BlockBuilder {
    fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            blocks: Vec::new(),
            marker: None,
        }
    }

    /// Lay out a sequence of sibling nodes, grouping inline runs into
    /// paragraphs.
    fn flow(&mut self, nodes: &[Node], indent: f32) {
        let mut inline = String::new();
        for node in nodes {
            match node {
                Node::Element(element) if is_block(element.kind) => {
                    self.flush(&mut inline, indent);
                    self.element(element, indent);
                }
                Node::Diagram(view) => {
                    self.flush(&mut inline, indent);
                    self.diagram(view, indent);
                }
                other => push_inline(other, &mut inline),
            }
        }
        self.flush(&mut inline, indent);
    }

    fn flush(&mut self, inline: &mut String, indent: f32) {
        if !inline.trim().is_empty() {
            self.text(inline, Font::Regular, BODY_SIZE, indent, false);
        }
        inline.clear();
    }

    fn element(&mut self, element: &Element, indent: f32) {
        match element.kind {
            ElementKind::Heading1
            | ElementKind::Heading2
            | ElementKind::Heading3
            | ElementKind::Heading4
            | ElementKind::Heading5
            | ElementKind::Heading6 => {
                let mut text = String::new();
                push_inlines(&element.children, &mut text);
                self.text(&text, Font::Bold, heading_size(element.kind), indent, true);
            }
            ElementKind::Paragraph => {
                let mut text = String::new();
                push_inlines(&element.children, &mut text);
                self.text(&text, Font::Regular, BODY_SIZE, indent, false);
            }
            ElementKind::CodeBlock => self.code(&element.text_content(), indent),
            ElementKind::OrderedList | ElementKind::UnorderedList => self.list(element, indent),
            ElementKind::BlockQuote => self.flow(&element.children, indent + INDENT),
            ElementKind::Table => self.table(element, indent),
            ElementKind::Rule => self.blocks.push(Block::Rule),
            _ => self.flow(&element.children, indent),
        }
    }

    fn text(&mut self, text: &str, font: Font, size: f32, indent: f32, keep_together: bool) {
        let text = match self.marker.take() {
            Some(marker) => format!("{marker} {text}"),
            None => text.to_owned(),
        };
        let width = self.width - indent;
        let lines: Vec<Line> = text
            .split('\n')
            .flat_map(|hard_line| wrap_words(hard_line, font, size, width))
            .map(|text| Line { font, text })
            .collect();
        if !lines.is_empty() {
            self.blocks.push(Block::Lines {
                lines,
                size,
                indent,
                keep_together,
            });
        }
    }

    fn code(&mut self, code: &str, indent: f32) {
        let columns = columns(Font::Mono, CODE_SIZE, self.width - indent);
        let lines: Vec<Line> = code
            .trim_end_matches('\n')
            .split('\n')
            .flat_map(|line| wrap_chars(&line.replace('\t', "    "), columns))
            .map(|text| Line {
                font: Font::Mono,
                text,
            })
            .collect();
        self.marker = None;
        self.blocks.push(Block::Lines {
            lines,
            size: CODE_SIZE,
            indent,
            keep_together: true,
        });
    }

    fn list(&mut self, list: &Element, indent: f32) {
        let ordered = list.kind == ElementKind::OrderedList;
        let start: usize = list
            .attr("start")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let items = list.children.iter().filter_map(|node| match node {
            Node::Element(item) if item.kind == ElementKind::ListItem => Some(item),
            _ => None,
        });
        for (index, item) in items.enumerate() {
            self.marker = Some(if ordered {
                format!("{}.", start + index)
            } else {
                "\u{2022}".to_owned()
            });
            self.flow(&item.children, indent + INDENT);
            self.marker = None;
        }
    }

    fn table(&mut self, table: &Element, indent: f32) {
        let width = self.width - indent;
        let mut lines = Vec::new();
        for part in child_elements(table) {
            match part.kind {
                ElementKind::TableHead => {
                    let rows: Vec<_> = child_elements(part)
                        .filter(|e| e.kind == ElementKind::TableRow)
                        .collect();
                    if rows.is_empty() {
                        push_row(&mut lines, part, Font::Bold, width);
                    }
                    for row in rows {
                        push_row(&mut lines, row, Font::Bold, width);
                    }
                }
                ElementKind::TableRow => push_row(&mut lines, part, Font::Regular, width),
                _ => {}
            }
        }
        if !lines.is_empty() {
            self.blocks.push(Block::Lines {
                lines,
                size: BODY_SIZE,
                indent,
                keep_together: true,
            });
        }
    }

    fn diagram(&mut self, view: &DiagramView, indent: f32) {
        match view {
            DiagramView::Rendered { svg, .. } => {
                let Some((width_px, height_px)) = svg_size(svg) else {
                    self.text(
                        "Diagram has no intrinsic size",
                        Font::Regular,
                        BODY_SIZE,
                        indent,
                        true,
                    );
                    return;
                };
                #[allow(clippy::cast_possible_truncation)]
                let (mut width, mut height) = (
                    width_px as f32 * PT_PER_CSS_PX,
                    height_px as f32 * PT_PER_CSS_PX,
                );
                // Scale to fit a single page.
                let scale = ((self.width - indent) / width)
                    .min(self.height / height)
                    .min(1.0);
                width *= scale;
                height *= scale;
                self.blocks.push(Block::Diagram {
                    svg: svg.clone(),
                    indent,
                    width,
                    height,
                });
            }
            DiagramView::Failed { message, .. } => self.text(
                &format!("Diagram rendering failed: {message}"),
                Font::Mono,
                CODE_SIZE,
                indent,
                true,
            ),
            DiagramView::Pending { .. } => self.text(
                "Rendering diagram\u{2026}",
                Font::Regular,
                BODY_SIZE,
                indent,
                true,
            ),
        }
    }
}

fn is_block(kind: ElementKind) -> bool {
    matches!(
        kind,
        ElementKind::Prose
            | ElementKind::Heading1
            | ElementKind::Heading2
            | ElementKind::Heading3
            | ElementKind::Heading4
            | ElementKind::Heading5
            | ElementKind::Heading6
            | ElementKind::Paragraph
            | ElementKind::OrderedList
            | ElementKind::UnorderedList
            | ElementKind::ListItem
            | ElementKind::CodeBlock
            | ElementKind::BlockQuote
            | ElementKind::Table
            | ElementKind::Rule
    )
}

fn heading_size(kind: ElementKind) -> f32 {
    match kind {
        ElementKind::Heading1 => 20.0,
        ElementKind::Heading2 => 16.0,
        ElementKind::Heading3 => 13.5,
        ElementKind::Heading4 => 12.0,
        _ => BODY_SIZE,
    }
}

fn child_elements(element: &Element) -> impl Iterator<Item = &Element> {
    element.children.iter().filter_map(|node| match node {
        Node::Element(child) => Some(child),
        _ => None,
    })
}

fn push_row(lines: &mut Vec<Line>, row: &Element, font: Font, width: f32) {
    let cells: Vec<String> = child_elements(row)
        .map(|cell| {
            let mut text = String::new();
            push_inlines(&cell.children, &mut text);
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect();
    for text in wrap_words(&cells.join(TABLE_SEPARATOR), font, BODY_SIZE, width) {
        lines.push(Line { font, text });
    }
}

fn push_inlines(nodes: &[Node], out: &mut String) {
    for node in nodes {
        push_inline(node, out);
    }
}

/// Append the text of an inline node. Soft breaks become spaces and hard
/// breaks newlines.
fn push_inline(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&text.replace('\n', " ")),
        Node::Element(element) => match element.kind {
            ElementKind::LineBreak => out.push('\n'),
            ElementKind::Image => {
                out.push_str(&format!("[{}]", element.attr("alt").unwrap_or("image")));
            }
            ElementKind::TaskMarker => {
                out.push_str(if element.attr("checked").is_some() {
                    "[x] "
                } else {
                    "[ ] "
                });
            }
            _ => push_inlines(&element.children, out),
        },
        Node::Diagram(_) => {}
    }
}

/// Characters that fit in `width` points.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn columns(font: Font, size: f32, width: f32) -> usize {
    (width / (size * font.advance())).floor().max(1.0) as usize
}

/// Greedy word wrap. Words longer than a line are split.
fn wrap_words(text: &str, font: Font, size: f32, width: f32) -> Vec<String> {
    let columns = columns(font, size, width);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        for piece in wrap_chars(word, columns) {
            let piece_len = piece.chars().count();
            if line_len > 0 && line_len + 1 + piece_len > columns {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.push_str(&piece);
            line_len += piece_len;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Split a line into chunks of at most `columns` characters.
fn wrap_chars(line: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(columns.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Places blocks on pages of fixed content height.
struct PageFlow {
    height: f32,
    layout: Layout,
    top: f32,
}

impl PageFlow {
    fn new(height: f32) -> Self {
        Self {
            height,
            layout: Layout {
                pages: vec![Page::default()],
                svgs: Vec::new(),
            },
            top: 0.0,
        }
    }

    fn new_page(&mut self) {
        self.layout.pages.push(Page::default());
        self.top = 0.0;
    }

    fn place(&mut self, item: Placed) {
        if let Some(page) = self.layout.pages.last_mut() {
            page.items.push(item);
        }
    }

    /// Reserve `height` points, moving to a new page if the current one has
    /// no room. Returns the top of the reserved space.
    fn reserve(&mut self, gap: f32, height: f32) -> f32 {
        if self.top > 0.0 {
            if self.top + gap + height > self.height {
                self.new_page();
            } else {
                self.top += gap;
            }
        }
        let top = self.top;
        self.top += height;
        top
    }

    fn block(&mut self, block: Block) {
        match block {
            Block::Lines {
                lines,
                size,
                indent,
                keep_together,
            } => {
                let line_height = size * LEADING;
                #[allow(clippy::cast_precision_loss)]
                let total = line_height * lines.len() as f32;
                let first = if keep_together && total <= self.height {
                    total
                } else {
                    line_height
                };
                // Reserve the block (or its first line), then flow the rest.
                self.top = self.reserve(BLOCK_GAP, first);
                for line in lines {
                    if self.top > 0.0 && self.top + line_height > self.height {
                        self.new_page();
                    }
                    self.place(Placed::Text {
                        x: indent,
                        top: self.top,
                        size,
                        font: line.font,
                        text: line.text,
                    });
                    self.top += line_height;
                }
            }
            Block::Diagram {
                svg,
                indent,
                width,
                height,
            } => {
                let top = self.reserve(BLOCK_GAP, height);
                self.layout.svgs.push(svg);
                let svg = self.layout.svgs.len() - 1;
                self.place(Placed::Diagram {
                    x: indent,
                    top,
                    width,
                    height,
                    svg,
                });
            }
            Block::Rule => {
                let top = self.reserve(0.0, RULE_HEIGHT);
                self.place(Placed::Rule {
                    top: top + RULE_HEIGHT / 2.0,
                });
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mm_to_pt(mm: f64) -> f32 {
    mm as f32 * PT_PER_MM
}

/// Lay out nodes on pages of the given geometry.
pub(crate) fn layout(nodes: &[Node], geometry: &PageGeometry) -> Layout {
    let width = mm_to_pt(geometry.content_width_mm());
    let height = mm_to_pt(geometry.content_height_mm());

    let mut builder = BlockBuilder::new(width, height);
    builder.flow(nodes, 0.0);

    let mut flow = PageFlow::new(height);
    for block in builder.blocks {
        flow.block(block);
    }
    flow.layout
}

/// Encode text for `WinAnsiEncoding`. Unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => u8::try_from(u32::from(c)).unwrap_or(b'?'),
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Parse an SVG into a tree with text converted to paths.
fn parse_svg(svg: &str, fonts: &fontdb::Database) -> Result<usvg::Tree, usvg::Error> {
    let mut tree = usvg::Tree::from_str(svg, &usvg::Options::default())?;
    tree.postprocess(PostProcessingSteps::default(), fonts);
    Ok(tree)
}

/// Write a laid out document as PDF.
fn write_pdf(layout: &Layout, geometry: &PageGeometry, title: &str) -> Vec<u8> {
    let page_width = mm_to_pt(geometry.width_mm);
    let page_height = mm_to_pt(geometry.height_mm);
    let margin = mm_to_pt(geometry.margin_mm);
    let content_width = mm_to_pt(geometry.content_width_mm());

    let mut next = Ref::new(1);
    let catalog_id = next.bump();
    let tree_id = next.bump();
    let info_id = next.bump();
    let font_ids = Font::ALL.map(|font| (font, next.bump()));

    let mut pdf = Pdf::new();

    // Diagrams are converted first; each conversion allocates its own refs.
    let mut fonts = fontdb::Database::new();
    if !layout.svgs.is_empty() {
        fonts.load_system_fonts();
    }
    let diagram_ids: Vec<Option<Ref>> = layout
        .svgs
        .iter()
        .map(|svg| match parse_svg(svg, &fonts) {
            Ok(tree) => {
                let id = next;
                next = svg2pdf::convert_tree_into(&tree, svg2pdf::Options::default(), &mut pdf, id);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Diagram could not be embedded");
                None
            }
        })
        .collect();

    let page_ids: Vec<(Ref, Ref)> = layout
        .pages
        .iter()
        .map(|_| (next.bump(), next.bump()))
        .collect();

    pdf.catalog(catalog_id).pages(tree_id);
    pdf.pages(tree_id)
        .kids(page_ids.iter().map(|(page_id, _)| *page_id))
        .count(i32::try_from(page_ids.len()).unwrap_or(i32::MAX));
    pdf.document_info(info_id).title(TextStr(title));
    for (font, id) in font_ids {
        pdf.type1_font(id)
            .base_font(font.base_font())
            .encoding_predefined(Name(b"WinAnsiEncoding"));
    }

    for (page, (page_id, content_id)) in layout.pages.iter().zip(&page_ids) {
        let mut content = Content::new();
        let mut x_objects = Vec::new();

        for item in &page.items {
            match item {
                Placed::Text {
                    x,
                    top,
                    size,
                    font,
                    text,
                } => {
                    content
                        .begin_text()
                        .set_font(font.resource_name(), *size)
                        .next_line(margin + x, page_height - margin - top - size)
                        .show(Str(&win_ansi(text)))
                        .end_text();
                }
                Placed::Diagram {
                    x,
                    top,
                    width,
                    height,
                    svg,
                } => {
                    let Some(Some(id)) = diagram_ids.get(*svg) else {
                        content
                            .begin_text()
                            .set_font(Font::Regular.resource_name(), BODY_SIZE)
                            .next_line(margin + x, page_height - margin - top - BODY_SIZE)
                            .show(Str(b"Diagram could not be embedded"))
                            .end_text();
                        continue;
                    };
                    let name = format!("D{svg}");
                    content
                        .save_state()
                        .transform([
                            *width,
                            0.0,
                            0.0,
                            *height,
                            margin + x,
                            page_height - margin - top - height,
                        ])
                        .x_object(Name(name.as_bytes()))
                        .restore_state();
                    x_objects.push((name, *id));
                }
                Placed::Rule { top } => {
                    let y = page_height - margin - top;
                    content
                        .set_line_width(0.5)
                        .move_to(margin, y)
                        .line_to(margin + content_width, y)
                        .stroke();
                }
            }
        }

        let mut pdf_page = pdf.page(*page_id);
        pdf_page
            .media_box(Rect::new(0.0, 0.0, page_width, page_height))
            .parent(tree_id)
            .contents(*content_id);
        let mut resources = pdf_page.resources();
        let mut font_dict = resources.fonts();
        for (font, id) in font_ids {
            font_dict.pair(font.resource_name(), id);
        }
        font_dict.finish();
        let mut x_object_dict = resources.x_objects();
        for (name, id) in &x_objects {
            x_object_dict.pair(Name(name.as_bytes()), *id);
        }
        x_object_dict.finish();
        resources.finish();
        pdf_page.finish();

        pdf.stream(*content_id, &content.finish());
    }

    pdf.finish()
}

/// Paginator producing a PDF document.
#[derive(Debug, Clone)]
pub struct PdfPaginator {
    title: String,
}

impl Default for PdfPaginator {
    fn default() -> Self {
        Self::new("Document")
    }
}

impl PdfPaginator {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Paginator for PdfPaginator {
    fn media_type(&self) -> &str {
        "application/pdf"
    }

    async fn flatten(
        &self,
        nodes: &[Node],
        geometry: &PageGeometry,
    ) -> Result<Vec<u8>, PaginateError> {
        let layout = layout(nodes, geometry);
        if layout.pages.iter().all(|page| page.items.is_empty()) {
            return Err(PaginateError::Failed("nothing to paginate".to_owned()));
        }
        tracing::debug!(pages = layout.pages.len(), "Document laid out");

        let geometry = *geometry;
        let title = self.title.clone();
        tokio::task::spawn_blocking(move || write_pdf(&layout, &geometry, &title))
            .await
            .map_err(|e| PaginateError::Failed(e.to_string()))
    }
}
