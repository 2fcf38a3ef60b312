use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use super::code::{
    detab, language_hint_from_codeblock_kind, push_codeblock_text, render_code_block,
};
use super::table::TableRenderer;
use crate::ui::layout::wrap_spans;
use crate::ui::theme::Theme;

const QUOTE_BAR: &str = "│ ";
const MAX_LIST_HANGING_INDENT_WIDTH: usize = 24;

#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderConfig {
    /// Wrap to this many columns; `None` leaves lines unwrapped.
    pub width: Option<usize>,
    pub syntax_highlighting: bool,
}

/// Render `content` to styled lines. Never panics, whatever prefix of a
/// document it is handed.
pub fn render_markdown(
    content: &str,
    theme: &Theme,
    config: &MarkdownRenderConfig,
) -> Vec<Line<'static>> {
    MarkdownRenderer::new(content, theme, *config).render()
}

#[derive(Clone, Debug)]
enum ListKind {
    Unordered,
    Ordered(u64),
}

struct PendingLink {
    url: String,
    text: String,
}

struct MarkdownRenderer<'a> {
    content: &'a str,
    theme: &'a Theme,
    config: MarkdownRenderConfig,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<ListKind>,
    list_indent_stack: Vec<usize>,
    pending_list_indent: Option<usize>,
    quote_depth: usize,
    link_stack: Vec<PendingLink>,
    in_code_block: Option<String>,
    code_block_lines: Vec<String>,
    table_renderer: Option<TableRenderer>,
}

impl<'a> MarkdownRenderer<'a> {
    fn new(content: &'a str, theme: &'a Theme, config: MarkdownRenderConfig) -> Self {
        Self {
            content,
            theme,
            config,
            lines: Vec::new(),
            current_spans: Vec::new(),
            style_stack: vec![theme.ai_text_style],
            list_stack: Vec::new(),
            list_indent_stack: Vec::new(),
            pending_list_indent: None,
            quote_depth: 0,
            link_stack: Vec::new(),
            in_code_block: None,
            code_block_lines: Vec::new(),
            table_renderer: None,
        }
    }

    fn render(mut self) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_GFM);
        let parser = Parser::new_ext(self.content, options);

        for event in parser {
            match event {
                Event::Start(tag) => self.start_tag(tag),
                Event::End(tag_end) => self.end_tag(tag_end),
                Event::Text(text) => {
                    if self.in_code_block.is_some() {
                        push_codeblock_text(&mut self.code_block_lines, &text);
                    } else {
                        self.push_text(detab(&text), self.current_style());
                    }
                }
                Event::Code(code) => {
                    self.push_text(detab(&code), self.theme.md_inline_code_style());
                }
                Event::InlineMath(math) | Event::DisplayMath(math) => {
                    self.push_text(detab(&math), self.theme.md_inline_code_style());
                }
                Event::SoftBreak | Event::HardBreak => {
                    if let Some(table) = self.table_renderer.as_mut() {
                        table.new_line_in_cell();
                    } else {
                        self.flush_current_spans();
                        self.continue_list_item();
                    }
                }
                Event::Rule => {
                    self.flush_current_spans();
                    self.push_horizontal_rule();
                    self.push_empty_line();
                }
                Event::TaskListMarker(checked) => {
                    let marker = if checked { "[x] " } else { "[ ] " };
                    self.push_span(Span::styled(marker, self.theme.md_list_marker_style()));
                }
                Event::Html(html) => {
                    // Block HTML arrives line by line; show it verbatim.
                    let style = self.theme.system_text_style;
                    for line in html.lines() {
                        self.push_text(detab(line), style);
                        self.flush_current_spans();
                    }
                }
                Event::InlineHtml(html) => {
                    let is_break = matches!(html.trim(), "<br>" | "<br/>" | "<br />");
                    match self.table_renderer.as_mut() {
                        Some(table) if is_break => table.new_line_in_cell(),
                        _ => self.push_text(html.to_string(), self.theme.system_text_style),
                    }
                }
                Event::FootnoteReference(label) => {
                    self.push_text(format!("[^{label}]"), self.current_style());
                }
            }
        }

        // Whatever is still open belongs to a reply that has not finished
        // arriving; draw it as it stands.
        if self.in_code_block.is_some() {
            self.finalize_code_block();
        }
        if self.table_renderer.is_some() {
            self.finalize_table();
        }
        self.flush_current_spans();
        while self.lines.last().is_some_and(|line| line.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.pending_list_indent.is_none() && !self.list_stack.is_empty() {
                    self.pending_list_indent = Some(self.current_list_indent_width());
                }
            }
            Tag::Heading { level, .. } => {
                self.flush_current_spans();
                self.style_stack.push(self.theme.md_heading_style(heading_level(level)));
            }
            Tag::BlockQuote(_) => {
                self.flush_current_spans();
                self.quote_depth += 1;
                self.style_stack.push(self.theme.md_blockquote_style());
            }
            Tag::List(start) => {
                self.flush_current_spans();
                self.list_stack.push(match start {
                    Some(n) => ListKind::Ordered(n),
                    None => ListKind::Unordered,
                });
                self.list_indent_stack.push(0);
                self.pending_list_indent = None;
            }
            Tag::Item => {
                self.flush_current_spans();
                let marker = match self.list_stack.last_mut() {
                    Some(ListKind::Ordered(next)) => {
                        let current = *next;
                        *next += 1;
                        format!("{current}. ")
                    }
                    _ => "- ".to_string(),
                };
                let parent_indent: usize = self
                    .list_indent_stack
                    .iter()
                    .take(self.list_indent_stack.len().saturating_sub(1))
                    .sum();
                if let Some(indent) = self.list_indent_stack.last_mut() {
                    *indent = marker.width();
                }
                self.pending_list_indent = Some(parent_indent);
                self.push_span(Span::styled(marker, self.theme.md_list_marker_style()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_current_spans();
                self.in_code_block = Some(language_hint_from_codeblock_kind(kind));
                self.code_block_lines.clear();
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.style_stack.push(self.theme.md_link_style());
                self.link_stack.push(PendingLink {
                    url: dest_url.to_string(),
                    text: String::new(),
                });
            }
            Tag::Table(alignments) => {
                self.flush_current_spans();
                self.table_renderer = Some(TableRenderer::new(alignments));
            }
            Tag::TableHead => {
                if let Some(table) = self.table_renderer.as_mut() {
                    table.start_header();
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table_renderer.as_mut() {
                    table.start_cell();
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag_end: TagEnd) {
        match tag_end {
            TagEnd::Paragraph => {
                self.flush_current_spans();
                if self.list_stack.is_empty() {
                    self.push_empty_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_current_spans();
                self.push_empty_line();
                self.style_stack.pop();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_current_spans();
                self.style_stack.pop();
                if self.lines.last().is_some_and(is_bare_quote_line) {
                    self.lines.pop();
                }
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.push_empty_line();
            }
            TagEnd::List(_) => {
                self.flush_current_spans();
                if self.list_stack.len() == 1 {
                    self.push_empty_line();
                }
                self.list_stack.pop();
                self.list_indent_stack.pop();
                self.pending_list_indent = None;
            }
            TagEnd::Item => {
                self.flush_current_spans();
                self.pending_list_indent = None;
            }
            TagEnd::CodeBlock => self.finalize_code_block(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.style_stack.pop();
            }
            TagEnd::Link | TagEnd::Image => {
                self.style_stack.pop();
                if let Some(link) = self.link_stack.pop() {
                    if !link.url.is_empty() && link.url != link.text {
                        let suffix = format!(" ({})", link.url);
                        self.push_text(suffix, self.theme.md_link_url_style());
                    }
                }
            }
            TagEnd::Table => self.finalize_table(),
            TagEnd::TableHead => {
                if let Some(table) = self.table_renderer.as_mut() {
                    table.end_header();
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table_renderer.as_mut() {
                    table.end_row();
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table_renderer.as_mut() {
                    table.end_cell();
                }
            }
            TagEnd::HtmlBlock => {
                self.flush_current_spans();
                self.push_empty_line();
            }
            _ => {}
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack
            .last()
            .copied()
            .unwrap_or(self.theme.ai_text_style)
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn push_text(&mut self, text: String, style: Style) {
        for link in &mut self.link_stack {
            link.text.push_str(&text);
        }
        self.push_span(Span::styled(text, style));
    }

    fn push_span(&mut self, span: Span<'static>) {
        if let Some(table) = self.table_renderer.as_mut() {
            table.add_span(span);
            return;
        }
        if self.current_spans.is_empty() {
            if let Some(indent) = self.pending_list_indent.take() {
                if indent > 0 {
                    self.current_spans.push(Span::raw(" ".repeat(indent)));
                }
            }
        }
        self.current_spans.push(span);
    }

    /// After a hard break inside a list item, continue under the item text.
    fn continue_list_item(&mut self) {
        if !self.list_stack.is_empty() {
            self.pending_list_indent = Some(self.current_list_indent_width());
        }
    }

    fn flush_current_spans(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current_spans);

        let Some(width) = self.config.width else {
            self.push_line(spans);
            return;
        };

        let prefix_width = self.quote_prefix_width();
        let available = width.saturating_sub(prefix_width).max(1);
        let hanging_indent = if self.list_stack.is_empty() {
            0
        } else {
            self.current_list_indent_width()
                .min(MAX_LIST_HANGING_INDENT_WIDTH)
        };
        for segment in wrap_spans(&spans, available, hanging_indent) {
            self.push_line(segment);
        }
    }

    fn quote_prefix_width(&self) -> usize {
        QUOTE_BAR.width() * self.quote_depth
    }

    fn quote_prefix(&self) -> Vec<Span<'static>> {
        (0..self.quote_depth)
            .map(|_| Span::styled(QUOTE_BAR, self.theme.md_blockquote_style()))
            .collect()
    }

    fn push_line(&mut self, spans: Vec<Span<'static>>) {
        let mut full = self.quote_prefix();
        full.extend(spans);
        self.lines.push(Line::from(full));
    }

    fn push_empty_line(&mut self) {
        if self.quote_depth > 0 {
            let prefix = self.quote_prefix();
            self.lines.push(Line::from(prefix));
        } else {
            self.lines.push(Line::default());
        }
    }

    fn push_horizontal_rule(&mut self) {
        let available = self
            .config
            .width
            .unwrap_or(80)
            .saturating_sub(self.quote_prefix_width())
            .max(1);
        let rule_width = ((available as f32) * 0.8).round() as usize;
        let rule = "─".repeat(rule_width.clamp(1, available));
        self.push_line(vec![Span::styled(rule, self.theme.md_rule_style())]);
    }

    fn finalize_code_block(&mut self) {
        let Some(language) = self.in_code_block.take() else {
            return;
        };
        let list_indent = self.current_list_indent_width();
        let mut indent = self.quote_prefix();
        if list_indent > 0 {
            indent.push(Span::raw(" ".repeat(list_indent)));
        }
        let block = render_code_block(
            &self.code_block_lines,
            self.config.syntax_highlighting,
            &language,
            self.theme,
            &indent,
        );
        self.lines.extend(block);
        self.code_block_lines.clear();
        self.push_empty_line();
        self.pending_list_indent = (list_indent > 0).then_some(list_indent);
    }

    fn finalize_table(&mut self) {
        let Some(table) = self.table_renderer.take() else {
            return;
        };
        let available = self
            .config
            .width
            .map(|w| w.saturating_sub(self.quote_prefix_width()));
        for line in table.finalize(self.theme, available) {
            self.push_line(line.spans);
        }
        self.push_empty_line();
    }

    fn current_list_indent_width(&self) -> usize {
        self.list_indent_stack.iter().sum()
    }
}

fn is_bare_quote_line(line: &Line<'_>) -> bool {
    line.spans
        .iter()
        .all(|span| span.content.chars().all(|c| c == '│' || c == ' '))
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
