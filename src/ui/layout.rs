use std::collections::HashMap;

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use super::markdown::{render_markdown, MarkdownRenderConfig};
use super::theme::Theme;
use crate::core::message::{MessageId, Sender};

pub const TYPING_CURSOR: &str = "▌";

/// Wrap styled spans to `width` columns at word boundaries.
///
/// Whitespace that lands on a break is dropped. Words wider than a whole line
/// are split on grapheme boundaries. Continuation lines start with
/// `continuation_indent` spaces.
pub fn wrap_spans(
    spans: &[Span<'static>],
    width: usize,
    continuation_indent: usize,
) -> Vec<Vec<Span<'static>>> {
    let width = width.max(1);
    let indent = continuation_indent.min(width.saturating_sub(1));
    let mut wrapper = Wrapper {
        width,
        indent,
        lines: Vec::new(),
        current: Vec::new(),
        current_width: 0,
        pending_space: None,
    };

    for span in spans {
        for token in split_words(span.content.as_ref()) {
            if token.chars().all(char::is_whitespace) {
                wrapper.push_space(token, span.style);
            } else {
                wrapper.push_word(token, span.style);
            }
        }
    }
    wrapper.finish()
}

struct Wrapper {
    width: usize,
    indent: usize,
    lines: Vec<Vec<Span<'static>>>,
    current: Vec<Span<'static>>,
    current_width: usize,
    pending_space: Option<(String, Style)>,
}

impl Wrapper {
    fn at_line_start(&self) -> bool {
        self.current.is_empty()
    }

    fn push_space(&mut self, token: &str, style: Style) {
        // Leading whitespace on the first line is significant (list indents).
        if self.at_line_start() && self.lines.is_empty() {
            self.current_width += token.width();
            self.current.push(Span::styled(token.to_string(), style));
            return;
        }
        if self.at_line_start() {
            return;
        }
        match self.pending_space.as_mut() {
            Some((text, _)) => text.push_str(token),
            None => self.pending_space = Some((token.to_string(), style)),
        }
    }

    fn push_word(&mut self, word: &str, style: Style) {
        let word_width = word.width();
        let space_width = self
            .pending_space
            .as_ref()
            .map(|(s, _)| s.width())
            .unwrap_or(0);

        if self.current_width + space_width + word_width <= self.width {
            if let Some((space, space_style)) = self.pending_space.take() {
                self.current.push(Span::styled(space, space_style));
                self.current_width += space_width;
            }
            self.current.push(Span::styled(word.to_string(), style));
            self.current_width += word_width;
            return;
        }

        self.pending_space = None;
        if self.current_width > self.line_origin() {
            self.break_line();
        }

        let mut rest = word;
        while !rest.is_empty() {
            let available = self.width.saturating_sub(self.current_width).max(1);
            let (head, tail) = match split_at_width(rest, available) {
                ("", _) if self.current_width <= self.line_origin() => split_first_grapheme(rest),
                ("", _) => {
                    self.break_line();
                    continue;
                }
                split => split,
            };
            self.current_width += head.width();
            self.current.push(Span::styled(head.to_string(), style));
            rest = tail;
            if !rest.is_empty() {
                self.break_line();
            }
        }
    }

    fn line_origin(&self) -> usize {
        if self.lines.is_empty() {
            0
        } else {
            self.indent
        }
    }

    fn break_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.current));
        self.current_width = 0;
        if self.indent > 0 {
            self.current.push(Span::raw(" ".repeat(self.indent)));
            self.current_width = self.indent;
        }
    }

    fn finish(mut self) -> Vec<Vec<Span<'static>>> {
        let has_content = self.lines.is_empty() || self.current_width > self.indent;
        if !self.current.is_empty() && has_content {
            self.lines.push(self.current);
        }
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        self.lines
    }
}

/// Split into alternating runs of whitespace and non-whitespace.
fn split_words(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Longest grapheme prefix of `text` that fits in `width` columns.
fn split_at_width(text: &str, width: usize) -> (&str, &str) {
    let mut used = 0;
    let mut end = 0;
    for (idx, grapheme) in text.grapheme_indices(true) {
        let w = grapheme.width();
        if used + w > width {
            break;
        }
        used += w;
        end = idx + grapheme.len();
    }
    text.split_at(end)
}

fn split_first_grapheme(text: &str) -> (&str, &str) {
    let end = text.graphemes(true).next().map(str::len).unwrap_or(text.len());
    text.split_at(end)
}

/// One message as the messages pane should show it right now.
#[derive(Debug, Clone)]
pub struct MessageView<'a> {
    pub id: &'a MessageId,
    pub sender: Sender,
    /// Visible text; a prefix of the message while it is being revealed.
    pub text: &'a str,
    pub typing: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutConfig {
    pub width: usize,
    pub markdown_enabled: bool,
    pub syntax_enabled: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 80,
            markdown_enabled: true,
            syntax_enabled: true,
        }
    }
}

#[derive(Clone)]
struct CachedMessage {
    text_len: usize,
    typing: bool,
    width: usize,
    lines: Vec<Line<'static>>,
}

/// Lays out messages into wrapped lines, reusing output for messages whose
/// visible text and width have not changed since the last frame.
#[derive(Default)]
pub struct LayoutEngine {
    cache: HashMap<MessageId, CachedMessage>,
    config_key: Option<(bool, bool)>,
}

impl LayoutEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    pub fn layout_messages(
        &mut self,
        messages: &[MessageView<'_>],
        theme: &Theme,
        cfg: &LayoutConfig,
    ) -> Vec<Line<'static>> {
        let key = (cfg.markdown_enabled, cfg.syntax_enabled);
        if self.config_key != Some(key) {
            self.cache.clear();
            self.config_key = Some(key);
        }
        self.cache.retain(|id, _| messages.iter().any(|m| m.id == id));

        let mut lines = Vec::new();
        for view in messages {
            let fresh = match self.cache.get(view.id) {
                Some(hit)
                    if hit.text_len == view.text.len()
                        && hit.typing == view.typing
                        && hit.width == cfg.width =>
                {
                    None
                }
                _ => Some(layout_message(view, theme, cfg)),
            };
            if let Some(lines) = fresh {
                self.cache.insert(
                    view.id.clone(),
                    CachedMessage {
                        text_len: view.text.len(),
                        typing: view.typing,
                        width: cfg.width,
                        lines,
                    },
                );
            }
            let Some(cached) = self.cache.get(view.id) else {
                continue;
            };
            lines.extend(cached.lines.iter().cloned());
        }
        lines
    }
}

/// Render one message: a label line, the body, and a blank separator.
pub fn layout_message(
    view: &MessageView<'_>,
    theme: &Theme,
    cfg: &LayoutConfig,
) -> Vec<Line<'static>> {
    let (label_style, text_style) = match view.sender {
        Sender::User => (theme.user_prefix_style, theme.user_text_style),
        Sender::Ai => (theme.ai_prefix_style, theme.ai_text_style),
    };
    let mut lines = vec![Line::from(Span::styled(view.sender.label(), label_style))];

    let mut body = if view.sender == Sender::Ai && cfg.markdown_enabled {
        let config = MarkdownRenderConfig {
            width: Some(cfg.width),
            syntax_highlighting: cfg.syntax_enabled,
        };
        render_markdown(view.text, theme, &config)
    } else {
        plain_lines(view.text, text_style, cfg.width)
    };

    while body.last().is_some_and(|l| l.width() == 0) {
        body.pop();
    }
    if view.typing {
        let cursor = Span::styled(TYPING_CURSOR, theme.typing_cursor_style);
        match body.last_mut() {
            Some(last) if last.width() < cfg.width => last.spans.push(cursor),
            _ => body.push(Line::from(cursor)),
        }
    }

    lines.extend(body);
    lines.push(Line::default());
    lines
}

fn plain_lines(text: &str, style: Style, width: usize) -> Vec<Line<'static>> {
    text.lines()
        .flat_map(|raw| {
            let span = Span::styled(raw.replace('\t', "    "), style);
            wrap_spans(&[span], width, 0)
        })
        .map(Line::from)
        .collect()
}
