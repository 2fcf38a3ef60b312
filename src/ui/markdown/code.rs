use pulldown_cmark::CodeBlockKind;
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;

pub(super) fn language_hint_from_codeblock_kind(kind: CodeBlockKind) -> String {
    match kind {
        CodeBlockKind::Indented => String::new(),
        CodeBlockKind::Fenced(info) => info.split_ascii_whitespace().next().unwrap_or("").into(),
    }
}

pub(super) fn push_codeblock_text(code_block_lines: &mut Vec<String>, text: &str) {
    for line in text.lines() {
        code_block_lines.push(detab(line));
    }
}

fn plain_codeblock_lines(code_block_lines: &[String], theme: &Theme) -> Vec<Line<'static>> {
    let mut style = theme.md_codeblock_text_style();
    if let Some(bg) = theme.md_codeblock_bg_color() {
        style = style.bg(bg);
    }
    code_block_lines
        .iter()
        .map(|line| Line::from(Span::styled(line.clone(), style)))
        .collect()
}

/// Turn the buffered block into lines, highlighted when enabled and syntect
/// manages it. Every line is prefixed with `indent` (list nesting, quotes).
pub(super) fn render_code_block(
    code_block_lines: &[String],
    syntax_enabled: bool,
    language_hint: &str,
    theme: &Theme,
    indent: &[Span<'static>],
) -> Vec<Line<'static>> {
    if code_block_lines.is_empty() {
        return Vec::new();
    }

    let produced = if syntax_enabled {
        let joined = code_block_lines.join("\n");
        crate::utils::syntax::highlight_code_block(language_hint, &joined, theme)
            .unwrap_or_else(|| plain_codeblock_lines(code_block_lines, theme))
    } else {
        plain_codeblock_lines(code_block_lines, theme)
    };

    produced
        .into_iter()
        .map(|line| {
            let mut spans = indent.to_vec();
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

pub(super) fn detab(s: &str) -> String {
    s.replace('\t', "    ")
}
