use pulldown_cmark::Alignment;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::ui::layout::wrap_spans;
use crate::ui::theme::Theme;

type TableCell = Vec<Vec<Span<'static>>>;

const MIN_COL_WIDTH: usize = 3;

/// Collects table events and draws the table with box borders once it ends.
pub(super) struct TableRenderer {
    alignments: Vec<Alignment>,
    rows: Vec<Vec<TableCell>>,
    current_row: Vec<TableCell>,
    current_cell: TableCell,
    header_rows: usize,
    in_header: bool,
}

impl TableRenderer {
    pub(super) fn new(alignments: Vec<Alignment>) -> Self {
        Self {
            alignments,
            rows: Vec::new(),
            current_row: Vec::new(),
            current_cell: vec![Vec::new()],
            header_rows: 0,
            in_header: false,
        }
    }

    pub(super) fn start_header(&mut self) {
        self.in_header = true;
    }

    pub(super) fn end_header(&mut self) {
        self.in_header = false;
        // The header row has no TableRow wrapper.
        if !self.current_row.is_empty() {
            self.rows.push(std::mem::take(&mut self.current_row));
            self.header_rows = self.rows.len();
        }
    }

    pub(super) fn end_row(&mut self) {
        if !self.current_row.is_empty() {
            self.rows.push(std::mem::take(&mut self.current_row));
            if self.in_header {
                self.header_rows = self.rows.len();
            }
        }
    }

    pub(super) fn start_cell(&mut self) {
        self.current_cell = vec![Vec::new()];
    }

    pub(super) fn end_cell(&mut self) {
        self.current_row.push(std::mem::take(&mut self.current_cell));
    }

    pub(super) fn add_span(&mut self, span: Span<'static>) {
        if self.current_cell.is_empty() {
            self.current_cell.push(Vec::new());
        }
        if let Some(line) = self.current_cell.last_mut() {
            line.push(span);
        }
    }

    pub(super) fn new_line_in_cell(&mut self) {
        self.current_cell.push(Vec::new());
    }

    /// Draw the table. Rows still open (a reply cut mid-table) are included.
    pub(super) fn finalize(mut self, theme: &Theme, width: Option<usize>) -> Vec<Line<'static>> {
        if self.current_cell.iter().any(|l| !l.is_empty()) {
            let cell = std::mem::take(&mut self.current_cell);
            self.current_row.push(cell);
        }
        if !self.current_row.is_empty() {
            self.rows.push(std::mem::take(&mut self.current_row));
        }
        if self.rows.is_empty() {
            return Vec::new();
        }

        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let natural = self.natural_widths(columns);
        let widths = fit_widths(&natural, width);
        let border = theme.md_table_border_style();

        let mut lines = vec![border_line("┌", "┬", "┐", &widths, border)];
        for (index, row) in self.rows.iter().enumerate() {
            let is_header = index < self.header_rows;
            let style = if is_header {
                Some(theme.md_table_header_style())
            } else {
                None
            };
            lines.extend(self.row_lines(row, &widths, border, style));
            if is_header && index + 1 == self.header_rows && self.rows.len() > self.header_rows {
                lines.push(border_line("├", "┼", "┤", &widths, border));
            }
        }
        lines.push(border_line("└", "┴", "┘", &widths, border));
        lines
    }

    fn natural_widths(&self, columns: usize) -> Vec<usize> {
        let mut widths = vec![MIN_COL_WIDTH; columns];
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                let cell_width = cell.iter().map(|l| spans_width(l)).max().unwrap_or(0);
                widths[i] = widths[i].max(cell_width);
            }
        }
        widths
    }

    fn row_lines(
        &self,
        row: &[TableCell],
        widths: &[usize],
        border: Style,
        header_style: Option<Style>,
    ) -> Vec<Line<'static>> {
        let wrapped: Vec<Vec<Vec<Span<'static>>>> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let Some(cell) = row.get(i) else {
                    return vec![Vec::new()];
                };
                cell.iter()
                    .flat_map(|line| {
                        let styled: Vec<Span<'static>> = line
                            .iter()
                            .map(|span| match header_style {
                                Some(style) => span.clone().patch_style(style),
                                None => span.clone(),
                            })
                            .collect();
                        wrap_spans(&styled, w, 0)
                    })
                    .collect()
            })
            .collect();

        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        (0..height)
            .map(|line_idx| {
                let mut spans = Vec::new();
                for (col, &w) in widths.iter().enumerate() {
                    spans.push(Span::styled(if col == 0 { "│ " } else { " │ " }, border));
                    let content = wrapped[col].get(line_idx).cloned().unwrap_or_default();
                    let used = spans_width(&content);
                    let pad = w.saturating_sub(used);
                    let (left, right) = match self.alignments.get(col) {
                        Some(Alignment::Right) => (pad, 0),
                        Some(Alignment::Center) => (pad / 2, pad - pad / 2),
                        _ => (0, pad),
                    };
                    let pad_style = header_style.unwrap_or_default();
                    if left > 0 {
                        spans.push(Span::styled(" ".repeat(left), pad_style));
                    }
                    spans.extend(content);
                    if right > 0 {
                        spans.push(Span::styled(" ".repeat(right), pad_style));
                    }
                }
                spans.push(Span::styled(" │", border));
                Line::from(spans)
            })
            .collect()
    }
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|s| s.content.width()).sum()
}

/// Shrink the widest columns until the table fits, never below
/// [`MIN_COL_WIDTH`].
fn fit_widths(natural: &[usize], available: Option<usize>) -> Vec<usize> {
    let mut widths = natural.to_vec();
    let Some(available) = available else {
        return widths;
    };
    // "│ " + " │ " between columns + " │"
    let overhead = 3 * widths.len() + 1;
    let budget = available.saturating_sub(overhead);
    while widths.iter().sum::<usize>() > budget {
        let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
            break;
        };
        if widest <= MIN_COL_WIDTH {
            break;
        }
        widths[idx] = widest - 1;
    }
    widths
}

fn border_line(
    left: &str,
    mid: &str,
    right: &str,
    widths: &[usize],
    style: Style,
) -> Line<'static> {
    let mut text = String::from(left);
    for (i, w) in widths.iter().enumerate() {
        if i > 0 {
            text.push_str(mid);
        }
        text.push_str(&"─".repeat(w + 2));
    }
    text.push_str(right);
    Line::from(Span::styled(text, style))
}
