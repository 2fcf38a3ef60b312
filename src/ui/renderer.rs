use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::ui::chat_loop::ChatView;

const MAX_INPUT_LINES: u16 = 6;

pub fn ui(f: &mut Frame, view: &mut ChatView) {
    let theme = view.theme().clone();
    f.render_widget(
        Block::default().style(Style::default().bg(theme.background_color)),
        f.area(),
    );

    let input_lines = (view.textarea().lines().len() as u16).clamp(1, MAX_INPUT_LINES);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(input_lines + 2), // +2 for borders
        ])
        .split(f.area());

    let session = view.conversation().session().id.to_string();
    let short_session: String = session.chars().take(8).collect();
    let title = Line::from(vec![
        Span::styled(
            format!("Nakshatra v{}", env!("CARGO_PKG_VERSION")),
            theme.title_style,
        ),
        Span::styled(format!(" • session {short_session}"), theme.system_text_style),
    ]);
    f.render_widget(Paragraph::new(title), chunks[0]);

    let pane = chunks[1];
    let lines = view.transcript_lines(pane.width as usize);
    let offset = view.scroll_offset(lines.len(), pane.height as usize);
    let offset = u16::try_from(offset).unwrap_or(u16::MAX);
    let messages = Paragraph::new(lines).scroll((offset, 0));
    f.render_widget(messages, pane);

    let input_title = if view.is_loading() {
        "Waiting for the stars (Alt+Enter for new line, Esc to skip typing, Ctrl+C to quit)"
    } else {
        "Ask about your chart (Alt+Enter for new line, PgUp/PgDn to scroll, Ctrl+C to quit)"
    };
    let mut textarea = view.textarea().clone();
    textarea.set_block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.input_border_style)
            .title(Span::styled(input_title, theme.input_title_style)),
    );
    f.render_widget(&textarea, chunks[2]);
}
