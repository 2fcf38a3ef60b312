use ratatui::style::{Color, Modifier, Style};

/// Names accepted by [`Theme::from_name`], in the order `nakshatra set theme`
/// lists them.
pub const THEME_NAMES: &[&str] = &["dark", "light", "monochrome"];

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,
    // Chat message styles
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub ai_prefix_style: Style,
    pub ai_text_style: Style,
    pub system_text_style: Style,

    // Chrome
    pub title_style: Style,
    pub typing_indicator_style: Style,
    pub typing_cursor_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_cursor_style: Style,
    pub input_cursor_line_style: Style,

    // Markdown
    pub md_heading_color: Color,
    pub md_link_color: Color,
    pub md_inline_code_color: Color,
    pub md_quote_color: Color,
    pub md_marker_color: Color,
    pub md_codeblock_bg: Option<Color>,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Rgb(16, 14, 30),
            user_prefix_style: Style::default()
                .fg(Color::Rgb(122, 162, 247))
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Rgb(192, 202, 245)),
            ai_prefix_style: Style::default()
                .fg(Color::Rgb(224, 175, 104))
                .add_modifier(Modifier::BOLD),
            ai_text_style: Style::default().fg(Color::Rgb(220, 220, 230)),
            system_text_style: Style::default().fg(Color::DarkGray),

            title_style: Style::default()
                .fg(Color::Rgb(224, 175, 104))
                .add_modifier(Modifier::BOLD),
            typing_indicator_style: Style::default()
                .fg(Color::Rgb(187, 154, 247))
                .add_modifier(Modifier::ITALIC),
            typing_cursor_style: Style::default().fg(Color::Rgb(224, 175, 104)),
            input_border_style: Style::default().fg(Color::Rgb(86, 95, 137)),
            input_title_style: Style::default().fg(Color::Gray),

            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            input_cursor_line_style: Style::default(),

            md_heading_color: Color::Rgb(224, 175, 104),
            md_link_color: Color::Rgb(125, 207, 255),
            md_inline_code_color: Color::Rgb(158, 206, 106),
            md_quote_color: Color::Rgb(169, 177, 214),
            md_marker_color: Color::Rgb(187, 154, 247),
            md_codeblock_bg: Some(Color::Rgb(30, 28, 48)),
        }
    }

    pub fn light() -> Self {
        Theme {
            background_color: Color::Rgb(250, 247, 240),
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Rgb(30, 50, 110)),
            ai_prefix_style: Style::default()
                .fg(Color::Rgb(150, 80, 0))
                .add_modifier(Modifier::BOLD),
            ai_text_style: Style::default().fg(Color::Black),
            system_text_style: Style::default().fg(Color::Gray),

            title_style: Style::default()
                .fg(Color::Rgb(150, 80, 0))
                .add_modifier(Modifier::BOLD),
            typing_indicator_style: Style::default()
                .fg(Color::Rgb(120, 60, 160))
                .add_modifier(Modifier::ITALIC),
            typing_cursor_style: Style::default().fg(Color::Rgb(150, 80, 0)),
            input_border_style: Style::default().fg(Color::Black),
            input_title_style: Style::default().fg(Color::DarkGray),

            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
            input_cursor_line_style: Style::default(),

            md_heading_color: Color::Rgb(150, 80, 0),
            md_link_color: Color::Rgb(0, 90, 180),
            md_inline_code_color: Color::Rgb(40, 120, 40),
            md_quote_color: Color::Rgb(90, 90, 110),
            md_marker_color: Color::Rgb(120, 60, 160),
            md_codeblock_bg: Some(Color::Rgb(236, 232, 222)),
        }
    }

    /// Palette-free theme for terminals without color support.
    pub fn monochrome() -> Self {
        let plain = Style::default();
        let bold = plain.add_modifier(Modifier::BOLD);
        Theme {
            background_color: Color::Reset,
            user_prefix_style: bold,
            user_text_style: plain,
            ai_prefix_style: bold,
            ai_text_style: plain,
            system_text_style: plain.add_modifier(Modifier::DIM),

            title_style: bold,
            typing_indicator_style: plain.add_modifier(Modifier::ITALIC),
            typing_cursor_style: plain,
            input_border_style: plain,
            input_title_style: plain,

            input_text_style: plain,
            input_cursor_style: plain.add_modifier(Modifier::REVERSED),
            input_cursor_line_style: plain,

            md_heading_color: Color::Reset,
            md_link_color: Color::Reset,
            md_inline_code_color: Color::Reset,
            md_quote_color: Color::Reset,
            md_marker_color: Color::Reset,
            md_codeblock_bg: None,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "dark" | "default" | "default-dark" => Self::dark_default(),
            "light" => Self::light(),
            "monochrome" | "mono" | "none" => Self::monochrome(),
            // Fallback
            _ => Self::dark_default(),
        }
    }

    pub fn is_known(name: &str) -> bool {
        matches!(
            name.trim().to_ascii_lowercase().as_str(),
            "dark" | "default" | "default-dark" | "light" | "monochrome" | "mono" | "none"
        )
    }

    pub fn md_heading_style(&self, level: u8) -> Style {
        let style = Style::default()
            .fg(self.md_heading_color)
            .add_modifier(Modifier::BOLD);
        match level {
            1 => style.add_modifier(Modifier::UNDERLINED),
            2 => style,
            _ => style.remove_modifier(Modifier::BOLD).add_modifier(Modifier::ITALIC),
        }
    }

    pub fn md_link_style(&self) -> Style {
        Style::default()
            .fg(self.md_link_color)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn md_link_url_style(&self) -> Style {
        Style::default()
            .fg(self.md_link_color)
            .add_modifier(Modifier::DIM)
    }

    pub fn md_inline_code_style(&self) -> Style {
        let style = Style::default().fg(self.md_inline_code_color);
        match self.md_codeblock_bg {
            Some(bg) => style.bg(bg),
            None => style,
        }
    }

    pub fn md_blockquote_style(&self) -> Style {
        Style::default()
            .fg(self.md_quote_color)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn md_list_marker_style(&self) -> Style {
        Style::default().fg(self.md_marker_color)
    }

    pub fn md_rule_style(&self) -> Style {
        Style::default().fg(self.md_marker_color)
    }

    pub fn md_table_border_style(&self) -> Style {
        Style::default().fg(self.md_marker_color)
    }

    pub fn md_table_header_style(&self) -> Style {
        Style::default()
            .fg(self.md_heading_color)
            .add_modifier(Modifier::BOLD)
    }

    pub fn md_codeblock_text_style(&self) -> Style {
        self.ai_text_style
    }

    pub fn md_codeblock_bg_color(&self) -> Option<Color> {
        self.md_codeblock_bg
    }
}
