use ratatui::style::Modifier;
use ratatui::text::Line;

use super::{render_markdown, MarkdownRenderConfig};
use crate::ui::theme::Theme;
use crate::utils::test_utils::SAMPLE_KUNDLI_MARKDOWN;

fn render(content: &str, width: Option<usize>) -> Vec<Line<'static>> {
    let config = MarkdownRenderConfig {
        width,
        syntax_highlighting: false,
    };
    render_markdown(content, &Theme::dark_default(), &config)
}

fn text(line: &Line<'_>) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
}

fn texts(lines: &[Line<'_>]) -> Vec<String> {
    lines.iter().map(text).collect()
}

#[test]
fn paragraphs_are_separated_by_blank_lines() {
    let lines = render("First house.\n\nSecond house.", None);
    assert_eq!(texts(&lines), vec!["First house.", "", "Second house."]);
}

#[test]
fn soft_breaks_keep_source_lines() {
    let lines = render("Ascendant: Libra\nMoon: Taurus", None);
    assert_eq!(texts(&lines), vec!["Ascendant: Libra", "Moon: Taurus"]);
}

#[test]
fn emphasis_strong_and_strikethrough_carry_modifiers() {
    let lines = render("*soft* **firm** ~~gone~~", None);
    let spans = &lines[0].spans;
    let find = |needle: &str| {
        spans
            .iter()
            .find(|s| s.content == needle)
            .map(|s| s.style.add_modifier)
            .unwrap_or_else(|| panic!("missing span {needle}"))
    };
    assert!(find("soft").contains(Modifier::ITALIC));
    assert!(find("firm").contains(Modifier::BOLD));
    assert!(find("gone").contains(Modifier::CROSSED_OUT));
}

#[test]
fn headings_use_heading_style_and_no_hashes() {
    let theme = Theme::dark_default();
    let lines = render("## Planetary positions", None);
    assert_eq!(text(&lines[0]), "Planetary positions");
    assert_eq!(lines[0].spans[0].style, theme.md_heading_style(2));
}

#[test]
fn inline_code_is_styled() {
    let theme = Theme::dark_default();
    let lines = render("Use `lahiri` ayanamsha", None);
    let code = lines[0]
        .spans
        .iter()
        .find(|s| s.content == "lahiri")
        .expect("inline code span");
    assert_eq!(code.style, theme.md_inline_code_style());
}

#[test]
fn links_show_their_target() {
    let lines = render("See [the chart](https://example.com/chart).", None);
    assert_eq!(
        text(&lines[0]),
        "See the chart (https://example.com/chart)."
    );
}

#[test]
fn autolinks_are_not_repeated() {
    let lines = render("<https://example.com>", None);
    assert_eq!(text(&lines[0]), "https://example.com");
}

#[test]
fn lists_get_markers_and_numbering() {
    let lines = render("- Sun\n- Moon\n\n3. Mars\n4. Venus", None);
    assert_eq!(
        texts(&lines),
        vec!["- Sun", "- Moon", "", "3. Mars", "4. Venus"]
    );
}

#[test]
fn nested_lists_indent_under_parent_text() {
    let lines = render("- Grahas\n  - Rahu\n  - Ketu", None);
    assert_eq!(texts(&lines), vec!["- Grahas", "  - Rahu", "  - Ketu"]);
}

#[test]
fn wrapped_list_items_hang_under_their_text() {
    let lines = render("- Jupiter aspects the seventh house", Some(16));
    assert_eq!(
        texts(&lines),
        vec!["- Jupiter", "  aspects the", "  seventh house"]
    );
}

#[test]
fn task_list_markers_render() {
    let lines = render("- [x] Birth time\n- [ ] Birth place", None);
    assert_eq!(texts(&lines), vec!["- [x] Birth time", "- [ ] Birth place"]);
}

#[test]
fn block_quotes_are_barred() {
    let lines = render("> Mahadasha of Venus\n\nAfter", None);
    assert_eq!(texts(&lines), vec!["│ Mahadasha of Venus", "", "After"]);
}

#[test]
fn code_blocks_keep_lines_verbatim() {
    let lines = render("```\nlet x = 1;\n\tindented\n```\nafter", None);
    assert_eq!(
        texts(&lines),
        vec!["let x = 1;", "    indented", "", "after"]
    );
}

#[test]
fn highlighted_code_blocks_keep_text() {
    let config = MarkdownRenderConfig {
        width: Some(80),
        syntax_highlighting: true,
    };
    let lines = render_markdown(
        "```json\n{\"nakshatra\": \"Rohini\"}\n```",
        &Theme::dark_default(),
        &config,
    );
    assert_eq!(text(&lines[0]), "{\"nakshatra\": \"Rohini\"}");
}

#[test]
fn rules_span_most_of_the_width() {
    let lines = render("above\n\n---\n\nbelow", Some(10));
    assert_eq!(text(&lines[2]), "─".repeat(8));
}

#[test]
fn raw_html_is_shown_as_text() {
    let lines = render("<div>note</div>", None);
    assert_eq!(text(&lines[0]), "<div>note</div>");
    let inline = render("a <span>b</span>", None);
    assert_eq!(text(&inline[0]), "a <span>b</span>");
}

#[test]
fn tables_get_borders_and_highlighted_header() {
    let theme = Theme::dark_default();
    let lines = render("| Planet | House |\n|---|---:|\n| Sun | 9 |", Some(80));
    assert_eq!(
        texts(&lines),
        vec![
            "┌────────┬───────┐",
            "│ Planet │ House │",
            "├────────┼───────┤",
            "│ Sun    │     9 │",
            "└────────┴───────┘",
        ]
    );
    let header = lines[1]
        .spans
        .iter()
        .find(|s| s.content == "Planet")
        .expect("header cell");
    assert!(header.style.add_modifier.contains(Modifier::BOLD));
    assert_eq!(header.style.fg, theme.md_table_header_style().fg);
}

#[test]
fn narrow_tables_wrap_cells_inside_borders() {
    let lines = render(
        "| Sign | Meaning |\n|---|---|\n| Leo | royal and generous |",
        Some(20),
    );
    let widths: Vec<usize> = lines.iter().map(|l| l.width()).collect();
    assert!(widths.iter().all(|w| *w <= 20), "{widths:?}");
    assert!(lines.len() > 5);
}

#[test]
fn lines_respect_width() {
    let lines = render(SAMPLE_KUNDLI_MARKDOWN, Some(30));
    for line in &lines {
        assert!(line.width() <= 30, "too wide: {:?}", text(line));
    }
}

#[test]
fn every_prefix_renders_without_panicking() {
    for (idx, _) in SAMPLE_KUNDLI_MARKDOWN.char_indices() {
        let prefix = &SAMPLE_KUNDLI_MARKDOWN[..idx];
        let _ = render(prefix, Some(24));
    }
}

#[test]
fn unterminated_markup_renders_literally() {
    let lines = render("**Saturn", None);
    assert_eq!(text(&lines[0]), "**Saturn");
    let open_fence = render("```\npartial code", None);
    assert_eq!(text(&open_fence[0]), "partial code");
}

#[test]
fn empty_input_renders_nothing() {
    assert!(render("", Some(40)).is_empty());
    assert!(render("\n\n", Some(40)).is_empty());
}
