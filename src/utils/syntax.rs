//! Syntect highlighting for fenced code blocks in AI replies.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, OnceLock};

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::ui::theme::Theme;

const CACHE_CAPACITY: usize = 64;

type CacheKey = (String, u64);

/// Bounded FIFO of highlighted blocks. Typing animations re-render the same
/// block many times, so hits are the common case.
struct HighlightCache {
    map: HashMap<CacheKey, Vec<Line<'static>>>,
    order: VecDeque<CacheKey>,
    cap: usize,
}

impl HighlightCache {
    fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Vec<Line<'static>>> {
        self.map.get(key).cloned()
    }

    fn put(&mut self, key: CacheKey, lines: Vec<Line<'static>>) {
        if self.map.insert(key.clone(), lines).is_none() {
            self.order.push_back(key);
        }
        while self.map.len() > self.cap {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

fn cache() -> MutexGuard<'static, HighlightCache> {
    static CACHE: OnceLock<Mutex<HighlightCache>> = OnceLock::new();
    CACHE
        .get_or_init(|| Mutex::new(HighlightCache::new(CACHE_CAPACITY)))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme_set() -> &'static ThemeSet {
    static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

fn hash_code(lang: &str, code: &str, theme_sig: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    theme_sig.hash(&mut hasher);
    hasher.finish()
}

fn is_dark_background(color: &Color) -> bool {
    match color {
        Color::Rgb(r, g, b) => {
            let luma = 0.2126 * (*r as f32) + 0.7152 * (*g as f32) + 0.0722 * (*b as f32);
            luma < 128.0
        }
        Color::White => false,
        _ => true,
    }
}

fn normalize_lang_hint(hint: &str) -> String {
    let lowered = hint.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "py" | "python" => "python".into(),
        "bash" | "sh" | "zsh" | "shell" | "console" => "bash".into(),
        "js" | "javascript" | "jsx" => "javascript".into(),
        "ts" | "tsx" | "typescript" => "typescript".into(),
        "yaml" | "yml" => "yaml".into(),
        "rust" | "rs" => "rust".into(),
        "md" | "markdown" => "markdown".into(),
        "txt" | "text" | "plain" => "txt".into(),
        other => other.into(),
    }
}

pub(crate) fn pick_syntect_theme_name(theme: &Theme) -> &'static str {
    if is_dark_background(&theme.background_color) {
        "base16-ocean.dark"
    } else {
        "InspiredGitHub"
    }
}

pub(crate) fn theme_signature(theme: &Theme, syntect_theme: &str) -> String {
    format!(
        "{}|{:?}|{:?}",
        syntect_theme,
        theme.md_codeblock_bg_color(),
        theme.background_color
    )
}

/// Highlight `code` as `lang_hint`. Unknown languages fall back to plain
/// text; `None` means syntect could not highlight at all and the caller
/// should render the block unstyled.
pub fn highlight_code_block(
    lang_hint: &str,
    code: &str,
    theme: &Theme,
) -> Option<Vec<Line<'static>>> {
    let lang = normalize_lang_hint(lang_hint);
    let theme_name = pick_syntect_theme_name(theme);
    let key = (
        lang.clone(),
        hash_code(&lang, code, &theme_signature(theme, theme_name)),
    );
    if let Some(lines) = cache().get(&key) {
        return Some(lines);
    }

    let ps = syntax_set();
    let ts = theme_set();
    let syn_theme = ts
        .themes
        .get(theme_name)
        .or_else(|| ts.themes.get("base16-ocean.dark"))?;
    let syntax = ps
        .find_syntax_by_token(&lang)
        .unwrap_or_else(|| ps.find_syntax_plain_text());

    let mut highlighter = HighlightLines::new(syntax, syn_theme);
    let bg = theme.md_codeblock_bg_color();

    let mut out = Vec::new();
    for line in LinesWithEndings::from(code) {
        let ranges = highlighter.highlight_line(line, ps).ok()?;
        let spans: Vec<Span<'static>> = ranges
            .into_iter()
            .filter_map(|(style, text)| {
                let text = text.strip_suffix('\n').unwrap_or(text);
                let text = text.strip_suffix('\r').unwrap_or(text);
                if text.is_empty() {
                    return None;
                }
                let fg = style.foreground;
                let mut st = Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b));
                if let Some(bg) = bg {
                    st = st.bg(bg);
                }
                Some(Span::styled(text.to_string(), st))
            })
            .collect();
        out.push(Line::from(spans));
    }

    cache().put(key, out.clone());
    Some(out)
}
