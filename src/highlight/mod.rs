//! Syntax highlighting as a line styler.
//!
//! Uses syntect for highlighting with Sublime Text syntax definitions.

use std::cell::RefCell;
use std::sync::{Mutex, OnceLock};

use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::style::markup::PageTheme;
use crate::style::{LineStyleEvent, LineStyler, Rgb, StyleRange};

/// Line styler that highlights console text as source code.
///
/// Parse state carries over from one completed line to the next, so lines
/// must arrive in buffer order. The buffer calls [`LineStyler::reset`] before
/// restyling from the top, which starts a fresh parse.
pub struct SyntaxStyler {
    language: String,
    highlighter: RefCell<HighlightLines<'static>>,
    mode: BackgroundMode,
}

impl SyntaxStyler {
    /// Styler for `language` (file extension token or syntax name).
    ///
    /// Returns `None` for unknown languages.
    pub fn for_language(language: &str) -> Option<Self> {
        let syntax = find_syntax(language)?;
        Some(Self {
            language: language.to_string(),
            highlighter: RefCell::new(HighlightLines::new(syntax, theme())),
            mode: background_mode(),
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl std::fmt::Debug for SyntaxStyler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxStyler")
            .field("language", &self.language)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl LineStyler for SyntaxStyler {
    fn style_line(&self, event: &LineStyleEvent<'_>) -> Vec<StyleRange> {
        let _scope = crate::perf::scope("highlight.style_line");
        let line = format!("{}\n", event.line_text);
        let Ok(mut highlighter) = self.highlighter.try_borrow_mut() else {
            return Vec::new();
        };
        let regions = highlighter
            .highlight_line(&line, syntax_set())
            .unwrap_or_default();

        let mut ranges = Vec::new();
        let mut offset = 0;
        for (style, text) in regions {
            let visible = text.trim_end_matches('\n').chars().count();
            if visible > 0 {
                let fg = Rgb::new(style.foreground.r, style.foreground.g, style.foreground.b);
                let mut range =
                    StyleRange::new(offset, visible).fg(adjust_fg_for_background(fg, self.mode));
                if style.font_style.contains(FontStyle::BOLD) {
                    range = range.bold();
                }
                if style.font_style.contains(FontStyle::UNDERLINE) {
                    range = range.underline();
                }
                ranges.push(range);
            }
            offset += text.chars().count();
        }
        ranges
    }

    /// Drop parse state so the next line is highlighted as a file start.
    fn reset(&self) {
        let Some(syntax) = find_syntax(&self.language) else {
            return;
        };
        if let Ok(mut highlighter) = self.highlighter.try_borrow_mut() {
            *highlighter = HighlightLines::new(syntax, theme());
        }
    }
}

fn find_syntax(language: &str) -> Option<&'static SyntaxReference> {
    let syntax_set = syntax_set();
    syntax_set
        .find_syntax_by_token(language)
        .or_else(|| syntax_set.find_syntax_by_name(language))
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(|| {
        let _scope = crate::perf::scope("highlight.syntax_set.load_defaults");
        SyntaxSet::load_defaults_newlines()
    })
}

fn theme() -> &'static Theme {
    static THEME: OnceLock<Theme> = OnceLock::new();
    THEME.get_or_init(|| {
        let _scope = crate::perf::scope("highlight.theme.load_defaults");
        let theme_set = ThemeSet::load_defaults();
        let mode = background_mode();
        let preferred = match mode {
            BackgroundMode::Dark => [
                "Monokai Extended",
                "Monokai Extended Bright",
                "Dracula",
                "Solarized (dark)",
                "base16-ocean.dark",
            ]
            .as_slice(),
            BackgroundMode::Light => [
                "InspiredGitHub",
                "Solarized (light)",
                "base16-ocean.light",
            ]
            .as_slice(),
        };

        for name in preferred {
            if let Some(theme) = theme_set.themes.get(*name) {
                return theme.clone();
            }
        }

        theme_set
            .themes
            .values()
            .next()
            .cloned()
            .unwrap_or_default()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackgroundMode {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightBackground {
    Light,
    Dark,
}

static BACKGROUND_OVERRIDE: OnceLock<Mutex<Option<HighlightBackground>>> = OnceLock::new();

pub fn set_background_mode(mode: Option<HighlightBackground>) {
    let lock = BACKGROUND_OVERRIDE.get_or_init(|| Mutex::new(None));
    if let Ok(mut guard) = lock.lock() {
        *guard = mode;
    }
}

/// Page theme matching the effective background.
pub fn page_theme() -> PageTheme {
    match background_mode() {
        BackgroundMode::Dark => PageTheme::Dark,
        BackgroundMode::Light => PageTheme::Light,
    }
}

fn background_mode() -> BackgroundMode {
    let lock = BACKGROUND_OVERRIDE.get_or_init(|| Mutex::new(None));
    if let Ok(guard) = lock.lock() {
        if let Some(mode) = *guard {
            return match mode {
                HighlightBackground::Light => BackgroundMode::Light,
                HighlightBackground::Dark => BackgroundMode::Dark,
            };
        }
    }
    background_mode_from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
}

fn background_mode_from_colorfgbg(colorfgbg: Option<&str>) -> BackgroundMode {
    let Some(value) = colorfgbg else {
        return BackgroundMode::Dark;
    };
    let bg_str = value.rsplit(';').next().unwrap_or(value);
    let Ok(bg) = bg_str.parse::<u8>() else {
        return BackgroundMode::Dark;
    };

    if bg >= 7 {
        BackgroundMode::Light
    } else {
        BackgroundMode::Dark
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn adjust_fg_for_background(color: Rgb, mode: BackgroundMode) -> Rgb {
    match mode {
        BackgroundMode::Dark => color,
        BackgroundMode::Light => {
            if color.luma() < 155.0 {
                return color;
            }
            let darken = |c: u8| (f32::from(c) * 0.42).round() as u8;
            Rgb::new(darken(color.r), darken(color.g), darken(color.b))
        }
    }
}
