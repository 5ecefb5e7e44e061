use std::sync::OnceLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::log::Logs;

/// Language every code block is tagged with
pub const CODE_LANGUAGE: &str = "python";

const THEME_NAME: &str = "base16-ocean.dark";

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

fn get_theme() -> Option<&'static Theme> {
    let themes = &get_theme_set().themes;
    themes.get(THEME_NAME).or_else(|| themes.values().next())
}

/// A run of source text sharing one foreground color
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub rgb: (u8, u8, u8),
}

pub type HighlightedLine = Vec<Fragment>;

const PLAIN: (u8, u8, u8) = (0xc0, 0xc5, 0xce);

/// Split `source` into lines of colored fragments.
///
/// Concatenating the fragments of every line (joined by newlines) gives back
/// `source` unchanged.
pub fn highlight(source: &str, language: &str) -> Vec<HighlightedLine> {
    let ps = get_syntax_set();
    let Some(theme) = get_theme() else {
        return plain_lines(source);
    };
    let syntax = ps
        .find_syntax_by_token(language)
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut h = HighlightLines::new(syntax, theme);

    let mut lines = Vec::new();
    for line in LinesWithEndings::from(source) {
        let fragments = match h.highlight_line(line, ps) {
            Ok(ranges) => ranges
                .into_iter()
                .map(|(style, text)| Fragment {
                    text: text.to_string(),
                    rgb: (style.foreground.r, style.foreground.g, style.foreground.b),
                })
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "highlighting failed, falling back to plain text");
                vec![Fragment {
                    text: line.to_string(),
                    rgb: PLAIN,
                }]
            }
        };
        lines.push(strip_line_ending(fragments));
    }
    lines
}

fn plain_lines(source: &str) -> Vec<HighlightedLine> {
    source
        .lines()
        .map(|line| {
            vec![Fragment {
                text: line.to_string(),
                rgb: PLAIN,
            }]
        })
        .collect()
}

fn strip_line_ending(mut fragments: Vec<Fragment>) -> HighlightedLine {
    for fragment in fragments.iter_mut().rev() {
        let trimmed = fragment.text.trim_end_matches(['\n', '\r']).len();
        let had_ending = trimmed != fragment.text.len();
        fragment.text.truncate(trimmed);
        if !had_ending && !fragment.text.is_empty() {
            break;
        }
    }
    fragments.retain(|fragment| !fragment.text.is_empty());
    fragments
}

/// Re-highlight every code block in every log.
///
/// This is a whole-document pass, not incremental: each call costs as much as
/// the total number of code blocks currently visible. Returns that number.
pub fn highlight_all(logs: &mut Logs) -> usize {
    let mut count = 0;
    for log in logs.iter_mut() {
        for block in log.code_blocks_mut() {
            block.highlighted = Some(highlight(&block.source, block.language));
            count += 1;
        }
    }
    count
}
