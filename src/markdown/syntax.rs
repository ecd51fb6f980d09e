//! Syntax Highlighting Module
//!
//! Wraps syntect to turn the text of a code block into a [`HighlightedFragment`]:
//! the original text plus fragment-local color/trait runs. The fragment is a
//! plain value, so it can be produced on a worker thread and merged later.
//!
//! # Example
//! ```ignore
//! use crate::markdown::syntax::get_highlighter;
//!
//! let highlighter = get_highlighter();
//! if let Some(theme) = highlighter.theme("InspiredGitHub", false) {
//!     let fragment = highlighter.highlight("fn main() {}\n", Some("rust"), theme);
//! }
//! ```

use crate::fonts::FontTraits;
use egui::Color32;
use log::{debug, warn};
use std::ops::Range;
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Default dark theme name from syntect's built-in themes
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

/// Default light theme name from syntect's built-in themes
pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";

// ─────────────────────────────────────────────────────────────────────────────
// Highlighted Fragment
// ─────────────────────────────────────────────────────────────────────────────

/// One token run, in byte offsets local to the fragment text.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRun {
    pub range: Range<usize>,
    pub foreground: Color32,
    pub traits: FontTraits,
}

/// Highlighted copy of a code block's text.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightedFragment {
    /// The exact text that was highlighted
    pub text: String,
    pub runs: Vec<HighlightRun>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Syntax Highlighter
// ─────────────────────────────────────────────────────────────────────────────

/// Syntax highlighter that caches syntect sets for performance.
pub struct SyntaxHighlighter {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    /// Load syntect's bundled syntaxes and themes. Expensive; use
    /// [`get_highlighter`] instead of calling this repeatedly.
    pub fn new() -> Self {
        debug!("Loading syntect syntax and theme sets");
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        debug!(
            "Loaded {} syntaxes and {} themes",
            syntax_set.syntaxes().len(),
            theme_set.themes.len()
        );
        Self {
            syntax_set,
            theme_set,
        }
    }

    /// Get available theme names.
    pub fn available_themes(&self) -> Vec<&str> {
        self.theme_set.themes.keys().map(|s| s.as_str()).collect()
    }

    /// Theme by name, falling back to the built-in default for the mode.
    pub fn theme(&self, name: &str, dark_mode: bool) -> Option<&Theme> {
        let fallback = if dark_mode {
            DEFAULT_DARK_THEME
        } else {
            DEFAULT_LIGHT_THEME
        };
        self.theme_set.themes.get(name).or_else(|| {
            debug!("Code theme '{}' not found, using '{}'", name, fallback);
            self.theme_set.themes.get(fallback)
        })
    }

    /// Highlight `code`.
    ///
    /// With a language hint the syntax is looked up by alias, extension, or
    /// name; without one it is guessed from the first line (shebangs, XML
    /// declarations...). Returns `None` if no syntax applies or syntect fails,
    /// in which case the caller keeps the block's plain styling.
    pub fn highlight(
        &self,
        code: &str,
        language: Option<&str>,
        theme: &Theme,
    ) -> Option<HighlightedFragment> {
        let syntax = match language.filter(|l| !l.is_empty()) {
            Some(language) => self.find_syntax_for_language(language),
            None => self.detect_syntax(code),
        };
        let Some(syntax) = syntax else {
            debug!("No syntax found for code block (hint: {:?})", language);
            return None;
        };

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut runs = Vec::new();
        let mut offset = 0;

        for line in LinesWithEndings::from(code) {
            let ranges = match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => ranges,
                Err(e) => {
                    warn!("Failed to highlight code block with {}: {}", syntax.name, e);
                    return None;
                }
            };
            for (style, text) in ranges {
                let end = offset + text.len();
                if !text.is_empty() {
                    runs.push(style_to_run(style, offset..end));
                }
                offset = end;
            }
        }

        Some(HighlightedFragment {
            text: code.to_string(),
            runs,
        })
    }

    /// Guess a syntax from the first line of the code.
    fn detect_syntax(&self, code: &str) -> Option<&SyntaxReference> {
        let first_line = code.lines().next()?;
        self.syntax_set.find_syntax_by_first_line(first_line)
    }

    /// Find syntax definition for a language identifier.
    ///
    /// Tries multiple strategies:
    /// 1. By extension (e.g., "rs" -> Rust)
    /// 2. By name (e.g., "Rust" -> Rust)
    /// 3. Case-insensitive name
    fn find_syntax_for_language(&self, language: &str) -> Option<&SyntaxReference> {
        let lang_lower = language.to_lowercase();

        // Map common language aliases to extensions
        let extension = match lang_lower.as_str() {
            "rust" | "rs" => "rs",
            "python" | "py" | "python3" => "py",
            "javascript" | "js" | "node" => "js",
            "typescript" | "ts" => "ts",
            "c" | "h" => "c",
            "cpp" | "c++" | "cxx" | "hpp" => "cpp",
            "csharp" | "c#" | "cs" => "cs",
            "objc" | "objective-c" | "objectivec" => "m",
            "java" => "java",
            "go" | "golang" => "go",
            "ruby" | "rb" => "rb",
            "php" => "php",
            "scala" => "scala",
            "html" | "htm" => "html",
            "css" => "css",
            "json" => "json",
            "yaml" | "yml" => "yaml",
            "xml" | "plist" => "xml",
            "markdown" | "md" => "md",
            "sql" => "sql",
            "shell" | "sh" | "bash" | "zsh" | "console" => "sh",
            "makefile" | "make" => "Makefile",
            "lua" => "lua",
            "perl" | "pl" => "pl",
            "r" => "r",
            "haskell" | "hs" => "hs",
            "erlang" | "erl" => "erl",
            "clojure" | "clj" => "clj",
            "diff" | "patch" => "diff",
            "latex" | "tex" => "tex",
            other => other,
        };

        if let Some(syntax) = self.syntax_set.find_syntax_by_extension(extension) {
            return Some(syntax);
        }
        if let Some(syntax) = self.syntax_set.find_syntax_by_name(language) {
            return Some(syntax);
        }
        self.syntax_set
            .syntaxes()
            .iter()
            .find(|syntax| syntax.name.to_lowercase() == lang_lower)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Convert syntect Color to egui Color32.
pub fn syntect_to_egui_color(color: syntect::highlighting::Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

fn style_to_run(style: Style, range: Range<usize>) -> HighlightRun {
    HighlightRun {
        range,
        foreground: syntect_to_egui_color(style.foreground),
        traits: FontTraits::from_flags(
            style.font_style.contains(FontStyle::BOLD),
            style.font_style.contains(FontStyle::ITALIC),
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Global Highlighter Instance
// ─────────────────────────────────────────────────────────────────────────────

static HIGHLIGHTER: OnceLock<SyntaxHighlighter> = OnceLock::new();

/// Get or create the global syntax highlighter.
pub fn get_highlighter() -> &'static SyntaxHighlighter {
    HIGHLIGHTER.get_or_init(SyntaxHighlighter::new)
}
