//! Markdown Pattern Library
//!
//! Every markdown construct the engine recognizes is defined here exactly
//! once, together with the meaning of each capture group. Patterns are
//! compiled on first use and shared process-wide.
//!
//! # Capture semantics
//!
//! A pattern maps regex capture groups to [`CaptureRole`]s. Some patterns
//! are alternations (e.g. `**bold**` vs `__bold__`); only the groups that
//! participated in a match show up in the [`MatchResult`]. The match range
//! is the union of its captured groups, so context characters a pattern
//! consumes to check a word boundary are never part of the match.
//!
//! # Nesting
//!
//! Link text and destinations may contain balanced brackets/parentheses up
//! to [`MAX_NESTING_DEPTH`] levels deep.

use crate::error::{Error, Result};
use crate::string_utils::clamp_range;
use log::debug;
use regex::{CaptureMatches, Regex};
use std::ops::Range;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Maximum nesting of balanced `[]` / `()` inside link text and destinations.
pub const MAX_NESTING_DEPTH: usize = 6;

// ─────────────────────────────────────────────────────────────────────────────
// Kinds and Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Every construct in the library. Discriminants index the library table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    AtxHeader,
    SetextHeader,
    BlockQuote,
    UnorderedList,
    OrderedList,
    FenceOpening,
    IndentedCode,
    InlineCode,
    Image,
    InlineLink,
    ReferenceLink,
    ReferenceDefinition,
    WikiLink,
    Autolink,
    AutolinkEmail,
    StrictItalic,
    StrictBold,
    LooseItalic,
    LooseBold,
}

impl PatternKind {
    /// All kinds, in discriminant order.
    pub const ALL: [PatternKind; 19] = [
        PatternKind::AtxHeader,
        PatternKind::SetextHeader,
        PatternKind::BlockQuote,
        PatternKind::UnorderedList,
        PatternKind::OrderedList,
        PatternKind::FenceOpening,
        PatternKind::IndentedCode,
        PatternKind::InlineCode,
        PatternKind::Image,
        PatternKind::InlineLink,
        PatternKind::ReferenceLink,
        PatternKind::ReferenceDefinition,
        PatternKind::WikiLink,
        PatternKind::Autolink,
        PatternKind::AutolinkEmail,
        PatternKind::StrictItalic,
        PatternKind::StrictBold,
        PatternKind::LooseItalic,
        PatternKind::LooseBold,
    ];
}

/// What a capture group means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureRole {
    /// Leading syntax marker (`#`, `**`, `[`, `![`, `>`...)
    OpeningMarker,
    /// Syntax between two semantic parts (`](`, `][`, `]:`)
    Separator,
    /// Trailing syntax marker (`**`, `)`, `]]`, setext underline...)
    ClosingMarker,
    /// Human-readable text (header title, link text, alt text)
    Text,
    /// Link or image destination
    Destination,
    /// Reference id in `[text][id]` / `[id]: url`
    Reference,
    /// Language tag after an opening fence
    LanguageTag,
    /// Leading indentation
    Indent,
    /// Body of a code construct
    Content,
}

impl CaptureRole {
    /// Whether this role covers syntax characters rather than content.
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            CaptureRole::OpeningMarker | CaptureRole::Separator | CaptureRole::ClosingMarker
        )
    }
}

/// Extra check on the character following a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RightBoundary {
    Any,
    /// Next char must not be alphanumeric, `_`, or the closing delimiter
    NotWordOrDelimiter,
    /// Next char must not be the closing delimiter
    NotDelimiter,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern
// ─────────────────────────────────────────────────────────────────────────────

/// A named, compiled matcher with its capture semantics.
#[derive(Debug)]
pub struct Pattern {
    kind: PatternKind,
    name: &'static str,
    regex: Regex,
    captures: &'static [(usize, CaptureRole)],
    right_boundary: RightBoundary,
}

impl Pattern {
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Lazily match this pattern inside `within`, left to right.
    ///
    /// Results are non-overlapping. The iterator is single-pass.
    pub fn matches<'p, 't>(&'p self, text: &'t str, within: Range<usize>) -> Matches<'p, 't> {
        let within = clamp_range(text, within);
        Matches {
            pattern: self,
            text,
            base: within.start,
            inner: self.regex.captures_iter(&text[within]),
        }
    }

    /// Whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.matches(text, 0..text.len()).next().is_some()
    }

    fn accepts_right(&self, text: &str, end: usize, closing: Option<char>) -> bool {
        let Some(next) = text[end..].chars().next() else {
            return true;
        };
        match self.right_boundary {
            RightBoundary::Any => true,
            RightBoundary::NotWordOrDelimiter => {
                !(next.is_alphanumeric() || next == '_' || Some(next) == closing)
            }
            RightBoundary::NotDelimiter => Some(next) != closing,
        }
    }
}

/// One match with its role-tagged sub-ranges, in absolute buffer offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub kind: PatternKind,
    pub range: Range<usize>,
    groups: Vec<(CaptureRole, Range<usize>)>,
}

impl MatchResult {
    /// First sub-range with `role`.
    pub fn group(&self, role: CaptureRole) -> Option<Range<usize>> {
        self.groups
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, range)| range.clone())
    }

    /// Text of the first sub-range with `role`.
    pub fn text<'t>(&self, text: &'t str, role: CaptureRole) -> Option<&'t str> {
        self.group(role).and_then(|range| text.get(range))
    }

    /// Every syntax-marker sub-range, in order.
    pub fn markers(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.groups
            .iter()
            .filter(|(role, _)| role.is_marker())
            .map(|(_, range)| range.clone())
    }
}

/// Lazy, single-pass iterator over a pattern's matches.
pub struct Matches<'p, 't> {
    pattern: &'p Pattern,
    text: &'t str,
    base: usize,
    inner: CaptureMatches<'p, 't>,
}

impl Iterator for Matches<'_, '_> {
    type Item = MatchResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let caps = self.inner.next()?;
            let mut groups = Vec::with_capacity(self.pattern.captures.len());
            for &(index, role) in self.pattern.captures {
                if let Some(m) = caps.get(index) {
                    groups.push((role, self.base + m.start()..self.base + m.end()));
                }
            }
            let (Some(start), Some(end)) = (
                groups.iter().map(|(_, r)| r.start).min(),
                groups.iter().map(|(_, r)| r.end).max(),
            ) else {
                continue;
            };

            let closing = groups
                .iter()
                .rev()
                .find(|(role, _)| *role == CaptureRole::ClosingMarker)
                .and_then(|(_, r)| self.text[r.clone()].chars().last());
            // Boundary checks look past the scan window into the real text.
            if !self.pattern.accepts_right(self.text, end, closing) {
                continue;
            }

            return Some(MatchResult {
                kind: self.pattern.kind,
                range: start..end,
                groups,
            });
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Library
// ─────────────────────────────────────────────────────────────────────────────

/// The complete, immutable set of markdown patterns.
#[derive(Debug)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
}

impl PatternLibrary {
    /// Compile every pattern. Fails only on a malformed definition.
    pub fn new() -> Result<Self> {
        let patterns = PatternKind::ALL
            .iter()
            .map(|&kind| compile(kind))
            .collect::<Result<Vec<_>>>()?;
        debug!("Compiled {} markdown patterns", patterns.len());
        Ok(Self { patterns })
    }

    pub fn get(&self, kind: PatternKind) -> &Pattern {
        &self.patterns[kind as usize]
    }

    /// Match `kind` over `within` (see [`Pattern::matches`]).
    pub fn matches<'p, 't>(
        &'p self,
        kind: PatternKind,
        text: &'t str,
        within: Range<usize>,
    ) -> Matches<'p, 't> {
        self.get(kind).matches(text, within)
    }
}

static LIBRARY: OnceLock<PatternLibrary> = OnceLock::new();

/// Get or build the process-wide pattern library.
///
/// # Panics
///
/// Panics on first use if a built-in pattern does not compile. That is a
/// packaging defect and is covered by the tests below.
pub fn patterns() -> &'static PatternLibrary {
    LIBRARY.get_or_init(|| match PatternLibrary::new() {
        Ok(library) => library,
        Err(e) => panic!("built-in markdown pattern is invalid: {}", e),
    })
}

/// Balanced-delimiter body allowing `depth` levels of nesting, no newlines.
fn nested(open: char, close: char, depth: usize) -> String {
    let o = regex::escape(&open.to_string());
    let c = regex::escape(&close.to_string());
    let mut body = format!(r"[^{o}{c}\n]*");
    for _ in 0..depth {
        body = format!(r"(?:[^{o}{c}\n]|{o}{body}{c})*");
    }
    body
}

fn compile(kind: PatternKind) -> Result<Pattern> {
    use CaptureRole::*;

    let brackets = nested('[', ']', MAX_NESTING_DEPTH);
    let parens = nested('(', ')', MAX_NESTING_DEPTH);

    let (name, source, captures, right_boundary): (
        &'static str,
        String,
        &'static [(usize, CaptureRole)],
        RightBoundary,
    ) = match kind {
        PatternKind::AtxHeader => (
            "atx-header",
            r"(?m)^(#{1,6}[ \t]+)([^\n]*?)(?:([ \t]+#+))?[ \t]*$".to_string(),
            &[(1, OpeningMarker), (2, Text), (3, ClosingMarker)],
            RightBoundary::Any,
        ),
        PatternKind::SetextHeader => (
            "setext-header",
            r"(?m)^([^\n]*\S[^\n]*)\n(=+|-+)[ \t]*$".to_string(),
            &[(1, Text), (2, ClosingMarker)],
            RightBoundary::Any,
        ),
        PatternKind::BlockQuote => (
            "block-quote",
            r"(?m)^([ \t]{0,3}>[ \t]?)([^\n]*)$".to_string(),
            &[(1, OpeningMarker), (2, Text)],
            RightBoundary::Any,
        ),
        PatternKind::UnorderedList => (
            "unordered-list",
            r"(?m)^[ \t]*([*+-])[ \t]+".to_string(),
            &[(1, OpeningMarker)],
            RightBoundary::Any,
        ),
        PatternKind::OrderedList => (
            "ordered-list",
            r"(?m)^[ \t]*(\d{1,9}[.)])[ \t]+".to_string(),
            &[(1, OpeningMarker)],
            RightBoundary::Any,
        ),
        PatternKind::FenceOpening => (
            "fence-opening",
            r"(?m)^([ \t]{0,3})(`{3,}|~{3,})[ \t]*([A-Za-z0-9_+#.\-]*)[^\n]*$".to_string(),
            &[(1, Indent), (2, OpeningMarker), (3, LanguageTag)],
            RightBoundary::Any,
        ),
        PatternKind::IndentedCode => (
            "indented-code",
            r"(?m)^(\t| {4})([^\n]*)$".to_string(),
            &[(1, Indent), (2, Content)],
            RightBoundary::Any,
        ),
        PatternKind::InlineCode => (
            "inline-code",
            concat!(
                r"(?:^|[^`\\])(``)([^`\n](?:[^\n]*?[^`\n])?)(``)",
                r"|(?:^|[^`\\])(`)([^`\n]+)(`)"
            )
            .to_string(),
            &[
                (1, OpeningMarker),
                (2, Content),
                (3, ClosingMarker),
                (4, OpeningMarker),
                (5, Content),
                (6, ClosingMarker),
            ],
            RightBoundary::Any,
        ),
        PatternKind::Image => (
            "image",
            format!(r"(!\[)({brackets})(\]\()[ \t]*({parens})[ \t]*(\))"),
            &[
                (1, OpeningMarker),
                (2, Text),
                (3, Separator),
                (4, Destination),
                (5, ClosingMarker),
            ],
            RightBoundary::Any,
        ),
        PatternKind::InlineLink => (
            "inline-link",
            format!(r"(?:^|[^!\\])(\[)({brackets})(\]\()[ \t]*({parens})[ \t]*(\))"),
            &[
                (1, OpeningMarker),
                (2, Text),
                (3, Separator),
                (4, Destination),
                (5, ClosingMarker),
            ],
            RightBoundary::Any,
        ),
        PatternKind::ReferenceLink => (
            "reference-link",
            format!(r"(?:^|[^!\\\[])(\[)({brackets})(\])[ ]?(\[)([^\]\n]*)(\])"),
            &[
                (1, OpeningMarker),
                (2, Text),
                (3, Separator),
                (4, Separator),
                (5, Reference),
                (6, ClosingMarker),
            ],
            RightBoundary::Any,
        ),
        PatternKind::ReferenceDefinition => (
            "reference-definition",
            concat!(
                r#"(?m)^[ ]{0,3}(\[)([^\]\n]+)(\]:)[ \t]*(\S+)"#,
                r#"(?:[ \t]+("[^"\n]*"|'[^'\n]*'|\([^)\n]*\)))?[ \t]*$"#
            )
            .to_string(),
            &[
                (1, OpeningMarker),
                (2, Reference),
                (3, Separator),
                (4, Destination),
                (5, Text),
            ],
            RightBoundary::Any,
        ),
        PatternKind::WikiLink => (
            "wiki-link",
            r"(\[\[)([^\[\]\n]+)(\]\])".to_string(),
            &[(1, OpeningMarker), (2, Text), (3, ClosingMarker)],
            RightBoundary::Any,
        ),
        PatternKind::Autolink => (
            "autolink",
            concat!(
                r"(<)((?:https?|ftp)://[^\s<>]+|mailto:[^\s<>]+)(>)",
                r#"|((?:(?:https?|ftp)://|www\.)[^\s<>()\[\]]*[^\s<>()\[\].,;:!?'"*_])"#
            )
            .to_string(),
            &[
                (1, OpeningMarker),
                (2, Destination),
                (3, ClosingMarker),
                (4, Destination),
            ],
            RightBoundary::Any,
        ),
        PatternKind::AutolinkEmail => (
            "autolink-email",
            r"(?i)(mailto:)?\b([a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,})\b".to_string(),
            &[(1, OpeningMarker), (2, Destination)],
            RightBoundary::Any,
        ),
        PatternKind::StrictItalic => (
            "strict-italic",
            concat!(
                r"(?:^|[^\w*\\])(\*)([^\s*](?:[^*\n]*?[^\s*\\])?)(\*)",
                r"|(?:^|[^\w_\\])(_)([^\s_](?:[^_\n]*?[^\s_\\])?)(_)"
            )
            .to_string(),
            EMPHASIS_CAPTURES,
            RightBoundary::NotWordOrDelimiter,
        ),
        PatternKind::StrictBold => (
            "strict-bold",
            concat!(
                r"(?:^|[^\w*\\])(\*\*)([^\s*](?:(?:[^*\n]|\*[^*\n])*?[^\s*\\])?)(\*\*)",
                r"|(?:^|[^\w_\\])(__)([^\s_](?:(?:[^_\n]|_[^_\n])*?[^\s_\\])?)(__)"
            )
            .to_string(),
            EMPHASIS_CAPTURES,
            RightBoundary::NotWordOrDelimiter,
        ),
        PatternKind::LooseItalic => (
            "loose-italic",
            concat!(
                r"(?:^|[^*\\])(\*)([^\s*](?:[^*\n]*?[^\s*\\])?)(\*)",
                r"|(?:^|[^_\\])(_)([^\s_](?:[^_\n]*?[^\s_\\])?)(_)"
            )
            .to_string(),
            EMPHASIS_CAPTURES,
            RightBoundary::NotDelimiter,
        ),
        PatternKind::LooseBold => (
            "loose-bold",
            concat!(
                r"(?:^|[^*\\])(\*\*)([^\s*](?:(?:[^*\n]|\*[^*\n])*?[^\s*\\])?)(\*\*)",
                r"|(?:^|[^_\\])(__)([^\s_](?:(?:[^_\n]|_[^_\n])*?[^\s_\\])?)(__)"
            )
            .to_string(),
            EMPHASIS_CAPTURES,
            RightBoundary::NotDelimiter,
        ),
    };

    let regex = Regex::new(&source).map_err(|source| Error::Pattern { name, source })?;
    Ok(Pattern {
        kind,
        name,
        regex,
        captures,
        right_boundary,
    })
}

const EMPHASIS_CAPTURES: &[(usize, CaptureRole)] = &[
    (1, CaptureRole::OpeningMarker),
    (2, CaptureRole::Text),
    (3, CaptureRole::ClosingMarker),
    (4, CaptureRole::OpeningMarker),
    (5, CaptureRole::Text),
    (6, CaptureRole::ClosingMarker),
];

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn all(kind: PatternKind, text: &str) -> Vec<MatchResult> {
        patterns().matches(kind, text, 0..text.len()).collect()
    }

    fn texts<'t>(kind: PatternKind, text: &'t str, role: CaptureRole) -> Vec<&'t str> {
        all(kind, text)
            .iter()
            .filter_map(|m| m.text(text, role))
            .collect()
    }

    #[test]
    fn test_library_compiles() {
        let library = PatternLibrary::new().unwrap();
        for kind in PatternKind::ALL {
            assert_eq!(library.get(kind).kind(), kind);
        }
    }

    #[test]
    fn test_atx_header() {
        let text = "# Title ##\nbody\n###### Six";
        let found = all(PatternKind::AtxHeader, text);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text(text, CaptureRole::OpeningMarker), Some("# "));
        assert_eq!(found[0].text(text, CaptureRole::Text), Some("Title"));
        assert_eq!(found[0].text(text, CaptureRole::ClosingMarker), Some(" ##"));
        assert_eq!(found[1].text(text, CaptureRole::Text), Some("Six"));
        assert!(all(PatternKind::AtxHeader, "####### seven").is_empty());
        assert!(all(PatternKind::AtxHeader, "#hashtag").is_empty());
    }

    #[test]
    fn test_atx_header_keeps_trailing_hash_in_word() {
        let text = "## C#";
        assert_eq!(texts(PatternKind::AtxHeader, text, CaptureRole::Text), vec!["C#"]);
    }

    #[test]
    fn test_setext_header() {
        let text = "Title\n=====\n";
        let found = all(PatternKind::SetextHeader, text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(text, CaptureRole::ClosingMarker), Some("====="));
    }

    #[test]
    fn test_lists() {
        assert_eq!(
            texts(PatternKind::UnorderedList, "- a\n  * b\n---", CaptureRole::OpeningMarker),
            vec!["-", "*"]
        );
        assert_eq!(
            texts(PatternKind::OrderedList, "1. a\n12) b", CaptureRole::OpeningMarker),
            vec!["1.", "12)"]
        );
    }

    #[test]
    fn test_inline_code_single_and_double() {
        let text = "use `x` and ``a ` b`` but not \\`y`";
        assert_eq!(
            texts(PatternKind::InlineCode, text, CaptureRole::Content),
            vec!["x", "a ` b"]
        );
    }

    #[test]
    fn test_image_and_link_are_distinct() {
        let text = "![alt](pic.png) and [text](https://example.com)";
        assert_eq!(
            texts(PatternKind::Image, text, CaptureRole::Destination),
            vec!["pic.png"]
        );
        assert_eq!(
            texts(PatternKind::InlineLink, text, CaptureRole::Destination),
            vec!["https://example.com"]
        );
    }

    #[test]
    fn test_link_nested_brackets_and_parens() {
        let text = "[a [b [c]]](https://en.wikipedia.org/wiki/Rust_(language))";
        let found = all(PatternKind::InlineLink, text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].text(text, CaptureRole::Text), Some("a [b [c]]"));
        assert_eq!(
            found[0].text(text, CaptureRole::Destination),
            Some("https://en.wikipedia.org/wiki/Rust_(language)")
        );
        assert_eq!(found[0].range, 0..text.len());
    }

    #[test]
    fn test_nesting_depth_is_bounded() {
        let deep = |levels: usize| {
            format!("[{}x{}](u)", "[".repeat(levels), "]".repeat(levels))
        };
        assert_eq!(all(PatternKind::InlineLink, &deep(MAX_NESTING_DEPTH)).len(), 1);
        assert!(all(PatternKind::InlineLink, &deep(MAX_NESTING_DEPTH + 1)).is_empty());
    }

    #[test]
    fn test_reference_link_and_definition() {
        let text = "see [the docs][docs]\n\n[docs]: https://docs.rs \"Docs\"\n";
        assert_eq!(
            texts(PatternKind::ReferenceLink, text, CaptureRole::Reference),
            vec!["docs"]
        );
        let defs = all(PatternKind::ReferenceDefinition, text);
        assert_eq!(defs.len(), 1);
        assert_eq!(
            defs[0].text(text, CaptureRole::Destination),
            Some("https://docs.rs")
        );
        assert_eq!(defs[0].text(text, CaptureRole::Text), Some("\"Docs\""));
    }

    #[test]
    fn test_wiki_link() {
        let text = "link to [[Meeting Notes]] here";
        assert_eq!(
            texts(PatternKind::WikiLink, text, CaptureRole::Text),
            vec!["Meeting Notes"]
        );
        assert!(all(PatternKind::InlineLink, text).is_empty());
        assert!(all(PatternKind::ReferenceLink, text).is_empty());
    }

    #[test]
    fn test_autolinks() {
        let text = "visit https://example.com/path. or <https://a.b> or www.rust-lang.org";
        assert_eq!(
            texts(PatternKind::Autolink, text, CaptureRole::Destination),
            vec!["https://example.com/path", "https://a.b", "www.rust-lang.org"]
        );
        assert_eq!(
            texts(PatternKind::AutolinkEmail, "mail me@example.org now", CaptureRole::Destination),
            vec!["me@example.org"]
        );
    }

    #[test]
    fn test_emphasis_flanking() {
        assert!(all(PatternKind::StrictItalic, "* not emphasis *").is_empty());
        assert!(all(PatternKind::LooseItalic, "* not emphasis *").is_empty());
        assert!(all(PatternKind::StrictBold, "** not bold **").is_empty());
        assert_eq!(
            texts(PatternKind::StrictItalic, "*emphasis*", CaptureRole::Text),
            vec!["emphasis"]
        );
    }

    #[test]
    fn test_strict_bold_adjacent_matches() {
        let text = "**a** **b** __c__";
        assert_eq!(
            texts(PatternKind::StrictBold, text, CaptureRole::Text),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_bold_does_not_bridge_separate_spans() {
        let text = "**a** and **b**";
        assert_eq!(texts(PatternKind::StrictBold, text, CaptureRole::Text), vec!["a", "b"]);
        assert_eq!(texts(PatternKind::LooseBold, text, CaptureRole::Text), vec!["a", "b"]);
        assert_eq!(
            texts(PatternKind::StrictBold, "__x__ y __z__", CaptureRole::Text),
            vec!["x", "z"]
        );
    }

    #[test]
    fn test_bold_body_may_hold_single_stars() {
        assert_eq!(
            texts(PatternKind::StrictBold, "**x *y* z**", CaptureRole::Text),
            vec!["x *y* z"]
        );
    }

    #[test]
    fn test_strict_rejects_intraword_loose_accepts() {
        let text = "snake_case_name";
        assert!(all(PatternKind::StrictItalic, text).is_empty());
        assert_eq!(
            texts(PatternKind::LooseItalic, text, CaptureRole::Text),
            vec!["case"]
        );
    }

    #[test]
    fn test_italic_does_not_match_inside_bold() {
        assert!(all(PatternKind::StrictItalic, "**bold**").is_empty());
        assert!(all(PatternKind::LooseItalic, "**bold**").is_empty());
    }

    #[test]
    fn test_match_range_excludes_context_char() {
        let text = "x *word* y";
        let found = all(PatternKind::StrictItalic, text);
        assert_eq!(found[0].range, 2..8);
    }

    #[test]
    fn test_matches_within_subrange() {
        let text = "# One\n# Two\n";
        let found: Vec<_> = patterns()
            .matches(PatternKind::AtxHeader, text, 6..12)
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, 6..11);
    }

    #[test]
    fn test_fence_opening_language() {
        let text = "```python\nprint(1)\n```";
        assert_eq!(
            texts(PatternKind::FenceOpening, text, CaptureRole::LanguageTag),
            vec!["python", ""]
        );
    }
}
