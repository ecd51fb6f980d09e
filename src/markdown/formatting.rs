//! Formatting commands
//!
//! Markdown notes are formatted by editing their text: a command becomes a
//! [`FormatEdit`] (replace this byte range with that string, then select
//! this) that the caller feeds through the rescan controller, so the new
//! markers get styled like anything the user typed.
//!
//! Rich-text notes have no markers; bold and italic toggle the font traits
//! of the selection directly with [`toggle_font_trait`].
//!
//! # Usage
//! ```ignore
//! use crate::markdown::formatting::{format_edit, FormatCommand};
//!
//! let edit = format_edit("Hello world", 0..5, FormatCommand::Bold);
//! assert_eq!(edit.apply_to("Hello world"), "**Hello** world");
//! ```

use crate::document::{AttributeKey, AttributeValue, Document};
use crate::fonts::{toggle, FontSpec, FontTrait, FontTraits};
use crate::string_utils::{clamp_range, floor_char_boundary, paragraph_range};
use std::ops::Range;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Formatting commands for markdown notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    /// `**text**`
    Bold,
    /// `*text*`
    Italic,
    /// `` `code` ``
    InlineCode,
    /// `[text](url)`
    Link,
    /// `![alt](url)`
    Image,
    /// Fenced code block
    CodeBlock,
    /// ATX heading, level 1-6
    Heading(u8),
    BulletList,
    NumberedList,
    Blockquote,
}

impl FormatCommand {
    /// The equivalent rich-text trait, if the command has one.
    pub fn font_trait(self) -> Option<FontTrait> {
        match self {
            Self::Bold => Some(FontTrait::Bold),
            Self::Italic => Some(FontTrait::Italic),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Edits
// ─────────────────────────────────────────────────────────────────────────────

/// A formatting command expressed as one text replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatEdit {
    /// Byte range of the original text to replace
    pub range: Range<usize>,
    pub replacement: String,
    /// Selection to show afterwards, in post-edit offsets
    pub selection: Range<usize>,
    /// `false` if markers were removed or nothing changed
    pub applied: bool,
}

impl FormatEdit {
    fn unchanged(at: Range<usize>) -> Self {
        Self {
            range: at.start..at.start,
            replacement: String::new(),
            selection: at,
            applied: false,
        }
    }

    fn replace(range: Range<usize>, replacement: String, selection: Range<usize>) -> Self {
        Self {
            range,
            replacement,
            selection,
            applied: true,
        }
    }

    fn toggled_off(mut self) -> Self {
        self.applied = false;
        self
    }

    /// Whether applying the edit would change the text.
    pub fn is_noop(&self) -> bool {
        self.range.is_empty() && self.replacement.is_empty()
    }

    /// The text after the edit.
    pub fn apply_to(&self, text: &str) -> String {
        let mut out = text.to_string();
        out.replace_range(self.range.clone(), &self.replacement);
        out
    }
}

/// Turn `command` on `selection` into a text edit.
pub fn format_edit(text: &str, selection: Range<usize>, command: FormatCommand) -> FormatEdit {
    let selection = ordered(text, selection);
    match command {
        FormatCommand::Bold => wrap_inline(text, selection, "**"),
        FormatCommand::Italic => wrap_inline(text, selection, "*"),
        FormatCommand::InlineCode => wrap_inline(text, selection, "`"),
        FormatCommand::Link => wrap_link(text, selection, "["),
        FormatCommand::Image => wrap_link(text, selection, "!["),
        FormatCommand::CodeBlock => toggle_code_block(text, selection),
        FormatCommand::Heading(level) => set_heading(text, selection, level),
        FormatCommand::BulletList => rewrite_lines(text, selection, LineKind::Bullet),
        FormatCommand::NumberedList => rewrite_lines(text, selection, LineKind::Numbered),
        FormatCommand::Blockquote => rewrite_lines(text, selection, LineKind::Quote),
    }
}

fn ordered(text: &str, selection: Range<usize>) -> Range<usize> {
    let (start, end) = if selection.start > selection.end {
        (selection.end, selection.start)
    } else {
        (selection.start, selection.end)
    };
    clamp_range(text, start..end)
}

/// The lines touched by `selection`, without the final newline.
fn line_span(text: &str, selection: Range<usize>) -> Range<usize> {
    let lines = paragraph_range(text, selection);
    let end = if text[..lines.end].ends_with('\n') && lines.end > lines.start {
        lines.end - 1
    } else {
        lines.end
    };
    lines.start..end
}

fn wrap_inline(text: &str, selection: Range<usize>, marker: &str) -> FormatEdit {
    let selected = &text[selection.clone()];

    // Markers inside the selection
    if selected.len() >= marker.len() * 2 && selected.starts_with(marker) && selected.ends_with(marker) {
        let inner = &selected[marker.len()..selected.len() - marker.len()];
        let start = selection.start;
        return FormatEdit::replace(selection, inner.to_string(), start..start + inner.len())
            .toggled_off();
    }

    // Markers just outside the selection
    if selection.start >= marker.len()
        && text[..selection.start].ends_with(marker)
        && text[selection.end..].starts_with(marker)
    {
        let outer = selection.start - marker.len()..selection.end + marker.len();
        let start = outer.start;
        return FormatEdit::replace(outer, selected.to_string(), start..start + selected.len())
            .toggled_off();
    }

    if selection.is_empty() {
        return FormatEdit::unchanged(selection);
    }

    let start = selection.start + marker.len();
    let inner = start..start + selected.len();
    FormatEdit::replace(selection, format!("{marker}{selected}{marker}"), inner)
}

fn wrap_link(text: &str, selection: Range<usize>, opener: &str) -> FormatEdit {
    if selection.is_empty() {
        return FormatEdit::unchanged(selection);
    }
    let selected = &text[selection.clone()];
    let replacement = format!("{opener}{selected}](url)");
    // Select the placeholder url for typing over
    let url_start = selection.start + opener.len() + selected.len() + 2;
    FormatEdit::replace(selection, replacement, url_start..url_start + 3)
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

fn toggle_code_block(text: &str, selection: Range<usize>) -> FormatEdit {
    let span = line_span(text, selection);
    let lines: Vec<&str> = text[span.clone()].split('\n').collect();

    if lines.len() >= 2 && is_fence(lines[0]) && is_fence(lines[lines.len() - 1]) {
        let inner = lines[1..lines.len() - 1].join("\n");
        let start = span.start;
        return FormatEdit::replace(span, inner.clone(), start..start + inner.len()).toggled_off();
    }

    let body = &text[span.clone()];
    let replacement = format!("```\n{body}\n```");
    // Cursor right after the opening fence, ready for a language tag
    let cursor = span.start + 3;
    FormatEdit::replace(span, replacement, cursor..cursor)
}

fn set_heading(text: &str, selection: Range<usize>, level: u8) -> FormatEdit {
    let level = level.clamp(1, 6) as usize;
    let span = line_span(text, selection.start..selection.start);
    let line = &text[span.clone()];
    let trimmed = line.trim_start();
    let existing = heading_level(trimmed);
    let content = match existing {
        Some(n) => trimmed[n..].trim_start(),
        None => trimmed,
    };

    if existing == Some(level) {
        let start = span.start;
        return FormatEdit::replace(span, content.to_string(), start..start + content.len())
            .toggled_off();
    }

    let replacement = format!("{} {}", "#".repeat(level), content);
    let end = span.start + replacement.len();
    FormatEdit::replace(span, replacement, end..end)
}

fn heading_level(trimmed: &str) -> Option<usize> {
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    let rest = &trimmed[hashes..];
    ((1..=6).contains(&hashes) && (rest.is_empty() || rest.starts_with(' '))).then_some(hashes)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Bullet,
    Numbered,
    Quote,
}

impl LineKind {
    fn matches(self, trimmed: &str) -> bool {
        match self {
            Self::Bullet => is_bullet_item(trimmed),
            Self::Numbered => numbered_marker_len(trimmed).is_some(),
            Self::Quote => trimmed.starts_with("> "),
        }
    }

    fn strip(self, trimmed: &str) -> &str {
        match self {
            Self::Quote => trimmed.strip_prefix("> ").unwrap_or(trimmed),
            _ => strip_list_marker(trimmed),
        }
    }

    fn add(self, index: usize, line: &str) -> String {
        match self {
            Self::Bullet => format!("- {}", strip_list_marker(line.trim_start())),
            Self::Numbered => format!("{}. {}", index + 1, strip_list_marker(line.trim_start())),
            Self::Quote => format!("> {line}"),
        }
    }
}

fn rewrite_lines(text: &str, selection: Range<usize>, kind: LineKind) -> FormatEdit {
    let span = line_span(text, selection);
    let lines: Vec<&str> = text[span.clone()].split('\n').collect();
    let all_marked = lines.iter().all(|line| kind.matches(line.trim_start()));

    let rewritten: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if all_marked {
                kind.strip(line.trim_start()).to_string()
            } else {
                kind.add(i, line)
            }
        })
        .collect();
    let replacement = rewritten.join("\n");
    let end = span.start + replacement.len();
    let edit = FormatEdit::replace(span, replacement, end..end);
    if all_marked {
        edit.toggled_off()
    } else {
        edit
    }
}

fn is_bullet_item(trimmed: &str) -> bool {
    ["- ", "* ", "+ "].iter().any(|m| trimmed.starts_with(m))
}

/// Byte length of a `12. ` / `3) ` marker.
fn numbered_marker_len(trimmed: &str) -> Option<usize> {
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    let rest = trimmed.as_bytes().get(digits..digits + 2)?;
    (digits > 0 && matches!(rest[0], b'.' | b')') && rest[1] == b' ').then_some(digits + 2)
}

fn strip_list_marker(trimmed: &str) -> &str {
    for task in ["- [ ] ", "- [x] ", "- [X] "] {
        if let Some(rest) = trimmed.strip_prefix(task) {
            return rest;
        }
    }
    if is_bullet_item(trimmed) {
        return &trimmed[2..];
    }
    match numbered_marker_len(trimmed) {
        Some(len) => &trimmed[len..],
        None => trimmed,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting state
// ─────────────────────────────────────────────────────────────────────────────

/// Formatting in effect at a cursor, for reflecting in toolbars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattingState {
    /// Bold and italic, composed
    pub traits: FontTraits,
    pub is_inline_code: bool,
    pub is_code_block: bool,
    pub heading_level: Option<u8>,
    pub is_bullet_list: bool,
    pub is_numbered_list: bool,
    pub is_blockquote: bool,
}

/// Detect markdown formatting around `cursor` in raw text.
pub fn detect_formatting_state(text: &str, cursor: usize) -> FormattingState {
    let cursor = floor_char_boundary(text, cursor.min(text.len()));
    let span = line_span(text, cursor..cursor);
    let line = &text[span.start..span.end.max(cursor)];
    let trimmed = line.trim_start();

    let before = &text[span.start..cursor];
    let after = &text[cursor..span.end.max(cursor)];

    let is_code_block = inside_fence(text, span.start);
    let strong = balanced(before, after, "**") || balanced(before, after, "__");
    // A lone `*` count that is odd once `**` pairs are removed
    let emphasis = balanced(&before.replace("**", ""), &after.replace("**", ""), "*")
        || balanced(&before.replace("__", ""), &after.replace("__", ""), "_");

    FormattingState {
        traits: FontTraits::from_flags(strong, emphasis),
        is_inline_code: !is_code_block && balanced(before, after, "`"),
        is_code_block,
        heading_level: heading_level(trimmed).map(|n| n as u8),
        is_bullet_list: is_bullet_item(trimmed),
        is_numbered_list: numbered_marker_len(trimmed).is_some(),
        is_blockquote: trimmed.starts_with("> "),
    }
}

/// Whether the line starting at `line_start` lies between fences.
fn inside_fence(text: &str, line_start: usize) -> bool {
    text[..line_start]
        .lines()
        .filter(|line| is_fence(line))
        .count()
        % 2
        == 1
}

fn balanced(before: &str, after: &str, marker: &str) -> bool {
    before.matches(marker).count() % 2 == 1 && after.contains(marker)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rich text
// ─────────────────────────────────────────────────────────────────────────────

/// Toggle `font_trait` over `range` of a rich-text document.
///
/// If every font in the range already carries the trait it is removed;
/// otherwise each run that lacks it gains it. The other trait is preserved
/// run by run. Unstyled gaps take `base`.
pub fn toggle_font_trait(doc: &mut Document, range: Range<usize>, font_trait: FontTrait, base: &FontSpec) {
    let range = clamp_range(doc.text(), range);
    if range.is_empty() {
        return;
    }

    let mut all_have = true;
    doc.update_attribute(AttributeKey::Font, range.clone(), |value| {
        let traits = value.and_then(|v| v.as_font()).map_or(base.traits, |f| f.traits);
        all_have &= traits.contains(font_trait);
        value.cloned()
    });

    doc.update_attribute(AttributeKey::Font, range, |value| {
        let font = value.and_then(|v| v.as_font()).unwrap_or(base);
        let traits = if font.traits.contains(font_trait) == all_have {
            toggle(font_trait, font.traits)
        } else {
            font.traits
        };
        Some(AttributeValue::Font(font.clone().with_traits(traits)))
    });
}

/// Traits of the font at `offset`, as a rich-text toolbar would show them.
pub fn traits_at(doc: &Document, offset: usize) -> FontTraits {
    doc.attribute_at(AttributeKey::Font, offset)
        .and_then(|v| v.as_font())
        .map_or(FontTraits::Regular, |f| f.traits)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, selection: Range<usize>, command: FormatCommand) -> (String, FormatEdit) {
        let edit = format_edit(text, selection, command);
        (edit.apply_to(text), edit)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inline
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_inline_commands_are_styled_after_rescan() {
        use crate::config::StylingConfig;
        use crate::markdown::styler::SpanStyler;
        use crate::theme::MarkdownColors;

        let config = StylingConfig::default();
        let colors = MarkdownColors::light();
        for command in [FormatCommand::Bold, FormatCommand::Italic, FormatCommand::InlineCode] {
            let (text, edit) = run("a word here", 2..6, command);
            let mut doc = Document::new(text.as_str());
            SpanStyler::new(&config, &colors).style(&mut doc, 0..text.len(), &[]);
            let font = doc
                .attribute_at(AttributeKey::Font, edit.selection.start + 1)
                .and_then(|v| v.as_font())
                .cloned()
                .unwrap();
            let styled = match command {
                FormatCommand::Bold => font.traits.is_bold(),
                FormatCommand::Italic => font.traits.is_italic(),
                _ => font.monospace,
            };
            assert!(styled, "{:?} produced unstyled {:?}", command, text);
        }
    }

    #[test]
    fn test_bold_wraps_selection() {
        let (text, edit) = run("Hello world", 0..5, FormatCommand::Bold);
        assert_eq!(text, "**Hello** world");
        assert!(edit.applied);
        assert_eq!(&text[edit.selection], "Hello");
    }

    #[test]
    fn test_bold_toggles_off_inside_and_outside() {
        let (text, edit) = run("**Hello** world", 0..9, FormatCommand::Bold);
        assert_eq!(text, "Hello world");
        assert!(!edit.applied);

        let (text, _) = run("**Hello** world", 2..7, FormatCommand::Bold);
        assert_eq!(text, "Hello world");
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let edit = format_edit("Hello", 2..2, FormatCommand::Italic);
        assert!(edit.is_noop());
        assert!(!edit.applied);
    }

    #[test]
    fn test_reversed_selection_and_unicode() {
        let (text, _) = run("Blåbær og øl", 8..0, FormatCommand::Italic);
        assert_eq!(text, "*Blåbær* og øl");
        let (text, _) = run("你好世界", 0..6, FormatCommand::Bold);
        assert_eq!(text, "**你好**世界");
    }

    #[test]
    fn test_link_selects_url_placeholder() {
        let (text, edit) = run("see docs", 4..8, FormatCommand::Link);
        assert_eq!(text, "see [docs](url)");
        assert_eq!(&text[edit.selection], "url");

        let (text, _) = run("logo", 0..4, FormatCommand::Image);
        assert_eq!(text, "![logo](url)");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Blocks
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_heading_set_change_and_remove() {
        let (text, _) = run("Title\nbody", 2..2, FormatCommand::Heading(2));
        assert_eq!(text, "## Title\nbody");
        let (text, _) = run("## Title\nbody", 0..0, FormatCommand::Heading(1));
        assert_eq!(text, "# Title\nbody");
        let (text, edit) = run("# Title\nbody", 0..0, FormatCommand::Heading(1));
        assert_eq!(text, "Title\nbody");
        assert!(!edit.applied);
    }

    #[test]
    fn test_lists_toggle() {
        let (text, _) = run("a\nb\n", 0..3, FormatCommand::NumberedList);
        assert_eq!(text, "1. a\n2. b\n");
        let (text, edit) = run("- a\n- b", 0..7, FormatCommand::BulletList);
        assert_eq!(text, "a\nb");
        assert!(!edit.applied);
        let (text, _) = run("1. a", 0..0, FormatCommand::BulletList);
        assert_eq!(text, "- a");
    }

    #[test]
    fn test_blockquote_toggle() {
        let (text, _) = run("café\n", 0..0, FormatCommand::Blockquote);
        assert_eq!(text, "> café\n");
        let (text, _) = run("> café\n", 0..0, FormatCommand::Blockquote);
        assert_eq!(text, "café\n");
    }

    #[test]
    fn test_code_block_toggle() {
        let (text, edit) = run("let x = 1;", 0..0, FormatCommand::CodeBlock);
        assert_eq!(text, "```\nlet x = 1;\n```");
        assert_eq!(edit.selection, 3..3);
        let (text, _) = run("```\nlet x = 1;\n```", 0..17, FormatCommand::CodeBlock);
        assert_eq!(text, "let x = 1;");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_detect_composed_traits() {
        let text = "a ***both*** b";
        assert_eq!(detect_formatting_state(text, 6).traits, FontTraits::BoldItalic);
        assert_eq!(detect_formatting_state("**bold**", 3).traits, FontTraits::Bold);
        assert_eq!(detect_formatting_state("*it*", 2).traits, FontTraits::Italic);
        assert_eq!(detect_formatting_state("plain", 2).traits, FontTraits::Regular);
    }

    #[test]
    fn test_detect_line_state() {
        assert_eq!(detect_formatting_state("### Hi", 4).heading_level, Some(3));
        assert!(detect_formatting_state("> q", 2).is_blockquote);
        assert!(detect_formatting_state("- item", 3).is_bullet_list);
        assert!(detect_formatting_state("10. item", 5).is_numbered_list);
        let state = detect_formatting_state("```\n`x`\n```", 5);
        assert!(state.is_code_block);
        assert!(!state.is_inline_code);
    }

    #[test]
    fn test_no_panic_on_any_offset() {
        let text = "æ *ø* **å** 你\n- [x] ✓";
        for i in 0..=text.len() + 2 {
            let _ = detect_formatting_state(text, i);
            for command in [FormatCommand::Bold, FormatCommand::Heading(2), FormatCommand::BulletList] {
                let edit = format_edit(text, i..text.len() + 2, command);
                let _ = edit.apply_to(text);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rich text
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_rich_text_toggle_preserves_other_trait() {
        let base = FontSpec::new("Inter", 14.0);
        let mut doc = Document::new("one two");
        doc.set_attribute(0..3, AttributeValue::Font(base.clone().with_traits(FontTraits::Italic)));

        toggle_font_trait(&mut doc, 0..7, FontTrait::Bold, &base);
        assert_eq!(traits_at(&doc, 0), FontTraits::BoldItalic);
        assert_eq!(traits_at(&doc, 5), FontTraits::Bold);

        toggle_font_trait(&mut doc, 0..7, FontTrait::Bold, &base);
        assert_eq!(traits_at(&doc, 0), FontTraits::Italic);
        assert_eq!(traits_at(&doc, 5), FontTraits::Regular);
    }

    #[test]
    fn test_rich_text_mixed_selection_adds_trait() {
        let base = FontSpec::new("Inter", 14.0);
        let mut doc = Document::new("ab");
        doc.set_attribute(0..1, AttributeValue::Font(base.clone().with_traits(FontTraits::Bold)));
        toggle_font_trait(&mut doc, 0..2, FontTrait::Bold, &base);
        assert_eq!(traits_at(&doc, 0), FontTraits::Bold);
        assert_eq!(traits_at(&doc, 1), FontTraits::Bold);
    }

    #[test]
    fn test_command_font_traits() {
        assert_eq!(FormatCommand::Bold.font_trait(), Some(FontTrait::Bold));
        assert_eq!(FormatCommand::Link.font_trait(), None);
    }
}
