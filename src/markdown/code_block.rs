//! Code Block Locator
//!
//! Given a paragraph that looks like part of a code block, find the whole
//! block. Fenced blocks are found by scanning the document for fence pairs;
//! indented blocks by walking neighbouring lines while they stay indented.
//!
//! The indented walk is bounded by a step budget that lives in each call,
//! so a document made entirely of indented lines cannot make a single
//! lookup run away.

use super::patterns::{patterns, CaptureRole, PatternKind};
use crate::string_utils::{
    is_blank, line_content, next_paragraph, paragraph_at, paragraphs, previous_paragraph,
};
use log::debug;
use std::ops::Range;

/// Default number of lines the indented walk may visit in each direction.
pub const MAX_WALK_STEPS: usize = 100;

/// How a code block is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStyle {
    /// Between matching ```` ``` ```` or `~~~` lines
    Fenced,
    /// Every line prefixed by a tab or four spaces
    Indented,
}

/// A located code block. Not stored anywhere; recomputed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockRange {
    /// Whole block, including fence lines and the final newline
    pub range: Range<usize>,
    pub fence_style: FenceStyle,
    /// Language tag of a fenced block, if one was given
    pub language_hint: Option<String>,
}

impl CodeBlockRange {
    /// Range of the code itself, without fence lines.
    pub fn content_range(&self, text: &str) -> Range<usize> {
        match self.fence_style {
            FenceStyle::Indented => self.range.clone(),
            FenceStyle::Fenced => {
                let opening = paragraph_at(text, self.range.start);
                let closing = paragraph_at(text, self.range.end.saturating_sub(1));
                if closing.start <= opening.end {
                    opening.end..opening.end
                } else {
                    opening.end..closing.start
                }
            }
        }
    }

    /// The opening and closing fence lines of a fenced block.
    pub fn fence_lines(&self, text: &str) -> Vec<Range<usize>> {
        match self.fence_style {
            FenceStyle::Indented => Vec::new(),
            FenceStyle::Fenced => vec![
                paragraph_at(text, self.range.start),
                paragraph_at(text, self.range.end.saturating_sub(1)),
            ],
        }
    }
}

/// Finds code block boundaries.
#[derive(Debug, Clone, Copy)]
pub struct CodeBlockLocator {
    max_steps: usize,
}

impl Default for CodeBlockLocator {
    fn default() -> Self {
        Self::new(MAX_WALK_STEPS)
    }
}

impl CodeBlockLocator {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }

    /// Full block containing `paragraph`, or `None` if it is not code.
    pub fn locate(&self, text: &str, paragraph: Range<usize>) -> Option<CodeBlockRange> {
        let paragraph = paragraph_at(text, paragraph.start);

        if let Some(block) = find_fenced_blocks(text)
            .into_iter()
            .find(|block| block.range.start <= paragraph.start && paragraph.start < block.range.end)
        {
            return Some(block);
        }

        if is_indented_code_line(text, paragraph.clone()) {
            return Some(self.walk_indented(text, paragraph));
        }
        None
    }

    /// Every code block in the document, in order.
    pub fn locate_all(&self, text: &str) -> Vec<CodeBlockRange> {
        let fenced = find_fenced_blocks(text);
        let mut blocks = Vec::with_capacity(fenced.len());
        let mut fenced_iter = fenced.into_iter().peekable();
        let mut resume_at = 0;

        for paragraph in paragraphs(text, 0..text.len()) {
            if paragraph.start < resume_at {
                continue;
            }
            if let Some(block) = fenced_iter.next_if(|b| b.range.start <= paragraph.start) {
                resume_at = block.range.end;
                blocks.push(block);
                continue;
            }
            if is_indented_code_line(text, paragraph.clone()) {
                let block = self.walk_forward(text, paragraph);
                resume_at = block.range.end;
                blocks.push(block);
            }
        }
        blocks
    }

    fn walk_indented(&self, text: &str, paragraph: Range<usize>) -> CodeBlockRange {
        let mut start = paragraph.start;
        let mut steps = 0;
        while steps < self.max_steps {
            match previous_paragraph(text, start) {
                Some(prev) if is_indented_code_line(text, prev.clone()) => {
                    start = prev.start;
                    steps += 1;
                }
                _ => break,
            }
        }
        if steps == self.max_steps {
            debug!("Indented code walk hit the step bound going backward at {}", start);
        }

        let mut block = self.walk_forward(text, paragraph);
        block.range.start = start;
        block
    }

    fn walk_forward(&self, text: &str, paragraph: Range<usize>) -> CodeBlockRange {
        let mut end = paragraph.end;
        let mut steps = 0;
        while steps < self.max_steps {
            match next_paragraph(text, end) {
                Some(next) if is_indented_code_line(text, next.clone()) => {
                    end = next.end;
                    steps += 1;
                }
                _ => break,
            }
        }
        if steps == self.max_steps {
            debug!("Indented code walk hit the step bound going forward at {}", end);
        }

        CodeBlockRange {
            range: paragraph.start..end,
            fence_style: FenceStyle::Indented,
            language_hint: None,
        }
    }
}

/// Whether the paragraph is an indented code line (and not a nested list item).
pub fn is_indented_code_line(text: &str, paragraph: Range<usize>) -> bool {
    if is_blank(text, paragraph.clone()) {
        return false;
    }
    let line = line_content(text, paragraph);
    let library = patterns();
    if !library.get(PatternKind::IndentedCode).is_match(line) {
        return false;
    }
    let is_list_item = library.get(PatternKind::UnorderedList).is_match(line)
        || library.get(PatternKind::OrderedList).is_match(line);
    !is_list_item
}

/// Whether the paragraph is an opening or closing fence line.
pub fn is_fence_line(text: &str, paragraph: Range<usize>) -> bool {
    patterns()
        .get(PatternKind::FenceOpening)
        .is_match(line_content(text, paragraph))
}

/// Every complete fence pair in the document, in order.
///
/// An opening fence without a matching closing fence does not form a block.
pub fn find_fenced_blocks(text: &str) -> Vec<CodeBlockRange> {
    let fences: Vec<_> = patterns()
        .matches(PatternKind::FenceOpening, text, 0..text.len())
        .collect();

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < fences.len() {
        let opening = &fences[i];
        let Some(marker) = opening.text(text, CaptureRole::OpeningMarker) else {
            i += 1;
            continue;
        };
        let fence_char = marker.chars().next().unwrap_or('`');
        let fence_len = marker.len();

        let closing = fences[i + 1..].iter().position(|candidate| {
            let line = line_content(text, paragraph_at(text, candidate.range.start));
            is_closing_fence(line, fence_char, fence_len)
        });

        match closing {
            Some(offset) => {
                let closing_index = i + 1 + offset;
                let closing_line = paragraph_at(text, fences[closing_index].range.start);
                let opening_line = paragraph_at(text, opening.range.start);
                let language_hint = opening
                    .text(text, CaptureRole::LanguageTag)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string);
                blocks.push(CodeBlockRange {
                    range: opening_line.start..closing_line.end,
                    fence_style: FenceStyle::Fenced,
                    language_hint,
                });
                i = closing_index + 1;
            }
            None => i += 1,
        }
    }
    blocks
}

fn is_closing_fence(line: &str, fence_char: char, min_len: usize) -> bool {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return false;
    }
    let trimmed = line.trim();
    trimmed.len() >= min_len && trimmed.chars().all(|c| c == fence_char)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indented_block_boundaries() {
        let text = "line1\n\tcode1\n\tcode2\nline2\n";
        let locator = CodeBlockLocator::default();
        let trigger = paragraph_at(text, 7);
        let block = locator.locate(text, trigger).unwrap();
        assert_eq!(block.fence_style, FenceStyle::Indented);
        assert_eq!(&text[block.range.clone()], "\tcode1\n\tcode2\n");

        // Starting from the second line gives the same block
        let again = locator.locate(text, paragraph_at(text, 14)).unwrap();
        assert_eq!(again, block);
    }

    #[test]
    fn test_fenced_block_with_language() {
        let text = "```python\nprint(1)\n```\n";
        let locator = CodeBlockLocator::default();
        let block = locator.locate(text, paragraph_at(text, 0)).unwrap();
        assert_eq!(block.fence_style, FenceStyle::Fenced);
        assert_eq!(block.range, 0..text.len());
        assert_eq!(block.language_hint.as_deref(), Some("python"));
        assert_eq!(&text[block.content_range(text)], "print(1)\n");
    }

    #[test]
    fn test_paragraph_inside_fence_finds_block() {
        let text = "intro\n~~~\n    indented inside\n~~~\noutro\n";
        let block = CodeBlockLocator::default()
            .locate(text, paragraph_at(text, 12))
            .unwrap();
        assert_eq!(block.fence_style, FenceStyle::Fenced);
        assert_eq!(&text[block.range], "~~~\n    indented inside\n~~~\n");
    }

    #[test]
    fn test_unclosed_fence_is_not_a_block() {
        let text = "```rust\nfn main() {}\n";
        assert!(find_fenced_blocks(text).is_empty());
        assert!(CodeBlockLocator::default()
            .locate(text, paragraph_at(text, 9))
            .is_none());
    }

    #[test]
    fn test_closing_fence_must_be_long_enough() {
        let text = "````\n```\nstill code\n````\n";
        let blocks = find_fenced_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].range, 0..text.len());
        assert_eq!(blocks[0].language_hint, None);
    }

    #[test]
    fn test_plain_paragraph_is_not_code() {
        let text = "just text\n";
        assert!(CodeBlockLocator::default()
            .locate(text, 0..text.len())
            .is_none());
    }

    #[test]
    fn test_nested_list_item_is_not_code() {
        let text = "- item\n    - nested\n";
        assert!(CodeBlockLocator::default()
            .locate(text, paragraph_at(text, 8))
            .is_none());
    }

    #[test]
    fn test_walk_is_bounded() {
        let text = "    indented line\n".repeat(500);
        let line_len = "    indented line\n".len();
        let trigger = paragraph_at(&text, 250 * line_len);
        let block = CodeBlockLocator::default().locate(&text, trigger).unwrap();

        let lines = text[block.range.clone()].lines().count();
        assert_eq!(lines, 2 * MAX_WALK_STEPS + 1);
        assert_eq!(block.range.start, 150 * line_len);
    }

    #[test]
    fn test_locate_is_idempotent_with_small_bound() {
        let text = "\tcode\n".repeat(20);
        let locator = CodeBlockLocator::new(3);
        let first = locator.locate(&text, paragraph_at(&text, 60));
        let second = locator.locate(&text, paragraph_at(&text, 60));
        assert_eq!(first, second);
        assert_eq!(text[first.unwrap().range].lines().count(), 7);
    }

    #[test]
    fn test_locate_all_mixed() {
        let text = "a\n```\nx\n```\nb\n    y\n    z\nc\n";
        let blocks = CodeBlockLocator::default().locate_all(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(&text[blocks[0].range.clone()], "```\nx\n```\n");
        assert_eq!(&text[blocks[1].range.clone()], "    y\n    z\n");
    }

    #[test]
    fn test_fence_line_detection() {
        let text = "```js\ncode\n```";
        assert!(is_fence_line(text, paragraph_at(text, 0)));
        assert!(!is_fence_line(text, paragraph_at(text, 6)));
        assert!(is_fence_line(text, paragraph_at(text, 11)));
    }
}
