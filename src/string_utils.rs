//! UTF-8 Safe String and Paragraph Utilities
//!
//! All buffer offsets in notestyle are byte offsets into UTF-8 text. Ranges
//! handed in by the editing surface (or shifted by concurrent edits) may land
//! inside a multi-byte character, so every slice goes through the boundary
//! helpers here.
//!
//! A *paragraph* is one line of the buffer, including its trailing `\n` when
//! present. This matches how the editing surface reports edited ranges.

use std::ops::Range;

// ─────────────────────────────────────────────────────────────────────────────
// Character Boundary Functions
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the largest index that is less than or equal to `index`
/// and is on a UTF-8 character boundary.
///
/// If `index` is greater than the string length, returns the string length.
#[inline]
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    if index == 0 {
        return 0;
    }

    let bytes = s.as_bytes();
    let mut i = index;
    while i > 0 && !is_utf8_char_start(bytes[i]) {
        i -= 1;
    }
    i
}

/// Returns the smallest index that is greater than or equal to `index`
/// and is on a UTF-8 character boundary.
#[inline]
pub fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    if index == 0 {
        return 0;
    }

    let bytes = s.as_bytes();
    let mut i = index;
    while i < bytes.len() && !is_utf8_char_start(bytes[i]) {
        i += 1;
    }
    i
}

/// Check if a byte is the start of a UTF-8 character.
///
/// Continuation bytes look like `10xxxxxx`; everything else starts a char.
#[inline]
fn is_utf8_char_start(byte: u8) -> bool {
    (byte & 0b11000000) != 0b10000000
}

/// Clamp a range to the string and widen it to character boundaries.
///
/// The start is floored and the end is ceiled. A reversed range collapses
/// to an empty range at its start.
#[inline]
pub fn clamp_range(s: &str, range: Range<usize>) -> Range<usize> {
    let start = floor_char_boundary(s, range.start.min(s.len()));
    let end = ceil_char_boundary(s, range.end.min(s.len()));
    if start > end {
        start..start
    } else {
        start..end
    }
}

/// Safely slice a string by a byte range, adjusting both ends to valid
/// UTF-8 character boundaries.
#[inline]
pub fn safe_slice(s: &str, range: Range<usize>) -> &str {
    let range = clamp_range(s, range);
    &s[range]
}

// ─────────────────────────────────────────────────────────────────────────────
// Paragraph Ranges
// ─────────────────────────────────────────────────────────────────────────────

/// Range of the paragraph (line) containing `offset`, including its newline.
///
/// An offset equal to the text length belongs to the last line.
pub fn paragraph_at(text: &str, offset: usize) -> Range<usize> {
    let offset = floor_char_boundary(text, offset.min(text.len()));
    let start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = text[offset..]
        .find('\n')
        .map(|i| offset + i + 1)
        .unwrap_or(text.len());
    start..end
}

/// Range covering every paragraph touched by `range`.
pub fn paragraph_range(text: &str, range: Range<usize>) -> Range<usize> {
    let range = clamp_range(text, range);
    let first = paragraph_at(text, range.start);
    // An edit ending exactly after a newline touches only the lines before it.
    let last_offset = if range.end > range.start && text[..range.end].ends_with('\n') {
        range.end - 1
    } else {
        range.end
    };
    let last = paragraph_at(text, last_offset.max(range.start));
    first.start..last.end.max(first.end)
}

/// The paragraph immediately before the one starting at `start`, if any.
pub fn previous_paragraph(text: &str, start: usize) -> Option<Range<usize>> {
    if start == 0 || start > text.len() {
        return None;
    }
    Some(paragraph_at(text, start - 1))
}

/// The paragraph starting at `end` (the end of the current one), if any.
pub fn next_paragraph(text: &str, end: usize) -> Option<Range<usize>> {
    if end >= text.len() {
        return None;
    }
    Some(paragraph_at(text, end))
}

/// Iterate over every paragraph range inside `range`.
pub fn paragraphs(text: &str, range: Range<usize>) -> impl Iterator<Item = Range<usize>> + '_ {
    let range = paragraph_range(text, range);
    let end = range.end;
    let mut cursor = range.start;
    std::iter::from_fn(move || {
        if cursor >= end {
            return None;
        }
        let paragraph = paragraph_at(text, cursor);
        cursor = paragraph.end.max(cursor + 1);
        Some(paragraph)
    })
}

/// Paragraph content with the trailing line terminator removed.
#[inline]
pub fn line_content(text: &str, paragraph: Range<usize>) -> &str {
    safe_slice(text, paragraph).trim_end_matches(['\n', '\r'])
}

/// Whether a paragraph contains nothing but whitespace.
#[inline]
pub fn is_blank(text: &str, paragraph: Range<usize>) -> bool {
    safe_slice(text, paragraph).trim().is_empty()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_ascii() {
        let s = "Hello";
        assert_eq!(floor_char_boundary(s, 0), 0);
        assert_eq!(floor_char_boundary(s, 2), 2);
        assert_eq!(floor_char_boundary(s, 10), 5);
    }

    #[test]
    fn test_floor_and_ceil_multibyte() {
        let s = "Hei på deg"; // 'å' occupies bytes 5..7
        assert_eq!(floor_char_boundary(s, 6), 5);
        assert_eq!(ceil_char_boundary(s, 6), 7);
    }

    #[test]
    fn test_safe_slice_mid_char() {
        let s = "Hello 世界!";
        assert_eq!(safe_slice(s, 6..12), "世界");
        assert_eq!(safe_slice(s, 7..8), "世");
        assert_eq!(safe_slice(s, 40..50), "");
    }

    #[test]
    fn test_clamp_range_reversed() {
        assert_eq!(clamp_range("abcdef", 4..2), 4..4);
    }

    #[test]
    fn test_paragraph_at() {
        let text = "one\ntwo\nthree";
        assert_eq!(paragraph_at(text, 0), 0..4);
        assert_eq!(paragraph_at(text, 5), 4..8);
        assert_eq!(paragraph_at(text, text.len()), 8..13);
    }

    #[test]
    fn test_paragraph_range_spans_lines() {
        let text = "one\ntwo\nthree\n";
        assert_eq!(paragraph_range(text, 1..6), 0..8);
        // Ending right after a newline does not pull in the next line
        assert_eq!(paragraph_range(text, 4..8), 4..8);
    }

    #[test]
    fn test_previous_and_next_paragraph() {
        let text = "a\nb\nc\n";
        assert_eq!(previous_paragraph(text, 2), Some(0..2));
        assert_eq!(previous_paragraph(text, 0), None);
        assert_eq!(next_paragraph(text, 2), Some(2..4));
        assert_eq!(next_paragraph(text, 6), None);
    }

    #[test]
    fn test_paragraphs_iterator() {
        let text = "a\nbb\n\nccc";
        let lines: Vec<_> = paragraphs(text, 0..text.len()).collect();
        assert_eq!(lines, vec![0..2, 2..5, 5..6, 6..9]);
    }

    #[test]
    fn test_line_content_and_blank() {
        let text = "  \r\nvalue\n";
        assert!(is_blank(text, 0..4));
        assert_eq!(line_content(text, 4..10), "value");
    }
}
