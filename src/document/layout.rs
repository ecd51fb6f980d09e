//! Conversion of a styled document into an egui `LayoutJob`.
//!
//! This is the seam to the editing surface: every distinct combination of
//! attributes becomes one `LayoutSection`.

use super::{AttributeKey, Document};
use crate::config::StylingConfig;
use crate::fonts::FontSpec;
use crate::theme::MarkdownColors;
use egui::text::{LayoutJob, TextFormat};
use egui::{Color32, FontId, Stroke};
use std::collections::BTreeSet;

/// Font size used for hidden syntax markers.
pub const HIDDEN_FONT_SIZE: f32 = 0.1;

/// Build a layout job for the whole document.
pub fn to_layout_job(doc: &Document, config: &StylingConfig, colors: &MarkdownColors) -> LayoutJob {
    let mut job = LayoutJob::default();
    let text = doc.text();
    let base_font = FontSpec::new(config.font_family.clone(), config.font_size);

    // Every run boundary starts a new section.
    let mut cuts: BTreeSet<usize> = BTreeSet::new();
    cuts.insert(0);
    cuts.insert(text.len());
    for span in doc.spans() {
        cuts.insert(span.range.start.min(text.len()));
        cuts.insert(span.range.end.min(text.len()));
    }

    let cuts: Vec<usize> = cuts.into_iter().collect();
    for window in cuts.windows(2) {
        let (start, end) = (window[0], window[1]);
        if start >= end {
            continue;
        }
        let Some(segment) = text.get(start..end) else {
            continue;
        };
        job.append(segment, 0.0, section_format(doc, start, &base_font, colors));
    }

    job
}

fn section_format(
    doc: &Document,
    offset: usize,
    base_font: &FontSpec,
    colors: &MarkdownColors,
) -> TextFormat {
    if doc.attribute_at(AttributeKey::Hidden, offset).is_some() {
        return TextFormat {
            font_id: FontId::proportional(HIDDEN_FONT_SIZE),
            color: Color32::TRANSPARENT,
            ..Default::default()
        };
    }

    let font = doc
        .attribute_at(AttributeKey::Font, offset)
        .and_then(|v| v.as_font())
        .unwrap_or(base_font);
    let color = doc
        .attribute_at(AttributeKey::ForegroundColor, offset)
        .and_then(|v| v.as_color())
        .unwrap_or(colors.text);
    let background = doc
        .attribute_at(AttributeKey::BackgroundColor, offset)
        .and_then(|v| v.as_color())
        .unwrap_or(Color32::TRANSPARENT);
    let underline = if doc.attribute_at(AttributeKey::Link, offset).is_some() {
        Stroke::new(1.0, color)
    } else {
        Stroke::NONE
    };

    TextFormat {
        font_id: font.font_id(),
        color,
        background,
        italics: font.traits.is_italic(),
        underline,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::AttributeValue;

    #[test]
    fn test_plain_document_is_one_section() {
        let doc = Document::new("plain text");
        let job = to_layout_job(&doc, &StylingConfig::default(), &MarkdownColors::light());
        assert_eq!(job.text, "plain text");
        assert_eq!(job.sections.len(), 1);
    }

    #[test]
    fn test_runs_split_sections() {
        let mut doc = Document::new("# Title");
        doc.set_attribute(0..2, AttributeValue::Hidden);
        let job = to_layout_job(&doc, &StylingConfig::default(), &MarkdownColors::light());
        assert_eq!(job.sections.len(), 2);
        assert_eq!(job.sections[0].byte_range, 0..2);
        assert_eq!(job.sections[0].format.color, Color32::TRANSPARENT);
        assert_eq!(job.sections[1].format.color, MarkdownColors::light().text);
    }
}
