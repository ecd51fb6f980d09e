//! Attribute keys and values carried by document runs.

use crate::fonts::FontSpec;
use crate::markdown::attachments::AttachmentRecord;
use egui::Color32;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

/// The attribute slots a run can occupy. Each key has its own run list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKey {
    Font,
    ForegroundColor,
    BackgroundColor,
    Link,
    Hidden,
    ParagraphStyle,
    Attachment,
}

impl AttributeKey {
    /// Keys the span styler owns and resets before every pass.
    pub const MARKDOWN_DERIVED: [AttributeKey; 6] = [
        AttributeKey::Font,
        AttributeKey::ForegroundColor,
        AttributeKey::BackgroundColor,
        AttributeKey::Link,
        AttributeKey::Hidden,
        AttributeKey::ParagraphStyle,
    ];
}

/// Where a link points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Web or mailto URL
    Url(String),
    /// File on disk, already resolved against the note's base directory
    File(PathBuf),
    /// Another note, by title (`[[Title]]`)
    Note(String),
}

/// Paragraph-level layout hints.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParagraphStyle {
    /// Extra spacing between lines, in points
    pub line_spacing: f32,
    /// Left indent applied to wrapped lines, in points
    pub head_indent: f32,
}

/// A value stored in a run. Each variant belongs to exactly one key.
#[derive(Debug, Clone)]
pub enum AttributeValue {
    Font(FontSpec),
    ForegroundColor(Color32),
    BackgroundColor(Color32),
    Link(LinkTarget),
    Hidden,
    ParagraphStyle(ParagraphStyle),
    Attachment(Arc<AttachmentRecord>),
}

impl AttributeValue {
    /// The key this value is stored under.
    pub fn key(&self) -> AttributeKey {
        match self {
            AttributeValue::Font(_) => AttributeKey::Font,
            AttributeValue::ForegroundColor(_) => AttributeKey::ForegroundColor,
            AttributeValue::BackgroundColor(_) => AttributeKey::BackgroundColor,
            AttributeValue::Link(_) => AttributeKey::Link,
            AttributeValue::Hidden => AttributeKey::Hidden,
            AttributeValue::ParagraphStyle(_) => AttributeKey::ParagraphStyle,
            AttributeValue::Attachment(_) => AttributeKey::Attachment,
        }
    }

    pub fn as_font(&self) -> Option<&FontSpec> {
        match self {
            AttributeValue::Font(font) => Some(font),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color32> {
        match self {
            AttributeValue::ForegroundColor(c) | AttributeValue::BackgroundColor(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&LinkTarget> {
        match self {
            AttributeValue::Link(target) => Some(target),
            _ => None,
        }
    }

    pub fn as_attachment(&self) -> Option<&Arc<AttachmentRecord>> {
        match self {
            AttributeValue::Attachment(record) => Some(record),
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::Font(a), AttributeValue::Font(b)) => a == b,
            (AttributeValue::ForegroundColor(a), AttributeValue::ForegroundColor(b)) => a == b,
            (AttributeValue::BackgroundColor(a), AttributeValue::BackgroundColor(b)) => a == b,
            (AttributeValue::Link(a), AttributeValue::Link(b)) => a == b,
            (AttributeValue::Hidden, AttributeValue::Hidden) => true,
            (AttributeValue::ParagraphStyle(a), AttributeValue::ParagraphStyle(b)) => a == b,
            // Two placeholders are only the same attachment if they share the record.
            (AttributeValue::Attachment(a), AttributeValue::Attachment(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A flattened view of one run, used for comparisons and debugging output.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpan {
    pub key: AttributeKey,
    pub range: Range<usize>,
    pub value: AttributeValue,
}
