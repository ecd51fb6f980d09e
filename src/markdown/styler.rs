//! Span Styler
//!
//! Applies markdown attributes to a range of a [`Document`]. Every call first
//! resets the markdown-derived attributes of the range, then runs the
//! pattern passes in a fixed order. Later passes may override colors and
//! fonts set by earlier ones, so the order is part of the behavior:
//!
//! autolinks, headers, reference links, lists, reference definitions,
//! inline links, images, wiki links, block quotes, strict italic,
//! strict bold, loose italic, loose bold, emails, inline code.
//!
//! The styler never changes text. Image matches are only reported; turning
//! them into attachments is the resolver's job.

use super::patterns::{patterns, CaptureRole, MatchResult, PatternKind};
use crate::config::StylingConfig;
use crate::document::{AttributeKey, AttributeValue, Document, LinkTarget, ParagraphStyle};
use crate::fonts::{FontSpec, FontTrait};
use crate::string_utils::{paragraph_at, paragraph_range};
use crate::theme::MarkdownColors;
use egui::Color32;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Font size multipliers for header levels 1..=6.
const HEADER_SCALES: [f32; 6] = [1.8, 1.5, 1.3, 1.15, 1.05, 1.0];

/// Wrapped-line indent for list items, in multiples of the body font size.
const LIST_INDENT_EMS: f32 = 1.5;

/// An image found while styling, for the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLink {
    /// Whole `![title](destination)` range
    pub range: Range<usize>,
    pub title: String,
    pub destination: String,
}

/// What a styling pass found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleReport {
    /// Range that was actually styled (widened to whole paragraphs)
    pub range: Range<usize>,
    pub images: Vec<ImageLink>,
    /// Loose emphasis matches that repeated a strict match on the same range
    pub duplicate_emphasis: usize,
    /// Number of constructs styled
    pub matches: usize,
}

/// Applies markdown attributes using one configuration snapshot.
#[derive(Debug, Clone)]
pub struct SpanStyler<'a> {
    config: &'a StylingConfig,
    colors: &'a MarkdownColors,
    base_dir: Option<PathBuf>,
}

impl<'a> SpanStyler<'a> {
    pub fn new(config: &'a StylingConfig, colors: &'a MarkdownColors) -> Self {
        Self {
            config,
            colors,
            base_dir: None,
        }
    }

    /// Directory relative link destinations resolve against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn base_font(&self) -> FontSpec {
        FontSpec::new(self.config.font_family.clone(), self.config.font_size)
    }

    pub fn code_font(&self) -> FontSpec {
        FontSpec::monospace(self.config.code_font_family.clone(), self.config.code_font_size)
    }

    fn header_font(&self, level: usize) -> FontSpec {
        let scale = HEADER_SCALES[level.clamp(1, 6) - 1];
        self.base_font()
            .with_size(self.config.font_size * scale)
            .with_trait(FontTrait::Bold)
    }

    fn paragraph_style(&self) -> ParagraphStyle {
        ParagraphStyle {
            line_spacing: self.config.line_spacing,
            head_indent: 0.0,
        }
    }

    /// Put `range` back to plain body text.
    pub fn reset(&self, doc: &mut Document, range: Range<usize>) {
        doc.set_attribute(range.clone(), AttributeValue::Font(self.base_font()));
        doc.set_attribute(range.clone(), AttributeValue::ForegroundColor(self.colors.text));
        doc.set_attribute(
            range.clone(),
            AttributeValue::ParagraphStyle(self.paragraph_style()),
        );
        for key in [
            AttributeKey::BackgroundColor,
            AttributeKey::Link,
            AttributeKey::Hidden,
        ] {
            doc.remove_attribute(key, range.clone());
        }
    }

    /// Reset and restyle the paragraphs touched by `range`.
    ///
    /// Matches intersecting any of `code_blocks` are skipped.
    pub fn style(
        &self,
        doc: &mut Document,
        range: Range<usize>,
        code_blocks: &[Range<usize>],
    ) -> StyleReport {
        let range = paragraph_range(doc.text(), range);
        self.reset(doc, range.clone());
        let text = doc.text().to_owned();

        let mut pass = Pass {
            styler: self,
            doc,
            text: &text,
            range: range.clone(),
            code_blocks,
            definitions: None,
            report: StyleReport {
                range,
                ..Default::default()
            },
        };

        pass.autolinks();
        pass.headers();
        pass.reference_links();
        pass.lists();
        pass.reference_definitions();
        pass.inline_links();
        pass.images();
        pass.wiki_links();
        pass.block_quotes();
        pass.emphasis();
        pass.emails();
        pass.inline_code();

        pass.report
    }
}

/// State of one `style` call.
struct Pass<'s, 'a, 'd> {
    styler: &'s SpanStyler<'a>,
    doc: &'d mut Document,
    text: &'s str,
    range: Range<usize>,
    code_blocks: &'s [Range<usize>],
    /// Lazily built `[id]: url` table, keyed by lowercase id
    definitions: Option<HashMap<String, String>>,
    report: StyleReport,
}

impl Pass<'_, '_, '_> {
    fn found(&self, kind: PatternKind) -> Vec<MatchResult> {
        patterns()
            .matches(kind, self.text, self.range.clone())
            .filter(|m| !self.in_code(&m.range))
            .collect()
    }

    fn in_code(&self, range: &Range<usize>) -> bool {
        self.code_blocks
            .iter()
            .any(|block| block.start < range.end && range.start < block.end)
    }

    fn colors(&self) -> &MarkdownColors {
        self.styler.colors
    }

    fn color(&mut self, range: Range<usize>, color: Color32) {
        self.doc
            .set_attribute(range, AttributeValue::ForegroundColor(color));
    }

    /// Color a syntax range and hide it when markers are hidden.
    fn syntax(&mut self, range: Range<usize>) {
        let color = self.colors().syntax;
        self.color(range.clone(), color);
        if self.styler.config.hide_syntax_markers {
            self.doc.set_attribute(range, AttributeValue::Hidden);
        }
    }

    fn markers(&mut self, m: &MatchResult) {
        for marker in m.markers() {
            self.syntax(marker);
        }
    }

    fn link(&mut self, range: Range<usize>, target: LinkTarget) {
        let color = self.colors().link;
        self.color(range.clone(), color);
        self.doc.set_attribute(range, AttributeValue::Link(target));
    }

    fn add_trait(&mut self, range: Range<usize>, t: FontTrait) {
        let base = self.styler.base_font();
        self.doc.update_attribute(AttributeKey::Font, range, |current| {
            let font = current.and_then(|v| v.as_font()).cloned();
            Some(AttributeValue::Font(
                font.unwrap_or_else(|| base.clone()).with_trait(t),
            ))
        });
    }

    fn link_target(&self, destination: &str) -> LinkTarget {
        link_target(destination, self.styler.base_dir.as_deref())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Passes
    // ─────────────────────────────────────────────────────────────────────────

    fn autolinks(&mut self) {
        for m in self.found(PatternKind::Autolink) {
            let Some(dest) = m.group(CaptureRole::Destination) else {
                continue;
            };
            let target = self.link_target(&self.text[dest.clone()]);
            self.link(dest, target);
            self.markers(&m);
            self.report.matches += 1;
        }
    }

    fn headers(&mut self) {
        for m in self.found(PatternKind::AtxHeader) {
            let level = m
                .text(self.text, CaptureRole::OpeningMarker)
                .map(|marker| marker.chars().filter(|c| *c == '#').count())
                .unwrap_or(1);
            self.header(&m, m.range.clone(), level);
        }

        for m in self.found(PatternKind::SetextHeader) {
            let level = match m.text(self.text, CaptureRole::ClosingMarker) {
                Some(underline) if underline.starts_with('=') => 1,
                _ => 2,
            };
            let span = m.group(CaptureRole::Text).unwrap_or(m.range.clone());
            self.header(&m, span, level);
        }
    }

    fn header(&mut self, m: &MatchResult, span: Range<usize>, level: usize) {
        let font = self.styler.header_font(level);
        self.doc
            .set_attribute(span.clone(), AttributeValue::Font(font));
        let heading = self.colors().heading;
        self.color(span, heading);
        self.markers(m);
        self.report.matches += 1;
    }

    fn reference_links(&mut self) {
        let found = self.found(PatternKind::ReferenceLink);
        let text = self.text;
        for m in found {
            let Some(text_range) = m.group(CaptureRole::Text) else {
                continue;
            };
            let id = match m.text(text, CaptureRole::Reference) {
                Some(id) if !id.trim().is_empty() => id,
                _ => &text[text_range.clone()],
            };
            let destination = self.definitions().get(&normalize_reference(id)).cloned();

            match destination {
                Some(dest) => {
                    let target = self.link_target(&dest);
                    self.link(text_range, target);
                }
                None => {
                    let link_color = self.colors().link;
                    self.color(text_range, link_color);
                }
            }
            self.markers(&m);
            if let Some(reference) = m.group(CaptureRole::Reference) {
                self.syntax(reference);
            }
            self.report.matches += 1;
        }
    }

    fn definitions(&mut self) -> &HashMap<String, String> {
        let text = self.text;
        self.definitions.get_or_insert_with(|| {
            patterns()
                .matches(PatternKind::ReferenceDefinition, text, 0..text.len())
                .filter_map(|m| {
                    let id = m.text(text, CaptureRole::Reference)?;
                    let dest = m.text(text, CaptureRole::Destination)?;
                    Some((normalize_reference(id), dest.to_string()))
                })
                .collect()
        })
    }

    fn lists(&mut self) {
        let indent = self.styler.config.font_size * LIST_INDENT_EMS;
        let line_spacing = self.styler.config.line_spacing;
        for kind in [PatternKind::UnorderedList, PatternKind::OrderedList] {
            for m in self.found(kind) {
                let Some(marker) = m.group(CaptureRole::OpeningMarker) else {
                    continue;
                };
                let color = self.colors().list_marker;
                self.color(marker, color);
                let line = paragraph_at(self.text, m.range.start);
                self.doc.set_attribute(
                    line,
                    AttributeValue::ParagraphStyle(ParagraphStyle {
                        line_spacing,
                        head_indent: indent,
                    }),
                );
                self.report.matches += 1;
            }
        }
    }

    fn reference_definitions(&mut self) {
        for m in self.found(PatternKind::ReferenceDefinition) {
            self.markers(&m);
            if let Some(reference) = m.group(CaptureRole::Reference) {
                let color = self.colors().syntax;
                self.color(reference, color);
            }
            if let Some(dest) = m.group(CaptureRole::Destination) {
                let target = self.link_target(&self.text[dest.clone()]);
                self.link(dest, target);
            }
            if let Some(title) = m.group(CaptureRole::Text) {
                let color = self.colors().syntax;
                self.color(title, color);
            }
            self.report.matches += 1;
        }
    }

    fn inline_links(&mut self) {
        for m in self.found(PatternKind::InlineLink) {
            let (Some(text_range), Some(dest)) = (
                m.group(CaptureRole::Text),
                m.group(CaptureRole::Destination),
            ) else {
                continue;
            };
            let target = self.link_target(&self.text[dest.clone()]);
            self.link(text_range, target);
            self.doc.remove_attribute(AttributeKey::Link, dest.clone());
            self.syntax(dest);
            self.markers(&m);
            self.report.matches += 1;
        }
    }

    fn images(&mut self) {
        for m in self.found(PatternKind::Image) {
            let title = m.text(self.text, CaptureRole::Text).unwrap_or_default();
            let Some(dest) = m.group(CaptureRole::Destination) else {
                continue;
            };
            self.doc.remove_attribute(AttributeKey::Link, m.range.clone());
            self.syntax(dest.clone());
            self.markers(&m);
            if let Some(alt) = m.group(CaptureRole::Text) {
                let quote = self.colors().quote;
                self.color(alt, quote);
            }
            self.report.images.push(ImageLink {
                range: m.range.clone(),
                title: title.to_string(),
                destination: strip_title(&self.text[dest]).to_string(),
            });
            self.report.matches += 1;
        }
    }

    fn wiki_links(&mut self) {
        for m in self.found(PatternKind::WikiLink) {
            let Some(title) = m.group(CaptureRole::Text) else {
                continue;
            };
            let target = LinkTarget::Note(self.text[title.clone()].trim().to_string());
            self.link(title, target);
            self.markers(&m);
            self.report.matches += 1;
        }
    }

    fn block_quotes(&mut self) {
        for m in self.found(PatternKind::BlockQuote) {
            if let Some(body) = m.group(CaptureRole::Text) {
                let quote = self.colors().quote;
                self.color(body.clone(), quote);
                self.add_trait(body, FontTrait::Italic);
            }
            self.markers(&m);
            self.report.matches += 1;
        }
    }

    fn emphasis(&mut self) {
        let mut strict: HashSet<(PatternKind, Range<usize>)> = HashSet::new();
        let passes = [
            (PatternKind::StrictItalic, PatternKind::StrictItalic, FontTrait::Italic),
            (PatternKind::StrictBold, PatternKind::StrictBold, FontTrait::Bold),
            (PatternKind::LooseItalic, PatternKind::StrictItalic, FontTrait::Italic),
            (PatternKind::LooseBold, PatternKind::StrictBold, FontTrait::Bold),
        ];

        for (kind, strict_kind, font_trait) in passes {
            let is_loose = kind != strict_kind;
            for m in self.found(kind) {
                if is_loose {
                    if strict.contains(&(strict_kind, m.range.clone())) {
                        debug!(
                            "{:?} repeated {:?} at {:?}",
                            kind, strict_kind, m.range
                        );
                        self.report.duplicate_emphasis += 1;
                    }
                } else {
                    strict.insert((kind, m.range.clone()));
                }

                if let Some(body) = m.group(CaptureRole::Text) {
                    self.add_trait(body, font_trait);
                }
                self.markers(&m);
                self.report.matches += 1;
            }
        }
    }

    fn emails(&mut self) {
        for m in self.found(PatternKind::AutolinkEmail) {
            let Some(address) = m.group(CaptureRole::Destination) else {
                continue;
            };
            if self.doc.has_attribute_in(AttributeKey::Link, m.range.clone()) {
                continue;
            }
            let url = format!("mailto:{}", &self.text[address.clone()]);
            self.link(m.range.clone(), LinkTarget::Url(url));
            self.report.matches += 1;
        }
    }

    fn inline_code(&mut self) {
        let code_font = self.styler.code_font();
        for m in self.found(PatternKind::InlineCode) {
            self.doc
                .set_attribute(m.range.clone(), AttributeValue::Font(code_font.clone()));
            let background = self.colors().inline_code_bg;
            self.doc
                .set_attribute(m.range.clone(), AttributeValue::BackgroundColor(background));
            self.doc.remove_attribute(AttributeKey::Link, m.range.clone());
            if let Some(content) = m.group(CaptureRole::Content) {
                let color = self.colors().inline_code;
                self.color(content, color);
            }
            self.markers(&m);
            self.report.matches += 1;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Link destinations
// ─────────────────────────────────────────────────────────────────────────────

fn normalize_reference(id: &str) -> String {
    id.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Drop angle brackets and an optional `"title"` from a destination.
pub fn strip_title(destination: &str) -> &str {
    let trimmed = destination.trim();
    if let Some(inner) = trimmed.strip_prefix('<') {
        if let Some(end) = inner.find('>') {
            return &inner[..end];
        }
    }
    match trimmed.find(char::is_whitespace) {
        Some(idx) => {
            let rest = trimmed[idx..].trim_start();
            if rest.starts_with('"') || rest.starts_with('\'') || rest.starts_with('(') {
                &trimmed[..idx]
            } else {
                trimmed
            }
        }
        None => trimmed,
    }
}

/// Classify a link destination.
///
/// Web and mail URLs stay URLs; anything else is a file path, percent
/// decoded and resolved against `base_dir` when relative.
pub fn link_target(destination: &str, base_dir: Option<&Path>) -> LinkTarget {
    let dest = strip_title(destination);
    let lower = dest.to_ascii_lowercase();

    if ["http://", "https://", "ftp://", "mailto:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
        || dest.starts_with('#')
    {
        return LinkTarget::Url(dest.to_string());
    }
    if lower.starts_with("www.") {
        return LinkTarget::Url(format!("http://{}", dest));
    }
    if let Some(path) = lower.strip_prefix("file://").map(|_| &dest[7..]) {
        return LinkTarget::File(PathBuf::from(decode_path(path)));
    }

    let path = PathBuf::from(decode_path(dest));
    match base_dir {
        Some(base) if path.is_relative() => LinkTarget::File(base.join(path)),
        _ => LinkTarget::File(path),
    }
}

fn decode_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
