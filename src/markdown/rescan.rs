//! Incremental Rescan Controller
//!
//! The entry point the editing surface calls on note load and after every
//! text change. It decides how much to restyle:
//!
//! - no range: full two-pass scan (styling, then synchronous highlighting);
//! - a range: only the touched paragraphs, widened for setext headers, with
//!   code blocks highlighted on the background worker;
//! - a change on a fence line: full scan, since block structure moved.
//!
//! Background results are merged by [`RescanController::process_completions`]
//! on the caller's thread, each behind its own staleness check.

use super::attachments::{to_markdown_source, AttachmentTrash, UndoSink};
use super::code_block::{is_fence_line, CodeBlockLocator, CodeBlockRange};
use super::highlight::{merge, style_code_block, HighlightJob, HighlightOutcome, HighlightScheduler, MergeResult};
use super::images::{install, ImageOutcome, ImageRequest, ImageResolver, ImageResolverPool, InstallResult, ResolveContext};
use super::styler::{SpanStyler, StyleReport};
use crate::config::StylingConfig;
use crate::document::Document;
use crate::error::ResultExt;
use crate::fonts::FontSpec;
use crate::string_utils::{line_content, next_paragraph, paragraph_range, paragraphs, previous_paragraph};
use crate::theme::MarkdownColors;
use log::{debug, info, warn};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// Note context
// ─────────────────────────────────────────────────────────────────────────────

/// Which parts of the engine apply to a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteKind {
    /// Full markdown styling
    #[default]
    Markdown,
    /// Attributes belong to the user; the scanner never touches them
    RichText,
    /// Base font and color only
    PlainText,
}

/// What the engine needs to know about the note being styled.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteContext {
    /// Root for relative image paths and the image cache
    pub project_root: PathBuf,
    /// Directory holding the note; relative links resolve here
    pub note_dir: PathBuf,
    /// Self-contained note bundle with its own `assets/`
    pub is_bundle: bool,
    pub kind: NoteKind,
}

impl NoteContext {
    /// A markdown note stored directly in `project_root`.
    pub fn markdown(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        Self {
            note_dir: project_root.clone(),
            project_root,
            is_bundle: false,
            kind: NoteKind::Markdown,
        }
    }

    pub fn with_kind(mut self, kind: NoteKind) -> Self {
        self.kind = kind;
        self
    }

    fn resolve_context(&self, config: &StylingConfig) -> ResolveContext {
        ResolveContext {
            project_root: self.project_root.clone(),
            note_dir: self.note_dir.clone(),
            is_bundle: self.is_bundle,
            target_width: config.target_image_width,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State and summaries
// ─────────────────────────────────────────────────────────────────────────────

/// Controller lifecycle: `Idle -> Scanning -> {Merging, Discarded} -> Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Scanning(Range<usize>),
    /// Background results are being applied
    Merging,
    /// The last background result was stale
    Discarded,
}

/// What one scan did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Whether the whole document was rescanned
    pub full: bool,
    pub style: StyleReport,
    pub code_blocks: usize,
    /// Highlight jobs sent to the background worker
    pub highlights_dispatched: usize,
    /// Image requests sent to the resolver pool
    pub images_dispatched: usize,
    /// Attachment files moved to the trash by the edit
    pub attachments_trashed: usize,
}

/// What merging background results did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionSummary {
    pub highlights_applied: usize,
    pub highlights_discarded: usize,
    pub highlights_degraded: usize,
    pub images_installed: usize,
    pub images_dropped: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the background workers and drives a scan for one open note.
#[derive(Debug)]
pub struct RescanController {
    locator: CodeBlockLocator,
    resolver: ImageResolver,
    highlighter: Option<HighlightScheduler>,
    images: Option<ImageResolverPool>,
    state: ScanState,
    /// Styling used by the last scan, for merging its background results
    code_font: FontSpec,
    colors: MarkdownColors,
}

impl Default for RescanController {
    fn default() -> Self {
        Self::new()
    }
}

impl RescanController {
    pub fn new() -> Self {
        Self::with_resolver(ImageResolver::default())
    }

    /// Use a custom image resolver (e.g. an offline fetcher).
    pub fn with_resolver(resolver: ImageResolver) -> Self {
        let config = StylingConfig::default();
        Self {
            locator: CodeBlockLocator::default(),
            resolver,
            highlighter: None,
            images: None,
            state: ScanState::Idle,
            code_font: FontSpec::monospace(config.code_font_family, config.code_font_size),
            colors: MarkdownColors::for_mode(config.dark_mode),
        }
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Background jobs dispatched and not yet merged.
    pub fn pending(&self) -> usize {
        self.highlighter.as_ref().map_or(0, |h| h.pending())
            + self.images.as_ref().map_or(0, |p| p.pending())
    }

    /// The note text to persist, with attachments expanded back to markdown.
    pub fn markdown_source(doc: &Document) -> String {
        to_markdown_source(doc)
    }

    fn transition(&mut self, next: ScanState) {
        if self.state != next {
            debug!("Rescan state {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────────────────

    /// Style `doc` in place. `None` rescans the whole document.
    pub fn scan(
        &mut self,
        doc: &mut Document,
        range: Option<Range<usize>>,
        note: &NoteContext,
        config: &StylingConfig,
    ) -> ScanSummary {
        let colors = MarkdownColors::for_mode(config.dark_mode);
        let styler = SpanStyler::new(config, &colors).with_base_dir(&note.note_dir);
        self.code_font = styler.code_font();
        self.colors = colors;

        let scan_range = match &range {
            None => 0..doc.len(),
            Some(range) => self.affected_range(doc.text(), range.clone()),
        };

        match note.kind {
            NoteKind::RichText => return ScanSummary::default(),
            NoteKind::PlainText => {
                let paragraphs = paragraph_range(doc.text(), scan_range);
                styler.reset(doc, paragraphs);
                return ScanSummary::default();
            }
            NoteKind::Markdown => {}
        }

        let full = range.is_none() || self.touches_fence(doc.text(), scan_range.clone());
        let scan_range = if full { 0..doc.len() } else { scan_range };
        self.transition(ScanState::Scanning(scan_range.clone()));

        let blocks = if full {
            self.locator.locate_all(doc.text())
        } else {
            self.blocks_in(doc.text(), scan_range.clone())
        };
        let block_ranges: Vec<Range<usize>> = blocks.iter().map(|b| b.range.clone()).collect();

        let style = styler.style(doc, scan_range, &block_ranges);
        let mut summary = ScanSummary {
            full,
            code_blocks: blocks.len(),
            ..Default::default()
        };

        for block in &blocks {
            style_code_block(doc, block, &self.code_font, &self.colors);
            if config.code_block_highlight_enabled {
                summary.highlights_dispatched += self.highlight(doc, block, config, !full);
            }
        }

        if config.live_image_preview_enabled {
            let ctx = Arc::new(note.resolve_context(config));
            for image in &style.images {
                let Some(source_text) = doc.substring(image.range.clone()) else {
                    continue;
                };
                let request = ImageRequest {
                    range: image.range.clone(),
                    source_text: source_text.to_string(),
                    title: image.title.clone(),
                    raw_path: image.destination.clone(),
                    revision: doc.revision(),
                };
                if let Some(pool) = self.image_pool() {
                    pool.dispatch(request, Arc::clone(&ctx));
                    summary.images_dispatched += 1;
                }
            }
        }

        summary.style = style;
        let next = if self.pending() > 0 {
            ScanState::Merging
        } else {
            ScanState::Idle
        };
        self.transition(next);
        summary
    }

    /// Replace `range` with `replacement`, clean up deleted attachments, and
    /// restyle what the edit touched.
    pub fn apply_edit(
        &mut self,
        doc: &mut Document,
        range: Range<usize>,
        replacement: &str,
        note: &NoteContext,
        config: &StylingConfig,
        undo: &mut dyn UndoSink,
    ) -> ScanSummary {
        // Block structure can change even when the edited line stops being a fence.
        let fence_edited = self.touches_fence(doc.text(), range.clone());
        let outcome = doc.replace_range(range, replacement);

        let trash = AttachmentTrash::in_cache(&note.resolve_context(config).cache_dir());
        let mut trashed = 0;
        for record in &outcome.removed_attachments {
            match trash.discard(record, undo) {
                Ok(Some(_)) => trashed += 1,
                Ok(None) => {}
                Err(e) => warn!("Failed to trash attachment {}: {}", record.raw_path, e),
            }
        }

        let scope = if fence_edited {
            None
        } else {
            Some(outcome.inserted)
        };
        let mut summary = self.scan(doc, scope, note, config);
        summary.attachments_trashed = trashed;
        summary
    }

    /// Paragraphs to restyle for an edit of `range`.
    fn affected_range(&self, text: &str, range: Range<usize>) -> Range<usize> {
        let mut affected = paragraph_range(text, range);

        // A setext underline needs its title line, and vice versa.
        if is_setext_underline(line_content(text, affected.clone())) {
            if let Some(prev) = previous_paragraph(text, affected.start) {
                affected.start = prev.start;
            }
        }
        if let Some(next) = next_paragraph(text, affected.end) {
            if is_setext_underline(line_content(text, next.clone())) {
                affected.end = next.end;
            }
        }
        affected
    }

    fn touches_fence(&self, text: &str, range: Range<usize>) -> bool {
        paragraphs(text, range).any(|p| is_fence_line(text, p))
    }

    fn blocks_in(&self, text: &str, range: Range<usize>) -> Vec<CodeBlockRange> {
        let mut blocks: Vec<CodeBlockRange> = Vec::new();
        for paragraph in paragraphs(text, range) {
            if blocks.iter().any(|b| b.range.contains(&paragraph.start)) {
                continue;
            }
            if let Some(block) = self.locator.locate(text, paragraph) {
                blocks.push(block);
            }
        }
        blocks
    }

    /// Highlight one block; returns 1 if a job went to the background.
    fn highlight(
        &mut self,
        doc: &mut Document,
        block: &CodeBlockRange,
        config: &StylingConfig,
        is_async: bool,
    ) -> usize {
        let Some(job) = HighlightJob::for_block(doc, block, config, is_async) else {
            return 0;
        };
        if is_async {
            if let Some(scheduler) = self.highlight_scheduler() {
                scheduler.dispatch(job);
                return 1;
            }
        }
        let outcome = HighlightScheduler::run_sync(job);
        merge(doc, &outcome, &self.code_font, &self.colors);
        0
    }

    fn highlight_scheduler(&mut self) -> Option<&mut HighlightScheduler> {
        if self.highlighter.is_none() {
            self.highlighter =
                HighlightScheduler::new().ok_or_warn("Highlighting inline, worker unavailable");
        }
        self.highlighter.as_mut()
    }

    fn image_pool(&mut self) -> Option<&mut ImageResolverPool> {
        if self.images.is_none() {
            self.images = ImageResolverPool::new(self.resolver.clone())
                .ok_or_warn("Image previews disabled, workers unavailable");
        }
        self.images.as_mut()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Completions
    // ─────────────────────────────────────────────────────────────────────────

    /// Merge every finished background job without blocking.
    pub fn process_completions(&mut self, doc: &mut Document) -> CompletionSummary {
        let highlights = self
            .highlighter
            .as_mut()
            .map(|h| h.poll_completed())
            .unwrap_or_default();
        let images = self
            .images
            .as_mut()
            .map(|p| p.poll_completed())
            .unwrap_or_default();
        self.apply_completions(doc, highlights, images)
    }

    /// Block until background work is done (or `timeout`), then merge it.
    pub fn wait_for_pending(&mut self, doc: &mut Document, timeout: Duration) -> CompletionSummary {
        let deadline = Instant::now() + timeout;
        let highlights = self
            .highlighter
            .as_mut()
            .map(|h| h.wait_completed(timeout))
            .unwrap_or_default();
        let remaining = deadline.saturating_duration_since(Instant::now());
        let images = self
            .images
            .as_mut()
            .map(|p| p.wait_completed(remaining))
            .unwrap_or_default();
        self.apply_completions(doc, highlights, images)
    }

    fn apply_completions(
        &mut self,
        doc: &mut Document,
        highlights: Vec<HighlightOutcome>,
        images: Vec<ImageOutcome>,
    ) -> CompletionSummary {
        let mut summary = CompletionSummary::default();
        if highlights.is_empty() && images.is_empty() {
            return summary;
        }
        self.transition(ScanState::Merging);

        for outcome in &highlights {
            match merge(doc, outcome, &self.code_font, &self.colors) {
                MergeResult::Applied { .. } => summary.highlights_applied += 1,
                MergeResult::Discarded => summary.highlights_discarded += 1,
                MergeResult::Degraded => summary.highlights_degraded += 1,
            }
        }

        for outcome in images {
            match install(doc, outcome) {
                InstallResult::Installed(_) => summary.images_installed += 1,
                InstallResult::Stale | InstallResult::Failed => summary.images_dropped += 1,
            }
        }

        if summary.highlights_discarded > 0 && summary.highlights_applied == 0 {
            self.transition(ScanState::Discarded);
        }
        if self.pending() == 0 {
            self.transition(ScanState::Idle);
        }
        if summary.images_installed > 0 {
            info!("Installed {} image previews", summary.images_installed);
        }
        summary
    }
}

fn is_setext_underline(line: &str) -> bool {
    let trimmed = line.trim_end();
    trimmed.len() >= 2
        && (trimmed.starts_with("==") || trimmed.starts_with("--"))
        && trimmed.chars().all(|c| c == trimmed.as_bytes()[0] as char)
}

/// Project root used when a note has no better one: its own directory.
pub fn default_project_root(note_path: &Path) -> PathBuf {
    note_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{AttributeKey, AttributeValue};
    use crate::fonts::FontTraits;
    use crate::markdown::attachments::{UndoOperation, PLACEHOLDER};
    use crate::markdown::images::tests::{png_bytes, FakeFetcher};
    use crate::markdown::images::VideoFrameExtractor;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(30);

    struct NoFrames;

    impl VideoFrameExtractor for NoFrames {
        fn extract_frame(&self, video: &Path) -> crate::error::Result<Vec<u8>> {
            Err(crate::error::Error::VideoFrame {
                path: video.to_path_buf(),
                message: "not in tests".into(),
            })
        }
    }

    fn offline_controller() -> RescanController {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            bytes: png_bytes(4, 4),
        });
        RescanController::with_resolver(ImageResolver::new(fetcher, Arc::new(NoFrames)))
    }

    fn no_images() -> StylingConfig {
        StylingConfig {
            live_image_preview_enabled: false,
            ..Default::default()
        }
    }

    fn full_scan(text: &str, config: &StylingConfig) -> Document {
        let mut doc = Document::new(text);
        let mut controller = offline_controller();
        controller.scan(&mut doc, None, &NoteContext::markdown("/tmp"), config);
        doc
    }

    fn is_bold_at(doc: &Document, offset: usize) -> bool {
        doc.attribute_at(AttributeKey::Font, offset)
            .and_then(|v| v.as_font())
            .is_some_and(|f| f.traits.is_bold())
    }

    #[test]
    fn test_full_scan_is_idempotent() {
        let text = "# Notes\n\nSome *text* and `code`.\n\n```rust\nfn main() {}\n```\n\n    indented\n";
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut doc = Document::new(text);
        let mut controller = offline_controller();

        let summary = controller.scan(&mut doc, None, &note, &config);
        assert!(summary.full);
        assert_eq!(summary.code_blocks, 2);
        assert_eq!(summary.highlights_dispatched, 0);
        let first = doc.spans();

        controller.scan(&mut doc, None, &note, &config);
        assert_eq!(first, doc.spans());
        assert_eq!(controller.state(), &ScanState::Idle);
    }

    #[test]
    fn test_incremental_edit_matches_full_scan() {
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut doc = Document::new("# A\nplain\nlast\n");
        let mut controller = offline_controller();
        controller.scan(&mut doc, None, &note, &config);

        let mut undo: Vec<UndoOperation> = Vec::new();
        let summary = controller.apply_edit(&mut doc, 4..9, "*plain*", &note, &config, &mut undo);
        assert!(!summary.full);
        assert_eq!(summary.style.range, 4..12);

        let expected = full_scan(doc.text(), &config);
        assert_eq!(doc.spans(), expected.spans());
    }

    #[test]
    fn test_setext_underline_extends_backward() {
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut doc = Document::new("Title\nx\n");
        let mut controller = offline_controller();
        controller.scan(&mut doc, None, &note, &config);
        assert!(!is_bold_at(&doc, 1));

        controller.apply_edit(&mut doc, 6..7, "==", &note, &config, &mut Vec::new());
        assert!(is_bold_at(&doc, 1));
    }

    #[test]
    fn test_title_edit_keeps_setext_header() {
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut doc = Document::new("Title\n===\n");
        let mut controller = offline_controller();
        controller.scan(&mut doc, None, &note, &config);

        controller.apply_edit(&mut doc, 5..5, "s", &note, &config, &mut Vec::new());
        assert_eq!(doc.text(), "Titles\n===\n");
        assert!(is_bold_at(&doc, 5));
    }

    #[test]
    fn test_fence_edit_triggers_full_scan() {
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut doc = Document::new("a\n*b*\n");
        let mut controller = offline_controller();
        controller.scan(&mut doc, None, &note, &config);

        let summary = controller.apply_edit(&mut doc, 0..1, "```", &note, &config, &mut Vec::new());
        assert!(summary.full);
    }

    #[test]
    fn test_breaking_a_fence_restyles_former_block() {
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut controller = offline_controller();

        for (range, replacement) in [(0..1, ""), (0..0, "x"), (3..4, " ")] {
            let mut doc = Document::new("```\n# head\n```\n");
            controller.scan(&mut doc, None, &note, &config);
            assert!(!is_bold_at(&doc, 6));

            let summary =
                controller.apply_edit(&mut doc, range, replacement, &note, &config, &mut Vec::new());
            assert!(summary.full);
            let expected = full_scan(doc.text(), &config);
            assert_eq!(doc.spans(), expected.spans(), "after edit to {:?}", doc.text());
        }
    }

    #[test]
    fn test_stale_async_highlight_is_discarded() {
        let config = no_images();
        let note = NoteContext::markdown("/tmp");
        let mut doc = Document::new("```rust\nlet a = 1;\n```\n");
        let mut controller = offline_controller();
        controller.scan(&mut doc, None, &note, &config);

        let first = controller.apply_edit(&mut doc, 12..13, "2", &note, &config, &mut Vec::new());
        assert_eq!(first.highlights_dispatched, 1);
        controller.apply_edit(&mut doc, 12..13, "3", &note, &config, &mut Vec::new());

        let summary = controller.wait_for_pending(&mut doc, WAIT);
        assert_eq!(summary.highlights_discarded, 1);
        assert_eq!(summary.highlights_applied, 1);
        assert_eq!(controller.state(), &ScanState::Idle);
    }

    #[test]
    fn test_plain_and_rich_text_gating() {
        let config = no_images();
        let mut controller = offline_controller();

        let plain = NoteContext::markdown("/tmp").with_kind(NoteKind::PlainText);
        let mut doc = Document::new("# not a header\n");
        controller.scan(&mut doc, None, &plain, &config);
        assert!(!is_bold_at(&doc, 3));
        assert!(doc.attribute_at(AttributeKey::Font, 3).is_some());

        let rich = NoteContext::markdown("/tmp").with_kind(NoteKind::RichText);
        let mut doc = Document::new("# untouched\n");
        controller.scan(&mut doc, None, &rich, &config);
        assert!(doc.spans().is_empty());
    }

    #[test]
    fn test_image_preview_round_trip_and_trash() {
        let temp = TempDir::new().unwrap();
        let note = NoteContext::markdown(temp.path());
        let config = StylingConfig::default();
        let source = "look ![Logo](https://example.com/logo.png) here\n";
        let mut doc = Document::new(source);
        let mut controller = offline_controller();

        let summary = controller.scan(&mut doc, None, &note, &config);
        assert_eq!(summary.images_dispatched, 1);
        let completions = controller.wait_for_pending(&mut doc, WAIT);
        assert_eq!(completions.images_installed, 1);
        assert_eq!(doc.text(), format!("look {} here\n", PLACEHOLDER));
        assert_eq!(RescanController::markdown_source(&doc), source);

        // Rescanning keeps the attachment
        controller.scan(&mut doc, None, &note, &config);
        assert_eq!(doc.attachments().len(), 1);

        // Deleting the placeholder trashes its cache file
        let (range, record) = doc.attachments().remove(0);
        let cached = record.cache_path.clone().unwrap();
        let mut undo: Vec<UndoOperation> = Vec::new();
        let summary = controller.apply_edit(&mut doc, range, "", &note, &config, &mut undo);
        assert_eq!(summary.attachments_trashed, 1);
        assert!(!cached.exists());
        undo[0].apply().unwrap();
        assert!(cached.exists());
    }

    #[test]
    fn test_image_deleted_before_completion_is_dropped() {
        let temp = TempDir::new().unwrap();
        let note = NoteContext::markdown(temp.path());
        let config = StylingConfig::default();
        let image = "![A](https://example.com/a.png)";
        let mut doc = Document::new(format!("{} x\n```\n{}\n```\n", image, image));
        let mut controller = offline_controller();

        let summary = controller.scan(&mut doc, None, &note, &config);
        assert_eq!(summary.images_dispatched, 1);
        let mut undo: Vec<UndoOperation> = Vec::new();
        controller.apply_edit(&mut doc, 0..image.len(), "gone", &note, &config, &mut undo);
        let expected = doc.text().to_string();

        let completions = controller.wait_for_pending(&mut doc, WAIT);
        assert_eq!(completions.images_installed, 0);
        assert_eq!(completions.images_dropped, 1);
        assert_eq!(doc.text(), expected);
        assert!(doc.attachments().is_empty());
    }

    #[test]
    fn test_code_block_content_not_styled_as_markdown() {
        let doc = full_scan("```\n# not header\n```\n", &no_images());
        assert!(!is_bold_at(&doc, 6));
        assert_eq!(
            doc.attribute_at(AttributeKey::BackgroundColor, 6),
            Some(&AttributeValue::BackgroundColor(MarkdownColors::light().code_block_bg))
        );
        let font = doc.attribute_at(AttributeKey::Font, 6).unwrap().as_font().unwrap();
        assert_eq!(font.traits, FontTraits::Regular);
        assert!(font.monospace);
    }

    #[test]
    fn test_setext_underline_detection() {
        assert!(is_setext_underline("=="));
        assert!(is_setext_underline("-----  "));
        assert!(!is_setext_underline("- item"));
        assert!(!is_setext_underline("=-"));
        assert!(!is_setext_underline("="));
    }
}
