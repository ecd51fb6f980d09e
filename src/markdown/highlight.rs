//! Code block highlighting: jobs, scheduler, and merge
//!
//! A [`HighlightJob`] copies the code text at dispatch time. The job can run
//! inline or on the highlighter worker thread; either way it only produces a
//! value. [`merge`] is the only step that touches the document, and it first
//! checks that the text at the job's range still equals the copy. If it does
//! not, the result is thrown away.

use super::code_block::CodeBlockRange;
use super::syntax::{get_highlighter, HighlightedFragment};
use crate::config::StylingConfig;
use crate::document::{AttributeKey, AttributeValue, Document};
use crate::error::Result;
use crate::fonts::FontSpec;
use crate::theme::MarkdownColors;
use log::{debug, warn};
use std::ops::Range;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ─────────────────────────────────────────────────────────────────────────────
// Job
// ─────────────────────────────────────────────────────────────────────────────

/// One code block to highlight, with the text it was dispatched for.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightJob {
    /// Code content range (fence lines excluded)
    pub target_range: Range<usize>,
    /// Text at `target_range` when the job was created
    pub source_snapshot: String,
    pub language_hint: Option<String>,
    pub is_async: bool,
    /// syntect theme to highlight with
    pub theme_name: String,
    pub dark_mode: bool,
}

impl HighlightJob {
    /// Job for the content of `block`, or `None` if the block has no content.
    pub fn for_block(
        doc: &Document,
        block: &CodeBlockRange,
        config: &StylingConfig,
        is_async: bool,
    ) -> Option<Self> {
        let target_range = block.content_range(doc.text());
        let source_snapshot = doc.substring(target_range.clone())?.to_string();
        if source_snapshot.trim().is_empty() {
            return None;
        }
        Some(Self {
            target_range,
            source_snapshot,
            language_hint: block.language_hint.clone(),
            is_async,
            theme_name: config.code_theme().to_string(),
            dark_mode: config.dark_mode,
        })
    }

    /// Highlight the snapshot. Never touches a document.
    pub fn run(self) -> HighlightOutcome {
        let highlighter = get_highlighter();
        let fragment = match highlighter.theme(&self.theme_name, self.dark_mode) {
            Some(theme) => {
                highlighter.highlight(&self.source_snapshot, self.language_hint.as_deref(), theme)
            }
            None => {
                warn!("No code theme available, highlighting disabled");
                None
            }
        };
        HighlightOutcome {
            job: self,
            fragment,
        }
    }
}

/// A finished job.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOutcome {
    pub job: HighlightJob,
    /// `None` when no syntax applied
    pub fragment: Option<HighlightedFragment>,
}

/// What [`merge`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    /// Token runs were applied
    Applied { runs: usize },
    /// The text changed since dispatch; nothing was applied
    Discarded,
    /// No highlighting was available; the block keeps plain code styling
    Degraded,
}

// ─────────────────────────────────────────────────────────────────────────────
// Merge
// ─────────────────────────────────────────────────────────────────────────────

/// Apply a finished job to `doc` if its text is still current.
pub fn merge(
    doc: &mut Document,
    outcome: &HighlightOutcome,
    code_font: &FontSpec,
    colors: &MarkdownColors,
) -> MergeResult {
    let job = &outcome.job;
    if doc.substring(job.target_range.clone()) != Some(job.source_snapshot.as_str()) {
        debug!("Discarding stale highlight for {:?}", job.target_range);
        return MergeResult::Discarded;
    }
    let Some(fragment) = &outcome.fragment else {
        return MergeResult::Degraded;
    };

    let len = doc.len();
    let clamp = |offset: usize| (job.target_range.start + offset).min(len);
    let mut applied = 0;
    for run in &fragment.runs {
        let range = clamp(run.range.start)..clamp(run.range.end);
        if range.is_empty() {
            continue;
        }
        doc.set_attribute(range.clone(), AttributeValue::ForegroundColor(run.foreground));
        doc.set_attribute(
            range,
            AttributeValue::Font(code_font.clone().with_traits(run.traits)),
        );
        applied += 1;
    }

    // Token traits stay; family and size are uniform across the block.
    let target = job.target_range.start.min(len)..job.target_range.end.min(len);
    doc.update_attribute(AttributeKey::Font, target.clone(), |current| {
        let traits = current
            .and_then(|value| value.as_font())
            .map(|font| font.traits)
            .unwrap_or_default();
        Some(AttributeValue::Font(code_font.clone().with_traits(traits)))
    });
    doc.set_attribute(target, AttributeValue::BackgroundColor(colors.code_block_bg));

    MergeResult::Applied { runs: applied }
}

/// Plain code styling for a whole block: code font, background, fence color.
///
/// Applied synchronously before any highlighting so the block never shows
/// markdown styling, and left as-is when highlighting degrades.
pub fn style_code_block(
    doc: &mut Document,
    block: &CodeBlockRange,
    code_font: &FontSpec,
    colors: &MarkdownColors,
) {
    let range = block.range.clone();
    doc.set_attribute(range.clone(), AttributeValue::Font(code_font.clone()));
    doc.set_attribute(range.clone(), AttributeValue::ForegroundColor(colors.text));
    doc.set_attribute(range.clone(), AttributeValue::BackgroundColor(colors.code_block_bg));
    doc.remove_attribute(AttributeKey::Link, range.clone());
    doc.remove_attribute(AttributeKey::Hidden, range);

    let fences = block.fence_lines(doc.text());
    for fence in fences {
        doc.set_attribute(fence, AttributeValue::ForegroundColor(colors.code_fence));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Runs highlight jobs on a background worker.
///
/// Completions come back in the order they finish and must be merged on the
/// thread that owns the document.
#[derive(Debug)]
pub struct HighlightScheduler {
    jobs: Sender<HighlightJob>,
    completed: Receiver<HighlightOutcome>,
    pending: usize,
    _worker: JoinHandle<()>,
}

impl HighlightScheduler {
    pub fn new() -> Result<Self> {
        let (job_tx, job_rx) = channel::<HighlightJob>();
        let (done_tx, done_rx) = channel();

        let worker = thread::Builder::new()
            .name("code-highlighter".to_string())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    if done_tx.send(job.run()).is_err() {
                        break;
                    }
                }
                debug!("Code highlighter worker stopped");
            })?;

        Ok(Self {
            jobs: job_tx,
            completed: done_rx,
            pending: 0,
            _worker: worker,
        })
    }

    /// Run a job on the calling thread.
    pub fn run_sync(job: HighlightJob) -> HighlightOutcome {
        job.run()
    }

    /// Queue a job for the worker. Returns immediately.
    pub fn dispatch(&mut self, job: HighlightJob) {
        match self.jobs.send(job) {
            Ok(()) => self.pending += 1,
            Err(e) => warn!("Code highlighter worker is gone, dropping job: {:?}", e.0.target_range),
        }
    }

    /// Jobs dispatched but not yet collected.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Collect finished jobs without blocking.
    pub fn poll_completed(&mut self) -> Vec<HighlightOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.completed.try_recv() {
            outcomes.push(outcome);
        }
        self.pending = self.pending.saturating_sub(outcomes.len());
        outcomes
    }

    /// Block until every pending job finished or `timeout` elapsed.
    pub fn wait_completed(&mut self, timeout: Duration) -> Vec<HighlightOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = Vec::new();
        while self.pending > outcomes.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.completed.recv_timeout(remaining) {
                Ok(outcome) => outcomes.push(outcome),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.pending = self.pending.saturating_sub(outcomes.len());
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::code_block::{CodeBlockLocator, FenceStyle};
    use crate::string_utils::paragraph_at;

    fn code_font() -> FontSpec {
        FontSpec::monospace("JetBrainsMono", 13.0)
    }

    fn fenced(text: &str) -> (Document, CodeBlockRange) {
        let doc = Document::new(text);
        let block = CodeBlockLocator::default()
            .locate(text, paragraph_at(text, 0))
            .unwrap();
        (doc, block)
    }

    #[test]
    fn test_sync_highlight_applies_runs() {
        let (mut doc, block) = fenced("```rust\nfn main() {}\n```\n");
        let config = StylingConfig::default();
        let colors = MarkdownColors::light();
        let job = HighlightJob::for_block(&doc, &block, &config, false).unwrap();
        assert_eq!(job.source_snapshot, "fn main() {}\n");

        let outcome = HighlightScheduler::run_sync(job);
        let result = merge(&mut doc, &outcome, &code_font(), &colors);
        assert!(matches!(result, MergeResult::Applied { runs } if runs > 0));
        let font = doc.attribute_at(AttributeKey::Font, 9).unwrap().as_font().unwrap();
        assert!(font.monospace);
        assert_eq!(
            doc.attribute_at(AttributeKey::BackgroundColor, 9),
            Some(&AttributeValue::BackgroundColor(colors.code_block_bg))
        );
    }

    #[test]
    fn test_merge_restores_uniform_code_font() {
        let (mut doc, block) = fenced("```rust\nfn main() {}\n```\n");
        let colors = MarkdownColors::light();
        let job = HighlightJob::for_block(&doc, &block, &StylingConfig::default(), false).unwrap();
        let target = job.target_range.clone();
        // A restyle that ran in between left a header font inside the block
        doc.set_attribute(target.start..target.start + 2, AttributeValue::Font(FontSpec::new("Inter", 24.0)));
        doc.remove_attribute(AttributeKey::Font, target.end - 1..target.end);

        let outcome = HighlightScheduler::run_sync(job);
        merge(&mut doc, &outcome, &code_font(), &colors);
        for offset in target {
            let font = doc.attribute_at(AttributeKey::Font, offset).unwrap().as_font().unwrap();
            assert_eq!(font.family, "JetBrainsMono", "offset {}", offset);
            assert_eq!(font.size, 13.0);
            assert!(font.monospace);
        }
    }

    #[test]
    fn test_stale_job_is_discarded() {
        let mut doc = Document::new("0123456789abc_______tail");
        let outcome = HighlightOutcome {
            job: HighlightJob {
                target_range: 10..20,
                source_snapshot: "abc_______".to_string(),
                language_hint: Some("rust".to_string()),
                is_async: true,
                theme_name: "InspiredGitHub".to_string(),
                dark_mode: false,
            },
            fragment: Some(HighlightedFragment {
                text: "abc_______".to_string(),
                runs: vec![],
            }),
        };
        doc.replace_range(10..13, "xyz");

        let before = doc.spans();
        let result = merge(&mut doc, &outcome, &code_font(), &MarkdownColors::light());
        assert_eq!(result, MergeResult::Discarded);
        assert_eq!(doc.spans(), before);
    }

    #[test]
    fn test_unknown_language_degrades() {
        let (mut doc, block) = fenced("```nosuchlang\nsome words\n```\n");
        let job = HighlightJob::for_block(&doc, &block, &StylingConfig::default(), false).unwrap();
        let outcome = job.run();
        assert!(outcome.fragment.is_none());
        let result = merge(&mut doc, &outcome, &code_font(), &MarkdownColors::light());
        assert_eq!(result, MergeResult::Degraded);
    }

    #[test]
    fn test_empty_block_has_no_job() {
        let (doc, block) = fenced("```\n```\n");
        assert_eq!(block.fence_style, FenceStyle::Fenced);
        assert!(HighlightJob::for_block(&doc, &block, &StylingConfig::default(), false).is_none());
    }

    #[test]
    fn test_style_code_block_colors_fences() {
        let (mut doc, block) = fenced("```\ncode\n```\n");
        let colors = MarkdownColors::light();
        style_code_block(&mut doc, &block, &code_font(), &colors);
        assert_eq!(
            doc.attribute_at(AttributeKey::ForegroundColor, 0),
            Some(&AttributeValue::ForegroundColor(colors.code_fence))
        );
        assert_eq!(
            doc.attribute_at(AttributeKey::ForegroundColor, 5),
            Some(&AttributeValue::ForegroundColor(colors.text))
        );
        assert!(doc.attribute_at(AttributeKey::Font, 5).unwrap().as_font().unwrap().monospace);
    }

    #[test]
    fn test_async_dispatch_and_wait() {
        let (mut doc, block) = fenced("```python\nprint(1)\n```\n");
        let config = StylingConfig::default();
        let mut scheduler = HighlightScheduler::new().unwrap();
        scheduler.dispatch(HighlightJob::for_block(&doc, &block, &config, true).unwrap());
        assert_eq!(scheduler.pending(), 1);

        let outcomes = scheduler.wait_completed(Duration::from_secs(30));
        assert_eq!(outcomes.len(), 1);
        assert_eq!(scheduler.pending(), 0);
        let result = merge(&mut doc, &outcomes[0], &code_font(), &MarkdownColors::light());
        assert!(matches!(result, MergeResult::Applied { .. }));
    }
}
