//! The styled document buffer
//!
//! A `Document` is the text of one open note plus one `RunList` per
//! attribute key. The editing surface owns it; the engine only ever receives
//! `&mut Document` and mutates it in place on the owning thread.
//!
//! Offsets are UTF-8 byte offsets into [`Document::text`].

mod attributes;
pub mod layout;
mod runs;

pub use attributes::{
    AttributeKey, AttributeSpan, AttributeValue, LinkTarget, ParagraphStyle,
};
pub use runs::{Run, RunList};

use crate::markdown::attachments::AttachmentRecord;
use crate::string_utils::clamp_range;
use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;

/// Result of replacing a range of text.
#[derive(Debug, Clone, Default)]
pub struct EditOutcome {
    /// Where the inserted text now lives
    pub inserted: Range<usize>,
    /// Attachments whose placeholder character was deleted by the edit
    pub removed_attachments: Vec<Arc<AttachmentRecord>>,
}

/// Number of recent edits kept for [`Document::map_range`].
const EDIT_LOG_LIMIT: usize = 1024;

/// One text replacement, in the coordinates of the text it was applied to.
#[derive(Debug, Clone)]
struct EditRecord {
    range: Range<usize>,
    inserted: usize,
}

impl EditRecord {
    /// Carry `range` across this edit; `None` if the edit touched its inside.
    fn map(&self, range: Range<usize>) -> Option<Range<usize>> {
        if range.end <= self.range.start {
            Some(range)
        } else if range.start >= self.range.end {
            let shift = |pos: usize| pos - self.range.end + self.range.start + self.inserted;
            Some(shift(range.start)..shift(range.end))
        } else {
            None
        }
    }
}

/// Text plus per-key attribute runs.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    attributes: BTreeMap<AttributeKey, RunList>,
    revision: u64,
    edits: VecDeque<EditRecord>,
}

impl Document {
    /// Create an unstyled document.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
            revision: 0,
            edits: VecDeque::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Counter bumped by every text mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Translate a range taken at revision `since` into current coordinates.
    ///
    /// Returns `None` when a later edit overlapped the range, or when `since`
    /// is older than the retained edit history.
    pub fn map_range(&self, range: Range<usize>, since: u64) -> Option<Range<usize>> {
        let oldest = self.revision - self.edits.len() as u64;
        if since < oldest || since > self.revision {
            return None;
        }
        self.edits
            .iter()
            .skip((since - oldest) as usize)
            .try_fold(range, |range, edit| edit.map(range))
    }

    /// Exact substring for `range`, or `None` if it is out of bounds or not
    /// on character boundaries.
    pub fn substring(&self, range: Range<usize>) -> Option<&str> {
        self.text.get(range)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attribute access
    // ─────────────────────────────────────────────────────────────────────────

    /// Set an attribute over `range`. The key is taken from the value.
    pub fn set_attribute(&mut self, range: Range<usize>, value: AttributeValue) {
        let range = clamp_range(&self.text, range);
        self.attributes
            .entry(value.key())
            .or_default()
            .set(range, value);
    }

    /// Clear one key over `range`.
    pub fn remove_attribute(&mut self, key: AttributeKey, range: Range<usize>) {
        let range = clamp_range(&self.text, range);
        if let Some(list) = self.attributes.get_mut(&key) {
            list.remove(range);
        }
    }

    /// Rewrite one key piecewise over `range` (see [`RunList::update`]).
    pub fn update_attribute<F>(&mut self, key: AttributeKey, range: Range<usize>, f: F)
    where
        F: FnMut(Option<&AttributeValue>) -> Option<AttributeValue>,
    {
        let range = clamp_range(&self.text, range);
        self.attributes.entry(key).or_default().update(range, f);
    }

    pub fn attribute_at(&self, key: AttributeKey, offset: usize) -> Option<&AttributeValue> {
        self.attributes.get(&key).and_then(|list| list.value_at(offset))
    }

    /// Whether any run of `key` intersects `range`.
    pub fn has_attribute_in(&self, key: AttributeKey, range: Range<usize>) -> bool {
        self.attributes
            .get(&key)
            .is_some_and(|list| list.overlapping(range).next().is_some())
    }

    pub fn runs(&self, key: AttributeKey) -> &[Run] {
        self.attributes
            .get(&key)
            .map(|list| list.runs())
            .unwrap_or(&[])
    }

    /// Every run of every key, ordered by key then start offset.
    pub fn spans(&self) -> Vec<AttributeSpan> {
        self.attributes
            .iter()
            .flat_map(|(key, list)| {
                list.runs().iter().map(move |run| AttributeSpan {
                    key: *key,
                    range: run.range.clone(),
                    value: run.value.clone(),
                })
            })
            .collect()
    }

    /// Attachment records with the offset of their placeholder character.
    pub fn attachments(&self) -> Vec<(Range<usize>, Arc<AttachmentRecord>)> {
        self.runs(AttributeKey::Attachment)
            .iter()
            .filter_map(|run| {
                run.value
                    .as_attachment()
                    .map(|record| (run.range.clone(), Arc::clone(record)))
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Text mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace `range` with `replacement`, shifting every run accordingly.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> EditOutcome {
        let range = clamp_range(&self.text, range);
        self.text.replace_range(range.clone(), replacement);
        self.revision += 1;
        if self.edits.len() == EDIT_LOG_LIMIT {
            self.edits.pop_front();
        }
        self.edits.push_back(EditRecord {
            range: range.clone(),
            inserted: replacement.len(),
        });

        let mut removed_attachments = Vec::new();
        for (key, list) in self.attributes.iter_mut() {
            let removed = list.adjust_for_edit(*key, range.clone(), replacement.len());
            removed_attachments.extend(
                removed
                    .into_iter()
                    .filter_map(|run| run.value.as_attachment().cloned()),
            );
        }
        self.attributes.retain(|_, list| !list.is_empty());

        EditOutcome {
            inserted: range.start..range.start + replacement.len(),
            removed_attachments,
        }
    }
}
