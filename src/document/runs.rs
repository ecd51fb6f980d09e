//! Ordered, non-overlapping attribute runs for a single key.
//!
//! Setting a value over a range ends or splits whatever covered that range
//! before (last write wins). Adjacent runs with equal values are merged, so
//! applying the same sequence of writes always yields the same run list.

use super::attributes::{AttributeKey, AttributeValue};
use std::ops::Range;

/// One contiguous run of a single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub range: Range<usize>,
    pub value: AttributeValue,
}

/// The runs stored for one attribute key, sorted by start offset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunList {
    runs: Vec<Run>,
}

impl RunList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// The value covering `offset`, if any.
    pub fn value_at(&self, offset: usize) -> Option<&AttributeValue> {
        let idx = self.runs.partition_point(|r| r.range.end <= offset);
        self.runs
            .get(idx)
            .filter(|r| r.range.start <= offset && offset < r.range.end)
            .map(|r| &r.value)
    }

    /// Runs that intersect `range`.
    pub fn overlapping(&self, range: Range<usize>) -> impl Iterator<Item = &Run> {
        let first = self.runs.partition_point(|r| r.range.end <= range.start);
        self.runs[first..]
            .iter()
            .take_while(move |r| r.range.start < range.end)
    }

    /// Set `value` over `range`, replacing anything underneath.
    pub fn set(&mut self, range: Range<usize>, value: AttributeValue) {
        if range.start >= range.end {
            return;
        }
        self.remove(range.clone());
        let idx = self.runs.partition_point(|r| r.range.start < range.start);
        self.runs.insert(idx, Run { range, value });
        self.coalesce_around(idx);
    }

    /// Clear `range`, splitting runs that straddle its edges.
    pub fn remove(&mut self, range: Range<usize>) {
        if range.start >= range.end || self.runs.is_empty() {
            return;
        }
        let first = self.runs.partition_point(|r| r.range.end <= range.start);
        let last = self.runs.partition_point(|r| r.range.start < range.end);
        if first >= last {
            return;
        }

        let mut replacement = Vec::with_capacity(2);
        for run in &self.runs[first..last] {
            if run.range.start < range.start {
                replacement.push(Run {
                    range: run.range.start..range.start,
                    value: run.value.clone(),
                });
            }
            if run.range.end > range.end {
                replacement.push(Run {
                    range: range.end..run.range.end,
                    value: run.value.clone(),
                });
            }
        }
        self.runs.splice(first..last, replacement);
    }

    /// Rewrite every piece of `range`, including the gaps between runs.
    ///
    /// `f` sees the current value of each piece (or `None` for a gap) and
    /// returns the new one (or `None` to clear it).
    pub fn update<F>(&mut self, range: Range<usize>, mut f: F)
    where
        F: FnMut(Option<&AttributeValue>) -> Option<AttributeValue>,
    {
        if range.start >= range.end {
            return;
        }

        let mut pieces: Vec<(Range<usize>, Option<AttributeValue>)> = Vec::new();
        let mut cursor = range.start;
        for run in self.overlapping(range.clone()) {
            let start = run.range.start.max(range.start);
            let end = run.range.end.min(range.end);
            if cursor < start {
                pieces.push((cursor..start, f(None)));
            }
            pieces.push((start..end, f(Some(&run.value))));
            cursor = end;
        }
        if cursor < range.end {
            pieces.push((cursor..range.end, f(None)));
        }

        for (piece, value) in pieces {
            match value {
                Some(value) => self.set(piece, value),
                None => self.remove(piece),
            }
        }
    }

    /// Shift runs after a text replacement of `edited` by `inserted_len` bytes.
    ///
    /// A run that covers the whole replaced region grows or shrinks with it,
    /// which makes typed text inherit the attributes to its left. Attachment
    /// runs never grow; any attachment whose character was deleted is
    /// returned to the caller.
    pub fn adjust_for_edit(
        &mut self,
        key: AttributeKey,
        edited: Range<usize>,
        inserted_len: usize,
    ) -> Vec<Run> {
        let (s, e) = (edited.start, edited.end);
        let new_end = s + inserted_len;
        let shift = |offset: usize| offset + inserted_len - (e - s);
        let inherits = key != AttributeKey::Attachment;

        let mut removed = Vec::new();
        let mut adjusted = Vec::with_capacity(self.runs.len());

        for run in self.runs.drain(..) {
            let Range { start, end } = run.range.clone();

            if end < s || (end == s && !(inherits && s == e && start < s)) {
                adjusted.push(run);
                continue;
            }
            if start >= e && !(s == e && start < s) {
                adjusted.push(Run {
                    range: shift(start)..shift(end),
                    value: run.value,
                });
                continue;
            }

            // The run touches the replaced region.
            if !inherits {
                removed.push(run);
                continue;
            }
            if start < s && end >= e {
                adjusted.push(Run {
                    range: start..shift(end),
                    value: run.value,
                });
                continue;
            }
            if start < s {
                adjusted.push(Run {
                    range: start..s,
                    value: run.value.clone(),
                });
            }
            if end > e {
                adjusted.push(Run {
                    range: new_end..shift(end),
                    value: run.value,
                });
            }
        }

        self.runs = adjusted;
        self.coalesce_all();
        removed
    }

    fn coalesce_around(&mut self, idx: usize) {
        if idx + 1 < self.runs.len() && self.mergeable(idx, idx + 1) {
            let next = self.runs.remove(idx + 1);
            self.runs[idx].range.end = next.range.end;
        }
        if idx > 0 && self.mergeable(idx - 1, idx) {
            let current = self.runs.remove(idx);
            self.runs[idx - 1].range.end = current.range.end;
        }
    }

    fn coalesce_all(&mut self) {
        let mut i = 0;
        while i + 1 < self.runs.len() {
            if self.mergeable(i, i + 1) {
                let next = self.runs.remove(i + 1);
                self.runs[i].range.end = next.range.end;
            } else {
                i += 1;
            }
        }
    }

    fn mergeable(&self, a: usize, b: usize) -> bool {
        let (left, right) = (&self.runs[a], &self.runs[b]);
        left.range.end == right.range.start && left.value == right.value
    }
}
