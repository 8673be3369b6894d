use std::sync::Arc;

use super::edit::EditEvent;
use crate::kernel::tokenizer::{RuleStack, Token};

#[derive(Debug, Clone)]
pub(crate) struct CachedLine {
    pub(crate) tokens: Arc<[Token]>,
    pub(crate) end_state: RuleStack,
    /// Tokenization failed and the line fell back to a single unscoped token.
    pub(crate) degraded: bool,
}

/// Per-line tokens and outgoing rule-stack states.
///
/// `changed[i]` marks a line that must be re-tokenized regardless of its incoming state (its
/// text changed, or an interrupted pass had not reached it). A changed line may still hold its
/// previous result: the old outgoing state is the baseline the fixed-point check compares
/// against. Lines at or after `first_dirty` may hold results computed from a stale incoming
/// state.
#[derive(Debug, Clone)]
pub(crate) struct LineStateCache {
    lines: Vec<Option<CachedLine>>,
    changed: Vec<bool>,
    first_dirty: Option<usize>,
}

impl LineStateCache {
    pub(crate) fn new(line_count: usize) -> Self {
        let total_lines = line_count.max(1);
        Self {
            lines: vec![None; total_lines],
            changed: vec![true; total_lines],
            first_dirty: Some(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }

    pub(crate) fn reset(&mut self, line_count: usize) {
        *self = Self::new(line_count);
    }

    pub(crate) fn first_dirty(&self) -> Option<usize> {
        self.first_dirty
    }

    fn mark_dirty_from(&mut self, line: usize) {
        if line >= self.lines.len() {
            return;
        }
        if let Some(pending) = self.first_dirty {
            if pending <= line {
                return;
            }
            // The interrupted pass must resume at `pending` even if the new pass converges
            // before reaching it.
            if let Some(flag) = self.changed.get_mut(pending) {
                *flag = true;
            }
        }
        self.first_dirty = Some(line);
    }

    /// Resizes to `line_count` when the document and the cache disagree.
    pub(crate) fn ensure_shape(&mut self, line_count: usize) {
        let total_lines = line_count.max(1);
        let old_len = self.lines.len();
        match old_len.cmp(&total_lines) {
            std::cmp::Ordering::Equal => return,
            std::cmp::Ordering::Less => {
                self.lines.resize_with(total_lines, || None);
                self.changed.resize(total_lines, true);
            }
            std::cmp::Ordering::Greater => {
                self.lines.truncate(total_lines);
                self.changed.truncate(total_lines);
                if let Some(first) = self.first_dirty {
                    if first >= total_lines {
                        self.first_dirty = None;
                    }
                }
            }
        }
        // The last surviving line may have been cut short; rescan it.
        let last = old_len.min(total_lines) - 1;
        self.changed[last] = true;
        self.mark_dirty_from(last);
    }

    /// Splices the changed line range. Shifted lines keep their results; the replaced range is
    /// marked changed, its last line keeping the old last line's result as baseline. A removal
    /// (`new_line_count == 0`) marks the line that moved up into `start_line` instead.
    pub(crate) fn apply_edit_shape_shift(&mut self, edit: &EditEvent, line_count: usize) {
        let start = edit.start_line;
        let old_end = edit.end_line_exclusive;
        let new_count = edit.new_line_count;
        if start > old_end || old_end > self.lines.len() {
            self.reset(line_count);
            return;
        }

        if new_count == 0 {
            self.lines.drain(start..old_end);
            self.changed.drain(start..old_end);
            if self.lines.is_empty() {
                self.reset(line_count);
                return;
            }
            self.shift_first_dirty(start, old_end, 0);
            if start < self.lines.len() {
                // The moved-up line keeps its result as baseline; only its incoming state changed.
                self.changed[start] = true;
                self.mark_dirty_from(start);
            }
            self.ensure_shape(line_count);
            return;
        }

        let baseline = if old_end > start {
            self.lines[old_end - 1].take()
        } else {
            None
        };
        let mut replacement: Vec<Option<CachedLine>> = vec![None; new_count];
        replacement[new_count - 1] = baseline;
        self.lines.splice(start..old_end, replacement);
        self.changed
            .splice(start..old_end, std::iter::repeat(true).take(new_count));

        self.shift_first_dirty(start, old_end, new_count);
        self.mark_dirty_from(start);
        self.ensure_shape(line_count);
    }

    fn shift_first_dirty(&mut self, start: usize, old_end: usize, new_count: usize) {
        let len = self.lines.len();
        self.first_dirty = self
            .first_dirty
            .map(|first| {
                if first >= old_end {
                    first - old_end + start + new_count
                } else {
                    first.min(start)
                }
            })
            .filter(|first| *first < len);
    }

    pub(crate) fn line(&self, line: usize) -> Option<&CachedLine> {
        self.lines.get(line).and_then(|v| v.as_ref())
    }

    /// Outgoing state of the line before `line`; the first line starts from the empty stack.
    pub(crate) fn incoming_state(&self, line: usize) -> RuleStack {
        match line.checked_sub(1) {
            Some(prev) => self
                .line(prev)
                .map(|cached| cached.end_state.clone())
                .unwrap_or_default(),
            None => RuleStack::empty(),
        }
    }

    /// Stores a freshly tokenized line, returning the result it replaces.
    pub(crate) fn store(&mut self, line: usize, cached: CachedLine) -> Option<CachedLine> {
        let slot = self.lines.get_mut(line)?;
        self.changed[line] = false;
        slot.replace(cached)
    }

    /// Advances the dirty marker past `line`. When `converged`, downstream results are reused up
    /// to the next changed line.
    pub(crate) fn settle_line(&mut self, line: usize, converged: bool) {
        let next = line + 1;
        self.first_dirty = if next >= self.lines.len() {
            None
        } else if converged {
            self.changed[next..]
                .iter()
                .position(|changed| *changed)
                .map(|offset| next + offset)
        } else {
            Some(next)
        };
    }

    /// Contiguous `[start, end)` ranges of lines waiting for re-tokenization because their text
    /// changed or they were never tokenized.
    pub(crate) fn dirty_segments(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut segment_start: Option<usize> = None;
        for (idx, changed) in self.changed.iter().enumerate() {
            if *changed {
                if segment_start.is_none() {
                    segment_start = Some(idx);
                }
                continue;
            }

            if let Some(start) = segment_start.take() {
                out.push((start, idx));
            }
        }
        if let Some(start) = segment_start.take() {
            out.push((start, self.changed.len()));
        }
        out
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/editor/syntax_highlight_cache.rs"]
mod tests;
