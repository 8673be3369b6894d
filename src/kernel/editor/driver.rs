//! Incremental re-tokenization driven by edit events.

use std::borrow::Cow;
use std::sync::Arc;

use ropey::Rope;

use super::edit::EditEvent;
use super::syntax_highlight_cache::{CachedLine, LineStateCache};
use crate::kernel::grammar::Grammar;
use crate::kernel::scope::ScopePath;
use crate::kernel::services::ports::HighlightConfig;
use crate::kernel::tokenizer::{LineTokenizer, LineTokens, RuleStack, Token};

/// Read access to document lines, without line terminators.
pub trait LineSource {
    fn line_count(&self) -> usize;
    fn line_text(&self, line: usize) -> Cow<'_, str>;
}

impl LineSource for Rope {
    fn line_count(&self) -> usize {
        self.len_lines().max(1)
    }

    fn line_text(&self, line: usize) -> Cow<'_, str> {
        if line >= self.len_lines() {
            return Cow::Borrowed("");
        }
        let slice = self.line(line);
        let text: Cow<'_, str> = slice.into();
        match text {
            Cow::Borrowed(s) => Cow::Borrowed(strip_line_break(s)),
            Cow::Owned(s) => Cow::Owned(strip_line_break(&s).to_string()),
        }
    }
}

impl<S: AsRef<str>> LineSource for [S] {
    fn line_count(&self) -> usize {
        self.len().max(1)
    }

    fn line_text(&self, line: usize) -> Cow<'_, str> {
        Cow::Borrowed(self.get(line).map_or("", |s| strip_line_break(s.as_ref())))
    }
}

fn strip_line_break(text: &str) -> &str {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    text.strip_suffix(['\u{0B}', '\u{0C}', '\u{85}', '\u{2028}', '\u{2029}'])
        .unwrap_or(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Lines tokenized in this step.
    pub visited: usize,
    /// First line still waiting for re-tokenization, if any.
    pub pending_from: Option<usize>,
}

impl Progress {
    pub fn is_idle(&self) -> bool {
        self.pending_from.is_none()
    }
}

/// Owns the per-line state cache for one document and keeps it consistent across edits.
///
/// Edits only invalidate; work happens when lines are requested ([`Self::tokens_for_line`]) or
/// when the host pumps [`Self::advance`]. Each line is tokenized atomically, so a pass can be
/// split into chunks at any line boundary.
pub struct IncrementalDriver {
    tokenizer: LineTokenizer,
    cache: LineStateCache,
    config: HighlightConfig,
    generation: u64,
}

impl IncrementalDriver {
    pub fn new(grammar: Arc<Grammar>, config: &HighlightConfig, line_count: usize) -> Self {
        Self {
            tokenizer: LineTokenizer::new(grammar, config),
            cache: LineStateCache::new(line_count),
            config: config.clone(),
            generation: 0,
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        self.tokenizer.grammar()
    }

    /// Bumped whenever cached results are thrown away wholesale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn line_count(&self) -> usize {
        self.cache.len()
    }

    pub fn has_pending(&self) -> bool {
        self.cache.first_dirty().is_some()
    }

    pub fn first_invalid_line(&self) -> Option<usize> {
        self.cache.first_dirty()
    }

    /// Ranges of lines that have no tokens at all yet.
    pub fn untokenized_ranges(&self) -> Vec<(usize, usize)> {
        self.cache.dirty_segments()
    }

    /// Records an edit. Work restarts from the earliest invalidated line; an edit arriving
    /// mid-propagation further down merges into the pending pass.
    pub fn on_edit(&mut self, edit: EditEvent, line_count: usize) {
        self.cache.apply_edit_shape_shift(&edit, line_count);
        tracing::trace!(
            start = edit.start_line,
            old_end = edit.end_line_exclusive,
            new_lines = edit.new_line_count,
            pending_from = ?self.cache.first_dirty(),
            "edit recorded"
        );
    }

    /// Swaps the grammar. The in-flight pass and every cached result are discarded.
    pub fn set_grammar(&mut self, grammar: Arc<Grammar>, line_count: usize) {
        self.tokenizer = LineTokenizer::new(grammar, &self.config);
        self.invalidate_all(line_count);
    }

    pub fn invalidate_all(&mut self, line_count: usize) {
        self.cache.reset(line_count);
        self.tokenizer.clear_caches();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Re-tokenizes at most `budget` lines from the first invalid one.
    pub fn advance<S: LineSource + ?Sized>(&mut self, source: &S, budget: usize) -> Progress {
        self.cache.ensure_shape(source.line_count());
        let mut visited = 0;
        while visited < budget {
            let Some(line) = self.cache.first_dirty() else {
                break;
            };
            self.step(source, line);
            visited += 1;
        }
        if visited > 0 {
            tracing::trace!(visited, pending_from = ?self.cache.first_dirty(), "propagation step");
        }
        Progress {
            visited,
            pending_from: self.cache.first_dirty(),
        }
    }

    /// One cooperative chunk, sized by `propagation_chunk_lines`.
    pub fn advance_chunk<S: LineSource + ?Sized>(&mut self, source: &S) -> Progress {
        let budget = self.config.propagation_chunk_lines.max(1);
        self.advance(source, budget)
    }

    /// Runs propagation until no edits are pending.
    pub fn run_to_completion<S: LineSource + ?Sized>(&mut self, source: &S) -> usize {
        let mut total = 0;
        loop {
            let progress = self.advance(source, usize::MAX);
            total += progress.visited;
            if progress.is_idle() {
                return total;
            }
        }
    }

    /// Pull interface for the host: tokens of `line`, propagating just far enough to make them
    /// valid.
    pub fn tokens_for_line<S: LineSource + ?Sized>(
        &mut self,
        source: &S,
        line: usize,
    ) -> Option<Arc<[Token]>> {
        self.cache.ensure_shape(source.line_count());
        if line >= self.cache.len() {
            return None;
        }
        while let Some(dirty) = self.cache.first_dirty() {
            if dirty > line {
                break;
            }
            self.step(source, dirty);
        }
        self.cache.line(line).map(|cached| Arc::clone(&cached.tokens))
    }

    /// Outgoing state of `line`, if it is currently valid.
    pub fn state_after(&self, line: usize) -> Option<&RuleStack> {
        if self.cache.first_dirty().is_some_and(|dirty| dirty <= line) {
            return None;
        }
        self.cache.line(line).map(|cached| &cached.end_state)
    }

    pub fn is_degraded(&self, line: usize) -> bool {
        self.cache.line(line).is_some_and(|cached| cached.degraded)
    }

    fn step<S: LineSource + ?Sized>(&mut self, source: &S, line: usize) {
        let incoming = self.cache.incoming_state(line);
        let text = source.line_text(line);

        let cached = match self.tokenizer.tokenize_line(&text, &incoming) {
            Ok(LineTokens { tokens, state }) => CachedLine {
                tokens: Arc::from(tokens),
                end_state: state,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(line, error = %e, "tokenization failed; line left unscoped");
                CachedLine {
                    tokens: Arc::from(vec![Token {
                        range: 0..text.len(),
                        scopes: ScopePath::empty(),
                    }]),
                    end_state: RuleStack::empty(),
                    degraded: true,
                }
            }
        };

        let end_state = cached.end_state.clone();
        let previous = self.cache.store(line, cached);
        let converged = previous.is_some_and(|old| old.end_state == end_state);
        self.cache.settle_line(line, converged);
    }
}

/// Tokenizes every line from scratch, threading states line to line.
pub fn tokenize_document<S: LineSource + ?Sized>(
    grammar: &Arc<Grammar>,
    config: &HighlightConfig,
    source: &S,
) -> Vec<LineTokens> {
    let mut tokenizer = LineTokenizer::new(Arc::clone(grammar), config);
    let mut state = RuleStack::empty();
    let mut out = Vec::with_capacity(source.line_count());
    for line in 0..source.line_count() {
        let text = source.line_text(line);
        let result = tokenizer.tokenize_line(&text, &state).unwrap_or_else(|_| LineTokens {
            tokens: vec![Token {
                range: 0..text.len(),
                scopes: ScopePath::empty(),
            }],
            state: RuleStack::empty(),
        });
        state = result.state.clone();
        out.push(result);
    }
    out
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/editor/driver.rs"]
mod tests;
