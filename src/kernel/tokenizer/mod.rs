//! Line tokenizer: applies a compiled grammar to one line at a time.

mod stack;

pub use self::stack::RuleStack;

use crate::kernel::error::MatchEngineError;
use crate::kernel::grammar::{
    resolve_backreferences, CaptureScopes, EndPattern, Grammar, Rule, RuleId,
};
use crate::kernel::scope::ScopePath;
use crate::kernel::services::ports::HighlightConfig;
use regex::{Captures, Regex};
use rustc_hash::FxHashMap;
use std::ops::Range;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte range within the line, end exclusive.
    pub range: Range<usize>,
    /// Scope names outermost first, e.g. `text.bbcode -> meta.tag -> entity.name.tag`.
    pub scopes: ScopePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    pub tokens: Vec<Token>,
    pub state: RuleStack,
}

/// Tokenizes `line` with default limits. See [`LineTokenizer::tokenize_line`].
pub fn tokenize_line(
    grammar: &Arc<Grammar>,
    line: &str,
    state: &RuleStack,
) -> Result<LineTokens, MatchEngineError> {
    LineTokenizer::new(grammar.clone(), &HighlightConfig::default()).tokenize_line(line, state)
}

/// Builds tokens in order, merging neighbours that share a scope path.
struct TokenAccumulator {
    tokens: Vec<Token>,
    last_end: usize,
}

impl TokenAccumulator {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            last_end: 0,
        }
    }

    fn produce(&mut self, end: usize, scopes: &ScopePath) {
        if end <= self.last_end {
            return;
        }
        if let Some(prev) = self.tokens.last_mut() {
            if prev.range.end == self.last_end
                && (prev.scopes.ptr_eq(scopes) || prev.scopes == *scopes)
            {
                prev.range.end = end;
                self.last_end = end;
                return;
            }
        }
        self.tokens.push(Token {
            range: self.last_end..end,
            scopes: scopes.clone(),
        });
        self.last_end = end;
    }

    fn finish(mut self, line_len: usize, scopes: &ScopePath) -> Vec<Token> {
        self.produce(line_len, scopes);
        if self.tokens.is_empty() {
            self.tokens.push(Token {
                range: 0..0,
                scopes: scopes.clone(),
            });
        }
        self.tokens
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    End,
    Rule(RuleId),
}

/// Resolved backreference end patterns kept per tokenizer before the cache starts over.
const MAX_DYNAMIC_END_PATTERNS: usize = 256;

/// Holds the per-document regex caches; the grammar itself stays shared and immutable.
pub struct LineTokenizer {
    grammar: Arc<Grammar>,
    root_scopes: ScopePath,
    /// Resolved backreference end patterns, keyed by their source text.
    end_regexes: FxHashMap<Arc<str>, Regex>,
    /// Leftmost match per candidate, valid while the top frame stays the same.
    memo: FxHashMap<RuleId, Option<Range<usize>>>,
    step_limit: usize,
    max_line_len: usize,
}

impl LineTokenizer {
    pub fn new(grammar: Arc<Grammar>, config: &HighlightConfig) -> Self {
        let root_scopes = ScopePath::from_scopes([grammar.scope_name().clone()]);
        Self {
            grammar,
            root_scopes,
            end_regexes: FxHashMap::default(),
            memo: FxHashMap::default(),
            step_limit: config.step_limit_per_line.max(1),
            max_line_len: config.max_line_len,
        }
    }

    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Drops the resolved end-pattern cache; called when cached results are discarded.
    pub fn clear_caches(&mut self) {
        self.end_regexes.clear();
        self.memo.clear();
    }

    /// Scope path in effect at the start of a line whose incoming state is `state`.
    pub fn content_scopes(&self, state: &RuleStack) -> ScopePath {
        state
            .content_scopes()
            .cloned()
            .unwrap_or_else(|| self.root_scopes.clone())
    }

    /// Tokenizes one line (without its line terminator) starting from `state`.
    ///
    /// The result covers the line with contiguous tokens; the returned state is the incoming
    /// state for the next line. Deterministic for a given (grammar, line, state).
    pub fn tokenize_line(
        &mut self,
        line: &str,
        state: &RuleStack,
    ) -> Result<LineTokens, MatchEngineError> {
        if line.len() > self.max_line_len {
            let scopes = self.content_scopes(state);
            return Ok(LineTokens {
                tokens: TokenAccumulator::new().finish(line.len(), &scopes),
                state: state.clone(),
            });
        }

        let grammar = Arc::clone(&self.grammar);
        if let Some(rule) = state
            .rules()
            .find(|id| grammar.get_rule(*id).is_none())
        {
            return Err(MatchEngineError::UnknownRule {
                rule: rule.index(),
                rule_count: grammar.rule_count(),
            });
        }
        let mut stack = state.clone();
        let mut acc = TokenAccumulator::new();
        let mut pos = 0usize;
        let mut steps = 0usize;
        // Frames pushed on this line: (rule, depth after push, offset).
        let mut entered: Vec<(RuleId, usize, usize)> = Vec::new();
        self.memo.clear();

        loop {
            steps += 1;
            if steps > self.step_limit {
                return Err(MatchEngineError::StepLimitExceeded {
                    limit: self.step_limit,
                    offset: pos,
                });
            }

            let content = self.content_scopes(&stack);
            let Some((hit, caps)) = self.scan(line, pos, &stack)? else {
                break;
            };
            let whole = group_range(&caps, 0).unwrap_or(pos..pos);

            match hit {
                Hit::End => {
                    let name_scopes = stack.name_scopes().cloned().unwrap_or_default();
                    let no_captures = CaptureScopes::default();
                    let end_captures = match stack.top_rule().map(|id| grammar.rule(id)) {
                        Some(Rule::BeginEnd { end_captures, .. }) => end_captures,
                        _ => &no_captures,
                    };
                    acc.produce(whole.start, &content);
                    emit_captures(&mut acc, &name_scopes, end_captures, &caps);
                    acc.produce(whole.end, &name_scopes);

                    let popped_depth = stack.depth();
                    stack = stack.pop();
                    self.memo.clear();
                    if whole.is_empty()
                        && entered
                            .iter()
                            .any(|&(_, depth, at)| depth == popped_depth && at == whole.end)
                    {
                        // Pushed and popped without advancing.
                        tracing::trace!(offset = pos, "zero-width begin/end cycle");
                        break;
                    }
                    pos = whole.end;
                }
                Hit::Rule(id) => match grammar.rule(id) {
                    Rule::Match { name, captures, .. } => {
                        let scopes = content.push(name.as_ref());
                        acc.produce(whole.start, &content);
                        emit_captures(&mut acc, &scopes, captures, &caps);
                        acc.produce(whole.end, &scopes);
                        if whole.is_empty() {
                            // Zero-width and no stack change: scanning again would not advance.
                            break;
                        }
                        pos = whole.end;
                    }
                    Rule::BeginEnd {
                        name,
                        content_name,
                        begin_captures,
                        end,
                        ..
                    } => {
                        let depth = stack.depth() + 1;
                        if whole.is_empty()
                            && entered
                                .iter()
                                .any(|&(rule, d, at)| rule == id && d == depth && at == whole.end)
                        {
                            tracing::trace!(offset = pos, "zero-width begin re-entered");
                            break;
                        }

                        let name_scopes = content.push(name.as_ref());
                        let content_scopes = name_scopes.push(content_name.as_ref());
                        let resolved_end = match end {
                            EndPattern::Dynamic(source) => {
                                let texts: Vec<Option<&str>> = caps
                                    .iter()
                                    .map(|m| m.map(|m| m.as_str()))
                                    .collect();
                                Some(Arc::from(resolve_backreferences(source, &texts)))
                            }
                            EndPattern::Static(_) | EndPattern::Never => None,
                        };

                        acc.produce(whole.start, &content);
                        emit_captures(&mut acc, &name_scopes, begin_captures, &caps);
                        acc.produce(whole.end, &name_scopes);

                        stack = stack.push(id, resolved_end, name_scopes, content_scopes);
                        entered.push((id, depth, whole.end));
                        self.memo.clear();
                        pos = whole.end;
                    }
                    Rule::Group { .. } => break,
                },
            }
        }

        let tail_scopes = self.content_scopes(&stack);
        Ok(LineTokens {
            tokens: acc.finish(line.len(), &tail_scopes),
            state: stack,
        })
    }

    /// Finds the leftmost match at or after `pos` among the top rule's end pattern and its
    /// candidates. Ties on start offset go to the earlier alternative; the end pattern comes
    /// first unless the rule asks for `applyEndPatternLast`.
    fn scan<'l>(
        &mut self,
        line: &'l str,
        pos: usize,
        stack: &RuleStack,
    ) -> Result<Option<(Hit, Captures<'l>)>, MatchEngineError> {
        if pos > line.len() {
            return Ok(None);
        }
        let grammar = Arc::clone(&self.grammar);
        let top = stack.top_rule().unwrap_or_else(|| grammar.root());

        let end_last = match grammar.rule(top) {
            Rule::BeginEnd {
                end,
                apply_end_pattern_last,
                ..
            } => {
                if let (EndPattern::Dynamic(_), Some(source)) = (end, stack.top_end()) {
                    self.ensure_dynamic_end(source)?;
                }
                *apply_end_pattern_last
            }
            _ => false,
        };

        let end_start = self
            .end_regex(&grammar, top, stack)
            .and_then(|re| re.find_at(line, pos))
            .map(|m| m.start());

        let mut best: Option<(usize, Hit)> = None;
        if !end_last {
            consider(&mut best, end_start, Hit::End);
        }
        for &id in grammar.candidates(top) {
            if best.is_some_and(|(s, _)| s == pos) {
                break;
            }
            let start = self.candidate_start(&grammar, id, line, pos);
            consider(&mut best, start, Hit::Rule(id));
        }
        if end_last {
            consider(&mut best, end_start, Hit::End);
        }

        let Some((start, hit)) = best else {
            return Ok(None);
        };
        let regex = match hit {
            Hit::End => self.end_regex(&grammar, top, stack),
            Hit::Rule(id) => match grammar.rule(id) {
                Rule::Match { regex, .. } => Some(regex),
                Rule::BeginEnd { begin, .. } => Some(begin),
                Rule::Group { .. } => None,
            },
        };
        let caps = regex.and_then(|re| re.captures_at(line, start));
        Ok(caps.map(|caps| (hit, caps)))
    }

    fn candidate_start(
        &mut self,
        grammar: &Grammar,
        id: RuleId,
        line: &str,
        pos: usize,
    ) -> Option<usize> {
        if let Some(cached) = self.memo.get(&id) {
            match cached {
                Some(range) if range.start >= pos => return Some(range.start),
                None => return None,
                Some(_) => {}
            }
        }
        let regex = match grammar.rule(id) {
            Rule::Match { regex, .. } => regex,
            Rule::BeginEnd { begin, .. } => begin,
            Rule::Group { .. } => return None,
        };
        let found = regex.find_at(line, pos).map(|m| m.range());
        let start = found.as_ref().map(|r| r.start);
        self.memo.insert(id, found);
        start
    }

    /// End pattern of the frame on top of `stack`, if the stack is not at the grammar root.
    fn end_regex<'a>(
        &'a self,
        grammar: &'a Grammar,
        top: RuleId,
        stack: &RuleStack,
    ) -> Option<&'a Regex> {
        if stack.is_empty() {
            return None;
        }
        match grammar.rule(top) {
            Rule::BeginEnd {
                end: EndPattern::Static(regex),
                ..
            } => Some(regex),
            Rule::BeginEnd {
                end: EndPattern::Dynamic(_),
                ..
            } => stack.top_end().and_then(|source| self.end_regexes.get(source)),
            _ => None,
        }
    }

    fn ensure_dynamic_end(&mut self, source: &str) -> Result<(), MatchEngineError> {
        if !self.end_regexes.contains_key(source) {
            let regex = Regex::new(source)?;
            if self.end_regexes.len() >= MAX_DYNAMIC_END_PATTERNS {
                self.end_regexes.clear();
            }
            self.end_regexes.insert(Arc::from(source), regex);
        }
        Ok(())
    }
}

fn consider(best: &mut Option<(usize, Hit)>, start: Option<usize>, hit: Hit) {
    let Some(start) = start else {
        return;
    };
    if best.map_or(true, |(s, _)| start < s) {
        *best = Some((start, hit));
    }
}

fn group_range(caps: &Captures<'_>, group: usize) -> Option<Range<usize>> {
    caps.get(group).map(|m| m.range())
}

/// Emits tokens for capture groups nested inside one match. Groups are visited in index order;
/// a group that starts inside a previous group's range nests its scope under it.
fn emit_captures(
    acc: &mut TokenAccumulator,
    base: &ScopePath,
    captures: &CaptureScopes,
    caps: &Captures<'_>,
) {
    if captures.is_empty() {
        return;
    }

    let mut open: Vec<(usize, ScopePath)> = Vec::new();
    for group in 0..captures.len().min(caps.len()) {
        let (Some(scope), Some(range)) = (captures.get(group), group_range(caps, group)) else {
            continue;
        };
        if range.is_empty() {
            continue;
        }

        while let Some((end, scopes)) = open.last() {
            if *end > range.start {
                break;
            }
            acc.produce(*end, scopes);
            open.pop();
        }

        let parent = open.last().map_or(base, |(_, scopes)| scopes);
        acc.produce(range.start, parent);
        let scopes = parent.push(Some(scope));
        open.push((range.end, scopes));
    }

    while let Some((end, scopes)) = open.pop() {
        acc.produce(end, &scopes);
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/tokenizer/mod.rs"]
mod tests;
