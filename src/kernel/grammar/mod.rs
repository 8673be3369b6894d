//! Grammar support: compiled TextMate-style rule tables.
//!
//! Rules live in an arena indexed by [`RuleId`]. Includes (including `$self` and mutual
//! recursion) are resolved to ids at compile time, so the rule graph may be cyclic without any
//! recursive ownership.

mod backref;
mod compile;
mod source;

pub(crate) use self::backref::resolve_backreferences;
pub use self::compile::compile;
pub use self::source::{CaptureSource, GrammarSource, RuleSource};

use crate::kernel::error::GrammarError;
use crate::kernel::scope::Scope;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u32);

impl RuleId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scope names per capture group; index 0 is the whole match.
#[derive(Debug, Clone, Default)]
pub struct CaptureScopes(Vec<Option<Scope>>);

impl CaptureScopes {
    pub(crate) fn new(groups: Vec<Option<Scope>>) -> Self {
        Self(groups)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn get(&self, group: usize) -> Option<&Scope> {
        self.0.get(group).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Clone)]
pub enum EndPattern {
    Static(Regex),
    /// Contains backreferences; resolved against the begin captures when the rule is entered.
    Dynamic(String),
    /// `begin` without `end`: the rule stays open until the document ends.
    Never,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Match {
        name: Option<Scope>,
        regex: Regex,
        captures: CaptureScopes,
    },
    BeginEnd {
        name: Option<Scope>,
        content_name: Option<Scope>,
        begin: Regex,
        begin_captures: CaptureScopes,
        end: EndPattern,
        end_captures: CaptureScopes,
        patterns: Vec<RuleId>,
        apply_end_pattern_last: bool,
    },
    /// Pattern list without its own match: grammar roots, repository groups and include aliases.
    Group { patterns: Vec<RuleId> },
}

impl Rule {
    pub fn name(&self) -> Option<&Scope> {
        match self {
            Rule::Match { name, .. } | Rule::BeginEnd { name, .. } => name.as_ref(),
            Rule::Group { .. } => None,
        }
    }

    fn patterns(&self) -> &[RuleId] {
        match self {
            Rule::BeginEnd { patterns, .. } | Rule::Group { patterns } => patterns,
            Rule::Match { .. } => &[],
        }
    }
}

/// Immutable compiled grammar. Safe to share across threads.
#[derive(Debug)]
pub struct Grammar {
    scope_name: Scope,
    root: RuleId,
    rules: Vec<Rule>,
    /// Per rule: the flattened `Match`/`BeginEnd` rules scanned while it is on top of the stack.
    candidates: Vec<Arc<[RuleId]>>,
}

impl Grammar {
    pub(crate) fn new(scope_name: Scope, root: RuleId, rules: Vec<Rule>) -> Self {
        let candidates = (0..rules.len())
            .map(|i| flatten_candidates(&rules, RuleId::new(i)))
            .collect();
        Self {
            scope_name,
            root,
            rules,
            candidates,
        }
    }

    pub fn compile(source: &GrammarSource) -> Result<Self, GrammarError> {
        compile(source, &GrammarSet::default())
    }

    pub fn compile_with(source: &GrammarSource, set: &GrammarSet) -> Result<Self, GrammarError> {
        compile(source, set)
    }

    pub fn scope_name(&self) -> &Scope {
        &self.scope_name
    }

    pub fn root(&self) -> RuleId {
        self.root
    }

    /// Panics if `id` was not produced by this grammar; see [`Self::get_rule`].
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn get_rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(id.index())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn candidates(&self, id: RuleId) -> &[RuleId] {
        &self.candidates[id.index()]
    }
}

/// Expands nested groups into the ordered list of matchable rules. A visited set keeps cyclic
/// includes (`$self`, mutual repository references) finite; the first occurrence wins.
fn flatten_candidates(rules: &[Rule], id: RuleId) -> Arc<[RuleId]> {
    let mut out = Vec::new();
    let mut visited = vec![false; rules.len()];
    visited[id.index()] = true;
    let mut stack: Vec<RuleId> = rules[id.index()].patterns().iter().rev().copied().collect();

    while let Some(next) = stack.pop() {
        let rule = &rules[next.index()];
        match rule {
            Rule::Group { patterns } => {
                if visited[next.index()] {
                    continue;
                }
                visited[next.index()] = true;
                stack.extend(patterns.iter().rev().copied());
            }
            Rule::Match { .. } | Rule::BeginEnd { .. } => {
                if !out.contains(&next) {
                    out.push(next);
                }
            }
        }
    }

    Arc::from(out)
}

/// Grammar sources available for cross-grammar includes, keyed by scope name.
#[derive(Debug, Clone, Default)]
pub struct GrammarSet {
    sources: FxHashMap<String, GrammarSource>,
}

impl GrammarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: GrammarSource) {
        self.sources.insert(source.scope_name.clone(), source);
    }

    pub fn get(&self, scope_name: &str) -> Option<&GrammarSource> {
        self.sources.get(scope_name)
    }

    pub fn contains(&self, scope_name: &str) -> bool {
        self.sources.contains_key(scope_name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/grammar/mod.rs"]
mod tests;
