//! Scope theme resolution: scope path -> style.
//!
//! Selectors follow TextMate specificity: the rule matching the innermost scope wins, then the
//! selector with more dot segments, then the one with more parent scopes. Remaining ties are
//! broken by declaration order according to [`TieBreak`].

mod style;

pub use self::style::{parse_color, FontStyle, Rgb, Style, StyleSpec};

use crate::kernel::scope::{scope_matches, Scope};
use serde::{Deserialize, Serialize};

/// Which declaration wins when two selectors are equally specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    LastWins,
    FirstWins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeRule {
    /// One or more selectors separated by commas; each selector is a space-separated scope
    /// path whose last element is matched against the token scope. Empty = theme defaults.
    pub selector: String,
    pub style: StyleSpec,
}

impl ThemeRule {
    pub fn new(selector: impl Into<String>, style: StyleSpec) -> Self {
        Self {
            selector: selector.into(),
            style,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledSelector {
    target: Scope,
    /// Ancestor selectors, outermost first.
    parents: Vec<Scope>,
    segments: usize,
    order: usize,
    style: StyleSpec,
}

impl CompiledSelector {
    /// Parents must match scopes strictly outside `depth`, in order.
    fn parents_match(&self, scopes: &[Scope], depth: usize) -> bool {
        let mut limit = depth;
        for parent in self.parents.iter().rev() {
            match scopes[..limit]
                .iter()
                .rposition(|scope| scope_matches(parent, scope))
            {
                Some(found) => limit = found,
                None => return false,
            }
        }
        true
    }

    fn rank(&self) -> (usize, usize) {
        (self.segments, self.parents.len())
    }
}

/// Compiled, immutable theme. Shareable across threads.
#[derive(Debug, Clone)]
pub struct Theme {
    selectors: Vec<CompiledSelector>,
    defaults: Style,
    tie_break: TieBreak,
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(Vec::new(), Style::default())
    }
}

impl Theme {
    pub fn new(rules: Vec<ThemeRule>, defaults: Style) -> Self {
        Self::merged([rules], defaults)
    }

    /// Concatenates several rule lists into one effective list, earlier lists first.
    pub fn merged<I>(lists: I, defaults: Style) -> Self
    where
        I: IntoIterator<Item = Vec<ThemeRule>>,
    {
        let mut defaults = defaults;
        let mut selectors = Vec::new();
        let mut order = 0usize;

        for rule in lists.into_iter().flatten() {
            let mut any = false;
            for selector in rule.selector.split(',').map(str::trim) {
                let mut path: Vec<Scope> = selector.split_whitespace().map(Scope::from).collect();
                let Some(target) = path.pop() else {
                    continue;
                };
                any = true;
                selectors.push(CompiledSelector {
                    segments: target.split('.').count(),
                    target,
                    parents: path,
                    order,
                    style: rule.style,
                });
            }
            if !any {
                defaults = defaults.apply(&rule.style);
            }
            order += 1;
        }

        Self {
            selectors,
            defaults,
            tie_break: TieBreak::default(),
        }
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn defaults(&self) -> Style {
        self.defaults
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    pub fn rule_count(&self) -> usize {
        self.selectors.len()
    }

    /// Style for a scope path (outermost first). Never fails: no match yields the defaults.
    pub fn resolve(&self, scopes: &[Scope]) -> Style {
        for depth in (0..scopes.len()).rev() {
            let scope = &scopes[depth];
            let mut best: Option<&CompiledSelector> = None;
            for candidate in &self.selectors {
                if !scope_matches(&candidate.target, scope)
                    || !candidate.parents_match(scopes, depth)
                {
                    continue;
                }
                best = match best {
                    None => Some(candidate),
                    Some(current) => Some(self.prefer(current, candidate)),
                };
            }
            if let Some(best) = best {
                return self.defaults.apply(&best.style);
            }
        }
        self.defaults
    }

    fn prefer<'a>(
        &self,
        current: &'a CompiledSelector,
        candidate: &'a CompiledSelector,
    ) -> &'a CompiledSelector {
        match candidate.rank().cmp(&current.rank()) {
            std::cmp::Ordering::Greater => candidate,
            std::cmp::Ordering::Less => current,
            std::cmp::Ordering::Equal => match self.tie_break {
                TieBreak::LastWins if candidate.order >= current.order => candidate,
                TieBreak::FirstWins if candidate.order < current.order => candidate,
                _ => current,
            },
        }
    }
}

/// Resolves `scopes` against `rules` with default colors. Pure; builds a throwaway [`Theme`].
pub fn resolve(rules: &[ThemeRule], scopes: &[Scope]) -> Style {
    Theme::new(rules.to_vec(), Style::default()).resolve(scopes)
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/theme/mod.rs"]
mod tests;
