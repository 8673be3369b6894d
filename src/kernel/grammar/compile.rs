//! Grammar source -> rule arena.

use super::backref::{has_backreferences, resolve_backreferences};
use super::source::{external_scope, CaptureSource, GrammarSource, RuleSource};
use super::{CaptureScopes, EndPattern, Grammar, GrammarSet, Rule, RuleId};
use crate::kernel::error::GrammarError;
use crate::kernel::scope::Scope;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, GrammarError>;

type Repository = BTreeMap<String, RuleSource>;

/// Compiles `source` (plus any grammars it embeds from `set`) into an immutable [`Grammar`].
pub fn compile(source: &GrammarSource, set: &GrammarSet) -> Result<Grammar> {
    if source.scope_name.trim().is_empty() {
        return Err(GrammarError::EmptyGrammar {
            grammar: source.name.clone().unwrap_or_default(),
        });
    }
    if source.injections.is_some() {
        return Err(GrammarError::UnsupportedRule {
            grammar: source.scope_name.clone(),
            rule: "injections".to_string(),
            reason: "grammar injections are not supported",
        });
    }

    let mut compiler = Compiler {
        base: source,
        set,
        slots: Vec::new(),
        memo: FxHashMap::default(),
    };
    let root = compiler.compile_root(source)?;

    let mut rules = Vec::with_capacity(compiler.slots.len());
    for (index, slot) in compiler.slots.into_iter().enumerate() {
        // Every reserved slot is filled before its compile call returns.
        let Some(rule) = slot else {
            return Err(GrammarError::UnsupportedRule {
                grammar: source.scope_name.clone(),
                rule: format!("rule #{}", index),
                reason: "rule left unresolved",
            });
        };
        rules.push(rule);
    }

    tracing::debug!(
        grammar = %source.scope_name,
        rules = rules.len(),
        grammars = compiler.memo.keys().filter(|k| k.starts_with('@')).count(),
        "grammar compiled"
    );

    Ok(Grammar::new(Scope::from(source.scope_name.as_str()), root, rules))
}

/// Lexical context of a rule: the grammar it belongs to and the repositories in scope,
/// innermost last. Each repository carries the path prefix used for memo keys.
#[derive(Clone)]
struct Context<'a> {
    grammar: &'a GrammarSource,
    repositories: Vec<(&'a Repository, String)>,
}

impl<'a> Context<'a> {
    fn for_grammar(grammar: &'a GrammarSource) -> Self {
        Self {
            grammar,
            repositories: vec![(&grammar.repository, format!("{}#", grammar.scope_name))],
        }
    }

    fn nested(&self, repository: &'a Repository, path: &str) -> Self {
        if repository.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        next.repositories.push((repository, format!("{}/", path)));
        next
    }

    fn lookup(&self, key: &str) -> Option<(&'a RuleSource, String)> {
        self.repositories
            .iter()
            .rev()
            .find_map(|(repo, prefix)| {
                repo.get(key)
                    .map(|rule| (rule, format!("{}{}", prefix, key)))
            })
    }
}

struct Compiler<'a> {
    base: &'a GrammarSource,
    set: &'a GrammarSet,
    slots: Vec<Option<Rule>>,
    /// Rule identifier (grammar root `@scope`, or `scope#repo/path`) -> arena slot.
    memo: FxHashMap<String, RuleId>,
}

impl<'a> Compiler<'a> {
    fn reserve(&mut self) -> RuleId {
        self.slots.push(None);
        RuleId::new(self.slots.len() - 1)
    }

    fn fill(&mut self, id: RuleId, rule: Rule) {
        self.slots[id.index()] = Some(rule);
    }

    fn compile_root(&mut self, grammar: &'a GrammarSource) -> Result<RuleId> {
        let key = format!("@{}", grammar.scope_name);
        if let Some(id) = self.memo.get(&key) {
            return Ok(*id);
        }
        let id = self.reserve();
        self.memo.insert(key, id);

        let ctx = Context::for_grammar(grammar);
        let patterns = self.compile_patterns(&grammar.patterns, &ctx, &grammar.scope_name)?;
        self.fill(id, Rule::Group { patterns });
        Ok(id)
    }

    fn compile_repository_entry(
        &mut self,
        rule: &'a RuleSource,
        path: String,
        ctx: &Context<'a>,
    ) -> Result<RuleId> {
        if let Some(id) = self.memo.get(&path) {
            return Ok(*id);
        }
        // Reserve before descending so that self-references resolve to this slot.
        let id = self.reserve();
        self.memo.insert(path.clone(), id);
        self.compile_into(id, rule, ctx, &path)?;
        Ok(id)
    }

    fn compile_patterns(
        &mut self,
        patterns: &'a [RuleSource],
        ctx: &Context<'a>,
        path: &str,
    ) -> Result<Vec<RuleId>> {
        let mut out = Vec::with_capacity(patterns.len());
        for (i, rule) in patterns.iter().enumerate() {
            let rule_path = format!("{}/patterns[{}]", path, i);
            out.push(self.compile_rule(rule, ctx, &rule_path)?);
        }
        Ok(out)
    }

    fn compile_rule(
        &mut self,
        rule: &'a RuleSource,
        ctx: &Context<'a>,
        path: &str,
    ) -> Result<RuleId> {
        if let Some(include) = rule.include.as_deref() {
            return self.resolve_include(include, ctx);
        }
        let id = self.reserve();
        self.compile_into(id, rule, ctx, path)?;
        Ok(id)
    }

    fn compile_into(
        &mut self,
        id: RuleId,
        rule: &'a RuleSource,
        ctx: &Context<'a>,
        path: &str,
    ) -> Result<()> {
        let grammar = ctx.grammar.scope_name.as_str();

        if let Some(include) = rule.include.as_deref() {
            let target = self.resolve_include(include, ctx)?;
            self.fill(id, Rule::Group {
                patterns: vec![target],
            });
            return Ok(());
        }

        if rule.while_.is_some() {
            return Err(GrammarError::UnsupportedRule {
                grammar: grammar.to_string(),
                rule: path.to_string(),
                reason: "begin/while rules are not supported",
            });
        }

        let inner = ctx.nested(&rule.repository, path);
        let name = rule.name.as_deref().map(Scope::from);

        let compiled = if let Some(pattern) = rule.match_.as_deref() {
            Rule::Match {
                name,
                regex: build_regex(pattern, grammar, path)?,
                captures: capture_scopes(&rule.captures),
            }
        } else if let Some(begin) = rule.begin.as_deref() {
            let begin = build_regex(begin, grammar, path)?;
            let end = match rule.end.as_deref() {
                Some(end) if has_backreferences(end) => {
                    // Probe the syntax with empty captures; real text is escaped at runtime.
                    build_regex(&resolve_backreferences(end, &[]), grammar, path)?;
                    EndPattern::Dynamic(end.to_string())
                }
                Some(end) => EndPattern::Static(build_regex(end, grammar, path)?),
                None => EndPattern::Never,
            };
            let begin_captures = if rule.begin_captures.is_empty() {
                capture_scopes(&rule.captures)
            } else {
                capture_scopes(&rule.begin_captures)
            };
            let end_captures = if rule.end_captures.is_empty() {
                capture_scopes(&rule.captures)
            } else {
                capture_scopes(&rule.end_captures)
            };
            Rule::BeginEnd {
                name,
                content_name: rule.content_name.as_deref().map(Scope::from),
                begin,
                begin_captures,
                end,
                end_captures,
                patterns: self.compile_patterns(&rule.patterns, &inner, path)?,
                apply_end_pattern_last: rule.apply_end_pattern_last,
            }
        } else {
            if rule.end.is_some() {
                return Err(GrammarError::UnsupportedRule {
                    grammar: grammar.to_string(),
                    rule: path.to_string(),
                    reason: "end pattern without begin",
                });
            }
            Rule::Group {
                patterns: self.compile_patterns(&rule.patterns, &inner, path)?,
            }
        };

        self.fill(id, compiled);
        Ok(())
    }

    fn resolve_include(&mut self, include: &str, ctx: &Context<'a>) -> Result<RuleId> {
        let unresolved = || GrammarError::UnresolvedInclude {
            grammar: ctx.grammar.scope_name.clone(),
            include: include.to_string(),
        };

        let base = self.base;
        let set = self.set;
        match include {
            "$self" => return self.compile_root(ctx.grammar),
            "$base" => return self.compile_root(base),
            _ => {}
        }

        if let Some(key) = include.strip_prefix('#') {
            let (rule, path) = ctx.lookup(key).ok_or_else(unresolved)?;
            return self.compile_repository_entry(rule, path, ctx);
        }

        let scope = external_scope(include).ok_or_else(unresolved)?;
        let grammar = if scope == base.scope_name {
            base
        } else if scope == ctx.grammar.scope_name {
            ctx.grammar
        } else {
            set.get(scope).ok_or_else(unresolved)?
        };

        match include.split_once('#') {
            Some((_, key)) => {
                let other = Context::for_grammar(grammar);
                let (rule, path) = other.lookup(key).ok_or_else(unresolved)?;
                self.compile_repository_entry(rule, path, &other)
            }
            None => self.compile_root(grammar),
        }
    }
}

fn build_regex(pattern: &str, grammar: &str, path: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| GrammarError::InvalidPattern {
        grammar: grammar.to_string(),
        rule: path.to_string(),
        source,
    })
}

fn capture_scopes(captures: &BTreeMap<String, CaptureSource>) -> CaptureScopes {
    let mut groups: Vec<Option<Scope>> = Vec::new();
    for (key, capture) in captures {
        let (Ok(index), Some(name)) = (key.parse::<usize>(), capture.name.as_deref()) else {
            continue;
        };
        if groups.len() <= index {
            groups.resize(index + 1, None);
        }
        groups[index] = Some(Scope::from(name));
    }
    CaptureScopes::new(groups)
}
