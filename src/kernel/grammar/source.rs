//! Deserialized grammar description, as handed over by the asset loader.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarSource {
    pub scope_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_types: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<RuleSource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repository: BTreeMap<String, RuleSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injections: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(default, rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, rename = "while", skip_serializing_if = "Option::is_none")]
    pub while_: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub captures: BTreeMap<String, CaptureSource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub begin_captures: BTreeMap<String, CaptureSource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub end_captures: BTreeMap<String, CaptureSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<RuleSource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub repository: BTreeMap<String, RuleSource>,
    #[serde(default)]
    pub apply_end_pattern_last: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GrammarSource {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Scope names of other grammars referenced through `include`, in first-seen order.
    pub fn external_scopes(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut visit = |rule: &RuleSource| {
            if let Some(scope) = rule.include.as_deref().and_then(external_scope) {
                if scope != self.scope_name && !out.iter().any(|s: &String| s == scope) {
                    out.push(scope.to_string());
                }
            }
        };
        for rule in &self.patterns {
            rule.walk(&mut visit);
        }
        for rule in self.repository.values() {
            rule.walk(&mut visit);
        }
        out
    }
}

impl RuleSource {
    pub fn matching(pattern: &str, name: &str) -> Self {
        Self {
            match_: Some(pattern.to_string()),
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub fn include(target: &str) -> Self {
        Self {
            include: Some(target.to_string()),
            ..Self::default()
        }
    }

    fn walk(&self, visit: &mut impl FnMut(&RuleSource)) {
        visit(self);
        for rule in &self.patterns {
            rule.walk(visit);
        }
        for rule in self.repository.values() {
            rule.walk(visit);
        }
    }
}

/// Scope part of a cross-grammar include (`source.css` or `source.css#rules`).
pub(crate) fn external_scope(include: &str) -> Option<&str> {
    if include.is_empty() || include.starts_with('#') || include.starts_with('$') {
        return None;
    }
    let scope = include.split('#').next().unwrap_or(include);
    (!scope.is_empty()).then_some(scope)
}
