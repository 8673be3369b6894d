use crate::kernel::theme::TieBreak;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Lines longer than this (in bytes) are not tokenized.
    pub max_line_len: usize,
    /// Lines re-tokenized per cooperative propagation step.
    pub propagation_chunk_lines: usize,
    /// Rule evaluations allowed for a single line before the line degrades.
    pub step_limit_per_line: usize,
    pub theme_tie_break: TieBreak,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            max_line_len: 20_000,
            propagation_chunk_lines: 256,
            step_limit_per_line: 20_000,
            theme_tie_break: TieBreak::LastWins,
        }
    }
}

/// Extra language registrations on top of the built-in ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub id: String,
    pub scope_name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_path: Option<String>,
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/ports/settings.rs"]
mod tests;
