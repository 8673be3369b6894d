use std::path::Path;

use crate::kernel::services::ports::LanguageEntry;

/// A language the editor can highlight, tied to the grammar that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pub id: String,
    pub scope_name: String,
    pub extensions: Vec<String>,
    pub aliases: Vec<String>,
    pub grammar_path: String,
}

impl Language {
    pub fn bbcode() -> Self {
        Self {
            id: "bbcode".to_string(),
            scope_name: "text.bbcode".to_string(),
            extensions: vec![".bbcode".to_string()],
            aliases: vec!["BBC".to_string()],
            grammar_path: "bbcode.tmLanguage.json".to_string(),
        }
    }

    fn matches_extension(&self, ext: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

impl From<LanguageEntry> for Language {
    fn from(entry: LanguageEntry) -> Self {
        let grammar_path = entry
            .grammar_path
            .unwrap_or_else(|| format!("{}.tmLanguage.json", entry.id));
        Self {
            id: entry.id,
            scope_name: entry.scope_name,
            extensions: entry.extensions,
            aliases: Vec::new(),
            grammar_path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<Language>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self {
            languages: vec![Language::bbcode()],
        }
    }
}

impl LanguageRegistry {
    pub fn empty() -> Self {
        Self {
            languages: Vec::new(),
        }
    }

    /// Built-in languages plus user registrations from settings.
    pub fn with_entries(entries: &[LanguageEntry]) -> Self {
        let mut registry = Self::default();
        for entry in entries {
            registry.register(Language::from(entry.clone()));
        }
        registry
    }

    /// Adds or replaces (by id) a language.
    pub fn register(&mut self, language: Language) {
        match self.languages.iter_mut().find(|l| l.id == language.id) {
            Some(existing) => *existing = language,
            None => self.languages.push(language),
        }
    }

    pub fn by_id(&self, id: &str) -> Option<&Language> {
        self.languages
            .iter()
            .find(|l| l.id == id || l.aliases.iter().any(|a| a.eq_ignore_ascii_case(id)))
    }

    pub fn by_scope(&self, scope_name: &str) -> Option<&Language> {
        self.languages.iter().find(|l| l.scope_name == scope_name)
    }

    pub fn from_path(&self, path: &Path) -> Option<&Language> {
        let ext = path.extension().and_then(|s| s.to_str())?;
        self.languages.iter().find(|l| l.matches_extension(ext))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/language.rs"]
mod tests;
