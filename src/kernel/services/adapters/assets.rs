//! Asset loaders: grammar/theme descriptions from disk or memory.
//!
//! Disk layout under the asset root:
//! - `<root>/grammars/<language grammar file>` (TextMate JSON)
//! - `<root>/themes/<theme file>` (VS Code theme JSON)

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::kernel::error::AssetError;
use crate::kernel::grammar::{GrammarSet, GrammarSource};
use crate::kernel::language::LanguageRegistry;
use crate::kernel::services::ports::{AssetFuture, AssetLoader, AssetResult};
use crate::kernel::theme::{parse_color, FontStyle, StyleSpec, ThemeRule};

const GRAMMARS_DIR: &str = "grammars";
const THEMES_DIR: &str = "themes";
pub const DEFAULT_THEME_FILE: &str = "dark-plus.json";

pub struct FsAssetLoader {
    root: PathBuf,
    grammar_files: FxHashMap<String, String>,
    theme_file: String,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>, languages: &LanguageRegistry) -> Self {
        let grammar_files = languages
            .iter()
            .map(|l| (l.scope_name.clone(), l.grammar_path.clone()))
            .collect();
        Self {
            root: root.into(),
            grammar_files,
            theme_file: DEFAULT_THEME_FILE.to_string(),
        }
    }

    pub fn with_theme_file(mut self, theme_file: impl Into<String>) -> Self {
        self.theme_file = theme_file.into();
        self
    }

    /// Registers a grammar file for a scope not covered by the language registry
    /// (typically an embedded grammar).
    pub fn with_grammar_file(mut self, scope_name: &str, file: &str) -> Self {
        self.grammar_files
            .insert(scope_name.to_string(), file.to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn grammar_path(&self, scope_name: &str) -> Option<PathBuf> {
        self.grammar_files
            .get(scope_name)
            .map(|file| self.root.join(GRAMMARS_DIR).join(file))
    }
}

async fn read_asset(path: &Path) -> AssetResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AssetError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(AssetError::Io(e)),
    }
}

impl AssetLoader for FsAssetLoader {
    fn fetch_grammar_source<'a>(&'a self, scope_name: &'a str) -> AssetFuture<'a, GrammarSource> {
        Box::pin(async move {
            let path = self
                .grammar_path(scope_name)
                .ok_or_else(|| AssetError::NotFound(scope_name.to_string()))?;
            let text = read_asset(&path).await?;
            let source = GrammarSource::from_json(&text)?;
            tracing::debug!(scope = scope_name, path = %path.display(), "grammar source loaded");
            Ok(source)
        })
    }

    fn fetch_theme_rules(&self) -> AssetFuture<'_, Vec<ThemeRule>> {
        Box::pin(async move {
            let path = self.root.join(THEMES_DIR).join(&self.theme_file);
            let text = read_asset(&path).await?;
            parse_theme_json(&text)
        })
    }
}

/// Loader over already-deserialized assets, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetLoader {
    grammars: FxHashMap<String, GrammarSource>,
    theme: Option<Vec<ThemeRule>>,
}

impl MemoryAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grammar(mut self, source: GrammarSource) -> Self {
        self.grammars.insert(source.scope_name.clone(), source);
        self
    }

    pub fn with_theme(mut self, rules: Vec<ThemeRule>) -> Self {
        self.theme = Some(rules);
        self
    }
}

impl AssetLoader for MemoryAssetLoader {
    fn fetch_grammar_source<'a>(&'a self, scope_name: &'a str) -> AssetFuture<'a, GrammarSource> {
        Box::pin(async move {
            self.grammars
                .get(scope_name)
                .cloned()
                .ok_or_else(|| AssetError::NotFound(scope_name.to_string()))
        })
    }

    fn fetch_theme_rules(&self) -> AssetFuture<'_, Vec<ThemeRule>> {
        Box::pin(async move {
            self.theme
                .clone()
                .ok_or_else(|| AssetError::NotFound("theme".to_string()))
        })
    }
}

/// Fetches `scope_name` and, transitively, every grammar it includes by scope.
///
/// Missing embedded grammars are skipped; compiling will then report the unresolved include.
pub async fn load_grammar_set<L: AssetLoader + ?Sized>(
    loader: &L,
    scope_name: &str,
) -> AssetResult<(GrammarSource, GrammarSet)> {
    let base = loader.fetch_grammar_source(scope_name).await?;
    let mut set = GrammarSet::new();
    let mut queue = base.external_scopes();

    while let Some(scope) = queue.pop() {
        if set.contains(&scope) || scope == base.scope_name {
            continue;
        }
        match loader.fetch_grammar_source(&scope).await {
            Ok(source) => {
                queue.extend(source.external_scopes());
                set.insert(source);
            }
            Err(e) => {
                tracing::warn!(scope = %scope, error = %e, "embedded grammar unavailable");
            }
        }
    }

    Ok((base, set))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeFile {
    #[serde(default)]
    colors: FxHashMap<String, String>,
    #[serde(default)]
    token_colors: Vec<TokenColor>,
}

#[derive(Debug, Deserialize)]
struct TokenColor {
    #[serde(default)]
    scope: Option<ScopeField>,
    #[serde(default)]
    settings: TokenSettings,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeField {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSettings {
    #[serde(default)]
    foreground: Option<String>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    font_style: Option<String>,
}

impl TokenSettings {
    fn to_spec(&self) -> StyleSpec {
        StyleSpec {
            foreground: self.foreground.as_deref().and_then(parse_color),
            background: self.background.as_deref().and_then(parse_color),
            font_style: self.font_style.as_deref().map(FontStyle::parse),
        }
    }
}

/// Parses a VS Code theme into ordered rules. `colors.editor.foreground/background` become a
/// leading default rule; scope-less `tokenColors` entries stay in place as default overrides.
pub fn parse_theme_json(text: &str) -> AssetResult<Vec<ThemeRule>> {
    let file: ThemeFile = serde_json::from_str(text)?;
    let mut rules = Vec::with_capacity(file.token_colors.len() + 1);

    let editor_defaults = StyleSpec {
        foreground: file
            .colors
            .get("editor.foreground")
            .and_then(|c| parse_color(c)),
        background: file
            .colors
            .get("editor.background")
            .and_then(|c| parse_color(c)),
        font_style: None,
    };
    if editor_defaults != StyleSpec::default() {
        rules.push(ThemeRule::new("", editor_defaults));
    }

    for entry in &file.token_colors {
        let selector = match &entry.scope {
            None => String::new(),
            Some(ScopeField::One(scope)) => scope.clone(),
            Some(ScopeField::Many(scopes)) => scopes.join(","),
        };
        rules.push(ThemeRule::new(selector, entry.settings.to_spec()));
    }

    Ok(rules)
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/assets.rs"]
mod tests;
