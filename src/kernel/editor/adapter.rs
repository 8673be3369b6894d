//! Host-facing side of the highlighter.
//!
//! The adapter owns the document text, turns text edits into line-range edit events for the
//! driver, and answers pull-based token requests with resolved styles.

use std::ops::Range;
use std::sync::Arc;

use ropey::Rope;
use rustc_hash::FxHashMap;

use super::driver::{IncrementalDriver, LineSource, Progress};
use super::edit::{apply_text_edit, EditEvent, TextEdit};
use crate::kernel::grammar::Grammar;
use crate::kernel::language::Language;
use crate::kernel::scope::ScopePath;
use crate::kernel::services::adapters::load_grammar_set;
use crate::kernel::services::ports::{AssetLoader, HighlightConfig};
use crate::kernel::theme::{Style, Theme};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledToken {
    pub range: Range<usize>,
    pub scopes: ScopePath,
    pub style: Style,
}

pub struct EditorAdapter {
    document: Rope,
    driver: Option<IncrementalDriver>,
    theme: Arc<Theme>,
    styles: FxHashMap<ScopePath, Style>,
    config: HighlightConfig,
}

impl EditorAdapter {
    /// A `None` grammar means plain text: every line is one default-styled token.
    pub fn new(
        text: &str,
        grammar: Option<Arc<Grammar>>,
        theme: Arc<Theme>,
        config: HighlightConfig,
    ) -> Self {
        let document = Rope::from_str(text);
        let driver = grammar
            .map(|grammar| IncrementalDriver::new(grammar, &config, document.line_count()));
        Self {
            document,
            driver,
            theme,
            styles: FxHashMap::default(),
            config,
        }
    }

    /// Fetches and compiles `language`'s grammar and the theme. Never fails: a grammar that
    /// cannot be loaded leaves the document unhighlighted, a missing theme falls back to the
    /// default colors.
    pub async fn load<L: AssetLoader + ?Sized>(
        loader: &L,
        language: &Language,
        text: &str,
        config: HighlightConfig,
    ) -> Self {
        let grammar = load_grammar(loader, &language.scope_name).await;

        let rules = match loader.fetch_theme_rules().await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!(error = %e, "theme unavailable; using default colors");
                Vec::new()
            }
        };
        let theme = Theme::new(rules, Style::default()).with_tie_break(config.theme_tie_break);

        tracing::info!(
            language = %language.id,
            highlighted = grammar.is_some(),
            theme_rules = theme.rule_count(),
            "editor adapter ready"
        );
        Self::new(text, grammar, Arc::new(theme), config)
    }

    pub fn document(&self) -> &Rope {
        &self.document
    }

    pub fn line_count(&self) -> usize {
        self.document.line_count()
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn theme(&self) -> &Arc<Theme> {
        &self.theme
    }

    pub fn grammar(&self) -> Option<&Arc<Grammar>> {
        self.driver.as_ref().map(IncrementalDriver::grammar)
    }

    pub fn driver(&self) -> Option<&IncrementalDriver> {
        self.driver.as_ref()
    }

    /// Applies a local or remote text change and forwards the resulting edit event.
    pub fn apply_edit(&mut self, edit: &TextEdit) -> EditEvent {
        let event = apply_text_edit(&mut self.document, edit);
        self.handle_edit_event(event);
        event
    }

    /// Forwards an edit event for text that already changed.
    pub fn handle_edit_event(&mut self, event: EditEvent) {
        let line_count = self.document.line_count();
        if let Some(driver) = self.driver.as_mut() {
            driver.on_edit(event, line_count);
        }
    }

    /// Replaces the whole document.
    pub fn set_text(&mut self, text: &str) {
        self.document = Rope::from_str(text);
        let line_count = self.document.line_count();
        if let Some(driver) = self.driver.as_mut() {
            driver.invalidate_all(line_count);
        }
    }

    /// Token provider for one visible line. Out-of-range lines yield no tokens.
    pub fn line_tokens(&mut self, line: usize) -> Vec<StyledToken> {
        if line >= self.document.line_count() {
            return Vec::new();
        }
        let tokens = match self.driver.as_mut() {
            Some(driver) => driver.tokens_for_line(&self.document, line),
            None => None,
        };

        let Some(tokens) = tokens else {
            let len = self.document.line_text(line).len();
            return vec![StyledToken {
                range: 0..len,
                scopes: ScopePath::empty(),
                style: self.theme.defaults(),
            }];
        };

        tokens
            .iter()
            .map(|token| StyledToken {
                range: token.range.clone(),
                scopes: token.scopes.clone(),
                style: self.resolve_style(&token.scopes),
            })
            .collect()
    }

    /// Style callback for a scope path, cached per path.
    pub fn resolve_style(&mut self, scopes: &ScopePath) -> Style {
        if let Some(style) = self.styles.get(scopes) {
            return *style;
        }
        let style = self.theme.resolve(scopes.as_slice());
        self.styles.insert(scopes.clone(), style);
        style
    }

    /// One cooperative propagation chunk.
    pub fn pump(&mut self) -> Progress {
        match self.driver.as_mut() {
            Some(driver) => driver.advance_chunk(&self.document),
            None => Progress {
                visited: 0,
                pending_from: None,
            },
        }
    }

    /// Propagates until idle, yielding to the runtime between chunks.
    pub async fn settle(&mut self) -> usize {
        let mut total = 0;
        loop {
            let progress = self.pump();
            total += progress.visited;
            if progress.is_idle() {
                return total;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Swaps the grammar; the in-flight pass and all cached tokens are discarded.
    pub fn set_grammar(&mut self, grammar: Option<Arc<Grammar>>) {
        let line_count = self.document.line_count();
        let Some(grammar) = grammar else {
            self.driver = None;
            return;
        };
        match self.driver.as_mut() {
            Some(driver) => driver.set_grammar(grammar, line_count),
            None => self.driver = Some(IncrementalDriver::new(grammar, &self.config, line_count)),
        }
    }

    pub fn set_theme(&mut self, theme: Arc<Theme>) {
        self.theme = theme;
        self.styles.clear();
    }

    /// Drops all highlighting state; pending propagation is abandoned.
    pub fn close(&mut self) {
        self.driver = None;
        self.styles.clear();
        tracing::debug!("editor adapter closed");
    }
}

async fn load_grammar<L: AssetLoader + ?Sized>(
    loader: &L,
    scope_name: &str,
) -> Option<Arc<Grammar>> {
    let (source, set) = match load_grammar_set(loader, scope_name).await {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(scope = scope_name, error = %e, "grammar unavailable; highlighting disabled");
            return None;
        }
    };
    match Grammar::compile_with(&source, &set) {
        Ok(grammar) => Some(Arc::new(grammar)),
        Err(e) => {
            tracing::error!(scope = scope_name, error = %e, "grammar failed to compile; highlighting disabled");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/kernel/editor/adapter.rs"]
mod tests;
