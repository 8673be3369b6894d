use std::future::Future;
use std::pin::Pin;

use crate::kernel::error::AssetError;
use crate::kernel::grammar::GrammarSource;
use crate::kernel::theme::ThemeRule;

pub type Result<T> = std::result::Result<T, AssetError>;

pub type AssetFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Storage-side collaborator that fetches grammar and theme descriptions.
///
/// Formats on disk (JSON, property lists) are the loader's business; callers only see
/// deserialized structures.
pub trait AssetLoader: Send + Sync {
    fn fetch_grammar_source<'a>(&'a self, scope_name: &'a str) -> AssetFuture<'a, GrammarSource>;

    /// Ordered theme rules; rules with an empty selector carry the theme defaults.
    fn fetch_theme_rules(&self) -> AssetFuture<'_, Vec<ThemeRule>>;
}
