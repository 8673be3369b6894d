//! Headless highlighting core (grammar -> tokens -> styles).

pub mod editor;
pub mod error;
pub mod grammar;
pub mod language;
pub mod scope;
pub mod services;
pub mod theme;
pub mod tokenizer;

pub use editor::{EditEvent, EditorAdapter, IncrementalDriver, LineSource, StyledToken, TextEdit};
pub use error::{AssetError, GrammarError, MatchEngineError};
pub use grammar::{Grammar, GrammarSet, GrammarSource};
pub use language::{Language, LanguageRegistry};
pub use scope::{Scope, ScopePath};
pub use theme::{Style, Theme, ThemeRule};
pub use tokenizer::{tokenize_line, LineTokenizer, LineTokens, RuleStack, Token};
