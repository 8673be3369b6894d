//! Editor side of highlighting: edit model, per-line cache, incremental driver, host adapter.

mod adapter;
mod driver;
mod edit;
mod syntax_highlight_cache;

pub use adapter::{EditorAdapter, StyledToken};
pub use driver::{tokenize_document, IncrementalDriver, LineSource, Progress};
pub use edit::{apply_text_edit, EditEvent, TextEdit};
