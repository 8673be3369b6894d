//! blackboard - TextMate grammar highlighting for a collaborative BBCode editor
//!
//! Module layout:
//! - kernel::grammar: rule compiler (grammar source -> rule arena)
//! - kernel::tokenizer: line tokenizer and persistent rule-stack state
//! - kernel::editor: incremental driver, edit model, editor adapter
//! - kernel::theme: scope -> style resolution
//! - kernel::services: asset loading and settings

pub mod kernel;
