use super::*;
use crate::kernel::services::ports::LanguageEntry;
use std::path::Path;

#[test]
fn bbcode_is_registered_by_default() {
    let registry = LanguageRegistry::default();

    let by_path = registry.from_path(Path::new("notes/board.bbcode")).unwrap();
    assert_eq!(by_path.id, "bbcode");
    assert_eq!(by_path.scope_name, "text.bbcode");
    assert_eq!(by_path.grammar_path, "bbcode.tmLanguage.json");

    assert_eq!(registry.by_scope("text.bbcode"), Some(by_path));
    assert_eq!(registry.by_id("bbcode"), Some(by_path));
    assert_eq!(registry.by_id("bbc"), Some(by_path));
}

#[test]
fn extension_lookup_ignores_case_and_unknown_files() {
    let registry = LanguageRegistry::default();
    assert!(registry.from_path(Path::new("A.BBCODE")).is_some());
    assert!(registry.from_path(Path::new("a.txt")).is_none());
    assert!(registry.from_path(Path::new("Makefile")).is_none());
}

#[test]
fn settings_entries_add_or_replace_languages() {
    let entries = [
        LanguageEntry {
            id: "markdown".to_string(),
            scope_name: "text.html.markdown".to_string(),
            extensions: vec![".md".to_string()],
            grammar_path: None,
        },
        LanguageEntry {
            id: "bbcode".to_string(),
            scope_name: "text.bbcode".to_string(),
            extensions: vec![".bb".to_string()],
            grammar_path: Some("custom-bbcode.json".to_string()),
        },
    ];
    let registry = LanguageRegistry::with_entries(&entries);

    assert_eq!(registry.iter().count(), 2);
    let markdown = registry.from_path(Path::new("README.md")).unwrap();
    assert_eq!(markdown.grammar_path, "markdown.tmLanguage.json");

    let bbcode = registry.by_id("bbcode").unwrap();
    assert_eq!(bbcode.grammar_path, "custom-bbcode.json");
    assert!(registry.from_path(Path::new("x.bbcode")).is_none());
    assert!(registry.from_path(Path::new("x.bb")).is_some());
}

#[test]
fn empty_registry_knows_nothing() {
    let registry = LanguageRegistry::empty();
    assert!(registry.by_id("bbcode").is_none());
    assert_eq!(registry.iter().count(), 0);
}
