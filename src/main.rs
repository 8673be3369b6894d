//! blackboard-highlight: prints the tokens and resolved colors of a file.
//!
//! Usage: blackboard-highlight <grammar.json> <theme.json> <file>

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use blackboard::kernel::grammar::GrammarSource;
use blackboard::kernel::language::{Language, LanguageRegistry};
use blackboard::kernel::services::adapters::{load_settings, parse_theme_json, MemoryAssetLoader};
use blackboard::kernel::{EditorAdapter, LineSource};

mod logging;

const GRAMMAR_SUFFIX: &str = ".tmLanguage.json";

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: blackboard-highlight <grammar.json> <theme.json> <file>");
        std::process::exit(2);
    }

    let _logging = logging::init();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(
        PathBuf::from(&args[1]),
        PathBuf::from(&args[2]),
        PathBuf::from(&args[3]),
    ))
}

async fn run(grammar_path: PathBuf, theme_path: PathBuf, file_path: PathBuf) -> io::Result<()> {
    let settings = load_settings();
    let registry = LanguageRegistry::with_entries(&settings.languages);

    let base = read_grammar(&grammar_path).await?;
    let language = registry
        .by_scope(&base.scope_name)
        .cloned()
        .unwrap_or_else(|| Language {
            id: base.scope_name.clone(),
            scope_name: base.scope_name.clone(),
            extensions: Vec::new(),
            aliases: Vec::new(),
            grammar_path: grammar_path.display().to_string(),
        });

    let mut loader = MemoryAssetLoader::new();
    for sibling in sibling_grammars(&grammar_path).await {
        loader = loader.with_grammar(sibling);
    }
    loader = loader.with_grammar(base);

    match tokio::fs::read_to_string(&theme_path).await {
        Ok(text) => match parse_theme_json(&text) {
            Ok(rules) => loader = loader.with_theme(rules),
            Err(e) => tracing::warn!(path = %theme_path.display(), error = %e, "invalid theme"),
        },
        Err(e) => tracing::warn!(path = %theme_path.display(), error = %e, "theme unreadable"),
    }

    let text = tokio::fs::read_to_string(&file_path).await?;
    let mut adapter = EditorAdapter::load(&loader, &language, &text, settings.highlight).await;
    adapter.settle().await;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in 0..adapter.line_count() {
        let line_text = adapter.document().line_text(line).into_owned();
        for token in adapter.line_tokens(line) {
            let slice = line_text.get(token.range.clone()).unwrap_or("");
            writeln!(
                out,
                "{}:{}..{} {} [{}] {:?}",
                line + 1,
                token.range.start,
                token.range.end,
                token.style.foreground,
                token.scopes,
                slice
            )?;
        }
    }
    Ok(())
}

async fn read_grammar(path: &Path) -> io::Result<GrammarSource> {
    let text = tokio::fs::read_to_string(path).await?;
    GrammarSource::from_json(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Grammars next to the main one, available for embedded includes.
async fn sibling_grammars(path: &Path) -> Vec<GrammarSource> {
    let Some(dir) = path.parent() else {
        return Vec::new();
    };
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let sibling = entry.path();
        let is_grammar = sibling
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(GRAMMAR_SUFFIX));
        if !is_grammar || sibling == path {
            continue;
        }
        match read_grammar(&sibling).await {
            Ok(source) => out.push(source),
            Err(e) => tracing::debug!(path = %sibling.display(), error = %e, "skipping grammar"),
        }
    }
    out
}
