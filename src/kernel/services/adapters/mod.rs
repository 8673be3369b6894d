//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod assets;
pub mod paths;
pub mod settings;

pub use assets::{
    load_grammar_set, parse_theme_json, FsAssetLoader, MemoryAssetLoader, DEFAULT_THEME_FILE,
};
pub use paths::{ensure_log_dir, get_log_dir};
pub use settings::{
    ensure_settings_file, get_settings_path, load_settings, load_settings_from,
    write_default_settings,
};
