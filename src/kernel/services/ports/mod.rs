//! Service ports: traits + data contracts.

pub mod assets;
pub mod settings;

pub use assets::{AssetFuture, AssetLoader, Result as AssetResult};
pub use settings::{HighlightConfig, LanguageEntry, Settings};
