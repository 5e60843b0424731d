mod classify;
mod languages;
mod registry;

pub use classify::{Classification, ClassifyError, SnippetClassifier};
pub use languages::javascript::braces_balanced;
pub use registry::{LanguageConfig, LanguageHooks, LanguageRegistry, default_registry};
