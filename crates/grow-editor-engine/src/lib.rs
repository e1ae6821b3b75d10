pub mod api;
pub mod editing;
pub mod models;
pub mod utility;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use api::{ApiError, EditorApi, HttpEditorApi};
pub use editing::*;
pub use models::*;
pub use utility::Config;
