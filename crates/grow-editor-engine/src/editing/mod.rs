//! Field tree, documents and the editor that keeps them in sync with the
//! server.
//!
//! A [`Document`] owns one [`Field`] per declared meta entry plus a single
//! source field for raw front matter. The [`Editor`] loads documents through
//! an [`EditorApi`](crate::api::EditorApi), renders the fields for the
//! current [`EditMode`] onto a [`Surface`], and submits them back when they
//! change.

pub mod autosave;
pub mod document;
pub mod editor;
pub mod field;
pub mod partials;
pub mod registry;
pub mod surface;

pub use autosave::Autosave;
pub use document::{Document, EditMode, FieldPath};
pub use editor::{
    DEFAULT_AUTOSAVE_INTERVAL_MS, DEFAULT_BASE, DEFAULT_HOST, DEFAULT_PORT, Editor, EditorError,
    EditorEvent, EditorState, default_options,
};
pub use field::{
    Field, FieldError, FieldId, FieldKind, FieldType, FocusState, MoveDirection, SOURCE_KEY,
};
pub use partials::{PartialContainer, PartialsList};
pub use registry::PartialRegistry;
pub use surface::Surface;
