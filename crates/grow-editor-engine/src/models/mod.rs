pub mod payload;

pub use payload::{
    DocumentPayload, EditorSection, FieldMeta, PartialCatalog, PartialDefinition, PartialsPayload,
};
