use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Declares one editable slot: which field implementation renders it and
/// which front-matter key it edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMeta {
    #[serde(rename = "type")]
    pub field_type: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Type-specific options the core does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldMeta {
    pub fn new(field_type: &str, key: &str, label: Option<&str>) -> Self {
        Self {
            field_type: field_type.to_string(),
            key: key.to_string(),
            label: label.map(str::to_string),
            extra: Map::new(),
        }
    }
}

/// The `editor` block some payloads use to carry field meta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorSection {
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

// Field meta shows up both top-level and under `editor.fields`.
fn pick_fields<'a>(fields: &'a [FieldMeta], editor: Option<&'a EditorSection>) -> &'a [FieldMeta] {
    match editor {
        Some(section) if fields.is_empty() => &section.fields,
        _ => fields,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Canonical document shape returned by every document endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub pod_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorSection>,
    #[serde(default = "empty_object")]
    pub front_matter: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_front_matter: Option<String>,
    #[serde(default)]
    pub serving_paths: BTreeMap<String, String>,
    #[serde(default)]
    pub default_locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl DocumentPayload {
    pub fn field_meta(&self) -> &[FieldMeta] {
        pick_fields(&self.fields, self.editor.as_ref())
    }
}

/// One reusable content block schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<EditorSection>,
}

impl PartialDefinition {
    pub fn field_meta(&self) -> &[FieldMeta] {
        pick_fields(&self.fields, self.editor.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialsPayload {
    #[serde(default)]
    pub partials: BTreeMap<String, PartialDefinition>,
}

/// Resolved catalog of partial definitions, keyed by discriminator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialCatalog {
    partials: BTreeMap<String, PartialDefinition>,
}

impl PartialCatalog {
    pub fn get(&self, key: &str) -> Option<&PartialDefinition> {
        self.partials.get(key)
    }

    /// Label for a partial, falling back to its key.
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.partials
            .get(key)
            .and_then(|partial| partial.label.as_deref())
            .unwrap_or(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.partials.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.partials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partials.is_empty()
    }
}

impl From<PartialsPayload> for PartialCatalog {
    fn from(payload: PartialsPayload) -> Self {
        Self {
            partials: payload.partials,
        }
    }
}
