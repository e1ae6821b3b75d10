use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::editing::field::{Field, FieldError};
use crate::models::{DocumentPayload, FieldMeta, PartialCatalog};
use crate::utility::{DeepObject, expand};

/// Which projection of the document is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Fields,
    Source,
}

/// Index path to a field: the first index selects a top-level field of the
/// current mode, the rest walk down through container children.
pub type FieldPath = Vec<usize>;

/// A content item being edited.
///
/// Holds one field per declared meta entry for structured editing and a
/// single source field for raw front-matter editing. `update` re-seeds those
/// same field objects, so focus and drafts survive a save round trip.
#[derive(Debug, Clone)]
pub struct Document {
    pod_path: String,
    front_matter: DeepObject,
    raw_front_matter: Option<String>,
    serving_paths: BTreeMap<String, String>,
    default_locale: String,
    locale: Option<String>,
    fields: Vec<Field>,
    source_field: Field,
}

impl Document {
    pub fn new(
        pod_path: &str,
        field_meta: &[FieldMeta],
        front_matter: Value,
        raw_front_matter: Option<String>,
        serving_paths: BTreeMap<String, String>,
        default_locale: &str,
        catalog: Option<&Arc<PartialCatalog>>,
    ) -> Result<Self, FieldError> {
        let front_matter = DeepObject::new(front_matter);
        let fields = field_meta
            .iter()
            .map(|meta| Field::from_meta(meta, front_matter.get(&meta.key), catalog))
            .collect::<Result<Vec<_>, _>>()?;
        let source_field = Field::source(raw_front_matter.as_deref());

        Ok(Self {
            pod_path: pod_path.to_string(),
            front_matter,
            raw_front_matter,
            serving_paths,
            default_locale: default_locale.to_string(),
            locale: None,
            fields,
            source_field,
        })
    }

    pub fn from_payload(
        payload: &DocumentPayload,
        catalog: Option<&Arc<PartialCatalog>>,
    ) -> Result<Self, FieldError> {
        let mut document = Self::new(
            &payload.pod_path,
            payload.field_meta(),
            payload.front_matter.clone(),
            payload.raw_front_matter.clone(),
            payload.serving_paths.clone(),
            &payload.default_locale,
            catalog,
        )?;
        document.locale = payload.locale.clone();
        Ok(document)
    }

    /// Replace identity and location, then re-seed every existing field from
    /// the new front matter in declaration order.
    pub fn update(
        &mut self,
        pod_path: &str,
        front_matter: Value,
        raw_front_matter: Option<String>,
        serving_paths: BTreeMap<String, String>,
        default_locale: &str,
    ) -> Result<(), FieldError> {
        self.pod_path = pod_path.to_string();
        self.front_matter = DeepObject::new(front_matter);
        self.raw_front_matter = raw_front_matter;
        self.serving_paths = serving_paths;
        self.default_locale = default_locale.to_string();

        for field in &mut self.fields {
            let seed = self.front_matter.get(field.key());
            field.update(seed)?;
        }
        let raw = self.raw_front_matter.clone().map(Value::String);
        self.source_field.update(raw.as_ref())
    }

    pub fn update_from_payload(&mut self, payload: &DocumentPayload) -> Result<(), FieldError> {
        if payload.locale.is_some() {
            self.locale = payload.locale.clone();
        }
        self.update(
            &payload.pod_path,
            payload.front_matter.clone(),
            payload.raw_front_matter.clone(),
            payload.serving_paths.clone(),
            &payload.default_locale,
        )
    }

    pub fn pod_path(&self) -> &str {
        &self.pod_path
    }

    pub fn front_matter(&self) -> &DeepObject {
        &self.front_matter
    }

    pub fn raw_front_matter(&self) -> Option<&str> {
        self.raw_front_matter.as_deref()
    }

    pub fn serving_paths(&self) -> &BTreeMap<String, String> {
        &self.serving_paths
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Path the document is served at in its default locale. `None` means
    /// there is nothing to preview.
    pub fn serving_path(&self) -> Option<&str> {
        self.serving_paths
            .get(&self.default_locale)
            .map(String::as_str)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn source_field(&self) -> &Field {
        &self.source_field
    }

    /// Top-level fields shown in `mode`.
    pub fn fields_for(&self, mode: EditMode) -> &[Field] {
        match mode {
            EditMode::Fields => &self.fields,
            EditMode::Source => std::slice::from_ref(&self.source_field),
        }
    }

    pub fn fields_for_mut(&mut self, mode: EditMode) -> &mut [Field] {
        match mode {
            EditMode::Fields => &mut self.fields,
            EditMode::Source => std::slice::from_mut(&mut self.source_field),
        }
    }

    pub fn field_at(&self, mode: EditMode, path: &[usize]) -> Option<&Field> {
        let (first, rest) = path.split_first()?;
        self.fields_for(mode).get(*first)?.descendant(rest)
    }

    pub fn field_at_mut(&mut self, mode: EditMode, path: &[usize]) -> Option<&mut Field> {
        let (first, rest) = path.split_first()?;
        self.fields_for_mut(mode).get_mut(*first)?.descendant_mut(rest)
    }

    /// Every field of `mode` in display order (parents before children).
    pub fn field_paths(&self, mode: EditMode) -> Vec<FieldPath> {
        fn walk(field: &Field, path: &mut FieldPath, out: &mut Vec<FieldPath>) {
            out.push(path.clone());
            for (index, child) in field.children().iter().enumerate() {
                path.push(index);
                walk(child, path, out);
                path.pop();
            }
        }

        let mut out = Vec::new();
        for (index, field) in self.fields_for(mode).iter().enumerate() {
            walk(field, &mut vec![index], &mut out);
        }
        out
    }

    pub fn is_clean(&self, mode: EditMode) -> bool {
        self.fields_for(mode).iter().all(Field::is_clean)
    }

    /// Front matter rebuilt from the structured fields' dotted keys.
    /// Partials lists still waiting for their catalog are left out.
    pub fn front_matter_value(&self) -> Value {
        expand(
            self.fields
                .iter()
                .filter(|field| !field.is_pending())
                .map(|field| (field.key(), field.value())),
        )
    }

    pub fn source_value(&self) -> String {
        self.source_field.text().unwrap_or_default().to_string()
    }

    /// Build partials that were waiting for the catalog.
    pub fn resolve_partials(&mut self, catalog: &Arc<PartialCatalog>) -> Result<bool, FieldError> {
        let mut changed = false;
        for field in &mut self.fields {
            changed |= field.resolve_partials(catalog)?;
        }
        Ok(changed)
    }
}
