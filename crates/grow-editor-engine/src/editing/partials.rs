//! Partial-backed fields.
//!
//! A partials field holds an ordered list of [`PartialContainer`]s, one per
//! front-matter item. Each item names its partial through the `partial`
//! discriminator; the matching catalog entry supplies the container's field
//! meta. Until the catalog arrives the raw items wait in the list and the
//! list reports an empty value.

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::editing::field::{Field, FieldError};
use crate::models::PartialCatalog;
use crate::utility::{DeepObject, deep_object};

/// Front-matter key naming an item's partial.
pub const PARTIAL_KEY: &str = "partial";

pub(crate) fn partial_key(item: &Value) -> Option<&str> {
    item.get(PARTIAL_KEY).and_then(Value::as_str)
}

#[derive(Debug, Clone, Default)]
pub struct PartialsList {
    catalog: Option<Arc<PartialCatalog>>,
    pending: Option<Vec<Value>>,
    items: Vec<Field>,
}

impl PartialsList {
    pub(crate) fn new(catalog: Option<Arc<PartialCatalog>>) -> Self {
        Self {
            catalog,
            pending: None,
            items: Vec::new(),
        }
    }

    /// True while raw items are waiting for the catalog.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn catalog(&self) -> Option<&Arc<PartialCatalog>> {
        self.catalog.as_ref()
    }

    pub fn items(&self) -> &[Field] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [Field] {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn value(&self) -> Value {
        Value::Array(self.items.iter().map(Field::value).collect())
    }

    pub(crate) fn set_items(&mut self, raw: Vec<Value>) -> Result<(), FieldError> {
        match &self.catalog {
            Some(catalog) => {
                self.items = raw
                    .iter()
                    .map(|item| Field::partial(item, catalog))
                    .collect::<Result<_, _>>()?;
                self.pending = None;
            }
            None => {
                self.items.clear();
                self.pending = Some(raw);
            }
        }
        Ok(())
    }

    pub(crate) fn resolve(&mut self, catalog: Arc<PartialCatalog>) -> Result<bool, FieldError> {
        self.catalog = Some(catalog);
        match self.pending.take() {
            Some(raw) => {
                self.set_items(raw)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-seed existing containers in place when every item still names the
    /// same partial at the same position; otherwise rebuild if allowed.
    pub(crate) fn update_items(&mut self, raw: Vec<Value>, rebuild: bool) -> Result<(), FieldError> {
        if self.catalog.is_none() {
            self.pending = Some(raw);
            return Ok(());
        }

        let same_shape = raw.len() == self.items.len()
            && raw
                .iter()
                .zip(&self.items)
                .all(|(item, field)| partial_key(item).unwrap_or_default() == field.key());

        if same_shape {
            for (field, item) in self.items.iter_mut().zip(&raw) {
                field.update(Some(item))?;
            }
        } else if rebuild {
            self.set_items(raw)?;
        }
        Ok(())
    }

    pub(crate) fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.items.swap(index - 1, index);
        true
    }

    pub(crate) fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.items.len() {
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Field> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub(crate) fn add(&mut self, key: &str) -> Result<Option<usize>, FieldError> {
        let Some(catalog) = &self.catalog else {
            return Ok(None);
        };
        if catalog.get(key).is_none() {
            log::warn!("Cannot add unknown partial '{key}'");
            return Ok(None);
        }
        let mut item = Map::new();
        item.insert(PARTIAL_KEY.to_string(), Value::String(key.to_string()));
        let field = Field::partial(&Value::Object(item), catalog)?;
        self.items.push(field);
        Ok(Some(self.items.len() - 1))
    }
}

/// One partial instance: its own fields, seeded from its own front-matter
/// slice.
///
/// The container's value is the original item overlaid with the field
/// values, so keys the partial does not declare pass through a save
/// untouched. Items naming a partial missing from the catalog get no fields
/// and pass through whole.
#[derive(Debug, Clone)]
pub struct PartialContainer {
    raw: Value,
    fields: Vec<Field>,
    known: bool,
    catalog: Arc<PartialCatalog>,
}

impl PartialContainer {
    pub(crate) fn opaque(raw: Value, catalog: Arc<PartialCatalog>) -> Self {
        Self {
            raw,
            fields: Vec::new(),
            known: false,
            catalog,
        }
    }

    pub(crate) fn build(item: &Value, catalog: Arc<PartialCatalog>) -> Result<Self, FieldError> {
        let Some(definition) = partial_key(item).and_then(|key| catalog.get(key)) else {
            log::warn!(
                "Partial '{}' is not in the catalog, passing it through",
                partial_key(item).unwrap_or_default()
            );
            return Ok(Self::opaque(item.clone(), catalog));
        };

        let front_matter = DeepObject::new(item.clone());
        let fields = definition
            .field_meta()
            .iter()
            .map(|meta| Field::from_meta(meta, front_matter.get(&meta.key), Some(&catalog)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: item.clone(),
            fields,
            known: true,
            catalog,
        })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    /// Whether the catalog knew this item's partial.
    pub fn is_known(&self) -> bool {
        self.known
    }

    pub(crate) fn catalog(&self) -> &Arc<PartialCatalog> {
        &self.catalog
    }

    pub fn value(&self) -> Value {
        match &self.raw {
            Value::Object(base) if self.known => deep_object::expand_into(
                base.clone(),
                self.fields.iter().map(|field| (field.key(), field.value())),
            ),
            other => other.clone(),
        }
    }

    pub(crate) fn update_item(&mut self, item: &Value) -> Result<(), FieldError> {
        self.raw = item.clone();
        let front_matter = DeepObject::new(item.clone());
        for field in &mut self.fields {
            let seed = front_matter.get(field.key()).cloned();
            field.update(seed.as_ref())?;
        }
        Ok(())
    }
}
