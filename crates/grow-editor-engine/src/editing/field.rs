use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::editing::partials::{PartialContainer, PartialsList, partial_key};
use crate::models::{FieldMeta, PartialCatalog};

/// Key used by the raw front-matter field.
pub const SOURCE_KEY: &str = "raw_front_matter";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),
}

/// Tag for every field implementation.
///
/// Only the types that field meta may request parse through [`FromStr`];
/// `Source` and `Partial` fields are built by the document and by partial
/// lists respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    TextArea,
    Markdown,
    List,
    Partials,
    Partial,
    Source,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::TextArea => "textarea",
            FieldType::Markdown => "markdown",
            FieldType::List => "list",
            FieldType::Partials => "partials",
            FieldType::Partial => "partial",
            FieldType::Source => "source",
        }
    }

    /// Whether the field edits a single string.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::TextArea | FieldType::Markdown | FieldType::Source
        )
    }
}

impl FromStr for FieldType {
    type Err = FieldError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "text" => Ok(FieldType::Text),
            "textarea" => Ok(FieldType::TextArea),
            "markdown" => Ok(FieldType::Markdown),
            "list" => Ok(FieldType::List),
            "partials" => Ok(FieldType::Partials),
            other => Err(FieldError::UnknownFieldType(other.to_string())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a field instance, independent of its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(Uuid);

impl FieldId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether the user is currently editing a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    #[default]
    Idle,
    Focused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text(String),
    TextArea(String),
    Markdown(String),
    Source(String),
    List(Vec<Field>),
    Partials(PartialsList),
    Partial(PartialContainer),
}

/// One editable value bound to a front-matter key.
///
/// A field compares its live value against `clean_value`, the snapshot taken
/// the last time a value was applied from outside. While focused, outside
/// updates move only that snapshot and leave the live value alone.
#[derive(Debug, Clone)]
pub struct Field {
    id: FieldId,
    key: String,
    label: Option<String>,
    focus: FocusState,
    attached: bool,
    clean_value: Value,
    kind: FieldKind,
}

impl Field {
    fn with_kind(key: &str, kind: FieldKind) -> Self {
        Self {
            id: FieldId::new(),
            key: key.to_string(),
            label: None,
            focus: FocusState::Idle,
            attached: false,
            clean_value: Value::Null,
            kind,
        }
    }

    fn blank(field_type: FieldType, key: &str, catalog: Option<&Arc<PartialCatalog>>) -> Self {
        let kind = match field_type {
            FieldType::Text => FieldKind::Text(String::new()),
            FieldType::TextArea => FieldKind::TextArea(String::new()),
            FieldType::Markdown => FieldKind::Markdown(String::new()),
            FieldType::Source => FieldKind::Source(String::new()),
            FieldType::List => FieldKind::List(Vec::new()),
            FieldType::Partials => FieldKind::Partials(PartialsList::new(catalog.cloned())),
            FieldType::Partial => FieldKind::Partial(PartialContainer::opaque(
                Value::Null,
                catalog.cloned().unwrap_or_default(),
            )),
        };
        let mut field = Self::with_kind(key, kind);
        field.clean_value = field.value();
        field
    }

    /// Build the field a meta entry declares, seeded with `seed`.
    pub fn from_meta(
        meta: &FieldMeta,
        seed: Option<&Value>,
        catalog: Option<&Arc<PartialCatalog>>,
    ) -> Result<Self, FieldError> {
        let field_type: FieldType = meta.field_type.parse()?;
        let mut field = Self::blank(field_type, &meta.key, catalog);
        field.label = meta.label.clone();
        field.seed(seed)?;
        Ok(field)
    }

    /// The raw front-matter editor.
    pub fn source(raw_front_matter: Option<&str>) -> Self {
        let mut field = Self::blank(FieldType::Source, SOURCE_KEY, None);
        field.label = Some("Source".to_string());
        if let FieldKind::Source(text) = &mut field.kind {
            *text = raw_front_matter.unwrap_or_default().to_string();
        }
        field.clean_value = field.value();
        field
    }

    pub(crate) fn partial(item: &Value, catalog: &Arc<PartialCatalog>) -> Result<Self, FieldError> {
        let key = partial_key(item).unwrap_or_default().to_string();
        let container = PartialContainer::build(item, Arc::clone(catalog))?;
        let mut field = Self::with_kind(&key, FieldKind::Partial(container));
        field.label = Some(catalog.label(&key).to_string());
        field.clean_value = field.value();
        Ok(field)
    }

    fn list_item(key: &str, value: &Value) -> Self {
        let mut field = Self::with_kind(key, FieldKind::Text(text_of(Some(value))));
        field.clean_value = field.value();
        field
    }

    pub fn id(&self) -> FieldId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn field_type(&self) -> FieldType {
        match &self.kind {
            FieldKind::Text(_) => FieldType::Text,
            FieldKind::TextArea(_) => FieldType::TextArea,
            FieldKind::Markdown(_) => FieldType::Markdown,
            FieldKind::Source(_) => FieldType::Source,
            FieldKind::List(_) => FieldType::List,
            FieldKind::Partials(_) => FieldType::Partials,
            FieldKind::Partial(_) => FieldType::Partial,
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn value(&self) -> Value {
        match &self.kind {
            FieldKind::Text(text)
            | FieldKind::TextArea(text)
            | FieldKind::Markdown(text)
            | FieldKind::Source(text) => Value::String(text.clone()),
            FieldKind::List(items) => Value::Array(items.iter().map(Field::value).collect()),
            FieldKind::Partials(list) => list.value(),
            FieldKind::Partial(container) => container.value(),
        }
    }

    /// The snapshot `is_clean` compares against.
    pub fn clean_value(&self) -> &Value {
        &self.clean_value
    }

    /// Replace the live value. The clean snapshot is left alone.
    pub fn set_value(&mut self, value: Option<&Value>) -> Result<(), FieldError> {
        if let FieldKind::Partial(container) = &self.kind {
            let catalog = Arc::clone(container.catalog());
            let rebuilt = Self::partial(value.unwrap_or(&Value::Null), &catalog)?;
            self.key = rebuilt.key;
            self.label = rebuilt.label;
            self.kind = rebuilt.kind;
            self.setup_children();
            return Ok(());
        }

        match &mut self.kind {
            FieldKind::Text(text)
            | FieldKind::TextArea(text)
            | FieldKind::Markdown(text)
            | FieldKind::Source(text) => *text = text_of(value),
            FieldKind::List(items) => {
                *items = as_items(value)
                    .iter()
                    .map(|item| Self::list_item(&self.key, item))
                    .collect();
            }
            FieldKind::Partials(list) => list.set_items(as_items(value))?,
            FieldKind::Partial(_) => {}
        }
        self.setup_children();
        Ok(())
    }

    fn seed(&mut self, value: Option<&Value>) -> Result<(), FieldError> {
        self.set_value(value)?;
        self.clean_value = self.value();
        Ok(())
    }

    // The value this field would report after taking `value`, in the same
    // shape the live value has.
    fn project(&self, value: Option<&Value>) -> Result<Value, FieldError> {
        let mut candidate = self.clone();
        candidate.attached = false;
        candidate.set_value(value)?;
        Ok(candidate.value())
    }

    /// Apply a value that came from outside (a server response).
    ///
    /// Focused fields keep their live value and only move the clean
    /// snapshot. Containers re-seed their existing children in place when
    /// the shape still matches, so focus inside them survives.
    pub fn update(&mut self, value: Option<&Value>) -> Result<(), FieldError> {
        let baseline = self.project(value)?;
        let focused = self.is_focused();

        let reseed = match &mut self.kind {
            FieldKind::List(items) => {
                let incoming = as_items(value);
                if incoming.len() == items.len() {
                    for (child, item) in items.iter_mut().zip(&incoming) {
                        child.update(Some(item))?;
                    }
                    false
                } else {
                    !focused
                }
            }
            FieldKind::Partials(list) => {
                list.update_items(as_items(value), !focused)?;
                false
            }
            FieldKind::Partial(container) => {
                if value.and_then(partial_key) == Some(self.key.as_str()) {
                    container.update_item(value.unwrap_or(&Value::Null))?;
                    false
                } else {
                    !focused
                }
            }
            _ => !focused,
        };

        if reseed {
            self.set_value(value)?;
        }
        self.setup_children();
        self.clean_value = baseline;
        Ok(())
    }

    pub fn is_focused(&self) -> bool {
        self.focus == FocusState::Focused || self.children().iter().any(Field::is_focused)
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus
    }

    pub fn focus(&mut self) {
        self.focus = FocusState::Focused;
    }

    pub fn blur(&mut self) {
        self.focus = FocusState::Idle;
    }

    /// Whether this is a partials list still waiting for its catalog.
    pub fn is_pending(&self) -> bool {
        matches!(&self.kind, FieldKind::Partials(list) if list.is_pending())
    }

    /// A partials list still waiting for its catalog reports clean, so idle
    /// autosaves never submit its empty placeholder.
    pub fn is_clean(&self) -> bool {
        self.is_pending() || self.value() == self.clean_value
    }

    /// Mark the field (and its children) attached to the presentation.
    /// Returns false when it already was.
    pub fn setup(&mut self) -> bool {
        if self.attached {
            return false;
        }
        self.attached = true;
        for child in self.children_mut() {
            child.setup();
        }
        true
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    fn setup_children(&mut self) {
        if self.attached {
            for child in self.children_mut() {
                child.setup();
            }
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Text(text)
            | FieldKind::TextArea(text)
            | FieldKind::Markdown(text)
            | FieldKind::Source(text) => Some(text),
            _ => None,
        }
    }

    /// Replace the text of a string field. Returns false for containers.
    pub fn set_text(&mut self, value: &str) -> bool {
        match &mut self.kind {
            FieldKind::Text(text)
            | FieldKind::TextArea(text)
            | FieldKind::Markdown(text)
            | FieldKind::Source(text) => {
                *text = value.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn children(&self) -> &[Field] {
        match &self.kind {
            FieldKind::List(items) => items,
            FieldKind::Partials(list) => list.items(),
            FieldKind::Partial(container) => container.fields(),
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [Field] {
        match &mut self.kind {
            FieldKind::List(items) => items,
            FieldKind::Partials(list) => list.items_mut(),
            FieldKind::Partial(container) => container.fields_mut(),
            _ => &mut [],
        }
    }

    pub fn descendant(&self, path: &[usize]) -> Option<&Field> {
        path.iter()
            .try_fold(self, |field, &index| field.children().get(index))
    }

    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Field> {
        let mut current = self;
        for &index in path {
            current = current.children_mut().get_mut(index)?;
        }
        Some(current)
    }

    /// Append an item to a list field. Returns its index.
    pub fn push_item(&mut self, text: &str) -> Option<usize> {
        let FieldKind::List(items) = &mut self.kind else {
            return None;
        };
        let mut item = Self::list_item(&self.key, &Value::String(text.to_string()));
        if self.attached {
            item.setup();
        }
        items.push(item);
        Some(items.len() - 1)
    }

    /// Remove a child of a list or partials field.
    pub fn remove_item(&mut self, index: usize) -> Option<Field> {
        match &mut self.kind {
            FieldKind::List(items) if index < items.len() => Some(items.remove(index)),
            FieldKind::Partials(list) => list.remove(index),
            _ => None,
        }
    }

    /// Reorder a partial within its list. Moving the first item up or the
    /// last item down does nothing and returns false.
    pub fn move_item(&mut self, index: usize, direction: MoveDirection) -> bool {
        match &mut self.kind {
            FieldKind::Partials(list) => match direction {
                MoveDirection::Up => list.move_up(index),
                MoveDirection::Down => list.move_down(index),
            },
            _ => false,
        }
    }

    /// Append a new, empty instance of the partial `key`. Returns its index,
    /// or `None` when this is not a partials field or the key is unknown.
    pub fn add_partial(&mut self, key: &str) -> Result<Option<usize>, FieldError> {
        let FieldKind::Partials(list) = &mut self.kind else {
            return Ok(None);
        };
        let added = list.add(key)?;
        self.setup_children();
        Ok(added)
    }

    /// Build any partials waiting for the catalog. Returns whether anything
    /// was built.
    pub fn resolve_partials(&mut self, catalog: &Arc<PartialCatalog>) -> Result<bool, FieldError> {
        let was_clean = self.is_clean();
        let changed = if let FieldKind::Partials(list) = &mut self.kind {
            list.resolve(Arc::clone(catalog))?
        } else {
            let mut changed = false;
            for child in self.children_mut() {
                changed |= child.resolve_partials(catalog)?;
            }
            changed
        };

        if changed {
            self.setup_children();
            if was_clean && !self.is_focused() {
                self.clean_value = self.value();
            }
        }
        Ok(changed)
    }
}

/// Render a seed value as text: missing and null become empty, strings are
/// taken as-is, anything else uses its JSON form.
pub(crate) fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Read a seed value as a sequence. A lone value is a one-item sequence.
pub(crate) fn as_items(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn text_field(seed: &str) -> Field {
        Field::from_meta(
            &FieldMeta::new("text", "$title", Some("Title")),
            Some(&json!(seed)),
            None,
        )
        .unwrap()
    }

    fn list_field(seed: Value) -> Field {
        Field::from_meta(&FieldMeta::new("list", "tags", None), Some(&seed), None).unwrap()
    }

    #[rstest]
    #[case("text", FieldType::Text)]
    #[case("textarea", FieldType::TextArea)]
    #[case("markdown", FieldType::Markdown)]
    #[case("list", FieldType::List)]
    #[case("partials", FieldType::Partials)]
    fn test_registered_types_parse(#[case] name: &str, #[case] expected: FieldType) {
        assert_eq!(name.parse::<FieldType>(), Ok(expected));
        assert_eq!(expected.as_str(), name);
    }

    #[rstest]
    #[case("checkbox")]
    #[case("source")]
    #[case("partial")]
    #[case("Text")]
    fn test_unregistered_type_is_rejected(#[case] name: &str) {
        let meta = FieldMeta::new(name, "x", None);
        let err = Field::from_meta(&meta, None, None).unwrap_err();
        assert_eq!(err, FieldError::UnknownFieldType(name.to_string()));
    }

    #[test]
    fn test_seeded_field_is_clean() {
        let field = text_field("Blinkk");

        assert_eq!(field.value(), json!("Blinkk"));
        assert_eq!(field.label(), Some("Title"));
        assert_eq!(field.field_type(), FieldType::Text);
        assert!(field.is_clean());
    }

    #[rstest]
    #[case(None, "")]
    #[case(Some(json!(null)), "")]
    #[case(Some(json!(42)), "42")]
    #[case(Some(json!(true)), "true")]
    fn test_scalar_seed_normalization(#[case] seed: Option<Value>, #[case] expected: &str) {
        let field =
            Field::from_meta(&FieldMeta::new("textarea", "k", None), seed.as_ref(), None).unwrap();

        assert_eq!(field.text(), Some(expected));
        assert!(field.is_clean());
    }

    #[test]
    fn test_local_edit_makes_field_dirty() {
        let mut field = text_field("Blinkk");
        assert!(field.set_text("Blinkk Team"));

        assert!(!field.is_clean());
        assert_eq!(field.clean_value(), &json!("Blinkk"));
    }

    #[test]
    fn test_update_while_focused_keeps_draft() {
        let mut field = text_field("original");
        field.focus();
        field.set_text("draft");

        field.update(Some(&json!("server-value"))).unwrap();

        assert_eq!(field.value(), json!("draft"));
        assert!(!field.is_clean());

        field.blur();
        assert_eq!(field.clean_value(), &json!("server-value"));
        assert!(!field.is_clean());

        field.set_text("server-value");
        assert!(field.is_clean());
    }

    #[test]
    fn test_update_while_idle_overwrites() {
        let mut field = text_field("original");
        field.set_text("unsaved");

        field.update(Some(&json!("server-value"))).unwrap();

        assert_eq!(field.value(), json!("server-value"));
        assert!(field.is_clean());
    }

    #[test]
    fn test_list_value_keeps_order() {
        let mut field = list_field(json!(["a", "b", "c"]));
        assert_eq!(field.value(), json!(["a", "b", "c"]));

        let removed = field.remove_item(1).unwrap();
        assert_eq!(removed.value(), json!("b"));
        assert_eq!(field.value(), json!(["a", "c"]));
        assert!(!field.is_clean());
    }

    #[test]
    fn test_list_push_and_out_of_range_remove() {
        let mut field = list_field(json!(["a"]));

        assert_eq!(field.push_item("z"), Some(1));
        assert!(field.remove_item(5).is_none());
        assert_eq!(field.value(), json!(["a", "z"]));
    }

    #[test]
    fn test_list_update_keeps_focused_child_draft() {
        let mut field = list_field(json!(["a", "b"]));
        let child = field.descendant_mut(&[1]).unwrap();
        child.focus();
        child.set_text("b-draft");
        let child_id = child.id();

        field.update(Some(&json!(["A", "B"]))).unwrap();

        assert_eq!(field.value(), json!(["A", "b-draft"]));
        assert_eq!(field.clean_value(), &json!(["A", "B"]));
        assert_eq!(field.children()[1].id(), child_id);
        assert!(field.is_focused());
        assert!(!field.is_clean());
    }

    #[test]
    fn test_list_update_with_new_length_rebuilds_when_idle() {
        let mut field = list_field(json!(["a", "b"]));

        field.update(Some(&json!(["x"]))).unwrap();

        assert_eq!(field.value(), json!(["x"]));
        assert!(field.is_clean());
    }

    #[test]
    fn test_setup_is_idempotent_and_reaches_children() {
        let mut field = list_field(json!(["a"]));

        assert!(field.setup());
        assert!(!field.setup());
        assert!(field.children()[0].is_attached());

        field.push_item("b");
        assert!(field.children()[1].is_attached());
    }

    #[test]
    fn test_source_field() {
        let field = Field::source(Some("$path: /"));

        assert_eq!(field.key(), SOURCE_KEY);
        assert_eq!(field.field_type(), FieldType::Source);
        assert_eq!(field.value(), json!("$path: /"));
        assert!(field.is_clean());
    }

    #[test]
    fn test_containers_reject_text_edits() {
        let mut field = list_field(json!([]));

        assert!(!field.set_text("nope"));
        assert_eq!(field.text(), None);
        assert!(!field.move_item(0, MoveDirection::Up));
    }
}
