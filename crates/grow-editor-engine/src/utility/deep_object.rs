//! Dotted-path access over nested front matter.
//!
//! Front matter arrives as nested mappings, while field meta addresses values
//! with flat dotted keys (`meta.description`). [`DeepObject`] reads through
//! those keys; [`flatten`] and [`expand`] convert between the two shapes.

use serde_json::{Map, Value};

/// Read-only dotted-path view over a nested JSON value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepObject {
    value: Value,
}

impl DeepObject {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Walk `path` segment by segment. Objects are indexed by key, arrays by
    /// numeric segment. Any missing segment yields `None`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for DeepObject {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// Flatten a nested mapping into dotted keys.
///
/// Arrays and scalars are leaves. Empty objects are kept as leaves so that
/// [`expand`] can restore them. A non-object root flattens to nothing.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut flat = Map::new();
    if let Value::Object(map) = value {
        flatten_into(&mut flat, None, map);
    }
    flat
}

fn flatten_into(flat: &mut Map<String, Value>, prefix: Option<&str>, map: &Map<String, Value>) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(flat, Some(&path), child),
            _ => {
                flat.insert(path, value.clone());
            }
        }
    }
}

/// Expand dotted keys into a nested mapping, merging siblings that share a
/// prefix: `{"a.b": 1, "a.c": 2}` becomes `{"a": {"b": 1, "c": 2}}`.
///
/// Later entries win on conflict. Writing a nested key through a scalar
/// replaces the scalar with a mapping.
pub fn expand<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    expand_into(Map::new(), entries)
}

/// Like [`expand`], but writes over an existing mapping. Keys of `base` not
/// named by any entry are kept.
pub fn expand_into<I, K>(base: Map<String, Value>, entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    let mut root = base;
    for (key, value) in entries {
        insert_path(&mut root, key.as_ref(), value);
    }
    Value::Object(root)
}

fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        Some((head, rest)) => {
            let slot = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_path(child, rest, value);
            }
        }
        None => {
            if let Value::Object(incoming) = value {
                if let Some(Value::Object(existing)) = target.get_mut(path) {
                    for (key, value) in incoming {
                        insert_path(existing, &key, value);
                    }
                    return;
                }
                target.insert(path.to_string(), Value::Object(incoming));
            } else {
                target.insert(path.to_string(), value);
            }
        }
    }
}
