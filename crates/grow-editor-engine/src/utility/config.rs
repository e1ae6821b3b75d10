use serde_json::{Map, Value};

/// Immutable option bag built from declared defaults merged with overrides.
///
/// Lookups never fail: a missing key (or a value of the wrong type for the
/// typed helpers) falls back to the caller's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    values: Map<String, Value>,
}

impl Config {
    /// Build a config holding only the given overrides.
    pub fn new(overrides: Map<String, Value>) -> Self {
        Self { values: overrides }
    }

    /// Merge `overrides` on top of `defaults`; overrides win key by key.
    pub fn with_defaults(defaults: Map<String, Value>, overrides: Map<String, Value>) -> Self {
        let mut values = defaults;
        values.extend(overrides);
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.values.get(key).unwrap_or(default)
    }

    pub fn get_str<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.values
            .get(key)
            .and_then(Value::as_u64)
            .unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }
}

impl From<Map<String, Value>> for Config {
    fn from(values: Map<String, Value>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let config = Config::with_defaults(
            map(json!({"base": "/_grow/editor", "port": 8080})),
            map(json!({"port": 9090})),
        );

        assert_eq!(config.get_str("base", ""), "/_grow/editor");
        assert_eq!(config.get_u64("port", 0), 9090);
    }

    #[test]
    fn test_missing_key_returns_default() {
        let config = Config::default();

        assert_eq!(config.get("anything"), None);
        assert_eq!(config.get_str("base", "/fallback"), "/fallback");
        assert_eq!(config.get_u64("autosave_interval", 1000), 1000);
        assert!(config.get_bool("autosave", true));
        assert_eq!(config.get_or("x", &json!(3)), &json!(3));
    }

    #[test]
    fn test_type_mismatch_returns_default() {
        let config = Config::new(map(json!({"port": "not-a-number"})));

        assert_eq!(config.get_u64("port", 8080), 8080);
        assert_eq!(config.get_str("port", "?"), "not-a-number");
    }
}
