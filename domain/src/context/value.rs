//! Context value model.
//!
//! A [`Context`] is the structured snapshot of task/environment state taken
//! when a tool is invoked. Values are a closed recursive variant
//! ([`ContextValue`]) so that nested fields can be flattened into dotted
//! `(factor, value)` pairs for correlation mining and filtering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single context value: scalar, list or nested map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ContextValue>),
    Map(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            ContextValue::Bool(_) | ContextValue::Number(_) | ContextValue::String(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ContextValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            ContextValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Stable textual key for bucketing.
    ///
    /// Integral numbers render without a fractional part so `3` and `3.0`
    /// land in the same bucket.
    pub fn to_key(&self) -> String {
        match self {
            ContextValue::Null => "null".to_string(),
            ContextValue::Bool(b) => b.to_string(),
            ContextValue::Number(n) => format_number(*n),
            ContextValue::String(s) => s.clone(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl std::fmt::Display for ContextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::String(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::String(s)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        ContextValue::Number(n)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        ContextValue::Number(n as f64)
    }
}

impl From<i32> for ContextValue {
    fn from(n: i32) -> Self {
        ContextValue::Number(f64::from(n))
    }
}

impl From<Vec<ContextValue>> for ContextValue {
    fn from(items: Vec<ContextValue>) -> Self {
        ContextValue::List(items)
    }
}

impl From<Context> for ContextValue {
    fn from(context: Context) -> Self {
        ContextValue::Map(context.0)
    }
}

impl From<serde_json::Value> for ContextValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ContextValue::Null,
            serde_json::Value::Bool(b) => ContextValue::Bool(b),
            serde_json::Value::Number(n) => ContextValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => ContextValue::String(s),
            serde_json::Value::Array(items) => {
                ContextValue::List(items.into_iter().map(ContextValue::from).collect())
            }
            serde_json::Value::Object(map) => ContextValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ContextValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A context snapshot: string keys mapped to (possibly nested) values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(BTreeMap<String, ContextValue>);

impl Context {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    /// Resolve a dotted path (`task.type`) through nested maps.
    ///
    /// A literal key containing dots takes precedence over traversal.
    pub fn get_path(&self, path: &str) -> Option<&ContextValue> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.get(segment)?;
        }
        Some(current)
    }

    pub fn entries(&self) -> &BTreeMap<String, ContextValue> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten into dotted-path scalar pairs.
    ///
    /// Nested maps extend the path (`user.role`); list elements are
    /// flattened under the list's own path, so `tags: ["a", "b"]` yields
    /// `(tags, a)` and `(tags, b)`. Nulls are skipped.
    pub fn flatten(&self) -> Vec<(String, ContextValue)> {
        let mut out = Vec::new();
        for (key, value) in &self.0 {
            flatten_into(key, value, &mut out);
        }
        out
    }

    /// Whether every flattened pair of `filter` also appears in this context.
    pub fn matches(&self, filter: &Context) -> bool {
        let own = self.flatten();
        filter
            .flatten()
            .iter()
            .all(|wanted| own.iter().any(|have| have == wanted))
    }

    /// Build a context from a JSON object; other JSON shapes yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match ContextValue::from(value.clone()) {
            ContextValue::Map(map) => Some(Self(map)),
            _ => None,
        }
    }
}

fn flatten_into(path: &str, value: &ContextValue, out: &mut Vec<(String, ContextValue)>) {
    match value {
        ContextValue::Null => {}
        ContextValue::Map(map) => {
            for (key, nested) in map {
                flatten_into(&format!("{}.{}", path, key), nested, out);
            }
        }
        ContextValue::List(items) => {
            for item in items {
                flatten_into(path, item, out);
            }
        }
        scalar => out.push((path.to_string(), scalar.clone())),
    }
}

impl FromIterator<(String, ContextValue)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, ContextValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, ContextValue>> for Context {
    fn from(map: BTreeMap<String, ContextValue>) -> Self {
        Self(map)
    }
}
