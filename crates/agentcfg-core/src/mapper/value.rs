//! Typed values and the dot-path addressed tree produced by the mapper

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid regex"));
static FLOAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d*\.\d+$").expect("valid regex"));

/// A coerced environment value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MappedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Structured(serde_json::Value),
}

impl MappedValue {
    /// Heuristic coercion of a raw string.
    ///
    /// `true`/`false` become booleans, digit strings become numbers, `{...}`/`[...]`
    /// that parse as JSON become structured values, everything else stays text.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            return MappedValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return MappedValue::Bool(false);
        }
        if INTEGER.is_match(trimmed) {
            if let Ok(n) = trimmed.parse::<i64>() {
                return MappedValue::Int(n);
            }
        }
        if FLOAT.is_match(trimmed) {
            if let Ok(n) = trimmed.parse::<f64>() {
                return MappedValue::Float(n);
            }
        }
        let bracketed = (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.starts_with('[') && trimmed.ends_with(']'));
        if bracketed {
            if let Ok(value) = serde_json::from_str(trimmed) {
                return MappedValue::Structured(value);
            }
        }
        MappedValue::Text(raw.to_string())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MappedValue::Bool(_) => "boolean",
            MappedValue::Int(_) => "integer",
            MappedValue::Float(_) => "number",
            MappedValue::Text(_) => "string",
            MappedValue::Structured(_) => "json",
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            MappedValue::Bool(b) => serde_json::Value::Bool(*b),
            MappedValue::Int(n) => serde_json::Value::from(*n),
            MappedValue::Float(n) => serde_json::Value::from(*n),
            MappedValue::Text(s) => serde_json::Value::String(s.clone()),
            MappedValue::Structured(v) => v.clone(),
        }
    }
}

impl fmt::Display for MappedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappedValue::Bool(b) => write!(f, "{}", b),
            MappedValue::Int(n) => write!(f, "{}", n),
            MappedValue::Float(n) => write!(f, "{}", n),
            MappedValue::Text(s) => f.write_str(s),
            MappedValue::Structured(v) => write!(f, "{}", v),
        }
    }
}

/// Expected shape of a mapped variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Kept verbatim, even when it looks numeric
    Text,
    Bool,
    Integer,
    Number,
    Json,
}

impl ValueKind {
    pub fn describe(&self) -> &'static str {
        match self {
            ValueKind::Text => "string",
            ValueKind::Bool => "boolean",
            ValueKind::Integer => "non-negative integer",
            ValueKind::Number => "number",
            ValueKind::Json => "JSON object or array",
        }
    }

    /// Coerce `raw` and check the result against this kind
    pub fn accept(&self, raw: &str) -> Option<MappedValue> {
        if *self == ValueKind::Text {
            return Some(MappedValue::Text(raw.trim().to_string()));
        }
        let value = MappedValue::coerce(raw);
        let ok = match (self, &value) {
            (ValueKind::Bool, MappedValue::Bool(_)) => true,
            (ValueKind::Integer, MappedValue::Int(n)) => *n >= 0,
            (ValueKind::Number, MappedValue::Int(_) | MappedValue::Float(_)) => true,
            (ValueKind::Json, MappedValue::Structured(_)) => true,
            _ => false,
        };
        ok.then_some(value)
    }
}

const SECRET_PREFIX: &str = "secrets.";

/// Flat dot-path map with typed values
///
/// Ordered so two mappings of the same environment compare and serialize identically.
#[derive(Clone, Default, PartialEq)]
pub struct MappedConfig {
    values: BTreeMap<String, MappedValue>,
}

impl MappedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: MappedValue) {
        self.values.insert(path.into(), value);
    }

    pub fn get(&self, path: &str) -> Option<&MappedValue> {
        self.values.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.values.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        match self.get(path)? {
            MappedValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        match self.get(path)? {
            MappedValue::Int(n) => Some(*n as f64),
            MappedValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn get_u32(&self, path: &str) -> Option<u32> {
        match self.get(path)? {
            MappedValue::Int(n) => u32::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        match self.get(path)? {
            MappedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_json(&self, path: &str) -> Option<&serde_json::Value> {
        match self.get(path)? {
            MappedValue::Structured(v) => Some(v),
            _ => None,
        }
    }

    /// Secret values under `secrets.*`, keyed by their lowercase name
    pub fn secrets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().filter_map(|(path, value)| {
            let name = path.strip_prefix(SECRET_PREFIX)?;
            match value {
                MappedValue::Text(s) => Some((name, s.as_str())),
                _ => None,
            }
        })
    }

    /// Nested JSON view of the tree
    pub fn to_tree(&self) -> serde_json::Value {
        self.build_tree(false)
    }

    /// Nested JSON view with every `secrets.*` value replaced by `***`
    pub fn to_tree_redacted(&self) -> serde_json::Value {
        self.build_tree(true)
    }

    fn build_tree(&self, redact: bool) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for (path, value) in &self.values {
            let leaf = if redact && path.starts_with(SECRET_PREFIX) {
                serde_json::Value::String("***".to_string())
            } else {
                value.to_json()
            };
            insert_path(&mut root, path, leaf);
        }
        serde_json::Value::Object(root)
    }
}

fn insert_path(root: &mut serde_json::Map<String, serde_json::Value>, path: &str, leaf: serde_json::Value) {
    let mut segments = path.split('.').peekable();
    let mut node = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            node.insert(segment.to_string(), leaf);
            return;
        }
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if !child.is_object() {
            *child = serde_json::Value::Object(serde_json::Map::new());
        }
        node = match child {
            serde_json::Value::Object(map) => map,
            _ => return,
        };
    }
}

impl fmt::Debug for MappedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedConfig")
            .field("tree", &self.to_tree_redacted())
            .finish()
    }
}
