//! The tagged configuration value model and the merge algorithm.
//!
//! Configuration layers are trees of [`ConfigValue`]. Only mapping nodes
//! merge; everything else - scalars, lists, and opaque leaves (functions,
//! schemas, stages) - replaces wholesale when a later layer supplies the
//! same key. Lists are never concatenated or element-merged. An explicit
//! `Null` is the "absent" marker: it overwrites an earlier value, which is
//! different from simply omitting the key.
//!
//! [`resolve`] folds layers left to right, lowest precedence first. It is
//! pure (inputs are untouched), never fails, and satisfies
//! `resolve([a, b, c]) == resolve([resolve([a, b]), c])`.

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A non-composite configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// The explicit "absent" marker. Overwrites on merge.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
}

/// An opaque leaf: a function, schema, stage, or any other value the merge
/// must treat as indivisible. Compared by identity; always replaces.
#[derive(Clone)]
pub struct OpaqueValue {
    label: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    /// Wraps a value under a diagnostic label.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(label: &'static str, value: T) -> Self {
        Self {
            label,
            value: Arc::new(value),
        }
    }

    /// The diagnostic label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.label
    }

    /// Recovers the wrapped value, when it has the expected type.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<opaque:{}>", self.label)
    }
}

impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

/// A node in a configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    /// A scalar leaf.
    Scalar(Scalar),
    /// An ordered list. Replaces wholesale on merge.
    List(Vec<ConfigValue>),
    /// A mapping node. Merges key-wise.
    Map(IndexMap<String, ConfigValue>),
    /// An opaque leaf. Replaces wholesale on merge.
    Opaque(OpaqueValue),
}

impl ConfigValue {
    /// The explicit "absent" marker.
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// An empty mapping node.
    #[must_use]
    pub fn map() -> Self {
        Self::Map(IndexMap::new())
    }

    /// Wraps a value as an opaque leaf.
    #[must_use]
    pub fn opaque<T: Send + Sync + 'static>(label: &'static str, value: T) -> Self {
        Self::Opaque(OpaqueValue::new(label, value))
    }

    /// Whether this node is the explicit "absent" marker.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Converts a JSON value into a configuration tree.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::null(),
            serde_json::Value::Bool(flag) => Self::Scalar(Scalar::Bool(*flag)),
            serde_json::Value::Number(number) => number.as_i64().map_or_else(
                || Self::Scalar(Scalar::Float(number.as_f64().unwrap_or(f64::NAN))),
                |int| Self::Scalar(Scalar::Int(int)),
            ),
            serde_json::Value::String(text) => Self::Scalar(Scalar::Str(text.clone())),
            serde_json::Value::Array(items) => {
                Self::List(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(members) => Self::Map(
                members
                    .iter()
                    .map(|(key, member)| (key.clone(), Self::from_json(member)))
                    .collect(),
            ),
        }
    }

    /// Converts this tree back into JSON. Returns `None` when the tree
    /// contains an opaque leaf, which has no JSON representation.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::Scalar(Scalar::Null) => Some(serde_json::Value::Null),
            Self::Scalar(Scalar::Bool(flag)) => Some(serde_json::Value::Bool(*flag)),
            Self::Scalar(Scalar::Int(int)) => Some(serde_json::Value::from(*int)),
            Self::Scalar(Scalar::Float(float)) => serde_json::Number::from_f64(*float)
                .map(serde_json::Value::Number),
            Self::Scalar(Scalar::Str(text)) => Some(serde_json::Value::from(text.clone())),
            Self::List(items) => items
                .iter()
                .map(Self::to_json)
                .collect::<Option<Vec<_>>>()
                .map(serde_json::Value::Array),
            Self::Map(members) => members
                .iter()
                .map(|(key, member)| member.to_json().map(|json| (key.clone(), json)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(serde_json::Value::Object),
            Self::Opaque(_) => None,
        }
    }

    /// Looks up a direct child of a mapping node.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Map(members) => members.get(key),
            _ => None,
        }
    }

    /// Walks a path of mapping keys.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// The boolean value, when this is a boolean scalar.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(Scalar::Bool(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// The string value, when this is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(Scalar::Str(text)) => Some(text),
            _ => None,
        }
    }

    /// The opaque leaf, when this is one.
    #[must_use]
    pub fn as_opaque(&self) -> Option<&OpaqueValue> {
        match self {
            Self::Opaque(opaque) => Some(opaque),
            _ => None,
        }
    }
}

/// Merges two nodes: mapping nodes merge key-wise with the overlay winning
/// per key, anything else is replaced by the overlay.
#[must_use]
pub fn merge(base: &ConfigValue, overlay: &ConfigValue) -> ConfigValue {
    match (base, overlay) {
        (ConfigValue::Map(lower), ConfigValue::Map(upper)) => {
            let mut merged = lower.clone();
            for (key, value) in upper {
                let entry = match merged.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), entry);
            }
            ConfigValue::Map(merged)
        }
        (_, replacement) => replacement.clone(),
    }
}

/// Folds layers into one effective tree, lowest precedence first.
#[must_use]
pub fn resolve<I>(layers: I) -> ConfigValue
where
    I: IntoIterator<Item = ConfigValue>,
{
    layers
        .into_iter()
        .fold(ConfigValue::map(), |resolved, layer| merge(&resolved, &layer))
}
