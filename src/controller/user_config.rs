//! # User Configuration Flattening
//!
//! Converts sparse, strongly typed user configuration structures into the
//! present-fields-only JSON maps the provider API accepts.
//!
//! Every configuration type declares its fields explicitly through
//! [`UserConfig::fields`]: the wire name, whether a value is present, and for
//! nested structures a reference to the nested configuration. [`flatten`] walks
//! that table recursively and prunes anything that carries no information.
//!
//! "Unset" and "set to the zero value" stay distinct: `Some(false)` and
//! `Some(0)` are transmitted, `None` is not.

use serde_json::{Map, Value};

/// Value of one declared configuration field
#[derive(Debug)]
pub enum FieldValue<'a> {
    /// The field is not set and is omitted from the payload
    Unset,
    /// A present scalar or list value
    Scalar(Value),
    /// A present nested configuration, flattened recursively
    Nested(&'a dyn UserConfig),
}

/// One row of a configuration type's field table
#[derive(Debug)]
pub struct Field<'a> {
    /// Name of the field on the wire
    pub name: &'static str,
    pub value: FieldValue<'a>,
}

impl<'a> Field<'a> {
    /// An optional scalar (or list of scalars)
    pub fn optional<T>(name: &'static str, value: &Option<T>) -> Self
    where
        T: Clone + Into<Value>,
    {
        let value = match value {
            Some(v) => FieldValue::Scalar(v.clone().into()),
            None => FieldValue::Unset,
        };
        Self { name, value }
    }

    /// An optional nested configuration structure
    pub fn nested<C>(name: &'static str, value: &'a Option<C>) -> Self
    where
        C: UserConfig,
    {
        let value = match value {
            Some(c) => FieldValue::Nested(c),
            None => FieldValue::Unset,
        };
        Self { name, value }
    }
}

/// A configuration structure with an explicit field table
pub trait UserConfig: std::fmt::Debug {
    /// Declared fields, in wire order
    fn fields(&self) -> Vec<Field<'_>>;
}

/// Flatten a configuration structure into a pruned JSON map
///
/// Unset fields are dropped, nested structures are flattened recursively, and
/// any key whose value ends up null, an empty string, an empty list, or an
/// empty map is removed.
pub fn flatten(config: &dyn UserConfig) -> Map<String, Value> {
    config
        .fields()
        .into_iter()
        .filter_map(|field| {
            let value = match field.value {
                FieldValue::Unset => return None,
                FieldValue::Scalar(value) => value,
                FieldValue::Nested(nested) => Value::Object(flatten(nested)),
            };
            (!is_prunable(&value)).then(|| (field.name.to_string(), value))
        })
        .collect()
}

/// Flatten an optional configuration; `None` when nothing is left
pub fn flatten_optional<C: UserConfig>(config: Option<&C>) -> Option<Map<String, Value>> {
    config.map(|c| flatten(c)).filter(|map| !map.is_empty())
}

fn is_prunable(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
