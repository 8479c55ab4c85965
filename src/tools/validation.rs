//! Runtime validators built from declared JSON Schemas.
//!
//! Remote servers describe tool inputs with a JSON Schema tree. The bridge
//! converts that tree once, when the tool is wrapped, into a [`SchemaNode`]
//! and validates every call against it before anything is sent upstream.
//!
//! Only the structural subset matters here: scalar types, arrays of an item
//! type, and objects with required fields. Anything the converter does not
//! recognise becomes [`SchemaNode::Any`], so an exotic type tag never makes a
//! tool uncallable.

use std::collections::BTreeMap;

use serde_json::Value;

/// Converted schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<SchemaNode>),
    Object {
        properties: BTreeMap<String, SchemaNode>,
        required: Vec<String>,
    },
    /// Unconstrained passthrough.
    Any,
}

impl SchemaNode {
    /// Object schema with no properties and no required fields.
    pub fn empty_object() -> Self {
        Self::Object {
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    /// Convert a tool's declared input schema.
    ///
    /// A missing or empty schema means "an object with no constraints".
    pub fn tool_input(schema: Option<&Value>) -> Self {
        match schema {
            None | Some(Value::Null) => Self::empty_object(),
            Some(Value::Object(map)) if map.is_empty() => Self::empty_object(),
            Some(schema) => Self::from_json(schema),
        }
    }

    /// Convert one node of a JSON Schema tree.
    pub fn from_json(schema: &Value) -> Self {
        match schema.get("type").and_then(Value::as_str) {
            Some("string") => Self::String,
            Some("number") => Self::Number,
            Some("integer") => Self::Integer,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array(Box::new(
                schema.get("items").map_or(Self::Any, Self::from_json),
            )),
            Some("object") => Self::object_from(schema),
            None if schema.get("properties").is_some() => Self::object_from(schema),
            _ => Self::Any,
        }
    }

    fn object_from(schema: &Value) -> Self {
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| (name.clone(), Self::from_json(prop)))
                    .collect()
            })
            .unwrap_or_default();
        let required = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self::Object {
            properties,
            required,
        }
    }

    /// Validate a value, returning the first violation found.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        self.validate_at(value, "")
    }

    fn validate_at(&self, value: &Value, path: &str) -> Result<(), String> {
        match self {
            Self::Any => Ok(()),
            Self::String => expect_type(value.is_string(), "string", value, path),
            Self::Number => expect_type(value.is_number(), "number", value, path),
            Self::Integer => expect_type(is_whole_number(value), "integer", value, path),
            Self::Boolean => expect_type(value.is_boolean(), "boolean", value, path),
            Self::Array(item) => {
                let Some(items) = value.as_array() else {
                    return expect_type(false, "array", value, path);
                };
                for (index, element) in items.iter().enumerate() {
                    item.validate_at(element, &format!("{path}[{index}]"))?;
                }
                Ok(())
            }
            Self::Object {
                properties,
                required,
            } => {
                let Some(object) = value.as_object() else {
                    return expect_type(false, "object", value, path);
                };
                for field in required {
                    if !object.contains_key(field) {
                        return Err(format!(
                            "missing required field '{}'",
                            join_path(path, field)
                        ));
                    }
                }
                for (key, field_value) in object {
                    if let Some(node) = properties.get(key) {
                        node.validate_at(field_value, &join_path(path, key))?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}

/// JSON has no separate integer type; `2.0` counts as an integer.
fn is_whole_number(value: &Value) -> bool {
    value.is_i64()
        || value.is_u64()
        || value
            .as_f64()
            .is_some_and(|number| number.is_finite() && number.fract() == 0.0)
}

fn expect_type(matches: bool, expected: &str, value: &Value, path: &str) -> Result<(), String> {
    if matches {
        return Ok(());
    }
    if path.is_empty() {
        Err(format!(
            "expected {expected} arguments, got {}",
            json_type_name(value)
        ))
    } else {
        Err(format!(
            "field '{path}' expected type '{expected}', got {}",
            json_type_name(value)
        ))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
