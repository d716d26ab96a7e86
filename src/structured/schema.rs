//! Output schemas for `answerFormat` / `reasoningFormat`.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A JSON Schema describing the shape of a run's answer or reasoning.
///
/// Schemas built with [`OutputSchema::from_type`] are strict: every object forbids
/// additional properties and lists all of its properties as required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSchema(Value);

impl OutputSchema {
    /// Build a strict object schema from a Rust type.
    pub fn from_type<T: schemars::JsonSchema>() -> Self {
        let raw = json_schema_from_type::<T>();
        let title = raw
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(T::schema_name);
        Self::from_raw(raw, title)
    }

    /// Same as [`OutputSchema::from_type`] with an explicit title.
    pub fn from_type_titled<T: schemars::JsonSchema>(title: impl Into<String>) -> Self {
        Self::from_raw(json_schema_from_type::<T>(), title.into())
    }

    /// Accept a hand-written schema. It must be an object and compile as a JSON Schema.
    pub fn from_value(value: Value) -> Result<Self> {
        let schema = Self(value);
        schema.validate("output_schema")?;
        Ok(schema)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Check the schema is an object that compiles. `field` names it in the error context.
    pub(crate) fn validate(&self, field: &str) -> Result<()> {
        if !self.0.is_object() {
            return Err(Error::validation_with_context(
                "output schema must be a JSON object",
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source("schema_validator"),
            ));
        }
        compile_check(&self.0, field)
    }

    fn from_raw(raw: Value, title: String) -> Self {
        let mut map = Map::new();
        map.insert("type".into(), json!("object"));
        map.insert("title".into(), Value::String(title));

        let properties = raw.get("properties").cloned().unwrap_or_else(|| json!({}));
        let required = match raw.get("required") {
            Some(r) => r.clone(),
            None => Value::Array(
                properties
                    .as_object()
                    .map(|p| p.keys().cloned().map(Value::String).collect())
                    .unwrap_or_default(),
            ),
        };
        map.insert("properties".into(), properties);
        map.insert("required".into(), required);
        if let Some(defs) = raw.get("definitions") {
            map.insert("definitions".into(), defs.clone());
        }
        if let Some(defs) = raw.get("$defs") {
            map.insert("$defs".into(), defs.clone());
        }

        let mut schema = Value::Object(map);
        make_strict(&mut schema);
        Self(schema)
    }
}

/// Compile a schema with `jsonschema` to reject malformed ones before they reach the server.
pub(crate) fn compile_check(schema: &Value, field: &str) -> Result<()> {
    jsonschema::JSONSchema::compile(schema)
        .map(|_| ())
        .map_err(|e| {
            Error::validation_with_context(
                "invalid JSON Schema",
                ErrorContext::new()
                    .with_field_path(field)
                    .with_details(e.to_string())
                    .with_source("schema_validator"),
            )
        })
}

pub fn json_schema_from_type<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(&schema).unwrap_or_else(|_| json!({}))
}

/// Rewrite a schema in place so the service can enforce it exactly.
///
/// Objects get `additionalProperties: false` unless set, and `required` lists every property.
/// Recurses through definitions, properties, array items, `anyOf` and `allOf`; a single-entry
/// `allOf` is inlined and `default: null` is dropped.
pub fn make_strict(schema: &mut Value) {
    let Some(obj) = schema.as_object_mut() else {
        return;
    };

    for key in ["$defs", "definitions"] {
        if let Some(Value::Object(defs)) = obj.get_mut(key) {
            for def in defs.values_mut() {
                make_strict(def);
            }
        }
    }

    if obj.get("type").and_then(Value::as_str) == Some("object")
        && !obj.contains_key("additionalProperties")
    {
        obj.insert("additionalProperties".into(), Value::Bool(false));
    }

    let property_keys = match obj.get_mut("properties") {
        Some(Value::Object(props)) => {
            for prop in props.values_mut() {
                make_strict(prop);
            }
            Some(props.keys().cloned().map(Value::String).collect::<Vec<_>>())
        }
        _ => None,
    };
    if let Some(keys) = property_keys {
        obj.insert("required".into(), Value::Array(keys));
    }

    if let Some(items) = obj.get_mut("items") {
        if items.is_object() {
            make_strict(items);
        }
    }

    if let Some(Value::Array(variants)) = obj.get_mut("anyOf") {
        for v in variants.iter_mut() {
            make_strict(v);
        }
    }

    if let Some(Value::Array(mut entries)) = obj.remove("allOf") {
        if entries.len() == 1 {
            let mut only = entries.remove(0);
            make_strict(&mut only);
            if let Value::Object(inner) = only {
                for (k, v) in inner {
                    obj.entry(k).or_insert(v);
                }
            }
        } else {
            for e in entries.iter_mut() {
                make_strict(e);
            }
            obj.insert("allOf".into(), Value::Array(entries));
        }
    }

    if matches!(obj.get("default"), Some(Value::Null)) {
        obj.remove("default");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Address {
        street: String,
        city: String,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Answer {
        summary: String,
        confidence: Option<f64>,
        tags: Vec<String>,
        address: Address,
    }

    #[test]
    fn from_type_is_strict() {
        let schema = OutputSchema::from_type::<Answer>();
        let v = schema.as_value();
        assert_eq!(v["type"], "object");
        assert_eq!(v["title"], "Answer");
        assert_eq!(v["additionalProperties"], false);

        let required: Vec<&str> = v["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        for key in ["summary", "confidence", "tags", "address"] {
            assert!(required.contains(&key), "missing {}", key);
        }

        let address = &v["definitions"]["Address"];
        assert_eq!(address["additionalProperties"], false);
        assert_eq!(address["required"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn explicit_title_wins() {
        let schema = OutputSchema::from_type_titled::<Address>("Location");
        assert_eq!(schema.as_value()["title"], "Location");
    }

    #[test]
    fn single_all_of_is_inlined_and_null_default_dropped() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "inner": {
                    "allOf": [{"type": "object", "properties": {"a": {"type": "string"}}}],
                    "default": null
                }
            }
        });
        make_strict(&mut schema);
        let inner = &schema["properties"]["inner"];
        assert!(inner.get("allOf").is_none());
        assert!(inner.get("default").is_none());
        assert_eq!(inner["additionalProperties"], false);
        assert_eq!(inner["required"], json!(["a"]));
    }

    #[test]
    fn explicit_additional_properties_are_kept() {
        let mut schema = json!({"type": "object", "additionalProperties": true, "properties": {}});
        make_strict(&mut schema);
        assert_eq!(schema["additionalProperties"], true);
    }

    #[test]
    fn from_value_rejects_non_objects_and_bad_schemas() {
        assert!(OutputSchema::from_value(json!("string")).is_err());
        assert!(OutputSchema::from_value(json!({"type": 12})).is_err());
        assert!(OutputSchema::from_value(json!({"type": "object"})).is_ok());
    }

    #[test]
    fn from_value_errors_do_not_assume_answer_format() {
        let err = OutputSchema::from_value(json!([1])).unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("output_schema")
        );
    }
}
