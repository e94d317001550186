//! Input schemas for tools and bus events
//!
//! A [`Schema`] is a flat, ordered list of named [`Field`]s. It is the single
//! description used to validate tool input, validate event payloads, export
//! tool definitions to a completion API, and render capability details.
//!
//! Validation normalizes as it goes: an explicit `null` for an optional field
//! is treated as if the field had been omitted and is stripped from the
//! returned object. Upstream callers (language models in particular) often
//! emit `"field": null` for arguments they chose not to supply.
//!
//! ```
//! use toolhost_domain::tool::schema::{Field, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .field(Field::string("path", "File to read").required())
//!     .field(Field::integer("limit", "Maximum lines"));
//!
//! let input = schema.validate(&json!({"path": "a.txt", "limit": null})).unwrap();
//! assert_eq!(input, json!({"path": "a.txt"}));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// Accepts any JSON value (used when an imported schema omits `type`).
    Any,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "string" => FieldType::String,
            "number" => FieldType::Number,
            "integer" => FieldType::Integer,
            "boolean" => FieldType::Boolean,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            _ => FieldType::Any,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
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

/// A single named field of a [`Schema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed string values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Element type for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<FieldType>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            description: None,
            enum_values: None,
            items: None,
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::String).describe(description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer).describe(description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number).describe(description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean).describe(description)
    }

    pub fn object(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, FieldType::Object).describe(description)
    }

    pub fn array(
        name: impl Into<String>,
        items: FieldType,
        description: impl Into<String>,
    ) -> Self {
        let mut field = Self::new(name, FieldType::Array).describe(description);
        field.items = Some(items);
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    fn check(&self, value: &Value) -> Result<(), SchemaError> {
        if !self.field_type.matches(value) {
            return Err(SchemaError::WrongType {
                field: self.name.clone(),
                expected: self.field_type,
                found: json_type_name(value),
            });
        }

        if let (Some(allowed), Some(s)) = (&self.enum_values, value.as_str())
            && !allowed.iter().any(|a| a == s)
        {
            return Err(SchemaError::NotAllowed {
                field: self.name.clone(),
                value: s.to_string(),
                allowed: allowed.clone(),
            });
        }

        if let (Some(item_type), Some(items)) = (self.items, value.as_array())
            && let Some(bad) = items.iter().find(|v| !item_type.matches(v))
        {
            return Err(SchemaError::WrongType {
                field: format!("{}[]", self.name),
                expected: item_type,
                found: json_type_name(bad),
            });
        }

        Ok(())
    }
}

/// Validation failure for a schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("expected an object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be of type {expected}, got {found}")]
    WrongType {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("field '{field}' must be one of [{}], got '{value}'", .allowed.join(", "))]
    NotAllowed {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
}

/// Ordered object schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any existing field with the same name.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate `input` and return the normalized object.
    ///
    /// A top-level `null` is accepted as an empty object. Keys not declared by
    /// the schema pass through untouched.
    pub fn validate(&self, input: &Value) -> Result<Value, SchemaError> {
        let mut object = match input {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => return Err(SchemaError::NotAnObject(json_type_name(other))),
        };

        for field in &self.fields {
            match object.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(SchemaError::MissingField(field.name.clone()));
                }
                Some(Value::Null) => {
                    object.remove(&field.name);
                }
                Some(value) => field.check(value)?,
                None => {}
            }
        }

        Ok(Value::Object(object))
    }

    /// Render as a JSON Schema object (`{"type":"object","properties":..,"required":..}`).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            let mut prop = Map::new();
            if field.field_type != FieldType::Any {
                prop.insert("type".into(), json!(field.field_type.as_str()));
            }
            if let Some(desc) = &field.description {
                prop.insert("description".into(), json!(desc));
            }
            if let Some(values) = &field.enum_values {
                prop.insert("enum".into(), json!(values));
            }
            if let Some(items) = field.items {
                prop.insert("items".into(), json!({ "type": items.as_str() }));
            }
            properties.insert(field.name.clone(), Value::Object(prop));

            if field.required {
                required.push(json!(field.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Build a schema from a JSON Schema object.
    ///
    /// Lenient: unknown or missing types become [`FieldType::Any`] and
    /// non-string enum members are dropped. Fields come back in key order.
    pub fn from_json_schema(value: &Value) -> Self {
        let required: Vec<&str> = value
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let Some(properties) = value.get("properties").and_then(Value::as_object) else {
            return Self::default();
        };

        let fields = properties
            .iter()
            .map(|(name, prop)| {
                let field_type = prop
                    .get("type")
                    .and_then(Value::as_str)
                    .map(FieldType::parse)
                    .unwrap_or(FieldType::Any);
                Field {
                    name: name.clone(),
                    field_type,
                    required: required.contains(&name.as_str()),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    enum_values: prop.get("enum").and_then(Value::as_array).map(|values| {
                        values
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    }),
                    items: prop
                        .get("items")
                        .and_then(|i| i.get("type"))
                        .and_then(Value::as_str)
                        .map(FieldType::parse),
                }
            })
            .collect();

        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_schema() -> Schema {
        Schema::new()
            .field(Field::string("path", "File path").required())
            .field(Field::integer("limit", "Max lines"))
            .field(Field::string("mode", "Read mode").one_of(["text", "bytes"]))
    }

    #[test]
    fn test_validate_accepts_valid_input() {
        let input = json!({"path": "src/lib.rs", "limit": 10});
        let out = read_schema().validate(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_null_optional_is_treated_as_absent() {
        let out = read_schema()
            .validate(&json!({"path": "a", "limit": null, "mode": null}))
            .unwrap();
        assert_eq!(out, json!({"path": "a"}));
    }

    #[test]
    fn test_null_required_is_missing() {
        let err = read_schema().validate(&json!({"path": null})).unwrap_err();
        assert_eq!(err, SchemaError::MissingField("path".into()));
    }

    #[test]
    fn test_wrong_type() {
        let err = read_schema()
            .validate(&json!({"path": "a", "limit": "ten"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::WrongType { ref field, .. } if field == "limit"));
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn test_enum_violation() {
        let err = read_schema()
            .validate(&json!({"path": "a", "mode": "lines"}))
            .unwrap_err();
        assert!(err.to_string().contains("text, bytes"));
    }

    #[test]
    fn test_null_input_is_empty_object() {
        let schema = Schema::new().field(Field::string("q", "query"));
        assert_eq!(schema.validate(&Value::Null).unwrap(), json!({}));
        assert!(matches!(
            schema.validate(&json!([1])),
            Err(SchemaError::NotAnObject("array"))
        ));
    }

    #[test]
    fn test_array_items_checked() {
        let schema = Schema::new().field(Field::array("options", FieldType::String, "choices"));
        assert!(schema.validate(&json!({"options": ["a", "b"]})).is_ok());
        assert!(schema.validate(&json!({"options": ["a", 1]})).is_err());
    }

    #[test]
    fn test_json_schema_export_and_import() {
        let exported = read_schema().to_json_schema();
        assert_eq!(exported["type"], "object");
        assert_eq!(exported["required"], json!(["path"]));
        assert_eq!(exported["properties"]["mode"]["enum"], json!(["text", "bytes"]));

        let imported = Schema::from_json_schema(&exported);
        let limit = imported.get("limit").unwrap();
        assert_eq!(limit.field_type, FieldType::Integer);
        assert!(!limit.required);
        assert!(imported.get("path").unwrap().required);
    }

    #[test]
    fn test_import_without_type_is_any() {
        let schema = Schema::from_json_schema(&json!({
            "type": "object",
            "properties": {"payload": {"description": "anything"}}
        }));
        assert_eq!(schema.get("payload").unwrap().field_type, FieldType::Any);
        assert!(schema.validate(&json!({"payload": [1, "x"]})).is_ok());
    }
}
