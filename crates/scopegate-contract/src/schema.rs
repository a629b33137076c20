//! JSON schema subset used for structural request checks.
//!
//! Supported keywords: `$ref` (to `#/components/schemas/*`), `type`,
//! `properties`, `required`, `additionalProperties`, `items`, `enum`,
//! `minLength`, `maxLength`, `minimum`, `maximum`, `nullable`.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ContractError, FieldViolation, Result};

const REF_PREFIX: &str = "#/components/schemas/";
const MAX_REF_HOPS: usize = 16;

/// Primitive schema types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl SchemaType {
    const fn describe(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Number => "a number",
            Self::Boolean => "a boolean",
            Self::Array => "an array",
            Self::Object => "an object",
        }
    }
}

/// `additionalProperties`: either a flag or a schema for extra properties.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    /// `true` allows anything, `false` rejects unknown properties.
    Flag(bool),
    /// Unknown properties must match this schema.
    Schema(Box<Schema>),
}

/// A schema node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Schema {
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<SchemaType>,
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,
    #[serde(default)]
    pub required: Vec<String>,
    pub additional_properties: Option<AdditionalProperties>,
    pub items: Option<Box<Schema>>,
    #[serde(rename = "enum")]
    pub enumeration: Option<Vec<Value>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    #[serde(default)]
    pub nullable: bool,
}

impl Schema {
    /// Visit every `$ref` in this schema tree.
    pub(crate) fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(reference) = &self.reference {
            out.push(reference);
        }
        for property in self.properties.values() {
            property.collect_references(out);
        }
        if let Some(items) = &self.items {
            items.collect_references(out);
        }
        if let Some(AdditionalProperties::Schema(extra)) = &self.additional_properties {
            extra.collect_references(out);
        }
    }
}

/// Resolves `$ref`s against the component schemas and checks values.
#[derive(Debug, Clone, Copy)]
pub struct SchemaChecker<'a> {
    components: &'a BTreeMap<String, Schema>,
}

impl<'a> SchemaChecker<'a> {
    /// Create a checker over the given component schemas.
    #[must_use]
    pub const fn new(components: &'a BTreeMap<String, Schema>) -> Self {
        Self { components }
    }

    /// Ensure a reference string points at a declared component.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::UnresolvedReference` otherwise.
    pub fn ensure_resolvable(&self, reference: &str) -> Result<()> {
        reference
            .strip_prefix(REF_PREFIX)
            .filter(|name| self.components.contains_key(*name))
            .map(|_| ())
            .ok_or_else(|| ContractError::UnresolvedReference(reference.to_string()))
    }

    fn resolve(&self, mut schema: &'a Schema) -> Option<&'a Schema> {
        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = &schema.reference else {
                return Some(schema);
            };
            schema = self.components.get(reference.strip_prefix(REF_PREFIX)?)?;
        }
        None
    }

    /// Check `value` against `schema`, collecting every violation under `location`.
    pub fn check(&self, schema: &'a Schema, value: &Value, location: &str) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        self.check_into(schema, value, location, &mut violations);
        violations
    }

    /// Coerce a raw parameter string to the schema's type, then check it.
    pub fn check_raw(&self, schema: &'a Schema, raw: &str, location: &str) -> Vec<FieldViolation> {
        let Some(resolved) = self.resolve(schema) else {
            return vec![FieldViolation::new(location, "unresolvable schema reference")];
        };

        let value = match resolved.kind {
            Some(SchemaType::Integer) => match raw.parse::<i64>() {
                Ok(n) => Value::from(n),
                Err(_) => return vec![FieldViolation::new(location, "must be an integer")],
            },
            Some(SchemaType::Number) => match raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
            {
                Some(n) => Value::Number(n),
                None => return vec![FieldViolation::new(location, "must be a number")],
            },
            Some(SchemaType::Boolean) => match raw {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return vec![FieldViolation::new(location, "must be a boolean")],
            },
            _ => Value::String(raw.to_string()),
        };

        self.check(resolved, &value, location)
    }

    fn check_into(
        &self,
        schema: &'a Schema,
        value: &Value,
        location: &str,
        out: &mut Vec<FieldViolation>,
    ) {
        let Some(schema) = self.resolve(schema) else {
            out.push(FieldViolation::new(location, "unresolvable schema reference"));
            return;
        };

        if value.is_null() {
            if !schema.nullable && schema.kind.is_some() {
                out.push(FieldViolation::new(location, "must not be null"));
            }
            return;
        }

        if let Some(kind) = schema.kind {
            if !type_matches(kind, value) {
                out.push(FieldViolation::new(
                    location,
                    format!("must be {}", kind.describe()),
                ));
                return;
            }
        }

        if let Some(allowed) = &schema.enumeration {
            if !allowed.contains(value) {
                let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
                out.push(FieldViolation::new(
                    location,
                    format!("must be one of [{}]", listed.join(", ")),
                ));
            }
        }

        match value {
            Value::String(s) => check_length(schema, s, location, out),
            Value::Number(n) => check_range(schema, n.as_f64().unwrap_or(f64::NAN), location, out),
            Value::Array(items) => {
                if let Some(item_schema) = &schema.items {
                    for (i, item) in items.iter().enumerate() {
                        self.check_into(item_schema, item, &format!("{location}[{i}]"), out);
                    }
                }
            }
            Value::Object(map) => self.check_object(schema, map, location, out),
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn check_object(
        &self,
        schema: &'a Schema,
        map: &serde_json::Map<String, Value>,
        location: &str,
        out: &mut Vec<FieldViolation>,
    ) {
        for name in &schema.required {
            if !map.contains_key(name) {
                out.push(FieldViolation::new(
                    child_location(location, name),
                    "is required",
                ));
            }
        }

        for (name, field) in map {
            let field_location = child_location(location, name);
            if let Some(property) = schema.properties.get(name) {
                self.check_into(property, field, &field_location, out);
                continue;
            }
            match &schema.additional_properties {
                Some(AdditionalProperties::Flag(false)) => {
                    out.push(FieldViolation::new(field_location, "is not allowed"));
                }
                Some(AdditionalProperties::Schema(extra)) => {
                    self.check_into(extra, field, &field_location, out);
                }
                Some(AdditionalProperties::Flag(true)) | None => {}
            }
        }
    }
}

fn child_location(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn type_matches(kind: SchemaType, value: &Value) -> bool {
    match kind {
        SchemaType::String => value.is_string(),
        SchemaType::Integer => value.is_i64() || value.is_u64(),
        SchemaType::Number => value.is_number(),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Array => value.is_array(),
        SchemaType::Object => value.is_object(),
    }
}

fn check_length(schema: &Schema, s: &str, location: &str, out: &mut Vec<FieldViolation>) {
    let len = s.chars().count();
    if let Some(min) = schema.min_length {
        if len < min {
            out.push(FieldViolation::new(
                location,
                format!("must be at least {min} characters"),
            ));
        }
    }
    if let Some(max) = schema.max_length {
        if len > max {
            out.push(FieldViolation::new(
                location,
                format!("must be at most {max} characters"),
            ));
        }
    }
}

fn check_range(schema: &Schema, n: f64, location: &str, out: &mut Vec<FieldViolation>) {
    if let Some(min) = schema.minimum {
        if n < min {
            out.push(FieldViolation::new(location, format!("must be >= {min}")));
        }
    }
    if let Some(max) = schema.maximum {
        if n > max {
            out.push(FieldViolation::new(location, format!("must be <= {max}")));
        }
    }
}
