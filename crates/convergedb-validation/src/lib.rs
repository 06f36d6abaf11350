//! A small schema `Validator` adapter: a registry of named schemas plus a
//! single entry point returning a structured validation result.
//!
//! This is one concrete implementation of `convergedb_core::Validator`, not
//! part of the core contract — applications are free to plug in a real
//! JSON-Schema validator instead.

use convergedb_core::{Issue, ValidationOutcome, Validator, Value};
use std::collections::BTreeMap;

/// The shape a field is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Any,
}

impl Kind {
    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (Kind::Any, _) => true,
            (Kind::Null, Value::Null) => true,
            (Kind::Bool, Value::Bool(_)) => true,
            (Kind::Number, Value::Number(_)) => true,
            (Kind::String, Value::String(_)) => true,
            (Kind::Array, Value::Array(_)) => true,
            (Kind::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub required: bool,
    pub kind: Kind,
}

impl FieldRule {
    pub fn required(kind: Kind) -> Self {
        Self { required: true, kind }
    }

    pub fn optional(kind: Kind) -> Self {
        Self { required: false, kind }
    }
}

/// A schema: a set of named field rules. Fields not named in the schema are
/// always permitted — the CRDT layer is schema-agnostic and this
/// validator only enforces what a caller explicitly declares.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub fields: BTreeMap<String, FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    fn check(&self, input: &Value) -> Vec<Issue> {
        let mut issues = Vec::new();
        let object = match input {
            Value::Object(map) => map,
            _ => {
                issues.push(Issue::new("", "expected an object"));
                return issues;
            }
        };

        for (name, rule) in &self.fields {
            match object.get(name) {
                Some(value) if value.is_null() && rule.required => {
                    issues.push(Issue::new(name, "required field is null"));
                }
                Some(value) => {
                    if !rule.kind.matches(value) {
                        issues.push(Issue::new(name, format!("expected {:?}", rule.kind)));
                    }
                }
                None if rule.required => {
                    issues.push(Issue::new(name, "required field is missing"));
                }
                None => {}
            }
        }
        issues
    }
}

/// Registers schemas by name (typically the collection name) and validates
/// candidate values against them. Collections with no registered schema
/// pass through unchanged: an unconfigured validator never blocks writes.
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, schema_name: &str, input: &Value) -> ValidationOutcome {
        match self.schemas.get(schema_name) {
            None => ValidationOutcome::Ok(input.clone()),
            Some(schema) => {
                let issues = schema.check(input);
                if issues.is_empty() {
                    ValidationOutcome::Ok(input.clone())
                } else {
                    ValidationOutcome::Issues(issues)
                }
            }
        }
    }
}
