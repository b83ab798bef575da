use serde_json::{Map, Value};

use crate::domain::DomainError;

/// Output of rendering a template
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    fields: Map<String, Value>,
}

impl Rendered {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    fn field(&self, field: &str) -> Result<&Value, DomainError> {
        self.fields.get(field).ok_or_else(|| {
            DomainError::template(format!("Field '{}' is not present in the template", field))
        })
    }

    pub fn get(&self, field: &str) -> Result<String, DomainError> {
        match self.field(field)? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(wrong_type(field, "a string")),
        }
    }

    pub fn get_int(&self, field: &str) -> Result<i64, DomainError> {
        self.field(field)?
            .as_i64()
            .ok_or_else(|| wrong_type(field, "an int"))
    }

    pub fn get_bool(&self, field: &str) -> Result<bool, DomainError> {
        self.field(field)?
            .as_bool()
            .ok_or_else(|| wrong_type(field, "a bool"))
    }

    pub fn as_json(&self) -> &Map<String, Value> {
        &self.fields
    }
}

fn wrong_type(field: &str, expected: &str) -> DomainError {
    DomainError::template(format!("Field '{}' is not {}", field, expected))
}
