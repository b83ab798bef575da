use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Declared type of a template placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Str,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "str",
        }
    }

    /// Parse a literal written inside a template, e.g. a placeholder default
    pub fn parse_literal(&self, literal: &str) -> Result<TemplateValue, DomainError> {
        match self {
            Self::Str => Ok(TemplateValue::Str(literal.to_string())),
            Self::Int => literal
                .trim()
                .parse::<i64>()
                .map(TemplateValue::Int)
                .map_err(|_| DomainError::template(format!("'{}' is not a valid int", literal))),
            Self::Bool => match literal.trim() {
                "true" => Ok(TemplateValue::Bool(true)),
                "false" => Ok(TemplateValue::Bool(false)),
                _ => Err(DomainError::template(format!(
                    "'{}' is not a valid bool",
                    literal
                ))),
            },
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(Self::Bool),
            "int" => Ok(Self::Int),
            "str" => Ok(Self::Str),
            other => Err(DomainError::template(format!(
                "Unknown placeholder type '{}'",
                other
            ))),
        }
    }
}

/// A value injected into a template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TemplateValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl TemplateValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Str(_) => ValueType::Str,
        }
    }

    /// Text form used when the value is interpolated into a string
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for TemplateValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for TemplateValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<u32> for TemplateValue {
    fn from(value: u32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<usize> for TemplateValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}
