//! Template parsing and rendering
//!
//! A template is a JSON object whose string values may contain placeholders:
//! - `${str:name}`, `${int:name}`, `${bool:name}` - required value of that type
//! - `${int:name:5}` - value with a default
//! - `${if:flag}...${end}` - text kept only when the bool `flag` is true
//!
//! A string made of nothing but one `int` or `bool` placeholder renders to a
//! JSON number or boolean.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use super::{Rendered, TemplateValue, ValueType};
use crate::domain::DomainError;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{(str|int|bool):([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}").unwrap()
});

static WHOLE_TYPED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$\{(int|bool):([A-Za-z_][A-Za-z0-9_]*)(?::([^}]*))?\}$").unwrap()
});

static CONDITIONAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\$\{if:([A-Za-z_][A-Za-z0-9_]*)\}(.*?)\$\{end\}").unwrap()
});

/// A placeholder declared somewhere in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub value_type: ValueType,
    pub default: Option<TemplateValue>,
}

/// A template checked for syntax and consistent placeholder types
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    document: Map<String, Value>,
    placeholders: Vec<Placeholder>,
    declared: HashMap<String, ValueType>,
}

impl ParsedTemplate {
    pub fn parse(source: &str) -> Result<Self, DomainError> {
        let document = match serde_json::from_str::<Value>(source) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(DomainError::template("Template must be a JSON object")),
            Err(e) => {
                return Err(DomainError::template(format!(
                    "Template is not valid JSON: {}",
                    e
                )))
            }
        };

        let mut parsed = Self {
            document: Map::new(),
            placeholders: Vec::new(),
            declared: HashMap::new(),
        };

        for value in document.values() {
            parsed.collect(value)?;
        }
        parsed.document = document;

        Ok(parsed)
    }

    fn collect(&mut self, value: &Value) -> Result<(), DomainError> {
        match value {
            Value::String(s) => self.collect_string(s),
            Value::Array(items) => items.iter().try_for_each(|v| self.collect(v)),
            Value::Object(map) => map.values().try_for_each(|v| self.collect(v)),
            _ => Ok(()),
        }
    }

    fn collect_string(&mut self, s: &str) -> Result<(), DomainError> {
        if s.matches("${if:").count() != s.matches("${end}").count() {
            return Err(DomainError::template(format!(
                "Unbalanced conditional block in '{}'",
                s
            )));
        }

        for cap in CONDITIONAL_PATTERN.captures_iter(s) {
            if cap[2].contains("${if:") {
                return Err(DomainError::template("Conditional blocks cannot be nested"));
            }
            self.declare(&cap[1], ValueType::Bool, None)?;
        }

        for cap in PLACEHOLDER_PATTERN.captures_iter(s) {
            let value_type: ValueType = cap[1].parse()?;
            let default = match cap.get(3) {
                Some(m) => Some(value_type.parse_literal(m.as_str())?),
                None => None,
            };
            self.declare(&cap[2], value_type, default)?;
        }

        Ok(())
    }

    fn declare(
        &mut self,
        name: &str,
        value_type: ValueType,
        default: Option<TemplateValue>,
    ) -> Result<(), DomainError> {
        match self.declared.get(name) {
            Some(existing) if *existing != value_type => Err(DomainError::template(format!(
                "Placeholder '{}' is declared as both {} and {}",
                name, existing, value_type
            ))),
            Some(_) => {
                if let Some(default) = default {
                    if let Some(p) = self.placeholders.iter_mut().find(|p| p.name == name) {
                        p.default.get_or_insert(default);
                    }
                }
                Ok(())
            }
            None => {
                self.declared.insert(name.to_string(), value_type);
                self.placeholders.push(Placeholder {
                    name: name.to_string(),
                    value_type,
                    default,
                });
                Ok(())
            }
        }
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Declared type of `name`, if the template uses it
    pub fn declared_type(&self, name: &str) -> Option<ValueType> {
        self.declared.get(name).copied()
    }

    /// Check `value` against the type the template declares for `name`
    pub fn check(&self, name: &str, value: &TemplateValue) -> Result<(), DomainError> {
        match self.declared_type(name) {
            Some(expected) if expected != value.value_type() => Err(DomainError::template(format!(
                "Variable '{}' is declared as {} but a {} was given",
                name,
                expected,
                value.value_type()
            ))),
            _ => Ok(()),
        }
    }

    pub fn render(&self, variables: &BTreeMap<String, TemplateValue>) -> Result<Rendered, DomainError> {
        for (name, value) in variables {
            self.check(name, value)?;
        }

        let mut fields = Map::new();
        for (key, value) in &self.document {
            fields.insert(key.clone(), self.render_value(value, variables)?);
        }

        Ok(Rendered::new(fields))
    }

    fn render_value(
        &self,
        value: &Value,
        variables: &BTreeMap<String, TemplateValue>,
    ) -> Result<Value, DomainError> {
        match value {
            Value::String(s) => self.render_string(s, variables),
            Value::Array(items) => items
                .iter()
                .map(|v| self.render_value(v, variables))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut out = Map::new();
                for (key, v) in map {
                    out.insert(key.clone(), self.render_value(v, variables)?);
                }
                Ok(Value::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    fn render_string(
        &self,
        s: &str,
        variables: &BTreeMap<String, TemplateValue>,
    ) -> Result<Value, DomainError> {
        if let Some(cap) = WHOLE_TYPED_PATTERN.captures(s) {
            return Ok(self.resolve(&cap, variables)?.to_json());
        }

        let mut expanded = String::with_capacity(s.len());
        let mut last = 0;
        for cap in CONDITIONAL_PATTERN.captures_iter(s) {
            let whole = cap.get(0).map_or(0..0, |m| m.range());
            expanded.push_str(&s[last..whole.start]);

            match self.lookup(&cap[1], variables)? {
                TemplateValue::Bool(true) => expanded.push_str(&cap[2]),
                TemplateValue::Bool(false) => {}
                other => {
                    return Err(DomainError::template(format!(
                        "Condition '{}' must be a bool, got {}",
                        &cap[1],
                        other.value_type()
                    )))
                }
            }
            last = whole.end;
        }
        expanded.push_str(&s[last..]);

        let mut rendered = String::with_capacity(expanded.len());
        let mut last = 0;
        for cap in PLACEHOLDER_PATTERN.captures_iter(&expanded) {
            let whole = cap.get(0).map_or(0..0, |m| m.range());
            rendered.push_str(&expanded[last..whole.start]);
            rendered.push_str(&self.resolve(&cap, variables)?.to_text());
            last = whole.end;
        }
        rendered.push_str(&expanded[last..]);

        Ok(Value::String(rendered))
    }

    fn resolve(
        &self,
        cap: &Captures<'_>,
        variables: &BTreeMap<String, TemplateValue>,
    ) -> Result<TemplateValue, DomainError> {
        let name = &cap[2];
        if let Some(value) = variables.get(name) {
            return Ok(value.clone());
        }

        let value_type: ValueType = cap[1].parse()?;
        match cap.get(3) {
            Some(default) => value_type.parse_literal(default.as_str()),
            None => Err(missing(name)),
        }
    }

    fn lookup(
        &self,
        name: &str,
        variables: &BTreeMap<String, TemplateValue>,
    ) -> Result<TemplateValue, DomainError> {
        if let Some(value) = variables.get(name) {
            return Ok(value.clone());
        }

        self.placeholders
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.default.clone())
            .ok_or_else(|| missing(name))
    }
}

fn missing(name: &str) -> DomainError {
    DomainError::template(format!("No value provided for '{}'", name))
}
