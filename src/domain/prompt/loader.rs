use std::collections::BTreeMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;

use super::{ParsedTemplate, Rendered, TemplateValue};
use crate::domain::DomainError;

/// A template plus the variables injected for one request
///
/// Rendering is explicit: after `put` the previous output is stale until
/// [`PromptTemplate::load_or_reload`] runs again.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    location: String,
    parsed: Arc<ParsedTemplate>,
    variables: BTreeMap<String, TemplateValue>,
    rendered: Option<Rendered>,
    fingerprint: Option<String>,
    dirty: bool,
    renders: u32,
}

impl PromptTemplate {
    pub fn new(location: impl Into<String>, parsed: Arc<ParsedTemplate>) -> Self {
        Self {
            location: location.into(),
            parsed,
            variables: BTreeMap::new(),
            rendered: None,
            fingerprint: None,
            dirty: false,
            renders: 0,
        }
    }

    /// Parse `source` directly, bypassing any cache
    pub fn from_source(location: impl Into<String>, source: &str) -> Result<Self, DomainError> {
        Ok(Self::new(location, Arc::new(ParsedTemplate::parse(source)?)))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn variables(&self) -> &BTreeMap<String, TemplateValue> {
        &self.variables
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<TemplateValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        if self.variables.get(&name) != Some(&value) {
            self.variables.insert(name, value);
            self.dirty = true;
        }
        self
    }

    /// Like [`PromptTemplate::put`], but rejects a value whose type differs
    /// from the placeholder's declared type
    pub fn try_put(
        &mut self,
        name: impl Into<String>,
        value: impl Into<TemplateValue>,
    ) -> Result<&mut Self, DomainError> {
        let name = name.into();
        let value = value.into();

        self.parsed.check(&name, &value)?;
        Ok(self.put(name, value))
    }

    pub fn load_or_reload(&mut self) -> Result<&Rendered, DomainError> {
        let fingerprint = fingerprint(&self.variables);

        let cached = self.rendered.is_some() && self.fingerprint.as_deref() == Some(fingerprint.as_str());
        if !cached {
            let rendered = self.parsed.render(&self.variables)?;
            self.renders += 1;
            self.rendered = Some(rendered);
            self.fingerprint = Some(fingerprint);
            debug!(location = %self.location, renders = self.renders, "Template rendered");
        }
        self.dirty = false;

        self.rendered
            .as_ref()
            .ok_or_else(|| DomainError::internal("Rendered template missing after load"))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The last rendering, if it is still current
    pub fn rendered(&self) -> Result<&Rendered, DomainError> {
        match self.rendered {
            None => Err(DomainError::template(format!(
                "Template '{}' has not been loaded",
                self.location
            ))),
            Some(_) if self.dirty => Err(DomainError::template(format!(
                "Template '{}' changed since it was last loaded",
                self.location
            ))),
            Some(ref rendered) => Ok(rendered),
        }
    }

    pub fn get(&self, field: &str) -> Result<String, DomainError> {
        self.rendered()?.get(field)
    }

    pub fn get_int(&self, field: &str) -> Result<i64, DomainError> {
        self.rendered()?.get_int(field)
    }

    pub fn get_bool(&self, field: &str) -> Result<bool, DomainError> {
        self.rendered()?.get_bool(field)
    }
}

fn fingerprint(variables: &BTreeMap<String, TemplateValue>) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in variables {
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(value.value_type().as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(value.to_text().as_bytes());
        hasher.update([0xffu8]);
    }
    hex::encode(hasher.finalize())
}
