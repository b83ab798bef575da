//! Template source trait definition

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Where template text comes from
#[async_trait]
pub trait TemplateSource: Send + Sync + Debug {
    /// Load the raw template text stored at `location`
    async fn load(&self, location: &str) -> Result<String, DomainError>;

    /// Get the source type name
    fn source_type(&self) -> &'static str;
}

/// Templates held in memory, keyed by location
#[derive(Debug, Clone, Default)]
pub struct InlineTemplateSource {
    templates: HashMap<String, String>,
}

impl InlineTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, location: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(location.into(), source.into());
        self
    }
}

#[async_trait]
impl TemplateSource for InlineTemplateSource {
    async fn load(&self, location: &str) -> Result<String, DomainError> {
        self.templates
            .get(location)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("Template '{}' not found", location)))
    }

    fn source_type(&self) -> &'static str {
        "inline"
    }
}
