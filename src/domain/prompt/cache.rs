use std::sync::Arc;

use moka::future::Cache as MokaCache;
use tracing::debug;

use super::{ParsedTemplate, PromptTemplate, TemplateSource};
use crate::domain::DomainError;

const DEFAULT_CAPACITY: u64 = 256;

/// Parsed templates shared by every request, keyed by location
#[derive(Debug, Clone)]
pub struct TemplateCache {
    source: Arc<dyn TemplateSource>,
    cache: MokaCache<String, Arc<ParsedTemplate>>,
}

impl TemplateCache {
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(source: Arc<dyn TemplateSource>, capacity: u64) -> Self {
        Self {
            source,
            cache: MokaCache::builder().max_capacity(capacity).build(),
        }
    }

    /// Parsed template for `location`, loading it on first use
    pub async fn parsed(&self, location: &str) -> Result<Arc<ParsedTemplate>, DomainError> {
        if let Some(parsed) = self.cache.get(location).await {
            return Ok(parsed);
        }

        let text = self.source.load(location).await?;
        let parsed = Arc::new(ParsedTemplate::parse(&text)?);
        self.cache.insert(location.to_string(), parsed.clone()).await;

        debug!(
            location,
            source = self.source.source_type(),
            placeholders = parsed.placeholders().len(),
            "Template parsed and cached"
        );

        Ok(parsed)
    }

    /// Fresh per-request template for `location`
    pub async fn template(&self, location: &str) -> Result<PromptTemplate, DomainError> {
        Ok(PromptTemplate::new(location, self.parsed(location).await?))
    }

    /// Drop a cached template so the next use reloads it from the source
    pub async fn invalidate(&self, location: &str) {
        self.cache.invalidate(location).await;
    }
}
