use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::prompt::TemplateSource;
use crate::domain::DomainError;

/// Loads templates from files under a root directory
///
/// A location is a relative path; `.json` is appended when it has no
/// extension, so `chat` resolves to `<root>/chat.json`.
#[derive(Debug, Clone)]
pub struct FileTemplateSource {
    root: PathBuf,
}

impl FileTemplateSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, location: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(location);

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if location.trim().is_empty() || escapes {
            return Err(DomainError::validation(format!(
                "Invalid template location: '{}'",
                location
            )));
        }

        let mut path = self.root.join(relative);
        if path.extension().is_none() {
            path.set_extension("json");
        }
        Ok(path)
    }
}

#[async_trait]
impl TemplateSource for FileTemplateSource {
    async fn load(&self, location: &str) -> Result<String, DomainError> {
        let path = self.resolve(location)?;
        debug!(path = %path.display(), "Loading template");

        tokio::fs::read_to_string(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                DomainError::not_found(format!("Template '{}' not found", location))
            }
            _ => DomainError::storage(format!(
                "Failed to read template '{}': {}",
                path.display(),
                e
            )),
        })
    }

    fn source_type(&self) -> &'static str {
        "file"
    }
}
