use serde::{Deserialize, Serialize};

/// Namespace used when a caller leaves it blank
pub const DEFAULT_NAMESPACE: &str = "knowledge";

/// Namespace/table pair a vector operation is restricted to
///
/// Passed with every call instead of living on the endpoint, so concurrent
/// requests never observe each other's target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    namespace: Option<String>,
    table: Option<String>,
}

impl Scope {
    pub fn new(namespace: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            table: Some(table.into()),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Namespace, falling back to [`DEFAULT_NAMESPACE`] when blank
    pub fn namespace(&self) -> &str {
        match self.namespace.as_deref() {
            Some(ns) if !ns.trim().is_empty() => ns,
            _ => DEFAULT_NAMESPACE,
        }
    }

    /// Table, falling back to `default_table` when blank
    pub fn table_or<'a>(&'a self, default_table: &'a str) -> &'a str {
        match self.table.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => default_table,
        }
    }
}

/// A stored embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub namespace: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl VectorRecord {
    pub fn new(
        id: impl Into<String>,
        vector: Vec<f32>,
        namespace: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            vector,
            namespace: namespace.into(),
            table: table.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_namespace_defaults_to_knowledge() {
        assert_eq!(Scope::default().namespace(), "knowledge");
        assert_eq!(Scope::new("", "docs").namespace(), "knowledge");
        assert_eq!(Scope::new("  ", "docs").namespace(), "knowledge");
        assert_eq!(Scope::new("ml", "docs").namespace(), "ml");
    }

    #[test]
    fn test_blank_table_uses_default() {
        assert_eq!(Scope::default().table_or("embeddings"), "embeddings");
        assert_eq!(Scope::new("ml", "").table_or("embeddings"), "embeddings");
        assert_eq!(Scope::new("ml", "papers").table_or("embeddings"), "papers");
    }
}
