use crate::domain::DomainError;

/// Per-chunk outcome of a bulk upsert, in input order
#[derive(Debug, Default)]
pub struct UpsertSummary {
    results: Vec<Result<String, DomainError>>,
}

impl UpsertSummary {
    pub fn new(results: Vec<Result<String, DomainError>>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[Result<String, DomainError>] {
        &self.results
    }

    /// Ids of the stored records
    pub fn ids(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| r.as_ref().ok().map(String::as_str))
            .collect()
    }

    pub fn errors(&self) -> Vec<&DomainError> {
        self.results.iter().filter_map(|r| r.as_ref().err()).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    /// All ids, or the first failure
    pub fn into_result(self) -> Result<Vec<String>, DomainError> {
        self.results.into_iter().collect()
    }
}
