use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Transient endpoint error: {endpoint} - {message}")]
    TransientEndpoint { endpoint: String, message: String },

    #[error("Fatal endpoint error: {endpoint} - {message}")]
    FatalEndpoint { endpoint: String, message: String },

    #[error("Template compilation error: {message}")]
    TemplateCompilation { message: String },

    #[error("Retry exhausted after {attempts} attempt(s): {last}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last: Box<DomainError>,
    },

    #[error("Stream transport error: {message}")]
    StreamTransport { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn transient(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn fatal(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FatalEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::TemplateCompilation {
            message: message.into(),
        }
    }

    pub fn retry_exhausted(attempts: u32, last: DomainError) -> Self {
        Self::RetryExhausted {
            attempts,
            last: Box::new(last),
        }
    }

    pub fn stream_transport(message: impl Into<String>) -> Self {
        Self::StreamTransport {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a retry policy may try the failed operation again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientEndpoint { .. })
    }

    /// Short label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransientEndpoint { .. } => "transient_endpoint",
            Self::FatalEndpoint { .. } => "fatal_endpoint",
            Self::TemplateCompilation { .. } => "template_compilation",
            Self::RetryExhausted { .. } => "retry_exhausted",
            Self::StreamTransport { .. } => "stream_transport",
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Configuration { .. } => "configuration",
            Self::Storage { .. } => "storage",
            Self::Internal { .. } => "internal",
        }
    }
}
