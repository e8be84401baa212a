use thiserror::Error;

/// Failure of a file search action, classified by how a caller should react.
#[derive(Error, Debug)]
pub enum DomainError {
    /// The store, document or operation does not exist (or no longer does).
    #[error("{0} not found")]
    NotFound(String),

    /// The request cannot be served as asked; retrying it unchanged will not help.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("internal failure: {0}")]
    Internal(String),

    /// The file search backend rejected the call or could not be reached.
    #[error("file search backend: {0}")]
    ExternalService(String),

    /// A bounded wait (request or operation poll) ran out.
    #[error("timed out: {0}")]
    Timeout(String),
}

impl DomainError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }

    pub fn external(reason: impl Into<String>) -> Self {
        Self::ExternalService(reason.into())
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::Timeout(reason.into())
    }

    /// Whether the same call may succeed later without any change by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ExternalService(_) | Self::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_subject() {
        assert_eq!(
            DomainError::not_found("store fileSearchStores/x").to_string(),
            "store fileSearchStores/x not found"
        );
        assert_eq!(
            DomainError::validation("no store selected").to_string(),
            "invalid request: no store selected"
        );
    }

    #[test]
    fn test_only_backend_and_timeout_errors_are_transient() {
        assert!(DomainError::external("503").is_transient());
        assert!(DomainError::timeout("poll").is_transient());
        assert!(!DomainError::validation("empty").is_transient());
        assert!(!DomainError::not_found("doc").is_transient());
    }
}
