/// Failure taxonomy surfaced to the embedding request layer, which maps each
/// kind onto its transport-level status.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{context}")]
    Database {
        context: String,
        #[source]
        source: sqlx::Error,
    },
}

impl ServiceError {
    /// Log the underlying database error with context and wrap it.
    pub(crate) fn database(source: sqlx::Error, context: &str) -> Self {
        tracing::error!(error = %source, "{context}");
        Self::Database { context: context.to_string(), source }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_error_keeps_context_in_display() {
        let err = ServiceError::database(sqlx::Error::RowNotFound, "Failed to fetch exam");
        assert_eq!(err.to_string(), "Failed to fetch exam");
    }
}
