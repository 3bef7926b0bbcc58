use thiserror::Error;

/// Errors raised when a loaded configuration fails validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// TLS is enabled but no trusted root certificates were supplied.
    #[error("trusted root certificates must be provided when TLS is enabled")]
    MissingTrustedRootCerts,

    /// The BigQuery source has neither an inline key nor a key file path.
    #[error("a service account key or a service account key path must be provided")]
    MissingServiceAccountKey,

    /// A required identifier (schema or table name) is empty.
    #[error("`{0}` must not be empty")]
    EmptyIdentifier(&'static str),
}
