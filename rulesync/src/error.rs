//! Error types and result definitions for the consolidation run.
//!
//! Every fallible operation returns [`SyncResult`]. [`SyncError`] carries an
//! [`ErrorKind`] so the run reporter can classify the outcome, in particular
//! distinguishing target-store constraint violations from any other failure.
//! The captured callsite and the originating error, when one exists, travel
//! with it.

use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use gcp_bigquery_client::error::BQError;

/// Convenient result type for consolidation operations using [`SyncError`].
pub type SyncResult<T> = Result<T, SyncError>;

/// Error raised by any phase of the consolidation run.
#[derive(Debug, Clone)]
pub struct SyncError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
}

/// Categories of errors that can occur during a consolidation run.
///
/// The reporter folds these into the operator-facing taxonomy: integrity
/// violations are surfaced distinctly, everything else is a generic failure.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source (BigQuery) errors
    SourceConnectionFailed,
    SourceQueryFailed,
    AuthenticationError,

    // Destination (Postgres) errors
    DestinationConnectionFailed,
    DestinationQueryFailed,
    IntegrityViolation,

    // Data errors
    ConversionError,
    InvalidData,
    MissingColumn,

    // Environment errors
    ConfigError,
    IoError,

    Unknown,
}

impl SyncError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] and returns the modified
    /// instance. The stored source is exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`SyncError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        SyncError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for SyncError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`SyncError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SyncError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SyncError {
        SyncError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`SyncError`] from an error kind, static description, and
/// dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for SyncError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SyncError {
        SyncError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`SyncError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for SyncError {
    #[track_caller]
    fn from(err: std::io::Error) -> SyncError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SyncError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`sqlx::Error`] to [`SyncError`] with the appropriate error kind.
///
/// Database-reported constraint violations map to
/// [`ErrorKind::IntegrityViolation`] so operators can distinguish data
/// problems from system problems; connection and pool failures map to
/// [`ErrorKind::DestinationConnectionFailed`], everything else to
/// [`ErrorKind::DestinationQueryFailed`].
impl From<sqlx::Error> for SyncError {
    #[track_caller]
    fn from(err: sqlx::Error) -> SyncError {
        let (kind, description) = match &err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation
                | sqlx::error::ErrorKind::ForeignKeyViolation
                | sqlx::error::ErrorKind::NotNullViolation
                | sqlx::error::ErrorKind::CheckViolation => (
                    ErrorKind::IntegrityViolation,
                    "Postgres constraint violation",
                ),
                _ => (ErrorKind::DestinationQueryFailed, "Postgres query failed"),
            },
            sqlx::Error::Io(_) => (ErrorKind::IoError, "Postgres I/O error"),
            sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_) => (
                ErrorKind::DestinationConnectionFailed,
                "Postgres connection failed",
            ),
            _ => (
                ErrorKind::DestinationQueryFailed,
                "Postgres operation failed",
            ),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        SyncError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`BQError`] to [`SyncError`] with the appropriate error kind.
///
/// Authentication problems are mapped to [`ErrorKind::AuthenticationError`],
/// transport problems to [`ErrorKind::SourceConnectionFailed`], and query or
/// data problems to the source-side kinds.
impl From<BQError> for SyncError {
    #[track_caller]
    fn from(err: BQError) -> SyncError {
        let (kind, description) = match &err {
            BQError::InvalidServiceAccountKey(_)
            | BQError::InvalidServiceAccountAuthenticator(_)
            | BQError::AuthError(_)
            | BQError::YupAuthError(_)
            | BQError::NoToken => (
                ErrorKind::AuthenticationError,
                "BigQuery authentication failed",
            ),
            BQError::RequestError(_) | BQError::TonicTransportError(_) => (
                ErrorKind::SourceConnectionFailed,
                "BigQuery request failed",
            ),
            BQError::ResponseError { .. } => {
                (ErrorKind::SourceQueryFailed, "BigQuery response error")
            }
            BQError::InvalidColumnIndex { .. } | BQError::InvalidColumnName { .. } => {
                (ErrorKind::InvalidData, "BigQuery invalid column reference")
            }
            BQError::InvalidColumnType { .. } => {
                (ErrorKind::ConversionError, "BigQuery column type mismatch")
            }
            _ => (ErrorKind::SourceQueryFailed, "BigQuery error"),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        SyncError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts configuration loading failures to [`ErrorKind::ConfigError`].
impl From<config::load::LoadConfigError> for SyncError {
    #[track_caller]
    fn from(err: config::load::LoadConfigError) -> SyncError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SyncError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Configuration loading failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts configuration validation failures to [`ErrorKind::ConfigError`].
impl From<config::shared::ValidationError> for SyncError {
    #[track_caller]
    fn from(err: config::shared::ValidationError) -> SyncError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SyncError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Configuration validation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_constructors_capture_kind_and_detail() {
        let err = SyncError::from((ErrorKind::InvalidData, "bad dataset"));
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert_eq!(err.detail(), None);

        let err = SyncError::from((
            ErrorKind::MissingColumn,
            "column not found",
            "id_regla".to_string(),
        ));
        assert_eq!(err.kind(), ErrorKind::MissingColumn);
        assert_eq!(err.detail(), Some("id_regla"));
    }

    #[test]
    fn display_includes_kind_and_location() {
        let err = SyncError::from((ErrorKind::ConfigError, "missing schema"));
        let rendered = err.to_string();

        assert!(rendered.contains("[ConfigError]"));
        assert!(rendered.contains("missing schema"));
        assert!(rendered.contains("error.rs"));
    }
}
