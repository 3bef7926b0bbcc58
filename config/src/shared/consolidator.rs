use serde::Deserialize;

use crate::shared::{BigQuerySourceConfig, PgConnectionConfig, RuleStoreConfig, ValidationError};

/// Destination side of the job: the Postgres connection plus the table names
/// the sync protocol operates on.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DestinationConfig {
    /// Connection parameters for the operational Postgres store.
    pub postgres: PgConnectionConfig,
    /// Staging, target and backup table names.
    pub tables: RuleStoreConfig,
}

/// Top-level configuration for the consolidator binary.
///
/// This intentionally does not implement `Serialize` to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConsolidatorConfig {
    /// BigQuery source tables and credentials.
    pub source: BigQuerySourceConfig,
    /// Postgres destination and table names.
    pub destination: DestinationConfig,
}

impl ConsolidatorConfig {
    /// Validates the whole configuration, failing on the first offending part.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.source.validate()?;
        self.destination.postgres.tls.validate()?;
        self.destination.tables.validate()?;

        Ok(())
    }
}
