use serde::Deserialize;

use crate::SerializableSecretString;
use crate::shared::ValidationError;

/// Configuration for the BigQuery rule registry source.
///
/// This intentionally does not implement `Serialize` to avoid accidentally
/// leaking the service account key in serialized forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BigQuerySourceConfig {
    /// Google Cloud project identifier.
    pub project_id: String,
    /// Service account key for authenticating with BigQuery, inline.
    pub service_account_key: Option<SerializableSecretString>,
    /// Path to a service account key file. Used when no inline key is set.
    pub service_account_key_path: Option<String>,
    /// Fully qualified identifier of the rule registry header table.
    pub registry_table: String,
    /// Fully qualified identifier of the rule detail table.
    pub detail_table: String,
    /// Fully qualified identifier of the bulk-load rule feed table.
    pub bulk_load_table: String,
}

impl BigQuerySourceConfig {
    /// Validates the [`BigQuerySourceConfig`].
    ///
    /// Requires credentials in one of the two supported forms and non-empty
    /// table identifiers.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.service_account_key.is_none() && self.service_account_key_path.is_none() {
            return Err(ValidationError::MissingServiceAccountKey);
        }

        if self.registry_table.is_empty() {
            return Err(ValidationError::EmptyIdentifier("registry_table"));
        }
        if self.detail_table.is_empty() {
            return Err(ValidationError::EmptyIdentifier("detail_table"));
        }
        if self.bulk_load_table.is_empty() {
            return Err(ValidationError::EmptyIdentifier("bulk_load_table"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> BigQuerySourceConfig {
        BigQuerySourceConfig {
            project_id: "acme-ops".to_owned(),
            service_account_key: None,
            service_account_key_path: Some("/keys/sa.json".to_owned()),
            registry_table: "acme-ops.rules.registry".to_owned(),
            detail_table: "acme-ops.rules.details".to_owned(),
            bulk_load_table: "acme-ops.rules.bulk_load".to_owned(),
        }
    }

    #[test]
    fn accepts_key_path_credentials() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn rejects_missing_credentials() {
        let mut config = test_config();
        config.service_account_key_path = None;

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingServiceAccountKey)
        ));
    }

    #[test]
    fn rejects_empty_table_identifier() {
        let mut config = test_config();
        config.detail_table = String::new();

        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyIdentifier("detail_table"))
        ));
    }
}
