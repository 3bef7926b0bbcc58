use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Names of the operational tables the sync protocol writes to.
///
/// All three tables live in the same schema and share the rule-set row shape;
/// the backup table additionally carries the snapshot timestamp column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RuleStoreConfig {
    /// Schema containing the staging, target and backup tables.
    pub schema: String,
    /// Transient landing table for newly computed rule sets.
    pub staging_table: String,
    /// Operational table holding the reconciled rule sets.
    pub target_table: String,
    /// Append-only table accumulating one staging snapshot per run.
    pub backup_table: String,
}

impl RuleStoreConfig {
    /// Validates the [`RuleStoreConfig`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema.is_empty() {
            return Err(ValidationError::EmptyIdentifier("schema"));
        }
        if self.staging_table.is_empty() {
            return Err(ValidationError::EmptyIdentifier("staging_table"));
        }
        if self.target_table.is_empty() {
            return Err(ValidationError::EmptyIdentifier("target_table"));
        }
        if self.backup_table.is_empty() {
            return Err(ValidationError::EmptyIdentifier("backup_table"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_schema() {
        let config = RuleStoreConfig {
            schema: String::new(),
            staging_table: "clientes_reglas_staging".to_owned(),
            target_table: "clientes_reglas".to_owned(),
            backup_table: "clientes_reglas_respaldo".to_owned(),
        };

        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyIdentifier("schema"))
        ));
    }
}
