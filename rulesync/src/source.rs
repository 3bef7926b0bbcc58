//! BigQuery source client for the rule registry snapshots.

use gcp_bigquery_client::Client;
use gcp_bigquery_client::client_builder::ClientBuilder;
use gcp_bigquery_client::error::BQError;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::ResultSet;
use gcp_bigquery_client::yup_oauth2::parse_service_account_key;
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;

/// Client for reading full-table snapshots out of the BigQuery rule registry.
pub struct BigQuerySource {
    project_id: String,
    client: Client,
}

impl BigQuerySource {
    /// Creates a source authenticated from a service account key file.
    pub async fn new_with_key_path(
        project_id: String,
        sa_key_file: &str,
    ) -> SyncResult<BigQuerySource> {
        let client = ClientBuilder::new()
            .build_from_service_account_key_file(sa_key_file)
            .await?;

        Ok(BigQuerySource { project_id, client })
    }

    /// Creates a source authenticated from inline service account key JSON.
    pub async fn new_with_key(project_id: String, sa_key: &str) -> SyncResult<BigQuerySource> {
        let sa_key = parse_service_account_key(sa_key).map_err(BQError::from)?;
        let client = ClientBuilder::new()
            .build_from_service_account_key(sa_key, false)
            .await?;

        Ok(BigQuerySource { project_id, client })
    }

    /// Fetches the full content of a table as a [`Dataset`].
    ///
    /// Every cell is read as optional text; identity and date columns reach
    /// the aggregation as strings regardless of their source type.
    pub async fn fetch_table(&self, table_id: &str) -> SyncResult<Dataset> {
        let table = sanitize_identifier(table_id, "BigQuery table identifier")?;
        let query = format!("SELECT * FROM `{table}`");

        let query_response = self
            .client
            .job()
            .query(&self.project_id, QueryRequest::new(query))
            .await?;
        let mut result_set = ResultSet::new_from_query_response(query_response);

        let columns = result_set.column_names();
        let mut dataset = Dataset::new(columns.clone());

        while result_set.next_row() {
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                row.push(result_set.get_string_by_name(column)?);
            }
            dataset.push_row(row)?;
        }

        info!(table = table_id, rows = dataset.len(), "fetched source snapshot");

        Ok(dataset)
    }
}

/// Sanitizes a BigQuery identifier for safe backtick quoting.
///
/// Rejects empty identifiers and identifiers containing control characters.
/// Backticks and backslashes are escaped per GoogleSQL lexical rules so the
/// value can be wrapped in backticks without allowing statement breaks.
fn sanitize_identifier(identifier: &str, context: &str) -> SyncResult<String> {
    if identifier.is_empty() {
        return Err(sync_error!(
            ErrorKind::InvalidData,
            "Invalid BigQuery identifier",
            format!("{context} cannot be empty")
        ));
    }

    if identifier.chars().any(char::is_control) {
        return Err(sync_error!(
            ErrorKind::InvalidData,
            "Invalid BigQuery identifier",
            format!("{context} contains control characters")
        ));
    }

    let mut escaped = String::with_capacity(identifier.len());
    for ch in identifier.chars() {
        match ch {
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            _ => escaped.push(ch),
        }
    }

    Ok(escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_empty_identifier() {
        assert!(sanitize_identifier("", "table").is_err());
    }

    #[test]
    fn sanitize_rejects_control_characters() {
        assert!(sanitize_identifier("rules\ntable", "table").is_err());
    }

    #[test]
    fn sanitize_escapes_backticks_and_backslashes() {
        let escaped = sanitize_identifier("a`b\\c", "table").unwrap();
        assert_eq!(escaped, "a\\`b\\\\c");
    }

    #[test]
    fn sanitize_passes_qualified_table_ids_through() {
        let escaped = sanitize_identifier("acme-ops.rules.registry", "table").unwrap();
        assert_eq!(escaped, "acme-ops.rules.registry");
    }
}
