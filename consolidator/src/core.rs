//! The consolidation run: configuration, source snapshots, aggregation and
//! the reconciliation protocol, folded into a classified run report.

use chrono::Utc;
use config::load::load_config;
use config::shared::{BigQuerySourceConfig, ConsolidatorConfig};
use rulesync::aggregate::{aggregate, aggregate_flat, apply_client_default, finalize, merge};
use rulesync::error::{ErrorKind, SyncResult};
use rulesync::normalize::{
    CLIENT_COLUMN, END_DATE_COLUMN, RECORD_ID_COLUMN, RECORD_REF_COLUMN, RULE_ID_COLUMN,
    START_DATE_COLUMN, canonicalize_snapshot,
};
use rulesync::report::RunReport;
use rulesync::source::BigQuerySource;
use rulesync::sync::{RuleStore, SyncSummary};
use rulesync::sync_error;
use tracing::info;

/// Grouping key columns, in (client, start, end) order.
const GROUP_KEYS: [&str; 3] = [CLIENT_COLUMN, START_DATE_COLUMN, END_DATE_COLUMN];

/// Runs the consolidation once and classifies the outcome.
///
/// Never panics on run failures; every error is folded into the returned
/// [`RunReport`] so the caller can log it and exit accordingly.
pub async fn start_consolidator() -> RunReport {
    let started_at = Utc::now();
    let result = run().await;

    RunReport::classify(started_at, &result)
}

async fn run() -> SyncResult<SyncSummary> {
    let config: ConsolidatorConfig = load_config()?;
    config.validate()?;

    info!(project = %config.source.project_id, "connecting to the BigQuery source");
    let source = build_source(&config.source).await?;

    info!("fetching source snapshots");
    let mut headers = source.fetch_table(&config.source.registry_table).await?;
    let mut details = source.fetch_table(&config.source.detail_table).await?;
    let mut bulk = source.fetch_table(&config.source.bulk_load_table).await?;

    info!("normalizing snapshots");
    canonicalize_snapshot(&mut headers);
    canonicalize_snapshot(&mut details);
    canonicalize_snapshot(&mut bulk);
    apply_client_default(&mut bulk);

    info!("aggregating rule sets");
    let registry_sets = aggregate(
        &headers,
        &details,
        RECORD_ID_COLUMN,
        RECORD_REF_COLUMN,
        &GROUP_KEYS,
        RULE_ID_COLUMN,
    )?;
    let bulk_sets = aggregate_flat(&bulk, &GROUP_KEYS, RULE_ID_COLUMN)?;

    let mut rule_sets = merge([registry_sets, bulk_sets]);
    finalize(&mut rule_sets);
    info!(rule_sets = rule_sets.len(), "aggregation complete");

    info!(
        host = %config.destination.postgres.host,
        database = %config.destination.postgres.name,
        "connecting to the operational store"
    );
    let store = RuleStore::connect(&config.destination.postgres, &config.destination.tables)
        .await?;

    let result = store.apply(&rule_sets).await;

    // The pool is released on success and failure alike.
    store.close().await;

    result
}

async fn build_source(config: &BigQuerySourceConfig) -> SyncResult<BigQuerySource> {
    if let Some(key) = &config.service_account_key {
        return BigQuerySource::new_with_key(config.project_id.clone(), key.expose_secret()).await;
    }

    if let Some(path) = &config.service_account_key_path {
        return BigQuerySource::new_with_key_path(config.project_id.clone(), path).await;
    }

    Err(sync_error!(
        ErrorKind::ConfigError,
        "No BigQuery credentials configured"
    ))
}
