//! Staging-then-upsert reconciliation against the operational store.
//!
//! The protocol is strictly sequential and cumulative: the staging clear
//! auto-commits on its own, every later step runs in its own transaction,
//! and a failure aborts the remainder without rolling back committed steps.
//! Every step is idempotent for a fixed input snapshot, so the recovery path
//! after a mid-protocol failure is re-running the job from the start.

use config::shared::{PgConnectionConfig, RuleStoreConfig};
use pg_escape::quote_identifier;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::aggregate::RuleSet;
use crate::error::SyncResult;
use crate::normalize::{CLIENT_COLUMN, END_DATE_COLUMN, RULES_COLUMN, START_DATE_COLUMN};

/// Timestamp column of the backup table.
const BACKUP_TIMESTAMP_COLUMN: &str = "fecha_respaldo";

/// Per-step row counts reported by [`RuleStore::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    /// Rows loaded into staging.
    pub staged: u64,
    /// Duplicate staging rows removed.
    pub staging_duplicates_removed: u64,
    /// Empty-rule staging rows removed.
    pub staging_empty_removed: u64,
    /// Target rows overwritten from staging.
    pub updated: u64,
    /// Staging rows inserted into the target.
    pub inserted: u64,
    /// Duplicate target rows removed.
    pub target_duplicates_removed: u64,
    /// Empty-rule target rows removed.
    pub target_empty_removed: u64,
    /// Staging rows appended to the backup table.
    pub backed_up: u64,
}

/// Handle to the operational store: a connection pool plus the qualified
/// names of the staging, target and backup tables.
pub struct RuleStore {
    pool: PgPool,
    staging: String,
    target: String,
    backup: String,
}

impl RuleStore {
    /// Connects to the operational store.
    pub async fn connect(
        connection: &PgConnectionConfig,
        tables: &RuleStoreConfig,
    ) -> SyncResult<RuleStore> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(connection.with_db())
            .await?;

        Ok(RuleStore {
            pool,
            staging: qualified_name(&tables.schema, &tables.staging_table),
            target: qualified_name(&tables.schema, &tables.target_table),
            backup: qualified_name(&tables.schema, &tables.backup_table),
        })
    }

    /// Runs the full reconciliation protocol for the given rule sets.
    pub async fn apply(&self, sets: &[RuleSet]) -> SyncResult<SyncSummary> {
        let mut summary = SyncSummary::default();

        info!(table = %self.staging, "clearing staging table");
        self.clear_staging().await?;

        info!(table = %self.staging, rows = sets.len(), "loading staging table");
        summary.staged = self.load_staging(sets).await?;

        info!(table = %self.staging, "removing duplicate staging rows");
        summary.staging_duplicates_removed =
            self.execute_step(&dedupe_statement(&self.staging)).await?;

        info!(table = %self.staging, "removing empty-rule staging rows");
        summary.staging_empty_removed = self
            .execute_step(&purge_empty_statement(&self.staging))
            .await?;

        info!(table = %self.target, "updating existing target rows");
        summary.updated = self
            .execute_step(&update_existing_statement(&self.target, &self.staging))
            .await?;

        info!(table = %self.target, "inserting missing target rows");
        summary.inserted = self
            .execute_step(&insert_missing_statement(&self.target, &self.staging))
            .await?;

        info!(table = %self.target, "removing duplicate target rows");
        summary.target_duplicates_removed =
            self.execute_step(&dedupe_statement(&self.target)).await?;

        info!(table = %self.target, "removing empty-rule target rows");
        summary.target_empty_removed = self
            .execute_step(&purge_empty_statement(&self.target))
            .await?;

        info!(table = %self.backup, "appending staging snapshot to backup");
        summary.backed_up = self
            .execute_step(&snapshot_backup_statement(&self.backup, &self.staging))
            .await?;

        Ok(summary)
    }

    /// Closes the connection pool.
    ///
    /// Called on every exit path of the run, success or failure.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Clears the staging table outside any multi-statement transaction, so a
    /// failure leaves it fully cleared or untouched.
    async fn clear_staging(&self) -> SyncResult<()> {
        sqlx::query(&truncate_statement(&self.staging))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Loads all rule sets into staging within a single transaction.
    async fn load_staging(&self, sets: &[RuleSet]) -> SyncResult<u64> {
        let statement = insert_staging_statement(&self.staging);
        let mut tx = self.pool.begin().await?;

        for set in sets {
            sqlx::query(&statement)
                .bind(set.key.client.as_deref())
                .bind(set.key.start_date.as_deref())
                .bind(set.key.end_date.as_deref())
                .bind(set.rules.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        Ok(sets.len() as u64)
    }

    /// Runs one protocol step in its own transaction and returns the number
    /// of affected rows.
    async fn execute_step(&self, statement: &str) -> SyncResult<u64> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(statement).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

/// Builds the schema-qualified, quoted name of a table.
fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

fn truncate_statement(staging: &str) -> String {
    format!("TRUNCATE TABLE {staging}")
}

fn insert_staging_statement(staging: &str) -> String {
    format!(
        "INSERT INTO {staging} ({CLIENT_COLUMN}, {START_DATE_COLUMN}, {END_DATE_COLUMN}, {RULES_COLUMN}) \
         VALUES ($1, $2, $3, $4)"
    )
}

/// Deletes all but one row per grouping key.
///
/// `PARTITION BY` treats null key components as equal, matching the
/// null-aware grouping of the aggregation. The survivor is the row with the
/// most rule tokens, then the lexically greatest rule list.
fn dedupe_statement(table: &str) -> String {
    format!(
        "WITH ranked AS ( \
             SELECT ctid, \
                    ROW_NUMBER() OVER ( \
                        PARTITION BY {CLIENT_COLUMN}, {START_DATE_COLUMN}, {END_DATE_COLUMN} \
                        ORDER BY array_length(string_to_array({RULES_COLUMN}, ','), 1) DESC NULLS LAST, \
                                 {RULES_COLUMN} DESC \
                    ) AS rn \
             FROM {table} \
         ) \
         DELETE FROM {table} \
         WHERE ctid IN (SELECT ctid FROM ranked WHERE rn > 1)"
    )
}

fn purge_empty_statement(table: &str) -> String {
    format!("DELETE FROM {table} WHERE {RULES_COLUMN} = ''")
}

/// Overwrites the rule list of every target row whose key matches a staging
/// row. Keys match null-aware: a null component pairs with a null component.
fn update_existing_statement(target: &str, staging: &str) -> String {
    format!(
        "UPDATE {target} AS p \
         SET {RULES_COLUMN} = s.{RULES_COLUMN} \
         FROM {staging} AS s \
         WHERE p.{CLIENT_COLUMN} IS NOT DISTINCT FROM s.{CLIENT_COLUMN} \
           AND p.{START_DATE_COLUMN} IS NOT DISTINCT FROM s.{START_DATE_COLUMN} \
           AND p.{END_DATE_COLUMN} IS NOT DISTINCT FROM s.{END_DATE_COLUMN}"
    )
}

/// Inserts staging rows that have no key match in the target.
///
/// The anti-join test is on `ctid`, which is non-null for every matched
/// row even when the key components themselves are null.
fn insert_missing_statement(target: &str, staging: &str) -> String {
    format!(
        "INSERT INTO {target} ({CLIENT_COLUMN}, {RULES_COLUMN}, {START_DATE_COLUMN}, {END_DATE_COLUMN}) \
         SELECT s.{CLIENT_COLUMN}, s.{RULES_COLUMN}, s.{START_DATE_COLUMN}, s.{END_DATE_COLUMN} \
         FROM {staging} AS s \
         LEFT JOIN {target} AS p \
           ON p.{CLIENT_COLUMN} IS NOT DISTINCT FROM s.{CLIENT_COLUMN} \
          AND p.{START_DATE_COLUMN} IS NOT DISTINCT FROM s.{START_DATE_COLUMN} \
          AND p.{END_DATE_COLUMN} IS NOT DISTINCT FROM s.{END_DATE_COLUMN} \
         WHERE p.ctid IS NULL"
    )
}

/// Appends the current staging content to the backup table, stamping every
/// row with the wall-clock time of the backup operation.
fn snapshot_backup_statement(backup: &str, staging: &str) -> String {
    format!(
        "INSERT INTO {backup} ({CLIENT_COLUMN}, {RULES_COLUMN}, {START_DATE_COLUMN}, {END_DATE_COLUMN}, {BACKUP_TIMESTAMP_COLUMN}) \
         SELECT s.{CLIENT_COLUMN}, s.{RULES_COLUMN}, s.{START_DATE_COLUMN}, s.{END_DATE_COLUMN}, NOW() \
         FROM {staging} AS s"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGING: &str = "fullfill.clientes_reglas_staging";
    const TARGET: &str = "fullfill.clientes_reglas";

    #[test]
    fn qualified_names_are_quoted_only_when_needed() {
        assert_eq!(qualified_name("fullfill", "clientes_reglas"), "fullfill.clientes_reglas");
        assert_eq!(
            qualified_name("Full Fill", "clientes reglas"),
            "\"Full Fill\".\"clientes reglas\""
        );
    }

    #[test]
    fn dedupe_keeps_the_richest_rule_set() {
        let statement = dedupe_statement(STAGING);

        assert!(statement.contains("PARTITION BY cliente, fecha_inicio, fecha_fin"));
        assert!(statement.contains("array_length(string_to_array(reglas, ','), 1) DESC"));
        assert!(statement.contains("WHERE rn > 1"));
    }

    #[test]
    fn key_matching_is_null_aware() {
        let update = update_existing_statement(TARGET, STAGING);
        let insert = insert_missing_statement(TARGET, STAGING);

        assert_eq!(update.matches("IS NOT DISTINCT FROM").count(), 3);
        assert_eq!(insert.matches("IS NOT DISTINCT FROM").count(), 3);
        assert!(insert.contains("WHERE p.ctid IS NULL"));
    }

    #[test]
    fn purge_removes_only_empty_rule_rows() {
        assert_eq!(
            purge_empty_statement(TARGET),
            "DELETE FROM fullfill.clientes_reglas WHERE reglas = ''"
        );
    }

    #[test]
    fn backup_snapshot_is_timestamped() {
        let statement = snapshot_backup_statement("fullfill.clientes_reglas_respaldo", STAGING);

        assert!(statement.contains("fecha_respaldo"));
        assert!(statement.contains("NOW()"));
    }

    #[test]
    fn statements_are_deterministic_for_a_fixed_store() {
        assert_eq!(dedupe_statement(STAGING), dedupe_statement(STAGING));
        assert_eq!(
            insert_missing_statement(TARGET, STAGING),
            insert_missing_statement(TARGET, STAGING)
        );
    }
}
