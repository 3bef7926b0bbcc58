//! Key normalization for heterogeneous source snapshots.
//!
//! The three source tables disagree on column casing, carry a legacy name for
//! the end-date column, and render missing dates as a handful of sentinel
//! strings. Everything here is a pure function over a [`Dataset`]; missing
//! optional columns are skipped, never an error.

use crate::dataset::Dataset;

/// Join identity column of the rule registry header table.
pub const RECORD_ID_COLUMN: &str = "id_registro";
/// Foreign reference column of the rule detail table.
pub const RECORD_REF_COLUMN: &str = "id_registro_ref";
/// Client grouping column.
pub const CLIENT_COLUMN: &str = "cliente";
/// Period start grouping column.
pub const START_DATE_COLUMN: &str = "fecha_inicio";
/// Period end grouping column.
pub const END_DATE_COLUMN: &str = "fecha_fin";
/// Legacy alias for [`END_DATE_COLUMN`] still emitted by older feeds.
pub const LEGACY_END_DATE_COLUMN: &str = "fecha_termino";
/// Rule identifier column in the detail and bulk-load tables.
pub const RULE_ID_COLUMN: &str = "id_regla";
/// Consolidated rule-list column in the operational tables.
pub const RULES_COLUMN: &str = "reglas";

/// Values that stand for null in text columns and must never be persisted.
const NULL_SENTINELS: &[&str] = &["", "nan", "NaN", "None"];

/// Returns true when `value` is one of the textual null sentinels.
pub fn is_null_sentinel(value: &str) -> bool {
    NULL_SENTINELS.contains(&value)
}

/// Trims and lowercases column names and folds the legacy end-date column
/// into its canonical name.
pub fn canonicalize_columns(dataset: &mut Dataset) {
    dataset.map_column_names(|name| name.trim().to_lowercase());
    dataset.rename_column(LEGACY_END_DATE_COLUMN, END_DATE_COLUMN);
}

/// Replaces textual null sentinels with true nulls in the named columns.
///
/// Columns that do not exist in the dataset are skipped.
pub fn scrub_null_sentinels(dataset: &mut Dataset, columns: &[&str]) {
    for column in columns {
        dataset.update_column(column, |cell| match cell {
            Some(value) if is_null_sentinel(value) => None,
            other => other.map(str::to_owned),
        });
    }
}

/// Canonicalizes one source snapshot: column names, legacy renames, and
/// null sentinels in the date columns.
pub fn canonicalize_snapshot(dataset: &mut Dataset) {
    canonicalize_columns(dataset);
    scrub_null_sentinels(dataset, &[START_DATE_COLUMN, END_DATE_COLUMN]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_are_trimmed_and_lowercased() {
        let mut dataset = Dataset::new([" Cliente ", "FECHA_INICIO"]);
        canonicalize_columns(&mut dataset);

        assert_eq!(dataset.columns(), ["cliente", "fecha_inicio"]);
    }

    #[test]
    fn legacy_end_date_column_is_renamed() {
        let mut dataset = Dataset::new(["cliente", "Fecha_Termino"]);
        canonicalize_columns(&mut dataset);

        assert!(dataset.has_column(END_DATE_COLUMN));
        assert!(!dataset.has_column(LEGACY_END_DATE_COLUMN));
    }

    #[test]
    fn null_sentinels_become_true_nulls() {
        let mut dataset = Dataset::new(["fecha_inicio"]);
        for value in ["", "nan", "NaN", "None", "x"] {
            dataset.push_row(vec![Some(value.to_owned())]).unwrap();
        }

        scrub_null_sentinels(&mut dataset, &[START_DATE_COLUMN]);

        let cells: Vec<_> = (0..dataset.len())
            .map(|row| dataset.value(row, START_DATE_COLUMN))
            .collect();
        assert_eq!(cells, [None, None, None, None, Some("x")]);
    }

    #[test]
    fn scrubbing_a_missing_column_is_a_no_op() {
        let mut dataset = Dataset::new(["id_regla"]);
        dataset.push_row(vec![Some("1".to_owned())]).unwrap();

        scrub_null_sentinels(&mut dataset, &[START_DATE_COLUMN]);

        assert_eq!(dataset.value(0, RULE_ID_COLUMN), Some("1"));
    }
}
