//! In-memory tabular snapshot of a source result set.
//!
//! Every cell is carried as optional text: identity and date columns are
//! string-typed end to end so no locale or numeric formatting can leak into
//! the grouping keys.

use crate::error::{ErrorKind, SyncResult};
use crate::sync_error;

/// An ordered set of named columns with rows of optional text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Dataset {
    /// Creates an empty dataset with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Returns the column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row. The row must have one cell per column.
    pub fn push_row(&mut self, row: Vec<Option<String>>) -> SyncResult<()> {
        if row.len() != self.columns.len() {
            return Err(sync_error!(
                ErrorKind::InvalidData,
                "Row arity does not match dataset columns",
                format!("expected {} cells, got {}", self.columns.len(), row.len())
            ));
        }

        self.rows.push(row);
        Ok(())
    }

    /// Returns the index of the named column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Returns true when the named column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the cell at `(row, column)`, or `None` when the column does
    /// not exist or the cell is null.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Rewrites every column name through `f`.
    pub fn map_column_names<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for column in &mut self.columns {
            *column = f(column);
        }
    }

    /// Renames a column when it exists. A no-op otherwise.
    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(index) = self.column_index(from) {
            self.columns[index] = to.to_owned();
        }
    }

    /// Adds a column filled with `default` for every existing row.
    ///
    /// A no-op when a column with that name already exists.
    pub fn add_column(&mut self, name: &str, default: Option<String>) {
        if self.has_column(name) {
            return;
        }

        self.columns.push(name.to_owned());
        for row in &mut self.rows {
            row.push(default.clone());
        }
    }

    /// Rewrites every cell of the named column through `f`.
    ///
    /// A no-op when the column does not exist; callers normalize datasets
    /// whose optional columns may be absent.
    pub fn update_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(Option<&str>) -> Option<String>,
    {
        let Some(index) = self.column_index(name) else {
            return;
        };

        for row in &mut self.rows {
            row[index] = f(row[index].as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        let mut dataset = Dataset::new(["cliente", "id_regla"]);
        dataset
            .push_row(vec![Some("ACME".to_owned()), Some("7".to_owned())])
            .unwrap();
        dataset.push_row(vec![None, Some("9".to_owned())]).unwrap();
        dataset
    }

    #[test]
    fn push_row_rejects_arity_mismatch() {
        let mut dataset = dataset();
        let result = dataset.push_row(vec![Some("only-one".to_owned())]);

        assert!(result.is_err());
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn value_resolves_column_by_name() {
        let dataset = dataset();

        assert_eq!(dataset.value(0, "cliente"), Some("ACME"));
        assert_eq!(dataset.value(1, "cliente"), None);
        assert_eq!(dataset.value(0, "missing"), None);
    }

    #[test]
    fn add_column_backfills_existing_rows() {
        let mut dataset = dataset();
        dataset.add_column("fecha_inicio", Some("2024-01-01".to_owned()));

        assert_eq!(dataset.value(1, "fecha_inicio"), Some("2024-01-01"));

        // Adding an existing column is a no-op.
        dataset.add_column("cliente", Some("OTHER".to_owned()));
        assert_eq!(dataset.value(0, "cliente"), Some("ACME"));
    }

    #[test]
    fn update_column_rewrites_cells_in_place() {
        let mut dataset = dataset();
        dataset.update_column("cliente", |cell| {
            Some(cell.unwrap_or("SIN_CLIENTE").to_owned())
        });

        assert_eq!(dataset.value(1, "cliente"), Some("SIN_CLIENTE"));
    }
}
