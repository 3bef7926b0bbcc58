//! Consolidation of client business-rule assignments.
//!
//! This crate reads three full-table snapshots from a BigQuery rule registry
//! (header, detail and bulk-load tables), normalizes their keys, folds them
//! into one deduplicated rule set per (client, start, end) grouping key, and
//! reconciles the result into a Postgres operational store through a
//! staging-then-upsert protocol that is safe to re-run and appends a
//! timestamped snapshot to a backup table on every run.
//!
//! # Architecture
//!
//! The pipeline is a straight line: [`source::BigQuerySource`] produces
//! [`dataset::Dataset`] snapshots; [`normalize`] canonicalizes columns and
//! null sentinels; [`aggregate`] joins, groups and merges the rule sets;
//! [`sync::RuleStore`] applies the nine-step reconciliation protocol; and
//! [`report::RunReport`] classifies the terminal outcome for the operator.

pub mod aggregate;
pub mod dataset;
pub mod error;
mod macros;
pub mod normalize;
pub mod ordering;
pub mod report;
pub mod source;
pub mod sync;

pub use aggregate::{GroupKey, RuleSet};
pub use dataset::Dataset;
pub use error::{ErrorKind, SyncError, SyncResult};
pub use report::{RunOutcome, RunReport};
pub use source::BigQuerySource;
pub use sync::{RuleStore, SyncSummary};
