//! Rule aggregation: joining, grouping and merging rule identifiers.
//!
//! Two independent streams feed the aggregation: the registry header table
//! joined to its detail table, and the bulk-load feed which already has the
//! joined shape. Both fold into one row per (client, start, end) group; the
//! final merge unions the two streams' rule sets per group.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::dataset::Dataset;
use crate::error::{ErrorKind, SyncResult};
use crate::normalize::{CLIENT_COLUMN, is_null_sentinel};
use crate::ordering::compare_rule_ids;
use crate::sync_error;

/// Client value recorded for bulk-load rows that carry no client.
pub const MISSING_CLIENT_SENTINEL: &str = "SIN_CLIENTE";

/// The (client, start, end) triple identifying one rule-set bucket.
///
/// Null components are legitimate grouping values: two rows with a null end
/// date and otherwise equal keys belong to the same bucket, and a null never
/// matches a non-null.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub client: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// One consolidated rule set: a grouping key and the comma-joined, naturally
/// sorted rule identifiers applying to it. `rules` is empty, never null,
/// when no rules apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub key: GroupKey,
    pub rules: String,
}

/// Aggregates the registry header and detail tables into one rule set per
/// grouping key.
///
/// Performs a left outer join of `headers` to `details` on
/// `join_left = join_right` (header rows without details are retained and
/// yield empty rule sets), groups the joined rows null-aware by `group_keys`
/// (client, start, end), and folds each group's non-null rule identifiers
/// into a sorted comma-joined string. Duplicates survive this stage; the
/// final [`merge`] removes them.
///
/// Null join keys never match, mirroring the join semantics of the
/// analytical store the snapshots come from.
pub fn aggregate(
    headers: &Dataset,
    details: &Dataset,
    join_left: &str,
    join_right: &str,
    group_keys: &[&str; 3],
    rule_column: &str,
) -> SyncResult<Vec<RuleSet>> {
    require_columns(headers, &[join_left])?;
    require_columns(headers, group_keys)?;
    require_columns(details, &[join_right, rule_column])?;

    // Index detail rows by join key; null keys are unmatchable.
    let mut details_by_key: HashMap<&str, Vec<usize>> = HashMap::new();
    for row in 0..details.len() {
        if let Some(key) = details.value(row, join_right) {
            details_by_key.entry(key).or_default().push(row);
        }
    }

    let mut groups: BTreeMap<GroupKey, Vec<String>> = BTreeMap::new();
    for row in 0..headers.len() {
        let key = group_key_of(headers, row, group_keys);
        let rules = groups.entry(key).or_default();

        let Some(join_value) = headers.value(row, join_left) else {
            continue;
        };
        let Some(matches) = details_by_key.get(join_value) else {
            continue;
        };

        for &detail_row in matches {
            if let Some(rule) = details.value(detail_row, rule_column) {
                rules.push(rule.to_owned());
            }
        }
    }

    Ok(fold_groups(groups))
}

/// Aggregates a feed that already has the joined shape (one rule per row)
/// into one rule set per grouping key.
pub fn aggregate_flat(
    dataset: &Dataset,
    group_keys: &[&str; 3],
    rule_column: &str,
) -> SyncResult<Vec<RuleSet>> {
    require_columns(dataset, group_keys)?;
    require_columns(dataset, &[rule_column])?;

    let mut groups: BTreeMap<GroupKey, Vec<String>> = BTreeMap::new();
    for row in 0..dataset.len() {
        let key = group_key_of(dataset, row, group_keys);
        let rules = groups.entry(key).or_default();

        if let Some(rule) = dataset.value(row, rule_column) {
            rules.push(rule.to_owned());
        }
    }

    Ok(fold_groups(groups))
}

/// Fills the bulk-load feed's client column with [`MISSING_CLIENT_SENTINEL`],
/// creating the column when the feed omits it entirely.
pub fn apply_client_default(dataset: &mut Dataset) {
    dataset.add_column(CLIENT_COLUMN, Some(MISSING_CLIENT_SENTINEL.to_owned()));
    dataset.update_column(CLIENT_COLUMN, |cell| {
        Some(cell.unwrap_or(MISSING_CLIENT_SENTINEL).to_owned())
    });
}

/// Merges rule-set streams sharing the same grouping semantics.
///
/// Re-groups all rows by key, splits every member's `rules` on commas, unions
/// the tokens (dropping empty tokens produced by concatenating empty
/// members), sorts with the natural comparator and rejoins. Merging a result
/// with itself is a content no-op.
pub fn merge<I>(streams: I) -> Vec<RuleSet>
where
    I: IntoIterator<Item = Vec<RuleSet>>,
{
    let mut groups: BTreeMap<GroupKey, BTreeSet<String>> = BTreeMap::new();

    for stream in streams {
        for set in stream {
            let tokens = groups.entry(set.key).or_default();
            for token in set.rules.split(',') {
                if !token.is_empty() {
                    tokens.insert(token.to_owned());
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, tokens)| {
            let mut tokens: Vec<String> = tokens.into_iter().collect();
            tokens.sort_by(|a, b| compare_rule_ids(a, b));

            RuleSet {
                key,
                rules: tokens.join(","),
            }
        })
        .collect()
}

/// Post-processing after the final merge: group keys that picked up a
/// textual null sentinel on their way through text coercion become true
/// nulls. `rules` is a `String` by construction and stays non-null.
pub fn finalize(sets: &mut [RuleSet]) {
    for set in sets {
        scrub_key_component(&mut set.key.client);
        scrub_key_component(&mut set.key.start_date);
        scrub_key_component(&mut set.key.end_date);
    }
}

fn scrub_key_component(component: &mut Option<String>) {
    if component.as_deref().is_some_and(is_null_sentinel) {
        *component = None;
    }
}

fn group_key_of(dataset: &Dataset, row: usize, group_keys: &[&str; 3]) -> GroupKey {
    GroupKey {
        client: dataset.value(row, group_keys[0]).map(str::to_owned),
        start_date: dataset.value(row, group_keys[1]).map(str::to_owned),
        end_date: dataset.value(row, group_keys[2]).map(str::to_owned),
    }
}

fn fold_groups(groups: BTreeMap<GroupKey, Vec<String>>) -> Vec<RuleSet> {
    groups
        .into_iter()
        .map(|(key, mut rules)| {
            rules.sort_by(|a, b| compare_rule_ids(a, b));

            RuleSet {
                key,
                rules: rules.join(","),
            }
        })
        .collect()
}

fn require_columns(dataset: &Dataset, columns: &[&str]) -> SyncResult<()> {
    for column in columns {
        if !dataset.has_column(column) {
            return Err(sync_error!(
                ErrorKind::MissingColumn,
                "Dataset is missing a required column",
                (*column).to_string()
            ));
        }
    }

    Ok(())
}
