//! Differencer for comparing a desired schema with the live one.
//!
//! Tables, columns, indexes and foreign keys are matched by name. The
//! result is a raw [`Delta`]; option changes land in
//! [`TableDelta::changed_options`] and are split into actionable and
//! advisory subsets later by [`crate::policy::OptionPolicy`].

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::delta::{
    AddedColumn, ChangedColumn, Delta, OptionChange, OptionChanges, Placement, TableChange,
    TableDelta,
};
use crate::error::{Result, SchemaError};
use crate::normalize::canonicalize;
use crate::options::{OptionKey, OptionValue};
use crate::schema::{ColumnDef, ForeignKeyDef, IndexDef, SchemaSnapshot, TableDef};
use crate::table_options::{expand_options, is_server_reported};

/// Compares schema snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct Differencer;

impl Differencer {
    /// Creates a new differencer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Compares `desired` against `actual` and returns what it would take
    /// to turn `actual` into `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Normalization`] when an option value cannot be
    /// canonicalized.
    pub fn diff(&self, desired: &SchemaSnapshot, actual: &SchemaSnapshot) -> Result<Delta> {
        let mut delta = Delta::new();

        for table in desired.tables() {
            match actual.get_table(&table.name) {
                None => {
                    let mut created = table.clone();
                    created.options = expand_options(&table.options);
                    delta.insert(table.name.clone(), TableChange::Create(created));
                }
                Some(live) => {
                    let table_delta = self.diff_table(table, live)?;
                    if !table_delta.is_empty() {
                        delta.insert(table.name.clone(), TableChange::Alter(table_delta));
                    }
                }
            }
        }

        for table in actual.tables() {
            if desired.get_table(&table.name).is_none() {
                delta.insert(table.name.clone(), TableChange::Drop(table.clone()));
            }
        }

        debug!(tables = delta.len(), "Computed schema delta");
        Ok(delta)
    }

    /// Compares two versions of one table.
    fn diff_table(&self, desired: &TableDef, actual: &TableDef) -> Result<TableDelta> {
        let mut delta = TableDelta::default();

        self.diff_columns(desired, actual, &mut delta);

        let (added, mut removed) =
            diff_by_name(&desired.indexes, &actual.indexes, |i| &i.name, |a, b| a == b);
        removed.retain(|index| !backs_kept_foreign_key(index, desired, actual));
        delta.added_indexes = added;
        delta.removed_indexes = removed;

        let (added, removed) = diff_by_name(
            &desired.foreign_keys,
            &actual.foreign_keys,
            |fk| &fk.name,
            ForeignKeyDef::same_definition,
        );
        delta.added_foreign_keys = added;
        delta.removed_foreign_keys = removed;

        delta.changed_options = self.diff_options(desired, actual)?;

        Ok(delta)
    }

    /// Compares columns attribute by attribute and detects reordering.
    ///
    /// When the columns present on both sides appear in a different
    /// relative order, every shared column from the first mismatch onward
    /// gets a placement, so replaying them in desired order rebuilds the
    /// desired layout.
    fn diff_columns(&self, desired: &TableDef, actual: &TableDef, delta: &mut TableDelta) {
        let actual_cols: HashMap<&str, &ColumnDef> =
            actual.columns.iter().map(|c| (c.name.as_str(), c)).collect();
        let desired_names: HashSet<&str> =
            desired.columns.iter().map(|c| c.name.as_str()).collect();

        let shared_desired: Vec<&str> = desired
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| actual_cols.contains_key(name))
            .collect();
        let shared_actual: Vec<&str> = actual
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| desired_names.contains(name))
            .collect();
        let first_moved = shared_desired
            .iter()
            .zip(&shared_actual)
            .position(|(a, b)| a != b);
        let moved: HashSet<&str> = first_moved
            .map(|start| shared_desired[start..].iter().copied().collect())
            .unwrap_or_default();

        for (index, column) in desired.columns.iter().enumerate() {
            let placement = Placement::for_index(&desired.columns, index);
            match actual_cols.get(column.name.as_str()) {
                None => delta.added_columns.push(AddedColumn {
                    column: column.clone(),
                    placement,
                }),
                Some(live) => {
                    let fields = live.changed_fields(column);
                    let is_moved = moved.contains(column.name.as_str());
                    if !fields.is_empty() || is_moved {
                        delta.changed_columns.push(ChangedColumn {
                            from: (*live).clone(),
                            to: column.clone(),
                            fields,
                            placement: is_moved.then_some(placement),
                        });
                    }
                }
            }
        }

        delta.removed_columns = actual
            .columns
            .iter()
            .filter(|c| !desired_names.contains(c.name.as_str()))
            .cloned()
            .collect();
    }

    /// Compares options after canonicalization. The change keeps the raw
    /// values for display.
    ///
    /// Raw `options` text is split into keys on both sides first. Engine,
    /// charset and collation are only compared when declared, since the
    /// server reports them for every table.
    fn diff_options(&self, desired: &TableDef, actual: &TableDef) -> Result<OptionChanges> {
        let desired_options = expand_options(&desired.options);
        let actual_options = expand_options(&actual.options);
        let keys: BTreeSet<&OptionKey> = desired_options
            .keys()
            .chain(actual_options.keys())
            .filter(|key| !is_server_reported(key) || desired_options.contains_key(*key))
            .collect();

        let mut changes = OptionChanges::new();
        for key in keys {
            let to = desired_options.get(key);
            let from = actual_options.get(key);

            let canonical = |value: Option<&OptionValue>| {
                value
                    .map(|v| canonicalize(key, v))
                    .transpose()
                    .map_err(|e| SchemaError::Normalization {
                        table: desired.name.clone(),
                        option: key.name().to_string(),
                        message: e.to_string(),
                    })
            };

            if canonical(from)? != canonical(to)? {
                changes.insert(
                    key.clone(),
                    OptionChange {
                        from: from.cloned(),
                        to: to.cloned(),
                    },
                );
            }
        }
        Ok(changes)
    }
}

/// Returns whether `index` is the one InnoDB created for a foreign key
/// that stays in place: named after the constraint, on exactly its
/// columns, and not declared itself.
fn backs_kept_foreign_key(index: &IndexDef, desired: &TableDef, actual: &TableDef) -> bool {
    let backs = |table: &TableDef| {
        table
            .get_foreign_key(&index.name)
            .is_some_and(|fk| fk.columns == index.columns)
    };
    desired.get_index(&index.name).is_none() && backs(actual) && backs(desired)
}

/// Matches items by name. Items whose definition changed are reported as
/// removed and added again.
fn diff_by_name<T, N, S>(desired: &[T], actual: &[T], name: N, same: S) -> (Vec<T>, Vec<T>)
where
    T: Clone,
    N: Fn(&T) -> &String,
    S: Fn(&T, &T) -> bool,
{
    let actual_map: HashMap<&String, &T> = actual.iter().map(|item| (name(item), item)).collect();
    let desired_map: HashMap<&String, &T> =
        desired.iter().map(|item| (name(item), item)).collect();

    let added = desired
        .iter()
        .filter(|item| {
            actual_map
                .get(name(item))
                .map_or(true, |live| !same(item, live))
        })
        .cloned()
        .collect();

    let removed = actual
        .iter()
        .filter(|item| {
            desired_map
                .get(name(item))
                .map_or(true, |wanted| !same(wanted, item))
        })
        .cloned()
        .collect();

    (added, removed)
}
