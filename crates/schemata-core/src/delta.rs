//! Structured difference between two schema snapshots.

use std::collections::BTreeMap;
use std::fmt;

use crate::options::{OptionKey, OptionValue};
use crate::schema::{ColumnDef, ForeignKeyDef, IndexDef, TableDef};

/// Where a column goes in its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// First column of the table.
    First,
    /// Right after the named column.
    After(String),
}

impl Placement {
    /// Returns the placement of the column at `index` in `columns`.
    #[must_use]
    pub fn for_index(columns: &[ColumnDef], index: usize) -> Self {
        index
            .checked_sub(1)
            .and_then(|prev| columns.get(prev))
            .map_or(Self::First, |prev| Self::After(prev.name.clone()))
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::After(column) => write!(f, "after `{column}`"),
        }
    }
}

/// A column present only in the desired schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedColumn {
    /// The desired column.
    pub column: ColumnDef,
    /// Where it goes.
    pub placement: Placement,
}

/// A column present on both sides whose attributes or position differ.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedColumn {
    /// The live column.
    pub from: ColumnDef,
    /// The desired column.
    pub to: ColumnDef,
    /// Attribute names that differ; empty when only the position moved.
    pub fields: Vec<&'static str>,
    /// New position, when the column has to move.
    pub placement: Option<Placement>,
}

/// Before and after values of a table option. A missing side means the
/// option is not set there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionChange {
    /// Live value.
    pub from: Option<OptionValue>,
    /// Desired value.
    pub to: Option<OptionValue>,
}

/// Option changes keyed by option.
pub type OptionChanges = BTreeMap<OptionKey, OptionChange>;

/// Changes to a table present on both sides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableDelta {
    /// Columns to add, in desired order.
    pub added_columns: Vec<AddedColumn>,
    /// Columns to drop.
    pub removed_columns: Vec<ColumnDef>,
    /// Columns to modify, in desired order.
    pub changed_columns: Vec<ChangedColumn>,
    /// Indexes to create.
    pub added_indexes: Vec<IndexDef>,
    /// Indexes to drop.
    pub removed_indexes: Vec<IndexDef>,
    /// Foreign keys to add.
    pub added_foreign_keys: Vec<ForeignKeyDef>,
    /// Foreign keys to drop.
    pub removed_foreign_keys: Vec<ForeignKeyDef>,
    /// Every option whose normalized values differ.
    pub changed_options: OptionChanges,
    /// Option changes the policy lets into the plan.
    pub actionable: OptionChanges,
    /// Option changes that are only reported.
    pub advisory: OptionChanges,
}

impl TableDelta {
    /// Returns whether any column, index or foreign key changes.
    #[must_use]
    pub fn has_structural_changes(&self) -> bool {
        !(self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.changed_columns.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty())
    }

    /// Returns whether nothing at all differs, advisory options included.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_structural_changes() && self.changed_options.is_empty()
    }

    /// Returns whether applying this delta would change the table.
    #[must_use]
    pub fn differ(&self) -> bool {
        self.has_structural_changes() || !self.actionable.is_empty()
    }
}

/// What happens to one table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableChange {
    /// Table only in the desired schema.
    Create(TableDef),
    /// Table only in the live schema.
    Drop(TableDef),
    /// Table on both sides with differences.
    Alter(TableDelta),
}

impl TableChange {
    /// Returns whether the change would touch the database.
    #[must_use]
    pub fn differ(&self) -> bool {
        match self {
            Self::Create(_) | Self::Drop(_) => true,
            Self::Alter(delta) => delta.differ(),
        }
    }
}

/// Difference between a desired and a live schema, keyed by table name.
///
/// Tables without an entry are unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    tables: BTreeMap<String, TableChange>,
}

impl Delta {
    /// Creates an empty delta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a change for a table.
    pub fn insert(&mut self, table: impl Into<String>, change: TableChange) {
        self.tables.insert(table.into(), change);
    }

    /// Gets the change for a table.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&TableChange> {
        self.tables.get(table)
    }

    /// Gets the alter delta for a table, if the table is altered.
    #[must_use]
    pub fn table_delta(&self, table: &str) -> Option<&TableDelta> {
        match self.tables.get(table)? {
            TableChange::Alter(delta) => Some(delta),
            _ => None,
        }
    }

    /// Iterates over changes ordered by table name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableChange)> {
        self.tables.iter().map(|(name, change)| (name.as_str(), change))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut TableChange)> {
        self.tables
            .iter_mut()
            .map(|(name, change)| (name.as_str(), change))
    }

    /// Returns the number of affected tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns whether no table is affected, not even by advisory changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns whether migrating would change anything.
    ///
    /// Advisory-only option differences do not count.
    #[must_use]
    pub fn differ(&self) -> bool {
        self.tables.values().any(TableChange::differ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn comment_change() -> OptionChange {
        OptionChange {
            from: Some(OptionValue::from("old comment")),
            to: Some(OptionValue::from("new comment")),
        }
    }

    #[test]
    fn test_placement_for_index() {
        let columns = vec![
            ColumnDef::new("a", ColumnType::Int),
            ColumnDef::new("b", ColumnType::Int),
        ];
        assert_eq!(Placement::for_index(&columns, 0), Placement::First);
        assert_eq!(
            Placement::for_index(&columns, 1),
            Placement::After("a".to_string())
        );
    }

    #[test]
    fn test_advisory_options_do_not_differ() {
        let mut table = TableDelta::default();
        table.changed_options.insert(OptionKey::Comment, comment_change());
        table.advisory.insert(OptionKey::Comment, comment_change());

        let mut delta = Delta::new();
        delta.insert("employees", TableChange::Alter(table));

        assert!(!delta.is_empty());
        assert!(!delta.differ());
    }

    #[test]
    fn test_actionable_options_differ() {
        let mut table = TableDelta::default();
        table.changed_options.insert(OptionKey::Comment, comment_change());
        table.actionable.insert(OptionKey::Comment, comment_change());

        let mut delta = Delta::new();
        delta.insert("employees", TableChange::Alter(table));

        assert!(delta.differ());
    }

    #[test]
    fn test_create_differs() {
        let mut delta = Delta::new();
        delta.insert("t", TableChange::Create(TableDef::new("t")));
        assert!(delta.differ());
        assert!(delta.table_delta("t").is_none());
    }
}
