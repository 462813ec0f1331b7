//! DDL planner.
//!
//! Turns the actionable part of a [`Delta`] into an ordered list of
//! statements. Statements are emitted in phases so every statement only
//! depends on structures created earlier in the list:
//!
//! 1. drop foreign keys (removed ones, and every key of a dropped table)
//! 2. drop indexes
//! 3. drop tables
//! 4. create tables, without their foreign keys
//! 5. for each altered table: drop columns, add or modify columns in
//!    declared order, one combined table options statement, then the
//!    partitioning statement
//! 6. add indexes
//! 7. add foreign keys, including those of created tables
//!
//! Advisory option changes are never planned.

use std::fmt;

use tracing::debug;

use crate::delta::{Delta, OptionChanges, TableChange, TableDelta};
use crate::dialect::{DdlDialect, MysqlDialect};
use crate::operation::DdlOperation;
use crate::options::{OptionKey, OptionValue};

/// A planned operation together with its rendered SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    operation: DdlOperation,
    sql: String,
}

impl Statement {
    /// Returns the structured operation.
    #[must_use]
    pub const fn operation(&self) -> &DdlOperation {
        &self.operation
    }

    /// Returns the SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// An ordered list of statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    statements: Vec<Statement>,
}

impl Plan {
    /// Returns the statements in execution order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Returns the SQL text of every statement.
    #[must_use]
    pub fn sql(&self) -> Vec<&str> {
        self.statements.iter().map(Statement::sql).collect()
    }

    /// Returns the number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns whether there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Statement;
    type IntoIter = std::slice::Iter<'a, Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}

/// Orders actionable changes into statements.
#[derive(Debug, Clone, Default)]
pub struct DdlPlanner<D: DdlDialect = MysqlDialect> {
    dialect: D,
}

impl DdlPlanner {
    /// Creates a planner for MySQL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: DdlDialect> DdlPlanner<D> {
    /// Plans the statements for a classified delta.
    #[must_use]
    pub fn plan(&self, delta: &Delta) -> Plan {
        let mut drop_fks = Vec::new();
        let mut drop_indexes = Vec::new();
        let mut drop_tables = Vec::new();
        let mut create_tables = Vec::new();
        let mut alters = Vec::new();
        let mut add_indexes = Vec::new();
        let mut add_fks = Vec::new();

        for (name, change) in delta.iter() {
            match change {
                TableChange::Drop(table) => {
                    drop_fks.extend(table.foreign_keys.iter().map(|fk| {
                        DdlOperation::DropForeignKey {
                            table: name.to_string(),
                            name: fk.name.clone(),
                        }
                    }));
                    drop_tables.push(DdlOperation::DropTable {
                        name: name.to_string(),
                    });
                }
                TableChange::Create(table) => {
                    add_fks.extend(table.foreign_keys.iter().map(|fk| {
                        DdlOperation::AddForeignKey {
                            table: name.to_string(),
                            foreign_key: fk.clone(),
                        }
                    }));
                    let mut table = table.clone();
                    table.foreign_keys.clear();
                    create_tables.push(DdlOperation::CreateTable { table });
                }
                TableChange::Alter(table_delta) => {
                    drop_fks.extend(table_delta.removed_foreign_keys.iter().map(|fk| {
                        DdlOperation::DropForeignKey {
                            table: name.to_string(),
                            name: fk.name.clone(),
                        }
                    }));
                    drop_indexes.extend(table_delta.removed_indexes.iter().map(|index| {
                        DdlOperation::DropIndex {
                            table: name.to_string(),
                            name: index.name.clone(),
                        }
                    }));
                    alters.extend(alter_operations(name, table_delta));
                    add_indexes.extend(table_delta.added_indexes.iter().map(|index| {
                        DdlOperation::AddIndex {
                            table: name.to_string(),
                            index: index.clone(),
                        }
                    }));
                    add_fks.extend(table_delta.added_foreign_keys.iter().map(|fk| {
                        DdlOperation::AddForeignKey {
                            table: name.to_string(),
                            foreign_key: fk.clone(),
                        }
                    }));
                }
            }
        }

        let statements: Vec<Statement> = [
            drop_fks,
            drop_indexes,
            drop_tables,
            create_tables,
            alters,
            add_indexes,
            add_fks,
        ]
        .into_iter()
        .flatten()
        .map(|operation| Statement {
            sql: self.dialect.generate_sql(&operation),
            operation,
        })
        .collect();

        debug!(
            dialect = self.dialect.name(),
            statements = statements.len(),
            "Planned migration"
        );

        Plan { statements }
    }
}

/// Column and option operations for one altered table.
fn alter_operations(table: &str, delta: &TableDelta) -> Vec<DdlOperation> {
    let mut operations: Vec<DdlOperation> = delta
        .removed_columns
        .iter()
        .map(|column| DdlOperation::DropColumn {
            table: table.to_string(),
            column: column.name.clone(),
        })
        .collect();

    let mut columns: Vec<(usize, DdlOperation)> = delta
        .added_columns
        .iter()
        .map(|added| {
            (
                added.column.position,
                DdlOperation::AddColumn {
                    table: table.to_string(),
                    column: added.column.clone(),
                    placement: added.placement.clone(),
                },
            )
        })
        .chain(delta.changed_columns.iter().map(|changed| {
            (
                changed.to.position,
                DdlOperation::ModifyColumn {
                    table: table.to_string(),
                    column: changed.to.clone(),
                    placement: changed.placement.clone(),
                },
            )
        }))
        .collect();
    columns.sort_by_key(|(position, _)| *position);
    operations.extend(columns.into_iter().map(|(_, operation)| operation));

    let options = table_options(&delta.actionable);
    if !options.is_empty() {
        operations.push(DdlOperation::AlterTableOptions {
            table: table.to_string(),
            options,
        });
    }

    if let Some(change) = delta.actionable.get(&OptionKey::Partition) {
        operations.push(DdlOperation::AlterPartitioning {
            table: table.to_string(),
            partition: change
                .to
                .as_ref()
                .and_then(OptionValue::as_text)
                .map(str::to_string),
        });
    }

    operations
}

/// Actionable options other than partitioning, in statement order: engine,
/// charset, collation, comment, other named options, then raw options.
fn table_options(actionable: &OptionChanges) -> Vec<(OptionKey, Option<OptionValue>)> {
    let rank = |key: &OptionKey| match key {
        OptionKey::Engine => 0,
        OptionKey::Charset => 1,
        OptionKey::Collation => 2,
        OptionKey::Comment => 3,
        OptionKey::Options => 5,
        _ => 4,
    };

    let mut options: Vec<(OptionKey, Option<OptionValue>)> = actionable
        .iter()
        .filter(|(key, _)| !matches!(key, OptionKey::Partition | OptionKey::PrimaryKey))
        .map(|(key, change)| (key.clone(), change.to.clone()))
        .collect();
    options.sort_by_key(|(key, _)| rank(key));
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{AddedColumn, ChangedColumn, OptionChange, Placement};
    use crate::schema::{ColumnDef, ColumnType, ForeignKeyDef, IndexDef, TableDef};

    fn users() -> TableDef {
        TableDef::new("users")
            .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
            .primary_key(vec!["id".to_string()])
    }

    fn posts() -> TableDef {
        TableDef::new("posts")
            .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
            .column(ColumnDef::new("user_id", ColumnType::BigInt).not_null())
            .index(IndexDef::new("idx_user", vec!["user_id".to_string()]))
            .foreign_key(ForeignKeyDef::new(
                "fk_posts_user",
                vec!["user_id".to_string()],
                "users",
                vec!["id".to_string()],
            ))
    }

    fn kinds(plan: &Plan) -> Vec<(&'static str, String)> {
        plan.statements()
            .iter()
            .map(|s| (s.operation().kind(), s.operation().table_name().to_string()))
            .collect()
    }

    #[test]
    fn test_empty_delta_plans_nothing() {
        assert!(DdlPlanner::new().plan(&Delta::new()).is_empty());
    }

    #[test]
    fn test_created_tables_get_foreign_keys_last() {
        let mut delta = Delta::new();
        // "posts" sorts before "users" but references it.
        delta.insert("posts", TableChange::Create(posts()));
        delta.insert("users", TableChange::Create(users()));

        let plan = DdlPlanner::new().plan(&delta);
        assert_eq!(
            kinds(&plan),
            vec![
                ("create_table", "posts".to_string()),
                ("create_table", "users".to_string()),
                ("add_foreign_key", "posts".to_string()),
            ]
        );
        assert!(!plan.sql()[0].contains("FOREIGN KEY"));
        assert!(plan.sql()[0].contains("KEY `idx_user` (`user_id`)"));
    }

    #[test]
    fn test_foreign_keys_dropped_before_tables() {
        let mut delta = Delta::new();
        delta.insert("posts", TableChange::Drop(posts()));
        delta.insert("users", TableChange::Drop(users()));

        let plan = DdlPlanner::new().plan(&delta);
        assert_eq!(
            kinds(&plan),
            vec![
                ("drop_foreign_key", "posts".to_string()),
                ("drop_table", "posts".to_string()),
                ("drop_table", "users".to_string()),
            ]
        );
    }

    #[test]
    fn test_alter_phases() {
        let target = ColumnDef::new("title", ColumnType::Varchar).limit(200);
        let mut table = TableDelta::default();
        table.removed_columns.push(ColumnDef::new("legacy", ColumnType::Int));
        table.added_columns.push(AddedColumn {
            column: {
                let mut c = ColumnDef::new("body", ColumnType::Text);
                c.position = 3;
                c
            },
            placement: Placement::After("title".to_string()),
        });
        table.changed_columns.push(ChangedColumn {
            from: ColumnDef::new("title", ColumnType::Varchar).limit(100),
            to: {
                let mut c = target.clone();
                c.position = 2;
                c
            },
            fields: vec!["limit"],
            placement: None,
        });
        table.removed_indexes.push(IndexDef::new("idx_legacy", vec!["legacy".to_string()]));
        table.added_indexes.push(IndexDef::new("idx_title", vec!["title".to_string()]));
        let comment = OptionChange {
            from: Some(OptionValue::from("old")),
            to: Some(OptionValue::from("new")),
        };
        table.changed_options.insert(OptionKey::Comment, comment.clone());
        table.actionable.insert(OptionKey::Comment, comment);

        let mut delta = Delta::new();
        delta.insert("posts", TableChange::Alter(table));

        let plan = DdlPlanner::new().plan(&delta);
        assert_eq!(
            plan.sql(),
            vec![
                "DROP INDEX `idx_legacy` ON `posts`",
                "ALTER TABLE `posts` DROP COLUMN `legacy`",
                "ALTER TABLE `posts` MODIFY COLUMN `title` varchar(200) NULL",
                "ALTER TABLE `posts` ADD COLUMN `body` text NULL AFTER `title`",
                "ALTER TABLE `posts` COMMENT='new'",
                "CREATE INDEX `idx_title` ON `posts` (`title`)",
            ]
        );
    }

    #[test]
    fn test_advisory_options_are_not_planned() {
        let mut table = TableDelta::default();
        let change = OptionChange {
            from: Some(OptionValue::from("old")),
            to: Some(OptionValue::from("new")),
        };
        table.changed_options.insert(OptionKey::Comment, change.clone());
        table.advisory.insert(OptionKey::Comment, change);

        let mut delta = Delta::new();
        delta.insert("posts", TableChange::Alter(table));
        assert!(DdlPlanner::new().plan(&delta).is_empty());
    }

    #[test]
    fn test_options_combined_and_partition_separate() {
        let mut table = TableDelta::default();
        for (key, from, to) in [
            (OptionKey::Comment, Some("a"), Some("b")),
            (OptionKey::Engine, Some("MyISAM"), Some("InnoDB")),
            (OptionKey::Partition, Some("PARTITION BY HASH (id) PARTITIONS 2"), None),
        ] {
            table.actionable.insert(
                key,
                OptionChange {
                    from: from.map(OptionValue::from),
                    to: to.map(OptionValue::from),
                },
            );
        }

        let mut delta = Delta::new();
        delta.insert("events", TableChange::Alter(table));
        let plan = DdlPlanner::new().plan(&delta);
        assert_eq!(
            plan.sql(),
            vec![
                "ALTER TABLE `events` ENGINE=InnoDB COMMENT='b'",
                "ALTER TABLE `events` REMOVE PARTITIONING",
            ]
        );
    }
}
