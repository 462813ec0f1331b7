//! DDL operations.
//!
//! One operation maps to exactly one DDL statement. Operations are
//! produced by [`crate::planner::DdlPlanner`], rendered by a
//! [`crate::dialect::DdlDialect`] and replayed structurally by
//! [`crate::memory::MemoryDatabase`].

use crate::delta::Placement;
use crate::options::{OptionKey, OptionValue};
use crate::schema::{ColumnDef, ForeignKeyDef, IndexDef, TableDef};

/// A single schema change.
#[derive(Debug, Clone, PartialEq)]
pub enum DdlOperation {
    /// Create a table with its columns, primary key, indexes and options.
    /// Foreign keys are added separately.
    CreateTable {
        /// The table, without foreign keys.
        table: TableDef,
    },
    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
    },
    /// Add a column at a position.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnDef,
        /// Where the column goes.
        placement: Placement,
    },
    /// Drop a column.
    DropColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// Redefine a column, optionally moving it.
    ModifyColumn {
        /// Table name.
        table: String,
        /// New column definition.
        column: ColumnDef,
        /// New position, if the column moves.
        placement: Option<Placement>,
    },
    /// Create an index.
    AddIndex {
        /// Table name.
        table: String,
        /// Index definition.
        index: IndexDef,
    },
    /// Drop an index.
    DropIndex {
        /// Table name.
        table: String,
        /// Index name.
        name: String,
    },
    /// Add a foreign key constraint.
    AddForeignKey {
        /// Table name.
        table: String,
        /// Constraint definition.
        foreign_key: ForeignKeyDef,
    },
    /// Drop a foreign key constraint.
    DropForeignKey {
        /// Table name.
        table: String,
        /// Constraint name.
        name: String,
    },
    /// Change table options in one statement. `None` clears the option.
    AlterTableOptions {
        /// Table name.
        table: String,
        /// Options to set, in statement order.
        options: Vec<(OptionKey, Option<OptionValue>)>,
    },
    /// Replace or remove the partitioning of a table.
    AlterPartitioning {
        /// Table name.
        table: String,
        /// New partition clause, or `None` to remove partitioning.
        partition: Option<String>,
    },
}

impl DdlOperation {
    /// Returns the name of the table this operation touches.
    #[must_use]
    pub fn table_name(&self) -> &str {
        match self {
            Self::CreateTable { table } => &table.name,
            Self::DropTable { name } => name,
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::AddForeignKey { table, .. }
            | Self::DropForeignKey { table, .. }
            | Self::AlterTableOptions { table, .. }
            | Self::AlterPartitioning { table, .. } => table,
        }
    }

    /// Returns a short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateTable { .. } => "create_table",
            Self::DropTable { .. } => "drop_table",
            Self::AddColumn { .. } => "add_column",
            Self::DropColumn { .. } => "drop_column",
            Self::ModifyColumn { .. } => "modify_column",
            Self::AddIndex { .. } => "add_index",
            Self::DropIndex { .. } => "drop_index",
            Self::AddForeignKey { .. } => "add_foreign_key",
            Self::DropForeignKey { .. } => "drop_foreign_key",
            Self::AlterTableOptions { .. } => "alter_table_options",
            Self::AlterPartitioning { .. } => "alter_partitioning",
        }
    }
}
