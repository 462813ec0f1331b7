//! Database dialect implementations.
//!
//! A dialect knows how to render a [`DdlOperation`] as SQL text for one
//! database system.

mod mysql;

pub use mysql::MysqlDialect;

use crate::operation::DdlOperation;
use crate::schema::ColumnDef;

/// Trait for database-specific DDL generation.
pub trait DdlDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates the statement for an operation.
    fn generate_sql(&self, operation: &DdlOperation) -> String;

    /// Returns the full SQL type of a column, including length or
    /// precision.
    fn type_name(&self, column: &ColumnDef) -> String;

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnDef) -> String;

    /// Quotes an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    /// Quotes and joins a column list.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
