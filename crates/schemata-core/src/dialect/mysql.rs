//! MySQL dialect.
//!
//! Most changes are single `ALTER TABLE` statements. Column additions and
//! modifications carry `FIRST` / `AFTER` so the physical column order
//! follows the declared one.

use crate::delta::Placement;
use crate::operation::DdlOperation;
use crate::options::{OptionKey, OptionValue};
use crate::schema::{quote_literal, ColumnDef, ColumnType, ForeignKeyDef, IndexDef, TableDef};

use super::DdlDialect;

/// MySQL DDL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn create_table_sql(&self, table: &TableDef) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        if let Some(pk) = table.primary_key_columns() {
            lines.push(format!("PRIMARY KEY ({})", self.column_list(pk)));
        }
        for index in &table.indexes {
            lines.push(format!(
                "{}KEY {} ({})",
                if index.unique { "UNIQUE " } else { "" },
                self.quote_identifier(&index.name),
                self.column_list(&index.columns)
            ));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(&table.name),
            lines.join(",\n  ")
        );

        let mut keys = vec![
            OptionKey::Engine,
            OptionKey::Charset,
            OptionKey::Collation,
            OptionKey::Comment,
        ];
        keys.extend(
            table
                .options
                .keys()
                .filter(|k| matches!(k, OptionKey::Other(_)))
                .cloned(),
        );
        keys.push(OptionKey::Options);

        let options: Vec<String> = keys
            .iter()
            .filter_map(|key| {
                let value = table.options.get(key)?;
                self.table_option_sql(key, Some(value))
            })
            .collect();
        if !options.is_empty() {
            sql.push(' ');
            sql.push_str(&options.join(" "));
        }

        if let Some(partition) = table
            .get_option(&OptionKey::Partition)
            .and_then(OptionValue::as_text)
        {
            sql.push('\n');
            sql.push_str(partition);
        }

        sql
    }

    /// Renders one table option assignment. Returns `None` for options that
    /// have no assignment form.
    fn table_option_sql(&self, key: &OptionKey, value: Option<&OptionValue>) -> Option<String> {
        match (key, value) {
            (OptionKey::Comment, None) => Some("COMMENT=''".to_string()),
            (OptionKey::Comment, Some(value)) => {
                Some(format!("COMMENT={}", quote_literal(&option_text(value))))
            }
            (OptionKey::Engine, Some(value)) => Some(format!("ENGINE={}", option_text(value))),
            (OptionKey::Charset, Some(value)) => {
                Some(format!("DEFAULT CHARSET={}", option_text(value)))
            }
            (OptionKey::Collation, Some(value)) => Some(format!("COLLATE={}", option_text(value))),
            (OptionKey::Options, Some(value)) => {
                let text = option_text(value);
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            (OptionKey::Other(name), Some(value)) => Some(format!(
                "{}={}",
                name.to_ascii_uppercase(),
                option_text(value)
            )),
            _ => None,
        }
    }

    fn placement_sql(&self, placement: &Placement) -> String {
        match placement {
            Placement::First => " FIRST".to_string(),
            Placement::After(column) => format!(" AFTER {}", self.quote_identifier(column)),
        }
    }

    fn create_index_sql(&self, table: &str, index: &IndexDef) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            self.column_list(&index.columns)
        )
    }

    fn add_foreign_key_sql(&self, table: &str, fk: &ForeignKeyDef) -> String {
        format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            self.quote_identifier(table),
            self.quote_identifier(&fk.name),
            self.column_list(&fk.columns),
            self.quote_identifier(&fk.referenced_table),
            self.column_list(&fk.referenced_columns),
            fk.on_delete.to_sql(),
            fk.on_update.to_sql()
        )
    }
}

fn option_text(value: &OptionValue) -> String {
    match value {
        OptionValue::Text(text) => text.clone(),
        OptionValue::List(items) => items.join(","),
    }
}

impl DdlDialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn generate_sql(&self, operation: &DdlOperation) -> String {
        match operation {
            DdlOperation::CreateTable { table } => self.create_table_sql(table),
            DdlOperation::DropTable { name } => {
                format!("DROP TABLE {}", self.quote_identifier(name))
            }
            DdlOperation::AddColumn {
                table,
                column,
                placement,
            } => format!(
                "ALTER TABLE {} ADD COLUMN {}{}",
                self.quote_identifier(table),
                self.column_definition(column),
                self.placement_sql(placement)
            ),
            DdlOperation::DropColumn { table, column } => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.quote_identifier(table),
                self.quote_identifier(column)
            ),
            DdlOperation::ModifyColumn {
                table,
                column,
                placement,
            } => format!(
                "ALTER TABLE {} MODIFY COLUMN {}{}",
                self.quote_identifier(table),
                self.column_definition(column),
                placement
                    .as_ref()
                    .map(|p| self.placement_sql(p))
                    .unwrap_or_default()
            ),
            DdlOperation::AddIndex { table, index } => self.create_index_sql(table, index),
            DdlOperation::DropIndex { table, name } => format!(
                "DROP INDEX {} ON {}",
                self.quote_identifier(name),
                self.quote_identifier(table)
            ),
            DdlOperation::AddForeignKey { table, foreign_key } => {
                self.add_foreign_key_sql(table, foreign_key)
            }
            DdlOperation::DropForeignKey { table, name } => format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                self.quote_identifier(table),
                self.quote_identifier(name)
            ),
            DdlOperation::AlterTableOptions { table, options } => {
                let assignments: Vec<String> = options
                    .iter()
                    .filter_map(|(key, value)| self.table_option_sql(key, value.as_ref()))
                    .collect();
                format!(
                    "ALTER TABLE {} {}",
                    self.quote_identifier(table),
                    assignments.join(" ")
                )
            }
            DdlOperation::AlterPartitioning { table, partition } => format!(
                "ALTER TABLE {} {}",
                self.quote_identifier(table),
                partition.as_deref().unwrap_or("REMOVE PARTITIONING")
            ),
        }
    }

    fn type_name(&self, column: &ColumnDef) -> String {
        let base = column.column_type.name();
        match (&column.column_type, column.limit, column.precision) {
            (ColumnType::Boolean, _, _) => "tinyint(1)".to_string(),
            (_, Some(limit), _) => format!("{base}({limit})"),
            (ColumnType::Decimal, _, Some(precision)) => {
                format!("{base}({precision},{})", column.scale.unwrap_or(0))
            }
            _ => base.to_string(),
        }
    }

    fn column_definition(&self, column: &ColumnDef) -> String {
        let mut parts = vec![self.quote_identifier(&column.name), self.type_name(column)];

        if column.unsigned {
            parts.push("unsigned".to_string());
        }

        parts.push(if column.nullable { "NULL" } else { "NOT NULL" }.to_string());

        if let Some(default) = &column.default {
            parts.push(format!("DEFAULT {}", default.to_sql()));
        }

        if column.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }

        if let Some(comment) = &column.comment {
            parts.push(format!("COMMENT {}", quote_literal(comment)));
        }

        parts.join(" ")
    }
}
