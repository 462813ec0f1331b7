//! In-memory database.
//!
//! [`MemoryDatabase`] holds a [`SchemaSnapshot`] and applies planned
//! operations to it structurally, the way MySQL would apply the rendered
//! statements. It implements both [`Introspect`] and [`DdlConnection`], so
//! a full diff, migrate, re-introspect cycle runs without a server.
//!
//! Tables are stored the way MySQL reports them back: raw option text
//! split into keys, engine and charset defaults filled in, and an index
//! named after each foreign key that no existing index covers.

use crate::delta::Placement;
use crate::executor::DdlConnection;
use crate::introspect::Introspect;
use crate::operation::DdlOperation;
use crate::options::OptionKey;
use crate::planner::Statement;
use crate::schema::{ColumnDef, ForeignKeyDef, IndexDef, SchemaSnapshot, TableDef};
use crate::table_options::expand_options;

const DEFAULT_ENGINE: &str = "InnoDB";
const DEFAULT_CHARSET: &str = "utf8mb4";

/// Errors raised by [`MemoryDatabase`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryDatabaseError {
    /// A failure injected with [`MemoryDatabase::fail_at`].
    #[error("{0}")]
    Injected(String),

    /// The table does not exist.
    #[error("Table '{0}' doesn't exist")]
    NoSuchTable(String),

    /// The table already exists.
    #[error("Table '{0}' already exists")]
    TableExists(String),

    /// The column does not exist.
    #[error("Unknown column '{column}' in '{table}'")]
    NoSuchColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The column already exists.
    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    /// The index or constraint does not exist.
    #[error("Can't DROP '{0}'; check that column/key exists")]
    NoSuchKey(String),

    /// The index or constraint already exists.
    #[error("Duplicate key name '{0}'")]
    DuplicateKey(String),
}

type Result<T> = std::result::Result<T, MemoryDatabaseError>;

/// A schema held in memory that accepts DDL operations.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    schema: SchemaSnapshot,
    executed: Vec<String>,
    attempts: usize,
    failure: Option<(usize, String)>,
}

impl MemoryDatabase {
    /// Creates a database holding `schema`.
    #[must_use]
    pub fn new(mut schema: SchemaSnapshot) -> Self {
        for table in schema.tables_mut() {
            settle_options(table);
            let foreign_keys = table.foreign_keys.clone();
            for fk in &foreign_keys {
                add_implicit_index(table, fk);
            }
        }
        Self {
            schema,
            ..Self::default()
        }
    }

    /// Makes the statement at zero-based `index` (counting every
    /// statement this database receives) fail with `message`.
    #[must_use]
    pub fn fail_at(mut self, index: usize, message: impl Into<String>) -> Self {
        self.failure = Some((index, message.into()));
        self
    }

    /// Returns the current schema.
    #[must_use]
    pub const fn schema(&self) -> &SchemaSnapshot {
        &self.schema
    }

    /// Returns the SQL of every statement applied successfully.
    #[must_use]
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Returns how many statements were received, failed ones included.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Applies one operation.
    ///
    /// # Errors
    ///
    /// Fails with the error MySQL would raise for the same statement.
    #[allow(clippy::too_many_lines)]
    pub fn apply(&mut self, operation: &DdlOperation) -> Result<()> {
        match operation {
            DdlOperation::CreateTable { table } => {
                if self.schema.get_table(&table.name).is_some() {
                    return Err(MemoryDatabaseError::TableExists(table.name.clone()));
                }
                let mut table = table.clone();
                table.renumber();
                settle_options(&mut table);
                self.schema.insert_table(table);
            }
            DdlOperation::DropTable { name } => {
                self.schema
                    .remove_table(name)
                    .ok_or_else(|| MemoryDatabaseError::NoSuchTable(name.clone()))?;
            }
            DdlOperation::AddColumn {
                table,
                column,
                placement,
            } => {
                let target = self.table_mut(table)?;
                if target.get_column(&column.name).is_some() {
                    return Err(MemoryDatabaseError::DuplicateColumn(column.name.clone()));
                }
                insert_column(target, column.clone(), placement)?;
            }
            DdlOperation::DropColumn { table, column } => {
                let target = self.table_mut(table)?;
                let index = column_index(target, column)?;
                target.columns.remove(index);
                for key in &mut target.indexes {
                    key.columns.retain(|c| c != column);
                }
                target.indexes.retain(|i| !i.columns.is_empty());
                target.renumber();
            }
            DdlOperation::ModifyColumn {
                table,
                column,
                placement,
            } => {
                let target = self.table_mut(table)?;
                let index = column_index(target, &column.name)?;
                match placement {
                    Some(placement) => {
                        target.columns.remove(index);
                        insert_column(target, column.clone(), placement)?;
                    }
                    None => {
                        target.columns[index] = column.clone();
                        target.renumber();
                    }
                }
            }
            DdlOperation::AddIndex { table, index } => {
                let target = self.table_mut(table)?;
                if target.get_index(&index.name).is_some() {
                    return Err(MemoryDatabaseError::DuplicateKey(index.name.clone()));
                }
                target.indexes.push(index.clone());
                target.sort_constraints();
            }
            DdlOperation::DropIndex { table, name } => {
                let target = self.table_mut(table)?;
                let before = target.indexes.len();
                target.indexes.retain(|i| &i.name != name);
                if target.indexes.len() == before {
                    return Err(MemoryDatabaseError::NoSuchKey(name.clone()));
                }
            }
            DdlOperation::AddForeignKey { table, foreign_key } => {
                if self.schema.get_table(&foreign_key.referenced_table).is_none() {
                    return Err(MemoryDatabaseError::NoSuchTable(
                        foreign_key.referenced_table.clone(),
                    ));
                }
                let target = self.table_mut(table)?;
                if target.get_foreign_key(&foreign_key.name).is_some() {
                    return Err(MemoryDatabaseError::DuplicateKey(foreign_key.name.clone()));
                }
                target.foreign_keys.push(foreign_key.clone());
                add_implicit_index(target, foreign_key);
                target.sort_constraints();
            }
            DdlOperation::DropForeignKey { table, name } => {
                let target = self.table_mut(table)?;
                let before = target.foreign_keys.len();
                target.foreign_keys.retain(|fk| &fk.name != name);
                if target.foreign_keys.len() == before {
                    return Err(MemoryDatabaseError::NoSuchKey(name.clone()));
                }
            }
            DdlOperation::AlterTableOptions { table, options } => {
                let target = self.table_mut(table)?;
                for (key, value) in options {
                    match value {
                        Some(value) => {
                            target.options.insert(key.clone(), value.clone());
                        }
                        None => {
                            target.options.remove(key);
                        }
                    }
                }
                settle_options(target);
            }
            DdlOperation::AlterPartitioning { table, partition } => {
                let target = self.table_mut(table)?;
                match partition {
                    Some(clause) => {
                        target
                            .options
                            .insert(OptionKey::Partition, clause.clone().into());
                    }
                    None => {
                        target.options.remove(&OptionKey::Partition);
                    }
                }
            }
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableDef> {
        self.schema
            .get_table_mut(name)
            .ok_or_else(|| MemoryDatabaseError::NoSuchTable(name.to_string()))
    }
}

/// Splits raw option text and fills in the server defaults.
fn settle_options(table: &mut TableDef) {
    let mut options = expand_options(&table.options);
    options
        .entry(OptionKey::Engine)
        .or_insert_with(|| DEFAULT_ENGINE.into());
    let charset = options
        .entry(OptionKey::Charset)
        .or_insert_with(|| DEFAULT_CHARSET.into())
        .as_text()
        .map(str::to_ascii_lowercase);
    if let Some(collation) = charset.as_deref().and_then(default_collation) {
        options
            .entry(OptionKey::Collation)
            .or_insert_with(|| collation.into());
    }
    table.options = options;
}

/// Default collation of the character sets the database knows about.
fn default_collation(charset: &str) -> Option<&'static str> {
    match charset {
        "utf8mb4" => Some("utf8mb4_0900_ai_ci"),
        "utf8mb3" | "utf8" => Some("utf8mb3_general_ci"),
        "latin1" => Some("latin1_swedish_ci"),
        "ascii" => Some("ascii_general_ci"),
        "binary" => Some("binary"),
        _ => None,
    }
}

/// Adds the index InnoDB creates for a foreign key when no index (or the
/// primary key) starts with the key's columns.
fn add_implicit_index(table: &mut TableDef, fk: &ForeignKeyDef) {
    let covered = table
        .indexes
        .iter()
        .map(|index| index.columns.as_slice())
        .chain(table.primary_key_columns())
        .any(|columns| columns.starts_with(&fk.columns));
    if !covered && table.get_index(&fk.name).is_none() {
        table
            .indexes
            .push(IndexDef::new(fk.name.clone(), fk.columns.clone()));
        table.sort_constraints();
    }
}

fn column_index(table: &TableDef, column: &str) -> Result<usize> {
    table
        .columns
        .iter()
        .position(|c| c.name == column)
        .ok_or_else(|| MemoryDatabaseError::NoSuchColumn {
            table: table.name.clone(),
            column: column.to_string(),
        })
}

fn insert_column(table: &mut TableDef, column: ColumnDef, placement: &Placement) -> Result<()> {
    let index = match placement {
        Placement::First => 0,
        Placement::After(previous) => column_index(table, previous)? + 1,
    };
    table.columns.insert(index, column);
    table.renumber();
    Ok(())
}

impl Introspect for MemoryDatabase {
    type Error = MemoryDatabaseError;

    async fn introspect_schema(&self) -> Result<SchemaSnapshot> {
        Ok(self.schema.clone())
    }
}

impl DdlConnection for MemoryDatabase {
    type Error = MemoryDatabaseError;

    async fn execute(&mut self, statement: &Statement) -> Result<()> {
        let attempt = self.attempts;
        self.attempts += 1;

        if let Some((index, message)) = &self.failure {
            if *index == attempt {
                return Err(MemoryDatabaseError::Injected(message.clone()));
            }
        }

        self.apply(statement.operation())?;
        self.executed.push(statement.sql().to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionValue;
    use crate::schema::ColumnType;

    fn database() -> MemoryDatabase {
        MemoryDatabase::new(
            SchemaSnapshot::new().table(
                TableDef::new("t")
                    .column(ColumnDef::new("a", ColumnType::Int))
                    .column(ColumnDef::new("b", ColumnType::Int))
                    .index(IndexDef::new("idx_ab", vec!["a".to_string(), "b".to_string()])),
            ),
        )
    }

    fn names(db: &MemoryDatabase) -> Vec<String> {
        db.schema()
            .get_table("t")
            .unwrap()
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    #[test]
    fn test_add_column_first_and_after() {
        let mut db = database();
        db.apply(&DdlOperation::AddColumn {
            table: "t".to_string(),
            column: ColumnDef::new("z", ColumnType::Int),
            placement: Placement::First,
        })
        .unwrap();
        db.apply(&DdlOperation::AddColumn {
            table: "t".to_string(),
            column: ColumnDef::new("m", ColumnType::Int),
            placement: Placement::After("a".to_string()),
        })
        .unwrap();
        assert_eq!(names(&db), vec!["z", "a", "m", "b"]);
        assert_eq!(db.schema().get_table("t").unwrap().columns[3].position, 3);
    }

    #[test]
    fn test_modify_column_moves_it() {
        let mut db = database();
        db.apply(&DdlOperation::ModifyColumn {
            table: "t".to_string(),
            column: ColumnDef::new("b", ColumnType::BigInt),
            placement: Some(Placement::First),
        })
        .unwrap();
        assert_eq!(names(&db), vec!["b", "a"]);
        assert_eq!(
            db.schema().get_table("t").unwrap().columns[0].column_type,
            ColumnType::BigInt
        );
    }

    #[test]
    fn test_drop_column_shrinks_indexes() {
        let mut db = database();
        db.apply(&DdlOperation::DropColumn {
            table: "t".to_string(),
            column: "a".to_string(),
        })
        .unwrap();
        let table = db.schema().get_table("t").unwrap();
        assert_eq!(table.indexes[0].columns, vec!["b".to_string()]);
    }

    #[test]
    fn test_errors_like_mysql() {
        let mut db = database();
        let err = db
            .apply(&DdlOperation::DropColumn {
                table: "t".to_string(),
                column: "missing".to_string(),
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown column 'missing' in 't'");

        let err = db
            .apply(&DdlOperation::DropTable {
                name: "nope".to_string(),
            })
            .unwrap_err();
        assert_eq!(err, MemoryDatabaseError::NoSuchTable("nope".to_string()));
    }

    #[test]
    fn test_reports_options_like_the_server() {
        let db = MemoryDatabase::new(
            SchemaSnapshot::new().table(
                TableDef::new("logs")
                    .column(ColumnDef::new("id", ColumnType::Int))
                    .option(OptionKey::Options, "ENGINE=MyISAM ROW_FORMAT=FIXED"),
            ),
        );
        let options = &db.schema().get_table("logs").unwrap().options;

        assert_eq!(options[&OptionKey::Engine], OptionValue::from("MyISAM"));
        assert_eq!(options[&OptionKey::Charset], OptionValue::from("utf8mb4"));
        assert_eq!(
            options[&OptionKey::Collation],
            OptionValue::from("utf8mb4_0900_ai_ci")
        );
        assert_eq!(options[&OptionKey::Options], OptionValue::from("ROW_FORMAT=FIXED"));
    }

    #[test]
    fn test_foreign_key_gets_implicit_index_that_outlives_it() {
        let mut db = MemoryDatabase::new(
            SchemaSnapshot::new()
                .table(
                    TableDef::new("users")
                        .column(ColumnDef::new("id", ColumnType::Int).not_null())
                        .primary_key(vec!["id".to_string()]),
                )
                .table(
                    TableDef::new("posts")
                        .column(ColumnDef::new("id", ColumnType::Int).not_null())
                        .column(ColumnDef::new("user_id", ColumnType::Int)),
                ),
        );
        db.apply(&DdlOperation::AddForeignKey {
            table: "posts".to_string(),
            foreign_key: ForeignKeyDef::new(
                "fk_posts_user",
                vec!["user_id".to_string()],
                "users",
                vec!["id".to_string()],
            ),
        })
        .unwrap();
        db.apply(&DdlOperation::DropForeignKey {
            table: "posts".to_string(),
            name: "fk_posts_user".to_string(),
        })
        .unwrap();

        let posts = db.schema().get_table("posts").unwrap();
        assert!(posts.foreign_keys.is_empty());
        assert_eq!(
            posts.indexes,
            vec![IndexDef::new("fk_posts_user", vec!["user_id".to_string()])]
        );
    }

    #[test]
    fn test_covered_foreign_key_gets_no_index() {
        let mut db = database();
        db.apply(&DdlOperation::CreateTable {
            table: TableDef::new("parents").column(ColumnDef::new("a", ColumnType::Int)),
        })
        .unwrap();
        db.apply(&DdlOperation::AddForeignKey {
            table: "t".to_string(),
            foreign_key: ForeignKeyDef::new(
                "fk_t_parent",
                vec!["a".to_string()],
                "parents",
                vec!["a".to_string()],
            ),
        })
        .unwrap();

        let table = db.schema().get_table("t").unwrap();
        assert_eq!(table.indexes.len(), 1);
        assert_eq!(table.indexes[0].name, "idx_ab");
    }
}
