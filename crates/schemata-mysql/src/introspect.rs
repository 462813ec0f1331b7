//! Live schema introspection for MySQL.
//!
//! Columns, indexes and foreign keys come from `information_schema`.
//! Table options come from the tail of `SHOW CREATE TABLE`, which is the
//! only place MySQL reports them in the form they were declared. The tail
//! is split by [`split_table_options`], the same function that splits
//! declared `options` text, so both sides compare key by key.

use std::collections::{BTreeMap, HashMap};

use sqlx::mysql::MySqlPool;
use tracing::debug;

use schemata_core::error::SchemaError;
use schemata_core::introspect::Introspect;
use schemata_core::options::{OptionKey, OptionValue};
use schemata_core::schema::{
    ColumnDef, ColumnType, DefaultValue, ForeignKeyAction, ForeignKeyDef, IndexDef,
    SchemaSnapshot, TableDef,
};
use schemata_core::table_options::split_table_options;

/// Errors raised while reading the live schema.
#[derive(Debug, thiserror::Error)]
pub enum IntrospectError {
    /// Query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// `SHOW CREATE TABLE` returned something unexpected.
    #[error("Unexpected CREATE TABLE output for `{table}`: {message}")]
    Malformed {
        /// Table name.
        table: String,
        /// What was wrong.
        message: String,
    },

    /// The catalog describes an inconsistent schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

const TABLES_SQL: &str = "\
    SELECT CAST(TABLE_NAME AS CHAR), CAST(TABLE_COMMENT AS CHAR) \
    FROM information_schema.TABLES \
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE' \
    ORDER BY TABLE_NAME";

const COLUMNS_SQL: &str = "\
    SELECT CAST(TABLE_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), CAST(COLUMN_TYPE AS CHAR), \
           CAST(IS_NULLABLE AS CHAR), CAST(COLUMN_DEFAULT AS CHAR), CAST(EXTRA AS CHAR), \
           CAST(COLUMN_COMMENT AS CHAR) \
    FROM information_schema.COLUMNS \
    WHERE TABLE_SCHEMA = DATABASE() \
    ORDER BY TABLE_NAME, ORDINAL_POSITION";

const INDEXES_SQL: &str = "\
    SELECT CAST(TABLE_NAME AS CHAR), CAST(INDEX_NAME AS CHAR), CAST(COLUMN_NAME AS CHAR), \
           CAST(NON_UNIQUE AS SIGNED) \
    FROM information_schema.STATISTICS \
    WHERE TABLE_SCHEMA = DATABASE() \
    ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX";

const FOREIGN_KEYS_SQL: &str = "\
    SELECT CAST(k.TABLE_NAME AS CHAR), CAST(k.CONSTRAINT_NAME AS CHAR), \
           CAST(k.COLUMN_NAME AS CHAR), CAST(k.REFERENCED_TABLE_NAME AS CHAR), \
           CAST(k.REFERENCED_COLUMN_NAME AS CHAR), CAST(r.DELETE_RULE AS CHAR), \
           CAST(r.UPDATE_RULE AS CHAR) \
    FROM information_schema.KEY_COLUMN_USAGE k \
    JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
      ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA \
     AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
     AND r.TABLE_NAME = k.TABLE_NAME \
    WHERE k.TABLE_SCHEMA = DATABASE() AND k.REFERENCED_TABLE_NAME IS NOT NULL \
    ORDER BY k.TABLE_NAME, k.CONSTRAINT_NAME, k.ORDINAL_POSITION";

const CHARSETS_SQL: &str = "\
    SELECT CAST(CHARACTER_SET_NAME AS CHAR), CAST(DEFAULT_COLLATE_NAME AS CHAR) \
    FROM information_schema.CHARACTER_SETS";

type ColumnRow = (String, String, String, String, Option<String>, String, String);
type IndexRow = (String, String, Option<String>, i64);
type ForeignKeyRow = (String, String, String, String, String, String, String);

/// Reads the schema of the pool's current database.
#[derive(Debug, Clone)]
pub struct MysqlIntrospector {
    pool: MySqlPool,
}

impl MysqlIntrospector {
    /// Creates an introspector over `pool`.
    #[must_use]
    pub const fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn read_schema(&self) -> Result<SchemaSnapshot, IntrospectError> {
        let table_rows: Vec<(String, String)> =
            sqlx::query_as(TABLES_SQL).fetch_all(&self.pool).await?;
        let column_rows: Vec<ColumnRow> =
            sqlx::query_as(COLUMNS_SQL).fetch_all(&self.pool).await?;
        let index_rows: Vec<IndexRow> = sqlx::query_as(INDEXES_SQL).fetch_all(&self.pool).await?;
        let fk_rows: Vec<ForeignKeyRow> =
            sqlx::query_as(FOREIGN_KEYS_SQL).fetch_all(&self.pool).await?;
        let charset_rows: Vec<(String, String)> =
            sqlx::query_as(CHARSETS_SQL).fetch_all(&self.pool).await?;
        let default_collations: HashMap<String, String> = charset_rows.into_iter().collect();

        let mut tables: BTreeMap<String, TableDef> = table_rows
            .into_iter()
            .map(|(name, comment)| {
                let table = TableDef::new(name.clone());
                let table = if comment.is_empty() {
                    table
                } else {
                    table.comment(comment)
                };
                (name, table)
            })
            .collect();

        for (table, name, column_type, is_nullable, default, extra, comment) in column_rows {
            let Some(target) = tables.get_mut(&table) else {
                continue;
            };
            let column = build_column(name, &column_type, &is_nullable, default, &extra, comment);
            target.columns.push(column);
        }

        let mut foreign_keys: BTreeMap<(String, String), ForeignKeyDef> = BTreeMap::new();
        for (table, name, column, ref_table, ref_column, on_delete, on_update) in fk_rows {
            let fk = foreign_keys
                .entry((table, name.clone()))
                .or_insert_with(|| {
                    ForeignKeyDef::new(name, Vec::new(), ref_table, Vec::new())
                        .on_delete(parse_action(&on_delete))
                        .on_update(parse_action(&on_update))
                });
            fk.columns.push(column);
            fk.referenced_columns.push(ref_column);
        }

        let mut indexes: BTreeMap<(String, String), IndexDef> = BTreeMap::new();
        for (table, name, column, non_unique) in index_rows {
            // Functional key parts have no column name.
            let Some(column) = column else {
                continue;
            };
            let index = indexes
                .entry((table, name.clone()))
                .or_insert_with(|| {
                    let index = IndexDef::new(name, Vec::new());
                    if non_unique == 0 {
                        index.unique()
                    } else {
                        index
                    }
                });
            index.columns.push(column);
        }

        for ((table, name), index) in indexes {
            let Some(target) = tables.get_mut(&table) else {
                continue;
            };
            if name == "PRIMARY" {
                target
                    .options
                    .insert(OptionKey::PrimaryKey, OptionValue::List(index.columns));
            } else {
                target.indexes.push(index);
            }
        }

        for ((table, _), fk) in foreign_keys {
            if let Some(target) = tables.get_mut(&table) {
                target.foreign_keys.push(fk);
            }
        }

        for table in tables.values_mut() {
            let create = self.show_create_table(&table.name).await?;
            let tail = create_table_tail(&create).ok_or_else(|| IntrospectError::Malformed {
                table: table.name.clone(),
                message: "no closing parenthesis".to_string(),
            })?;
            apply_table_options(table, tail, &default_collations);
        }

        debug!(tables = tables.len(), "Introspected live schema");
        Ok(SchemaSnapshot::from_tables(tables.into_values())?)
    }

    async fn show_create_table(&self, table: &str) -> Result<String, IntrospectError> {
        let sql = format!("SHOW CREATE TABLE `{}`", table.replace('`', "``"));
        let (_, create): (String, String) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(create)
    }
}

impl Introspect for MysqlIntrospector {
    type Error = IntrospectError;

    async fn introspect_schema(&self) -> Result<SchemaSnapshot, Self::Error> {
        self.read_schema().await
    }
}

/// Stores the options of a `SHOW CREATE TABLE` tail on `table`.
///
/// The comment is left alone; it comes from `TABLES.TABLE_COMMENT`. A
/// collation the server left out is filled in from the charset's default
/// so a declared default collation compares equal.
fn apply_table_options(
    table: &mut TableDef,
    tail: &str,
    default_collations: &HashMap<String, String>,
) {
    let parts = split_table_options(tail);
    let collation = parts.collation.or_else(|| {
        parts
            .charset
            .as_ref()
            .and_then(|charset| default_collations.get(charset))
            .cloned()
    });

    for (key, value) in [
        (OptionKey::Engine, parts.engine),
        (OptionKey::Charset, parts.charset),
        (OptionKey::Collation, collation),
        (OptionKey::Options, parts.options),
        (OptionKey::Partition, parts.partition),
    ] {
        if let Some(value) = value {
            table.options.insert(key, OptionValue::Text(value));
        }
    }
}

fn build_column(
    name: String,
    column_type: &str,
    is_nullable: &str,
    default: Option<String>,
    extra: &str,
    comment: String,
) -> ColumnDef {
    let parsed = parse_column_type(column_type);
    let extra = extra.to_ascii_lowercase();

    let mut column = ColumnDef::new(name, parsed.column_type);
    column.nullable = is_nullable.eq_ignore_ascii_case("YES");
    column.limit = parsed.limit;
    column.precision = parsed.precision;
    column.scale = parsed.scale;
    column.unsigned = parsed.unsigned;
    column.auto_increment = extra.contains("auto_increment");
    column.default = parse_default(default.as_deref(), &column.column_type, &extra);
    if !comment.is_empty() {
        column.comment = Some(comment);
    }
    column
}

fn parse_action(rule: &str) -> ForeignKeyAction {
    ForeignKeyAction::from_sql(rule).unwrap_or_default()
}

/// A column type as reported in `COLUMNS.COLUMN_TYPE`, split into parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedColumnType {
    /// Base type.
    pub column_type: ColumnType,
    /// Length of sized string and binary types.
    pub limit: Option<u32>,
    /// Decimal precision.
    pub precision: Option<u8>,
    /// Decimal scale.
    pub scale: Option<u8>,
    /// Unsigned flag.
    pub unsigned: bool,
}

/// Parses `COLUMN_TYPE` text such as `int(10) unsigned` or
/// `decimal(10,2)`.
///
/// Integer display widths are dropped, `tinyint(1)` reads as boolean and
/// types the model does not know (`enum(...)`, `set(...)`) are kept
/// verbatim.
#[must_use]
pub fn parse_column_type(text: &str) -> ParsedColumnType {
    let lower = text.trim().to_ascii_lowercase();
    let unsigned = lower.split_whitespace().any(|word| word == "unsigned");
    let base_end = lower.find(['(', ' ']).unwrap_or(lower.len());
    let base = &lower[..base_end];
    let args: Vec<&str> = match (lower.find('('), lower.find(')')) {
        (Some(open), Some(close)) if open < close => {
            lower[open + 1..close].split(',').map(str::trim).collect()
        }
        _ => Vec::new(),
    };

    let base_type = ColumnType::parse(base);
    let mut parsed = ParsedColumnType {
        column_type: base_type.clone(),
        limit: None,
        precision: None,
        scale: None,
        unsigned,
    };

    match &base_type {
        ColumnType::TinyInt if args == ["1"] => {
            parsed.column_type = ColumnType::Boolean;
            parsed.unsigned = false;
        }
        ColumnType::Decimal => {
            parsed.precision = args.first().and_then(|a| a.parse().ok());
            parsed.scale = args.get(1).and_then(|a| a.parse().ok());
        }
        column_type if column_type.takes_limit() => {
            parsed.limit = args.first().and_then(|a| a.parse().ok());
        }
        ColumnType::Other(_) => {
            let verbatim = text.trim();
            let verbatim = verbatim
                .strip_suffix(" unsigned")
                .unwrap_or(verbatim)
                .to_string();
            parsed.column_type = ColumnType::Other(verbatim);
        }
        _ => {}
    }

    parsed
}

/// Interprets `COLUMNS.COLUMN_DEFAULT` for a column.
#[must_use]
pub fn parse_default(
    default: Option<&str>,
    column_type: &ColumnType,
    extra: &str,
) -> Option<DefaultValue> {
    let default = default?;
    if default.eq_ignore_ascii_case("NULL") && !column_type_is_textual(column_type) {
        return None;
    }

    let upper = default.to_ascii_uppercase();
    if extra.to_ascii_lowercase().contains("default_generated")
        || upper.starts_with("CURRENT_TIMESTAMP")
        || upper == "NOW()"
    {
        return Some(DefaultValue::expression(default));
    }

    if column_type.is_integer() || *column_type == ColumnType::Boolean {
        if let Ok(value) = default.parse() {
            return Some(DefaultValue::Integer(value));
        }
    }
    if column_type.is_numeric() {
        if let Ok(value) = default.parse() {
            return Some(DefaultValue::Float(value));
        }
    }

    Some(DefaultValue::String(default.to_string()))
}

fn column_type_is_textual(column_type: &ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::Char
            | ColumnType::Varchar
            | ColumnType::TinyText
            | ColumnType::Text
            | ColumnType::MediumText
            | ColumnType::LongText
    )
}

/// Returns the text after the column list of a `CREATE TABLE` statement.
fn create_table_tail(create: &str) -> Option<&str> {
    create.rfind("\n)").map(|end| &create[end + 2..])
}
