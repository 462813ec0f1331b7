//! Schema representation types.
//!
//! These types describe the structure of database tables and are shared by
//! the declarative schema source (what the code expects) and the live
//! introspector (what the database has), so both sides of a diff have the
//! same shape.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::options::{OptionKey, OptionValue};

/// MySQL column types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    /// 8-bit integer.
    TinyInt,
    /// 16-bit integer.
    SmallInt,
    /// 24-bit integer.
    MediumInt,
    /// 32-bit integer.
    Int,
    /// 64-bit integer.
    BigInt,
    /// Fixed-point number.
    Decimal,
    /// Single precision float.
    Float,
    /// Double precision float.
    Double,
    /// Fixed-length string.
    Char,
    /// Variable-length string.
    Varchar,
    /// Fixed-length binary.
    Binary,
    /// Variable-length binary.
    VarBinary,
    /// Text up to 255 bytes.
    TinyText,
    /// Text up to 64KB.
    Text,
    /// Text up to 16MB.
    MediumText,
    /// Text up to 4GB.
    LongText,
    /// Blob up to 255 bytes.
    TinyBlob,
    /// Blob up to 64KB.
    Blob,
    /// Blob up to 16MB.
    MediumBlob,
    /// Blob up to 4GB.
    LongBlob,
    /// Date only.
    Date,
    /// Date and time.
    DateTime,
    /// Timestamp.
    Timestamp,
    /// Time only.
    Time,
    /// Year.
    Year,
    /// JSON document.
    Json,
    /// Boolean, stored as `tinyint(1)`.
    Boolean,
    /// Any other declared type, rendered verbatim.
    Other(String),
}

impl ColumnType {
    /// Returns the MySQL type name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::MediumInt => "mediumint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Binary => "binary",
            Self::VarBinary => "varbinary",
            Self::TinyText => "tinytext",
            Self::Text => "text",
            Self::MediumText => "mediumtext",
            Self::LongText => "longtext",
            Self::TinyBlob => "tinyblob",
            Self::Blob => "blob",
            Self::MediumBlob => "mediumblob",
            Self::LongBlob => "longblob",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Time => "time",
            Self::Year => "year",
            Self::Json => "json",
            Self::Boolean => "boolean",
            Self::Other(name) => name,
        }
    }

    /// Parses a declared type name. Unknown names become [`Self::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "tinyint" => Self::TinyInt,
            "smallint" => Self::SmallInt,
            "mediumint" => Self::MediumInt,
            "int" | "integer" => Self::Int,
            "bigint" => Self::BigInt,
            "decimal" | "numeric" => Self::Decimal,
            "float" => Self::Float,
            "double" => Self::Double,
            "char" => Self::Char,
            "varchar" => Self::Varchar,
            "binary" => Self::Binary,
            "varbinary" => Self::VarBinary,
            "tinytext" => Self::TinyText,
            "text" => Self::Text,
            "mediumtext" => Self::MediumText,
            "longtext" => Self::LongText,
            "tinyblob" => Self::TinyBlob,
            "blob" => Self::Blob,
            "mediumblob" => Self::MediumBlob,
            "longblob" => Self::LongBlob,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "timestamp" => Self::Timestamp,
            "time" => Self::Time,
            "year" => Self::Year,
            "json" => Self::Json,
            "bool" | "boolean" => Self::Boolean,
            _ => Self::Other(name.trim().to_string()),
        }
    }

    /// Returns whether the type needs a length (`varchar(255)`).
    #[must_use]
    pub fn takes_limit(&self) -> bool {
        matches!(
            self,
            Self::Char | Self::Varchar | Self::Binary | Self::VarBinary
        )
    }

    /// Returns whether the type is an integer type.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::TinyInt | Self::SmallInt | Self::MediumInt | Self::Int | Self::BigInt
        )
    }

    /// Returns whether the type accepts `unsigned`.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Self::Decimal | Self::Float | Self::Double)
    }
}

impl From<String> for ColumnType {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        column_type.name().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default value for a column.
///
/// A nullable column without a default and one declared `DEFAULT NULL`
/// are the same thing in MySQL, so there is no NULL variant: use `None`
/// on the column instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// SQL expression (e.g., `CURRENT_TIMESTAMP`).
    Expression {
        /// The expression text.
        expression: String,
    },
}

impl DefaultValue {
    /// Creates an expression default.
    #[must_use]
    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.into(),
        }
    }

    /// Returns the SQL representation of this default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => quote_literal(s),
            Self::Expression { expression } => expression.clone(),
        }
    }
}

/// Quotes a MySQL string literal.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "''"))
}

/// Foreign key action (ON DELETE, ON UPDATE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKeyAction {
    /// No action (error if referenced row is deleted/updated).
    #[default]
    NoAction,
    /// Restrict (same as `NoAction` in InnoDB).
    Restrict,
    /// Cascade the delete/update to referencing rows.
    Cascade,
    /// Set the foreign key column to NULL.
    SetNull,
    /// Set the foreign key column to its default value.
    SetDefault,
}

impl ForeignKeyAction {
    /// Returns the SQL representation of this action.
    #[must_use]
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses a referential rule as reported by the catalog.
    #[must_use]
    pub fn from_sql(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().as_str() {
            "NO ACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Returns whether two actions behave the same. InnoDB treats
    /// `NO ACTION` as `RESTRICT`.
    #[must_use]
    pub fn is_equivalent(self, other: Self) -> bool {
        let canonical = |action: Self| match action {
            Self::Restrict => Self::NoAction,
            other => other,
        };
        canonical(self) == canonical(other)
    }
}

const fn default_true() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

/// Schema definition for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column allows NULL values.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    /// Length for sized string and binary types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Precision for decimal types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    /// Scale for decimal types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u8>,
    /// Whether a numeric column is unsigned.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    /// Whether this column auto-increments.
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Zero-based ordinal position inside the table. Maintained by
    /// [`TableDef`]; not part of attribute comparison.
    #[serde(skip)]
    pub position: usize,
}

impl ColumnDef {
    /// Creates a new nullable column.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            limit: None,
            precision: None,
            scale: None,
            unsigned: false,
            auto_increment: false,
            comment: None,
            position: 0,
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Sets the length.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets decimal precision and scale.
    #[must_use]
    pub fn precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Marks the column unsigned.
    #[must_use]
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Sets the column to auto-increment.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Sets the column comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the names of the attributes that differ from `other`.
    ///
    /// The name and ordinal position are not compared.
    #[must_use]
    pub fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.column_type != other.column_type {
            fields.push("type");
        }
        if self.nullable != other.nullable {
            fields.push("nullable");
        }
        if self.default != other.default {
            fields.push("default");
        }
        if self.limit != other.limit {
            fields.push("limit");
        }
        if self.precision != other.precision {
            fields.push("precision");
        }
        if self.scale != other.scale {
            fields.push("scale");
        }
        if self.unsigned != other.unsigned {
            fields.push("unsigned");
        }
        if self.auto_increment != other.auto_increment {
            fields.push("auto_increment");
        }
        if self.comment != other.comment {
            fields.push("comment");
        }
        fields
    }
}

/// Schema definition for an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name.
    pub name: String,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

impl IndexDef {
    /// Creates a non-unique index.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            unique: false,
        }
    }

    /// Marks the index unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Schema definition for a foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name.
    pub name: String,
    /// Column(s) in the referencing table.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub referenced_table: String,
    /// Referenced column(s).
    pub referenced_columns: Vec<String>,
    /// Action on delete.
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    /// Action on update.
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl ForeignKeyDef {
    /// Creates a foreign key with default actions.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        referenced_table: impl Into<String>,
        referenced_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            columns,
            referenced_table: referenced_table.into(),
            referenced_columns,
            on_delete: ForeignKeyAction::NoAction,
            on_update: ForeignKeyAction::NoAction,
        }
    }

    /// Sets the ON DELETE action.
    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    #[must_use]
    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }

    /// Returns whether both constraints enforce the same reference.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.referenced_table == other.referenced_table
            && self.referenced_columns == other.referenced_columns
            && self.on_delete.is_equivalent(other.on_delete)
            && self.on_update.is_equivalent(other.on_update)
    }
}

/// Complete schema definition for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Column definitions in physical order.
    pub columns: Vec<ColumnDef>,
    /// Index definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexDef>,
    /// Foreign key definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Table options.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<OptionKey, OptionValue>,
}

impl TableDef {
    /// Creates a new table schema.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, mut column: ColumnDef) -> Self {
        column.position = self.columns.len();
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexDef) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Sets a table option.
    #[must_use]
    pub fn option(mut self, key: OptionKey, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key, value.into());
        self
    }

    /// Sets the table comment.
    #[must_use]
    pub fn comment(self, comment: impl Into<String>) -> Self {
        self.option(OptionKey::Comment, OptionValue::Text(comment.into()))
    }

    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key(self, columns: Vec<String>) -> Self {
        self.option(OptionKey::PrimaryKey, OptionValue::List(columns))
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Gets an index by name.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Gets a foreign key by name.
    #[must_use]
    pub fn get_foreign_key(&self, name: &str) -> Option<&ForeignKeyDef> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    /// Gets a table option.
    #[must_use]
    pub fn get_option(&self, key: &OptionKey) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Returns the primary key columns, if declared.
    #[must_use]
    pub fn primary_key_columns(&self) -> Option<&[String]> {
        self.options.get(&OptionKey::PrimaryKey)?.as_list()
    }

    /// Resets every column's ordinal position to its index.
    pub fn renumber(&mut self) {
        for (position, column) in self.columns.iter_mut().enumerate() {
            column.position = position;
        }
    }

    /// Sorts indexes and foreign keys by name.
    pub(crate) fn sort_constraints(&mut self) {
        self.indexes.sort_by(|a, b| a.name.cmp(&b.name));
        self.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Checks the table on its own: unique names, known columns, limits.
    fn validate(&self) -> Result<()> {
        let table = &self.name;
        if table.is_empty() {
            return Err(SchemaError::parse("table with an empty name"));
        }

        let mut columns = HashSet::new();
        for column in &self.columns {
            if !columns.insert(column.name.as_str()) {
                return Err(SchemaError::parse(format!(
                    "duplicate column `{}` in `{table}`",
                    column.name
                )));
            }
            if column.column_type.takes_limit() && column.limit.is_none() {
                return Err(SchemaError::parse(format!(
                    "column `{table}`.`{}` of type {} needs a limit",
                    column.name, column.column_type
                )));
            }
            if !column.column_type.takes_limit() && column.limit.is_some() {
                return Err(SchemaError::parse(format!(
                    "column `{table}`.`{}` of type {} does not take a limit",
                    column.name, column.column_type
                )));
            }
            if column.unsigned && !column.column_type.is_numeric() {
                return Err(SchemaError::parse(format!(
                    "column `{table}`.`{}` of type {} cannot be unsigned",
                    column.name, column.column_type
                )));
            }
        }

        let known = |cols: &[String], what: &str| -> Result<()> {
            if cols.is_empty() {
                return Err(SchemaError::parse(format!("{what} on `{table}` has no columns")));
            }
            for col in cols {
                if !columns.contains(col.as_str()) {
                    return Err(SchemaError::parse(format!(
                        "{what} on `{table}` refers to unknown column `{col}`"
                    )));
                }
            }
            Ok(())
        };

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            if !index_names.insert(index.name.as_str()) {
                return Err(SchemaError::parse(format!(
                    "duplicate index `{}` on `{table}`",
                    index.name
                )));
            }
            known(&index.columns, &format!("index `{}`", index.name))?;
        }

        let mut fk_names = HashSet::new();
        for fk in &self.foreign_keys {
            if !fk_names.insert(fk.name.as_str()) {
                return Err(SchemaError::parse(format!(
                    "duplicate foreign key `{}` on `{table}`",
                    fk.name
                )));
            }
            known(&fk.columns, &format!("foreign key `{}`", fk.name))?;
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(SchemaError::parse(format!(
                    "foreign key `{}` on `{table}` has {} columns but references {}",
                    fk.name,
                    fk.columns.len(),
                    fk.referenced_columns.len()
                )));
            }
        }

        match self.options.get(&OptionKey::PrimaryKey) {
            Some(OptionValue::List(pk)) => known(pk, "primary key")?,
            Some(OptionValue::Text(_)) => {
                return Err(SchemaError::parse(format!(
                    "primary key on `{table}` must be a list of columns"
                )));
            }
            None => {}
        }

        Ok(())
    }
}

/// Serialized form of a snapshot: a list of tables.
#[derive(Serialize, Deserialize)]
struct SnapshotRepr {
    tables: Vec<TableDef>,
}

/// The complete schema of a database at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotRepr", into = "SnapshotRepr")]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, TableDef>,
}

impl TryFrom<SnapshotRepr> for SchemaSnapshot {
    type Error = SchemaError;

    fn try_from(repr: SnapshotRepr) -> Result<Self> {
        Self::from_tables(repr.tables)
    }
}

impl From<SchemaSnapshot> for SnapshotRepr {
    fn from(snapshot: SchemaSnapshot) -> Self {
        Self {
            tables: snapshot.tables.into_values().collect(),
        }
    }
}

impl SchemaSnapshot {
    /// Creates a new empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table, replacing any table with the same name.
    ///
    /// Builder for tests and programmatic schemas; call [`Self::validate`]
    /// before diffing a snapshot assembled this way.
    #[must_use]
    pub fn table(mut self, mut table: TableDef) -> Self {
        table.renumber();
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Builds a validated snapshot from a list of tables.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] on duplicate tables or a failed
    /// [`Self::validate`].
    pub fn from_tables(tables: impl IntoIterator<Item = TableDef>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for mut table in tables {
            table.renumber();
            table.sort_constraints();
            if let Some(previous) = map.insert(table.name.clone(), table) {
                return Err(SchemaError::parse(format!(
                    "duplicate table `{}`",
                    previous.name
                )));
            }
        }
        let snapshot = Self { tables: map };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Parses a snapshot from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] for malformed JSON or an invalid schema.
    pub fn from_json(source: &str) -> Result<Self> {
        // Validation errors surface through serde as a custom message.
        serde_json::from_str(source).map_err(|e| SchemaError::parse(e.to_string()))
    }

    /// Checks every table, and that foreign keys reference tables and
    /// columns present in this snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Parse`] naming the first problem found.
    pub fn validate(&self) -> Result<()> {
        for table in self.tables.values() {
            table.validate()?;
            for fk in &table.foreign_keys {
                let target = self.get_table(&fk.referenced_table).ok_or_else(|| {
                    SchemaError::parse(format!(
                        "foreign key `{}` on `{}` references unknown table `{}`",
                        fk.name, table.name, fk.referenced_table
                    ))
                })?;
                for col in &fk.referenced_columns {
                    if target.get_column(col).is_none() {
                        return Err(SchemaError::parse(format!(
                            "foreign key `{}` on `{}` references unknown column `{}`.`{col}`",
                            fk.name, table.name, fk.referenced_table
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Gets a table by name.
    #[must_use]
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Returns all tables ordered by name.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    /// Returns table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns the number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns whether the snapshot has no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub(crate) fn get_table_mut(&mut self, name: &str) -> Option<&mut TableDef> {
        self.tables.get_mut(name)
    }

    pub(crate) fn insert_table(&mut self, table: TableDef) {
        self.tables.insert(table.name.clone(), table);
    }

    pub(crate) fn remove_table(&mut self, name: &str) -> Option<TableDef> {
        self.tables.remove(name)
    }

    pub(crate) fn tables_mut(&mut self) -> impl Iterator<Item = &mut TableDef> {
        self.tables.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employees() -> TableDef {
        TableDef::new("employees")
            .column(ColumnDef::new("id", ColumnType::BigInt).not_null().auto_increment())
            .column(ColumnDef::new("first_name", ColumnType::Varchar).limit(14).not_null())
            .column(ColumnDef::new("hire_date", ColumnType::Date).not_null())
            .primary_key(vec!["id".to_string()])
            .comment("old comment")
    }

    #[test]
    fn test_table_builder_assigns_positions() {
        let table = employees();
        let positions: Vec<usize> = table.columns.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(table.primary_key_columns(), Some(&["id".to_string()][..]));
    }

    #[test]
    fn test_column_type_parse() {
        assert_eq!(ColumnType::parse("VARCHAR"), ColumnType::Varchar);
        assert_eq!(ColumnType::parse("integer"), ColumnType::Int);
        assert_eq!(
            ColumnType::parse("geometry"),
            ColumnType::Other("geometry".to_string())
        );
    }

    #[test]
    fn test_changed_fields_ignores_position() {
        let mut a = ColumnDef::new("name", ColumnType::Varchar).limit(14);
        let b = ColumnDef::new("name", ColumnType::Varchar).limit(16).not_null();
        a.position = 7;
        assert_eq!(a.changed_fields(&b), vec!["nullable", "limit"]);
        assert!(a.changed_fields(&a.clone()).is_empty());
    }

    #[test]
    fn test_default_value_to_sql() {
        assert_eq!(DefaultValue::Integer(42).to_sql(), "42");
        assert_eq!(DefaultValue::String("it's".to_string()).to_sql(), "'it''s'");
        assert_eq!(
            DefaultValue::expression("CURRENT_TIMESTAMP").to_sql(),
            "CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_foreign_key_restrict_equals_no_action() {
        let a = ForeignKeyDef::new("fk", vec!["a".into()], "t", vec!["id".into()])
            .on_delete(ForeignKeyAction::Restrict);
        let b = ForeignKeyDef::new("fk", vec!["a".into()], "t", vec!["id".into()]);
        assert!(a.same_definition(&b));
        assert!(!a.same_definition(&b.clone().on_delete(ForeignKeyAction::Cascade)));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let snapshot = SchemaSnapshot::from_tables([employees()]).unwrap();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed = SchemaSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_from_json_reads_declarative_source() {
        let source = r#"{
            "tables": [{
                "name": "employees",
                "columns": [
                    {"name": "id", "type": "bigint", "nullable": false, "unsigned": true, "auto_increment": true},
                    {"name": "gender", "type": "varchar", "limit": 1, "nullable": false, "default": "F"},
                    {"name": "created_at", "type": "datetime", "default": {"expression": "CURRENT_TIMESTAMP"}}
                ],
                "indexes": [{"name": "idx_gender", "columns": ["gender"]}],
                "options": {"primary_key": ["id"], "comment": "staff", "engine": "InnoDB"}
            }]
        }"#;

        let snapshot = SchemaSnapshot::from_json(source).unwrap();
        let table = snapshot.get_table("employees").unwrap();
        assert_eq!(table.columns.len(), 3);
        assert_eq!(table.columns[2].position, 2);
        assert_eq!(
            table.get_column("gender").unwrap().default,
            Some(DefaultValue::String("F".to_string()))
        );
        assert_eq!(
            table.get_column("created_at").unwrap().default,
            Some(DefaultValue::expression("CURRENT_TIMESTAMP"))
        );
        assert_eq!(
            table.get_option(&OptionKey::Comment),
            Some(&OptionValue::from("staff"))
        );
    }

    #[test]
    fn test_rejects_duplicate_table() {
        let err = SchemaSnapshot::from_tables([employees(), employees()]).unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }

    #[test]
    fn test_rejects_varchar_without_limit() {
        let table = TableDef::new("t").column(ColumnDef::new("name", ColumnType::Varchar));
        assert!(SchemaSnapshot::from_tables([table]).is_err());
    }

    #[test]
    fn test_rejects_index_on_unknown_column() {
        let table = employees().index(IndexDef::new("idx", vec!["missing".to_string()]));
        let err = SchemaSnapshot::from_tables([table]).unwrap_err();
        assert!(err.to_string().contains("unknown column `missing`"));
    }

    #[test]
    fn test_rejects_foreign_key_to_unknown_table() {
        let table = employees().foreign_key(ForeignKeyDef::new(
            "fk_dept",
            vec!["id".to_string()],
            "departments",
            vec!["id".to_string()],
        ));
        let err = SchemaSnapshot::from_tables([table]).unwrap_err();
        assert!(err.to_string().contains("unknown table `departments`"));
    }

    #[test]
    fn test_from_json_reports_malformed_source() {
        let err = SchemaSnapshot::from_json(r#"{"tables": [{"name": 1}]}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }
}
