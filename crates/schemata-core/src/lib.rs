//! Declarative schema management for MySQL.
//!
//! `schemata-core` reconciles a declared schema with the schema of a live
//! database:
//!
//! - **Schema** - Value types for tables, columns, indexes, foreign keys and
//!   table options, read from and dumped to JSON
//! - **Differencer** - Compares two snapshots into a [`delta::Delta`]
//! - **Normalizer** - Canonicalizes option text so cosmetic differences in
//!   MySQL's echoed DDL do not count as changes
//! - **Policy** - Splits option changes into actionable and advisory ones
//!   from [`config::Config`] flags
//! - **Planner** - Orders actionable changes into MySQL DDL statements
//! - **Executor** - Runs the statements one by one, halting on the first
//!   failure
//!
//! Reading the live catalog and talking to a server are left to driver
//! crates through the [`introspect::Introspect`] and
//! [`executor::DdlConnection`] traits. [`memory::MemoryDatabase`]
//! implements both without a server.
//!
//! # Example
//!
//! ```rust
//! use schemata_core::prelude::*;
//!
//! let actual = SchemaSnapshot::from_tables([TableDef::new("employees")
//!     .column(ColumnDef::new("id", ColumnType::Int).not_null())
//!     .comment("old comment")])
//! .unwrap();
//! let desired = SchemaSnapshot::from_tables([TableDef::new("employees")
//!     .column(ColumnDef::new("id", ColumnType::Int).not_null())
//!     .comment("new comment")])
//! .unwrap();
//!
//! let reporter = RecordingReporter::new();
//! let mut migrator = Migrator::new(Config::new(), &reporter);
//! migrator.diff(&desired, &actual).unwrap();
//!
//! // Comment changes are only reported by default.
//! assert!(!migrator.differ());
//! assert_eq!(
//!     reporter.messages(),
//!     vec![
//!         "[WARNING] Table option changes are ignored on `employees`.\n  \
//!          from: {:comment=>\"old comment\"}\n    \
//!          to: {:comment=>\"new comment\"}\n"
//!     ]
//! );
//! ```

pub mod config;
pub mod delta;
pub mod dialect;
pub mod differ;
pub mod dump;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod memory;
pub mod normalize;
pub mod operation;
pub mod options;
pub mod planner;
pub mod policy;
pub mod reporter;
pub mod schema;
pub mod table_options;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::delta::{Delta, Placement, TableChange, TableDelta};
    pub use crate::dialect::{DdlDialect, MysqlDialect};
    pub use crate::differ::Differencer;
    pub use crate::dump::{dump, DumpOptions};
    pub use crate::error::{Result, SchemaError};
    pub use crate::executor::{DdlConnection, MigrationReport, Migrator, MigratorState};
    pub use crate::introspect::Introspect;
    pub use crate::memory::MemoryDatabase;
    pub use crate::operation::DdlOperation;
    pub use crate::options::{OptionKey, OptionValue};
    pub use crate::planner::{DdlPlanner, Plan, Statement};
    pub use crate::policy::{format_warning, OptionPolicy};
    pub use crate::reporter::{NoopReporter, RecordingReporter, Reporter, TracingReporter};
    pub use crate::schema::{
        ColumnDef, ColumnType, DefaultValue, ForeignKeyAction, ForeignKeyDef, IndexDef,
        SchemaSnapshot, TableDef,
    };
}
