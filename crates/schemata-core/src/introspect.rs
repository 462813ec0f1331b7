//! Schema introspection trait.
//!
//! Driver crates (schemata-mysql) implement [`Introspect`] to read the
//! current database schema at runtime. The core crate defines only the
//! trait so it stays driver-agnostic.

use std::future::Future;

use crate::schema::SchemaSnapshot;

/// Introspects a live database to produce a [`SchemaSnapshot`] of the
/// current schema.
///
/// The snapshot must have the same shape as one read from a declarative
/// source: same option keys, same column attributes.
pub trait Introspect {
    /// Error type for introspection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads the current database schema and returns a snapshot.
    fn introspect_schema(
        &self,
    ) -> impl Future<Output = Result<SchemaSnapshot, Self::Error>> + Send;
}
