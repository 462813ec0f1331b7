//! MySQL driver for `schemata-core`.
//!
//! - [`MysqlIntrospector`] reads the live schema from `information_schema`
//!   and `SHOW CREATE TABLE`
//! - [`MysqlConnection`] executes planned DDL statements
//!
//! Both work over a `sqlx` MySQL pool.

pub mod connection;
pub mod introspect;
pub mod settings;

pub use connection::MysqlConnection;
pub use introspect::{IntrospectError, MysqlIntrospector};
