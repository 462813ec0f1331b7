//! Dump renderer.
//!
//! Renders a snapshot back into the declarative JSON form read by
//! [`SchemaSnapshot::from_json`]. Output is deterministic: tables come in
//! name order, indexes and foreign keys are sorted by name, and option
//! keys are sorted.

use crate::config::Config;
use crate::error::Result;
use crate::schema::SchemaSnapshot;

/// Options for [`dump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Leave every table option out of the output.
    pub without_table_options: bool,
}

impl From<&Config> for DumpOptions {
    fn from(config: &Config) -> Self {
        Self {
            without_table_options: config.dump_without_table_options,
        }
    }
}

/// Renders `snapshot` as pretty-printed JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`SchemaError::Serialization`] if JSON rendering fails.
pub fn dump(snapshot: &SchemaSnapshot, options: DumpOptions) -> Result<String> {
    let mut snapshot = snapshot.clone();
    for table in snapshot.tables_mut() {
        table.sort_constraints();
        if options.without_table_options {
            table.options.clear();
        }
    }

    let mut out = serde_json::to_string_pretty(&snapshot)?;
    out.push('\n');
    Ok(out)
}
