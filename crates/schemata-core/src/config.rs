//! Engine configuration.

use serde::Deserialize;

/// Flags controlling which table option changes the engine acts on.
///
/// Every flag defaults to `false`. With all defaults, option changes are
/// detected and reported but never applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Config {
    /// Treat table comment differences as silent and never apply them.
    /// Overridden by [`Self::mysql_change_table_comment`].
    pub ignore_table_comment: bool,
    /// Apply table comment differences.
    pub mysql_change_table_comment: bool,
    /// Apply engine, charset, collation, raw option and partition
    /// differences.
    pub mysql_change_table_options: bool,
    /// Leave table options out of dumped schemas.
    pub dump_without_table_options: bool,
}

impl Config {
    /// Creates a configuration with every flag off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `ignore_table_comment`.
    #[must_use]
    pub const fn ignore_table_comment(mut self, enabled: bool) -> Self {
        self.ignore_table_comment = enabled;
        self
    }

    /// Sets `mysql_change_table_comment`.
    #[must_use]
    pub const fn mysql_change_table_comment(mut self, enabled: bool) -> Self {
        self.mysql_change_table_comment = enabled;
        self
    }

    /// Sets `mysql_change_table_options`.
    #[must_use]
    pub const fn mysql_change_table_options(mut self, enabled: bool) -> Self {
        self.mysql_change_table_options = enabled;
        self
    }

    /// Sets `dump_without_table_options`.
    #[must_use]
    pub const fn dump_without_table_options(mut self, enabled: bool) -> Self {
        self.dump_without_table_options = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_off() {
        let config = Config::new();
        assert!(!config.ignore_table_comment);
        assert!(!config.mysql_change_table_comment);
        assert!(!config.mysql_change_table_options);
        assert!(!config.dump_without_table_options);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = serde_json::from_str(r#"{"ignore_table_comment": true}"#).unwrap();
        assert_eq!(config, Config::new().ignore_table_comment(true));
    }
}
