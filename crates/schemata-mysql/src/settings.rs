//! Configuration loading for the command line.

use std::fs;
use std::path::Path;

use anyhow::Context;
use schemata_core::config::Config;

/// Flags switched on from the command line.
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Switches {
    /// `--ignore-table-comment`.
    pub ignore_table_comment: bool,
    /// `--mysql-change-table-comment`.
    pub mysql_change_table_comment: bool,
    /// `--mysql-change-table-options`.
    pub mysql_change_table_options: bool,
    /// `--dump-without-table-options`.
    pub dump_without_table_options: bool,
}

/// Builds the engine configuration from an optional JSON file and the
/// command-line switches. A switch turns its flag on; it never turns a
/// flag from the file off.
///
/// # Errors
///
/// Fails when the config file cannot be read or is not valid JSON.
pub fn load_config(path: Option<&Path>, switches: Switches) -> anyhow::Result<Config> {
    let base = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => Config::default(),
    };

    Ok(base
        .ignore_table_comment(base.ignore_table_comment || switches.ignore_table_comment)
        .mysql_change_table_comment(
            base.mysql_change_table_comment || switches.mysql_change_table_comment,
        )
        .mysql_change_table_options(
            base.mysql_change_table_options || switches.mysql_change_table_options,
        )
        .dump_without_table_options(
            base.dump_without_table_options || switches.dump_without_table_options,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = load_config(None, Switches::default()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_and_switches_merge() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ignore_table_comment": true}}"#).unwrap();

        let switches = Switches {
            mysql_change_table_comment: true,
            ..Switches::default()
        };
        let config = load_config(Some(file.path()), switches).unwrap();

        assert!(config.ignore_table_comment);
        assert!(config.mysql_change_table_comment);
        assert!(!config.mysql_change_table_options);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = load_config(Some(file.path()), Switches::default()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
