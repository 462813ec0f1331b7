//! Splitting of raw table option text into keyed options.
//!
//! MySQL reports table options as one tail after the column list of
//! `SHOW CREATE TABLE`, and a declared schema may carry the same text
//! under its `options` key:
//!
//! ```text
//! ENGINE=InnoDB AUTO_INCREMENT=12 DEFAULT CHARSET=utf8mb4 COMMENT='staff'
//! /*!50100 PARTITION BY HASH (id) PARTITIONS 4 */
//! ```
//!
//! Both sides are brought to the keyed form by [`split_table_options`]
//! before they are compared.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::options::{OptionKey, OptionValue};

/// Table options found in a raw options tail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptionsTail {
    /// `ENGINE=`.
    pub engine: Option<String>,
    /// `DEFAULT CHARSET=`.
    pub charset: Option<String>,
    /// `COLLATE=`.
    pub collation: Option<String>,
    /// `COMMENT='...'`, unescaped.
    pub comment: Option<String>,
    /// Everything else, except `AUTO_INCREMENT`.
    pub options: Option<String>,
    /// The partitioning clause, version comment included.
    pub partition: Option<String>,
}

fn engine_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bENGINE\s*=\s*(\w+)").expect("valid regex"))
}

fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:DEFAULT\s+)?(?:CHARSET|CHARACTER\s+SET)\s*=\s*(\w+)")
            .expect("valid regex")
    })
}

fn collate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:DEFAULT\s+)?COLLATE\s*=\s*(\w+)").expect("valid regex"))
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bCOMMENT\s*=\s*'((?:[^'\\]|\\.|'')*)'").expect("valid regex")
    })
}

fn auto_increment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bAUTO_INCREMENT\s*=\s*\d+").expect("valid regex"))
}

fn partition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)(?:/\*!\d+\s*)?PARTITION\s+BY\b.*$").expect("valid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Splits a raw options tail into its parts.
///
/// `AUTO_INCREMENT=n` is dropped; it is a counter, not a declaration.
#[must_use]
pub fn split_table_options(tail: &str) -> TableOptionsTail {
    let (head, partition) = partition_re().find(tail).map_or((tail, None), |m| {
        (&tail[..m.start()], Some(m.as_str().trim().to_string()))
    });

    let capture = |re: &Regex| {
        re.captures(head)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    let engine = capture(engine_re());
    let charset = capture(charset_re());
    let collation = capture(collate_re());
    let comment = capture(comment_re()).map(|text| unescape_literal(&text));

    let mut rest = head.to_string();
    for re in [
        comment_re(),
        auto_increment_re(),
        engine_re(),
        charset_re(),
        collate_re(),
    ] {
        rest = re.replace_all(&rest, " ").into_owned();
    }
    let rest = whitespace_re().replace_all(rest.trim(), " ").into_owned();

    TableOptionsTail {
        engine,
        charset,
        collation,
        comment,
        options: (!rest.is_empty()).then_some(rest),
        partition,
    }
}

/// Undoes MySQL string escaping: doubled quotes and backslash escapes.
fn unescape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                chars.next();
                out.push('\'');
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => {}
            },
            c => out.push(c),
        }
    }
    out
}

/// Returns whether MySQL reports `key` for every table, declared or not.
#[must_use]
pub fn is_server_reported(key: &OptionKey) -> bool {
    matches!(
        key,
        OptionKey::Engine | OptionKey::Charset | OptionKey::Collation
    )
}

/// Replaces a raw `options` text value with the keys it carries.
///
/// A key set explicitly wins over the same setting found in the raw text.
/// Whatever the splitter does not recognize stays under `options`.
#[must_use]
pub fn expand_options(
    options: &BTreeMap<OptionKey, OptionValue>,
) -> BTreeMap<OptionKey, OptionValue> {
    let mut expanded = options.clone();
    let raw = match expanded.get(&OptionKey::Options) {
        Some(OptionValue::Text(raw)) => raw.clone(),
        _ => return expanded,
    };
    expanded.remove(&OptionKey::Options);

    let parts = split_table_options(&raw);
    for (key, value) in [
        (OptionKey::Engine, parts.engine),
        (OptionKey::Charset, parts.charset),
        (OptionKey::Collation, parts.collation),
        (OptionKey::Comment, parts.comment),
        (OptionKey::Partition, parts.partition),
        (OptionKey::Options, parts.options),
    ] {
        if let Some(value) = value {
            expanded.entry(key).or_insert(OptionValue::Text(value));
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_common_tail() {
        let tail = " ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 \
                    COLLATE=utf8mb4_bin COMMENT='it''s staff'";
        assert_eq!(
            split_table_options(tail),
            TableOptionsTail {
                engine: Some("InnoDB".to_string()),
                charset: Some("utf8mb4".to_string()),
                collation: Some("utf8mb4_bin".to_string()),
                comment: Some("it's staff".to_string()),
                options: None,
                partition: None,
            }
        );
    }

    #[test]
    fn test_split_keeps_other_options() {
        let parts = split_table_options(
            " ENGINE=InnoDB DEFAULT CHARSET=latin1 ROW_FORMAT=COMPRESSED KEY_BLOCK_SIZE=8",
        );
        assert_eq!(
            parts.options.as_deref(),
            Some("ROW_FORMAT=COMPRESSED KEY_BLOCK_SIZE=8")
        );
    }

    #[test]
    fn test_split_partition_clause() {
        let tail = " ENGINE=InnoDB DEFAULT CHARSET=utf8mb4\n\
                    /*!50500 PARTITION BY RANGE  COLUMNS(created_at)\n\
                    (PARTITION p0 VALUES LESS THAN ('2016-10-01') ENGINE = InnoDB) */";
        let parts = split_table_options(tail);
        assert_eq!(parts.engine.as_deref(), Some("InnoDB"));
        assert_eq!(parts.options, None);
        assert_eq!(
            parts.partition.as_deref(),
            Some(
                "/*!50500 PARTITION BY RANGE  COLUMNS(created_at)\n\
                 (PARTITION p0 VALUES LESS THAN ('2016-10-01') ENGINE = InnoDB) */"
            )
        );
    }

    #[test]
    fn test_comment_escapes() {
        let parts = split_table_options(r"COMMENT='a\\b \'c\' d'");
        assert_eq!(parts.comment.as_deref(), Some(r"a\b 'c' d"));
    }

    #[test]
    fn test_expand_raw_options() {
        let mut options = BTreeMap::new();
        options.insert(
            OptionKey::Options,
            OptionValue::from("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 ROW_FORMAT=DYNAMIC"),
        );

        let expanded = expand_options(&options);
        assert_eq!(expanded[&OptionKey::Engine], OptionValue::from("InnoDB"));
        assert_eq!(expanded[&OptionKey::Charset], OptionValue::from("utf8mb4"));
        assert_eq!(
            expanded[&OptionKey::Options],
            OptionValue::from("ROW_FORMAT=DYNAMIC")
        );
        assert!(!expanded.contains_key(&OptionKey::Collation));
    }

    #[test]
    fn test_expand_keeps_explicit_keys() {
        let mut options = BTreeMap::new();
        options.insert(OptionKey::Engine, OptionValue::from("MyISAM"));
        options.insert(OptionKey::Options, OptionValue::from("ENGINE=InnoDB"));

        let expanded = expand_options(&options);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[&OptionKey::Engine], OptionValue::from("MyISAM"));
    }

    #[test]
    fn test_expand_moves_partition_out_of_options() {
        let mut options = BTreeMap::new();
        options.insert(
            OptionKey::Options,
            OptionValue::from(
                "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4\n/*!50500 PARTITION BY HASH (id) PARTITIONS 4 */",
            ),
        );

        let expanded = expand_options(&options);
        assert!(!expanded.contains_key(&OptionKey::Options));
        assert_eq!(
            expanded[&OptionKey::Partition],
            OptionValue::from("/*!50500 PARTITION BY HASH (id) PARTITIONS 4 */")
        );
    }
}
