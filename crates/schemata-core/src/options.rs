//! Table-level options.
//!
//! Options are kept as a map from a tagged [`OptionKey`] to an
//! [`OptionValue`]. Known keys get their own normalization (see
//! [`crate::normalize`]); anything else is carried as [`OptionKey::Other`]
//! and compared verbatim.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a table option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OptionKey {
    /// `COMMENT='...'`.
    Comment,
    /// `ENGINE=...`.
    Engine,
    /// `DEFAULT CHARSET=...`.
    Charset,
    /// `COLLATE=...`.
    Collation,
    /// Primary key column list.
    PrimaryKey,
    /// Raw table options string.
    Options,
    /// Partitioning clause.
    Partition,
    /// Any other option, compared as raw text.
    Other(String),
}

impl OptionKey {
    /// Returns the option name used in schema sources and warnings.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Comment => "comment",
            Self::Engine => "engine",
            Self::Charset => "charset",
            Self::Collation => "collation",
            Self::PrimaryKey => "primary_key",
            Self::Options => "options",
            Self::Partition => "partition",
            Self::Other(name) => name,
        }
    }

    /// Parses an option name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "comment" => Self::Comment,
            "engine" => Self::Engine,
            "charset" => Self::Charset,
            "collation" => Self::Collation,
            "primary_key" => Self::PrimaryKey,
            "options" => Self::Options,
            "partition" => Self::Partition,
            other => Self::Other(other.to_string()),
        }
    }
}

// Keys order lexicographically by name so every rendering is stable.
impl Ord for OptionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl PartialOrd for OptionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<String> for OptionKey {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<OptionKey> for String {
    fn from(key: OptionKey) -> Self {
        key.name().to_string()
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a table option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Text value.
    Text(String),
    /// List value (primary key columns).
    List(Vec<String>),
}

impl OptionValue {
    /// Returns the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::List(_) => None,
        }
    }

    /// Returns the items, if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::Text(_) => None,
            Self::List(items) => Some(items),
        }
    }

    /// Renders the value as an inspected literal: `"text"` or
    /// `["a", "b"]`.
    #[must_use]
    pub fn inspect(&self) -> String {
        match self {
            Self::Text(text) => inspect_str(text),
            Self::List(items) => {
                let items: Vec<String> = items.iter().map(|s| inspect_str(s)).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

impl From<&str> for OptionValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Quotes a string with escapes for backslash, double quote and control
/// characters.
fn inspect_str(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Renders options as `{:key=>"value", :other=>["a", "b"]}`.
///
/// Keys are emitted in [`OptionKey`] order regardless of input order.
#[must_use]
pub fn render_option_map<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a OptionKey, &'a OptionValue)>,
{
    let sorted: BTreeMap<&OptionKey, &OptionValue> = entries.into_iter().collect();
    let parts: Vec<String> = sorted
        .into_iter()
        .map(|(key, value)| format!(":{}=>{}", key.name(), value.inspect()))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
