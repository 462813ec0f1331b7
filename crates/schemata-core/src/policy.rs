//! Option policy: which table option changes get applied.
//!
//! Detected option changes are split into an actionable subset, which the
//! planner turns into DDL, and an advisory subset, which is only reported.
//! The split is driven entirely by [`Config`]:
//!
//! | key | actionable when | silent when |
//! |---|---|---|
//! | `comment` | `mysql_change_table_comment` | `ignore_table_comment` |
//! | `engine`, `charset`, `collation`, `options` | `mysql_change_table_options` and a desired value exists | never |
//! | `partition` | `mysql_change_table_options` | never |
//! | `primary_key`, others | never | never |
//!
//! Advisory changes that are not silent produce one warning per table,
//! rendered by [`format_warning`].

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::Config;
use crate::delta::{Delta, OptionChange, TableChange};
use crate::options::{render_option_map, OptionKey, OptionValue};

/// What the policy decided for one option change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionDisposition {
    /// Goes into the plan.
    Actionable,
    /// Left out of the plan.
    Advisory {
        /// Whether the operator is warned about it.
        warn: bool,
    },
}

/// Classifies option changes from configuration flags.
#[derive(Debug, Clone, Copy)]
pub struct OptionPolicy {
    config: Config,
}

impl OptionPolicy {
    /// Creates a policy for the given flags.
    #[must_use]
    pub const fn new(config: &Config) -> Self {
        Self { config: *config }
    }

    /// Decides what happens to one option change.
    #[must_use]
    pub fn disposition(&self, key: &OptionKey, change: &OptionChange) -> OptionDisposition {
        let warned = OptionDisposition::Advisory { warn: true };
        match key {
            OptionKey::Comment => {
                if self.config.mysql_change_table_comment {
                    OptionDisposition::Actionable
                } else if self.config.ignore_table_comment {
                    OptionDisposition::Advisory { warn: false }
                } else {
                    warned
                }
            }
            OptionKey::Partition if self.config.mysql_change_table_options => {
                OptionDisposition::Actionable
            }
            OptionKey::Engine | OptionKey::Charset | OptionKey::Collation | OptionKey::Options
                if self.config.mysql_change_table_options && change.to.is_some() =>
            {
                OptionDisposition::Actionable
            }
            _ => warned,
        }
    }

    /// Fills the actionable and advisory subsets of every altered table and
    /// returns the warnings to report, one per table at most, in table name
    /// order.
    pub fn classify(&self, delta: &mut Delta) -> Vec<String> {
        let mut warnings = Vec::new();

        for (table, change) in delta.iter_mut() {
            let TableChange::Alter(table_delta) = change else {
                continue;
            };

            table_delta.actionable.clear();
            table_delta.advisory.clear();
            let mut from = BTreeMap::new();
            let mut to = BTreeMap::new();

            for (key, option) in &table_delta.changed_options {
                match self.disposition(key, option) {
                    OptionDisposition::Actionable => {
                        table_delta.actionable.insert(key.clone(), option.clone());
                    }
                    OptionDisposition::Advisory { warn } => {
                        table_delta.advisory.insert(key.clone(), option.clone());
                        if warn {
                            if let Some(value) = &option.from {
                                from.insert(key, value);
                            }
                            if let Some(value) = &option.to {
                                to.insert(key, value);
                            }
                        }
                    }
                }
            }

            debug!(
                table,
                actionable = table_delta.actionable.len(),
                advisory = table_delta.advisory.len(),
                "Classified option changes"
            );

            if !from.is_empty() || !to.is_empty() {
                warnings.push(format_warning(table, from, to));
            }
        }

        warnings
    }
}

/// Renders the warning for advisory option changes on one table.
///
/// ```text
/// [WARNING] Table option changes are ignored on `employees`.
///   from: {:comment=>"old comment"}
///     to: {:comment=>"new comment"}
/// ```
///
/// The text ends with a newline.
#[must_use]
pub fn format_warning<'a, F, T>(table: &str, from: F, to: T) -> String
where
    F: IntoIterator<Item = (&'a OptionKey, &'a OptionValue)>,
    T: IntoIterator<Item = (&'a OptionKey, &'a OptionValue)>,
{
    format!(
        "[WARNING] Table option changes are ignored on `{table}`.\n  from: {}\n    to: {}\n",
        render_option_map(from),
        render_option_map(to)
    )
}
