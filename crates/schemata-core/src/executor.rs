//! Migration executor.
//!
//! [`Migrator`] drives one diff-and-migrate cycle:
//!
//! ```text
//! Idle --diff--> Diffed --migrate--> Planned --> Executing --> Done
//!                                                    \------> Failed
//! ```
//!
//! Statements run one at a time. The first failure stops the run; the
//! statements before it stay applied because MySQL commits DDL
//! implicitly.

use std::fmt;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::delta::Delta;
use crate::differ::Differencer;
use crate::error::{BoxError, Result, SchemaError};
use crate::introspect::Introspect;
use crate::planner::{DdlPlanner, Plan, Statement};
use crate::policy::OptionPolicy;
use crate::reporter::Reporter;
use crate::schema::SchemaSnapshot;

/// A connection that executes DDL statements.
pub trait DdlConnection {
    /// Error type for failed statements.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Executes one statement.
    fn execute(
        &mut self,
        statement: &Statement,
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send;
}

/// Lifecycle state of a [`Migrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigratorState {
    /// Nothing computed yet.
    Idle,
    /// A delta is available.
    Diffed,
    /// Statements are planned.
    Planned,
    /// Statements are running.
    Executing,
    /// Every statement succeeded.
    Done,
    /// A statement failed.
    Failed,
}

impl fmt::Display for MigratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Diffed => "diffed",
            Self::Planned => "planned",
            Self::Executing => "executing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// SQL of every executed statement, in order.
    pub executed: Vec<String>,
}

/// Diffs a desired schema against a live one and applies the result.
pub struct Migrator<R: Reporter> {
    config: Config,
    reporter: R,
    differencer: Differencer,
    planner: DdlPlanner,
    state: MigratorState,
    delta: Option<Delta>,
    plan: Option<Plan>,
}

impl<R: Reporter> Migrator<R> {
    /// Creates a migrator. Advisory warnings go to `reporter`.
    #[must_use]
    pub fn new(config: Config, reporter: R) -> Self {
        Self {
            config,
            reporter,
            differencer: Differencer::new(),
            planner: DdlPlanner::new(),
            state: MigratorState::Idle,
            delta: None,
            plan: None,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> MigratorState {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the reporter.
    #[must_use]
    pub const fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Returns the last computed delta, if any.
    #[must_use]
    pub const fn delta(&self) -> Option<&Delta> {
        self.delta.as_ref()
    }

    /// Returns whether migrating would change the database. `false` before
    /// [`Self::diff`].
    #[must_use]
    pub fn differ(&self) -> bool {
        self.delta.as_ref().is_some_and(Delta::differ)
    }

    /// Computes and classifies the delta between `desired` and `actual`.
    ///
    /// Reports one warning per table with advisory option changes that
    /// are not silenced. Allowed from any state except `Executing`; a
    /// failed diff leaves the migrator `Idle`.
    ///
    /// # Errors
    ///
    /// Fails while `Executing`, when `desired` does not validate, or when an
    /// option cannot be normalized.
    pub fn diff(&mut self, desired: &SchemaSnapshot, actual: &SchemaSnapshot) -> Result<&Delta> {
        if self.state == MigratorState::Executing {
            return Err(self.invalid_state("any state but executing"));
        }
        self.state = MigratorState::Idle;
        self.delta = None;
        self.plan = None;

        desired.validate()?;
        let mut delta = self.differencer.diff(desired, actual)?;

        let warnings = OptionPolicy::new(&self.config).classify(&mut delta);
        for warning in &warnings {
            self.reporter.warn(warning);
        }

        info!(
            tables = delta.len(),
            differ = delta.differ(),
            warnings = warnings.len(),
            "Schema diffed"
        );

        self.state = MigratorState::Diffed;
        Ok(self.delta.insert(delta))
    }

    /// Reads the live schema through `introspector`, then diffs against it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Introspection`] when the live schema cannot be
    /// read, or any error of [`Self::diff`].
    pub async fn diff_live<I>(&mut self, desired: &SchemaSnapshot, introspector: &I) -> Result<&Delta>
    where
        I: Introspect,
    {
        let actual = introspector
            .introspect_schema()
            .await
            .map_err(|e| SchemaError::Introspection(Box::new(e)))?;
        self.diff(desired, &actual)
    }

    /// Plans the statements for the current delta without running them.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidState`] unless a delta is available.
    pub fn plan(&mut self) -> Result<&Plan> {
        let plan = match (self.state, &self.delta) {
            (MigratorState::Diffed | MigratorState::Planned, Some(delta)) => {
                self.planner.plan(delta)
            }
            _ => return Err(self.invalid_state("diffed or planned")),
        };
        self.state = MigratorState::Planned;
        Ok(self.plan.insert(plan))
    }

    /// Plans and executes the current delta against `connection`.
    ///
    /// Halts at the first failing statement, leaving the migrator
    /// `Failed`; the error carries the statement text and the database
    /// error. On success the delta and plan are consumed and the migrator
    /// is `Done`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidState`] unless diffed, and
    /// [`SchemaError::Execution`] for the first failing statement.
    pub async fn migrate<C>(&mut self, connection: &mut C) -> Result<MigrationReport>
    where
        C: DdlConnection,
    {
        if !matches!(self.state, MigratorState::Diffed | MigratorState::Planned) {
            return Err(self.invalid_state("diffed or planned"));
        }
        if self.plan.is_none() {
            self.plan()?;
        }
        let plan = self.plan.take().unwrap_or_default();

        self.state = MigratorState::Executing;
        info!(statements = plan.len(), "Applying migration");

        let mut report = MigrationReport::default();
        for (index, statement) in plan.statements().iter().enumerate() {
            debug!(
                index,
                operation = statement.operation().kind(),
                table = statement.operation().table_name(),
                sql = %statement.sql(),
                "Executing SQL"
            );

            if let Err(e) = connection.execute(statement).await {
                warn!(
                    index,
                    sql = %statement.sql(),
                    error = %e,
                    "Statement failed, halting migration"
                );
                self.state = MigratorState::Failed;
                self.delta = None;
                return Err(SchemaError::Execution {
                    statement: statement.sql().to_string(),
                    source: Box::new(e) as BoxError,
                });
            }
            report.executed.push(statement.sql().to_string());
        }

        self.delta = None;
        self.state = MigratorState::Done;
        info!(statements = report.executed.len(), "Migration applied successfully");
        Ok(report)
    }

    fn invalid_state(&self, expected: &'static str) -> SchemaError {
        SchemaError::InvalidState {
            expected,
            actual: self.state.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDatabase;
    use crate::reporter::{NoopReporter, RecordingReporter};
    use crate::schema::{ColumnDef, ColumnType, TableDef};

    fn users(comment: &str) -> SchemaSnapshot {
        SchemaSnapshot::from_tables([TableDef::new("users")
            .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
            .primary_key(vec!["id".to_string()])
            .comment(comment)])
        .unwrap()
    }

    #[test]
    fn test_starts_idle() {
        let migrator = Migrator::new(Config::new(), NoopReporter);
        assert_eq!(migrator.state(), MigratorState::Idle);
        assert!(migrator.delta().is_none());
        assert!(!migrator.differ());
    }

    #[test]
    fn test_plan_requires_diff() {
        let mut migrator = Migrator::new(Config::new(), NoopReporter);
        let err = migrator.plan().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_migrate_requires_diff() {
        let mut migrator = Migrator::new(Config::new(), NoopReporter);
        let mut db = MemoryDatabase::new(SchemaSnapshot::new());
        let err = migrator.migrate(&mut db).await.unwrap_err();
        assert!(err.to_string().contains("expected diffed or planned, found idle"));
    }

    #[test]
    fn test_diff_reports_warnings() {
        let recorder = RecordingReporter::new();
        let mut migrator = Migrator::new(Config::new(), &recorder);
        migrator
            .diff(&users("new comment"), &users("old comment"))
            .unwrap();

        assert_eq!(migrator.state(), MigratorState::Diffed);
        assert!(!migrator.differ());
        assert_eq!(recorder.messages().len(), 1);
    }

    #[test]
    fn test_failed_diff_stays_idle() {
        let bad = SchemaSnapshot::new().table(
            TableDef::new("t").column(ColumnDef::new("name", ColumnType::Varchar)),
        );
        let mut migrator = Migrator::new(Config::new(), NoopReporter);
        assert!(migrator.diff(&bad, &SchemaSnapshot::new()).is_err());
        assert_eq!(migrator.state(), MigratorState::Idle);
    }

    #[tokio::test]
    async fn test_migrate_applies_and_finishes() {
        let config = Config::new().mysql_change_table_comment(true);
        let mut migrator = Migrator::new(config, NoopReporter);
        let mut db = MemoryDatabase::new(users("old comment"));

        migrator.diff_live(&users("new comment"), &db).await.unwrap();
        assert!(migrator.differ());
        assert_eq!(migrator.plan().unwrap().len(), 1);

        let report = migrator.migrate(&mut db).await.unwrap();
        assert_eq!(report.executed, vec!["ALTER TABLE `users` COMMENT='new comment'"]);
        assert_eq!(migrator.state(), MigratorState::Done);
        assert!(migrator.delta().is_none());

        // The delta is consumed.
        assert!(migrator.migrate(&mut db).await.is_err());
    }

    #[tokio::test]
    async fn test_failure_leaves_failed_state() {
        let mut migrator = Migrator::new(Config::new(), NoopReporter);
        let mut db = MemoryDatabase::new(SchemaSnapshot::new()).fail_at(0, "disk full");

        migrator.diff(&users("c"), &SchemaSnapshot::new()).unwrap();
        let err = migrator.migrate(&mut db).await.unwrap_err();

        assert_eq!(migrator.state(), MigratorState::Failed);
        assert!(err.to_string().contains("CREATE TABLE `users`"));
        assert!(err.to_string().contains("disk full"));
    }
}
