//! Versioned migration records and the history table that tracks them.
//!
//! A record carries the full upgrade and downgrade SQL of one change set.
//! Records form a chain through `parent_version`; versions sort in
//! application order (`NNNN_YYYYMMDDTHHMMSS`).

use crate::orm::schema_migrations;
use crate::schema::{ddl, ChangeSet, Column, ManualReview, Operation, Table, HISTORY_TABLE};
use chrono::NaiveDateTime;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait,
    FromQueryResult, QueryOrder, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    pub version: String,
    pub parent_version: Option<String>,
    pub description: String,
    pub created_at: NaiveDateTime,
    pub upgrade: Vec<String>,
    pub downgrade: Vec<String>,
}

#[derive(Debug)]
pub enum MigrationError {
    Database(DbErr),
    /// A migration statement was rejected by the server
    Statement { sql: String, source: DbErr },
    /// Statement lists could not be encoded or decoded as JSON
    Encode(serde_json::Error),
    /// The change set contains items that need a human decision
    ManualReview(Vec<ManualReview>),
    /// The record was applied but could not be written to disk
    Io(std::io::Error),
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Database(e) => write!(f, "Database error: {}", e),
            MigrationError::Statement { sql, source } => {
                write!(f, "Statement failed: {}\n  while executing: {}", source, sql)
            }
            MigrationError::Encode(e) => write!(f, "Encoding error: {}", e),
            MigrationError::ManualReview(items) => {
                write!(f, "Refusing to migrate, manual review required:")?;
                for item in items {
                    write!(f, "\n  - {}", item)?;
                }
                Ok(())
            }
            MigrationError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<DbErr> for MigrationError {
    fn from(e: DbErr) -> Self {
        MigrationError::Database(e)
    }
}

impl From<serde_json::Error> for MigrationError {
    fn from(e: serde_json::Error) -> Self {
        MigrationError::Encode(e)
    }
}

impl From<std::io::Error> for MigrationError {
    fn from(e: std::io::Error) -> Self {
        MigrationError::Io(e)
    }
}

impl TryFrom<schema_migrations::Model> for MigrationRecord {
    type Error = MigrationError;

    fn try_from(model: schema_migrations::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            upgrade: serde_json::from_str(&model.upgrade)?,
            downgrade: serde_json::from_str(&model.downgrade)?,
            version: model.version,
            parent_version: model.parent_version,
            description: model.description,
            created_at: model.applied_at,
        })
    }
}

/// Definition of the history table itself.
pub fn history_table() -> Table {
    Table::new(HISTORY_TABLE)
        .column(Column::varchar("version", 64))
        .column(Column::varchar("parent_version", 64).nullable())
        .column(Column::text("description"))
        .column(Column::text("upgrade"))
        .column(Column::text("downgrade"))
        .column(Column::timestamp("applied_at"))
        .primary_key(&["version"])
}

/// Sequence number encoded in a version string.
pub fn sequence_of(version: &str) -> Option<u32> {
    version.split('_').next()?.parse().ok()
}

pub fn format_version(sequence: u32, at: NaiveDateTime) -> String {
    format!("{:04}_{}", sequence, at.format("%Y%m%dT%H%M%S"))
}

fn describe_operation(op: &Operation) -> String {
    match op {
        Operation::CreateTable(t) => format!("create {}", t.name),
        Operation::DropTable(t) => format!("drop {}", t.name),
        Operation::AddColumn { table, column } => format!("add {}.{}", table, column.name),
        Operation::DropColumn { table, column } => format!("drop {}.{}", table, column.name),
        Operation::AlterColumn { table, to, .. } => format!("alter {}.{}", table, to.name),
        Operation::AddConstraint { table, constraint } => {
            format!("add {} on {}", constraint.name(), table)
        }
        Operation::DropConstraint { table, constraint } => {
            format!("drop {} on {}", constraint.name(), table)
        }
    }
}

/// Short human summary of a change set.
pub fn describe(changes: &ChangeSet, baseline: bool) -> String {
    const SHOWN: usize = 3;

    let mut parts: Vec<String> = changes
        .operations
        .iter()
        .take(SHOWN)
        .map(describe_operation)
        .collect();
    if changes.operations.len() > SHOWN {
        parts.push(format!("{} more", changes.operations.len() - SHOWN));
    }
    let summary = parts.join(", ");

    match (baseline, summary.is_empty()) {
        (true, true) => "baseline".to_string(),
        (true, false) => format!("baseline: {}", summary),
        (false, _) => summary,
    }
}

/// Build the record for `changes` on top of `parent`.
///
/// With no parent a baseline record is produced even when nothing changed.
/// Otherwise an empty change set produces no record.
pub fn plan_migration(
    parent: Option<&MigrationRecord>,
    changes: &ChangeSet,
    now: NaiveDateTime,
) -> Result<Option<MigrationRecord>, MigrationError> {
    if changes.needs_review() {
        return Err(MigrationError::ManualReview(changes.review.clone()));
    }
    if parent.is_some() && changes.is_empty() {
        return Ok(None);
    }

    let sequence = parent
        .and_then(|p| sequence_of(&p.version))
        .map(|s| s + 1)
        .unwrap_or(1);

    Ok(Some(MigrationRecord {
        version: format_version(sequence, now),
        parent_version: parent.map(|p| p.version.clone()),
        description: describe(changes, parent.is_none()),
        created_at: now,
        upgrade: changes.upgrade_sql(),
        downgrade: changes.downgrade_sql(),
    }))
}

#[derive(Debug, FromQueryResult)]
struct PresenceRow {
    present: bool,
}

/// Reads and writes the migration history of one database.
pub struct MigrationLog<'a> {
    db: &'a DatabaseConnection,
    dir: Option<PathBuf>,
}

impl<'a> MigrationLog<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db, dir: None }
    }

    /// Also write each applied record to `dir` as pretty JSON.
    pub fn with_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dir = dir;
        self
    }

    /// Create the history table if it is missing. Returns `true` if created.
    pub async fn ensure_table(&self) -> Result<bool, MigrationError> {
        let present = PresenceRow::find_by_statement(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT to_regclass($1) IS NOT NULL AS present",
            vec![ddl::quote_ident(HISTORY_TABLE).into()],
        ))
        .one(self.db)
        .await?
        .map(|row| row.present)
        .unwrap_or(false);
        if present {
            return Ok(false);
        }

        let sql = ddl::create_table(&history_table());
        log::debug!("{}", sql);
        self.db
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;
        log::info!("Created migration history table '{}'", HISTORY_TABLE);
        Ok(true)
    }

    pub async fn latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
        schema_migrations::Entity::find()
            .order_by_desc(schema_migrations::Column::Version)
            .one(self.db)
            .await?
            .map(MigrationRecord::try_from)
            .transpose()
    }

    /// Applied records, oldest first.
    pub async fn history(&self) -> Result<Vec<MigrationRecord>, MigrationError> {
        schema_migrations::Entity::find()
            .order_by_asc(schema_migrations::Column::Version)
            .all(self.db)
            .await?
            .into_iter()
            .map(MigrationRecord::try_from)
            .collect()
    }

    /// Execute `pending` and insert `record` in one transaction.
    ///
    /// `pending` is the part of the record's upgrade not yet applied; it is
    /// empty for a baseline whose tables were just created.
    pub async fn apply(
        &self,
        record: &MigrationRecord,
        pending: &[String],
    ) -> Result<(), MigrationError> {
        let model = schema_migrations::ActiveModel {
            version: Set(record.version.clone()),
            parent_version: Set(record.parent_version.clone()),
            description: Set(record.description.clone()),
            upgrade: Set(serde_json::to_string(&record.upgrade)?),
            downgrade: Set(serde_json::to_string(&record.downgrade)?),
            applied_at: Set(record.created_at),
        };

        let txn = self.db.begin().await?;
        for sql in pending {
            execute_logged(&txn, sql).await?;
        }
        schema_migrations::Entity::insert(model).exec(&txn).await?;
        txn.commit().await?;

        log::info!(
            "Applied migration {} ({}) with {} statements",
            record.version,
            record.description,
            pending.len()
        );

        if let Some(dir) = &self.dir {
            let path = write_record(dir, record)?;
            log::info!("Wrote migration record to {}", path.display());
        }
        Ok(())
    }

    /// Undo the most recent record and remove it from the history.
    pub async fn revert_latest(&self) -> Result<Option<MigrationRecord>, MigrationError> {
        let Some(record) = self.latest().await? else {
            return Ok(None);
        };

        let txn = self.db.begin().await?;
        for sql in &record.downgrade {
            execute_logged(&txn, sql).await?;
        }
        schema_migrations::Entity::delete_by_id(record.version.clone())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        log::info!("Reverted migration {}", record.version);
        Ok(Some(record))
    }
}

async fn execute_logged<C>(db: &C, sql: &str) -> Result<(), MigrationError>
where
    C: ConnectionTrait,
{
    log::debug!("{}", sql);
    db.execute(Statement::from_string(DbBackend::Postgres, sql.to_owned()))
        .await
        .map_err(|source| MigrationError::Statement {
            sql: sql.to_owned(),
            source,
        })?;
    Ok(())
}

/// Write `record` to `dir/<version>.json`, creating `dir` if needed.
pub fn write_record(dir: &Path, record: &MigrationRecord) -> Result<PathBuf, MigrationError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", record.version));
    std::fs::write(&path, serde_json::to_string_pretty(record)?)?;
    Ok(path)
}
