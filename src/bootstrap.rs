//! Single-shot runner that converges a database to the table registry.
//!
//! Steps run in order: ensure the database exists, create missing tables,
//! seed lookup tables, then record (and apply) an incremental migration.
//! The first two are fatal on failure. Seed and migration failures are
//! collected in the report so the remaining steps still run.
//!
//! Steps two to four hold a session advisory lock on the target database,
//! so concurrent runners take turns and the later ones find nothing to do.

use crate::app_config::BootstrapConfig;
use crate::db;
use crate::error::{BootstrapError, Step};
use crate::migrate::{plan_migration, MigrationError, MigrationLog};
use crate::schema::{self, tables, ChangeSet, Operation, Registry, Snapshot};
use crate::seed::{seed_lookup, LookupSeed, LOOKUP_SEEDS};
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait};

/// What a run did.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    pub database_created: bool,
    pub tables_created: Vec<String>,
    pub rows_seeded: u64,
    /// Version of the record written by this run, if any
    pub migration: Option<String>,
    /// Non-fatal step failures, in the order they happened
    pub failures: Vec<BootstrapError>,
}

impl BootstrapReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Bootstrap {
    config: BootstrapConfig,
    registry: Registry,
    seeds: Vec<LookupSeed>,
}

impl Bootstrap {
    /// Runner for the platform registry.
    pub fn new(config: BootstrapConfig) -> Result<Self, BootstrapError> {
        Ok(Self::with_registry(config, tables::registry()?))
    }

    /// Runner for an arbitrary registry. Seeds whose table the registry
    /// does not define are skipped.
    pub fn with_registry(config: BootstrapConfig, registry: Registry) -> Self {
        let seeds = LOOKUP_SEEDS
            .iter()
            .filter(|s| registry.contains(s.table))
            .copied()
            .collect();
        Self {
            config,
            registry,
            seeds,
        }
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub async fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        let mut report = BootstrapReport::default();
        let target = db::redact(&self.config.database_url);

        log::info!("Bootstrapping {}", target);
        report.database_created = self.ensure_database().await?;

        let conn = db::connect(&self.config.database_url, &self.config)
            .await
            .map_err(|source| BootstrapError::Connect {
                target: target.clone(),
                source,
            })?;

        // Runners on the same database converge one at a time; each reads
        // the schema only once it holds the lock.
        let lock = db::RunLock::acquire(&self.config.database_url, &self.config, db::RUN_LOCK_KEY)
            .await
            .map_err(BootstrapError::Lock)?;
        let converged = self.converge(&conn, &mut report).await;
        if let Err(e) = lock.release().await {
            log::warn!("Failed to release the bootstrap lock: {}", e);
        }
        converged?;

        if report.is_success() {
            log::info!("Database {} is up to date", target);
        } else {
            log::error!(
                "Bootstrap of {} finished with {} failed step(s)",
                target,
                report.failures.len()
            );
        }
        Ok(report)
    }

    /// Steps two to four, run under the lock.
    async fn converge(
        &self,
        conn: &DatabaseConnection,
        report: &mut BootstrapReport,
    ) -> Result<(), BootstrapError> {
        let live = Snapshot::load(conn).await.map_err(BootstrapError::Schema)?;
        let changes = schema::diff(&live, &self.registry);
        report.tables_created = self.ensure_schema(conn, &changes).await?;

        if self.config.seed {
            for seed in &self.seeds {
                match seed_lookup(conn, seed).await {
                    Ok(n) => report.rows_seeded += n,
                    Err(err) => {
                        log::error!("[{}] {}", Step::Seed, err);
                        report.failures.push(err);
                    }
                }
            }
        } else {
            log::info!("Seeding disabled");
        }

        match self.migrate(conn, &changes).await {
            Ok(version) => report.migration = version,
            Err(e) => {
                let err = BootstrapError::Migration(e);
                log::error!("[{}] {}", Step::Migrate, err);
                report.failures.push(err);
            }
        }
        Ok(())
    }

    async fn ensure_database(&self) -> Result<bool, BootstrapError> {
        let name = db::database_name(&self.config.database_url)?;
        let admin_url = db::admin_url(&self.config.database_url, &self.config.admin_database)?;

        let admin = db::connect(&admin_url, &self.config)
            .await
            .map_err(|source| BootstrapError::Connect {
                target: db::redact(&admin_url),
                source,
            })?;

        db::ensure_database_exists(&admin, &name)
            .await
            .map_err(|source| BootstrapError::CreateDatabase {
                name: name.clone(),
                source,
            })
    }

    /// Create every table of `changes` in one transaction.
    async fn ensure_schema(
        &self,
        conn: &DatabaseConnection,
        changes: &ChangeSet,
    ) -> Result<Vec<String>, BootstrapError> {
        let missing: Vec<_> = changes.created_tables().collect();
        if missing.is_empty() {
            log::info!("All {} tables present", self.registry.len());
            return Ok(Vec::new());
        }

        let txn = conn.begin().await.map_err(BootstrapError::Schema)?;
        for table in &missing {
            let sql = schema::ddl::create_table(table);
            log::debug!("{}", sql);
            txn.execute(Statement::from_string(DbBackend::Postgres, sql))
                .await
                .map_err(BootstrapError::Schema)?;
        }
        txn.commit().await.map_err(BootstrapError::Schema)?;

        let names: Vec<String> = missing.iter().map(|t| t.name.clone()).collect();
        log::info!("Created {} tables: {}", names.len(), names.join(", "));
        Ok(names)
    }

    /// Record `changes` and apply whatever step two did not.
    async fn migrate(
        &self,
        conn: &DatabaseConnection,
        changes: &ChangeSet,
    ) -> Result<Option<String>, MigrationError> {
        let history = MigrationLog::new(conn).with_dir(self.config.migrations_dir.clone());
        history.ensure_table().await?;

        let parent = history.latest().await?;
        let Some(record) = plan_migration(parent.as_ref(), changes, Utc::now().naive_utc())?
        else {
            log::info!("No schema drift detected");
            return Ok(None);
        };

        let pending: Vec<String> = changes
            .operations
            .iter()
            .filter(|op| !matches!(op, Operation::CreateTable(_)))
            .map(Operation::to_sql)
            .collect();
        history.apply(&record, &pending).await?;
        Ok(Some(record.version))
    }
}
