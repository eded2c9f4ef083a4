//! Errors raised by the bootstrap runner.

use crate::migrate::MigrationError;
use crate::schema::RegistryError;
use sea_orm::DbErr;

/// Runner step, used to label failures in logs and reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    EnsureDatabase,
    EnsureSchema,
    Seed,
    Migrate,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::EnsureDatabase => "ensure database",
            Step::EnsureSchema => "ensure schema",
            Step::Seed => "seed",
            Step::Migrate => "migrate",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum BootstrapError {
    /// Configuration could not be loaded
    Config(config::ConfigError),
    /// The database URL is malformed or names no database
    InvalidUrl(String),
    /// Server unreachable; `target` is the redacted URL
    Connect { target: String, source: DbErr },
    /// `CREATE DATABASE` failed for a reason other than a concurrent create
    CreateDatabase { name: String, source: DbErr },
    /// The runner lock could not be taken on the target database
    Lock(DbErr),
    /// Introspection or table creation failed
    Schema(DbErr),
    /// The table registry is inconsistent
    Registry(RegistryError),
    /// Seeding one lookup table failed; `statement` is the SQL that failed
    Seed {
        table: String,
        statement: Option<String>,
        source: DbErr,
    },
    /// Computing or applying the migration failed
    Migration(MigrationError),
}

impl BootstrapError {
    pub fn step(&self) -> Option<Step> {
        match self {
            BootstrapError::Connect { .. } | BootstrapError::CreateDatabase { .. } => {
                Some(Step::EnsureDatabase)
            }
            BootstrapError::Lock(_) | BootstrapError::Schema(_) => Some(Step::EnsureSchema),
            BootstrapError::Seed { .. } => Some(Step::Seed),
            BootstrapError::Migration(_) => Some(Step::Migrate),
            BootstrapError::Config(_)
            | BootstrapError::InvalidUrl(_)
            | BootstrapError::Registry(_) => None,
        }
    }
}

impl std::fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapError::Config(e) => write!(f, "Configuration error: {}", e),
            BootstrapError::InvalidUrl(msg) => write!(f, "Invalid database URL: {}", msg),
            BootstrapError::Connect { target, source } => {
                write!(f, "Cannot reach database server at {}: {}", target, source)
            }
            BootstrapError::CreateDatabase { name, source } => {
                write!(f, "Failed to create database '{}': {}", name, source)
            }
            BootstrapError::Lock(e) => write!(f, "Cannot take the bootstrap lock: {}", e),
            BootstrapError::Schema(e) => write!(f, "Schema error: {}", e),
            BootstrapError::Registry(e) => write!(f, "Registry error: {}", e),
            BootstrapError::Seed {
                table,
                statement,
                source,
            } => {
                write!(f, "Failed to seed '{}': {}", table, source)?;
                if let Some(sql) = statement {
                    write!(f, "\n  while executing: {}", sql)?;
                }
                Ok(())
            }
            BootstrapError::Migration(e) => write!(f, "Migration error: {}", e),
        }
    }
}

impl std::error::Error for BootstrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BootstrapError::Config(e) => Some(e),
            BootstrapError::Registry(e) => Some(e),
            BootstrapError::Migration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for BootstrapError {
    fn from(e: config::ConfigError) -> Self {
        BootstrapError::Config(e)
    }
}

impl From<RegistryError> for BootstrapError {
    fn from(e: RegistryError) -> Self {
        BootstrapError::Registry(e)
    }
}

impl From<MigrationError> for BootstrapError {
    fn from(e: MigrationError) -> Self {
        BootstrapError::Migration(e)
    }
}
