//! Connections and server-level database management.

use crate::app_config::BootstrapConfig;
use crate::error::BootstrapError;
use crate::schema::ddl::quote_ident;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, DbErr, Statement,
};
use url::Url;

/// Open a pool against `url` with the configured timeout and size cap.
pub async fn connect(url: &str, config: &BootstrapConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.max_connections(config.max_connections)
        .connect_timeout(config.connect_timeout())
        .sqlx_logging(false);

    Database::connect(opt).await
}

fn parse(url: &str) -> Result<Url, BootstrapError> {
    Url::parse(url).map_err(|e| BootstrapError::InvalidUrl(format!("{}: {}", redact(url), e)))
}

/// Name of the database a connection URL points at.
pub fn database_name(url: &str) -> Result<String, BootstrapError> {
    let parsed = parse(url)?;
    let name = parsed.path().trim_start_matches('/');
    if name.is_empty() || name.contains('/') {
        return Err(BootstrapError::InvalidUrl(format!(
            "{} does not name a database",
            redact(url)
        )));
    }
    Ok(name.to_string())
}

/// Same server and credentials as `url`, pointed at `admin_database`.
pub fn admin_url(url: &str, admin_database: &str) -> Result<String, BootstrapError> {
    let mut parsed = parse(url)?;
    parsed.set_path(&format!("/{}", admin_database));
    Ok(parsed.to_string())
}

/// A URL safe to log: the password is masked.
pub fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                // Only fails for URLs that cannot carry credentials at all
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}

async fn database_exists(admin: &DatabaseConnection, name: &str) -> Result<bool, DbErr> {
    let row = admin
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT 1 AS present FROM pg_database WHERE datname = $1",
            vec![name.into()],
        ))
        .await?;
    Ok(row.is_some())
}

/// Create database `name` through an administrative connection unless it
/// exists. Returns `true` when this call created it.
///
/// A failed `CREATE DATABASE` is checked against `pg_database` again: if the
/// database is there now, another runner won the race. `DbErr` only carries
/// the server message, which is localized, so the catalog is the reliable
/// witness.
pub async fn ensure_database_exists(admin: &DatabaseConnection, name: &str) -> Result<bool, DbErr> {
    if database_exists(admin, name).await? {
        log::info!("Database '{}' already exists", name);
        return Ok(false);
    }

    let sql = format!("CREATE DATABASE {}", quote_ident(name));
    log::debug!("{}", sql);
    match admin
        .execute(Statement::from_string(DbBackend::Postgres, sql))
        .await
    {
        Ok(_) => {
            log::info!("Created database '{}'", name);
            Ok(true)
        }
        Err(e) => {
            if database_exists(admin, name).await? {
                log::info!("Database '{}' was created concurrently", name);
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

/// Advisory lock key shared by every runner; advisory locks are scoped to
/// the current database.
pub const RUN_LOCK_KEY: i64 = 0x5CA7_5EED;

/// Session-level advisory lock held on its own single-connection pool, so
/// that lock and unlock run in the same session.
pub struct RunLock {
    conn: DatabaseConnection,
    key: i64,
}

impl RunLock {
    /// Block until `key` is granted on the database behind `url`.
    pub async fn acquire(url: &str, config: &BootstrapConfig, key: i64) -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(url.to_owned());
        opt.max_connections(1)
            .min_connections(1)
            .connect_timeout(config.connect_timeout())
            .sqlx_logging(false);
        let conn = Database::connect(opt).await?;

        log::debug!("Waiting for advisory lock {}", key);
        conn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_lock($1)",
            vec![key.into()],
        ))
        .await?;
        log::debug!("Holding advisory lock {}", key);
        Ok(Self { conn, key })
    }

    /// Release the lock. Closing the session releases it as well.
    pub async fn release(self) -> Result<(), DbErr> {
        self.conn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_unlock($1)",
                vec![self.key.into()],
            ))
            .await?;
        log::debug!("Released advisory lock {}", self.key);
        Ok(())
    }
}
