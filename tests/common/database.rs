//! Scratch databases for integration tests
//!
//! Each test gets its own database, named after the test, on the server
//! given by `TEST_DATABASE_URL`. Tests skip when the variable is unset.
#![allow(dead_code)]

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, DbErr, Statement};
use sleuthdb::app_config::BootstrapConfig;
use sleuthdb::bootstrap::Bootstrap;
use sleuthdb::db;
use sleuthdb::schema::ddl::quote_ident;
use std::env;
use std::sync::atomic::{AtomicU32, Ordering};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Config pointing at a fresh, not yet created database, or `None` when
/// `TEST_DATABASE_URL` is unset.
pub fn scratch_config(tag: &str) -> Option<BootstrapConfig> {
    let base = match env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set, skipping {}", tag);
            return None;
        }
    };

    let name = format!(
        "sleuth_test_{}_{}_{}",
        tag,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    );
    let database_url = db::admin_url(&base, &name).expect("TEST_DATABASE_URL is not a valid URL");

    Some(BootstrapConfig {
        database_url,
        admin_database: env::var("TEST_ADMIN_DATABASE").unwrap_or_else(|_| "postgres".to_string()),
        connect_timeout_secs: 10,
        max_connections: 2,
        migrations_dir: None,
        seed: true,
    })
}

pub async fn connect(config: &BootstrapConfig) -> DatabaseConnection {
    db::connect(&config.database_url, config)
        .await
        .expect("Failed to connect to scratch database")
}

/// Scratch database with the full platform schema applied.
pub async fn bootstrapped(tag: &str) -> Option<(BootstrapConfig, DatabaseConnection)> {
    let config = scratch_config(tag)?;
    let report = Bootstrap::new(config.clone())
        .expect("Registry should be valid")
        .run()
        .await
        .expect("Bootstrap should succeed");
    assert!(report.is_success(), "{:?}", report.failures);

    let conn = connect(&config).await;
    Some((config, conn))
}

/// Drop the scratch database, terminating any remaining sessions.
pub async fn drop_scratch(config: &BootstrapConfig) -> Result<(), DbErr> {
    let name = db::database_name(&config.database_url).expect("scratch URL names a database");
    let admin_url = db::admin_url(&config.database_url, &config.admin_database)
        .expect("scratch URL is valid");
    let admin = db::connect(&admin_url, config).await?;

    admin
        .execute(Statement::from_string(
            DbBackend::Postgres,
            format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", quote_ident(&name)),
        ))
        .await?;
    Ok(())
}
