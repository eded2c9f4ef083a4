//! Static reference rows inserted once into empty lookup tables.

use crate::error::BootstrapError;
use crate::schema::ddl::quote_ident;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbBackend, DbErr, FromQueryResult, Statement,
    TransactionTrait,
};

/// Fixed rows for one lookup table. Row `i` (zero based) gets id `i + 1`.
#[derive(Clone, Copy, Debug)]
pub struct LookupSeed {
    pub table: &'static str,
    pub id_column: &'static str,
    pub name_column: &'static str,
    pub names: &'static [&'static str],
}

pub const SCAM_TYPES: LookupSeed = LookupSeed {
    table: "scam_type",
    id_column: "scam_type_id",
    name_column: "scam_type",
    names: &[
        "Phishing",
        "Investment Fraud",
        "Online Shopping Scam",
        "Romance Scam",
        "Tech Support Scam",
        "Lottery or Prize Scam",
        "Impersonation Scam",
        "Employment Scam",
        "Rental Scam",
        "Cryptocurrency Scam",
    ],
};

/// Every seed applied by the bootstrap runner.
pub const LOOKUP_SEEDS: &[LookupSeed] = &[SCAM_TYPES];

#[derive(Debug, FromQueryResult)]
struct CountRow {
    count: i64,
}

/// Wraps a database error of `seed`, keeping the statement that raised it.
fn failure(seed: &LookupSeed, statement: Option<String>) -> impl FnOnce(DbErr) -> BootstrapError {
    let table = seed.table.to_string();
    move |source| BootstrapError::Seed {
        table,
        statement,
        source,
    }
}

/// Insert `seed` into its table if, and only if, the table is empty.
///
/// A table holding any row counts as seeded. Returns the number of rows
/// inserted.
pub async fn seed_lookup(
    db: &DatabaseConnection,
    seed: &LookupSeed,
) -> Result<u64, BootstrapError> {
    let table = quote_ident(seed.table);
    let txn = db.begin().await.map_err(failure(seed, None))?;

    let count = format!("SELECT COUNT(*)::int8 AS count FROM {}", table);
    let existing = CountRow::find_by_statement(Statement::from_string(
        DbBackend::Postgres,
        count.clone(),
    ))
    .one(&txn)
    .await
    .map_err(failure(seed, Some(count)))?
    .map(|row| row.count)
    .unwrap_or(0);

    if existing > 0 {
        log::info!(
            "Table '{}' already holds {} rows, skipping seed",
            seed.table,
            existing
        );
        return Ok(0);
    }

    let insert = format!(
        "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
        table,
        quote_ident(seed.id_column),
        quote_ident(seed.name_column)
    );
    let mut inserted = 0;
    for (idx, name) in seed.names.iter().enumerate() {
        let id = idx as i32 + 1;
        let res = txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                &insert,
                vec![id.into(), (*name).into()],
            ))
            .await
            .map_err(failure(seed, Some(insert_text(&insert, id, name))))?;
        inserted += res.rows_affected();
    }

    // Explicit ids bypass the sequence; move it past the last one.
    let setval = "SELECT setval(pg_get_serial_sequence($1, $2), $3)";
    txn.query_one(Statement::from_sql_and_values(
        DbBackend::Postgres,
        setval,
        vec![
            table.into(),
            seed.id_column.into(),
            (seed.names.len() as i64).into(),
        ],
    ))
    .await
    .map_err(failure(seed, Some(setval.to_string())))?;

    txn.commit().await.map_err(failure(seed, None))?;
    log::info!("Seeded {} rows into '{}'", inserted, seed.table);
    Ok(inserted)
}

/// Insert statement with its bound values spelled out, for error reports.
fn insert_text(insert: &str, id: i32, name: &str) -> String {
    format!("{} -- $1 = {}, $2 = '{}'", insert, id, name.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tables;
    use std::collections::HashSet;

    #[test]
    fn test_scam_types_fit_their_column() {
        let table = tables::scam_type();
        assert!(table.get_column(SCAM_TYPES.id_column).is_some());
        assert!(table.get_column(SCAM_TYPES.name_column).is_some());
        assert_eq!(SCAM_TYPES.names.len(), 10);
        assert!(SCAM_TYPES.names.iter().all(|n| !n.is_empty() && n.len() <= 50));
    }

    #[test]
    fn test_scam_type_names_are_unique() {
        let names: HashSet<&str> = SCAM_TYPES.names.iter().copied().collect();
        assert_eq!(names.len(), SCAM_TYPES.names.len());
    }

    #[test]
    fn test_insert_text_spells_out_values() {
        let text = insert_text(
            "INSERT INTO \"scam_type\" (\"scam_type_id\", \"scam_type\") VALUES ($1, $2)",
            6,
            "Lottery or Prize Scam",
        );
        assert!(text.starts_with("INSERT INTO \"scam_type\""));
        assert!(text.ends_with("-- $1 = 6, $2 = 'Lottery or Prize Scam'"));
        assert!(insert_text("INSERT", 1, "O'Neil").ends_with("'O''Neil'"));
    }

    #[test]
    fn test_every_seed_targets_a_registered_table() {
        let registry = tables::registry().unwrap();
        for seed in LOOKUP_SEEDS {
            assert!(registry.contains(seed.table), "{}", seed.table);
        }
    }
}
