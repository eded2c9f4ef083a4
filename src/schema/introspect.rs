//! Reads the live PostgreSQL schema into the registry's own types.

use super::{Column, ColumnType, Constraint, FkAction, ForeignKey, Registry, Table};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, FromQueryResult, Statement};
use std::collections::BTreeMap;

const COLUMNS_SQL: &str = r#"
    SELECT
        c.table_name::text AS table_name,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.character_maximum_length::int4 AS max_length,
        (c.is_nullable = 'YES') AS nullable,
        c.column_default::text AS column_default
    FROM information_schema.columns c
    JOIN information_schema.tables t
        ON t.table_schema = c.table_schema AND t.table_name = c.table_name
    WHERE c.table_schema = current_schema()
      AND t.table_type = 'BASE TABLE'
    ORDER BY c.table_name, c.ordinal_position
"#;

const KEYS_SQL: &str = r#"
    SELECT
        rel.relname::text AS table_name,
        con.conname::text AS constraint_name,
        con.contype::text AS kind,
        att.attname::text AS column_name
    FROM pg_constraint con
    JOIN pg_class rel ON rel.oid = con.conrelid
    JOIN pg_namespace nsp ON nsp.oid = rel.relnamespace
    JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
    JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
    WHERE nsp.nspname = current_schema()
      AND con.contype IN ('p', 'u')
    ORDER BY rel.relname, con.conname, k.ord
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        rel.relname::text AS table_name,
        con.conname::text AS constraint_name,
        att.attname::text AS column_name,
        frel.relname::text AS ref_table,
        fatt.attname::text AS ref_column,
        con.confdeltype::text AS on_delete
    FROM pg_constraint con
    JOIN pg_class rel ON rel.oid = con.conrelid
    JOIN pg_namespace nsp ON nsp.oid = rel.relnamespace
    JOIN pg_class frel ON frel.oid = con.confrelid
    JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = con.conkey[1]
    JOIN pg_attribute fatt ON fatt.attrelid = con.confrelid AND fatt.attnum = con.confkey[1]
    WHERE nsp.nspname = current_schema()
      AND con.contype = 'f'
    ORDER BY rel.relname, con.conname
"#;

const CHECKS_SQL: &str = r#"
    SELECT
        rel.relname::text AS table_name,
        con.conname::text AS constraint_name,
        pg_get_constraintdef(con.oid) AS definition
    FROM pg_constraint con
    JOIN pg_class rel ON rel.oid = con.conrelid
    JOIN pg_namespace nsp ON nsp.oid = rel.relnamespace
    WHERE nsp.nspname = current_schema()
      AND con.contype = 'c'
    ORDER BY rel.relname, con.conname
"#;

#[derive(Debug, FromQueryResult)]
struct ColumnRow {
    table_name: String,
    column_name: String,
    data_type: String,
    max_length: Option<i32>,
    nullable: bool,
    column_default: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct KeyRow {
    table_name: String,
    constraint_name: String,
    kind: String,
    column_name: String,
}

#[derive(Debug, FromQueryResult)]
struct ForeignKeyRow {
    table_name: String,
    constraint_name: String,
    column_name: String,
    ref_table: String,
    ref_column: String,
    on_delete: String,
}

#[derive(Debug, FromQueryResult)]
struct CheckRow {
    table_name: String,
    constraint_name: String,
    definition: String,
}

/// The schema as it currently exists in a database.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    tables: BTreeMap<String, Table>,
}

impl Snapshot {
    /// A snapshot identical to the registry, as if it had just been applied.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            tables: registry
                .tables()
                .map(|t| (t.name.clone(), t.clone()))
                .collect(),
        }
    }

    /// Add or replace a table.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn remove(&mut self, name: &str) -> Option<Table> {
        self.tables.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Read every base table of the connection's current schema.
    pub async fn load<C>(db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut snapshot = Snapshot::default();

        let columns = ColumnRow::find_by_statement(statement(COLUMNS_SQL))
            .all(db)
            .await?;
        for row in columns {
            let ty = column_type_from_pg(&row.data_type, row.max_length, row.column_default.as_deref());
            let default = match ty {
                ColumnType::Serial => None,
                _ => row.column_default,
            };
            let table = snapshot
                .tables
                .entry(row.table_name.clone())
                .or_insert_with(|| Table::new(&row.table_name));
            table.columns.push(Column {
                name: row.column_name,
                ty,
                nullable: row.nullable,
                default,
            });
        }

        let keys = KeyRow::find_by_statement(statement(KEYS_SQL)).all(db).await?;
        for row in keys {
            let Some(table) = snapshot.tables.get_mut(&row.table_name) else {
                continue;
            };
            if row.kind == "p" {
                table.primary_key.push(row.column_name);
                continue;
            }
            match table
                .constraints
                .iter_mut()
                .find(|c| c.name() == row.constraint_name)
            {
                Some(Constraint::Unique { columns, .. }) => columns.push(row.column_name),
                _ => table.constraints.push(Constraint::Unique {
                    name: row.constraint_name,
                    columns: vec![row.column_name],
                }),
            }
        }

        let foreign_keys = ForeignKeyRow::find_by_statement(statement(FOREIGN_KEYS_SQL))
            .all(db)
            .await?;
        for row in foreign_keys {
            if let Some(table) = snapshot.tables.get_mut(&row.table_name) {
                table.constraints.push(Constraint::ForeignKey(ForeignKey {
                    name: row.constraint_name,
                    column: row.column_name,
                    ref_table: row.ref_table,
                    ref_column: row.ref_column,
                    on_delete: FkAction::from_pg_code(&row.on_delete).unwrap_or(FkAction::NoAction),
                }));
            }
        }

        let checks = CheckRow::find_by_statement(statement(CHECKS_SQL))
            .all(db)
            .await?;
        for row in checks {
            if let Some(table) = snapshot.tables.get_mut(&row.table_name) {
                table.constraints.push(Constraint::Check {
                    name: row.constraint_name,
                    expr: check_body(&row.definition).to_string(),
                });
            }
        }

        log::debug!("Introspected {} tables", snapshot.len());
        Ok(snapshot)
    }
}

fn statement(sql: &str) -> Statement {
    Statement::from_string(DbBackend::Postgres, sql.to_string())
}

/// Map an `information_schema` type description back to a [`ColumnType`].
pub fn column_type_from_pg(
    data_type: &str,
    max_length: Option<i32>,
    default: Option<&str>,
) -> ColumnType {
    match data_type {
        "integer" if default.map(|d| d.starts_with("nextval(")).unwrap_or(false) => {
            ColumnType::Serial
        }
        "integer" => ColumnType::Integer,
        "boolean" => ColumnType::Boolean,
        "text" => ColumnType::Text,
        "character varying" => match max_length {
            Some(len) if len > 0 => ColumnType::Varchar(len as u32),
            _ => ColumnType::Other(data_type.to_string()),
        },
        "date" => ColumnType::Date,
        "timestamp without time zone" => ColumnType::Timestamp,
        "numeric" => ColumnType::Numeric,
        other => ColumnType::Other(other.to_string()),
    }
}

/// Strip `CHECK (...)` from a `pg_get_constraintdef` result.
fn check_body(definition: &str) -> &str {
    let trimmed = definition.trim();
    let trimmed = trimmed.strip_suffix(" NOT VALID").unwrap_or(trimmed);
    trimmed
        .strip_prefix("CHECK (")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_with_sequence_reads_as_serial() {
        assert_eq!(
            column_type_from_pg(
                "integer",
                None,
                Some("nextval('users_user_id_seq'::regclass)")
            ),
            ColumnType::Serial
        );
        assert_eq!(
            column_type_from_pg("integer", None, Some("0")),
            ColumnType::Integer
        );
    }

    #[test]
    fn test_varchar_keeps_length() {
        assert_eq!(
            column_type_from_pg("character varying", Some(50), None),
            ColumnType::Varchar(50)
        );
    }

    #[test]
    fn test_unknown_types_are_kept_verbatim() {
        assert_eq!(
            column_type_from_pg("jsonb", None, None),
            ColumnType::Other("jsonb".to_string())
        );
    }

    #[test]
    fn test_check_body_strips_wrapper() {
        assert_eq!(
            check_body("CHECK ((root_id < comment_id))"),
            "(root_id < comment_id)"
        );
        assert_eq!(
            check_body("CHECK ((rating > 0)) NOT VALID"),
            "(rating > 0)"
        );
    }
}
