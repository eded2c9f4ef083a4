//! PostgreSQL rendering for tables and schema operations.

use super::{Column, ColumnType, Constraint, Operation, Table};

/// Quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn column_type(ty: &ColumnType) -> String {
    match ty {
        ColumnType::Serial => "SERIAL".to_string(),
        ColumnType::Integer => "INTEGER".to_string(),
        ColumnType::Boolean => "BOOLEAN".to_string(),
        ColumnType::Text => "TEXT".to_string(),
        ColumnType::Varchar(len) => format!("VARCHAR({})", len),
        ColumnType::Date => "DATE".to_string(),
        ColumnType::Timestamp => "TIMESTAMP".to_string(),
        ColumnType::Numeric => "NUMERIC".to_string(),
        ColumnType::Other(raw) => raw.clone(),
    }
}

/// Type usable in `ALTER COLUMN ... TYPE`, where pseudo-types are not accepted.
fn storage_type(ty: &ColumnType) -> String {
    match ty {
        ColumnType::Serial => "INTEGER".to_string(),
        other => column_type(other),
    }
}

pub fn column_definition(column: &Column) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column_type(&column.ty));
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

fn quote_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn constraint_definition(constraint: &Constraint) -> String {
    match constraint {
        Constraint::ForeignKey(fk) => format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quote_ident(&fk.name),
            quote_ident(&fk.column),
            quote_ident(&fk.ref_table),
            quote_ident(&fk.ref_column),
            fk.on_delete.as_sql()
        ),
        Constraint::Unique { name, columns } => format!(
            "CONSTRAINT {} UNIQUE ({})",
            quote_ident(name),
            quote_list(columns)
        ),
        Constraint::Check { name, expr } => {
            format!("CONSTRAINT {} CHECK ({})", quote_ident(name), expr)
        }
    }
}

pub fn create_table(table: &Table) -> String {
    let mut parts: Vec<String> = table.columns.iter().map(column_definition).collect();
    if !table.primary_key.is_empty() {
        parts.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident(&table.pkey_name()),
            quote_list(&table.primary_key)
        ));
    }
    parts.extend(table.constraints.iter().map(constraint_definition));

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(&table.name),
        parts.join(",\n    ")
    )
}

pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE {}", quote_ident(name))
}

fn alter_column(table: &str, from: &Column, to: &Column) -> String {
    let col = quote_ident(&to.name);
    let mut clauses = Vec::new();
    if from.ty != to.ty {
        let ty = storage_type(&to.ty);
        clauses.push(format!("ALTER COLUMN {} TYPE {} USING {}::{}", col, ty, col, ty));
    }
    if from.nullable != to.nullable {
        let action = if to.nullable {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        clauses.push(format!("ALTER COLUMN {} {}", col, action));
    }
    format!("ALTER TABLE {} {}", quote_ident(table), clauses.join(", "))
}

/// Render one operation as a single statement.
pub fn render(op: &Operation) -> String {
    match op {
        Operation::CreateTable(table) => create_table(table),
        Operation::DropTable(table) => drop_table(&table.name),
        Operation::AddColumn { table, column } => format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_ident(table),
            column_definition(column)
        ),
        Operation::DropColumn { table, column } => format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_ident(table),
            quote_ident(&column.name)
        ),
        Operation::AlterColumn { table, from, to } => alter_column(table, from, to),
        Operation::AddConstraint { table, constraint } => format!(
            "ALTER TABLE {} ADD {}",
            quote_ident(table),
            constraint_definition(constraint)
        ),
        Operation::DropConstraint { table, constraint } => format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            quote_ident(table),
            quote_ident(constraint.name())
        ),
    }
}
