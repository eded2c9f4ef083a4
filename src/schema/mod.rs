//! Schema model: tables, columns and constraints as plain data.
//!
//! The same [`Table`] type describes both the registry (what the schema
//! should be) and a live [`Snapshot`] read back from PostgreSQL, so the two
//! can be compared field by field.
//!
//! - `tables.rs`: the platform's table definitions
//! - `registry.rs`: the registry and its dependency ordering
//! - `diff.rs`: live-vs-registry reconciliation
//! - `ddl.rs`: PostgreSQL rendering of tables and operations
//! - `introspect.rs`: reading the live schema

pub mod ddl;
pub mod diff;
pub mod introspect;
pub mod registry;
pub mod tables;

pub use diff::{diff, ChangeSet, ManualReview, Operation, HISTORY_TABLE};
pub use introspect::Snapshot;
pub use registry::{Registry, RegistryError};

use serde::{Deserialize, Serialize};

/// Column data types known to the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Auto-incrementing integer backed by a sequence.
    Serial,
    Integer,
    Boolean,
    Text,
    Varchar(u32),
    Date,
    Timestamp,
    Numeric,
    /// A live type the registry does not model, kept verbatim.
    Other(String),
}

/// What a foreign key does when the referenced row is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl FkAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::NoAction => "NO ACTION",
            FkAction::Restrict => "RESTRICT",
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::SetDefault => "SET DEFAULT",
        }
    }

    /// Parse the single-letter code stored in `pg_constraint.confdeltype`.
    pub fn from_pg_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(FkAction::NoAction),
            "r" => Some(FkAction::Restrict),
            "c" => Some(FkAction::Cascade),
            "n" => Some(FkAction::SetNull),
            "d" => Some(FkAction::SetDefault),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    /// SQL default expression. Used when rendering DDL, not compared by the diff.
    pub default: Option<String>,
}

impl Column {
    fn new(name: &str, ty: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable,
            default: None,
        }
    }

    pub fn serial(name: &str) -> Self {
        Self::new(name, ColumnType::Serial, false)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, ColumnType::Integer, false)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, ColumnType::Boolean, false)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, ColumnType::Text, false)
    }

    pub fn varchar(name: &str, len: u32) -> Self {
        Self::new(name, ColumnType::Varchar(len), false)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, ColumnType::Date, false)
    }

    pub fn timestamp(name: &str) -> Self {
        Self::new(name, ColumnType::Timestamp, false)
    }

    pub fn numeric(name: &str) -> Self {
        Self::new(name, ColumnType::Numeric, false)
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: FkAction,
}

/// A named table constraint other than the primary key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    ForeignKey(ForeignKey),
    Unique { name: String, columns: Vec<String> },
    Check { name: String, expr: String },
}

impl Constraint {
    pub fn name(&self) -> &str {
        match self {
            Constraint::ForeignKey(fk) => &fk.name,
            Constraint::Unique { name, .. } => name,
            Constraint::Check { name, .. } => name,
        }
    }

    /// Whether two constraints with the same name describe the same rule.
    ///
    /// Check expressions come back from PostgreSQL normalized, so checks
    /// are matched by name alone.
    pub fn same_rule(&self, other: &Constraint) -> bool {
        match (self, other) {
            (Constraint::ForeignKey(a), Constraint::ForeignKey(b)) => a == b,
            (
                Constraint::Unique { columns: a, .. },
                Constraint::Unique { columns: b, .. },
            ) => a == b,
            (Constraint::Check { .. }, Constraint::Check { .. }) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
    pub constraints: Vec<Constraint>,
}

impl Table {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Single-column unique constraint, named the way PostgreSQL names an
    /// inline `UNIQUE`.
    pub fn unique(mut self, column: &str) -> Self {
        self.constraints.push(Constraint::Unique {
            name: format!("{}_{}_key", self.name, column),
            columns: vec![column.to_string()],
        });
        self
    }

    pub fn foreign_key(self, column: &str, ref_table: &str, ref_column: &str) -> Self {
        self.foreign_key_on_delete(column, ref_table, ref_column, FkAction::NoAction)
    }

    pub fn foreign_key_on_delete(
        mut self,
        column: &str,
        ref_table: &str,
        ref_column: &str,
        on_delete: FkAction,
    ) -> Self {
        self.constraints.push(Constraint::ForeignKey(ForeignKey {
            name: format!("{}_{}_fkey", self.name, column),
            column: column.to_string(),
            ref_table: ref_table.to_string(),
            ref_column: ref_column.to_string(),
            on_delete,
        }));
        self
    }

    pub fn check(mut self, name: &str, expr: &str) -> Self {
        self.constraints.push(Constraint::Check {
            name: name.to_string(),
            expr: expr.to_string(),
        });
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn get_constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name() == name)
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::ForeignKey(fk) => Some(fk),
            _ => None,
        })
    }

    /// Tables this one references, excluding itself.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys()
            .map(|fk| fk.ref_table.as_str())
            .filter(move |t| *t != self.name)
    }

    pub fn pkey_name(&self) -> String {
        format!("{}_pkey", self.name)
    }
}
