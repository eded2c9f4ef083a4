//! SeaORM Entity for the migration history table
//!
//! `upgrade` and `downgrade` hold JSON arrays of SQL statements.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "schema_migrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub version: String,
    pub parent_version: Option<String>,
    pub description: String,
    #[sea_orm(column_type = "Text")]
    pub upgrade: String,
    #[sea_orm(column_type = "Text")]
    pub downgrade: String,
    pub applied_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
