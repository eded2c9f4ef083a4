//! SeaORM Entity for url_storage table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "url_storage")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub url_id: i32,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    pub description: Option<String>,
    pub search_date: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::url_comment::Entity")]
    Comments,
}

impl Related<super::url_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
