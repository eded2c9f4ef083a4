//! SeaORM Entity for review_content table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review_content")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub review_content_id: i32,
    #[sea_orm(column_type = "Text")]
    pub review_content: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review_content_media::Entity")]
    Media,
}

impl Related<super::review_content_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
