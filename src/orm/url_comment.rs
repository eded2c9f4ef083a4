//! SeaORM Entity for url_comment table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "url_comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub comment_id: i32,
    pub url_id: i32,
    pub writer_id: i32,
    pub root_id: Option<i32>,
    pub rating: i32,
    #[sea_orm(column_type = "Text")]
    pub comment_content: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::url_storage::Entity",
        from = "Column::UrlId",
        to = "super::url_storage::Column::UrlId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Url,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::WriterId",
        to = "super::users::Column::UserId"
    )]
    Writer,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::RootId",
        to = "Column::CommentId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Root,
}

impl Related<super::url_storage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Url.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Writer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
