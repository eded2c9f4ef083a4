//! SeaORM Entity for review_comment table
//!
//! `writer_id` is interpreted through `writer_role`; see `crate::comments::WriterRef`.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review_comment")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub comment_id: i32,
    pub root_id: Option<i32>,
    pub review_id: i32,
    pub writer_id: i32,
    pub writer_role: String,
    #[sea_orm(column_type = "Text")]
    pub comment_content: String,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::review::Entity",
        from = "Column::ReviewId",
        to = "super::review::Column::ReviewId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Review,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::RootId",
        to = "Column::CommentId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Root,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
