//! SeaORM Entity for review table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub review_id: i32,
    pub title: String,
    pub writer_id: i32,
    pub scam_type_id: i32,
    pub review_date: Date,
    pub review_content_id: i32,
    pub views: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::admins::Entity",
        from = "Column::WriterId",
        to = "super::admins::Column::AdminId"
    )]
    Writer,
    #[sea_orm(
        belongs_to = "super::scam_type::Entity",
        from = "Column::ScamTypeId",
        to = "super::scam_type::Column::ScamTypeId"
    )]
    ScamType,
    #[sea_orm(
        belongs_to = "super::review_content::Entity",
        from = "Column::ReviewContentId",
        to = "super::review_content::Column::ReviewContentId"
    )]
    Content,
    #[sea_orm(has_many = "super::review_comment::Entity")]
    Comments,
    #[sea_orm(has_many = "super::review_tag::Entity")]
    Tags,
}

impl Related<super::admins::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Writer.def()
    }
}

impl Related<super::scam_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScamType.def()
    }
}

impl Related<super::review_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Content.def()
    }
}

impl Related<super::review_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::review_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
