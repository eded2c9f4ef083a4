//! SeaORM Entity for review_content_media junction table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "review_content_media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub review_content_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub media_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::review_content::Entity",
        from = "Column::ReviewContentId",
        to = "super::review_content::Column::ReviewContentId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ReviewContent,
}

impl Related<super::review_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewContent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
