//! SeaORM Entity for tag table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub tag_id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review_tag::Entity")]
    ReviewTags,
}

impl Related<super::review_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReviewTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
