//! SeaORM Entity for report table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub report_id: i32,
    pub title: String,
    pub writer_id: i32,
    pub scam_type_id: i32,
    pub scam_date: Date,
    pub report_date: Date,
    pub financial_loss: Decimal,
    #[sea_orm(column_type = "Text")]
    pub description: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::WriterId",
        to = "super::users::Column::UserId"
    )]
    Writer,
    #[sea_orm(
        belongs_to = "super::scam_type::Entity",
        from = "Column::ScamTypeId",
        to = "super::scam_type::Column::ScamTypeId"
    )]
    ScamType,
    #[sea_orm(has_many = "super::report_media::Entity")]
    ReportMedia,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Writer.def()
    }
}

impl Related<super::scam_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScamType.def()
    }
}

impl Related<super::report_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReportMedia.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
