use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chart_group_bys")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub chart_id: i32,
    pub property_ref: String,
    #[sea_orm(nullable)]
    pub property_type: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chart_config::Entity",
        from = "Column::ChartId",
        to = "super::chart_config::Column::Id"
    )]
    ChartConfig,
}

impl ActiveModelBehavior for ActiveModel {}
