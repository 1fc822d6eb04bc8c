use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 每种活动字段一列，同一行最多只有一列非空
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "row_values")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub row_id: i32,
    pub property_id: i32,
    #[sea_orm(nullable)]
    pub text_value: Option<String>,
    #[sea_orm(nullable)]
    pub number_value: Option<f64>,
    #[sea_orm(nullable)]
    pub date_value: Option<i64>,
    #[sea_orm(nullable)]
    pub boolean_value: Option<bool>,

    // JSON 字段
    #[sea_orm(nullable)]
    pub multiple_json: Option<String>,
    #[sea_orm(nullable)]
    pub media_json: Option<String>,
    #[sea_orm(nullable)]
    pub number_range_json: Option<String>,
    #[sea_orm(nullable)]
    pub date_range_json: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entity_row::Entity",
        from = "Column::RowId",
        to = "super::entity_row::Column::Id"
    )]
    EntityRow,
    #[sea_orm(
        belongs_to = "super::property::Entity",
        from = "Column::PropertyId",
        to = "super::property::Column::Id"
    )]
    Property,
}

impl ActiveModelBehavior for ActiveModel {}
