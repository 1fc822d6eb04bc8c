use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chart_configs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub tenant_ids_json: String,
    // 为空表示 group 级（全局）图表
    #[sea_orm(nullable)]
    pub entity_id: Option<i32>,
    #[sea_orm(nullable)]
    pub entity_slug: Option<String>,
    pub group_slug: String,
    pub title: String,
    pub sort_order: i32,
    pub visualization_type: String,
    #[sea_orm(nullable)]
    pub time_granularity: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
