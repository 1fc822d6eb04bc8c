use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_views")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub name: String,
    pub title: String,
    pub sort_order: i32,
    pub columns_json: String, // [property_id, ...]
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entity_def::Entity",
        from = "Column::EntityId",
        to = "super::entity_def::Column::Id"
    )]
    EntityDef,
}

impl ActiveModelBehavior for ActiveModel {}
