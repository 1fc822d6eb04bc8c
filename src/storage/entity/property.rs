use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "properties")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub name: String,
    pub title: String,
    pub property_type: i32, // PropertyType::code
    #[sea_orm(nullable)]
    pub subtype: Option<String>,
    pub sort_order: i32,
    pub is_required: bool,
    pub is_read_only: bool,
    pub is_hidden: bool,
    pub show_in_create: bool,
    pub can_update: bool,

    // JSON 字段
    pub attributes_json: String,
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
