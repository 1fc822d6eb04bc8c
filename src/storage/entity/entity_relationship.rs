use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_relationships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub parent_id: i32,
    pub child_id: i32,
    #[sea_orm(nullable)]
    pub title: Option<String>,
    pub sort_order: i32,
    pub is_distinct: bool,
    pub read_only: bool,
    pub hidden_if_empty: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entity_def::Entity",
        from = "Column::ParentId",
        to = "super::entity_def::Column::Id"
    )]
    Parent,
    #[sea_orm(
        belongs_to = "super::entity_def::Entity",
        from = "Column::ChildId",
        to = "super::entity_def::Column::Id"
    )]
    Child,
}

impl ActiveModelBehavior for ActiveModel {}
