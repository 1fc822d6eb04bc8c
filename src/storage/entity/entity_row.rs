use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity_rows")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub entity_id: i32,
    pub tenant_id: i32,
    pub created_at: i64,
    #[sea_orm(nullable)]
    pub created_by: Option<String>,
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
