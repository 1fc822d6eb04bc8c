use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "row_relations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub relationship_id: i32,
    pub parent_row_id: i32,
    pub child_row_id: i32,
    pub sort_order: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entity_relationship::Entity",
        from = "Column::RelationshipId",
        to = "super::entity_relationship::Column::Id"
    )]
    EntityRelationship,
    #[sea_orm(
        belongs_to = "super::entity_row::Entity",
        from = "Column::ParentRowId",
        to = "super::entity_row::Column::Id"
    )]
    ParentRow,
    #[sea_orm(
        belongs_to = "super::entity_row::Entity",
        from = "Column::ChildRowId",
        to = "super::entity_row::Column::Id"
    )]
    ChildRow,
}

impl ActiveModelBehavior for ActiveModel {}
