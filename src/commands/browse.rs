use anyhow::Context;
use sea_orm::DatabaseConnection;
use serde_json::{json, Map, Value};

use crate::relations::visible_relationships;
use crate::report::predicate::RowQuery;
use crate::report::EntityLookup;
use crate::schema::{visible_properties, Entity, FormContext};
use crate::storage::{RowRepository, SchemaRepository};
use crate::values::{display_value, validate_values, Row};

pub async fn entities(db: &DatabaseConnection, tenant_id: i32) -> anyhow::Result<Value> {
    let list = SchemaRepository::list_entities(db, Some(tenant_id)).await?;
    Ok(Value::Array(
        list.iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "name": e.name,
                    "slug": e.slug,
                    "titlePlural": e.title_plural,
                    "properties": e.properties.len(),
                    "children": e.children.iter().map(|r| r.child_id).collect::<Vec<_>>(),
                    "parents": e.parents.iter().map(|r| r.parent_id).collect::<Vec<_>>(),
                })
            })
            .collect(),
    ))
}

async fn load(db: &DatabaseConnection, id: i32) -> anyhow::Result<Entity> {
    SchemaRepository::load_entity(db, EntityLookup::Id(id))
        .await?
        .with_context(|| format!("实体不存在: {id}"))
}

pub async fn entity(db: &DatabaseConnection, id: i32) -> anyhow::Result<Value> {
    let entity = load(db, id).await?;
    let create_form: Vec<&str> = visible_properties(&entity, &FormContext::create())
        .into_iter()
        .map(|p| p.name.as_str())
        .collect();
    let mut out = serde_json::to_value(&entity)?;
    out["createForm"] = json!(create_form);
    Ok(out)
}

pub async fn rows(
    db: &DatabaseConnection,
    tenant_id: i32,
    entity_id: i32,
) -> anyhow::Result<Value> {
    let entity = load(db, entity_id).await?;
    let query = RowQuery {
        tenant_ids: vec![tenant_id],
        entity_id,
        created_from: None,
        predicates: Vec::new(),
    };
    let rows = RowRepository::find_rows(db, &query).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let related = RowRepository::related_rows(db, row.id).await?;
        let relationships: Vec<Value> = visible_relationships(&entity, &related)
            .visible
            .into_iter()
            .map(|r| {
                json!({
                    "relationshipId": r.id,
                    "title": r.title,
                    "count": related.count(r.id),
                })
            })
            .collect();
        out.push(json!({
            "id": row.id,
            "createdAt": row.created_at.to_rfc3339(),
            "values": display_row(&entity, row),
            "issues": validate_values(&entity, &row.values),
            "relationships": relationships,
        }));
    }
    Ok(Value::Array(out))
}

/// 属性标题 -> 显示文本，按读表单的可见属性顺序
fn display_row(entity: &Entity, row: &Row) -> Value {
    let mut map = Map::new();
    for p in visible_properties(entity, &FormContext::read()) {
        let text = match row.value_of(p.id) {
            Some(v) => display_value(p, v),
            None => crate::values::EMPTY_DISPLAY.to_string(),
        };
        map.insert(p.title.clone(), Value::String(text));
    }
    Value::Object(map)
}
