use crate::relations::{RelatedRowRef, RelatedRows};
use crate::report::model::FilterOperator;
use crate::report::predicate::{Literal, RowQuery, ValuePredicate};
use crate::schema::{visible_properties, Entity, FormContext, Property};
use crate::storage::entity::entity_row::{
    self, ActiveModel as EntityRowActiveModel, Entity as EntityRow,
};
use crate::storage::entity::row_relation::{
    self, ActiveModel as RowRelationActiveModel, Entity as RowRelation,
};
use crate::storage::entity::row_value::{
    self, ActiveModel as RowValueActiveModel, Entity as RowValueRecord,
};
use crate::values::{set_value, RelatedRowLink, Row, RowValue, TypedValue};
use chrono::{DateTime, Utc};
use log::{info, warn};
use sea_orm::sea_query::{Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub struct RowRepository;

/// 新建行的输入：属性名 -> 表单提交的原始值
#[derive(Debug, Clone, Default)]
pub struct NewRow {
    pub tenant_id: i32,
    pub created_by: Option<String>,
    /// 为空时取当前时间
    pub created_at: Option<DateTime<Utc>>,
    pub input: BTreeMap<String, Value>,
}

impl RowRepository {
    /// 为创建表单中可见的每个属性写入一个 RowValue。
    /// 缺失的输入用属性的 defaultValue 补齐
    pub async fn create_row(
        db: &DatabaseConnection,
        entity: &Entity,
        new_row: NewRow,
    ) -> Result<Row, DbErr> {
        let created_at = new_row.created_at.unwrap_or_else(Utc::now);
        let txn = db.begin().await?;

        let row = EntityRowActiveModel {
            entity_id: Set(entity.id),
            tenant_id: Set(new_row.tenant_id),
            created_at: Set(created_at.timestamp()),
            created_by: Set(new_row.created_by.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let values: Vec<RowValueActiveModel> =
            visible_properties(entity, &FormContext::create())
                .into_iter()
                .map(|p| {
                    let raw = new_row
                        .input
                        .get(&p.name)
                        .cloned()
                        .or_else(|| p.default_value().map(|d| Value::String(d.to_string())))
                        .unwrap_or(Value::Null);
                    value_active_model(&set_value(row.id, p, &raw))
                })
                .collect();
        if !values.is_empty() {
            RowValueRecord::insert_many(values).exec(&txn).await?;
        }

        txn.commit().await?;

        Self::load_row(db, row.id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("row {}", row.id)))
    }

    /// 覆盖（或补建）行上某个属性的值
    pub async fn update_value(
        db: &DatabaseConnection,
        row_id: i32,
        property: &Property,
        raw: &Value,
    ) -> Result<RowValue, DbErr> {
        let value = set_value(row_id, property, raw);
        let existing = RowValueRecord::find()
            .filter(row_value::Column::RowId.eq(row_id))
            .filter(row_value::Column::PropertyId.eq(property.id))
            .one(db)
            .await?;

        let saved = match existing {
            Some(m) => {
                let mut am: RowValueActiveModel = m.into();
                apply_value(&mut am, &value.value);
                am.update(db).await?
            }
            None => value_active_model(&value).insert(db).await?,
        };
        Ok(value_from_model(saved))
    }

    /// 删除行及其值和关联
    pub async fn delete_row(db: &DatabaseConnection, row_id: i32) -> Result<bool, DbErr> {
        let txn = db.begin().await?;
        RowValueRecord::delete_many()
            .filter(row_value::Column::RowId.eq(row_id))
            .exec(&txn)
            .await?;
        RowRelation::delete_many()
            .filter(
                Condition::any()
                    .add(row_relation::Column::ParentRowId.eq(row_id))
                    .add(row_relation::Column::ChildRowId.eq(row_id)),
            )
            .exec(&txn)
            .await?;
        let res = EntityRow::delete_by_id(row_id).exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn load_row(db: &DatabaseConnection, row_id: i32) -> Result<Option<Row>, DbErr> {
        let Some(m) = EntityRow::find_by_id(row_id).one(db).await? else {
            return Ok(None);
        };
        let only = Condition::all().add(entity_row::Column::Id.eq(row_id));
        let mut rows = attach_values(db, vec![m], only).await?;
        let mut row = rows.remove(0);

        row.parents = RowRelation::find()
            .filter(row_relation::Column::ChildRowId.eq(row_id))
            .order_by_asc(row_relation::Column::SortOrder)
            .all(db)
            .await?
            .into_iter()
            .map(link_from_model)
            .collect();
        row.children = RowRelation::find()
            .filter(row_relation::Column::ParentRowId.eq(row_id))
            .order_by_asc(row_relation::Column::RelationshipId)
            .order_by_asc(row_relation::Column::SortOrder)
            .all(db)
            .await?
            .into_iter()
            .map(link_from_model)
            .collect();
        Ok(Some(row))
    }

    /// 命中的行（按 id 升序）及其值；不加载关联
    pub async fn find_rows(db: &DatabaseConnection, query: &RowQuery) -> Result<Vec<Row>, DbErr> {
        let cond = row_condition(query);
        let models = EntityRow::find()
            .filter(cond.clone())
            .order_by_asc(entity_row::Column::Id)
            .all(db)
            .await?;
        attach_values(db, models, cond).await
    }

    pub async fn count_rows(db: &DatabaseConnection, query: &RowQuery) -> Result<u64, DbErr> {
        EntityRow::find().filter(row_condition(query)).count(db).await
    }

    /// 某父行经各子关系关联的行
    pub async fn related_rows(
        db: &DatabaseConnection,
        parent_row_id: i32,
    ) -> Result<RelatedRows, DbErr> {
        let links = RowRelation::find()
            .filter(row_relation::Column::ParentRowId.eq(parent_row_id))
            .order_by_asc(row_relation::Column::SortOrder)
            .order_by_asc(row_relation::Column::Id)
            .all(db)
            .await?;
        let mut related = RelatedRows::new();
        for l in links {
            related.insert(
                l.relationship_id,
                RelatedRowRef {
                    row_id: l.child_row_id,
                    order: l.sort_order,
                },
            );
        }
        Ok(related)
    }

    /// 用 `related` 替换父行在各关系上的关联。
    /// 关系必须是 `entity` 的子关系；只读关系不允许改动
    pub async fn save_related_rows(
        db: &DatabaseConnection,
        entity: &Entity,
        parent_row_id: i32,
        related: &RelatedRows,
    ) -> Result<(), DbErr> {
        let current = Self::related_rows(db, parent_row_id).await?;

        let mut changed = Vec::new();
        for rel_id in related.relationship_ids() {
            let Some(rel) = entity.children.iter().find(|r| r.id == rel_id) else {
                return Err(DbErr::Custom(format!(
                    "relationship {} is not a child relationship of entity {}",
                    rel_id, entity.id
                )));
            };
            if current.get(rel_id) == related.get(rel_id) {
                continue;
            }
            if rel.read_only {
                warn!("⚠ 拒绝修改只读关系 {} (row: {})", rel_id, parent_row_id);
                return Err(DbErr::Custom(format!("relationship {rel_id} is read-only")));
            }
            changed.push(rel_id);
        }
        if changed.is_empty() {
            return Ok(());
        }

        let txn = db.begin().await?;
        for rel_id in &changed {
            RowRelation::delete_many()
                .filter(row_relation::Column::RelationshipId.eq(*rel_id))
                .filter(row_relation::Column::ParentRowId.eq(parent_row_id))
                .exec(&txn)
                .await?;
            let links: Vec<RowRelationActiveModel> = related
                .get(*rel_id)
                .iter()
                .map(|r| RowRelationActiveModel {
                    relationship_id: Set(*rel_id),
                    parent_row_id: Set(parent_row_id),
                    child_row_id: Set(r.row_id),
                    sort_order: Set(r.order),
                    ..Default::default()
                })
                .collect();
            if !links.is_empty() {
                RowRelation::insert_many(links).exec(&txn).await?;
            }
        }
        txn.commit().await?;

        info!(
            "✓ 行 {} 的关联已更新 (关系: {:?})",
            parent_row_id, changed
        );
        Ok(())
    }

    pub async fn link_rows(
        db: &DatabaseConnection,
        entity: &Entity,
        relationship_id: i32,
        parent_row_id: i32,
        child_row_ids: &[i32],
    ) -> Result<RelatedRows, DbErr> {
        let rel = entity
            .children
            .iter()
            .find(|r| r.id == relationship_id)
            .ok_or_else(|| {
                DbErr::Custom(format!(
                    "relationship {} is not a child relationship of entity {}",
                    relationship_id, entity.id
                ))
            })?;
        let mut related = Self::related_rows(db, parent_row_id).await?;
        related.add_related_rows(rel, child_row_ids);
        Self::save_related_rows(db, entity, parent_row_id, &related).await?;
        Ok(related)
    }

    pub async fn unlink_rows(
        db: &DatabaseConnection,
        entity: &Entity,
        relationship_id: i32,
        parent_row_id: i32,
        child_row_id: i32,
    ) -> Result<bool, DbErr> {
        let mut related = Self::related_rows(db, parent_row_id).await?;
        if !related.remove_related_row(relationship_id, child_row_id) {
            return Ok(false);
        }
        Self::save_related_rows(db, entity, parent_row_id, &related).await?;
        Ok(true)
    }
}

fn row_condition(query: &RowQuery) -> Condition {
    let mut cond = Condition::all()
        .add(entity_row::Column::EntityId.eq(query.entity_id))
        .add(entity_row::Column::TenantId.is_in(query.tenant_ids.clone()));
    if let Some(from) = query.created_from {
        cond = cond.add(entity_row::Column::CreatedAt.gte(from.timestamp()));
    }
    // 每个过滤条件：该行存在该属性的一个值满足比较
    for p in &query.predicates {
        let matching = Query::select()
            .column(row_value::Column::RowId)
            .from(RowValueRecord)
            .and_where(row_value::Column::PropertyId.eq(p.property_id))
            .and_where(value_comparison(p))
            .to_owned();
        cond = cond.add(entity_row::Column::Id.in_subquery(matching));
    }
    cond
}

fn value_comparison(p: &ValuePredicate) -> SimpleExpr {
    match &p.literal {
        Literal::Text(s) => compare(row_value::Column::TextValue, p.operator, s.clone()),
        Literal::Number(n) => compare(row_value::Column::NumberValue, p.operator, *n),
        Literal::Date(d) => compare(row_value::Column::DateValue, p.operator, d.timestamp()),
        Literal::Boolean(b) => compare(row_value::Column::BooleanValue, p.operator, *b),
    }
}

fn compare<V: Into<sea_orm::Value>>(
    column: row_value::Column,
    op: FilterOperator,
    v: V,
) -> SimpleExpr {
    match op {
        FilterOperator::Eq => column.eq(v),
        FilterOperator::Gt => column.gt(v),
        FilterOperator::Lt => column.lt(v),
        FilterOperator::Ne => column.ne(v),
    }
}

/// 行的值；按行条件子查询取值，不逐个绑定行 id
fn values_for(rows: Condition) -> Select<RowValueRecord> {
    let row_ids = Query::select()
        .column(entity_row::Column::Id)
        .from(EntityRow)
        .cond_where(rows)
        .to_owned();
    RowValueRecord::find()
        .filter(row_value::Column::RowId.in_subquery(row_ids))
        .order_by_asc(row_value::Column::Id)
}

async fn attach_values(
    db: &DatabaseConnection,
    models: Vec<entity_row::Model>,
    rows: Condition,
) -> Result<Vec<Row>, DbErr> {
    let mut values: HashMap<i32, Vec<RowValue>> = HashMap::new();
    if !models.is_empty() {
        for r in values_for(rows).all(db).await? {
            values.entry(r.row_id).or_default().push(value_from_model(r));
        }
    }

    Ok(models
        .into_iter()
        .map(|m| Row {
            id: m.id,
            entity_id: m.entity_id,
            tenant_id: m.tenant_id,
            created_at: DateTime::from_timestamp(m.created_at, 0).unwrap_or_default(),
            created_by: m.created_by,
            values: values.remove(&m.id).unwrap_or_default(),
            parents: Vec::new(),
            children: Vec::new(),
        })
        .collect())
}

fn value_active_model(value: &RowValue) -> RowValueActiveModel {
    let mut am = RowValueActiveModel {
        row_id: Set(value.row_id),
        property_id: Set(value.property_id),
        ..Default::default()
    };
    apply_value(&mut am, &value.value);
    am
}

/// 写入活动字段，其余列清空
fn apply_value(am: &mut RowValueActiveModel, value: &TypedValue) {
    am.text_value = Set(None);
    am.number_value = Set(None);
    am.date_value = Set(None);
    am.boolean_value = Set(None);
    am.multiple_json = Set(None);
    am.media_json = Set(None);
    am.number_range_json = Set(None);
    am.date_range_json = Set(None);

    match value {
        TypedValue::Empty => {}
        TypedValue::Text(s) => am.text_value = Set(Some(s.clone())),
        TypedValue::Number(n) => am.number_value = Set(Some(*n)),
        TypedValue::Date(d) => am.date_value = Set(Some(d.timestamp())),
        TypedValue::Boolean(b) => am.boolean_value = Set(Some(*b)),
        TypedValue::Multiple(items) => am.multiple_json = Set(serde_json::to_string(items).ok()),
        TypedValue::Media(items) => am.media_json = Set(serde_json::to_string(items).ok()),
        TypedValue::NumberRange(r) => am.number_range_json = Set(serde_json::to_string(r).ok()),
        TypedValue::DateRange(r) => am.date_range_json = Set(serde_json::to_string(r).ok()),
    }
}

fn value_from_model(m: row_value::Model) -> RowValue {
    let value = if let Some(s) = m.text_value {
        TypedValue::Text(s)
    } else if let Some(n) = m.number_value {
        TypedValue::Number(n)
    } else if let Some(ts) = m.date_value {
        DateTime::from_timestamp(ts, 0)
            .map(TypedValue::Date)
            .unwrap_or_default()
    } else if let Some(b) = m.boolean_value {
        TypedValue::Boolean(b)
    } else if let Some(json) = m.multiple_json {
        serde_json::from_str(&json)
            .map(TypedValue::Multiple)
            .unwrap_or_default()
    } else if let Some(json) = m.media_json {
        serde_json::from_str(&json)
            .map(TypedValue::Media)
            .unwrap_or_default()
    } else if let Some(json) = m.number_range_json {
        serde_json::from_str(&json)
            .map(TypedValue::NumberRange)
            .unwrap_or_default()
    } else if let Some(json) = m.date_range_json {
        serde_json::from_str(&json)
            .map(TypedValue::DateRange)
            .unwrap_or_default()
    } else {
        TypedValue::Empty
    };

    RowValue {
        id: m.id,
        row_id: m.row_id,
        property_id: m.property_id,
        value,
    }
}

fn link_from_model(m: row_relation::Model) -> RelatedRowLink {
    RelatedRowLink {
        id: m.id,
        relationship_id: m.relationship_id,
        parent_row_id: m.parent_row_id,
        child_row_id: m.child_row_id,
        order: m.sort_order,
    }
}
