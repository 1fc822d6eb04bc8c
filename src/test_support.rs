//! 测试夹具：Job 实体、内存 sqlite 和示例数据

use chrono::{Duration, Utc};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::report::model::{ChartConfig, VisualizationType};
use crate::schema::{
    Entity, EntityRelationship, Property, PropertyFlags, PropertyOption, PropertyType,
};
use crate::storage::{create_tables, NewRow, RowRepository, SchemaRepository};
use crate::values::{Row, RowValue, TypedValue};

pub const JOB_ENTITY: i32 = 1;
pub const JOB_TITLE: i32 = 1;
pub const JOB_STATUS: i32 = 2;
pub const JOB_SALARY: i32 = 3;
pub const JOB_BONUS: i32 = 4;
pub const JOB_OPENED: i32 = 5;

pub fn property(id: i32, name: &str, property_type: PropertyType) -> Property {
    Property {
        id,
        entity_id: JOB_ENTITY,
        name: name.to_string(),
        title: name.to_string(),
        property_type,
        subtype: None,
        order: 0,
        flags: PropertyFlags::default(),
        options: Vec::new(),
        attributes: BTreeMap::new(),
    }
}

/// title, status (Open/Closed/Filled), salary, bonus, opened
pub fn job_entity() -> Entity {
    let mut status = property(JOB_STATUS, "status", PropertyType::Select);
    status.options = ["Open", "Closed", "Filled"]
        .iter()
        .enumerate()
        .map(|(idx, v)| PropertyOption {
            id: idx as i32 + 1,
            property_id: JOB_STATUS,
            name: v.to_string(),
            value: v.to_string(),
            color: None,
            order: idx as i32,
        })
        .collect();

    let mut properties = vec![
        property(JOB_TITLE, "title", PropertyType::Text),
        status,
        property(JOB_SALARY, "salary", PropertyType::Number),
        property(JOB_BONUS, "bonus", PropertyType::Number),
        property(JOB_OPENED, "opened", PropertyType::Date),
    ];
    for (idx, p) in properties.iter_mut().enumerate() {
        p.order = idx as i32;
    }

    Entity {
        id: JOB_ENTITY,
        tenant_id: 1,
        name: "Job".to_string(),
        slug: "job".to_string(),
        title: "Job".to_string(),
        title_plural: "Jobs".to_string(),
        icon: None,
        properties,
        parents: Vec::new(),
        children: Vec::new(),
        views: Vec::new(),
    }
}

pub fn relationship(
    id: i32,
    parent_id: i32,
    child_id: i32,
    distinct: bool,
    hidden_if_empty: bool,
) -> EntityRelationship {
    EntityRelationship {
        id,
        parent_id,
        child_id,
        title: None,
        order: 0,
        distinct,
        read_only: false,
        hidden_if_empty,
    }
}

pub fn foreign_property(id: i32, entity_id: i32) -> Property {
    let mut p = property(id, &format!("foreign_{id}"), PropertyType::Text);
    p.entity_id = entity_id;
    p
}

/// 内存中的 Job 行（不经过数据库）
pub fn job_row(id: i32, status: &str, salary: Option<f64>, bonus: Option<f64>) -> Row {
    let value = |property_id: i32, value: TypedValue| RowValue {
        id: 0,
        row_id: id,
        property_id,
        value,
    };
    Row {
        id,
        entity_id: JOB_ENTITY,
        tenant_id: 1,
        created_at: Utc::now(),
        created_by: None,
        values: vec![
            value(JOB_STATUS, TypedValue::Text(status.to_string())),
            value(JOB_SALARY, salary.map(TypedValue::Number).unwrap_or_default()),
            value(JOB_BONUS, bonus.map(TypedValue::Number).unwrap_or_default()),
        ],
        parents: Vec::new(),
        children: Vec::new(),
    }
}

pub fn chart(visualization_type: VisualizationType) -> ChartConfig {
    ChartConfig {
        id: 1,
        tenant_ids: Vec::new(),
        entity_id: Some(JOB_ENTITY),
        entity_slug: None,
        group_slug: "jobs".to_string(),
        title: String::new(),
        order: 0,
        visualization_type,
        group_by: None,
        metrics: Vec::new(),
        filters: Vec::new(),
        computed_fields: Vec::new(),
        time_granularity: None,
    }
}

pub async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
    // 内存库只存在于单个连接上
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite::memory:");
    create_tables(&db).await.expect("create tables");
    db
}

/// 写入 Job 实体，属性 id 依次为 1..=5
pub async fn seed_job_schema(db: &DatabaseConnection) -> Entity {
    SchemaRepository::create_entity(db, &job_entity())
        .await
        .expect("seed job entity")
}

/// status: Open, Open, Open, Closed, Filled
/// salary: 10, 20, 30, 40, 50
/// bonus:  1, 2, 0, 4, 5
/// 最后一行创建于 60 天前
pub async fn seed_job_rows(db: &DatabaseConnection, entity: &Entity) -> Vec<Row> {
    let data = [
        ("Open", 10, 1),
        ("Open", 20, 2),
        ("Open", 30, 0),
        ("Closed", 40, 4),
        ("Filled", 50, 5),
    ];
    let mut rows = Vec::new();
    for (idx, (status, salary, bonus)) in data.into_iter().enumerate() {
        let input: BTreeMap<String, Value> = [
            ("title".to_string(), json!(format!("Job {}", idx + 1))),
            ("status".to_string(), json!(status)),
            ("salary".to_string(), json!(salary)),
            ("bonus".to_string(), json!(bonus)),
            ("opened".to_string(), json!("2024-01-15")),
        ]
        .into_iter()
        .collect();
        let created_at = (idx == data.len() - 1).then(|| Utc::now() - Duration::days(60));
        let row = RowRepository::create_row(
            db,
            entity,
            NewRow {
                tenant_id: 1,
                created_by: Some("seed".to_string()),
                created_at,
                input,
            },
        )
        .await
        .expect("seed job row");
        rows.push(row);
    }
    rows
}
