use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use log::info;
use rand::Rng;
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::report::model::{
    ArithmeticOperator, ChartConfig, ChartFilter, ComputedField, FilterOperator, GroupBy, Metric,
    MetricOperation, PropertyRef, TimeGranularity, VisualizationType,
};
use crate::report::EntityLookup;
use crate::schema::{
    validate_entity, Entity, EntityRelationship, Property, PropertyFlags, PropertyOption,
    PropertySubtype, PropertyType, ATTR_DEFAULT_VALUE,
};
use crate::storage::{ChartRepository, NewRow, RowRepository, SchemaRepository};

const JOB_STATUSES: [&str; 3] = ["Open", "Closed", "Filled"];
const INDUSTRIES: [&str; 3] = ["Tech", "Finance", "Retail"];
const JOB_COUNT: usize = 24;

fn draft_property(name: &str, title: &str, property_type: PropertyType, order: i32) -> Property {
    Property {
        id: order,
        entity_id: 0,
        name: name.to_string(),
        title: title.to_string(),
        property_type,
        subtype: None,
        order,
        flags: PropertyFlags::default(),
        options: Vec::new(),
        attributes: BTreeMap::new(),
    }
}

fn options(values: &[&str]) -> Vec<PropertyOption> {
    values
        .iter()
        .enumerate()
        .map(|(idx, v)| PropertyOption {
            id: 0,
            property_id: 0,
            name: v.to_string(),
            value: v.to_string(),
            color: None,
            order: idx as i32,
        })
        .collect()
}

fn draft_entity(tenant_id: i32, name: &str, slug: &str, properties: Vec<Property>) -> Entity {
    Entity {
        id: 0,
        tenant_id,
        name: name.to_string(),
        slug: slug.to_string(),
        title: name.to_string(),
        title_plural: format!("{name}s"),
        icon: None,
        properties,
        parents: Vec::new(),
        children: Vec::new(),
        views: Vec::new(),
    }
}

fn job_draft(tenant_id: i32) -> Entity {
    let mut status = draft_property("status", "Status", PropertyType::Select, 1);
    status.options = options(&JOB_STATUSES);
    status
        .attributes
        .insert(ATTR_DEFAULT_VALUE.to_string(), "Open".to_string());
    let mut salary = draft_property("salary", "Salary", PropertyType::Number, 2);
    salary.subtype = Some(PropertySubtype::Currency);
    let mut title = draft_property("title", "Title", PropertyType::Text, 0);
    title.flags.required = true;

    draft_entity(
        tenant_id,
        "Job",
        "job",
        vec![
            title,
            status,
            salary,
            draft_property("bonus", "Bonus", PropertyType::Number, 3),
            draft_property("remote", "Remote", PropertyType::Boolean, 4),
        ],
    )
}

fn company_draft(tenant_id: i32) -> Entity {
    let mut industry = draft_property("industry", "Industry", PropertyType::Select, 1);
    industry.options = options(&INDUSTRIES);
    let mut email = draft_property("email", "Contact email", PropertyType::Text, 2);
    email.subtype = Some(PropertySubtype::Email);

    draft_entity(
        tenant_id,
        "Company",
        "company",
        vec![
            draft_property("name", "Name", PropertyType::Text, 0),
            industry,
            email,
        ],
    )
}

fn demo_charts(job_id: i32) -> Vec<ChartConfig> {
    let base = |title: &str, order: i32, visualization_type: VisualizationType| ChartConfig {
        id: 0,
        tenant_ids: Vec::new(),
        entity_id: Some(job_id),
        entity_slug: None,
        group_slug: "jobs".to_string(),
        title: title.to_string(),
        order,
        visualization_type,
        group_by: None,
        metrics: Vec::new(),
        filters: Vec::new(),
        computed_fields: Vec::new(),
        time_granularity: None,
    };
    let by_status = || {
        Some(GroupBy {
            property: PropertyRef::Name("status".to_string()),
            property_type: None,
        })
    };

    let open_jobs = ChartConfig {
        filters: vec![ChartFilter {
            field: PropertyRef::Name("status".to_string()),
            operator: FilterOperator::Eq,
            value: "Open".to_string(),
        }],
        ..base("Open jobs", 0, VisualizationType::Stat)
    };
    let payroll = ChartConfig {
        metrics: vec![Metric {
            property: PropertyRef::Name("salary".to_string()),
            operation: MetricOperation::Sum,
        }],
        ..base("Total salary", 1, VisualizationType::Stat)
    };
    let status_bar = ChartConfig {
        group_by: by_status(),
        ..base("Jobs by status", 2, VisualizationType::Bar)
    };
    let well_paid = ChartConfig {
        group_by: by_status(),
        filters: vec![ChartFilter {
            field: PropertyRef::Name("salary".to_string()),
            operator: FilterOperator::Gt,
            value: "90000".to_string(),
        }],
        ..base("Well paid jobs", 3, VisualizationType::Pie)
    };
    let bonus_ratio = ChartConfig {
        group_by: by_status(),
        computed_fields: vec![ComputedField {
            field_a: PropertyRef::Name("bonus".to_string()),
            field_b: PropertyRef::Name("salary".to_string()),
            operator: ArithmeticOperator::Div,
        }],
        ..base("Bonus ratio", 4, VisualizationType::Line)
    };
    let recent = ChartConfig {
        group_by: by_status(),
        time_granularity: Some(TimeGranularity::Month),
        ..base("Jobs this month", 5, VisualizationType::Trend)
    };
    let global = ChartConfig {
        entity_id: None,
        entity_slug: Some("job".to_string()),
        ..base("All jobs", 0, VisualizationType::Stat)
    };

    vec![open_jobs, payroll, status_bar, well_paid, bonus_ratio, recent, global]
}

/// 写入示例数据；已存在 job 实体时直接返回
pub async fn run(db: &DatabaseConnection, tenant_id: i32) -> anyhow::Result<Value> {
    if let Some(existing) = SchemaRepository::load_entity(db, EntityLookup::Slug("job")).await? {
        info!("示例数据已存在 (job id: {})，跳过", existing.id);
        return Ok(json!({ "seeded": false, "jobEntityId": existing.id }));
    }

    let job_draft = job_draft(tenant_id);
    let company_draft = company_draft(tenant_id);
    for draft in [&job_draft, &company_draft] {
        if let Err(e) = validate_entity(draft) {
            bail!("示例实体 {} 定义无效: {}", draft.name, e);
        }
    }

    let job = SchemaRepository::create_entity(db, &job_draft).await?;
    let company = SchemaRepository::create_entity(db, &company_draft).await?;
    SchemaRepository::add_relationship(
        db,
        &EntityRelationship {
            id: 0,
            parent_id: company.id,
            child_id: job.id,
            title: Some("Openings".to_string()),
            order: 0,
            distinct: false,
            read_only: false,
            hidden_if_empty: true,
        },
    )
    .await?;
    let company = SchemaRepository::load_entity(db, EntityLookup::Id(company.id))
        .await?
        .context("company entity disappeared")?;
    let openings = company
        .children
        .first()
        .map(|r| r.id)
        .context("company has no child relationship")?;

    let mut company_rows = Vec::new();
    for (idx, industry) in INDUSTRIES.iter().enumerate() {
        let input: BTreeMap<String, Value> = [
            ("name".to_string(), json!(format!("Company {}", idx + 1))),
            ("industry".to_string(), json!(industry)),
            ("email".to_string(), json!(format!("hr{}@example.com", idx + 1))),
        ]
        .into_iter()
        .collect();
        let row = RowRepository::create_row(
            db,
            &company,
            NewRow {
                tenant_id,
                created_by: Some("demo".to_string()),
                created_at: None,
                input,
            },
        )
        .await?;
        company_rows.push(row.id);
    }

    // ThreadRng 不能跨 await 持有
    let jobs: Vec<(BTreeMap<String, Value>, i64, usize)> = {
        let mut rng = rand::thread_rng();
        (0..JOB_COUNT)
            .map(|idx| {
                let salary = rng.gen_range(30..150) * 1000;
                let bonus = rng.gen_range(0..=20) * 500;
                let status = JOB_STATUSES[rng.gen_range(0..JOB_STATUSES.len())];
                let input: BTreeMap<String, Value> = [
                    ("title".to_string(), json!(format!("Job {}", idx + 1))),
                    ("status".to_string(), json!(status)),
                    ("salary".to_string(), json!(salary)),
                    ("bonus".to_string(), json!(bonus)),
                    ("remote".to_string(), json!(rng.gen_bool(0.4))),
                ]
                .into_iter()
                .collect();
                (
                    input,
                    rng.gen_range(0..400),
                    rng.gen_range(0..company_rows.len()),
                )
            })
            .collect()
    };

    let mut created = 0usize;
    for (input, age_days, company_idx) in jobs {
        let row = RowRepository::create_row(
            db,
            &job,
            NewRow {
                tenant_id,
                created_by: Some("demo".to_string()),
                created_at: Some(Utc::now() - Duration::days(age_days)),
                input,
            },
        )
        .await?;
        RowRepository::link_rows(db, &company, openings, company_rows[company_idx], &[row.id])
            .await?;
        created += 1;
    }

    let mut charts = Vec::new();
    for cfg in demo_charts(job.id) {
        charts.push(ChartRepository::create(db, &cfg).await?.id);
    }

    info!(
        "✓ 示例数据已写入: job={}, company={}, 行数={}, 图表={}",
        job.id,
        company.id,
        created + company_rows.len(),
        charts.len()
    );

    Ok(json!({
        "seeded": true,
        "jobEntityId": job.id,
        "companyEntityId": company.id,
        "rows": created + company_rows.len(),
        "charts": charts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::predicate::RowQuery;
    use crate::test_support::memory_db;

    #[tokio::test]
    async fn test_demo_seeds_once() {
        let db = memory_db().await;
        let out = run(&db, 1).await.unwrap();
        assert_eq!(out["seeded"], json!(true));
        let job_id = out["jobEntityId"].as_i64().unwrap() as i32;

        let count = RowRepository::count_rows(
            &db,
            &RowQuery {
                tenant_ids: vec![1],
                entity_id: job_id,
                created_from: None,
                predicates: vec![],
            },
        )
        .await
        .unwrap();
        assert_eq!(count, JOB_COUNT as u64);
        assert_eq!(ChartRepository::list_all(&db).await.unwrap().len(), 7);

        let again = run(&db, 1).await.unwrap();
        assert_eq!(again["seeded"], json!(false));
    }
}
