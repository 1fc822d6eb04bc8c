use crate::report::model::{
    ArithmeticOperator, ChartConfig, ChartFilter, ComputedField, FilterOperator, GroupBy, Metric,
    MetricOperation, PropertyRef, TimeGranularity, VisualizationType,
};
use crate::schema::PropertyType;
use crate::storage::entity::chart_computed_field::{
    self, ActiveModel as ComputedFieldActiveModel, Entity as ChartComputedField,
};
use crate::storage::entity::chart_config::{
    self, ActiveModel as ChartConfigActiveModel, Entity as ChartConfigRecord,
};
use crate::storage::entity::chart_filter::{
    self, ActiveModel as ChartFilterActiveModel, Entity as ChartFilterRecord,
};
use crate::storage::entity::chart_group_by::{
    self, ActiveModel as ChartGroupByActiveModel, Entity as ChartGroupBy,
};
use crate::storage::entity::chart_metric::{
    self, ActiveModel as ChartMetricActiveModel, Entity as ChartMetric,
};
use chrono::Utc;
use log::{info, warn};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};

pub struct ChartRepository;

impl ChartRepository {
    pub async fn create(db: &DatabaseConnection, config: &ChartConfig) -> Result<ChartConfig, DbErr> {
        let now = Utc::now().timestamp();
        let txn = db.begin().await?;

        let mut am = ChartConfigActiveModel {
            created_at: Set(now),
            ..Default::default()
        };
        apply_header(&mut am, config, now);
        let saved = am.insert(&txn).await?;
        insert_nested(&txn, saved.id, config).await?;

        txn.commit().await?;
        info!("✓ 图表已创建: {} (id: {})", config.title, saved.id);

        Self::get(db, saved.id)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("chart config {}", saved.id)))
    }

    pub async fn get(db: &DatabaseConnection, id: i32) -> Result<Option<ChartConfig>, DbErr> {
        match ChartConfigRecord::find_by_id(id).one(db).await? {
            Some(m) => Ok(Some(assemble(db, m).await?)),
            None => Ok(None),
        }
    }

    /// 覆盖表头字段；groupBy/metrics/filters/computedFields 先删后建，同一事务
    pub async fn update(
        db: &DatabaseConnection,
        config: &ChartConfig,
    ) -> Result<Option<ChartConfig>, DbErr> {
        let txn = db.begin().await?;
        let Some(existing) = ChartConfigRecord::find_by_id(config.id).one(&txn).await? else {
            return Ok(None);
        };

        let mut am: ChartConfigActiveModel = existing.into();
        apply_header(&mut am, config, Utc::now().timestamp());
        am.update(&txn).await?;

        delete_nested(&txn, config.id).await?;
        insert_nested(&txn, config.id, config).await?;
        txn.commit().await?;

        Self::get(db, config.id).await
    }

    pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<bool, DbErr> {
        let txn = db.begin().await?;
        delete_nested(&txn, id).await?;
        let res = ChartConfigRecord::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn list_for_entity_group(
        db: &DatabaseConnection,
        entity_id: i32,
        group_slug: &str,
    ) -> Result<Vec<ChartConfig>, DbErr> {
        let query = ChartConfigRecord::find()
            .filter(chart_config::Column::EntityId.eq(entity_id))
            .filter(chart_config::Column::GroupSlug.eq(group_slug));
        Self::list(db, query).await
    }

    /// group 级图表：不绑定实体 id
    pub async fn list_global(
        db: &DatabaseConnection,
        group_slug: &str,
    ) -> Result<Vec<ChartConfig>, DbErr> {
        let query = ChartConfigRecord::find()
            .filter(chart_config::Column::EntityId.is_null())
            .filter(chart_config::Column::GroupSlug.eq(group_slug));
        Self::list(db, query).await
    }

    pub async fn list_all(db: &DatabaseConnection) -> Result<Vec<ChartConfig>, DbErr> {
        Self::list(db, ChartConfigRecord::find()).await
    }

    async fn list(
        db: &DatabaseConnection,
        query: Select<ChartConfigRecord>,
    ) -> Result<Vec<ChartConfig>, DbErr> {
        let models = query
            .order_by_asc(chart_config::Column::SortOrder)
            .order_by_asc(chart_config::Column::Id)
            .all(db)
            .await?;
        let mut out = Vec::with_capacity(models.len());
        for m in models {
            out.push(assemble(db, m).await?);
        }
        Ok(out)
    }
}

fn apply_header(am: &mut ChartConfigActiveModel, config: &ChartConfig, now: i64) {
    am.tenant_ids_json =
        Set(serde_json::to_string(&config.tenant_ids).unwrap_or_else(|_| "[]".to_string()));
    am.entity_id = Set(config.entity_id);
    am.entity_slug = Set(config.entity_slug.clone());
    am.group_slug = Set(config.group_slug.clone());
    am.title = Set(config.title.clone());
    am.sort_order = Set(config.order);
    am.visualization_type = Set(config.visualization_type.as_str().to_string());
    am.time_granularity = Set(config.time_granularity.map(|g| g.as_str().to_string()));
    am.updated_at = Set(now);
}

async fn insert_nested<C: ConnectionTrait>(
    db: &C,
    chart_id: i32,
    config: &ChartConfig,
) -> Result<(), DbErr> {
    if let Some(g) = &config.group_by {
        ChartGroupByActiveModel {
            chart_id: Set(chart_id),
            property_ref: Set(g.property.to_stored()),
            property_type: Set(g.property_type.map(PropertyType::code)),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    let metrics: Vec<ChartMetricActiveModel> = config
        .metrics
        .iter()
        .enumerate()
        .map(|(idx, m)| ChartMetricActiveModel {
            chart_id: Set(chart_id),
            property_ref: Set(m.property.to_stored()),
            operation: Set("sum".to_string()),
            sort_order: Set(idx as i32),
            ..Default::default()
        })
        .collect();
    if !metrics.is_empty() {
        ChartMetric::insert_many(metrics).exec(db).await?;
    }

    let filters: Vec<ChartFilterActiveModel> = config
        .filters
        .iter()
        .enumerate()
        .map(|(idx, f)| ChartFilterActiveModel {
            chart_id: Set(chart_id),
            property_ref: Set(f.field.to_stored()),
            operator: Set(f.operator.as_str().to_string()),
            value: Set(f.value.clone()),
            sort_order: Set(idx as i32),
            ..Default::default()
        })
        .collect();
    if !filters.is_empty() {
        ChartFilterRecord::insert_many(filters).exec(db).await?;
    }

    let computed: Vec<ComputedFieldActiveModel> = config
        .computed_fields
        .iter()
        .enumerate()
        .map(|(idx, c)| ComputedFieldActiveModel {
            chart_id: Set(chart_id),
            field_a: Set(c.field_a.to_stored()),
            field_b: Set(c.field_b.to_stored()),
            operator: Set(c.operator.as_str().to_string()),
            sort_order: Set(idx as i32),
            ..Default::default()
        })
        .collect();
    if !computed.is_empty() {
        ChartComputedField::insert_many(computed).exec(db).await?;
    }

    Ok(())
}

async fn delete_nested<C: ConnectionTrait>(db: &C, chart_id: i32) -> Result<(), DbErr> {
    ChartGroupBy::delete_many()
        .filter(chart_group_by::Column::ChartId.eq(chart_id))
        .exec(db)
        .await?;
    ChartMetric::delete_many()
        .filter(chart_metric::Column::ChartId.eq(chart_id))
        .exec(db)
        .await?;
    ChartFilterRecord::delete_many()
        .filter(chart_filter::Column::ChartId.eq(chart_id))
        .exec(db)
        .await?;
    ChartComputedField::delete_many()
        .filter(chart_computed_field::Column::ChartId.eq(chart_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn assemble(db: &DatabaseConnection, m: chart_config::Model) -> Result<ChartConfig, DbErr> {
    let visualization_type = VisualizationType::try_from(m.visualization_type.clone())
        .unwrap_or_else(|e| {
            warn!("⚠ 图表 {}: {}，按 stat chart 处理", m.id, e);
            VisualizationType::Stat
        });
    let time_granularity = m
        .time_granularity
        .clone()
        .and_then(|g| TimeGranularity::try_from(g).ok());

    let group_by = ChartGroupBy::find()
        .filter(chart_group_by::Column::ChartId.eq(m.id))
        .order_by_asc(chart_group_by::Column::Id)
        .one(db)
        .await?
        .map(|g| GroupBy {
            property: PropertyRef::from_stored(&g.property_ref),
            property_type: g.property_type.and_then(PropertyType::from_code),
        });

    let metrics = ChartMetric::find()
        .filter(chart_metric::Column::ChartId.eq(m.id))
        .order_by_asc(chart_metric::Column::SortOrder)
        .all(db)
        .await?
        .into_iter()
        .map(|r| Metric {
            property: PropertyRef::from_stored(&r.property_ref),
            operation: MetricOperation::Sum,
        })
        .collect();

    let filters = ChartFilterRecord::find()
        .filter(chart_filter::Column::ChartId.eq(m.id))
        .order_by_asc(chart_filter::Column::SortOrder)
        .all(db)
        .await?
        .into_iter()
        .map(|r| ChartFilter {
            field: PropertyRef::from_stored(&r.property_ref),
            operator: FilterOperator::parse(&r.operator),
            value: r.value,
        })
        .collect();

    let mut computed_fields = Vec::new();
    let rows = ChartComputedField::find()
        .filter(chart_computed_field::Column::ChartId.eq(m.id))
        .order_by_asc(chart_computed_field::Column::SortOrder)
        .all(db)
        .await?;
    for r in rows {
        match ArithmeticOperator::try_from(r.operator.clone()) {
            Ok(operator) => computed_fields.push(ComputedField {
                field_a: PropertyRef::from_stored(&r.field_a),
                field_b: PropertyRef::from_stored(&r.field_b),
                operator,
            }),
            Err(e) => warn!("⚠ 图表 {} 的计算字段 {} 被忽略: {}", m.id, r.id, e),
        }
    }

    Ok(ChartConfig {
        id: m.id,
        tenant_ids: serde_json::from_str(&m.tenant_ids_json).unwrap_or_default(),
        entity_id: m.entity_id,
        entity_slug: m.entity_slug,
        group_slug: m.group_slug,
        title: m.title,
        order: m.sort_order,
        visualization_type,
        group_by,
        metrics,
        filters,
        computed_fields,
        time_granularity,
    })
}
