use futures::stream::{self, StreamExt};
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

use crate::config::AppConfig;
use crate::error::ReportError;
use crate::report::aggregate::{
    computed_by_category, count_by_category, count_rows_output, pad_to_equal_length,
    series_output, sum_computed, sum_metrics, ComputedPair,
};
use crate::report::model::{
    ChartConfig, ChartData, EvaluatedChart, PropertyRef, RequestContext, SkippedItem,
    SkippedKind, VisualizationType,
};
use crate::report::predicate::{prepare, PropertyIndex};
use crate::report::source::{EntityLookup, RowSource};
use crate::schema::Entity;

pub struct ReportService {
    source: Arc<dyn RowSource>,
    worker_count: usize,
    query_timeout: Duration,
}

impl ReportService {
    pub fn new(source: Arc<dyn RowSource>) -> Self {
        Self {
            source,
            worker_count: 4,
            query_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(source: Arc<dyn RowSource>, config: &AppConfig) -> Self {
        Self::new(source).with_limits(config.worker_limit, config.query_timeout)
    }

    pub fn with_limits(mut self, worker_count: usize, query_timeout: Duration) -> Self {
        self.worker_count = worker_count.max(1);
        self.query_timeout = query_timeout;
        self
    }

    /// 计算单个图表。失败不会向外抛出，而是返回 `success: false` 和空结果
    pub async fn evaluate(
        &self,
        config: &ChartConfig,
        tenant_id: i32,
        ctx: &RequestContext,
    ) -> EvaluatedChart {
        let outcome = match timeout(self.query_timeout, self.compute(config, tenant_id, ctx)).await
        {
            Ok(r) => r,
            Err(_) => Err(ReportError::Timeout(self.query_timeout)),
        };

        match outcome {
            Ok((resolved, data, skipped)) => {
                if !skipped.is_empty() {
                    warn!(
                        "⚠ 图表 [{}] 跳过 {} 个无效配置项: {:?}",
                        config.id,
                        skipped.len(),
                        skipped
                    );
                }
                EvaluatedChart {
                    config: resolved,
                    chart_data: data,
                    success: true,
                    error: None,
                    skipped,
                }
            }
            Err(e) => {
                error!("✗ 图表 [{}] 计算失败: {}", config.id, e);
                EvaluatedChart {
                    config: config.clone(),
                    chart_data: empty_data(config.visualization_type),
                    success: false,
                    error: Some(e.to_string()),
                    skipped: Vec::new(),
                }
            }
        }
    }

    /// 并发计算一组图表（并发上限 = worker_count），输出保持输入顺序。
    /// 单个图表失败或超时只影响它自己
    pub async fn evaluate_all(
        &self,
        configs: &[ChartConfig],
        tenant_id: i32,
        ctx: &RequestContext,
    ) -> Vec<EvaluatedChart> {
        info!(
            "开始计算 {} 个图表 (tenant: {}, 并发: {})",
            configs.len(),
            tenant_id,
            self.worker_count
        );
        let results: Vec<EvaluatedChart> = stream::iter(
            configs
                .iter()
                .map(|config| self.evaluate(config, tenant_id, ctx)),
        )
        .buffered(self.worker_count)
        .collect()
        .await;

        let failed = results.iter().filter(|r| !r.success).count();
        info!("✓ 图表计算完成: {} 成功, {} 失败", results.len() - failed, failed);
        results
    }

    async fn compute(
        &self,
        config: &ChartConfig,
        tenant_id: i32,
        ctx: &RequestContext,
    ) -> Result<(ChartConfig, ChartData, Vec<SkippedItem>), ReportError> {
        let lookup = match (config.entity_id, config.entity_slug.as_deref()) {
            (Some(id), _) => EntityLookup::Id(id),
            (None, Some(slug)) => EntityLookup::Slug(slug),
            (None, None) => return Err(ReportError::MissingEntity(config.id)),
        };
        let entity = self
            .source
            .find_entity(lookup)
            .await?
            .ok_or_else(|| ReportError::EntityNotFound(format!("{lookup:?}")))?;

        let properties = self.load_properties(config, &entity).await?;
        let tenant_ids = if config.tenant_ids.is_empty() {
            vec![tenant_id]
        } else {
            config.tenant_ids.clone()
        };

        let prepared = prepare(config, entity.id, tenant_ids, &properties, ctx);
        let mut skipped = prepared.skipped;
        let pairs = resolve_computed(config, &properties, &mut skipped);

        let mut resolved = config.clone();
        if let (Some(g), Some(rg)) = (resolved.group_by.as_mut(), prepared.group_by.as_ref()) {
            g.property_type = Some(rg.property_type);
        }

        let data = if config.visualization_type == VisualizationType::Stat {
            let metric_ids = resolve_metrics(config, &properties, &mut skipped);
            if !metric_ids.is_empty() {
                let rows = self.source.find_rows(&prepared.query).await?;
                ChartData::Value(sum_metrics(&rows, &metric_ids))
            } else if !pairs.is_empty() {
                let rows = self.source.find_rows(&prepared.query).await?;
                ChartData::Value(sum_computed(&rows, &pairs))
            } else {
                ChartData::Value(self.source.count_rows(&prepared.query).await? as f64)
            }
        } else {
            let Some(group) = prepared.group_by else {
                if config.group_by.is_none() {
                    skipped.push(SkippedItem::new(
                        SkippedKind::GroupBy,
                        "-",
                        "breakdown chart has no groupBy property",
                    ));
                }
                return Ok((resolved, ChartData::Breakdown(Vec::new()), skipped));
            };

            let rows = self.source.find_rows(&prepared.query).await?;
            let key = entity.series_key();
            let fill = config.visualization_type.uses_fill();
            let out = if pairs.is_empty() {
                let counts = count_by_category(&rows, group.property_id, &group.categories);
                count_rows_output(&group.categories, &counts, &key, fill)
            } else {
                let mut series =
                    computed_by_category(&rows, group.property_id, &group.categories, &pairs);
                pad_to_equal_length(&mut series);
                series_output(&group.categories, &series, &key, fill)
            };
            ChartData::Breakdown(out)
        };

        Ok((resolved, data, skipped))
    }

    /// 实体自身属性 + 通过 id 引用的其他属性（用于识别跨实体引用）
    async fn load_properties(
        &self,
        config: &ChartConfig,
        entity: &Entity,
    ) -> Result<PropertyIndex, ReportError> {
        let mut extra: BTreeSet<i32> = BTreeSet::new();
        for reference in referenced_properties(config) {
            let id = match reference {
                PropertyRef::Id(id) => Some(*id),
                PropertyRef::Name(name) if entity.property_by_name(name).is_none() => {
                    name.trim().parse::<i32>().ok()
                }
                PropertyRef::Name(_) => None,
            };
            if let Some(id) = id.filter(|id| entity.property(*id).is_none()) {
                extra.insert(id);
            }
        }

        let mut properties = entity.properties.clone();
        if !extra.is_empty() {
            let ids: Vec<i32> = extra.into_iter().collect();
            properties.extend(self.source.find_properties(&ids).await?);
        }
        Ok(PropertyIndex::new(entity.id, properties))
    }
}

fn referenced_properties(config: &ChartConfig) -> Vec<&PropertyRef> {
    let mut refs: Vec<&PropertyRef> = Vec::new();
    refs.extend(config.group_by.iter().map(|g| &g.property));
    refs.extend(config.metrics.iter().map(|m| &m.property));
    refs.extend(config.filters.iter().map(|f| &f.field));
    for c in &config.computed_fields {
        refs.push(&c.field_a);
        refs.push(&c.field_b);
    }
    refs
}

fn resolve_metrics(
    config: &ChartConfig,
    properties: &PropertyIndex,
    skipped: &mut Vec<SkippedItem>,
) -> Vec<i32> {
    let mut ids = Vec::new();
    for metric in &config.metrics {
        match properties.resolve(&metric.property) {
            Ok(p) => ids.push(p.id),
            Err(reason) => {
                skipped.push(SkippedItem::new(SkippedKind::Metric, &metric.property, reason))
            }
        }
    }
    ids
}

fn resolve_computed(
    config: &ChartConfig,
    properties: &PropertyIndex,
    skipped: &mut Vec<SkippedItem>,
) -> Vec<ComputedPair> {
    let mut pairs = Vec::new();
    for field in &config.computed_fields {
        match (
            properties.resolve(&field.field_a),
            properties.resolve(&field.field_b),
        ) {
            (Ok(a), Ok(b)) => pairs.push(ComputedPair {
                field_a: a.id,
                field_b: b.id,
                operator: field.operator,
            }),
            (Err(reason), _) => skipped.push(SkippedItem::new(
                SkippedKind::ComputedField,
                &field.field_a,
                reason,
            )),
            (_, Err(reason)) => skipped.push(SkippedItem::new(
                SkippedKind::ComputedField,
                &field.field_b,
                reason,
            )),
        }
    }
    pairs
}

fn empty_data(visualization: VisualizationType) -> ChartData {
    match visualization {
        VisualizationType::Stat => ChartData::Value(0.0),
        _ => ChartData::Breakdown(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::{
        ArithmeticOperator, ChartFilter, ComputedField, FilterOperator, GroupBy, Metric,
        MetricOperation, TimeGranularity,
    };
    use crate::report::predicate::RowQuery;
    use crate::schema::Property;
    use crate::storage::DbRowSource;
    use crate::test_support::{
        chart, memory_db, seed_job_rows, seed_job_schema, JOB_BONUS, JOB_SALARY,
    };
    use crate::values::Row;
    use async_trait::async_trait;
    use chrono::Utc;

    async fn service() -> (ReportService, Entity) {
        let db = Arc::new(memory_db().await);
        let entity = seed_job_schema(&db).await;
        seed_job_rows(&db, &entity).await;
        let source: Arc<dyn RowSource> = Arc::new(DbRowSource::new(db));
        (ReportService::new(source), entity)
    }

    fn by_name(name: &str) -> PropertyRef {
        PropertyRef::Name(name.to_string())
    }

    #[tokio::test]
    async fn test_bar_breakdown_by_status() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Bar);
        cfg.group_by = Some(GroupBy {
            property: by_name("status"),
            property_type: None,
        });

        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        assert!(out.success, "{:?}", out.error);
        let rows = out.chart_data.as_breakdown().unwrap();
        let got: Vec<(&str, f64)> = rows
            .iter()
            .map(|r| (r.category.as_str(), r.value("job").unwrap()))
            .collect();
        assert_eq!(got, vec![("Open", 3.0), ("Closed", 1.0), ("Filled", 1.0)]);
        assert!(rows.iter().all(|r| r.fill.is_some()));
        assert_eq!(
            out.config.group_by.unwrap().property_type,
            Some(crate::schema::PropertyType::Select)
        );
    }

    #[tokio::test]
    async fn test_breakdown_keeps_zero_categories() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Pie);
        cfg.group_by = Some(GroupBy {
            property: by_name("status"),
            property_type: None,
        });
        cfg.filters = vec![ChartFilter {
            field: by_name("status"),
            operator: FilterOperator::Eq,
            value: "Open".into(),
        }];
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        let rows = out.chart_data.as_breakdown().unwrap();
        let counts: Vec<f64> = rows.iter().map(|r| r.value("job").unwrap()).collect();
        assert_eq!(counts, vec![3.0, 0.0, 0.0]);
        let total: f64 = counts.iter().sum();
        assert_eq!(total, 3.0);
    }

    #[tokio::test]
    async fn test_stat_count_matches_count_rows() {
        let (svc, entity) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.filters = vec![ChartFilter {
            field: by_name("salary"),
            operator: FilterOperator::Gt,
            value: "15".into(),
        }];
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;

        let query = RowQuery {
            tenant_ids: vec![1],
            entity_id: entity.id,
            created_from: None,
            predicates: vec![],
        };
        let all = svc.source.count_rows(&query).await.unwrap();
        assert_eq!(all, 5);
        // salary: 10, 20, 30, 40, 50
        assert_eq!(out.chart_data, ChartData::Value(4.0));
    }

    #[tokio::test]
    async fn test_stat_metric_sum() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.metrics = vec![Metric {
            property: by_name("salary"),
            operation: MetricOperation::Sum,
        }];
        cfg.filters = vec![ChartFilter {
            field: by_name("status"),
            operator: FilterOperator::Eq,
            value: "Open".into(),
        }];
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        // Open 行的 salary 为 10/20/30
        assert_eq!(out.chart_data, ChartData::Value(60.0));
    }

    #[tokio::test]
    async fn test_unknown_operator_behaves_like_equality() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.filters = vec![ChartFilter {
            field: by_name("status"),
            operator: FilterOperator::parse("~"),
            value: "Open".into(),
        }];
        let tilde = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        cfg.filters[0].operator = FilterOperator::Eq;
        let eq = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        assert_eq!(tilde.chart_data, eq.chart_data);
        assert_eq!(eq.chart_data, ChartData::Value(3.0));
    }

    #[tokio::test]
    async fn test_stat_computed_sum_ignores_division_by_zero() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.computed_fields = vec![ComputedField {
            field_a: PropertyRef::Id(JOB_SALARY),
            field_b: PropertyRef::Id(JOB_BONUS),
            operator: ArithmeticOperator::Div,
        }];
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        assert!(out.success);
        // bonus: 1, 2, 0, 4, 5 -> 10/1 + 20/2 + 40/4 + 50/5
        assert_eq!(out.chart_data, ChartData::Value(40.0));
    }

    #[tokio::test]
    async fn test_line_computed_breakdown_is_padded_without_fill() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Line);
        cfg.group_by = Some(GroupBy {
            property: by_name("status"),
            property_type: None,
        });
        cfg.computed_fields = vec![ComputedField {
            field_a: by_name("salary"),
            field_b: by_name("bonus"),
            operator: ArithmeticOperator::Add,
        }];
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        let rows = out.chart_data.as_breakdown().unwrap();
        assert!(rows.iter().all(|r| r.values.len() == 3 && r.fill.is_none()));
        assert_eq!(rows[0].value("job1"), Some(11.0));
        assert_eq!(rows[1].value("job1"), Some(44.0));
        assert_eq!(rows[1].value("job3"), Some(0.0));
    }

    #[tokio::test]
    async fn test_invalid_references_are_reported_not_fatal() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.filters = vec![ChartFilter {
            field: by_name("nope"),
            operator: FilterOperator::Eq,
            value: "x".into(),
        }];
        cfg.metrics = vec![Metric {
            property: PropertyRef::Id(4242),
            operation: MetricOperation::Sum,
        }];
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        assert!(out.success);
        assert_eq!(out.chart_data, ChartData::Value(5.0));
        assert_eq!(out.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_time_window_excludes_old_rows() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.time_granularity = Some(TimeGranularity::Week);
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        // 有一行是 60 天前创建的
        assert_eq!(out.chart_data, ChartData::Value(4.0));

        cfg.time_granularity = Some(TimeGranularity::External);
        let ctx = RequestContext::now().with_start_date(Utc::now() - chrono::Duration::days(90));
        let out = svc.evaluate(&cfg, 1, &ctx).await;
        assert_eq!(out.chart_data, ChartData::Value(5.0));
    }

    #[tokio::test]
    async fn test_other_tenant_sees_nothing() {
        let (svc, _) = service().await;
        let cfg = chart(VisualizationType::Stat);
        let out = svc.evaluate(&cfg, 2, &RequestContext::now()).await;
        assert_eq!(out.chart_data, ChartData::Value(0.0));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let (svc, _) = service().await;
        let svc = svc.with_limits(3, Duration::from_secs(5));
        let mut configs = Vec::new();
        for i in 0..6 {
            let mut cfg = chart(VisualizationType::Stat);
            cfg.id = i;
            cfg.filters = vec![ChartFilter {
                field: by_name("salary"),
                operator: FilterOperator::Gt,
                value: (i * 10).to_string(),
            }];
            configs.push(cfg);
        }
        let out = svc.evaluate_all(&configs, 1, &RequestContext::now()).await;
        let ids: Vec<i32> = out.iter().map(|c| c.config.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        let values: Vec<f64> = out.iter().filter_map(|c| c.chart_data.as_value()).collect();
        assert_eq!(values, vec![5.0, 4.0, 3.0, 2.0, 1.0, 0.0]);
    }

    /// 对 entity 2 的查询失败或挂起，其余正常
    struct FlakySource {
        inner: DbRowSource,
        hang: bool,
    }

    #[async_trait]
    impl RowSource for FlakySource {
        async fn find_entity(
            &self,
            lookup: EntityLookup<'_>,
        ) -> Result<Option<Entity>, ReportError> {
            if lookup == EntityLookup::Id(2) {
                if self.hang {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
                return Err(ReportError::Db(sea_orm::DbErr::Custom("boom".into())));
            }
            self.inner.find_entity(lookup).await
        }

        async fn find_properties(&self, ids: &[i32]) -> Result<Vec<Property>, ReportError> {
            self.inner.find_properties(ids).await
        }

        async fn find_rows(&self, query: &RowQuery) -> Result<Vec<Row>, ReportError> {
            self.inner.find_rows(query).await
        }

        async fn count_rows(&self, query: &RowQuery) -> Result<u64, ReportError> {
            self.inner.count_rows(query).await
        }
    }

    async fn flaky_service(hang: bool) -> ReportService {
        let db = Arc::new(memory_db().await);
        let entity = seed_job_schema(&db).await;
        seed_job_rows(&db, &entity).await;
        let source = FlakySource {
            inner: DbRowSource::new(db),
            hang,
        };
        ReportService::new(Arc::new(source)).with_limits(2, Duration::from_millis(1000))
    }

    fn mixed_batch() -> Vec<ChartConfig> {
        let good = chart(VisualizationType::Stat);
        let mut bad = chart(VisualizationType::Bar);
        bad.id = 2;
        bad.entity_id = Some(2);
        let mut good2 = chart(VisualizationType::Stat);
        good2.id = 3;
        vec![good, bad, good2]
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_config() {
        let svc = flaky_service(false).await;
        let out = svc.evaluate_all(&mixed_batch(), 1, &RequestContext::now()).await;
        assert!(out[0].success && out[2].success);
        assert!(!out[1].success);
        assert!(out[1].error.as_deref().unwrap().contains("boom"));
        assert_eq!(out[1].chart_data, ChartData::Breakdown(vec![]));
        assert_eq!(out[2].chart_data, ChartData::Value(5.0));
    }

    #[tokio::test]
    async fn test_timeout_is_isolated_per_config() {
        let svc = flaky_service(true).await;
        let out = svc.evaluate_all(&mixed_batch(), 1, &RequestContext::now()).await;
        assert!(out[0].success && out[2].success);
        assert!(!out[1].success);
        assert!(out[1].error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_missing_entity_scope_fails_softly() {
        let (svc, _) = service().await;
        let mut cfg = chart(VisualizationType::Stat);
        cfg.entity_id = None;
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        assert!(!out.success);
        assert_eq!(out.chart_data, ChartData::Value(0.0));

        cfg.entity_slug = Some("job".into());
        let out = svc.evaluate(&cfg, 1, &RequestContext::now()).await;
        assert!(out.success);
        assert_eq!(out.chart_data, ChartData::Value(5.0));
    }
}
