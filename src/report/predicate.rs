use chrono::{DateTime, Duration, Months, Utc};
use std::collections::HashMap;

use crate::report::model::{
    ChartConfig, ChartFilter, FilterOperator, PropertyRef, RequestContext, SkippedItem,
    SkippedKind, TimeGranularity,
};
use crate::schema::{Property, PropertyType};
use crate::values::{parse_bool_strict, parse_date, parse_number};

/// 过滤条件的字面量，已按属性类型解析；决定比较哪一列
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
}

/// "该行存在属性 `property_id` 的值满足 `<field> <op> <literal>`"
#[derive(Debug, Clone, PartialEq)]
pub struct ValuePredicate {
    pub property_id: i32,
    pub operator: FilterOperator,
    pub literal: Literal,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowQuery {
    pub tenant_ids: Vec<i32>,
    pub entity_id: i32,
    pub created_from: Option<DateTime<Utc>>,
    pub predicates: Vec<ValuePredicate>,
}

/// breakdown 的类别：来自属性的枚举选项，而不是数据中出现的值。
/// `label` 只在选项名与值不同时存在，仅用于展示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub value: String,
    pub label: Option<String>,
}

impl Category {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }
}

/// 图表可引用的属性集合：实体属性 + 通过 id 额外查到的属性
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    entity_id: i32,
    by_id: HashMap<i32, Property>,
}

impl PropertyIndex {
    pub fn new(entity_id: i32, properties: impl IntoIterator<Item = Property>) -> Self {
        let by_id = properties.into_iter().map(|p| (p.id, p)).collect();
        Self { entity_id, by_id }
    }

    pub fn resolve(&self, reference: &PropertyRef) -> Result<&Property, String> {
        let found = match reference {
            PropertyRef::Id(id) => self.by_id.get(id),
            PropertyRef::Name(name) => self
                .by_id
                .values()
                .find(|p| p.entity_id == self.entity_id && &p.name == name)
                .or_else(|| {
                    name.trim()
                        .parse::<i32>()
                        .ok()
                        .and_then(|id| self.by_id.get(&id))
                }),
        };
        match found {
            None => Err("property not found".to_string()),
            Some(p) if p.entity_id != self.entity_id => {
                Err(format!("property belongs to entity {}", p.entity_id))
            }
            Some(p) => Ok(p),
        }
    }
}

/// 按属性类型选择比较字段并解析字面量。
/// NUMBER -> number，TEXT/SELECT -> text，DATE -> date，其余 -> boolean
pub fn build_predicate(filter: &ChartFilter, property: &Property) -> Result<ValuePredicate, String> {
    let raw = filter.value.as_str();
    let literal = match property.property_type {
        PropertyType::Number => parse_number(raw)
            .map(Literal::Number)
            .ok_or_else(|| format!("`{raw}` is not a number"))?,
        PropertyType::Text | PropertyType::Select => Literal::Text(raw.to_string()),
        PropertyType::Date => parse_date(raw)
            .map(Literal::Date)
            .ok_or_else(|| format!("`{raw}` is not a date"))?,
        PropertyType::Boolean
        | PropertyType::MultiSelect
        | PropertyType::MultiText
        | PropertyType::Media
        | PropertyType::RangeNumber
        | PropertyType::RangeDate
        | PropertyType::Formula => parse_bool_strict(raw)
            .map(Literal::Boolean)
            .ok_or_else(|| format!("`{raw}` is not a boolean"))?,
    };
    Ok(ValuePredicate {
        property_id: property.id,
        operator: filter.operator,
        literal,
    })
}

pub fn window_start(
    granularity: Option<TimeGranularity>,
    ctx: &RequestContext,
) -> Option<DateTime<Utc>> {
    match granularity? {
        TimeGranularity::Week => Some(ctx.now - Duration::weeks(1)),
        TimeGranularity::Month => ctx.now.checked_sub_months(Months::new(1)),
        TimeGranularity::Year => ctx.now.checked_sub_months(Months::new(12)),
        TimeGranularity::External => ctx.start_date,
    }
}

pub fn categories_for(property: &Property) -> Vec<Category> {
    property
        .sorted_options()
        .into_iter()
        .map(|o| Category {
            value: o.value.clone(),
            label: (!o.name.is_empty() && o.name != o.value).then(|| o.name.clone()),
        })
        .collect()
}

/// 已解析的分组属性
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroupBy {
    pub property_id: i32,
    pub property_type: PropertyType,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuery {
    pub query: RowQuery,
    pub group_by: Option<ResolvedGroupBy>,
    pub skipped: Vec<SkippedItem>,
}

/// 把图表配置翻译为行查询；无效的过滤/分组被跳过并记录
pub fn prepare(
    config: &ChartConfig,
    entity_id: i32,
    tenant_ids: Vec<i32>,
    properties: &PropertyIndex,
    ctx: &RequestContext,
) -> PreparedQuery {
    let mut skipped = Vec::new();
    let mut predicates = Vec::with_capacity(config.filters.len());

    for filter in &config.filters {
        let property = match properties.resolve(&filter.field) {
            Ok(p) => p,
            Err(reason) => {
                skipped.push(SkippedItem::new(SkippedKind::Filter, &filter.field, reason));
                continue;
            }
        };
        match build_predicate(filter, property) {
            Ok(p) => predicates.push(p),
            Err(reason) => {
                skipped.push(SkippedItem::new(SkippedKind::Filter, &filter.field, reason))
            }
        }
    }

    let group_by = config
        .group_by
        .as_ref()
        .and_then(|g| match properties.resolve(&g.property) {
            Ok(p) if p.property_type.has_options() => Some(ResolvedGroupBy {
                property_id: p.id,
                property_type: p.property_type,
                categories: categories_for(p),
            }),
            Ok(p) => {
                skipped.push(SkippedItem::new(
                    SkippedKind::GroupBy,
                    &g.property,
                    format!("type {} has no enumerated options", p.property_type),
                ));
                None
            }
            Err(reason) => {
                skipped.push(SkippedItem::new(SkippedKind::GroupBy, &g.property, reason));
                None
            }
        });

    PreparedQuery {
        query: RowQuery {
            tenant_ids,
            entity_id,
            created_from: window_start(config.time_granularity, ctx),
            predicates,
        },
        group_by,
        skipped,
    }
}
