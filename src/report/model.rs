use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::schema::PropertyType;

/// 属性引用：数字 id 或属性名
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyRef {
    Id(i32),
    Name(String),
}

impl PropertyRef {
    /// 手写输入：能解析为整数的视为 id
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<i32>() {
            Ok(id) => PropertyRef::Id(id),
            Err(_) => PropertyRef::Name(s.to_string()),
        }
    }

    /// 存储形式带类型前缀，数字属性名读回后仍是 Name
    pub fn to_stored(&self) -> String {
        match self {
            PropertyRef::Id(id) => format!("id:{id}"),
            PropertyRef::Name(name) => format!("name:{name}"),
        }
    }

    /// 没有前缀的旧数据按 `parse` 处理
    pub fn from_stored(s: &str) -> Self {
        if let Some(name) = s.strip_prefix("name:") {
            return PropertyRef::Name(name.to_string());
        }
        match s.strip_prefix("id:").map(|id| id.parse::<i32>()) {
            Some(Ok(id)) => PropertyRef::Id(id),
            _ => PropertyRef::parse(s),
        }
    }
}

impl fmt::Display for PropertyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyRef::Id(id) => write!(f, "{id}"),
            PropertyRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VisualizationType {
    Stat,
    Bar,
    Pie,
    Line,
    Trend,
}

impl VisualizationType {
    pub fn as_str(self) -> &'static str {
        match self {
            VisualizationType::Stat => "stat chart",
            VisualizationType::Bar => "bar chart",
            VisualizationType::Pie => "pie chart",
            VisualizationType::Line => "line chart",
            VisualizationType::Trend => "trend chart",
        }
    }

    /// line/trend 不输出颜色
    pub fn uses_fill(self) -> bool {
        matches!(
            self,
            VisualizationType::Stat | VisualizationType::Bar | VisualizationType::Pie
        )
    }
}

impl TryFrom<String> for VisualizationType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let lower = value.trim().to_ascii_lowercase();
        let key = lower.strip_suffix(" chart").unwrap_or(&lower);
        match key {
            "stat" | "stats" => Ok(VisualizationType::Stat),
            "bar" => Ok(VisualizationType::Bar),
            "pie" => Ok(VisualizationType::Pie),
            "line" => Ok(VisualizationType::Line),
            "trend" => Ok(VisualizationType::Trend),
            _ => Err(format!("unknown visualization type: {value}")),
        }
    }
}

impl From<VisualizationType> for String {
    fn from(v: VisualizationType) -> Self {
        v.as_str().to_string()
    }
}

/// 过滤运算符；未识别的运算符一律按 "=" 处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FilterOperator {
    #[default]
    Eq,
    Gt,
    Lt,
    Ne,
}

impl FilterOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::Ne => "!=",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            ">" => FilterOperator::Gt,
            "<" => FilterOperator::Lt,
            "!=" => FilterOperator::Ne,
            _ => FilterOperator::Eq,
        }
    }
}

impl From<String> for FilterOperator {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FilterOperator> for String {
    fn from(op: FilterOperator) -> Self {
        op.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithmeticOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Sub => "-",
            ArithmeticOperator::Mul => "*",
            ArithmeticOperator::Div => "/",
        }
    }
}

impl TryFrom<String> for ArithmeticOperator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "+" => Ok(ArithmeticOperator::Add),
            "-" => Ok(ArithmeticOperator::Sub),
            "*" | "x" => Ok(ArithmeticOperator::Mul),
            "/" => Ok(ArithmeticOperator::Div),
            other => Err(format!("unknown arithmetic operator: {other}")),
        }
    }
}

impl From<ArithmeticOperator> for String {
    fn from(op: ArithmeticOperator) -> Self {
        op.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TimeGranularity {
    Week,
    Month,
    Year,
    /// 使用请求上下文里的绝对起始日期
    External,
}

impl TimeGranularity {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeGranularity::Week => "1 week",
            TimeGranularity::Month => "1 month",
            TimeGranularity::Year => "1 year",
            TimeGranularity::External => "external",
        }
    }
}

impl TryFrom<String> for TimeGranularity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "week" | "1 week" | "last week" | "7d" => Ok(TimeGranularity::Week),
            "month" | "1 month" | "last month" | "30d" => Ok(TimeGranularity::Month),
            "year" | "1 year" | "last year" | "365d" => Ok(TimeGranularity::Year),
            "external" | "custom" | "use external value" => Ok(TimeGranularity::External),
            other => Err(format!("unknown time granularity: {other}")),
        }
    }
}

impl From<TimeGranularity> for String {
    fn from(g: TimeGranularity) -> Self {
        g.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricOperation {
    #[default]
    Sum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBy {
    pub property: PropertyRef,
    #[serde(default)]
    pub property_type: Option<PropertyType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub property: PropertyRef,
    #[serde(default)]
    pub operation: MetricOperation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartFilter {
    pub field: PropertyRef,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
}

/// 过滤值接受任意 JSON 标量：`20`、`true`、`"Open"`
fn scalar_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "filter value must be a scalar, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedField {
    pub field_a: PropertyRef,
    pub field_b: PropertyRef,
    pub operator: ArithmeticOperator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub tenant_ids: Vec<i32>,
    #[serde(default)]
    pub entity_id: Option<i32>,
    #[serde(default)]
    pub entity_slug: Option<String>,
    pub group_slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: i32,
    pub visualization_type: VisualizationType,
    #[serde(default)]
    pub group_by: Option<GroupBy>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub filters: Vec<ChartFilter>,
    #[serde(default)]
    pub computed_fields: Vec<ComputedField>,
    #[serde(default)]
    pub time_granularity: Option<TimeGranularity>,
}

impl ChartConfig {
    /// 租户范围为空表示对请求租户可见
    pub fn visible_to(&self, tenant_id: i32) -> bool {
        self.tenant_ids.is_empty() || self.tenant_ids.contains(&tenant_id)
    }
}

/// 报表请求上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub now: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
}

impl RequestContext {
    pub fn now() -> Self {
        Self {
            now: Utc::now(),
            start_date: None,
        }
    }

    pub fn with_start_date(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::now()
    }
}

/// breakdown 的一行：`{category, label?, <key>: value, ..., fill?}`；category 为选项值
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub category: String,
    pub label: Option<String>,
    pub values: Vec<(String, f64)>,
    pub fill: Option<String>,
}

impl CategoryRow {
    pub fn value(&self, key: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

impl Serialize for CategoryRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.fill.is_some()) + usize::from(self.label.is_some());
        let mut map = serializer.serialize_map(Some(1 + self.values.len() + extra))?;
        map.serialize_entry("category", &self.category)?;
        if let Some(label) = &self.label {
            map.serialize_entry("label", label)?;
        }
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        if let Some(fill) = &self.fill {
            map.serialize_entry("fill", fill)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Value(f64),
    Breakdown(Vec<CategoryRow>),
}

impl ChartData {
    pub fn as_value(&self) -> Option<f64> {
        match self {
            ChartData::Value(v) => Some(*v),
            ChartData::Breakdown(_) => None,
        }
    }

    pub fn as_breakdown(&self) -> Option<&[CategoryRow]> {
        match self {
            ChartData::Breakdown(rows) => Some(rows),
            ChartData::Value(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkippedKind {
    Filter,
    GroupBy,
    Metric,
    ComputedField,
}

/// 被跳过的配置项（引用无效等），随结果一起返回
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub kind: SkippedKind,
    pub reference: String,
    pub reason: String,
}

impl SkippedItem {
    pub fn new(kind: SkippedKind, reference: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

/// 附带结果数据的图表配置
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatedChart {
    #[serde(flatten)]
    pub config: ChartConfig,
    pub chart_data: ChartData,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_filter_operator_is_equality() {
        assert_eq!(FilterOperator::parse("~"), FilterOperator::Eq);
        assert_eq!(FilterOperator::parse("!="), FilterOperator::Ne);
        let f: ChartFilter =
            serde_json::from_value(json!({"field": "status", "operator": "~", "value": "Open"}))
                .unwrap();
        assert_eq!(f.operator, FilterOperator::Eq);
        assert_eq!(f.field, PropertyRef::Name("status".into()));
    }

    #[test]
    fn test_filter_value_accepts_scalars() {
        let f: ChartFilter =
            serde_json::from_value(json!({"field": "salary", "operator": ">", "value": 20}))
                .unwrap();
        assert_eq!(f.value, "20");
        let f: ChartFilter =
            serde_json::from_value(json!({"field": "remote", "value": true})).unwrap();
        assert_eq!(f.value, "true");
        let f: ChartFilter =
            serde_json::from_value(json!({"field": "bonus", "value": 2.5})).unwrap();
        assert_eq!(f.value, "2.5");
        assert!(serde_json::from_value::<ChartFilter>(json!({"field": "x", "value": [1]})).is_err());
    }

    #[test]
    fn test_visualization_aliases() {
        assert_eq!(
            VisualizationType::try_from("Bar Chart".to_string()),
            Ok(VisualizationType::Bar)
        );
        assert_eq!(
            VisualizationType::try_from("stat".to_string()),
            Ok(VisualizationType::Stat)
        );
        assert!(VisualizationType::try_from("radar".to_string()).is_err());
        assert!(!VisualizationType::Line.uses_fill());
    }

    #[test]
    fn test_property_ref_parse() {
        assert_eq!(PropertyRef::parse("12"), PropertyRef::Id(12));
        assert_eq!(PropertyRef::parse("status"), PropertyRef::Name("status".into()));
        let v: PropertyRef = serde_json::from_value(json!(7)).unwrap();
        assert_eq!(v, PropertyRef::Id(7));
    }

    #[test]
    fn test_stored_property_ref_keeps_kind() {
        let numeric_name = PropertyRef::Name("2024".into());
        assert_eq!(numeric_name.to_stored(), "name:2024");
        assert_eq!(PropertyRef::from_stored("name:2024"), numeric_name);
        assert_eq!(PropertyRef::from_stored("id:7"), PropertyRef::Id(7));
        assert_eq!(
            PropertyRef::from_stored("name:id:7"),
            PropertyRef::Name("id:7".into())
        );
        // 无前缀的旧数据
        assert_eq!(PropertyRef::from_stored("12"), PropertyRef::Id(12));
        assert_eq!(PropertyRef::from_stored("status"), PropertyRef::Name("status".into()));
    }

    #[test]
    fn test_category_row_serializes_flat_in_order() {
        let row = CategoryRow {
            category: "Open".into(),
            label: None,
            values: vec![("job2".into(), 1.0), ("job10".into(), 2.0)],
            fill: Some("#8884d8".into()),
        };
        let s = serde_json::to_string(&row).unwrap();
        assert_eq!(
            s,
            r##"{"category":"Open","job2":1.0,"job10":2.0,"fill":"#8884d8"}"##
        );

        let labelled = CategoryRow {
            category: "open".into(),
            label: Some("Open Position".into()),
            values: vec![("job".into(), 3.0)],
            fill: None,
        };
        assert_eq!(
            serde_json::to_string(&labelled).unwrap(),
            r#"{"category":"open","label":"Open Position","job":3.0}"#
        );
    }

    #[test]
    fn test_chart_config_deserializes_minimal_json() {
        let cfg: ChartConfig = serde_json::from_value(json!({
            "entityId": 1,
            "groupSlug": "jobs",
            "visualizationType": "bar chart",
            "groupBy": {"property": "status"},
            "timeGranularity": "1 month"
        }))
        .unwrap();
        assert_eq!(cfg.visualization_type, VisualizationType::Bar);
        assert_eq!(cfg.time_granularity, Some(TimeGranularity::Month));
        assert!(cfg.filters.is_empty());
        assert!(cfg.visible_to(42));
    }
}
