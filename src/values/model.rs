use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::PropertyType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleValue {
    pub value: String,
    pub order: i32,
}

/// 文件引用；上传和存储由外部负责
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub file: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRange<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> ValueRange<T> {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// 单元格的值：每个变体对应唯一一个"活动字段"
///
/// Serializes as `{"type": "Number", "value": 42.0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum TypedValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
    Multiple(Vec<MultipleValue>),
    Media(Vec<MediaRef>),
    NumberRange(ValueRange<f64>),
    DateRange(ValueRange<DateTime<Utc>>),
}

/// RowValue 上的活动字段种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueField {
    Text,
    Number,
    Date,
    Boolean,
    Multiple,
    Media,
    NumberRange,
    DateRange,
}

impl ValueField {
    pub fn for_type(property_type: PropertyType) -> Self {
        match property_type {
            PropertyType::Text | PropertyType::Select | PropertyType::Formula => ValueField::Text,
            PropertyType::Number => ValueField::Number,
            PropertyType::Date => ValueField::Date,
            PropertyType::Boolean => ValueField::Boolean,
            PropertyType::MultiSelect | PropertyType::MultiText => ValueField::Multiple,
            PropertyType::Media => ValueField::Media,
            PropertyType::RangeNumber => ValueField::NumberRange,
            PropertyType::RangeDate => ValueField::DateRange,
        }
    }
}

impl TypedValue {
    pub fn field(&self) -> Option<ValueField> {
        match self {
            TypedValue::Empty => None,
            TypedValue::Text(_) => Some(ValueField::Text),
            TypedValue::Number(_) => Some(ValueField::Number),
            TypedValue::Date(_) => Some(ValueField::Date),
            TypedValue::Boolean(_) => Some(ValueField::Boolean),
            TypedValue::Multiple(_) => Some(ValueField::Multiple),
            TypedValue::Media(_) => Some(ValueField::Media),
            TypedValue::NumberRange(_) => Some(ValueField::NumberRange),
            TypedValue::DateRange(_) => Some(ValueField::DateRange),
        }
    }

    /// 活动字段为空（null、空字符串、空列表、空区间）
    pub fn is_blank(&self) -> bool {
        match self {
            TypedValue::Empty => true,
            TypedValue::Text(s) => s.trim().is_empty(),
            TypedValue::Number(_) | TypedValue::Date(_) | TypedValue::Boolean(_) => false,
            TypedValue::Multiple(items) => items.is_empty(),
            TypedValue::Media(items) => items.is_empty(),
            TypedValue::NumberRange(r) => r.is_empty(),
            TypedValue::DateRange(r) => r.is_empty(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            TypedValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// 多值列表按 order 重新排序后返回
    pub fn sorted_multiple(&self) -> Vec<&MultipleValue> {
        match self {
            TypedValue::Multiple(items) => {
                let mut sorted: Vec<&MultipleValue> = items.iter().collect();
                sorted.sort_by_key(|m| m.order);
                sorted
            }
            _ => Vec::new(),
        }
    }

    /// 文本值或多值列表中是否包含 `needle`
    pub fn contains_text(&self, needle: &str) -> bool {
        match self {
            TypedValue::Text(s) => s == needle,
            TypedValue::Multiple(items) => items.iter().any(|m| m.value == needle),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowValue {
    pub id: i32,
    pub row_id: i32,
    pub property_id: i32,
    pub value: TypedValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedRowLink {
    pub id: i32,
    pub relationship_id: i32,
    pub parent_row_id: i32,
    pub child_row_id: i32,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: i32,
    pub entity_id: i32,
    pub tenant_id: i32,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub values: Vec<RowValue>,
    #[serde(default)]
    pub parents: Vec<RelatedRowLink>,
    #[serde(default)]
    pub children: Vec<RelatedRowLink>,
}

impl Row {
    pub fn value_of(&self, property_id: i32) -> Option<&TypedValue> {
        self.values
            .iter()
            .find(|v| v.property_id == property_id)
            .map(|v| &v.value)
    }

    pub fn number_of(&self, property_id: i32) -> Option<f64> {
        self.value_of(property_id).and_then(TypedValue::as_number)
    }
}
