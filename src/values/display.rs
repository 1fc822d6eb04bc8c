use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::schema::{Entity, Property, PropertySubtype, PropertyType};
use crate::values::model::{RowValue, TypedValue};

pub const EMPTY_DISPLAY: &str = "N/A";

pub fn display_value(property: &Property, value: &TypedValue) -> String {
    if value.is_blank() {
        return EMPTY_DISPLAY.to_string();
    }
    match value {
        TypedValue::Empty => EMPTY_DISPLAY.to_string(),
        TypedValue::Text(s) => {
            if property.property_type == PropertyType::Select {
                if let Some(opt) = property.option_by_value(s) {
                    return opt.name.clone();
                }
            }
            s.clone()
        }
        TypedValue::Number(n) => format_number(*n, property.subtype),
        TypedValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        TypedValue::Boolean(b) => (if *b { "Yes" } else { "No" }).to_string(),
        TypedValue::Multiple(_) => value
            .sorted_multiple()
            .into_iter()
            .map(|m| match property.option_by_value(&m.value) {
                Some(opt) => opt.name.clone(),
                None => m.value.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        TypedValue::Media(items) => items
            .iter()
            .map(|m| if m.name.is_empty() { m.file.as_str() } else { m.name.as_str() })
            .collect::<Vec<_>>()
            .join(", "),
        TypedValue::NumberRange(r) => format!(
            "{} - {}",
            r.min
                .map(|v| format_number(v, property.subtype))
                .unwrap_or_else(|| EMPTY_DISPLAY.to_string()),
            r.max
                .map(|v| format_number(v, property.subtype))
                .unwrap_or_else(|| EMPTY_DISPLAY.to_string()),
        ),
        TypedValue::DateRange(r) => format!(
            "{} - {}",
            r.min
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| EMPTY_DISPLAY.to_string()),
            r.max
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| EMPTY_DISPLAY.to_string()),
        ),
    }
}

fn format_number(n: f64, subtype: Option<PropertySubtype>) -> String {
    if subtype == Some(PropertySubtype::Currency) {
        return format!("{n:.2}");
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// required 是否满足：MEDIA 要求列表非空，其余类型要求活动字段非空
pub fn satisfies_required(property: &Property, value: Option<&TypedValue>) -> bool {
    if !property.flags.required {
        return true;
    }
    match (property.property_type, value) {
        (_, None) => false,
        (PropertyType::Media, Some(TypedValue::Media(items))) => !items.is_empty(),
        (PropertyType::Media, Some(_)) => false,
        (_, Some(v)) => !v.is_blank(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum ValidationIssue {
    Required { property: String },
    InvalidFormat { property: String, subtype: String },
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(https?://)?[\w.-]+\.[a-zA-Z]{2,}(/\S*)?$").unwrap())
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9 ()\-]{6,20}$").unwrap())
}

pub fn matches_subtype(subtype: PropertySubtype, text: &str) -> bool {
    let text = text.trim();
    match subtype {
        PropertySubtype::Email => email_re().is_match(text),
        PropertySubtype::Url => url_re().is_match(text),
        PropertySubtype::Phone => phone_re().is_match(text),
        PropertySubtype::Country | PropertySubtype::State | PropertySubtype::Currency => true,
    }
}

/// 客户端提交前的校验信号；不是存储层错误
pub fn validate_values(entity: &Entity, values: &[RowValue]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for prop in &entity.properties {
        let value = values
            .iter()
            .find(|v| v.property_id == prop.id)
            .map(|v| &v.value);
        if !satisfies_required(prop, value) {
            issues.push(ValidationIssue::Required {
                property: prop.name.clone(),
            });
            continue;
        }
        if let (Some(subtype), Some(TypedValue::Text(text))) = (prop.subtype, value) {
            if !text.trim().is_empty() && !matches_subtype(subtype, text) {
                issues.push(ValidationIssue::InvalidFormat {
                    property: prop.name.clone(),
                    subtype: subtype.as_str().to_string(),
                });
            }
        }
    }
    issues
}
