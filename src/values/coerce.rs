use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::schema::{Property, PropertyType};
use crate::values::model::{MediaRef, MultipleValue, RowValue, TypedValue, ValueRange};

/// 按属性类型把原始输入转换为 RowValue。
///
/// 无法解析的输入不报错，而是留空（`TypedValue::Empty`）。
pub fn set_value(row_id: i32, property: &Property, raw: &Value) -> RowValue {
    RowValue {
        id: 0,
        row_id,
        property_id: property.id,
        value: coerce(property.property_type, raw),
    }
}

pub fn coerce(property_type: PropertyType, raw: &Value) -> TypedValue {
    if raw.is_null() {
        return match property_type {
            PropertyType::Boolean => TypedValue::Boolean(false),
            _ => TypedValue::Empty,
        };
    }

    match property_type {
        PropertyType::Text | PropertyType::Select | PropertyType::Formula => match raw {
            Value::String(s) => TypedValue::Text(s.clone()),
            Value::Number(n) => TypedValue::Text(n.to_string()),
            Value::Bool(b) => TypedValue::Text(b.to_string()),
            _ => TypedValue::Empty,
        },
        PropertyType::Number => number_from_json(raw)
            .map(TypedValue::Number)
            .unwrap_or(TypedValue::Empty),
        PropertyType::Date => date_from_json(raw)
            .map(TypedValue::Date)
            .unwrap_or(TypedValue::Empty),
        PropertyType::Boolean => TypedValue::Boolean(truthy(raw)),
        PropertyType::MultiSelect | PropertyType::MultiText => {
            let items = multiple_from_json(raw);
            if items.is_empty() {
                TypedValue::Empty
            } else {
                TypedValue::Multiple(items)
            }
        }
        PropertyType::Media => TypedValue::Media(media_from_json(raw)),
        PropertyType::RangeNumber => {
            let range = range_from_json(raw, number_from_json);
            if range.is_empty() {
                TypedValue::Empty
            } else {
                TypedValue::NumberRange(range)
            }
        }
        PropertyType::RangeDate => {
            let range = range_from_json(raw, date_from_json);
            if range.is_empty() {
                TypedValue::Empty
            } else {
                TypedValue::DateRange(range)
            }
        }
    }
}

pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// 支持 RFC 3339、`YYYY-MM-DD`、`YYYY-MM-DD HH:MM:SS` 以及 epoch 秒
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&dt));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// 布尔字面量；无法识别的非空字符串视为 true
pub fn parse_bool(s: &str) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" | "n" | "off" | "null" | "undefined" => false,
        _ => true,
    }
}

/// 严格解析布尔字面量，用于过滤条件
pub fn parse_bool_strict(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => parse_bool(s),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

fn number_from_json(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn date_from_json(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    }
}

fn multiple_from_json(raw: &Value) -> Vec<MultipleValue> {
    let mut items = Vec::new();
    match raw {
        Value::Array(arr) => {
            for (idx, item) in arr.iter().enumerate() {
                let fallback = idx as i32;
                match item {
                    Value::String(s) if !s.trim().is_empty() => items.push(MultipleValue {
                        value: s.trim().to_string(),
                        order: fallback,
                    }),
                    Value::Object(obj) => {
                        let value = obj.get("value").and_then(|v| match v {
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        });
                        let order = obj
                            .get("order")
                            .and_then(Value::as_i64)
                            .map(|o| o as i32)
                            .unwrap_or(fallback);
                        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                            items.push(MultipleValue { value, order });
                        }
                    }
                    Value::Number(n) => items.push(MultipleValue {
                        value: n.to_string(),
                        order: fallback,
                    }),
                    _ => {}
                }
            }
        }
        Value::String(s) => {
            for (idx, part) in s.split(',').map(str::trim).filter(|p| !p.is_empty()).enumerate() {
                items.push(MultipleValue {
                    value: part.to_string(),
                    order: idx as i32,
                });
            }
        }
        _ => {}
    }
    items.sort_by_key(|m| m.order);
    items
}

fn media_from_json(raw: &Value) -> Vec<MediaRef> {
    let one = |v: &Value| -> Option<MediaRef> {
        match v {
            Value::String(s) if !s.trim().is_empty() => Some(MediaRef {
                file: s.clone(),
                name: s.rsplit('/').next().unwrap_or(s).to_string(),
                content_type: None,
            }),
            Value::Object(_) => serde_json::from_value::<MediaRef>(v.clone()).ok(),
            _ => None,
        }
    };
    match raw {
        Value::Array(arr) => arr.iter().filter_map(one).collect(),
        other => one(other).into_iter().collect(),
    }
}

fn range_from_json<T>(raw: &Value, parse: fn(&Value) -> Option<T>) -> ValueRange<T> {
    match raw {
        Value::Object(obj) => ValueRange {
            min: obj.get("min").and_then(parse),
            max: obj.get("max").and_then(parse),
        },
        Value::Array(arr) => ValueRange {
            min: arr.first().and_then(parse),
            max: arr.get(1).and_then(parse),
        },
        _ => ValueRange {
            min: None,
            max: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_coercion_leaves_invalid_unset() {
        assert_eq!(coerce(PropertyType::Number, &json!("12.5")), TypedValue::Number(12.5));
        assert_eq!(coerce(PropertyType::Number, &json!("1,200")), TypedValue::Number(1200.0));
        assert_eq!(coerce(PropertyType::Number, &json!(7)), TypedValue::Number(7.0));
        assert_eq!(coerce(PropertyType::Number, &json!("abc")), TypedValue::Empty);
        assert_eq!(coerce(PropertyType::Number, &json!("")), TypedValue::Empty);
    }

    #[test]
    fn test_date_coercion() {
        let d = coerce(PropertyType::Date, &json!("2024-03-01"));
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(d, TypedValue::Date(expected));
        let rfc = coerce(PropertyType::Date, &json!("2024-03-01T10:00:00+02:00"));
        assert_eq!(
            rfc,
            TypedValue::Date(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap())
        );
        assert_eq!(coerce(PropertyType::Date, &json!("not a date")), TypedValue::Empty);
    }

    #[test]
    fn test_boolean_casts_literals() {
        assert_eq!(coerce(PropertyType::Boolean, &json!("yes")), TypedValue::Boolean(true));
        assert_eq!(coerce(PropertyType::Boolean, &json!("false")), TypedValue::Boolean(false));
        assert_eq!(coerce(PropertyType::Boolean, &json!(0)), TypedValue::Boolean(false));
        assert_eq!(coerce(PropertyType::Boolean, &json!(null)), TypedValue::Boolean(false));
        assert_eq!(coerce(PropertyType::Boolean, &json!(true)), TypedValue::Boolean(true));
    }

    #[test]
    fn test_multiple_sorted_by_order() {
        let v = coerce(
            PropertyType::MultiSelect,
            &json!([{"value": "b", "order": 5}, {"value": "a", "order": 1}, "c"]),
        );
        match v {
            TypedValue::Multiple(items) => {
                let got: Vec<&str> = items.iter().map(|m| m.value.as_str()).collect();
                assert_eq!(got, vec!["a", "c", "b"]);
            }
            other => panic!("unexpected {other:?}"),
        }
        let csv = coerce(PropertyType::MultiText, &json!("rust, go ,"));
        assert_eq!(csv.sorted_multiple().len(), 2);
    }

    #[test]
    fn test_media_and_ranges() {
        let media = coerce(
            PropertyType::Media,
            &json!(["uploads/cv.pdf", {"file": "f/2", "name": "photo"}]),
        );
        match media {
            TypedValue::Media(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].name, "cv.pdf");
            }
            other => panic!("unexpected {other:?}"),
        }

        let range = coerce(PropertyType::RangeNumber, &json!({"min": "10", "max": 20}));
        assert_eq!(
            range,
            TypedValue::NumberRange(ValueRange {
                min: Some(10.0),
                max: Some(20.0)
            })
        );
        assert_eq!(
            coerce(PropertyType::RangeDate, &json!(["x", "y"])),
            TypedValue::Empty
        );
    }

    #[test]
    fn test_set_value_targets_property() {
        let prop = crate::test_support::property(3, "salary", PropertyType::Number);
        let rv = set_value(9, &prop, &json!("30"));
        assert_eq!(rv.row_id, 9);
        assert_eq!(rv.property_id, 3);
        assert_eq!(rv.value, TypedValue::Number(30.0));
    }
}
