use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 属性类型标签。存储层用小整数编码（见 `code` / `from_code`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
    MultiSelect,
    MultiText,
    Media,
    RangeNumber,
    RangeDate,
    Formula,
}

impl PropertyType {
    pub const ALL: [PropertyType; 11] = [
        PropertyType::Text,
        PropertyType::Number,
        PropertyType::Date,
        PropertyType::Boolean,
        PropertyType::Select,
        PropertyType::MultiSelect,
        PropertyType::MultiText,
        PropertyType::Media,
        PropertyType::RangeNumber,
        PropertyType::RangeDate,
        PropertyType::Formula,
    ];

    pub fn code(self) -> i32 {
        match self {
            PropertyType::Text => 0,
            PropertyType::Number => 1,
            PropertyType::Date => 2,
            PropertyType::Boolean => 3,
            PropertyType::Select => 4,
            PropertyType::MultiSelect => 5,
            PropertyType::MultiText => 6,
            PropertyType::Media => 7,
            PropertyType::RangeNumber => 8,
            PropertyType::RangeDate => 9,
            PropertyType::Formula => 10,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::Text => "TEXT",
            PropertyType::Number => "NUMBER",
            PropertyType::Date => "DATE",
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::Select => "SELECT",
            PropertyType::MultiSelect => "MULTI_SELECT",
            PropertyType::MultiText => "MULTI_TEXT",
            PropertyType::Media => "MEDIA",
            PropertyType::RangeNumber => "RANGE_NUMBER",
            PropertyType::RangeDate => "RANGE_DATE",
            PropertyType::Formula => "FORMULA",
        }
    }

    /// 是否带有枚举选项（SELECT / MULTI_SELECT）
    pub fn has_options(self) -> bool {
        matches!(self, PropertyType::Select | PropertyType::MultiSelect)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("unknown property type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySubtype {
    Email,
    Phone,
    Url,
    Country,
    State,
    Currency,
}

impl PropertySubtype {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertySubtype::Email => "email",
            PropertySubtype::Phone => "phone",
            PropertySubtype::Url => "url",
            PropertySubtype::Country => "country",
            PropertySubtype::State => "state",
            PropertySubtype::Currency => "currency",
        }
    }
}

impl FromStr for PropertySubtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(PropertySubtype::Email),
            "phone" => Ok(PropertySubtype::Phone),
            "url" => Ok(PropertySubtype::Url),
            "country" => Ok(PropertySubtype::Country),
            "state" => Ok(PropertySubtype::State),
            "currency" => Ok(PropertySubtype::Currency),
            other => Err(format!("unknown property subtype: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyOption {
    pub id: i32,
    pub property_id: i32,
    pub name: String,
    pub value: String,
    pub color: Option<String>,
    pub order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFlags {
    pub required: bool,
    pub read_only: bool,
    pub hidden: bool,
    pub show_in_create: bool,
    pub can_update: bool,
}

impl Default for PropertyFlags {
    fn default() -> Self {
        Self {
            required: false,
            read_only: false,
            hidden: false,
            show_in_create: true,
            can_update: true,
        }
    }
}

pub const ATTR_DEFAULT_VALUE: &str = "defaultValue";
pub const ATTR_GROUP: &str = "group";
pub const ATTR_COLUMNS: &str = "columns";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i32,
    pub entity_id: i32,
    pub name: String,
    pub title: String,
    pub property_type: PropertyType,
    pub subtype: Option<PropertySubtype>,
    pub order: i32,
    pub flags: PropertyFlags,
    pub options: Vec<PropertyOption>,
    pub attributes: BTreeMap<String, String>,
}

impl Property {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.attribute(ATTR_DEFAULT_VALUE).filter(|v| !v.is_empty())
    }

    pub fn display_group(&self) -> Option<&str> {
        self.attribute(ATTR_GROUP)
    }

    pub fn column_span(&self) -> u32 {
        self.attribute(ATTR_COLUMNS)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(1)
    }

    /// 选项按 order 排序后返回，保持声明顺序
    pub fn sorted_options(&self) -> Vec<&PropertyOption> {
        let mut opts: Vec<&PropertyOption> = self.options.iter().collect();
        opts.sort_by_key(|o| o.order);
        opts
    }

    pub fn option_by_value(&self, value: &str) -> Option<&PropertyOption> {
        self.options.iter().find(|o| o.value == value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelationship {
    pub id: i32,
    pub parent_id: i32,
    pub child_id: i32,
    pub title: Option<String>,
    pub order: i32,
    pub distinct: bool,
    pub read_only: bool,
    pub hidden_if_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: i32,
    pub entity_id: i32,
    pub name: String,
    pub title: String,
    pub order: i32,
    pub columns: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    pub slug: String,
    pub title: String,
    pub title_plural: String,
    pub icon: Option<String>,
    pub properties: Vec<Property>,
    pub parents: Vec<EntityRelationship>,
    pub children: Vec<EntityRelationship>,
    pub views: Vec<EntityView>,
}

impl Entity {
    pub fn property(&self, id: i32) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// 图表 breakdown 输出中的序列键，如 "job"
    pub fn series_key(&self) -> String {
        let base = if self.slug.trim().is_empty() {
            self.name.as_str()
        } else {
            self.slug.as_str()
        };
        base.trim().to_lowercase().replace(' ', "_")
    }

    /// 所有关系（先 children 再 parents），保持各自顺序
    /// 子关系在前；指向自身的关系同时出现在两侧，只返回一次
    pub fn relationships(&self) -> impl Iterator<Item = &EntityRelationship> {
        let children = &self.children;
        children.iter().chain(
            self.parents
                .iter()
                .filter(move |p| children.iter().all(|c| c.id != p.id)),
        )
    }
}
