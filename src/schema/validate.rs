use crate::schema::model::{Entity, PropertySubtype, PropertyType};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate property name `{0}`")]
    DuplicateProperty(String),
    #[error("property `{0}` is a select but has no options")]
    MissingOptions(String),
    #[error("property `{0}` has options but type {1} does not use them")]
    UnexpectedOptions(String, PropertyType),
    #[error("property `{0}` has a subtype not allowed on type {1}")]
    UnexpectedSubtype(String, PropertyType),
    #[error("property `{0}` declares option value `{1}` twice")]
    DuplicateOption(String, String),
    #[error("entity name must not be empty")]
    EmptyName,
}

pub fn validate_entity(entity: &Entity) -> Result<(), SchemaError> {
    if entity.name.trim().is_empty() {
        return Err(SchemaError::EmptyName);
    }

    let mut names = HashSet::new();
    for prop in &entity.properties {
        if !names.insert(prop.name.as_str()) {
            return Err(SchemaError::DuplicateProperty(prop.name.clone()));
        }

        let t = prop.property_type;
        if t.has_options() && prop.options.is_empty() {
            return Err(SchemaError::MissingOptions(prop.name.clone()));
        }
        if !t.has_options() && !prop.options.is_empty() {
            return Err(SchemaError::UnexpectedOptions(prop.name.clone(), t));
        }
        // 货币子类型可用于 NUMBER，其余子类型只用于 TEXT
        let subtype_ok = match prop.subtype {
            None => true,
            Some(PropertySubtype::Currency) => {
                matches!(t, PropertyType::Text | PropertyType::Number)
            }
            Some(_) => t == PropertyType::Text,
        };
        if !subtype_ok {
            return Err(SchemaError::UnexpectedSubtype(prop.name.clone(), t));
        }

        let mut values = HashSet::new();
        for opt in &prop.options {
            if !values.insert(opt.value.as_str()) {
                return Err(SchemaError::DuplicateOption(
                    prop.name.clone(),
                    opt.value.clone(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::PropertySubtype;
    use crate::test_support::{job_entity, property};

    #[test]
    fn test_job_entity_is_valid() {
        assert_eq!(validate_entity(&job_entity()), Ok(()));
    }

    #[test]
    fn test_duplicate_property_name() {
        let mut entity = job_entity();
        entity
            .properties
            .push(property(99, "salary", PropertyType::Number));
        assert_eq!(
            validate_entity(&entity),
            Err(SchemaError::DuplicateProperty("salary".to_string()))
        );
    }

    #[test]
    fn test_select_requires_options() {
        let mut entity = job_entity();
        entity
            .properties
            .push(property(99, "stage", PropertyType::Select));
        assert_eq!(
            validate_entity(&entity),
            Err(SchemaError::MissingOptions("stage".to_string()))
        );
    }

    #[test]
    fn test_subtype_only_on_text() {
        let mut entity = job_entity();
        entity.properties[2].subtype = Some(PropertySubtype::Email);
        assert!(matches!(
            validate_entity(&entity),
            Err(SchemaError::UnexpectedSubtype(_, PropertyType::Number))
        ));
        entity.properties[2].subtype = Some(PropertySubtype::Currency);
        assert_eq!(validate_entity(&entity), Ok(()));
    }

    #[test]
    fn test_duplicate_option_value() {
        let mut entity = job_entity();
        let dup = entity.properties[1].options[0].clone();
        entity.properties[1].options.push(dup);
        assert!(matches!(
            validate_entity(&entity),
            Err(SchemaError::DuplicateOption(_, _))
        ));
    }
}
